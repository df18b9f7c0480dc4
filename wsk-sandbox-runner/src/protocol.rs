//! JSON request/response shapes for the sandbox process protocol (see
//! `SPEC_FULL.md` §6): read one request object from stdin, write exactly one
//! response object to stdout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_entry_path() -> String {
    "~/main.ts".to_string()
}

fn default_timeout_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    #[serde(rename = "zipBase64")]
    pub zip_base64: String,
    #[serde(rename = "entryPath", default = "default_entry_path")]
    pub entry_path: String,
    #[serde(default)]
    pub argv: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(rename = "timeoutMs", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecuteResponse {
    Ok {
        ok: bool,
        stdout: String,
        stderr: String,
        #[serde(rename = "exitCode")]
        exit_code: i32,
        #[serde(rename = "zipBase64")]
        zip_base64: String,
    },
    Err {
        ok: bool,
        error: String,
        stack: String,
        #[serde(rename = "exitCode")]
        exit_code: i32,
    },
}

impl ExecuteResponse {
    pub fn ok(stdout: String, stderr: String, exit_code: i32, zip_base64: String) -> Self {
        ExecuteResponse::Ok {
            ok: true,
            stdout,
            stderr,
            exit_code,
            zip_base64,
        }
    }

    pub fn err(error: impl Into<String>, exit_code: i32) -> Self {
        ExecuteResponse::Err {
            ok: false,
            error: error.into(),
            stack: String::new(),
            exit_code,
        }
    }
}
