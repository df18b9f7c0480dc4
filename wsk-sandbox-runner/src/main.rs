//! Entry point spawned by `wsk-host` per `execute` call. Reads a single
//! JSON request from stdin, bundles and runs the guest script against a
//! workspace materialized from the request's ZIP, and writes a single JSON
//! response to stdout. Exit code mirrors `response.exitCode`.

mod protocol;

use std::io::{self, Read};
use std::process::ExitCode;
use std::time::Duration;

use base64::Engine;
use tracing::error;

use protocol::{ExecuteRequest, ExecuteResponse};
use wsk_vfs::Workspace;

const EXIT_GENERIC_FAILURE: i32 = 1;
const EXIT_TIMEOUT: i32 = 124;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let response = run();
    let exit_code = match &response {
        ExecuteResponse::Ok { exit_code, .. } => *exit_code,
        ExecuteResponse::Err { exit_code, .. } => *exit_code,
    };

    let payload = serde_json::to_string(&response).unwrap_or_else(|err| {
        format!(r#"{{"ok":false,"error":"failed to serialize response: {err}","stack":"","exitCode":1}}"#)
    });
    println!("{payload}");

    ExitCode::from(exit_code.clamp(0, 255) as u8)
}

fn run() -> ExecuteResponse {
    let mut raw = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut raw) {
        error!(%err, "failed to read request from stdin");
        return ExecuteResponse::err(format!("failed to read stdin: {err}"), EXIT_GENERIC_FAILURE);
    }

    let request: ExecuteRequest = match serde_json::from_str(&raw) {
        Ok(req) => req,
        Err(err) => {
            return ExecuteResponse::err(format!("malformed request: {err}"), EXIT_GENERIC_FAILURE);
        }
    };

    let zip_bytes = match base64::engine::general_purpose::STANDARD.decode(&request.zip_base64) {
        Ok(bytes) => bytes,
        Err(err) => {
            return ExecuteResponse::err(format!("invalid zipBase64: {err}"), EXIT_GENERIC_FAILURE);
        }
    };

    let ws = match Workspace::load(Some(&zip_bytes)) {
        Ok(ws) => ws,
        Err(err) => {
            return ExecuteResponse::err(format!("corrupt archive: {err}"), EXIT_GENERIC_FAILURE);
        }
    };

    let bundle = match wsk_sandbox::bundle(&ws, &request.entry_path) {
        Ok(bundle) => bundle,
        Err(err) => {
            return ExecuteResponse::err(err.to_string(), EXIT_GENERIC_FAILURE);
        }
    };

    let timeout = Duration::from_millis(request.timeout_ms);
    match wsk_sandbox::run(ws, &bundle, &request.argv, &request.env, timeout) {
        Ok((outcome, ws)) => match ws.export_zip_buffer() {
            Ok(bytes) => {
                let zip_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);
                ExecuteResponse::ok(outcome.stdout, outcome.stderr, outcome.exit_code, zip_base64)
            }
            Err(err) => ExecuteResponse::err(format!("failed to export zip: {err}"), EXIT_GENERIC_FAILURE),
        },
        Err(wsk_sandbox::SandboxError::Timeout) => {
            ExecuteResponse::err("script timed out", EXIT_TIMEOUT)
        }
        Err(err) => ExecuteResponse::err(err.to_string(), EXIT_GENERIC_FAILURE),
    }
}

