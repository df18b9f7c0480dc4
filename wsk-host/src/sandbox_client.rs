//! Client side of the sandbox process protocol: spawns `wsk-sandbox-runner`,
//! writes one request object to its stdin, and parses the single response
//! object it writes to stdout. Mirrors `wsk-sandbox-runner`'s `protocol`
//! module without linking against that binary crate.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::HostError;

#[derive(Debug, Clone, Serialize)]
struct ExecuteRequest {
    #[serde(rename = "zipBase64")]
    zip_base64: String,
    #[serde(rename = "entryPath")]
    entry_path: String,
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    #[serde(rename = "timeoutMs")]
    timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExecuteResponse {
    Ok {
        stdout: String,
        stderr: String,
        #[serde(rename = "exitCode")]
        exit_code: i32,
        #[serde(rename = "zipBase64")]
        zip_base64: String,
    },
    Err {
        error: String,
        #[serde(rename = "exitCode")]
        exit_code: i32,
    },
}

/// Outcome of a single guest script run, with the workspace archive bytes
/// the runner exported after applying whatever side effects the script had.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub zip_bytes: Vec<u8>,
}

/// Spawn the sandbox runner binary at `runner_path`, run `entry_path` against
/// `zip_bytes`, and wait up to `wall_clock_timeout` for it to finish. The
/// child's environment is scrubbed of everything except `retained_env_vars`
/// (read from this process's own environment) — the guest script only ever
/// sees variables explicitly passed in `env`, exposed via `process.env`.
pub async fn execute(
    runner_path: &Path,
    zip_bytes: &[u8],
    entry_path: &str,
    argv: &[String],
    env: &BTreeMap<String, String>,
    timeout_ms: u64,
    wall_clock_timeout: Duration,
    retained_env_vars: &[String],
) -> Result<RunOutcome, HostError> {
    let request = ExecuteRequest {
        zip_base64: base64::engine::general_purpose::STANDARD.encode(zip_bytes),
        entry_path: entry_path.to_string(),
        argv: argv.to_vec(),
        env: env.clone(),
        timeout_ms,
    };
    let payload = serde_json::to_vec(&request)
        .map_err(|err| HostError::RunnerProtocol(format!("failed to encode request: {err}")))?;

    let mut command = Command::new(runner_path);
    command.env_clear();
    for key in retained_env_vars {
        if let Ok(value) = std::env::var(key) {
            command.env(key, value);
        }
    }
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(HostError::RunnerSpawn)?;

    let mut stdin = child.stdin.take().expect("piped stdin");
    stdin
        .write_all(&payload)
        .await
        .map_err(HostError::RunnerSpawn)?;
    drop(stdin);

    let mut child_stdout = child.stdout.take().expect("piped stdout");
    let mut child_stderr = child.stderr.take().expect("piped stderr");
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        child_stdout.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        child_stderr.read_to_end(&mut buf).await.map(|_| buf)
    });

    match tokio::time::timeout(wall_clock_timeout, child.wait()).await {
        Ok(result) => {
            result.map_err(HostError::RunnerSpawn)?;
        }
        Err(_) => {
            warn!("sandbox runner exceeded its wall-clock budget; killing it");
            let _ = child.kill().await;
            let _ = child.wait().await;
            return Err(HostError::RunnerWallClockTimeout);
        }
    }

    let stdout_bytes = stdout_task
        .await
        .map_err(|err| HostError::RunnerProtocol(format!("failed to read stdout: {err}")))?
        .map_err(HostError::RunnerSpawn)?;
    let stderr_bytes = stderr_task
        .await
        .map_err(|err| HostError::RunnerProtocol(format!("failed to read stderr: {err}")))?
        .map_err(HostError::RunnerSpawn)?;

    if !stderr_bytes.is_empty() {
        debug!(stderr = %String::from_utf8_lossy(&stderr_bytes), "sandbox runner logs");
    }

    let stdout = String::from_utf8_lossy(&stdout_bytes);
    let response: ExecuteResponse = serde_json::from_str(stdout.trim()).map_err(|err| {
        HostError::RunnerProtocol(format!("malformed response ({err}): {stdout}"))
    })?;

    match response {
        ExecuteResponse::Ok {
            stdout,
            stderr,
            exit_code,
            zip_base64,
        } => {
            let zip_bytes = base64::engine::general_purpose::STANDARD
                .decode(&zip_base64)
                .map_err(|err| HostError::RunnerProtocol(format!("invalid zipBase64 in response: {err}")))?;
            Ok(RunOutcome {
                stdout,
                stderr,
                exit_code,
                zip_bytes,
            })
        }
        ExecuteResponse::Err { error, exit_code } => {
            if exit_code == 124 {
                Err(HostError::RunnerWallClockTimeout)
            } else {
                Err(HostError::RunnerProtocol(error))
            }
        }
    }
}
