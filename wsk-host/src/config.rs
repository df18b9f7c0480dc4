//! `HostConfig` — the small, layered-with-defaults configuration surface
//! for a host session, loadable from TOML or built programmatically.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_timeout_ms() -> u64 {
    1500
}

fn default_runner_path() -> PathBuf {
    PathBuf::from("wsk-sandbox-runner")
}

fn default_execute_slack_ms() -> u64 {
    250
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionOverride {
    #[serde(rename = "keepRecent")]
    pub keep_recent: Option<usize>,
    #[serde(rename = "maxEntries")]
    pub max_entries: Option<usize>,
    #[serde(rename = "mergeGroup")]
    pub merge_group: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Path to the ZIP archive backing the workspace.
    #[serde(rename = "zipPath")]
    pub zip_path: PathBuf,
    /// Default inner script timeout for `execute`, used when a request
    /// omits `timeoutMs`.
    #[serde(rename = "defaultTimeoutMs", default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Slack added to the inner timeout to derive the host's wall-clock
    /// budget for the spawned sandbox process.
    #[serde(rename = "executeSlackMs", default = "default_execute_slack_ms")]
    pub execute_slack_ms: u64,
    /// Path to the `wsk-sandbox-runner` binary to spawn per `execute` call.
    #[serde(rename = "sandboxRunnerPath", default = "default_runner_path")]
    pub sandbox_runner_path: PathBuf,
    /// Environment variables preserved (not scrubbed) when spawning the
    /// sandbox runner process.
    #[serde(rename = "retainedEnvVars", default = "default_retained_env_vars")]
    pub retained_env_vars: Vec<String>,
    #[serde(rename = "retention", default)]
    pub retention: Option<RetentionOverride>,
}

fn default_retained_env_vars() -> Vec<String> {
    vec!["PATH".to_string(), "LANG".to_string()]
}

impl HostConfig {
    pub fn new(zip_path: PathBuf) -> Self {
        Self {
            zip_path,
            default_timeout_ms: default_timeout_ms(),
            execute_slack_ms: default_execute_slack_ms(),
            sandbox_runner_path: default_runner_path(),
            retained_env_vars: default_retained_env_vars(),
            retention: None,
        }
    }

    pub fn from_toml_str(zip_path: PathBuf, toml_str: &str) -> Result<Self, toml::de::Error> {
        let mut config: HostConfig = toml::from_str(toml_str)?;
        if config.zip_path.as_os_str().is_empty() {
            config.zip_path = zip_path;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_sandbox_protocol_defaults() {
        let config = HostConfig::new(PathBuf::from("/tmp/ws.zip"));
        assert_eq!(config.default_timeout_ms, 1500);
        assert_eq!(config.retained_env_vars, vec!["PATH", "LANG"]);
    }

    #[test]
    fn loads_partial_overrides_from_toml() {
        let toml_str = r#"
            zipPath = "/tmp/other.zip"
            defaultTimeoutMs = 3000
        "#;
        let config = HostConfig::from_toml_str(PathBuf::from("/tmp/ws.zip"), toml_str).unwrap();
        assert_eq!(config.zip_path, PathBuf::from("/tmp/other.zip"));
        assert_eq!(config.default_timeout_ms, 3000);
        assert_eq!(config.execute_slack_ms, 250);
    }
}
