use wsk_commons::WskError;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error(transparent)]
    Vfs(#[from] WskError),
    #[error("bundle failure resolving '{specifier}' from '{importer}': {reason}")]
    Resolution {
        specifier: String,
        importer: String,
        reason: String,
    },
    #[error("blocked import '{0}'")]
    BlockedImport(String),
    #[error("script timed out")]
    Timeout,
    #[error("script execution failed: {0}")]
    Runtime(String),
}

impl SandboxError {
    pub fn code(&self) -> &'static str {
        match self {
            SandboxError::Vfs(err) => err.kind.code(),
            SandboxError::Resolution { .. } => "bundle-failure",
            SandboxError::BlockedImport(_) => "access-denied",
            SandboxError::Timeout => "timeout",
            SandboxError::Runtime(_) => "bundle-failure",
        }
    }
}
