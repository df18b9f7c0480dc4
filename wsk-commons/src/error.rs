//! Canonical error taxonomy for the agent workspace.
//!
//! Every component-level failure surfaces to an external caller as a
//! `{ok:false, error, code}` object. `WskError` is the typed form; `code()`
//! gives the stable string used in that object.

use std::fmt;

/// Error kinds from spec §7, one per distinct failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    NotFound,
    NotADirectory,
    NonEmpty,
    AlreadyExists,
    TooLarge,
    AccessDenied,
    BundleFailure,
    Timeout,
    ProtocolFailure,
    CorruptArchive,
}

impl ErrorKind {
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::NotADirectory => "not-a-directory",
            ErrorKind::NonEmpty => "non-empty",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::TooLarge => "too-large",
            ErrorKind::AccessDenied => "access-denied",
            ErrorKind::BundleFailure => "bundle-failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProtocolFailure => "protocol-failure",
            ErrorKind::CorruptArchive => "corrupt-archive",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct WskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl WskError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("no file or directory at '{path}'"))
    }

    pub fn not_a_directory(path: &str) -> Self {
        Self::new(ErrorKind::NotADirectory, format!("'{path}' is not a directory"))
    }

    pub fn non_empty(path: &str) -> Self {
        Self::new(ErrorKind::NonEmpty, format!("directory '{path}' is not empty"))
    }

    pub fn already_exists(path: &str) -> Self {
        Self::new(ErrorKind::AlreadyExists, format!("'{path}' already exists"))
    }

    pub fn too_large(path: &str, max_bytes: u64) -> Self {
        Self::new(
            ErrorKind::TooLarge,
            format!("'{path}' exceeds the {max_bytes} byte limit"),
        )
    }

    pub fn access_denied(path: &str) -> Self {
        Self::new(
            ErrorKind::AccessDenied,
            format!("'{path}' is in the reserved namespace"),
        )
    }

    pub fn bundle_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BundleFailure, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn protocol_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolFailure, message)
    }

    pub fn corrupt_archive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CorruptArchive, message)
    }
}

/// The `{ok, error, code}` shape every tool invocation resolves to.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolError {
    pub ok: bool,
    pub error: String,
    pub code: Option<String>,
}

impl From<&WskError> for ToolError {
    fn from(err: &WskError) -> Self {
        ToolError {
            ok: false,
            error: err.message.clone(),
            code: Some(err.kind.code().to_string()),
        }
    }
}

impl From<WskError> for ToolError {
    fn from(err: WskError) -> Self {
        ToolError::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_carries_code() {
        let err = WskError::not_found("/a/b");
        let tool_err: ToolError = err.into();
        assert!(!tool_err.ok);
        assert_eq!(tool_err.code.as_deref(), Some("not-found"));
    }
}
