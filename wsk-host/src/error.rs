//! Host-level error taxonomy: wraps failures from every subsystem the
//! session orchestrates (the virtual filesystem, the time machine, and the
//! sandboxed process) plus its own persistence and protocol failures.

use wsk_commons::WskError;
use wsk_timemachine::TmError;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Vfs(#[from] WskError),
    #[error(transparent)]
    TimeMachine(#[from] TmError),
    #[error("failed to persist workspace at {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sandbox runner failed to start: {0}")]
    RunnerSpawn(std::io::Error),
    #[error("sandbox runner produced malformed output: {0}")]
    RunnerProtocol(String),
    #[error("sandbox runner exceeded its wall-clock budget")]
    RunnerWallClockTimeout,
}

impl HostError {
    /// The stable error code surfaced to external callers, mirroring
    /// `ErrorKind::code()` for host-specific failure modes.
    pub fn code(&self) -> &'static str {
        match self {
            HostError::Vfs(err) => err.kind.code(),
            HostError::TimeMachine(TmError::Vfs(err)) => err.kind.code(),
            HostError::TimeMachine(_) => "protocol-failure",
            HostError::Persist { .. } => "protocol-failure",
            HostError::RunnerSpawn(_) => "protocol-failure",
            HostError::RunnerProtocol(_) => "protocol-failure",
            HostError::RunnerWallClockTimeout => "timeout",
        }
    }
}
