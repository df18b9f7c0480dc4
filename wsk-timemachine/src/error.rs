use wsk_commons::WskError;

/// Time machine failures: either a workspace-level failure (propagated from
/// [`wsk_vfs::Workspace`]) or a (de)serialization failure of its own
/// persisted state.
#[derive(Debug, thiserror::Error)]
pub enum TmError {
    #[error(transparent)]
    Vfs(#[from] WskError),
    #[error("time machine state error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no such entry: {0}")]
    UnknownEntry(String),
}
