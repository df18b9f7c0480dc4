//! Host session: owns a workspace's lifecycle end to end — atomic ZIP
//! persistence, routing tool calls through the time machine, and spawning
//! the sandbox runner process for `execute`.

pub mod config;
pub mod error;
pub mod persistence;
pub mod sandbox_client;
pub mod session;

pub use config::{HostConfig, RetentionOverride};
pub use error::HostError;
pub use session::{ExecuteResult, HostSession, SnapshotSummary};
