//! Shared path algebra and error taxonomy reused across the agent
//! workspace crates.

pub mod error;
pub mod path;

pub use error::{ErrorKind, ToolError, WskError};
pub use path::{basename, dirname, is_reserved, join, normalize, RESERVED_PREFIX};
