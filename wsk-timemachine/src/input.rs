//! Before/after snapshots supplied by a caller to [`crate::record`].

use std::collections::{BTreeMap, BTreeSet};

/// Partial before/after snapshots of a single mutation. Callers only need
/// to include the paths their operation could plausibly have touched.
#[derive(Debug, Clone, Default)]
pub struct ChangeInput {
    pub before_files: BTreeMap<String, Vec<u8>>,
    pub after_files: BTreeMap<String, Vec<u8>>,
    pub before_dirs: BTreeSet<String>,
    pub after_dirs: BTreeSet<String>,
}

impl ChangeInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a single file path before and/or after a mutation, as
    /// captured by the host session around a single TF call.
    pub fn single_file(
        path: &str,
        before: Option<Vec<u8>>,
        after: Option<Vec<u8>>,
        dir_before_existed: bool,
        dir_after_existed: bool,
    ) -> Self {
        let mut input = Self::new();
        if let Some(bytes) = before {
            input.before_files.insert(path.to_string(), bytes);
        }
        if let Some(bytes) = after {
            input.after_files.insert(path.to_string(), bytes);
        }
        if dir_before_existed {
            input.before_dirs.insert(path.to_string());
        }
        if dir_after_existed {
            input.after_dirs.insert(path.to_string());
        }
        input
    }
}
