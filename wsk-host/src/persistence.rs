//! Atomic ZIP persistence: write to a sibling temp file, then rename over
//! the target. A rename that loses a race against a concurrent writer is
//! retried once after removing the stale target.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::HostError;

/// Load the workspace archive at `path`, or start empty if it doesn't exist
/// yet (first run).
pub fn load_archive(path: &Path) -> Result<Option<Vec<u8>>, HostError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no existing archive; starting empty");
            Ok(None)
        }
        Err(err) => Err(HostError::Persist {
            path: path.display().to_string(),
            source: err,
        }),
    }
}

/// Persist `bytes` to `path` atomically.
pub fn save_archive(path: &Path, bytes: &[u8]) -> Result<(), HostError> {
    let persist_err = |source: std::io::Error| HostError::Persist {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }
    }

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, bytes).map_err(persist_err)?;

    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            warn!(path = %path.display(), "rename raced a concurrent writer; retrying");
            let _ = fs::remove_file(path);
            fs::rename(&tmp_path, path).map_err(persist_err)
        }
    }
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workspace.zip".to_string());
    path.with_file_name(format!("{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_bytes_through_an_atomic_rename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ws.zip");
        save_archive(&path, b"hello").unwrap();
        assert_eq!(load_archive(&path).unwrap(), Some(b"hello".to_vec()));
        assert!(!tmp_path_for(&path).exists());
    }

    #[test]
    fn missing_archive_loads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.zip");
        assert_eq!(load_archive(&path).unwrap(), None);
    }

    #[test]
    fn save_overwrites_a_previous_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ws.zip");
        save_archive(&path, b"v1").unwrap();
        save_archive(&path, b"v2").unwrap();
        assert_eq!(load_archive(&path).unwrap(), Some(b"v2".to_vec()));
    }
}
