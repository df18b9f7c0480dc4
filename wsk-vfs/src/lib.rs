//! In-memory POSIX file tree, persisted as a ZIP container.
//!
//! [`Workspace`] holds the mapping file-path -> bytes and the set of
//! directory paths. All public operations accept already- or
//! not-yet-normalized paths and normalize them via [`wsk_commons::normalize`]
//! before touching internal state; internal code assumes canonical form.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};

use tracing::{debug, warn};
use wsk_commons::{normalize, ErrorKind, WskError};

/// The kind of entry returned by [`Workspace::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// Result of [`Workspace::stat`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stat {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
}

/// The in-memory workspace state: a file-path -> bytes mapping, and the set
/// of directory paths. `/` is always present in the directory set.
#[derive(Debug, Clone)]
pub struct Workspace {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// An empty workspace containing only the root directory.
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert("/".to_string());
        Self {
            files: BTreeMap::new(),
            dirs,
        }
    }

    fn ensure_ancestors(&mut self, path: &str) {
        let mut current = wsk_commons::dirname(path);
        loop {
            let newly_inserted = self.dirs.insert(current.clone());
            if current == "/" || !newly_inserted {
                // Root, or already present — ancestors of an already-present
                // directory are present too by invariant.
                break;
            }
            current = wsk_commons::dirname(&current);
        }
    }

    /// `stat(p)` — file or directory info, or `None` if nothing exists there.
    pub fn stat(&self, path: &str) -> Option<Stat> {
        let p = normalize(path);
        if let Some(bytes) = self.files.get(&p) {
            return Some(Stat {
                kind: EntryKind::File,
                size: bytes.len() as u64,
            });
        }
        if self.dirs.contains(&p) {
            return Some(Stat {
                kind: EntryKind::Dir,
                size: 0,
            });
        }
        None
    }

    /// `list(p)` — sorted unique names of immediate children of directory `p`.
    pub fn list(&self, path: &str) -> Result<Vec<String>, WskError> {
        let p = normalize(path);
        if !self.dirs.contains(&p) {
            if self.files.contains_key(&p) {
                return Err(WskError::not_a_directory(&p));
            }
            return Err(WskError::not_found(&p));
        }

        let mut names: BTreeSet<String> = BTreeSet::new();
        for file_path in self.files.keys() {
            if file_path != &p && wsk_commons::dirname(file_path) == p {
                names.insert(wsk_commons::basename(file_path));
            }
        }
        for dir_path in &self.dirs {
            if dir_path != &p && wsk_commons::dirname(dir_path) == p {
                names.insert(wsk_commons::basename(dir_path));
            }
        }
        Ok(names.into_iter().collect())
    }

    /// `readFile(p)` — raw bytes of a file.
    pub fn read_file(&self, path: &str) -> Result<&[u8], WskError> {
        let p = normalize(path);
        self.files
            .get(&p)
            .map(|bytes| bytes.as_slice())
            .ok_or_else(|| WskError::not_found(&p))
    }

    /// `writeFile(p, data, overwrite)` — materializes ancestor directories.
    pub fn write_file(&mut self, path: &str, data: &[u8], overwrite: bool) -> Result<(), WskError> {
        let p = normalize(path);
        if p == "/" {
            return Err(WskError::already_exists(&p));
        }
        if self.dirs.contains(&p) {
            return Err(WskError::already_exists(&p));
        }
        if !overwrite && self.files.contains_key(&p) {
            return Err(WskError::already_exists(&p));
        }
        self.ensure_ancestors(&p);
        self.files.insert(p, data.to_vec());
        Ok(())
    }

    /// `mkdir(p, recursive)`.
    pub fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), WskError> {
        let p = normalize(path);
        if self.files.contains_key(&p) {
            return Err(WskError::already_exists(&p));
        }
        if self.dirs.contains(&p) {
            return Ok(());
        }
        if !recursive {
            let parent = wsk_commons::dirname(&p);
            if !self.dirs.contains(&parent) {
                return Err(WskError::not_found(&parent));
            }
        }
        self.ensure_ancestors(&p);
        self.dirs.insert(p);
        Ok(())
    }

    /// `delete(p)` — refuses on `/`, fails on a non-empty directory.
    pub fn delete(&mut self, path: &str) -> Result<(), WskError> {
        let p = normalize(path);
        if p == "/" {
            return Err(WskError::not_found("/"));
        }
        if self.files.remove(&p).is_some() {
            return Ok(());
        }
        if self.dirs.contains(&p) {
            let prefix = format!("{p}/");
            let has_file_child = self.files.keys().any(|f| f.starts_with(&prefix));
            let has_dir_child = self.dirs.iter().any(|d| d != &p && d.starts_with(&prefix));
            if has_file_child || has_dir_child {
                return Err(WskError::non_empty(&p));
            }
            self.dirs.remove(&p);
            return Ok(());
        }
        Err(WskError::not_found(&p))
    }

    /// Raw, read-only view of the file mapping (path -> bytes), used by the
    /// time machine and by whole-workspace diffing.
    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    /// Raw, read-only view of the directory set.
    pub fn dirs(&self) -> &BTreeSet<String> {
        &self.dirs
    }

    /// `importZip(buf)` — replaces all current state.
    pub fn import_zip(&mut self, buf: &[u8]) -> Result<(), WskError> {
        let cursor = Cursor::new(buf);
        let mut archive = zip::ZipArchive::new(cursor)
            .map_err(|err| WskError::corrupt_archive(format!("invalid zip: {err}")))?;

        let mut files = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|err| WskError::corrupt_archive(format!("bad entry {i}: {err}")))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut data)
                .map_err(|err| WskError::corrupt_archive(format!("reading {name}: {err}")))?;
            files.insert(normalize(&name), data);
        }

        let mut dirs = BTreeSet::new();
        dirs.insert("/".to_string());
        self.files = BTreeMap::new();
        self.dirs = dirs;
        for (path, data) in files {
            self.ensure_ancestors(&path);
            self.files.insert(path, data);
        }
        debug!(files = self.files.len(), "imported workspace from zip");
        Ok(())
    }

    /// `exportZipBuffer()` — emits file entries only; directories are
    /// implicit in member paths.
    pub fn export_zip_buffer(&self) -> Result<Vec<u8>, WskError> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (path, data) in &self.files {
                let member = path.trim_start_matches('/');
                writer
                    .start_file(member, options)
                    .map_err(|err| WskError::corrupt_archive(format!("writing {member}: {err}")))?;
                writer
                    .write_all(data)
                    .map_err(|err| WskError::corrupt_archive(format!("writing {member}: {err}")))?;
            }
            writer
                .finish()
                .map_err(|err| WskError::corrupt_archive(format!("finalizing zip: {err}")))?;
        }
        Ok(buf)
    }

    /// Load from a ZIP byte buffer, or start empty if `buf` is `None`.
    pub fn load(buf: Option<&[u8]>) -> Result<Self, WskError> {
        let mut ws = Workspace::new();
        if let Some(bytes) = buf {
            ws.import_zip(bytes)?;
        } else {
            warn!("no existing archive; starting an empty workspace");
        }
        Ok(ws)
    }
}

/// True if `kind` is [`ErrorKind::NotFound`] — a small convenience used by
/// callers that want to treat "doesn't exist" as non-fatal.
pub fn is_not_found(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_ancestor_of_a_file_is_a_directory() {
        let mut ws = Workspace::new();
        ws.write_file("/a/b/c", b"x", true).unwrap();
        assert!(ws.dirs().contains("/"));
        assert!(ws.dirs().contains("/a"));
        assert!(ws.dirs().contains("/a/b"));
    }

    #[test]
    fn write_then_read_roundtrips_bytes() {
        let mut ws = Workspace::new();
        ws.write_file("~/data/in.csv", b"a,b\n1,2\n", true).unwrap();
        assert_eq!(ws.read_file("/data/in.csv").unwrap(), b"a,b\n1,2\n");
    }

    #[test]
    fn write_without_overwrite_fails_on_existing_file() {
        let mut ws = Workspace::new();
        ws.write_file("/a", b"1", true).unwrap();
        let err = ws.write_file("/a", b"2", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[test]
    fn list_returns_sorted_unique_children() {
        let mut ws = Workspace::new();
        ws.write_file("/a/x", b"1", true).unwrap();
        ws.write_file("/a/y", b"1", true).unwrap();
        ws.mkdir("/a/z", true).unwrap();
        assert_eq!(ws.list("/a").unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn list_on_file_is_not_a_directory() {
        let mut ws = Workspace::new();
        ws.write_file("/a", b"1", true).unwrap();
        let err = ws.list("/a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotADirectory);
    }

    #[test]
    fn delete_empty_directory_then_stat_is_none() {
        let mut ws = Workspace::new();
        ws.mkdir("/a", true).unwrap();
        ws.delete("/a").unwrap();
        assert!(ws.stat("/a").is_none());
    }

    #[test]
    fn delete_non_empty_directory_fails() {
        let mut ws = Workspace::new();
        ws.write_file("/a/b", b"1", true).unwrap();
        let err = ws.delete("/a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonEmpty);
    }

    #[test]
    fn root_cannot_be_deleted() {
        let mut ws = Workspace::new();
        let err = ws.delete("/").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn mkdir_non_recursive_requires_existing_parent() {
        let mut ws = Workspace::new();
        let err = ws.mkdir("/a/b", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        ws.mkdir("/a", false).unwrap();
        ws.mkdir("/a/b", false).unwrap();
    }

    #[test]
    fn zip_roundtrip_preserves_file_mapping() {
        let mut ws = Workspace::new();
        ws.write_file("/a/b.txt", b"hello", true).unwrap();
        ws.write_file("/c.txt", b"world", true).unwrap();
        let buf = ws.export_zip_buffer().unwrap();

        let mut ws2 = Workspace::new();
        ws2.import_zip(&buf).unwrap();
        assert_eq!(ws2.files(), ws.files());
    }

    #[test]
    fn import_zip_synthesizes_ancestor_directories() {
        let mut ws = Workspace::new();
        ws.write_file("/a/b/c.txt", b"x", true).unwrap();
        let buf = ws.export_zip_buffer().unwrap();

        let mut ws2 = Workspace::new();
        ws2.import_zip(&buf).unwrap();
        assert!(ws2.dirs().contains("/a"));
        assert!(ws2.dirs().contains("/a/b"));
    }
}
