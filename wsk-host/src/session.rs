//! The host session: owns the workspace's lifecycle, routes every tool call
//! through snapshot-then-record-then-persist, and drives guest script
//! execution in a separate sandbox process.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;
use wsk_commons::{dirname, normalize, WskError};
use wsk_timemachine::{ChangeInput, DiffResult, EntrySummary};
use wsk_tools::{
    Encoding, PatchResult, ReadLinesResult, ReadResult, SearchParams, SearchSummary,
};
use wsk_vfs::{Stat, Workspace};

use crate::config::HostConfig;
use crate::error::HostError;
use crate::persistence::{load_archive, save_archive};
use crate::sandbox_client;

/// Diagnostic snapshot of the workspace, per the host's `snapshot_summary`
/// surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SnapshotSummary {
    #[serde(rename = "fileCount")]
    pub file_count: usize,
    #[serde(rename = "dirCount")]
    pub dir_count: usize,
    #[serde(rename = "historyEntryCount")]
    pub history_entry_count: usize,
    pub cursor: usize,
}

/// Result of a single `execute` call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecuteResult {
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
}

/// A single mutation's before/after snapshot of one path: its file bytes (if
/// it is or was a file) and whether it is or was a directory.
struct PathSnapshot {
    bytes: Option<Vec<u8>>,
    is_dir: bool,
}

pub struct HostSession {
    ws: Workspace,
    config: HostConfig,
}

impl HostSession {
    /// Load (or create) the workspace archive at `config.zip_path`.
    pub fn open(config: HostConfig) -> Result<Self, HostError> {
        let archive = load_archive(&config.zip_path)?;
        let ws = Workspace::load(archive.as_deref())?;
        let mut session = Self { ws, config };
        session.apply_retention_override()?;
        session.persist()?;
        Ok(session)
    }

    /// Merge `config.retention`'s overrides into the persisted time machine
    /// state, if any were configured.
    fn apply_retention_override(&mut self) -> Result<(), HostError> {
        let Some(overrides) = self.config.retention.clone() else {
            return Ok(());
        };
        let mut state = wsk_timemachine::io::load_state(&self.ws)?;
        if let Some(keep_recent) = overrides.keep_recent {
            state.retention.keep_recent = keep_recent;
        }
        if let Some(max_entries) = overrides.max_entries {
            state.retention.max_entries = max_entries;
        }
        if let Some(merge_group) = overrides.merge_group {
            state.retention.merge_group = merge_group;
        }
        wsk_timemachine::io::save_state(&mut self.ws, &state)?;
        Ok(())
    }

    fn persist(&mut self) -> Result<(), HostError> {
        let bytes = self.ws.export_zip_buffer()?;
        save_archive(&self.config.zip_path, &bytes)
    }

    fn snapshot_path(&self, path: &str) -> PathSnapshot {
        match self.ws.stat(path) {
            Some(stat) if stat.kind == wsk_vfs::EntryKind::File => PathSnapshot {
                bytes: self.ws.read_file(path).ok().map(|b| b.to_vec()),
                is_dir: false,
            },
            Some(_) => PathSnapshot {
                bytes: None,
                is_dir: true,
            },
            None => PathSnapshot {
                bytes: None,
                is_dir: false,
            },
        }
    }

    /// Wrap a mutating tool call with a before/after snapshot of `path`,
    /// recording the resulting change (if any) and persisting afterward.
    fn mutate<T>(
        &mut self,
        tool: &str,
        path: &str,
        op: impl FnOnce(&mut Workspace) -> Result<T, WskError>,
    ) -> Result<T, HostError> {
        let p = normalize(path);
        let before = self.snapshot_path(&p);
        let result = op(&mut self.ws)?;
        let after = self.snapshot_path(&p);

        let input = ChangeInput::single_file(
            &p,
            before.bytes,
            after.bytes,
            before.is_dir,
            after.is_dir,
        );
        if let Some(id) = wsk_timemachine::record(&mut self.ws, tool, "", &input)? {
            info!(tool, id, path = %p, "recorded mutation");
        }
        self.persist()?;
        Ok(result)
    }

    pub fn fs_read(&self, path: &str, encoding: Encoding, max_bytes: u64) -> Result<ReadResult, HostError> {
        Ok(wsk_tools::fs_read(&self.ws, path, encoding, max_bytes)?)
    }

    pub fn fs_read_lines(
        &self,
        path: &str,
        start_line: usize,
        end_line: usize,
        max_bytes: u64,
    ) -> Result<ReadLinesResult, HostError> {
        Ok(wsk_tools::fs_read_lines(&self.ws, path, start_line, end_line, max_bytes)?)
    }

    pub fn fs_list(&self, path: &str) -> Result<Vec<String>, HostError> {
        Ok(wsk_tools::fs_list(&self.ws, path)?)
    }

    pub fn fs_stat(&self, path: &str) -> Result<Option<Stat>, HostError> {
        Ok(wsk_tools::fs_stat(&self.ws, path)?)
    }

    pub fn fs_search(&self, params: &SearchParams) -> Result<SearchSummary, HostError> {
        Ok(wsk_tools::fs_search(&self.ws, params)?)
    }

    pub fn fs_write(
        &mut self,
        path: &str,
        content: &str,
        encoding: Encoding,
        overwrite: bool,
    ) -> Result<(), HostError> {
        self.mutate("fs_write", path, |ws| {
            wsk_tools::fs_write(ws, path, content, encoding, overwrite)
        })
    }

    pub fn fs_patch_lines(
        &mut self,
        path: &str,
        start_line: usize,
        end_line: usize,
        replacement: &str,
    ) -> Result<PatchResult, HostError> {
        self.mutate("fs_patch_lines", path, |ws| {
            wsk_tools::fs_patch_lines(ws, path, start_line, end_line, replacement)
        })
    }

    pub fn fs_mkdir(&mut self, path: &str, recursive: bool) -> Result<(), HostError> {
        self.mutate("fs_mkdir", path, |ws| wsk_tools::fs_mkdir(ws, path, recursive))
    }

    pub fn fs_delete(&mut self, path: &str) -> Result<(), HostError> {
        self.mutate("fs_delete", path, |ws| wsk_tools::fs_delete(ws, path))
    }

    pub fn history(&self) -> Result<Vec<EntrySummary>, HostError> {
        Ok(wsk_timemachine::history(&self.ws)?)
    }

    pub fn cursor(&self) -> Result<usize, HostError> {
        Ok(wsk_timemachine::cursor(&self.ws)?)
    }

    pub fn diff(&self, id: &str, max_files: usize, max_preview_lines: usize) -> Result<DiffResult, HostError> {
        Ok(wsk_timemachine::diff(&self.ws, id, max_files, max_preview_lines)?)
    }

    pub fn undo(&mut self, steps: usize) -> Result<usize, HostError> {
        let taken = wsk_timemachine::undo(&mut self.ws, steps)?;
        self.persist()?;
        Ok(taken)
    }

    pub fn redo(&mut self, steps: usize) -> Result<usize, HostError> {
        let taken = wsk_timemachine::redo(&mut self.ws, steps)?;
        self.persist()?;
        Ok(taken)
    }

    pub fn restore(&mut self, id: &str) -> Result<(), HostError> {
        wsk_timemachine::restore(&mut self.ws, id)?;
        self.persist()?;
        Ok(())
    }

    /// Run `entry_path` in the sandbox, applying the resulting workspace
    /// archive (if any) back onto this session and recording it as a single
    /// history entry.
    pub async fn execute(
        &mut self,
        entry_path: &str,
        argv: &[String],
        env: &std::collections::BTreeMap<String, String>,
        timeout_ms: Option<u64>,
    ) -> Result<ExecuteResult, HostError> {
        let timeout_ms = timeout_ms.unwrap_or(self.config.default_timeout_ms);
        let wall_clock_timeout =
            Duration::from_millis(timeout_ms) + Duration::from_millis(self.config.execute_slack_ms);

        let before_files = self.ws.files().clone();
        let before_dirs = self.ws.dirs().clone();
        let zip_bytes = self.ws.export_zip_buffer()?;

        let runner_path: PathBuf = self.config.sandbox_runner_path.clone();
        let outcome = sandbox_client::execute(
            &runner_path,
            &zip_bytes,
            entry_path,
            argv,
            env,
            timeout_ms,
            wall_clock_timeout,
            &self.config.retained_env_vars,
        )
        .await?;

        self.ws.import_zip(&outcome.zip_bytes)?;

        let mut input = ChangeInput::new();
        let mut paths: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        paths.extend(before_files.keys().cloned());
        paths.extend(self.ws.files().keys().cloned());
        for path in paths {
            if let Some(bytes) = before_files.get(&path) {
                input.before_files.insert(path.clone(), bytes.clone());
            }
            if let Some(bytes) = self.ws.files().get(&path) {
                input.after_files.insert(path.clone(), bytes.clone());
            }
        }
        let mut dir_paths: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        dir_paths.extend(before_dirs.iter().cloned());
        dir_paths.extend(self.ws.dirs().iter().cloned());
        for path in dir_paths {
            if before_dirs.contains(&path) {
                input.before_dirs.insert(path.clone());
            }
            if self.ws.dirs().contains(&path) {
                input.after_dirs.insert(path);
            }
        }

        if let Some(id) = wsk_timemachine::record(&mut self.ws, "execute", entry_path, &input)? {
            info!(id, entry_path, "recorded execute side effects");
        }
        self.persist()?;

        Ok(ExecuteResult {
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            exit_code: outcome.exit_code,
        })
    }

    pub fn snapshot_summary(&self) -> Result<SnapshotSummary, HostError> {
        Ok(SnapshotSummary {
            file_count: self.ws.files().len(),
            dir_count: self.ws.dirs().len(),
            history_entry_count: self.history()?.len(),
            cursor: self.cursor()?,
        })
    }
}

/// Parent directory of `path`, used by callers that want to pre-check
/// ancestry before a mutating call (kept as a thin re-export so callers
/// don't need to depend on `wsk-commons` directly for this one helper).
pub fn parent_of(path: &str) -> String {
    dirname(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn open_session(dir: &tempfile::TempDir) -> HostSession {
        let config = HostConfig::new(dir.path().join("ws.zip"));
        HostSession::open(config).unwrap()
    }

    #[test]
    fn write_then_read_round_trips_through_the_session() {
        let dir = tempdir().unwrap();
        let mut session = open_session(&dir);
        session.fs_write("/a.txt", "hello", Encoding::Text, true).unwrap();
        let result = session.fs_read("/a.txt", Encoding::Text, u64::MAX).unwrap();
        assert_eq!(result.content, "hello");
    }

    #[test]
    fn a_write_is_recorded_and_undoable() {
        let dir = tempdir().unwrap();
        let mut session = open_session(&dir);
        session.fs_write("/a.txt", "v1", Encoding::Text, true).unwrap();
        session.fs_write("/a.txt", "v2", Encoding::Text, true).unwrap();
        assert_eq!(session.history().unwrap().len(), 2);

        session.undo(1).unwrap();
        let result = session.fs_read("/a.txt", Encoding::Text, u64::MAX).unwrap();
        assert_eq!(result.content, "v1");
    }

    #[test]
    fn reopening_the_session_restores_prior_state() {
        let dir = tempdir().unwrap();
        {
            let mut session = open_session(&dir);
            session.fs_write("/a.txt", "persisted", Encoding::Text, true).unwrap();
        }
        let config = HostConfig::new(dir.path().join("ws.zip"));
        let reopened = HostSession::open(config).unwrap();
        let result = reopened.fs_read("/a.txt", Encoding::Text, u64::MAX).unwrap();
        assert_eq!(result.content, "persisted");
    }

    #[test]
    fn mkdir_then_delete_is_reversible() {
        let dir = tempdir().unwrap();
        let mut session = open_session(&dir);
        session.fs_mkdir("/sub", true).unwrap();
        assert!(session.fs_stat("/sub").unwrap().is_some());
        session.fs_delete("/sub").unwrap();
        assert!(session.fs_stat("/sub").unwrap().is_none());
        session.undo(1).unwrap();
        assert!(session.fs_stat("/sub").unwrap().is_some());
    }

    #[test]
    fn snapshot_summary_counts_files_and_history() {
        let dir = tempdir().unwrap();
        let mut session = open_session(&dir);
        session.fs_write("/a.txt", "x", Encoding::Text, true).unwrap();
        let summary = session.snapshot_summary().unwrap();
        assert_eq!(summary.file_count, 1);
        assert_eq!(summary.history_entry_count, 1);
        assert_eq!(summary.cursor, 1);
    }

    #[test]
    fn retention_override_bounds_entry_count() {
        let dir = tempdir().unwrap();
        let mut config = HostConfig::new(dir.path().join("ws.zip"));
        config.retention = Some(crate::config::RetentionOverride {
            keep_recent: Some(2),
            max_entries: Some(5),
            merge_group: Some(3),
        });
        let mut session = HostSession::open(config).unwrap();

        let mut previous = None;
        for i in 0..10 {
            let value = format!("v{i}");
            session.fs_write("/a", &value, Encoding::Text, true).unwrap();
            previous = Some(value);
        }

        let history = session.history().unwrap();
        assert!(history.len() <= 5);
        assert!(history.iter().any(|entry| entry.compacted));
        let result = session.fs_read("/a", Encoding::Text, u64::MAX).unwrap();
        assert_eq!(Some(result.content), previous);
    }

    #[test]
    fn reserved_namespace_write_is_rejected_before_any_recording() {
        let dir = tempdir().unwrap();
        let mut session = open_session(&dir);
        let err = session.fs_write("/.time/x", "y", Encoding::Text, true).unwrap_err();
        assert_eq!(err.code(), "access-denied");
        assert!(session.history().unwrap().is_empty());
    }
}
