//! Time Machine: a reversible history of workspace mutations, persisted
//! inside the workspace itself under `/.time`.
//!
//! Entry point for callers is [`record`] (write path) and
//! [`undo`]/[`redo`]/[`restore`]/[`diff`] (read/rewind paths). Everything
//! else is internal plumbing: [`io`] touches `/.time` directly (the one
//! place allowed to), [`blobs`] stores raw before/after byte copies, and
//! [`compaction`] keeps the journal bounded.

pub mod apply;
pub mod blobs;
pub mod compaction;
pub mod diff;
pub mod entry;
pub mod error;
pub mod id;
pub mod input;
pub mod io;
pub mod record;
pub mod state;

pub use apply::{redo, restore, undo, Side};
pub use diff::{diff, DiffResult, DirDiff, DirOp, FileDiff, FileOp};
pub use entry::{Change, Entry};
pub use error::TmError;
pub use input::ChangeInput;
pub use record::record;
pub use state::{EntrySummary, RetentionPolicy, TmState};

use wsk_vfs::Workspace;

/// The full ordered list of entry summaries, oldest first.
pub fn history(ws: &Workspace) -> Result<Vec<EntrySummary>, TmError> {
    Ok(io::load_state(ws)?.entries)
}

/// The current cursor: the count of entries considered "applied".
pub fn cursor(ws: &Workspace) -> Result<usize, TmError> {
    Ok(io::load_state(ws)?.cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wsk_vfs::Workspace;

    fn record_write(ws: &mut Workspace, path: &str, before: Option<&str>, after: &str) -> String {
        let before_bytes = before.map(|s| s.as_bytes().to_vec());
        let dir_existed = ws.stat(wsk_commons::dirname(path).as_str()).is_some();
        ws.write_file(path, after.as_bytes(), true).unwrap();
        let input = ChangeInput::single_file(
            path,
            before_bytes,
            Some(after.as_bytes().to_vec()),
            dir_existed,
            true,
        );
        record(ws, "fs_write", "", &input).unwrap().unwrap()
    }

    #[test]
    fn cursor_starts_and_ends_in_range() {
        let mut ws = Workspace::new();
        assert_eq!(cursor(&ws).unwrap(), 0);
        record_write(&mut ws, "/a", None, "v1");
        let state = io::load_state(&ws).unwrap();
        assert_eq!(state.cursor, state.entries.len());
    }

    #[test]
    fn undo_a_write_restores_previous_bytes() {
        let mut ws = Workspace::new();
        ws.write_file("/a", b"v1", true).unwrap();
        let input = ChangeInput::single_file("/a", None, Some(b"v1".to_vec()), false, true);
        record(&mut ws, "fs_write", "", &input).unwrap();
        let before_cursor = cursor(&ws).unwrap();

        record_write(&mut ws, "/a", Some("v1"), "v2");
        assert_eq!(ws.read_file("/a").unwrap(), b"v2");

        let taken = undo(&mut ws, 1).unwrap();
        assert_eq!(taken, 1);
        assert_eq!(ws.read_file("/a").unwrap(), b"v1");
        assert_eq!(cursor(&ws).unwrap(), before_cursor);
    }

    #[test]
    fn restore_across_a_gap_lands_on_the_requested_version() {
        let mut ws = Workspace::new();
        let id_v1 = record_write(&mut ws, "/f", None, "v1");
        let id_v2 = record_write(&mut ws, "/f", Some("v1"), "v2");
        let _id_v3 = record_write(&mut ws, "/f", Some("v2"), "v3");

        restore(&mut ws, &id_v2).unwrap();
        assert_eq!(ws.read_file("/f").unwrap(), b"v2");

        let state = io::load_state(&ws).unwrap();
        let index = state.entries.iter().position(|s| s.id == id_v2).unwrap();
        assert_eq!(state.cursor, index + 1);

        restore(&mut ws, &id_v1).unwrap();
        assert_eq!(ws.read_file("/f").unwrap(), b"v1");
    }

    #[test]
    fn undo_then_redo_from_head_is_byte_identical() {
        let mut ws = Workspace::new();
        record_write(&mut ws, "/a", None, "v1");
        record_write(&mut ws, "/a", Some("v1"), "v2");
        record_write(&mut ws, "/b", None, "other");

        let files_before = ws.files().clone();
        let dirs_before = ws.dirs().clone();

        undo(&mut ws, 3).unwrap();
        redo(&mut ws, 3).unwrap();

        assert_eq!(ws.files(), &files_before);
        assert_eq!(ws.dirs(), &dirs_before);
    }

    #[test]
    fn no_op_mutation_records_nothing() {
        let mut ws = Workspace::new();
        ws.write_file("/a", b"same", true).unwrap();
        let input = ChangeInput::single_file("/a", Some(b"same".to_vec()), Some(b"same".to_vec()), true, true);
        let result = record(&mut ws, "fs_write", "", &input).unwrap();
        assert!(result.is_none());
        assert_eq!(cursor(&ws).unwrap(), 0);
    }

    #[test]
    fn recording_while_not_at_head_discards_redo_tail() {
        let mut ws = Workspace::new();
        record_write(&mut ws, "/a", None, "v1");
        record_write(&mut ws, "/a", Some("v1"), "v2");
        undo(&mut ws, 1).unwrap();
        assert_eq!(cursor(&ws).unwrap(), 1);

        record_write(&mut ws, "/a", Some("v1"), "v3");
        let state = io::load_state(&ws).unwrap();
        assert_eq!(state.entries.len(), 2);
        assert_eq!(state.cursor, 2);
        assert_eq!(ws.read_file("/a").unwrap(), b"v3");
    }

    #[test]
    fn diff_reports_a_single_line_file_addition() {
        let mut ws = Workspace::new();
        let id = record_write(&mut ws, "/a.txt", None, "hello\n");
        let result = diff(&ws, &id, 10, 10).unwrap();
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].op, FileOp::Add);
        assert!(!result.files[0].binary);
    }

    #[test]
    fn compaction_bounds_entry_count() {
        let mut ws = Workspace::new();
        {
            let mut state = io::load_state(&ws).unwrap();
            state.retention = RetentionPolicy {
                keep_recent: 2,
                max_entries: 5,
                merge_group: 3,
            };
            io::save_state(&mut ws, &state).unwrap();
        }

        let mut previous = None;
        for i in 0..10 {
            let value = format!("v{i}");
            previous = Some(record_write(&mut ws, "/a", previous.as_deref(), &value));
        }

        let state = io::load_state(&ws).unwrap();
        assert!(state.entries.len() <= 5);
        assert!(state.entries.iter().any(|e| e.compacted));
        assert_eq!(ws.read_file("/a").unwrap(), b"v9");
    }
}
