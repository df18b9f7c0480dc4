//! Applying an entry's before or after side back onto the workspace, and
//! the undo/redo/restore operations built on top of it.

use tracing::{debug, info};
use wsk_vfs::Workspace;

use crate::blobs::read_blob;
use crate::entry::{Change, Entry};
use crate::error::TmError;
use crate::io::{ensure_namespace, load_entry, load_state, save_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// Apply one side of `entry`'s recorded changes onto `ws`.
pub fn apply(ws: &mut Workspace, entry: &Entry, side: Side) -> Result<(), TmError> {
    let mut dirs_to_create = Vec::new();
    let mut dirs_to_delete = Vec::new();

    for change in &entry.changes {
        match change {
            Change::File {
                path,
                before_exists,
                after_exists,
                before_blob,
                after_blob,
                ..
            } => {
                let (exists, blob) = match side {
                    Side::Before => (*before_exists, before_blob.as_deref()),
                    Side::After => (*after_exists, after_blob.as_deref()),
                };
                if exists {
                    let bytes = read_blob(ws, blob.expect("existing side always has a blob"))?;
                    ws.write_file(path, &bytes, true)?;
                } else if ws.stat(path).is_some() {
                    ws.delete(path)?;
                }
            }
            Change::Dir {
                path,
                before_exists,
                after_exists,
            } => {
                let wants = match side {
                    Side::Before => *before_exists,
                    Side::After => *after_exists,
                };
                if wants {
                    dirs_to_create.push(path.clone());
                } else {
                    dirs_to_delete.push(path.clone());
                }
            }
        }
    }

    dirs_to_create.sort_by_key(|p| p.len());
    for path in &dirs_to_create {
        ws.mkdir(path, true)?;
    }

    dirs_to_delete.sort_by_key(|p| std::cmp::Reverse(p.len()));
    for path in &dirs_to_delete {
        // Best-effort: unrelated files may still live under this directory.
        let _ = ws.delete(path);
    }

    Ok(())
}

/// Undo up to `steps` entries, applying each entry's `before` side in
/// reverse chronological order. Returns the number of steps actually taken.
pub fn undo(ws: &mut Workspace, steps: usize) -> Result<usize, TmError> {
    ensure_namespace(ws)?;
    let mut state = load_state(ws)?;
    let mut taken = 0;

    for _ in 0..steps {
        if state.cursor == 0 {
            break;
        }
        let id = state.entries[state.cursor - 1].id.clone();
        let entry = load_entry(ws, &id)?;
        apply(ws, &entry, Side::Before)?;
        state.cursor -= 1;
        taken += 1;
    }

    if taken > 0 {
        save_state(ws, &state)?;
        info!(taken, cursor = state.cursor, "undid history entries");
    }
    Ok(taken)
}

/// Redo up to `steps` entries, applying each entry's `after` side in
/// chronological order. Returns the number of steps actually taken.
pub fn redo(ws: &mut Workspace, steps: usize) -> Result<usize, TmError> {
    ensure_namespace(ws)?;
    let mut state = load_state(ws)?;
    let mut taken = 0;

    for _ in 0..steps {
        if state.cursor >= state.entries.len() {
            break;
        }
        let id = state.entries[state.cursor].id.clone();
        let entry = load_entry(ws, &id)?;
        apply(ws, &entry, Side::After)?;
        state.cursor += 1;
        taken += 1;
    }

    if taken > 0 {
        save_state(ws, &state)?;
        info!(taken, cursor = state.cursor, "redid history entries");
    }
    Ok(taken)
}

/// Move the cursor to just after `id`'s entry, undoing or redoing as needed.
pub fn restore(ws: &mut Workspace, id: &str) -> Result<(), TmError> {
    ensure_namespace(ws)?;
    let state = load_state(ws)?;
    let index = state
        .entries
        .iter()
        .position(|summary| summary.id == id)
        .ok_or_else(|| TmError::UnknownEntry(id.to_string()))?;

    let target = index + 1;
    if target < state.cursor {
        undo(ws, state.cursor - target)?;
    } else if target > state.cursor {
        redo(ws, target - state.cursor)?;
    } else {
        debug!(id, "restore target already current; nothing to do");
    }
    Ok(())
}
