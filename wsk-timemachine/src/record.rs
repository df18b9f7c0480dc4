//! `record` — the write path that turns a before/after snapshot into a
//! journal entry.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info};
use wsk_commons::is_reserved;
use wsk_vfs::Workspace;

use crate::blobs::{delete_blob_subtree, write_blob};
use crate::compaction::compact;
use crate::entry::{Change, Entry};
use crate::error::TmError;
use crate::id::generate;
use crate::input::ChangeInput;
use crate::io::{delete_entry, ensure_namespace, load_state, save_entry, save_state};
use crate::state::EntrySummary;

/// Record `tool`'s mutation described by `input`. Returns the new entry id,
/// or `None` if the before/after snapshot contained no actual changes.
pub fn record(
    ws: &mut Workspace,
    tool: &str,
    note: &str,
    input: &ChangeInput,
) -> Result<Option<String>, TmError> {
    ensure_namespace(ws)?;
    let mut state = load_state(ws)?;

    if state.cursor < state.entries.len() {
        let discarded: Vec<String> = state.entries[state.cursor..]
            .iter()
            .map(|summary| summary.id.clone())
            .collect();
        for id in &discarded {
            delete_entry(ws, id);
            delete_blob_subtree(ws, id);
        }
        state.entries.truncate(state.cursor);
        debug!(count = discarded.len(), "discarded redo tail before recording");
    }

    let mut changed_files = Vec::new();

    let mut file_paths: BTreeSet<&String> = BTreeSet::new();
    file_paths.extend(input.before_files.keys());
    file_paths.extend(input.after_files.keys());
    for path in file_paths {
        let before = input.before_files.get(path);
        let after = input.after_files.get(path);
        if let (Some(b), Some(a)) = (before, after) {
            if b == a {
                continue;
            }
        }
        changed_files.push(path.clone());
    }

    let mut dir_changes = Vec::new();

    let mut dir_paths: BTreeSet<&String> = BTreeSet::new();
    dir_paths.extend(input.before_dirs.iter());
    dir_paths.extend(input.after_dirs.iter());
    for path in dir_paths {
        if path == "/" || is_reserved(path) {
            continue;
        }
        let before_exists = input.before_dirs.contains(path);
        let after_exists = input.after_dirs.contains(path);
        if before_exists == after_exists {
            continue;
        }
        dir_changes.push(Change::Dir {
            path: path.clone(),
            before_exists,
            after_exists,
        });
    }

    if changed_files.is_empty() && dir_changes.is_empty() {
        debug!(tool, "no-op mutation; nothing recorded");
        return Ok(None);
    }

    let now = Utc::now();
    let id = generate(now);

    let mut changes = Vec::with_capacity(changed_files.len() + dir_changes.len());
    for path in &changed_files {
        let before = input.before_files.get(path);
        let after = input.after_files.get(path);
        let before_blob = match before {
            Some(bytes) => {
                write_blob(ws, &id, "before", path, bytes)?;
                Some(crate::blobs::blob_path(&id, "before", path))
            }
            None => None,
        };
        let after_blob = match after {
            Some(bytes) => {
                write_blob(ws, &id, "after", path, bytes)?;
                Some(crate::blobs::blob_path(&id, "after", path))
            }
            None => None,
        };
        changes.push(Change::File {
            path: path.clone(),
            before_exists: before.is_some(),
            after_exists: after.is_some(),
            before_blob,
            after_blob,
            before_size: before.map(|b| b.len() as u64),
            after_size: after.map(|a| a.len() as u64),
        });
    }
    changes.extend(dir_changes);

    let changed_paths: Vec<String> = changes.iter().map(|c| c.path().to_string()).collect();

    let entry = Entry {
        id: id.clone(),
        created_at: now,
        tool: tool.to_string(),
        note: note.to_string(),
        changes,
        compacted_from: None,
    };
    save_entry(ws, &entry)?;

    state.entries.push(EntrySummary {
        id: id.clone(),
        created_at: now,
        tool: tool.to_string(),
        compacted: false,
        changed_paths,
    });
    state.cursor = state.entries.len();
    state.updated_at = now;

    compact(ws, &mut state)?;
    save_state(ws, &state)?;

    info!(id, tool, "recorded history entry");
    Ok(Some(id))
}
