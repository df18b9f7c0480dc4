//! Folds an oldest run of entries into a single compacted entry once the
//! journal exceeds its retention policy, capping unbounded growth.
//!
//! Compaction only ever runs immediately after [`crate::record::record`] has
//! just set `cursor = entries.len()`, so the group being folded (always
//! drawn from the oldest entries, outside the `keepRecent` tail) is
//! necessarily behind the cursor. The cursor-within-compacted-prefix case
//! the design notes flag as ambiguous cannot arise here; see DESIGN.md.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;
use wsk_vfs::Workspace;

use crate::blobs::{blob_path, delete_blob_subtree, read_blob, write_blob};
use crate::entry::{Change, Entry};
use crate::error::TmError;
use crate::id::generate;
use crate::io::{delete_entry, load_entry, save_entry};
use crate::state::{EntrySummary, TmState};

struct FoldedFile {
    before_exists: bool,
    after_exists: bool,
    before_bytes: Option<Vec<u8>>,
    after_bytes: Option<Vec<u8>>,
}

struct FoldedDir {
    before_exists: bool,
    after_exists: bool,
}

pub fn compact(ws: &mut Workspace, state: &mut TmState) -> Result<(), TmError> {
    loop {
        let policy = &state.retention;
        let mergeable = state.entries.len().saturating_sub(policy.keep_recent);
        if state.entries.len() <= policy.max_entries || mergeable < 2 {
            return Ok(());
        }

        let group_size = policy.merge_group.min(mergeable);
        let group = &state.entries[..group_size];
        let group_ids: Vec<String> = group.iter().map(|s| s.id.clone()).collect();

        let mut files: BTreeMap<String, FoldedFile> = BTreeMap::new();
        let mut dirs: BTreeMap<String, FoldedDir> = BTreeMap::new();

        for id in &group_ids {
            let entry = load_entry(ws, id)?;
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
                        let before_bytes = if *before_exists {
                            before_blob
                                .as_deref()
                                .map(|b| read_blob(ws, b))
                                .transpose()?
                        } else {
                            None
                        };
                        let after_bytes = if *after_exists {
                            after_blob.as_deref().map(|b| read_blob(ws, b)).transpose()?
                        } else {
                            None
                        };
                        files
                            .entry(path.clone())
                            .and_modify(|folded| {
                                folded.after_exists = *after_exists;
                                folded.after_bytes = after_bytes.clone();
                            })
                            .or_insert(FoldedFile {
                                before_exists: *before_exists,
                                after_exists: *after_exists,
                                before_bytes,
                                after_bytes,
                            });
                    }
                    Change::Dir {
                        path,
                        before_exists,
                        after_exists,
                    } => {
                        dirs.entry(path.clone())
                            .and_modify(|folded| folded.after_exists = *after_exists)
                            .or_insert(FoldedDir {
                                before_exists: *before_exists,
                                after_exists: *after_exists,
                            });
                    }
                }
            }
        }

        let now = Utc::now();
        let new_id = generate(now);

        let mut changes = Vec::new();
        for (path, folded) in &files {
            let is_noop = folded.before_exists
                && folded.after_exists
                && folded.before_bytes == folded.after_bytes;
            if is_noop {
                continue;
            }
            let before_blob = match &folded.before_bytes {
                Some(bytes) => {
                    write_blob(ws, &new_id, "before", path, bytes)?;
                    Some(blob_path(&new_id, "before", path))
                }
                None => None,
            };
            let after_blob = match &folded.after_bytes {
                Some(bytes) => {
                    write_blob(ws, &new_id, "after", path, bytes)?;
                    Some(blob_path(&new_id, "after", path))
                }
                None => None,
            };
            changes.push(Change::File {
                path: path.clone(),
                before_exists: folded.before_exists,
                after_exists: folded.after_exists,
                before_blob,
                after_blob,
                before_size: folded.before_bytes.as_ref().map(|b| b.len() as u64),
                after_size: folded.after_bytes.as_ref().map(|a| a.len() as u64),
            });
        }
        for (path, folded) in &dirs {
            if folded.before_exists == folded.after_exists {
                continue;
            }
            changes.push(Change::Dir {
                path: path.clone(),
                before_exists: folded.before_exists,
                after_exists: folded.after_exists,
            });
        }

        let changed_paths: Vec<String> = changes.iter().map(|c| c.path().to_string()).collect();

        let compacted_entry = Entry {
            id: new_id.clone(),
            created_at: now,
            tool: "compaction".to_string(),
            note: format!("compacted {} entries", group_ids.len()),
            changes,
            compacted_from: Some(group_ids.clone()),
        };
        save_entry(ws, &compacted_entry)?;

        for id in &group_ids {
            delete_entry(ws, id);
            delete_blob_subtree(ws, id);
        }

        let mut new_entries = Vec::with_capacity(state.entries.len() - group_ids.len() + 1);
        new_entries.push(EntrySummary {
            id: new_id,
            created_at: now,
            tool: "compaction".to_string(),
            compacted: true,
            changed_paths,
        });
        new_entries.extend(state.entries[group_size..].iter().cloned());

        let shrink = group_ids.len() - 1;
        state.cursor = state.cursor.saturating_sub(shrink).min(new_entries.len());
        state.entries = new_entries;

        debug!(merged = group_ids.len(), "compacted history entries");
    }
}
