//! Human-readable diffs over a recorded entry's changes.

use serde::{Deserialize, Serialize};

use wsk_vfs::Workspace;

use crate::blobs::read_blob;
use crate::entry::{Change, Entry};
use crate::error::TmError;
use crate::io::load_entry;

const BINARY_SAMPLE_SIZE: usize = 8 * 1024;
const MIN_SAMPLE_FOR_RATIO_CHECK: usize = 256;
const REPLACEMENT_RATIO_THRESHOLD: f64 = 0.05;

fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_SIZE)];
    if sample.contains(&0) {
        return true;
    }
    if sample.len() < MIN_SAMPLE_FOR_RATIO_CHECK {
        return false;
    }
    let decoded = String::from_utf8_lossy(sample);
    let total_chars = decoded.chars().count();
    if total_chars == 0 {
        return false;
    }
    let replacement_count = decoded.chars().filter(|&c| c == '\u{FFFD}').count();
    (replacement_count as f64 / total_chars as f64) > REPLACEMENT_RATIO_THRESHOLD
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split("\r\n").flat_map(|s| s.split('\n')).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOp {
    #[serde(rename = "file+")]
    Add,
    #[serde(rename = "file-")]
    Remove,
    #[serde(rename = "file~")]
    Modify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub op: FileOp,
    pub path: String,
    pub binary: bool,
    #[serde(rename = "beforePreview", skip_serializing_if = "Option::is_none")]
    pub before_preview: Option<Vec<String>>,
    #[serde(rename = "afterPreview", skip_serializing_if = "Option::is_none")]
    pub after_preview: Option<Vec<String>>,
    #[serde(rename = "startLine", skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirOp {
    #[serde(rename = "dir+")]
    Add,
    #[serde(rename = "dir-")]
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirDiff {
    pub op: DirOp,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiffResult {
    pub files: Vec<FileDiff>,
    pub dirs: Vec<DirDiff>,
    #[serde(rename = "truncated")]
    pub truncated: bool,
}

/// Diff the entry identified by `id`, previewing at most `max_files` file
/// changes and `max_preview_lines` lines of context around each.
pub fn diff(
    ws: &Workspace,
    id: &str,
    max_files: usize,
    max_preview_lines: usize,
) -> Result<DiffResult, TmError> {
    let entry = load_entry(ws, id)?;
    diff_entry(ws, &entry, max_files, max_preview_lines)
}

fn diff_entry(
    ws: &Workspace,
    entry: &Entry,
    max_files: usize,
    max_preview_lines: usize,
) -> Result<DiffResult, TmError> {
    let mut result = DiffResult::default();
    let mut file_count = 0;

    for change in &entry.changes {
        match change {
            Change::Dir {
                path,
                before_exists,
                after_exists,
            } => {
                if *after_exists && !before_exists {
                    result.dirs.push(DirDiff {
                        op: DirOp::Add,
                        path: path.clone(),
                    });
                } else if *before_exists && !after_exists {
                    result.dirs.push(DirDiff {
                        op: DirOp::Remove,
                        path: path.clone(),
                    });
                }
            }
            Change::File {
                path,
                before_exists,
                after_exists,
                before_blob,
                after_blob,
                ..
            } => {
                if file_count >= max_files {
                    result.truncated = true;
                    continue;
                }
                file_count += 1;

                let op = match (before_exists, after_exists) {
                    (false, true) => FileOp::Add,
                    (true, false) => FileOp::Remove,
                    _ => FileOp::Modify,
                };

                let before_bytes = before_blob.as_deref().map(|b| read_blob(ws, b)).transpose()?;
                let after_bytes = after_blob.as_deref().map(|b| read_blob(ws, b)).transpose()?;

                let binary = before_bytes.as_deref().is_some_and(looks_binary)
                    || after_bytes.as_deref().is_some_and(looks_binary);

                let (before_preview, after_preview, start_line) = if binary {
                    (None, None, None)
                } else {
                    preview_window(before_bytes.as_deref(), after_bytes.as_deref(), max_preview_lines)
                };

                result.files.push(FileDiff {
                    op,
                    path: path.clone(),
                    binary,
                    before_preview,
                    after_preview,
                    start_line,
                });
            }
        }
    }

    Ok(result)
}

/// Find the first differing line from the top and the last differing line
/// from the bottom of each side, then emit a preview window starting at the
/// first difference.
fn preview_window(
    before: Option<&[u8]>,
    after: Option<&[u8]>,
    max_preview_lines: usize,
) -> (Option<Vec<String>>, Option<Vec<String>>, Option<usize>) {
    let before_text = before.map(|b| String::from_utf8_lossy(b).into_owned());
    let after_text = after.map(|a| String::from_utf8_lossy(a).into_owned());
    let before_lines: Vec<&str> = before_text.as_deref().map(split_lines).unwrap_or_default();
    let after_lines: Vec<&str> = after_text.as_deref().map(split_lines).unwrap_or_default();

    let mut start = 0usize;
    while start < before_lines.len() && start < after_lines.len() && before_lines[start] == after_lines[start] {
        start += 1;
    }
    if start == before_lines.len() && start == after_lines.len() {
        return (Some(Vec::new()), Some(Vec::new()), None);
    }

    let mut end_a = before_lines.len();
    let mut end_b = after_lines.len();
    while end_a > start && end_b > start && before_lines[end_a - 1] == after_lines[end_b - 1] {
        end_a -= 1;
        end_b -= 1;
    }

    let before_preview: Vec<String> = before_lines[start..end_a]
        .iter()
        .take(max_preview_lines)
        .map(|l| l.to_string())
        .collect();
    let after_preview: Vec<String> = after_lines[start..end_b]
        .iter()
        .take(max_preview_lines)
        .map(|l| l.to_string())
        .collect();

    (Some(before_preview), Some(after_preview), Some(start + 1))
}
