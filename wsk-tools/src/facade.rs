//! Tools facade: `fs_*` operations over a [`wsk_vfs::Workspace`], with
//! hidden-namespace enforcement and argument normalization.
//!
//! Each function borrows the workspace mutably (or immutably) for the
//! duration of one call — no state is held across calls.

use base64::Engine;
use tracing::warn;
use wsk_commons::{is_reserved, normalize, ErrorKind, WskError};
use wsk_vfs::{EntryKind, Workspace};

use crate::lines::{join_lines, split_lines};
use crate::types::{Encoding, LineEntry, PatchResult, ReadLinesResult, ReadResult};

fn reject_reserved(path: &str) -> Result<(), WskError> {
    if is_reserved(path) {
        warn!(path, "reserved-namespace access rejected");
        return Err(WskError::access_denied(path));
    }
    Ok(())
}

/// `fs_read(path, enc, maxBytes)`.
pub fn fs_read(
    ws: &Workspace,
    path: &str,
    encoding: Encoding,
    max_bytes: u64,
) -> Result<ReadResult, WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    let bytes = ws.read_file(&p)?;
    if bytes.len() as u64 > max_bytes {
        return Err(WskError::too_large(&p, max_bytes));
    }
    let content = match encoding {
        Encoding::Text => String::from_utf8_lossy(bytes).into_owned(),
        Encoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
    };
    Ok(ReadResult {
        path: p,
        content,
        encoding,
        size: bytes.len() as u64,
    })
}

/// `fs_read_lines(path, startLine=1, endLine=200, maxBytes)`.
pub fn fs_read_lines(
    ws: &Workspace,
    path: &str,
    start_line: usize,
    end_line: usize,
    max_bytes: u64,
) -> Result<ReadLinesResult, WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    let bytes = ws.read_file(&p)?;
    if bytes.len() as u64 > max_bytes {
        return Err(WskError::too_large(&p, max_bytes));
    }
    let text = String::from_utf8_lossy(bytes);
    let lines = split_lines(&text);
    let total_lines = lines.len();

    let start = start_line.max(1).min(total_lines.max(1));
    let end = end_line.max(start).min(total_lines.max(1));

    let selected: Vec<LineEntry> = lines[(start - 1)..end]
        .iter()
        .enumerate()
        .map(|(idx, content)| LineEntry {
            line_number: start + idx,
            content: content.clone(),
        })
        .collect();

    Ok(ReadLinesResult {
        path: p,
        start_line: start,
        end_line: end,
        total_lines,
        lines: selected,
    })
}

/// `fs_write(path, content, enc, overwrite=true)`.
pub fn fs_write(
    ws: &mut Workspace,
    path: &str,
    content: &str,
    encoding: Encoding,
    overwrite: bool,
) -> Result<(), WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    let bytes = match encoding {
        Encoding::Text => content.as_bytes().to_vec(),
        Encoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(content)
            .map_err(|err| WskError::new(ErrorKind::ProtocolFailure, format!("invalid base64: {err}")))?,
    };
    ws.write_file(&p, &bytes, overwrite)
}

/// `fs_list(path="/")`; elides `.time` when listing the root.
pub fn fs_list(ws: &Workspace, path: &str) -> Result<Vec<String>, WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    let mut names = ws.list(&p)?;
    if p == "/" {
        names.retain(|name| name != ".time");
    }
    Ok(names)
}

/// `fs_stat(path)`.
pub fn fs_stat(ws: &Workspace, path: &str) -> Result<Option<wsk_vfs::Stat>, WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    Ok(ws.stat(&p))
}

/// `fs_mkdir(path, recursive=true)`.
pub fn fs_mkdir(ws: &mut Workspace, path: &str, recursive: bool) -> Result<(), WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    ws.mkdir(&p, recursive)
}

/// `fs_delete(path)`.
pub fn fs_delete(ws: &mut Workspace, path: &str) -> Result<(), WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    ws.delete(&p)
}

/// `fs_patch_lines(path, startLine, endLine, replacement)`.
///
/// Replaces the inclusive 1-based `[startLine, endLine]` range with
/// `replacement`, preserving surrounding lines verbatim. When `startLine`
/// exceeds the file's line count this appends `replacement` after the end
/// of the file rather than failing (see DESIGN.md for the rationale).
pub fn fs_patch_lines(
    ws: &mut Workspace,
    path: &str,
    start_line: usize,
    end_line: usize,
    replacement: &str,
) -> Result<PatchResult, WskError> {
    let p = normalize(path);
    reject_reserved(&p)?;
    let bytes = ws.read_file(&p)?;
    let text = String::from_utf8_lossy(bytes).into_owned();
    let mut lines = split_lines(&text);
    let total_lines = lines.len();

    let replacement_lines: Vec<String> = replacement.split('\n').map(|s| s.to_string()).collect();

    let (splice_start, splice_end, reported_start, reported_end) = if start_line > total_lines {
        (total_lines, total_lines, total_lines + 1, total_lines + 1)
    } else {
        let end = end_line.max(start_line).min(total_lines);
        (start_line - 1, end, start_line, end)
    };

    lines.splice(splice_start..splice_end, replacement_lines);
    let new_total_lines = lines.len();
    ws.write_file(&p, join_lines(&lines).as_bytes(), true)?;

    Ok(PatchResult {
        path: p,
        start_line: reported_start,
        end_line: reported_end,
        new_total_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn read_lines_matches_spec_example() {
        let mut ws = Workspace::new();
        fs_write(&mut ws, "~/data/in.csv", "a,b\n1,2\n", Encoding::Text, true).unwrap();
        let result = fs_read_lines(&ws, "~/data/in.csv", 1, 2, u64::MAX).unwrap();
        assert_eq!(result.total_lines, 3);
        assert_eq!(result.lines[0].content, "a,b");
        assert_eq!(result.lines[1].content, "1,2");
    }

    #[test]
    fn reserved_namespace_is_access_denied() {
        let mut ws = Workspace::new();
        let err = fs_write(&mut ws, "~/.time/x", "y", Encoding::Text, true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
    }

    #[test]
    fn fs_list_elides_dot_time() {
        let mut ws = Workspace::new();
        ws.mkdir("/.time", true).unwrap();
        fs_write(&mut ws, "/a.txt", "x", Encoding::Text, true).unwrap();
        let names = fs_list(&ws, "/").unwrap();
        assert!(names.contains(&"a.txt".to_string()));
        assert!(!names.contains(&".time".to_string()));
    }

    #[test]
    fn patch_lines_replaces_inclusive_range() {
        let mut ws = Workspace::new();
        fs_write(&mut ws, "/f", "one\ntwo\nthree\n", Encoding::Text, true).unwrap();
        fs_patch_lines(&mut ws, "/f", 2, 2, "TWO").unwrap();
        let content = String::from_utf8(ws.read_file("/f").unwrap().to_vec()).unwrap();
        assert_eq!(content, "one\nTWO\nthree\n");
    }

    #[test]
    fn patch_lines_past_end_appends() {
        let mut ws = Workspace::new();
        fs_write(&mut ws, "/f", "one\n", Encoding::Text, true).unwrap();
        let result = fs_patch_lines(&mut ws, "/f", 99, 99, "two").unwrap();
        let content = String::from_utf8(ws.read_file("/f").unwrap().to_vec()).unwrap();
        assert_eq!(content, "one\n\ntwo");
        assert!(result.start_line > 1);
    }

    #[test]
    fn stat_kind_matches_entry() {
        let mut ws = Workspace::new();
        fs_write(&mut ws, "/a", "x", Encoding::Text, true).unwrap();
        let stat = fs_stat(&ws, "/a").unwrap().unwrap();
        assert_eq!(stat.kind, EntryKind::File);
    }
}
