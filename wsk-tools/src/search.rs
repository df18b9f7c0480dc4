//! `fs_search` — literal text search with small contexts, smart case, and
//! binary-file skipping.

use std::collections::VecDeque;

use wsk_commons::{is_reserved, normalize, WskError};
use wsk_vfs::{EntryKind, Workspace};

use crate::lines::split_lines;
use crate::types::{LineEntry, SearchParams, SearchResult, SearchSummary};

const BINARY_SAMPLE_SIZE: usize = 8 * 1024;
const MIN_SAMPLE_FOR_RATIO_CHECK: usize = 256;
const REPLACEMENT_CHAR: char = '\u{FFFD}';
const REPLACEMENT_RATIO_THRESHOLD: f64 = 0.05;

/// Heuristic binary-file detector: a NUL byte in the first 8 KiB, or more
/// than 5% Unicode replacement characters after lossy UTF-8 decoding of a
/// sufficiently long sample. This is a heuristic, not a guarantee.
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
    let replacement_count = decoded.chars().filter(|&c| c == REPLACEMENT_CHAR).count();
    (replacement_count as f64 / total_chars as f64) > REPLACEMENT_RATIO_THRESHOLD
}

fn clip(line: &str, max_len: usize) -> String {
    if line.chars().count() <= max_len {
        return line.to_string();
    }
    if max_len == 0 {
        return "…".to_string();
    }
    let truncated: String = line.chars().take(max_len.saturating_sub(1)).collect();
    format!("{truncated}…")
}

fn collect_candidate_files(ws: &Workspace, prefix: &str) -> Result<Vec<String>, WskError> {
    match ws.stat(prefix) {
        Some(stat) if stat.kind == EntryKind::File => Ok(vec![prefix.to_string()]),
        Some(_) => {
            let dir_prefix = if prefix == "/" {
                String::new()
            } else {
                format!("{prefix}/")
            };
            let files = ws
                .files()
                .keys()
                .filter(|path| {
                    (prefix == "/" || path.starts_with(&dir_prefix)) && !is_reserved(path)
                })
                .cloned()
                .collect();
            Ok(files)
        }
        None => Err(WskError::not_found(prefix)),
    }
}

struct PendingResult {
    match_line: usize,
    context_start_line: usize,
    lines: Vec<LineEntry>,
    remaining_after: usize,
}

/// `fs_search(query, pathPrefix, maxResults, contextLines, maxLineLength, caseSensitive)`.
pub fn fs_search(ws: &Workspace, params: &SearchParams) -> Result<SearchSummary, WskError> {
    let prefix = normalize(&params.path_prefix);
    if is_reserved(&prefix) {
        return Err(WskError::access_denied(&prefix));
    }

    let case_sensitive = params
        .case_sensitive
        .unwrap_or_else(|| params.query.chars().any(|c| c.is_uppercase()));
    let needle = if case_sensitive {
        params.query.clone()
    } else {
        params.query.to_lowercase()
    };

    let mut files = collect_candidate_files(ws, &prefix)?;
    files.sort();

    let mut results = Vec::new();
    let mut scanned_files = 0usize;
    let mut matched_files = 0usize;
    let mut skipped_binary_files = 0usize;
    let mut truncated = false;

    'files: for path in &files {
        if results.len() >= params.max_results {
            truncated = true;
            break;
        }
        let Ok(bytes) = ws.read_file(path) else {
            continue;
        };
        scanned_files += 1;
        if looks_binary(bytes) {
            skipped_binary_files += 1;
            continue;
        }

        let text = String::from_utf8_lossy(bytes);
        let file_lines = split_lines(&text);
        let mut before_buf: VecDeque<(usize, String)> = VecDeque::new();
        let mut pending: Option<PendingResult> = None;
        let mut matched_in_file = false;

        for (idx, content) in file_lines.iter().enumerate() {
            let line_number = idx + 1;

            if let Some(p) = pending.as_mut() {
                p.lines.push(LineEntry {
                    line_number,
                    content: clip(content, params.max_line_length),
                });
                p.remaining_after -= 1;
                if p.remaining_after == 0 {
                    let finished = pending.take().unwrap();
                    let context_end_line = finished
                        .lines
                        .last()
                        .map(|l| l.line_number)
                        .unwrap_or(finished.match_line);
                    results.push(SearchResult {
                        path: path.clone(),
                        match_line: finished.match_line,
                        context_start_line: finished.context_start_line,
                        context_end_line,
                        lines: finished.lines,
                    });
                    matched_in_file = true;
                    if results.len() >= params.max_results {
                        truncated = idx + 1 < file_lines.len() || files.last() != Some(path);
                        break;
                    }
                }
                push_before(&mut before_buf, line_number, content, params.context_lines);
                continue;
            }

            let haystack = if case_sensitive {
                content.clone()
            } else {
                content.to_lowercase()
            };
            if !needle.is_empty() && haystack.contains(&needle) {
                let context_start_line = before_buf.front().map(|(n, _)| *n).unwrap_or(line_number);
                let mut result_lines: Vec<LineEntry> = before_buf
                    .iter()
                    .map(|(n, c)| LineEntry {
                        line_number: *n,
                        content: clip(c, params.max_line_length),
                    })
                    .collect();
                result_lines.push(LineEntry {
                    line_number,
                    content: clip(content, params.max_line_length),
                });

                if params.context_lines == 0 {
                    results.push(SearchResult {
                        path: path.clone(),
                        match_line: line_number,
                        context_start_line,
                        context_end_line: line_number,
                        lines: result_lines,
                    });
                    matched_in_file = true;
                    if results.len() >= params.max_results {
                        truncated = idx + 1 < file_lines.len() || files.last() != Some(path);
                        push_before(&mut before_buf, line_number, content, params.context_lines);
                        break;
                    }
                } else {
                    pending = Some(PendingResult {
                        match_line: line_number,
                        context_start_line,
                        lines: result_lines,
                        remaining_after: params.context_lines,
                    });
                }
            }

            push_before(&mut before_buf, line_number, content, params.context_lines);
        }

        if let Some(finished) = pending.take() {
            let context_end_line = finished
                .lines
                .last()
                .map(|l| l.line_number)
                .unwrap_or(finished.match_line);
            results.push(SearchResult {
                path: path.clone(),
                match_line: finished.match_line,
                context_start_line: finished.context_start_line,
                context_end_line,
                lines: finished.lines,
            });
            matched_in_file = true;
        }

        if matched_in_file {
            matched_files += 1;
        }
        if results.len() >= params.max_results {
            continue 'files;
        }
    }

    Ok(SearchSummary {
        results,
        truncated,
        scanned_files,
        matched_files,
        skipped_binary_files,
    })
}

fn push_before(buf: &mut VecDeque<(usize, String)>, line_number: usize, content: &str, cap: usize) {
    if cap == 0 {
        return;
    }
    buf.push_back((line_number, content.to_string()));
    while buf.len() > cap {
        buf.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::fs_write;
    use crate::types::Encoding;
    use pretty_assertions::assert_eq;

    #[test]
    fn smart_case_default_matches_all_cases() {
        let mut ws = Workspace::new();
        fs_write(&mut ws, "~/x.txt", "Hello\nhello\nHELLO\n", Encoding::Text, true).unwrap();
        let summary = fs_search(
            &ws,
            &SearchParams {
                query: "hello".to_string(),
                path_prefix: "~/".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(summary.results.len(), 3);
    }

    #[test]
    fn uppercase_query_forces_case_sensitive() {
        let mut ws = Workspace::new();
        fs_write(&mut ws, "~/x.txt", "Hello\nhello\nHELLO\n", Encoding::Text, true).unwrap();
        let summary = fs_search(
            &ws,
            &SearchParams {
                query: "Hello".to_string(),
                path_prefix: "~/".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].match_line, 1);
    }

    #[test]
    fn never_matches_under_reserved_namespace() {
        let mut ws = Workspace::new();
        ws.mkdir("/.time", true).unwrap();
        ws.write_file("/.time/secret.txt", b"needle", true).unwrap();
        fs_write(&mut ws, "/a.txt", "needle here", Encoding::Text, true).unwrap();
        let summary = fs_search(
            &ws,
            &SearchParams {
                query: "needle".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(summary.results.len(), 1);
        assert_eq!(summary.results[0].path, "/a.txt");
    }

    #[test]
    fn respects_max_results_and_sets_truncated() {
        let mut ws = Workspace::new();
        fs_write(&mut ws, "/a.txt", "hit\nhit\nhit\nhit\n", Encoding::Text, true).unwrap();
        let summary = fs_search(
            &ws,
            &SearchParams {
                query: "hit".to_string(),
                max_results: 2,
                context_lines: 0,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(summary.results.len(), 2);
        assert!(summary.truncated);
    }

    #[test]
    fn detects_binary_via_nul_byte() {
        let mut ws = Workspace::new();
        ws.write_file("/bin.dat", &[0u8, 1, 2, b'h', b'i'], true).unwrap();
        let summary = fs_search(
            &ws,
            &SearchParams {
                query: "hi".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(summary.skipped_binary_files, 1);
        assert!(summary.results.is_empty());
    }
}
