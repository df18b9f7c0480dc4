//! Resolves a guest entry module's import graph against the workspace and a
//! fixed set of shimmed stdlib modules, then concatenates everything
//! transitively reachable into a single executable blob.

use std::collections::BTreeMap;

use wsk_commons::normalize;
use wsk_vfs::Workspace;

use crate::error::SandboxError;
use crate::shims;

const RESOLUTION_SUFFIXES: &[&str] = &[".ts", ".tsx", ".js", ".mjs", ".cjs", ".json"];
const INDEX_BASENAMES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.js",
    "index.mjs",
    "index.cjs",
    "index.json",
];

const DENYLIST: &[&str] = &[
    "process",
    "net",
    "http",
    "https",
    "dgram",
    "child_process",
    "cluster",
    "worker_threads",
    "inspector",
    "vm",
    "v8",
    "dns",
    "tls",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleKind {
    Workspace,
    Shim,
}

struct Resolved {
    id: String,
    kind: ModuleKind,
}

/// A single bundled module, keyed by its resolved id, in the order they were
/// first discovered (entry module last-concatenated... no: entry emitted
/// first, so `require` of already-loaded modules short-circuits via cache).
pub struct Bundle {
    pub entry_id: String,
    pub modules: Vec<(String, String)>,
}

/// Bundle `entry_path` from `ws` into a single self-contained script.
pub fn bundle(ws: &Workspace, entry_path: &str) -> Result<Bundle, SandboxError> {
    let entry_id = resolve_workspace_path(ws, entry_path, "<entry>")?;

    let mut modules: Vec<(String, String)> = Vec::new();
    let mut seen: BTreeMap<String, ()> = BTreeMap::new();
    let mut stack = vec![Resolved {
        id: entry_id.clone(),
        kind: ModuleKind::Workspace,
    }];

    while let Some(current) = stack.pop() {
        if seen.contains_key(&current.id) {
            continue;
        }
        seen.insert(current.id.clone(), ());

        let source = match current.kind {
            ModuleKind::Workspace => String::from_utf8_lossy(ws.read_file(&current.id)?).into_owned(),
            ModuleKind::Shim => shims::source_for(&current.id)
                .expect("shim id always has a corresponding source template")
                .to_string(),
        };

        let mut rewritten = source.clone();
        let occurrences = scan_import_specifiers(&source);
        for occurrence in occurrences.into_iter().rev() {
            let lowered = occurrence.specifier.trim().to_string();
            if DENYLIST.contains(&lowered.as_str()) {
                return Err(SandboxError::BlockedImport(lowered));
            }

            let resolved_id = if shims::is_shim_name(&lowered) {
                stack.push(Resolved {
                    id: lowered.clone(),
                    kind: ModuleKind::Shim,
                });
                lowered.clone()
            } else if lowered.starts_with("./") || lowered.starts_with("../") {
                let importer_dir = wsk_commons::dirname(&current.id);
                let joined = wsk_commons::join(&importer_dir, &lowered);
                let resolved = resolve_workspace_path(ws, &joined, &current.id)?;
                stack.push(Resolved {
                    id: resolved.clone(),
                    kind: ModuleKind::Workspace,
                });
                resolved
            } else if lowered.starts_with('/') || lowered.starts_with("~/") {
                let resolved = resolve_workspace_path(ws, &lowered, &current.id)?;
                stack.push(Resolved {
                    id: resolved.clone(),
                    kind: ModuleKind::Workspace,
                });
                resolved
            } else {
                return Err(SandboxError::BlockedImport(lowered));
            };

            rewritten.replace_range(occurrence.start..occurrence.end, &resolved_id);
        }

        modules.push((current.id, rewritten));
    }

    modules.reverse();
    Ok(Bundle { entry_id, modules })
}

/// Resolve a workspace-relative or absolute specifier to a concrete file
/// path, trying exact, then each extension, then each index basename.
fn resolve_workspace_path(ws: &Workspace, specifier: &str, importer: &str) -> Result<String, SandboxError> {
    let normalized = normalize(specifier);

    if ws.stat(&normalized).map(|s| s.kind) == Some(wsk_vfs::EntryKind::File) {
        return Ok(normalized);
    }

    for suffix in RESOLUTION_SUFFIXES {
        let candidate = format!("{normalized}{suffix}");
        if ws.stat(&candidate).map(|s| s.kind) == Some(wsk_vfs::EntryKind::File) {
            return Ok(candidate);
        }
    }

    for basename in INDEX_BASENAMES {
        let candidate = if normalized == "/" {
            format!("/{basename}")
        } else {
            format!("{normalized}/{basename}")
        };
        if ws.stat(&candidate).map(|s| s.kind) == Some(wsk_vfs::EntryKind::File) {
            return Ok(candidate);
        }
    }

    Err(SandboxError::Resolution {
        specifier: specifier.to_string(),
        importer: importer.to_string(),
        reason: "no matching file, extension, or index module".to_string(),
    })
}

struct SpecifierOccurrence {
    /// Byte range of the specifier text itself, excluding the quotes.
    start: usize,
    end: usize,
    specifier: String,
}

/// Scans `import ... from "spec"` / `require("spec")` / `export ... from
/// "spec"` occurrences. This is a lexical scan, not a full parser: it is
/// sufficient for the bundler's resolution needs and does not attempt to
/// understand the rest of the module's syntax.
fn scan_import_specifiers(source: &str) -> Vec<SpecifierOccurrence> {
    let mut occurrences = Vec::new();
    let mut i = 0;
    while i < source.len() {
        let rest = &source[i..];
        let keyword_len = if rest.starts_with("import") {
            6
        } else if rest.starts_with("require") {
            7
        } else if rest.starts_with("from") {
            4
        } else {
            i += 1;
            continue;
        };
        if let Some((rel_start, rel_end, spec)) = extract_quoted_after(&source[i + keyword_len..]) {
            let start = i + keyword_len + rel_start;
            let end = i + keyword_len + rel_end;
            occurrences.push(SpecifierOccurrence { start, end, specifier: spec });
        }
        i += 1;
    }
    occurrences
}

/// Find the first quoted string literal within a short lookahead window,
/// returning `None` if non-whitespace/non-quote/non-paren content appears
/// first (i.e. the keyword wasn't actually followed by a specifier).
/// Returns the byte offsets (relative to `rest`) of the specifier text.
fn extract_quoted_after(rest: &str) -> Option<(usize, usize, String)> {
    let mut chars = rest.char_indices().peekable();
    while let Some((idx, ch)) = chars.peek().copied() {
        match ch {
            ' ' | '\t' | '(' | '\n' | '\r' => {
                chars.next();
            }
            '"' | '\'' => {
                let quote = ch;
                let start = idx + 1;
                let tail = &rest[start..];
                let end = tail.find(quote)?;
                return Some((start, start + end, tail[..end].to_string()));
            }
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_exact_then_extension_then_index() {
        let mut ws = Workspace::new();
        ws.write_file("/a.ts", b"export const a = 1;", true).unwrap();
        ws.write_file("/dir/index.js", b"export const b = 2;", true).unwrap();
        assert_eq!(resolve_workspace_path(&ws, "/a", "/x").unwrap(), "/a.ts");
        assert_eq!(resolve_workspace_path(&ws, "/dir", "/x").unwrap(), "/dir/index.js");
    }

    #[test]
    fn rejects_denylisted_module() {
        let mut ws = Workspace::new();
        ws.write_file("/main.js", b"const cp = require('child_process');", true)
            .unwrap();
        let err = bundle(&ws, "/main.js").unwrap_err();
        assert!(matches!(err, SandboxError::BlockedImport(_)));
    }

    #[test]
    fn bundles_relative_imports_in_dependency_order() {
        let mut ws = Workspace::new();
        ws.write_file("/lib.js", b"module.exports.greet = () => 'hi';", true)
            .unwrap();
        ws.write_file("/main.js", b"const { greet } = require('./lib');", true)
            .unwrap();
        let bundle = bundle(&ws, "/main.js").unwrap();
        assert_eq!(bundle.entry_id, "/main.js");
        let ids: Vec<&str> = bundle.modules.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["/lib.js", "/main.js"]);
    }

    #[test]
    fn includes_shim_source_for_fs_import() {
        let mut ws = Workspace::new();
        ws.write_file("/main.js", b"import fs from 'fs';", true).unwrap();
        let bundle = bundle(&ws, "/main.js").unwrap();
        assert!(bundle.modules.iter().any(|(id, _)| id == "fs"));
    }
}
