//! Path normalization: canonicalize user-supplied paths into a single POSIX
//! absolute form rooted at `/`.

/// Path prefix reserved for the time machine's persistent state.
pub const RESERVED_PREFIX: &str = "/.time";

/// Normalize a user-supplied path into canonical POSIX absolute form.
///
/// Rules, applied in order: translate backslashes to forward slashes, map
/// `~` and `~/` to `/`, prepend `/` if missing, collapse `.` segments,
/// resolve `..` without escaping root (leading `..` segments past root are
/// discarded), strip trailing slashes except for the root itself.
pub fn normalize(path: &str) -> String {
    let slashed = path.replace('\\', "/");

    let unaliased: &str = if slashed == "~" || slashed == "~/" {
        "/"
    } else if let Some(rest) = slashed.strip_prefix("~/") {
        return normalize(&format!("/{rest}"));
    } else {
        &slashed
    };

    let rooted = if unaliased.starts_with('/') {
        unaliased.to_string()
    } else {
        format!("/{unaliased}")
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rooted.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// True when `path` (already normalized) falls under the reserved `/.time`
/// namespace.
pub fn is_reserved(path: &str) -> bool {
    path == RESERVED_PREFIX || path.starts_with("/.time/")
}

/// Parent directory of a normalized path. The parent of `/` is `/`.
pub fn dirname(path: &str) -> String {
    let normalized = normalize(path);
    if normalized == "/" {
        return "/".to_string();
    }
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
        None => "/".to_string(),
    }
}

/// Final path component of a normalized path. The basename of `/` is `/`.
pub fn basename(path: &str) -> String {
    let normalized = normalize(path);
    if normalized == "/" {
        return "/".to_string();
    }
    normalized
        .rsplit('/')
        .next()
        .unwrap_or(&normalized)
        .to_string()
}

/// Join and normalize path segments, each normalized independently first so
/// that `~`/backslash aliasing and `..` escapes are resolved per-argument
/// before the POSIX join.
pub fn join(base: &str, child: &str) -> String {
    let normalized_base = normalize(base);
    if child.starts_with('/') || child.starts_with('~') {
        return normalize(child);
    }
    if normalized_base == "/" {
        normalize(&format!("/{child}"))
    } else {
        normalize(&format!("{normalized_base}/{child}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_tilde_forms() {
        assert_eq!(normalize("~"), "/");
        assert_eq!(normalize("~/"), "/");
        assert_eq!(normalize("~/foo/bar"), "/foo/bar");
    }

    #[test]
    fn prepends_root_for_bare_relative_paths() {
        assert_eq!(normalize("x"), "/x");
        assert_eq!(normalize("a/b/c"), "/a/b/c");
    }

    #[test]
    fn collapses_dot_segments() {
        assert_eq!(normalize("/a/./b/./c"), "/a/b/c");
    }

    #[test]
    fn resolves_dotdot_without_escaping_root() {
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/../../a"), "/a");
        assert_eq!(normalize("/.."), "/");
    }

    #[test]
    fn strips_trailing_slashes_except_root() {
        assert_eq!(normalize("/a/b/"), "/a/b");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn translates_backslashes() {
        assert_eq!(normalize("a\\b\\c"), "/a/b/c");
    }

    #[test]
    fn reserved_namespace_detection() {
        assert!(is_reserved("/.time"));
        assert!(is_reserved("/.time/state.json"));
        assert!(is_reserved("/.time/entries/x.json"));
        assert!(!is_reserved("/.timex"));
        assert!(!is_reserved("/time"));
        assert!(!is_reserved("/a"));
    }

    #[test]
    fn dirname_and_basename() {
        assert_eq!(dirname("/a/b/c"), "/a/b");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(basename("/a/b/c"), "c");
        assert_eq!(basename("/"), "/");
    }

    #[test]
    fn join_normalizes_each_argument() {
        assert_eq!(join("/a/b", "c"), "/a/b/c");
        assert_eq!(join("/a/b", "../c"), "/a/c");
        assert_eq!(join("/a", "/x/y"), "/x/y");
        assert_eq!(join("/a", "~/y"), "/y");
        assert_eq!(join("/", "x"), "/x");
    }
}
