//! Line splitting shared by `fs_read_lines`, `fs_patch_lines`, and `fs_search`.
//!
//! Splits on CRLF or LF. Unlike [`str::lines`], a trailing terminator
//! produces a trailing empty line, so `"a\nb\n"` yields `["a", "b", ""]` —
//! three lines, matching the line-count an editor would show.

/// Split `content` into lines, stripping a trailing `\r` from each segment
/// so CRLF and LF inputs agree on content.
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(|segment| segment.strip_suffix('\r').unwrap_or(segment).to_string())
        .collect()
}

/// Join lines back with `\n`, the convention used for patched output.
pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn trailing_newline_yields_trailing_empty_line() {
        assert_eq!(split_lines("a,b\n1,2\n"), vec!["a,b", "1,2", ""]);
    }

    #[test]
    fn strips_carriage_return() {
        assert_eq!(split_lines("a\r\nb\r\n"), vec!["a", "b", ""]);
    }

    #[test]
    fn empty_file_is_one_blank_line() {
        assert_eq!(split_lines(""), vec![""]);
    }
}
