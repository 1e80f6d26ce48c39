//! Source position utilities for byte offset and line:column conversions.
//!
//! Lines are 1-indexed (matching editor conventions); byte offsets are
//! 0-indexed. The walker tracks line numbers directly as it scans
//! logical lines, so these helpers exist for the coordinate conversions
//! a future caller (an editor integration, a diff-aware re-scan) would
//! need rather than for the walker's own hot path.

/// Convert a byte offset into `content` to a 1-indexed line number.
///
/// Offsets past the end of `content` clamp to the last line.
pub fn line_at_offset(content: &str, offset: usize) -> u32 {
    let offset = offset.min(content.len());
    1 + content.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u32
}

/// Split source into 1-indexed `(line_number, line_text)` pairs, stripping
/// the trailing newline from each line.
pub fn numbered_lines(content: &str) -> impl Iterator<Item = (u32, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx as u32 + 1, line))
}

/// Leading whitespace width of a line, in columns (spaces count as 1,
/// tabs count as 1 — semcross only compares indentation relatively, never
/// against an absolute tab width).
pub fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}
