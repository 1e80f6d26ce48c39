//! Logical-line assembly for the syntax walker.
//!
//! Python statements can span several physical lines (parenthesized
//! continuations, backslash continuations). The walker operates on
//! *logical* lines: one physical-or-joined line per statement, with
//! comments stripped and string contents left untouched (so later
//! regex-based classification never misfires inside a string literal).
//!
//! This is a line-oriented simplification, not a full tokenizer: it
//! does not model triple-quoted strings that themselves contain
//! unbalanced brackets on their first line perfectly, and it does not
//! recover from malformed bracket nesting. Both are accepted
//! simplifications for a read-only analyzer (see `DESIGN.md`).

#[derive(Debug, Clone)]
pub struct LogicalLine {
    /// 1-indexed line number of the first physical line.
    pub line: u32,
    /// Leading whitespace width of the first physical line.
    pub indent: usize,
    /// Joined, comment-stripped text with continuations collapsed to
    /// single spaces. Leading whitespace is stripped.
    pub text: String,
}

/// Split source into logical lines, joining bracket and backslash
/// continuations and stripping trailing `#` comments.
pub fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut depth: i32 = 0;
    let mut pending: Option<LogicalLine> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let stripped = strip_comment(raw_line);
        let content_indent = semcross_core::text::indent_width(raw_line);
        let trimmed = stripped.trim();

        if pending.is_none() {
            if trimmed.is_empty() {
                continue;
            }
            pending = Some(LogicalLine {
                line: line_no,
                indent: content_indent,
                text: String::new(),
            });
        }

        let line = pending.as_mut().unwrap();
        if !line.text.is_empty() {
            line.text.push(' ');
        }
        let joined = trimmed.trim_end_matches('\\');
        line.text.push_str(joined.trim());
        depth += bracket_delta(joined);
        if depth < 0 {
            depth = 0;
        }

        let backslash_continues = trimmed.ends_with('\\') && !trimmed.ends_with("\\\\");
        if depth == 0 && !backslash_continues {
            out.push(pending.take().unwrap());
        }
    }

    if let Some(line) = pending.take() {
        if !line.text.trim().is_empty() {
            out.push(line);
        }
    }

    out
}

/// Strip a trailing `#...` comment, respecting simple (non-triple) string
/// quoting so `"a#b"` is not truncated.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_str: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match in_str {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    in_str = None;
                }
            }
            None => match b {
                b'#' => return &line[..i],
                b'\'' | b'"' => in_str = Some(b),
                _ => {}
            },
        }
        i += 1;
    }
    line
}

/// Net change in bracket depth for a line, ignoring brackets inside
/// string literals.
fn bracket_delta(line: &str) -> i32 {
    let bytes = line.as_bytes();
    let mut in_str: Option<u8> = None;
    let mut depth = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match in_str {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    in_str = None;
                }
            }
            None => match b {
                b'\'' | b'"' => in_str = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                _ => {}
            },
        }
        i += 1;
    }
    depth
}
