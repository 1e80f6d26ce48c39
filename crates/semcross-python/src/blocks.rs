//! Indentation-based block tree over logical lines.
//!
//! Python's grammar is indentation-sensitive; this module turns the flat
//! `LogicalLine` stream into a tree where each compound statement
//! (`def`, `class`, `try`, `except`, control-flow headers, ...) owns the
//! logical lines nested under it. Simple statements (`raise`, `import`,
//! assignments, bare expressions, ...) are leaves.
//!
//! One-line suites (`def f(): return 1`) are supported: the text after
//! the header's colon becomes a single synthetic child leaf.

use super::lexlines::LogicalLine;

#[derive(Debug, Clone)]
pub enum Header {
    Module,
    Def { name: String },
    ClassDef { name: String, bases: Vec<String> },
    Try,
    Except { types: Vec<String>, bare: bool },
    Else,
    Finally,
    If(String),
    Elif(String),
    While(String),
    For(String),
    With(String),
    /// Any other simple or compound statement, stored verbatim for
    /// downstream classification (raise/return/import/assign/call/etc.)
    Stmt(String),
}

#[derive(Debug, Clone)]
pub struct Block {
    pub line: u32,
    pub header: Header,
    pub children: Vec<Block>,
}

/// Build the module-level block tree from logical lines.
pub fn build_tree(lines: &[LogicalLine]) -> Block {
    let mut pos = 0;
    let children = build_siblings(lines, &mut pos, None);
    Block {
        line: 0,
        header: Header::Module,
        children,
    }
}

/// Consume sibling statements at the indentation established by the first
/// line seen (or, if `parent_indent` is given, anything strictly deeper
/// than it). Stops when a line dedents to or past `parent_indent`.
fn build_siblings(lines: &[LogicalLine], pos: &mut usize, parent_indent: Option<usize>) -> Vec<Block> {
    let mut out = Vec::new();
    let mut body_indent: Option<usize> = None;

    while *pos < lines.len() {
        let line = &lines[*pos];
        if let Some(bi) = body_indent {
            if line.indent < bi {
                break;
            }
        } else if let Some(pi) = parent_indent {
            if line.indent <= pi {
                break;
            }
            body_indent = Some(line.indent);
        } else {
            body_indent = Some(line.indent);
        }

        let (header, inline_rest) = classify(&line.text);
        *pos += 1;

        let children = if let Some(rest) = inline_rest {
            let (child_header, nested_rest) = classify(&rest);
            let mut leaf = vec![Block {
                line: line.line,
                header: child_header,
                children: Vec::new(),
            }];
            if let Some(more) = nested_rest {
                let (h2, _) = classify(&more);
                leaf.push(Block {
                    line: line.line,
                    header: h2,
                    children: Vec::new(),
                });
            }
            leaf
        } else if is_compound(&header) {
            build_siblings(lines, pos, body_indent)
        } else {
            Vec::new()
        };

        out.push(Block {
            line: line.line,
            header,
            children,
        });
    }

    out
}

fn is_compound(header: &Header) -> bool {
    matches!(
        header,
        Header::Def { .. }
            | Header::ClassDef { .. }
            | Header::Try
            | Header::Except { .. }
            | Header::Else
            | Header::Finally
            | Header::If(_)
            | Header::Elif(_)
            | Header::While(_)
            | Header::For(_)
            | Header::With(_)
    )
}

/// Classify one logical line's text into a `Header`, plus the remaining
/// text after the colon when the statement is a one-line suite
/// (`def f(): return 1`). Simple statements return `(Stmt(text), None)`.
fn classify(text: &str) -> (Header, Option<String>) {
    let t = text.trim();

    if let Some(rest) = strip_prefix_word(t, "def") {
        return split_header(rest, |sig| {
            let name = sig
                .split(['(', ':'])
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            Header::Def { name }
        });
    }
    if let Some(rest) = strip_prefix_word(t, "async") {
        if let Some(rest) = strip_prefix_word(rest, "def") {
            return split_header(rest, |sig| {
                let name = sig
                    .split(['(', ':'])
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                Header::Def { name }
            });
        }
        if let Some(rest) = strip_prefix_word(rest, "with") {
            return split_header(rest, |h| Header::With(h.trim().to_string()));
        }
        if let Some(rest) = strip_prefix_word(rest, "for") {
            return split_header(rest, |h| Header::For(h.trim().to_string()));
        }
    }
    if let Some(rest) = strip_prefix_word(t, "class") {
        return split_header(rest, |sig| {
            let name_part = sig.split(['(', ':']).next().unwrap_or("").trim();
            let bases = if let (Some(open), Some(close)) = (sig.find('('), sig.rfind(')')) {
                if close > open {
                    split_top_level_commas(&sig[open + 1..close])
                        .into_iter()
                        .map(|b| b.trim().to_string())
                        .filter(|b| !b.is_empty() && !b.contains('='))
                        .collect()
                } else {
                    Vec::new()
                }
            } else {
                Vec::new()
            };
            Header::ClassDef {
                name: name_part.to_string(),
                bases,
            }
        });
    }
    if let Some(rest) = strip_prefix_word(t, "try") {
        if rest.trim_start().starts_with(':') {
            return (Header::Try, None);
        }
    }
    if let Some(rest) = strip_prefix_word(t, "except") {
        return split_header(rest, |h| parse_except(h));
    }
    if let Some(rest) = strip_prefix_word(t, "else") {
        return split_header(rest, |_| Header::Else);
    }
    if let Some(rest) = strip_prefix_word(t, "finally") {
        return split_header(rest, |_| Header::Finally);
    }
    if let Some(rest) = strip_prefix_word(t, "if") {
        return split_header(rest, |h| Header::If(h.trim().to_string()));
    }
    if let Some(rest) = strip_prefix_word(t, "elif") {
        return split_header(rest, |h| Header::Elif(h.trim().to_string()));
    }
    if let Some(rest) = strip_prefix_word(t, "while") {
        return split_header(rest, |h| Header::While(h.trim().to_string()));
    }
    if let Some(rest) = strip_prefix_word(t, "for") {
        return split_header(rest, |h| Header::For(h.trim().to_string()));
    }
    if let Some(rest) = strip_prefix_word(t, "with") {
        return split_header(rest, |h| Header::With(h.trim().to_string()));
    }

    (Header::Stmt(t.to_string()), None)
}

/// An except clause's header text (after `except`, before the final
/// colon) parses into either a bare handler or a type list.
fn parse_except(h: &str) -> Header {
    let h = h.trim();
    if h.is_empty() {
        return Header::Except {
            types: vec!["BaseException".to_string()],
            bare: true,
        };
    }
    // Drop `as name`.
    let type_part = match h.find(" as ") {
        Some(idx) => &h[..idx],
        None => h,
    };
    let type_part = type_part.trim();
    let types: Vec<String> = if type_part.starts_with('(') && type_part.ends_with(')') {
        split_top_level_commas(&type_part[1..type_part.len() - 1])
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        vec![type_part.to_string()]
    };
    let types = if types.is_empty() {
        vec!["BaseException".to_string()]
    } else {
        types
    };
    Header::Except {
        types,
        bare: false,
    }
}

/// Split a header's tail at its terminating top-level colon into
/// `(header_text_before_colon, optional_inline_suite_after_colon)`,
/// then build the `Header` from the part before the colon.
fn split_header(tail: &str, make: impl FnOnce(&str) -> Header) -> (Header, Option<String>) {
    match find_top_level_colon(tail) {
        Some(idx) => {
            let before = &tail[..idx];
            let after = tail[idx + 1..].trim();
            let inline = if after.is_empty() {
                None
            } else {
                Some(after.to_string())
            };
            (make(before), inline)
        }
        None => (make(tail), None),
    }
}

fn find_top_level_colon(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_str: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match in_str {
            Some(q) => {
                if b == b'\\' {
                    continue;
                }
                if b == q {
                    in_str = None;
                }
            }
            None => match b {
                b'\'' | b'"' => in_str = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b':' if depth == 0 => return Some(i),
                _ => {}
            },
        }
    }
    None
}

pub fn split_top_level_commas(s: &str) -> Vec<String> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_str: Option<u8> = None;
    let mut start = 0;
    let mut out = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        match in_str {
            Some(q) => {
                if b == b'\\' {
                    continue;
                }
                if b == q {
                    in_str = None;
                }
            }
            None => match b {
                b'\'' | b'"' => in_str = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b',' if depth == 0 => {
                    out.push(s[start..i].to_string());
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    if start <= s.len() {
        out.push(s[start..].to_string());
    }
    out
}

fn strip_prefix_word<'a>(s: &'a str, word: &str) -> Option<&'a str> {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix(word) {
        if rest.is_empty() || !rest.chars().next().unwrap().is_alphanumeric() && rest.chars().next() != Some('_') {
            return Some(rest);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexlines::logical_lines;

    fn tree_of(src: &str) -> Block {
        build_tree(&logical_lines(src))
    }

    #[test]
    fn function_with_nested_try() {
        let tree = tree_of(
            "def foo():\n    try:\n        pass\n    except KeyError:\n        return None\n",
        );
        assert_eq!(tree.children.len(), 1);
        let def = &tree.children[0];
        assert!(matches!(&def.header, Header::Def { name } if name == "foo"));
        assert_eq!(def.children.len(), 2);
        assert!(matches!(def.children[0].header, Header::Try));
        assert_eq!(def.children[0].children.len(), 1);
        assert!(matches!(def.children[1].header, Header::Except { .. }));
    }

    #[test]
    fn except_is_sibling_of_try() {
        let tree = tree_of("try:\n    pass\nexcept KeyError:\n    return None\n");
        assert_eq!(tree.children.len(), 2);
        assert!(matches!(tree.children[0].header, Header::Try));
        assert!(matches!(&tree.children[1].header, Header::Except{ref types, ..} if types == &["KeyError"]));
    }

    #[test]
    fn one_liner_def_and_raise() {
        let tree = tree_of("def a(): raise ValueError(\"x\")\n");
        let def = &tree.children[0];
        assert!(matches!(&def.header, Header::Def { name } if name == "a"));
        assert_eq!(def.children.len(), 1);
        assert!(matches!(&def.children[0].header, Header::Stmt(s) if s.starts_with("raise")));
    }

    #[test]
    fn bare_except_is_base_exception() {
        let tree = tree_of("try:\n    pass\nexcept:\n    return None\n");
        assert!(matches!(&tree.children[1].header, Header::Except { types, bare } if *bare && types == &["BaseException"]));
    }

    #[test]
    fn tuple_except_splits_types() {
        let tree = tree_of("try:\n    pass\nexcept (KeyError, ValueError):\n    pass\n");
        assert!(
            matches!(&tree.children[1].header, Header::Except { types, .. } if types == &["KeyError".to_string(), "ValueError".to_string()])
        );
    }

    #[test]
    fn class_bases_parsed() {
        let tree = tree_of("class Foo(Bar, Baz):\n    pass\n");
        assert!(
            matches!(&tree.children[0].header, Header::ClassDef { name, bases } if name == "Foo" && bases == &["Bar".to_string(), "Baz".to_string()])
        );
    }
}
