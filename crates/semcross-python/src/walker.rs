//! Syntax walker (spec §4.1) and implicit raise detector (spec §4.2).
//!
//! Walks the block tree produced by [`crate::blocks`] and emits the
//! five record collections in [`crate::types::WalkResult`]. Scope
//! (function/class) and try/except association are tracked by simple
//! top-down recursion; no symbol table or type inference is attempted,
//! matching the read-only, best-effort nature of the rest of the walker.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::blocks::{Block, Header};
use crate::types::{BodySummary, CallEdge, ExceptionParent, HandlerSite, ImportRecord, RaiseSite, WalkResult};

/// Per-scan settings threaded through the whole traversal: which file
/// these records belong to, and whether implicit-raise detection
/// (spec §4.2) is enabled. Off by default, since it is a heuristic
/// layer on top of the explicit `raise` statements.
struct Ctx<'a> {
    file: &'a str,
    detect_implicit: bool,
}

/// Walk a parsed module and collect every record.
pub fn walk_module(file: &str, root: &Block, detect_implicit: bool) -> WalkResult {
    let ctx = Ctx { file, detect_implicit };
    let mut out = WalkResult::default();
    let mut scope_counter = 0u32;
    walk_blocks(&root.children, &ctx, None, None, None, &mut out, &mut scope_counter);
    out.exception_parents = filter_exception_parents(out.exception_parents);
    out
}

/// A class only counts as part of the exception hierarchy if its base
/// ends in `Error`/`Exception`/`Warning`, or is itself (transitively)
/// known to be an exception class from another base edge in this file.
/// Ordinary class inheritance (`class Config(BaseSettings)`) never
/// contributes an edge.
fn filter_exception_parents(raw: Vec<ExceptionParent>) -> Vec<ExceptionParent> {
    fn looks_like_exception(name: &str) -> bool {
        name.ends_with("Error") || name.ends_with("Exception") || name.ends_with("Warning")
    }

    let mut known: HashSet<String> = raw
        .iter()
        .flat_map(|e| [e.parent.clone(), e.child.clone()])
        .filter(|name| looks_like_exception(name))
        .collect();

    loop {
        let mut changed = false;
        for edge in &raw {
            if known.contains(&edge.parent) && known.insert(edge.child.clone()) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    raw.into_iter().filter(|e| known.contains(&e.parent)).collect()
}

fn walk_blocks(
    blocks: &[Block],
    ctx: &Ctx,
    function: Option<&str>,
    class: Option<&str>,
    try_scope: Option<u32>,
    out: &mut WalkResult,
    scope_counter: &mut u32,
) {
    let mut last_try: Option<(u32, &Block)> = None;

    for block in blocks {
        match &block.header {
            Header::Module => {}
            Header::Def { name } => {
                walk_blocks(&block.children, ctx, Some(name), class, None, out, scope_counter);
                last_try = None;
            }
            Header::ClassDef { name, bases } => {
                // Only the first positional base is consulted (spec §4.1);
                // mixins listed after it never make a class an exception.
                if let Some(base) = bases.first() {
                    out.exception_parents.push(ExceptionParent {
                        child: name.clone(),
                        parent: base.clone(),
                        file: ctx.file.to_string(),
                    });
                }
                walk_blocks(&block.children, ctx, None, Some(name), None, out, scope_counter);
                last_try = None;
            }
            Header::Try => {
                let scope_id = *scope_counter;
                *scope_counter += 1;
                walk_blocks(&block.children, ctx, function, class, Some(scope_id), out, scope_counter);
                last_try = Some((scope_id, block));
            }
            Header::Except { types, bare } => {
                let direct_raises = last_try
                    .map(|(_, tb)| count_direct_raises(&tb.children))
                    .unwrap_or(0);
                let summary = body_summary(&block.children);
                let re_raises = body_has_bare_reraise(&block.children);
                let returns_value = matches!(summary, BodySummary::Return);
                let assigns_default = matches!(summary, BodySummary::Assign);
                let snippet = format!("except {}:", if *bare { String::new() } else { types.join(", ") });
                for ty in types {
                    out.handlers.push(HandlerSite {
                        file: ctx.file.to_string(),
                        line: block.line,
                        exception_type: ty.clone(),
                        function: function.map(str::to_string),
                        class: class.map(str::to_string),
                        body_summary: summary,
                        snippet: snippet.clone(),
                        re_raises,
                        returns_value,
                        assigns_default,
                        direct_raises_in_scope: direct_raises,
                    });
                }
                walk_blocks(&block.children, ctx, function, class, None, out, scope_counter);
            }
            Header::Else | Header::Finally => {
                walk_blocks(&block.children, ctx, function, class, None, out, scope_counter);
            }
            Header::If(cond) | Header::Elif(cond) | Header::While(cond) | Header::For(cond) | Header::With(cond) => {
                scan_expr_for_calls_and_implicit(cond, block.line, ctx, function, class, try_scope, out);
                walk_blocks(&block.children, ctx, function, class, try_scope, out, scope_counter);
                last_try = None;
            }
            Header::Stmt(text) => {
                handle_stmt(text, block.line, ctx, function, class, try_scope, out);
                last_try = None;
            }
        }
    }
}

fn context_label(function: Option<&str>, class: Option<&str>) -> String {
    match (class, function) {
        (Some(c), Some(f)) => format!("in {c}.{f}"),
        (None, Some(f)) => format!("in {f}"),
        (Some(c), None) => format!("in {c}"),
        (None, None) => "at module level".to_string(),
    }
}

/// Count explicit `raise` statements directly within a try body, descending
/// into nested control flow but not into nested function/class bodies or
/// a further-nested try's own except/else/finally clauses.
fn count_direct_raises(blocks: &[Block]) -> u32 {
    let mut count = 0;
    for block in blocks {
        match &block.header {
            Header::Stmt(text) if is_raise(text) => count += 1,
            Header::If(_) | Header::Elif(_) | Header::While(_) | Header::For(_) | Header::With(_) | Header::Try => {
                count += count_direct_raises(&block.children);
            }
            _ => {}
        }
    }
    count
}

fn is_raise(text: &str) -> bool {
    text == "raise" || text.starts_with("raise ") || text.starts_with("raise(")
}

fn body_summary(blocks: &[Block]) -> BodySummary {
    for block in blocks {
        if let Header::Stmt(text) = &block.header {
            let t = text.trim();
            if is_raise(t) {
                return BodySummary::ReRaise;
            }
            if t == "pass" {
                return BodySummary::Pass;
            }
            if t.starts_with("return") {
                return BodySummary::Return;
            }
            if is_log_call(t) {
                return BodySummary::Log;
            }
            if looks_like_assignment(t) {
                return BodySummary::Assign;
            }
            return BodySummary::Other;
        }
        return BodySummary::Other;
    }
    BodySummary::Pass
}

fn body_has_bare_reraise(blocks: &[Block]) -> bool {
    blocks.iter().any(|b| match &b.header {
        Header::Stmt(text) => text.trim() == "raise",
        Header::If(_) | Header::Elif(_) | Header::Else | Header::With(_) => body_has_bare_reraise(&b.children),
        _ => false,
    })
}

fn is_log_call(t: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(log|logger|logging|self\.log|self\.logger)\.\w+\(").unwrap());
    re.is_match(t)
}

fn looks_like_assignment(t: &str) -> bool {
    find_top_level_assign(t).is_some()
}

fn handle_stmt(
    text: &str,
    line: u32,
    ctx: &Ctx,
    function: Option<&str>,
    class: Option<&str>,
    try_scope: Option<u32>,
    out: &mut WalkResult,
) {
    scan_import(text, ctx.file, out);

    if let Some(rest) = text.strip_prefix("raise ") {
        record_explicit_raise(rest, line, ctx, function, class, try_scope, out);
        return;
    }

    scan_expr_for_calls_and_implicit(text, line, ctx, function, class, try_scope, out);
}

fn scan_import(text: &str, file: &str, out: &mut WalkResult) {
    if let Some(rest) = text.strip_prefix("import ") {
        for item in crate::blocks::split_top_level_commas(rest) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (name, alias) = split_as(item);
            out.imports.push(ImportRecord {
                module: name.clone(),
                imported_name: name,
                alias,
                file: file.to_string(),
            });
        }
    } else if let Some(rest) = text.strip_prefix("from ") {
        if let Some(idx) = rest.find(" import ") {
            let module = rest[..idx].trim().to_string();
            let names = rest[idx + " import ".len()..].trim().trim_matches(|c| c == '(' || c == ')');
            for item in crate::blocks::split_top_level_commas(names) {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                let (name, alias) = split_as(item);
                out.imports.push(ImportRecord {
                    module: module.clone(),
                    imported_name: name,
                    alias,
                    file: file.to_string(),
                });
            }
        }
    }
}

fn split_as(item: &str) -> (String, String) {
    match item.split_once(" as ") {
        Some((name, alias)) => (name.trim().to_string(), alias.trim().to_string()),
        None => (item.trim().to_string(), item.trim().to_string()),
    }
}

fn record_explicit_raise(
    rest: &str,
    line: u32,
    ctx: &Ctx,
    function: Option<&str>,
    class: Option<&str>,
    try_scope: Option<u32>,
    out: &mut WalkResult,
) {
    let rest = rest.trim();
    if rest.is_empty() {
        return;
    }
    // Drop a trailing `from <cause>` clause.
    let head = match rest.find(" from ") {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    let head = head.trim();
    let (exception_type, message) = match head.find('(') {
        Some(idx) => {
            let ty = head[..idx].trim().to_string();
            let args = head[idx + 1..].trim_end_matches(')');
            (ty, first_string_literal(args))
        }
        None => (head.to_string(), None),
    };
    if exception_type.is_empty() {
        return;
    }
    out.raises.push(RaiseSite {
        file: ctx.file.to_string(),
        line,
        exception_type,
        function: function.map(str::to_string),
        class: class.map(str::to_string),
        snippet: format!("raise {rest}"),
        context: context_label(function, class),
        implicit: false,
        try_scope_id: try_scope,
        message,
    });
}

fn first_string_literal(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            let quote = b;
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j] != quote {
                if bytes[j] == b'\\' {
                    j += 1;
                }
                j += 1;
            }
            if j <= bytes.len() {
                return Some(s[start..j.min(bytes.len())].to_string());
            }
        }
        i += 1;
    }
    None
}

fn find_top_level_assign(s: &str) -> Option<usize> {
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
                b'=' if depth == 0 => {
                    let prev = if i > 0 { bytes[i - 1] } else { 0 };
                    let next = bytes.get(i + 1).copied().unwrap_or(0);
                    let aug = b"=!<>+-*/%&|^~@".contains(&prev);
                    if next != b'=' && !aug {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Scan one statement/expression's text for call expressions (for the
/// call graph) and, if enabled, implicit-raise constructs (spec §4.2).
fn scan_expr_for_calls_and_implicit(
    text: &str,
    line: u32,
    ctx: &Ctx,
    function: Option<&str>,
    class: Option<&str>,
    try_scope: Option<u32>,
    out: &mut WalkResult,
) {
    scan_calls(text, line, function, ctx.file, out);

    if !ctx.detect_implicit {
        return;
    }

    // A bare `target[key] = value` store is not itself a load; mask that
    // one occurrence out before scanning for implicit-raise constructs so
    // it isn't misread as a subscript load.
    let scan_text = match find_top_level_assign(text) {
        Some(idx) if is_whole_subscript_target(text[..idx].trim()) => {
            format!("{}{}", " ".repeat(idx), &text[idx..])
        }
        _ => text.to_string(),
    };

    detect_implicit_raises(&scan_text, line, ctx.file, function, class, try_scope, out);
}

fn is_whole_subscript_target(lhs: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*\[[^\[\]]*\]$").unwrap());
    re.is_match(lhs.trim())
}

#[allow(clippy::too_many_arguments)]
fn detect_implicit_raises(
    expr: &str,
    line: u32,
    file: &str,
    function: Option<&str>,
    class: Option<&str>,
    try_scope: Option<u32>,
    out: &mut WalkResult,
) {
    static SUBSCRIPT: OnceLock<Regex> = OnceLock::new();
    static INT_FLOAT: OnceLock<Regex> = OnceLock::new();
    static NEXT: OnceLock<Regex> = OnceLock::new();
    static GETATTR: OnceLock<Regex> = OnceLock::new();
    static INDEX_METHOD: OnceLock<Regex> = OnceLock::new();

    let subscript = SUBSCRIPT.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*\[[^\[\]]*\]").unwrap());
    let int_float = INT_FLOAT.get_or_init(|| Regex::new(r"\b(int|float)\(\s*[^)\s][^)]*\)").unwrap());
    let next_call = NEXT.get_or_init(|| Regex::new(r"\bnext\(([^()]*)\)").unwrap());
    let getattr_call = GETATTR.get_or_init(|| Regex::new(r"\bgetattr\(([^()]*)\)").unwrap());
    let index_method = INDEX_METHOD.get_or_init(|| Regex::new(r"\.index\(").unwrap());

    for m in subscript.find_iter(expr) {
        emit_implicit("KeyError", m.as_str(), line, file, function, class, try_scope, out);
    }
    for m in int_float.find_iter(expr) {
        emit_implicit("ValueError", m.as_str(), line, file, function, class, try_scope, out);
    }
    for caps in next_call.captures_iter(expr) {
        let args = crate::blocks::split_top_level_commas(&caps[1]);
        if args.iter().filter(|a| !a.trim().is_empty()).count() <= 1 {
            emit_implicit("StopIteration", &caps[0], line, file, function, class, try_scope, out);
        }
    }
    for caps in getattr_call.captures_iter(expr) {
        let args = crate::blocks::split_top_level_commas(&caps[1]);
        if args.iter().filter(|a| !a.trim().is_empty()).count() <= 2 {
            emit_implicit("AttributeError", &caps[0], line, file, function, class, try_scope, out);
        }
    }
    if index_method.is_match(expr) {
        emit_implicit("ValueError", ".index(...)", line, file, function, class, try_scope, out);
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_implicit(
    exception_type: &str,
    snippet: &str,
    line: u32,
    file: &str,
    function: Option<&str>,
    class: Option<&str>,
    try_scope: Option<u32>,
    out: &mut WalkResult,
) {
    out.raises.push(RaiseSite {
        file: file.to_string(),
        line,
        exception_type: exception_type.to_string(),
        function: function.map(str::to_string),
        class: class.map(str::to_string),
        snippet: snippet.to_string(),
        context: context_label(function, class),
        implicit: true,
        try_scope_id: try_scope,
        message: None,
    });
}

/// Record a call edge for every call expression in `text`. `caller` is
/// qualified as `file:function` so the call graph can tell apart
/// same-named functions in different files (spec §4.4's "qualified
/// function identifiers"). The captured callee keeps its dotted form
/// only when the leading segment is a name this file imported as a
/// module alias (spec §4.1: "dotted module calls keep the first dotted
/// prefix for import resolution"); any other dotted chain is a method
/// or attribute call, which collapses to its rightmost identifier.
fn scan_calls(text: &str, line: u32, function: Option<&str>, file: &str, out: &mut WalkResult) {
    static CALL_RE: OnceLock<Regex> = OnceLock::new();
    let re = CALL_RE.get_or_init(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_.]*)\s*\(").unwrap());
    let Some(function) = function else { return };
    let caller = format!("{file}:{function}");
    let module_aliases: HashSet<String> = out
        .imports
        .iter()
        .filter(|r| r.file == file && r.module == r.imported_name)
        .map(|r| r.alias.clone())
        .collect();

    for caps in re.captures_iter(text) {
        let raw = &caps[1];
        if is_keyword_or_builtin_raise(raw) {
            continue;
        }
        let callee = match raw.split_once('.') {
            Some((prefix, _)) if module_aliases.contains(prefix) => raw.to_string(),
            Some(_) => raw.rsplit('.').next().unwrap_or(raw).to_string(),
            None => raw.to_string(),
        };
        out.call_edges.push(CallEdge { caller: caller.clone(), callee, file: file.to_string(), line });
    }
}

fn is_keyword_or_builtin_raise(name: &str) -> bool {
    matches!(
        name,
        "if" | "while" | "for" | "with" | "return" | "raise" | "print" | "len" | "super" | "int" | "float" | "str"
    )
}
