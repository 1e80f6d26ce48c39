//! Data model emitted by the syntax walker (spec §3).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySummary {
    ReRaise,
    Return,
    Assign,
    Log,
    Pass,
    Other,
}

/// A single `raise` statement (explicit) or implicitly-raising construct.
///
/// `snippet` and `try_scope_id` are internal bookkeeping (scope-aware
/// handler matching); the wire format only carries what a caller needs
/// to locate and understand the site (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct RaiseSite {
    pub file: String,
    pub line: u32,
    pub exception_type: String,
    pub function: Option<String>,
    pub class: Option<String>,
    #[serde(skip_serializing)]
    pub snippet: String,
    pub context: String,
    pub implicit: bool,
    #[serde(skip_serializing)]
    pub try_scope_id: Option<u32>,
    pub message: Option<String>,
}

impl RaiseSite {
    /// The (function, class) origin used for polymorphism/entropy counting.
    pub fn origin(&self) -> (String, String) {
        (
            self.function.clone().unwrap_or_default(),
            self.class.clone().unwrap_or_default(),
        )
    }
}

/// A single `except` clause (one per type in a tuple clause).
#[derive(Debug, Clone, Serialize)]
pub struct HandlerSite {
    pub file: String,
    pub line: u32,
    pub exception_type: String,
    pub function: Option<String>,
    pub class: Option<String>,
    #[serde(skip_serializing)]
    pub body_summary: BodySummary,
    #[serde(skip_serializing)]
    pub snippet: String,
    pub re_raises: bool,
    pub returns_value: bool,
    pub assigns_default: bool,
    pub direct_raises_in_scope: u32,
}

/// A call expression found inside a function body.
#[derive(Debug, Clone, Serialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    pub file: String,
    pub line: u32,
}

/// One imported name (or module) from an `import`/`from ... import` line.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRecord {
    pub module: String,
    pub imported_name: String,
    pub alias: String,
    pub file: String,
}

/// `child -> direct parent` exception-class inheritance edge.
#[derive(Debug, Clone, Serialize)]
pub struct ExceptionParent {
    pub child: String,
    pub parent: String,
    pub file: String,
}

/// All records produced by walking a single file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkResult {
    pub raises: Vec<RaiseSite>,
    pub handlers: Vec<HandlerSite>,
    pub call_edges: Vec<CallEdge>,
    pub imports: Vec<ImportRecord>,
    pub exception_parents: Vec<ExceptionParent>,
}

impl WalkResult {
    pub fn merge(&mut self, mut other: WalkResult) {
        self.raises.append(&mut other.raises);
        self.handlers.append(&mut other.handlers);
        self.call_edges.append(&mut other.call_edges);
        self.imports.append(&mut other.imports);
        self.exception_parents.append(&mut other.exception_parents);
    }
}
