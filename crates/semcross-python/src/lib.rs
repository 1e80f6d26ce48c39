//! Python source walker: raise/handler/call/import extraction.
//!
//! This crate provides the Syntax Walker and Implicit Raise Detector:
//!
//! - `lexlines`: logical-line assembly (bracket/backslash continuations, comment stripping)
//! - `blocks`: indentation-based block tree over logical lines
//! - `walker`: block tree traversal emitting raise/handler/call/import/inheritance records
//! - `types`: shared data model for the records above
//! - `files`: Python file discovery

pub mod blocks;
pub mod files;
pub mod lexlines;
pub mod types;
pub mod walker;

use std::path::Path;

use semcross_core::diagnostics::ParseDiagnostic;

pub use types::{BodySummary, CallEdge, ExceptionParent, HandlerSite, ImportRecord, RaiseSite, WalkResult};

/// Scan already-loaded source text for one file. `detect_implicit`
/// enables the heuristic implicit-raise detector (spec §4.2); it is off
/// by default in the CLI unless `--implicit` is passed.
pub fn scan_source(file: &str, source: &str, detect_implicit: bool) -> WalkResult {
    let lines = lexlines::logical_lines(source);
    let tree = blocks::build_tree(&lines);
    walker::walk_module(file, &tree, detect_implicit)
}

/// Read and scan a single file. IO failure is reported as a diagnostic,
/// never a fatal error: the caller decides whether to keep scanning.
pub fn scan_file(path: &Path, detect_implicit: bool) -> Result<WalkResult, ParseDiagnostic> {
    let display = path.display().to_string();
    let source = files::read_source(path).map_err(|e| ParseDiagnostic::io(display.clone(), e.to_string()))?;
    Ok(scan_source(&display, &source, detect_implicit))
}

/// Scan every Python file under `root`, merging their records. Per-file
/// read failures are collected as diagnostics and do not stop the walk.
pub fn scan_directory(root: &Path, detect_implicit: bool) -> (WalkResult, Vec<ParseDiagnostic>) {
    let mut merged = WalkResult::default();
    let mut diagnostics = Vec::new();

    for path in files::collect_python_files(root) {
        match scan_file(&path, detect_implicit) {
            Ok(result) => merged.merge(result),
            Err(diag) => {
                tracing::warn!(file = %diag.file, message = %diag.message, "skipping file");
                diagnostics.push(diag);
            }
        }
    }

    (merged, diagnostics)
}
