//! Per-file scan diagnostics (spec §7: ParseError / IOError handling).
//!
//! These never abort a scan: a file that fails to parse or read is
//! recorded here and skipped, and the directory walk continues.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Parse,
    Io,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseDiagnostic {
    pub file: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl ParseDiagnostic {
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            kind: DiagnosticKind::Parse,
            message: message.into(),
        }
    }

    pub fn io(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            kind: DiagnosticKind::Io,
            message: message.into(),
        }
    }
}
