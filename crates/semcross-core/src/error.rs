//! Error types and error code constants for semcross.
//!
//! This module provides a unified error type (`ScanError`) for everything
//! that can abort the CLI, plus the exit-code mapping it carries.
//!
//! Per §7 of the spec, parse failures and unreadable files are *not*
//! represented here — those are aggregated into [`crate::ParseDiagnostic`]
//! and never propagate past the file they occurred in. `ScanError` exists
//! only for the genuinely fatal conditions: a bad CLI invocation, or the
//! scan root itself being unreadable.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Exit-code-bearing error classification for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Bad CLI arguments (exit 2).
    InvalidArguments = 2,
    /// Unrecoverable I/O, e.g. the scan root doesn't exist (exit 1).
    Io = 1,
}

impl OutputErrorCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Unified error type for the semcross CLI.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub fn code(&self) -> OutputErrorCode {
        match self {
            ScanError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ScanError::PathNotFound { .. } | ScanError::Io { .. } => OutputErrorCode::Io,
        }
    }
}
