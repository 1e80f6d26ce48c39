//! semcross: static analysis for semantic exception-boundary crossings
//! in Python source trees.
//!
//! The CLI wiring lives here so the binary (`src/main.rs`) stays a thin
//! wrapper; `cli::run` is what the integration tests drive directly.

pub mod cli;
