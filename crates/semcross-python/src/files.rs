//! Python source file discovery (spec §6).
//!
//! Walks a directory tree, skipping hidden directories (`.git`,
//! `.venv`, ...) and `__pycache__`, and returns every `.py` file found.
//! Sorted for deterministic scan ordering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

const SKIP_DIR_NAMES: &[&str] = &["__pycache__", "node_modules", ".venv", "venv", ".tox", ".mypy_cache"];

/// Collect every `.py` file under `root`, skipping hidden directories and
/// common non-source directories.
pub fn collect_python_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('.') {
                return false;
            }
            !SKIP_DIR_NAMES.contains(&name.as_ref())
        })
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "py"))
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Read a single source file as UTF-8 text.
pub fn read_source(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}
