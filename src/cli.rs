//! CLI argument parsing and command execution (spec §6).

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use semcross_analysis::{
    analyze_crossings_with_hierarchy, known_functions_by_file, CallGraph, ExceptionHierarchy, ImportIndex, RiskLevel,
};
use semcross_core::error::ScanError;
use semcross_report::ScanReport;

/// Scan a Python source tree for semantic exception-boundary crossings.
#[derive(Parser)]
#[command(name = "semcross")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// File or directory to scan.
    pub path: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable the heuristic implicit-raise detector (subscript access,
    /// bare int()/float(), next() and getattr() without a default,
    /// .index()).
    #[arg(long)]
    pub implicit: bool,

    /// Only report crossings at or above this risk level.
    #[arg(long, value_enum, default_value_t = CliRiskLevel::Low)]
    pub min_risk: CliRiskLevel,

    /// Increase log verbosity (stderr). Repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliRiskLevel {
    Low,
    Medium,
    Elevated,
    High,
}

impl From<CliRiskLevel> for RiskLevel {
    fn from(value: CliRiskLevel) -> Self {
        match value {
            CliRiskLevel::Low => RiskLevel::Low,
            CliRiskLevel::Medium => RiskLevel::Medium,
            CliRiskLevel::Elevated => RiskLevel::Elevated,
            CliRiskLevel::High => RiskLevel::High,
        }
    }
}

/// Run a scan per the parsed CLI arguments and render the report.
pub fn run(cli: &Cli) -> Result<String, ScanError> {
    if !cli.path.exists() {
        return Err(ScanError::PathNotFound { path: cli.path.clone() });
    }

    let (walk_result, diagnostics) = scan_path(&cli.path, cli.implicit)?;

    for diag in &diagnostics {
        tracing::warn!(file = %diag.file, kind = ?diag.kind, message = %diag.message, "file skipped");
    }

    let project_files: Vec<String> = if cli.path.is_dir() {
        semcross_python::files::collect_python_files(&cli.path)
            .iter()
            .map(|f| f.display().to_string())
            .collect()
    } else {
        vec![cli.path.display().to_string()]
    };
    let files_scanned = project_files.len();

    let hierarchy = ExceptionHierarchy::build(&walk_result.exception_parents);
    let import_index = ImportIndex::build(&walk_result.imports, &project_files);
    let known_functions = known_functions_by_file(&walk_result.raises, &walk_result.handlers, &walk_result.call_edges);
    let resolved_call_edges = import_index.resolve_call_edges(&walk_result.call_edges, &known_functions);
    let call_graph = CallGraph::build(&resolved_call_edges);
    tracing::debug!(
        functions = call_graph.function_count(),
        imports = import_index.len(),
        "built call graph and import index"
    );
    let crossings = analyze_crossings_with_hierarchy(
        &walk_result.raises,
        &walk_result.handlers,
        Some(&hierarchy),
        Some(&call_graph),
    );
    let report = ScanReport::new(
        cli.path.display().to_string(),
        files_scanned,
        diagnostics.len(),
        &walk_result.raises,
        &walk_result.handlers,
        crossings,
    )
    .filter_min_risk(cli.min_risk.into());

    match cli.format {
        OutputFormat::Json => report.to_json().map_err(|e| ScanError::InvalidArguments {
            message: format!("failed to serialize report: {e}"),
        }),
        OutputFormat::Text => Ok(report.to_text()),
    }
}

fn scan_path(
    path: &Path,
    detect_implicit: bool,
) -> Result<(semcross_python::WalkResult, Vec<semcross_core::diagnostics::ParseDiagnostic>), ScanError> {
    if path.is_dir() {
        Ok(semcross_python::scan_directory(path, detect_implicit))
    } else {
        let result = semcross_python::scan_file(path, detect_implicit).map_err(|diag| ScanError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, diag.message),
        })?;
        Ok((result, Vec::new()))
    }
}

