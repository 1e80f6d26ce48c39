//! Crossing analysis over the records produced by `semcross-python`.
//!
//! - `imports`: Import Resolver — local name to module mapping
//! - `callgraph`: Call Graph — reachability over call edges
//! - `hierarchy`: Exception Hierarchy — transitive descendant queries
//! - `crossing`: Crossing Analyzer — grouping, polymorphism, risk scoring
//! - `information`: Information Theory — entropy/discrimination/loss/collapse

pub mod callgraph;
pub mod crossing;
pub mod hierarchy;
pub mod imports;
pub mod information;

pub use callgraph::CallGraph;
pub use crossing::{analyze_crossings, analyze_crossings_with_hierarchy, RiskLevel, SemanticCrossing};
pub use hierarchy::ExceptionHierarchy;
pub use imports::{known_functions_by_file, ImportIndex};
pub use information::{profile, InformationProfile};
