//! Report Aggregator (spec §4.8).
//!
//! Bundles a directory scan's raise/handler records and crossings into
//! a `ScanReport`: a `summary` of whole-scan counters plus the ranked
//! `crossings` array, with JSON serialization for machine consumption
//! and a condensed text summary for terminal use.

use semcross_analysis::{RiskLevel, SemanticCrossing};
use semcross_python::{HandlerSite, RaiseSite};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub root: String,
    pub files_scanned: usize,
    pub parse_errors: usize,
    pub total_raises: usize,
    pub explicit_raises: usize,
    pub implicit_raises: usize,
    pub total_handlers: usize,
    pub total_crossings: usize,
    pub polymorphic_crossings: usize,
    pub risky_crossings: usize,
    pub total_information_loss_bits: f64,
    pub mean_collapse_ratio: f64,
}

/// The (file, line) of the earliest-sorting raise site in a crossing,
/// used as the final determinism tiebreaker when risk and exception
/// name are equal (e.g. two EmptyFamily orphans).
fn first_raise_location(c: &SemanticCrossing) -> Option<(String, u32)> {
    c.raise_sites.iter().map(|r| (r.file.clone(), r.line)).min()
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub summary: Summary,
    pub crossings: Vec<SemanticCrossing>,
}

impl ScanReport {
    pub fn new(
        root: String,
        files_scanned: usize,
        parse_errors: usize,
        raises: &[RaiseSite],
        handlers: &[HandlerSite],
        mut crossings: Vec<SemanticCrossing>,
    ) -> Self {
        crossings.sort_by(|a, b| {
            b.risk_level
                .cmp(&a.risk_level)
                .then_with(|| a.exception_type.cmp(&b.exception_type))
                .then_with(|| first_raise_location(a).cmp(&first_raise_location(b)))
        });

        let total_raises = raises.len();
        let explicit_raises = raises.iter().filter(|r| !r.implicit).count();
        let implicit_raises = total_raises - explicit_raises;
        let polymorphic_crossings = crossings.iter().filter(|c| c.is_polymorphic).count();
        let risky_crossings = crossings.iter().filter(|c| c.risk_level > RiskLevel::Low).count();
        let total_information_loss_bits =
            crossings.iter().map(|c| c.information_theory.information_loss_bits).sum();
        let mean_collapse_ratio = if crossings.is_empty() {
            0.0
        } else {
            crossings.iter().map(|c| c.information_theory.collapse_ratio).sum::<f64>() / crossings.len() as f64
        };

        let summary = Summary {
            root,
            files_scanned,
            parse_errors,
            total_raises,
            explicit_raises,
            implicit_raises,
            total_handlers: handlers.len(),
            total_crossings: crossings.len(),
            polymorphic_crossings,
            risky_crossings,
            total_information_loss_bits,
            mean_collapse_ratio,
        };

        Self { summary, crossings }
    }

    /// Keep only crossings at or above `min_risk`. The summary reflects
    /// the whole scan regardless of this filter; only the displayed
    /// crossing list narrows.
    pub fn filter_min_risk(mut self, min_risk: RiskLevel) -> Self {
        self.crossings.retain(|c| c.risk_level >= min_risk);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let s = &self.summary;
        let mut lines = vec![format!(
            "scanned {} file(s) under {} ({} parse error(s)), {} crossing(s) ({} polymorphic, {} risky)",
            s.files_scanned, s.root, s.parse_errors, self.crossings.len(), s.polymorphic_crossings, s.risky_crossings
        )];
        lines.push(format!(
            "raises: {} ({} explicit, {} implicit) across {} handler site(s)",
            s.total_raises, s.explicit_raises, s.implicit_raises, s.total_handlers
        ));
        lines.push(format!(
            "information loss: {:.2} bits total, mean collapse ratio {:.2}",
            s.total_information_loss_bits, s.mean_collapse_ratio
        ));
        if self.crossings.is_empty() {
            lines.push("no semantic boundary crossings found.".to_string());
            return lines.join("\n");
        }
        lines.push(String::new());
        for crossing in &self.crossings {
            lines.push(format!(
                "[{}] {} — {} raise site(s), {} handler site(s){}",
                crossing.risk_level.as_str(),
                crossing.exception_type,
                crossing.raise_sites.len(),
                crossing.handler_sites.len(),
                if crossing.is_polymorphic { ", polymorphic" } else { "" },
            ));
            lines.push(format!("  {}", crossing.description));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semcross_analysis::{analyze_crossings, information};
    use semcross_python::BodySummary;

    fn raise(exception_type: &str, function: &str, implicit: bool) -> RaiseSite {
        RaiseSite {
            file: "a.py".to_string(),
            line: 1,
            exception_type: exception_type.to_string(),
            function: Some(function.to_string()),
            class: None,
            snippet: String::new(),
            context: String::new(),
            implicit,
            try_scope_id: None,
            message: None,
        }
    }

    fn handler(exception_type: &str) -> HandlerSite {
        HandlerSite {
            file: "a.py".to_string(),
            line: 100,
            exception_type: exception_type.to_string(),
            function: Some("h".to_string()),
            class: None,
            body_summary: BodySummary::Other,
            snippet: String::new(),
            re_raises: false,
            returns_value: true,
            assigns_default: false,
            direct_raises_in_scope: 0,
        }
    }

    #[test]
    fn summary_counts_raises_and_handlers() {
        let raises = vec![raise("ValueError", "a", false), raise("ValueError", "b", true)];
        let handlers = vec![handler("ValueError")];
        let crossings = analyze_crossings(&raises, &handlers);
        let report = ScanReport::new("proj".to_string(), 2, 0, &raises, &handlers, crossings);

        assert_eq!(report.summary.total_raises, 2);
        assert_eq!(report.summary.explicit_raises, 1);
        assert_eq!(report.summary.implicit_raises, 1);
        assert_eq!(report.summary.total_handlers, 1);
        assert_eq!(report.summary.total_crossings, 1);
        assert_eq!(report.summary.polymorphic_crossings, 1);
    }

    #[test]
    fn summary_low_risk_only_when_no_findings() {
        let report = ScanReport::new("proj".to_string(), 2, 0, &[], &[], vec![]);
        assert_eq!(report.summary.risky_crossings, 0);
        assert_eq!(report.summary.total_crossings, 0);
        assert_eq!(report.summary.mean_collapse_ratio, 0.0);
    }

    #[test]
    fn filter_min_risk_drops_low_findings_but_keeps_summary() {
        let raises = vec![raise("A", "f1", false)];
        let handlers: Vec<HandlerSite> = vec![];
        let crossings = analyze_crossings(&raises, &handlers);
        let report = ScanReport::new("proj".to_string(), 1, 0, &raises, &handlers, crossings)
            .filter_min_risk(RiskLevel::High);
        assert_eq!(report.crossings.len(), 0);
        assert_eq!(report.summary.total_raises, 1);
    }

    #[test]
    fn crossings_sorted_highest_risk_first() {
        let raises = vec![
            raise("A", "f1", false),
            raise("B", "f1", false),
            raise("B", "f2", false),
            raise("B", "f3", false),
            raise("B", "f4", false),
        ];
        let handlers = vec![handler("A"), handler("B")];
        let crossings = analyze_crossings(&raises, &handlers);
        let report = ScanReport::new("proj".to_string(), 1, 0, &raises, &handlers, crossings);
        assert_eq!(report.crossings[0].exception_type, "B");
    }

    #[test]
    fn ties_on_risk_and_exception_name_break_on_first_raise_site_location() {
        // Two crossings that would otherwise be indistinguishable by
        // risk and exception name alone (a pathological case that can't
        // arise from grouping, but the comparator must still order it).
        let mut late = raise("A", "f1", false);
        late.file = "z_late.py".to_string();
        late.line = 99;
        let mut early = raise("A", "f1", false);
        early.file = "a_early.py".to_string();
        early.line = 1;

        let late_crossing = SemanticCrossing {
            exception_type: "A".to_string(),
            is_polymorphic: false,
            has_uniform_handler: true,
            risk_level: RiskLevel::Low,
            description: String::new(),
            raise_sites: vec![late],
            handler_sites: vec![],
            information_theory: information::profile(&[], &[]),
        };
        let early_crossing = SemanticCrossing {
            exception_type: "A".to_string(),
            is_polymorphic: false,
            has_uniform_handler: true,
            risk_level: RiskLevel::Low,
            description: String::new(),
            raise_sites: vec![early],
            handler_sites: vec![],
            information_theory: information::profile(&[], &[]),
        };

        let report = ScanReport::new("proj".to_string(), 1, 0, &[], &[], vec![late_crossing, early_crossing]);
        assert_eq!(report.crossings[0].raise_sites[0].file, "a_early.py");
        assert_eq!(report.crossings[1].raise_sites[0].file, "z_late.py");
    }

    #[test]
    fn text_output_mentions_summary_and_findings() {
        let raises = vec![raise("KeyError", "f1", false), raise("KeyError", "f2", false)];
        let handlers = vec![handler("KeyError")];
        let crossings = analyze_crossings(&raises, &handlers);
        let report = ScanReport::new("proj".to_string(), 1, 0, &raises, &handlers, crossings);
        let text = report.to_text();
        assert!(text.contains("KeyError"));
        assert!(text.contains("information loss"));
    }

    #[test]
    fn information_theory_is_embedded_per_crossing() {
        let raises = vec![raise("A", "f1", false), raise("A", "f2", false)];
        let handlers: Vec<HandlerSite> = vec![];
        let crossings = analyze_crossings(&raises, &handlers);
        let expected = information::profile(&raises, &handlers);
        assert!((crossings[0].information_theory.semantic_entropy_bits - expected.semantic_entropy_bits).abs() < 1e-9);
    }
}
