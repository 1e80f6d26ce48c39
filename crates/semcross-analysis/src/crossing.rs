//! Crossing Analyzer (spec §4.6).
//!
//! Groups raise sites by the top-of-chain ancestor of their exception
//! type within the project's known hierarchy (the "family root"),
//! associates each family with the handlers that can actually catch it
//! and are reachable from at least one of its raise sites, and scores
//! how risky collapsing the family's distinct call-site meanings into
//! those handlers is.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use semcross_python::{BodySummary, HandlerSite, RaiseSite};
use serde::Serialize;

use crate::callgraph::CallGraph;
use crate::hierarchy::ExceptionHierarchy;
use crate::information::{self, InformationProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    Elevated,
    High,
}

impl RiskLevel {
    fn rank(self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::Elevated => 2,
            RiskLevel::High => 3,
        }
    }

    fn from_rank(rank: u8) -> Self {
        match rank.min(3) {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            2 => RiskLevel::Elevated,
            _ => RiskLevel::High,
        }
    }

    /// One rank more severe, capped at `High`.
    fn step_up(self) -> Self {
        Self::from_rank(self.rank() + 1)
    }

    /// One rank less severe, floored at `Low`.
    fn step_down(self) -> Self {
        Self::from_rank(self.rank().saturating_sub(1))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::Elevated => "elevated",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "elevated" => Some(RiskLevel::Elevated),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl PartialOrd for RiskLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RiskLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SemanticCrossing {
    pub exception_type: String,
    pub is_polymorphic: bool,
    pub has_uniform_handler: bool,
    pub risk_level: RiskLevel,
    pub description: String,
    pub raise_sites: Vec<RaiseSite>,
    pub handler_sites: Vec<HandlerSite>,
    pub information_theory: InformationProfile,
}

/// Group raise/handler sites with no hierarchy or call-graph awareness:
/// every exception type is its own family root, and a handler in the
/// same file is the only reachability fallback available.
pub fn analyze_crossings(raises: &[RaiseSite], handlers: &[HandlerSite]) -> Vec<SemanticCrossing> {
    analyze_crossings_with_hierarchy(raises, handlers, None, None)
}

/// Group raises by family root, associate each family with its
/// reachable handlers, and classify risk (spec §4.6 steps 1-3).
pub fn analyze_crossings_with_hierarchy(
    raises: &[RaiseSite],
    handlers: &[HandlerSite],
    hierarchy: Option<&ExceptionHierarchy>,
    call_graph: Option<&CallGraph>,
) -> Vec<SemanticCrossing> {
    let root_of = |exception_type: &str| -> String {
        hierarchy.map(|h| h.family_root(exception_type)).unwrap_or_else(|| exception_type.to_string())
    };

    let mut by_root: HashMap<String, Vec<&RaiseSite>> = HashMap::new();
    for raise in raises {
        by_root.entry(root_of(&raise.exception_type)).or_default().push(raise);
    }

    let mut consumed = vec![false; handlers.len()];
    let mut crossings: Vec<SemanticCrossing> = by_root
        .into_iter()
        .map(|(root, raise_refs)| {
            let raise_sites: Vec<RaiseSite> = raise_refs.into_iter().cloned().collect();
            for (idx, h) in handlers.iter().enumerate() {
                if associates(&h.exception_type, &root, hierarchy) {
                    consumed[idx] = true;
                }
            }
            let handler_sites: Vec<HandlerSite> = handlers
                .iter()
                .filter(|h| associates(&h.exception_type, &root, hierarchy))
                .filter(|h| raise_sites.iter().any(|r| reachable(h, r, call_graph)))
                .cloned()
                .collect();
            build_crossing(root, raise_sites, handler_sites, call_graph)
        })
        .collect();

    // EmptyFamily (spec §7): a handler whose declared type never
    // associates with any raised family root still surfaces, as a
    // low-risk, raise-less crossing grouped by its own family root.
    let mut orphan_roots: Vec<String> = Vec::new();
    for (idx, h) in handlers.iter().enumerate() {
        if !consumed[idx] {
            let own_root = root_of(&h.exception_type);
            if !orphan_roots.contains(&own_root) {
                orphan_roots.push(own_root);
            }
        }
    }
    for root in orphan_roots {
        let handler_sites: Vec<HandlerSite> = handlers
            .iter()
            .enumerate()
            .filter(|(idx, h)| !consumed[*idx] && root_of(&h.exception_type) == root)
            .map(|(_, h)| h.clone())
            .collect();
        crossings.push(build_crossing(root, Vec::new(), handler_sites, call_graph));
    }

    crossings.sort_by(|a, b| a.exception_type.cmp(&b.exception_type));
    crossings
}

fn build_crossing(
    exception_type: String,
    raise_sites: Vec<RaiseSite>,
    handler_sites: Vec<HandlerSite>,
    call_graph: Option<&CallGraph>,
) -> SemanticCrossing {
    let distinct_origins = distinct_origin_count(&raise_sites);
    let is_polymorphic = distinct_origins >= 2;
    let has_uniform_handler = uniform(&handler_sites);
    let explicit = raise_sites.iter().filter(|r| !r.implicit).count();
    let implicit = raise_sites.iter().filter(|r| r.implicit).count();
    let mixed = explicit > 0 && implicit > 0;

    let mut risk_level = classify_risk(distinct_origins, mixed, &handler_sites);

    let scope_mismatch = !handler_sites.is_empty() && handler_sites.iter().all(|h| h.direct_raises_in_scope == 0);
    if scope_mismatch {
        risk_level = risk_level.step_up();
    }

    let message_downgrade = handler_sites.len() >= 2 && distinct_nonempty_messages(&raise_sites);
    if message_downgrade {
        risk_level = risk_level.step_down();
    }

    let call_graph_confirmed = call_graph_confirms_all(&raise_sites, &handler_sites, call_graph);

    let description = describe(
        &exception_type,
        explicit,
        implicit,
        &handler_sites,
        is_polymorphic,
        scope_mismatch,
        message_downgrade,
        call_graph_confirmed,
    );
    let information_theory = information::profile(&raise_sites, &handler_sites);

    SemanticCrossing {
        exception_type,
        is_polymorphic,
        has_uniform_handler,
        risk_level,
        description,
        raise_sites,
        handler_sites,
        information_theory,
    }
}

/// A handler is associated with a family if it shares the family root
/// exactly, is an ancestor of it, or is a more specific descendant of
/// it (spec §4.6 step 1). Bidirectional, unlike plain descendant checks.
fn associates(handler_type: &str, root: &str, hierarchy: Option<&ExceptionHierarchy>) -> bool {
    if handler_type == root {
        return true;
    }
    hierarchy.is_some_and(|h| h.is_descendant(root, handler_type) || h.is_descendant(handler_type, root))
}

/// Whether `raise` can actually propagate up to `handler` (spec §4.6
/// step 2): same file is a conservative fallback when edges are
/// unresolved or local, otherwise the call graph must show a path from
/// the handler's enclosing function to the raise's.
fn reachable(handler: &HandlerSite, raise: &RaiseSite, call_graph: Option<&CallGraph>) -> bool {
    if handler.file == raise.file {
        return true;
    }
    let Some(graph) = call_graph else { return false };
    reaches_via_graph(handler, raise, graph)
}

fn reaches_via_graph(handler: &HandlerSite, raise: &RaiseSite, graph: &CallGraph) -> bool {
    let (Some(handler_fn), Some(raise_fn)) = (&handler.function, &raise.function) else { return false };
    let handler_id = format!("{}:{handler_fn}", handler.file);
    let raise_id = format!("{}:{raise_fn}", raise.file);
    graph.can_reach(&handler_id, &raise_id)
}

/// True when every raise site in the family is confirmed reachable by
/// some handler strictly through the call graph (not the same-file
/// fallback) — the crossing is genuinely cross-file.
fn call_graph_confirms_all(raise_sites: &[RaiseSite], handler_sites: &[HandlerSite], call_graph: Option<&CallGraph>) -> bool {
    let Some(graph) = call_graph else { return false };
    if raise_sites.is_empty() || handler_sites.is_empty() {
        return false;
    }
    raise_sites.iter().all(|r| handler_sites.iter().any(|h| reaches_via_graph(h, r, graph)))
}

fn distinct_origin_count(raise_sites: &[RaiseSite]) -> usize {
    raise_sites.iter().map(RaiseSite::origin).collect::<HashSet<_>>().len()
}

fn distinct_nonempty_messages(raise_sites: &[RaiseSite]) -> bool {
    if raise_sites.is_empty() {
        return false;
    }
    let mut seen = HashSet::new();
    for raise in raise_sites {
        match &raise.message {
            Some(message) if !message.is_empty() => {
                if !seen.insert(message.as_str()) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

fn uniform(handlers: &[HandlerSite]) -> bool {
    if handlers.len() < 2 {
        return true;
    }
    let first = handler_signature(&handlers[0]);
    handlers.iter().all(|h| handler_signature(h) == first)
}

fn handler_signature(h: &HandlerSite) -> (bool, bool, bool) {
    (h.re_raises, h.returns_value, h.assigns_default)
}

/// Base risk before the scope-mismatch upgrade and message-differentiation
/// downgrade (spec §4.6 Classification), evaluated most-specific-first.
fn classify_risk(distinct_origins: usize, mixed: bool, handler_sites: &[HandlerSite]) -> RiskLevel {
    if handler_sites.is_empty() || distinct_origins <= 1 {
        return RiskLevel::Low;
    }
    if mixed {
        return RiskLevel::High;
    }
    if distinct_origins >= 4 {
        if handler_sites.len() == 1 && matches!(handler_sites[0].body_summary, BodySummary::Return | BodySummary::Assign) {
            return RiskLevel::High;
        }
        if handler_sites.len() == 1 || handler_sites.len() == 2 {
            return RiskLevel::Elevated;
        }
    }
    RiskLevel::Medium
}

#[allow(clippy::too_many_arguments)]
fn describe(
    exception_type: &str,
    explicit: usize,
    implicit: usize,
    handlers: &[HandlerSite],
    is_polymorphic: bool,
    scope_mismatch: bool,
    message_downgrade: bool,
    call_graph_confirmed: bool,
) -> String {
    let handler_clause = if handlers.is_empty() {
        "no handler in scope".to_string()
    } else {
        format!("{} handler site(s)", handlers.len())
    };
    let mut description = format!(
        "{exception_type} raised at {} site(s) ({explicit} explicit, {implicit} implicit), caught by {handler_clause}",
        explicit + implicit
    );

    let mut notes = Vec::new();
    if is_polymorphic {
        notes.push("Polymorphic");
    }
    if scope_mismatch {
        notes.push("Handler scope mismatch — catches only from called functions");
    }
    if message_downgrade {
        notes.push("Downgraded: distinct messages with multiple handlers");
    }
    if call_graph_confirmed {
        notes.push("Call graph: handler reaches all raise sites");
    }
    if !notes.is_empty() {
        description.push_str(" — ");
        description.push_str(&notes.join("; "));
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn handler(exception_type: &str, re_raises: bool, returns_value: bool, assigns_default: bool) -> HandlerSite {
        let body_summary = if re_raises {
            BodySummary::ReRaise
        } else if returns_value {
            BodySummary::Return
        } else if assigns_default {
            BodySummary::Assign
        } else {
            BodySummary::Other
        };
        HandlerSite {
            file: "a.py".to_string(),
            line: 10,
            exception_type: exception_type.to_string(),
            function: Some("h".to_string()),
            class: None,
            body_summary,
            snippet: String::new(),
            re_raises,
            returns_value,
            assigns_default,
            // Nonzero by default so ordinary tests don't accidentally
            // trip the scope-mismatch upgrade; tests exercising it set
            // this to 0 explicitly.
            direct_raises_in_scope: 1,
        }
    }

    #[test]
    fn polymorphic_crossing_detected() {
        let raises = vec![raise("KeyError", "f1", false), raise("KeyError", "f2", false)];
        let handlers = vec![handler("KeyError", false, true, false)];
        let crossings = analyze_crossings(&raises, &handlers);
        let key = crossings.iter().find(|c| c.exception_type == "KeyError").unwrap();
        assert!(key.is_polymorphic);
        assert_eq!(key.raise_sites.len(), 2);
        assert_eq!(key.handler_sites.len(), 1);
    }

    #[test]
    fn polymorphism_is_based_on_distinct_origins_not_raw_raise_count() {
        let raises = vec![raise("KeyError", "f1", false), raise("KeyError", "f1", false)];
        let handlers = vec![handler("KeyError", false, true, false)];
        let crossings = analyze_crossings(&raises, &handlers);
        let key = crossings.iter().find(|c| c.exception_type == "KeyError").unwrap();
        assert!(!key.is_polymorphic);
        assert_eq!(key.raise_sites.len(), 2);
    }

    #[test]
    fn many_raises_one_handler_is_high_risk() {
        let raises = vec![
            raise("ValueError", "a", false),
            raise("ValueError", "b", false),
            raise("ValueError", "c", false),
            raise("ValueError", "d", false),
        ];
        let handlers = vec![handler("ValueError", false, true, false)];
        let crossings = analyze_crossings(&raises, &handlers);
        let val = crossings.iter().find(|c| c.exception_type == "ValueError").unwrap();
        assert_eq!(val.risk_level, RiskLevel::High);
    }

    #[test]
    fn four_origins_with_two_handlers_is_elevated_not_high() {
        let raises = vec![
            raise("ValueError", "a", false),
            raise("ValueError", "b", false),
            raise("ValueError", "c", false),
            raise("ValueError", "d", false),
        ];
        let handlers = vec![handler("ValueError", false, false, false), handler("ValueError", true, false, false)];
        let crossings = analyze_crossings(&raises, &handlers);
        let val = crossings.iter().find(|c| c.exception_type == "ValueError").unwrap();
        assert_eq!(val.risk_level, RiskLevel::Elevated);
    }

    #[test]
    fn single_raise_is_low_risk() {
        let raises = vec![raise("ValueError", "foo", false)];
        let handlers = vec![handler("ValueError", false, true, false)];
        let crossings = analyze_crossings(&raises, &handlers);
        let val = crossings.iter().find(|c| c.exception_type == "ValueError").unwrap();
        assert_eq!(val.risk_level, RiskLevel::Low);
    }

    #[test]
    fn no_handlers_is_low_risk() {
        let raises = vec![raise("KeyError", "foo", false), raise("KeyError", "bar", false)];
        let crossings = analyze_crossings(&raises, &[]);
        let key = crossings.iter().find(|c| c.exception_type == "KeyError").unwrap();
        assert_eq!(key.risk_level, RiskLevel::Low);
    }

    #[test]
    fn mixed_explicit_implicit_is_high_risk() {
        let raises = vec![raise("ValueError", "explicit_raise", false), raise("ValueError", "parse_number", true)];
        let handlers = vec![handler("ValueError", false, true, false)];
        let crossings = analyze_crossings(&raises, &handlers);
        let val = crossings.iter().find(|c| c.exception_type == "ValueError").unwrap();
        assert_eq!(val.risk_level, RiskLevel::High);
        assert!(val.description.contains("explicit"));
        assert!(val.description.contains("implicit"));
    }

    #[test]
    fn uniform_handlers_detected() {
        let raises = vec![raise("KeyError", "f1", false), raise("KeyError", "f2", false)];
        let handlers = vec![
            handler("KeyError", false, true, false),
            handler("KeyError", false, true, false),
        ];
        let crossings = analyze_crossings(&raises, &handlers);
        let key = crossings.iter().find(|c| c.exception_type == "KeyError").unwrap();
        assert!(key.has_uniform_handler);
    }

    #[test]
    fn risk_level_ordering_for_min_risk_filter() {
        assert!(RiskLevel::High > RiskLevel::Elevated);
        assert!(RiskLevel::Elevated > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
    }

    #[test]
    fn handler_for_never_raised_type_is_empty_family_crossing() {
        let raises = vec![raise("ValueError", "foo", false)];
        let handlers = vec![handler("ValueError", false, true, false), handler("LookupError", false, true, false)];
        let crossings = analyze_crossings(&raises, &handlers);
        let orphan = crossings.iter().find(|c| c.exception_type == "LookupError").unwrap();
        assert!(orphan.raise_sites.is_empty());
        assert_eq!(orphan.handler_sites.len(), 1);
        assert_eq!(orphan.risk_level, RiskLevel::Low);
    }

    #[test]
    fn hierarchy_widened_handler_is_not_treated_as_orphan() {
        use crate::hierarchy::ExceptionHierarchy;
        use semcross_python::ExceptionParent;

        let raises = vec![raise("ConfigError", "foo", false)];
        let handlers = vec![handler("AppError", false, true, false)];
        let hierarchy = ExceptionHierarchy::build(&[ExceptionParent {
            child: "ConfigError".to_string(),
            parent: "AppError".to_string(),
            file: "a.py".to_string(),
        }]);
        let crossings = analyze_crossings_with_hierarchy(&raises, &handlers, Some(&hierarchy), None);
        assert!(crossings.iter().all(|c| c.exception_type != "ConfigError"));
        let crossing = crossings.iter().find(|c| c.exception_type == "AppError").unwrap();
        assert_eq!(crossing.handler_sites.len(), 1);
        assert_eq!(crossing.raise_sites.len(), 1);
    }

    #[test]
    fn scope_mismatch_upgrades_risk_one_step() {
        let raises = vec![raise("KeyError", "f1", false), raise("KeyError", "f2", false)];
        let mut h = handler("KeyError", false, true, false);
        h.direct_raises_in_scope = 0;
        let crossings = analyze_crossings(&raises, &[h]);
        let key = crossings.iter().find(|c| c.exception_type == "KeyError").unwrap();
        assert_eq!(key.risk_level, RiskLevel::Elevated);
        assert!(key.description.contains("Handler scope mismatch"));
    }

    #[test]
    fn distinct_messages_with_multiple_handlers_downgrade_after_scope_mismatch_upgrade() {
        let mut r1 = raise("ValueError", "f1", false);
        r1.message = Some("empty".to_string());
        let mut r2 = raise("ValueError", "f2", false);
        r2.message = Some("too long".to_string());
        let mut r3 = raise("ValueError", "f3", false);
        r3.message = Some("not alpha".to_string());

        let mut h1 = handler("ValueError", false, true, false);
        h1.direct_raises_in_scope = 0;
        let mut h2 = handler("ValueError", true, false, false);
        h2.direct_raises_in_scope = 0;

        let crossings = analyze_crossings(&[r1, r2, r3], &[h1, h2]);
        let val = crossings.iter().find(|c| c.exception_type == "ValueError").unwrap();
        assert_eq!(val.risk_level, RiskLevel::Medium);
        assert!(val.description.contains("Downgraded"));
    }

    #[test]
    fn cross_file_handler_reachable_via_call_graph_is_confirmed() {
        use semcross_python::CallEdge;

        let mut r1 = raise("ValueError", "check_name", false);
        r1.file = "validators.py".to_string();
        let mut r2 = raise("ValueError", "check_age", false);
        r2.file = "validators.py".to_string();

        let mut h = handler("ValueError", false, true, false);
        h.file = "app.py".to_string();
        h.function = Some("run".to_string());

        let call_graph = CallGraph::build(&[
            CallEdge {
                caller: "app.py:run".to_string(),
                callee: "validators.py:check_name".to_string(),
                file: "app.py".to_string(),
                line: 5,
            },
            CallEdge {
                caller: "app.py:run".to_string(),
                callee: "validators.py:check_age".to_string(),
                file: "app.py".to_string(),
                line: 6,
            },
        ]);

        let crossings = analyze_crossings_with_hierarchy(&[r1, r2], &[h], None, Some(&call_graph));
        let val = crossings.iter().find(|c| c.exception_type == "ValueError").unwrap();
        assert_eq!(val.handler_sites.len(), 1);
        assert!(val.is_polymorphic);
        assert!(val.description.contains("Call graph"));
    }

    #[test]
    fn unreachable_cross_file_handler_does_not_join_the_family() {
        let mut raise_site = raise("ValueError", "check_name", false);
        raise_site.file = "validators.py".to_string();
        let mut h = handler("ValueError", false, true, false);
        h.file = "app.py".to_string();
        h.function = Some("unrelated".to_string());

        let crossings = analyze_crossings_with_hierarchy(&[raise_site], &[h], None, None);
        let val = crossings.iter().find(|c| c.exception_type == "ValueError").unwrap();
        assert!(val.handler_sites.is_empty());
    }
}
