//! Call Graph (spec §4.4).
//!
//! A directed multigraph over call edges (qualified `file:function`
//! identifiers once import-resolved). Used by the crossing analyzer to
//! decide whether a raise site can actually propagate up to a handler
//! in a different function or file before it is associated with it.

use std::collections::{HashMap, HashSet, VecDeque};

use semcross_python::CallEdge;

#[derive(Debug, Default)]
pub struct CallGraph {
    edges: HashMap<String, HashSet<String>>,
}

impl CallGraph {
    pub fn build(call_edges: &[CallEdge]) -> Self {
        let mut edges: HashMap<String, HashSet<String>> = HashMap::new();
        for edge in call_edges {
            edges.entry(edge.caller.clone()).or_default().insert(edge.callee.clone());
        }
        Self { edges }
    }

    /// Every function transitively reachable from `start`, including
    /// `start` itself. Cycle-safe.
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.to_string());
        visited.insert(start.to_string());

        while let Some(node) = queue.pop_front() {
            if let Some(callees) = self.edges.get(&node) {
                for callee in callees {
                    if visited.insert(callee.clone()) {
                        queue.push_back(callee.clone());
                    }
                }
            }
        }
        visited
    }

    /// Whether a call path of length >= 1 connects `from` to `to`.
    /// Reachability excludes the trivial self-path: `can_reach(a, a)` is
    /// false unless `a` sits on an actual call cycle.
    pub fn can_reach(&self, from: &str, to: &str) -> bool {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<String> = self.edges.get(from).into_iter().flatten().cloned().collect();

        while let Some(node) = queue.pop_front() {
            if node == to {
                return true;
            }
            if !visited.insert(node.clone()) {
                continue;
            }
            if let Some(callees) = self.edges.get(&node) {
                queue.extend(callees.iter().cloned());
            }
        }
        false
    }

    pub fn function_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(caller: &str, callee: &str) -> CallEdge {
        CallEdge {
            caller: caller.to_string(),
            callee: callee.to_string(),
            file: "a.py".to_string(),
            line: 1,
        }
    }

    #[test]
    fn transitive_reachability() {
        let graph = CallGraph::build(&[edge("main", "parse"), edge("parse", "validate")]);
        assert!(graph.can_reach("main", "validate"));
        assert!(!graph.can_reach("validate", "main"));
    }

    #[test]
    fn self_reachability_excludes_trivial_self_path() {
        let graph = CallGraph::build(&[edge("main", "parse")]);
        assert!(!graph.can_reach("main", "main"));
        assert!(!graph.can_reach("parse", "parse"));
    }

    #[test]
    fn self_reachability_true_on_actual_cycle() {
        let graph = CallGraph::build(&[edge("a", "b"), edge("b", "a")]);
        assert!(graph.can_reach("a", "a"));
    }

    #[test]
    fn cycles_do_not_hang() {
        let graph = CallGraph::build(&[edge("a", "b"), edge("b", "a")]);
        let reached = graph.reachable_from("a");
        assert!(reached.contains("a") && reached.contains("b"));
    }
}
