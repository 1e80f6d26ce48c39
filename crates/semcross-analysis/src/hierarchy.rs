//! Exception Hierarchy (spec §4.5).
//!
//! Tracks `class Child(Parent)` edges collected by the walker and
//! answers descendant/ancestor queries so a handler catching a base
//! class is recognized as covering its subclasses.

use std::collections::{HashMap, HashSet};

use semcross_python::ExceptionParent;

#[derive(Debug, Default)]
pub struct ExceptionHierarchy {
    // child -> direct parents (multiple inheritance is possible)
    parents: HashMap<String, Vec<String>>,
}

impl ExceptionHierarchy {
    pub fn build(edges: &[ExceptionParent]) -> Self {
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        for edge in edges {
            parents.entry(edge.child.clone()).or_default().push(edge.parent.clone());
        }
        Self { parents }
    }

    /// True if `candidate` is `ancestor` itself or a transitive subclass
    /// of it. Cycle-safe against malformed/circular inheritance.
    pub fn is_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        if candidate == ancestor {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![candidate.to_string()];
        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(direct_parents) = self.parents.get(&name) {
                for parent in direct_parents {
                    if parent == ancestor {
                        return true;
                    }
                    stack.push(parent.clone());
                }
            }
        }
        false
    }

    /// Every exception type in the hierarchy that is `ancestor` or a
    /// transitive descendant of it, including types never directly
    /// declared in the scanned sources (known classes only).
    pub fn descendants_of<'a>(&'a self, ancestor: &str, known: impl Iterator<Item = &'a str>) -> HashSet<String> {
        known
            .filter(|candidate| self.is_descendant(candidate, ancestor))
            .map(str::to_string)
            .collect()
    }

    /// The most-general known ancestor of `exception_type` within the
    /// project (the family root the Crossing Analyzer groups raises
    /// under). Follows the first-recorded-parent chain; a type with no
    /// recorded parent is its own root. Cycle-safe.
    pub fn family_root(&self, exception_type: &str) -> String {
        let mut current = exception_type.to_string();
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(current.clone()) {
                break;
            }
            match self.parents.get(&current).and_then(|p| p.first()) {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(child: &str, parent: &str) -> ExceptionParent {
        ExceptionParent {
            child: child.to_string(),
            parent: parent.to_string(),
            file: "a.py".to_string(),
        }
    }

    #[test]
    fn transitive_descendant() {
        let hierarchy = ExceptionHierarchy::build(&[
            parent("AppError", "Exception"),
            parent("ConfigError", "AppError"),
        ]);
        assert!(hierarchy.is_descendant("ConfigError", "Exception"));
        assert!(hierarchy.is_descendant("ConfigError", "AppError"));
        assert!(!hierarchy.is_descendant("Exception", "ConfigError"));
    }

    #[test]
    fn self_is_descendant_of_self() {
        let hierarchy = ExceptionHierarchy::default();
        assert!(hierarchy.is_descendant("KeyError", "KeyError"));
    }

    #[test]
    fn cyclic_inheritance_does_not_hang() {
        let hierarchy = ExceptionHierarchy::build(&[parent("A", "B"), parent("B", "A")]);
        assert!(!hierarchy.is_descendant("A", "Unrelated"));
    }

    #[test]
    fn family_root_climbs_to_most_general_ancestor() {
        let hierarchy = ExceptionHierarchy::build(&[
            parent("AppError", "Exception"),
            parent("ConfigError", "AppError"),
        ]);
        assert_eq!(hierarchy.family_root("ConfigError"), "Exception");
        assert_eq!(hierarchy.family_root("AppError"), "Exception");
    }

    #[test]
    fn family_root_is_self_when_no_parent_recorded() {
        let hierarchy = ExceptionHierarchy::default();
        assert_eq!(hierarchy.family_root("KeyError"), "KeyError");
    }

    #[test]
    fn family_root_does_not_hang_on_a_cycle() {
        let hierarchy = ExceptionHierarchy::build(&[parent("A", "B"), parent("B", "A")]);
        let root = hierarchy.family_root("A");
        assert!(root == "A" || root == "B");
    }
}
