//! Import Resolver (spec §4.3).
//!
//! Maps a name used inside a file back to the module it came from, and
//! retargets call edges to the file that actually defines the callee so
//! the Call Graph can answer cross-file reachability questions for the
//! crossing analyzer.

use std::collections::{HashMap, HashSet};

use semcross_python::{CallEdge, HandlerSite, ImportRecord, RaiseSite};

#[derive(Debug, Default)]
pub struct ImportIndex {
    // (file, local_name) -> (module, imported_name). For a plain
    // `import M [as A]` record the walker sets imported_name == module;
    // that equality is how a from-import is told apart from a plain one.
    by_local_name: HashMap<(String, String), (String, String)>,
    // dotted module path -> the project file it resolves to.
    module_to_file: HashMap<String, String>,
}

impl ImportIndex {
    pub fn build(records: &[ImportRecord], project_files: &[String]) -> Self {
        let mut by_local_name = HashMap::new();
        for record in records {
            let local_name = if record.alias.is_empty() { record.imported_name.clone() } else { record.alias.clone() };
            by_local_name.insert((record.file.clone(), local_name), (record.module.clone(), record.imported_name.clone()));
        }
        Self { by_local_name, module_to_file: build_module_index(project_files) }
    }

    /// The module a locally-used name resolves to within `file`, if the
    /// file imported it.
    pub fn resolve(&self, file: &str, local_name: &str) -> Option<&str> {
        self.by_local_name.get(&(file.to_string(), local_name.to_string())).map(|(module, _)| module.as_str())
    }

    /// The project file a dotted module path resolves to, if any (a
    /// module outside the scanned tree, e.g. a stdlib import, resolves
    /// to nothing).
    pub fn resolve_module_file(&self, module: &str) -> Option<&str> {
        self.module_to_file.get(module).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_local_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_local_name.is_empty()
    }

    /// Retarget call edges per the four-step resolution in spec §4.3:
    /// an aliased `from` import, an aliased dotted module call, a
    /// same-file top-level definition, or else a bare-name stub.
    pub fn resolve_call_edges(&self, edges: &[CallEdge], known_functions: &HashMap<String, HashSet<String>>) -> Vec<CallEdge> {
        edges
            .iter()
            .map(|edge| CallEdge {
                caller: edge.caller.clone(),
                callee: self.resolve_callee(edge, known_functions),
                file: edge.file.clone(),
                line: edge.line,
            })
            .collect()
    }

    fn resolve_callee(&self, edge: &CallEdge, known_functions: &HashMap<String, HashSet<String>>) -> String {
        let name = edge.callee.as_str();

        // Step 1: name is a local alias for `from M import N [as alias]`.
        if let Some((module, imported_name)) = self.by_local_name.get(&(edge.file.clone(), name.to_string())) {
            if module != imported_name {
                return match self.resolve_module_file(module) {
                    Some(file) => format!("{file}:{imported_name}"),
                    None => name.to_string(),
                };
            }
        }

        // Step 2: leading segment is a local alias for `import M [as alias]`.
        if let Some((alias, remainder)) = name.split_once('.') {
            if let Some((module, imported_name)) = self.by_local_name.get(&(edge.file.clone(), alias.to_string())) {
                if module == imported_name {
                    return match self.resolve_module_file(module) {
                        Some(file) => format!("{file}:{remainder}"),
                        None => name.to_string(),
                    };
                }
            }
        }

        // Step 3: the caller's own file defines a top-level name matching it.
        if known_functions.get(&edge.file).is_some_and(|names| names.contains(name)) {
            return format!("{}:{name}", edge.file);
        }

        // Step 4: no resolution; leave as a bare-name stub.
        name.to_string()
    }
}

/// The set of functions known to be defined in each file, derived from
/// everywhere the walker already records a function name: raise/handler
/// sites and call-edge callers (every call edge is emitted from inside
/// some function body, per spec §4.1, so its caller is a real def).
pub fn known_functions_by_file(
    raises: &[RaiseSite],
    handlers: &[HandlerSite],
    call_edges: &[CallEdge],
) -> HashMap<String, HashSet<String>> {
    let mut by_file: HashMap<String, HashSet<String>> = HashMap::new();
    for raise in raises {
        if let Some(function) = &raise.function {
            by_file.entry(raise.file.clone()).or_default().insert(function.clone());
        }
    }
    for handler in handlers {
        if let Some(function) = &handler.function {
            by_file.entry(handler.file.clone()).or_default().insert(function.clone());
        }
    }
    for edge in call_edges {
        if let Some((file, function)) = edge.caller.split_once(':') {
            by_file.entry(file.to_string()).or_default().insert(function.to_string());
        }
    }
    by_file
}

/// Map every project file's dotted module path(s) to itself: `a/b/c.py`
/// becomes `a.b.c`, and `a/b/__init__.py` additionally becomes `a.b`
/// (the package name itself resolves to its `__init__.py`).
fn build_module_index(project_files: &[String]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for file in project_files {
        let trimmed = file.trim_end_matches(".py");
        let dotted = trimmed.replace(['/', '\\'], ".");
        if let Some(package) = dotted.strip_suffix(".__init__") {
            index.insert(package.to_string(), file.clone());
        } else {
            index.insert(dotted, file.clone());
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(module: &str, name: &str, alias: &str, file: &str) -> ImportRecord {
        ImportRecord {
            module: module.to_string(),
            imported_name: name.to_string(),
            alias: alias.to_string(),
            file: file.to_string(),
        }
    }

    fn edge(caller: &str, callee: &str, file: &str) -> CallEdge {
        CallEdge { caller: caller.to_string(), callee: callee.to_string(), file: file.to_string(), line: 1 }
    }

    #[test]
    fn resolves_plain_and_aliased_imports() {
        let index = ImportIndex::build(
            &[rec("os", "os", "os", "a.py"), rec("collections", "OrderedDict", "OD", "a.py")],
            &[],
        );
        assert_eq!(index.resolve("a.py", "os"), Some("os"));
        assert_eq!(index.resolve("a.py", "OD"), Some("collections"));
        assert_eq!(index.resolve("a.py", "OrderedDict"), None);
        assert_eq!(index.resolve("b.py", "os"), None);
    }

    #[test]
    fn resolves_module_dotted_path_to_project_file() {
        let index = ImportIndex::build(&[], &["validators.py".to_string(), "pkg/sub.py".to_string()]);
        assert_eq!(index.resolve_module_file("validators"), Some("validators.py"));
        assert_eq!(index.resolve_module_file("pkg.sub"), Some("pkg/sub.py"));
        assert_eq!(index.resolve_module_file("os"), None);
    }

    #[test]
    fn resolves_from_import_alias_call_edge() {
        let index = ImportIndex::build(
            &[rec("validators", "check_name", "check_name", "app.py")],
            &["validators.py".to_string()],
        );
        let known = HashMap::new();
        let resolved = index.resolve_call_edges(&[edge("app.py:run", "check_name", "app.py")], &known);
        assert_eq!(resolved[0].callee, "validators.py:check_name");
    }

    #[test]
    fn resolves_aliased_module_dotted_call_edge() {
        let index = ImportIndex::build(
            &[rec("validators", "validators", "v", "app.py")],
            &["validators.py".to_string()],
        );
        let known = HashMap::new();
        let resolved = index.resolve_call_edges(&[edge("app.py:run", "v.check_name", "app.py")], &known);
        assert_eq!(resolved[0].callee, "validators.py:check_name");
    }

    #[test]
    fn resolves_same_file_top_level_def() {
        let index = ImportIndex::build(&[], &[]);
        let mut known = HashMap::new();
        known.insert("app.py".to_string(), HashSet::from(["helper".to_string()]));
        let resolved = index.resolve_call_edges(&[edge("app.py:run", "helper", "app.py")], &known);
        assert_eq!(resolved[0].callee, "app.py:helper");
    }

    #[test]
    fn unresolved_call_edge_stays_a_bare_stub() {
        let index = ImportIndex::build(&[], &[]);
        let known = HashMap::new();
        let resolved = index.resolve_call_edges(&[edge("app.py:run", "mystery", "app.py")], &known);
        assert_eq!(resolved[0].callee, "mystery");
    }
}
