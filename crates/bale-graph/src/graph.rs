//! The module graph: transformed modules keyed by id, plus named entries.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::error::{GraphDiagnostic, ResolutionError, TransformError};
use crate::module::{Module, ModuleId};

/// A named entry point and the modules it starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEntry {
    pub name: String,
    pub modules: Vec<ModuleId>,
}

/// Modules in discovery order. After [`ModuleGraph::reorder`] the order is
/// the breadth-first order from the entries, following edges in source
/// order, so two graphs with the same contents iterate identically.
///
/// Modules whose transform failed are kept aside in `failed` so that an
/// incremental rebuild reports the same diagnostics as a full one.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    root: PathBuf,
    entries: Vec<GraphEntry>,
    entry_errors: Vec<ResolutionError>,
    modules: IndexMap<ModuleId, Arc<Module>>,
    failed: IndexMap<ModuleId, TransformError>,
}

impl ModuleGraph {
    pub fn new(root: impl Into<PathBuf>, entries: Vec<GraphEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
            entry_errors: Vec::new(),
            modules: IndexMap::new(),
            failed: IndexMap::new(),
        }
    }

    pub(crate) fn set_entries(&mut self, entries: Vec<GraphEntry>, errors: Vec<ResolutionError>) {
        self.entries = entries;
        self.entry_errors = errors;
    }

    pub fn failed(&self) -> impl Iterator<Item = (&ModuleId, &TransformError)> {
        self.failed.iter()
    }

    pub fn is_failed(&self, id: &ModuleId) -> bool {
        self.failed.contains_key(id)
    }

    pub(crate) fn mark_failed(&mut self, id: ModuleId, error: TransformError) {
        self.modules.shift_remove(&id);
        self.failed.insert(id, error);
    }

    pub(crate) fn clear_failed(&mut self, id: &ModuleId) -> bool {
        self.failed.shift_remove(id).is_some()
    }

    /// Every resolution and transform error, in graph order.
    pub fn diagnostics(&self) -> Vec<GraphDiagnostic> {
        let mut diagnostics: Vec<GraphDiagnostic> = self
            .entry_errors
            .iter()
            .cloned()
            .map(GraphDiagnostic::from)
            .collect();
        let mut reported: FxHashSet<&ModuleId> = FxHashSet::default();

        let mut report_failed = |id: &'_ ModuleId, diagnostics: &mut Vec<GraphDiagnostic>| {
            if let Some((id, error)) = self.failed.get_key_value(id) {
                if reported.insert(id) {
                    diagnostics.push(error.clone().into());
                }
            }
        };

        for id in self.entry_modules() {
            report_failed(id, &mut diagnostics);
        }
        for module in self.modules.values() {
            diagnostics.extend(module.unresolved.iter().cloned().map(GraphDiagnostic::from));
            for edge in &module.edges {
                let Some(dep) = edge.module().filter(|dep| self.failed.contains_key(*dep)) else {
                    continue;
                };
                report_failed(dep, &mut diagnostics);
                // The importer loses this dependency too.
                diagnostics.push(GraphDiagnostic::Resolution(ResolutionError {
                    specifier: edge.specifier.clone(),
                    importer: module.id.relative_to(&self.root),
                    reason: "module failed to transform".to_string(),
                }));
            }
        }
        diagnostics
    }

    pub fn has_errors(&self) -> bool {
        !self.entry_errors.is_empty()
            || !self.failed.is_empty()
            || self.modules.values().any(|module| !module.unresolved.is_empty())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[GraphEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, id: &ModuleId) -> Option<&Arc<Module>> {
        self.modules.get(id)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.values()
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    /// Position of a module in graph order.
    pub fn index_of(&self, id: &ModuleId) -> Option<usize> {
        self.modules.get_index_of(id)
    }

    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.id.clone(), Arc::new(module));
    }

    pub fn remove(&mut self, id: &ModuleId) -> Option<Arc<Module>> {
        self.modules.shift_remove(id)
    }

    /// Modules that depend on `id`.
    pub fn importers_of(&self, id: &ModuleId) -> Vec<&ModuleId> {
        self.modules
            .values()
            .filter(|module| module.dependencies().any(|dep| dep == id))
            .map(|module| &module.id)
            .collect()
    }

    /// Every module reachable from `roots`, in breadth-first order.
    pub fn reachable_from<'a>(&'a self, roots: impl IntoIterator<Item = &'a ModuleId>) -> Vec<&'a ModuleId> {
        let mut seen: FxHashSet<&ModuleId> = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue: VecDeque<&ModuleId> = VecDeque::new();

        for root in roots {
            if let Some((id, _)) = self.modules.get_key_value(root) {
                if seen.insert(id) {
                    queue.push_back(id);
                }
            }
        }

        while let Some(id) = queue.pop_front() {
            order.push(id);
            let Some(module) = self.modules.get(id) else {
                continue;
            };
            for dep in module.dependencies() {
                if let Some((dep_id, _)) = self.modules.get_key_value(dep) {
                    if seen.insert(dep_id) {
                        queue.push_back(dep_id);
                    }
                }
            }
        }

        order
    }

    /// Entry modules of every entry, in configuration order.
    pub fn entry_modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.entries.iter().flat_map(|entry| entry.modules.iter())
    }

    /// Drop modules no entry can reach. Returns the removed ids.
    pub fn prune_unreachable(&mut self) -> Vec<ModuleId> {
        let reachable: FxHashSet<ModuleId> = self
            .reachable_from(self.entry_modules())
            .into_iter()
            .cloned()
            .collect();

        let removed: Vec<ModuleId> = self
            .modules
            .keys()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        self.modules.retain(|id, _| reachable.contains(id));

        let referenced: FxHashSet<ModuleId> = self
            .modules
            .values()
            .flat_map(|module| module.dependencies())
            .chain(self.entry_modules())
            .cloned()
            .collect();
        self.failed.retain(|id, _| referenced.contains(id));
        removed
    }

    /// Put modules in canonical breadth-first order. Unreachable modules
    /// keep their relative order at the end.
    pub fn reorder(&mut self) {
        let order: Vec<ModuleId> = self
            .reachable_from(self.entry_modules())
            .into_iter()
            .cloned()
            .collect();

        let mut rest = std::mem::take(&mut self.modules);
        let mut ordered = IndexMap::with_capacity(rest.len());
        for id in order {
            if let Some(module) = rest.shift_remove(&id) {
                ordered.insert(id, module);
            }
        }
        ordered.extend(rest);
        self.modules = ordered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ContentHash, DependencyKind, Edge, ModuleKind, Target};
    use crate::transform::TransformOutput;

    fn module(path: &str, deps: &[&str]) -> Module {
        Module {
            id: ModuleId::new(path),
            kind: ModuleKind::Script,
            source: Arc::from(&b""[..]),
            hash: ContentHash::of(b""),
            output: Arc::new(TransformOutput::default()),
            edges: deps
                .iter()
                .map(|dep| Edge {
                    specifier: dep.to_string(),
                    kind: DependencyKind::Static,
                    target: Target::Module(ModuleId::new(dep)),
                })
                .collect(),
            unresolved: Vec::new(),
        }
    }

    fn graph(modules: Vec<Module>) -> ModuleGraph {
        let mut graph = ModuleGraph::new(
            "/",
            vec![GraphEntry {
                name: "main".into(),
                modules: vec![ModuleId::new("/main.js")],
            }],
        );
        for module in modules {
            graph.insert(module);
        }
        graph
    }

    fn ids(graph: &ModuleGraph) -> Vec<String> {
        graph.module_ids().map(|id| id.to_string()).collect()
    }

    #[test]
    fn reorder_is_breadth_first_in_edge_order() {
        let mut graph = graph(vec![
            module("/c.js", &[]),
            module("/b.js", &["/c.js"]),
            module("/a.js", &["/c.js"]),
            module("/main.js", &["/a.js", "/b.js"]),
        ]);
        graph.reorder();
        assert_eq!(ids(&graph), ["/main.js", "/a.js", "/b.js", "/c.js"]);
    }

    #[test]
    fn cycles_terminate() {
        let graph = graph(vec![
            module("/main.js", &["/a.js"]),
            module("/a.js", &["/main.js"]),
        ]);
        let reached = graph.reachable_from(graph.entry_modules());
        assert_eq!(reached.len(), 2);
    }

    #[test]
    fn prune_removes_orphans() {
        let mut graph = graph(vec![
            module("/main.js", &["/a.js"]),
            module("/a.js", &[]),
            module("/orphan.js", &["/a.js"]),
        ]);
        let removed = graph.prune_unreachable();
        assert_eq!(removed, vec![ModuleId::new("/orphan.js")]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn diagnostics_follow_graph_order_and_survive_pruning() {
        let mut graph = graph(vec![
            module("/main.js", &["/broken.js", "/a.js"]),
            module("/a.js", &[]),
        ]);
        graph.mark_failed(
            ModuleId::new("/broken.js"),
            TransformError::new("Unexpected token").in_module("broken.js"),
        );
        graph.mark_failed(ModuleId::new("/stale.js"), TransformError::new("old"));

        graph.prune_unreachable();
        let diagnostics = graph.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics[0].as_transform().map(|err| err.module.as_str()),
            Some("broken.js")
        );
        let downstream = diagnostics[1].as_resolution().unwrap();
        assert_eq!(downstream.specifier, "/broken.js");
        assert_eq!(downstream.importer, "main.js");
        assert!(graph.has_errors());
    }

    #[test]
    fn importers_are_found() {
        let graph = graph(vec![
            module("/main.js", &["/a.js"]),
            module("/b.js", &["/a.js"]),
            module("/a.js", &[]),
        ]);
        let importers: Vec<String> = graph
            .importers_of(&ModuleId::new("/a.js"))
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(importers, ["/main.js", "/b.js"]);
    }
}
