//! Chunk planning.
//!
//! Every module gets a bitset of the entries that reach it. A module reached
//! by exactly one entry lives in that entry's chunk; a module reached by two
//! or more lives in the shared chunk. Within a chunk, modules keep graph
//! order, which is breadth-first from the entries.

use bale_graph::{ModuleGraph, ModuleId};
use rustc_hash::FxHashMap;

/// Bitset over entry indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntrySet {
    words: Vec<u64>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: usize) {
        let word = entry / 64;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (entry % 64);
    }

    pub fn contains(&self, entry: usize) -> bool {
        self.words
            .get(entry / 64)
            .is_some_and(|word| word & (1 << (entry % 64)) != 0)
    }

    /// Number of entries in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Lowest entry in the set.
    pub fn first(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .map(|(i, word)| i * 64 + word.trailing_zeros() as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Entry,
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    pub kind: ChunkKind,
    /// Member modules in graph order
    pub modules: Vec<ModuleId>,
    /// Modules to run when the chunk loads (entry chunks only)
    pub run: Vec<ModuleId>,
}

/// Chunks in emission order: entry chunks in configuration order, then the
/// shared chunk when anything is shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
}

impl ChunkPlan {
    pub fn chunk(&self, name: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|chunk| chunk.name == name)
    }

    /// Chunk holding `id`.
    pub fn chunk_of(&self, id: &ModuleId) -> Option<&Chunk> {
        self.chunks
            .iter()
            .find(|chunk| chunk.modules.contains(id))
    }
}

/// Reachability bitsets for every module in the graph.
pub fn reachability(graph: &ModuleGraph) -> FxHashMap<ModuleId, EntrySet> {
    let mut reach: FxHashMap<ModuleId, EntrySet> = FxHashMap::default();
    for (index, entry) in graph.entries().iter().enumerate() {
        for id in graph.reachable_from(&entry.modules) {
            reach.entry(id.clone()).or_default().insert(index);
        }
    }
    reach
}

pub fn plan_chunks(graph: &ModuleGraph, shared_name: &str) -> ChunkPlan {
    let reach = reachability(graph);
    let mut chunks: Vec<Chunk> = graph
        .entries()
        .iter()
        .map(|entry| Chunk {
            name: entry.name.clone(),
            kind: ChunkKind::Entry,
            modules: Vec::new(),
            run: entry.modules.clone(),
        })
        .collect();
    let mut shared = Chunk {
        name: shared_name.to_string(),
        kind: ChunkKind::Shared,
        modules: Vec::new(),
        run: Vec::new(),
    };

    for id in graph.module_ids() {
        let Some(entries) = reach.get(id) else {
            continue;
        };
        match (entries.len(), entries.first()) {
            (1, Some(entry)) => chunks[entry].modules.push(id.clone()),
            (n, _) if n >= 2 => shared.modules.push(id.clone()),
            _ => {}
        }
    }

    if !shared.modules.is_empty() {
        chunks.push(shared);
    }
    ChunkPlan { chunks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bale_graph::{
        ContentHash, DependencyKind, Edge, GraphEntry, Module, ModuleKind, Target,
        TransformOutput,
    };
    use proptest::prelude::*;

    fn id(n: usize) -> ModuleId {
        ModuleId::new(format!("/m{n}.js"))
    }

    fn module(n: usize, deps: &[usize]) -> Module {
        Module {
            id: id(n),
            kind: ModuleKind::Script,
            source: Arc::from(&b""[..]),
            hash: ContentHash::of(b""),
            output: Arc::new(TransformOutput::default()),
            edges: deps
                .iter()
                .map(|&dep| Edge {
                    specifier: format!("./m{dep}"),
                    kind: DependencyKind::Static,
                    target: Target::Module(id(dep)),
                })
                .collect(),
            unresolved: Vec::new(),
        }
    }

    fn graph(entries: &[(&str, usize)], edges: &[(usize, usize)], count: usize) -> ModuleGraph {
        let mut graph = ModuleGraph::new(
            "/",
            entries
                .iter()
                .map(|(name, root)| GraphEntry {
                    name: name.to_string(),
                    modules: vec![id(*root)],
                })
                .collect(),
        );
        for n in 0..count {
            let deps: Vec<usize> = edges
                .iter()
                .filter(|(from, _)| *from == n)
                .map(|(_, to)| *to)
                .collect();
            graph.insert(module(n, &deps));
        }
        graph.reorder();
        graph.prune_unreachable();
        graph
    }

    fn names(chunk: &Chunk) -> Vec<String> {
        chunk.modules.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn entry_set_counts_across_words() {
        let mut set = EntrySet::new();
        set.insert(3);
        set.insert(70);
        assert_eq!(set.len(), 2);
        assert!(set.contains(70));
        assert!(!set.contains(64));
        assert_eq!(set.first(), Some(3));
        assert!(EntrySet::new().is_empty());
    }

    #[test]
    fn shared_modules_move_to_the_shared_chunk() {
        // login → shared, main → shared, main → only-main
        let graph = graph(&[("login", 0), ("main", 1)], &[(0, 2), (1, 2), (1, 3)], 4);
        let plan = plan_chunks(&graph, "manifest");

        let order: Vec<&str> = plan.chunks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, ["login", "main", "manifest"]);
        assert_eq!(names(plan.chunk("login").unwrap()), ["/m0.js"]);
        assert_eq!(names(plan.chunk("main").unwrap()), ["/m1.js", "/m3.js"]);
        assert_eq!(names(plan.chunk("manifest").unwrap()), ["/m2.js"]);
        assert_eq!(plan.chunk_of(&id(2)).unwrap().kind, ChunkKind::Shared);
    }

    #[test]
    fn single_entry_has_no_shared_chunk() {
        let graph = graph(&[("main", 0)], &[(0, 1), (1, 0)], 2);
        let plan = plan_chunks(&graph, "manifest");
        assert_eq!(plan.chunks.len(), 1);
        assert_eq!(plan.chunks[0].run, vec![id(0)]);
    }

    #[test]
    fn entry_module_imported_by_another_entry_is_shared() {
        let graph = graph(&[("a", 0), ("b", 1)], &[(1, 0)], 2);
        let plan = plan_chunks(&graph, "common");
        assert_eq!(names(plan.chunk("common").unwrap()), ["/m0.js"]);
        assert!(plan.chunk("a").unwrap().modules.is_empty());
        assert_eq!(plan.chunk("a").unwrap().run, vec![id(0)]);
    }

    proptest! {
        #[test]
        fn every_module_lands_in_exactly_one_chunk(
            count in 2usize..24,
            raw_edges in prop::collection::vec((0usize..24, 0usize..24), 0..60),
            entry_roots in prop::collection::vec(0usize..24, 1..4),
        ) {
            let edges: Vec<(usize, usize)> = raw_edges
                .into_iter()
                .map(|(a, b)| (a % count, b % count))
                .collect();
            let entries: Vec<(String, usize)> = entry_roots
                .iter()
                .enumerate()
                .map(|(i, root)| (format!("e{i}"), root % count))
                .collect();
            let entry_refs: Vec<(&str, usize)> =
                entries.iter().map(|(name, root)| (name.as_str(), *root)).collect();

            let graph = graph(&entry_refs, &edges, count);
            let plan = plan_chunks(&graph, "shared");
            let reach = reachability(&graph);

            for id in graph.module_ids() {
                let holders: Vec<&Chunk> =
                    plan.chunks.iter().filter(|c| c.modules.contains(id)).collect();
                prop_assert_eq!(holders.len(), 1);

                let set = &reach[id];
                if set.len() >= 2 {
                    prop_assert_eq!(holders[0].kind, ChunkKind::Shared);
                } else {
                    let entry = set.first().unwrap();
                    prop_assert_eq!(&holders[0].name, &entries[entry].0);
                }
            }

            // Chunk members keep graph order.
            for chunk in &plan.chunks {
                let positions: Vec<usize> = chunk
                    .modules
                    .iter()
                    .map(|id| graph.index_of(id).unwrap())
                    .collect();
                prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
