//! Change detection between watch rebuilds.
//!
//! File events are noisy: editors touch files without changing them and
//! write through temp files. Before rebuilding, the reported paths are
//! compared against the content hashes stored in the last graph so only
//! real edits reach the graph builder.

use std::path::{Path, PathBuf};

use bale_graph::{ContentHash, ModuleGraph, Runtime};
use rustc_hash::{FxHashMap, FxHashSet};

/// Content hashes of every module file in a graph.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    hashes: FxHashMap<PathBuf, ContentHash>,
    /// Files whose last transform failed; any event on them counts as a change
    failed: FxHashSet<PathBuf>,
}

/// What actually changed among a batch of reported paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Known files whose content differs
    pub modified: Vec<PathBuf>,
    /// Files the graph has never loaded
    pub added: Vec<PathBuf>,
    /// Known files that no longer exist
    pub removed: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.modified.is_empty() || !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Files appeared or disappeared, so resolution may differ anywhere.
    pub fn structure_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Every changed path, modified first.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.modified
            .iter()
            .chain(&self.added)
            .chain(&self.removed)
            .cloned()
            .collect()
    }

    /// Fold a later change set into this one.
    pub fn merge(&mut self, other: ChangeSet) {
        for path in other.modified {
            push_unique(&mut self.modified, path);
        }
        for path in other.added {
            push_unique(&mut self.added, path);
        }
        for path in other.removed {
            push_unique(&mut self.removed, path);
        }
    }
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: &ModuleGraph) -> Self {
        let hashes = graph
            .modules()
            .map(|module| (module.id.path().to_path_buf(), module.hash))
            .collect();
        let failed = graph
            .failed()
            .map(|(id, _)| id.path().to_path_buf())
            .collect();
        Self { hashes, failed }
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.hashes.contains_key(path) || self.failed.contains(path)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Sort `paths` into modified, added and removed by reading them through
    /// `runtime`. Unchanged files are dropped.
    pub async fn detect(&self, runtime: &dyn Runtime, paths: &[PathBuf]) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for path in paths {
            let exists = runtime.is_file(path).await;

            if self.failed.contains(path) {
                if exists {
                    push_unique(&mut changes.modified, path.clone());
                } else {
                    push_unique(&mut changes.removed, path.clone());
                }
                continue;
            }

            match (self.hashes.get(path), exists) {
                (Some(previous), true) => match runtime.read_file(path).await {
                    Ok(bytes) if ContentHash::of(&bytes) == *previous => {}
                    // Unreadable files are reloaded so the error surfaces.
                    _ => push_unique(&mut changes.modified, path.clone()),
                },
                (Some(_), false) => push_unique(&mut changes.removed, path.clone()),
                (None, true) => push_unique(&mut changes.added, path.clone()),
                (None, false) => {}
            }
        }

        changes
    }
}
