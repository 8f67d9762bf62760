//! Breadth-first graph construction.
//!
//! Each wave loads the pending modules concurrently, transforms them on a
//! bounded rayon pool, then resolves their dependencies. Newly discovered
//! modules form the next wave. Transform and resolution failures are
//! recorded on the graph and never stop the walk.

mod cancel;

pub use cancel::CancelToken;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use path_clean::PathClean;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::error::{GraphError, ResolutionError, Result, TransformError};
use crate::graph::{GraphEntry, ModuleGraph};
use crate::module::{ContentHash, Dependency, Edge, Module, ModuleId, slash_path};
use crate::resolver::{ResolveFailure, Resolver, ResolverOptions, resolve_file};
use crate::runtime::Runtime;
use crate::transform::{TransformInput, TransformOutput, Transformer};

/// Maximum size of a single module (10MB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Upper bound on graph size, guarding against runaway resolution.
pub const MAX_MODULES: usize = 100_000;

#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Entry name → entry files, relative to the project root
    pub entries: IndexMap<String, Vec<PathBuf>>,
    pub resolve: ResolverOptions,
    /// Upper bound on transforms running at once
    pub concurrency: usize,
    pub max_modules: usize,
}

impl GraphOptions {
    pub fn new(resolve: ResolverOptions) -> Self {
        Self {
            entries: IndexMap::new(),
            resolve,
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_modules: MAX_MODULES,
        }
    }

    pub fn with_entry(mut self, name: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        self.entries.insert(name.into(), paths);
        self
    }

    pub fn root(&self) -> &Path {
        &self.resolve.root
    }
}

/// Snapshot handed to progress callbacks after each wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphProgress {
    /// Modules loaded and transformed so far
    pub processed: usize,
    /// Modules known so far, processed or not
    pub discovered: usize,
}

impl GraphProgress {
    pub fn fraction(&self) -> f64 {
        if self.discovered == 0 {
            0.0
        } else {
            self.processed as f64 / self.discovered as f64
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(GraphProgress) + Send + Sync>;

/// A module waiting for its transform result.
struct Loaded {
    id: ModuleId,
    source: std::result::Result<Arc<[u8]>, TransformError>,
}

/// A transformed module waiting for its dependencies to resolve.
struct Transformed {
    id: ModuleId,
    source: Arc<[u8]>,
    output: TransformOutput,
}

pub struct GraphBuilder {
    options: GraphOptions,
    runtime: Arc<dyn Runtime>,
    resolver: Resolver,
    transformer: Arc<dyn Transformer>,
    pool: Arc<rayon::ThreadPool>,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("options", &self.options)
            .field("transformer", &self.transformer)
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    pub fn new(
        options: GraphOptions,
        runtime: Arc<dyn Runtime>,
        transformer: Arc<dyn Transformer>,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.concurrency.max(1))
            .thread_name(|i| format!("bale-transform-{i}"))
            .build()
            .map_err(|err| GraphError::ThreadPool(err.to_string()))?;

        Ok(Self {
            resolver: Resolver::new(options.resolve.clone(), Arc::clone(&runtime)),
            options,
            runtime,
            transformer,
            pool: Arc::new(pool),
            cancel: CancelToken::new(),
            progress: None,
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Swap the token for the next build. Watch mode hands each rebuild a
    /// fresh token so an old cancellation does not leak into it.
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = token;
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Build the graph from scratch. Resolution results from earlier builds
    /// are discarded first.
    pub async fn build(&self) -> Result<ModuleGraph> {
        self.resolver.invalidate();

        let (entries, entry_errors) = self.resolve_entries().await;
        let pending: Vec<ModuleId> = dedup(entries.iter().flat_map(|e| e.modules.iter()));

        let mut graph = ModuleGraph::new(self.options.root(), Vec::new());
        graph.set_entries(entries, entry_errors);

        let mut seen: FxHashSet<ModuleId> = pending.iter().cloned().collect();
        self.expand(&mut graph, pending, &mut seen).await?;

        graph.reorder();
        debug!(
            modules = graph.len(),
            failed = graph.failed().count(),
            "module graph built"
        );
        Ok(graph)
    }

    /// Patch `previous` after `changed` files were modified.
    ///
    /// `structure_changed` signals that files were created or removed, which
    /// can change how any specifier resolves; every edge is then resolved
    /// again. Otherwise only the changed modules are reloaded.
    pub async fn rebuild(
        &self,
        previous: &ModuleGraph,
        changed: &[PathBuf],
        structure_changed: bool,
    ) -> Result<ModuleGraph> {
        let changed: FxHashSet<PathBuf> = changed.iter().map(|path| path.clean()).collect();
        let mut graph = previous.clone();

        if structure_changed {
            self.resolver.invalidate();
            let (entries, entry_errors) = self.resolve_entries().await;
            graph.set_entries(entries, entry_errors);
        }

        let mut reload: Vec<ModuleId> = graph
            .module_ids()
            .chain(graph.failed().map(|(id, _)| id))
            .filter(|id| changed.contains(id.path()))
            .cloned()
            .collect();
        reload.sort_by_key(|id| graph.index_of(id).unwrap_or(usize::MAX));

        for id in &reload {
            graph.clear_failed(id);
        }

        if structure_changed {
            self.relink(&mut graph, &reload).await?;
        }

        let mut seen: FxHashSet<ModuleId> = graph
            .module_ids()
            .chain(graph.failed().map(|(id, _)| id))
            .cloned()
            .collect();
        seen.extend(reload.iter().cloned());

        // Targets nobody loaded yet: new entries and freshly resolved edges.
        let missing: Vec<ModuleId> = dedup(
            graph
                .entry_modules()
                .chain(graph.modules().flat_map(|module| module.dependencies()))
                .filter(|id| !seen.contains(*id)),
        );
        seen.extend(missing.iter().cloned());

        let mut pending = reload;
        pending.extend(missing);
        debug!(pending = pending.len(), structure_changed, "incremental rebuild");

        self.expand(&mut graph, pending, &mut seen).await?;

        let removed = graph.prune_unreachable();
        if !removed.is_empty() {
            debug!(removed = removed.len(), "pruned unreachable modules");
        }
        graph.reorder();
        Ok(graph)
    }

    async fn resolve_entries(&self) -> (Vec<GraphEntry>, Vec<ResolutionError>) {
        let root = self.options.root();
        let mut entries = Vec::with_capacity(self.options.entries.len());
        let mut errors = Vec::new();

        for (name, paths) in &self.options.entries {
            let mut modules = Vec::with_capacity(paths.len());
            for path in paths {
                let candidate = if path.is_absolute() {
                    path.clean()
                } else {
                    root.join(path).clean()
                };
                match resolve_file(&candidate, &self.options.resolve.extensions, self.runtime.as_ref())
                    .await
                {
                    Some(file) => modules.push(ModuleId::new(file)),
                    None => errors.push(ResolutionError {
                        specifier: slash_path(path),
                        importer: name.clone(),
                        reason: "entry file not found".to_string(),
                    }),
                }
            }
            entries.push(GraphEntry {
                name: name.clone(),
                modules,
            });
        }

        (entries, errors)
    }

    /// Process waves until no new modules turn up.
    async fn expand(
        &self,
        graph: &mut ModuleGraph,
        mut pending: Vec<ModuleId>,
        seen: &mut FxHashSet<ModuleId>,
    ) -> Result<()> {
        let mut processed = seen.len().saturating_sub(pending.len());

        while !pending.is_empty() {
            self.check_cancelled()?;
            if seen.len() > self.options.max_modules {
                return Err(GraphError::TooManyModules {
                    max: self.options.max_modules,
                });
            }

            let loaded = join_all(pending.iter().cloned().map(|id| self.load(id))).await;
            let transformed = self.transform_wave(loaded).await?;
            let mut next = Vec::new();

            let linked = join_all(transformed.into_iter().map(|result| async move {
                match result {
                    Ok(module) => Ok(self.link(module).await),
                    Err(failed) => Err(failed),
                }
            }))
            .await;

            for result in linked {
                processed += 1;
                match result {
                    Ok(module) => {
                        for dep in module.dependencies() {
                            if seen.insert(dep.clone()) {
                                next.push(dep.clone());
                            }
                        }
                        graph.insert(module);
                    }
                    Err((id, error)) => {
                        warn!(module = %id, %error, "transform failed");
                        graph.mark_failed(id, error);
                    }
                }
            }

            if let Some(progress) = &self.progress {
                progress(GraphProgress {
                    processed,
                    discovered: seen.len(),
                });
            }

            pending = next;
        }

        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(GraphError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn relative(&self, id: &ModuleId) -> String {
        id.relative_to(self.options.root())
    }

    async fn load(&self, id: ModuleId) -> Loaded {
        let path = id.path();
        let source = match self.runtime.metadata(path).await {
            Ok(meta) if meta.size > MAX_FILE_SIZE => Err(TransformError::new(format!(
                "File exceeds maximum size of {}MB",
                MAX_FILE_SIZE / 1024 / 1024
            ))),
            Ok(_) => self
                .runtime
                .read_file(path)
                .await
                .map(Arc::from)
                .map_err(|err| TransformError::new(err.to_string())),
            Err(err) => Err(TransformError::new(err.to_string())),
        };

        let module = self.relative(&id);
        Loaded {
            source: source.map_err(|err| err.in_module(module)),
            id,
        }
    }

    /// Run one wave's transforms on the worker pool, in input order.
    async fn transform_wave(
        &self,
        loaded: Vec<Loaded>,
    ) -> Result<Vec<std::result::Result<Transformed, (ModuleId, TransformError)>>> {
        let transformer = Arc::clone(&self.transformer);
        let pool = Arc::clone(&self.pool);
        let cancel = self.cancel.clone();
        let root = self.options.root().to_path_buf();

        let results = tokio::task::spawn_blocking(move || {
            pool.install(|| {
                loaded
                    .into_par_iter()
                    .map(|Loaded { id, source }| {
                        if cancel.is_cancelled() {
                            return None;
                        }
                        let source = match source {
                            Ok(source) => source,
                            Err(error) => return Some(Err((id, error))),
                        };
                        let input = TransformInput {
                            id: &id,
                            kind: id.kind(),
                            source: &source,
                        };
                        Some(match transformer.transform(input) {
                            Ok(output) => Ok(Transformed { id, source, output }),
                            Err(error) => {
                                let module = id.relative_to(&root);
                                Err((id, error.in_module(module)))
                            }
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await
        .map_err(|err| GraphError::TaskFailed(err.to_string()))?;

        self.check_cancelled()?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Resolve a transformed module's dependencies and finish the record.
    async fn link(&self, transformed: Transformed) -> Module {
        let Transformed { id, source, output } = transformed;
        for warning in &output.warnings {
            warn!(module = %self.relative(&id), "{warning}");
        }

        let (edges, unresolved) = self.resolve_dependencies(&id, &output.dependencies).await;
        Module {
            kind: id.kind(),
            hash: ContentHash::of(&source),
            id,
            source,
            output: Arc::new(output),
            edges,
            unresolved,
        }
    }

    async fn resolve_dependencies(
        &self,
        id: &ModuleId,
        dependencies: &[Dependency],
    ) -> (Vec<Edge>, Vec<ResolutionError>) {
        let dir = id.path().parent().unwrap_or(Path::new("/"));

        let mut unique: Vec<&Dependency> = Vec::with_capacity(dependencies.len());
        let mut specifiers = FxHashSet::default();
        for dep in dependencies {
            if specifiers.insert(dep.specifier.as_str()) {
                unique.push(dep);
            }
        }

        let results = join_all(
            unique
                .iter()
                .map(|dep| self.resolver.resolve(&dep.specifier, dir)),
        )
        .await;

        let mut edges = Vec::with_capacity(unique.len());
        let mut unresolved = Vec::new();
        for (dep, result) in unique.into_iter().zip(results) {
            match result {
                Ok(target) => edges.push(Edge {
                    specifier: dep.specifier.clone(),
                    kind: dep.kind,
                    target,
                }),
                Err(ResolveFailure { reason }) => unresolved.push(ResolutionError {
                    specifier: dep.specifier.clone(),
                    importer: self.relative(id),
                    reason,
                }),
            }
        }
        (edges, unresolved)
    }

    /// Re-resolve the edges of every module not about to be reloaded.
    async fn relink(&self, graph: &mut ModuleGraph, reload: &[ModuleId]) -> Result<()> {
        self.check_cancelled()?;
        let skip: FxHashSet<&ModuleId> = reload.iter().collect();
        let modules: Vec<Arc<Module>> = graph
            .modules()
            .filter(|module| !skip.contains(&module.id))
            .cloned()
            .collect();

        let relinked = join_all(modules.iter().map(|module| async move {
            let (edges, unresolved) = self
                .resolve_dependencies(&module.id, &module.output.dependencies)
                .await;
            Module {
                edges,
                unresolved,
                ..(**module).clone()
            }
        }))
        .await;

        for module in relinked {
            graph.insert(module);
        }
        Ok(())
    }
}

fn dedup<'a>(ids: impl Iterator<Item = &'a ModuleId>) -> Vec<ModuleId> {
    let mut seen = FxHashSet::default();
    ids.filter(|id| seen.insert(*id)).cloned().collect()
}
