//! Build orchestration: graph, plan, render, write.
//!
//! Progress is split across the phases: graph construction reports up to
//! 0.70, planning up to 0.75, rendering up to 0.85 and writing finishes at
//! 1.0.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bale_config::{BundleOptions, validate_schema};
use bale_graph::{
    CancelToken, GraphBuilder, GraphOptions, GraphProgress, ModuleGraph, NativeRuntime,
    ResolverOptions, Runtime,
};
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::emit::{
    EmitSettings, EmittedAsset, EmittedChunk, Manifest, render, write_bundle,
};
use crate::error::{BuildError, EmitError, Result};
use crate::events::{BuildEvent, EventSender, ProgressReporter, ProgressTracker};
use crate::planner::plan_chunks;
use crate::transforms::{TransformPipeline, TransformSettings};
use crate::watch::{ChangeSet, WatchSession};

const GRAPH_SHARE: f64 = 0.70;
const PLAN_DONE: f64 = 0.75;
const RENDER_DONE: f64 = 0.85;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub modules: usize,
    pub chunks: usize,
    pub assets: usize,
    /// Files written by this build
    pub written: usize,
    /// Files left in place because they were already up to date
    pub reused: usize,
    pub duration_ms: u64,
}

/// A successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutput {
    pub chunks: Vec<EmittedChunk>,
    pub assets: Vec<EmittedAsset>,
    pub manifest: Manifest,
    pub output_dir: PathBuf,
    pub stats: BuildStats,
}

impl BuildOutput {
    pub fn chunk(&self, name: &str) -> Option<&EmittedChunk> {
        self.chunks.iter().find(|chunk| chunk.name == name)
    }

    /// Script, stylesheet and asset file names, in emit order.
    pub fn file_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for chunk in &self.chunks {
            names.push(&chunk.script.file_name);
            if let Some(style) = &chunk.style {
                names.push(&style.file_name);
            }
        }
        names.extend(self.assets.iter().map(|asset| asset.file.file_name.as_str()));
        names
    }
}

/// What `check` found: the graph and plan of a build that was not written.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub modules: usize,
    pub chunks: Vec<EmittedChunk>,
    pub assets: usize,
}

/// Entry point for one-shot builds and watch sessions.
///
/// ```rust,no_run
/// use bale_bundler::Bundler;
/// use bale_config::BundleOptions;
///
/// # async fn example() -> bale_bundler::Result<()> {
/// let options = BundleOptions::default()
///     .with_root("/srv/app")
///     .with_entry("main", "client/main.js");
/// let output = Bundler::new(options)?.build().await?;
/// println!("{}", output.manifest.to_json());
/// # Ok(())
/// # }
/// ```
pub struct Bundler {
    options: BundleOptions,
    runtime: Arc<dyn Runtime>,
    progress: Option<ProgressReporter>,
    events: Option<EventSender>,
    cancel: CancelToken,
}

impl std::fmt::Debug for Bundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("options", &self.options)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl Bundler {
    /// Validate `options` and prepare a bundler reading from disk.
    pub fn new(options: BundleOptions) -> Result<Self> {
        validate_schema(&options)?;
        Ok(Self {
            options,
            runtime: Arc::new(NativeRuntime),
            progress: None,
            events: None,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.progress = Some(reporter);
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Cancelling the token stops the build between transforms. Nothing is
    /// written by a cancelled build.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    pub async fn build(&self) -> Result<BuildOutput> {
        let pipeline = self.pipeline()?;
        let started = pipeline.begin();
        let result = async {
            let graph = pipeline.graph(None).await?;
            let (output, _) = pipeline.emit(&graph, &FxHashMap::default(), started).await?;
            Ok(output)
        }
        .await;
        pipeline.finish(result)
    }

    /// Build, plan and render without writing anything.
    pub async fn check(&self) -> Result<CheckReport> {
        let pipeline = self.pipeline()?;
        let graph = pipeline.graph(None).await?;
        let diagnostics = graph.diagnostics();
        if !diagnostics.is_empty() {
            return Err(BuildError::Diagnostics(diagnostics));
        }
        let plan = plan_chunks(&graph, &pipeline.shared_chunk);
        let bundle = render(&graph, &plan, &pipeline.emit)?;
        Ok(CheckReport {
            modules: graph.len(),
            assets: bundle.assets.len(),
            chunks: bundle.chunks,
        })
    }

    /// Turn this bundler into a long-lived watch session.
    pub fn into_watch(self) -> Result<WatchSession> {
        Ok(WatchSession::new(self.pipeline()?))
    }

    fn pipeline(&self) -> Result<Pipeline> {
        Pipeline::new(
            &self.options,
            Arc::clone(&self.runtime),
            ProgressTracker::new(self.progress.clone(), self.events.clone()),
            self.cancel.clone(),
        )
    }
}

/// One-shot build reading from disk.
pub async fn build(options: BundleOptions) -> Result<BuildOutput> {
    Bundler::new(options)?.build().await
}

/// Everything a build needs, reusable across watch rebuilds so resolution
/// results and the worker pool survive between them.
pub(crate) struct Pipeline {
    builder: GraphBuilder,
    runtime: Arc<dyn Runtime>,
    emit: EmitSettings,
    shared_chunk: String,
    progress: ProgressTracker,
    cancel: CancelToken,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("builder", &self.builder)
            .field("emit", &self.emit)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    fn new(
        options: &BundleOptions,
        runtime: Arc<dyn Runtime>,
        progress: ProgressTracker,
        cancel: CancelToken,
    ) -> Result<Self> {
        let root = absolute_root(options.project_root(), runtime.as_ref())?;
        let externals = options
            .externals
            .iter()
            .filter_map(|(specifier, external)| {
                external
                    .global_name(specifier)
                    .map(|global| (specifier.clone(), global.to_string()))
            })
            .collect();

        let mut graph_options = GraphOptions::new(ResolverOptions {
            root: root.clone(),
            extensions: options.extensions.clone(),
            aliases: options.aliases.clone(),
            externals,
        });
        graph_options.concurrency = options.worker_count();
        for (name, spec) in &options.entry {
            graph_options = graph_options.with_entry(name.clone(), spec.paths().to_vec());
        }

        let transformer = TransformPipeline::new(TransformSettings::from_options(options, &root));
        let tracker = progress.clone();
        let builder = GraphBuilder::new(graph_options, Arc::clone(&runtime), Arc::new(transformer))?
            .with_cancel_token(cancel.clone())
            .with_progress(Arc::new(move |graph: GraphProgress| {
                tracker.report(graph.fraction() * GRAPH_SHARE)
            }));

        Ok(Self {
            builder,
            runtime,
            emit: EmitSettings::from_options(options, &root),
            shared_chunk: options.shared_chunk.clone(),
            progress,
            cancel,
        })
    }

    pub(crate) fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    pub(crate) fn output_dir(&self) -> &Path {
        &self.emit.output_dir
    }

    pub(crate) fn set_cancel_token(&mut self, token: CancelToken) {
        self.builder.set_cancel_token(token.clone());
        self.cancel = token;
    }

    /// Announce a new build attempt and restart progress.
    pub(crate) fn begin(&self) -> Instant {
        self.progress.reset();
        self.progress.send(BuildEvent::Started);
        self.progress.report(0.0);
        Instant::now()
    }

    /// Announce how the attempt ended and pass the result through.
    pub(crate) fn finish(&self, result: Result<BuildOutput>) -> Result<BuildOutput> {
        match &result {
            Ok(output) => {
                info!(
                    modules = output.stats.modules,
                    chunks = output.stats.chunks,
                    written = output.stats.written,
                    reused = output.stats.reused,
                    duration_ms = output.stats.duration_ms,
                    "build completed"
                );
                self.progress.send(BuildEvent::Completed(output.clone()));
            }
            Err(error) => {
                debug!(%error, "build failed");
                self.progress.send(BuildEvent::Failed(Arc::new(error.clone())));
            }
        }
        result
    }

    /// Build the module graph from scratch, or patch `previous` for a
    /// set of changed files.
    pub(crate) async fn graph(
        &self,
        previous: Option<(&ModuleGraph, &ChangeSet)>,
    ) -> Result<ModuleGraph> {
        let graph = match previous {
            None => self.builder.build().await?,
            Some((graph, changes)) => {
                self.builder
                    .rebuild(graph, &changes.paths(), changes.structure_changed())
                    .await?
            }
        };
        self.progress.report(GRAPH_SHARE);
        Ok(graph)
    }

    /// Plan, render and write `graph`. Fails without writing when the
    /// graph carries diagnostics or the build was cancelled.
    ///
    /// `written` holds file name → hash from the last write into the same
    /// directory. Returns the same mapping for this write.
    pub(crate) async fn emit(
        &self,
        graph: &ModuleGraph,
        written: &FxHashMap<String, String>,
        started: Instant,
    ) -> Result<(BuildOutput, FxHashMap<String, String>)> {
        let diagnostics = graph.diagnostics();
        if !diagnostics.is_empty() {
            return Err(BuildError::Diagnostics(diagnostics));
        }
        self.check_cancelled()?;

        let plan = plan_chunks(graph, &self.shared_chunk);
        self.progress.report(PLAN_DONE);

        let bundle = Arc::new(render(graph, &plan, &self.emit)?);
        self.progress.report(RENDER_DONE);
        self.check_cancelled()?;

        let summary = {
            let bundle = Arc::clone(&bundle);
            let dir = self.emit.output_dir.clone();
            let previous = written.clone();
            tokio::task::spawn_blocking(move || write_bundle(&bundle, &dir, &previous))
                .await
                .map_err(|err| EmitError::WriteFailure(err.to_string()))??
        };
        self.progress.report(1.0);

        let output = BuildOutput {
            chunks: bundle.chunks.clone(),
            assets: bundle.assets.clone(),
            manifest: bundle.manifest.clone(),
            output_dir: self.emit.output_dir.clone(),
            stats: BuildStats {
                modules: graph.len(),
                chunks: bundle.chunks.len(),
                assets: bundle.assets.len(),
                written: summary.written,
                reused: summary.reused,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            },
        };
        Ok((output, bundle.file_hashes()))
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(BuildError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn absolute_root(root: &Path, runtime: &dyn Runtime) -> Result<PathBuf> {
    if root.is_absolute() {
        return Ok(root.clean());
    }
    let cwd = runtime
        .get_cwd()
        .map_err(|err| BuildError::InvalidConfig(format!("Cannot determine project root: {err}")))?;
    Ok(cwd.join(root).clean())
}

#[cfg(test)]
mod tests {
    use super::*;

    use bale_graph::VirtualRuntime;
    use parking_lot::Mutex;

    fn project() -> Arc<VirtualRuntime> {
        let runtime = Arc::new(VirtualRuntime::isolated("/p"));
        runtime.add_file("/p/main.js", "import { a } from './a';\nconsole.log(a);\n");
        runtime.add_file("/p/a.js", "export const a = 1;\n");
        runtime
    }

    fn options() -> BundleOptions {
        BundleOptions::default()
            .with_root("/p")
            .with_entry("main", "main.js")
    }

    #[test]
    fn relative_roots_resolve_against_runtime_cwd() {
        let runtime = VirtualRuntime::isolated("/work");
        assert_eq!(
            absolute_root(Path::new("./site/../app"), &runtime).unwrap(),
            PathBuf::from("/work/app")
        );
    }

    #[tokio::test]
    async fn check_plans_without_writing() {
        let report = Bundler::new(options())
            .unwrap()
            .with_runtime(project())
            .check()
            .await
            .unwrap();

        assert_eq!(report.modules, 2);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].modules, ["main.js", "a.js"]);
    }

    #[tokio::test]
    async fn cancelled_build_reports_failure() {
        let token = CancelToken::new();
        token.cancel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let result = Bundler::new(options())
            .unwrap()
            .with_runtime(project())
            .with_cancel_token(token)
            .with_progress(Arc::new(move |v| sink.lock().push(v)))
            .with_events(tx)
            .build()
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(*seen.lock(), vec![0.0]);
        assert!(matches!(rx.try_recv(), Ok(BuildEvent::Started)));
        assert!(matches!(rx.try_recv(), Ok(BuildEvent::Progress(_))));
        assert!(matches!(rx.try_recv(), Ok(BuildEvent::Failed(err)) if err.is_cancelled()));
    }
}
