//! Watch mode.
//!
//! A [`WatchSession`] keeps the last module graph and the last good output
//! between rebuilds. File events are coalesced into batches; each batch
//! patches the previous graph instead of starting over. A batch arriving
//! while a rebuild runs cancels it, and the cancelled changes are carried
//! into the next attempt. A failed rebuild leaves the previous output on
//! disk untouched.

mod changes;
mod debounce;

pub use changes::{ChangeDetector, ChangeSet};
pub use debounce::{ChangeBatch, ChangeKind, FileChange, collect_batch, settle};

use std::path::Path;
use std::time::Duration;

use bale_graph::{CancelToken, ModuleGraph};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::bundler::{BuildOutput, Pipeline};
use crate::error::{BuildError, Result};

#[derive(Debug)]
pub struct WatchSession {
    pipeline: Pipeline,
    graph: Option<ModuleGraph>,
    detector: ChangeDetector,
    output: Option<BuildOutput>,
    /// File name → hash of what is on disk from the last good write
    written: FxHashMap<String, String>,
    /// Changes from attempts that never reached the graph
    pending: ChangeSet,
    /// The current graph has not been written out
    stale: bool,
}

impl WatchSession {
    pub(crate) fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            graph: None,
            detector: ChangeDetector::new(),
            output: None,
            written: FxHashMap::default(),
            pending: ChangeSet::default(),
            stale: false,
        }
    }

    /// Output of the last successful build.
    pub fn output(&self) -> Option<&BuildOutput> {
        self.output.as_ref()
    }

    pub fn graph(&self) -> Option<&ModuleGraph> {
        self.graph.as_ref()
    }

    pub fn output_dir(&self) -> &Path {
        self.pipeline.output_dir()
    }

    /// Use `token` for the next build. Each attempt should get a fresh one.
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.pipeline.set_cancel_token(token);
    }

    /// Full build, discarding any previous graph.
    pub async fn initial_build(&mut self) -> Result<BuildOutput> {
        let started = self.pipeline.begin();
        let graph = match self.pipeline.graph(None).await {
            Ok(graph) => graph,
            Err(error) => return self.pipeline.finish(Err(error)),
        };
        self.pending = ChangeSet::default();
        self.commit_graph(graph);
        let result = self.write(started).await;
        self.pipeline.finish(result)
    }

    /// Apply a batch of file events.
    ///
    /// Returns `Ok(None)` when nothing in the batch actually changed.
    pub async fn rebuild(&mut self, batch: &ChangeBatch) -> Result<Option<BuildOutput>> {
        if self.graph.is_none() {
            return self.initial_build().await.map(Some);
        }

        let detected = self
            .detector
            .detect(self.pipeline.runtime(), &batch.paths())
            .await;
        let mut changes = std::mem::take(&mut self.pending);
        changes.merge(detected);

        if !changes.has_changes() && !self.stale {
            debug!(events = batch.len(), "no effective changes");
            return Ok(None);
        }

        let started = self.pipeline.begin();
        if changes.has_changes() {
            info!(
                modified = changes.modified.len(),
                added = changes.added.len(),
                removed = changes.removed.len(),
                "rebuilding"
            );
            let previous = self.graph.as_ref().map(|graph| (graph, &changes));
            let result = self.pipeline.graph(previous).await;
            match result {
                Ok(graph) => self.commit_graph(graph),
                Err(error) => {
                    self.pending = changes;
                    return self.pipeline.finish(Err(error)).map(Some);
                }
            }
        }

        let result = self.write(started).await;
        self.pipeline.finish(result).map(Some)
    }

    /// Drive the session from a stream of file events until the sender
    /// goes away. Runs the initial build first.
    ///
    /// Events arriving during a rebuild cancel it; the rebuild restarts once
    /// the new burst settles.
    pub async fn run(mut self, mut rx: UnboundedReceiver<FileChange>, quiet: Duration) -> Self {
        self.set_cancel_token(CancelToken::new());
        if let Err(error) = self.initial_build().await {
            warn!(%error, "initial build failed");
        }

        let mut next = collect_batch(&mut rx, quiet).await;
        while let Some(batch) = next.take() {
            let token = CancelToken::new();
            self.set_cancel_token(token.clone());

            let interrupted = {
                let build = self.rebuild(&batch);
                tokio::pin!(build);
                tokio::select! {
                    result = &mut build => {
                        log_result(result);
                        None
                    }
                    Some(change) = rx.recv() => {
                        token.cancel();
                        log_result(build.await);
                        Some(change)
                    }
                }
            };

            next = match interrupted {
                Some(change) => Some(settle(change, &mut rx, quiet).await),
                None => collect_batch(&mut rx, quiet).await,
            };
        }
        self
    }

    fn commit_graph(&mut self, graph: ModuleGraph) {
        self.detector = ChangeDetector::from_graph(&graph);
        self.graph = Some(graph);
        self.stale = true;
    }

    async fn write(&mut self, started: std::time::Instant) -> Result<BuildOutput> {
        let Some(graph) = self.graph.as_ref() else {
            return Err(BuildError::InvalidConfig("no module graph to emit".to_string()));
        };
        let result = self.pipeline.emit(graph, &self.written, started).await;
        match result {
            Ok((output, written)) => {
                self.written = written;
                self.output = Some(output.clone());
                self.stale = false;
                Ok(output)
            }
            Err(error) => {
                // Diagnostics stay until a file changes; anything else is
                // retried on the next batch.
                self.stale = !matches!(error, BuildError::Diagnostics(_));
                Err(error)
            }
        }
    }
}

fn log_result(result: Result<Option<BuildOutput>>) {
    match result {
        Ok(_) => {}
        Err(error) if error.is_cancelled() => debug!("rebuild superseded"),
        Err(error) => warn!(%error, "rebuild failed, keeping previous output"),
    }
}
