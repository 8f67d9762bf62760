//! Coalescing file events into rebuild batches.

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// One file event as reported by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Events that arrived within one quiet period, one per path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    changes: IndexMap<PathBuf, ChangeKind>,
}

impl ChangeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event. The latest kind for a path wins.
    pub fn push(&mut self, change: FileChange) {
        self.changes.insert(change.path, change.kind);
    }

    /// Fold another batch in, keeping first-seen path order.
    pub fn extend(&mut self, other: ChangeBatch) {
        self.changes.extend(other.changes);
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.changes.keys().cloned().collect()
    }

    pub fn kind_of(&self, path: &std::path::Path) -> Option<ChangeKind> {
        self.changes.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl FromIterator<FileChange> for ChangeBatch {
    fn from_iter<I: IntoIterator<Item = FileChange>>(iter: I) -> Self {
        let mut batch = ChangeBatch::new();
        for change in iter {
            batch.push(change);
        }
        batch
    }
}

/// Wait for the next burst of events.
///
/// Blocks until one event arrives, then keeps collecting until `quiet`
/// passes without another. Returns `None` once the sender is gone and
/// nothing is buffered.
pub async fn collect_batch(
    rx: &mut UnboundedReceiver<FileChange>,
    quiet: Duration,
) -> Option<ChangeBatch> {
    let first = rx.recv().await?;
    Some(settle(first, rx, quiet).await)
}

/// Start a batch with `first` and collect until `quiet` passes without
/// another event.
pub async fn settle(
    first: FileChange,
    rx: &mut UnboundedReceiver<FileChange>,
    quiet: Duration,
) -> ChangeBatch {
    let mut batch = ChangeBatch::new();
    batch.push(first);
    while let Ok(Some(change)) = timeout(quiet, rx.recv()).await {
        batch.push(change);
    }
    batch
}
