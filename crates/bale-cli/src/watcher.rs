//! File system watcher for watch mode.
//!
//! Watches the project directory recursively and forwards relevant changes as
//! [`FileChange`]s. Bursts are coalesced by the watch session, not here.

use std::path::{Path, PathBuf};

use bale_bundler::{ChangeKind, FileChange};
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{CliError, Result};

/// Decides which paths may trigger a rebuild.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    output_dir: PathBuf,
    patterns: Vec<String>,
}

impl WatchFilter {
    pub fn new(root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, patterns: Vec<String>) -> Self {
        Self {
            root: root.into(),
            output_dir: output_dir.into(),
            patterns,
        }
    }

    /// Paths outside the root, inside the output directory, hidden, or
    /// matching an ignore pattern are ignored.
    ///
    /// A pattern starting with `*` matches a suffix (`*.log`); any other
    /// pattern matches a whole path component (`node_modules`).
    pub fn should_ignore(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return true;
        };
        if path.starts_with(&self.output_dir) {
            return true;
        }

        let names: Vec<&str> = relative
            .components()
            .filter_map(|component| component.as_os_str().to_str())
            .collect();

        if names.iter().any(|name| name.starts_with('.') && *name != "." && *name != "..") {
            return true;
        }

        self.patterns.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => relative.to_string_lossy().ends_with(suffix),
            None => names.contains(&pattern.as_str()),
        })
    }
}

/// Keeps the underlying notify watcher alive. Dropping it stops events.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    pub fn new(filter: WatchFilter, tx: UnboundedSender<FileChange>) -> Result<Self> {
        let root = filter.root.clone();
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }
        // Some platforms report canonical paths (e.g. /private/var on macOS).
        let canonical = root.canonicalize()?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(%err, "file watcher error");
                    return;
                }
            };
            let Some(kind) = change_kind(&event.kind) else {
                return;
            };
            for path in &event.paths {
                let path = relocate(path, &canonical, &filter.root);
                if filter.should_ignore(&path) {
                    continue;
                }
                tracing::trace!(path = %path.display(), ?kind, "file event");
                // The receiver is gone once the session stops.
                let _ = tx.send(FileChange::new(path, kind));
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching");

        Ok(Self {
            _watcher: watcher,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        // Renames report both sides; the session checks which still exist.
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Modified),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

fn relocate(path: &Path, canonical: &Path, root: &Path) -> PathBuf {
    match path.strip_prefix(canonical) {
        Ok(relative) if canonical != root => root.join(relative),
        _ => path.to_path_buf(),
    }
}
