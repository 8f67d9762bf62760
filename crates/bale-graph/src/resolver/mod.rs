//! Module resolution.
//!
//! Order of precedence for a specifier:
//! 1. Externals (exact match)
//! 2. Path aliases (longest whole-segment prefix)
//! 3. Relative and absolute paths, joined onto the importer's directory
//! 4. Bare package names, looked up through `node_modules`
//!
//! Each candidate is tried as an exact file, then with each configured
//! extension in order, then as a directory with an index file. Results are
//! memoized per (importer directory, specifier).

mod aliases;
mod extensions;
mod packages;

pub use aliases::resolve_alias;
pub use extensions::{resolve_file, try_extensions, try_index_files};
pub use packages::{resolve_package, split_package_specifier};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use path_clean::PathClean;
use tokio::sync::OnceCell;

use crate::module::{ModuleId, Target};
use crate::runtime::Runtime;

/// Inputs to resolution, already made absolute against the project root.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub root: PathBuf,
    /// Tried in order, e.g. `[".json", ".js", ".jsx"]`
    pub extensions: Vec<String>,
    pub aliases: IndexMap<String, PathBuf>,
    /// Specifier → global name
    pub externals: IndexMap<String, String>,
}

/// Why a specifier did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFailure {
    pub reason: String,
}

impl ResolveFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

type MemoKey = (PathBuf, String);
type MemoCell = Arc<OnceCell<Result<Target, ResolveFailure>>>;

#[derive(Debug)]
pub struct Resolver {
    options: ResolverOptions,
    runtime: Arc<dyn Runtime>,
    memo: DashMap<MemoKey, MemoCell>,
}

impl Resolver {
    pub fn new(options: ResolverOptions, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            options,
            runtime,
            memo: DashMap::new(),
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `specifier` as written in a module located in `importer_dir`.
    ///
    /// Concurrent callers asking for the same key share one lookup; the
    /// first result stored is the one every caller sees.
    pub async fn resolve(
        &self,
        specifier: &str,
        importer_dir: &Path,
    ) -> Result<Target, ResolveFailure> {
        let cell = self
            .memo
            .entry((importer_dir.to_path_buf(), specifier.to_string()))
            .or_default()
            .clone();

        cell.get_or_init(|| self.resolve_uncached(specifier, importer_dir))
            .await
            .clone()
    }

    /// Forget every memoized result. Called when files appear or disappear.
    pub fn invalidate(&self) {
        self.memo.clear();
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    async fn resolve_uncached(
        &self,
        specifier: &str,
        importer_dir: &Path,
    ) -> Result<Target, ResolveFailure> {
        if let Some(global) = self.options.externals.get(specifier) {
            return Ok(Target::External {
                global: global.clone(),
            });
        }

        if specifier.is_empty() {
            return Err(ResolveFailure::new("empty specifier"));
        }

        let (path_part, query) = match specifier.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (specifier, None),
        };

        let runtime = self.runtime.as_ref();
        let extensions = &self.options.extensions;

        let found = if let Some(candidate) =
            resolve_alias(path_part, &self.options.aliases, &self.options.root)
        {
            resolve_file(&candidate.clean(), extensions, runtime).await
        } else if is_path_like(path_part) {
            let candidate = importer_dir.join(path_part).clean();
            resolve_file(&candidate, extensions, runtime).await
        } else {
            let found = resolve_package(path_part, importer_dir, extensions, runtime).await;
            if found.is_none() {
                return Err(ResolveFailure::new(format!(
                    "package '{}' not found in node_modules",
                    split_package_specifier(path_part).0
                )));
            }
            found
        };

        match found {
            Some(path) => Ok(Target::Module(ModuleId::with_query(path, query))),
            None => Err(ResolveFailure::new(
                "no file, extension match or directory index found",
            )),
        }
    }
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}
