//! Bundle configuration types.

mod css;
mod helpers;
mod types;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub use css::CssOptions;
pub use types::{EntrySpec, External, Mode, ModeProfile};

use helpers::{
    default_asset_filename, default_asset_inline_limit, default_extensions, default_hash_length,
    default_manifest, default_output_path, default_public_path, default_shared_chunk,
};

/// Main bundle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleOptions {
    /// Named entry points, in chunk order.
    #[serde(default)]
    pub entry: IndexMap<String, EntrySpec>,

    /// Output directory for chunks, assets and the manifest
    #[serde(default = "default_output_path", alias = "outputPath")]
    pub output_path: PathBuf,

    /// Prefix prepended to emitted asset URLs
    #[serde(default = "default_public_path", alias = "publicPath")]
    pub public_path: String,

    #[serde(default)]
    pub mode: Mode,

    /// Keep running and rebuild on change
    #[serde(default)]
    pub watch: bool,

    /// Extensions tried, in order, when a specifier has no exact match
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Specifier prefix rewrites (e.g. "themes" → "client/themes")
    ///
    /// Values are relative to the project root unless absolute.
    #[serde(default)]
    pub aliases: IndexMap<String, PathBuf>,

    /// Specifiers provided by the host page instead of bundled
    #[serde(default)]
    pub externals: IndexMap<String, External>,

    /// Name of the chunk holding modules shared by two or more entries
    #[serde(default = "default_shared_chunk", alias = "sharedChunk")]
    pub shared_chunk: String,

    /// Chunk filename template; defaults by mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Stylesheet filename template; defaults by mode
    #[serde(default, alias = "cssFilename", skip_serializing_if = "Option::is_none")]
    pub css_filename: Option<String>,

    /// Filename template for emitted (non-inlined) assets
    #[serde(default = "default_asset_filename", alias = "assetFilename")]
    pub asset_filename: String,

    /// Number of hex digits kept from content hashes
    #[serde(default = "default_hash_length", alias = "hashLength")]
    pub hash_length: usize,

    /// Manifest filename inside the output directory
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Compile-time constants, replaced wherever the expression appears
    #[serde(default)]
    pub define: IndexMap<String, Value>,

    #[serde(default)]
    pub css: CssOptions,

    /// Assets at or below this size (bytes) are inlined as data URIs
    #[serde(default = "default_asset_inline_limit", alias = "assetInlineLimit")]
    pub asset_inline_limit: u64,

    /// Transform worker count; defaults to available parallelism
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Project root; defaults to the directory holding the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            entry: IndexMap::new(),
            output_path: default_output_path(),
            public_path: default_public_path(),
            mode: Mode::default(),
            watch: false,
            extensions: default_extensions(),
            aliases: IndexMap::new(),
            externals: IndexMap::new(),
            shared_chunk: default_shared_chunk(),
            filename: None,
            css_filename: None,
            asset_filename: default_asset_filename(),
            hash_length: default_hash_length(),
            manifest: default_manifest(),
            define: IndexMap::new(),
            css: CssOptions::default(),
            asset_inline_limit: default_asset_inline_limit(),
            concurrency: None,
            root: None,
        }
    }
}

impl BundleOptions {
    /// Add an entry point, replacing any entry with the same name.
    pub fn with_entry(mut self, name: impl Into<String>, spec: impl Into<EntrySpec>) -> Self {
        self.entry.insert(name.into(), spec.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Settings implied by the configured mode.
    pub fn profile(&self) -> ModeProfile {
        self.mode.profile()
    }

    pub fn chunk_filename(&self) -> &str {
        self.filename
            .as_deref()
            .unwrap_or(self.mode.profile().filename)
    }

    pub fn stylesheet_filename(&self) -> &str {
        self.css_filename
            .as_deref()
            .unwrap_or(self.mode.profile().css_filename)
    }

    /// Project root; `.` when none was configured.
    pub fn project_root(&self) -> &Path {
        self.root.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Output directory resolved against the project root.
    pub fn output_dir(&self) -> PathBuf {
        self.project_root().join(&self.output_path)
    }

    /// Transform workers to use.
    pub fn worker_count(&self) -> usize {
        self.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}
