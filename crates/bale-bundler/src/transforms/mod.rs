//! Per-module transforms.
//!
//! [`TransformPipeline`] is the [`Transformer`] the bundler hands to the
//! graph builder. It dispatches on [`ModuleKind`] and never touches the
//! filesystem, so the same input always yields the same output.

mod asset;
pub mod edits;
mod json;
mod script;
mod style;

use std::path::{Path, PathBuf};

use bale_config::{BundleOptions, Mode};
use bale_graph::{ModuleKind, TransformError, TransformInput, TransformOutput, Transformer};
use indexmap::IndexMap;

pub use asset::mime_type;
pub use style::scoped_class_name;

/// Placeholder a stylesheet carries for the URL of its `index`th dependency.
/// The emitter swaps it for the target module's URL.
pub fn url_marker(index: usize) -> String {
    format!("__bale_url_{index}__")
}

/// Everything a transform needs to know about the build.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSettings {
    pub root: PathBuf,
    pub minify: bool,
    /// Whitespace-free expression → JavaScript literal
    pub defines: IndexMap<String, String>,
    pub css_modules: bool,
    pub local_ident_name: String,
    pub public_path: String,
    pub asset_filename: String,
    pub asset_inline_limit: u64,
    pub hash_length: usize,
}

impl TransformSettings {
    pub fn from_options(options: &BundleOptions, root: &Path) -> Self {
        let profile = options.profile();
        let mut defines = mode_defines(options.mode);
        for (key, value) in &options.define {
            let key: String = key.chars().filter(|c| !c.is_whitespace()).collect();
            defines.insert(key, value.to_string());
        }

        Self {
            root: root.to_path_buf(),
            minify: profile.minify,
            defines,
            css_modules: options.css.modules,
            local_ident_name: options.css.local_ident_name.clone(),
            public_path: options.public_path.clone(),
            asset_filename: options.asset_filename.clone(),
            asset_inline_limit: options.asset_inline_limit,
            hash_length: options.hash_length,
        }
    }

    pub fn define_keys(&self) -> Vec<&str> {
        self.defines.keys().map(String::as_str).collect()
    }

    /// Project-relative path of a module, used for stable hashing.
    pub fn relative(&self, path: &Path) -> String {
        bale_graph::ModuleId::new(path).relative_to(&self.root)
    }
}

/// Constants every build defines. Configured defines override them.
fn mode_defines(mode: Mode) -> IndexMap<String, String> {
    let dev = !mode.is_production();
    IndexMap::from([
        (
            "process.env.NODE_ENV".to_string(),
            format!("\"{}\"", mode.profile().node_env),
        ),
        ("__DEV__".to_string(), dev.to_string()),
        ("__CLIENT__".to_string(), "true".to_string()),
        ("__SERVER__".to_string(), "false".to_string()),
    ])
}

#[derive(Debug, Clone)]
pub struct TransformPipeline {
    settings: TransformSettings,
}

impl TransformPipeline {
    pub fn new(settings: TransformSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }
}

impl Transformer for TransformPipeline {
    fn transform(&self, input: TransformInput<'_>) -> Result<TransformOutput, TransformError> {
        match input.kind {
            ModuleKind::Script => script::transform(&input, &self.settings),
            ModuleKind::Style => style::transform(&input, &self.settings),
            ModuleKind::Json => json::transform(&input),
            ModuleKind::Raw => json::raw(&input),
            ModuleKind::Asset => Ok(asset::transform(&input, &self.settings)),
        }
    }
}

/// Truncated hex digest.
pub(crate) fn short_hash(bytes: &[u8], len: usize) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex[..len.min(hex.len())].to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bale_graph::ModuleId;

    pub fn settings() -> TransformSettings {
        TransformSettings::from_options(&BundleOptions::default(), Path::new("/project"))
    }

    pub fn run(
        settings: &TransformSettings,
        path: &str,
        source: &str,
    ) -> Result<TransformOutput, TransformError> {
        let id = ModuleId::new(Path::new("/project").join(path));
        TransformPipeline::new(settings.clone()).transform(TransformInput {
            id: &id,
            kind: id.kind(),
            source: source.as_bytes(),
        })
    }
}
