//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation (for library use).

use std::path::{Path, PathBuf};

use crate::bundle::BundleOptions;
use crate::error::{ConfigError, Result};

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    /// Validate bundle options
    fn validate(&self, config: &BundleOptions) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use bale_config::{BundleOptions, ConfigValidator, SchemaValidator};
///
/// let config = BundleOptions::default().with_entry("main", "src/main.js");
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &BundleOptions) -> Result<()> {
        if config.entry.is_empty() {
            return Err(ConfigError::NoEntries);
        }

        for (name, spec) in &config.entry {
            if !is_valid_chunk_name(name) {
                return Err(schema_error(
                    format!("entry name '{name}' cannot be used as a chunk name"),
                    "Use letters, digits, '-', '_' or '.' in entry names",
                ));
            }
            if spec.paths().is_empty() {
                return Err(schema_error(
                    format!("entry '{name}' has no paths"),
                    "Give each entry a path or a non-empty list of paths",
                ));
            }
        }

        if !is_valid_chunk_name(&config.shared_chunk) {
            return Err(schema_error(
                format!("shared chunk name '{}' is invalid", config.shared_chunk),
                "Use letters, digits, '-', '_' or '.' in the shared chunk name",
            ));
        }
        if config.entry.contains_key(&config.shared_chunk) {
            return Err(schema_error(
                format!(
                    "entry '{}' collides with the shared chunk name",
                    config.shared_chunk
                ),
                "Rename the entry or set 'shared_chunk' to a different name",
            ));
        }

        for ext in &config.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(schema_error(
                    format!("extension '{ext}' must start with '.'"),
                    "Write extensions like \".js\"",
                ));
            }
        }

        for template in [config.chunk_filename(), config.stylesheet_filename()] {
            if !template.contains("[name]") {
                return Err(schema_error(
                    format!("filename template '{template}' has no [name] placeholder"),
                    "Chunk filenames must include [name] so chunks do not overwrite each other",
                ));
            }
        }
        if !config.asset_filename.contains("[hash]") && !config.asset_filename.contains("[name]")
        {
            return Err(schema_error(
                format!(
                    "asset filename template '{}' needs [hash] or [name]",
                    config.asset_filename
                ),
                "The default template is \"[hash].[ext]\"",
            ));
        }

        if !(4..=64).contains(&config.hash_length) {
            return Err(schema_error(
                format!("hash_length {} is out of range", config.hash_length),
                "Use a value between 4 and 64",
            ));
        }

        if config.manifest.trim().is_empty() {
            return Err(schema_error(
                "manifest filename cannot be empty".to_string(),
                "The default is \"manifest.json\"",
            ));
        }

        if config.concurrency == Some(0) {
            return Err(schema_error(
                "concurrency must be at least 1".to_string(),
                "Remove 'concurrency' to use all available cores",
            ));
        }

        if config.externals.keys().any(|name| name.trim().is_empty()) {
            return Err(schema_error(
                "external specifiers cannot be empty".to_string(),
                "Remove empty keys from 'externals'",
            ));
        }
        if config.aliases.keys().any(|name| name.trim().is_empty()) {
            return Err(schema_error(
                "alias prefixes cannot be empty".to_string(),
                "Remove empty keys from 'aliases'",
            ));
        }

        Ok(())
    }
}

/// Filesystem validator (for CLI use)
///
/// Validates that every entry path exists under the root.
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    /// Create a new filesystem validator with a root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &BundleOptions) -> Result<()> {
        SchemaValidator.validate(config)?;

        for (name, spec) in &config.entry {
            for entry in spec.paths() {
                let path = self.root.join(entry);
                if !path.exists() {
                    return Err(ConfigError::EntryNotFound {
                        name: name.clone(),
                        path,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Convenience wrapper around [`SchemaValidator`].
pub fn validate_schema(config: &BundleOptions) -> Result<()> {
    SchemaValidator.validate(config)
}

/// Convenience wrapper around [`FsValidator`].
pub fn validate_fs(config: &BundleOptions, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}

fn schema_error(message: String, hint: &str) -> ConfigError {
    ConfigError::SchemaValidation {
        message,
        hint: Some(hint.to_string()),
    }
}

fn is_valid_chunk_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
