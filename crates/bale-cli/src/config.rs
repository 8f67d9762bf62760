//! Turns command-line flags into a loaded [`BaleConfig`].

use std::path::PathBuf;

use bale_config::{BaleConfig, ConfigLoader, Mode};
use serde_json::{Map, Value, json};

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};

/// Load configuration for a command.
///
/// The project directory is `--cwd` or the current directory. Flags are
/// applied as the highest-priority layer.
pub fn load(args: &ConfigArgs) -> Result<BaleConfig> {
    let root = project_dir(args)?;
    if let Some(path) = &args.config {
        let path = root.join(path);
        if !path.is_file() {
            return Err(CliError::FileNotFound(path));
        }
    }

    let config = ConfigLoader::new(&root)
        .config_path(args.config.clone())
        .profile(args.profile.clone())
        .overrides(overrides(args))
        .load()?;

    tracing::debug!(
        root = %config.bundle.project_root().display(),
        entries = config.bundle.entry.len(),
        mode = config.bundle.mode.as_str(),
        "configuration loaded"
    );
    Ok(config)
}

fn project_dir(args: &ConfigArgs) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match &args.cwd {
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Flags shaped like the `[bundle]` table of a config file.
pub fn overrides(args: &ConfigArgs) -> Value {
    let mut bundle = Map::new();

    if !args.entries.is_empty() {
        let entries: Map<String, Value> = args
            .entries
            .iter()
            .map(|(name, path)| (name.clone(), json!(path)))
            .collect();
        bundle.insert("entry".to_string(), Value::Object(entries));
    }
    if let Some(out_dir) = &args.out_dir {
        bundle.insert("output_path".to_string(), json!(out_dir));
    }
    if let Some(public_path) = &args.public_path {
        bundle.insert("public_path".to_string(), json!(public_path));
    }
    if let Some(mode) = args.mode {
        bundle.insert("mode".to_string(), json!(Mode::from(mode).as_str()));
    }
    if !args.externals.is_empty() {
        let externals: Map<String, Value> = args
            .externals
            .iter()
            .map(|(specifier, global)| (specifier.clone(), json!(global)))
            .collect();
        bundle.insert("externals".to_string(), Value::Object(externals));
    }

    json!({ "bundle": bundle })
}
