//! Parsers for structured flag values.

use std::path::{Path, PathBuf};

/// Parse `--entry NAME=PATH`. A bare path is named after its file stem.
pub fn parse_entry(value: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = match value.split_once('=') {
        Some((name, path)) => (name.trim().to_string(), path.trim()),
        None => {
            let stem = Path::new(value)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| format!("cannot derive an entry name from '{value}'"))?;
            (stem.to_string(), value.trim())
        }
    };

    if name.is_empty() {
        return Err(format!("entry '{value}' has an empty name"));
    }
    if path.is_empty() {
        return Err(format!("entry '{name}' has an empty path"));
    }
    Ok((name, PathBuf::from(path)))
}

/// Parse `--external SPECIFIER=GLOBAL`. A bare specifier is its own global.
pub fn parse_external(value: &str) -> Result<(String, String), String> {
    let (specifier, global) = value.split_once('=').unwrap_or((value, value));
    let (specifier, global) = (specifier.trim(), global.trim());
    if specifier.is_empty() || global.is_empty() {
        return Err(format!("invalid external '{value}', expected SPECIFIER=GLOBAL"));
    }
    Ok((specifier.to_string(), global.to_string()))
}
