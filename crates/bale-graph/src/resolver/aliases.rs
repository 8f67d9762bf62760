//! Path alias handling (e.g. `"@" → "src"`, `"themes" → "client/themes"`).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// Rewrite `specifier` through the longest alias that matches whole path
/// segments. Relative alias targets are taken from `root`.
pub fn resolve_alias(
    specifier: &str,
    aliases: &IndexMap<String, PathBuf>,
    root: &Path,
) -> Option<PathBuf> {
    let (alias, target) = aliases
        .iter()
        .filter(|(alias, _)| {
            specifier == alias.as_str()
                || specifier
                    .strip_prefix(alias.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|(alias, _)| alias.len())?;

    let rest = specifier[alias.len()..].trim_start_matches('/');
    let base = if target.is_absolute() {
        target.clone()
    } else {
        root.join(target)
    };

    Some(if rest.is_empty() { base } else { base.join(rest) })
}
