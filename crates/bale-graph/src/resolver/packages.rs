//! Bare specifier resolution through `node_modules`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::extensions::resolve_file;
use crate::runtime::Runtime;

/// Maximum allowed size for package.json files (10MB)
const MAX_PACKAGE_JSON_SIZE: u64 = 10 * 1024 * 1024;

/// The entry point fields of a package.json, in lookup order.
#[derive(Debug, Default, Deserialize)]
struct PackageEntryFields {
    /// Only the string form; the object form remaps files and is ignored.
    browser: Option<serde_json::Value>,
    module: Option<String>,
    main: Option<String>,
}

impl PackageEntryFields {
    fn entry(&self) -> Option<&str> {
        self.browser
            .as_ref()
            .and_then(|browser| browser.as_str())
            .or(self.module.as_deref())
            .or(self.main.as_deref())
    }
}

/// Split `@scope/name/sub/path` into the package name and the subpath.
pub fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    for (seen, (index, _)) in specifier.match_indices('/').enumerate() {
        if seen + 1 == name_segments {
            split_at = Some(index);
            break;
        }
    }
    match split_at {
        Some(index) => (&specifier[..index], Some(&specifier[index + 1..])),
        None => (specifier, None),
    }
}

async fn read_entry_fields(package_dir: &Path, runtime: &dyn Runtime) -> PackageEntryFields {
    let manifest = package_dir.join("package.json");
    let too_large = runtime
        .metadata(&manifest)
        .await
        .map(|meta| meta.size > MAX_PACKAGE_JSON_SIZE)
        .unwrap_or(true);
    if too_large {
        return PackageEntryFields::default();
    }

    match runtime.read_file(&manifest).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            tracing::debug!(path = %manifest.display(), %err, "ignoring unreadable package.json");
            PackageEntryFields::default()
        }),
        Err(_) => PackageEntryFields::default(),
    }
}

/// Walk up from `importer_dir` looking for `node_modules/<package>`.
pub async fn resolve_package(
    specifier: &str,
    importer_dir: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
) -> Option<PathBuf> {
    let (name, subpath) = split_package_specifier(specifier);

    for dir in importer_dir.ancestors() {
        let package_dir = dir.join("node_modules").join(name);
        if !runtime.is_dir(&package_dir).await {
            continue;
        }

        if let Some(subpath) = subpath {
            return resolve_file(&package_dir.join(subpath), extensions, runtime).await;
        }

        let fields = read_entry_fields(&package_dir, runtime).await;
        if let Some(entry) = fields.entry() {
            if let Some(file) = resolve_file(&package_dir.join(entry), extensions, runtime).await {
                return Some(file);
            }
        }
        return resolve_file(&package_dir.join("index"), extensions, runtime).await;
    }

    None
}
