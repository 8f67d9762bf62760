//! Turning a candidate path into a file: exact match, then configured
//! extensions, then a directory index.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Append an extension without replacing one the path already has, so
/// `./config.local` + `.js` is `./config.local.js`.
fn with_appended_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(extension);
    PathBuf::from(raw)
}

/// Try `candidate` as written, then with each extension in priority order.
pub async fn try_extensions(
    candidate: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
) -> Option<PathBuf> {
    if runtime.is_file(candidate).await {
        return Some(candidate.to_path_buf());
    }

    for extension in extensions {
        let with_ext = with_appended_extension(candidate, extension);
        if runtime.is_file(&with_ext).await {
            return Some(with_ext);
        }
    }

    None
}

/// Try `dir/index{ext}` for each extension.
pub async fn try_index_files(
    dir: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
) -> Option<PathBuf> {
    if !runtime.is_dir(dir).await {
        return None;
    }

    for extension in extensions {
        let index = dir.join(format!("index{extension}"));
        if runtime.is_file(&index).await {
            return Some(index);
        }
    }

    None
}

/// Resolve a candidate path with extension and index fallbacks.
pub async fn resolve_file(
    candidate: &Path,
    extensions: &[String],
    runtime: &dyn Runtime,
) -> Option<PathBuf> {
    if let Some(file) = try_extensions(candidate, extensions, runtime).await {
        return Some(file);
    }
    try_index_files(candidate, extensions, runtime).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::VirtualRuntime;

    fn exts() -> Vec<String> {
        vec![".json".into(), ".js".into(), ".jsx".into()]
    }

    #[tokio::test]
    async fn exact_path_wins_over_extensions() {
        let runtime = VirtualRuntime::isolated("/p");
        runtime.add_file("/p/a", "exact");
        runtime.add_file("/p/a.js", "js");

        let found = resolve_file(Path::new("/p/a"), &exts(), &runtime).await;
        assert_eq!(found, Some(PathBuf::from("/p/a")));
    }

    #[tokio::test]
    async fn extensions_are_tried_in_priority_order() {
        let runtime = VirtualRuntime::isolated("/p");
        runtime.add_file("/p/data.js", "js");
        runtime.add_file("/p/data.json", "{}");

        let found = resolve_file(Path::new("/p/data"), &exts(), &runtime).await;
        assert_eq!(found, Some(PathBuf::from("/p/data.json")));
    }

    #[tokio::test]
    async fn extensions_are_appended_not_replaced() {
        let runtime = VirtualRuntime::isolated("/p");
        runtime.add_file("/p/config.local.js", "");

        let found = resolve_file(Path::new("/p/config.local"), &exts(), &runtime).await;
        assert_eq!(found, Some(PathBuf::from("/p/config.local.js")));
    }

    #[tokio::test]
    async fn directories_fall_back_to_index() {
        let runtime = VirtualRuntime::isolated("/p");
        runtime.add_file("/p/components/index.jsx", "");

        let found = resolve_file(Path::new("/p/components"), &exts(), &runtime).await;
        assert_eq!(found, Some(PathBuf::from("/p/components/index.jsx")));
    }

    #[tokio::test]
    async fn missing_files_resolve_to_none() {
        let runtime = VirtualRuntime::isolated("/p");
        assert_eq!(resolve_file(Path::new("/p/nope"), &exts(), &runtime).await, None);
    }
}
