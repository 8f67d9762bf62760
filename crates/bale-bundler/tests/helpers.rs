//! Shared test utilities for bale-bundler tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bale_config::BundleOptions;
use tempfile::TempDir;

/// Create a project directory holding `files` (relative path, contents).
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (path, contents) in files {
        write(dir.path(), path, contents.as_bytes());
    }
    dir
}

pub fn write(root: &Path, path: &str, contents: &[u8]) {
    let target = root.join(path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(target, contents).expect("write file");
}

/// Options rooted at `root` with the given entries.
pub fn options(root: &Path, entries: &[(&str, &str)]) -> BundleOptions {
    let mut options = BundleOptions::default().with_root(root);
    for (name, path) in entries {
        options = options.with_entry(*name, *path);
    }
    options.concurrency = Some(2);
    options
}

/// Every file under `dir`, keyed by slash-separated relative path.
pub fn read_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    collect(dir, dir, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path
                .strip_prefix(root)
                .expect("under root")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative, fs::read(&path).expect("read output"));
        }
    }
}

pub fn read_string(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path.as_ref())
        .unwrap_or_else(|err| panic!("read {}: {err}", path.as_ref().display()))
}

/// Login and main entries sharing one module.
pub fn login_main_project() -> TempDir {
    project(&[
        (
            "client/login.js",
            "import { greet } from './shared';\ngreet('login');\n",
        ),
        (
            "client/main.js",
            "import { greet } from './shared';\nimport { boot } from './boot';\ngreet('main');\nboot();\n",
        ),
        (
            "client/shared.js",
            "export function greet(name) {\n  return 'hello ' + name;\n}\n",
        ),
        (
            "client/boot.js",
            "export function boot() {\n  return 1;\n}\n",
        ),
    ])
}
