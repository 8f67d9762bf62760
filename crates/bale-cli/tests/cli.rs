//! End-to-end runs of the `bale` binary.

// Command::cargo_bin is deprecated in newer assert_cmd but still works.
#![allow(deprecated)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"[bundle]
output_path = "dist"

[bundle.entry]
login = "client/login.js"
main = "client/main.js"
"#;

fn write(root: &Path, path: &str, contents: &str) {
    let target = root.join(path);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(target, contents).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "bale.toml", CONFIG);
    write(
        root,
        "client/login.js",
        "import { greet } from './shared';\ngreet('login');\n",
    );
    write(
        root,
        "client/main.js",
        "import { greet } from './shared';\ngreet('main');\n",
    );
    write(
        root,
        "client/shared.js",
        "export function greet(name) {\n  return 'hello ' + name;\n}\n",
    );
    dir
}

fn bale(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bale").unwrap();
    cmd.current_dir(root).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn build_writes_entry_and_shared_chunks() {
    let project = project();
    let root = project.path();

    bale(root).arg("build").assert().success();

    for file in ["login.js", "main.js", "manifest.js", "manifest.json"] {
        assert!(root.join("dist").join(file).is_file(), "missing {file}");
    }
    let shared = fs::read_to_string(root.join("dist/manifest.js")).unwrap();
    assert!(shared.contains("'hello '"));
    let login = fs::read_to_string(root.join("dist/login.js")).unwrap();
    assert!(!login.contains("'hello '"));
}

#[test]
fn build_json_lists_chunks_in_order() {
    let project = project();

    let output = bale(project.path())
        .args(["build", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = json["chunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|chunk| chunk["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["login", "main", "manifest"]);
    assert_eq!(json["manifest"]["chunks"]["manifest"], "manifest.js");
}

#[test]
fn unresolved_import_fails_and_writes_nothing() {
    let project = project();
    let root = project.path();
    write(root, "client/main.js", "import x from 'nope.js';\n");

    bale(root)
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.js").and(predicate::str::contains("client/main.js")));
    assert!(!root.join("dist").exists());
}

#[test]
fn flags_override_the_config_file() {
    let project = project();
    let root = project.path();

    bale(root)
        .args(["build", "--mode", "production", "--out-dir", "public/build"])
        .args(["--public-path", "/build/"])
        .assert()
        .success();

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("public/build/manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["publicPath"], "/build/");
    let login = manifest["chunks"]["login"].as_str().unwrap();
    assert_ne!(login, "login.js", "production names carry a hash");
    assert!(root.join("public/build").join(login).is_file());
    assert!(!root.join("dist").exists());
}

#[test]
fn entries_without_a_config_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "app.js", "import './util';\n");
    write(root, "util.js", "export const util = 1;\n");

    bale(root)
        .args(["build", "--entry", "app.js"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Built 2 modules into 1 chunk in"))
        .stderr(predicate::str::contains("INFO").not());
    assert!(root.join("dist/app.js").is_file());
}

#[test]
fn local_require_functions_do_not_add_dependencies() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "src/main.js",
        "function local(require) { return require('not-a-dep'); }\nlocal(String);\n",
    );

    bale(root)
        .args(["build", "--entry", "src/main.js"])
        .assert()
        .success();
    let main = fs::read_to_string(root.join("dist/main.js")).unwrap();
    assert!(main.contains("return require('not-a-dep');"));
}

#[test]
fn check_writes_nothing() {
    let project = project();
    let root = project.path();

    let output = bale(root).args(["check", "--json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["modules"], 3);
    assert_eq!(report["chunks"].as_array().unwrap().len(), 3);
    assert!(!root.join("dist").exists());
}

#[test]
fn check_reports_missing_entry() {
    let project = project();
    let root = project.path();
    fs::remove_file(root.join("client/login.js")).unwrap();

    bale(root)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("login"));
}

#[test]
fn missing_config_file_is_an_error() {
    let project = project();

    bale(project.path())
        .args(["build", "--config", "other.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn unknown_profile_is_an_error() {
    let project = project();

    bale(project.path())
        .args(["build", "--profile", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn prints_version() {
    Command::cargo_bin("bale")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("bale "));
}
