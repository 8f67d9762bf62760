//! Tests for configuration profiles and merging behavior.

use bale_config::{ConfigDiscovery, ConfigError, ConfigLoader, EntrySpec, Mode};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(contents: &str) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("bale.toml"), contents).expect("write config");
    dir
}

#[test]
fn profile_overrides_bundle_options() {
    let dir = write_config(
        r#"
[bundle]
mode = "development"
hash_length = 8

[bundle.entry]
main = "src/main.js"

[profiles.production.bundle]
mode = "production"
hash_length = 12
"#,
    );

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("production")
        .expect("load with profile");

    assert_eq!(config.bundle.mode, Mode::Production);
    assert_eq!(config.bundle.hash_length, 12);
    assert_eq!(
        config.bundle.entry["main"],
        EntrySpec::Single(PathBuf::from("src/main.js"))
    );
}

#[test]
fn profile_overrides_watch_options() {
    let dir = write_config(
        r#"
[watch]
debounce_ms = 50

[profiles.slow.watch]
debounce_ms = 500
"#,
    );

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("slow")
        .expect("load with profile");

    assert_eq!(config.watch.debounce_ms, 500);
}

#[test]
fn profile_merges_nested_tables() {
    let dir = write_config(
        r#"
[bundle.css]
modules = true
local_ident_name = "[local]_[hash]"

[profiles.plain.bundle.css]
modules = false
"#,
    );

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("plain")
        .expect("load with profile");

    assert!(!config.bundle.css.modules);
    assert_eq!(config.bundle.css.local_ident_name, "[local]_[hash]");
}

#[test]
fn profile_replaces_arrays() {
    let dir = write_config(
        r#"
[bundle]
extensions = [".json", ".js", ".jsx"]

[profiles.modern.bundle]
extensions = [".mjs", ".js"]
"#,
    );

    let config = ConfigDiscovery::new(dir.path())
        .load_with_profile("modern")
        .expect("load with profile");

    assert_eq!(config.bundle.extensions, [".mjs", ".js"]);
}

#[test]
fn unknown_profile_is_rejected() {
    let dir = write_config("[bundle]\n");

    let result = ConfigDiscovery::new(dir.path()).load_with_profile("nonexistent");
    assert!(matches!(result, Err(ConfigError::UnknownProfile(_))));
}

#[test]
fn overrides_outrank_the_profile() {
    let dir = write_config(
        r#"
[bundle]
output_path = "dist"

[profiles.production.bundle]
mode = "production"
output_path = "public"
"#,
    );

    let config = ConfigLoader::new(dir.path())
        .profile(Some("production".into()))
        .overrides(serde_json::json!({ "bundle": { "output_path": "out" } }))
        .load()
        .expect("load with profile and overrides");

    assert_eq!(config.bundle.mode, Mode::Production);
    assert_eq!(config.bundle.output_path, PathBuf::from("out"));
}
