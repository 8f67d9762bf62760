//! Tests for configuration validation.

use bale_config::{
    BundleOptions, ConfigError, ConfigValidator, EntrySpec, FsValidator, SchemaValidator,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn options() -> BundleOptions {
    BundleOptions::default()
        .with_entry("login", "login.js")
        .with_entry("main", "main.js")
}

#[test]
fn valid_config_passes() {
    SchemaValidator.validate(&options()).expect("valid");
}

#[test]
fn rejects_missing_entries() {
    let result = SchemaValidator.validate(&BundleOptions::default());
    assert!(matches!(result, Err(ConfigError::NoEntries)));
}

#[test]
fn rejects_entry_named_like_shared_chunk() {
    let config = options().with_entry("manifest", "manifest.js");
    let err = SchemaValidator.validate(&config).unwrap_err();
    assert!(err.to_string().contains("schema validation failed"));
    assert!(err.hint().unwrap().contains("shared_chunk"));
}

#[test]
fn rejects_empty_entry_list() {
    let config = options().with_entry("empty", EntrySpec::Multiple(Vec::new()));
    assert!(SchemaValidator.validate(&config).is_err());
}

#[test]
fn rejects_path_like_entry_names() {
    let config = BundleOptions::default().with_entry("../escape", "main.js");
    assert!(SchemaValidator.validate(&config).is_err());
}

#[test]
fn rejects_extension_without_dot() {
    let mut config = options();
    config.extensions.push("ts".into());
    assert!(SchemaValidator.validate(&config).is_err());
}

#[test]
fn rejects_template_without_name() {
    let mut config = options();
    config.filename = Some("bundle.[hash].js".into());
    assert!(SchemaValidator.validate(&config).is_err());
}

#[test]
fn rejects_zero_concurrency_and_bad_hash_length() {
    let mut config = options();
    config.concurrency = Some(0);
    assert!(SchemaValidator.validate(&config).is_err());

    let mut config = options();
    config.hash_length = 128;
    assert!(SchemaValidator.validate(&config).is_err());
}

#[test]
fn fs_validator_catches_missing_entry() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("login.js"), "").expect("write login");

    let result = FsValidator::new(dir.path()).validate(&options());
    match result.unwrap_err() {
        ConfigError::EntryNotFound { name, path } => {
            assert_eq!(name, "main");
            assert!(path.ends_with("main.js"));
        }
        other => panic!("expected EntryNotFound, got {other:?}"),
    }
}

#[test]
fn fs_validator_accepts_existing_entries() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("login.js"), "").expect("write login");
    fs::write(dir.path().join("main.js"), "").expect("write main");

    FsValidator::new(dir.path())
        .validate(&options())
        .expect("entries exist");
    assert!(dir.path().join(PathBuf::from("main.js")).exists());
}
