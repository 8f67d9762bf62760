//! Configuration for the bale bundler.
//!
//! [`BaleConfig`] is the root record. It is usually produced by
//! [`ConfigLoader`], which layers serialized defaults, a discovered
//! `bale.toml` (or the `bale` field of `package.json`), `BALE_*` environment
//! variables and caller overrides, then applies an optional profile.

pub mod bundle;
pub mod config;
pub mod discovery;
pub mod error;
pub mod loading;
pub mod validation;
pub mod watch;

pub use bundle::*;
pub use config::*;
pub use error::*;
pub use watch::*;

pub use discovery::{ConfigDiscovery, discover, discover_with_profile};
pub use loading::ConfigLoader;
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
