//! # bale-cli
//!
//! The `bale` command: one-shot builds, watch mode and configuration checks
//! on top of `bale-bundler`.
//!
//! ## Commands
//!
//! - `bale build` writes chunks, stylesheets, assets and the manifest
//! - `bale watch` builds, then rebuilds incrementally as files change
//! - `bale check` loads the config and builds the graph without writing
//!
//! Configuration comes from `bale.toml` (or the `bale` field of
//! `package.json`), `BALE_*` environment variables and command-line flags,
//! in increasing priority.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;
pub mod watcher;

pub use error::{CliError, Result};
