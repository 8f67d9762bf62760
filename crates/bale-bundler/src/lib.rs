#![cfg_attr(docsrs, feature(doc_cfg))]

//! # bale-bundler
//!
//! Turns the module graph from `bale-graph` into chunks on disk.
//!
//! A build runs four stages:
//!
//! 1. **Graph**: entries are resolved and every reachable module is loaded
//!    and transformed ([`transforms::TransformPipeline`]).
//! 2. **Plan**: each module gets the set of entries that reach it. Modules
//!    reached by one entry go to that entry's chunk, the rest to the shared
//!    chunk ([`planner::plan_chunks`]).
//! 3. **Render**: chunks, stylesheets and assets become named, hashed files
//!    plus a manifest ([`emit::render`]).
//! 4. **Write**: files are written to temporaries and renamed into place.
//!
//! Any resolution or transform error fails the build before anything is
//! written.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bale_config::BundleOptions;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = BundleOptions::default()
//!     .with_root(".")
//!     .with_entry("login", "client/login.js")
//!     .with_entry("main", "client/main.js");
//!
//! let output = bale_bundler::build(options).await?;
//! for chunk in &output.chunks {
//!     println!("{} -> {}", chunk.name, chunk.script.file_name);
//! }
//! # Ok(()) }
//! ```
//!
//! ### Watch mode
//!
//! ```no_run
//! use std::time::Duration;
//! use bale_bundler::{Bundler, ChangeKind, FileChange};
//! use bale_config::BundleOptions;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = BundleOptions::default().with_entry("main", "client/main.js");
//! let session = Bundler::new(options)?.into_watch()?;
//!
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! // Feed events from a file watcher.
//! tx.send(FileChange::new("client/main.js", ChangeKind::Modified))?;
//! drop(tx);
//! session.run(rx, Duration::from_millis(100)).await;
//! # Ok(()) }
//! ```

pub use bale_graph::{CancelToken, GraphDiagnostic, ResolutionError, TransformError};

pub mod bundler;
pub mod emit;
pub mod error;
pub mod events;
pub mod planner;
pub mod transforms;
pub mod watch;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use bundler::{BuildOutput, BuildStats, Bundler, CheckReport, build};
pub use emit::{EmittedAsset, EmittedChunk, EmittedFile, Manifest};
pub use error::{BuildError, EmitError, Result};
pub use events::{BuildEvent, EventSender, ProgressReporter};
pub use planner::{Chunk, ChunkKind, ChunkPlan, plan_chunks};
pub use transforms::{TransformPipeline, TransformSettings};
pub use watch::{ChangeBatch, ChangeKind, FileChange, WatchSession};
