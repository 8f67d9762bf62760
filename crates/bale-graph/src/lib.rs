//! # bale-graph
//!
//! Module resolution, source analysis and dependency graph construction.
//!
//! ## Architecture
//!
//! ```text
//! entries ──▶ GraphBuilder ──wave──▶ load (Runtime)
//!                  │                   │
//!                  │                   ▼
//!                  │            transform (rayon pool, Transformer)
//!                  │                   │
//!                  │                   ▼
//!                  │            resolve deps (Resolver, memoized)
//!                  ▼                   │
//!             ModuleGraph ◀────────────┘
//! ```
//!
//! The graph never stops on a bad module: transform failures and unresolved
//! specifiers are recorded and surfaced through
//! [`ModuleGraph::diagnostics`]. Only cancellation, the module limit and
//! worker failures abort a build.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use bale_graph::{GraphBuilder, GraphOptions, NativeRuntime, ResolverOptions, ScanTransformer};
//!
//! # async fn example() -> Result<(), bale_graph::GraphError> {
//! let options = GraphOptions::new(ResolverOptions {
//!     root: PathBuf::from("/project"),
//!     extensions: vec![".js".into(), ".json".into()],
//!     ..Default::default()
//! })
//! .with_entry("main", vec![PathBuf::from("src/main.js")]);
//!
//! let builder = GraphBuilder::new(options, Arc::new(NativeRuntime), Arc::new(ScanTransformer))?;
//! let graph = builder.build().await?;
//! for diagnostic in graph.diagnostics() {
//!     eprintln!("{diagnostic}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod builder;
pub mod error;
pub mod graph;
pub mod module;
pub mod resolver;
pub mod runtime;
pub mod transform;

pub use builder::{
    CancelToken, GraphBuilder, GraphOptions, GraphProgress, MAX_FILE_SIZE, MAX_MODULES,
    ProgressCallback,
};
pub use error::{GraphDiagnostic, GraphError, ResolutionError, TransformError};
pub use graph::{GraphEntry, ModuleGraph};
pub use module::{
    ContentHash, Dependency, DependencyKind, Edge, Module, ModuleId, ModuleKind, Target,
    slash_path,
};
pub use resolver::{ResolveFailure, Resolver, ResolverOptions};
pub use runtime::{FileMetadata, NativeRuntime, Runtime, RuntimeError, VirtualRuntime};
pub use transform::{AssetOutput, ScanTransformer, TransformInput, TransformOutput, Transformer};
