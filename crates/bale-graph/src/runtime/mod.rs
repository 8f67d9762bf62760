//! Platform runtime abstraction.
//!
//! The graph builder and resolver only touch files through [`Runtime`], so
//! tests and embedders can swap the filesystem for virtual files.

mod native;
mod virtual_fs;

pub use native::NativeRuntime;
pub use virtual_fs::VirtualRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),

    /// The blocking task running the operation panicked or was cancelled
    #[error("Runtime error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Size in bytes
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
}

/// Read-only view of the files a build consumes.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Synchronous so resolution can probe candidates cheaply.
    fn exists(&self, path: &Path) -> bool;

    /// Base for relative project roots.
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;

    async fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
            && self
                .metadata(path)
                .await
                .map(|meta| meta.is_file)
                .unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.exists(path)
            && self
                .metadata(path)
                .await
                .map(|meta| meta.is_dir)
                .unwrap_or(false)
    }
}
