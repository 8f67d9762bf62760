//! Virtual files layered over the filesystem.
//!
//! Virtual files are checked first, then the runtime falls back to disk.

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{FileMetadata, NativeRuntime, Runtime, RuntimeResult};

#[derive(Debug, Clone)]
pub struct VirtualRuntime {
    /// Virtual files stored in memory
    files: Arc<RwLock<FxHashMap<PathBuf, Arc<[u8]>>>>,
    /// Current working directory for resolving relative paths
    cwd: PathBuf,
    /// Disable the filesystem fallback entirely
    isolated: bool,
}

impl VirtualRuntime {
    /// Virtual files over the real filesystem.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into(),
            isolated: false,
        }
    }

    /// Virtual files only; the disk is never consulted.
    pub fn isolated(cwd: impl Into<PathBuf>) -> Self {
        Self {
            isolated: true,
            ..Self::new(cwd)
        }
    }

    /// Add or replace a virtual file. The path is normalized before storage.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let normalized = self.normalize(path.as_ref());
        let content: Vec<u8> = content.into();
        self.files.write().insert(normalized, Arc::from(content));
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        let normalized = self.normalize(path.as_ref());
        self.files.write().remove(&normalized).is_some()
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(&self.normalize(path))
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }

    fn is_virtual_dir(&self, path: &Path) -> bool {
        let dir = self.normalize(path);
        self.files
            .read()
            .keys()
            .any(|file| file != &dir && file.starts_with(&dir))
    }
}

#[async_trait]
impl Runtime for VirtualRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize(path);
        if let Some(content) = self.files.read().get(&normalized) {
            return Ok(content.to_vec());
        }
        if self.isolated {
            return Err(super::RuntimeError::FileNotFound(normalized));
        }
        NativeRuntime.read_file(&normalized).await
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let normalized = self.normalize(path);
        if let Some(content) = self.files.read().get(&normalized) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
            });
        }
        if self.is_virtual_dir(&normalized) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
            });
        }
        if self.isolated {
            return Err(super::RuntimeError::FileNotFound(normalized));
        }
        NativeRuntime.metadata(&normalized).await
    }

    fn exists(&self, path: &Path) -> bool {
        let normalized = self.normalize(path);
        if self.files.read().contains_key(&normalized) || self.is_virtual_dir(&normalized) {
            return true;
        }
        !self.isolated && normalized.exists()
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
