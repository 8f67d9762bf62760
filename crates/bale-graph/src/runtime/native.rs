use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::task;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// The real filesystem. Blocking calls run on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();
        blocking(move || std::fs::read(&path).map_err(|err| io_error(&path, "read", err))).await
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let path = path.to_path_buf();
        blocking(move || {
            let meta = std::fs::metadata(&path).map_err(|err| io_error(&path, "stat", err))?;
            Ok(FileMetadata {
                size: meta.len(),
                is_dir: meta.is_dir(),
                is_file: meta.is_file(),
            })
        })
        .await
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        std::env::current_dir()
            .map_err(|err| RuntimeError::Io(format!("Failed to get current directory: {err}")))
    }
}

async fn blocking<T, F>(op: F) -> RuntimeResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RuntimeResult<T> + Send + 'static,
{
    task::spawn_blocking(op)
        .await
        .map_err(|err| RuntimeError::Other(format!("blocking task failed: {err}")))?
}

fn io_error(path: &Path, action: &str, err: io::Error) -> RuntimeError {
    match err.kind() {
        io::ErrorKind::NotFound => RuntimeError::FileNotFound(path.to_path_buf()),
        _ => RuntimeError::Io(format!("Failed to {action} {}: {err}", path.display())),
    }
}
