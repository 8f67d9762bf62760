//! Error handling for the bale CLI.
//!
//! [`CliError`] wraps the config and bundler errors so commands can use `?`
//! throughout. `main` turns it into a [`miette::Report`] through
//! [`cli_error_to_miette`].

mod report;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use report::cli_error_to_miette;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] bale_config::ConfigError),

    #[error(transparent)]
    Build(#[from] bale_bundler::BuildError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Attach context to I/O results.
pub trait ResultExt<T> {
    /// Report a missing file as [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => CliError::FileNotFound(path.as_ref().to_path_buf()),
            _ => CliError::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {err}", path.as_ref().display()),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_file_not_found() {
        let err = std::fs::read("/definitely/not/here.js")
            .with_path("/definitely/not/here.js")
            .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(path) if path.ends_with("here.js")));
    }

    #[test]
    fn build_errors_display_transparently() {
        let err = CliError::from(bale_bundler::BuildError::Cancelled);
        assert_eq!(err.to_string(), "Build cancelled");
    }
}
