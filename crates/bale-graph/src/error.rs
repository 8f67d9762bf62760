//! Error types for graph construction.

use std::fmt;

use thiserror::Error;

/// A specifier that could not be mapped to a module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot resolve '{specifier}' from '{importer}': {reason}")]
pub struct ResolutionError {
    /// The specifier exactly as written
    pub specifier: String,
    /// Project-relative path of the importing module, or the entry name
    pub importer: String,
    pub reason: String,
}

/// A module whose transform failed. The module is left out of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct TransformError {
    /// Project-relative path of the module
    pub module: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            module: String::new(),
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
            if let Some(column) = self.column {
                write!(f, ":{column}")?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

/// A recoverable problem recorded while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphDiagnostic {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl GraphDiagnostic {
    pub fn as_resolution(&self) -> Option<&ResolutionError> {
        match self {
            Self::Resolution(err) => Some(err),
            Self::Transform(_) => None,
        }
    }

    pub fn as_transform(&self) -> Option<&TransformError> {
        match self {
            Self::Transform(err) => Some(err),
            Self::Resolution(_) => None,
        }
    }
}

/// Failures that stop graph construction outright.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("Build cancelled")]
    Cancelled,

    #[error("Too many modules: reached the limit of {max}")]
    TooManyModules { max: usize },

    #[error("Failed to start transform workers: {0}")]
    ThreadPool(String),

    #[error("Transform task failed: {0}")]
    TaskFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] crate::runtime::RuntimeError),
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_names_specifier_and_importer() {
        let err = ResolutionError {
            specifier: "nope.js".to_string(),
            importer: "main.js".to_string(),
            reason: "no matching file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve 'nope.js' from 'main.js': no matching file"
        );
    }

    #[test]
    fn transform_error_display_includes_location() {
        let err = TransformError::new("Unexpected token")
            .at(3, 7)
            .in_module("src/app.js");
        assert_eq!(err.to_string(), "src/app.js:3:7: Unexpected token");

        let err = TransformError::new("bad").in_module("a.css");
        assert_eq!(err.to_string(), "a.css: bad");
    }
}
