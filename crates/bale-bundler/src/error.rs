//! Error types for bale-bundler.

use bale_config::ConfigError;
use bale_graph::{GraphDiagnostic, GraphError};

/// Failure while writing build output. Always aborts the build.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitError {
    /// Output path escapes the output directory or is otherwise unsafe.
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// Writing or renaming a file failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Two artifacts rendered to the same file name.
    #[error("Conflicting output file: {0}")]
    Conflict(String),
}

/// Why a build produced no output.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    /// Resolution and transform errors collected while building the graph.
    #[error("{}", format_diagnostics(.0))]
    Diagnostics(Vec<GraphDiagnostic>),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Build cancelled")]
    Cancelled,

    #[error("{0}")]
    Graph(GraphError),
}

pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Diagnostics collected by the graph, empty for every other failure.
    pub fn diagnostics(&self) -> &[GraphDiagnostic] {
        match self {
            BuildError::Diagnostics(diagnostics) => diagnostics,
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

impl From<GraphError> for BuildError {
    fn from(error: GraphError) -> Self {
        match error {
            GraphError::Cancelled => BuildError::Cancelled,
            other => BuildError::Graph(other),
        }
    }
}

impl From<ConfigError> for BuildError {
    fn from(error: ConfigError) -> Self {
        match error.hint() {
            Some(hint) => BuildError::InvalidConfig(format!("{error} ({hint})")),
            None => BuildError::InvalidConfig(error.to_string()),
        }
    }
}

fn format_diagnostics(diagnostics: &[GraphDiagnostic]) -> String {
    match diagnostics {
        [] => "Build failed".to_string(),
        [single] => single.to_string(),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

impl miette::Diagnostic for BuildError {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            BuildError::Diagnostics(diagnostics) => match diagnostics.first() {
                Some(GraphDiagnostic::Resolution(_)) => "RESOLUTION_ERROR",
                Some(GraphDiagnostic::Transform(_)) => "TRANSFORM_ERROR",
                None => "BUILD_ERROR",
            },
            BuildError::Emit(EmitError::InvalidOutputPath(_)) => "INVALID_OUTPUT_PATH",
            BuildError::Emit(_) => "WRITE_FAILURE",
            BuildError::InvalidConfig(_) => "INVALID_CONFIG",
            BuildError::Cancelled => "CANCELLED",
            BuildError::Graph(_) => "GRAPH_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            BuildError::Diagnostics(diagnostics) => match diagnostics.as_slice() {
                [GraphDiagnostic::Resolution(_)] => Some(Box::new(
                    "Check the import path. Relative specifiers must start with './' or '../'."
                        .to_string(),
                )),
                [GraphDiagnostic::Transform(_)] => None,
                _ => Some(Box::new(
                    "Multiple errors occurred. Nothing was written.".to_string(),
                )),
            },
            BuildError::Emit(EmitError::InvalidOutputPath(path)) => Some(Box::new(format!(
                "The output path '{path}' is invalid. Ensure it stays inside the output directory."
            ))),
            BuildError::Emit(EmitError::WriteFailure(msg)) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {msg}"
            ))),
            BuildError::Emit(EmitError::Conflict(_)) => Some(Box::new(
                "Add [name] or [hash] to the filename templates so outputs stay distinct."
                    .to_string(),
            )),
            BuildError::InvalidConfig(_) => Some(Box::new(
                "Check your configuration file for mistakes.".to_string(),
            )),
            BuildError::Cancelled | BuildError::Graph(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bale_graph::ResolutionError;

    #[test]
    fn single_diagnostic_displays_as_is() {
        let err = BuildError::Diagnostics(vec![GraphDiagnostic::Resolution(ResolutionError {
            specifier: "nope.js".into(),
            importer: "main.js".into(),
            reason: "not found".into(),
        })]);
        assert!(err.to_string().contains("'nope.js'"));
        assert_eq!(err.diagnostics().len(), 1);
    }

    #[test]
    fn graph_cancellation_maps_to_cancelled() {
        assert!(BuildError::from(GraphError::Cancelled).is_cancelled());
    }
}
