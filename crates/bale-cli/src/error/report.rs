//! Conversion from [`CliError`] to miette reports.

use bale_bundler::BuildError;
use miette::Report;

use crate::error::CliError;

pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(BuildError::Diagnostics(diagnostics)) if diagnostics.len() > 1 => {
            let lines = diagnostics
                .iter()
                .map(|diagnostic| format!("  - {diagnostic}"))
                .collect::<Vec<_>>()
                .join("\n");
            miette::miette!(
                code = "BUILD_ERROR",
                help = "Nothing was written.",
                "{} errors:\n{}",
                diagnostics.len(),
                lines
            )
        }
        CliError::Build(e) => Report::new(e),
        CliError::Config(e) => match e.hint() {
            Some(hint) => miette::miette!(help = hint.to_string(), "Configuration error: {}", e),
            None => miette::miette!("Configuration error: {}", e),
        },
        CliError::FileNotFound(path) => miette::miette!(
            help = "Paths are resolved against the project directory (--cwd).",
            "File not found: {}",
            path.display()
        ),
        other => miette::miette!("{}", other),
    }
}
