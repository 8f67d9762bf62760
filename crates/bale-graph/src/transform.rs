//! The transform seam between loading a module and adding it to the graph.
//!
//! Transforms are pure: the same input yields the same output, and they never
//! touch the filesystem or the graph. Output code keeps specifiers as written,
//! so a module never needs re-transforming when what it imports moves.

use std::fmt::Debug;
use std::path::Path;

use indexmap::IndexMap;

use crate::analysis::{analyze_script, analyze_style};
use crate::error::TransformError;
use crate::module::{Dependency, DependencyKind, ModuleId, ModuleKind};

/// What a transform sees.
#[derive(Debug, Clone, Copy)]
pub struct TransformInput<'a> {
    pub id: &'a ModuleId,
    pub kind: ModuleKind,
    pub source: &'a [u8],
}

impl<'a> TransformInput<'a> {
    pub fn path(&self) -> &'a Path {
        self.id.path()
    }

    /// Source as UTF-8, for text-based module kinds.
    pub fn text(&self) -> Result<&'a str, TransformError> {
        std::str::from_utf8(self.source).map_err(|err| {
            let (line, column) = crate::analysis::line_column(
                &String::from_utf8_lossy(&self.source[..err.valid_up_to()]),
                err.valid_up_to(),
            );
            TransformError::new("File is not valid UTF-8").at(line, column)
        })
    }
}

/// A file emitted alongside the bundle rather than inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOutput {
    /// Output file name relative to the output directory
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// What a transform produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// Module body in the bundle's module wrapper format
    pub code: String,
    /// Every dependency the output refers to, in source order
    pub dependencies: Vec<Dependency>,
    /// Extracted CSS for style modules
    pub style: Option<String>,
    /// Class name mapping exported by CSS modules
    pub tokens: IndexMap<String, String>,
    /// URL the module stands for when a stylesheet references it
    pub url: Option<String>,
    pub asset: Option<AssetOutput>,
    /// Non-fatal notes, logged but not failing the build
    pub warnings: Vec<String>,
}

/// Converts one module's source into bundle code.
pub trait Transformer: Send + Sync + Debug {
    fn transform(&self, input: TransformInput<'_>) -> Result<TransformOutput, TransformError>;
}

/// Keeps source as-is and only reports dependencies. Useful for analysis
/// and for tests that care about graph shape, not output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanTransformer;

impl Transformer for ScanTransformer {
    fn transform(&self, input: TransformInput<'_>) -> Result<TransformOutput, TransformError> {
        let dependencies = match input.kind {
            ModuleKind::Script => {
                let text = input.text()?;
                analyze_script(input.path(), text, &[])
                    .map_err(|err| {
                        let mut error = TransformError::new(err.message);
                        error.line = err.line;
                        error.column = err.column;
                        error
                    })?
                    .dependencies()
            }
            ModuleKind::Style => {
                let text = input.text()?;
                let analysis = analyze_style(text)
                    .map_err(|err| TransformError::new(err.message).at(err.line, err.column))?;
                let mut deps: Vec<(usize, Dependency)> = analysis
                    .imports
                    .into_iter()
                    .map(|import| {
                        (
                            import.range.start,
                            Dependency::new(import.specifier, DependencyKind::StyleImport),
                        )
                    })
                    .chain(analysis.urls.into_iter().map(|url| {
                        (
                            url.range.start,
                            Dependency::new(url.specifier, DependencyKind::Url),
                        )
                    }))
                    .collect();
                deps.sort_by_key(|(start, _)| *start);
                deps.into_iter().map(|(_, dep)| dep).collect()
            }
            ModuleKind::Json | ModuleKind::Asset | ModuleKind::Raw => Vec::new(),
        };

        Ok(TransformOutput {
            code: String::from_utf8_lossy(input.source).into_owned(),
            dependencies,
            ..TransformOutput::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_reports_script_dependencies() {
        let id = ModuleId::new("/p/main.js");
        let output = ScanTransformer
            .transform(TransformInput {
                id: &id,
                kind: ModuleKind::Script,
                source: b"import './a'; require('./b');",
            })
            .unwrap();

        let specs: Vec<&str> = output
            .dependencies
            .iter()
            .map(|d| d.specifier.as_str())
            .collect();
        assert_eq!(specs, ["./a", "./b"]);
    }

    #[test]
    fn scan_reports_style_dependencies_in_order() {
        let id = ModuleId::new("/p/app.css");
        let output = ScanTransformer
            .transform(TransformInput {
                id: &id,
                kind: ModuleKind::Style,
                source: b"@import './base.css';\n.a { background: url(./a.png) }",
            })
            .unwrap();

        assert_eq!(
            output.dependencies,
            vec![
                Dependency::new("./base.css", DependencyKind::StyleImport),
                Dependency::new("./a.png", DependencyKind::Url),
            ]
        );
    }

    #[test]
    fn scan_errors_carry_location() {
        let id = ModuleId::new("/p/broken.js");
        let err = ScanTransformer
            .transform(TransformInput {
                id: &id,
                kind: ModuleKind::Script,
                source: b"const = 1;",
            })
            .unwrap_err();
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn invalid_utf8_is_a_transform_error() {
        let id = ModuleId::new("/p/bad.js");
        let err = ScanTransformer
            .transform(TransformInput {
                id: &id,
                kind: ModuleKind::Script,
                source: &[0x61, 0xff],
            })
            .unwrap_err();
        assert_eq!(err.message, "File is not valid UTF-8");
    }
}
