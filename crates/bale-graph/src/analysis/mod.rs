//! Source analysis for scripts and stylesheets.
//!
//! Analysis reports byte ranges instead of AST nodes so that rewriting can
//! happen on plain strings after the parser's arena is gone.

pub mod script;
pub mod style;

pub use script::{
    BindingReference, CommentRange, DefineHit, ExportName, ImportBinding, ImportRecord, Imported,
    ModuleStatement, ScriptAnalysis, ScriptParseError, analyze_script,
};
pub use style::{
    ClassSelector, StyleAnalysis, StyleImport, StyleParseError, StyleUrl, analyze_style,
    is_external_url,
};

/// Half-open byte range into a module's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 1-based line and column of a byte offset.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = memchr::memchr_iter(b'\n', before).count() + 1;
    let line_start = memchr::memrchr(b'\n', before).map_or(0, |pos| pos + 1);
    let column = source[line_start..offset].chars().count() + 1;
    (line as u32, column as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_column_is_one_based() {
        let source = "ab\ncd\n";
        assert_eq!(line_column(source, 0), (1, 1));
        assert_eq!(line_column(source, 4), (2, 2));
        assert_eq!(line_column(source, 99), (3, 1));
    }
}
