//! Byte-range rewriting on top of analysis results.

use bale_graph::analysis::TextRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: TextRange,
    pub replacement: String,
}

/// Replacements collected against one source string.
#[derive(Debug, Default)]
pub struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: TextRange, replacement: impl Into<String>) {
        self.edits.push(Edit {
            range,
            replacement: replacement.into(),
        });
    }

    pub fn remove(&mut self, range: TextRange) {
        self.replace(range, String::new());
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(TextRange::new(at, at), text);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every edit to `source`. Edits overlapping an earlier one are
    /// dropped; insertions at the same offset keep their push order.
    pub fn apply(mut self, source: &str) -> String {
        self.edits
            .sort_by_key(|edit| (edit.range.start, edit.range.end));

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in self.edits {
            let TextRange { start, end } = edit.range;
            if start < cursor || end > source.len() {
                continue;
            }
            out.push_str(&source[cursor..start]);
            out.push_str(&edit.replacement);
            cursor = end;
        }
        out.push_str(&source[cursor..]);
        out
    }
}
