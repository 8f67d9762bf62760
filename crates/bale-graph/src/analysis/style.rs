//! Stylesheet scanning.
//!
//! Finds `@import` rules, `url()` references and class selectors without
//! building a full CSS tree. Uses memchr (not regex) for delimiter search.

use memchr::{memchr, memmem};

use super::{TextRange, line_column};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleImport {
    pub specifier: String,
    /// The whole rule, including the trailing `;`
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleUrl {
    pub specifier: String,
    /// The `url(...)` token
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSelector {
    pub name: String,
    /// The name, without the leading `.`
    pub range: TextRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleAnalysis {
    pub imports: Vec<StyleImport>,
    pub urls: Vec<StyleUrl>,
    pub classes: Vec<ClassSelector>,
    pub comments: Vec<TextRange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Specifiers that point outside the bundle.
pub fn is_external_url(specifier: &str) -> bool {
    specifier.is_empty()
        || specifier.starts_with('#')
        || specifier.starts_with("data:")
        || specifier.starts_with("//")
        || specifier.contains("://")
}

pub fn analyze_style(source: &str) -> Result<StyleAnalysis, StyleParseError> {
    Scanner {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        analysis: StyleAnalysis::default(),
    }
    .run()
}

struct Scanner<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    analysis: StyleAnalysis,
}

impl Scanner<'_> {
    fn run(mut self) -> Result<StyleAnalysis, StyleParseError> {
        let mut depth = 0usize;
        let mut prelude_start = 0usize;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'/' if self.peek(1) == Some(b'*') => self.skip_comment()?,
                b'"' | b'\'' => {
                    self.skip_string()?;
                }
                b'@' if self.starts_with_ci("@import") => {
                    self.scan_import()?;
                    prelude_start = self.pos;
                }
                b'u' | b'U' if self.starts_with_ci("url(") && self.at_word_start() => {
                    self.scan_url()?;
                }
                b'{' => {
                    self.scan_selectors(prelude_start, self.pos);
                    depth += 1;
                    self.pos += 1;
                    prelude_start = self.pos;
                }
                b'}' => {
                    if depth == 0 {
                        return Err(self.error(self.pos, "Unexpected `}`"));
                    }
                    depth -= 1;
                    self.pos += 1;
                    prelude_start = self.pos;
                }
                b';' => {
                    self.pos += 1;
                    prelude_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }

        if depth > 0 {
            return Err(self.error(self.bytes.len(), "Unclosed block"));
        }
        Ok(self.analysis)
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn starts_with_ci(&self, needle: &str) -> bool {
        self.bytes
            .get(self.pos..self.pos + needle.len())
            .is_some_and(|slice| slice.eq_ignore_ascii_case(needle.as_bytes()))
    }

    fn at_word_start(&self) -> bool {
        self.pos == 0 || !is_ident_byte(self.bytes[self.pos - 1])
    }

    fn error(&self, offset: usize, message: &str) -> StyleParseError {
        let (line, column) = line_column(self.source, offset);
        StyleParseError {
            message: message.to_string(),
            line,
            column,
        }
    }

    fn skip_comment(&mut self) -> Result<(), StyleParseError> {
        let start = self.pos;
        match memmem::find(&self.bytes[start + 2..], b"*/") {
            Some(end) => {
                self.pos = start + 2 + end + 2;
                self.analysis.comments.push(TextRange::new(start, self.pos));
                Ok(())
            }
            None => Err(self.error(start, "Unterminated comment")),
        }
    }

    /// Skip a quoted string and return its contents.
    fn skip_string(&mut self) -> Result<&str, StyleParseError> {
        let start = self.pos;
        let quote = self.bytes[start];
        let mut cursor = start + 1;
        loop {
            let Some(offset) = memchr(quote, &self.bytes[cursor..]) else {
                return Err(self.error(start, "Unterminated string"));
            };
            let end = cursor + offset;
            if count_backslashes(&self.bytes[start + 1..end]) % 2 == 0 {
                self.pos = end + 1;
                return Ok(&self.source[start + 1..end]);
            }
            cursor = end + 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn scan_import(&mut self) -> Result<(), StyleParseError> {
        let start = self.pos;
        self.pos += "@import".len();
        self.skip_whitespace();

        let specifier = match self.peek(0) {
            Some(b'"') | Some(b'\'') => Some(self.skip_string()?.to_string()),
            _ if self.starts_with_ci("url(") => Some(self.read_url()?.0),
            _ => None,
        };

        let Some(offset) = memchr(b';', &self.bytes[self.pos..]) else {
            return Err(self.error(start, "Unterminated @import"));
        };
        self.pos += offset + 1;

        if let Some(specifier) = specifier.filter(|spec| !is_external_url(spec)) {
            self.analysis.imports.push(StyleImport {
                specifier,
                range: TextRange::new(start, self.pos),
            });
        }
        Ok(())
    }

    fn scan_url(&mut self) -> Result<(), StyleParseError> {
        let start = self.pos;
        let (specifier, end) = self.read_url()?;
        if !is_external_url(&specifier) {
            self.analysis.urls.push(StyleUrl {
                specifier,
                range: TextRange::new(start, end),
            });
        }
        Ok(())
    }

    /// Read `url(...)` at the cursor, returning the unquoted value and the
    /// end offset.
    fn read_url(&mut self) -> Result<(String, usize), StyleParseError> {
        let start = self.pos;
        self.pos += "url(".len();
        self.skip_whitespace();

        let value = match self.peek(0) {
            Some(b'"') | Some(b'\'') => {
                let value = self.skip_string()?.to_string();
                self.skip_whitespace();
                value
            }
            _ => {
                let Some(offset) = memchr(b')', &self.bytes[self.pos..]) else {
                    return Err(self.error(start, "Unterminated url()"));
                };
                let value = self.source[self.pos..self.pos + offset].trim().to_string();
                self.pos += offset;
                value
            }
        };

        if self.peek(0) != Some(b')') {
            return Err(self.error(start, "Unterminated url()"));
        }
        self.pos += 1;
        Ok((value, self.pos))
    }

    /// Record `.class` selectors in a rule prelude. At-rule preludes hold
    /// no selectors.
    fn scan_selectors(&mut self, start: usize, end: usize) {
        let prelude = &self.source[start..end];
        let trimmed = prelude.trim_start();
        if trimmed.starts_with('@') {
            return;
        }

        let bytes = prelude.as_bytes();
        let mut i = 0;
        let mut quote: Option<u8> = None;
        while i < bytes.len() {
            let byte = bytes[i];
            if let Some(q) = quote {
                if byte == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'.' if bytes.get(i + 1).is_some_and(|&b| is_ident_start(b)) => {
                    let name_start = i + 1;
                    let mut name_end = name_start;
                    while name_end < bytes.len() && is_ident_byte(bytes[name_end]) {
                        name_end += 1;
                    }
                    if !self.inside_comment(start + i) {
                        self.analysis.classes.push(ClassSelector {
                            name: prelude[name_start..name_end].to_string(),
                            range: TextRange::new(start + name_start, start + name_end),
                        });
                    }
                    i = name_end;
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
    }

    fn inside_comment(&self, offset: usize) -> bool {
        self.analysis
            .comments
            .iter()
            .rev()
            .take_while(|comment| comment.end > offset)
            .any(|comment| comment.start <= offset)
    }
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'-' || byte >= 0x80
}

fn is_ident_byte(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit()
}

fn count_backslashes(bytes: &[u8]) -> usize {
    bytes.iter().rev().take_while(|&&b| b == b'\\').count()
}
