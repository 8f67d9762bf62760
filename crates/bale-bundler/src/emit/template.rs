//! Output filename templates: `[name]`, `[hash]`, `[hash:N]` and `[ext]`.

/// A filename template with its placeholder values.
///
/// Unknown placeholders are kept verbatim. `[hash:N]` keeps the first `N`
/// characters of the hash.
#[derive(Debug, Clone, Default)]
pub struct FilenameTemplate<'a> {
    template: &'a str,
    name: Option<&'a str>,
    hash: Option<&'a str>,
    ext: Option<&'a str>,
}

impl<'a> FilenameTemplate<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn hash(mut self, hash: &'a str) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn ext(mut self, ext: &'a str) -> Self {
        self.ext = Some(ext);
        self
    }

    /// True when the rendered name depends on file contents.
    pub fn uses_hash(&self) -> bool {
        self.template.contains("[hash")
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len() + 16);
        let mut rest = self.template;

        while let Some(open) = rest.find('[') {
            out.push_str(&rest[..open]);
            let after = &rest[open..];
            let Some(close) = after.find(']') else {
                out.push_str(after);
                return out;
            };
            let token = &after[1..close];
            match self.value(token) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&after[..=close]),
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn value(&self, token: &str) -> Option<String> {
        match token {
            "name" => self.name.map(str::to_string),
            "hash" => self.hash.map(str::to_string),
            "ext" => self.ext.map(str::to_string),
            _ => {
                let len: usize = token.strip_prefix("hash:")?.parse().ok()?;
                self.hash.map(|hash| hash[..len.min(hash.len())].to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders() {
        let name = FilenameTemplate::new("[name].[hash].js")
            .name("main")
            .hash("0123abcd")
            .render();
        assert_eq!(name, "main.0123abcd.js");
    }

    #[test]
    fn hash_length_can_be_narrowed() {
        let name = FilenameTemplate::new("js/[name]-[hash:4].js")
            .name("login")
            .hash("0123abcd")
            .render();
        assert_eq!(name, "js/login-0123.js");
    }

    #[test]
    fn unknown_or_missing_placeholders_stay() {
        let name = FilenameTemplate::new("[name].[chunkhash].[ext]")
            .name("a")
            .render();
        assert_eq!(name, "a.[chunkhash].[ext]");
        assert!(!FilenameTemplate::new("[name].js").uses_hash());
    }
}
