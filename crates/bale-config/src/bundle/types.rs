use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Build mode.
///
/// Everything that differs between development and production builds is
/// derived from [`Mode::profile`] instead of toggled field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

/// Settings implied by a [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    /// Strip comments from scripts.
    pub minify: bool,
    /// Default filename templates carry a `[hash]` placeholder.
    pub content_hash: bool,
    /// Modules are keyed by their project-relative path instead of a short hash.
    pub named_modules: bool,
    /// Value substituted for `process.env.NODE_ENV`.
    pub node_env: &'static str,
    /// Default chunk filename template.
    pub filename: &'static str,
    /// Default stylesheet filename template.
    pub css_filename: &'static str,
}

impl Mode {
    pub fn profile(self) -> ModeProfile {
        match self {
            Mode::Development => ModeProfile {
                minify: false,
                content_hash: false,
                named_modules: true,
                node_env: "development",
                filename: "[name].js",
                css_filename: "[name].css",
            },
            Mode::Production => ModeProfile {
                minify: true,
                content_hash: true,
                named_modules: false,
                node_env: "production",
                filename: "[name].[hash].js",
                css_filename: "[name].[hash].css",
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Mode::Production)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(format!(
                "invalid mode '{other}', expected 'development' or 'production'"
            )),
        }
    }
}

/// One entry point: a single module path or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    Single(PathBuf),
    Multiple(Vec<PathBuf>),
}

impl EntrySpec {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            EntrySpec::Single(path) => std::slice::from_ref(path),
            EntrySpec::Multiple(paths) => paths,
        }
    }
}

impl From<PathBuf> for EntrySpec {
    fn from(path: PathBuf) -> Self {
        EntrySpec::Single(path)
    }
}

impl From<&str> for EntrySpec {
    fn from(path: &str) -> Self {
        EntrySpec::Single(PathBuf::from(path))
    }
}

/// How an external specifier is provided by the host page.
///
/// `"react" = "React"` binds the specifier to a global; `"antd" = true`
/// uses the specifier itself as the global name. `false` disables an
/// external inherited from another layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum External {
    Global(String),
    Flag(bool),
}

impl External {
    /// Global name the bundle reads the module from, or `None` when disabled.
    pub fn global_name<'a>(&'a self, specifier: &'a str) -> Option<&'a str> {
        match self {
            External::Global(name) => Some(name),
            External::Flag(true) => Some(specifier),
            External::Flag(false) => None,
        }
    }
}
