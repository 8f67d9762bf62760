//! Module identity and per-module records.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use serde::{Serialize, Serializer};

use crate::error::ResolutionError;
use crate::transform::TransformOutput;

/// Canonical identifier for a module in the graph: a cleaned absolute path
/// plus the query string the module was requested with (`?raw`, `?url`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    path: PathBuf,
    query: Option<String>,
}

impl ModuleId {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().clean(),
            query: None,
        }
    }

    pub fn with_query(path: impl AsRef<Path>, query: Option<&str>) -> Self {
        Self {
            path: path.as_ref().clean(),
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Module kind implied by the query and the file extension.
    pub fn kind(&self) -> ModuleKind {
        match self.query() {
            Some("raw") => return ModuleKind::Raw,
            Some("url") | Some("inline") => return ModuleKind::Asset,
            _ => {}
        }

        match self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("js" | "jsx" | "mjs" | "cjs") => ModuleKind::Script,
            Some("css") => ModuleKind::Style,
            Some("json") => ModuleKind::Json,
            _ => ModuleKind::Asset,
        }
    }

    /// Project-relative form with forward slashes, used for diagnostics and
    /// development module keys. Falls back to the absolute path outside `root`.
    pub fn relative_to(&self, root: &Path) -> String {
        let path = match self.path.strip_prefix(root) {
            Ok(rel) => slash_path(rel),
            Err(_) => slash_path(&self.path),
        };
        match &self.query {
            Some(query) => format!("{path}?{query}"),
            None => path,
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

impl Serialize for ModuleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Join path components with `/` regardless of platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir => Some(String::new()),
            Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::CurDir => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// JavaScript, including JSX and CommonJS
    Script,
    /// CSS
    Style,
    Json,
    /// Images, fonts and other binary files
    Asset,
    /// Any file imported with `?raw`, exported as text
    Raw,
}

/// How a module refers to one of its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// `import … from` and `export … from`
    Static,
    /// `import()`
    Dynamic,
    /// `require()`
    Require,
    /// CSS `@import`
    StyleImport,
    /// CSS `url()`
    Url,
}

/// A dependency reference as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub specifier: String,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(specifier: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
        }
    }
}

/// What a specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Module(ModuleId),
    /// Provided by the host page under this global name
    External { global: String },
}

/// A resolved dependency edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub specifier: String,
    pub kind: DependencyKind,
    pub target: Target,
}

impl Edge {
    pub fn module(&self) -> Option<&ModuleId> {
        match &self.target {
            Target::Module(id) => Some(id),
            Target::External { .. } => None,
        }
    }
}

/// BLAKE3 digest of a module's raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

/// A loaded, transformed module. Immutable once inserted into the graph.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub kind: ModuleKind,
    pub source: Arc<[u8]>,
    pub hash: ContentHash,
    pub output: Arc<TransformOutput>,
    /// Resolved dependencies, in source order, one per specifier
    pub edges: Vec<Edge>,
    /// Specifiers that did not resolve
    pub unresolved: Vec<ResolutionError>,
}

impl Module {
    /// Module ids this module depends on, in source order.
    pub fn dependencies(&self) -> impl Iterator<Item = &ModuleId> {
        self.edges.iter().filter_map(Edge::module)
    }
}
