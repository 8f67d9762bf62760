use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Maps logical names to emitted files so pages can find hashed outputs.
///
/// ```json
/// {
///   "publicPath": "/build/",
///   "chunks": { "login": "login.3f2a9c1e.js", "manifest": "manifest.77b0e4d2.js" },
///   "styles": { "login": "login.9d0c5e11.css" },
///   "assets": { "client/images/logo.png": "4be1c0aa.png" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub public_path: String,
    /// Chunk name → script file
    pub chunks: IndexMap<String, String>,
    /// Chunk name → stylesheet file, for chunks with styles
    pub styles: IndexMap<String, String>,
    /// Project-relative source path → emitted asset file
    pub assets: IndexMap<String, String>,
}

impl Manifest {
    pub fn to_json(&self) -> String {
        // A map of strings always serializes.
        serde_json::to_string_pretty(self).unwrap_or_default() + "\n"
    }

    /// Public URL of a chunk's script.
    pub fn chunk_url(&self, name: &str) -> Option<String> {
        self.chunks
            .get(name)
            .map(|file| format!("{}{}", self.public_path, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_in_insertion_order() {
        let mut manifest = Manifest {
            public_path: "/build/".into(),
            ..Manifest::default()
        };
        manifest.chunks.insert("login".into(), "login.js".into());
        manifest.chunks.insert("main".into(), "main.js".into());

        let json = manifest.to_json();
        assert!(json.contains("\"publicPath\": \"/build/\""));
        assert!(json.find("login.js").unwrap() < json.find("main.js").unwrap());
        assert_eq!(manifest.chunk_url("main").as_deref(), Some("/build/main.js"));

        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }
}
