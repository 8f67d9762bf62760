use serde::{Deserialize, Serialize};

use super::helpers::{default_local_ident_name, default_true};

/// Stylesheet handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssOptions {
    /// Scope class selectors per module and export the generated names.
    #[serde(default = "default_true")]
    pub modules: bool,

    /// Template for scoped class names. Supports `[local]`, `[name]` and `[hash]`.
    #[serde(default = "default_local_ident_name", alias = "localIdentName")]
    pub local_ident_name: String,
}

impl Default for CssOptions {
    fn default() -> Self {
        Self {
            modules: true,
            local_ident_name: default_local_ident_name(),
        }
    }
}
