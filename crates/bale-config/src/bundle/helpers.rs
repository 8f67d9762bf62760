use std::path::PathBuf;

// Helper defaults
pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_output_path() -> PathBuf {
    PathBuf::from("dist")
}

pub(crate) fn default_public_path() -> String {
    "/".to_string()
}

pub(crate) fn default_extensions() -> Vec<String> {
    [".json", ".js", ".jsx"].iter().map(|s| s.to_string()).collect()
}

pub(crate) fn default_shared_chunk() -> String {
    "manifest".to_string()
}

pub(crate) fn default_asset_filename() -> String {
    "[hash].[ext]".to_string()
}

pub(crate) fn default_hash_length() -> usize {
    8
}

pub(crate) fn default_manifest() -> String {
    "manifest.json".to_string()
}

pub(crate) fn default_asset_inline_limit() -> u64 {
    81_920
}

pub(crate) fn default_local_ident_name() -> String {
    "[local]_[hash]".to_string()
}
