use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bale_graph::{AssetOutput, TransformInput, TransformOutput};

use super::{TransformSettings, short_hash};
use crate::emit::template::FilenameTemplate;

/// Small files become data URIs; the rest are emitted under a hashed name
/// and exported as a public URL. `?inline` and `?url` force either choice.
pub(super) fn transform(input: &TransformInput<'_>, settings: &TransformSettings) -> TransformOutput {
    let bytes = input.source;
    let path = input.path();
    let inline = match input.id.query() {
        Some("inline") => true,
        Some("url") => false,
        _ => bytes.len() as u64 <= settings.asset_inline_limit,
    };

    let mut output = TransformOutput::default();
    let url = if inline {
        format!("data:{};base64,{}", mime_type(path), STANDARD.encode(bytes))
    } else {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("asset");
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");
        let hash = short_hash(bytes, settings.hash_length);
        let file_name = FilenameTemplate::new(&settings.asset_filename)
            .name(stem)
            .hash(&hash)
            .ext(ext)
            .render();

        output.asset = Some(AssetOutput {
            file_name: file_name.clone(),
            contents: bytes.to_vec(),
        });
        format!("{}{}", settings.public_path, file_name)
    };

    output.code = format!(
        "module.exports = {};",
        serde_json::Value::String(url.clone())
    );
    output.url = Some(url);
    output
}

/// Content type for a data URI, from the file extension.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("bmp") => "image/bmp",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("eot") => "application/vnd.ms-fontobject",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("txt") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
