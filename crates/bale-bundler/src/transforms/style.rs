//! Stylesheet transform.
//!
//! `@import` rules are dropped (the imported sheet becomes a dependency and is
//! concatenated ahead of this one), `url()` targets become markers the
//! emitter fills in, and with CSS modules every class selector is renamed.

use std::ffi::OsStr;
use std::path::{Component, Path};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bale_graph::analysis::{TextRange, analyze_style};
use bale_graph::{Dependency, DependencyKind, TransformError, TransformInput, TransformOutput};
use indexmap::IndexMap;

use super::edits::EditList;
use super::{TransformSettings, short_hash, url_marker};

const CLASS_HASH_LENGTH: usize = 6;

pub(super) fn transform(
    input: &TransformInput<'_>,
    settings: &TransformSettings,
) -> Result<TransformOutput, TransformError> {
    let source = input.text()?;
    let analysis = analyze_style(source)
        .map_err(|err| TransformError::new(err.message).at(err.line, err.column))?;

    let mut edits = EditList::new();
    let mut found: Vec<(TextRange, Dependency)> = analysis
        .imports
        .iter()
        .map(|import| {
            (
                import.range,
                Dependency::new(import.specifier.clone(), DependencyKind::StyleImport),
            )
        })
        .chain(analysis.urls.iter().map(|url| {
            (
                url.range,
                Dependency::new(url.specifier.clone(), DependencyKind::Url),
            )
        }))
        .collect();
    found.sort_by_key(|(range, _)| range.start);

    let mut dependencies = Vec::with_capacity(found.len());
    for (index, (range, dep)) in found.into_iter().enumerate() {
        match dep.kind {
            DependencyKind::Url => {
                edits.replace(range, format!("url({})", url_marker(index)));
            }
            _ => edits.remove(range),
        }
        dependencies.push(dep);
    }

    let mut tokens = IndexMap::new();
    let scoped = settings.css_modules && !in_node_modules(input.path());
    if scoped {
        let relative = settings.relative(input.path());
        for class in &analysis.classes {
            let name = tokens
                .entry(class.name.clone())
                .or_insert_with(|| {
                    scoped_class_name(&settings.local_ident_name, &class.name, &relative)
                })
                .clone();
            edits.replace(class.range, name);
        }
    }

    if settings.minify {
        for comment in &analysis.comments {
            if !source[comment.start..comment.end].starts_with("/*!") {
                edits.remove(*comment);
            }
        }
    }

    let code = if scoped {
        let map: serde_json::Map<String, serde_json::Value> = tokens
            .iter()
            .map(|(local, scoped)| (local.clone(), serde_json::Value::String(scoped.clone())))
            .collect();
        format!("module.exports = {};", serde_json::Value::Object(map))
    } else {
        String::new()
    };

    Ok(TransformOutput {
        code,
        dependencies,
        style: Some(edits.apply(source)),
        tokens,
        ..TransformOutput::default()
    })
}

/// Render a scoped class name from a template with `[local]`, `[name]`,
/// `[hash]` and `[hash:base64]` placeholders. The hash covers the module
/// path and the local name, so it is stable across machines.
pub fn scoped_class_name(template: &str, local: &str, module: &str) -> String {
    let key = format!("{module}:{local}");
    let stem = Path::new(module)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("module");
    let stem = stem.split('.').next().unwrap_or(stem);

    let mut out = template.replace("[local]", local).replace("[name]", stem);
    if out.contains("[hash:base64]") {
        let digest = blake3::hash(key.as_bytes());
        let encoded = URL_SAFE_NO_PAD.encode(&digest.as_bytes()[..6]);
        out = out.replace("[hash:base64]", &encoded[..CLASS_HASH_LENGTH.min(encoded.len())]);
    }
    out.replace("[hash]", &short_hash(key.as_bytes(), CLASS_HASH_LENGTH))
}

fn in_node_modules(path: &Path) -> bool {
    path.components()
        .any(|component| component == Component::Normal(OsStr::new("node_modules")))
}
