//! Chunk rendering and output.
//!
//! [`render`] is pure: it turns a graph and a chunk plan into named files
//! with content hashes. [`write_bundle`] puts them on disk through the
//! atomic writer, skipping files whose name and hash are already there.

pub mod manifest;
pub mod runtime;
pub mod template;
pub mod writer;

use std::path::{Path, PathBuf};

use bale_config::BundleOptions;
use bale_graph::{DependencyKind, Module, ModuleGraph, ModuleId, Target};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::Value;

use crate::error::EmitError;
use crate::planner::{Chunk, ChunkKind, ChunkPlan};
use crate::transforms::{short_hash, url_marker};

pub use manifest::Manifest;
use runtime::{PRELUDE, external_factory, external_key, module_key};
use template::FilenameTemplate;

type Result<T> = std::result::Result<T, EmitError>;

/// Output naming and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitSettings {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub public_path: String,
    pub filename: String,
    pub css_filename: String,
    pub hash_length: usize,
    pub manifest: String,
    /// Key modules by relative path rather than by hash
    pub named_modules: bool,
}

impl EmitSettings {
    pub fn from_options(options: &BundleOptions, root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            output_dir: root.join(&options.output_path),
            public_path: options.public_path.clone(),
            filename: options.chunk_filename().to_string(),
            css_filename: options.stylesheet_filename().to_string(),
            hash_length: options.hash_length,
            manifest: options.manifest.clone(),
            named_modules: options.profile().named_modules,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedFile {
    pub file_name: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedChunk {
    pub name: String,
    pub kind: ChunkKind,
    pub script: EmittedFile,
    pub style: Option<EmittedFile>,
    /// Runtime keys of member modules, in chunk order
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedAsset {
    /// Project-relative source path
    pub source: String,
    pub file: EmittedFile,
}

/// A file ready to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub hash: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderedBundle {
    pub chunks: Vec<EmittedChunk>,
    pub assets: Vec<EmittedAsset>,
    pub manifest: Manifest,
    /// Every file, manifest last
    pub artifacts: Vec<Artifact>,
}

/// Counts from one write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub written: usize,
    /// Files already on disk with the same name and hash
    pub reused: usize,
}

/// Render every chunk, stylesheet and asset of a build.
pub fn render(graph: &ModuleGraph, plan: &ChunkPlan, settings: &EmitSettings) -> Result<RenderedBundle> {
    let renderer = Renderer::new(graph, settings);
    let mut bundle = RenderedBundle {
        manifest: Manifest {
            public_path: settings.public_path.clone(),
            ..Manifest::default()
        },
        ..RenderedBundle::default()
    };
    let mut names = FxHashSet::default();

    for chunk in &plan.chunks {
        let script = renderer.render_script(chunk);
        let script = renderer.artifact(&settings.filename, &chunk.name, "js", script.into_bytes());
        claim(&mut names, &script.file_name)?;

        let style = match renderer.render_style(chunk) {
            Some(css) => {
                let artifact =
                    renderer.artifact(&settings.css_filename, &chunk.name, "css", css.into_bytes());
                claim(&mut names, &artifact.file_name)?;
                Some(artifact)
            }
            None => None,
        };

        bundle
            .manifest
            .chunks
            .insert(chunk.name.clone(), script.file_name.clone());
        if let Some(style) = &style {
            bundle
                .manifest
                .styles
                .insert(chunk.name.clone(), style.file_name.clone());
        }
        bundle.chunks.push(EmittedChunk {
            name: chunk.name.clone(),
            kind: chunk.kind,
            script: emitted(&script),
            style: style.as_ref().map(emitted),
            modules: chunk
                .modules
                .iter()
                .map(|id| renderer.key(id).to_string())
                .collect(),
        });
        bundle.artifacts.push(script);
        bundle.artifacts.extend(style);
    }

    let mut asset_hashes: FxHashMap<String, String> = FxHashMap::default();
    for module in graph.modules() {
        let Some(asset) = &module.output.asset else {
            continue;
        };
        let hash = short_hash(&asset.contents, settings.hash_length);
        match asset_hashes.get(&asset.file_name) {
            Some(existing) if *existing == hash => {}
            Some(_) => return Err(EmitError::Conflict(asset.file_name.clone())),
            None => {
                claim(&mut names, &asset.file_name)?;
                asset_hashes.insert(asset.file_name.clone(), hash.clone());
                bundle.artifacts.push(Artifact {
                    file_name: asset.file_name.clone(),
                    hash: hash.clone(),
                    contents: asset.contents.clone(),
                });
            }
        }
        let source = module.id.relative_to(&settings.root);
        bundle
            .manifest
            .assets
            .insert(source.clone(), asset.file_name.clone());
        bundle.assets.push(EmittedAsset {
            source,
            file: EmittedFile {
                file_name: asset.file_name.clone(),
                hash,
            },
        });
    }

    let manifest_json = bundle.manifest.to_json();
    claim(&mut names, &settings.manifest)?;
    bundle.artifacts.push(Artifact {
        file_name: settings.manifest.clone(),
        hash: short_hash(manifest_json.as_bytes(), settings.hash_length),
        contents: manifest_json.into_bytes(),
    });

    Ok(bundle)
}

/// Write a rendered bundle into `output_dir`.
///
/// `previous` maps file names from the last successful write to their
/// hashes; matching files that still exist are left alone.
pub fn write_bundle(
    bundle: &RenderedBundle,
    output_dir: &Path,
    previous: &FxHashMap<String, String>,
) -> Result<WriteSummary> {
    let dir = writer::validate_and_normalize_dir(output_dir)?;
    let mut files: Vec<(&str, &[u8])> = Vec::with_capacity(bundle.artifacts.len());
    let mut reused = 0;

    for artifact in &bundle.artifacts {
        let unchanged = previous.get(&artifact.file_name) == Some(&artifact.hash)
            && dir.join(&artifact.file_name).is_file();
        if unchanged {
            reused += 1;
        } else {
            files.push((artifact.file_name.as_str(), artifact.contents.as_slice()));
        }
    }

    writer::write_files_to(&dir, &files)?;
    Ok(WriteSummary {
        written: files.len(),
        reused,
    })
}

impl RenderedBundle {
    /// File name → hash for every artifact.
    pub fn file_hashes(&self) -> FxHashMap<String, String> {
        self.artifacts
            .iter()
            .map(|artifact| (artifact.file_name.clone(), artifact.hash.clone()))
            .collect()
    }
}

fn claim(names: &mut FxHashSet<String>, file_name: &str) -> Result<()> {
    if names.insert(file_name.to_string()) {
        Ok(())
    } else {
        Err(EmitError::Conflict(file_name.to_string()))
    }
}

fn emitted(artifact: &Artifact) -> EmittedFile {
    EmittedFile {
        file_name: artifact.file_name.clone(),
        hash: artifact.hash.clone(),
    }
}

fn json_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

struct Renderer<'a> {
    graph: &'a ModuleGraph,
    settings: &'a EmitSettings,
    keys: FxHashMap<ModuleId, String>,
}

impl<'a> Renderer<'a> {
    fn new(graph: &'a ModuleGraph, settings: &'a EmitSettings) -> Self {
        let keys = graph
            .module_ids()
            .map(|id| {
                (
                    id.clone(),
                    module_key(id, &settings.root, settings.named_modules),
                )
            })
            .collect();
        Self {
            graph,
            settings,
            keys,
        }
    }

    fn key(&self, id: &ModuleId) -> &str {
        self.keys.get(id).map(String::as_str).unwrap_or_default()
    }

    fn artifact(&self, template: &str, name: &str, ext: &str, contents: Vec<u8>) -> Artifact {
        let hash = short_hash(&contents, self.settings.hash_length);
        let file_name = FilenameTemplate::new(template)
            .name(name)
            .hash(&hash)
            .ext(ext)
            .render();
        Artifact {
            file_name,
            hash,
            contents,
        }
    }

    fn render_script(&self, chunk: &Chunk) -> String {
        let mut records = Vec::with_capacity(chunk.modules.len());
        let mut externals: IndexMap<&str, &str> = IndexMap::new();

        for id in &chunk.modules {
            let Some(module) = self.graph.get(id) else {
                continue;
            };
            let mut deps = serde_json::Map::new();
            for edge in &module.edges {
                match &edge.target {
                    Target::Module(target) => {
                        if let Some(key) = self.keys.get(target) {
                            deps.insert(edge.specifier.clone(), Value::String(key.clone()));
                        }
                    }
                    Target::External { global } => {
                        deps.insert(
                            edge.specifier.clone(),
                            Value::String(external_key(&edge.specifier)),
                        );
                        externals
                            .entry(edge.specifier.as_str())
                            .or_insert(global.as_str());
                    }
                }
            }
            records.push(format!(
                "{}: [function (module, exports, __bale_require__) {{\n{}\n}}, {}]",
                json_string(self.key(id)),
                module.output.code.trim_end(),
                Value::Object(deps)
            ));
        }

        for (specifier, global) in externals {
            records.push(format!(
                "{}: [function (module) {{\n{}\n}}, {{}}]",
                json_string(&external_key(specifier)),
                external_factory(global)
            ));
        }

        let size = records.iter().map(String::len).sum::<usize>();
        let mut out = String::with_capacity(PRELUDE.len() + size + 64);
        out.push_str(PRELUDE);
        out.push_str("__bale__.define({\n");
        out.push_str(&records.join(",\n"));
        out.push_str("\n});\n");

        let run: Vec<Value> = chunk
            .run
            .iter()
            .filter(|id| self.keys.contains_key(*id))
            .map(|id| Value::String(self.key(id).to_string()))
            .collect();
        if chunk.kind == ChunkKind::Entry && !run.is_empty() {
            out.push_str(&format!("__bale__.run({});\n", Value::Array(run)));
        }
        out
    }

    /// Concatenated styles of the chunk. A sheet's `@import`s come first
    /// when they live in the same chunk.
    fn render_style(&self, chunk: &Chunk) -> Option<String> {
        let members: FxHashSet<&ModuleId> = chunk.modules.iter().collect();
        let mut visited = FxHashSet::default();
        let mut parts = Vec::new();
        for id in &chunk.modules {
            self.collect_style(id, &members, &mut visited, &mut parts);
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    fn collect_style(
        &self,
        id: &ModuleId,
        members: &FxHashSet<&ModuleId>,
        visited: &mut FxHashSet<ModuleId>,
        parts: &mut Vec<String>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }
        let Some(module) = self.graph.get(id) else {
            return;
        };
        let Some(style) = &module.output.style else {
            return;
        };
        for edge in &module.edges {
            if edge.kind != DependencyKind::StyleImport {
                continue;
            }
            if let Some(dep) = edge.module().filter(|dep| members.contains(dep)) {
                self.collect_style(dep, members, visited, parts);
            }
        }
        parts.push(self.resolve_urls(module, style));
    }

    fn resolve_urls(&self, module: &Module, style: &str) -> String {
        let mut css = style.to_string();
        for (index, dep) in module.output.dependencies.iter().enumerate() {
            if dep.kind != DependencyKind::Url {
                continue;
            }
            let url = module
                .edges
                .iter()
                .find(|edge| edge.specifier == dep.specifier)
                .and_then(|edge| edge.module())
                .and_then(|target| self.graph.get(target))
                .and_then(|target| target.output.url.clone())
                .unwrap_or_else(|| dep.specifier.clone());
            css = css.replace(&url_marker(index), &format!("\"{}\"", url.replace('"', "%22")));
        }
        css
    }
}
