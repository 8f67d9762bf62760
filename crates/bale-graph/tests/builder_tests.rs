use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bale_graph::{
    CancelToken, GraphBuilder, GraphDiagnostic, GraphError, GraphOptions, ModuleGraph, ModuleId,
    ResolverOptions, ScanTransformer, TransformError, TransformInput, TransformOutput, Transformer,
    VirtualRuntime,
};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

const ROOT: &str = "/project";

fn options() -> GraphOptions {
    let mut options = GraphOptions::new(ResolverOptions {
        root: PathBuf::from(ROOT),
        extensions: vec![".json".into(), ".js".into(), ".jsx".into()],
        ..Default::default()
    })
    .with_entry("main", vec![PathBuf::from("main.js")]);
    options.concurrency = 4;
    options
}

fn builder(runtime: &VirtualRuntime, transformer: Arc<dyn Transformer>) -> GraphBuilder {
    GraphBuilder::new(options(), Arc::new(runtime.clone()), transformer).unwrap()
}

fn file(runtime: &VirtualRuntime, path: &str, contents: &str) {
    runtime.add_file(Path::new(ROOT).join(path), contents);
}

fn order(graph: &ModuleGraph) -> Vec<String> {
    graph
        .module_ids()
        .map(|id| id.relative_to(Path::new(ROOT)))
        .collect()
}

/// Snapshot of everything observable about a graph.
fn fingerprint(graph: &ModuleGraph) -> Vec<(String, Vec<String>, String)> {
    graph
        .modules()
        .map(|module| {
            (
                module.id.relative_to(Path::new(ROOT)),
                module
                    .edges
                    .iter()
                    .map(|edge| format!("{}={:?}", edge.specifier, edge.target))
                    .collect(),
                module.hash.to_hex(),
            )
        })
        .collect()
}

/// Counts transforms per module.
#[derive(Debug, Default)]
struct Counting {
    calls: Mutex<FxHashMap<ModuleId, usize>>,
}

impl Transformer for Counting {
    fn transform(&self, input: TransformInput<'_>) -> Result<TransformOutput, TransformError> {
        *self.calls.lock().entry(input.id.clone()).or_default() += 1;
        ScanTransformer.transform(input)
    }
}

/// Tracks how many transforms run at the same time.
#[derive(Debug, Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Transformer for Gauge {
    fn transform(&self, input: TransformInput<'_>) -> Result<TransformOutput, TransformError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        ScanTransformer.transform(input)
    }
}

#[tokio::test]
async fn diamond_is_built_once_per_module() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './a'; import './b';");
    file(&runtime, "a.js", "import './shared';");
    file(&runtime, "b.js", "import './shared';");
    file(&runtime, "shared.js", "export const x = 1;");

    let counting = Arc::new(Counting::default());
    let graph = builder(&runtime, counting.clone()).build().await.unwrap();

    assert_eq!(order(&graph), ["main.js", "a.js", "b.js", "shared.js"]);
    assert!(graph.diagnostics().is_empty());
    assert!(counting.calls.lock().values().all(|&calls| calls == 1));
}

#[tokio::test]
async fn cycles_terminate() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './a';");
    file(&runtime, "a.js", "import './b';");
    file(&runtime, "b.js", "import './main'; import './a';");

    let graph = builder(&runtime, Arc::new(ScanTransformer))
        .build()
        .await
        .unwrap();

    assert_eq!(order(&graph), ["main.js", "a.js", "b.js"]);
}

#[tokio::test]
async fn unresolved_specifier_names_specifier_and_importer() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import 'nope.js';");

    let graph = builder(&runtime, Arc::new(ScanTransformer))
        .build()
        .await
        .unwrap();

    let diagnostics = graph.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    let err = diagnostics[0].as_resolution().unwrap();
    assert_eq!(err.specifier, "nope.js");
    assert_eq!(err.importer, "main.js");
}

#[tokio::test]
async fn missing_entry_is_reported_against_the_entry_name() {
    let runtime = VirtualRuntime::isolated(ROOT);

    let graph = builder(&runtime, Arc::new(ScanTransformer))
        .build()
        .await
        .unwrap();

    assert!(graph.is_empty());
    let diagnostics = graph.diagnostics();
    let err = diagnostics[0].as_resolution().unwrap();
    assert_eq!(err.specifier, "main.js");
    assert_eq!(err.importer, "main");
}

#[tokio::test]
async fn failed_transforms_are_excluded_and_reported() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './broken'; import './ok';");
    file(&runtime, "broken.js", "export const = ;");
    file(&runtime, "ok.js", "export default 1;");

    let graph = builder(&runtime, Arc::new(ScanTransformer))
        .build()
        .await
        .unwrap();

    assert_eq!(order(&graph), ["main.js", "ok.js"]);
    let diagnostics = graph.diagnostics();
    assert_eq!(diagnostics.len(), 2);
    match &diagnostics[0] {
        GraphDiagnostic::Transform(err) => {
            assert_eq!(err.module, "broken.js");
            assert_eq!(err.line, Some(1));
        }
        other => panic!("unexpected diagnostic {other:?}"),
    }
    let downstream = diagnostics[1].as_resolution().unwrap();
    assert_eq!(downstream.specifier, "./broken");
    assert_eq!(downstream.importer, "main.js");
}

#[tokio::test]
async fn transforms_respect_the_concurrency_bound() {
    let runtime = VirtualRuntime::isolated(ROOT);
    let imports: String = (0..12).map(|i| format!("import './m{i}';\n")).collect();
    file(&runtime, "main.js", &imports);
    for i in 0..12 {
        file(&runtime, &format!("m{i}.js"), "export {};");
    }

    let gauge = Arc::new(Gauge::default());
    let mut options = options();
    options.concurrency = 2;
    let builder = GraphBuilder::new(options, Arc::new(runtime.clone()), gauge.clone()).unwrap();
    let graph = builder.build().await.unwrap();

    assert_eq!(graph.len(), 13);
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak concurrency was {peak}");
}

#[tokio::test]
async fn cancelled_builds_stop() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "export {};");

    let token = CancelToken::new();
    token.cancel();
    let builder = builder(&runtime, Arc::new(ScanTransformer)).with_cancel_token(token);

    assert!(matches!(builder.build().await, Err(GraphError::Cancelled)));
}

#[tokio::test]
async fn full_builds_forget_memoized_resolution() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './late';");
    let builder = builder(&runtime, Arc::new(ScanTransformer));

    let first = builder.build().await.unwrap();
    assert_eq!(first.diagnostics().len(), 1);

    file(&runtime, "late.js", "export {};");
    let second = builder.build().await.unwrap();
    assert!(second.diagnostics().is_empty());
    assert_eq!(order(&second), ["main.js", "late.js"]);
}

#[tokio::test]
async fn incremental_content_change_matches_full_build() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './a'; import './b';");
    file(&runtime, "a.js", "export const a = 1;");
    file(&runtime, "b.js", "export const b = 2;");
    file(&runtime, "c.js", "export const c = 3;");

    let counting = Arc::new(Counting::default());
    let incremental = builder(&runtime, counting.clone());
    let previous = incremental.build().await.unwrap();

    // a.js now pulls in c.js and drops nothing.
    file(&runtime, "a.js", "import './c'; export const a = 1;");
    let patched = incremental
        .rebuild(&previous, &[PathBuf::from("/project/a.js")], false)
        .await
        .unwrap();

    let fresh = builder(&runtime, Arc::new(ScanTransformer))
        .build()
        .await
        .unwrap();

    assert_eq!(fingerprint(&patched), fingerprint(&fresh));
    assert_eq!(order(&patched), ["main.js", "a.js", "b.js", "c.js"]);

    let calls = counting.calls.lock();
    assert_eq!(calls[&ModuleId::new("/project/b.js")], 1);
    assert_eq!(calls[&ModuleId::new("/project/a.js")], 2);
}

#[tokio::test]
async fn incremental_removal_prunes_orphans() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './a';");
    file(&runtime, "a.js", "import './b';");
    file(&runtime, "b.js", "export {};");

    let builder = builder(&runtime, Arc::new(ScanTransformer));
    let previous = builder.build().await.unwrap();

    file(&runtime, "a.js", "export {};");
    let patched = builder
        .rebuild(&previous, &[PathBuf::from("/project/a.js")], false)
        .await
        .unwrap();

    assert_eq!(order(&patched), ["main.js", "a.js"]);
}

#[tokio::test]
async fn created_files_fix_resolution_errors_incrementally() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './missing';");

    let builder = builder(&runtime, Arc::new(ScanTransformer));
    let previous = builder.build().await.unwrap();
    assert_eq!(previous.diagnostics().len(), 1);

    file(&runtime, "missing.js", "export {};");
    let patched = builder
        .rebuild(&previous, &[PathBuf::from("/project/missing.js")], true)
        .await
        .unwrap();

    assert!(patched.diagnostics().is_empty());
    assert_eq!(order(&patched), ["main.js", "missing.js"]);
}

#[tokio::test]
async fn fixing_a_broken_module_clears_its_diagnostic() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './broken';");
    file(&runtime, "broken.js", "let = ;");

    let builder = builder(&runtime, Arc::new(ScanTransformer));
    let previous = builder.build().await.unwrap();
    assert_eq!(previous.diagnostics().len(), 2);

    file(&runtime, "broken.js", "export const fixed = true;");
    let patched = builder
        .rebuild(&previous, &[PathBuf::from("/project/broken.js")], false)
        .await
        .unwrap();

    assert!(patched.diagnostics().is_empty());
    assert_eq!(order(&patched), ["main.js", "broken.js"]);
}

#[tokio::test]
async fn rebuilding_twice_is_idempotent() {
    let runtime = VirtualRuntime::isolated(ROOT);
    file(&runtime, "main.js", "import './a'; import 'nope';");
    file(&runtime, "a.js", "export {};");

    let builder = builder(&runtime, Arc::new(ScanTransformer));
    let first = builder.build().await.unwrap();
    let second = builder.build().await.unwrap();

    assert_eq!(fingerprint(&first), fingerprint(&second));
    assert_eq!(first.diagnostics(), second.diagnostics());
}
