//! End-to-end builds against real directories.

mod helpers;

use std::sync::Arc;

use bale_bundler::{BuildError, BuildEvent, Bundler, CancelToken, ChunkKind, Manifest};
use bale_config::{External, Mode};
use bale_graph::GraphDiagnostic;
use helpers::{login_main_project, options, project, read_string, read_tree, write};
use parking_lot::Mutex;

#[tokio::test]
async fn shared_module_lands_only_in_the_shared_chunk() {
    let project = login_main_project();
    let root = project.path();

    let output = bale_bundler::build(options(
        root,
        &[("login", "client/login.js"), ("main", "client/main.js")],
    ))
    .await
    .expect("build succeeds");

    let names: Vec<&str> = output.chunks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["login", "main", "manifest"]);
    assert_eq!(output.chunk("manifest").unwrap().kind, ChunkKind::Shared);
    assert_eq!(output.chunk("manifest").unwrap().modules, ["client/shared.js"]);
    assert_eq!(output.chunk("login").unwrap().modules, ["client/login.js"]);
    assert_eq!(
        output.chunk("main").unwrap().modules,
        ["client/main.js", "client/boot.js"]
    );

    let dist = root.join("dist");
    let shared_record = "\"client/shared.js\": [function";
    assert!(read_string(dist.join("manifest.js")).contains(shared_record));
    for entry in ["login.js", "main.js"] {
        let code = read_string(dist.join(entry));
        assert!(!code.contains(shared_record), "{entry} duplicates shared.js");
        assert!(!code.contains("'hello '"), "{entry} carries shared.js code");
    }

    let login = read_string(dist.join("login.js"));
    assert!(login.ends_with("__bale__.run([\"client/login.js\"]);\n"));
    assert!(login.contains("{\"./shared\":\"client/shared.js\"}"));
    assert!(!read_string(dist.join("manifest.js")).contains("__bale__.run("));

    let manifest: Manifest =
        serde_json::from_str(&read_string(dist.join("manifest.json"))).unwrap();
    assert_eq!(manifest, output.manifest);
    assert_eq!(manifest.chunks["manifest"], "manifest.js");
    assert_eq!(manifest.chunk_url("login").as_deref(), Some("/login.js"));
}

#[tokio::test]
async fn unresolved_import_fails_without_writing() {
    let project = project(&[("main.js", "import x from 'nope.js';\nconsole.log(x);\n")]);
    let root = project.path();

    let error = bale_bundler::build(options(root, &[("main", "main.js")]))
        .await
        .unwrap_err();

    let diagnostics = error.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    let resolution = diagnostics[0].as_resolution().expect("resolution error");
    assert_eq!(resolution.specifier, "nope.js");
    assert_eq!(resolution.importer, "main.js");
    assert!(!root.join("dist").exists());
}

#[tokio::test]
async fn transform_errors_carry_location_and_fail_importers() {
    let project = project(&[
        ("main.js", "import './broken';\nimport './fine';\n"),
        ("broken.js", "let ok = 1;\nconst = 2;\n"),
        ("fine.js", "export default 1;\n"),
    ]);
    let root = project.path();

    let error = bale_bundler::build(options(root, &[("main", "main.js")]))
        .await
        .unwrap_err();

    let diagnostics = error.diagnostics();
    let transform = diagnostics
        .iter()
        .find_map(GraphDiagnostic::as_transform)
        .expect("transform error");
    assert_eq!(transform.module, "broken.js");
    assert_eq!(transform.line, Some(2));

    let downstream = diagnostics
        .iter()
        .find_map(GraphDiagnostic::as_resolution)
        .expect("importer error");
    assert_eq!(downstream.specifier, "./broken");
    assert_eq!(downstream.importer, "main.js");
    assert!(!root.join("dist").exists());
}

#[tokio::test]
async fn production_builds_are_byte_identical() {
    let project = login_main_project();
    let root = project.path();
    let mut opts = options(root, &[("login", "client/login.js"), ("main", "client/main.js")]);
    opts.mode = Mode::Production;

    let first = bale_bundler::build(opts.clone()).await.unwrap();
    let first_tree = read_tree(&root.join("dist"));

    let second = bale_bundler::build(opts.clone()).await.unwrap();
    assert_eq!(read_tree(&root.join("dist")), first_tree);
    assert_eq!(first.manifest, second.manifest);

    opts.output_path = "again".into();
    bale_bundler::build(opts).await.unwrap();
    assert_eq!(read_tree(&root.join("again")), first_tree);

    // Hashed names, hashed module keys, no comments.
    let login = &first.manifest.chunks["login"];
    assert!(login.starts_with("login.") && login.ends_with(".js") && login.len() == "login.12345678.js".len());
    assert!(!read_string(root.join("dist").join(login)).contains("client/login.js"));
}

#[tokio::test]
async fn styles_assets_externals_and_defines() {
    let project = project(&[
        (
            "client/main.js",
            "import styles from './main.css';\nimport React from 'react';\nif (process.env.NODE_ENV !== 'production') {\n  console.log(styles.title, React, __DEV__);\n}\n",
        ),
        ("client/base.css", "body { margin: 0 }\n"),
        (
            "client/main.css",
            "@import './base.css';\n.title { background: url('./logo.png'); }\n.hero { background: url('./big.png'); }\n",
        ),
    ]);
    let root = project.path();
    write(root, "client/logo.png", &[1, 2, 3]);
    write(root, "client/big.png", &vec![7u8; 90_000]);

    let mut opts = options(root, &[("main", "client/main.js")]);
    opts.public_path = "/build/".into();
    opts.externals
        .insert("react".into(), External::Global("React".into()));

    let output = bale_bundler::build(opts).await.unwrap();
    let dist = root.join("dist");

    let script = read_string(dist.join("main.js"));
    assert!(script.contains("(\"development\") !== 'production'"));
    assert!(script.contains("\"external:react\": [function (module) {\nmodule.exports = globalThis[\"React\"];"));
    assert!(script.contains("\"./main.css\":\"client/main.css\""));

    let css = read_string(dist.join("main.css"));
    let base = css.find("margin: 0").expect("imported sheet included");
    let title = css.find(".title_").expect("scoped class");
    assert!(base < title, "imported sheet comes first");
    assert!(css.contains("url(\"data:image/png;base64,AQID\")"));
    assert!(!css.contains("@import"));

    assert_eq!(output.assets.len(), 1);
    let big = &output.assets[0];
    assert_eq!(big.source, "client/big.png");
    assert!(css.contains(&format!("url(\"/build/{}\")", big.file.file_name)));
    assert_eq!(std::fs::read(dist.join(&big.file.file_name)).unwrap().len(), 90_000);
    assert_eq!(output.manifest.styles["main"], "main.css");
    assert_eq!(output.manifest.assets["client/big.png"], big.file.file_name);
}

#[tokio::test]
async fn progress_is_monotonic_and_events_bracket_the_build() {
    let project = login_main_project();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    Bundler::new(options(
        project.path(),
        &[("login", "client/login.js"), ("main", "client/main.js")],
    ))
    .unwrap()
    .with_progress(Arc::new(move |value| sink.lock().push(value)))
    .with_events(tx)
    .build()
    .await
    .unwrap();

    let values = seen.lock().clone();
    assert_eq!(values.first(), Some(&0.0));
    assert_eq!(values.last(), Some(&1.0));
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(BuildEvent::Started)));
    assert!(matches!(events.last(), Some(BuildEvent::Completed(output)) if output.chunks.len() == 3));
    let progress = events
        .iter()
        .filter(|event| matches!(event, BuildEvent::Progress(_)))
        .count();
    assert_eq!(progress, values.len());
}

#[tokio::test]
async fn cancelled_build_writes_nothing() {
    let project = login_main_project();
    let token = CancelToken::new();
    token.cancel();

    let result = Bundler::new(options(project.path(), &[("main", "client/main.js")]))
        .unwrap()
        .with_cancel_token(token)
        .build()
        .await;

    assert!(matches!(result, Err(BuildError::Cancelled)));
    assert!(!project.path().join("dist").exists());
}

#[tokio::test]
async fn shared_chunk_name_cannot_shadow_an_entry() {
    let project = login_main_project();
    let opts = options(project.path(), &[("manifest", "client/main.js")]);

    let error = Bundler::new(opts).unwrap_err();
    assert!(matches!(error, BuildError::InvalidConfig(_)));
}

#[tokio::test]
async fn imported_bindings_stay_live_and_grouped() {
    let project = project(&[
        (
            "main.js",
            "import Greeter, { count, inc } from './shared';\nfunction unrelated() { const count = 99; return count; }\ninc();\nconsole.log(new Greeter().hi(), count, unrelated());\n",
        ),
        (
            "shared.js",
            "export let count = 0;\nexport function inc() { count++; }\nexport default class Greeter { hi() { return 'hi'; } }\n",
        ),
    ]);
    let root = project.path();

    bale_bundler::build(options(root, &[("main", "main.js")]))
        .await
        .unwrap();

    let code = read_string(root.join("dist/main.js"));
    assert!(code.contains("new (__bale_require__.n(__bale_m0))().hi()"));
    assert!(code.contains(", __bale_m0.count, unrelated()"));
    assert!(code.contains("const count = 99; return count;"));
    assert!(!code.contains("var count ="));
}
