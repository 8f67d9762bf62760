//! Script transform: ES module syntax becomes calls into the bundle runtime.
//!
//! The output is the body of a module factory with the signature
//! `function (module, exports, __bale_require__)`. Specifiers stay as
//! written; the emitter pairs each factory with a specifier → module map.

use std::fmt::Write as _;

use bale_graph::analysis::{
    ImportBinding, Imported, ModuleStatement, ScriptAnalysis, analyze_script,
};
use bale_graph::{DependencyKind, TransformError, TransformInput, TransformOutput};

use super::TransformSettings;
use super::edits::EditList;

pub const REQUIRE: &str = "__bale_require__";
const DEFAULT_LOCAL: &str = "__bale_default__";

pub(super) fn transform(
    input: &TransformInput<'_>,
    settings: &TransformSettings,
) -> Result<TransformOutput, TransformError> {
    let source = input.text()?;
    let analysis =
        analyze_script(input.path(), source, &settings.define_keys()).map_err(|err| {
            let mut error = TransformError::new(err.message);
            error.line = err.line;
            error.column = err.column;
            error
        })?;

    let code = rewrite(source, &analysis, settings);
    Ok(TransformOutput {
        code,
        dependencies: analysis.dependencies(),
        ..TransformOutput::default()
    })
}

fn rewrite(source: &str, analysis: &ScriptAnalysis, settings: &TransformSettings) -> String {
    let mut edits = EditList::new();
    let mut header = String::new();

    if analysis.is_esm() {
        rewrite_module_syntax(analysis, &mut edits, &mut header);
    }

    for record in &analysis.imports {
        match record.kind {
            DependencyKind::Require => edits.replace(record.range, REQUIRE),
            DependencyKind::Dynamic => edits.replace(
                record.range,
                format!("{REQUIRE}.i({})", js_string(&record.specifier)),
            ),
            _ => {}
        }
    }

    for hit in &analysis.defines {
        if let Some(value) = settings.defines.get(&hit.key) {
            edits.replace(hit.range, format!("({value})"));
        }
    }

    if settings.minify {
        for comment in analysis.comments.iter().filter(|comment| !comment.legal) {
            let is_line = source[comment.range.start..].starts_with("//");
            let replacement = if is_line {
                ""
            } else if comment.multiline {
                "\n"
            } else {
                " "
            };
            edits.replace(comment.range, replacement);
        }
    }

    let body = edits.apply(source);
    if header.is_empty() {
        body
    } else {
        header + &body
    }
}

/// Local variable holding the namespace of the `record`th dependency.
fn namespace_var(record: usize) -> String {
    format!("__bale_m{record}")
}

/// Expression standing in for an imported binding.
fn binding_expr(namespace: &str, imported: &Imported) -> String {
    match imported {
        Imported::Default => format!("{REQUIRE}.n({namespace})"),
        Imported::Namespace => namespace.to_string(),
        Imported::Named(name) => member(namespace, name),
    }
}

/// Replacement for one reference to an imported binding.
///
/// Default imports go through a call, so they are parenthesized to keep
/// `new K()` and `K.x` binding the same way. JSX tag names only accept
/// identifier chains and use the accessor object built at the import.
fn reference_expr(namespace: &str, binding: &ImportBinding, jsx: bool) -> String {
    match (&binding.imported, jsx) {
        (Imported::Namespace, _) => namespace.to_string(),
        (_, true) => format!("{}.{}", jsx_accessor(namespace), binding.local),
        (Imported::Default, false) => format!("({})", binding_expr(namespace, &binding.imported)),
        (Imported::Named(_), false) => binding_expr(namespace, &binding.imported),
    }
}

fn jsx_accessor(namespace: &str) -> String {
    format!("{namespace}_jsx")
}

fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", js_string(name))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Emit `var __bale_mN = __bale_require__("spec");` and return the variable.
fn require_namespace(analysis: &ScriptAnalysis, record: usize, requires: &mut String) -> String {
    let var = namespace_var(record);
    let _ = writeln!(
        requires,
        "var {var} = {REQUIRE}({});",
        js_string(&analysis.imports[record].specifier)
    );
    var
}

fn rewrite_module_syntax(
    analysis: &ScriptAnalysis,
    edits: &mut EditList,
    header: &mut String,
) {
    // local import name → replacement expression, for export lists
    let mut import_exprs: Vec<(&str, String)> = Vec::new();
    let mut requires = String::new();
    let mut accessors = String::new();
    let mut stars = String::new();
    let mut getters: Vec<(String, String)> = Vec::new();

    for stmt in &analysis.statements {
        match stmt {
            ModuleStatement::Import {
                range,
                record,
                bindings,
            } => {
                let var = require_namespace(analysis, *record, &mut requires);
                let mut jsx_getters = Vec::new();
                for binding in bindings {
                    let expr = binding_expr(&var, &binding.imported);
                    if binding.in_jsx && binding.imported != Imported::Namespace {
                        jsx_getters.push(format!("get {}() {{ return {expr}; }}", binding.local));
                    }
                    import_exprs.push((binding.local.as_str(), expr));
                }
                if !jsx_getters.is_empty() {
                    let _ = writeln!(
                        accessors,
                        "var {} = {{ {} }};",
                        jsx_accessor(&var),
                        jsx_getters.join(", ")
                    );
                }
                edits.remove(*range);
            }
            ModuleStatement::Declaration { prefix, names } => {
                for name in names {
                    getters.push((name.clone(), name.clone()));
                }
                edits.remove(*prefix);
            }
            ModuleStatement::DefaultDeclaration {
                range,
                prefix,
                name,
            } => match name {
                Some(name) => {
                    getters.push(("default".into(), name.clone()));
                    edits.remove(*prefix);
                }
                None => {
                    getters.push(("default".into(), DEFAULT_LOCAL.into()));
                    edits.replace(*prefix, format!("var {DEFAULT_LOCAL} = "));
                    edits.insert(range.end, ";");
                }
            },
            ModuleStatement::DefaultExpression { prefix } => {
                getters.push(("default".into(), DEFAULT_LOCAL.into()));
                edits.replace(*prefix, format!("var {DEFAULT_LOCAL} = "));
            }
            ModuleStatement::List {
                range,
                names,
                record,
            } => {
                match record {
                    Some(record) => {
                        let var = require_namespace(analysis, *record, &mut requires);
                        for export in names {
                            let expr = if export.local == "default" {
                                binding_expr(&var, &Imported::Default)
                            } else {
                                member(&var, &export.local)
                            };
                            getters.push((export.exported.clone(), expr));
                        }
                    }
                    None => {
                        for export in names {
                            let expr = import_exprs
                                .iter()
                                .rev()
                                .find(|(local, _)| *local == export.local)
                                .map(|(_, expr)| expr.clone())
                                .unwrap_or_else(|| export.local.clone());
                            getters.push((export.exported.clone(), expr));
                        }
                    }
                }
                edits.remove(*range);
            }
            ModuleStatement::All {
                range,
                record,
                exported,
            } => {
                let var = require_namespace(analysis, *record, &mut requires);
                match exported {
                    Some(name) => getters.push((name.clone(), var)),
                    None => {
                        let _ = writeln!(stars, "{REQUIRE}.s(exports, {var});");
                    }
                }
                edits.remove(*range);
            }
        }
    }

    for reference in &analysis.references {
        let ModuleStatement::Import { record, bindings, .. } =
            &analysis.statements[reference.statement]
        else {
            continue;
        };
        let binding = &bindings[reference.binding];
        let expr = reference_expr(&namespace_var(*record), binding, reference.jsx);
        if reference.shorthand {
            edits.replace(reference.range, format!("{}: {expr}", binding.local));
        } else {
            edits.replace(reference.range, expr);
        }
    }

    if analysis.has_exports() {
        let _ = writeln!(header, "{REQUIRE}.r(exports);");
    }
    if !getters.is_empty() {
        let body: Vec<String> = getters
            .iter()
            .map(|(name, expr)| format!("{}: function () {{ return {expr}; }}", js_string(name)))
            .collect();
        let _ = writeln!(header, "{REQUIRE}.d(exports, {{ {} }});", body.join(", "));
    }
    header.push_str(&requires);
    header.push_str(&stars);
    header.push_str(&accessors);
}

#[cfg(test)]
mod tests {
    use crate::transforms::test_support::{run, settings};

    fn code(source: &str) -> String {
        run(&settings(), "src/test.js", source).unwrap().code
    }

    #[test]
    fn imports_become_namespace_lookups() {
        let out = code("import React, { useState as use } from 'react';\nuse(React);\n");
        assert!(out.contains("var __bale_m0 = __bale_require__(\"react\");"));
        assert!(out.contains("__bale_m0.useState((__bale_require__.n(__bale_m0)));"));
        assert!(!out.contains("import"));
    }

    #[test]
    fn exports_are_defined_as_getters() {
        let out = code("export const a = 1;\nexport function b() {}\nexport default a + 1;\n");
        assert!(out.starts_with("__bale_require__.r(exports);\n"));
        assert!(out.contains("\"a\": function () { return a; }"));
        assert!(out.contains("\"b\": function () { return b; }"));
        assert!(out.contains("\"default\": function () { return __bale_default__; }"));
        assert!(out.contains("const a = 1;"));
        assert!(out.contains("var __bale_default__ = a + 1;"));
    }

    #[test]
    fn anonymous_default_function_gets_a_binding() {
        let out = code("export default function () { return 1; }\n");
        assert!(out.contains("var __bale_default__ = function () { return 1; };"));
    }

    #[test]
    fn re_exports_forward_to_the_source_module() {
        let out = code("export { a as b, default as c } from './x';\nexport * from './y';\n");
        assert!(out.contains("\"b\": function () { return __bale_m0.a; }"));
        assert!(out.contains("\"c\": function () { return __bale_require__.n(__bale_m0); }"));
        assert!(out.contains("__bale_require__.s(exports, __bale_m1);"));
    }

    #[test]
    fn exported_imports_use_the_import_expression() {
        let out = code("import { x } from './x';\nexport { x as y };\n");
        assert!(out.contains("\"y\": function () { return __bale_m0.x; }"));
    }

    #[test]
    fn shorthand_properties_keep_their_key() {
        let out = code("import { x } from './x';\nconst o = { x };\n");
        assert!(out.contains("const o = { x: __bale_m0.x };"));
    }

    #[test]
    fn default_imports_keep_their_grouping() {
        let out = code("import K from './k';\nnew K().run();\nK.extra;\n");
        assert!(out.contains("new (__bale_require__.n(__bale_m0))().run();"));
        assert!(out.contains("(__bale_require__.n(__bale_m0)).extra;"));
    }

    #[test]
    fn inner_declarations_do_not_break_live_bindings() {
        let out = code(
            "import { count, inc } from './c';\nfunction other() { const count = 9; return count; }\ninc();\nlog(count);\n",
        );
        assert!(out.contains("const count = 9; return count;"));
        assert!(out.contains("log(__bale_m0.count);"));
        assert!(!out.contains("var count"));
    }

    #[test]
    fn jsx_tags_read_through_a_live_accessor() {
        let out = code(
            "import Button from './button';\nimport * as ui from './ui';\nconst el = <Button><ui.Icon /></Button>;\n",
        );
        assert!(out.contains(
            "var __bale_m0_jsx = { get Button() { return __bale_require__.n(__bale_m0); } };"
        ));
        assert!(out.contains("<__bale_m0_jsx.Button><__bale_m1.Icon /></__bale_m0_jsx.Button>"));
        assert!(!out.contains("var Button"));
    }

    #[test]
    fn local_require_functions_are_left_alone() {
        let output = run(
            &settings(),
            "src/a.js",
            "function load(require) { return require('x'); }\n",
        )
        .unwrap();
        assert!(output.dependencies.is_empty());
        assert!(output.code.contains("return require('x');"));
    }

    #[test]
    fn require_and_dynamic_import_use_the_runtime() {
        let out = code("const a = require('./a');\nimport('./b').then(() => a);\n");
        assert!(out.contains("const a = __bale_require__('./a');"));
        assert!(out.contains("__bale_require__.i(\"./b\").then"));
        assert!(!out.contains("__bale_require__.r(exports)"));
    }

    #[test]
    fn defines_are_substituted() {
        let out = code("if (process.env.NODE_ENV !== 'production' && __DEV__) log();\n");
        assert!(out.contains("(\"development\") !== 'production' && (true)"));
    }

    #[test]
    fn production_strips_comments_but_keeps_legal_ones() {
        let mut settings = settings();
        settings.minify = true;
        let out = run(
            &settings,
            "src/a.js",
            "/*! (c) bale */\n// note\nlet a = 1; /* inline */ let b = 2;\n",
        )
        .unwrap()
        .code;
        assert!(out.contains("/*! (c) bale */"));
        assert!(!out.contains("note"));
        assert!(!out.contains("inline"));
        assert!(out.contains("let a = 1;   let b = 2;"));
    }

    #[test]
    fn syntax_errors_carry_a_location() {
        let err = run(&settings(), "src/bad.js", "\nconst = 1;").unwrap_err();
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn dependencies_keep_source_order() {
        let output = run(
            &settings(),
            "src/a.js",
            "import './b';\nrequire('./c');\nexport * from './d';\n",
        )
        .unwrap();
        let specs: Vec<&str> = output
            .dependencies
            .iter()
            .map(|dep| dep.specifier.as_str())
            .collect();
        assert_eq!(specs, ["./b", "./c", "./d"]);
    }
}
