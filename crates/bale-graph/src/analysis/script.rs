//! Script analysis: module syntax, dependency references and compile-time
//! constants, each with the byte range a rewriter needs.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, CallExpression, Declaration, ExportDefaultDeclarationKind, Expression,
    IdentifierReference, ImportDeclarationSpecifier, ImportExpression, JSXElement,
    ModuleDeclaration, ModuleExportName, ObjectProperty, Statement,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_semantic::{Scoping, SemanticBuilder, SymbolId};
use oxc_span::{GetSpan, SourceType, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{TextRange, line_column};
use crate::module::{Dependency, DependencyKind};

/// A dependency reference in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub specifier: String,
    pub kind: DependencyKind,
    /// For `import()` the whole expression, for `require()` the callee,
    /// for declarations the whole statement.
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Imported {
    Default,
    Namespace,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub imported: Imported,
    /// Referenced from a JSX tag name, where only identifiers and member
    /// chains fit.
    pub in_jsx: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportName {
    pub local: String,
    pub exported: String,
}

/// Top-level module syntax, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStatement {
    /// `import … from "x"`
    Import {
        range: TextRange,
        record: usize,
        bindings: Vec<ImportBinding>,
    },
    /// `export const a = 1`, `export function f() {}`: `prefix` covers `export `
    Declaration {
        prefix: TextRange,
        names: Vec<String>,
    },
    /// `export default function f() {}` or `export default class {}`
    DefaultDeclaration {
        range: TextRange,
        prefix: TextRange,
        name: Option<String>,
    },
    /// `export default <expression>`
    DefaultExpression { prefix: TextRange },
    /// `export { a as b }` and `export { a } from "x"`
    List {
        range: TextRange,
        names: Vec<ExportName>,
        record: Option<usize>,
    },
    /// `export * from "x"` and `export * as ns from "x"`
    All {
        range: TextRange,
        record: usize,
        exported: Option<String>,
    },
}

/// A reference to an imported binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingReference {
    pub range: TextRange,
    /// Index into `ScriptAnalysis::statements`
    pub statement: usize,
    /// Index into that statement's bindings
    pub binding: usize,
    /// `{ name }` shorthand property; the rewrite must keep the key
    pub shorthand: bool,
    /// Part of a JSX tag name
    pub jsx: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineHit {
    pub range: TextRange,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRange {
    pub range: TextRange,
    /// `/*!`, `@license` or `@preserve` comments survive minification
    pub legal: bool,
    pub multiline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptAnalysis {
    pub imports: Vec<ImportRecord>,
    pub statements: Vec<ModuleStatement>,
    pub references: Vec<BindingReference>,
    pub defines: Vec<DefineHit>,
    pub comments: Vec<CommentRange>,
}

impl ScriptAnalysis {
    /// True when the module uses `import`/`export` syntax.
    pub fn is_esm(&self) -> bool {
        !self.statements.is_empty()
    }

    pub fn has_exports(&self) -> bool {
        self.statements
            .iter()
            .any(|stmt| !matches!(stmt, ModuleStatement::Import { .. }))
    }

    /// Dependency references in source order.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut records: Vec<&ImportRecord> = self.imports.iter().collect();
        records.sort_by_key(|record| record.range.start);
        records
            .into_iter()
            .map(|record| Dependency::new(record.specifier.clone(), record.kind))
            .collect()
    }
}

/// Syntax error reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptParseError {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Parse `source` and collect everything a rewriter needs.
///
/// `define_keys` are expressions such as `process.env.NODE_ENV` or
/// `__DEV__`; every occurrence in expression position is reported.
pub fn analyze_script(
    path: &Path,
    source: &str,
    define_keys: &[&str],
) -> Result<ScriptAnalysis, ScriptParseError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(path)).parse();

    if let Some(error) = ret.errors.first() {
        let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset());
        let (line, column) = match offset {
            Some(offset) => {
                let (line, column) = line_column(source, offset);
                (Some(line), Some(column))
            }
            None => (None, None),
        };
        return Err(ScriptParseError {
            message: error.to_string(),
            line,
            column,
        });
    }

    let program = &ret.program;
    let semantic = SemanticBuilder::new().build(program).semantic;
    let mut collector = Collector::new(source, define_keys, semantic.scoping());

    // Imports are hoisted, so bindings are known before any reference.
    for stmt in program.body.iter() {
        if let Some(ModuleDeclaration::ImportDeclaration(import)) = stmt.as_module_declaration() {
            collector.add_import(import.span, &import.source.value, import.specifiers.as_ref());
        }
    }

    for stmt in program.body.iter() {
        collector.visit_top_level(stmt);
    }

    collector.comments = program
        .comments
        .iter()
        .filter_map(|comment| comment_range(source, comment.span))
        .collect();

    Ok(collector.finish())
}

fn source_type_for(path: &Path) -> SourceType {
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("js") | Some("mjs") => source_type.with_jsx(true),
        _ => source_type,
    }
}

/// Normalize a comment span to include its delimiters.
fn comment_range(source: &str, span: Span) -> Option<CommentRange> {
    let mut start = span.start as usize;
    let mut end = span.end as usize;
    if end > source.len() || start > end {
        return None;
    }

    let text = &source[start..end];
    if !text.starts_with("//") && !text.starts_with("/*") {
        if source[..start].ends_with("//") {
            start -= 2;
        } else if source[..start].ends_with("/*") {
            start -= 2;
            if source[end..].starts_with("*/") {
                end += 2;
            }
        } else {
            return None;
        }
    }

    let text = &source[start..end];
    Some(CommentRange {
        range: TextRange::new(start, end),
        legal: text.starts_with("/*!") || text.contains("@license") || text.contains("@preserve"),
        multiline: text.contains('\n'),
    })
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn range(span: Span) -> TextRange {
    TextRange::new(span.start as usize, span.end as usize)
}

/// Collects the names bound by a declaration pattern.
#[derive(Default)]
struct BoundNames(Vec<String>);

impl<'a> Visit<'a> for BoundNames {
    fn visit_binding_identifier(&mut self, it: &oxc_ast::ast::BindingIdentifier<'a>) {
        self.0.push(it.name.to_string());
    }

    // Default values are expressions, not bindings of the declaration.
    fn visit_expression(&mut self, _it: &Expression<'a>) {}
}

fn bound_names(pattern: &BindingPattern) -> Vec<String> {
    let mut names = BoundNames::default();
    names.visit_binding_pattern(pattern);
    names.0
}

fn declaration_names(decl: &Declaration) -> Vec<String> {
    match decl {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .flat_map(|declarator| bound_names(&declarator.id))
            .collect(),
        Declaration::FunctionDeclaration(func) => {
            func.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(class) => {
            class.id.iter().map(|id| id.name.to_string()).collect()
        }
        _ => Vec::new(),
    }
}

struct Collector<'s> {
    source: &'s str,
    scoping: &'s Scoping,
    define_keys: FxHashSet<String>,
    imports: Vec<ImportRecord>,
    statements: Vec<ModuleStatement>,
    references: Vec<BindingReference>,
    defines: Vec<DefineHit>,
    comments: Vec<CommentRange>,
    /// import symbol → (statement, binding)
    import_symbols: FxHashMap<SymbolId, (usize, usize)>,
    jsx_bindings: FxHashSet<(usize, usize)>,
    in_jsx_name: usize,
}

impl<'s> Collector<'s> {
    fn new(source: &'s str, define_keys: &[&str], scoping: &'s Scoping) -> Self {
        Self {
            source,
            scoping,
            define_keys: define_keys.iter().map(|key| compact(key)).collect(),
            imports: Vec::new(),
            statements: Vec::new(),
            references: Vec::new(),
            defines: Vec::new(),
            comments: Vec::new(),
            import_symbols: FxHashMap::default(),
            jsx_bindings: FxHashSet::default(),
            in_jsx_name: 0,
        }
    }

    fn add_record(&mut self, specifier: &str, kind: DependencyKind, span: Span) -> usize {
        self.imports.push(ImportRecord {
            specifier: specifier.to_string(),
            kind,
            range: range(span),
        });
        self.imports.len() - 1
    }

    fn add_import<'a>(
        &mut self,
        span: Span,
        specifier: &str,
        specifiers: Option<&oxc_allocator::Vec<'a, ImportDeclarationSpecifier<'a>>>,
    ) {
        let record = self.add_record(specifier, DependencyKind::Static, span);
        let statement = self.statements.len();

        let mut bindings = Vec::new();
        for spec in specifiers.into_iter().flat_map(|specs| specs.iter()) {
            let (local, imported) = match spec {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                    (&default.local, Imported::Default)
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(ns) => {
                    (&ns.local, Imported::Namespace)
                }
                ImportDeclarationSpecifier::ImportSpecifier(named) => {
                    let imported = export_name(&named.imported);
                    let imported = if imported == "default" {
                        Imported::Default
                    } else {
                        Imported::Named(imported)
                    };
                    (&named.local, imported)
                }
            };
            if let Some(symbol) = local.symbol_id.get() {
                self.import_symbols
                    .insert(symbol, (statement, bindings.len()));
            }
            bindings.push(ImportBinding {
                local: local.name.to_string(),
                imported,
                in_jsx: false,
            });
        }

        self.statements.push(ModuleStatement::Import {
            range: range(span),
            record,
            bindings,
        });
    }

    fn visit_top_level<'a>(&mut self, stmt: &Statement<'a>) {
        let Some(decl) = stmt.as_module_declaration() else {
            self.visit_statement(stmt);
            return;
        };

        match decl {
            // Recorded up front.
            ModuleDeclaration::ImportDeclaration(_) => {}
            ModuleDeclaration::ExportNamedDeclaration(named) => {
                if let Some(declaration) = &named.declaration {
                    let prefix = TextRange::new(
                        named.span.start as usize,
                        declaration.span().start as usize,
                    );
                    self.statements.push(ModuleStatement::Declaration {
                        prefix,
                        names: declaration_names(declaration),
                    });
                    self.visit_declaration(declaration);
                    return;
                }

                let record = named.source.as_ref().map(|source| {
                    self.add_record(&source.value, DependencyKind::Static, named.span)
                });
                let names = named
                    .specifiers
                    .iter()
                    .map(|spec| ExportName {
                        local: export_name(&spec.local),
                        exported: export_name(&spec.exported),
                    })
                    .collect();
                self.statements.push(ModuleStatement::List {
                    range: range(named.span),
                    names,
                    record,
                });
            }
            ModuleDeclaration::ExportDefaultDeclaration(default) => {
                let start = default.span.start as usize;
                match &default.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        self.statements.push(ModuleStatement::DefaultDeclaration {
                            range: range(default.span),
                            prefix: TextRange::new(start, func.span.start as usize),
                            name: func.id.as_ref().map(|id| id.name.to_string()),
                        });
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        self.statements.push(ModuleStatement::DefaultDeclaration {
                            range: range(default.span),
                            prefix: TextRange::new(start, class.span.start as usize),
                            name: class.id.as_ref().map(|id| id.name.to_string()),
                        });
                    }
                    kind => {
                        let Some(expr) = kind.as_expression() else {
                            return;
                        };
                        self.statements.push(ModuleStatement::DefaultExpression {
                            prefix: TextRange::new(start, expr.span().start as usize),
                        });
                    }
                }
                self.visit_export_default_declaration_kind(&default.declaration);
            }
            ModuleDeclaration::ExportAllDeclaration(all) => {
                let record = self.add_record(&all.source.value, DependencyKind::Static, all.span);
                self.statements.push(ModuleStatement::All {
                    range: range(all.span),
                    record,
                    exported: all.exported.as_ref().map(export_name),
                });
            }
            _ => {}
        }
    }

    /// The symbol `ident` resolves to, `None` for globals.
    fn symbol_of(&self, ident: &IdentifierReference) -> Option<SymbolId> {
        let reference = ident.reference_id.get()?;
        self.scoping.get_reference(reference).symbol_id()
    }

    fn is_global(&self, ident: &IdentifierReference) -> bool {
        self.symbol_of(ident).is_none()
    }

    fn reference(&mut self, ident: &IdentifierReference, shorthand: bool) -> bool {
        let Some(&(statement, binding)) = self
            .symbol_of(ident)
            .and_then(|symbol| self.import_symbols.get(&symbol))
        else {
            return false;
        };
        let jsx = self.in_jsx_name > 0;
        if jsx {
            self.jsx_bindings.insert((statement, binding));
        }
        self.references.push(BindingReference {
            range: range(ident.span),
            statement,
            binding,
            shorthand,
            jsx,
        });
        true
    }

    fn finish(mut self) -> ScriptAnalysis {
        for (index, stmt) in self.statements.iter_mut().enumerate() {
            if let ModuleStatement::Import { bindings, .. } = stmt {
                for (slot, binding) in bindings.iter_mut().enumerate() {
                    binding.in_jsx = self.jsx_bindings.contains(&(index, slot));
                }
            }
        }

        ScriptAnalysis {
            imports: self.imports,
            statements: self.statements,
            references: self.references,
            defines: self.defines,
            comments: self.comments,
        }
    }
}

/// Expression text with whitespace removed, for matching define keys.
fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

impl<'a> Visit<'a> for Collector<'_> {
    fn visit_expression(&mut self, it: &Expression<'a>) {
        let candidate = match it {
            Expression::Identifier(ident) => self.is_global(ident),
            Expression::StaticMemberExpression(_) => true,
            _ => false,
        };
        if candidate && !self.define_keys.is_empty() {
            let span = it.span();
            let key = compact(&self.source[span.start as usize..span.end as usize]);
            if self.define_keys.contains(&key) {
                self.defines.push(DefineHit {
                    range: range(span),
                    key,
                });
                return;
            }
        }
        walk::walk_expression(self, it);
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        self.reference(it, false);
    }

    fn visit_object_property(&mut self, it: &ObjectProperty<'a>) {
        if it.shorthand {
            if let Expression::Identifier(ident) = &it.value {
                if self.reference(ident, true) {
                    return;
                }
            }
        }
        walk::walk_object_property(self, it);
    }

    // The closing tag must repeat the opening tag's rewrite exactly, so it is
    // mirrored rather than resolved on its own.
    fn visit_jsx_element(&mut self, it: &JSXElement<'a>) {
        let opening = &it.opening_element;
        let first = self.references.len();
        self.in_jsx_name += 1;
        self.visit_jsx_element_name(&opening.name);
        self.in_jsx_name -= 1;
        let name_refs = first..self.references.len();

        for attribute in opening.attributes.iter() {
            self.visit_jsx_attribute_item(attribute);
        }
        for child in it.children.iter() {
            self.visit_jsx_child(child);
        }

        if let Some(closing) = &it.closing_element {
            let from = opening.name.span().start as usize;
            let to = closing.name.span().start as usize;
            let mirrored: Vec<BindingReference> = self.references[name_refs]
                .iter()
                .map(|reference| BindingReference {
                    range: TextRange::new(
                        reference.range.start - from + to,
                        reference.range.end - from + to,
                    ),
                    ..reference.clone()
                })
                .collect();
            self.references.extend(mirrored);
        }
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if let Expression::StringLiteral(lit) = &it.source {
            self.add_record(&lit.value, DependencyKind::Dynamic, it.span);
            return;
        }
        walk::walk_import_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &it.callee {
            if callee.name == "require" && it.arguments.len() == 1 && self.is_global(callee) {
                if let Some(Expression::StringLiteral(lit)) = it.arguments[0].as_expression() {
                    self.add_record(&lit.value, DependencyKind::Require, callee.span);
                    return;
                }
            }
        }
        walk::walk_call_expression(self, it);
    }
}
