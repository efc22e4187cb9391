// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module rewriter.
//!
//! [`Compiler`] turns one ES module into a plain function body that talks to
//! its loader through five capability parameters:
//!
//! ```text
//! (function (__VIRTUAL_IMPORT__, __VIRTUAL_EXPORT__, __VIRTUAL_NAMESPACE__,
//!            __VIRTUAL_IMPORT_META__, __VIRTUAL_DYNAMIC_IMPORT__) {
//!   "use strict";
//!   __VIRTUAL_EXPORT__({ answer: () => answer });
//!   const __m0__ = __VIRTUAL_IMPORT__("./dep.js");
//!   const answer = __m0__.base + 1;
//! });
//! ```
//!
//! Imports become module handles, every read of an imported binding becomes
//! a property read on its handle (so bindings stay live), and exports are
//! installed up front as accessors.

mod builder;


use crate::collector::collect;
use crate::error::{CompileError, Result};
use crate::patch::{Patch, PatchQueue, Stage};
use crate::predicates::binding_identifiers;
use crate::scope::{BindingKind, ScopeTree};
use rustc_hash::{FxHashMap, FxHashSet};
use spacey_syntax::{Ast, NodeId, NodeKind, SourceMap, generate, parse_module};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Parameter through which a module imports another module synchronously.
pub const VIRTUAL_IMPORT: &str = "__VIRTUAL_IMPORT__";
/// Parameter that installs the module's export accessors.
pub const VIRTUAL_EXPORT: &str = "__VIRTUAL_EXPORT__";
/// Parameter that wraps a module handle into its namespace object.
pub const VIRTUAL_NAMESPACE: &str = "__VIRTUAL_NAMESPACE__";
/// Parameter holding the `import.meta` object under `meta`.
pub const VIRTUAL_IMPORT_META: &str = "__VIRTUAL_IMPORT_META__";
/// Parameter implementing `import()`.
pub const VIRTUAL_DYNAMIC_IMPORT: &str = "__VIRTUAL_DYNAMIC_IMPORT__";
/// Local holding an anonymous default export.
pub const VIRTUAL_DEFAULT: &str = "__VIRTUAL_DEFAULT__";

/// Capability parameter names, in the order the wrapper declares them.
pub const CAPABILITIES: [&str; 5] = [
    VIRTUAL_IMPORT,
    VIRTUAL_EXPORT,
    VIRTUAL_NAMESPACE,
    VIRTUAL_IMPORT_META,
    VIRTUAL_DYNAMIC_IMPORT,
];

/// Export name reserved for the default export.
pub const DEFAULT_EXPORT: &str = "default";

/// Input of one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    /// Module source text
    pub code: String,
    /// Canonical id of the module, used to resolve its imports
    pub store_id: String,
    /// Name used in diagnostics and the source map
    pub filename: String,
}

/// One name pulled from another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// Export name in the target module (`default` for default imports,
    /// `*` for namespace imports)
    pub imported: String,
    /// Local name, or the exported name for re-exports
    pub local: String,
    /// `import d from`
    pub is_default: bool,
    /// `import * as ns from` / `export * as ns from`
    pub is_namespace: bool,
}

impl ImportedName {
    /// The export name this import requires the target to have.
    pub fn required_export(&self) -> Option<&str> {
        if self.is_namespace {
            None
        } else {
            Some(&self.imported)
        }
    }
}

/// A static dependency of the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// Module specifier as written
    pub module_id: String,
    /// Generated handle local shared by every statement naming `module_id`
    pub handle: String,
    /// Declared by an `export ... from` statement
    pub is_export: bool,
    /// Imported names, empty for side-effect imports and `export *`
    pub names: Vec<ImportedName>,
}

/// Answers which names a dependency exports.
///
/// `module_id` is a specifier as written in the importing module; resolving
/// it is up to the implementation. `None` means the exports are not known
/// (yet), which disables name validation for that dependency.
pub trait ExportLookup {
    /// Export names of the module `module_id` refers to.
    fn exports_of(&self, module_id: &str) -> Option<Vec<String>>;
}

impl ExportLookup for HashMap<String, Vec<String>> {
    fn exports_of(&self, module_id: &str) -> Option<Vec<String>> {
        self.get(module_id).cloned()
    }
}

/// An [`ExportLookup`] that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExports;

impl ExportLookup for NoExports {
    fn exports_of(&self, _module_id: &str) -> Option<Vec<String>> {
        None
    }
}

/// Result of code generation.
#[derive(Debug, Clone)]
pub struct Output {
    /// Wrapped module code
    pub code: String,
    /// Source map from `code` back to the module source
    pub map: SourceMap,
    /// Final export names, including names gathered by `export *`
    pub exports: Vec<String>,
}

/// A parsed module with its scope model, ready to be transformed.
#[derive(Debug)]
pub struct Compiler {
    options: CompilerOptions,
    ast: Ast,
    scopes: ScopeTree,
}

impl Compiler {
    /// Parses the module and builds its scopes.
    pub fn new(options: CompilerOptions) -> Result<Self> {
        let ast = parse_module(&options.code, &options.filename)?;
        let scopes = collect(&ast, &options.filename)?;
        Ok(Self {
            options,
            ast,
            scopes,
        })
    }

    /// Compiler input.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// The scope model of the module.
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Records imports and exports and queues every rewrite.
    ///
    /// Consumes the compiler; the tree is only edited later, by
    /// [`Transformed::generate_code`].
    pub fn transform(self) -> Transformed {
        let Compiler {
            options,
            mut ast,
            scopes,
        } = self;

        let mut rewriter = Rewriter {
            ast: &mut ast,
            scopes: &scopes,
            imports: Vec::new(),
            handles: Vec::new(),
            targets: FxHashMap::default(),
            exports: Vec::new(),
            export_alls: Vec::new(),
            declared: Vec::new(),
            checks: Vec::new(),
            patches: PatchQueue::new(),
        };
        rewriter.run(&options.filename);

        let Rewriter {
            imports,
            handles,
            exports,
            export_alls,
            declared,
            checks,
            patches,
            ..
        } = rewriter;

        debug!(
            store_id = %options.store_id,
            imports = imports.len(),
            exports = declared.len(),
            patches = patches.len(),
            "transformed module"
        );

        Transformed {
            options,
            ast,
            imports,
            handles,
            exports,
            export_alls,
            declared,
            checks,
            patches,
        }
    }
}

/// A rewritten import target: either a property of a module handle or the
/// handle's namespace.
#[derive(Debug, Clone)]
enum Target {
    Property { handle: String, name: String },
    Namespace { handle: String },
}

impl Target {
    fn kind(&self, ast: &mut Ast) -> NodeKind {
        match self {
            Target::Property { handle, name } => builder::member_kind(ast, handle, name),
            Target::Namespace { handle } => {
                let handle = builder::ident(ast, handle);
                builder::call_kind(ast, VIRTUAL_NAMESPACE, vec![handle])
            }
        }
    }

    fn node(&self, ast: &mut Ast) -> NodeId {
        let kind = self.kind(ast);
        ast.synth(kind)
    }
}

/// `export * from` waiting for the target's export list.
#[derive(Debug, Clone)]
struct ExportAll {
    module_id: String,
    handle: String,
    namespace: Option<String>,
}

struct Rewriter<'a> {
    ast: &'a mut Ast,
    scopes: &'a ScopeTree,
    imports: Vec<ImportInfo>,
    /// (module id, handle) in first-use order
    handles: Vec<(String, String)>,
    /// Import specifier node to the expression replacing its local
    targets: FxHashMap<NodeId, Target>,
    /// Explicit exports: name and value expression
    exports: Vec<(String, NodeId)>,
    export_alls: Vec<ExportAll>,
    declared: Vec<String>,
    /// Indices into `imports` whose names must be validated
    checks: Vec<usize>,
    patches: PatchQueue,
}

impl<'a> Rewriter<'a> {
    fn run(&mut self, filename: &str) {
        let body = self.ast.program_body().to_vec();

        // Handles are numbered in source order, across imports and re-exports
        for stmt in &body {
            if let Some(source) = statement_source(self.ast.kind(*stmt)) {
                self.handle(&source);
            }
        }
        for stmt in &body {
            if matches!(self.ast.kind(*stmt), NodeKind::ImportDeclaration { .. }) {
                self.import_declaration(*stmt);
            }
        }
        for stmt in &body {
            match self.ast.kind(*stmt) {
                NodeKind::ExportNamedDeclaration {
                    declaration: Some(declaration),
                    ..
                } => self.export_declaration(*stmt, *declaration),
                NodeKind::ExportNamedDeclaration {
                    source: Some(_), ..
                } => self.export_from(*stmt),
                NodeKind::ExportNamedDeclaration { .. } => self.export_list(*stmt),
                NodeKind::ExportDefaultDeclaration { declaration } => {
                    self.export_default(*stmt, *declaration)
                }
                NodeKind::ExportAllDeclaration { .. } => self.export_all(*stmt),
                _ => {}
            }
        }
        self.rewrite_references();
        self.rewrite_meta_and_dynamic_imports();
        self.dedupe_exports(filename);
    }

    /// Returns the handle for `module_id`, allocating `__mN__` on first use.
    fn handle(&mut self, module_id: &str) -> String {
        if let Some((_, handle)) = self.handles.iter().find(|(id, _)| id == module_id) {
            return handle.clone();
        }
        let handle = format!("__m{}__", self.handles.len());
        self.handles.push((module_id.to_string(), handle.clone()));
        handle
    }

    fn declare_export(&mut self, name: &str, value: NodeId) {
        self.declared.push(name.to_string());
        self.exports.push((name.to_string(), value));
    }

    // import d, { a as b } from "m";
    // import * as ns from "m";
    fn import_declaration(&mut self, stmt: NodeId) {
        let NodeKind::ImportDeclaration { specifiers, source } = self.ast.kind(stmt).clone() else {
            return;
        };
        let handle = self.handle(&source);
        let mut names = Vec::new();

        for specifier in specifiers {
            let (imported, local, is_default, is_namespace) = match self.ast.kind(specifier) {
                NodeKind::ImportSpecifier { imported, local } => (imported.clone(), *local, false, false),
                NodeKind::ImportDefaultSpecifier { local } => {
                    (DEFAULT_EXPORT.to_string(), *local, true, false)
                }
                NodeKind::ImportNamespaceSpecifier { local } => ("*".to_string(), *local, false, true),
                _ => continue,
            };
            let target = if is_namespace {
                Target::Namespace {
                    handle: handle.clone(),
                }
            } else {
                Target::Property {
                    handle: handle.clone(),
                    name: imported.clone(),
                }
            };
            self.targets.insert(specifier, target);
            names.push(ImportedName {
                imported,
                local: self.ast.identifier_name(local).unwrap_or_default().to_string(),
                is_default,
                is_namespace,
            });
        }

        self.checks.push(self.imports.len());
        self.imports.push(ImportInfo {
            module_id: source,
            handle,
            is_export: false,
            names,
        });
        self.patches.push(Stage::Removal, Patch::Remove { target: stmt });
    }

    // export const a = 1;
    // export function f() {}
    fn export_declaration(&mut self, stmt: NodeId, declaration: NodeId) {
        for name in binding_identifiers(self.ast, declaration) {
            let Some(text) = self.ast.identifier_name(name).map(str::to_string) else {
                continue;
            };
            let value = builder::ident(self.ast, &text);
            self.declare_export(&text, value);
        }
        self.patches.push(
            Stage::Declaration,
            Patch::Unwrap {
                target: stmt,
                inner: declaration,
            },
        );
    }

    // export default 1;
    // export default function f() {}
    fn export_default(&mut self, stmt: NodeId, declaration: NodeId) {
        let named = match self.ast.kind(declaration) {
            NodeKind::FunctionDeclaration(function) => Some(function.id),
            NodeKind::ClassDeclaration(class) => Some(class.id),
            _ => None,
        };

        if let Some(Some(name)) = named {
            // Keep the declaration itself so it still hoists
            let text = self.ast.identifier_name(name).unwrap_or_default().to_string();
            let value = builder::ident(self.ast, &text);
            self.declare_export(DEFAULT_EXPORT, value);
            self.patches.push(
                Stage::Declaration,
                Patch::Unwrap {
                    target: stmt,
                    inner: declaration,
                },
            );
            return;
        }

        let value = builder::ident(self.ast, VIRTUAL_DEFAULT);
        self.declare_export(DEFAULT_EXPORT, value);
        if named.is_some() {
            self.patches.push(
                Stage::Declaration,
                Patch::IntoExpression {
                    target: declaration,
                },
            );
        }
        let local = builder::const_declaration(self.ast, VIRTUAL_DEFAULT, declaration);
        self.patches.push(
            Stage::Declaration,
            Patch::Replace {
                target: stmt,
                with: local,
            },
        );
    }

    // export { a, b as c };
    fn export_list(&mut self, stmt: NodeId) {
        let NodeKind::ExportNamedDeclaration { specifiers, .. } = self.ast.kind(stmt).clone() else {
            return;
        };
        let scopes = self.scopes;
        let root = scopes.get(scopes.root());

        for specifier in specifiers {
            let NodeKind::ExportSpecifier { local, exported } = self.ast.kind(specifier).clone() else {
                continue;
            };
            let Some(name) = self.ast.identifier_name(local).map(str::to_string) else {
                continue;
            };
            let target = root
                .binding(&name)
                .filter(|binding| binding.kind == BindingKind::Module)
                .and_then(|binding| self.targets.get(&binding.node))
                .cloned();
            let value = match target {
                Some(target) => target.node(self.ast),
                None => builder::ident(self.ast, &name),
            };
            self.declare_export(&exported, value);
        }
        self.patches.push(Stage::Removal, Patch::Remove { target: stmt });
    }

    // export { a, default as b } from "m";
    fn export_from(&mut self, stmt: NodeId) {
        let NodeKind::ExportNamedDeclaration {
            specifiers,
            source: Some(source),
            ..
        } = self.ast.kind(stmt).clone()
        else {
            return;
        };
        let handle = self.handle(&source);
        let mut names = Vec::new();

        for specifier in specifiers {
            let NodeKind::ExportSpecifier { local, exported } = self.ast.kind(specifier).clone() else {
                continue;
            };
            let Some(imported) = self.ast.identifier_name(local).map(str::to_string) else {
                continue;
            };
            let value = Target::Property {
                handle: handle.clone(),
                name: imported.clone(),
            }
            .node(self.ast);
            self.declare_export(&exported, value);
            names.push(ImportedName {
                imported,
                local: exported,
                is_default: false,
                is_namespace: false,
            });
        }

        self.checks.push(self.imports.len());
        self.imports.push(ImportInfo {
            module_id: source,
            handle,
            is_export: true,
            names,
        });
        self.patches.push(Stage::Removal, Patch::Remove { target: stmt });
    }

    // export * from "m";
    // export * as ns from "m";
    fn export_all(&mut self, stmt: NodeId) {
        let NodeKind::ExportAllDeclaration { exported, source } = self.ast.kind(stmt).clone() else {
            return;
        };
        let handle = self.handle(&source);
        let names = exported
            .iter()
            .map(|alias| ImportedName {
                imported: "*".to_string(),
                local: alias.clone(),
                is_default: false,
                is_namespace: true,
            })
            .collect();
        if let Some(alias) = &exported {
            self.declared.push(alias.clone());
        }

        self.imports.push(ImportInfo {
            module_id: source.clone(),
            handle: handle.clone(),
            is_export: true,
            names,
        });
        self.export_alls.push(ExportAll {
            module_id: source,
            handle,
            namespace: exported,
        });
        self.patches.push(Stage::Removal, Patch::Remove { target: stmt });
    }

    /// Points every read and write of an imported binding at its handle.
    fn rewrite_references(&mut self) {
        let scopes = self.scopes;
        let root = scopes.get(scopes.root());
        let mut bound: Vec<(NodeId, Target)> = Vec::new();
        for info in &self.imports {
            if info.is_export {
                continue;
            }
            for name in &info.names {
                let Some(binding) = root.binding(&name.local) else {
                    continue;
                };
                if binding.kind != BindingKind::Module {
                    continue;
                }
                let Some(target) = self.targets.get(&binding.node) else {
                    continue;
                };
                let mut seen = FxHashSet::default();
                for node in binding.references.iter().chain(&binding.mutations) {
                    if seen.insert(*node) {
                        bound.push((*node, target.clone()));
                    }
                }
            }
        }

        for (node, target) in bound {
            let with = target.kind(self.ast);
            self.patches.push(Stage::Identifier, Patch::Replace { target: node, with });
        }
    }

    /// `import.meta` and `import()` go through their capabilities.
    fn rewrite_meta_and_dynamic_imports(&mut self) {
        let mut found = Vec::new();
        self.ast.walk(self.ast.root(), |id| match self.ast.kind(id) {
            NodeKind::ImportExpression { source } => found.push((id, Some(*source))),
            NodeKind::MetaProperty { meta, .. } if meta == "import" => found.push((id, None)),
            _ => {}
        });

        for (id, source) in found {
            let with = match source {
                Some(source) => builder::call_kind(self.ast, VIRTUAL_DYNAMIC_IMPORT, vec![source]),
                None => builder::member_kind(self.ast, VIRTUAL_IMPORT_META, "meta"),
            };
            self.patches.push(Stage::Identifier, Patch::Replace { target: id, with });
        }
    }

    fn dedupe_exports(&mut self, filename: &str) {
        let mut seen = FxHashSet::default();
        self.exports.retain(|(name, _)| {
            let first = seen.insert(name.clone());
            if !first {
                warn!(filename, name = %name, "duplicate export ignored");
            }
            first
        });
        let mut seen = FxHashSet::default();
        self.declared.retain(|name| seen.insert(name.clone()));
    }
}

fn statement_source(kind: &NodeKind) -> Option<String> {
    match kind {
        NodeKind::ImportDeclaration { source, .. }
        | NodeKind::ExportAllDeclaration { source, .. }
        | NodeKind::ExportNamedDeclaration {
            source: Some(source),
            ..
        } => Some(source.clone()),
        _ => None,
    }
}

/// A transformed module awaiting code generation.
#[derive(Debug)]
pub struct Transformed {
    options: CompilerOptions,
    ast: Ast,
    imports: Vec<ImportInfo>,
    handles: Vec<(String, String)>,
    exports: Vec<(String, NodeId)>,
    export_alls: Vec<ExportAll>,
    declared: Vec<String>,
    checks: Vec<usize>,
    patches: PatchQueue,
}

impl Transformed {
    /// Static dependencies, one entry per import or re-export statement.
    pub fn imports(&self) -> &[ImportInfo] {
        &self.imports
    }

    /// Distinct module specifiers this module depends on, in source order.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|(module_id, _)| module_id.as_str())
    }

    /// Export names declared by the module itself.
    ///
    /// Names gathered through `export * from` are only known once the
    /// targets are compiled; see [`Output::exports`].
    pub fn exports(&self) -> &[String] {
        &self.declared
    }

    /// Compiler input.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Validates imports, applies the queued rewrites, resolves `export *`
    /// and prints the wrapped module.
    pub fn generate_code(self, lookup: &dyn ExportLookup) -> Result<Output> {
        let Transformed {
            options,
            mut ast,
            imports,
            handles,
            mut exports,
            export_alls,
            checks,
            patches,
            ..
        } = self;

        for index in checks {
            let info = &imports[index];
            let Some(available) = lookup.exports_of(&info.module_id) else {
                continue;
            };
            for name in &info.names {
                let Some(required) = name.required_export() else {
                    continue;
                };
                if !available.iter().any(|export| export == required) {
                    return Err(CompileError::MissingExport {
                        importer: options.filename.clone(),
                        target: info.module_id.clone(),
                        name: required.to_string(),
                    });
                }
            }
        }

        patches.apply(&mut ast);

        for (name, entry) in resolve_export_alls(&export_alls, &exports, lookup) {
            let target = match entry.namespace {
                Some(_) => Target::Namespace {
                    handle: entry.handle.clone(),
                },
                None => Target::Property {
                    handle: entry.handle.clone(),
                    name: name.clone(),
                },
            };
            let value = target.node(&mut ast);
            exports.push((name, value));
        }

        let install = {
            let table = builder::thunk_object(&mut ast, &exports);
            builder::call_statement(&mut ast, VIRTUAL_EXPORT, vec![table])
        };
        let mut body = vec![install];
        for (module_id, handle) in &handles {
            let specifier = builder::string(&mut ast, module_id);
            let import = builder::call_kind(&mut ast, VIRTUAL_IMPORT, vec![specifier]);
            let import = ast.synth(import);
            let init = builder::const_declaration(&mut ast, handle, import);
            body.push(ast.synth(init));
        }
        body.extend_from_slice(ast.program_body());

        let wrapper = builder::strict_wrapper(&mut ast, &CAPABILITIES, body);
        let span = ast.span(ast.root());
        ast.set_program(vec![wrapper], span);

        let generated = generate(&ast, &options.code, &options.filename);
        Ok(Output {
            code: generated.code,
            map: generated.map,
            exports: exports.into_iter().map(|(name, _)| name).collect(),
        })
    }
}

/// Names each `export *` contributes: the target's exports except `default`
/// (or the alias alone for `export * as ns`, which may be `default`), minus
/// names that more than one entry provides, minus names exported explicitly.
fn resolve_export_alls<'e>(
    entries: &'e [ExportAll],
    explicit: &[(String, NodeId)],
    lookup: &dyn ExportLookup,
) -> Vec<(String, &'e ExportAll)> {
    let candidates: Vec<(&ExportAll, Vec<String>)> = entries
        .iter()
        .map(|entry| {
            let names = match &entry.namespace {
                Some(alias) => vec![alias.clone()],
                None => lookup
                    .exports_of(&entry.module_id)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|name| name != DEFAULT_EXPORT)
                    .collect(),
            };
            (entry, names)
        })
        .collect();

    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for (_, names) in &candidates {
        for name in names {
            *counts.entry(name.as_str()).or_default() += 1;
        }
    }

    let mut out = Vec::new();
    for (entry, names) in &candidates {
        for name in names {
            let keep = counts.get(name.as_str()) == Some(&1)
                && !explicit.iter().any(|(explicit, _)| explicit == name);
            if keep {
                out.push((name.clone(), *entry));
            }
        }
    }
    out
}
