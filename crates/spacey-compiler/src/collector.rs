// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope builder.
//!
//! One depth-first walk over the tree creates the scopes and registers
//! every declaration. Reads and writes of identifiers are queued during the
//! walk and resolved afterwards, once every declaration (including hoisted
//! functions and imports below the use site) is known.

use crate::error::{CompileError, Result};
use crate::predicates::{VirtualType, binding_identifiers, is_referenced, is_scope, virtual_types};
use crate::scope::{BindingKind, ScopeId, ScopeKind, ScopeTree};
use spacey_syntax::ast::{UnaryOperator, VariableKind};
use spacey_syntax::{Ast, NodeId, NodeKind};

/// Builds the scope tree of `ast`.
pub fn collect(ast: &Ast, filename: &str) -> Result<ScopeTree> {
    let mut collector = Collector {
        ast,
        filename,
        tree: ScopeTree::new(ast.root()),
        ancestors: Vec::new(),
        scopes: Vec::new(),
        param_scopes: Vec::new(),
        deferred: Vec::new(),
    };
    collector.visit(ast.root())?;
    Ok(collector.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// A use site waiting for name resolution.
struct Deferred {
    node: NodeId,
    scope: ScopeId,
    access: Access,
    param_scopes: Vec<ScopeId>,
}

struct Collector<'a> {
    ast: &'a Ast,
    filename: &'a str,
    tree: ScopeTree,
    ancestors: Vec<NodeId>,
    scopes: Vec<ScopeId>,
    /// Functions whose parameter list contains the current node
    param_scopes: Vec<ScopeId>,
    deferred: Vec<Deferred>,
}

impl<'a> Collector<'a> {
    fn current(&self) -> ScopeId {
        self.scopes.last().copied().unwrap_or(self.tree.root())
    }

    fn visit(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        let parent = self.ancestors.last().copied();
        self.ancestors.push(id);

        let entered = if id == ast.root() {
            self.scopes.push(self.tree.root());
            true
        } else if is_scope(ast, id, parent) {
            let kind = scope_kind(ast.kind(id));
            let scope = self.tree.push(id, kind, Some(self.current()));
            self.scopes.push(scope);
            true
        } else {
            false
        };

        self.enter(id, parent)?;

        match ast.kind(id) {
            NodeKind::FunctionDeclaration(function) | NodeKind::FunctionExpression(function) => {
                if let Some(name) = function.id {
                    self.visit(name)?;
                }
                self.visit_params(&function.params)?;
                self.visit(function.body)?;
            }
            NodeKind::ArrowFunctionExpression { params, body, .. } => {
                self.visit_params(params)?;
                self.visit(*body)?;
            }
            _ => {
                for child in ast.children(id) {
                    self.visit(child)?;
                }
            }
        }

        if entered {
            self.scopes.pop();
        }
        self.ancestors.pop();
        Ok(())
    }

    fn visit_params(&mut self, params: &[NodeId]) -> Result<()> {
        let function = self.current();
        self.param_scopes.push(function);
        let result = params.iter().try_for_each(|param| self.visit(*param));
        self.param_scopes.pop();
        result
    }

    /// Handlers run on entry, before the node's children are walked.
    fn enter(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        let ast = self.ast;
        let kind = ast.kind(id);

        match kind {
            NodeKind::Identifier { .. } => {
                if let Some(parent) = parent {
                    self.identifier(id, parent);
                }
            }
            NodeKind::ImportDeclaration { specifiers, .. } => {
                let scope = self.tree.block_parent(self.current());
                for specifier in specifiers {
                    if let Some(local) = specifier_local(ast, *specifier) {
                        self.declare(scope, BindingKind::Module, local, *specifier)?;
                    }
                }
            }
            NodeKind::LabeledStatement { label, .. } => {
                let scope = self.tree.block_parent(self.current());
                self.tree.register_label(scope, label, id);
            }
            NodeKind::CatchClause {
                param: Some(param), ..
            } => {
                let scope = self.current();
                for name in binding_identifiers(ast, *param) {
                    self.declare(scope, BindingKind::Let, name, id)?;
                }
            }
            NodeKind::ClassExpression(class) => {
                if let Some(name) = class.id {
                    self.declare(self.current(), BindingKind::Local, name, id)?;
                }
            }
            NodeKind::UpdateExpression { argument, .. } => self.mutation(*argument),
            NodeKind::UnaryExpression {
                operator: UnaryOperator::Delete,
                argument,
            } => self.mutation(*argument),
            NodeKind::AssignmentExpression { left, .. } => {
                for name in binding_identifiers(ast, *left) {
                    self.mutation(name);
                }
            }
            _ => {}
        }

        for virtual_type in virtual_types(kind) {
            match virtual_type {
                VirtualType::Function => self.function(id)?,
                VirtualType::Declaration => self.declaration(id)?,
                VirtualType::ForXStatement => self.for_x(id),
                _ => {}
            }
        }
        Ok(())
    }

    fn function(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        let scope = self.current();
        let (params, own_name) = match ast.kind(id) {
            NodeKind::FunctionDeclaration(function) => (&function.params, None),
            NodeKind::FunctionExpression(function) => (&function.params, function.id),
            NodeKind::ArrowFunctionExpression { params, .. } => (params, None),
            _ => return Ok(()),
        };
        for param in params {
            for name in binding_identifiers(ast, *param) {
                self.declare(scope, BindingKind::Param, name, name)?;
            }
        }
        // After the parameters, so a parameter of the same name wins
        if let Some(name) = own_name {
            self.declare(scope, BindingKind::Local, name, id)?;
        }
        Ok(())
    }

    fn declaration(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        let kind = ast.kind(id);
        if VirtualType::ExportDeclaration.matches(kind)
            || matches!(kind, NodeKind::ImportDeclaration { .. })
        {
            return Ok(());
        }

        if !VirtualType::BlockScoped.matches(kind) {
            // `var`, wherever it appears
            let scope = self.tree.function_parent(self.current());
            if let NodeKind::VariableDeclaration { declarations, .. } = kind {
                for declarator in declarations {
                    for name in binding_identifiers(ast, *declarator) {
                        self.declare(scope, BindingKind::Var, name, *declarator)?;
                    }
                }
            }
            return Ok(());
        }

        // Functions and classes own a scope; their name belongs outside it
        let mut scope = self.current();
        if self.tree.get(scope).node == id {
            scope = self.tree.get(scope).parent.unwrap_or(self.tree.root());
        }
        let scope = self.tree.block_parent(scope);

        match kind {
            NodeKind::VariableDeclaration { kind, declarations } => {
                let binding_kind = match kind {
                    VariableKind::Const => BindingKind::Const,
                    _ => BindingKind::Let,
                };
                for declarator in declarations {
                    for name in binding_identifiers(ast, *declarator) {
                        self.declare(scope, binding_kind, name, *declarator)?;
                    }
                }
            }
            NodeKind::FunctionDeclaration(function) => {
                if let Some(name) = function.id {
                    self.declare(scope, BindingKind::Hoisted, name, id)?;
                }
            }
            NodeKind::ClassDeclaration(class) => {
                if let Some(name) = class.id {
                    self.declare(scope, BindingKind::Let, name, id)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `for (x in o)` and `for ([a, b] of o)` write their targets.
    fn for_x(&mut self, id: NodeId) {
        let ast = self.ast;
        let left = match ast.kind(id) {
            NodeKind::ForInStatement { left, .. } | NodeKind::ForOfStatement { left, .. } => *left,
            _ => return,
        };
        if matches!(ast.kind(left), NodeKind::VariableDeclaration { .. }) {
            return;
        }
        for name in binding_identifiers(ast, left) {
            self.mutation(name);
        }
    }

    fn identifier(&mut self, id: NodeId, parent: NodeId) {
        let ast = self.ast;
        // Export lists are resolved by the rewriter itself
        if matches!(ast.kind(parent), NodeKind::ExportSpecifier { .. }) {
            return;
        }
        let grandparent = self.ancestors.iter().rev().nth(2).copied();
        if is_referenced(ast, id, parent, grandparent) {
            self.defer(id, Access::Read);
        }
    }

    fn mutation(&mut self, target: NodeId) {
        if matches!(self.ast.kind(target), NodeKind::Identifier { .. }) {
            self.defer(target, Access::Write);
        }
    }

    fn defer(&mut self, node: NodeId, access: Access) {
        self.deferred.push(Deferred {
            node,
            scope: self.current(),
            access,
            param_scopes: self.param_scopes.clone(),
        });
    }

    fn declare(&mut self, scope: ScopeId, kind: BindingKind, name: NodeId, node: NodeId) -> Result<()> {
        let Some(text) = self.ast.identifier_name(name) else {
            return Ok(());
        };
        self.tree
            .register(scope, kind, text, node)
            .map_err(|err| CompileError::Redeclaration {
                name: err.name,
                filename: self.filename.to_string(),
            })
    }

    /// Resolves every queued use site against the finished scope tree.
    fn finish(mut self) -> ScopeTree {
        let deferred = std::mem::take(&mut self.deferred);
        for site in deferred {
            let Some(name) = self.ast.identifier_name(site.node) else {
                continue;
            };
            let found = self
                .tree
                .resolve(site.scope, name, &site.param_scopes)
                .map(|(scope, _)| scope);
            match (found, site.access) {
                (Some(scope), Access::Read) => self.tree.add_reference(scope, name, site.node),
                (Some(scope), Access::Write) => self.tree.add_mutation(scope, name, site.node),
                (None, _) => self.tree.add_global(site.node),
            }
        }
        self.tree
    }
}

fn scope_kind(kind: &NodeKind) -> ScopeKind {
    match kind {
        NodeKind::Program { .. } => ScopeKind::Program,
        NodeKind::FunctionDeclaration(_)
        | NodeKind::FunctionExpression(_)
        | NodeKind::ArrowFunctionExpression { .. } => ScopeKind::Function,
        NodeKind::StaticBlock { .. } => ScopeKind::StaticBlock,
        NodeKind::CatchClause { .. } => ScopeKind::Catch,
        NodeKind::SwitchStatement { .. } => ScopeKind::Switch,
        NodeKind::ClassDeclaration(_) | NodeKind::ClassExpression(_) => ScopeKind::Class,
        NodeKind::ForStatement { .. }
        | NodeKind::ForInStatement { .. }
        | NodeKind::ForOfStatement { .. }
        | NodeKind::WhileStatement { .. }
        | NodeKind::DoWhileStatement { .. } => ScopeKind::Loop,
        _ => ScopeKind::Block,
    }
}

fn specifier_local(ast: &Ast, specifier: NodeId) -> Option<NodeId> {
    match ast.kind(specifier) {
        NodeKind::ImportSpecifier { local, .. }
        | NodeKind::ImportDefaultSpecifier { local }
        | NodeKind::ImportNamespaceSpecifier { local } => Some(*local),
        _ => None,
    }
}
