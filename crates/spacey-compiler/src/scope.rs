// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope tree and bindings.
//!
//! Scopes live in one arena owned by [`ScopeTree`] and point at their parent
//! by [`ScopeId`]. Bindings record the nodes that read or write them by
//! [`NodeId`], so nothing here borrows the AST.

use rustc_hash::FxHashMap;
use spacey_syntax::NodeId;

/// Index of a scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a name was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `var` declarator
    Var,
    /// `let` declarator, class declaration, catch parameter
    Let,
    /// `const` declarator
    Const,
    /// Import specifier
    Module,
    /// Function declaration
    Hoisted,
    /// Function parameter
    Param,
    /// Own name of a function or class expression
    Local,
    /// Declared by a construct with no more specific kind
    Unknown,
}

impl BindingKind {
    /// Kinds that may not share a scope with another declaration of the
    /// same name.
    pub fn is_lexical(self) -> bool {
        matches!(self, BindingKind::Let | BindingKind::Const | BindingKind::Module)
    }

    /// Source-level spelling, used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            BindingKind::Var => "var",
            BindingKind::Let => "let",
            BindingKind::Const => "const",
            BindingKind::Module => "module",
            BindingKind::Hoisted => "hoisted",
            BindingKind::Param => "param",
            BindingKind::Local => "local",
            BindingKind::Unknown => "unknown",
        }
    }
}

/// A declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Declaration kind
    pub kind: BindingKind,
    /// The declaring node (declarator, specifier, function, parameter...)
    pub node: NodeId,
    /// Identifier nodes that read the binding
    pub references: Vec<NodeId>,
    /// Identifier nodes that assign, update or delete the binding
    pub mutations: Vec<NodeId>,
}

impl Binding {
    fn new(kind: BindingKind, node: NodeId) -> Self {
        Self {
            kind,
            node,
            references: Vec::new(),
            mutations: Vec::new(),
        }
    }

    /// True if `node` reads or writes this binding.
    pub fn is_used_by(&self, node: NodeId) -> bool {
        self.references.contains(&node) || self.mutations.contains(&node)
    }
}

/// What kind of node owns a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The module root
    Program,
    /// Function, arrow function or method
    Function,
    /// `static { }` in a class body
    StaticBlock,
    /// Nested block statement
    Block,
    /// Catch clause
    Catch,
    /// Loop header
    Loop,
    /// Switch statement
    Switch,
    /// Class declaration or expression
    Class,
}

impl ScopeKind {
    /// Scopes that receive `var` declarations.
    pub fn is_function_parent(self) -> bool {
        matches!(self, ScopeKind::Function | ScopeKind::StaticBlock)
    }

    /// Scopes that receive block-scoped declarations.
    pub fn is_block_parent(self) -> bool {
        self != ScopeKind::Class
    }
}

/// One lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Node that introduced the scope
    pub node: NodeId,
    /// Owner kind
    pub kind: ScopeKind,
    /// Enclosing scope, `None` for the program
    pub parent: Option<ScopeId>,
    bindings: FxHashMap<String, Binding>,
    labels: FxHashMap<String, NodeId>,
}

impl Scope {
    /// Returns a binding declared directly in this scope.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Iterates over the bindings declared directly in this scope.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// Returns the statement a label names.
    pub fn label(&self, name: &str) -> Option<NodeId> {
        self.labels.get(name).copied()
    }
}

/// A declaration that collides with an existing lexical binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeclared {
    /// The duplicated name
    pub name: String,
}

/// All scopes of one module.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    by_node: FxHashMap<NodeId, ScopeId>,
    globals: Vec<NodeId>,
}

impl ScopeTree {
    /// Creates a tree holding only the program scope for `root`.
    pub fn new(root: NodeId) -> Self {
        let mut tree = Self {
            scopes: Vec::new(),
            by_node: FxHashMap::default(),
            globals: Vec::new(),
        };
        tree.push(root, ScopeKind::Program, None);
        tree
    }

    /// The program scope.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always false; the program scope exists from construction.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns a scope.
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Returns the scope a node introduced, if any.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    /// Identifier nodes that resolved to no binding.
    pub fn globals(&self) -> &[NodeId] {
        &self.globals
    }

    pub(crate) fn push(&mut self, node: NodeId, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            node,
            kind,
            parent,
            bindings: FxHashMap::default(),
            labels: FxHashMap::default(),
        });
        self.by_node.insert(node, id);
        id
    }

    /// Iterates from `scope` up to the program scope.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |id| self.get(*id).parent)
    }

    /// Nearest scope at or above `scope` that receives `var` declarations,
    /// falling back to the program scope.
    pub fn function_parent(&self, scope: ScopeId) -> ScopeId {
        self.ancestors(scope)
            .find(|id| self.get(*id).kind.is_function_parent())
            .unwrap_or(self.root())
    }

    /// Nearest scope at or above `scope` that receives block-scoped
    /// declarations.
    pub fn block_parent(&self, scope: ScopeId) -> ScopeId {
        self.ancestors(scope)
            .find(|id| self.get(*id).kind.is_block_parent())
            .unwrap_or(self.root())
    }

    /// Declares `name` in `scope`.
    ///
    /// Re-registering the same declaring node is a no-op, and a parameter
    /// keeps its slot when the body redeclares it. Otherwise a collision
    /// involving a lexical kind fails; any other collision keeps the first
    /// declaration.
    pub fn register(
        &mut self,
        scope: ScopeId,
        kind: BindingKind,
        name: &str,
        node: NodeId,
    ) -> Result<(), Redeclared> {
        let bindings = &mut self.scopes[scope.index()].bindings;
        match bindings.get(name) {
            None => {
                bindings.insert(name.to_string(), Binding::new(kind, node));
                Ok(())
            }
            Some(existing) if existing.node == node => Ok(()),
            Some(existing) if existing.kind == BindingKind::Param => Ok(()),
            Some(existing) if existing.kind.is_lexical() || kind.is_lexical() => Err(Redeclared {
                name: name.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    pub(crate) fn register_label(&mut self, scope: ScopeId, name: &str, node: NodeId) {
        self.scopes[scope.index()].labels.insert(name.to_string(), node);
    }

    /// Finds the binding `name` resolves to from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Binding)> {
        self.resolve(scope, name, &[])
    }

    /// Like [`lookup`](Self::lookup), for a site inside the parameter list
    /// of the functions owning `param_scopes`: those scopes only expose their
    /// parameters and own name, not declarations from the function body.
    pub fn resolve(
        &self,
        scope: ScopeId,
        name: &str,
        param_scopes: &[ScopeId],
    ) -> Option<(ScopeId, &Binding)> {
        for id in self.ancestors(scope) {
            if let Some(binding) = self.get(id).bindings.get(name) {
                let hidden = param_scopes.contains(&id)
                    && !matches!(binding.kind, BindingKind::Param | BindingKind::Local);
                if !hidden {
                    return Some((id, binding));
                }
            }
        }
        None
    }

    pub(crate) fn add_reference(&mut self, scope: ScopeId, name: &str, node: NodeId) {
        if let Some(binding) = self.scopes[scope.index()].bindings.get_mut(name) {
            if !binding.references.contains(&node) {
                binding.references.push(node);
            }
        }
    }

    pub(crate) fn add_mutation(&mut self, scope: ScopeId, name: &str, node: NodeId) {
        if let Some(binding) = self.scopes[scope.index()].bindings.get_mut(name) {
            if !binding.mutations.contains(&node) {
                binding.mutations.push(node);
            }
        }
    }

    pub(crate) fn add_global(&mut self, node: NodeId) {
        if !self.globals.contains(&node) {
            self.globals.push(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacey_syntax::{Ast, NodeKind};

    fn nodes(count: usize) -> Vec<NodeId> {
        let mut ast = Ast::new();
        (0..count)
            .map(|i| {
                ast.synth(NodeKind::Identifier {
                    name: format!("n{i}"),
                })
            })
            .collect()
    }

    #[test]
    fn test_lexical_collision_fails() {
        let n = nodes(3);
        let mut tree = ScopeTree::new(n[0]);
        let root = tree.root();
        tree.register(root, BindingKind::Let, "a", n[1]).unwrap();
        let err = tree.register(root, BindingKind::Var, "a", n[2]).unwrap_err();
        assert_eq!(err.name, "a");
    }

    #[test]
    fn test_var_collision_keeps_first() {
        let n = nodes(3);
        let mut tree = ScopeTree::new(n[0]);
        let root = tree.root();
        tree.register(root, BindingKind::Var, "a", n[1]).unwrap();
        tree.register(root, BindingKind::Hoisted, "a", n[2]).unwrap();
        assert_eq!(tree.get(root).binding("a").unwrap().node, n[1]);
    }

    #[test]
    fn test_param_shadowing_allowed() {
        let n = nodes(4);
        let mut tree = ScopeTree::new(n[0]);
        let function = tree.push(n[1], ScopeKind::Function, Some(tree.root()));
        tree.register(function, BindingKind::Param, "a", n[2]).unwrap();
        tree.register(function, BindingKind::Let, "a", n[3]).unwrap();
        assert_eq!(tree.get(function).binding("a").unwrap().kind, BindingKind::Param);
    }

    #[test]
    fn test_same_node_reregisters() {
        let n = nodes(2);
        let mut tree = ScopeTree::new(n[0]);
        let root = tree.root();
        tree.register(root, BindingKind::Const, "a", n[1]).unwrap();
        tree.register(root, BindingKind::Const, "a", n[1]).unwrap();
    }

    #[test]
    fn test_parents() {
        let n = nodes(4);
        let mut tree = ScopeTree::new(n[0]);
        let function = tree.push(n[1], ScopeKind::Function, Some(tree.root()));
        let class = tree.push(n[2], ScopeKind::Class, Some(function));
        let block = tree.push(n[3], ScopeKind::Block, Some(class));
        assert_eq!(tree.function_parent(block), function);
        assert_eq!(tree.block_parent(class), function);
        assert_eq!(tree.block_parent(block), block);
        assert_eq!(tree.function_parent(tree.root()), tree.root());
        assert_eq!(tree.scope_of(n[2]), Some(class));
    }

    #[test]
    fn test_param_position_hides_body_declarations() {
        let n = nodes(4);
        let mut tree = ScopeTree::new(n[0]);
        let root = tree.root();
        tree.register(root, BindingKind::Const, "x", n[1]).unwrap();
        let function = tree.push(n[2], ScopeKind::Function, Some(root));
        tree.register(function, BindingKind::Var, "x", n[3]).unwrap();

        assert_eq!(tree.lookup(function, "x").unwrap().0, function);
        assert_eq!(tree.resolve(function, "x", &[function]).unwrap().0, root);
    }
}
