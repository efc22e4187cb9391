// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Deferred tree edits.
//!
//! The rewriter never edits the tree while it is still reading it. Edits
//! are queued as [`Patch`] values and applied by [`PatchQueue::apply`] in
//! stage order, so an identifier inside a statement that is later removed
//! or unwrapped has already been rewritten by then.

use spacey_syntax::{Ast, NodeId, NodeKind};

/// One edit to a node, addressed by id.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Overwrite the node's kind
    Replace {
        /// Node to overwrite
        target: NodeId,
        /// New kind
        with: NodeKind,
    },
    /// Move `inner`'s kind into `target`, dropping the wrapper
    Unwrap {
        /// Wrapper node, e.g. an export statement
        target: NodeId,
        /// Wrapped declaration
        inner: NodeId,
    },
    /// Turn a function or class declaration into the matching expression
    IntoExpression {
        /// Declaration node
        target: NodeId,
    },
    /// Delete a statement
    Remove {
        /// Node to delete
        target: NodeId,
    },
}

impl Patch {
    fn apply(self, ast: &mut Ast) {
        match self {
            Patch::Replace { target, with } => ast.replace(target, with),
            Patch::Unwrap { target, inner } => {
                let kind = ast.kind(inner).clone();
                ast.replace(target, kind);
                ast.remove(inner);
            }
            Patch::IntoExpression { target } => {
                let kind = match ast.kind(target) {
                    NodeKind::FunctionDeclaration(function) => {
                        NodeKind::FunctionExpression(function.clone())
                    }
                    NodeKind::ClassDeclaration(class) => NodeKind::ClassExpression(class.clone()),
                    _ => return,
                };
                ast.replace(target, kind);
            }
            Patch::Remove { target } => ast.remove(target),
        }
    }
}

/// When a patch runs relative to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Rewrites of identifiers bound to imports
    Identifier,
    /// Export statements replaced by their declarations
    Declaration,
    /// Import and export statements deleted outright
    Removal,
}

/// Patches grouped by stage, applied identifiers first, removals last.
#[derive(Debug, Default)]
pub struct PatchQueue {
    identifiers: Vec<Patch>,
    declarations: Vec<Patch>,
    removals: Vec<Patch>,
}

impl PatchQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a patch.
    pub fn push(&mut self, stage: Stage, patch: Patch) {
        match stage {
            Stage::Identifier => self.identifiers.push(patch),
            Stage::Declaration => self.declarations.push(patch),
            Stage::Removal => self.removals.push(patch),
        }
    }

    /// Number of queued patches.
    pub fn len(&self) -> usize {
        self.identifiers.len() + self.declarations.len() + self.removals.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies every patch, stage by stage, in queue order within a stage.
    pub fn apply(self, ast: &mut Ast) {
        for patch in self
            .identifiers
            .into_iter()
            .chain(self.declarations)
            .chain(self.removals)
        {
            patch.apply(ast);
        }
    }
}
