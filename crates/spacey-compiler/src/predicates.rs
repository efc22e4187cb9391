// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Node predicates.
//!
//! Concrete node types are matched directly on [`NodeKind`]. Composite
//! categories that cut across node types ("is this a scope?", "is this a
//! declaration?") are [`VirtualType`]s, each backed by one predicate in a
//! lookup table so visitors can dispatch on them without a type hierarchy.

use spacey_syntax::ast::{UnaryOperator, VariableKind};
use spacey_syntax::{Ast, NodeId, NodeKind};

/// A category of nodes defined by a predicate rather than by one node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualType {
    /// Nodes that may own a scope
    Scopable,
    /// Scopes that can hold block-scoped declarations
    BlockParent,
    /// Scopes that hold `var` declarations
    FunctionParent,
    /// Function declarations, expressions and arrows
    Function,
    /// Statements that declare names
    Declaration,
    /// Declarations scoped to the enclosing block
    BlockScoped,
    /// `for-in` and `for-of`
    ForXStatement,
    /// Destructuring and default patterns
    Pattern,
    /// `export` statements of any form
    ExportDeclaration,
    /// Nodes whose identifiers may be assigned to
    ConstantViolation,
}

type Predicate = fn(&NodeKind) -> bool;

const TABLE: &[(VirtualType, Predicate)] = &[
    (VirtualType::Scopable, is_scopable),
    (VirtualType::BlockParent, is_block_parent),
    (VirtualType::FunctionParent, is_function_parent),
    (VirtualType::Function, is_function),
    (VirtualType::Declaration, is_declaration),
    (VirtualType::BlockScoped, is_block_scoped),
    (VirtualType::ForXStatement, is_for_x),
    (VirtualType::Pattern, is_pattern),
    (VirtualType::ExportDeclaration, is_export_declaration),
    (VirtualType::ConstantViolation, is_constant_violation),
];

impl VirtualType {
    /// Returns true if `kind` belongs to this category.
    pub fn matches(self, kind: &NodeKind) -> bool {
        TABLE
            .iter()
            .find(|(ty, _)| *ty == self)
            .is_some_and(|(_, predicate)| predicate(kind))
    }
}

/// Every virtual type `kind` belongs to, in table order.
pub fn virtual_types(kind: &NodeKind) -> impl Iterator<Item = VirtualType> + '_ {
    TABLE
        .iter()
        .filter(move |(_, predicate)| predicate(kind))
        .map(|(ty, _)| *ty)
}

fn is_scopable(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Program { .. }
            | NodeKind::BlockStatement { .. }
            | NodeKind::CatchClause { .. }
            | NodeKind::DoWhileStatement { .. }
            | NodeKind::WhileStatement { .. }
            | NodeKind::ForStatement { .. }
            | NodeKind::ForInStatement { .. }
            | NodeKind::ForOfStatement { .. }
            | NodeKind::SwitchStatement { .. }
            | NodeKind::ClassDeclaration(_)
            | NodeKind::ClassExpression(_)
            | NodeKind::StaticBlock { .. }
    ) || is_function(kind)
}

fn is_block_parent(kind: &NodeKind) -> bool {
    is_scopable(kind) && !matches!(kind, NodeKind::ClassDeclaration(_) | NodeKind::ClassExpression(_))
}

fn is_function_parent(kind: &NodeKind) -> bool {
    is_function(kind) || matches!(kind, NodeKind::StaticBlock { .. })
}

fn is_function(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FunctionDeclaration(_)
            | NodeKind::FunctionExpression(_)
            | NodeKind::ArrowFunctionExpression { .. }
    )
}

fn is_declaration(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FunctionDeclaration(_)
            | NodeKind::VariableDeclaration { .. }
            | NodeKind::ClassDeclaration(_)
            | NodeKind::ImportDeclaration { .. }
    ) || is_export_declaration(kind)
}

fn is_block_scoped(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::FunctionDeclaration(_) | NodeKind::ClassDeclaration(_) => true,
        NodeKind::VariableDeclaration { kind, .. } => *kind != VariableKind::Var,
        _ => false,
    }
}

fn is_for_x(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ForInStatement { .. } | NodeKind::ForOfStatement { .. }
    )
}

fn is_pattern(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ObjectPattern { .. }
            | NodeKind::ArrayPattern { .. }
            | NodeKind::AssignmentPattern { .. }
    )
}

fn is_export_declaration(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ExportNamedDeclaration { .. }
            | NodeKind::ExportDefaultDeclaration { .. }
            | NodeKind::ExportAllDeclaration { .. }
    )
}

fn is_constant_violation(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::AssignmentExpression { .. } | NodeKind::UpdateExpression { .. } => true,
        NodeKind::UnaryExpression { operator, .. } => *operator == UnaryOperator::Delete,
        _ => is_for_x(kind),
    }
}

/// Returns true if `node` introduces a scope of its own under `parent`.
///
/// A block that is the body of a function or catch clause shares the scope
/// of its owner.
pub fn is_scope(ast: &Ast, node: NodeId, parent: Option<NodeId>) -> bool {
    let kind = ast.kind(node);
    if let (NodeKind::BlockStatement { .. }, Some(parent)) = (kind, parent) {
        let parent = ast.kind(parent);
        if is_function(parent) || matches!(parent, NodeKind::CatchClause { .. }) {
            return false;
        }
    }
    is_scopable(kind)
}

/// Returns true if the identifier `node` is read as a value where it sits.
///
/// Binding positions, property keys, member names and labels are not
/// references.
pub fn is_referenced(ast: &Ast, node: NodeId, parent: NodeId, grandparent: Option<NodeId>) -> bool {
    match ast.kind(parent) {
        // yes: object[NODE], NODE.property
        // no: object.NODE
        NodeKind::MemberExpression {
            object,
            property,
            computed,
            ..
        } => {
            if *property == node {
                *computed
            } else {
                *object == node
            }
        }
        // no: let NODE = init
        NodeKind::VariableDeclarator { init, .. } => *init == Some(node),
        // no: (NODE) => {}
        NodeKind::ArrowFunctionExpression { body, .. } => *body == node,
        // no: { NODE: value }, class { NODE() {} }
        // yes: { [NODE]: value }, { key: NODE } outside patterns
        NodeKind::Property { key, computed, .. } => {
            if *key == node {
                *computed
            } else {
                !grandparent.is_some_and(|g| matches!(ast.kind(g), NodeKind::ObjectPattern { .. }))
            }
        }
        NodeKind::MethodDefinition { key, computed, .. }
        | NodeKind::PropertyDefinition { key, computed, .. } => *key != node || *computed,
        // yes: class C extends NODE {}
        NodeKind::ClassDeclaration(class) | NodeKind::ClassExpression(class) => {
            class.super_class == Some(node)
        }
        // yes: left = NODE, [x = NODE] = []
        NodeKind::AssignmentExpression { right, .. } | NodeKind::AssignmentPattern { right, .. } => {
            *right == node
        }
        // no: export { NODE } from "m"
        NodeKind::ExportSpecifier { local, .. } => {
            let re_export = grandparent.is_some_and(|g| {
                matches!(
                    ast.kind(g),
                    NodeKind::ExportNamedDeclaration {
                        source: Some(_),
                        ..
                    }
                )
            });
            !re_export && *local == node
        }
        NodeKind::CatchClause { .. }
        | NodeKind::RestElement { .. }
        | NodeKind::FunctionDeclaration(_)
        | NodeKind::FunctionExpression(_)
        | NodeKind::ImportSpecifier { .. }
        | NodeKind::ImportDefaultSpecifier { .. }
        | NodeKind::ImportNamespaceSpecifier { .. }
        | NodeKind::ObjectPattern { .. }
        | NodeKind::ArrayPattern { .. } => false,
        _ => true,
    }
}

/// Collects the identifiers a pattern binds, in source order.
///
/// Member expressions in assignment patterns bind nothing.
pub fn binding_identifiers(ast: &Ast, pattern: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_binding_identifiers(ast, pattern, &mut out);
    out
}

fn collect_binding_identifiers(ast: &Ast, id: NodeId, out: &mut Vec<NodeId>) {
    match ast.kind(id) {
        NodeKind::Identifier { .. } => out.push(id),
        NodeKind::ObjectPattern { properties } => {
            for property in properties {
                match ast.kind(*property) {
                    NodeKind::Property { value, .. } => {
                        collect_binding_identifiers(ast, *value, out)
                    }
                    _ => collect_binding_identifiers(ast, *property, out),
                }
            }
        }
        NodeKind::ArrayPattern { elements } => {
            for element in elements.iter().flatten() {
                collect_binding_identifiers(ast, *element, out);
            }
        }
        NodeKind::RestElement { argument } => collect_binding_identifiers(ast, *argument, out),
        NodeKind::AssignmentPattern { left, .. } => collect_binding_identifiers(ast, *left, out),
        NodeKind::VariableDeclaration { declarations, .. } => {
            for declarator in declarations {
                collect_binding_identifiers(ast, *declarator, out);
            }
        }
        NodeKind::VariableDeclarator { id, .. } => collect_binding_identifiers(ast, *id, out),
        NodeKind::FunctionDeclaration(function) => out.extend(function.id),
        NodeKind::ClassDeclaration(class) => out.extend(class.id),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacey_syntax::parse_module;

    fn first(ast: &Ast) -> NodeId {
        ast.program_body()[0]
    }

    #[test]
    fn test_virtual_type_table() {
        let ast = parse_module("function f() {}", "t.js").unwrap();
        let kinds: Vec<_> = virtual_types(ast.kind(first(&ast))).collect();
        assert_eq!(
            kinds,
            vec![
                VirtualType::Scopable,
                VirtualType::BlockParent,
                VirtualType::FunctionParent,
                VirtualType::Function,
                VirtualType::Declaration,
                VirtualType::BlockScoped,
            ]
        );
    }

    #[test]
    fn test_block_scoped_excludes_var() {
        let ast = parse_module("var a; let b;", "t.js").unwrap();
        let body = ast.program_body();
        assert!(!VirtualType::BlockScoped.matches(ast.kind(body[0])));
        assert!(VirtualType::BlockScoped.matches(ast.kind(body[1])));
    }

    #[test]
    fn test_class_is_not_block_parent() {
        let ast = parse_module("class A {}", "t.js").unwrap();
        let kind = ast.kind(first(&ast));
        assert!(VirtualType::Scopable.matches(kind));
        assert!(!VirtualType::BlockParent.matches(kind));
    }

    #[test]
    fn test_function_body_shares_scope() {
        let ast = parse_module("function f() {} { }", "t.js").unwrap();
        let body = ast.program_body();
        let NodeKind::FunctionDeclaration(function) = ast.kind(body[0]) else {
            panic!("expected function");
        };
        assert!(!is_scope(&ast, function.body, Some(body[0])));
        assert!(is_scope(&ast, body[1], Some(ast.root())));
    }

    #[test]
    fn test_binding_identifiers_expand_patterns() {
        let ast = parse_module("const { a, b: [c, , ...d], e = 1 } = o;", "t.js").unwrap();
        let names: Vec<_> = binding_identifiers(&ast, first(&ast))
            .into_iter()
            .filter_map(|id| ast.identifier_name(id))
            .collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn test_member_property_is_not_referenced() {
        let ast = parse_module("a.b;", "t.js").unwrap();
        let NodeKind::ExpressionStatement { expression } = ast.kind(first(&ast)) else {
            panic!("expected expression");
        };
        let NodeKind::MemberExpression {
            object, property, ..
        } = ast.kind(*expression)
        else {
            panic!("expected member");
        };
        assert!(is_referenced(&ast, *object, *expression, None));
        assert!(!is_referenced(&ast, *property, *expression, None));
    }
}
