// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Constructors for synthesized nodes.

use spacey_syntax::ast::{Function, Literal, PropertyKind, VariableKind};
use spacey_syntax::codegen::is_identifier_name;
use spacey_syntax::{Ast, NodeId, NodeKind};

pub(super) fn ident(ast: &mut Ast, name: &str) -> NodeId {
    ast.synth(NodeKind::Identifier {
        name: name.to_string(),
    })
}

pub(super) fn string(ast: &mut Ast, value: &str) -> NodeId {
    ast.synth(NodeKind::Literal(Literal::String {
        value: value.to_string(),
        raw: None,
    }))
}

/// `callee(arguments)` with a plain identifier callee.
pub(super) fn call_kind(ast: &mut Ast, callee: &str, arguments: Vec<NodeId>) -> NodeKind {
    NodeKind::CallExpression {
        callee: ident(ast, callee),
        arguments,
        optional: false,
    }
}

/// `object.name`, or `object["name"]` when `name` is not an identifier.
pub(super) fn member_kind(ast: &mut Ast, object: &str, name: &str) -> NodeKind {
    let computed = !is_identifier_name(name);
    let property = if computed {
        string(ast, name)
    } else {
        ident(ast, name)
    };
    NodeKind::MemberExpression {
        object: ident(ast, object),
        property,
        computed,
        optional: false,
    }
}

/// `const name = init;`
pub(super) fn const_declaration(ast: &mut Ast, name: &str, init: NodeId) -> NodeKind {
    let id = ident(ast, name);
    let declarator = ast.synth(NodeKind::VariableDeclarator {
        id,
        init: Some(init),
    });
    NodeKind::VariableDeclaration {
        kind: VariableKind::Const,
        declarations: vec![declarator],
    }
}

/// `callee(arguments);`
pub(super) fn call_statement(ast: &mut Ast, callee: &str, arguments: Vec<NodeId>) -> NodeId {
    let kind = call_kind(ast, callee, arguments);
    let expression = ast.synth(kind);
    ast.synth(NodeKind::ExpressionStatement { expression })
}

/// `{ name: () => value, ... }`
pub(super) fn thunk_object(ast: &mut Ast, entries: &[(String, NodeId)]) -> NodeId {
    let properties = entries
        .iter()
        .map(|(name, value)| {
            let key = if is_identifier_name(name) {
                ident(ast, name)
            } else {
                string(ast, name)
            };
            let thunk = ast.synth(NodeKind::ArrowFunctionExpression {
                params: Vec::new(),
                body: *value,
                expression: true,
                is_async: false,
            });
            ast.synth(NodeKind::Property {
                key,
                value: thunk,
                kind: PropertyKind::Init,
                computed: false,
                shorthand: false,
                method: false,
            })
        })
        .collect();
    ast.synth(NodeKind::ObjectExpression { properties })
}

/// `(function (params) { "use strict"; body })`
pub(super) fn strict_wrapper(ast: &mut Ast, params: &[&str], body: Vec<NodeId>) -> NodeId {
    let directive = {
        let expression = string(ast, "use strict");
        ast.synth(NodeKind::ExpressionStatement { expression })
    };
    let params = params.iter().map(|name| ident(ast, name)).collect();
    let body = ast.synth(NodeKind::BlockStatement {
        body: std::iter::once(directive).chain(body).collect(),
    });
    let function = ast.synth(NodeKind::FunctionExpression(Function {
        id: None,
        params,
        body,
        is_async: false,
        is_generator: false,
    }));
    ast.synth(NodeKind::ExpressionStatement {
        expression: function,
    })
}
