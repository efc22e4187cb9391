// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Arena-allocated abstract syntax tree.
//!
//! Node shapes follow ESTree. Every node lives in one [`Ast`] arena and is
//! addressed by a [`NodeId`]; children are stored as ids, so a node keeps a
//! stable identity for its whole lifetime and later passes can attach side
//! tables to it or rewrite it in place.

mod operators;

pub use operators::{AssignmentOperator, BinaryOperator, UnaryOperator, UpdateOperator};

use crate::lexer::Span;

/// Index of a node in an [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node: its kind plus the source range it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The node payload
    pub kind: NodeKind,
    /// Source range, empty for synthesized nodes
    pub span: Span,
}

/// `var`, `let` or `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var
    Var,
    /// let
    Let,
    /// const
    Const,
}

impl VariableKind {
    /// Source spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Var => "var",
            VariableKind::Let => "let",
            VariableKind::Const => "const",
        }
    }
}

/// Shared shape of function declarations and expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name
    pub id: Option<NodeId>,
    /// Parameter patterns
    pub params: Vec<NodeId>,
    /// Body block
    pub body: NodeId,
    /// `async function`
    pub is_async: bool,
    /// `function*`
    pub is_generator: bool,
}

/// Shared shape of class declarations and expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    /// Class name
    pub id: Option<NodeId>,
    /// `extends` clause
    pub super_class: Option<NodeId>,
    /// The `ClassBody` node
    pub body: NodeId,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number with its source spelling
    Number {
        /// Numeric value
        value: f64,
        /// Source spelling
        raw: String,
    },
    /// String with its source spelling, when parsed
    String {
        /// Cooked value
        value: String,
        /// Source spelling including quotes
        raw: Option<String>,
    },
    /// true / false
    Boolean(bool),
    /// null
    Null,
    /// BigInt digits without the `n` suffix
    BigInt(String),
    /// Regular expression
    RegExp {
        /// Pattern between slashes
        pattern: String,
        /// Flags
        flags: String,
    },
}

/// One chunk of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateElement {
    /// Cooked text
    pub cooked: Option<String>,
    /// Raw source text
    pub raw: String,
}

/// Object literal property kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// `key: value`, shorthand, or method
    Init,
    /// `get key() {}`
    Get,
    /// `set key(v) {}`
    Set,
}

/// Class method kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// constructor
    Constructor,
    /// ordinary method
    Method,
    /// getter
    Get,
    /// setter
    Set,
}

/// All node payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Module root
    Program {
        /// Top-level statements
        body: Vec<NodeId>,
    },

    // Statements
    /// `var`/`let`/`const` declaration
    VariableDeclaration {
        /// Declaration keyword
        kind: VariableKind,
        /// `VariableDeclarator` nodes
        declarations: Vec<NodeId>,
    },
    /// `pattern = init`
    VariableDeclarator {
        /// Binding pattern
        id: NodeId,
        /// Initializer
        init: Option<NodeId>,
    },
    /// `function f() {}`
    FunctionDeclaration(Function),
    /// `class C {}`
    ClassDeclaration(Class),
    /// Expression followed by a semicolon
    ExpressionStatement {
        /// The expression
        expression: NodeId,
    },
    /// `{ ... }`
    BlockStatement {
        /// Statements
        body: Vec<NodeId>,
    },
    /// `;`
    EmptyStatement,
    /// `debugger;`
    DebuggerStatement,
    /// `if (test) consequent else alternate`
    IfStatement {
        /// Condition
        test: NodeId,
        /// Then branch
        consequent: NodeId,
        /// Else branch
        alternate: Option<NodeId>,
    },
    /// `switch (discriminant) { cases }`
    SwitchStatement {
        /// Switched value
        discriminant: NodeId,
        /// `SwitchCase` nodes
        cases: Vec<NodeId>,
    },
    /// `case test:` or `default:`
    SwitchCase {
        /// Case value, `None` for default
        test: Option<NodeId>,
        /// Statements
        consequent: Vec<NodeId>,
    },
    /// `while (test) body`
    WhileStatement {
        /// Condition
        test: NodeId,
        /// Loop body
        body: NodeId,
    },
    /// `do body while (test)`
    DoWhileStatement {
        /// Loop body
        body: NodeId,
        /// Condition
        test: NodeId,
    },
    /// `for (init; test; update) body`
    ForStatement {
        /// Declaration or expression
        init: Option<NodeId>,
        /// Condition
        test: Option<NodeId>,
        /// Update expression
        update: Option<NodeId>,
        /// Loop body
        body: NodeId,
    },
    /// `for (left in right) body`
    ForInStatement {
        /// Declaration or assignment target
        left: NodeId,
        /// Object expression
        right: NodeId,
        /// Loop body
        body: NodeId,
    },
    /// `for (left of right) body`
    ForOfStatement {
        /// Declaration or assignment target
        left: NodeId,
        /// Iterable expression
        right: NodeId,
        /// Loop body
        body: NodeId,
        /// `for await`
        is_await: bool,
    },
    /// `return argument;`
    ReturnStatement {
        /// Returned value
        argument: Option<NodeId>,
    },
    /// `break label;`
    BreakStatement {
        /// Target label
        label: Option<String>,
    },
    /// `continue label;`
    ContinueStatement {
        /// Target label
        label: Option<String>,
    },
    /// `throw argument;`
    ThrowStatement {
        /// Thrown value
        argument: NodeId,
    },
    /// `try block catch finalizer`
    TryStatement {
        /// Protected block
        block: NodeId,
        /// `CatchClause` node
        handler: Option<NodeId>,
        /// Finally block
        finalizer: Option<NodeId>,
    },
    /// `catch (param) body`
    CatchClause {
        /// Binding pattern
        param: Option<NodeId>,
        /// Handler block
        body: NodeId,
    },
    /// `label: body`
    LabeledStatement {
        /// Label name
        label: String,
        /// Labeled statement
        body: NodeId,
    },

    // Modules
    /// `import ... from 'source'`
    ImportDeclaration {
        /// Specifier nodes
        specifiers: Vec<NodeId>,
        /// Module specifier string
        source: String,
    },
    /// `{ imported as local }`
    ImportSpecifier {
        /// Exported name in the source module
        imported: String,
        /// Local binding identifier
        local: NodeId,
    },
    /// `import local from ...`
    ImportDefaultSpecifier {
        /// Local binding identifier
        local: NodeId,
    },
    /// `import * as local from ...`
    ImportNamespaceSpecifier {
        /// Local binding identifier
        local: NodeId,
    },
    /// `export declaration` or `export { specifiers } from source`
    ExportNamedDeclaration {
        /// Inline declaration
        declaration: Option<NodeId>,
        /// `ExportSpecifier` nodes
        specifiers: Vec<NodeId>,
        /// Re-export source
        source: Option<String>,
    },
    /// `local as exported`
    ExportSpecifier {
        /// Local (or source module) name as an identifier node
        local: NodeId,
        /// Exported name
        exported: String,
    },
    /// `export default declaration`
    ExportDefaultDeclaration {
        /// Expression or function/class declaration
        declaration: NodeId,
    },
    /// `export * from source` / `export * as exported from source`
    ExportAllDeclaration {
        /// Namespace alias
        exported: Option<String>,
        /// Module specifier string
        source: String,
    },

    // Expressions
    /// Identifier reference or binding
    Identifier {
        /// Name
        name: String,
    },
    /// `#name` in classes
    PrivateName {
        /// Name without the hash
        name: String,
    },
    /// Literal value
    Literal(Literal),
    /// `` `a${b}c` ``
    TemplateLiteral {
        /// Text chunks, one more than expressions
        quasis: Vec<TemplateElement>,
        /// Substitutions
        expressions: Vec<NodeId>,
    },
    /// ``tag`...` ``
    TaggedTemplateExpression {
        /// Tag expression
        tag: NodeId,
        /// `TemplateLiteral` node
        quasi: NodeId,
    },
    /// this
    ThisExpression,
    /// super
    Super,
    /// `[a, , b]`
    ArrayExpression {
        /// Elements, `None` for holes
        elements: Vec<Option<NodeId>>,
    },
    /// `{ ... }`
    ObjectExpression {
        /// `Property` and `SpreadElement` nodes
        properties: Vec<NodeId>,
    },
    /// Object literal or object pattern property
    Property {
        /// Key expression
        key: NodeId,
        /// Value expression or pattern
        value: NodeId,
        /// init/get/set
        kind: PropertyKind,
        /// `[key]: value`
        computed: bool,
        /// `{ key }`
        shorthand: bool,
        /// `{ key() {} }`
        method: bool,
    },
    /// `...argument`
    SpreadElement {
        /// Spread value
        argument: NodeId,
    },
    /// `function () {}`
    FunctionExpression(Function),
    /// `(params) => body`
    ArrowFunctionExpression {
        /// Parameter patterns
        params: Vec<NodeId>,
        /// Block or expression body
        body: NodeId,
        /// True for an expression body
        expression: bool,
        /// `async () => {}`
        is_async: bool,
    },
    /// `class {}`
    ClassExpression(Class),
    /// Class members
    ClassBody {
        /// Member nodes
        body: Vec<NodeId>,
    },
    /// Class method, getter, setter or constructor
    MethodDefinition {
        /// Key expression
        key: NodeId,
        /// `FunctionExpression` node
        value: NodeId,
        /// Method kind
        kind: MethodKind,
        /// `[key]() {}`
        computed: bool,
        /// `static`
        is_static: bool,
    },
    /// Class field
    PropertyDefinition {
        /// Key expression
        key: NodeId,
        /// Initializer
        value: Option<NodeId>,
        /// `[key] = value`
        computed: bool,
        /// `static`
        is_static: bool,
    },
    /// `static { ... }`
    StaticBlock {
        /// Statements
        body: Vec<NodeId>,
    },
    /// Prefix unary operation
    UnaryExpression {
        /// Operator
        operator: UnaryOperator,
        /// Operand
        argument: NodeId,
    },
    /// `++x`, `x--`
    UpdateExpression {
        /// Operator
        operator: UpdateOperator,
        /// Prefix form
        prefix: bool,
        /// Target
        argument: NodeId,
    },
    /// Binary or logical operation
    BinaryExpression {
        /// Operator
        operator: BinaryOperator,
        /// Left operand
        left: NodeId,
        /// Right operand
        right: NodeId,
    },
    /// `left op= right`
    AssignmentExpression {
        /// Operator
        operator: AssignmentOperator,
        /// Target expression or pattern
        left: NodeId,
        /// Assigned value
        right: NodeId,
    },
    /// `test ? consequent : alternate`
    ConditionalExpression {
        /// Condition
        test: NodeId,
        /// True branch
        consequent: NodeId,
        /// False branch
        alternate: NodeId,
    },
    /// `callee(arguments)`
    CallExpression {
        /// Called expression
        callee: NodeId,
        /// Arguments, possibly spread
        arguments: Vec<NodeId>,
        /// `callee?.()`
        optional: bool,
    },
    /// `new callee(arguments)`
    NewExpression {
        /// Constructor expression
        callee: NodeId,
        /// Arguments, possibly spread
        arguments: Vec<NodeId>,
    },
    /// `object.property` / `object[property]`
    MemberExpression {
        /// Object expression
        object: NodeId,
        /// Property identifier or expression
        property: NodeId,
        /// Bracket access
        computed: bool,
        /// `object?.property`
        optional: bool,
    },
    /// `a, b, c`
    SequenceExpression {
        /// Expressions
        expressions: Vec<NodeId>,
    },
    /// `yield argument` / `yield* argument`
    YieldExpression {
        /// Yielded value
        argument: Option<NodeId>,
        /// `yield*`
        delegate: bool,
    },
    /// `await argument`
    AwaitExpression {
        /// Awaited value
        argument: NodeId,
    },
    /// `new.target`, `import.meta`
    MetaProperty {
        /// `new` or `import`
        meta: String,
        /// `target` or `meta`
        property: String,
    },
    /// `import(source)`
    ImportExpression {
        /// Specifier expression
        source: NodeId,
    },

    // Patterns
    /// `{ a, b: c }` in binding position
    ObjectPattern {
        /// `Property` and `RestElement` nodes
        properties: Vec<NodeId>,
    },
    /// `[a, , b]` in binding position
    ArrayPattern {
        /// Elements, `None` for holes
        elements: Vec<Option<NodeId>>,
    },
    /// `...argument` in binding position
    RestElement {
        /// Rest target
        argument: NodeId,
    },
    /// `left = right` default
    AssignmentPattern {
        /// Target
        left: NodeId,
        /// Default value
        right: NodeId,
    },

    /// A node deleted by a later pass; generators skip it
    Removed,
}

/// The node arena for one parsed module.
///
/// Index 0 always holds the `Program` root.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    /// Creates an arena holding an empty program.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Program { body: Vec::new() },
                span: Span::SYNTHETIC,
            }],
        }
    }

    /// Allocates a node and returns its id.
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        id
    }

    /// Allocates a synthesized node with an empty span.
    pub fn synth(&mut self, kind: NodeKind) -> NodeId {
        self.alloc(kind, Span::SYNTHETIC)
    }

    /// The program root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Statements of the program root.
    pub fn program_body(&self) -> &[NodeId] {
        match self.kind(self.root()) {
            NodeKind::Program { body } => body,
            _ => &[],
        }
    }

    /// Replaces the program root's statements and span.
    pub fn set_program(&mut self, body: Vec<NodeId>, span: Span) {
        self.nodes[0] = Node {
            kind: NodeKind::Program { body },
            span,
        };
    }

    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the program has no statements.
    pub fn is_empty(&self) -> bool {
        self.program_body().is_empty()
    }

    /// Returns a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns a node's kind.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Returns a node's kind mutably.
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    /// Returns a node's span.
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    /// Overwrites a node's kind, keeping its id and span.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    /// Marks a node as removed.
    pub fn remove(&mut self, id: NodeId) {
        self.nodes[id.index()].kind = NodeKind::Removed;
    }

    /// Returns the name of an `Identifier` node.
    pub fn identifier_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Returns the value of a string literal node.
    pub fn string_value(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Literal(Literal::String { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Returns the direct children of a node in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut push = |id: &NodeId| out.push(*id);
        match self.kind(id) {
            NodeKind::Program { body }
            | NodeKind::BlockStatement { body }
            | NodeKind::ClassBody { body }
            | NodeKind::StaticBlock { body } => body.iter().for_each(&mut push),
            NodeKind::VariableDeclaration { declarations, .. } => {
                declarations.iter().for_each(&mut push)
            }
            NodeKind::VariableDeclarator { id, init } => {
                push(id);
                init.iter().for_each(&mut push);
            }
            NodeKind::FunctionDeclaration(function) | NodeKind::FunctionExpression(function) => {
                function.id.iter().for_each(&mut push);
                function.params.iter().for_each(&mut push);
                push(&function.body);
            }
            NodeKind::ClassDeclaration(class) | NodeKind::ClassExpression(class) => {
                class.id.iter().for_each(&mut push);
                class.super_class.iter().for_each(&mut push);
                push(&class.body);
            }
            NodeKind::ExpressionStatement { expression } => push(expression),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                push(test);
                push(consequent);
                alternate.iter().for_each(&mut push);
            }
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => {
                push(discriminant);
                cases.iter().for_each(&mut push);
            }
            NodeKind::SwitchCase { test, consequent } => {
                test.iter().for_each(&mut push);
                consequent.iter().for_each(&mut push);
            }
            NodeKind::WhileStatement { test, body } => {
                push(test);
                push(body);
            }
            NodeKind::DoWhileStatement { body, test } => {
                push(body);
                push(test);
            }
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                init.iter().for_each(&mut push);
                test.iter().for_each(&mut push);
                update.iter().for_each(&mut push);
                push(body);
            }
            NodeKind::ForInStatement { left, right, body }
            | NodeKind::ForOfStatement {
                left, right, body, ..
            } => {
                push(left);
                push(right);
                push(body);
            }
            NodeKind::ReturnStatement { argument } => argument.iter().for_each(&mut push),
            NodeKind::ThrowStatement { argument }
            | NodeKind::SpreadElement { argument }
            | NodeKind::RestElement { argument }
            | NodeKind::AwaitExpression { argument }
            | NodeKind::UnaryExpression { argument, .. }
            | NodeKind::UpdateExpression { argument, .. } => push(argument),
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                push(block);
                handler.iter().for_each(&mut push);
                finalizer.iter().for_each(&mut push);
            }
            NodeKind::CatchClause { param, body } => {
                param.iter().for_each(&mut push);
                push(body);
            }
            NodeKind::LabeledStatement { body, .. } => push(body),
            NodeKind::ImportDeclaration { specifiers, .. } => {
                specifiers.iter().for_each(&mut push)
            }
            NodeKind::ImportSpecifier { local, .. }
            | NodeKind::ImportDefaultSpecifier { local }
            | NodeKind::ImportNamespaceSpecifier { local }
            | NodeKind::ExportSpecifier { local, .. } => push(local),
            NodeKind::ExportNamedDeclaration {
                declaration,
                specifiers,
                ..
            } => {
                declaration.iter().for_each(&mut push);
                specifiers.iter().for_each(&mut push);
            }
            NodeKind::ExportDefaultDeclaration { declaration } => push(declaration),
            NodeKind::TemplateLiteral { expressions, .. } => {
                expressions.iter().for_each(&mut push)
            }
            NodeKind::TaggedTemplateExpression { tag, quasi } => {
                push(tag);
                push(quasi);
            }
            NodeKind::ArrayExpression { elements } | NodeKind::ArrayPattern { elements } => {
                elements.iter().flatten().for_each(&mut push)
            }
            NodeKind::ObjectExpression { properties } | NodeKind::ObjectPattern { properties } => {
                properties.iter().for_each(&mut push)
            }
            NodeKind::Property { key, value, .. } => {
                push(key);
                push(value);
            }
            NodeKind::ArrowFunctionExpression { params, body, .. } => {
                params.iter().for_each(&mut push);
                push(body);
            }
            NodeKind::MethodDefinition { key, value, .. } => {
                push(key);
                push(value);
            }
            NodeKind::PropertyDefinition { key, value, .. } => {
                push(key);
                value.iter().for_each(&mut push);
            }
            NodeKind::BinaryExpression { left, right, .. }
            | NodeKind::AssignmentExpression { left, right, .. }
            | NodeKind::AssignmentPattern { left, right } => {
                push(left);
                push(right);
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                push(test);
                push(consequent);
                push(alternate);
            }
            NodeKind::CallExpression {
                callee, arguments, ..
            }
            | NodeKind::NewExpression { callee, arguments } => {
                push(callee);
                arguments.iter().for_each(&mut push);
            }
            NodeKind::MemberExpression {
                object, property, ..
            } => {
                push(object);
                push(property);
            }
            NodeKind::SequenceExpression { expressions } => {
                expressions.iter().for_each(&mut push)
            }
            NodeKind::YieldExpression { argument, .. } => argument.iter().for_each(&mut push),
            NodeKind::ImportExpression { source } => push(source),
            NodeKind::EmptyStatement
            | NodeKind::DebuggerStatement
            | NodeKind::BreakStatement { .. }
            | NodeKind::ContinueStatement { .. }
            | NodeKind::ExportAllDeclaration { .. }
            | NodeKind::Identifier { .. }
            | NodeKind::PrivateName { .. }
            | NodeKind::Literal(_)
            | NodeKind::ThisExpression
            | NodeKind::Super
            | NodeKind::MetaProperty { .. }
            | NodeKind::Removed => {}
        }
        out
    }

    /// Visits every node reachable from `start` in depth-first pre-order.
    pub fn walk(&self, start: NodeId, mut visit: impl FnMut(NodeId)) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            visit(id);
            let children = self.children(id);
            stack.extend(children.into_iter().rev());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(ast: &mut Ast, name: &str) -> NodeId {
        ast.synth(NodeKind::Identifier { name: name.into() })
    }

    #[test]
    fn test_alloc_and_lookup() {
        let mut ast = Ast::new();
        let a = ident(&mut ast, "a");
        assert_eq!(ast.len(), 2);
        assert_eq!(ast.identifier_name(a), Some("a"));
        assert!(ast.span(a).is_empty());
    }

    #[test]
    fn test_replace_keeps_identity() {
        let mut ast = Ast::new();
        let a = ident(&mut ast, "a");
        ast.replace(a, NodeKind::ThisExpression);
        assert_eq!(ast.kind(a), &NodeKind::ThisExpression);
        ast.remove(a);
        assert_eq!(ast.kind(a), &NodeKind::Removed);
    }

    #[test]
    fn test_children_order() {
        let mut ast = Ast::new();
        let left = ident(&mut ast, "a");
        let right = ident(&mut ast, "b");
        let sum = ast.synth(NodeKind::BinaryExpression {
            operator: BinaryOperator::Add,
            left,
            right,
        });
        assert_eq!(ast.children(sum), vec![left, right]);
    }

    #[test]
    fn test_walk_preorder() {
        let mut ast = Ast::new();
        let a = ident(&mut ast, "a");
        let b = ident(&mut ast, "b");
        let array = ast.synth(NodeKind::ArrayExpression {
            elements: vec![Some(a), None, Some(b)],
        });
        let stmt = ast.synth(NodeKind::ExpressionStatement { expression: array });
        ast.set_program(vec![stmt], Span::SYNTHETIC);

        let mut seen = Vec::new();
        ast.walk(ast.root(), |id| seen.push(id));
        assert_eq!(seen, vec![ast.root(), stmt, array, a, b]);
        assert!(!ast.is_empty());
    }
}
