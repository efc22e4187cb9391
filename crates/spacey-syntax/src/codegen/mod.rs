// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Turns an [`Ast`] back into source text with a source map.
//!
//! Output is normalized: two-space indentation, one statement per line,
//! and parentheses only where precedence or statement position needs them.
//! Literals keep their original spelling when they have one.

mod sourcemap;

pub use sourcemap::SourceMap;

use crate::ast::{
    Ast, BinaryOperator, Class, Function, Literal, MethodKind, NodeId, NodeKind, PropertyKind,
    UnaryOperator,
};
use crate::lexer::{is_id_continue, is_id_start};
use sourcemap::{LineIndex, MappingBuilder, Segment};

/// Generated text plus its source map.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Generated source text
    pub code: String,
    /// Map from `code` back to the original source
    pub map: SourceMap,
}

/// Prints `ast` and maps it back to `source`, which is recorded under
/// `filename` in the map.
pub fn generate(ast: &Ast, source: &str, filename: &str) -> Generated {
    let mut printer = Printer::new(ast, source);
    for stmt in ast.program_body() {
        printer.statement_line(*stmt);
    }

    Generated {
        code: printer.out,
        map: SourceMap {
            version: 3,
            file: filename.to_string(),
            sources: vec![filename.to_string()],
            sources_content: vec![Some(source.to_string())],
            names: Vec::new(),
            mappings: printer.mappings.encode(),
        },
    }
}

// Expression binding power levels
const SEQUENCE: u8 = 0;
const ASSIGN: u8 = 1;
const CONDITIONAL: u8 = 2;
const UNARY: u8 = 15;
const POSTFIX: u8 = 16;
const CALL: u8 = 18;
const PRIMARY: u8 = 19;

/// True if `name` can be written as a bare IdentifierName.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_id_start(first) => chars.all(is_id_continue),
        _ => false,
    }
}

/// Quotes a string as a double-quoted JavaScript string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Printer<'a> {
    ast: &'a Ast,
    lines: LineIndex<'a>,
    out: String,
    indent: usize,
    line: u32,
    column: u32,
    mappings: MappingBuilder,
    /// Inside a `for (;;)` initializer, where a bare `in` would end the head
    no_in: bool,
}

impl<'a> Printer<'a> {
    fn new(ast: &'a Ast, source: &'a str) -> Self {
        Self {
            ast,
            lines: LineIndex::new(source),
            out: String::new(),
            indent: 0,
            line: 0,
            column: 0,
            mappings: MappingBuilder::default(),
            no_in: false,
        }
    }

    fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += ch.len_utf16() as u32;
            }
        }
        self.out.push_str(text);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.write("  ");
        }
    }

    /// Records a mapping segment for a node parsed from the source.
    fn mark(&mut self, id: NodeId) {
        let span = self.ast.span(id);
        if span.is_empty() {
            return;
        }
        let (src_line, src_column) = self.lines.locate(span.start);
        self.mappings.add(Segment {
            gen_line: self.line,
            gen_column: self.column,
            src_line,
            src_column,
        });
    }

    fn is_removed(&self, id: NodeId) -> bool {
        matches!(self.ast.kind(id), NodeKind::Removed)
    }

    // Statements

    fn statement_line(&mut self, id: NodeId) {
        if self.is_removed(id) {
            return;
        }
        self.write_indent();
        self.statement(id);
        self.write("\n");
    }

    /// Prints a statement body after a header: blocks stay on the header
    /// line, anything else goes on its own indented line.
    fn nested(&mut self, id: NodeId) {
        if matches!(self.ast.kind(id), NodeKind::BlockStatement { .. }) {
            self.write(" ");
            self.statement(id);
        } else {
            self.write("\n");
            self.indent += 1;
            self.write_indent();
            self.statement(id);
            self.indent -= 1;
        }
    }

    fn block(&mut self, body: &[NodeId]) {
        if body.iter().all(|id| self.is_removed(*id)) {
            self.write("{}");
            return;
        }
        self.write("{\n");
        self.indent += 1;
        let outer = std::mem::replace(&mut self.no_in, false);
        for stmt in body {
            self.statement_line(*stmt);
        }
        self.no_in = outer;
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn statement(&mut self, id: NodeId) {
        self.mark(id);
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::VariableDeclaration { .. } => {
                self.variable_declaration(id);
                self.write(";");
            }
            NodeKind::FunctionDeclaration(function) => self.function(function),
            NodeKind::ClassDeclaration(class) => self.class(class),
            NodeKind::ExpressionStatement { expression } => {
                self.expression_at_start(*expression, &[StartRisk::Brace, StartRisk::Function]);
                self.write(";");
            }
            NodeKind::BlockStatement { body } => self.block(body),
            NodeKind::EmptyStatement => self.write(";"),
            NodeKind::DebuggerStatement => self.write("debugger;"),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                self.write("if (");
                self.expr(*test, SEQUENCE);
                self.write(")");
                let braced = matches!(ast.kind(*consequent), NodeKind::BlockStatement { .. });
                match alternate {
                    None => self.nested(*consequent),
                    Some(alternate) => {
                        // Brace the consequent so the else cannot attach to an inner if
                        if braced {
                            self.nested(*consequent);
                        } else {
                            self.write(" ");
                            self.block(&[*consequent]);
                        }
                        self.write(" else");
                        if matches!(ast.kind(*alternate), NodeKind::IfStatement { .. }) {
                            self.write(" ");
                            self.statement(*alternate);
                        } else {
                            self.nested(*alternate);
                        }
                    }
                }
            }
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            } => {
                self.write("switch (");
                self.expr(*discriminant, SEQUENCE);
                self.write(") {\n");
                self.indent += 1;
                for case in cases {
                    let NodeKind::SwitchCase { test, consequent } = ast.kind(*case) else {
                        continue;
                    };
                    self.write_indent();
                    match test {
                        Some(test) => {
                            self.write("case ");
                            self.expr(*test, SEQUENCE);
                            self.write(":\n");
                        }
                        None => self.write("default:\n"),
                    }
                    self.indent += 1;
                    for stmt in consequent {
                        self.statement_line(*stmt);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.write_indent();
                self.write("}");
            }
            NodeKind::WhileStatement { test, body } => {
                self.write("while (");
                self.expr(*test, SEQUENCE);
                self.write(")");
                self.nested(*body);
            }
            NodeKind::DoWhileStatement { body, test } => {
                self.write("do");
                self.nested(*body);
                if matches!(ast.kind(*body), NodeKind::BlockStatement { .. }) {
                    self.write(" ");
                } else {
                    self.write("\n");
                    self.write_indent();
                }
                self.write("while (");
                self.expr(*test, SEQUENCE);
                self.write(");");
            }
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                self.write("for (");
                if let Some(init) = init {
                    let outer = std::mem::replace(&mut self.no_in, true);
                    self.for_head(*init);
                    self.no_in = outer;
                }
                self.write(";");
                if let Some(test) = test {
                    self.write(" ");
                    self.expr(*test, SEQUENCE);
                }
                self.write(";");
                if let Some(update) = update {
                    self.write(" ");
                    self.expr(*update, SEQUENCE);
                }
                self.write(")");
                self.nested(*body);
            }
            NodeKind::ForInStatement { left, right, body } => {
                self.write("for (");
                self.for_head(*left);
                self.write(" in ");
                self.expr(*right, SEQUENCE);
                self.write(")");
                self.nested(*body);
            }
            NodeKind::ForOfStatement {
                left,
                right,
                body,
                is_await,
            } => {
                self.write(if *is_await { "for await (" } else { "for (" });
                self.for_head(*left);
                self.write(" of ");
                self.expr(*right, ASSIGN);
                self.write(")");
                self.nested(*body);
            }
            NodeKind::ReturnStatement { argument } => {
                self.write("return");
                if let Some(argument) = argument {
                    self.write(" ");
                    self.expr(*argument, SEQUENCE);
                }
                self.write(";");
            }
            NodeKind::BreakStatement { label } => self.jump("break", label.as_deref()),
            NodeKind::ContinueStatement { label } => self.jump("continue", label.as_deref()),
            NodeKind::ThrowStatement { argument } => {
                self.write("throw ");
                self.expr(*argument, SEQUENCE);
                self.write(";");
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                self.write("try ");
                self.statement(*block);
                if let Some(handler) = handler {
                    if let NodeKind::CatchClause { param, body } = ast.kind(*handler) {
                        self.write(" catch ");
                        if let Some(param) = param {
                            self.write("(");
                            self.expr(*param, ASSIGN);
                            self.write(") ");
                        }
                        self.statement(*body);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.write(" finally ");
                    self.statement(*finalizer);
                }
            }
            NodeKind::LabeledStatement { label, body } => {
                self.write(label);
                self.write(":");
                self.nested(*body);
            }
            NodeKind::ImportDeclaration { specifiers, source } => {
                self.import_declaration(specifiers, source)
            }
            NodeKind::ExportNamedDeclaration {
                declaration,
                specifiers,
                source,
            } => {
                self.write("export ");
                match declaration {
                    Some(declaration) => self.statement(*declaration),
                    None => {
                        self.export_specifiers(specifiers);
                        if let Some(source) = source {
                            self.write(" from ");
                            self.write(&quote(source));
                        }
                        self.write(";");
                    }
                }
            }
            NodeKind::ExportDefaultDeclaration { declaration } => {
                self.write("export default ");
                match ast.kind(*declaration) {
                    NodeKind::FunctionDeclaration(_) | NodeKind::ClassDeclaration(_) => {
                        self.statement(*declaration)
                    }
                    _ => {
                        self.expression_at_start(*declaration, &[StartRisk::Function]);
                        self.write(";");
                    }
                }
            }
            NodeKind::ExportAllDeclaration { exported, source } => {
                self.write("export * ");
                if let Some(exported) = exported {
                    self.write("as ");
                    self.module_export_name(exported);
                    self.write(" ");
                }
                self.write("from ");
                self.write(&quote(source));
                self.write(";");
            }
            NodeKind::Removed => {}
            _ => {
                // An expression in statement position
                self.expr(id, SEQUENCE);
                self.write(";");
            }
        }
    }

    fn jump(&mut self, keyword: &str, label: Option<&str>) {
        self.write(keyword);
        if let Some(label) = label {
            self.write(" ");
            self.write(label);
        }
        self.write(";");
    }

    fn for_head(&mut self, id: NodeId) {
        if matches!(self.ast.kind(id), NodeKind::VariableDeclaration { .. }) {
            self.variable_declaration(id);
        } else {
            self.expr(id, SEQUENCE);
        }
    }

    fn variable_declaration(&mut self, id: NodeId) {
        let ast = self.ast;
        let NodeKind::VariableDeclaration { kind, declarations } = ast.kind(id) else {
            return;
        };
        self.write(kind.as_str());
        self.write(" ");
        for (i, declarator) in declarations.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if let NodeKind::VariableDeclarator { id, init } = ast.kind(*declarator) {
                self.expr(*id, ASSIGN);
                if let Some(init) = init {
                    self.write(" = ");
                    self.expr(*init, ASSIGN);
                }
            }
        }
    }

    fn import_declaration(&mut self, specifiers: &[NodeId], source: &str) {
        let ast = self.ast;
        self.write("import ");
        let mut named = Vec::new();
        let mut wrote_clause = false;
        for spec in specifiers {
            match ast.kind(*spec) {
                NodeKind::ImportDefaultSpecifier { local } => {
                    self.write(ast.identifier_name(*local).unwrap_or_default());
                    wrote_clause = true;
                }
                NodeKind::ImportNamespaceSpecifier { local } => {
                    if wrote_clause {
                        self.write(", ");
                    }
                    self.write("* as ");
                    self.write(ast.identifier_name(*local).unwrap_or_default());
                    wrote_clause = true;
                }
                NodeKind::ImportSpecifier { imported, local } => named.push((imported, *local)),
                _ => {}
            }
        }
        if !named.is_empty() {
            if wrote_clause {
                self.write(", ");
            }
            self.write("{ ");
            for (i, (imported, local)) in named.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                let local = ast.identifier_name(*local).unwrap_or_default();
                if imported.as_str() != local {
                    self.module_export_name(imported);
                    self.write(" as ");
                }
                self.write(local);
            }
            self.write(" }");
            wrote_clause = true;
        }
        if wrote_clause {
            self.write(" from ");
        }
        self.write(&quote(source));
        self.write(";");
    }

    fn export_specifiers(&mut self, specifiers: &[NodeId]) {
        let ast = self.ast;
        if specifiers.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{ ");
        for (i, spec) in specifiers.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if let NodeKind::ExportSpecifier { local, exported } = ast.kind(*spec) {
                let local = ast.identifier_name(*local).unwrap_or_default();
                self.module_export_name(local);
                if local != exported {
                    self.write(" as ");
                    self.module_export_name(exported);
                }
            }
        }
        self.write(" }");
    }

    fn module_export_name(&mut self, name: &str) {
        if is_identifier_name(name) {
            self.write(name);
        } else {
            self.write(&quote(name));
        }
    }

    // Functions and classes

    fn function(&mut self, function: &Function) {
        if function.is_async {
            self.write("async ");
        }
        self.write("function");
        if function.is_generator {
            self.write("*");
        }
        self.write(" ");
        if let Some(id) = function.id {
            self.expr(id, PRIMARY);
        }
        self.params(&function.params);
        self.write(" ");
        self.statement(function.body);
    }

    fn params(&mut self, params: &[NodeId]) {
        self.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(*param, ASSIGN);
        }
        self.write(")");
    }

    fn class(&mut self, class: &Class) {
        self.write("class ");
        if let Some(id) = class.id {
            self.expr(id, PRIMARY);
            self.write(" ");
        }
        if let Some(super_class) = class.super_class {
            self.write("extends ");
            self.expr(super_class, CALL);
            self.write(" ");
        }

        let ast = self.ast;
        let NodeKind::ClassBody { body } = ast.kind(class.body) else {
            self.write("{}");
            return;
        };
        if body.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{\n");
        self.indent += 1;
        for member in body {
            self.write_indent();
            self.class_member(*member);
            self.write("\n");
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn class_member(&mut self, id: NodeId) {
        self.mark(id);
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::MethodDefinition {
                key,
                value,
                kind,
                computed,
                is_static,
            } => {
                if *is_static {
                    self.write("static ");
                }
                let accessor = match kind {
                    MethodKind::Get => PropertyKind::Get,
                    MethodKind::Set => PropertyKind::Set,
                    MethodKind::Constructor | MethodKind::Method => PropertyKind::Init,
                };
                self.method(*key, *value, accessor, *computed);
            }
            NodeKind::PropertyDefinition {
                key,
                value,
                computed,
                is_static,
            } => {
                if *is_static {
                    self.write("static ");
                }
                self.property_key(*key, *computed);
                if let Some(value) = value {
                    self.write(" = ");
                    self.expr(*value, ASSIGN);
                }
                self.write(";");
            }
            NodeKind::StaticBlock { body } => {
                self.write("static ");
                self.block(body);
            }
            _ => {}
        }
    }

    /// Prints `get key(params) {}`, `async *key() {}` and friends.
    fn method(&mut self, key: NodeId, value: NodeId, kind: PropertyKind, computed: bool) {
        let ast = self.ast;
        let NodeKind::FunctionExpression(function) = ast.kind(value) else {
            return;
        };
        match kind {
            PropertyKind::Get => self.write("get "),
            PropertyKind::Set => self.write("set "),
            PropertyKind::Init => {}
        }
        if function.is_async {
            self.write("async ");
        }
        if function.is_generator {
            self.write("*");
        }
        self.property_key(key, computed);
        self.params(&function.params);
        self.write(" ");
        self.statement(function.body);
    }

    fn property_key(&mut self, key: NodeId, computed: bool) {
        if computed {
            self.write("[");
            self.expr(key, ASSIGN);
            self.write("]");
        } else {
            self.expr(key, PRIMARY);
        }
    }

    // Expressions

    fn precedence(&self, id: NodeId) -> u8 {
        match self.ast.kind(id) {
            NodeKind::SequenceExpression { .. } => SEQUENCE,
            NodeKind::ArrowFunctionExpression { .. }
            | NodeKind::AssignmentExpression { .. }
            | NodeKind::YieldExpression { .. } => ASSIGN,
            NodeKind::ConditionalExpression { .. } => CONDITIONAL,
            NodeKind::BinaryExpression { operator, .. } => operator.precedence() + 2,
            NodeKind::UnaryExpression { .. } | NodeKind::AwaitExpression { .. } => UNARY,
            NodeKind::UpdateExpression { prefix: true, .. } => UNARY,
            NodeKind::UpdateExpression { prefix: false, .. } => POSTFIX,
            NodeKind::CallExpression { .. }
            | NodeKind::NewExpression { .. }
            | NodeKind::MemberExpression { .. }
            | NodeKind::TaggedTemplateExpression { .. }
            | NodeKind::ImportExpression { .. } => CALL,
            _ => PRIMARY,
        }
    }

    /// Prints an expression, parenthesized if it binds looser than `min`.
    fn expr(&mut self, id: NodeId, min: u8) {
        let bare_in = self.no_in
            && matches!(
                self.ast.kind(id),
                NodeKind::BinaryExpression {
                    operator: BinaryOperator::In,
                    ..
                }
            );
        let wrap = bare_in || self.precedence(id) < min;
        let outer = self.no_in;
        if wrap {
            self.no_in = false;
            self.write("(");
        }
        self.expr_inner(id);
        if wrap {
            self.write(")");
            self.no_in = outer;
        }
    }

    /// The node printed first when `id` is printed.
    fn leftmost(&self, id: NodeId) -> NodeId {
        match self.ast.kind(id) {
            NodeKind::MemberExpression { object, .. } => self.leftmost(*object),
            NodeKind::CallExpression { callee, .. } => self.leftmost(*callee),
            NodeKind::TaggedTemplateExpression { tag, .. } => self.leftmost(*tag),
            NodeKind::BinaryExpression { left, .. }
            | NodeKind::AssignmentExpression { left, .. } => self.leftmost(*left),
            NodeKind::ConditionalExpression { test, .. } => self.leftmost(*test),
            NodeKind::SequenceExpression { expressions } => match expressions.first() {
                Some(first) => self.leftmost(*first),
                None => id,
            },
            NodeKind::UpdateExpression {
                prefix: false,
                argument,
                ..
            } => self.leftmost(*argument),
            _ => id,
        }
    }

    /// Prints an expression that begins a statement or arrow body, wrapping
    /// it when its first token would be misread.
    fn expression_at_start(&mut self, id: NodeId, risks: &[StartRisk]) {
        let first = self.ast.kind(self.leftmost(id));
        let risky = risks.iter().any(|risk| match risk {
            StartRisk::Brace => matches!(
                first,
                NodeKind::ObjectExpression { .. } | NodeKind::ObjectPattern { .. }
            ),
            StartRisk::Function => matches!(
                first,
                NodeKind::FunctionExpression(_) | NodeKind::ClassExpression(_)
            ),
        });
        if risky {
            self.write("(");
            self.expr(id, SEQUENCE);
            self.write(")");
        } else {
            self.expr(id, SEQUENCE);
        }
    }

    fn has_call_in_chain(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::CallExpression { .. } => true,
            NodeKind::MemberExpression { object, .. } => self.has_call_in_chain(*object),
            NodeKind::TaggedTemplateExpression { tag, .. } => self.has_call_in_chain(*tag),
            _ => false,
        }
    }

    fn expr_list(&mut self, items: &[NodeId]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(*item, ASSIGN);
        }
    }

    fn expr_inner(&mut self, id: NodeId) {
        self.mark(id);
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Identifier { name } => self.write(name),
            NodeKind::PrivateName { name } => {
                self.write("#");
                self.write(name);
            }
            NodeKind::Literal(literal) => self.literal(literal),
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            } => {
                self.write("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    self.write(&quasi.raw);
                    if let Some(expression) = expressions.get(i) {
                        self.write("${");
                        self.expr(*expression, SEQUENCE);
                        self.write("}");
                    }
                }
                self.write("`");
            }
            NodeKind::TaggedTemplateExpression { tag, quasi } => {
                self.expr(*tag, CALL);
                self.expr(*quasi, PRIMARY);
            }
            NodeKind::ThisExpression => self.write("this"),
            NodeKind::Super => self.write("super"),
            NodeKind::ArrayExpression { elements } | NodeKind::ArrayPattern { elements } => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(element) = element {
                        self.expr(*element, ASSIGN);
                    }
                }
                // A trailing hole needs its own comma
                if matches!(elements.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            NodeKind::ObjectExpression { properties } | NodeKind::ObjectPattern { properties } => {
                if properties.is_empty() {
                    self.write("{}");
                    return;
                }
                self.write("{ ");
                for (i, property) in properties.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expr(*property, ASSIGN);
                }
                self.write(" }");
            }
            NodeKind::Property {
                key,
                value,
                kind,
                computed,
                shorthand,
                method,
            } => {
                if *method || *kind != PropertyKind::Init {
                    self.method(*key, *value, *kind, *computed);
                } else if *shorthand && self.shorthand_intact(*key, *value) {
                    self.expr(*value, ASSIGN);
                } else {
                    self.property_key(*key, *computed);
                    self.write(": ");
                    match ast.kind(*value) {
                        // `{ a = 1 }` that lost its shorthand form
                        NodeKind::AssignmentPattern { .. } => self.expr_inner(*value),
                        _ => self.expr(*value, ASSIGN),
                    }
                }
            }
            NodeKind::SpreadElement { argument } | NodeKind::RestElement { argument } => {
                self.write("...");
                self.expr(*argument, ASSIGN);
            }
            NodeKind::FunctionExpression(function) => self.function(function),
            NodeKind::ArrowFunctionExpression {
                params,
                body,
                expression,
                is_async,
            } => {
                if *is_async {
                    self.write("async ");
                }
                self.params(params);
                self.write(" => ");
                if *expression {
                    let wrap = matches!(
                        ast.kind(self.leftmost(*body)),
                        NodeKind::ObjectExpression { .. }
                    );
                    if wrap {
                        self.write("(");
                        self.expr(*body, SEQUENCE);
                        self.write(")");
                    } else {
                        self.expr(*body, ASSIGN);
                    }
                } else {
                    self.statement(*body);
                }
            }
            NodeKind::ClassExpression(class) => self.class(class),
            NodeKind::UnaryExpression { operator, argument } => {
                self.write(operator.as_str());
                let spaced = operator.is_keyword()
                    || match (operator, ast.kind(*argument)) {
                        (
                            UnaryOperator::Minus,
                            NodeKind::UnaryExpression {
                                operator: UnaryOperator::Minus,
                                ..
                            },
                        )
                        | (
                            UnaryOperator::Plus,
                            NodeKind::UnaryExpression {
                                operator: UnaryOperator::Plus,
                                ..
                            },
                        ) => true,
                        (
                            UnaryOperator::Minus | UnaryOperator::Plus,
                            NodeKind::UpdateExpression { prefix: true, .. },
                        ) => true,
                        _ => false,
                    };
                if spaced {
                    self.write(" ");
                }
                self.expr(*argument, UNARY);
            }
            NodeKind::UpdateExpression {
                operator,
                prefix,
                argument,
            } => {
                if *prefix {
                    self.write(operator.as_str());
                    self.expr(*argument, UNARY);
                } else {
                    self.expr(*argument, POSTFIX);
                    self.write(operator.as_str());
                }
            }
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                let precedence = operator.precedence() + 2;
                let (left_min, right_min) = if *operator == BinaryOperator::Exponent {
                    (POSTFIX, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                self.binary_operand(*operator, *left, left_min);
                self.write(" ");
                self.write(operator.as_str());
                self.write(" ");
                self.binary_operand(*operator, *right, right_min);
            }
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => {
                self.expr(*left, CALL);
                self.write(" ");
                self.write(operator.as_str());
                self.write(" ");
                self.expr(*right, ASSIGN);
            }
            NodeKind::AssignmentPattern { left, right } => {
                self.expr(*left, CALL);
                self.write(" = ");
                self.expr(*right, ASSIGN);
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                self.expr(*test, CONDITIONAL + 1);
                self.write(" ? ");
                self.expr(*consequent, ASSIGN);
                self.write(" : ");
                self.expr(*alternate, ASSIGN);
            }
            NodeKind::CallExpression {
                callee,
                arguments,
                optional,
            } => {
                self.expr(*callee, CALL);
                if *optional {
                    self.write("?.");
                }
                self.write("(");
                self.expr_list(arguments);
                self.write(")");
            }
            NodeKind::NewExpression { callee, arguments } => {
                self.write("new ");
                if self.has_call_in_chain(*callee) {
                    self.write("(");
                    self.expr(*callee, SEQUENCE);
                    self.write(")");
                } else {
                    self.expr(*callee, CALL);
                }
                self.write("(");
                self.expr_list(arguments);
                self.write(")");
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional,
            } => {
                // `1.x` would lex as a number
                let bare_integer = matches!(
                    ast.kind(*object),
                    NodeKind::Literal(Literal::Number { raw, .. })
                        if raw.bytes().all(|b| b.is_ascii_digit())
                );
                if bare_integer {
                    self.write("(");
                    self.expr(*object, SEQUENCE);
                    self.write(")");
                } else {
                    self.expr(*object, CALL);
                }
                match (*computed, *optional) {
                    (true, true) => self.write("?.["),
                    (true, false) => self.write("["),
                    (false, true) => self.write("?."),
                    (false, false) => self.write("."),
                }
                if *computed {
                    self.expr(*property, SEQUENCE);
                    self.write("]");
                } else {
                    self.expr(*property, PRIMARY);
                }
            }
            NodeKind::SequenceExpression { expressions } => {
                for (i, expression) in expressions.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.expr(*expression, ASSIGN);
                }
            }
            NodeKind::YieldExpression { argument, delegate } => {
                self.write(if *delegate { "yield*" } else { "yield" });
                if let Some(argument) = argument {
                    self.write(" ");
                    self.expr(*argument, ASSIGN);
                }
            }
            NodeKind::AwaitExpression { argument } => {
                self.write("await ");
                self.expr(*argument, UNARY);
            }
            NodeKind::MetaProperty { meta, property } => {
                self.write(meta);
                self.write(".");
                self.write(property);
            }
            NodeKind::ImportExpression { source } => {
                self.write("import(");
                self.expr(*source, ASSIGN);
                self.write(")");
            }
            _ => {}
        }
    }

    /// Mixing `??` with `&&`/`||` requires explicit parentheses.
    fn binary_operand(&mut self, parent: BinaryOperator, operand: NodeId, min: u8) {
        let mixed = match self.ast.kind(operand) {
            NodeKind::BinaryExpression { operator, .. } => {
                (parent == BinaryOperator::NullishCoalescing
                    && matches!(
                        operator,
                        BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr
                    ))
                    || (*operator == BinaryOperator::NullishCoalescing
                        && matches!(
                            parent,
                            BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr
                        ))
            }
            _ => false,
        };
        if mixed {
            self.write("(");
            self.expr(operand, SEQUENCE);
            self.write(")");
        } else {
            self.expr(operand, min);
        }
    }

    /// True if `{ key }` still reads the same, i.e. the value was not
    /// replaced by a later pass.
    fn shorthand_intact(&self, key: NodeId, value: NodeId) -> bool {
        let Some(name) = self.ast.identifier_name(key) else {
            return false;
        };
        match self.ast.kind(value) {
            NodeKind::Identifier { name: value_name } => value_name == name,
            NodeKind::AssignmentPattern { left, .. } => {
                self.ast.identifier_name(*left) == Some(name)
            }
            _ => false,
        }
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Number { value, raw } => {
                if raw.is_empty() {
                    self.write(&format_number(*value));
                } else {
                    self.write(raw);
                }
            }
            Literal::String { value, raw } => match raw {
                Some(raw) => self.write(raw),
                None => self.write(&quote(value)),
            },
            Literal::Boolean(value) => self.write(if *value { "true" } else { "false" }),
            Literal::Null => self.write("null"),
            Literal::BigInt(digits) => {
                self.write(digits);
                self.write("n");
            }
            Literal::RegExp { pattern, flags } => {
                self.write("/");
                self.write(pattern);
                self.write("/");
                self.write(flags);
            }
        }
    }
}

/// What an expression must not start with in a given position.
#[derive(Debug, Clone, Copy)]
enum StartRisk {
    /// `{` would open a block
    Brace,
    /// `function`/`class` would start a declaration
    Function,
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
