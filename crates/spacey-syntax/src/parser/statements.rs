// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statements, declarations, functions and classes.

use super::Parser;
use crate::ast::{Class, Function, MethodKind, NodeId, NodeKind, VariableKind};
use crate::error::Result;
use crate::lexer::TokenKind;

/// Whether a function or class must carry a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum NameRule {
    Required,
    Optional,
}

impl<'a> Parser<'a> {
    /// Parses a top-level item: an import/export declaration or a statement.
    pub(super) fn parse_module_item(&mut self) -> Result<NodeId> {
        match self.current.kind {
            TokenKind::Import
                if !self.peek_is(&TokenKind::LeftParen) && !self.peek_is(&TokenKind::Dot) =>
            {
                self.parse_import_declaration()
            }
            TokenKind::Export => self.parse_export_declaration(),
            _ => self.parse_statement(),
        }
    }

    /// Parses a single statement.
    pub(super) fn parse_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        match &self.current.kind {
            TokenKind::LeftBrace => self.parse_block_statement(),
            TokenKind::Var => self.parse_variable_statement(VariableKind::Var),
            TokenKind::Let => self.parse_variable_statement(VariableKind::Let),
            TokenKind::Const => self.parse_variable_statement(VariableKind::Const),
            TokenKind::Function => self.parse_function_declaration(false, NameRule::Required),
            TokenKind::Async
                if self.peek_is(&TokenKind::Function) && !self.peek_token().newline_before =>
            {
                self.advance();
                self.parse_function_declaration(true, NameRule::Required)
            }
            TokenKind::Class => self.parse_class(true, NameRule::Required),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::With => Err(self.error("Strict mode code may not include a with statement")),
            TokenKind::Debugger => {
                self.advance();
                self.consume_semicolon()?;
                Ok(self.node(NodeKind::DebuggerStatement, start))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(self.node(NodeKind::EmptyStatement, start))
            }
            TokenKind::Identifier(label) if self.peek_is(&TokenKind::Colon) => {
                let label = label.clone();
                self.advance();
                self.advance();
                let body = self.parse_statement()?;
                Ok(self.node(NodeKind::LabeledStatement { label, body }, start))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(self.node(NodeKind::ExpressionStatement { expression }, start))
    }

    pub(super) fn parse_block_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let body = self.parse_block_body()?;
        Ok(self.node(NodeKind::BlockStatement { body }, start))
    }

    /// Parses `{ statements }` and returns the statements.
    fn parse_block_body(&mut self) -> Result<Vec<NodeId>> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_variable_statement(&mut self, kind: VariableKind) -> Result<NodeId> {
        let declaration = self.parse_variable_declaration(kind)?;
        self.consume_semicolon()?;
        // Stretch the span over the semicolon
        let span = self.ast.span(declaration).to(self.previous.span);
        let node = self.ast.kind(declaration).clone();
        Ok(self.ast.alloc(node, span))
    }

    /// Parses a declaration without its terminating semicolon.
    pub(super) fn parse_variable_declaration(&mut self, kind: VariableKind) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume keyword

        let mut declarations = Vec::new();
        loop {
            let decl_start = self.current.span.start;
            let id = self.parse_binding_target()?;
            let init = if self.eat(&TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(self.node(NodeKind::VariableDeclarator { id, init }, decl_start));

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(self.node(
            NodeKind::VariableDeclaration { kind, declarations },
            start,
        ))
    }

    fn parse_if_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.with_in(true, |p| p.parse_expression())?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat(&TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(self.node(
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    fn parse_switch_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'switch'
        self.expect(&TokenKind::LeftParen)?;
        let discriminant = self.with_in(true, |p| p.parse_expression())?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::LeftBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let case_start = self.current.span.start;
            let test = if self.eat(&TokenKind::Case) {
                Some(self.with_in(true, |p| p.parse_expression())?)
            } else {
                self.expect(&TokenKind::Default)?;
                None
            };
            self.expect(&TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(self.node(NodeKind::SwitchCase { test, consequent }, case_start));
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(self.node(
            NodeKind::SwitchStatement {
                discriminant,
                cases,
            },
            start,
        ))
    }

    fn parse_while_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.with_in(true, |p| p.parse_expression())?;
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_statement()?;
        Ok(self.node(NodeKind::WhileStatement { test, body }, start))
    }

    fn parse_do_while_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'do'
        let body = self.parse_statement()?;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let test = self.with_in(true, |p| p.parse_expression())?;
        self.expect(&TokenKind::RightParen)?;
        // A semicolon is always inserted after do-while
        self.eat(&TokenKind::Semicolon);
        Ok(self.node(NodeKind::DoWhileStatement { body, test }, start))
    }

    fn parse_for_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'for'
        let is_await = self.eat(&TokenKind::Await);
        self.expect(&TokenKind::LeftParen)?;

        let init = match self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let kind = match self.current.kind {
                    TokenKind::Var => VariableKind::Var,
                    TokenKind::Let => VariableKind::Let,
                    _ => VariableKind::Const,
                };
                Some(self.with_in(false, |p| p.parse_variable_declaration(kind))?)
            }
            _ => Some(self.with_in(false, |p| p.parse_expression())?),
        };

        if let Some(left) = init {
            let is_of = self.check_contextual("of");
            if is_of || self.check(&TokenKind::In) {
                let left = if matches!(self.ast.kind(left), NodeKind::VariableDeclaration { .. }) {
                    left
                } else {
                    self.to_pattern(left, false)?
                };
                self.advance(); // consume 'of' / 'in'
                let right = if is_of {
                    self.with_in(true, |p| p.parse_assignment())?
                } else {
                    self.with_in(true, |p| p.parse_expression())?
                };
                self.expect(&TokenKind::RightParen)?;
                let body = self.parse_statement()?;
                let kind = if is_of {
                    NodeKind::ForOfStatement {
                        left,
                        right,
                        body,
                        is_await,
                    }
                } else {
                    NodeKind::ForInStatement { left, right, body }
                };
                return Ok(self.node(kind, start));
            }
        }

        self.expect(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.with_in(true, |p| p.parse_expression())?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.with_in(true, |p| p.parse_expression())?)
        };
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_statement()?;

        Ok(self.node(
            NodeKind::ForStatement {
                init,
                test,
                update,
                body,
            },
            start,
        ))
    }

    fn parse_return_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'return'
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(self.node(NodeKind::ReturnStatement { argument }, start))
    }

    /// Parses `break` or `continue` with an optional label.
    fn parse_jump_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let is_break = self.check(&TokenKind::Break);
        self.advance();

        // No line terminator is allowed before the label
        let label = match &self.current.kind {
            TokenKind::Identifier(label) if !self.current.newline_before => {
                let label = label.clone();
                self.advance();
                Some(label)
            }
            _ => None,
        };
        self.consume_semicolon()?;

        let kind = if is_break {
            NodeKind::BreakStatement { label }
        } else {
            NodeKind::ContinueStatement { label }
        };
        Ok(self.node(kind, start))
    }

    fn parse_throw_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'throw'
        if self.current.newline_before {
            return Err(self.error("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(self.node(NodeKind::ThrowStatement { argument }, start))
    }

    fn parse_try_statement(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'try'
        let block = self.parse_block_statement()?;

        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current.span.start;
            self.advance();
            let param = if self.eat(&TokenKind::LeftParen) {
                let param = self.parse_binding_target()?;
                self.expect(&TokenKind::RightParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block_statement()?;
            Some(self.node(NodeKind::CatchClause { param, body }, catch_start))
        } else {
            None
        };

        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }

        Ok(self.node(
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            },
            start,
        ))
    }

    /// Parses a function declaration; `async` has already been consumed.
    pub(super) fn parse_function_declaration(
        &mut self,
        is_async: bool,
        name: NameRule,
    ) -> Result<NodeId> {
        let start = if is_async {
            self.previous.span.start
        } else {
            self.current.span.start
        };
        let function = self.parse_function(is_async, name)?;
        Ok(self.node(NodeKind::FunctionDeclaration(function), start))
    }

    /// Parses `function* name(params) { body }` from the `function` keyword.
    pub(super) fn parse_function(&mut self, is_async: bool, name: NameRule) -> Result<Function> {
        self.expect(&TokenKind::Function)?;
        let is_generator = self.eat(&TokenKind::Star);

        let id = if self.at_binding_identifier() {
            Some(self.expect_binding_identifier()?)
        } else if name == NameRule::Required {
            return Err(self.error("Function statements require a function name"));
        } else {
            None
        };

        let (params, body) = self.parse_function_rest(is_async, is_generator)?;
        Ok(Function {
            id,
            params,
            body,
            is_async,
            is_generator,
        })
    }

    /// Parses `(params) { body }`.
    pub(super) fn parse_function_rest(
        &mut self,
        is_async: bool,
        is_generator: bool,
    ) -> Result<(Vec<NodeId>, NodeId)> {
        self.in_function(is_async, is_generator, |p| {
            let params = p.parse_formal_parameters()?;
            let body = p.parse_block_statement()?;
            Ok((params, body))
        })
    }

    fn parse_formal_parameters(&mut self) -> Result<Vec<NodeId>> {
        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            if self.check(&TokenKind::Ellipsis) {
                let start = self.current.span.start;
                self.advance();
                let argument = self.parse_binding_target()?;
                params.push(self.node(NodeKind::RestElement { argument }, start));
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(params)
    }

    /// Parses a class declaration (`declaration == true`) or expression.
    pub(super) fn parse_class(&mut self, declaration: bool, name: NameRule) -> Result<NodeId> {
        let start = self.current.span.start;
        self.expect(&TokenKind::Class)?;

        let id = if self.at_binding_identifier() {
            Some(self.expect_binding_identifier()?)
        } else if name == NameRule::Required {
            return Err(self.error("Class statements require a class name"));
        } else {
            None
        };

        let super_class = if self.eat(&TokenKind::Extends) {
            Some(self.parse_left_hand_side()?)
        } else {
            None
        };

        let body_start = self.current.span.start;
        self.expect(&TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        let body = self.node(NodeKind::ClassBody { body: members }, body_start);

        let class = Class {
            id,
            super_class,
            body,
        };
        let kind = if declaration {
            NodeKind::ClassDeclaration(class)
        } else {
            NodeKind::ClassExpression(class)
        };
        Ok(self.node(kind, start))
    }

    /// True when the token after a modifier keyword ends a member name,
    /// meaning the keyword is itself the member name.
    pub(super) fn modifier_is_name(&self) -> bool {
        matches!(
            self.peek_token().kind,
            TokenKind::LeftParen
                | TokenKind::Equal
                | TokenKind::Semicolon
                | TokenKind::RightBrace
                | TokenKind::Comma
                | TokenKind::Colon
        )
    }

    fn parse_class_member(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;

        let mut is_static = false;
        if self.check(&TokenKind::Static) && !self.modifier_is_name() {
            self.advance();
            is_static = true;
            if self.check(&TokenKind::LeftBrace) {
                let body = self.in_function(false, false, |p| p.parse_block_body())?;
                return Ok(self.node(NodeKind::StaticBlock { body }, start));
            }
        }

        let mut is_async = false;
        if self.check(&TokenKind::Async)
            && !self.modifier_is_name()
            && !self.peek_token().newline_before
        {
            self.advance();
            is_async = true;
        }
        let is_generator = self.eat(&TokenKind::Star);

        let mut kind = MethodKind::Method;
        if !is_async && !is_generator && !self.modifier_is_name() {
            if self.check_contextual("get") {
                self.advance();
                kind = MethodKind::Get;
            } else if self.check_contextual("set") {
                self.advance();
                kind = MethodKind::Set;
            }
        }

        let (key, computed) = self.parse_property_key()?;

        if self.check(&TokenKind::LeftParen) {
            let value_start = self.current.span.start;
            let (params, body) = self.parse_function_rest(is_async, is_generator)?;
            let value = self.node(
                NodeKind::FunctionExpression(Function {
                    id: None,
                    params,
                    body,
                    is_async,
                    is_generator,
                }),
                value_start,
            );
            if kind == MethodKind::Method
                && !computed
                && !is_static
                && self.ast.identifier_name(key) == Some("constructor")
            {
                kind = MethodKind::Constructor;
            }
            return Ok(self.node(
                NodeKind::MethodDefinition {
                    key,
                    value,
                    kind,
                    computed,
                    is_static,
                },
                start,
            ));
        }

        let value = if self.eat(&TokenKind::Equal) {
            Some(self.in_function(false, false, |p| p.parse_assignment())?)
        } else {
            None
        };
        self.consume_semicolon()?;
        Ok(self.node(
            NodeKind::PropertyDefinition {
                key,
                value,
                computed,
                is_static,
            },
            start,
        ))
    }
}
