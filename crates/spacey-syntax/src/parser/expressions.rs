// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expressions, literals, binding patterns and the arrow cover grammar.
//!
//! A parenthesized list is parsed as an expression first. When `=>`
//! follows, the recorded list is reinterpreted as parameters and each item
//! is converted into a pattern in place.

use super::Parser;
use super::statements::NameRule;
use crate::ast::{
    AssignmentOperator, BinaryOperator, Function, Literal, NodeId, NodeKind, PropertyKind,
    TemplateElement, UnaryOperator, UpdateOperator,
};
use crate::error::Result;
use crate::lexer::TokenKind;

fn binary_operator(kind: &TokenKind, allow_in: bool) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Percent => BinaryOperator::Modulo,
        TokenKind::StarStar => BinaryOperator::Exponent,
        TokenKind::EqualEqual => BinaryOperator::Equal,
        TokenKind::NotEqual => BinaryOperator::NotEqual,
        TokenKind::StrictEqual => BinaryOperator::StrictEqual,
        TokenKind::StrictNotEqual => BinaryOperator::StrictNotEqual,
        TokenKind::LessThan => BinaryOperator::LessThan,
        TokenKind::LessThanEqual => BinaryOperator::LessThanEqual,
        TokenKind::GreaterThan => BinaryOperator::GreaterThan,
        TokenKind::GreaterThanEqual => BinaryOperator::GreaterThanEqual,
        TokenKind::AmpersandAmpersand => BinaryOperator::LogicalAnd,
        TokenKind::PipePipe => BinaryOperator::LogicalOr,
        TokenKind::QuestionQuestion => BinaryOperator::NullishCoalescing,
        TokenKind::Ampersand => BinaryOperator::BitwiseAnd,
        TokenKind::Pipe => BinaryOperator::BitwiseOr,
        TokenKind::Caret => BinaryOperator::BitwiseXor,
        TokenKind::LeftShift => BinaryOperator::LeftShift,
        TokenKind::RightShift => BinaryOperator::RightShift,
        TokenKind::UnsignedRightShift => BinaryOperator::UnsignedRightShift,
        TokenKind::Instanceof => BinaryOperator::InstanceOf,
        TokenKind::In if allow_in => BinaryOperator::In,
        _ => return None,
    };
    Some(op)
}

fn assignment_operator(kind: &TokenKind) -> Option<AssignmentOperator> {
    let op = match kind {
        TokenKind::Equal => AssignmentOperator::Assign,
        TokenKind::PlusEqual => AssignmentOperator::AddAssign,
        TokenKind::MinusEqual => AssignmentOperator::SubtractAssign,
        TokenKind::StarEqual => AssignmentOperator::MultiplyAssign,
        TokenKind::SlashEqual => AssignmentOperator::DivideAssign,
        TokenKind::PercentEqual => AssignmentOperator::ModuloAssign,
        TokenKind::StarStarEqual => AssignmentOperator::ExponentAssign,
        TokenKind::LeftShiftEqual => AssignmentOperator::LeftShiftAssign,
        TokenKind::RightShiftEqual => AssignmentOperator::RightShiftAssign,
        TokenKind::UnsignedRightShiftEqual => AssignmentOperator::UnsignedRightShiftAssign,
        TokenKind::AmpersandEqual => AssignmentOperator::BitwiseAndAssign,
        TokenKind::PipeEqual => AssignmentOperator::BitwiseOrAssign,
        TokenKind::CaretEqual => AssignmentOperator::BitwiseXorAssign,
        TokenKind::AmpersandAmpersandEqual => AssignmentOperator::LogicalAndAssign,
        TokenKind::PipePipeEqual => AssignmentOperator::LogicalOrAssign,
        TokenKind::QuestionQuestionEqual => AssignmentOperator::NullishCoalescingAssign,
        _ => return None,
    };
    Some(op)
}

fn unary_operator(kind: &TokenKind) -> Option<UnaryOperator> {
    let op = match kind {
        TokenKind::Minus => UnaryOperator::Minus,
        TokenKind::Plus => UnaryOperator::Plus,
        TokenKind::Bang => UnaryOperator::LogicalNot,
        TokenKind::Tilde => UnaryOperator::BitwiseNot,
        TokenKind::Typeof => UnaryOperator::Typeof,
        TokenKind::Void => UnaryOperator::Void,
        TokenKind::Delete => UnaryOperator::Delete,
        _ => return None,
    };
    Some(op)
}

impl<'a> Parser<'a> {
    /// Parses a comma-separated expression.
    pub(super) fn parse_expression(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.eat(&TokenKind::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.node(NodeKind::SequenceExpression { expressions }, start))
    }

    /// Parses an AssignmentExpression, including arrows and `yield`.
    pub(super) fn parse_assignment(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;

        if self.check(&TokenKind::Yield) && self.in_generator {
            return self.parse_yield();
        }

        // async x => ...
        if self.check(&TokenKind::Async) {
            let mut lookahead = self.scanner.clone();
            let param = lookahead.next_token();
            let arrow = lookahead.next_token();
            if matches!(param.kind, TokenKind::Identifier(_))
                && !param.newline_before
                && arrow.kind == TokenKind::Arrow
            {
                self.advance(); // consume 'async'
                let param = self.expect_binding_identifier()?;
                return self.parse_arrow_body(start, vec![param], true);
            }
        }

        // x => ...
        if self.at_binding_identifier() && self.peek_is(&TokenKind::Arrow) {
            let param = self.expect_binding_identifier()?;
            return self.parse_arrow_body(start, vec![param], false);
        }

        let left = self.parse_conditional()?;

        if self.check(&TokenKind::Arrow) {
            let Some(items) = self.covers.remove(&left) else {
                return Err(self.unexpected());
            };
            if self.current.newline_before {
                return Err(self.unexpected());
            }
            let is_async = matches!(self.ast.kind(left), NodeKind::CallExpression { .. });
            let params = items
                .into_iter()
                .map(|item| self.to_parameter(item))
                .collect::<Result<Vec<_>>>()?;
            return self.parse_arrow_body(start, params, is_async);
        }

        let Some(operator) = assignment_operator(&self.current.kind) else {
            return Ok(left);
        };

        let left = if operator == AssignmentOperator::Assign {
            self.to_pattern(left, false)?
        } else if self.is_simple_target(left) {
            left
        } else {
            return Err(self.error("Invalid left-hand side in assignment"));
        };
        self.advance(); // consume operator
        let right = self.parse_assignment()?;

        Ok(self.node(
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            },
            start,
        ))
    }

    /// Parses `=> body` for the given parameters.
    fn parse_arrow_body(
        &mut self,
        start: usize,
        params: Vec<NodeId>,
        is_async: bool,
    ) -> Result<NodeId> {
        self.expect(&TokenKind::Arrow)?;
        let (body, expression) = self.in_function(is_async, false, |p| {
            if p.check(&TokenKind::LeftBrace) {
                Ok((p.parse_block_statement()?, false))
            } else {
                Ok((p.parse_assignment()?, true))
            }
        })?;
        Ok(self.node(
            NodeKind::ArrowFunctionExpression {
                params,
                body,
                expression,
                is_async,
            },
            start,
        ))
    }

    fn parse_yield(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'yield'

        let ends = self.current.newline_before
            || matches!(
                self.current.kind,
                TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::RightBrace
                    | TokenKind::Comma
                    | TokenKind::Semicolon
                    | TokenKind::Colon
                    | TokenKind::Eof
            );
        let (argument, delegate) = if ends {
            (None, false)
        } else {
            let delegate = self.eat(&TokenKind::Star);
            (Some(self.parse_assignment()?), delegate)
        };
        Ok(self.node(NodeKind::YieldExpression { argument, delegate }, start))
    }

    fn parse_conditional(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let test = self.parse_binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.with_in(true, |p| p.parse_assignment())?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;
        Ok(self.node(
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            },
            start,
        ))
    }

    /// Precedence climbing over binary operators binding at least `min`.
    fn parse_binary(&mut self, min: u8) -> Result<NodeId> {
        let start = self.current.span.start;
        let mut left = self.parse_unary()?;

        while let Some(operator) = binary_operator(&self.current.kind, self.allow_in) {
            let precedence = operator.precedence();
            if precedence < min {
                break;
            }
            self.advance();
            // `**` is right-associative
            let next = if operator == BinaryOperator::Exponent {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_binary(next)?;
            left = self.node(
                NodeKind::BinaryExpression {
                    operator,
                    left,
                    right,
                },
                start,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;

        if let Some(operator) = unary_operator(&self.current.kind) {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.node(NodeKind::UnaryExpression { operator, argument }, start));
        }

        let update = match self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOperator::Increment),
            TokenKind::MinusMinus => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.advance();
            let argument = self.parse_unary()?;
            if !self.is_simple_target(argument) {
                return Err(self.error("Invalid left-hand side expression in prefix operation"));
            }
            return Ok(self.node(
                NodeKind::UpdateExpression {
                    operator,
                    prefix: true,
                    argument,
                },
                start,
            ));
        }

        if self.check(&TokenKind::Await) {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.node(NodeKind::AwaitExpression { argument }, start));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let argument = self.parse_left_hand_side()?;

        // No line terminator is allowed before a postfix operator
        let operator = match self.current.kind {
            TokenKind::PlusPlus if !self.current.newline_before => UpdateOperator::Increment,
            TokenKind::MinusMinus if !self.current.newline_before => UpdateOperator::Decrement,
            _ => return Ok(argument),
        };
        if !self.is_simple_target(argument) {
            return Err(self.error("Invalid left-hand side expression in postfix operation"));
        }
        self.advance();
        Ok(self.node(
            NodeKind::UpdateExpression {
                operator,
                prefix: false,
                argument,
            },
            start,
        ))
    }

    /// Parses member accesses, calls and tagged templates.
    pub(super) fn parse_left_hand_side(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let async_callee = self.check(&TokenKind::Async);
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_member_name()?;
                    expr = self.member(start, expr, property, false, false);
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    if self.check(&TokenKind::LeftParen) {
                        let arguments = self.parse_arguments()?;
                        expr = self.node(
                            NodeKind::CallExpression {
                                callee: expr,
                                arguments,
                                optional: true,
                            },
                            start,
                        );
                    } else if self.eat(&TokenKind::LeftBracket) {
                        let property = self.with_in(true, |p| p.parse_expression())?;
                        self.expect(&TokenKind::RightBracket)?;
                        expr = self.member(start, expr, property, true, true);
                    } else {
                        let property = self.parse_member_name()?;
                        expr = self.member(start, expr, property, false, true);
                    }
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let property = self.with_in(true, |p| p.parse_expression())?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = self.member(start, expr, property, true, false);
                }
                TokenKind::LeftParen => {
                    // `async (...)` may still turn into arrow parameters
                    let cover = async_callee
                        && self.ast.identifier_name(expr) == Some("async")
                        && !self.current.newline_before;
                    let arguments = self.parse_arguments()?;
                    let items = arguments.clone();
                    expr = self.node(
                        NodeKind::CallExpression {
                            callee: expr,
                            arguments,
                            optional: false,
                        },
                        start,
                    );
                    if cover {
                        self.covers.insert(expr, items);
                    }
                }
                TokenKind::Template { .. } => {
                    let quasi = self.parse_template()?;
                    expr = self.node(NodeKind::TaggedTemplateExpression { tag: expr, quasi }, start);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn member(
        &mut self,
        start: usize,
        object: NodeId,
        property: NodeId,
        computed: bool,
        optional: bool,
    ) -> NodeId {
        self.node(
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional,
            },
            start,
        )
    }

    /// Parses the name after `.`: an IdentifierName or a private name.
    fn parse_member_name(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        if let TokenKind::PrivateIdentifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            return Ok(self.node(NodeKind::PrivateName { name }, start));
        }
        let name = self.expect_identifier_name()?;
        Ok(self.node(NodeKind::Identifier { name }, start))
    }

    fn parse_new(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'new'

        if self.eat(&TokenKind::Dot) {
            self.expect_contextual("target")?;
            return Ok(self.node(
                NodeKind::MetaProperty {
                    meta: "new".into(),
                    property: "target".into(),
                },
                start,
            ));
        }

        let callee_start = self.current.span.start;
        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat(&TokenKind::Dot) {
                let property = self.parse_member_name()?;
                callee = self.member(callee_start, callee, property, false, false);
            } else if self.eat(&TokenKind::LeftBracket) {
                let property = self.with_in(true, |p| p.parse_expression())?;
                self.expect(&TokenKind::RightBracket)?;
                callee = self.member(callee_start, callee, property, true, false);
            } else {
                break;
            }
        }

        let arguments = if self.check(&TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(self.node(NodeKind::NewExpression { callee, arguments }, start))
    }

    fn parse_arguments(&mut self) -> Result<Vec<NodeId>> {
        self.expect(&TokenKind::LeftParen)?;
        let mut arguments = Vec::new();
        self.with_in(true, |p| {
            while !p.check(&TokenKind::RightParen) {
                arguments.push(p.parse_spread_or_assignment()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RightParen)?;
        Ok(arguments)
    }

    fn parse_spread_or_assignment(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        if self.eat(&TokenKind::Ellipsis) {
            let argument = self.parse_assignment()?;
            return Ok(self.node(NodeKind::SpreadElement { argument }, start));
        }
        self.parse_assignment()
    }

    fn parse_primary(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let kind = match &self.current.kind {
            TokenKind::This => NodeKind::ThisExpression,
            TokenKind::Super => NodeKind::Super,
            TokenKind::Identifier(name) => NodeKind::Identifier { name: name.clone() },
            TokenKind::Async => {
                if self.peek_is(&TokenKind::Function) && !self.peek_token().newline_before {
                    self.advance();
                    let function = self.parse_function(true, NameRule::Optional)?;
                    return Ok(self.node(NodeKind::FunctionExpression(function), start));
                }
                NodeKind::Identifier {
                    name: "async".into(),
                }
            }
            TokenKind::Number(value) => NodeKind::Literal(Literal::Number {
                value: *value,
                raw: self.source[self.current.span.start..self.current.span.end].to_string(),
            }),
            TokenKind::BigInt(digits) => NodeKind::Literal(Literal::BigInt(digits.clone())),
            TokenKind::String(value) => NodeKind::Literal(Literal::String {
                value: value.clone(),
                raw: Some(self.source[self.current.span.start..self.current.span.end].to_string()),
            }),
            TokenKind::True => NodeKind::Literal(Literal::Boolean(true)),
            TokenKind::False => NodeKind::Literal(Literal::Boolean(false)),
            TokenKind::Null => NodeKind::Literal(Literal::Null),
            TokenKind::Slash | TokenKind::SlashEqual => return self.parse_regex(),
            TokenKind::Template { .. } => return self.parse_template(),
            TokenKind::LeftBracket => return self.parse_array_literal(),
            TokenKind::LeftBrace => return self.parse_object_literal(),
            TokenKind::LeftParen => return self.parse_parenthesized(),
            TokenKind::Function => {
                let function = self.parse_function(false, NameRule::Optional)?;
                return Ok(self.node(NodeKind::FunctionExpression(function), start));
            }
            TokenKind::Class => return self.parse_class(false, NameRule::Optional),
            TokenKind::Import => return self.parse_import_expression(),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(self.node(kind, start))
    }

    /// Parses `import(source)` or `import.meta`.
    fn parse_import_expression(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'import'

        if self.eat(&TokenKind::Dot) {
            self.expect_contextual("meta")?;
            return Ok(self.node(
                NodeKind::MetaProperty {
                    meta: "import".into(),
                    property: "meta".into(),
                },
                start,
            ));
        }

        self.expect(&TokenKind::LeftParen)?;
        let source = self.with_in(true, |p| p.parse_assignment())?;
        self.eat(&TokenKind::Comma);
        self.expect(&TokenKind::RightParen)?;
        Ok(self.node(NodeKind::ImportExpression { source }, start))
    }

    fn parse_regex(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let newline_before = self.current.newline_before;
        self.current = self.scanner.rescan_regex(start);
        self.current.newline_before = newline_before;

        let kind = match &self.current.kind {
            TokenKind::RegExp { pattern, flags } => NodeKind::Literal(Literal::RegExp {
                pattern: pattern.clone(),
                flags: flags.clone(),
            }),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(self.node(kind, start))
    }

    /// Parses a template literal starting at the current chunk.
    fn parse_template(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();

        loop {
            let TokenKind::Template { cooked, raw, tail } = &self.current.kind else {
                return Err(self.unexpected());
            };
            let tail = *tail;
            quasis.push(TemplateElement {
                cooked: cooked.clone(),
                raw: raw.clone(),
            });
            self.advance();
            if tail {
                break;
            }

            expressions.push(self.with_in(true, |p| p.parse_expression())?);
            if !self.check(&TokenKind::RightBrace) {
                return Err(self.unexpected());
            }
            let newline_before = self.current.newline_before;
            self.current = self
                .scanner
                .rescan_template_continuation(self.current.span.start);
            self.current.newline_before = newline_before;
            if let TokenKind::Invalid(message) = &self.current.kind {
                return Err(self.error(message.clone()));
            }
        }

        Ok(self.node(
            NodeKind::TemplateLiteral {
                quasis,
                expressions,
            },
            start,
        ))
    }

    fn parse_array_literal(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume '['
        let mut elements = Vec::new();

        self.with_in(true, |p| {
            while !p.check(&TokenKind::RightBracket) {
                if p.eat(&TokenKind::Comma) {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_spread_or_assignment()?));
                if !p.check(&TokenKind::RightBracket) {
                    p.expect(&TokenKind::Comma)?;
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RightBracket)?;

        Ok(self.node(NodeKind::ArrayExpression { elements }, start))
    }

    fn parse_object_literal(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume '{'
        let mut properties = Vec::new();

        self.with_in(true, |p| {
            while !p.check(&TokenKind::RightBrace) {
                properties.push(p.parse_object_member()?);
                if !p.check(&TokenKind::RightBrace) {
                    p.expect(&TokenKind::Comma)?;
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RightBrace)?;

        Ok(self.node(NodeKind::ObjectExpression { properties }, start))
    }

    fn parse_object_member(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;

        if self.eat(&TokenKind::Ellipsis) {
            let argument = self.parse_assignment()?;
            return Ok(self.node(NodeKind::SpreadElement { argument }, start));
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

        let mut kind = PropertyKind::Init;
        if !is_async && !is_generator && !self.modifier_is_name() {
            if self.check_contextual("get") {
                self.advance();
                kind = PropertyKind::Get;
            } else if self.check_contextual("set") {
                self.advance();
                kind = PropertyKind::Set;
            }
        }

        let shorthand_candidate = self.at_binding_identifier();
        let (key, computed) = self.parse_property_key()?;

        if kind != PropertyKind::Init || is_async || is_generator || self.check(&TokenKind::LeftParen)
        {
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
            return Ok(self.node(
                NodeKind::Property {
                    key,
                    value,
                    kind,
                    computed,
                    shorthand: false,
                    method: kind == PropertyKind::Init,
                },
                start,
            ));
        }

        if self.eat(&TokenKind::Colon) {
            let value = self.parse_assignment()?;
            return Ok(self.node(
                NodeKind::Property {
                    key,
                    value,
                    kind,
                    computed,
                    shorthand: false,
                    method: false,
                },
                start,
            ));
        }

        if !shorthand_candidate || computed {
            return Err(self.unexpected());
        }
        let value = self.shorthand_value(key)?;
        Ok(self.node(
            NodeKind::Property {
                key,
                value,
                kind,
                computed: false,
                shorthand: true,
                method: false,
            },
            start,
        ))
    }

    /// Builds the value of `{ key }` or `{ key = init }` as a separate node.
    fn shorthand_value(&mut self, key: NodeId) -> Result<NodeId> {
        let name = self.ast.identifier_name(key).unwrap_or_default().to_string();
        if name == "yield" || name == "await" {
            return Err(self.error(format!("Unexpected reserved word '{}'", name)));
        }
        let span = self.ast.span(key);
        let value = self.ast.alloc(NodeKind::Identifier { name }, span);

        if !self.check(&TokenKind::Equal) {
            return Ok(value);
        }
        self.advance();
        let right = self.parse_assignment()?;
        Ok(self.node(NodeKind::AssignmentPattern { left: value, right }, span.start))
    }

    /// Parses a property name. Returns the key node and whether it is computed.
    pub(super) fn parse_property_key(&mut self) -> Result<(NodeId, bool)> {
        let start = self.current.span.start;

        if self.eat(&TokenKind::LeftBracket) {
            let key = self.with_in(true, |p| p.parse_assignment())?;
            self.expect(&TokenKind::RightBracket)?;
            return Ok((key, true));
        }

        let kind = match &self.current.kind {
            TokenKind::String(value) => NodeKind::Literal(Literal::String {
                value: value.clone(),
                raw: Some(self.source[self.current.span.start..self.current.span.end].to_string()),
            }),
            TokenKind::Number(value) => NodeKind::Literal(Literal::Number {
                value: *value,
                raw: self.source[self.current.span.start..self.current.span.end].to_string(),
            }),
            TokenKind::BigInt(digits) => NodeKind::Literal(Literal::BigInt(digits.clone())),
            TokenKind::PrivateIdentifier(name) => NodeKind::PrivateName { name: name.clone() },
            other => match other.identifier_name() {
                Some(name) => NodeKind::Identifier { name },
                None => return Err(self.unexpected()),
            },
        };
        self.advance();
        Ok((self.node(kind, start), false))
    }

    /// Parses `( ... )`, recording the items in case `=>` follows.
    fn parse_parenthesized(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume '('

        let mut items = Vec::new();
        let mut arrow_only = false;
        self.with_in(true, |p| {
            while !p.check(&TokenKind::RightParen) {
                if p.check(&TokenKind::Ellipsis) {
                    let rest_start = p.current.span.start;
                    p.advance();
                    let argument = p.parse_binding_target()?;
                    items.push(p.node(NodeKind::RestElement { argument }, rest_start));
                    arrow_only = true;
                    break;
                }
                items.push(p.parse_assignment()?);
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
                if p.check(&TokenKind::RightParen) {
                    arrow_only = true;
                }
            }
            Ok(())
        })?;
        self.expect(&TokenKind::RightParen)?;

        if items.is_empty() {
            arrow_only = true;
        }
        if arrow_only && !self.check(&TokenKind::Arrow) {
            return Err(self.unexpected());
        }

        let expr = if items.len() == 1 && !arrow_only {
            items[0]
        } else {
            self.node(
                NodeKind::SequenceExpression {
                    expressions: items.clone(),
                },
                start,
            )
        };
        self.covers.insert(expr, items);
        Ok(expr)
    }

    /// True for targets of compound assignment and update operators.
    fn is_simple_target(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::Identifier { .. } | NodeKind::MemberExpression { .. }
        )
    }

    /// Converts an arrow cover item into a parameter pattern.
    fn to_parameter(&mut self, item: NodeId) -> Result<NodeId> {
        self.to_element(item, true)
    }

    /// Converts a list element, turning a spread into a rest element.
    fn to_element(&mut self, item: NodeId, binding: bool) -> Result<NodeId> {
        match self.ast.kind(item).clone() {
            NodeKind::SpreadElement { argument } => {
                let argument = self.to_pattern(argument, binding)?;
                self.ast.replace(item, NodeKind::RestElement { argument });
                Ok(item)
            }
            NodeKind::RestElement { .. } => Ok(item),
            _ => self.to_pattern(item, binding),
        }
    }

    /// Reinterprets an expression as a destructuring pattern, in place.
    ///
    /// Member expressions are valid assignment targets but not bindings.
    pub(super) fn to_pattern(&mut self, id: NodeId, binding: bool) -> Result<NodeId> {
        match self.ast.kind(id).clone() {
            NodeKind::Identifier { .. }
            | NodeKind::ObjectPattern { .. }
            | NodeKind::ArrayPattern { .. }
            | NodeKind::RestElement { .. } => {}
            NodeKind::AssignmentPattern { left, .. } => {
                self.to_pattern(left, binding)?;
            }
            NodeKind::MemberExpression { .. } if !binding => {}
            NodeKind::ArrayExpression { elements } => {
                for element in elements.iter().flatten() {
                    self.to_element(*element, binding)?;
                }
                self.ast.replace(id, NodeKind::ArrayPattern { elements });
            }
            NodeKind::ObjectExpression { properties } => {
                for property in &properties {
                    match self.ast.kind(*property).clone() {
                        NodeKind::Property {
                            value,
                            kind: PropertyKind::Init,
                            method: false,
                            ..
                        } => {
                            self.to_pattern(value, binding)?;
                        }
                        NodeKind::SpreadElement { argument } => {
                            let argument = self.to_pattern(argument, binding)?;
                            self.ast
                                .replace(*property, NodeKind::RestElement { argument });
                        }
                        _ => return Err(self.invalid_target(binding)),
                    }
                }
                self.ast.replace(id, NodeKind::ObjectPattern { properties });
            }
            NodeKind::AssignmentExpression {
                operator: AssignmentOperator::Assign,
                left,
                right,
            } => {
                self.to_pattern(left, binding)?;
                self.ast
                    .replace(id, NodeKind::AssignmentPattern { left, right });
            }
            _ => return Err(self.invalid_target(binding)),
        }
        Ok(id)
    }

    fn invalid_target(&self, binding: bool) -> crate::error::SyntaxError {
        if binding {
            self.error("Invalid destructuring target in parameter list")
        } else {
            self.error("Invalid destructuring assignment target")
        }
    }

    /// Parses a binding identifier or destructuring pattern.
    pub(super) fn parse_binding_target(&mut self) -> Result<NodeId> {
        match self.current.kind {
            TokenKind::LeftBracket => self.parse_array_pattern(),
            TokenKind::LeftBrace => self.parse_object_pattern(),
            _ => self.expect_binding_identifier(),
        }
    }

    /// Parses a binding target with an optional default value.
    pub(super) fn parse_binding_element(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let left = self.parse_binding_target()?;
        if !self.eat(&TokenKind::Equal) {
            return Ok(left);
        }
        let right = self.with_in(true, |p| p.parse_assignment())?;
        Ok(self.node(NodeKind::AssignmentPattern { left, right }, start))
    }

    fn parse_array_pattern(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume '['
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBracket) {
            if self.eat(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            if self.check(&TokenKind::Ellipsis) {
                let rest_start = self.current.span.start;
                self.advance();
                let argument = self.parse_binding_target()?;
                elements.push(Some(self.node(NodeKind::RestElement { argument }, rest_start)));
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightBracket)?;

        Ok(self.node(NodeKind::ArrayPattern { elements }, start))
    }

    fn parse_object_pattern(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume '{'
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RightBrace) {
            let prop_start = self.current.span.start;
            if self.eat(&TokenKind::Ellipsis) {
                let argument = self.expect_binding_identifier()?;
                properties.push(self.node(NodeKind::RestElement { argument }, prop_start));
                break;
            }

            let shorthand_candidate = self.at_binding_identifier();
            let (key, computed) = self.parse_property_key()?;
            let (value, shorthand) = if self.eat(&TokenKind::Colon) {
                (self.parse_binding_element()?, false)
            } else if shorthand_candidate && !computed {
                (self.shorthand_value(key)?, true)
            } else {
                return Err(self.unexpected());
            };
            properties.push(self.node(
                NodeKind::Property {
                    key,
                    value,
                    kind: PropertyKind::Init,
                    computed,
                    shorthand,
                    method: false,
                },
                prop_start,
            ));

            if !self.check(&TokenKind::RightBrace) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(self.node(NodeKind::ObjectPattern { properties }, start))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{first_stmt, parse_err, parse_ok};
    use crate::ast::{Ast, BinaryOperator, Literal, NodeId, NodeKind};

    fn expression(ast: &Ast) -> NodeId {
        match first_stmt(ast) {
            NodeKind::ExpressionStatement { expression } => *expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let ast = parse_ok("a + b * c;");
        let NodeKind::BinaryExpression {
            operator, right, ..
        } = ast.kind(expression(&ast))
        else {
            panic!("expected binary");
        };
        assert_eq!(*operator, BinaryOperator::Add);
        assert!(matches!(
            ast.kind(*right),
            NodeKind::BinaryExpression {
                operator: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let ast = parse_ok("a ** b ** c;");
        let NodeKind::BinaryExpression { left, right, .. } = ast.kind(expression(&ast)) else {
            panic!("expected binary");
        };
        assert!(matches!(ast.kind(*left), NodeKind::Identifier { .. }));
        assert!(matches!(ast.kind(*right), NodeKind::BinaryExpression { .. }));
    }

    #[test]
    fn test_arrow_forms() {
        let ast = parse_ok(
            "const a = x => x;\n\
             const b = (x, y = 1, ...rest) => { return x; };\n\
             const c = () => 0;\n\
             const d = async (x) => await x;\n\
             const e = async x => x;\n\
             const f = ({ a, b: [c] }) => a + c;",
        );
        let body = ast.program_body();
        assert_eq!(body.len(), 6);
        for stmt in body {
            let NodeKind::VariableDeclaration { declarations, .. } = ast.kind(*stmt) else {
                panic!("expected declaration");
            };
            let NodeKind::VariableDeclarator { init: Some(init), .. } = ast.kind(declarations[0])
            else {
                panic!("expected initializer");
            };
            assert!(matches!(
                ast.kind(*init),
                NodeKind::ArrowFunctionExpression { .. }
            ));
        }
    }

    #[test]
    fn test_arrow_params_become_patterns() {
        let ast = parse_ok("({ a, b: [c] }, d = 2) => a;");
        let NodeKind::ArrowFunctionExpression { params, expression, .. } =
            ast.kind(expression(&ast))
        else {
            panic!("expected arrow");
        };
        assert!(*expression);
        assert!(matches!(ast.kind(params[0]), NodeKind::ObjectPattern { .. }));
        assert!(matches!(ast.kind(params[1]), NodeKind::AssignmentPattern { .. }));
    }

    #[test]
    fn test_async_call_is_not_arrow() {
        let ast = parse_ok("async(a, b);");
        assert!(matches!(
            ast.kind(expression(&ast)),
            NodeKind::CallExpression { .. }
        ));
    }

    #[test]
    fn test_parenthesized_expression() {
        let ast = parse_ok("(a, b);");
        assert!(matches!(
            ast.kind(expression(&ast)),
            NodeKind::SequenceExpression { .. }
        ));
    }

    #[test]
    fn test_empty_parens_require_arrow() {
        parse_err("();");
        parse_err("(a, ...b);");
    }

    #[test]
    fn test_destructuring_assignment() {
        let ast = parse_ok("[a, { b }, ...c] = list;");
        let NodeKind::AssignmentExpression { left, .. } = ast.kind(expression(&ast)) else {
            panic!("expected assignment");
        };
        let NodeKind::ArrayPattern { elements } = ast.kind(*left) else {
            panic!("expected array pattern");
        };
        assert!(matches!(
            ast.kind(elements[1].unwrap()),
            NodeKind::ObjectPattern { .. }
        ));
        assert!(matches!(
            ast.kind(elements[2].unwrap()),
            NodeKind::RestElement { .. }
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_err("a + b = c;");
        assert!(err.message.contains("Invalid"));
        parse_err("(a.b) => 1;");
    }

    #[test]
    fn test_template_literal() {
        let ast = parse_ok("`a${b}c${d + 1}e`;");
        let NodeKind::TemplateLiteral {
            quasis,
            expressions,
        } = ast.kind(expression(&ast))
        else {
            panic!("expected template");
        };
        assert_eq!(quasis.len(), 3);
        assert_eq!(expressions.len(), 2);
        assert_eq!(quasis[2].raw, "e");
    }

    #[test]
    fn test_tagged_template() {
        let ast = parse_ok("tag`x${y}`;");
        assert!(matches!(
            ast.kind(expression(&ast)),
            NodeKind::TaggedTemplateExpression { .. }
        ));
    }

    #[test]
    fn test_regex_literal() {
        let ast = parse_ok("x = /a[/]b/gi;");
        let NodeKind::AssignmentExpression { right, .. } = ast.kind(expression(&ast)) else {
            panic!("expected assignment");
        };
        assert_eq!(
            ast.kind(*right),
            &NodeKind::Literal(Literal::RegExp {
                pattern: "a[/]b".into(),
                flags: "gi".into()
            })
        );
    }

    #[test]
    fn test_division_is_not_regex() {
        let ast = parse_ok("a / b / c;");
        assert!(matches!(
            ast.kind(expression(&ast)),
            NodeKind::BinaryExpression {
                operator: BinaryOperator::Divide,
                ..
            }
        ));
    }

    #[test]
    fn test_object_literal_members() {
        let ast = parse_ok(
            "x = { a, b: 1, [c]: 2, 'd': 3, get e() { return 1; }, set e(v) {}, f() {}, async *g() {}, ...h };",
        );
        let NodeKind::AssignmentExpression { right, .. } = ast.kind(expression(&ast)) else {
            panic!("expected assignment");
        };
        let NodeKind::ObjectExpression { properties } = ast.kind(*right) else {
            panic!("expected object");
        };
        assert_eq!(properties.len(), 9);
        assert!(matches!(
            ast.kind(properties[0]),
            NodeKind::Property { shorthand: true, .. }
        ));
        assert!(matches!(ast.kind(properties[8]), NodeKind::SpreadElement { .. }));
    }

    #[test]
    fn test_shorthand_key_and_value_are_distinct_nodes() {
        let ast = parse_ok("x = { a };");
        let NodeKind::AssignmentExpression { right, .. } = ast.kind(expression(&ast)) else {
            panic!("expected assignment");
        };
        let NodeKind::ObjectExpression { properties } = ast.kind(*right) else {
            panic!("expected object");
        };
        let NodeKind::Property { key, value, .. } = ast.kind(properties[0]) else {
            panic!("expected property");
        };
        assert_ne!(key, value);
        assert_eq!(ast.identifier_name(*value), Some("a"));
    }

    #[test]
    fn test_meta_properties_and_dynamic_import() {
        let ast = parse_ok("import.meta.url;\nimport('./a.js');\nfunction F() { new.target; }");
        let body = ast.program_body();
        let NodeKind::ExpressionStatement { expression } = ast.kind(body[0]) else {
            panic!("expected statement");
        };
        let NodeKind::MemberExpression { object, .. } = ast.kind(*expression) else {
            panic!("expected member");
        };
        assert!(matches!(
            ast.kind(*object),
            NodeKind::MetaProperty { meta, .. } if meta == "import"
        ));
        let NodeKind::ExpressionStatement { expression } = ast.kind(body[1]) else {
            panic!("expected statement");
        };
        assert!(matches!(ast.kind(*expression), NodeKind::ImportExpression { .. }));
    }

    #[test]
    fn test_optional_chaining_and_new() {
        let ast = parse_ok("a?.b?.[c]?.(d);\nnew Foo.Bar(1).baz;");
        assert!(matches!(
            ast.kind(expression(&ast)),
            NodeKind::CallExpression { optional: true, .. }
        ));
        let NodeKind::ExpressionStatement { expression } = ast.kind(ast.program_body()[1]) else {
            panic!("expected statement");
        };
        let NodeKind::MemberExpression { object, .. } = ast.kind(*expression) else {
            panic!("expected member");
        };
        assert!(matches!(ast.kind(*object), NodeKind::NewExpression { .. }));
    }

    #[test]
    fn test_top_level_await() {
        let ast = parse_ok("await load();");
        assert!(matches!(
            ast.kind(expression(&ast)),
            NodeKind::AwaitExpression { .. }
        ));
    }

    #[test]
    fn test_postfix_update_requires_target() {
        let err = parse_err("1++;");
        assert!(err.message.contains("postfix"));
    }
}
