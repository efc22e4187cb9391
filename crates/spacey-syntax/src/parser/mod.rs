// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Recursive descent parser for module code.
//!
//! ## Structure
//!
//! - `mod.rs` - `Parser` state and token helpers
//! - `statements.rs` - statements, declarations, functions and classes
//! - `expressions.rs` - expressions, literals and the arrow/pattern cover grammar
//! - `modules.rs` - import and export declarations
//!
//! ## Usage
//!
//! ```rust
//! use spacey_syntax::parser::parse_module;
//!
//! let ast = parse_module("export const x = 1 + 2;", "main.js").expect("Should parse");
//! assert_eq!(ast.program_body().len(), 1);
//! ```

mod expressions;
mod modules;
mod statements;

use rustc_hash::FxHashMap;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::{Result, SyntaxError};
use crate::lexer::{Scanner, Span, Token, TokenKind};

/// Parses module source text into an [`Ast`].
pub fn parse_module(source: &str, filename: &str) -> Result<Ast> {
    Parser::new(source, filename).parse_program()
}

/// A recursive descent parser for ECMAScript modules.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    source: &'a str,
    filename: String,
    ast: Ast,
    current: Token,
    previous: Token,
    /// Whether the `in` operator is allowed (false in `for` heads)
    allow_in: bool,
    in_generator: bool,
    in_async: bool,
    /// Parenthesized lists that may turn into arrow parameters, keyed by
    /// the expression node they produced.
    covers: FxHashMap<NodeId, Vec<NodeId>>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str, filename: &str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            source,
            filename: filename.to_string(),
            ast: Ast::new(),
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            allow_in: true,
            in_generator: false,
            in_async: false,
            covers: FxHashMap::default(),
        }
    }

    /// Parses the whole source as a module.
    pub fn parse_program(mut self) -> Result<Ast> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_module_item()?);
        }

        self.ast
            .set_program(body, Span::new(0, self.source.len()));
        Ok(self.ast)
    }

    // Helper methods

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.scanner.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn check_contextual(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(name) if name == word)
    }

    fn eat_contextual(&mut self, word: &str) -> bool {
        if self.check_contextual(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_contextual(&mut self, word: &str) -> Result<()> {
        if self.eat_contextual(word) {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}'", word)))
        }
    }

    /// Looks at the token after `current` without consuming anything.
    fn peek_token(&self) -> Token {
        self.scanner.clone().next_token()
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek_token().kind) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    /// Automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Span from `start` to the end of the last consumed token.
    fn finish(&self, start: usize) -> Span {
        Span::new(start, self.previous.span.end.max(start))
    }

    fn node(&mut self, kind: NodeKind, start: usize) -> NodeId {
        let span = self.finish(start);
        self.ast.alloc(kind, span)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(self.source, self.current.span.start, &self.filename, message)
    }

    fn unexpected(&self) -> SyntaxError {
        match &self.current.kind {
            TokenKind::Invalid(message) => self.error(message.clone()),
            TokenKind::Eof => self.error("Unexpected end of input"),
            _ => {
                let text = &self.source[self.current.span.start..self.current.span.end];
                self.error(format!("Unexpected token '{}'", text))
            }
        }
    }

    /// Runs `f` with the `in` operator allowed or disallowed.
    fn with_in<T>(&mut self, allow: bool, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.allow_in, allow);
        let result = f(self);
        self.allow_in = saved;
        result
    }

    /// Runs `f` inside a function body with the given async/generator flags.
    fn in_function<T>(
        &mut self,
        is_async: bool,
        is_generator: bool,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = (self.in_async, self.in_generator, self.allow_in);
        self.in_async = is_async;
        self.in_generator = is_generator;
        self.allow_in = true;
        let result = f(self);
        (self.in_async, self.in_generator, self.allow_in) = saved;
        result
    }

    /// Parses an identifier in binding position.
    fn expect_binding_identifier(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Async => "async".to_string(),
            TokenKind::Yield if !self.in_generator => {
                return Err(self.error("Unexpected reserved word 'yield' in strict mode"));
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(self.node(NodeKind::Identifier { name }, start))
    }

    /// True if the current token can start a binding identifier.
    fn at_binding_identifier(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Identifier(_) | TokenKind::Async
        )
    }

    /// Parses an IdentifierName (keywords allowed), as used after `.`.
    fn expect_identifier_name(&mut self) -> Result<String> {
        match self.current.kind.identifier_name() {
            Some(name) => {
                self.advance();
                Ok(name)
            }
            None => Err(self.unexpected()),
        }
    }
}
