// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.
//!
//! The scanner is position based so the parser can rewind it: a `/` token
//! is re-scanned as a regular expression when it appears where an operand
//! is expected, and a `}` closing a template substitution is re-scanned as
//! the next template chunk.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes JavaScript source code.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Self { source, pos: 0 };
        if source.starts_with("#!") {
            while let Some(ch) = scanner.peek() {
                if is_line_terminator(ch) {
                    break;
                }
                scanner.advance();
            }
        }
        scanner
    }

    /// Returns the source text being scanned.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Rewinds or advances the scanner to a byte offset.
    pub fn reset(&mut self, pos: usize) {
        self.pos = pos.min(self.source.len());
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let newline_before = self.skip_whitespace_and_comments();

        let start = self.pos;

        let Some(ch) = self.advance() else {
            let mut token = Token::new(TokenKind::Eof, Span::new(start, start));
            token.newline_before = newline_before;
            return token;
        };

        let kind = match ch {
            // Single-character tokens
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,

            // Multi-character tokens
            '.' => self.scan_dot(start),
            '+' => self.scan_plus(),
            '-' => self.scan_minus(),
            '*' => self.scan_star(),
            '/' => self.scan_slash(),
            '%' => self.scan_percent(),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' => self.scan_ampersand(),
            '|' => self.scan_pipe(),
            '^' => self.scan_caret(),
            '?' => self.scan_question(),

            '"' | '\'' => self.scan_string(ch),
            '`' => self.scan_template_chunk(),
            '0'..='9' => self.scan_number(start),
            '#' => self.scan_private_identifier(),
            _ if is_id_start(ch) => self.scan_identifier(start),

            other => TokenKind::Invalid(format!("Unexpected character '{}'", other)),
        };

        let mut token = Token::new(kind, Span::new(start, self.pos));
        token.newline_before = newline_before;
        token
    }

    /// Re-scans a regular expression literal whose opening `/` is at `start`.
    pub fn rescan_regex(&mut self, start: usize) -> Token {
        self.reset(start + 1);
        let mut pattern = String::new();
        let mut in_class = false;

        let kind = loop {
            match self.advance() {
                None => break TokenKind::Invalid("Unterminated regular expression".into()),
                Some(ch) if is_line_terminator(ch) => {
                    break TokenKind::Invalid("Unterminated regular expression".into());
                }
                Some('\\') => {
                    pattern.push('\\');
                    match self.advance() {
                        Some(ch) if !is_line_terminator(ch) => pattern.push(ch),
                        _ => {
                            break TokenKind::Invalid(
                                "Unterminated regular expression".into(),
                            );
                        }
                    }
                }
                Some('[') => {
                    in_class = true;
                    pattern.push('[');
                }
                Some(']') => {
                    in_class = false;
                    pattern.push(']');
                }
                Some('/') if !in_class => {
                    let mut flags = String::new();
                    while let Some(ch) = self.peek() {
                        if !is_id_continue(ch) {
                            break;
                        }
                        flags.push(ch);
                        self.advance();
                    }
                    break TokenKind::RegExp { pattern, flags };
                }
                Some(ch) => pattern.push(ch),
            }
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    /// Re-scans the template chunk that follows the `}` at `start`.
    pub fn rescan_template_continuation(&mut self, start: usize) -> Token {
        self.reset(start + 1);
        let kind = self.scan_template_chunk();
        Token::new(kind, Span::new(start, self.pos))
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips trivia; returns true if a line terminator was crossed.
    fn skip_whitespace_and_comments(&mut self) -> bool {
        let mut newline = false;
        loop {
            match self.peek() {
                Some(ch) if is_line_terminator(ch) => {
                    newline = true;
                    self.advance();
                }
                Some(ch) if is_whitespace(ch) => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        while let Some(ch) = self.advance() {
                            if is_line_terminator(ch) {
                                newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        newline
    }

    fn scan_dot(&mut self, start: usize) -> TokenKind {
        match self.peek() {
            Some('0'..='9') => self.scan_number(start),
            Some('.') if self.peek_next() == Some('.') => {
                self.advance();
                self.advance();
                TokenKind::Ellipsis
            }
            _ => TokenKind::Dot,
        }
    }

    fn scan_plus(&mut self) -> TokenKind {
        if self.eat('+') {
            TokenKind::PlusPlus
        } else if self.eat('=') {
            TokenKind::PlusEqual
        } else {
            TokenKind::Plus
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        if self.eat('-') {
            TokenKind::MinusMinus
        } else if self.eat('=') {
            TokenKind::MinusEqual
        } else {
            TokenKind::Minus
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        if self.eat('*') {
            if self.eat('=') {
                TokenKind::StarStarEqual
            } else {
                TokenKind::StarStar
            }
        } else if self.eat('=') {
            TokenKind::StarEqual
        } else {
            TokenKind::Star
        }
    }

    fn scan_slash(&mut self) -> TokenKind {
        if self.eat('=') {
            TokenKind::SlashEqual
        } else {
            TokenKind::Slash
        }
    }

    fn scan_percent(&mut self) -> TokenKind {
        if self.eat('=') {
            TokenKind::PercentEqual
        } else {
            TokenKind::Percent
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        if self.eat('<') {
            if self.eat('=') {
                TokenKind::LeftShiftEqual
            } else {
                TokenKind::LeftShift
            }
        } else if self.eat('=') {
            TokenKind::LessThanEqual
        } else {
            TokenKind::LessThan
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        if self.eat('>') {
            if self.eat('>') {
                if self.eat('=') {
                    TokenKind::UnsignedRightShiftEqual
                } else {
                    TokenKind::UnsignedRightShift
                }
            } else if self.eat('=') {
                TokenKind::RightShiftEqual
            } else {
                TokenKind::RightShift
            }
        } else if self.eat('=') {
            TokenKind::GreaterThanEqual
        } else {
            TokenKind::GreaterThan
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.eat('=') {
            if self.eat('=') {
                TokenKind::StrictEqual
            } else {
                TokenKind::EqualEqual
            }
        } else if self.eat('>') {
            TokenKind::Arrow
        } else {
            TokenKind::Equal
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.eat('=') {
            if self.eat('=') {
                TokenKind::StrictNotEqual
            } else {
                TokenKind::NotEqual
            }
        } else {
            TokenKind::Bang
        }
    }

    fn scan_ampersand(&mut self) -> TokenKind {
        if self.eat('&') {
            if self.eat('=') {
                TokenKind::AmpersandAmpersandEqual
            } else {
                TokenKind::AmpersandAmpersand
            }
        } else if self.eat('=') {
            TokenKind::AmpersandEqual
        } else {
            TokenKind::Ampersand
        }
    }

    fn scan_pipe(&mut self) -> TokenKind {
        if self.eat('|') {
            if self.eat('=') {
                TokenKind::PipePipeEqual
            } else {
                TokenKind::PipePipe
            }
        } else if self.eat('=') {
            TokenKind::PipeEqual
        } else {
            TokenKind::Pipe
        }
    }

    fn scan_caret(&mut self) -> TokenKind {
        if self.eat('=') {
            TokenKind::CaretEqual
        } else {
            TokenKind::Caret
        }
    }

    fn scan_question(&mut self) -> TokenKind {
        match self.peek() {
            Some('?') => {
                self.advance();
                if self.eat('=') {
                    TokenKind::QuestionQuestionEqual
                } else {
                    TokenKind::QuestionQuestion
                }
            }
            // `a?.5:b` is a conditional, not optional chaining
            Some('.') if !matches!(self.peek_next(), Some('0'..='9')) => {
                self.advance();
                TokenKind::QuestionDot
            }
            _ => TokenKind::Question,
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return TokenKind::Invalid("Unterminated string literal".into()),
                Some(ch) if ch == quote => break,
                Some('\n' | '\r') => {
                    return TokenKind::Invalid("Unterminated string literal".into());
                }
                Some('\\') => match self.scan_escape() {
                    Ok(Some(ch)) => value.push(ch),
                    Ok(None) => {}
                    Err(message) => return TokenKind::Invalid(message),
                },
                Some(ch) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    /// Decodes the escape after a backslash. `Ok(None)` is a line continuation.
    fn scan_escape(&mut self) -> Result<Option<char>, String> {
        let Some(escaped) = self.advance() else {
            return Err("Unterminated escape sequence".into());
        };
        let ch = match escaped {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !matches!(self.peek(), Some('0'..='9')) => '\0',
            'x' => {
                let code = self.scan_hex_digits(2)?;
                char::from_u32(code).ok_or("Invalid hexadecimal escape sequence")?
            }
            'u' => self.scan_unicode_escape()?,
            '\r' => {
                self.eat('\n');
                return Ok(None);
            }
            ch if is_line_terminator(ch) => return Ok(None),
            other => other,
        };
        Ok(Some(ch))
    }

    fn scan_unicode_escape(&mut self) -> Result<char, String> {
        let code = if self.eat('{') {
            let mut code: u32 = 0;
            let mut digits = 0;
            while let Some(ch) = self.peek() {
                if ch == '}' {
                    break;
                }
                let digit = ch.to_digit(16).ok_or("Invalid Unicode escape sequence")?;
                code = code.saturating_mul(16).saturating_add(digit);
                digits += 1;
                self.advance();
            }
            if digits == 0 || !self.eat('}') {
                return Err("Invalid Unicode escape sequence".into());
            }
            code
        } else {
            self.scan_hex_digits(4)?
        };
        // Lone surrogates cannot be represented in a Rust string
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn scan_hex_digits(&mut self, count: usize) -> Result<u32, String> {
        let mut code = 0;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|ch| ch.to_digit(16))
                .ok_or("Invalid hexadecimal escape sequence")?;
            code = code * 16 + digit;
            self.advance();
        }
        Ok(code)
    }

    /// Scans one template chunk, starting right after a backtick or `}`.
    fn scan_template_chunk(&mut self) -> TokenKind {
        let start = self.pos;
        let mut cooked = Some(String::new());

        loop {
            let here = self.pos;
            match self.advance() {
                None => return TokenKind::Invalid("Unterminated template literal".into()),
                Some('`') => {
                    let raw = self.source[start..here].to_string();
                    return TokenKind::Template {
                        cooked,
                        raw,
                        tail: true,
                    };
                }
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    let raw = self.source[start..here].to_string();
                    return TokenKind::Template {
                        cooked,
                        raw,
                        tail: false,
                    };
                }
                Some('\\') => match self.scan_escape() {
                    Ok(Some(ch)) => {
                        if let Some(text) = cooked.as_mut() {
                            text.push(ch);
                        }
                    }
                    Ok(None) => {}
                    Err(_) => cooked = None,
                },
                Some(ch) => {
                    if let Some(text) = cooked.as_mut() {
                        text.push(ch);
                    }
                }
            }
        }
    }

    fn scan_number(&mut self, start: usize) -> TokenKind {
        // Handle hex, octal, binary
        if self.source[start..].starts_with('0') {
            match self.peek() {
                Some('x' | 'X') => return self.scan_radix_number(16),
                Some('o' | 'O') => return self.scan_radix_number(8),
                Some('b' | 'B') => return self.scan_radix_number(2),
                _ => {}
            }
        }

        self.skip_digits();

        if !self.source[start..self.pos].contains('.') && self.peek() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            self.skip_digits();
        }

        let value: String = self.source[start..self.pos]
            .chars()
            .filter(|ch| *ch != '_')
            .collect();

        if self.eat('n') {
            return TokenKind::BigInt(value);
        }

        match value.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid(format!("Invalid number '{}'", value)),
        }
    }

    fn skip_digits(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_radix_number(&mut self, radix: u32) -> TokenKind {
        let prefix = self.advance().unwrap_or('x');
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) || ch == '_' {
                if ch != '_' {
                    value.push(ch);
                }
                self.advance();
            } else {
                break;
            }
        }

        if self.eat('n') {
            return TokenKind::BigInt(format!("0{}{}", prefix, value));
        }

        match u64::from_str_radix(&value, radix) {
            Ok(n) => TokenKind::Number(n as f64),
            Err(_) => TokenKind::Invalid(format!("Invalid number '0{}{}'", prefix, value)),
        }
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }

        let name = &self.source[start..self.pos];
        match name {
            "await" => TokenKind::Await,
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "catch" => TokenKind::Catch,
            "class" => TokenKind::Class,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "debugger" => TokenKind::Debugger,
            "default" => TokenKind::Default,
            "delete" => TokenKind::Delete,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "enum" => TokenKind::Enum,
            "export" => TokenKind::Export,
            "extends" => TokenKind::Extends,
            "false" => TokenKind::False,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "instanceof" => TokenKind::Instanceof,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "static" => TokenKind::Static,
            "super" => TokenKind::Super,
            "switch" => TokenKind::Switch,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "try" => TokenKind::Try,
            "typeof" => TokenKind::Typeof,
            "var" => TokenKind::Var,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            "with" => TokenKind::With,
            "yield" => TokenKind::Yield,
            "async" => TokenKind::Async,
            _ => TokenKind::Identifier(name.to_string()),
        }
    }

    fn scan_private_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }

        if start == self.pos {
            TokenKind::Invalid("Unexpected character '#'".into())
        } else {
            TokenKind::PrivateIdentifier(self.source[start..self.pos].to_string())
        }
    }
}

/// Checks if a character can start an identifier.
pub fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
pub fn is_id_continue(ch: char) -> bool {
    ch == '_'
        || ch == '$'
        || ch == '\u{200c}'
        || ch == '\u{200d}'
        || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_whitespace(ch: char) -> bool {
    matches!(
        ch,
        ' ' | '\t' | '\u{b}' | '\u{c}' | '\u{a0}' | '\u{feff}'
    ) || (!ch.is_ascii() && ch.is_whitespace() && !is_line_terminator(ch))
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}
