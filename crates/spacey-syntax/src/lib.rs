// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-syntax
//!
//! Front and back end for ECMAScript module source text.
//!
//! ## Overview
//!
//! This crate provides:
//! - A lexer for module code (strict mode, templates, regular expressions)
//! - An arena-allocated ESTree-shaped AST with stable node identities
//! - A recursive descent parser for module code
//! - A code generator that prints the AST back out with a v3 source map
//!
//! ## Quick Start
//!
//! ```rust
//! use spacey_syntax::{generate, parse_module};
//!
//! let source = "export const answer = 40 + 2;";
//! let ast = parse_module(source, "answer.js").expect("Should parse");
//! let output = generate(&ast, source, "answer.js");
//! assert_eq!(output.code, "export const answer = 40 + 2;\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Ast, Node, NodeId, NodeKind};
pub use codegen::{Generated, SourceMap, generate};
pub use error::{Result, SyntaxError};
pub use lexer::Span;
pub use parser::parse_module;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_parse_then_generate() {
        let source = "import { a } from './a.js';\nexport default a * 2;";
        let ast = parse_module(source, "main.js").unwrap();
        let output = generate(&ast, source, "main.js");
        assert_eq!(
            output.code,
            "import { a } from \"./a.js\";\nexport default a * 2;\n"
        );
    }
}
