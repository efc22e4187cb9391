// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module compiler

use spacey_syntax::SyntaxError;
use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised while compiling one module.
///
/// Every variant is a static error: it is reported before any code of the
/// module runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The source text failed to parse
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A lexical name was declared twice in one scope
    #[error("Duplicate declaration \"{name}\" ({filename})")]
    Redeclaration {
        /// The declared name
        name: String,
        /// File the declaration is in
        filename: String,
    },

    /// An import names an export the target module does not have
    #[error("({importer}): The module '{target}' does not provide an export named '{name}'")]
    MissingExport {
        /// File of the importing module
        importer: String,
        /// Specifier of the imported module, as written
        target: String,
        /// The missing export name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_export_message() {
        let err = CompileError::MissingExport {
            importer: "main.js".into(),
            target: "./a.js".into(),
            name: "x".into(),
        };
        assert_eq!(
            err.to_string(),
            "(main.js): The module './a.js' does not provide an export named 'x'"
        );
    }

    #[test]
    fn test_redeclaration_message() {
        let err = CompileError::Redeclaration {
            name: "a".into(),
            filename: "main.js".into(),
        };
        assert!(err.to_string().starts_with("Duplicate declaration \"a\""));
    }

    #[test]
    fn test_syntax_error_is_transparent() {
        let syntax = SyntaxError::at("x y", 2, "main.js", "Unexpected token");
        let err = CompileError::from(syntax.clone());
        assert_eq!(err.to_string(), syntax.to_string());
    }
}
