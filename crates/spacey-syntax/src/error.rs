// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Syntax error type.

use thiserror::Error;

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, SyntaxError>;

/// A syntax error annotated with the file and position it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SyntaxError: {message} ({filename}:{line}:{column})")]
pub struct SyntaxError {
    /// Human-readable description
    pub message: String,
    /// File the source came from
    pub filename: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in characters
    pub column: usize,
}

impl SyntaxError {
    /// Builds an error for a byte offset into `source`.
    pub fn at(source: &str, offset: usize, filename: &str, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, offset);
        Self {
            message: message.into(),
            filename: filename.to_string(),
            line,
            column,
        }
    }
}

/// Converts a byte offset into a 1-based line and column.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
