// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module runtime

use spacey_compiler::CompileError;
use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// When an error can happen, relative to module execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Found while compiling, before any module code runs
    Static,
    /// A module that is needed cannot be obtained
    Resource,
    /// Raised while a module body executes
    Runtime,
}

/// Errors that can occur while loading, linking or running modules.
///
/// Errors are `Clone` because one compile task can be awaited by many
/// importers, and every one of them receives the failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoaderError {
    /// The module failed to compile
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Invalid runtime configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Nothing is cached for the module, or fetching it failed
    #[error("Module '{0}' not found")]
    NotFound(String),

    /// The module is still being compiled
    #[error("Module '{0}' has not finished compiling")]
    NotCompiled(String),

    /// `import_by_url` without an id
    #[error("Missing url")]
    MissingUrl,

    /// `import_by_code` without source text
    #[error("Missing code")]
    MissingCode,

    /// `import_by_code` without a store id
    #[error("Missing filename")]
    MissingFilename,

    /// A specifier that cannot be resolved to a URL
    #[error("Invalid module url '{url}': {reason}")]
    InvalidUrl {
        /// Specifier as given
        url: String,
        /// Parser message
        reason: String,
    },

    /// The configuration does not allow loading from this scheme
    #[error("Loading modules over '{scheme}' is not allowed ({url})")]
    SchemeNotAllowed {
        /// URL scheme
        scheme: String,
        /// Requested URL
        url: String,
    },

    /// The fetcher could not complete the request
    #[error("Network error: {0}")]
    Transport(String),

    /// A binding was read before the statement producing it ran
    #[error("ReferenceError: Cannot access '{0}' before initialization")]
    ReadBeforeInit(String),

    /// Write to an export of a module record
    #[error("TypeError: Assignment to constant variable.")]
    ConstantAssignment,

    /// Write to an export of a namespace object
    #[error("TypeError: Cannot assign to read only property '{0}' of object '[object Module]'")]
    ReadOnly(String),

    /// New property on a namespace object
    #[error("TypeError: Cannot add property {0}, object is not extensible")]
    NotExtensible(String),

    /// A namespace outlived its module
    #[error("Module '{0}' is no longer loaded")]
    Detached(String),

    /// A capability outlived its runtime
    #[error("The module runtime has been dropped")]
    RuntimeDropped,

    /// The executor has nothing to run for the module
    #[error("No executable body for module '{0}'")]
    NoBody(String),

    /// An error thrown by module code
    #[error("{0}")]
    Thrown(String),
}

impl LoaderError {
    /// Create an error thrown by module code
    pub fn thrown(msg: impl Into<String>) -> Self {
        Self::Thrown(msg.into())
    }

    /// Create an invalid url error
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Which phase the error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Compile(_) | Self::Config(_) => ErrorKind::Static,
            Self::NotFound(_)
            | Self::NotCompiled(_)
            | Self::MissingUrl
            | Self::MissingCode
            | Self::MissingFilename
            | Self::InvalidUrl { .. }
            | Self::SchemeNotAllowed { .. }
            | Self::Transport(_) => ErrorKind::Resource,
            Self::ReadBeforeInit(_)
            | Self::ConstantAssignment
            | Self::ReadOnly(_)
            | Self::NotExtensible(_)
            | Self::Detached(_)
            | Self::RuntimeDropped
            | Self::NoBody(_)
            | Self::Thrown(_) => ErrorKind::Runtime,
        }
    }
}

impl From<reqwest::Error> for LoaderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<toml::de::Error> for LoaderError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            LoaderError::NotFound("https://a.test/x.js".into()).to_string(),
            "Module 'https://a.test/x.js' not found"
        );
        assert_eq!(
            LoaderError::ReadOnly("x".into()).to_string(),
            "TypeError: Cannot assign to read only property 'x' of object '[object Module]'"
        );
        assert_eq!(
            LoaderError::ConstantAssignment.to_string(),
            "TypeError: Assignment to constant variable."
        );
        assert_eq!(LoaderError::MissingUrl.to_string(), "Missing url");
    }

    #[test]
    fn test_kinds() {
        let compile = LoaderError::from(CompileError::Redeclaration {
            name: "a".into(),
            filename: "a.js".into(),
        });
        assert_eq!(compile.kind(), ErrorKind::Static);
        assert_eq!(LoaderError::NotFound("x".into()).kind(), ErrorKind::Resource);
        assert_eq!(LoaderError::ReadBeforeInit("x".into()).kind(), ErrorKind::Runtime);
        assert_eq!(LoaderError::thrown("boom").to_string(), "boom");
    }
}
