// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-compiler
//!
//! Rewrites an ECMAScript module into a function body that can run without
//! native module support.
//!
//! ## Overview
//!
//! Compilation happens in three steps:
//! - [`Compiler::new`] parses the module and builds its [`ScopeTree`]
//! - [`Compiler::transform`] records imports and exports and queues rewrites
//! - [`Transformed::generate_code`] validates imported names, applies the
//!   rewrites and prints the wrapped module with a source map
//!
//! The split lets a loader compile a module, fetch its dependencies, and
//! only then generate code, once the export lists of the dependencies are
//! known.
//!
//! ## Quick Start
//!
//! ```rust
//! use spacey_compiler::{Compiler, CompilerOptions, NoExports};
//!
//! let compiler = Compiler::new(CompilerOptions {
//!     code: "import { base } from './dep.js';\nexport const answer = base + 1;".into(),
//!     store_id: "https://example.com/main.js".into(),
//!     filename: "main.js".into(),
//! })
//! .expect("Should compile");
//!
//! let transformed = compiler.transform();
//! assert_eq!(transformed.dependencies().collect::<Vec<_>>(), vec!["./dep.js"]);
//!
//! let output = transformed.generate_code(&NoExports).expect("Should generate");
//! assert!(output.code.contains("const answer = __m0__.base + 1;"));
//! assert_eq!(output.exports, vec!["answer"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod compiler;
pub mod error;
pub mod patch;
pub mod predicates;
pub mod scope;

pub use collector::collect;
pub use compiler::{
    CAPABILITIES, Compiler, CompilerOptions, DEFAULT_EXPORT, ExportLookup, ImportInfo,
    ImportedName, NoExports, Output, Transformed, VIRTUAL_DEFAULT, VIRTUAL_DYNAMIC_IMPORT,
    VIRTUAL_EXPORT, VIRTUAL_IMPORT, VIRTUAL_IMPORT_META, VIRTUAL_NAMESPACE,
};
pub use error::{CompileError, Result};
pub use scope::{Binding, BindingKind, Scope, ScopeId, ScopeKind, ScopeTree};

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
    fn test_capability_order() {
        assert_eq!(CAPABILITIES[0], VIRTUAL_IMPORT);
        assert_eq!(CAPABILITIES[4], VIRTUAL_DYNAMIC_IMPORT);
    }
}
