// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-loader
//!
//! Fetches, links and runs ECMAScript modules compiled by
//! [`spacey_compiler`].
//!
//! ## Overview
//!
//! - [`Runtime`] owns the module graph: compiled [`ModuleResource`]s by
//!   store id, live [`MemoryModule`] records, and one [`Namespace`] per
//!   record
//! - [`Fetcher`] implementations retrieve source text ([`HttpFetcher`],
//!   [`FileFetcher`], [`MemoryFetcher`])
//! - an [`Executor`] runs compiled module bodies, receiving the module's
//!   [`Capabilities`]
//!
//! Store ids are absolute URLs. A module imported twice under the same
//! store id is fetched, compiled and executed once.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capabilities;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod memory;
pub mod namespace;
pub mod resource;
pub mod runtime;
pub mod value;

pub use capabilities::{Capabilities, ImportMeta};
pub use config::{HttpConfig, RuntimeConfig};
pub use error::{ErrorKind, LoaderError, Result};
pub use executor::{Executor, ModuleBody, NativeExecutor};
pub use fetch::{FetchResponse, Fetcher, FileFetcher, HttpFetcher, MemoryFetcher, SchemeFetcher};
pub use memory::{Accessor, LiveBinding, MemoryModule, WeakMemoryModule, accessor};
pub use namespace::Namespace;
pub use resource::{ModuleResource, has_source_map_comment};
pub use runtime::{Runtime, RuntimeBuilder, resolve};
pub use value::Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
