// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The execution boundary.
//!
//! The runtime never interprets module code itself. An [`Executor`] takes a
//! compiled [`ModuleResource`] plus the module's [`Capabilities`] and runs
//! the module body to completion, synchronously.

use crate::capabilities::Capabilities;
use crate::error::{LoaderError, Result};
use crate::resource::ModuleResource;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Runs compiled module bodies.
pub trait Executor: Send + Sync {
    /// Runs the body of `resource` with `capabilities` bound to its five
    /// parameters. Returns once the top level of the body has completed.
    fn execute(&self, resource: &ModuleResource, capabilities: Capabilities) -> Result<()>;
}

/// A module body implemented in Rust.
pub type ModuleBody = Arc<dyn Fn(&Capabilities) -> Result<()> + Send + Sync>;

/// Runs host-implemented bodies registered per store id.
///
/// Each body stands in for the compiled code of one module and drives the
/// capabilities the same way the generated code does: install exports
/// first, then import dependencies, then run the rest.
#[derive(Clone, Default)]
pub struct NativeExecutor {
    bodies: Arc<RwLock<HashMap<String, ModuleBody>>>,
}

impl NativeExecutor {
    /// Create an executor with no bodies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the body for `store_id`.
    pub fn register<F>(&self, store_id: &str, body: F) -> &Self
    where
        F: Fn(&Capabilities) -> Result<()> + Send + Sync + 'static,
    {
        self.bodies
            .write()
            .insert(store_id.to_string(), Arc::new(body));
        self
    }

    /// Returns true if a body is registered for `store_id`.
    pub fn contains(&self, store_id: &str) -> bool {
        self.bodies.read().contains_key(store_id)
    }
}

impl Executor for NativeExecutor {
    fn execute(&self, resource: &ModuleResource, capabilities: Capabilities) -> Result<()> {
        // The lock is released before the body runs; bodies import other
        // modules, which re-enters this executor.
        let body = self.bodies.read().get(&resource.store_id).cloned();
        match body {
            Some(body) => body(&capabilities),
            None => Err(LoaderError::NoBody(resource.store_id.clone())),
        }
    }
}

impl std::fmt::Debug for NativeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<String> = self.bodies.read().keys().cloned().collect();
        ids.sort();
        f.debug_struct("NativeExecutor").field("bodies", &ids).finish()
    }
}
