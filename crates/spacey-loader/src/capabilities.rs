// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The five values a compiled module body receives.
//!
//! | Parameter                    | Method                               |
//! |------------------------------|--------------------------------------|
//! | `__VIRTUAL_IMPORT__`         | [`Capabilities::import`]             |
//! | `__VIRTUAL_EXPORT__`         | [`Capabilities::export`]             |
//! | `__VIRTUAL_NAMESPACE__`      | [`Capabilities::namespace`]          |
//! | `__VIRTUAL_IMPORT_META__`    | [`Capabilities::import_meta`]        |
//! | `__VIRTUAL_DYNAMIC_IMPORT__` | [`Capabilities::dynamic_import`]     |

use crate::error::{LoaderError, Result};
use crate::memory::{Accessor, MemoryModule, WeakMemoryModule};
use crate::namespace::Namespace;
use crate::runtime::{Runtime, RuntimeInner, resolve};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Weak;
use tracing::debug;

/// The `import.meta` object of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMeta {
    /// URL the module was served from
    pub url: String,
    /// Marks modules loaded through the virtual runtime
    #[serde(rename = "__virtual")]
    pub is_virtual: bool,
}

/// Capabilities bound to one executing module.
///
/// Holds only weak references, so a module body that keeps its
/// capabilities around does not keep the runtime or its own record alive.
#[derive(Clone)]
pub struct Capabilities {
    runtime: Weak<RuntimeInner>,
    module: WeakMemoryModule,
    store_id: String,
    real_url: String,
}

impl Capabilities {
    pub(crate) fn new(
        runtime: Weak<RuntimeInner>,
        module: &MemoryModule,
        store_id: &str,
        real_url: &str,
    ) -> Self {
        Self {
            runtime,
            module: module.downgrade(),
            store_id: store_id.to_string(),
            real_url: real_url.to_string(),
        }
    }

    fn runtime(&self) -> Result<Runtime> {
        self.runtime
            .upgrade()
            .map(Runtime::from_inner)
            .ok_or(LoaderError::RuntimeDropped)
    }

    /// Canonical id of the executing module.
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// `__VIRTUAL_IMPORT__(specifier)`: the dependency's live record,
    /// executing it first if it has not run yet.
    pub fn import(&self, specifier: &str) -> Result<MemoryModule> {
        let store_id = resolve(&self.store_id, specifier)?;
        self.runtime()?.import(store_id.as_str())
    }

    /// `__VIRTUAL_EXPORT__({ name: () => value, ... })`: installs the
    /// module's export accessors.
    pub fn export(&self, entries: Vec<(String, Accessor)>) -> Result<()> {
        debug!(store_id = %self.store_id, count = entries.len(), "installing exports");
        self.module.upgrade()?.install(entries);
        Ok(())
    }

    /// `__VIRTUAL_NAMESPACE__(handle)`: the shared namespace of a record.
    pub fn namespace(&self, module: &MemoryModule) -> Result<Namespace> {
        Ok(self.runtime()?.namespace(module))
    }

    /// `__VIRTUAL_IMPORT_META__.meta`.
    pub fn import_meta(&self) -> ImportMeta {
        ImportMeta {
            url: self.real_url.clone(),
            is_virtual: true,
        }
    }

    /// `__VIRTUAL_DYNAMIC_IMPORT__(specifier)`.
    ///
    /// The module is identified relative to this module's store id but
    /// fetched relative to the URL it was actually served from.
    pub fn dynamic_import(&self, specifier: &str) -> BoxFuture<'static, Result<Namespace>> {
        let target = resolve(&self.store_id, specifier)
            .and_then(|store_id| Ok((store_id, resolve(&self.real_url, specifier)?)));
        let runtime = self.runtime();
        async move {
            let (store_id, request_url) = target?;
            runtime?
                .import_by_url(store_id.as_str(), Some(request_url.as_str()))
                .await
        }
        .boxed()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("store_id", &self.store_id)
            .field("real_url", &self.real_url)
            .finish()
    }
}
