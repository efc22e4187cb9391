// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module namespace objects.

use crate::error::{LoaderError, Result};
use crate::memory::{MemoryModule, WeakMemoryModule};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Value of the namespace's `Symbol.toStringTag` property.
pub const TO_STRING_TAG: &str = "Module";

struct NamespaceInner {
    module: WeakMemoryModule,
    keys: Vec<String>,
}

/// A read-only view over one module's live exports.
///
/// Behaves like an ECMAScript module namespace exotic object: it has no
/// prototype, cannot be extended, enumerates its keys in sorted order and
/// rejects every write. Reads delegate to the backing [`MemoryModule`],
/// which the namespace does not keep alive.
#[derive(Clone)]
pub struct Namespace {
    inner: Arc<NamespaceInner>,
}

impl Namespace {
    /// Wraps a module. Keys are the module's resolved export names.
    ///
    /// The runtime caches namespaces per module; use
    /// [`Runtime::namespace`](crate::Runtime::namespace) to get the shared
    /// instance.
    pub(crate) fn new(module: &MemoryModule) -> Self {
        let mut keys = module.exports().to_vec();
        keys.sort();
        keys.dedup();
        Self {
            inner: Arc::new(NamespaceInner {
                module: module.downgrade(),
                keys,
            }),
        }
    }

    /// Canonical id of the backing module.
    pub fn store_id(&self) -> &str {
        self.inner.module.store_id()
    }

    /// Enumerable keys, sorted.
    pub fn keys(&self) -> &[String] {
        &self.inner.keys
    }

    /// Returns true if `key` is an export of the module.
    pub fn has(&self, key: &str) -> bool {
        self.inner.keys.binary_search_by(|k| k.as_str().cmp(key)).is_ok()
    }

    /// Reads an export through to the module.
    pub fn get(&self, key: &str) -> Result<Value> {
        if !self.has(key) {
            return Ok(Value::Undefined);
        }
        self.inner.module.upgrade()?.get(key)
    }

    /// Namespaces are immutable.
    pub fn set(&self, key: &str, _value: Value) -> Result<()> {
        if self.has(key) {
            Err(LoaderError::ReadOnly(key.to_string()))
        } else {
            Err(LoaderError::NotExtensible(key.to_string()))
        }
    }

    /// Always `None`: namespaces have a null prototype.
    pub fn prototype(&self) -> Option<Value> {
        None
    }

    /// Always false.
    pub fn is_extensible(&self) -> bool {
        false
    }

    /// `Symbol.toStringTag`.
    pub fn to_string_tag(&self) -> &'static str {
        TO_STRING_TAG
    }

    /// The backing module, if it is still loaded.
    pub fn module(&self) -> Result<MemoryModule> {
        self.inner.module.upgrade()
    }

    /// Returns true if both are the same namespace object.
    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("store_id", &self.store_id())
            .field("keys", &self.inner.keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LiveBinding;

    fn module() -> (MemoryModule, LiveBinding) {
        let m = MemoryModule::new("https://a.test/m.js", vec!["b".into(), "a".into()]);
        let a = LiveBinding::new("a");
        m.install(vec![("a".to_string(), a.accessor())]);
        (m, a)
    }

    #[test]
    fn test_shape() {
        let (m, _) = module();
        let ns = Namespace::new(&m);
        assert_eq!(ns.keys(), ["a".to_string(), "b".to_string()]);
        assert!(ns.prototype().is_none());
        assert!(!ns.is_extensible());
        assert_eq!(ns.to_string_tag(), "Module");
    }

    #[test]
    fn test_reads_are_live() {
        let (m, a) = module();
        let ns = Namespace::new(&m);
        assert_eq!(ns.get("a"), Err(LoaderError::ReadBeforeInit("a".into())));
        a.set("first");
        assert_eq!(ns.get("a"), Ok(Value::from("first")));
        a.set("second");
        assert_eq!(ns.get("a"), Ok(Value::from("second")));
        assert_eq!(ns.get("missing"), Ok(Value::Undefined));
    }

    #[test]
    fn test_writes_fail() {
        let (m, _) = module();
        let ns = Namespace::new(&m);
        assert_eq!(
            ns.set("a", Value::Null).unwrap_err().to_string(),
            "TypeError: Cannot assign to read only property 'a' of object '[object Module]'"
        );
        assert_eq!(
            ns.set("c", Value::Null),
            Err(LoaderError::NotExtensible("c".into()))
        );
    }

    #[test]
    fn test_does_not_own_module() {
        let (m, a) = module();
        a.set(1.0);
        let ns = Namespace::new(&m);
        drop(m);
        assert_eq!(
            ns.get("a"),
            Err(LoaderError::Detached("https://a.test/m.js".into()))
        );
    }
}
