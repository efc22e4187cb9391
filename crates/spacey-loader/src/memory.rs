// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Live module records.
//!
//! A [`MemoryModule`] is what a module handle (`__m0__`) points at: a set of
//! named slots, each holding an accessor that reads the current value of
//! the exporting module's local binding. Slots are installed by the
//! module's own export-install call and are never written through.

use crate::error::{LoaderError, Result};
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Reads the current value of one export.
pub type Accessor = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

/// Wraps a closure into an [`Accessor`].
pub fn accessor<F>(read: F) -> Accessor
where
    F: Fn() -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(read)
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct MemoryInner {
    id: u64,
    store_id: String,
    exports: Vec<String>,
    slots: RwLock<BTreeMap<String, Accessor>>,
    failure: Mutex<Option<LoaderError>>,
}

/// The live binding record of one module instance.
///
/// Cloning is cheap and every clone is the same record.
#[derive(Clone)]
pub struct MemoryModule {
    inner: Arc<MemoryInner>,
}

impl MemoryModule {
    /// Creates an empty record for a module whose resolved export names are
    /// `exports`.
    pub fn new(store_id: impl Into<String>, exports: Vec<String>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                store_id: store_id.into(),
                exports,
                slots: RwLock::new(BTreeMap::new()),
                failure: Mutex::new(None),
            }),
        }
    }

    /// Unique id of this record.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Canonical id of the module.
    pub fn store_id(&self) -> &str {
        &self.inner.store_id
    }

    /// Resolved export names, in the order the compiler produced them.
    pub fn exports(&self) -> &[String] {
        &self.inner.exports
    }

    /// Names with an installed slot, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.read().keys().cloned().collect()
    }

    /// Installs (or replaces) export slots.
    pub fn install(&self, entries: impl IntoIterator<Item = (String, Accessor)>) {
        let mut slots = self.inner.slots.write();
        for (name, read) in entries {
            slots.insert(name, read);
        }
    }

    /// Reads an export.
    ///
    /// A declared export whose slot is not installed yet has not been
    /// initialized; any other unknown name reads as `undefined`.
    pub fn get(&self, name: &str) -> Result<Value> {
        // Clone the accessor out so it runs without the lock held
        let read = self.inner.slots.read().get(name).cloned();
        match read {
            Some(read) => read(),
            None if self.inner.exports.iter().any(|export| export == name) => {
                Err(LoaderError::ReadBeforeInit(name.to_string()))
            }
            None => Ok(Value::Undefined),
        }
    }

    /// Exports are read-only to importers.
    pub fn set(&self, _name: &str, _value: Value) -> Result<()> {
        Err(LoaderError::ConstantAssignment)
    }

    /// Records that the module body threw.
    pub(crate) fn fail(&self, err: LoaderError) {
        *self.inner.failure.lock() = Some(err);
    }

    /// The error the module body threw, if any.
    pub fn failure(&self) -> Option<LoaderError> {
        self.inner.failure.lock().clone()
    }

    /// Returns true if both handles are the same record.
    pub fn ptr_eq(&self, other: &MemoryModule) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Creates a non-owning handle.
    pub fn downgrade(&self) -> WeakMemoryModule {
        WeakMemoryModule {
            inner: Arc::downgrade(&self.inner),
            store_id: self.inner.store_id.clone(),
        }
    }
}

impl fmt::Debug for MemoryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryModule")
            .field("id", &self.inner.id)
            .field("store_id", &self.inner.store_id)
            .field("keys", &self.keys())
            .finish()
    }
}

/// A [`MemoryModule`] reference that does not keep the record alive.
#[derive(Clone)]
pub struct WeakMemoryModule {
    inner: Weak<MemoryInner>,
    store_id: String,
}

impl WeakMemoryModule {
    /// The record, if it is still alive.
    pub fn upgrade(&self) -> Result<MemoryModule> {
        self.inner
            .upgrade()
            .map(|inner| MemoryModule { inner })
            .ok_or_else(|| LoaderError::Detached(self.store_id.clone()))
    }

    /// Canonical id of the module.
    pub fn store_id(&self) -> &str {
        &self.store_id
    }
}

impl fmt::Debug for WeakMemoryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakMemoryModule").field(&self.store_id).finish()
    }
}

/// A module-local binding as seen from host code.
///
/// Holds nothing until the producing statement stores a value; reading it
/// before then is a [`LoaderError::ReadBeforeInit`].
#[derive(Clone)]
pub struct LiveBinding {
    name: Arc<str>,
    cell: Arc<RwLock<Option<Value>>>,
}

impl LiveBinding {
    /// Creates an uninitialized binding.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            cell: Arc::new(RwLock::new(None)),
        }
    }

    /// Binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a value, initializing the binding if needed.
    pub fn set(&self, value: impl Into<Value>) {
        *self.cell.write() = Some(value.into());
    }

    /// Current value.
    pub fn get(&self) -> Result<Value> {
        self.cell
            .read()
            .clone()
            .ok_or_else(|| LoaderError::ReadBeforeInit(self.name.to_string()))
    }

    /// Returns true once a value has been stored.
    pub fn is_initialized(&self) -> bool {
        self.cell.read().is_some()
    }

    /// An accessor that reads this binding.
    pub fn accessor(&self) -> Accessor {
        let binding = self.clone();
        accessor(move || binding.get())
    }
}

impl fmt::Debug for LiveBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveBinding")
            .field("name", &self.name)
            .field("value", &*self.cell.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> MemoryModule {
        MemoryModule::new("https://a.test/m.js", vec!["x".into(), "y".into()])
    }

    #[test]
    fn test_uninstalled_export_reads_before_init() {
        let m = module();
        assert_eq!(m.get("x"), Err(LoaderError::ReadBeforeInit("x".into())));
        assert_eq!(m.get("other"), Ok(Value::Undefined));
    }

    #[test]
    fn test_live_binding_through_slot() {
        let m = module();
        let x = LiveBinding::new("x");
        m.install(vec![("x".to_string(), x.accessor())]);

        assert_eq!(m.get("x"), Err(LoaderError::ReadBeforeInit("x".into())));
        x.set(1.0);
        assert_eq!(m.get("x"), Ok(Value::Number(1.0)));
        x.set(2.0);
        assert_eq!(m.get("x"), Ok(Value::Number(2.0)));
        assert!(x.is_initialized());
    }

    #[test]
    fn test_keys_are_sorted() {
        let m = module();
        m.install(vec![
            ("y".to_string(), accessor(|| Ok(Value::Null))),
            ("x".to_string(), accessor(|| Ok(Value::Null))),
        ]);
        assert_eq!(m.keys(), vec!["x", "y"]);
    }

    #[test]
    fn test_set_is_rejected() {
        assert_eq!(
            module().set("x", Value::Null),
            Err(LoaderError::ConstantAssignment)
        );
    }

    #[test]
    fn test_identity_and_weak_handles() {
        let a = module();
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&module()));
        assert_ne!(a.id(), module().id());

        let weak = a.downgrade();
        assert!(weak.upgrade().unwrap().ptr_eq(&a));
        drop(a);
        drop(b);
        assert_eq!(
            weak.upgrade().unwrap_err(),
            LoaderError::Detached("https://a.test/m.js".into())
        );
    }

    #[test]
    fn test_failure_is_recorded() {
        let m = module();
        assert!(m.failure().is_none());
        m.fail(LoaderError::thrown("boom"));
        assert_eq!(m.failure(), Some(LoaderError::thrown("boom")));
    }
}
