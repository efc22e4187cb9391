// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The module graph runtime.
//!
//! Loading happens in two phases:
//!
//! 1. **Compile**: [`Runtime::compile_and_fetch`] fetches a module, compiles
//!    it, and recursively does the same for its static dependencies before
//!    generating its code, so the export lists needed for name validation
//!    and `export *` are known. One compile task exists per store id and is
//!    shared by every importer.
//! 2. **Execute**: [`Runtime::import`] runs a compiled module body on first
//!    use. The module record is registered before the body runs, so a cycle
//!    that re-enters the module gets the same, partially initialized record.
//!
//! A module inside a cycle can finish compiling before its peers do. Entry
//! points therefore wait until nothing reachable from the entry is still
//! compiling before they execute anything.

use crate::capabilities::Capabilities;
use crate::config::RuntimeConfig;
use crate::error::{LoaderError, Result};
use crate::executor::{Executor, NativeExecutor};
use crate::fetch::{Fetcher, SchemeFetcher};
use crate::memory::MemoryModule;
use crate::namespace::Namespace;
use crate::resource::ModuleResource;
use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared, try_join_all};
use parking_lot::Mutex;
use spacey_compiler::{Compiler, CompilerOptions, ExportLookup, Transformed};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};
use url::Url;

type CompileTask = Shared<BoxFuture<'static, Result<()>>>;

/// State of one store id in the resource cache.
enum ResourceSlot {
    /// Being fetched and compiled
    Pending(CompileTask),
    /// Compiled
    Ready(Arc<ModuleResource>),
    /// Fetching failed; importing it fails without fetching again
    Absent,
}

pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    base: Option<Url>,
    fetcher: Arc<dyn Fetcher>,
    executor: Arc<dyn Executor>,
    resources: Mutex<HashMap<String, ResourceSlot>>,
    /// Export names of modules that are transformed but still compiling
    declared: Mutex<HashMap<String, Vec<String>>>,
    /// Wait-for graph between compile tasks: waiter -> targets
    waits: Mutex<HashMap<String, HashSet<String>>>,
    /// Static dependencies of compiled modules: store id -> child store ids
    edges: Mutex<HashMap<String, Vec<String>>>,
    modules: Mutex<HashMap<String, MemoryModule>>,
    /// Namespaces by module id; the module is kept alive alongside
    namespaces: Mutex<HashMap<u64, (MemoryModule, Namespace)>>,
}

/// Resolves `specifier` against the absolute URL `base`.
pub fn resolve(base: &str, specifier: &str) -> Result<Url> {
    let base = Url::parse(base).map_err(|e| LoaderError::invalid_url(base, e))?;
    base.join(specifier)
        .map_err(|e| LoaderError::invalid_url(specifier, e))
}

/// Loads, links and runs virtualized modules.
///
/// `Runtime` is a cheap handle; clones share the same caches. Separate
/// runtimes share nothing.
///
/// # Example
///
/// ```rust
/// use spacey_loader::{MemoryFetcher, NativeExecutor, Runtime, Value, LiveBinding};
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let fetcher = Arc::new(MemoryFetcher::new());
/// fetcher.insert("https://example.com/answer.js", "export const answer = 42;");
///
/// let executor = NativeExecutor::new();
/// executor.register("https://example.com/answer.js", |caps| {
///     let answer = LiveBinding::new("answer");
///     caps.export(vec![("answer".into(), answer.accessor())])?;
///     answer.set(42.0);
///     Ok(())
/// });
///
/// let runtime = Runtime::builder()
///     .fetcher(fetcher)
///     .executor(Arc::new(executor))
///     .build()
///     .unwrap();
///
/// let ns = runtime
///     .import_by_url("https://example.com/answer.js", None)
///     .await
///     .unwrap();
/// assert_eq!(ns.get("answer").unwrap(), Value::Number(42.0));
/// # });
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Starts building a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// A runtime with the default configuration, fetchers and executor.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub(crate) fn from_inner(inner: Arc<RuntimeInner>) -> Self {
        Self { inner }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Resolves a store id: absolute URLs as they are, anything else
    /// against the configured `base_url`.
    pub fn resolve_id(&self, id: &str) -> Result<Url> {
        match Url::parse(id) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.inner.base {
                Some(base) => base.join(id).map_err(|e| LoaderError::invalid_url(id, e)),
                None => Err(LoaderError::invalid_url(
                    id,
                    "relative module url and no base_url configured",
                )),
            },
            Err(e) => Err(LoaderError::invalid_url(id, e)),
        }
    }

    /// Fetches and compiles a module and its static dependency graph.
    ///
    /// `request_url` is where to fetch from when it differs from the store
    /// id. Failing to fetch is not an error here: the module is cached as
    /// absent and importing it fails later.
    #[instrument(skip(self))]
    pub async fn compile_and_fetch(&self, store_id: &str, request_url: Option<&str>) -> Result<()> {
        let store = self.resolve_id(store_id)?;
        let request = match request_url {
            Some(url) => self.resolve_id(url)?,
            None => store.clone(),
        };
        self.ensure(store.to_string(), request, None).await
    }

    /// Returns the compile task for `store_id`, starting one if needed.
    ///
    /// `waiter` is the module whose compilation waits on this one. A wait
    /// that would close a cycle in the wait-for graph completes at once;
    /// the waiter then works with the declared exports of the target.
    fn ensure(
        &self,
        store_id: String,
        request: Url,
        waiter: Option<String>,
    ) -> BoxFuture<'static, Result<()>> {
        let task = {
            let mut resources = self.inner.resources.lock();
            match resources.get(&store_id) {
                Some(ResourceSlot::Ready(_) | ResourceSlot::Absent) => {
                    return future::ready(Ok(())).boxed();
                }
                Some(ResourceSlot::Pending(task)) => task.clone(),
                None => {
                    let weak = Arc::downgrade(&self.inner);
                    let id = store_id.clone();
                    let task = async move {
                        let inner = weak.upgrade().ok_or(LoaderError::RuntimeDropped)?;
                        Runtime::from_inner(inner).compile_task(id, request).await
                    }
                    .boxed()
                    .shared();
                    resources.insert(store_id.clone(), ResourceSlot::Pending(task.clone()));
                    task
                }
            }
        };

        let guard = match waiter {
            Some(waiter) => {
                let mut waits = self.inner.waits.lock();
                if reaches(&waits, &store_id, &waiter) {
                    debug!(waiter = %waiter, target = %store_id, "circular import, not waiting");
                    return future::ready(Ok(())).boxed();
                }
                waits
                    .entry(waiter.clone())
                    .or_default()
                    .insert(store_id.clone());
                Some(WaitGuard {
                    inner: Arc::downgrade(&self.inner),
                    waiter,
                    target: store_id,
                })
            }
            None => None,
        };

        async move {
            let result = task.await;
            drop(guard);
            result
        }
        .boxed()
    }

    async fn compile_task(self, store_id: String, request: Url) -> Result<()> {
        let result = self.load(&store_id, &request).await;
        self.inner.declared.lock().remove(&store_id);

        let mut resources = self.inner.resources.lock();
        match result {
            Ok(Some(resource)) => {
                info!(store_id = %store_id, exports = resource.exports.len(), "module compiled");
                resources.insert(store_id, ResourceSlot::Ready(Arc::new(resource)));
                Ok(())
            }
            Ok(None) => {
                resources.insert(store_id, ResourceSlot::Absent);
                Ok(())
            }
            Err(err) => {
                warn!(store_id = %store_id, error = %err, "module failed to compile");
                resources.remove(&store_id);
                self.inner.edges.lock().remove(&store_id);
                Err(err)
            }
        }
    }

    /// Fetches and compiles one module. `Ok(None)` means absent.
    async fn load(&self, store_id: &str, request: &Url) -> Result<Option<ModuleResource>> {
        if !self.inner.config.allows(request.scheme()) {
            return Err(LoaderError::SchemeNotAllowed {
                scheme: request.scheme().to_string(),
                url: request.to_string(),
            });
        }

        let response = match self.inner.fetcher.retrieve(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %request, error = %err, "fetch failed");
                return Ok(None);
            }
        };
        if !response.is_success() {
            warn!(url = %request, status = response.status, "module not available");
            return Ok(None);
        }

        let (resource, dependencies) = self
            .analyse(&response.body, store_id, &response.final_url)
            .await?;
        self.inner
            .edges
            .lock()
            .insert(store_id.to_string(), dependencies);
        Ok(Some(resource))
    }

    /// Compiles source text, waits for its dependency graph, and generates
    /// the module's code. Also returns the store ids of the dependencies.
    async fn analyse(
        &self,
        code: &str,
        store_id: &str,
        real_url: &Url,
    ) -> Result<(ModuleResource, Vec<String>)> {
        let transformed = Compiler::new(CompilerOptions {
            code: code.to_string(),
            store_id: store_id.to_string(),
            filename: store_id.to_string(),
        })?
        .transform();

        // Visible to dependents in a cycle before this module finishes
        if !has_star_exports(&transformed) {
            self.inner
                .declared
                .lock()
                .insert(store_id.to_string(), transformed.exports().to_vec());
        }

        let mut dependencies = Vec::new();
        let children = transformed
            .dependencies()
            .map(|specifier| {
                let child = resolve(store_id, specifier)?;
                let request = real_url
                    .join(specifier)
                    .map_err(|e| LoaderError::invalid_url(specifier, e))?;
                dependencies.push(child.to_string());
                Ok(self.ensure(child.to_string(), request, Some(store_id.to_string())))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(store_id, dependencies = children.len(), "waiting for dependencies");
        try_join_all(children).await?;

        let output = transformed.generate_code(&GraphExports {
            runtime: self,
            importer: store_id,
        })?;
        let resource = ModuleResource {
            store_id: store_id.to_string(),
            real_url: real_url.to_string(),
            code: output.code,
            map: output.map,
            exports: output.exports,
        };
        Ok((resource, dependencies))
    }

    /// Waits until no module reachable from `roots` is still compiling.
    ///
    /// A compile task that breaks a cycle finishes without waiting for its
    /// peer, so a compiled module may still depend on a pending one. Waiting
    /// can start new waits further down, hence the loop.
    async fn settle(&self, roots: &[String]) -> Result<()> {
        loop {
            let pending = self.pending_from(roots);
            if pending.is_empty() {
                return Ok(());
            }
            debug!(pending = pending.len(), "waiting for the graph to finish compiling");
            try_join_all(pending).await?;
        }
    }

    /// Compile tasks still pending in the graph reachable from `roots`.
    fn pending_from(&self, roots: &[String]) -> Vec<CompileTask> {
        let resources = self.inner.resources.lock();
        let edges = self.inner.edges.lock();
        let mut stack: Vec<&str> = roots.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(ResourceSlot::Pending(task)) = resources.get(id) {
                pending.push(task.clone());
            }
            if let Some(children) = edges.get(id) {
                stack.extend(children.iter().map(String::as_str));
            }
        }
        pending
    }

    /// Export names known for a module: final if compiled, declared if it
    /// is still compiling, unknown otherwise.
    fn known_exports(&self, store_id: &str) -> Option<Vec<String>> {
        match self.inner.resources.lock().get(store_id) {
            Some(ResourceSlot::Ready(resource)) => return Some(resource.exports.clone()),
            Some(ResourceSlot::Absent) => return None,
            _ => {}
        }
        self.inner.declared.lock().get(store_id).cloned()
    }

    /// Returns the live record of a compiled module, running its body on
    /// first use.
    ///
    /// Used by `__VIRTUAL_IMPORT__`, so it is synchronous: the module must
    /// already be compiled.
    pub fn import(&self, store_id: &str) -> Result<MemoryModule> {
        let url = self.resolve_id(store_id)?;
        let store_id = url.as_str();

        if let Some(module) = self.module(store_id) {
            return match module.failure() {
                Some(err) => Err(err),
                None => Ok(module),
            };
        }

        let resource = match self.inner.resources.lock().get(store_id) {
            Some(ResourceSlot::Ready(resource)) => resource.clone(),
            Some(ResourceSlot::Pending(_)) => {
                return Err(LoaderError::NotCompiled(store_id.to_string()));
            }
            Some(ResourceSlot::Absent) | None => {
                return Err(LoaderError::NotFound(store_id.to_string()));
            }
        };

        let module = match self.inner.modules.lock().entry(store_id.to_string()) {
            Entry::Occupied(entry) => return Ok(entry.get().clone()),
            Entry::Vacant(entry) => entry
                .insert(MemoryModule::new(store_id, resource.exports.clone()))
                .clone(),
        };
        self.execute(&resource, &module)?;
        Ok(module)
    }

    fn execute(&self, resource: &ModuleResource, module: &MemoryModule) -> Result<()> {
        let capabilities = Capabilities::new(
            Arc::downgrade(&self.inner),
            module,
            &resource.store_id,
            &resource.real_url,
        );
        debug!(store_id = %resource.store_id, "executing module");
        if let Err(err) = self.inner.executor.execute(resource, capabilities) {
            if matches!(err, LoaderError::NotCompiled(_)) {
                // Not a failure of this module: it can run once the
                // dependency has compiled
                let mut modules = self.inner.modules.lock();
                if modules
                    .get(&resource.store_id)
                    .is_some_and(|registered| registered.ptr_eq(module))
                {
                    modules.remove(&resource.store_id);
                }
            } else {
                module.fail(err.clone());
            }
            return Err(err);
        }
        Ok(())
    }

    /// Entry point: compiles `store_id` (fetching from `request_url` if
    /// given), runs it, and returns its namespace.
    #[instrument(skip(self))]
    pub async fn import_by_url(&self, store_id: &str, request_url: Option<&str>) -> Result<Namespace> {
        if store_id.is_empty() {
            return Err(LoaderError::MissingUrl);
        }
        let store = self.resolve_id(store_id)?;
        if self.module(store.as_str()).is_none() {
            let request = match request_url {
                Some(url) => self.resolve_id(url)?,
                None => store.clone(),
            };
            self.ensure(store.to_string(), request, None).await?;
            self.settle(&[store.to_string()]).await?;
        }
        let module = self.import(store.as_str())?;
        Ok(self.namespace(&module))
    }

    /// `import(specifier)` from host code. With an `importer`, the
    /// specifier resolves against the importer's store id and is fetched
    /// relative to the importer's real URL.
    pub async fn dynamic_import(&self, specifier: &str, importer: Option<&str>) -> Result<Namespace> {
        let (store, request) = match importer {
            Some(importer) => {
                let importer = self.resolve_id(importer)?;
                let real_url = self
                    .resource(importer.as_str())
                    .map(|resource| resource.real_url.clone())
                    .unwrap_or_else(|| importer.to_string());
                (
                    resolve(importer.as_str(), specifier)?,
                    resolve(&real_url, specifier)?,
                )
            }
            None => {
                let url = self.resolve_id(specifier)?;
                (url.clone(), url)
            }
        };
        self.import_by_url(store.as_str(), Some(request.as_str()))
            .await
    }

    /// Compiles and runs source text directly.
    ///
    /// Dependencies are fetched as usual. The module itself gets a fresh
    /// record that is not registered under `store_id`, so importing
    /// `store_id` elsewhere loads it separately. `meta_url` becomes
    /// `import.meta.url` and the base for fetching dependencies.
    #[instrument(skip(self, code))]
    pub async fn import_by_code(
        &self,
        code: &str,
        store_id: &str,
        meta_url: Option<&str>,
    ) -> Result<Namespace> {
        if code.is_empty() {
            return Err(LoaderError::MissingCode);
        }
        if store_id.is_empty() {
            return Err(LoaderError::MissingFilename);
        }
        let store = self.resolve_id(store_id)?;
        let real_url = match meta_url {
            Some(url) => self.resolve_id(url)?,
            None => store.clone(),
        };

        let analysed = self.analyse(code, store.as_str(), &real_url).await;
        self.inner.declared.lock().remove(store.as_str());
        let (resource, dependencies) = analysed?;
        self.settle(&dependencies).await?;

        let module = MemoryModule::new(store.as_str(), resource.exports.clone());
        self.execute(&resource, &module)?;
        Ok(self.namespace(&module))
    }

    /// The namespace object of a module record, created once per record.
    pub fn namespace(&self, module: &MemoryModule) -> Namespace {
        let mut namespaces = self.inner.namespaces.lock();
        let (_, namespace) = namespaces
            .entry(module.id())
            .or_insert_with(|| (module.clone(), Namespace::new(module)));
        namespace.clone()
    }

    /// The executed record of a module, if it has run.
    pub fn module(&self, store_id: &str) -> Option<MemoryModule> {
        self.inner.modules.lock().get(store_id).cloned()
    }

    /// The compiled resource of a module, if it is compiled.
    pub fn resource(&self, store_id: &str) -> Option<Arc<ModuleResource>> {
        match self.inner.resources.lock().get(store_id) {
            Some(ResourceSlot::Ready(resource)) => Some(resource.clone()),
            _ => None,
        }
    }

    /// Every compiled resource, by store id.
    pub fn resources(&self) -> Vec<Arc<ModuleResource>> {
        let mut resources: Vec<_> = self
            .inner
            .resources
            .lock()
            .values()
            .filter_map(|slot| match slot {
                ResourceSlot::Ready(resource) => Some(resource.clone()),
                _ => None,
            })
            .collect();
        resources.sort_by(|a, b| a.store_id.cmp(&b.store_id));
        resources
    }

    /// Store ids cached as absent, sorted.
    pub fn absent(&self) -> Vec<String> {
        let mut absent: Vec<_> = self
            .inner
            .resources
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot, ResourceSlot::Absent))
            .map(|(id, _)| id.clone())
            .collect();
        absent.sort();
        absent
    }

    /// Seeds the cache with a previously compiled resource. Returns false
    /// if the store id is already known.
    pub fn preload(&self, resource: ModuleResource) -> bool {
        match self.inner.resources.lock().entry(resource.store_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(ResourceSlot::Ready(Arc::new(resource)));
                true
            }
        }
    }

    /// Drops every cached resource, module and namespace. Namespaces handed
    /// out earlier stop resolving.
    pub fn teardown(&self) {
        self.inner.resources.lock().clear();
        self.inner.declared.lock().clear();
        self.inner.waits.lock().clear();
        self.inner.edges.lock().clear();
        self.inner.modules.lock().clear();
        self.inner.namespaces.lock().clear();
        debug!("runtime torn down");
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("resources", &self.inner.resources.lock().len())
            .field("modules", &self.inner.modules.lock().len())
            .field("namespaces", &self.inner.namespaces.lock().len())
            .finish()
    }
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config: Option<RuntimeConfig>,
    fetcher: Option<Arc<dyn Fetcher>>,
    executor: Option<Arc<dyn Executor>>,
}

impl RuntimeBuilder {
    /// Sets the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the fetcher. Defaults to HTTP(S) plus `file://`.
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the executor. Defaults to an empty [`NativeExecutor`].
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> Result<Runtime> {
        let config = self.config.unwrap_or_default();
        let base = config.base()?;
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(SchemeFetcher::standard(&config.http)?),
        };
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(NativeExecutor::new()));

        Ok(Runtime {
            inner: Arc::new(RuntimeInner {
                config,
                base,
                fetcher,
                executor,
                resources: Mutex::new(HashMap::new()),
                declared: Mutex::new(HashMap::new()),
                waits: Mutex::new(HashMap::new()),
                edges: Mutex::new(HashMap::new()),
                modules: Mutex::new(HashMap::new()),
                namespaces: Mutex::new(HashMap::new()),
            }),
        })
    }
}

/// Removes a wait-for edge when the wait ends, including when the waiting
/// future is dropped.
struct WaitGuard {
    inner: Weak<RuntimeInner>,
    waiter: String,
    target: String,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut waits = inner.waits.lock();
            if let Some(targets) = waits.get_mut(&self.waiter) {
                targets.remove(&self.target);
                if targets.is_empty() {
                    waits.remove(&self.waiter);
                }
            }
        }
    }
}

/// Returns true if `to` is reachable from `from` in the wait-for graph.
fn reaches(waits: &HashMap<String, HashSet<String>>, from: &str, to: &str) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        if let Some(targets) = waits.get(node) {
            stack.extend(targets.iter().map(String::as_str));
        }
    }
    false
}

/// True if the module has `export * from` entries, whose names are only
/// known after its dependencies compile.
fn has_star_exports(transformed: &Transformed) -> bool {
    transformed
        .imports()
        .iter()
        .any(|info| info.is_export && info.names.is_empty())
}

/// Answers export lists for the compiler, resolving specifiers against the
/// importing module.
struct GraphExports<'a> {
    runtime: &'a Runtime,
    importer: &'a str,
}

impl ExportLookup for GraphExports<'_> {
    fn exports_of(&self, module_id: &str) -> Option<Vec<String>> {
        let store_id = resolve(self.importer, module_id).ok()?;
        self.runtime.known_exports(store_id.as_str())
    }
}
