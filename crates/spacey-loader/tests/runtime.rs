// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end module graph tests.
//!
//! Sources are served from memory and compiled for real. Each module body is
//! a native closure doing what the compiled code does: install export
//! accessors, import dependencies, run the top level.

use async_trait::async_trait;
use parking_lot::Mutex;
use spacey_loader::{
    Accessor, Capabilities, ErrorKind, FetchResponse, Fetcher, LiveBinding, LoaderError,
    MemoryFetcher, ModuleResource, NativeExecutor, Runtime, RuntimeConfig, Value, accessor,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// A function value exported by a module.
struct HostFn(Accessor);

fn call(value: Value) -> Value {
    let function = value.downcast_host::<HostFn>().expect("Should be a function");
    (function.0)().expect("Should run")
}

struct Harness {
    fetcher: Arc<MemoryFetcher>,
    executor: NativeExecutor,
    runs: Arc<AtomicUsize>,
}

impl Harness {
    fn new(sources: &[(&str, &str)]) -> Self {
        let fetcher = Arc::new(MemoryFetcher::new());
        for (url, code) in sources {
            fetcher.insert(url, code);
        }
        Self {
            fetcher,
            executor: NativeExecutor::new(),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Registers a body that also counts executions.
    fn body<F>(&self, store_id: &str, body: F) -> &Self
    where
        F: Fn(&Capabilities) -> spacey_loader::Result<()> + Send + Sync + 'static,
    {
        let runs = self.runs.clone();
        self.executor.register(store_id, move |caps| {
            runs.fetch_add(1, Ordering::SeqCst);
            body(caps)
        });
        self
    }

    fn runtime(&self) -> Runtime {
        self.runtime_with(RuntimeConfig::default())
    }

    fn runtime_with(&self, config: RuntimeConfig) -> Runtime {
        Runtime::builder()
            .config(config)
            .fetcher(self.fetcher.clone())
            .executor(Arc::new(self.executor.clone()))
            .build()
            .expect("Should build runtime")
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

fn export(caps: &Capabilities, bindings: &[&LiveBinding]) -> spacey_loader::Result<()> {
    caps.export(
        bindings
            .iter()
            .map(|binding| (binding.name().to_string(), binding.accessor()))
            .collect(),
    )
}

/// Holds back responses for one URL until the test hands out a permit.
struct GatedFetcher {
    inner: Arc<MemoryFetcher>,
    gated: &'static str,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn retrieve(&self, url: &Url) -> spacey_loader::Result<FetchResponse> {
        if url.as_str() == self.gated {
            let _permit = self.gate.acquire().await.expect("Gate should stay open");
        }
        self.inner.retrieve(url).await
    }
}

impl Harness {
    /// A runtime whose fetches of `gated` wait on the returned semaphore.
    fn gated_runtime(&self, gated: &'static str) -> (Runtime, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let runtime = Runtime::builder()
            .fetcher(Arc::new(GatedFetcher {
                inner: self.fetcher.clone(),
                gated,
                gate: gate.clone(),
            }))
            .executor(Arc::new(self.executor.clone()))
            .build()
            .expect("Should build runtime");
        (runtime, gate)
    }
}

async fn compiled(runtime: &Runtime, store_id: &str) {
    while runtime.resource(store_id).is_none() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

const A: &str = "https://a.test/a.js";
const B: &str = "https://a.test/b.js";

fn default_and_named() -> Harness {
    let harness = Harness::new(&[
        (A, "export const x = 1;\nexport default 2;\n"),
        (B, "import d, { x } from './a.js';\nexport const result = [d, x];\n"),
    ]);
    harness
        .body(A, |caps| {
            let x = LiveBinding::new("x");
            let default = LiveBinding::new("default");
            export(caps, &[&x, &default])?;
            x.set(1.0);
            default.set(2.0);
            Ok(())
        })
        .body(B, |caps| {
            let result = LiveBinding::new("result");
            export(caps, &[&result])?;
            let a = caps.import("./a.js")?;
            result.set(vec![a.get("default")?, a.get("x")?]);
            Ok(())
        });
    harness
}

#[tokio::test]
async fn test_default_and_named_imports() {
    let harness = default_and_named();
    let runtime = harness.runtime();

    let ns = runtime.import_by_url(B, None).await.unwrap();
    let result = ns.get("result").unwrap();
    assert_eq!(result, Value::Array(vec![Value::Number(2.0), Value::Number(1.0)]));
    assert_eq!(result.to_string(), "[2, 1]");

    let a = runtime.resource(A).unwrap();
    assert_eq!(a.exports, vec!["x", "default"]);
    assert!(a.code.contains("const __VIRTUAL_DEFAULT__ = 2;"));
    let b = runtime.resource(B).unwrap();
    assert!(b.code.contains("[__m0__.default, __m0__.x]"));
}

#[tokio::test]
async fn test_namespace_identity() {
    let harness = default_and_named();
    let runtime = harness.runtime();

    let first = runtime.import_by_url(A, None).await.unwrap();
    let second = runtime.import_by_url(A, None).await.unwrap();
    assert!(first.ptr_eq(&second));

    let module = runtime.module(A).unwrap();
    assert!(runtime.namespace(&module).ptr_eq(&first));
    assert_eq!(harness.runs(), 1);
    assert_eq!(harness.fetcher.requests(), 1);
}

#[tokio::test]
async fn test_namespace_object() {
    let harness = default_and_named();
    let runtime = harness.runtime();
    let ns = runtime.import_by_url(A, None).await.unwrap();

    assert_eq!(ns.keys(), ["default", "x"]);
    assert_eq!(ns.get("x").unwrap(), Value::Number(1.0));
    assert_eq!(ns.get("y").unwrap(), Value::Undefined);
    assert_eq!(
        ns.set("x", Value::Number(5.0)).unwrap_err(),
        LoaderError::ReadOnly("x".into())
    );
    assert_eq!(
        ns.set("y", Value::Null).unwrap_err(),
        LoaderError::NotExtensible("y".into())
    );
    assert_eq!(ns.prototype(), None);
    assert!(!ns.is_extensible());
    assert_eq!(ns.to_string_tag(), "Module");
    assert_eq!(ns.get("x").unwrap(), Value::Number(1.0));
}

#[tokio::test]
async fn test_circular_imports_are_live() {
    let harness = Harness::new(&[
        (
            A,
            "import { seen, current } from './b.js';\nexport let value = 1;\nvalue = 2;\n",
        ),
        (
            B,
            "import { value } from './a.js';\n\
             let seen;\n\
             try { seen = value; } catch (e) { seen = e.message; }\n\
             export { seen };\n\
             export function current() { return value; }\n",
        ),
    ]);
    harness
        .body(A, |caps| {
            let value = LiveBinding::new("value");
            export(caps, &[&value])?;
            caps.import("./b.js")?;
            value.set(1.0);
            value.set(2.0);
            Ok(())
        })
        .body(B, |caps| {
            let seen = LiveBinding::new("seen");
            let a = caps.import("./a.js")?;
            let reader = a.clone();
            let current = Value::Host(Arc::new(HostFn(accessor(move || reader.get("value")))));
            caps.export(vec![
                ("seen".into(), seen.accessor()),
                ("current".into(), accessor(move || Ok(current.clone()))),
            ])?;
            match a.get("value") {
                Ok(value) => seen.set(value),
                Err(err) => seen.set(err.to_string()),
            }
            Ok(())
        });
    let runtime = harness.runtime();

    let a = runtime.import_by_url(A, None).await.unwrap();
    assert_eq!(a.get("value").unwrap(), Value::Number(2.0));

    let b = runtime.import_by_url(B, None).await.unwrap();
    assert_eq!(
        b.get("seen").unwrap(),
        Value::String("ReferenceError: Cannot access 'value' before initialization".into())
    );
    assert_eq!(call(b.get("current").unwrap()), Value::Number(2.0));
    assert_eq!(harness.runs(), 2);
}

#[tokio::test]
async fn test_export_all_ambiguity() {
    let harness = Harness::new(&[
        ("https://a.test/x.js", "export const x = 'x1';\nexport const onlyX = 1;\n"),
        ("https://a.test/y.js", "export const x = 'x2';\nexport const onlyY = 2;\n"),
        (
            "https://a.test/all.js",
            "export * from './x.js';\nexport * from './y.js';\n",
        ),
    ]);
    harness
        .body("https://a.test/x.js", |caps| {
            let x = LiveBinding::new("x");
            let only = LiveBinding::new("onlyX");
            export(caps, &[&x, &only])?;
            x.set("x1");
            only.set(1.0);
            Ok(())
        })
        .body("https://a.test/y.js", |caps| {
            let x = LiveBinding::new("x");
            let only = LiveBinding::new("onlyY");
            export(caps, &[&x, &only])?;
            x.set("x2");
            only.set(2.0);
            Ok(())
        })
        .body("https://a.test/all.js", |caps| {
            let x = caps.import("./x.js")?;
            let y = caps.import("./y.js")?;
            caps.export(vec![
                ("onlyX".into(), accessor(move || x.get("onlyX"))),
                ("onlyY".into(), accessor(move || y.get("onlyY"))),
            ])
        });
    let runtime = harness.runtime();

    let ns = runtime
        .import_by_url("https://a.test/all.js", None)
        .await
        .unwrap();
    let resource = runtime.resource("https://a.test/all.js").unwrap();
    assert!(!resource.exports.contains(&"x".to_string()));
    assert_eq!(ns.keys(), ["onlyX", "onlyY"]);
    assert!(!ns.has("x"));
    assert_eq!(ns.get("x").unwrap(), Value::Undefined);
    assert_eq!(ns.get("onlyY").unwrap(), Value::Number(2.0));
}

#[tokio::test]
async fn test_missing_export_is_static() {
    let harness = Harness::new(&[
        ("https://a.test/lib.js", "export const area = 1;\n"),
        (
            "https://a.test/main.js",
            "import { PI } from './lib.js';\nexport const tau = PI * 2;\n",
        ),
    ]);
    harness
        .body("https://a.test/lib.js", |_| Ok(()))
        .body("https://a.test/main.js", |_| Ok(()));
    let runtime = harness.runtime();

    let err = runtime
        .import_by_url("https://a.test/main.js", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Static);
    let message = err.to_string();
    assert!(message.contains("https://a.test/main.js"));
    assert!(message.contains("'./lib.js'"));
    assert!(message.contains("'PI'"));
    assert_eq!(harness.runs(), 0);

    // The dependency compiled fine and stays cached
    assert!(runtime.resource("https://a.test/lib.js").is_some());
    assert!(runtime.resource("https://a.test/main.js").is_none());
}

#[tokio::test]
async fn test_concurrent_importers_share_one_fetch() {
    let harness = default_and_named();
    let runtime = harness.runtime();

    let (first, second) = tokio::join!(
        runtime.import_by_url(B, None),
        runtime.import_by_url(B, None)
    );
    assert!(first.unwrap().ptr_eq(&second.unwrap()));
    assert_eq!(harness.fetcher.requests(), 2);
    assert_eq!(harness.runs(), 2);
}

#[tokio::test]
async fn test_absent_module() {
    let harness = Harness::new(&[(
        "https://a.test/main.js",
        "import { x } from './gone.js';\nexport const y = x;\n",
    )]);
    harness.body("https://a.test/main.js", |caps| {
        let gone = caps.import("./gone.js")?;
        caps.export(vec![("y".into(), accessor(move || gone.get("x")))])
    });
    let runtime = harness.runtime();

    let err = runtime
        .import_by_url("https://a.test/main.js", None)
        .await
        .unwrap_err();
    assert_eq!(err, LoaderError::NotFound("https://a.test/gone.js".into()));
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(runtime.absent(), vec!["https://a.test/gone.js"]);

    // Failures are cached; nothing is fetched again
    let requests = harness.fetcher.requests();
    runtime
        .import_by_url("https://a.test/main.js", None)
        .await
        .unwrap_err();
    assert_eq!(harness.fetcher.requests(), requests);
}

#[tokio::test]
async fn test_body_failure_is_cached() {
    let harness = Harness::new(&[("https://a.test/boom.js", "throw new Error('boom');\n")]);
    harness.body("https://a.test/boom.js", |_| Err(LoaderError::thrown("Error: boom")));
    let runtime = harness.runtime();

    for _ in 0..2 {
        let err = runtime
            .import_by_url("https://a.test/boom.js", None)
            .await
            .unwrap_err();
        assert_eq!(err, LoaderError::Thrown("Error: boom".into()));
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }
    assert_eq!(harness.runs(), 1);
}

#[tokio::test]
async fn test_redirects_keep_store_id() {
    let meta_url = Arc::new(Mutex::new(String::new()));
    let harness = Harness::new(&[
        (
            "https://cdn.test/v2/entry.js",
            "import { dep } from './dep.js';\nexport const url = import.meta.url;\n",
        ),
        ("https://cdn.test/v2/dep.js", "export const dep = 1;\n"),
    ]);
    harness.fetcher.redirect("https://a.test/entry.js", "https://cdn.test/v2/entry.js");
    let seen = meta_url.clone();
    harness
        .body("https://a.test/entry.js", move |caps| {
            caps.import("./dep.js")?;
            *seen.lock() = caps.import_meta().url;
            Ok(())
        })
        .body("https://a.test/dep.js", |_| Ok(()));
    let runtime = harness.runtime();

    runtime
        .import_by_url("https://a.test/entry.js", None)
        .await
        .unwrap();

    let entry = runtime.resource("https://a.test/entry.js").unwrap();
    assert_eq!(entry.real_url, "https://cdn.test/v2/entry.js");
    let dep = runtime.resource("https://a.test/dep.js").unwrap();
    assert_eq!(dep.real_url, "https://cdn.test/v2/dep.js");
    assert_eq!(*meta_url.lock(), "https://cdn.test/v2/entry.js");
    assert!(entry.code.contains("__VIRTUAL_IMPORT_META__.meta.url"));
}

#[tokio::test]
async fn test_query_strings_are_distinct_modules() {
    let harness = Harness::new(&[
        ("https://a.test/m.js?v=1", "export const v = 1;\n"),
        ("https://a.test/m.js?v=2", "export const v = 2;\n"),
    ]);
    for version in [1u8, 2] {
        harness.body(&format!("https://a.test/m.js?v={}", version), move |caps| {
            let v = LiveBinding::new("v");
            export(caps, &[&v])?;
            v.set(f64::from(version));
            Ok(())
        });
    }
    let runtime = harness.runtime();

    let one = runtime.import_by_url("https://a.test/m.js?v=1", None).await.unwrap();
    let two = runtime.import_by_url("https://a.test/m.js?v=2", None).await.unwrap();
    assert!(!one.ptr_eq(&two));
    assert_eq!(one.get("v").unwrap(), Value::Number(1.0));
    assert_eq!(two.get("v").unwrap(), Value::Number(2.0));
    assert_eq!(harness.runs(), 2);
}

#[tokio::test]
async fn test_import_by_code() {
    let harness = default_and_named();
    harness.body("https://a.test/inline.js", |caps| {
        let a = caps.import("./a.js")?;
        let y = LiveBinding::new("y");
        export(caps, &[&y])?;
        let x = a.get("x")?.as_number().unwrap_or_default();
        y.set(x + 1.0);
        Ok(())
    });
    let runtime = harness.runtime();

    let ns = runtime
        .import_by_code(
            "import { x } from './a.js';\nexport const y = x + 1;\n",
            "https://a.test/inline.js",
            None,
        )
        .await
        .unwrap();
    assert_eq!(ns.keys(), ["y"]);
    assert_eq!(ns.get("y").unwrap(), Value::Number(2.0));

    // Not registered under its store id
    assert!(runtime.module("https://a.test/inline.js").is_none());
    assert!(runtime.module(A).is_some());
}

#[tokio::test]
async fn test_dynamic_import() {
    let stash: Arc<Mutex<Option<Capabilities>>> = Arc::new(Mutex::new(None));
    let harness = Harness::new(&[
        (
            "https://a.test/app/main.js",
            "export const load = () => import('./lazy.js');\n",
        ),
        ("https://a.test/app/lazy.js", "export const lazy = true;\n"),
    ]);
    let keep = stash.clone();
    harness
        .body("https://a.test/app/main.js", move |caps| {
            *keep.lock() = Some(caps.clone());
            Ok(())
        })
        .body("https://a.test/app/lazy.js", |caps| {
            let lazy = LiveBinding::new("lazy");
            export(caps, &[&lazy])?;
            lazy.set(true);
            Ok(())
        });
    let runtime = harness.runtime();

    runtime
        .import_by_url("https://a.test/app/main.js", None)
        .await
        .unwrap();
    assert!(runtime.resource("https://a.test/app/lazy.js").is_none());

    let caps = stash.lock().clone().unwrap();
    let ns = caps.dynamic_import("./lazy.js").await.unwrap();
    assert_eq!(ns.get("lazy").unwrap(), Value::Boolean(true));

    let again = runtime
        .dynamic_import("./lazy.js", Some("https://a.test/app/main.js"))
        .await
        .unwrap();
    assert!(ns.ptr_eq(&again));
    assert_eq!(harness.runs(), 2);
}

#[tokio::test]
async fn test_base_url_resolves_relative_ids() {
    let harness = default_and_named();
    let runtime = harness.runtime_with(RuntimeConfig {
        base_url: Some("https://a.test/".into()),
        ..RuntimeConfig::default()
    });

    let ns = runtime.import_by_url("b.js", None).await.unwrap();
    assert_eq!(ns.store_id(), B);
}

#[tokio::test]
async fn test_preloaded_resources_run_without_fetching() {
    let harness = default_and_named();
    let source = harness.runtime();
    source.compile_and_fetch(B, None).await.unwrap();
    let saved: Vec<String> = source
        .resources()
        .iter()
        .map(|resource| serde_json::to_string(&**resource).unwrap())
        .collect();
    assert_eq!(saved.len(), 2);
    let requests = harness.fetcher.requests();

    let target = harness.runtime();
    for json in &saved {
        let resource: ModuleResource = serde_json::from_str(json).unwrap();
        assert!(target.preload(resource));
    }
    let ns = target.import_by_url(B, None).await.unwrap();
    assert_eq!(ns.get("result").unwrap().to_string(), "[2, 1]");
    assert_eq!(harness.fetcher.requests(), requests);
}

#[tokio::test]
async fn test_teardown_detaches_namespaces() {
    let harness = default_and_named();
    let runtime = harness.runtime();
    let ns = runtime.import_by_url(A, None).await.unwrap();

    runtime.teardown();
    assert!(runtime.module(A).is_none());
    assert!(matches!(ns.get("x"), Err(LoaderError::Detached(_))));

    let fresh = runtime.import_by_url(A, None).await.unwrap();
    assert!(!fresh.ptr_eq(&ns));
    assert_eq!(fresh.get("x").unwrap(), Value::Number(1.0));
}

#[tokio::test]
async fn test_separate_runtimes_are_isolated() {
    let harness = default_and_named();
    let first = harness.runtime();
    let second = harness.runtime();

    let a = first.import_by_url(A, None).await.unwrap();
    let b = second.import_by_url(A, None).await.unwrap();
    assert!(!a.ptr_eq(&b));
    assert_eq!(harness.runs(), 2);
}

#[tokio::test]
async fn test_scheme_not_allowed() {
    let harness = default_and_named();
    let runtime = harness.runtime_with(RuntimeConfig {
        allowed_schemes: vec!["file".into()],
        ..RuntimeConfig::default()
    });
    let err = runtime.import_by_url(A, None).await.unwrap_err();
    assert!(matches!(err, LoaderError::SchemeNotAllowed { ref scheme, .. } if scheme == "https"));
    assert_eq!(harness.fetcher.requests(), 0);
}

#[tokio::test]
async fn test_cycle_peer_waits_for_pending_compile() {
    const SLOW: &str = "https://a.test/slow.js";
    let harness = Harness::new(&[
        (A, "import './b.js';\nimport './slow.js';\nexport const a = 1;\n"),
        (B, "import { a } from './a.js';\nexport const b = 2;\n"),
        (SLOW, "export const s = 3;\n"),
    ]);
    harness
        .body(A, |caps| {
            let a = LiveBinding::new("a");
            export(caps, &[&a])?;
            caps.import("./b.js")?;
            caps.import("./slow.js")?;
            a.set(1.0);
            Ok(())
        })
        .body(B, |caps| {
            let b = LiveBinding::new("b");
            export(caps, &[&b])?;
            caps.import("./a.js")?;
            b.set(2.0);
            Ok(())
        })
        .body(SLOW, |caps| {
            let s = LiveBinding::new("s");
            export(caps, &[&s])?;
            s.set(3.0);
            Ok(())
        });
    let (runtime, gate) = harness.gated_runtime(SLOW);

    // B breaks the cycle and compiles while A still waits on slow.js
    let (first, second, ()) = tokio::join!(
        runtime.import_by_url(A, None),
        async {
            compiled(&runtime, B).await;
            assert!(runtime.resource(A).is_none());
            runtime.import_by_url(B, None).await
        },
        async {
            compiled(&runtime, B).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            gate.add_permits(1);
        }
    );

    assert_eq!(first.unwrap().get("a").unwrap(), Value::Number(1.0));
    assert_eq!(second.unwrap().get("b").unwrap(), Value::Number(2.0));
    assert_eq!(harness.runs(), 3);
    assert!(runtime.import_by_url(B, None).await.is_ok());
}

#[tokio::test]
async fn test_import_of_pending_module_is_not_cached() {
    const MAIN: &str = "https://a.test/main.js";
    const LATER: &str = "https://a.test/later.js";
    let harness = Harness::new(&[
        (MAIN, "export const ready = true;\n"),
        (LATER, "export const x = 1;\n"),
    ]);
    harness
        .body(MAIN, |caps| {
            caps.import("./later.js")?;
            caps.export(vec![("ready".into(), accessor(|| Ok(Value::Boolean(true))))])
        })
        .body(LATER, |caps| {
            caps.export(vec![("x".into(), accessor(|| Ok(Value::Number(1.0))))])
        });
    let (runtime, gate) = harness.gated_runtime(LATER);

    let (compiled, ()) = tokio::join!(runtime.compile_and_fetch(LATER, None), async {
        let err = runtime.import_by_url(MAIN, None).await.unwrap_err();
        assert_eq!(err, LoaderError::NotCompiled(LATER.into()));
        assert!(runtime.module(MAIN).is_none());
        gate.add_permits(1);
    });
    compiled.unwrap();

    let ns = runtime.import_by_url(MAIN, None).await.unwrap();
    assert_eq!(ns.get("ready").unwrap(), Value::Boolean(true));
    assert_eq!(harness.runs(), 3);
}
