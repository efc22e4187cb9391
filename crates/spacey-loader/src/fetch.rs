// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Retrieving module source text.

use crate::config::HttpConfig;
use crate::error::{LoaderError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Maximum number of redirects [`MemoryFetcher`] follows.
const MAX_REDIRECTS: usize = 10;

/// Response to one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Status code; anything at or above 400 is a failure
    pub status: u16,
    /// URL after following redirects
    pub final_url: Url,
    /// Response body
    pub body: String,
}

impl FetchResponse {
    /// A 200 response.
    pub fn ok(final_url: Url, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            final_url,
            body: body.into(),
        }
    }

    /// A 404 response.
    pub fn not_found(final_url: Url) -> Self {
        Self {
            status: 404,
            final_url,
            body: String::new(),
        }
    }

    /// Returns true if the status is below 400.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Retrieves module source for a URL.
///
/// An `Err` is a transport failure (no response at all); a response with a
/// failing status is still `Ok`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`.
    async fn retrieve(&self, url: &Url) -> Result<FetchResponse>;
}

/// Fetches over HTTP(S) with reqwest, following redirects.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn retrieve(&self, url: &Url) -> Result<FetchResponse> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        debug!(status, final_url = %final_url, "fetched");
        let body = if status < 400 {
            response.text().await?
        } else {
            String::new()
        };
        Ok(FetchResponse {
            status,
            final_url,
            body,
        })
    }
}

/// Reads `file://` URLs from disk. A missing file is a 404.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    async fn retrieve(&self, url: &Url) -> Result<FetchResponse> {
        let path = url
            .to_file_path()
            .map_err(|_| LoaderError::invalid_url(url.as_str(), "not a local file path"))?;
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(FetchResponse::ok(url.clone(), body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FetchResponse::not_found(url.clone())),
            Err(e) => Err(LoaderError::Transport(format!("{}: {}", path.display(), e))),
        }
    }
}

/// Serves modules from memory. Useful for tests and for embedding.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    sources: RwLock<HashMap<String, String>>,
    redirects: RwLock<HashMap<String, String>>,
    requests: AtomicUsize,
}

impl MemoryFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `code` at `url`.
    pub fn insert(&self, url: &str, code: &str) -> &Self {
        self.sources.write().insert(url.to_string(), code.to_string());
        self
    }

    /// Redirects `from` to `to`.
    pub fn redirect(&self, from: &str, to: &str) -> &Self {
        self.redirects.write().insert(from.to_string(), to.to_string());
        self
    }

    /// Number of retrievals so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn retrieve(&self, url: &Url) -> Result<FetchResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut current = url.clone();
        for _ in 0..MAX_REDIRECTS {
            let target = self.redirects.read().get(current.as_str()).cloned();
            match target {
                Some(target) => {
                    current = current
                        .join(&target)
                        .map_err(|e| LoaderError::invalid_url(target.as_str(), e))?;
                }
                None => {
                    let body = self.sources.read().get(current.as_str()).cloned();
                    return Ok(match body {
                        Some(body) => FetchResponse::ok(current, body),
                        None => FetchResponse::not_found(current),
                    });
                }
            }
        }
        Err(LoaderError::Transport(format!("Too many redirects: {}", url)))
    }
}

/// Dispatches to a fetcher per URL scheme.
#[derive(Clone, Default)]
pub struct SchemeFetcher {
    fetchers: HashMap<String, Arc<dyn Fetcher>>,
}

impl SchemeFetcher {
    /// Create a dispatcher with no schemes.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default set: `http`/`https` over reqwest and `file` from disk.
    pub fn standard(http: &HttpConfig) -> Result<Self> {
        let client: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(http)?);
        Ok(Self::new()
            .with("http", client.clone())
            .with("https", client)
            .with("file", Arc::new(FileFetcher)))
    }

    /// Routes `scheme` to `fetcher`.
    pub fn with(mut self, scheme: &str, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetchers.insert(scheme.to_ascii_lowercase(), fetcher);
        self
    }
}

#[async_trait]
impl Fetcher for SchemeFetcher {
    async fn retrieve(&self, url: &Url) -> Result<FetchResponse> {
        match self.fetchers.get(url.scheme()) {
            Some(fetcher) => fetcher.retrieve(url).await,
            None => Err(LoaderError::Transport(format!(
                "No fetcher for scheme '{}'",
                url.scheme()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_memory_fetcher() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://a.test/m.js", "export const a = 1;");

        let response = fetcher.retrieve(&url("https://a.test/m.js")).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, "export const a = 1;");

        let missing = fetcher.retrieve(&url("https://a.test/x.js")).await.unwrap();
        assert_eq!(missing.status, 404);
        assert!(!missing.is_success());
        assert_eq!(fetcher.requests(), 2);
    }

    #[tokio::test]
    async fn test_memory_fetcher_redirects() {
        let fetcher = MemoryFetcher::new();
        fetcher
            .insert("https://cdn.test/v2/m.js", "x;")
            .redirect("https://a.test/m.js", "https://cdn.test/v1/m.js")
            .redirect("https://cdn.test/v1/m.js", "../v2/m.js");

        let response = fetcher.retrieve(&url("https://a.test/m.js")).await.unwrap();
        assert_eq!(response.final_url.as_str(), "https://cdn.test/v2/m.js");
        assert_eq!(response.body, "x;");
    }

    #[tokio::test]
    async fn test_redirect_loop() {
        let fetcher = MemoryFetcher::new();
        fetcher.redirect("https://a.test/a.js", "https://a.test/b.js");
        fetcher.redirect("https://a.test/b.js", "https://a.test/a.js");
        let err = fetcher.retrieve(&url("https://a.test/a.js")).await.unwrap_err();
        assert!(matches!(err, LoaderError::Transport(_)));
    }

    #[tokio::test]
    async fn test_file_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.js");
        std::fs::write(&path, "export default 1;").unwrap();

        let response = FileFetcher
            .retrieve(&Url::from_file_path(&path).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "export default 1;");

        let missing = FileFetcher
            .retrieve(&Url::from_file_path(dir.path().join("nope.js")).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_scheme_dispatch() {
        let memory = Arc::new(MemoryFetcher::new());
        memory.insert("mem://pkg/m.js", "m;");
        let fetcher = SchemeFetcher::new().with("mem", memory.clone());

        let response = fetcher.retrieve(&url("mem://pkg/m.js")).await.unwrap();
        assert_eq!(response.body, "m;");
        assert_eq!(memory.requests(), 1);

        let err = fetcher.retrieve(&url("ftp://pkg/m.js")).await.unwrap_err();
        assert!(matches!(err, LoaderError::Transport(_)));
    }
}
