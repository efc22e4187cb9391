// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime configuration.

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for a [`Runtime`](crate::Runtime).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// base_url = "https://example.com/app/"
/// allowed_schemes = ["https"]
///
/// [http]
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Base for store ids that are not absolute URLs
    pub base_url: Option<String>,

    /// HTTP fetcher settings
    pub http: HttpConfig,

    /// URL schemes modules may be loaded from
    pub allowed_schemes: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            http: HttpConfig::default(),
            allowed_schemes: vec!["https".into(), "http".into(), "file".into()],
        }
    }
}

/// HTTP fetcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent header
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("spacey-loader/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RuntimeConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| LoaderError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Checks that `base_url` is an absolute URL.
    pub fn validate(&self) -> Result<()> {
        self.base()?;
        Ok(())
    }

    /// The parsed base URL.
    pub fn base(&self) -> Result<Option<Url>> {
        self.base_url
            .as_deref()
            .map(|base| {
                Url::parse(base).map_err(|e| LoaderError::Config(format!("base_url: {}", e)))
            })
            .transpose()
    }

    /// Returns true if modules may be loaded over `scheme`.
    pub fn allows(&self, scheme: &str) -> bool {
        self.allowed_schemes
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(scheme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.base_url, None);
        assert_eq!(config.http.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.http.user_agent.starts_with("spacey-loader/"));
        assert!(config.allows("https"));
        assert!(config.allows("FILE"));
        assert!(!config.allows("data"));
    }

    #[test]
    fn test_partial_toml() {
        let config = RuntimeConfig::from_toml_str(
            "base_url = \"https://example.com/app/\"\n\n[http]\ntimeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://example.com/app/"));
        assert_eq!(config.http.timeout_secs, 5);
        assert!(config.http.user_agent.starts_with("spacey-loader/"));
        assert_eq!(config.allowed_schemes.len(), 3);
        assert_eq!(
            config.base().unwrap().unwrap().join("m.js").unwrap().as_str(),
            "https://example.com/app/m.js"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = RuntimeConfig::from_toml_str("base_url = \"not a url\"").unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
    }

    #[test]
    fn test_bad_toml() {
        let err = RuntimeConfig::from_toml_str("allowed_schemes = 3").unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "allowed_schemes = [\"https\"]").unwrap();
        let config = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(config.allowed_schemes, vec!["https"]);
        assert!(!config.allows("file"));
    }
}
