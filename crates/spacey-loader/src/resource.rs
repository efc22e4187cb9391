// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiled module artifacts.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use spacey_syntax::SourceMap;

/// One compiled module, as cached by the runtime.
///
/// This is also the persisted shape: serialized with camelCase keys it can
/// be stored and fed back into another runtime with
/// [`Runtime::preload`](crate::Runtime::preload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResource {
    /// Canonical identity of the module
    pub store_id: String,
    /// URL the source was actually served from, after redirects
    pub real_url: String,
    /// Wrapped module code
    pub code: String,
    /// Source map of `code`
    pub map: SourceMap,
    /// Resolved export names
    pub exports: Vec<String>,
}

impl ModuleResource {
    /// The source map as a `data:` URL.
    pub fn source_map_url(&self) -> String {
        format!(
            "data:application/json;base64,{}",
            STANDARD.encode(self.map.to_json())
        )
    }

    /// The code with a source URL comment and, unless the code already
    /// carries one, an inline source map comment.
    pub fn annotated_code(&self) -> String {
        let mut code = format!("{}\n//# sourceURL={}", self.code, self.store_id);
        if !has_source_map_comment(&self.code) {
            code.push_str("\n//# sourceMappingURL=");
            code.push_str(&self.source_map_url());
        }
        code
    }
}

/// Returns true if `code` already has a `sourceMappingURL` comment.
pub fn has_source_map_comment(code: &str) -> bool {
    code.contains("//# sourceMappingURL=") || code.contains("//@ sourceMappingURL=")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(code: &str) -> ModuleResource {
        ModuleResource {
            store_id: "https://a.test/m.js".into(),
            real_url: "https://cdn.a.test/m.js".into(),
            code: code.into(),
            map: SourceMap {
                version: 3,
                file: "m.js".into(),
                sources: vec!["m.js".into()],
                sources_content: vec![None],
                names: Vec::new(),
                mappings: "AAAA".into(),
            },
            exports: vec!["x".into()],
        }
    }

    #[test]
    fn test_camel_case_shape() {
        let json = serde_json::to_value(resource("x;")).unwrap();
        assert_eq!(json["storeId"], "https://a.test/m.js");
        assert_eq!(json["realUrl"], "https://cdn.a.test/m.js");
        assert_eq!(json["exports"][0], "x");
        assert_eq!(json["map"]["mappings"], "AAAA");

        let back: ModuleResource = serde_json::from_value(json).unwrap();
        assert_eq!(back, resource("x;"));
    }

    #[test]
    fn test_source_map_url() {
        let url = resource("x;").source_map_url();
        let encoded = url.strip_prefix("data:application/json;base64,").unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        let map: SourceMap = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(map.file, "m.js");
    }

    #[test]
    fn test_annotated_code() {
        let code = resource("x;").annotated_code();
        assert!(code.starts_with("x;\n//# sourceURL=https://a.test/m.js\n"));
        assert!(code.contains("//# sourceMappingURL=data:application/json;base64,"));

        let mapped = resource("x;\n//@ sourceMappingURL=m.js.map").annotated_code();
        assert_eq!(mapped.matches("sourceMappingURL").count(), 1);
    }

    #[test]
    fn test_has_source_map_comment() {
        assert!(has_source_map_comment("a;\n//# sourceMappingURL=a.map"));
        assert!(has_source_map_comment("a;\n//@ sourceMappingURL=a.map"));
        assert!(!has_source_map_comment("a;"));
    }
}
