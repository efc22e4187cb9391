// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiling a small module graph the way a loader drives the compiler:
//! transform every module first, then generate code with the export lists
//! of the dependencies known.

use spacey_compiler::{
    CompileError, Compiler, CompilerOptions, ExportLookup, Output, Transformed, VIRTUAL_EXPORT,
};
use spacey_syntax::parse_module;
use std::collections::HashMap;

const MODULES: &[(&str, &str)] = &[
    (
        "./math.js",
        "export const PI = 3.14;\n\
         export function area(r) { return PI * r * r; }\n\
         export default 'math';",
    ),
    (
        "./strings.js",
        "export const upper = (s) => s.toUpperCase();\n\
         export const PI = 'pi';",
    ),
    (
        "./index.js",
        "export * from './math.js';\n\
         export * from './strings.js';\n\
         export { default as mathName } from './math.js';\n\
         export * as strings from './strings.js';",
    ),
    (
        "./main.js",
        "import { area, upper, mathName, strings } from './index.js';\n\
         import * as index from './index.js';\n\
         export const report = upper(mathName) + area(2) + strings.PI;\n\
         export { index };",
    ),
];

fn transform(id: &str, code: &str) -> Transformed {
    Compiler::new(CompilerOptions {
        code: code.to_string(),
        store_id: id.to_string(),
        filename: id.trim_start_matches("./").to_string(),
    })
    .expect("Module should compile")
    .transform()
}

/// Export lists keyed by specifier; all modules share one directory.
#[derive(Default)]
struct Registry(HashMap<String, Vec<String>>);

impl ExportLookup for Registry {
    fn exports_of(&self, module_id: &str) -> Option<Vec<String>> {
        self.0.get(module_id).cloned()
    }
}

/// Generates modules leaves first, registering each one's final exports.
fn compile_graph() -> HashMap<String, Output> {
    let mut registry = Registry::default();
    let mut outputs = HashMap::new();
    for (id, code) in MODULES {
        let output = transform(id, code)
            .generate_code(&registry)
            .expect("Module should generate");
        registry.0.insert(id.to_string(), output.exports.clone());
        outputs.insert(id.to_string(), output);
    }
    outputs
}

#[test]
fn test_declared_exports_exclude_star_names() {
    let transformed = transform("./index.js", MODULES[2].1);
    assert_eq!(transformed.exports(), ["mathName".to_string(), "strings".to_string()]);
    assert_eq!(
        transformed.dependencies().collect::<Vec<_>>(),
        vec!["./math.js", "./strings.js"]
    );
}

#[test]
fn test_star_exports_resolve_against_dependencies() {
    let outputs = compile_graph();
    let index = &outputs["./index.js"];
    // PI is ambiguous and default never travels through `export *`
    assert_eq!(index.exports, vec!["mathName", "area", "upper", "strings"]);
}

#[test]
fn test_every_module_generates_parseable_code() {
    for (id, output) in compile_graph() {
        assert!(output.code.contains(VIRTUAL_EXPORT), "{id}");
        parse_module(&output.code, &id).unwrap_or_else(|e| panic!("{id}: {e}"));
    }
}

#[test]
fn test_consumer_reads_through_handles() {
    let outputs = compile_graph();
    let main = &outputs["./main.js"];
    assert!(main.code.contains(
        "const report = __m0__.upper(__m0__.mathName) + __m0__.area(2) + __m0__.strings.PI;"
    ));
    assert!(main.code.contains("index: () => __VIRTUAL_NAMESPACE__(__m0__)"));
    assert_eq!(main.exports, vec!["report", "index"]);
}

#[test]
fn test_ambiguous_name_cannot_be_imported() {
    let mut registry = Registry::default();
    for (id, code) in &MODULES[..3] {
        let output = transform(id, code).generate_code(&registry).unwrap();
        registry.0.insert(id.to_string(), output.exports);
    }

    let err = transform("./bad.js", "import { PI } from './index.js';\nPI;")
        .generate_code(&registry)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "(bad.js): The module './index.js' does not provide an export named 'PI'"
    );
    assert!(matches!(err, CompileError::MissingExport { .. }));
}

#[test]
fn test_source_map_describes_module() {
    let outputs = compile_graph();
    let map = &outputs["./math.js"].map;
    assert_eq!(map.version, 3);
    assert_eq!(map.file, "math.js");
    assert!(!map.mappings.is_empty());
}
