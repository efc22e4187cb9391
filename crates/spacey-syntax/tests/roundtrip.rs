// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Printing a parsed module and parsing the output again must be stable.

use spacey_syntax::{generate, parse_module};

const MODULE: &str = r#"
import defaultThing, { named as renamed, other } from './dep.js';
import * as ns from "./ns.js";

export const config = { debug: false, level: 2, ...ns.defaults };
export let counter = 0;

export function increment(by = 1) {
  counter += by;
  return counter;
}

export default class Widget extends Base {
  #id = 0;
  static instances = [];
  constructor(name, { size = 10, tags: [first, ...restTags] } = {}) {
    super(name);
    this.size = size ?? first;
    Widget.instances.push(this);
  }
  async *stream() {
    for await (const chunk of this.source) {
      yield chunk;
    }
  }
  get label() {
    return `${this.name} (${this.size})`;
  }
}

label: for (let i = 0, j = 10; i < j; i++, j--) {
  if (i % 2 === 0) continue label;
  else if (i > 5) {
    break label;
  }
}

try {
  renamed(other, (a, b) => a + b, async x => await x);
} catch ({ message }) {
  console.error(message);
} finally {
  counter = -counter;
}

switch (typeof defaultThing) {
  case "function":
    defaultThing();
    break;
  default:
    void 0;
}

const lazy = () => import("./lazy.js");
const meta = import.meta.url;
const re = /[a-z]+\/(\d)/giu;
do counter--; while (counter > 0)
export { lazy as load, meta };
export * from "./all.js";
"#;

#[test]
fn test_generate_is_stable() {
    let ast = parse_module(MODULE, "widget.js").expect("Should parse");
    let first = generate(&ast, MODULE, "widget.js");

    let reparsed = parse_module(&first.code, "widget.js").expect("Output should parse");
    let second = generate(&reparsed, &first.code, "widget.js");

    assert_eq!(first.code, second.code);
}

#[test]
fn test_source_map_covers_every_line() {
    let ast = parse_module(MODULE, "widget.js").expect("Should parse");
    let output = generate(&ast, MODULE, "widget.js");

    let generated_lines = output.code.lines().count();
    let mapped_lines = output.map.mappings.split(';').filter(|l| !l.is_empty()).count();
    // Lines holding only a closing brace carry no segment
    assert!(mapped_lines > generated_lines / 2);
    assert_eq!(output.map.file, "widget.js");
}

#[test]
fn test_syntax_error_location() {
    let source = "const a = 1;\nconst b = ;\n";
    let err = parse_module(source, "broken.js").unwrap_err();
    assert_eq!(err.filename, "broken.js");
    assert_eq!(err.line, 2);
    assert!(err.to_string().starts_with("SyntaxError: "));
}

#[test]
fn test_in_inside_for_init_survives() {
    for source in [
        "for (let j = (1 in o);;) break;\n",
        "for ((a in b);;) break;\n",
        "for (var f = function () { return a in b; };;) break;\n",
    ] {
        let ast = parse_module(source, "loop.js").expect("Should parse");
        let first = generate(&ast, source, "loop.js");

        let reparsed = parse_module(&first.code, "loop.js").expect("Output should parse");
        let second = generate(&reparsed, &first.code, "loop.js");
        assert_eq!(first.code, second.code, "unstable output for {source:?}");
    }

    let source = "for (let j = (1 in o);;) break;";
    let ast = parse_module(source, "loop.js").unwrap();
    let code = generate(&ast, source, "loop.js").code;
    assert!(code.contains("let j = (1 in o)"));
}
