// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source map v3 output.

use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A source map in the v3 JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    /// Always 3
    pub version: u32,
    /// Name of the generated file
    pub file: String,
    /// Original sources
    pub sources: Vec<String>,
    /// Inlined original text, parallel to `sources`
    pub sources_content: Vec<Option<String>>,
    /// Symbol names referenced by mappings
    pub names: Vec<String>,
    /// Base64 VLQ encoded segments
    pub mappings: String,
}

impl SourceMap {
    /// Serializes the map to JSON.
    pub fn to_json(&self) -> String {
        // A map of plain strings always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// One generated position mapped back to an original one. All fields are
/// zero-based; columns count UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    pub gen_line: u32,
    pub gen_column: u32,
    pub src_line: u32,
    pub src_column: u32,
}

/// Accumulates segments in generated order.
#[derive(Debug, Default)]
pub(crate) struct MappingBuilder {
    segments: Vec<Segment>,
}

impl MappingBuilder {
    pub fn add(&mut self, segment: Segment) {
        if let Some(last) = self.segments.last() {
            if last.gen_line == segment.gen_line && last.gen_column == segment.gen_column {
                return;
            }
        }
        self.segments.push(segment);
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        let mut line = 0;
        let mut first_in_line = true;
        let mut prev_gen_column = 0i64;
        let mut prev_src_line = 0i64;
        let mut prev_src_column = 0i64;

        for segment in &self.segments {
            while line < segment.gen_line {
                out.push(';');
                line += 1;
                prev_gen_column = 0;
                first_in_line = true;
            }
            if !first_in_line {
                out.push(',');
            }
            first_in_line = false;

            encode_vlq(&mut out, segment.gen_column as i64 - prev_gen_column);
            // Single source, index delta is always zero
            encode_vlq(&mut out, 0);
            encode_vlq(&mut out, segment.src_line as i64 - prev_src_line);
            encode_vlq(&mut out, segment.src_column as i64 - prev_src_column);

            prev_gen_column = segment.gen_column as i64;
            prev_src_line = segment.src_line as i64;
            prev_src_column = segment.src_column as i64;
        }
        out
    }
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Maps byte offsets of the original source to line/column pairs.
pub(crate) struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut starts = vec![0];
        let mut chars = source.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\r' => {
                    if matches!(chars.peek(), Some((_, '\n'))) {
                        chars.next();
                        starts.push(i + 2);
                    } else {
                        starts.push(i + 1);
                    }
                }
                '\n' | '\u{2028}' | '\u{2029}' => starts.push(i + ch.len_utf8()),
                _ => {}
            }
        }
        Self { source, starts }
    }

    /// Zero-based line and UTF-16 column of a byte offset.
    pub fn locate(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.source.len());
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.starts[line];
        let column = self
            .source
            .get(start..offset)
            .map(|text| text.encode_utf16().count())
            .unwrap_or(0);
        (line as u32, column as u32)
    }
}
