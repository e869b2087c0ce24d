// src/pipeline/sourcemap.rs

//! Line-level Source Map v3 support.
//!
//! Maps are tracked per generated line: each line maps its first column to a
//! line of one original source, or to nothing. That is enough to follow a
//! file through compile, concat and inline serialization.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, WebdagError};
use crate::pipeline::{FileRecord, Stage, StageContext, StageFuture};

const DATA_URI_PREFIX: &str = "data:application/json;charset=utf8;base64,";
const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Original position of a generated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMapping {
    /// Index into `SourceMap::sources`.
    pub source: usize,
    /// Zero-based line in that source.
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<Option<String>>,
    /// One entry per generated line.
    pub lines: Vec<Option<LineMapping>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: u8,
    #[serde(default)]
    file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_root: Option<String>,
    sources: Vec<String>,
    #[serde(default)]
    sources_content: Vec<Option<String>>,
    #[serde(default)]
    names: Vec<String>,
    mappings: String,
}

impl SourceMap {
    /// Map with no sources and `line_count` unmapped lines.
    pub fn unmapped(line_count: usize) -> Self {
        Self {
            lines: vec![None; line_count],
            ..Self::default()
        }
    }

    /// Every line of `contents` maps to the same line of `source`.
    pub fn identity(source: &str, contents: &str) -> Self {
        let lines = (0..line_count(contents))
            .map(|i| {
                Some(LineMapping {
                    source: 0,
                    line: i as u32,
                })
            })
            .collect();
        Self {
            file: source.to_string(),
            sources: vec![source.to_string()],
            sources_content: vec![Some(contents.to_string())],
            lines,
        }
    }

    /// Pad with unmapped lines or truncate so the map covers `line_count`
    /// generated lines.
    pub fn resize(&mut self, line_count: usize) {
        self.lines.resize(line_count, None);
    }

    /// The file was regenerated by a tool that reports no positions: keep
    /// the sources but map none of the `line_count` generated lines.
    pub fn forget_lines(&mut self, line_count: usize) {
        self.lines = vec![None; line_count];
    }

    /// Take the line mappings of `emitted`, a map produced by a compiler for
    /// the single source this map describes.
    ///
    /// Mappings into sources we do not know are dropped.
    pub fn adopt_lines(&mut self, emitted: &SourceMap, line_count: usize) {
        let known = self.sources.len();
        self.lines = emitted
            .lines
            .iter()
            .map(|mapping| mapping.filter(|m| m.source < known))
            .collect();
        self.resize(line_count);
    }

    /// Append `other`'s lines after ours, re-indexing its sources.
    pub fn append(&mut self, other: &SourceMap) {
        let offset = self.sources.len();
        self.sources.extend(other.sources.iter().cloned());
        for i in 0..other.sources.len() {
            self.sources_content
                .push(other.sources_content.get(i).cloned().flatten());
        }
        self.lines.extend(other.lines.iter().map(|mapping| {
            mapping.map(|m| LineMapping {
                source: m.source + offset,
                line: m.line,
            })
        }));
    }

    /// Encode the `mappings` field.
    pub fn encode_mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_source = 0i64;
        let mut prev_line = 0i64;

        for (i, mapping) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            if let Some(m) = mapping {
                encode_vlq(&mut out, 0);
                encode_vlq(&mut out, m.source as i64 - prev_source);
                encode_vlq(&mut out, m.line as i64 - prev_line);
                encode_vlq(&mut out, 0);
                prev_source = m.source as i64;
                prev_line = m.line as i64;
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        let raw = RawSourceMap {
            version: 3,
            file: self.file.clone(),
            source_root: None,
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: Vec::new(),
            mappings: self.encode_mappings(),
        };
        Ok(serde_json::to_string(&raw)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSourceMap = serde_json::from_str(json)?;
        if raw.version != 3 {
            return Err(WebdagError::Other(anyhow::anyhow!(
                "unsupported source map version {}",
                raw.version
            )));
        }
        let lines = decode_mappings(&raw.mappings)?;
        let sources = match raw.source_root.as_deref() {
            Some(root) if !root.is_empty() => raw
                .sources
                .iter()
                .map(|s| format!("{}/{}", root.trim_end_matches('/'), s))
                .collect(),
            _ => raw.sources,
        };
        Ok(Self {
            file: raw.file,
            sources,
            sources_content: raw.sources_content,
            lines,
        })
    }

    /// The map as a `sourceMappingURL` comment, in the comment syntax of the
    /// target file type.
    pub fn inline_comment(&self, css: bool) -> Result<String> {
        let encoded = STANDARD.encode(self.to_json()?);
        Ok(if css {
            format!("/*# sourceMappingURL={DATA_URI_PREFIX}{encoded} */")
        } else {
            format!("//# sourceMappingURL={DATA_URI_PREFIX}{encoded}")
        })
    }
}

/// Number of generated lines in `text` (a trailing newline opens one more).
pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Split an inline data-URI source map off the end of `contents`.
///
/// Returns the contents without the comment line, and the decoded map.
/// External (non data-URI) references are left alone.
pub fn extract_inline(contents: &str) -> Option<(String, SourceMap)> {
    let trimmed = contents.trim_end();
    let line_start = trimmed.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let last_line = trimmed[line_start..].trim();

    let payload = last_line
        .strip_prefix("//# sourceMappingURL=")
        .or_else(|| last_line.strip_prefix("//@ sourceMappingURL="))
        .map(str::trim)
        .or_else(|| {
            last_line
                .strip_prefix("/*# sourceMappingURL=")
                .and_then(|rest| rest.strip_suffix("*/"))
                .map(str::trim)
        })?;

    let (_, encoded) = payload
        .strip_prefix("data:application/json")?
        .split_once("base64,")?;
    let json = STANDARD.decode(encoded.trim()).ok()?;
    let map = SourceMap::from_json(std::str::from_utf8(&json).ok()?).ok()?;

    Some((trimmed[..line_start].to_string(), map))
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut v = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    } as u64;
    loop {
        let mut digit = (v & 31) as usize;
        v >>= 5;
        if v > 0 {
            digit |= 32;
        }
        out.push(BASE64_DIGITS[digit] as char);
        if v == 0 {
            break;
        }
    }
}

fn decode_mappings(mappings: &str) -> Result<Vec<Option<LineMapping>>> {
    let mut lines = Vec::new();
    let mut source = 0i64;
    let mut line = 0i64;

    for group in mappings.split(';') {
        let mut first: Option<LineMapping> = None;
        for segment in group.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_vlq_segment(segment)?;
            if fields.len() >= 4 {
                source += fields[1];
                line += fields[2];
                if first.is_none() && source >= 0 && line >= 0 {
                    first = Some(LineMapping {
                        source: source as usize,
                        line: line as u32,
                    });
                }
            }
        }
        lines.push(first);
    }
    Ok(lines)
}

fn decode_vlq_segment(segment: &str) -> Result<Vec<i64>> {
    let mut values = Vec::new();
    let mut value = 0i64;
    let mut shift = 0u32;

    for byte in segment.bytes() {
        let digit = BASE64_DIGITS
            .iter()
            .position(|&d| d == byte)
            .ok_or_else(|| anyhow::anyhow!("invalid character {:?} in source map", byte as char))?
            as i64;
        value += (digit & 31) << shift;
        if digit & 32 != 0 {
            shift += 5;
            // Source Map v3 values are 32-bit.
            if shift >= 32 {
                return Err(anyhow::anyhow!("source map VLQ value overflows").into());
            }
            continue;
        }
        let negative = value & 1 == 1;
        value >>= 1;
        values.push(if negative { -value } else { value });
        value = 0;
        shift = 0;
    }
    Ok(values)
}

/// `sourcemaps.init()`: attach an identity map to every file.
///
/// With `load_maps`, an inline map already present in the file is loaded
/// instead (and its comment stripped).
#[derive(Debug, Clone, Default)]
pub struct InitMaps {
    pub load_maps: bool,
}

impl InitMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_maps() -> Self {
        Self { load_maps: true }
    }
}

impl Stage for InitMaps {
    fn name(&self) -> &'static str {
        "sourcemaps-init"
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, _ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(files.len());
            for mut file in files {
                let source = file.rel_str();
                let text = file.text()?.to_string();

                if self.load_maps {
                    if let Some((stripped, mut map)) = extract_inline(&text) {
                        map.resize(line_count(&stripped));
                        file.set_text(stripped);
                        file.source_map = Some(map);
                        out.push(file);
                        continue;
                    }
                }

                file.source_map = Some(SourceMap::identity(&source, &text));
                out.push(file);
            }
            Ok(out)
        })
    }
}

/// `sourcemaps.write()`: serialize each file's map into an inline comment.
#[derive(Debug, Clone, Default)]
pub struct WriteMaps;

impl Stage for WriteMaps {
    fn name(&self) -> &'static str {
        "sourcemaps-write"
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, _ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(files.len());
            for mut file in files {
                let Some(mut map) = file.source_map.take() else {
                    out.push(file);
                    continue;
                };
                map.file = file.file_name();

                let mut text = file.text()?.to_string();
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&map.inline_comment(file.has_extension("css"))?);
                text.push('\n');
                file.set_text(text);
                out.push(file);
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_matches_reference_values() {
        let mut out = String::new();
        for v in [0, 1, -1, 15, 16, -16, 1000] {
            encode_vlq(&mut out, v);
            out.push(',');
        }
        assert_eq!(out, "A,C,D,e,gB,hB,w+B,");

        let decoded: Vec<i64> = "A,C,D,e,gB,hB,w+B"
            .split(',')
            .flat_map(|s| decode_vlq_segment(s).unwrap())
            .collect();
        assert_eq!(decoded, vec![0, 1, -1, 15, 16, -16, 1000]);
    }

    #[test]
    fn identity_map_encodes_one_segment_per_line() {
        let map = SourceMap::identity("a.ts", "let a;\nlet b;\n");
        // Three lines: the trailing newline opens an empty third one.
        assert_eq!(map.encode_mappings(), "AAAA;AACA;AACA");
    }

    #[test]
    fn appended_maps_keep_their_sources() {
        let mut joined = SourceMap::identity("a.ts", "a\n");
        joined.append(&SourceMap::unmapped(1));
        joined.append(&SourceMap::identity("b.ts", "b"));

        assert_eq!(joined.sources, vec!["a.ts", "b.ts"]);
        assert_eq!(joined.lines.len(), 4);
        assert_eq!(joined.lines[2], None);
        assert_eq!(joined.lines[3], Some(LineMapping { source: 1, line: 0 }));

        let reparsed = SourceMap::from_json(&joined.to_json().unwrap()).unwrap();
        assert_eq!(reparsed.lines, joined.lines);
    }

    #[test]
    fn inline_comment_is_extracted_again() {
        let map = SourceMap::identity("main.ts", "let x = 1;");
        let text = format!("let x = 1;\n{}\n", map.inline_comment(false).unwrap());

        let (stripped, loaded) = extract_inline(&text).unwrap();
        assert_eq!(stripped, "let x = 1;\n");
        assert_eq!(loaded.sources, vec!["main.ts"]);
        assert_eq!(loaded.sources_content, vec![Some("let x = 1;".to_string())]);
    }

    #[test]
    fn overlong_vlq_is_rejected() {
        assert_eq!(decode_vlq_segment("ggggggA").unwrap(), vec![0]);
        assert!(decode_vlq_segment("gggggggA").is_err());
        assert!(decode_mappings("AAAA;gggggggggggggB").is_err());
    }

    #[test]
    fn adopted_lines_drop_unknown_sources() {
        let mut map = SourceMap::identity("app/main.ts", "let a = 1;\n\nlet b = 2;\n");
        let emitted = SourceMap {
            sources: vec!["main.ts".into(), "helper.ts".into()],
            lines: vec![
                Some(LineMapping { source: 0, line: 0 }),
                Some(LineMapping { source: 0, line: 2 }),
                Some(LineMapping { source: 1, line: 7 }),
            ],
            ..SourceMap::default()
        };

        map.adopt_lines(&emitted, 4);

        assert_eq!(map.sources, vec!["app/main.ts"]);
        assert_eq!(
            map.lines,
            vec![
                Some(LineMapping { source: 0, line: 0 }),
                Some(LineMapping { source: 0, line: 2 }),
                None,
                None
            ]
        );
    }

    #[test]
    fn plain_files_have_no_inline_map() {
        assert!(extract_inline("body { color: red; }\n").is_none());
    }
}
