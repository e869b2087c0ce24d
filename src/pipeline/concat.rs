// src/pipeline/concat.rs

use std::path::PathBuf;

use crate::pipeline::sourcemap::{SourceMap, line_count};
use crate::pipeline::{FileRecord, Stage, StageContext, StageFuture};

/// Join every file of the stream into `file_name`, newline separated.
///
/// If any input carries a source map the output gets a merged map; inputs
/// without one contribute unmapped lines. An empty stream stays empty.
#[derive(Debug, Clone)]
pub struct Concat {
    file_name: String,
}

impl Concat {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Stage for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            if files.is_empty() {
                return Ok(files);
            }
            let base = files[0].base.clone();
            let with_maps = files.iter().any(|f| f.source_map.is_some());

            let mut chunks = Vec::with_capacity(files.len());
            let mut map = SourceMap::default();

            for file in &files {
                let text = file.text()?;
                if with_maps {
                    let lines = line_count(text);
                    let mut part = file
                        .source_map
                        .clone()
                        .unwrap_or_else(|| SourceMap::unmapped(lines));
                    part.resize(lines);
                    map.append(&part);
                }
                chunks.push(text);
            }

            let mut joined = FileRecord::new(
                if base.as_os_str().is_empty() { ctx.root.clone() } else { base },
                PathBuf::from(&self.file_name),
                chunks.join("\n"),
            );
            if with_maps {
                map.file = self.file_name.clone();
                joined.source_map = Some(map);
            }
            Ok(vec![joined])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sourcemap::LineMapping;

    fn ctx() -> StageContext {
        StageContext {
            root: PathBuf::from("/p"),
        }
    }

    #[tokio::test]
    async fn maps_are_offset_by_preceding_lines() {
        let mut a = FileRecord::new("/p/tmp", "a.js", "var a;\n");
        a.source_map = Some(SourceMap::identity("a.ts", "var a;\n"));
        let vendor = FileRecord::new("/p/vendor", "lib.js", "lib();");
        let mut b = FileRecord::new("/p/tmp", "b.js", "var b;");
        b.source_map = Some(SourceMap::identity("b.ts", "var b;"));

        let out = Concat::new("app.js")
            .process(vec![a, vendor, b], &ctx())
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel_str(), "app.js");
        assert_eq!(out[0].text().unwrap(), "var a;\n\nlib();\nvar b;");

        let map = out[0].source_map.as_ref().unwrap();
        assert_eq!(map.sources, vec!["a.ts", "b.ts"]);
        // "var a;\n" is two lines, "lib();" one, then b at line 3.
        assert_eq!(map.lines.len(), 4);
        assert_eq!(map.lines[2], None);
        assert_eq!(map.lines[3], Some(LineMapping { source: 1, line: 0 }));
    }

    #[tokio::test]
    async fn empty_stream_produces_nothing() {
        let out = Concat::new("app.css").process(Vec::new(), &ctx()).await.unwrap();
        assert!(out.is_empty());
    }
}
