// src/pipeline/sass.rs

use grass::{Options, OutputStyle};
use tracing::{debug, error};

use crate::pipeline::sourcemap::line_count;
use crate::pipeline::{FileRecord, Stage, StageContext, StageFuture};

/// Compile `.scss` files to CSS with `grass`.
///
/// Partials (`_name.scss`) are only imported, never emitted. A file that
/// fails to compile is logged and dropped; the rest of the stream goes on.
#[derive(Debug, Clone, Default)]
pub struct CompileSass;

impl CompileSass {
    pub fn new() -> Self {
        Self
    }
}

fn is_partial(file: &FileRecord) -> bool {
    file.file_name().starts_with('_')
}

impl Stage for CompileSass {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, _ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(files.len());
            for mut file in files {
                if is_partial(&file) {
                    debug!(file = %file.rel_str(), "skipping partial");
                    continue;
                }
                if !file.has_extension("scss") {
                    out.push(file);
                    continue;
                }

                let source_path = file.source_path();
                let load_dir = source_path
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| file.base.clone());
                let options = Options::default()
                    .style(OutputStyle::Expanded)
                    .load_path(&load_dir);

                let css = match grass::from_string(file.text()?.to_string(), &options) {
                    Ok(css) => css,
                    Err(err) => {
                        error!(file = %source_path.display(), "Sass compilation failed:\n{}", err);
                        continue;
                    }
                };

                let lines = line_count(&css);
                file.set_text(css);
                file.path.set_extension("css");
                // grass reports no positions.
                if let Some(map) = file.source_map.as_mut() {
                    map.forget_lines(lines);
                }
                out.push(file);
            }
            Ok(out)
        })
    }
}
