// src/pipeline/typescript.rs

use tracing::{debug, warn};

use crate::errors::{Result, WebdagError};
use crate::exec::pipe_through;
use crate::pipeline::sourcemap::{extract_inline, line_count};
use crate::pipeline::{FileRecord, Stage, StageContext, StageFuture};

/// Compile TypeScript by piping each file through an external transpiler
/// (stdin → stdout).
///
/// `{file}` in the command becomes the shell-quoted relative source path. If
/// the compiler appends an inline source map, its line mappings replace the
/// identity map; otherwise the compiled lines stay unmapped.
///
/// Declaration files (`.d.ts`) only contribute types and emit nothing. Any
/// failing file aborts the stage with a `CompileError`.
#[derive(Debug, Clone)]
pub struct CompileTypeScript {
    command: String,
}

impl CompileTypeScript {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    async fn compile(&self, mut file: FileRecord, ctx: &StageContext) -> Result<FileRecord> {
        let command = self.command.replace("{file}", &shell_quote(&file.rel_str()));
        let output = pipe_through(&command, &file.contents, &ctx.root).await?;
        let path = file.source_path().display().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!(
                    "'{}' exited with code {}",
                    command,
                    output.status.code().unwrap_or(-1)
                )
            } else {
                stderr
            };
            return Err(WebdagError::CompileError { path, message });
        }
        if !output.stderr.is_empty() {
            warn!(file = %path, "{}", String::from_utf8_lossy(&output.stderr).trim());
        }

        file.contents = output.stdout;
        file.path.set_extension("js");

        let emitted = extract_inline(file.text()?);
        match emitted {
            Some((code, emitted)) => {
                let lines = line_count(&code);
                file.set_text(code);
                if let Some(map) = file.source_map.as_mut() {
                    map.adopt_lines(&emitted, lines);
                }
            }
            None => {
                let lines = line_count(file.text()?);
                if let Some(map) = file.source_map.as_mut() {
                    map.forget_lines(lines);
                }
            }
        }
        Ok(file)
    }
}

/// Single-quote `arg` for `sh -c`.
fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

pub(crate) fn is_declaration(file: &FileRecord) -> bool {
    file.file_name().ends_with(".d.ts")
}

impl Stage for CompileTypeScript {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn process<'a>(&'a self, files: Vec<FileRecord>, ctx: &'a StageContext) -> StageFuture<'a> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(files.len());
            for file in files {
                if is_declaration(&file) {
                    debug!(file = %file.rel_str(), "declaration file; nothing to emit");
                    continue;
                }
                if !file.has_extension("ts") {
                    out.push(file);
                    continue;
                }
                out.push(self.compile(file, ctx).await?);
            }
            Ok(out)
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::pipeline::SourceMap;
    use crate::pipeline::sourcemap::LineMapping;

    fn ctx(dir: &tempfile::TempDir) -> StageContext {
        StageContext {
            root: dir.path().to_path_buf(),
        }
    }

    #[tokio::test]
    async fn compiles_sources_and_drops_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let mut main = FileRecord::new(dir.path(), "app/main.ts", "let a = 1;\n");
        main.source_map = Some(SourceMap::identity("app/main.ts", "let a = 1;\n"));
        let typings = FileRecord::new(dir.path(), "tsd.d.ts", "declare var $: any;\n");

        let out = CompileTypeScript::new("cat")
            .process(vec![main, typings], &ctx(&dir))
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel_str(), "app/main.js");
        assert_eq!(out[0].text().unwrap(), "let a = 1;\n");
        // `cat` emits no map, so nothing is claimed about the output lines.
        assert_eq!(out[0].source_map.as_ref().unwrap().lines, vec![None, None]);
    }

    #[tokio::test]
    async fn compiler_emitted_map_is_adopted() {
        let dir = tempfile::tempdir().unwrap();
        let source = "let a: number = 1;\n\ninterface P { x: number }\nlet b = 2;\n";
        let mut main = FileRecord::new(dir.path(), "app/main.ts", source);
        main.source_map = Some(SourceMap::identity("app/main.ts", source));

        // What a compiler would emit: blank line and interface gone.
        let emitted = SourceMap {
            file: "main.js".into(),
            sources: vec!["app/main.ts".into()],
            lines: vec![
                Some(LineMapping { source: 0, line: 0 }),
                Some(LineMapping { source: 0, line: 3 }),
                None,
            ],
            ..SourceMap::default()
        };
        std::fs::write(
            dir.path().join("out.js"),
            format!("let a = 1;\nlet b = 2;\n{}\n", emitted.inline_comment(false).unwrap()),
        )
        .unwrap();

        let out = CompileTypeScript::new("cat > /dev/null; cat out.js")
            .process(vec![main], &ctx(&dir))
            .await
            .unwrap();

        assert_eq!(out[0].text().unwrap(), "let a = 1;\nlet b = 2;\n");
        let map = out[0].source_map.as_ref().unwrap();
        let LineMapping { source, line } = map.lines[1].unwrap();
        let original = map.sources_content[source].as_deref().unwrap();
        assert_eq!(original.lines().nth(line as usize), Some("let b = 2;"));
        assert_eq!(map.lines[2], None);
    }

    #[tokio::test]
    async fn file_placeholder_is_the_quoted_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileRecord::new(dir.path(), "app/it's.ts", "let a = 1;\n");

        let err = CompileTypeScript::new("echo {file} >&2; exit 1")
            .process(vec![file], &ctx(&dir))
            .await
            .unwrap_err();

        assert!(
            matches!(err, WebdagError::CompileError { ref message, .. } if message == "app/it's.ts"),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn compiler_failure_is_a_compile_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileRecord::new(dir.path(), "bad.ts", "let = ;\n");

        let err = CompileTypeScript::new("echo 'unexpected token' >&2; exit 1")
            .process(vec![file], &ctx(&dir))
            .await
            .unwrap_err();

        match err {
            WebdagError::CompileError { path, message } => {
                assert!(path.ends_with("bad.ts"));
                assert_eq!(message, "unexpected token");
            }
            other => panic!("expected CompileError, got {other:?}"),
        }
    }
}
