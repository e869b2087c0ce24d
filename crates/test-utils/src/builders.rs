#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use webdag::config::{CommandTaskConfig, ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Use `cmd` as the TypeScript compiler (e.g. `cat` in tests).
    pub fn typescript(mut self, cmd: &str) -> Self {
        self.config.tools.typescript = cmd.to_string();
        self
    }

    pub fn test_command(mut self, cmd: &str) -> Self {
        self.config.test.command = cmd.to_string();
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn with_task(mut self, name: &str, cmd: &str, after: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CommandTaskConfig {
                cmd: cmd.to_string(),
                after: after.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self, root: impl Into<PathBuf>) -> ConfigFile {
        ConfigFile::try_from(self.config)
            .expect("Failed to build valid config from builder")
            .with_root(root)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project directory.
pub struct ProjectDir {
    dir: TempDir,
}

impl ProjectDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    /// A small TypeScript + Sass project laid out like the default config
    /// expects.
    pub fn sample() -> Self {
        let project = Self::new();
        project
            .file(
                "src/app/main.ts",
                "import { greet } from './greet';\n\n// entry point\nconst el = document.getElementById('app');\nel.textContent = greet('world');\n",
            )
            .file(
                "src/app/greet.ts",
                "/** Greeting helper. */\nexport function greet(name: string): string {\n    return 'Hello, ' + name;\n}\n\nexport function isUrl(u: string): boolean {\n    return /^https?:\\/\\//.test(u);\n}\n",
            )
            .file("src/styles/_vars.scss", "$accent: #cc3300;\n")
            .file(
                "src/styles/app.scss",
                "@import 'vars';\n\nbody {\n  margin: 0;\n\n  .title {\n    color: $accent;\n  }\n}\n",
            )
            .file("typings/tsd.d.ts", "declare var process: any;\n")
            .file("tsd.json", r#"{ "version": "v4", "bundle": "typings/tsd.d.ts" }"#)
            .file("assets/index.html", "<html><body><div id=\"app\"></div></body></html>\n")
            .file("assets/img/logo.svg", "<svg/>\n");
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, contents: &str) -> &Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, contents).expect("write project file");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.dir.path().join(rel))
            .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    /// Relative paths of every file below `rel`, sorted, with `/` separators.
    pub fn files_under(&self, rel: &str) -> Vec<String> {
        let base = self.dir.path().join(rel);
        let mut out = Vec::new();
        let mut stack = vec![base.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&base) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        out
    }
}

impl Default for ProjectDir {
    fn default() -> Self {
        Self::new()
    }
}
