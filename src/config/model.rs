// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::ServerLogLevel;

/// Top-level configuration as read from `Webdag.toml`.
///
/// Every section is optional; an absent file is equivalent to an empty one.
///
/// ```toml
/// [paths]
/// scripts = "src/**/*.ts"
/// output_dir = "dist"
///
/// [server]
/// port = 3000
///
/// [task.deploy]
/// cmd = "rsync -a dist/ host:/srv/www"
/// after = ["build"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub test: TestConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    /// Extra shell-command tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, CommandTaskConfig>,
}

/// A validated configuration, anchored at a project root directory.
///
/// Only constructed through `TryFrom<RawConfigFile>` so that the invariants
/// checked in `validate.rs` always hold.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub server: ServerConfig,
    pub test: TestConfig,
    pub watch: WatchConfig,
    pub task: BTreeMap<String, CommandTaskConfig>,
    root: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            tools: raw.tools,
            server: raw.server,
            test: raw.test,
            watch: raw.watch,
            task: raw.task,
            root: PathBuf::from("."),
        }
    }

    /// Anchor all relative paths at `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Project root every configured path is relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a project-relative path against the root.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Directory the development server serves.
    pub fn server_base_dir(&self) -> PathBuf {
        let base = self
            .server
            .base_dir
            .as_deref()
            .unwrap_or(&self.paths.output_dir);
        self.resolve(base)
    }
}

/// `[paths]` section: every directory and glob the built-in tasks use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// TypeScript sources.
    pub scripts: String,
    /// Sass sources.
    pub styles: String,
    /// Static assets copied verbatim.
    pub assets: String,
    /// Intermediate compiled scripts.
    pub temp_dir: String,
    /// Final output directory.
    pub output_dir: String,
    /// JSON manifest whose `bundle` key names the library typings bundle.
    pub manifest: String,
    pub script_bundle: String,
    pub style_bundle: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts: "src/**/*.ts".to_string(),
            styles: "src/**/*.scss".to_string(),
            assets: "assets/**/*".to_string(),
            temp_dir: "tmp".to_string(),
            output_dir: "dist".to_string(),
            manifest: "tsd.json".to_string(),
            script_bundle: "app.js".to_string(),
            style_bundle: "app.css".to_string(),
        }
    }
}

impl PathsConfig {
    /// Glob matching every compiled script in the temporary directory.
    pub fn compiled_scripts(&self) -> String {
        format!("{}/**/*.js", self.temp_dir.trim_end_matches('/'))
    }

    pub fn script_bundle_path(&self) -> String {
        format!("{}/{}", self.output_dir.trim_end_matches('/'), self.script_bundle)
    }

    pub fn style_bundle_path(&self) -> String {
        format!("{}/{}", self.output_dir.trim_end_matches('/'), self.style_bundle)
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Command that reads TypeScript on stdin and writes JavaScript on stdout.
    ///
    /// `{file}` is replaced by the source path relative to the glob base. An
    /// inline source map at the end of the output is picked up.
    pub typescript: String,
    /// `max-line-length` for the script linter.
    pub max_line_length: usize,
    /// Vendor scripts prepended to the bundle, in order.
    pub vendor_scripts: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            typescript: "esbuild --loader=ts --log-level=warning --sourcemap=inline --sourcefile={file}"
                .to_string(),
            max_line_length: 140,
            vendor_scripts: Vec::new(),
        }
    }
}

/// `[server]` section for the development server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served; defaults to `paths.output_dir`.
    pub base_dir: Option<String>,
    /// Serve `index.html` for unknown paths (client-side routing).
    pub spa_fallback: bool,
    /// Show an on-page banner before each live reload.
    pub notify: bool,
    pub log_level: ServerLogLevel,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            base_dir: None,
            spa_fallback: true,
            notify: false,
            log_level: ServerLogLevel::Silent,
        }
    }
}

/// `[test]` section: external test runner invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Command line; `{config}` is replaced by `config_file`.
    pub command: String,
    pub config_file: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: "karma start {config} --single-run".to_string(),
            config_file: "karma.conf.js".to_string(),
        }
    }
}

impl TestConfig {
    pub fn command_line(&self) -> String {
        self.command.replace("{config}", &self.config_file)
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatchConfig {
    /// Only re-run when the changed file's content hash actually differs.
    pub use_hash: bool,
}

/// `[task.<name>]` section: an extra shell-command task.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandTaskConfig {
    pub cmd: String,

    /// Prerequisites; may name built-in tasks or other command tasks.
    #[serde(default)]
    pub after: Vec<String>,
}
