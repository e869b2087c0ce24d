// src/pipeline/mod.rs

//! File-transformation pipelines.
//!
//! A [`Pipeline`] reads every file matched by its source globs, passes the
//! whole stream through its stages in declaration order and writes what is
//! left to its destination directory. Paths are kept relative to each glob's
//! literal base, so `src/**/*.ts` with `src/app/main.ts` produces
//! `<dest>/app/main.*`.
//!
//! Stages:
//! - [`lint`]: report findings, pass files through untouched.
//! - [`typescript`]: compile `.ts` through an external transpiler.
//! - [`sass`]: compile `.scss` with `grass`.
//! - [`sourcemap`]: attach and serialize line-level source maps.
//! - [`concat`]: join the stream into one file.
//! - [`minify`]: shrink scripts and stylesheets.

pub mod concat;
pub mod lint;
pub mod minify;
pub mod sass;
pub mod source;
pub mod sourcemap;
pub mod typescript;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};

use crate::action::{ActionFuture, TaskAction, TaskContext};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

pub use concat::Concat;
pub use lint::{Lint, LintFinding, LintRules};
pub use minify::{MinifyCss, MinifyJs, minify_css, minify_js};
pub use sass::CompileSass;
pub use sourcemap::{InitMaps, SourceMap, WriteMaps};
pub use typescript::CompileTypeScript;

/// One file flowing through a pipeline.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Path relative to `base`; this is what ends up under the destination.
    pub path: PathBuf,
    /// Literal directory prefix of the glob that matched the file.
    pub base: PathBuf,
    pub contents: Vec<u8>,
    pub source_map: Option<SourceMap>,
}

impl FileRecord {
    pub fn new(
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: contents.into(),
            source_map: None,
        }
    }

    /// Where the file was read from.
    pub fn source_path(&self) -> PathBuf {
        self.base.join(&self.path)
    }

    /// Relative path with forward slashes.
    pub fn rel_str(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.path.extension().is_some_and(|e| e == ext)
    }

    pub fn text(&self) -> Result<&str> {
        let text = std::str::from_utf8(&self.contents)
            .with_context(|| format!("{} is not valid UTF-8", self.source_path().display()))?;
        Ok(text)
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }
}

/// Ambient information for stages.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Project root; external tools run here.
    pub root: PathBuf,
}

pub type StageFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<FileRecord>>> + Send + 'a>>;

/// A transformation over the whole file stream.
///
/// Stages see every file at once so that stream-level operations (concat)
/// and per-file ones share one interface.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn process<'a>(&'a self, files: Vec<FileRecord>, ctx: &'a StageContext) -> StageFuture<'a>;
}

/// Glob source, ordered stages, optional destination directory.
pub struct Pipeline {
    sources: Vec<String>,
    stages: Vec<Box<dyn Stage>>,
    dest: Option<String>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Pipeline {
    /// Start a pipeline reading `patterns` relative to `root`.
    pub fn src<I, S>(root: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: patterns.into_iter().map(Into::into).collect(),
            stages: Vec::new(),
            dest: None,
            root: root.into(),
            fs: Arc::new(RealFileSystem),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn pipe(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Write the resulting stream below `dir` (relative to the root).
    pub fn dest(mut self, dir: impl Into<String>) -> Self {
        self.dest = Some(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the pipeline once; returns the number of files written.
    pub async fn run(&self) -> Result<usize> {
        let started = Instant::now();
        let ctx = StageContext {
            root: self.root.clone(),
        };

        let mut files = source::read_sources(self.fs.as_ref(), &self.root, &self.sources)?;
        let read = files.len();

        for stage in &self.stages {
            files = stage.process(files, &ctx).await?;
            debug!(stage = stage.name(), files = files.len(), "stage finished");
        }

        let mut written = 0;
        if let Some(dest) = &self.dest {
            let dir = self.root.join(dest);
            for file in &files {
                self.fs.write(&dir.join(&file.path), &file.contents)?;
                written += 1;
            }
        }

        info!(
            sources = ?self.sources,
            read,
            written,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(written)
    }
}

impl TaskAction for Pipeline {
    fn execute<'a>(&'a self, _ctx: &'a TaskContext) -> ActionFuture<'a> {
        Box::pin(async move { self.run().await.map(|_| ()) })
    }

    fn describe(&self) -> String {
        let mut parts = vec![format!("src({})", self.sources.join(", "))];
        parts.extend(self.stages.iter().map(|s| s.name().to_string()));
        if let Some(dest) = &self.dest {
            parts.push(format!("dest({dest})"));
        }
        parts.join(" | ")
    }
}
