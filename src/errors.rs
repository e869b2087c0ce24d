// src/errors.rs

//! Crate-wide error type.
//!
//! Lint findings never surface here as a failure: linters print their report
//! and pass the stream through. `LintError` only renders the summary line.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebdagError {
    /// Duplicate task, undeclared prerequisite, invalid config value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Compile error in {path}: {message}")]
    CompileError { path: String, message: String },

    #[error("{linter} reported {count} finding(s)")]
    LintError { linter: String, count: usize },

    #[error("External process '{program}' exited with code {code}")]
    ExternalProcess { program: String, code: i32 },

    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<WebdagError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    GlobError(#[from] globset::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WebdagError {
    /// Innermost error, looking through any number of `TaskFailed` wrappers.
    pub fn root_cause(&self) -> &WebdagError {
        match self {
            WebdagError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the task that failed first, if this is a task failure.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            WebdagError::TaskFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WebdagError>;
