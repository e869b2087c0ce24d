// src/action/clean.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::action::{ActionFuture, TaskAction, TaskContext};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Remove everything inside each directory; the directories stay.
#[derive(Debug, Clone)]
pub struct CleanAction {
    dirs: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl CleanAction {
    pub fn new(dirs: Vec<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self { dirs, fs }
    }

    pub fn clean(&self) -> Result<usize> {
        let mut removed = 0;
        for dir in &self.dirs {
            if !self.fs.is_dir(dir) {
                debug!(?dir, "nothing to clean");
                continue;
            }
            for entry in self.fs.read_dir(dir)? {
                if self.fs.is_dir(&entry) {
                    self.fs.remove_dir_all(&entry)?;
                } else {
                    self.fs.remove_file(&entry)?;
                }
                removed += 1;
            }
        }
        info!(removed, dirs = ?self.dirs, "cleaned output directories");
        Ok(removed)
    }
}

impl TaskAction for CleanAction {
    fn execute<'a>(&'a self, _ctx: &'a TaskContext) -> ActionFuture<'a> {
        Box::pin(async move { self.clean().map(|_| ()) })
    }

    fn describe(&self) -> String {
        let dirs: Vec<String> = self.dirs.iter().map(|d| d.display().to_string()).collect();
        format!("clean {}", dirs.join(", "))
    }
}
