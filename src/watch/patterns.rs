// src/watch/patterns.rs

use std::fmt;

use globset::{Glob, GlobMatcher};

use crate::errors::Result;
use crate::types::TaskName;

/// A compiled watch glob and the tasks it triggers, in order.
///
/// The pattern is relative to the project root; the listener passes relative
/// paths with forward slashes (e.g. `"src/app/main.ts"`) into `matches`.
#[derive(Clone)]
pub struct WatchBinding {
    pattern: String,
    matcher: GlobMatcher,
    tasks: Vec<TaskName>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("pattern", &self.pattern)
            .field("tasks", &self.tasks)
            .finish()
    }
}

impl WatchBinding {
    pub fn new(pattern: &str, tasks: &[&str]) -> Result<Self> {
        let matcher = Glob::new(normalize(pattern))?.compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(normalize(rel_path))
    }
}

/// Strip a leading `./` so `./src/**/*.ts` and `src/a.ts` line up.
fn normalize(s: &str) -> &str {
    s.strip_prefix("./").unwrap_or(s)
}
