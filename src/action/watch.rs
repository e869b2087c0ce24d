// src/action/watch.rs

use crate::action::{ActionFuture, TaskAction, TaskContext};
use crate::types::TaskName;

/// A glob and the tasks it re-runs, in order.
#[derive(Debug, Clone)]
pub struct WatchSpec {
    pub pattern: String,
    pub tasks: Vec<TaskName>,
}

impl WatchSpec {
    pub fn new(pattern: impl Into<String>, tasks: &[&str]) -> Self {
        Self {
            pattern: pattern.into(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Register file-change listeners; completes once they are installed.
#[derive(Debug, Clone)]
pub struct WatchAction {
    specs: Vec<WatchSpec>,
}

impl WatchAction {
    pub fn new(specs: Vec<WatchSpec>) -> Self {
        Self { specs }
    }
}

impl TaskAction for WatchAction {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> ActionFuture<'a> {
        Box::pin(async move {
            for spec in &self.specs {
                let tasks: Vec<&str> = spec.tasks.iter().map(String::as_str).collect();
                ctx.orchestrator().watch(&spec.pattern, &tasks)?;
            }
            Ok(())
        })
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self
            .specs
            .iter()
            .map(|s| format!("{} -> [{}]", s.pattern, s.tasks.join(", ")))
            .collect();
        format!("watch {}", parts.join("; "))
    }
}
