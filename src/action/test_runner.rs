// src/action/test_runner.rs

use std::path::PathBuf;

use tracing::info;

use crate::action::{ActionFuture, TaskAction, TaskContext};
use crate::config::TestConfig;
use crate::exec::run_command;

/// Launch the external test runner once and wait for it to exit.
#[derive(Debug, Clone)]
pub struct TestRunnerAction {
    command_line: String,
    cwd: PathBuf,
}

impl TestRunnerAction {
    pub fn new(config: &TestConfig, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command_line: config.command_line(),
            cwd: cwd.into(),
        }
    }
}

impl TaskAction for TestRunnerAction {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> ActionFuture<'a> {
        Box::pin(async move {
            info!(cmd = %self.command_line, "running tests once");
            run_command(ctx.task(), &self.command_line, &self.cwd).await
        })
    }

    fn describe(&self) -> String {
        format!("test runner: {}", self.command_line)
    }
}
