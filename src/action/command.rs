// src/action/command.rs

use std::path::PathBuf;

use crate::action::{ActionFuture, TaskAction, TaskContext};
use crate::exec::run_command;

/// Run a shell command line in the project root (`[task.<name>]`).
#[derive(Debug, Clone)]
pub struct CommandAction {
    cmd: String,
    cwd: PathBuf,
}

impl CommandAction {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl TaskAction for CommandAction {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> ActionFuture<'a> {
        Box::pin(run_command(ctx.task(), &self.cmd, &self.cwd))
    }

    fn describe(&self) -> String {
        format!("sh: {}", self.cmd)
    }
}
