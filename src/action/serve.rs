// src/action/serve.rs

use crate::action::{ActionFuture, TaskAction, TaskContext};
use crate::server::{self, ServerSettings};

/// Start the development server and keep it running in the background.
#[derive(Debug, Clone)]
pub struct ServeAction {
    settings: ServerSettings,
}

impl ServeAction {
    pub fn new(settings: ServerSettings) -> Self {
        Self { settings }
    }
}

impl TaskAction for ServeAction {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> ActionFuture<'a> {
        Box::pin(async move {
            println!("Starting server...");
            let handle = server::start(self.settings.clone()).await?;
            ctx.orchestrator().keep_alive(handle);
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!(
            "serve {} on port {}",
            self.settings.base_dir.display(),
            self.settings.port
        )
    }
}
