// src/action/mod.rs

//! Task actions.
//!
//! Every action returns an explicit completion future: the orchestrator
//! awaits it before moving on to the next step of the plan. A task that does
//! nothing must say so with [`Action::none`].
//!
//! - [`clean`]: remove generated output.
//! - [`command`]: run a shell command (config-declared tasks).
//! - [`serve`]: start the development server.
//! - [`test_runner`]: run the external test runner once.
//! - [`watch`]: register file-change listeners.
//!
//! File-transformation pipelines implement [`TaskAction`] directly in
//! [`crate::pipeline`].

pub mod clean;
pub mod command;
pub mod serve;
pub mod test_runner;
pub mod watch;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::Orchestrator;
use crate::errors::Result;
use crate::types::TaskName;

pub use clean::CleanAction;
pub use command::CommandAction;
pub use serve::ServeAction;
pub use test_runner::TestRunnerAction;
pub use watch::{WatchAction, WatchSpec};

/// Boxed completion future returned by every action.
pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Context handed to an action while it executes.
#[derive(Clone)]
pub struct TaskContext {
    task: TaskName,
    orchestrator: Orchestrator,
}

impl TaskContext {
    pub fn new(task: impl Into<TaskName>, orchestrator: Orchestrator) -> Self {
        Self {
            task: task.into(),
            orchestrator,
        }
    }

    /// Name of the task being executed.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Orchestrator running this task (used by `watch` and `serve`).
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// Something a task does once its prerequisites have succeeded.
pub trait TaskAction: Send + Sync {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> ActionFuture<'a>;

    /// Short human-readable description for `--dry-run` / `--list`.
    fn describe(&self) -> String;
}

/// Shared, cloneable handle to a task's action.
///
/// `Action::none()` marks an alias task whose only purpose is to group
/// prerequisites.
#[derive(Clone)]
pub struct Action(Option<Arc<dyn TaskAction>>);

impl Action {
    pub fn new(action: impl TaskAction + 'static) -> Self {
        Action(Some(Arc::new(action)))
    }

    pub fn none() -> Self {
        Action(None)
    }

    /// Wrap an async closure as an action.
    pub fn from_fn<F, Fut>(description: impl Into<String>, f: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Action::new(FnAction {
            description: description.into(),
            f,
        })
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn describe(&self) -> String {
        match &self.0 {
            Some(action) => action.describe(),
            None => "(alias)".to_string(),
        }
    }

    pub fn execute<'a>(&'a self, ctx: &'a TaskContext) -> ActionFuture<'a> {
        match &self.0 {
            Some(action) => action.execute(ctx),
            None => Box::pin(async { Ok(()) }),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.describe())
    }
}

struct FnAction<F> {
    description: String,
    f: F,
}

impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> ActionFuture<'a> {
        Box::pin((self.f)(ctx.clone()))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
