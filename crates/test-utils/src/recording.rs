use std::sync::{Arc, Mutex};

use webdag::action::Action;
use webdag::dag::{TaskRegistry, TaskTable};
use webdag::engine::{Orchestrator, OrchestratorOptions};
use webdag::errors::WebdagError;

/// Shared log of task names, in the order their actions ran.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    executed: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn count(&self, task: &str) -> usize {
        self.executed().iter().filter(|t| *t == task).count()
    }

    /// An action that records its task name and succeeds.
    pub fn action(&self) -> Action {
        let executed = Arc::clone(&self.executed);
        Action::from_fn("record", move |ctx| {
            let executed = Arc::clone(&executed);
            async move {
                executed.lock().unwrap().push(ctx.task().to_string());
                Ok(())
            }
        })
    }

    /// An action that records its task name and then fails.
    pub fn failing_action(&self) -> Action {
        let executed = Arc::clone(&self.executed);
        Action::from_fn("record-and-fail", move |ctx| {
            let executed = Arc::clone(&executed);
            async move {
                executed.lock().unwrap().push(ctx.task().to_string());
                Err(WebdagError::ExternalProcess {
                    program: ctx.task().to_string(),
                    code: 1,
                })
            }
        })
    }
}

/// Register `tasks` (name, prerequisites) in order, each with a recording
/// action; names listed in `failing` get a failing action instead.
pub fn recording_table(
    recorder: &Recorder,
    tasks: &[(&str, &[&str])],
    failing: &[&str],
) -> TaskTable {
    let mut registry = TaskRegistry::new();
    for (name, deps) in tasks {
        let action = if failing.contains(name) {
            recorder.failing_action()
        } else {
            recorder.action()
        };
        registry
            .register(*name, deps, action)
            .expect("valid test task table");
    }
    registry.finish()
}

/// Orchestrator rooted at `root` over a recording table.
pub fn recording_orchestrator(
    recorder: &Recorder,
    root: impl Into<std::path::PathBuf>,
    tasks: &[(&str, &[&str])],
) -> Orchestrator {
    Orchestrator::new(
        recording_table(recorder, tasks, &[]),
        OrchestratorOptions::new(root),
    )
}
