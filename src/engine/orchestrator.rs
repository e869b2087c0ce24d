// src/engine/orchestrator.rs

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::action::TaskContext;
use crate::dag::{DagGraph, Invocation, TaskTable};
use crate::engine::TaskOutcome;
use crate::errors::{Result, WebdagError};
use crate::types::TaskName;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::relative_str;
use crate::watch::{WatchBinding, spawn_watcher};

/// Settings that apply to every invocation.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Project root; watch patterns are relative to it.
    pub root: PathBuf,
    /// Skip change events whose file content did not actually change.
    pub use_hash: bool,
}

impl OrchestratorOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            use_hash: false,
        }
    }
}

/// Result of a successful `run(name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub target: TaskName,
    /// Every task whose action ran, in execution order.
    pub executed: Vec<TaskName>,
}

struct Inner {
    table: TaskTable,
    graph: DagGraph,
    options: OrchestratorOptions,
    /// Watchers, listeners and servers that must live until process exit.
    background: Mutex<Vec<Box<dyn Any + Send>>>,
}

/// Runs tasks from an immutable [`TaskTable`].
///
/// Cheap to clone; every clone shares the same table and background set.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tasks", &self.inner.table.len())
            .field("root", &self.inner.options.root)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(table: TaskTable, options: OrchestratorOptions) -> Self {
        let graph = DagGraph::from_table(&table);
        Self {
            inner: Arc::new(Inner {
                table,
                graph,
                options,
                background: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn table(&self) -> &TaskTable {
        &self.inner.table
    }

    pub fn root(&self) -> &Path {
        &self.inner.options.root
    }

    /// Execution order for `name` without running anything.
    pub fn plan(&self, name: &str) -> Result<Vec<TaskName>> {
        self.inner.graph.execution_order(name)
    }

    /// Run `name` after all of its transitive prerequisites.
    ///
    /// Each task runs at most once per invocation. The first failing action
    /// aborts the invocation and is returned wrapped in `TaskFailed`.
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        let plan = self.plan(name)?;
        let mut invocation = Invocation::new(name, plan);
        let started = Instant::now();

        debug!(target_task = name, plan = ?invocation.plan(), "starting invocation");

        while let Some(task) = invocation.next_task() {
            let definition = self
                .inner
                .table
                .get(&task)
                .ok_or_else(|| WebdagError::UnknownTask(task.clone()))?;
            let ctx = TaskContext::new(task.clone(), self.clone());
            let step_started = Instant::now();

            info!(task = %task, "Starting '{}'...", task);
            match definition.action().execute(&ctx).await {
                Ok(()) => {
                    invocation.handle_completion(&task, TaskOutcome::Success);
                    info!(
                        task = %task,
                        elapsed_ms = step_started.elapsed().as_millis() as u64,
                        "Finished '{}'",
                        task
                    );
                }
                Err(err) => {
                    invocation.handle_completion(&task, TaskOutcome::Failed);
                    error!(
                        task = %task,
                        elapsed_ms = step_started.elapsed().as_millis() as u64,
                        error = %err,
                        "'{}' errored",
                        task
                    );
                    return Err(WebdagError::TaskFailed {
                        task,
                        source: Box::new(err),
                    });
                }
            }
        }

        debug!(
            target_task = name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "invocation finished"
        );

        Ok(RunReport {
            target: invocation.target().to_string(),
            executed: invocation.succeeded(),
        })
    }

    /// Watch `pattern` (relative to the project root) and run `tasks` in
    /// order on every matching change.
    ///
    /// The listener lives until process exit.
    pub fn watch(&self, pattern: &str, tasks: &[&str]) -> Result<()> {
        let binding = self.bind(pattern, tasks)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = spawn_watcher(self.root(), tx)?;
        let listener = self.listen(binding, rx);

        info!(pattern, ?tasks, "watching for changes");
        self.keep_alive(watcher);
        self.keep_alive(listener);
        Ok(())
    }

    /// Build a [`WatchBinding`] after checking that every task exists.
    pub fn bind(&self, pattern: &str, tasks: &[&str]) -> Result<WatchBinding> {
        if let Some(missing) = tasks.iter().find(|t| !self.inner.table.contains(t)) {
            return Err(WebdagError::UnknownTask(missing.to_string()));
        }
        WatchBinding::new(pattern, tasks)
    }

    /// Consume change batches from `events` and run the binding's tasks for
    /// each batch that touches a matching path.
    ///
    /// Batches are processed one at a time, so runs of the same listener never
    /// overlap. A failing task stops the rest of that batch's sequence; the
    /// listener itself keeps going.
    pub fn listen(
        &self,
        binding: WatchBinding,
        mut events: mpsc::UnboundedReceiver<Vec<PathBuf>>,
    ) -> JoinHandle<()> {
        let orchestrator = self.clone();

        tokio::spawn(async move {
            let root = orchestrator.root().to_path_buf();
            let use_hash = orchestrator.inner.options.use_hash;
            let mut hashes = ContentHashes::new();

            while let Some(paths) = events.recv().await {
                let matched: Vec<&PathBuf> = paths
                    .iter()
                    .filter(|path| {
                        relative_str(&root, path).is_some_and(|rel| binding.matches(&rel))
                    })
                    .collect();

                if matched.is_empty() {
                    continue;
                }

                if use_hash {
                    let mut changed = false;
                    for path in &matched {
                        changed |= hashes.changed(&root.join(path));
                    }
                    if !changed {
                        debug!(pattern = binding.pattern(), "content unchanged; skipping");
                        continue;
                    }
                }

                info!(pattern = binding.pattern(), files = ?matched, "change detected");

                for task in binding.tasks() {
                    if let Err(err) = orchestrator.run(task).await {
                        warn!(
                            pattern = binding.pattern(),
                            task = %task,
                            error = %err,
                            "watch run failed; waiting for the next change"
                        );
                        break;
                    }
                }
            }

            debug!(pattern = binding.pattern(), "watch listener finished");
        })
    }

    /// Keep `handle` alive until process exit.
    pub fn keep_alive<T: Send + 'static>(&self, handle: T) {
        self.background_set().push(Box::new(handle));
    }

    /// Whether a watcher, listener or server was started.
    pub fn has_background(&self) -> bool {
        !self.background_set().is_empty()
    }

    /// Block until Ctrl-C when something is running in the background.
    pub async fn wait_for_background(&self) -> Result<()> {
        if !self.has_background() {
            return Ok(());
        }
        info!("running in the background; press Ctrl-C to exit");
        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        Ok(())
    }

    fn background_set(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn Any + Send>>> {
        // A poisoned lock only means another thread panicked while pushing.
        self.inner
            .background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
