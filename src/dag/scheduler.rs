// src/dag/scheduler.rs

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::task_info::{RunState, TaskRunState};
use crate::engine::TaskOutcome;
use crate::types::TaskName;

/// Lifecycle of a single `run(name)` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    RunningPrerequisites,
    RunningSelf,
    Succeeded,
    Failed,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, InvocationState::Succeeded | InvocationState::Failed)
    }
}

/// Pure state machine for one invocation of a task.
///
/// It owns the execution plan (prerequisites first, target last) and the
/// per-task state. It performs no IO: the orchestrator asks for the next
/// task, runs its action, and reports the outcome back.
#[derive(Debug, Clone)]
pub struct Invocation {
    target: TaskName,
    plan: Vec<TaskName>,
    states: HashMap<TaskName, RunState>,
    cursor: usize,
    state: InvocationState,
}

impl Invocation {
    /// `plan` must end with `target`.
    pub fn new(target: impl Into<TaskName>, plan: Vec<TaskName>) -> Self {
        let states = plan
            .iter()
            .map(|name| (name.clone(), RunState::Pending))
            .collect();
        Self {
            target: target.into(),
            plan,
            states,
            cursor: 0,
            state: InvocationState::Pending,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn plan(&self) -> &[TaskName] {
        &self.plan
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn run_state_of(&self, task: &str) -> TaskRunState {
        self.states.get(task).copied().into()
    }

    /// Tasks that completed successfully, in execution order.
    pub fn succeeded(&self) -> Vec<TaskName> {
        self.plan
            .iter()
            .filter(|name| self.states.get(*name) == Some(&RunState::DoneSuccess))
            .cloned()
            .collect()
    }

    /// Pick the next task of the plan and mark it `Running`.
    ///
    /// Returns `None` once the invocation is terminal or a task is still
    /// running.
    pub fn next_task(&mut self) -> Option<TaskName> {
        if self.state.is_terminal() {
            return None;
        }
        if self.cursor > 0 {
            let previous = &self.plan[self.cursor - 1];
            if self.states.get(previous) == Some(&RunState::Running) {
                return None;
            }
        }

        let name = self.plan.get(self.cursor)?.clone();
        self.state = if name == self.target {
            InvocationState::RunningSelf
        } else {
            InvocationState::RunningPrerequisites
        };
        self.states.insert(name.clone(), RunState::Running);
        self.cursor += 1;
        debug!(task = %name, target = %self.target, "task running");
        Some(name)
    }

    /// Record the outcome of a running task.
    ///
    /// A failure is terminal: every task still pending is marked skipped.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) {
        match self.states.get(task) {
            Some(RunState::Running) => {}
            other => {
                warn!(task, state = ?other, "completion for a task that is not running; ignoring");
                return;
            }
        }

        match outcome {
            TaskOutcome::Success => {
                self.states.insert(task.to_string(), RunState::DoneSuccess);
                if self.cursor == self.plan.len() {
                    self.state = InvocationState::Succeeded;
                }
            }
            TaskOutcome::Failed => {
                self.states.insert(task.to_string(), RunState::DoneFailed);
                for name in &self.plan[self.cursor..] {
                    self.states.insert(name.clone(), RunState::Skipped);
                }
                self.state = InvocationState::Failed;
            }
        }
    }
}
