// src/dag/task_info.rs

//! Per-invocation task state.

/// Per-invocation state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    /// Part of the plan, waiting for earlier steps.
    Pending,
    /// Action is currently executing.
    Running,
    /// Action completed successfully.
    DoneSuccess,
    /// Action failed.
    DoneFailed,
    /// Never started because an earlier step failed.
    Skipped,
}

/// Public, read-only view of a task's per-invocation state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not part of this invocation's plan.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Skipped,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
            Some(RunState::Skipped) => TaskRunState::Skipped,
        }
    }
}
