// src/engine/mod.rs

//! Orchestration engine for webdag.
//!
//! The [`Orchestrator`] owns the immutable task table and runs invocations:
//! it asks the per-invocation state machine ([`crate::dag::Invocation`]) for
//! the next step, awaits that task's action and reports the outcome back.
//! It also owns everything that outlives a single invocation: file-change
//! listeners and the development server.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, OrchestratorOptions, RunReport};

/// Outcome of a task's action, as seen by the invocation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}
