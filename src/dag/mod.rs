// src/dag/mod.rs

//! Task table and prerequisite resolution.
//!
//! - [`registry`] registers tasks and freezes them into an immutable table.
//! - [`graph`] holds the prerequisite DAG and computes execution plans.
//! - [`scheduler`] contains the per-invocation state machine.
//! - [`task_info`] provides the per-task run state.

pub mod graph;
pub mod registry;
pub mod scheduler;
pub mod task_info;

pub use graph::DagGraph;
pub use registry::{TaskDefinition, TaskRegistry, TaskTable};
pub use scheduler::{Invocation, InvocationState};
pub use task_info::TaskRunState;
