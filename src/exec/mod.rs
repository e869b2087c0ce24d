// src/exec/mod.rs

//! External process execution.
//!
//! Shell-command tasks, the test runner and the TypeScript compile stage all
//! go through [`command`], using `tokio::process::Command`.

pub mod command;

pub use command::{pipe_through, run_command, shell_command};
