// src/lib.rs

pub mod action;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::{Orchestrator, OrchestratorOptions};
use crate::tasks::build_task_table;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the built-in + configured task table
/// - the orchestrator run of the requested task
/// - waiting for Ctrl-C if watchers or the dev server were started
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let table = build_task_table(&cfg)?;

    let options = OrchestratorOptions {
        root: cfg.root().to_path_buf(),
        use_hash: cfg.watch.use_hash,
    };
    let orchestrator = Orchestrator::new(table, options);

    if args.list {
        print_task_list(&orchestrator);
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&orchestrator, &args.task)?;
        return Ok(());
    }

    let report = orchestrator.run(&args.task).await?;
    debug!(executed = ?report.executed, "run complete");

    orchestrator.wait_for_background().await?;
    Ok(())
}

/// Print every task, its prerequisites and its action.
fn print_task_list(orchestrator: &Orchestrator) {
    println!("tasks ({}):", orchestrator.table().len());
    for def in orchestrator.table().iter() {
        if def.prerequisites().is_empty() {
            println!("  - {}", def.name());
        } else {
            println!("  - {} [{}]", def.name(), def.prerequisites().join(", "));
        }
        println!("      {}", def.action().describe());
    }
}

/// Print the plan for `task`: every step in execution order.
fn print_dry_run(orchestrator: &Orchestrator, task: &str) -> Result<()> {
    let plan = orchestrator.plan(task)?;
    println!("webdag dry-run: {task}");
    for (i, step) in plan.iter().enumerate() {
        let action = orchestrator
            .table()
            .get(step)
            .map(|def| def.action().describe())
            .unwrap_or_default();
        println!("  {}. {step}: {action}", i + 1);
    }
    debug!("dry-run complete (no execution)");
    Ok(())
}
