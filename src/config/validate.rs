// src/config/validate.rs

use std::path::{Component, Path};

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WebdagError};
use crate::tasks::BUILTIN_TASKS;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WebdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_tools(cfg)?;
    validate_command_tasks(cfg)?;
    validate_command_dag(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let paths = &cfg.paths;

    for (key, pattern) in [
        ("scripts", &paths.scripts),
        ("styles", &paths.styles),
        ("assets", &paths.assets),
    ] {
        if pattern.trim().is_empty() {
            return Err(WebdagError::ConfigError(format!(
                "[paths].{key} must not be empty"
            )));
        }
        Glob::new(pattern).map_err(|e| {
            WebdagError::ConfigError(format!("[paths].{key} is not a valid glob: {e}"))
        })?;
    }

    // `clean` deletes everything below these two, so refuse anything that
    // would point at the project root or outside of it.
    for (key, dir) in [("temp_dir", &paths.temp_dir), ("output_dir", &paths.output_dir)] {
        if !is_contained_subdir(dir) {
            return Err(WebdagError::ConfigError(format!(
                "[paths].{key} must be a relative sub-directory of the project (got {dir:?})"
            )));
        }
    }

    for (key, name) in [
        ("script_bundle", &paths.script_bundle),
        ("style_bundle", &paths.style_bundle),
    ] {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(WebdagError::ConfigError(format!(
                "[paths].{key} must be a bare file name (got {name:?})"
            )));
        }
    }

    Ok(())
}

fn is_contained_subdir(dir: &str) -> bool {
    let path = Path::new(dir);
    let mut normal = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            _ => return false,
        }
    }
    normal > 0
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    if cfg.tools.typescript.trim().is_empty() {
        return Err(WebdagError::ConfigError(
            "[tools].typescript must name a compiler command".to_string(),
        ));
    }
    if cfg.tools.max_line_length == 0 {
        return Err(WebdagError::ConfigError(
            "[tools].max_line_length must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.test.command.trim().is_empty() {
        return Err(WebdagError::ConfigError(
            "[test].command must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_command_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if BUILTIN_TASKS.contains(&name.as_str()) {
            return Err(WebdagError::ConfigError(format!(
                "task '{}' is already registered as a built-in task",
                name
            )));
        }
        if task.cmd.trim().is_empty() {
            return Err(WebdagError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
        for dep in task.after.iter() {
            if dep == name {
                return Err(WebdagError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.task.contains_key(dep) && !BUILTIN_TASKS.contains(&dep.as_str()) {
                return Err(WebdagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_command_dag(cfg: &RawConfigFile) -> Result<()> {
    command_task_order(cfg).map(|_| ())
}

/// Topological order of the `[task.<name>]` sections (dependencies first).
///
/// Built-in tasks never depend on command tasks, so only edges between
/// command tasks can form a cycle.
pub fn command_task_order(cfg: &RawConfigFile) -> Result<Vec<String>> {
    // Edge direction: dep -> task
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if cfg.task.contains_key(dep) {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(WebdagError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}
