// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use crate::dag::registry::TaskTable;
use crate::errors::{Result, WebdagError};
use crate::types::TaskName;

/// In-memory prerequisite graph keyed by task name.
///
/// The registry already rejects undeclared prerequisites; a cycle found
/// while resolving is still reported as `DagCycle`.
#[derive(Debug, Clone)]
pub struct DagGraph {
    /// Direct prerequisites of each task, in declaration order.
    deps: HashMap<TaskName, Vec<TaskName>>,
}

impl DagGraph {
    /// Build a DAG from a frozen [`TaskTable`].
    pub fn from_table(table: &TaskTable) -> Self {
        let deps = table
            .iter()
            .map(|def| (def.name().to_string(), def.prerequisites().to_vec()))
            .collect();
        Self { deps }
    }

    /// Immediate prerequisites of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.deps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Execution order for `target`: every transitive prerequisite exactly
    /// once, depth first in declaration order, followed by `target` itself.
    pub fn execution_order(&self, target: &str) -> Result<Vec<TaskName>> {
        if !self.deps.contains_key(target) {
            return Err(WebdagError::UnknownTask(target.to_string()));
        }

        let mut order = Vec::new();
        let mut done: HashSet<&str> = HashSet::new();
        let mut visiting: HashSet<&str> = HashSet::new();
        self.visit(target, &mut done, &mut visiting, &mut order)?;
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        done: &mut HashSet<&'a str>,
        visiting: &mut HashSet<&'a str>,
        order: &mut Vec<TaskName>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if !visiting.insert(name) {
            return Err(WebdagError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                name
            )));
        }

        for dep in self.dependencies_of(name) {
            self.visit(dep, done, visiting, order)?;
        }

        visiting.remove(name);
        done.insert(name);
        order.push(name.to_string());
        Ok(())
    }
}
