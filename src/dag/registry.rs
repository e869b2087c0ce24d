// src/dag/registry.rs

//! Task registration.
//!
//! Tasks are registered once through a [`TaskRegistry`] and then frozen into
//! an immutable [`TaskTable`] that orchestrators share.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::action::Action;
use crate::errors::{Result, WebdagError};
use crate::types::TaskName;

/// A single declared task: name, ordered prerequisites and action.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    name: TaskName,
    prerequisites: Vec<TaskName>,
    action: Action,
}

impl TaskDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prerequisites in declaration order.
    pub fn prerequisites(&self) -> &[TaskName] {
        &self.prerequisites
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}

/// Mutable builder for a [`TaskTable`].
///
/// Prerequisites must be registered before the tasks that name them, which
/// also makes cycles impossible.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<TaskDefinition>,
    index: HashMap<TaskName, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with its prerequisites and action.
    ///
    /// Fails with `ConfigError` if `name` is taken (the existing definition
    /// is kept) or if any prerequisite has not been registered yet.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        prerequisites: &[&str],
        action: Action,
    ) -> Result<()> {
        let name = name.into();

        if self.index.contains_key(&name) {
            return Err(WebdagError::ConfigError(format!(
                "task '{}' is already registered",
                name
            )));
        }

        for dep in prerequisites {
            if *dep == name {
                return Err(WebdagError::ConfigError(format!(
                    "task '{}' cannot depend on itself",
                    name
                )));
            }
            if !self.index.contains_key(*dep) {
                return Err(WebdagError::ConfigError(format!(
                    "task '{}' has undeclared prerequisite '{}'",
                    name, dep
                )));
            }
        }

        debug!(task = %name, ?prerequisites, action = %action.describe(), "registered task");

        self.index.insert(name.clone(), self.tasks.len());
        self.tasks.push(TaskDefinition {
            name,
            prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
            action,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Freeze the registry.
    pub fn finish(self) -> TaskTable {
        TaskTable {
            inner: Arc::new(TableInner {
                tasks: self.tasks,
                index: self.index,
            }),
        }
    }
}

#[derive(Debug)]
struct TableInner {
    tasks: Vec<TaskDefinition>,
    index: HashMap<TaskName, usize>,
}

/// Immutable task table, cheap to clone.
#[derive(Debug, Clone)]
pub struct TaskTable {
    inner: Arc<TableInner>,
}

impl TaskTable {
    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.inner.index.get(name).map(|&i| &self.inner.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.index.contains_key(name)
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.inner.tasks.iter()
    }

    /// Task names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.inner.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_keeps_first_definition() {
        let mut registry = TaskRegistry::new();
        registry.register("a", &[], Action::none()).unwrap();
        registry
            .register("b", &[], Action::from_fn("b", |_| async { Ok(()) }))
            .unwrap();

        let err = registry
            .register("b", &["a"], Action::none())
            .unwrap_err();
        assert!(matches!(err, WebdagError::ConfigError(ref msg) if msg.contains("already registered")));

        let table = registry.finish();
        let b = table.get("b").unwrap();
        assert!(b.prerequisites().is_empty());
        assert_eq!(b.action().describe(), "b");
    }

    #[test]
    fn undeclared_prerequisite_is_rejected() {
        let mut registry = TaskRegistry::new();
        let err = registry
            .register("bundle", &["compile"], Action::none())
            .unwrap_err();

        assert!(matches!(err, WebdagError::ConfigError(ref msg) if msg.contains("compile")));
        assert!(!registry.contains("bundle"));
    }

    #[test]
    fn names_follow_registration_order() {
        let mut registry = TaskRegistry::new();
        for name in ["z", "a", "m"] {
            registry.register(name, &[], Action::none()).unwrap();
        }
        let table = registry.finish();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }
}
