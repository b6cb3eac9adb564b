//! Name-keyed task table

use std::collections::BTreeMap;

use tracing::debug;

use zarro_core::{EnvironmentRegistry, IntoNames};

use crate::task::{TaskDefinition, TaskSource};

/// All tasks known to this invocation.
///
/// Registration is last-write-wins: registering a name that already exists
/// replaces the earlier definition. This is how local, override and external
/// task modules replace built-in tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskDefinition>,
}

impl TaskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, returning the definition it replaced
    pub fn register(&mut self, definition: TaskDefinition) -> Option<TaskDefinition> {
        let replaced = self.tasks.insert(definition.name.clone(), definition);
        if let Some(old) = &replaced {
            if let Some(new) = self.tasks.get(&old.name) {
                debug!(
                    task = %old.name,
                    previous = %old.source,
                    replacement = %new.source,
                    "task redefined"
                );
            }
        }
        replaced
    }

    /// Get a task by name
    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    /// Check whether a task exists
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    /// Iterate over tasks in name order
    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Handle given to a task module while it registers its tasks
pub struct TaskRegistrar<'a> {
    tasks: &'a mut TaskRegistry,
    env: &'a EnvironmentRegistry,
    source: TaskSource,
    registered: usize,
}

impl<'a> TaskRegistrar<'a> {
    /// Create a registrar stamping every task with `source`
    pub fn new(
        tasks: &'a mut TaskRegistry,
        env: &'a EnvironmentRegistry,
        source: TaskSource,
    ) -> Self {
        Self {
            tasks,
            env,
            source,
            registered: 0,
        }
    }

    /// Register a task
    pub fn task(&mut self, definition: TaskDefinition) {
        self.registered += 1;
        self.tasks.register(definition.with_source(self.source.clone()));
    }

    /// Record which variables the given tasks read
    pub fn associate(&self, names: impl IntoNames, tasks: impl IntoNames) {
        self.env.associate(names, tasks);
    }

    /// The shared environment registry
    pub fn env(&self) -> &EnvironmentRegistry {
        self.env
    }

    /// Number of tasks registered through this handle
    pub fn registered(&self) -> usize {
        self.registered
    }
}
