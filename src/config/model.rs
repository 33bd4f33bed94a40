// src/config/model.rs

use serde::Deserialize;
use serde_json::Value;

/// Task config document as read from disk.
///
/// ```json
/// {
///   "cdt_tasks": [
///     {"name": "build", "command": "make"},
///     {"name": "tests", "command": "./tests", "is_gtest": true, "pre_tasks": ["build"]}
///   ]
/// }
/// ```
///
/// Individual tasks are kept as raw JSON so that validation can report every
/// problem instead of stopping at the first one.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTasksFile {
    #[serde(default)]
    pub cdt_tasks: Option<Value>,
}

/// A validated task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    /// Shell command. For google-test tasks this is the test binary
    /// invocation; for restart tasks it is unused.
    pub command: String,
    pub is_gtest: bool,
    pub is_restart: bool,
    /// Direct pre-task names as written in the config.
    pub pre_tasks: Vec<String>,
}

impl Task {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            is_gtest: false,
            is_restart: false,
            pre_tasks: Vec::new(),
        }
    }
}

/// Tasks plus their flattened pre-task chains.
///
/// `pre_tasks[i]` lists indices into `tasks`, dependency-first, each at most
/// once, never containing `i` itself.
#[derive(Debug, Clone, Default)]
pub struct TasksConfig {
    pub tasks: Vec<Task>,
    pub pre_tasks: Vec<Vec<usize>>,
}

impl TasksConfig {
    pub fn new_unchecked(tasks: Vec<Task>, pre_tasks: Vec<Vec<usize>>) -> Self {
        Self { tasks, pre_tasks }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.name == name)
    }
}

/// Every validation problem found in a task config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigErrors(pub Vec<String>);
