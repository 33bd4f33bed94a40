#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};
use tempfile::TempDir;

/// Builder for a task config document.
#[derive(Debug, Clone, Default)]
pub struct TasksFileBuilder {
    tasks: Vec<Value>,
}

impl TasksFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task: TaskBuilder) -> Self {
        self.tasks.push(task.build());
        self
    }

    pub fn build(self) -> Value {
        json!({ "cdt_tasks": self.tasks })
    }
}

/// Builder for one entry of `cdt_tasks`.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: Value,
}

impl TaskBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            task: json!({ "name": name, "command": command }),
        }
    }

    pub fn pre_tasks(mut self, names: &[&str]) -> Self {
        self.task["pre_tasks"] = json!(names);
        self
    }

    pub fn gtest(mut self) -> Self {
        self.task["is_gtest"] = json!(true);
        self
    }

    pub fn restart(mut self) -> Self {
        self.task["is_restart"] = json!(true);
        self
    }

    pub fn build(self) -> Value {
        self.task
    }
}

/// Temporary project with a task config and a home directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub tasks_config: PathBuf,
    pub home: PathBuf,
}

impl TestEnv {
    pub fn new(tasks: &Value) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let tasks_config = dir.path().join("tasks.json");
        fs::write(&tasks_config, serde_json::to_string_pretty(tasks)?)?;
        let home = dir.path().join("home");
        fs::create_dir(&home)?;
        Ok(Self {
            dir,
            tasks_config,
            home,
        })
    }

    /// Write `~/.cpp-dev-tools.json`.
    pub fn with_user_config(self, config: &Value) -> anyhow::Result<Self> {
        fs::write(
            self.home.join(cdt::config::user::USER_CONFIG_FILE_NAME),
            serde_json::to_string_pretty(config)?,
        )?;
        Ok(self)
    }

    /// User config with every command template set.
    pub fn with_full_user_config(self) -> anyhow::Result<Self> {
        self.with_user_config(&json!({
            "open_in_editor_command": "subl {}",
            "debug_command": "gdb --args {}",
            "execute_in_new_terminal_tab_command": "terminal -- {}",
        }))
    }
}
