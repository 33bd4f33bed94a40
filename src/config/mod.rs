// src/config/mod.rs

//! Configuration loading and validation for cdt.
//!
//! Responsibilities:
//! - Define the JSON-backed task model (`model.rs`).
//! - Load a task config file from disk (`loader.rs`).
//! - Validate tasks and flatten pre-task chains (`validate.rs`).
//! - Load the per-user command templates (`user.rs`, `template.rs`).

pub mod loader;
pub mod model;
pub mod template;
pub mod user;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigErrors, RawTasksFile, Task, TasksConfig};
pub use template::TemplateString;
pub use user::{UserConfig, UserConfigField};
pub use validate::flatten_pre_tasks;
