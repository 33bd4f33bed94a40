// src/config/loader.rs

use std::fs;
use std::io;
use std::path::Path;

use crate::config::model::{RawTasksFile, TasksConfig};
use crate::errors::{CdtError, Result};

/// Load a task config file from a given path and return the raw document.
///
/// This only performs JSON deserialization; it does **not** validate tasks.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawTasksFile> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CdtError::TasksConfigNotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    parse_raw(path, &contents)
}

/// Parse task config contents; `path` is only used in error messages.
pub fn parse_raw(path: &Path, contents: &str) -> Result<RawTasksFile> {
    serde_json::from_str(contents).map_err(|source| CdtError::ConfigParse {
        path: path.display().to_string(),
        source,
    })
}

/// Load a task config from path and validate it.
///
/// - Reads JSON.
/// - Checks every task's fields, name uniqueness and pre-task references.
/// - Flattens pre-task trees and reports circular dependencies.
///
/// Every problem found is returned at once in
/// [`CdtError::InvalidTasksConfig`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<TasksConfig> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    TasksConfig::try_from(raw).map_err(|errors| CdtError::InvalidTasksConfig {
        path: path.display().to_string(),
        errors: errors.0,
    })
}
