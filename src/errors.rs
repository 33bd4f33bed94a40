// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdtError {
    #[error("usage: cdt tasks.json")]
    Usage,

    #[error("{0} does not exist")]
    TasksConfigNotFound(String),

    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is invalid:\n{}", errors.join("\n"))]
    InvalidTasksConfig { path: String, errors: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CdtError {
    /// Validation messages carried by an invalid task config, if any.
    pub fn config_errors(&self) -> &[String] {
        match self {
            CdtError::InvalidTasksConfig { errors, .. } => errors,
            _ => &[],
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CdtError>;
