// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs shell commands with `tokio::process::Command` and reports their
//! output and exit back to the engine as [`crate::engine::ExecutionEvent`]s.
//! Used by [`crate::os::RealOs`]; nothing in here touches engine state.

pub mod process;

pub use process::{shell_command, spawn_supervised};
