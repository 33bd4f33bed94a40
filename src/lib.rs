// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod entity;
pub mod errors;
pub mod exec;
pub mod gtest;
pub mod logging;
pub mod os;
pub mod output;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::CliArgs;
use crate::engine::{Runtime, spawn_interrupt_listener};
use crate::errors::{CdtError, Result};
use crate::os::RealOs;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (inside [`Runtime::init`])
/// - the execution event queue
/// - Ctrl-C handling
/// - the prompt loop
pub async fn run(args: CliArgs) -> Result<()> {
    let tasks_config = args.tasks_config.ok_or(CdtError::Usage)?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _interrupts = spawn_interrupt_listener(events_tx.clone());

    let mut runtime = Runtime::init(RealOs::new(), &tasks_config, events_tx, events_rx)?;
    debug!(?runtime, "runtime initialised");
    runtime.run().await
}
