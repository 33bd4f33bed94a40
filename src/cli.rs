// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cdt`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cdt",
    version,
    about = "Run project tasks and google tests from an interactive prompt.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task config file (JSON).
    ///
    /// A missing path is reported with cdt's own usage line.
    #[arg(value_name = "TASKS_JSON")]
    pub tasks_config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CDT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
