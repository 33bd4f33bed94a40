// src/os/mod.rs

//! Operating-system seam.
//!
//! Everything the engine needs from the outside world goes through
//! [`OsApi`]: the console, environment, working directory, child processes
//! and re-exec. Production code uses [`RealOs`]; tests substitute a scripted
//! double that replays process output synchronously.

use std::ffi::OsString;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::{DateTime, Local};

use crate::engine::EventSender;
use crate::entity::Entity;

pub mod real;

pub use real::RealOs;

/// Future returned by [`OsApi::read_line`]. `Ok(None)` means end of input.
pub type ReadLine<'a> = Pin<Box<dyn Future<Output = io::Result<Option<String>>> + Send + 'a>>;

pub trait OsApi: Send {
    /// Console sink for everything the prompt prints.
    fn out(&mut self) -> &mut dyn Write;

    /// Read one line of user input without its line terminator.
    fn read_line(&mut self) -> ReadLine<'_>;

    fn get_env(&self, name: &str) -> Option<String>;

    fn home_dir(&self) -> Option<PathBuf>;

    fn current_exe(&self) -> io::Result<PathBuf>;

    fn current_dir(&self) -> io::Result<PathBuf>;

    fn set_current_dir(&mut self, path: &Path) -> io::Result<()>;

    /// Start `shell_command` for `exec`.
    ///
    /// Output chunks and exactly one exit event are pushed to `events`. An
    /// `Err` means nothing was started and no event will follow.
    fn start_process(&mut self, exec: Entity, shell_command: &str, events: EventSender)
    -> io::Result<()>;

    /// Kill the process started for `exec`. Its exit is reported with code -1.
    fn kill_process(&mut self, exec: Entity);

    /// Run a command without tracking or capturing it (opening an editor).
    fn spawn_detached(&mut self, shell_command: &str) -> io::Result<()>;

    /// Replace the current process image with `program args...`, adding
    /// `env` to its environment. Only returns when the replacement failed,
    /// except in test doubles which return `Ok(())` after recording the call.
    fn exec(&mut self, program: &Path, args: &[OsString], env: (&str, &str)) -> io::Result<()>;

    fn now(&self) -> DateTime<Local>;
}
