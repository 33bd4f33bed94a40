// src/engine/mod.rs

//! Execution engine for cdt.
//!
//! [`Cdt`] is the root state. It is owned by the consumer loop in
//! [`runtime`] and is the only place per-execution state is mutated.
//! Producers (process readers, the Ctrl-C listener) only push
//! [`ExecutionEvent`]s onto the unbounded queue.
//!
//! Per-execution state lives in maps keyed by [`Entity`]:
//! - [`scheduler`] turns tasks into batches of executions and starts them
//!   one at a time,
//! - [`events`] consumes process output and exits,
//! - [`handlers`] implements the prompt's commands,
//! - [`restart`] re-executes the program.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::commands::{CommandKind, UserCommand};
use crate::config::{Task, TasksConfig, UserConfig};
use crate::entity::{Entities, Entity};
use crate::gtest::GtestExecution;
use crate::os::OsApi;
use crate::output::colors::{GREEN, RESET};
use crate::output::{ExecutionOutput, LineBuffer, TextBufferSearch, TextBuffers};

pub mod events;
pub mod handlers;
pub mod restart;
pub mod runtime;
pub mod scheduler;

pub use runtime::{Runtime, spawn_interrupt_listener};

/// Carries the last user command into a restarted process.
pub const LAST_COMMAND_ENV_VAR: &str = "LAST_COMMAND";

/// Entries kept in the execution history, not counting pinned ones.
pub const MAX_HISTORY_LEN: usize = 100;

/// Unit of work flowing from producers to the consumer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    Stdout { exec: Entity, data: String },
    Stderr { exec: Entity, data: String },
    /// Sent exactly once per started process. -1 means it was killed or
    /// could not be started.
    Exit { exec: Entity, code: i32 },
    /// The user pressed Ctrl-C.
    Interrupt,
}

pub type EventSender = mpsc::UnboundedSender<ExecutionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

/// What waiting at a prompt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptInput {
    Line(String),
    EndOfInput,
    /// Ctrl-C was pressed or the event queue closed.
    Interrupted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionState {
    #[default]
    Running,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebugStatus {
    #[default]
    NotRequired,
    Required,
    Attached,
}

/// One run of a task, a pre-task or a single google test.
#[derive(Debug, Clone)]
pub struct Execution {
    pub name: String,
    pub shell_command: String,
    pub state: ExecutionState,
    pub task_id: usize,
    /// Pinned executions survive history trimming.
    pub is_pinned: bool,
    pub repeat_until_fail: bool,
    pub is_restart: bool,
    pub start_time: Option<DateTime<Local>>,
    pub exit_code: Option<i32>,
}

impl Execution {
    fn new(name: impl Into<String>, shell_command: impl Into<String>, task_id: usize) -> Self {
        Self {
            name: name.into(),
            shell_command: shell_command.into(),
            state: ExecutionState::Running,
            task_id,
            is_pinned: false,
            repeat_until_fail: false,
            is_restart: false,
            start_time: None,
            exit_code: None,
        }
    }
}

/// Process-side bookkeeping of an execution.
#[derive(Debug, Clone, Default)]
pub struct Process {
    pub stdout: LineBuffer,
    pub stderr: LineBuffer,
    /// Primary executions print their output while it arrives; pre-tasks
    /// only print it if they fail.
    pub stream_output: bool,
    pub debug: DebugStatus,
}

/// Inputs [`Cdt`] is built from.
#[derive(Debug, Clone)]
pub struct CdtSettings {
    pub tasks: TasksConfig,
    pub user_config: UserConfig,
    /// Absolute path, handed back to the program on restart.
    pub tasks_config_path: PathBuf,
    pub executable: PathBuf,
}

/// Root state of the program.
pub struct Cdt<O: OsApi> {
    os: O,
    tasks: Vec<Task>,
    pre_tasks: Vec<Vec<usize>>,
    user_config: UserConfig,
    tasks_config_path: PathBuf,
    executable: PathBuf,

    entities: Entities,
    /// Front is the next execution to start.
    execs_to_run: VecDeque<Entity>,
    /// Front is the most recently finished execution.
    exec_history: VecDeque<Entity>,
    running: Option<Entity>,

    processes: HashMap<Entity, Process>,
    execs: HashMap<Entity, Execution>,
    exec_outputs: HashMap<Entity, ExecutionOutput>,
    gtest_execs: HashMap<Entity, GtestExecution>,
    text_buffers: HashMap<Entity, TextBuffers>,
    text_buffer_searches: HashMap<Entity, TextBufferSearch>,

    last_usr_cmd: UserCommand,
    selected_exec: Option<Entity>,
    events: EventSender,
    event_rx: EventReceiver,
    /// Set by Ctrl-C until the current batch is over.
    interrupted: bool,
    /// Set by Ctrl-C at a prompt of a command.
    exit_requested: bool,
}

impl<O: OsApi> Cdt<O> {
    pub fn new(os: O, settings: CdtSettings, events: EventSender, event_rx: EventReceiver) -> Self {
        Self {
            os,
            tasks: settings.tasks.tasks,
            pre_tasks: settings.tasks.pre_tasks,
            user_config: settings.user_config,
            tasks_config_path: settings.tasks_config_path,
            executable: settings.executable,
            entities: Entities::new(),
            execs_to_run: VecDeque::new(),
            exec_history: VecDeque::new(),
            running: None,
            processes: HashMap::new(),
            execs: HashMap::new(),
            exec_outputs: HashMap::new(),
            gtest_execs: HashMap::new(),
            text_buffers: HashMap::new(),
            text_buffer_searches: HashMap::new(),
            last_usr_cmd: UserCommand::default(),
            selected_exec: None,
            events,
            event_rx,
            interrupted: false,
            exit_requested: false,
        }
    }

    pub fn os(&self) -> &O {
        &self.os
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Nothing is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.running.is_none() && self.execs_to_run.is_empty()
    }

    /// Finished executions, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &Execution> + '_ {
        self.exec_history.iter().filter_map(|e| self.execs.get(e))
    }

    /// Google test results of a finished execution in the history.
    pub fn gtest_execution(&self, history_index: usize) -> Option<&GtestExecution> {
        let entity = self.exec_history.get(history_index)?;
        self.gtest_execs.get(entity)
    }

    fn out(&mut self) -> &mut dyn Write {
        self.os.out()
    }

    /// Wait for a line of input. Events other than Ctrl-C can't arrive
    /// while nothing runs and are dropped.
    async fn wait_for_input(&mut self) -> io::Result<PromptInput> {
        let Self { os, event_rx, .. } = self;
        loop {
            tokio::select! {
                biased;
                event = event_rx.recv() => match event {
                    Some(ExecutionEvent::Interrupt) | None => return Ok(PromptInput::Interrupted),
                    Some(event) => debug!(?event, "ignoring event while idle"),
                },
                line = os.read_line() => {
                    return Ok(line?.map_or(PromptInput::EndOfInput, PromptInput::Line));
                }
            }
        }
    }

    /// Print `prompt` in green and read a line. End of input reads as "".
    ///
    /// `None` means Ctrl-C was pressed; the command is abandoned and the
    /// program exits once it returns.
    async fn read_input(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.os.out(), "{GREEN}{prompt}{RESET}")?;
        self.os.out().flush()?;
        match self.wait_for_input().await? {
            PromptInput::Line(line) => Ok(Some(line)),
            PromptInput::EndOfInput => Ok(Some(String::new())),
            PromptInput::Interrupted => {
                info!(prompt, "interrupted at a prompt; exiting");
                self.exit_requested = true;
                Ok(None)
            }
        }
    }

    fn create_execution(&mut self, exec: Execution, process: Process) -> Entity {
        let entity = self.entities.create();
        debug!(%entity, name = %exec.name, "created execution");
        self.execs.insert(entity, exec);
        self.processes.insert(entity, process);
        self.exec_outputs.insert(entity, ExecutionOutput::default());
        self.text_buffers.insert(entity, TextBuffers::default());
        entity
    }

    fn destroy_execution(&mut self, entity: Entity) {
        if !self.entities.destroy(entity) {
            return;
        }
        debug!(%entity, "destroyed execution");
        self.execs.remove(&entity);
        self.processes.remove(&entity);
        self.exec_outputs.remove(&entity);
        self.gtest_execs.remove(&entity);
        self.text_buffers.remove(&entity);
        self.text_buffer_searches.remove(&entity);
        if self.selected_exec == Some(entity) {
            self.selected_exec = None;
        }
    }

    /// The execution `s`, `o` and `exec` operate on.
    fn selected_or_last_exec(&self) -> Option<Entity> {
        self.selected_exec.or_else(|| self.exec_history.front().copied())
    }

    fn write_banner(&mut self) -> io::Result<()> {
        writeln!(
            self.out(),
            "Type {GREEN}{}{RESET} to see list of all the user commands.",
            CommandKind::Help.name()
        )?;
        self.write_task_list()
    }

    fn write_task_list(&mut self) -> io::Result<()> {
        let out = self.os.out();
        writeln!(out, "{GREEN}Tasks:{RESET}")?;
        for (i, task) in self.tasks.iter().enumerate() {
            writeln!(out, "{} \"{}\"", i + 1, task.name)?;
        }
        Ok(())
    }
}
