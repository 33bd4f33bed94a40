// src/engine/runtime.rs

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{Cdt, CdtSettings, EventReceiver, EventSender, ExecutionEvent, PromptInput};
use crate::config::load_and_validate;
use crate::config::user::{USER_CONFIG_FILE_NAME, UserConfig, load_user_config, user_config_path};
use crate::errors::Result;
use crate::os::OsApi;
use crate::output::colors::{GREEN, RED, RESET};

/// Drives [`Cdt`]: reads user commands while idle and consumes execution
/// events while something runs.
pub struct Runtime<O: OsApi> {
    cdt: Cdt<O>,
}

impl<O: OsApi> fmt::Debug for Runtime<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("running", &self.cdt.running)
            .field("queued", &self.cdt.execs_to_run.len())
            .field("history", &self.cdt.exec_history.len())
            .finish_non_exhaustive()
    }
}

impl<O: OsApi> Runtime<O> {
    pub fn new(cdt: Cdt<O>) -> Self {
        Self { cdt }
    }

    /// Load both configs, move into the task config's directory and print
    /// the startup banner.
    ///
    /// Problems with the user config are printed as warnings. An invalid
    /// task config is an error and nothing is printed.
    pub fn init(
        mut os: O,
        tasks_config: &Path,
        events: EventSender,
        event_rx: EventReceiver,
    ) -> Result<Self> {
        let user_config = load_user_config_or_warn(&mut os)?;

        let tasks_config_path = if tasks_config.is_absolute() {
            tasks_config.to_path_buf()
        } else {
            os.current_dir()?.join(tasks_config)
        };
        let tasks = load_and_validate(&tasks_config_path)?;
        info!(
            path = %tasks_config_path.display(),
            tasks = tasks.tasks.len(),
            "tasks config loaded"
        );
        if let Some(dir) = tasks_config_path.parent() {
            os.set_current_dir(dir)?;
        }
        let executable = os.current_exe()?;

        let mut cdt = Cdt::new(
            os,
            CdtSettings {
                tasks,
                user_config,
                tasks_config_path,
                executable,
            },
            events,
            event_rx,
        );
        cdt.restore_last_command();
        cdt.write_banner()?;
        Ok(Self::new(cdt))
    }

    pub fn cdt(&self) -> &Cdt<O> {
        &self.cdt
    }

    /// Main loop. Returns when input ends or Ctrl-C is pressed while
    /// nothing runs.
    pub async fn run(&mut self) -> Result<()> {
        info!("cdt runtime started");
        loop {
            self.drive_executions().await?;
            let Some(line) = self.next_input().await? else {
                break;
            };
            self.cdt.handle_input(&line).await?;
            if self.cdt.exit_requested {
                break;
            }
        }
        info!("runtime exiting");
        Ok(())
    }

    /// Run queued executions one after another until the queue is empty.
    async fn drive_executions(&mut self) -> Result<()> {
        loop {
            self.cdt.start_next_execution()?;
            if self.cdt.running.is_none() {
                if self.cdt.execs_to_run.is_empty() {
                    return Ok(());
                }
                continue;
            }
            let Some(event) = self.cdt.event_rx.recv().await else {
                warn!("event queue closed while an execution was running");
                return Ok(());
            };
            self.cdt.handle_event(event)?;
        }
    }

    /// Prompt and wait for a line. `None` means the program should exit.
    async fn next_input(&mut self) -> Result<Option<String>> {
        let out = self.cdt.os.out();
        write!(out, "{GREEN}(cdt) {RESET}")?;
        out.flush()?;
        match self.cdt.wait_for_input().await? {
            PromptInput::Line(line) => Ok(Some(line)),
            PromptInput::EndOfInput => Ok(None),
            PromptInput::Interrupted => {
                info!("interrupted with nothing running; exiting");
                Ok(None)
            }
        }
    }
}

/// Turn every Ctrl-C into an [`ExecutionEvent::Interrupt`].
pub fn spawn_interrupt_listener(events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            if events.send(ExecutionEvent::Interrupt).is_err() {
                return;
            }
        }
    })
}

fn load_user_config_or_warn<O: OsApi>(os: &mut O) -> Result<UserConfig> {
    let Some(home) = os.home_dir() else {
        warn!("home directory is unknown; user config disabled");
        return Ok(UserConfig::empty(PathBuf::from(USER_CONFIG_FILE_NAME)));
    };
    let path = user_config_path(&home);
    let (config, warnings) = match load_user_config(&path) {
        Ok(loaded) => loaded,
        Err(e) => (
            UserConfig::empty(&path),
            vec![format!("Failed to read {}: {e}", path.display())],
        ),
    };
    let out = os.out();
    for warning in warnings {
        writeln!(out, "{RED}{warning}{RESET}")?;
    }
    Ok(config)
}
