// src/os/real.rs

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::{OsApi, ReadLine};
use crate::engine::EventSender;
use crate::entity::Entity;
use crate::exec::{shell_command, spawn_supervised};

/// [`OsApi`] backed by the real process, terminal and environment.
pub struct RealOs {
    stdout: io::Stdout,
    stdin: Lines<BufReader<Stdin>>,
    kill_handles: HashMap<Entity, oneshot::Sender<()>>,
}

impl RealOs {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            stdin: BufReader::new(tokio::io::stdin()).lines(),
            kill_handles: HashMap::new(),
        }
    }
}

impl Default for RealOs {
    fn default() -> Self {
        Self::new()
    }
}

impl OsApi for RealOs {
    fn out(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn read_line(&mut self) -> ReadLine<'_> {
        Box::pin(async move {
            let line = self.stdin.next_line().await?;
            Ok(line.map(|l| l.trim_end_matches('\r').to_string()))
        })
    }

    fn get_env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn current_exe(&self) -> io::Result<PathBuf> {
        std::env::current_exe()
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn set_current_dir(&mut self, path: &Path) -> io::Result<()> {
        std::env::set_current_dir(path)
    }

    fn start_process(
        &mut self,
        exec: Entity,
        shell_command: &str,
        events: EventSender,
    ) -> io::Result<()> {
        // Drop handles of processes that already exited.
        self.kill_handles.retain(|_, tx| !tx.is_closed());

        let kill_tx = spawn_supervised(exec, shell_command, events)?;
        self.kill_handles.insert(exec, kill_tx);
        Ok(())
    }

    fn kill_process(&mut self, exec: Entity) {
        match self.kill_handles.remove(&exec) {
            Some(tx) => {
                if tx.send(()).is_err() {
                    debug!(%exec, "process already exited before kill request");
                }
            }
            None => debug!(%exec, "no running process to kill"),
        }
    }

    fn spawn_detached(&mut self, command: &str) -> io::Result<()> {
        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = cmd.spawn()?;
        let command = command.to_string();
        tokio::spawn(async move {
            if let Err(e) = child.wait().await {
                warn!(cmd = %command, error = %e, "detached process wait failed");
            }
        });
        Ok(())
    }

    #[cfg(unix)]
    fn exec(&mut self, program: &Path, args: &[OsString], env: (&str, &str)) -> io::Result<()> {
        use std::os::unix::process::CommandExt;

        self.stdout.flush()?;
        let err = std::process::Command::new(program)
            .args(args)
            .env(env.0, env.1)
            .exec();
        Err(err)
    }

    #[cfg(not(unix))]
    fn exec(&mut self, _program: &Path, _args: &[OsString], _env: (&str, &str)) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "replacing the process image is only supported on unix",
        ))
    }

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
