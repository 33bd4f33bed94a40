// src/engine/restart.rs

use std::io::{self, Write};

use tracing::{info, warn};

use super::{Cdt, LAST_COMMAND_ENV_VAR};
use crate::commands::UserCommand;
use crate::os::OsApi;
use crate::output::colors::{MAGENTA, RED, RESET};

impl<O: OsApi> Cdt<O> {
    /// Replace this process with a fresh copy of the program, handing it
    /// the last user command.
    ///
    /// Only returns if the replacement failed; the prompt then keeps going.
    pub(crate) fn restart(&mut self) -> io::Result<()> {
        writeln!(self.out(), "{MAGENTA}Restarting program...{RESET}")?;
        let last_command = self.last_usr_cmd.to_string();
        info!(
            exe = %self.executable.display(),
            cmd = %last_command,
            "restarting"
        );
        let args = [self.tasks_config_path.clone().into_os_string()];
        if let Err(err) = self.os.exec(
            &self.executable,
            &args,
            (LAST_COMMAND_ENV_VAR, last_command.as_str()),
        ) {
            warn!(error = %err, "restart failed");
            writeln!(self.out(), "{RED}Failed to restart: {err}{RESET}")?;
        }
        Ok(())
    }

    /// Pick up the command handed over by [`Cdt::restart`].
    ///
    /// It becomes the previous command, so an empty line runs it again.
    pub(crate) fn restore_last_command(&mut self) {
        let Some(text) = self.os.get_env(LAST_COMMAND_ENV_VAR) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        let mut cmd = UserCommand::parse(&text);
        cmd.executed = true;
        info!(cmd = %cmd, "restored last command");
        self.last_usr_cmd = cmd;
    }
}
