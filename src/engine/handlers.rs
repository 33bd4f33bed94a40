// src/engine/handlers.rs

//! Handlers of the commands typed at the prompt.

use std::io::{self, Write};

use tracing::{debug, warn};

use super::{Cdt, DebugStatus, Execution, Process};
use crate::commands::{CommandKind, UserCommand, write_help};
use crate::config::UserConfigField;
use crate::entity::Entity;
use crate::gtest::report::{test_output_lines, write_all_tests, write_failed_tests};
use crate::gtest::{GTEST_FILTER_ARG, GtestExecution, gtest_shell_command};
use crate::os::OsApi;
use crate::output::colors::{GREEN, MAGENTA, RED, RESET};
use crate::output::{TextBufferSearch, TextBufferType, write_search_results};

const SELECTED_EXEC_ICON: &str = "->";

impl<O: OsApi> Cdt<O> {
    /// Handle one line typed at the prompt. An empty line repeats the
    /// previous command.
    pub(crate) async fn handle_input(&mut self, input: &str) -> io::Result<()> {
        if input.trim().is_empty() {
            self.last_usr_cmd.executed = false;
        } else {
            self.last_usr_cmd = UserCommand::parse(input);
        }
        self.execute_last_command().await
    }

    async fn execute_last_command(&mut self) -> io::Result<()> {
        if self.last_usr_cmd.executed {
            return Ok(());
        }
        self.last_usr_cmd.executed = true;
        let cmd = self.last_usr_cmd.clone();
        debug!(cmd = %cmd, "executing user command");

        let Some(kind) = CommandKind::from_name(&cmd.cmd) else {
            return write_help(self.out());
        };
        if kind.needs_debugger() && !self.debugger_configured()? {
            return Ok(());
        }
        match kind {
            CommandKind::Task => self.run_task(&cmd, false, DebugStatus::NotRequired),
            CommandKind::TaskRepeat => self.run_task(&cmd, true, DebugStatus::NotRequired),
            CommandKind::Debug => self.run_task(&cmd, false, DebugStatus::Required),
            CommandKind::SelectExecution => self.select_execution(&cmd),
            CommandKind::Open => self.open_file_link(&cmd),
            CommandKind::Search => self.search_output().await,
            CommandKind::Gtest => self.display_gtest_output(&cmd),
            CommandKind::GtestSearch => self.search_gtest_output(&cmd).await,
            CommandKind::GtestRerun => self.rerun_gtest(&cmd, false, DebugStatus::NotRequired),
            CommandKind::GtestRerunRepeat => self.rerun_gtest(&cmd, true, DebugStatus::NotRequired),
            CommandKind::GtestDebug => self.rerun_gtest(&cmd, false, DebugStatus::Required),
            CommandKind::GtestFilter => self.run_gtest_with_filter(&cmd).await,
            CommandKind::Help => write_help(self.out()),
        }
    }

    /// Report every missing template a debug run needs.
    fn debugger_configured(&mut self) -> io::Result<bool> {
        let mut configured = true;
        for field in [UserConfigField::Debug, UserConfigField::ExecuteInNewTerminalTab] {
            if self.user_config.get(field).is_none() {
                let msg = self.user_config.not_specified_message(field);
                writeln!(self.out(), "{RED}{msg}{RESET}")?;
                configured = false;
            }
        }
        Ok(configured)
    }

    fn run_task(&mut self, cmd: &UserCommand, repeat: bool, debug: DebugStatus) -> io::Result<()> {
        let Some(task_id) = cmd.index_in(self.tasks.len()) else {
            return self.write_task_list();
        };
        let entity = self.create_task_execution(task_id, true, debug);
        if let Some(exec) = self.execs.get_mut(&entity) {
            exec.repeat_until_fail = repeat;
        }
        self.schedule_batch(entity);
        Ok(())
    }

    fn select_execution(&mut self, cmd: &UserCommand) -> io::Result<()> {
        if self.exec_history.is_empty() {
            return writeln!(self.out(), "{GREEN}No task has been executed yet{RESET}");
        }
        match cmd.index_in(self.exec_history.len()) {
            None => self.write_exec_history(),
            Some(0) => {
                self.selected_exec = None;
                writeln!(self.out(), "{MAGENTA}Selected execution reset{RESET}")
            }
            Some(i) => {
                let entity = self.exec_history[i];
                self.selected_exec = Some(entity);
                let name = self.execs.get(&entity).map(|e| e.name.clone()).unwrap_or_default();
                writeln!(self.out(), "{MAGENTA}Selected execution \"{name}\"{RESET}")
            }
        }
    }

    fn write_exec_history(&mut self) -> io::Result<()> {
        let selected = self.selected_or_last_exec();
        let out = self.os.out();
        writeln!(out, "{GREEN}Execution history:{RESET}")?;
        for (i, entity) in self.exec_history.iter().enumerate().rev() {
            let Some(exec) = self.execs.get(entity) else {
                continue;
            };
            let icon = if selected == Some(*entity) {
                SELECTED_EXEC_ICON.to_string()
            } else {
                " ".repeat(SELECTED_EXEC_ICON.len())
            };
            let time = exec
                .start_time
                .map(|t| t.format("%T").to_string())
                .unwrap_or_default();
            writeln!(out, "{icon} {} {time} \"{}\"", i + 1, exec.name)?;
        }
        Ok(())
    }

    fn open_file_link(&mut self, cmd: &UserCommand) -> io::Result<()> {
        let Some(editor) = self.user_config.open_in_editor.clone() else {
            let msg = self.user_config.not_specified_message(UserConfigField::OpenInEditor);
            return writeln!(self.out(), "{RED}{msg}{RESET}");
        };
        let links = match self.selected_or_last_exec() {
            Some(entity) => {
                // Links of output that was never printed are not known yet.
                self.process_output(entity, false)?;
                self.exec_outputs
                    .get(&entity)
                    .map(|o| o.file_links.clone())
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };
        if links.is_empty() {
            return writeln!(self.out(), "{GREEN}No file links in the output{RESET}");
        }
        match cmd.index_in(links.len()) {
            Some(i) => {
                let command = editor.apply(&links[i]);
                debug!(cmd = %command, "opening file link");
                if let Err(err) = self.os.spawn_detached(&command) {
                    warn!(cmd = %command, error = %err, "failed to open file link");
                    writeln!(self.out(), "{RED}Failed to exec: {command}: {err}{RESET}")?;
                }
                Ok(())
            }
            None => {
                let out = self.os.out();
                writeln!(out, "{GREEN}File links:{RESET}")?;
                for (i, link) in links.iter().enumerate() {
                    writeln!(out, "{} {link}", i + 1)?;
                }
                Ok(())
            }
        }
    }

    async fn search_output(&mut self) -> io::Result<()> {
        let Some(entity) = self.selected_or_last_exec() else {
            return writeln!(self.out(), "{GREEN}No task has been executed yet{RESET}");
        };
        let len = self
            .text_buffers
            .get(&entity)
            .map_or(0, |b| b.get(TextBufferType::Output).len());
        self.search(entity, TextBufferSearch::new(TextBufferType::Output, 0, len))
            .await
    }

    /// Ask for a pattern and print the matching lines of `search`.
    async fn search(&mut self, entity: Entity, search: TextBufferSearch) -> io::Result<()> {
        self.text_buffer_searches.insert(entity, search);
        let Some(pattern) = self.read_input("Regular expression: ").await? else {
            return Ok(());
        };
        let Some(buffers) = self.text_buffers.get(&entity) else {
            return Ok(());
        };
        write_search_results(self.os.out(), buffers.get(search.buffer), &search, &pattern)
    }

    /// Resolve a google test index against the most recent google test
    /// run, starting from the selected execution.
    ///
    /// When the index doesn't address a test, the relevant test list is
    /// printed instead and `None` returned.
    fn find_gtest(&mut self, cmd: &UserCommand) -> io::Result<Option<(Entity, usize)>> {
        let start = self
            .selected_exec
            .and_then(|s| self.exec_history.iter().position(|e| *e == s))
            .unwrap_or(0);
        let found = self
            .exec_history
            .iter()
            .skip(start)
            .find(|e| self.gtest_execs.contains_key(*e))
            .copied();
        let Some((entity, gtest)) = found
            .and_then(|e| self.gtest_execs.get(&e).map(|g| (e, g)))
            .filter(|(_, g)| g.test_count > 0)
        else {
            writeln!(self.out(), "{GREEN}No google tests have been executed yet.{RESET}")?;
            return Ok(None);
        };

        let out = self.os.out();
        if gtest.failed_test_ids.is_empty() {
            match cmd.index_in(gtest.tests.len()) {
                Some(i) => return Ok(Some((entity, i))),
                None => write_all_tests(out, gtest)?,
            }
        } else {
            match cmd.index_in(gtest.failed_test_ids.len()) {
                Some(i) => return Ok(Some((entity, gtest.failed_test_ids[i]))),
                None => write_failed_tests(out, gtest)?,
            }
        }
        Ok(None)
    }

    fn display_gtest_output(&mut self, cmd: &UserCommand) -> io::Result<()> {
        let Some((entity, test_id)) = self.find_gtest(cmd)? else {
            return Ok(());
        };
        let (Some(gtest), Some(buffers)) = (self.gtest_execs.get(&entity), self.text_buffers.get(&entity))
        else {
            return Ok(());
        };
        let color = if gtest.failed_test_ids.is_empty() { GREEN } else { RED };
        let lines = test_output_lines(
            &gtest.tests[test_id],
            buffers.get(TextBufferType::Gtest),
            color,
        );
        self.set_output(entity, lines);
        self.process_output(entity, true)
    }

    async fn search_gtest_output(&mut self, cmd: &UserCommand) -> io::Result<()> {
        let Some((entity, test_id)) = self.find_gtest(cmd)? else {
            return Ok(());
        };
        let Some(test) = self.gtest_execs.get(&entity).map(|g| g.tests[test_id].clone()) else {
            return Ok(());
        };
        let search = TextBufferSearch::new(TextBufferType::Gtest, test.buffer_start, test.buffer_end);
        self.search(entity, search).await
    }

    fn rerun_gtest(&mut self, cmd: &UserCommand, repeat: bool, debug: DebugStatus) -> io::Result<()> {
        let Some((entity, test_id)) = self.find_gtest(cmd)? else {
            return Ok(());
        };
        let (Some(exec), Some(gtest)) = (self.execs.get(&entity), self.gtest_execs.get(&entity)) else {
            return Ok(());
        };
        let task_id = exec.task_id;
        let test_name = gtest.tests[test_id].name.clone();
        let command = gtest_shell_command(&self.tasks[task_id].command, Some(&test_name));

        let mut exec = Execution::new(test_name, command, task_id);
        exec.repeat_until_fail = repeat;
        let rerun = self.create_execution(
            exec,
            Process {
                stream_output: true,
                debug,
                ..Process::default()
            },
        );
        if debug == DebugStatus::NotRequired {
            self.gtest_execs
                .insert(rerun, GtestExecution::rerun_of_single_test());
        }
        self.schedule_batch(rerun);
        Ok(())
    }

    async fn run_gtest_with_filter(&mut self, cmd: &UserCommand) -> io::Result<()> {
        let Some(task_id) = cmd.index_in(self.tasks.len()) else {
            return self.write_task_list();
        };
        let Some(filter) = self.read_input(&format!("{GTEST_FILTER_ARG}=")).await? else {
            return Ok(());
        };
        let command = gtest_shell_command(&self.tasks[task_id].command, Some(&filter));

        let mut exec = Execution::new(filter, command, task_id);
        exec.is_pinned = true;
        let entity = self.create_execution(
            exec,
            Process {
                stream_output: true,
                ..Process::default()
            },
        );
        self.gtest_execs.insert(entity, GtestExecution::default());
        self.schedule_batch(entity);
        Ok(())
    }
}
