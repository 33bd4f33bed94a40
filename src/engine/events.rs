// src/engine/events.rs

//! Consumption of [`ExecutionEvent`]s: output lines, google test parsing,
//! result reporting and what happens after an execution finishes.

use std::io::{self, Write};

use tracing::{debug, info};

use super::{Cdt, DebugStatus, ExecutionEvent, ExecutionState};
use crate::commands::CommandKind;
use crate::entity::Entity;
use crate::gtest::report::{test_output_lines, write_failed_tests, write_progress};
use crate::gtest::{GtestVerdict, ParsedLine};
use crate::os::OsApi;
use crate::output::colors::{CLEAR_LINE, GREEN, MAGENTA, RED, RESET};
use crate::output::{ExecutionOutput, TextBufferType};

impl<O: OsApi> Cdt<O> {
    pub(crate) fn handle_event(&mut self, event: ExecutionEvent) -> io::Result<()> {
        match event {
            ExecutionEvent::Interrupt => {
                self.interrupt();
                Ok(())
            }
            ExecutionEvent::Stdout { exec, data } => self.handle_output(exec, &data, true),
            ExecutionEvent::Stderr { exec, data } => self.handle_output(exec, &data, false),
            ExecutionEvent::Exit { exec, code } => {
                if self.running != Some(exec) {
                    debug!(%exec, code, "ignoring exit of execution that is not running");
                    return Ok(());
                }
                let mut rest = Vec::new();
                if let Some(process) = self.processes.get_mut(&exec) {
                    rest.extend(process.stdout.flush());
                    rest.extend(process.stderr.flush());
                }
                self.append_process_lines(exec, rest)?;
                self.finish_execution(exec, code)
            }
        }
    }

    /// Kill the running execution. Its exit arrives as a regular event.
    fn interrupt(&mut self) {
        match self.running {
            Some(entity) => {
                info!(exec = %entity, "interrupting execution");
                self.interrupted = true;
                self.os.kill_process(entity);
            }
            None => debug!("interrupt with nothing running"),
        }
    }

    fn handle_output(&mut self, exec: Entity, data: &str, is_stdout: bool) -> io::Result<()> {
        if self.running != Some(exec) {
            debug!(%exec, "ignoring output of execution that is not running");
            return Ok(());
        }
        let Some(process) = self.processes.get_mut(&exec) else {
            return Ok(());
        };
        let lines = if is_stdout {
            process.stdout.push(data)
        } else {
            process.stderr.push(data)
        };
        self.append_process_lines(exec, lines)
    }

    fn append_process_lines(&mut self, entity: Entity, lines: Vec<String>) -> io::Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let Some(buffers) = self.text_buffers.get_mut(&entity) else {
            return Ok(());
        };
        buffers.get_mut(TextBufferType::Process).extend(lines.iter().cloned());

        if self.gtest_execs.contains_key(&entity) {
            self.parse_gtest_output(entity)?;
        } else {
            buffers.get_mut(TextBufferType::Output).extend(lines);
        }

        if self.processes.get(&entity).is_some_and(|p| p.stream_output) {
            self.process_output(entity, true)?;
        }
        Ok(())
    }

    /// Feed unparsed process lines to the google test parser.
    fn parse_gtest_output(&mut self, entity: Entity) -> io::Result<()> {
        let stream = self.processes.get(&entity).is_some_and(|p| p.stream_output);
        let (Some(gtest), Some(buffers)) = (
            self.gtest_execs.get_mut(&entity),
            self.text_buffers.get_mut(&entity),
        ) else {
            return Ok(());
        };
        while gtest.accepts_output() && gtest.lines_parsed < buffers.get(TextBufferType::Process).len() {
            let line = buffers.get(TextBufferType::Process)[gtest.lines_parsed].clone();
            gtest.lines_parsed += 1;
            match gtest.parse_line(&line, buffers.get_mut(TextBufferType::Gtest)) {
                ParsedLine::TestOutput if stream && gtest.rerun_of_single_test => {
                    buffers.get_mut(TextBufferType::Output).push(line);
                }
                ParsedLine::TestCompleted if stream && !gtest.rerun_of_single_test => {
                    write_progress(self.os.out(), gtest)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Scan new output lines for file links, printing them if `print`.
    pub(crate) fn process_output(&mut self, entity: Entity, print: bool) -> io::Result<()> {
        let highlight = self.user_config.open_in_editor.is_some();
        let (Some(output), Some(buffers)) = (
            self.exec_outputs.get_mut(&entity),
            self.text_buffers.get(&entity),
        ) else {
            return Ok(());
        };
        let lines = buffers.get(TextBufferType::Output);
        let out = self.os.out();
        for line in lines.iter().skip(output.lines_processed) {
            let shown = if highlight {
                output.highlight_links(line, CommandKind::Open.name())
            } else {
                line.clone()
            };
            if print {
                writeln!(out, "{shown}")?;
            }
        }
        output.lines_processed = lines.len();
        Ok(())
    }

    /// Replace the output buffer of `entity` with `lines`.
    pub(crate) fn set_output(&mut self, entity: Entity, lines: Vec<String>) {
        if let Some(buffers) = self.text_buffers.get_mut(&entity) {
            *buffers.get_mut(TextBufferType::Output) = lines;
        }
        self.exec_outputs.insert(entity, ExecutionOutput::default());
    }

    fn finish_execution(&mut self, entity: Entity, code: i32) -> io::Result<()> {
        let code = if self.interrupted { -1 } else { code };
        self.running = None;
        let Some(exec) = self.execs.get_mut(&entity) else {
            return Ok(());
        };
        exec.exit_code = Some(code);
        exec.state = if code == 0 {
            ExecutionState::Complete
        } else {
            ExecutionState::Failed
        };
        info!(exec = %entity, task = %exec.name, exit_code = code, "execution finished");

        self.report_gtest_result(entity)?;

        let Some(exec) = self.execs.get(&entity) else {
            return Ok(());
        };
        let failed = exec.state == ExecutionState::Failed;
        let repeat = !failed && exec.repeat_until_fail && !self.interrupted;
        let name = exec.name.clone();
        let (stream, debug) = self
            .processes
            .get(&entity)
            .map_or((false, DebugStatus::NotRequired), |p| (p.stream_output, p.debug));

        if stream || failed {
            self.process_output(entity, true)?;
        }
        if failed {
            writeln!(self.out(), "{RED}'{name}' failed: return code: {code}{RESET}")?;
        } else if self.execs_to_run.is_empty() {
            if debug == DebugStatus::Attached {
                writeln!(self.out(), "{MAGENTA}Debugger started{RESET}")?;
            }
            writeln!(self.out(), "{MAGENTA}'{name}' complete: return code: {code}{RESET}")?;
        }

        self.finish_gtest_execution(entity, repeat);
        if repeat {
            self.repeat_batch(entity);
        } else {
            self.push_history(entity);
            if failed {
                self.abort_remaining();
            }
        }
        if self.execs_to_run.is_empty() {
            self.interrupted = false;
        }
        Ok(())
    }

    /// Print the outcome of a full google test run.
    fn report_gtest_result(&mut self, entity: Entity) -> io::Result<()> {
        let (Some(gtest), Some(exec), Some(buffers)) = (
            self.gtest_execs.get_mut(&entity),
            self.execs.get_mut(&entity),
            self.text_buffers.get(&entity),
        ) else {
            return Ok(());
        };
        if gtest.rerun_of_single_test || gtest.is_finished() {
            return Ok(());
        }
        let stream = self.processes.get(&entity).is_some_and(|p| p.stream_output);
        let out = self.os.out();
        // Overwrite the progress line.
        write!(out, "{CLEAR_LINE}")?;

        let mut new_output = None;
        match gtest.conclude() {
            GtestVerdict::NotGtest => {
                exec.state = ExecutionState::Failed;
                let binary = &self.tasks[exec.task_id].command;
                writeln!(out, "{RED}'{binary}' is not a google test executable{RESET}")?;
                let gtest_lines = buffers.get(TextBufferType::Gtest);
                let range = gtest.before_tests.start.min(gtest_lines.len())
                    ..gtest.before_tests.end.min(gtest_lines.len());
                new_output = Some(gtest_lines[range].to_vec());
            }
            GtestVerdict::Premature => {
                exec.state = ExecutionState::Failed;
                writeln!(out, "{RED}Tests have finished prematurely{RESET}")?;
            }
            GtestVerdict::Passed if stream => {
                writeln!(
                    out,
                    "{GREEN}Successfully executed {} tests {}{RESET}",
                    gtest.tests.len(),
                    gtest.total_duration
                )?;
            }
            GtestVerdict::Passed | GtestVerdict::Failed => {}
        }

        if !gtest.failed_test_ids.is_empty() {
            write_failed_tests(out, gtest)?;
            if let [only] = gtest.failed_test_ids.as_slice() {
                let test = &gtest.tests[*only];
                new_output = Some(test_output_lines(
                    test,
                    buffers.get(TextBufferType::Gtest),
                    RED,
                ));
            }
        }
        if let Some(lines) = new_output {
            self.set_output(entity, lines);
        }
        Ok(())
    }

    fn finish_gtest_execution(&mut self, entity: Entity, repeat: bool) {
        let Some(gtest) = self.gtest_execs.get(&entity) else {
            return;
        };
        if repeat {
            return;
        }
        if gtest.rerun_of_single_test {
            self.gtest_execs.remove(&entity);
            return;
        }
        // A newer full run replaces the results older ones were kept for.
        for old in &self.exec_history {
            if self.gtest_execs.contains_key(old) {
                if let Some(exec) = self.execs.get_mut(old) {
                    exec.is_pinned = false;
                }
            }
        }
    }
}
