// src/engine/scheduler.rs

//! Batches of executions and the order they run in.
//!
//! A batch is the flattened pre-task chain of a task followed by the
//! primary execution itself. Only one execution runs at a time; the first
//! failure drops whatever is left of the queue.

use std::io::{self, Write};

use tracing::{debug, info, warn};

use super::{Cdt, DebugStatus, Execution, ExecutionEvent, ExecutionState, MAX_HISTORY_LEN, Process};
use crate::entity::Entity;
use crate::gtest::GtestExecution;
use crate::os::OsApi;
use crate::output::colors::{BLUE, MAGENTA, RESET};

impl<O: OsApi> Cdt<O> {
    /// Create an execution of `task_id` as configured.
    ///
    /// Google test tasks get a parser unless a debugger will run them.
    pub(crate) fn create_task_execution(
        &mut self,
        task_id: usize,
        stream_output: bool,
        debug: DebugStatus,
    ) -> Entity {
        let task = &self.tasks[task_id];
        let mut exec = Execution::new(task.name.clone(), task.command.clone(), task_id);
        exec.is_restart = task.is_restart;
        exec.is_pinned = task.is_gtest;
        let parse_gtest = task.is_gtest && debug == DebugStatus::NotRequired;

        let entity = self.create_execution(
            exec,
            Process {
                stream_output,
                debug,
                ..Process::default()
            },
        );
        if parse_gtest {
            self.gtest_execs.insert(entity, GtestExecution::default());
        }
        entity
    }

    /// Queue the pre-tasks of `primary`'s task, then `primary`.
    pub(crate) fn schedule_batch(&mut self, primary: Entity) {
        let Some(task_id) = self.execs.get(&primary).map(|e| e.task_id) else {
            return;
        };
        for pre_task in self.pre_tasks[task_id].clone() {
            let entity = self.create_task_execution(pre_task, false, DebugStatus::NotRequired);
            self.execs_to_run.push_back(entity);
        }
        self.execs_to_run.push_back(primary);
        self.attach_debugger(primary);
        self.selected_exec = None;
        debug!(queued = self.execs_to_run.len(), "scheduled batch");
    }

    /// Wrap the command of a debug execution into the debugger and
    /// new-terminal-tab templates.
    fn attach_debugger(&mut self, entity: Entity) {
        let (Some(process), Some(exec)) = (self.processes.get_mut(&entity), self.execs.get_mut(&entity))
        else {
            return;
        };
        if process.debug != DebugStatus::Required {
            return;
        }
        let (Some(debug), Some(new_tab)) = (
            self.user_config.debug.as_ref(),
            self.user_config.execute_in_new_terminal_tab.as_ref(),
        ) else {
            return;
        };
        exec.shell_command = new_tab.apply(&debug.apply(&exec.shell_command));
        process.debug = DebugStatus::Attached;
    }

    /// Start the head of the queue unless something is already running.
    pub(crate) fn start_next_execution(&mut self) -> io::Result<()> {
        if self.running.is_some() {
            return Ok(());
        }
        let Some(entity) = self.execs_to_run.pop_front() else {
            return Ok(());
        };
        let is_primary = self.execs_to_run.is_empty();
        let now = self.os.now();
        let Some(exec) = self.execs.get_mut(&entity) else {
            return Ok(());
        };
        if exec.is_restart {
            self.destroy_execution(entity);
            return self.restart();
        }
        exec.start_time = Some(now);
        exec.state = ExecutionState::Running;
        exec.exit_code = None;
        let name = exec.name.clone();
        let command = exec.shell_command.clone();

        if is_primary {
            writeln!(self.out(), "{MAGENTA}Running \"{name}\"{RESET}")?;
        } else {
            writeln!(self.out(), "{BLUE}Running \"{name}\"...{RESET}")?;
        }
        info!(exec = %entity, task = %name, cmd = %command, "starting execution");

        self.running = Some(entity);
        if let Err(err) = self.os.start_process(entity, &command, self.events.clone()) {
            warn!(exec = %entity, cmd = %command, error = %err, "failed to start process");
            let data = format!("Failed to exec: {command}: {err}\n");
            for event in [
                ExecutionEvent::Stderr { exec: entity, data },
                ExecutionEvent::Exit { exec: entity, code: -1 },
            ] {
                if self.events.send(event).is_err() {
                    debug!(exec = %entity, "event queue closed");
                }
            }
        }
        Ok(())
    }

    /// Drop every queued execution after a failure. They never ran, so
    /// they count as failed with -1 and are not kept in the history.
    pub(crate) fn abort_remaining(&mut self) {
        while let Some(entity) = self.execs_to_run.pop_front() {
            if let Some(exec) = self.execs.get_mut(&entity) {
                exec.state = ExecutionState::Failed;
                exec.exit_code = Some(-1);
                info!(exec = %entity, task = %exec.name, exit_code = -1, "aborted execution");
            }
            self.destroy_execution(entity);
        }
    }

    /// Queue another run of a repeating execution that just succeeded,
    /// pre-tasks included.
    pub(crate) fn repeat_batch(&mut self, entity: Entity) {
        if let Some(exec) = self.execs.get_mut(&entity) {
            exec.state = ExecutionState::Running;
            exec.exit_code = None;
        }
        if let Some(process) = self.processes.get_mut(&entity) {
            process.stdout = Default::default();
            process.stderr = Default::default();
        }
        if let Some(buffers) = self.text_buffers.get_mut(&entity) {
            buffers.clear();
        }
        if let Some(output) = self.exec_outputs.get_mut(&entity) {
            *output = Default::default();
        }
        if let Some(gtest) = self.gtest_execs.get_mut(&entity) {
            *gtest = gtest.restarted();
        }
        self.text_buffer_searches.remove(&entity);

        let Some(task_id) = self.execs.get(&entity).map(|e| e.task_id) else {
            return;
        };
        for pre_task in self.pre_tasks[task_id].clone() {
            let pre = self.create_task_execution(pre_task, false, DebugStatus::NotRequired);
            self.execs_to_run.push_back(pre);
        }
        self.execs_to_run.push_back(entity);
        debug!(exec = %entity, "repeating execution");
    }

    /// Record a finished execution as the most recent one.
    pub(crate) fn push_history(&mut self, entity: Entity) {
        self.exec_history.retain(|e| *e != entity);
        self.exec_history.push_front(entity);
        self.trim_history();
    }

    /// Forget the oldest executions beyond the limit, sparing pinned and
    /// selected ones.
    fn trim_history(&mut self) {
        let mut excess = self.exec_history.len().saturating_sub(MAX_HISTORY_LEN);
        let mut i = self.exec_history.len();
        while excess > 0 && i > 0 {
            i -= 1;
            let entity = self.exec_history[i];
            let pinned = self.execs.get(&entity).is_some_and(|e| e.is_pinned);
            if pinned || self.selected_exec == Some(entity) {
                continue;
            }
            self.exec_history.remove(i);
            self.destroy_execution(entity);
            excess -= 1;
        }
    }
}
