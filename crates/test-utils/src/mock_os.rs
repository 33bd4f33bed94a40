use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cdt::engine::{EventSender, ExecutionEvent};
use cdt::entity::Entity;
use cdt::os::{OsApi, ReadLine};
use cdt::output::colors::CLEAR_LINE;
use chrono::{DateTime, Local, TimeZone};

/// Scripted behaviour of one shell command.
#[derive(Debug, Clone, Default)]
pub struct ProcessExec {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: i32,
    /// Keeps running after its output until it is killed.
    pub is_long: bool,
    pub fail_to_exec: bool,
    /// Simulate Ctrl-C right after the output. Only meaningful together
    /// with `is_long`.
    pub interrupt: bool,
}

impl ProcessExec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stdout.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn stderr<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stderr.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn long(mut self) -> Self {
        self.is_long = true;
        self
    }

    pub fn fail_to_exec(mut self) -> Self {
        self.fail_to_exec = true;
        self
    }

    pub fn interrupted(mut self) -> Self {
        self.interrupt = true;
        self
    }
}

#[derive(Debug, Clone)]
pub enum Input {
    Line(String),
    /// Ctrl-C while the prompt waits for a line.
    Interrupt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: (String, String),
}

#[derive(Debug, Default)]
struct MockState {
    input: VecDeque<Input>,
    /// Runs of a command consume entries front to back; the last one
    /// repeats forever.
    processes: HashMap<String, VecDeque<ProcessExec>>,
    env: HashMap<String, String>,
    home: Option<PathBuf>,
    cwd: PathBuf,
    exec_fails: bool,

    cmds_executed: Vec<String>,
    detached: Vec<String>,
    exec_calls: Vec<ExecCall>,
    cwd_changes: Vec<PathBuf>,
    long_running: HashMap<Entity, EventSender>,
    events: Option<EventSender>,
}

#[derive(Debug, Clone, Default)]
struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// [`OsApi`] double.
///
/// Processes replay their scripted output synchronously inside
/// `start_process`, so a test is fully deterministic. Everything the
/// program did to the outside world can be inspected through a
/// [`MockHandle`] taken before the double is moved into the runtime.
#[derive(Debug, Clone, Default)]
pub struct MockOs {
    state: Arc<Mutex<MockState>>,
    out: SharedOutput,
}

/// Inspection side of a [`MockOs`].
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    out: SharedOutput,
}

impl MockOs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
            out: self.out.clone(),
        }
    }

    pub fn home(self, path: impl Into<PathBuf>) -> Self {
        self.state.lock().unwrap().home = Some(path.into());
        self
    }

    pub fn cwd(self, path: impl Into<PathBuf>) -> Self {
        self.state.lock().unwrap().cwd = path.into();
        self
    }

    pub fn env(self, name: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .env
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Script the next run of `cmd`. Unscripted commands exit with 0
    /// without output.
    pub fn process(self, cmd: &str, exec: ProcessExec) -> Self {
        self.state
            .lock()
            .unwrap()
            .processes
            .entry(cmd.to_string())
            .or_default()
            .push_back(exec);
        self
    }

    pub fn input(self, line: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .input
            .push_back(Input::Line(line.to_string()));
        self
    }

    pub fn inputs(self, lines: &[&str]) -> Self {
        lines.iter().fold(self, |os, line| os.input(line))
    }

    pub fn interrupt(self) -> Self {
        self.state.lock().unwrap().input.push_back(Input::Interrupt);
        self
    }

    pub fn fail_restart(self) -> Self {
        self.state.lock().unwrap().exec_fails = true;
        self
    }

    /// Queue used to deliver scripted Ctrl-C presses.
    pub fn set_event_sender(&self, events: EventSender) {
        self.state.lock().unwrap().events = Some(events);
    }
}

impl MockHandle {
    /// Everything printed so far, with line clearing escapes removed.
    pub fn output(&self) -> String {
        let bytes = self.out.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).replace(CLEAR_LINE, "")
    }

    pub fn clear_output(&self) {
        self.out.0.lock().unwrap().clear();
    }

    pub fn cmds_executed(&self) -> Vec<String> {
        self.state.lock().unwrap().cmds_executed.clone()
    }

    pub fn detached(&self) -> Vec<String> {
        self.state.lock().unwrap().detached.clone()
    }

    pub fn exec_calls(&self) -> Vec<ExecCall> {
        self.state.lock().unwrap().exec_calls.clone()
    }

    pub fn cwd_changes(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().cwd_changes.clone()
    }

    pub fn add_input(&self, line: &str) {
        self.state
            .lock()
            .unwrap()
            .input
            .push_back(Input::Line(line.to_string()));
    }
}

fn send(events: &EventSender, event: ExecutionEvent) {
    let _ = events.send(event);
}

impl OsApi for MockOs {
    fn out(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    fn read_line(&mut self) -> ReadLine<'_> {
        let mut state = self.state.lock().unwrap();
        let line: io::Result<Option<String>> = match state.input.pop_front() {
            Some(Input::Line(line)) => Ok(Some(line)),
            Some(Input::Interrupt) => {
                if let Some(events) = &state.events {
                    send(events, ExecutionEvent::Interrupt);
                }
                return Box::pin(std::future::pending::<io::Result<Option<String>>>());
            }
            None => Ok(None),
        };
        Box::pin(std::future::ready(line))
    }

    fn get_env(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().env.get(name).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.state.lock().unwrap().home.clone()
    }

    fn current_exe(&self) -> io::Result<PathBuf> {
        Ok(PathBuf::from("/usr/bin/cdt"))
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(self.state.lock().unwrap().cwd.clone())
    }

    fn set_current_dir(&mut self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cwd = path.to_path_buf();
        state.cwd_changes.push(path.to_path_buf());
        Ok(())
    }

    fn start_process(
        &mut self,
        exec: Entity,
        shell_command: &str,
        events: EventSender,
    ) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cmds_executed.push(shell_command.to_string());
        let process = match state.processes.get_mut(shell_command) {
            Some(runs) if runs.len() > 1 => runs.pop_front().unwrap_or_default(),
            Some(runs) => runs.front().cloned().unwrap_or_default(),
            None => ProcessExec::default(),
        };
        if process.fail_to_exec {
            return Err(io::Error::new(io::ErrorKind::NotFound, "command not found"));
        }
        for line in &process.stdout {
            send(&events, ExecutionEvent::Stdout { exec, data: format!("{line}\n") });
        }
        for line in &process.stderr {
            send(&events, ExecutionEvent::Stderr { exec, data: format!("{line}\n") });
        }
        if process.is_long {
            if process.interrupt {
                send(&events, ExecutionEvent::Interrupt);
            }
            state.long_running.insert(exec, events);
        } else {
            send(&events, ExecutionEvent::Exit { exec, code: process.exit_code });
        }
        Ok(())
    }

    fn kill_process(&mut self, exec: Entity) {
        let mut state = self.state.lock().unwrap();
        if let Some(events) = state.long_running.remove(&exec) {
            send(&events, ExecutionEvent::Exit { exec, code: -1 });
        }
    }

    fn spawn_detached(&mut self, shell_command: &str) -> io::Result<()> {
        self.state
            .lock()
            .unwrap()
            .detached
            .push(shell_command.to_string());
        Ok(())
    }

    fn exec(&mut self, program: &Path, args: &[OsString], env: (&str, &str)) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.exec_calls.push(ExecCall {
            program: program.to_path_buf(),
            args: args.to_vec(),
            env: (env.0.to_string(), env.1.to_string()),
        });
        if state.exec_fails {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "exec denied"));
        }
        Ok(())
    }

    fn now(&self) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, 1, 12, 30, 15)
            .single()
            .unwrap_or_else(Local::now)
    }
}
