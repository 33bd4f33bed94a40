// src/exec/process.rs

//! Supervision of a single child process.

use std::io;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{EventSender, ExecutionEvent, LAST_COMMAND_ENV_VAR};
use crate::entity::Entity;

const READ_CHUNK_SIZE: usize = 4096;

/// Build a shell command appropriate for the platform.
pub fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

/// Spawn `command` for `exec` and supervise it on a background task.
///
/// Output is forwarded as raw chunks; one [`ExecutionEvent::Exit`] follows
/// after both pipes are drained. Sending on the returned channel kills the
/// process, which then exits with code -1.
pub fn spawn_supervised(
    exec: Entity,
    command: &str,
    events: EventSender,
) -> io::Result<oneshot::Sender<()>> {
    let mut cmd = shell_command(command);
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_remove(LAST_COMMAND_ENV_VAR)
        .kill_on_drop(true);

    let child = cmd.spawn()?;
    info!(%exec, cmd = %command, pid = ?child.id(), "started process");

    let (kill_tx, kill_rx) = oneshot::channel();
    let command = command.to_string();
    tokio::spawn(async move {
        let code = match supervise(exec, child, &events, kill_rx).await {
            Ok(code) => code,
            Err(err) => {
                error!(%exec, cmd = %command, error = %err, "process supervision error");
                -1
            }
        };
        info!(%exec, cmd = %command, exit_code = code, "process exited");
        if events.send(ExecutionEvent::Exit { exec, code }).is_err() {
            debug!(%exec, "event queue closed before exit was delivered");
        }
    });
    Ok(kill_tx)
}

async fn supervise(
    exec: Entity,
    mut child: Child,
    events: &EventSender,
    kill_rx: oneshot::Receiver<()>,
) -> Result<i32> {
    let stdout = child
        .stdout
        .take()
        .map(|s| forward_output(exec, s, events.clone(), OutputStream::Stdout));
    let stderr = child
        .stderr
        .take()
        .map(|s| forward_output(exec, s, events.clone(), OutputStream::Stderr));

    // Either the process exits on its own, or the user interrupts it.
    let code = tokio::select! {
        status = child.wait() => {
            let status = status.context("waiting for process")?;
            status.code().unwrap_or(-1)
        }
        cancel = kill_rx => match cancel {
            Ok(()) => {
                info!(%exec, "kill requested; terminating process");
                if let Err(e) = child.kill().await {
                    warn!(%exec, error = %e, "failed to kill child process");
                }
                -1
            }
            Err(_) => {
                // Nobody can kill us anymore; just wait for the exit.
                let status = child.wait().await.context("waiting for process")?;
                status.code().unwrap_or(-1)
            }
        },
    };

    for reader in [stdout, stderr].into_iter().flatten() {
        if let Err(e) = reader.await {
            warn!(%exec, error = %e, "output reader task failed");
        }
    }
    Ok(code)
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

fn forward_output<R>(
    exec: Entity,
    mut reader: R,
    events: EventSender,
    stream: OutputStream,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut pending = Vec::new();
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(%exec, ?stream, error = %e, "output pipe read failed");
                    break;
                }
            };
            let data = decode_utf8(&mut pending, &buf[..n]);
            if !data.is_empty() && events.send(stream.event(exec, data)).is_err() {
                return;
            }
        }
        if !pending.is_empty() {
            let data = String::from_utf8_lossy(&pending).into_owned();
            let _ = events.send(stream.event(exec, data));
        }
    })
}

impl OutputStream {
    fn event(self, exec: Entity, data: String) -> ExecutionEvent {
        match self {
            OutputStream::Stdout => ExecutionEvent::Stdout { exec, data },
            OutputStream::Stderr => ExecutionEvent::Stderr { exec, data },
        }
    }
}

/// Decode `bytes` following whatever `pending` held back from the previous
/// read. An incomplete sequence at the end is held back in `pending`;
/// invalid bytes become U+FFFD.
fn decode_utf8(pending: &mut Vec<u8>, bytes: &[u8]) -> String {
    pending.extend_from_slice(bytes);
    let mut decoded = String::with_capacity(pending.len());
    let mut rest: &[u8] = pending;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                decoded.push_str(valid);
                rest = &[];
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                decoded.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        decoded.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => {
                        rest = after;
                        break;
                    }
                }
            }
        }
    }
    let consumed = pending.len() - rest.len();
    pending.drain(..consumed);
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_character_is_joined_across_reads() {
        let mut pending = Vec::new();
        assert_eq!(decode_utf8(&mut pending, b"ab\xc3"), "ab");
        assert_eq!(pending, b"\xc3");
        assert_eq!(decode_utf8(&mut pending, b"\xa9\n"), "\u{e9}\n");
        assert!(pending.is_empty());
    }

    #[test]
    fn invalid_bytes_are_replaced() {
        let mut pending = Vec::new();
        assert_eq!(decode_utf8(&mut pending, b"a\xffb"), "a\u{fffd}b");
        assert!(pending.is_empty());
    }
}
