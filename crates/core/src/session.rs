//! Elevated interpreter sessions.
//!
//! Every call spawns a fresh interpreter, feeds it the commands on stdin
//! followed by `exit`, and drains stdout and stderr until the process ends
//! or the deadline passes. Nothing is shared between calls.

use crate::config::InterpreterConfig;
use dlc_common::{Error, Result};
use dlc_report_schema::CommandResult;
use std::io::{ErrorKind, Read, Write};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long the pipe readers may keep running once the process is gone.
const READER_GRACE: Duration = Duration::from_millis(500);

/// Trait for running command batches in an elevated interpreter.
pub trait CommandRunner: Send + Sync {
    /// Run `commands` in order inside one interpreter process.
    ///
    /// Returns `Error::Unavailable` only when the interpreter cannot be
    /// started. A deadline expiry is reported through `CommandResult::timed_out`.
    fn execute(&self, commands: &[String], deadline: Duration) -> Result<CommandResult>;
}

/// Runs commands through a real interpreter process (`su` by default).
#[derive(Debug, Clone, Default)]
pub struct PrivilegedSession {
    interpreter: InterpreterConfig,
}

impl PrivilegedSession {
    pub fn new(interpreter: InterpreterConfig) -> Self {
        Self { interpreter }
    }
}

impl CommandRunner for PrivilegedSession {
    fn execute(&self, commands: &[String], deadline: Duration) -> Result<CommandResult> {
        let started = Instant::now();
        debug!(
            "Elevated exec via {}: {:?}",
            self.interpreter.describe(),
            commands
        );

        let mut command = Command::new(&self.interpreter.program);
        command
            .args(&self.interpreter.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a kill reaches every command the interpreter started.
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| {
                Error::Unavailable(format!(
                    "failed to spawn {}: {}",
                    self.interpreter.program, e
                ))
            })?;
        let mut child = ChildGuard(child);

        let (Some(stdin), Some(stdout), Some(stderr)) = (
            child.0.stdin.take(),
            child.0.stdout.take(),
            child.0.stderr.take(),
        ) else {
            return Err(Error::Unavailable(
                "interpreter pipes could not be captured".to_string(),
            ));
        };

        // The writer gets its own thread so an interpreter that never reads
        // stdin cannot block us past the deadline. Dropping stdin sends EOF.
        let script = build_script(commands);
        thread::spawn(move || {
            let mut stdin = stdin;
            if let Err(e) = stdin.write_all(script.as_bytes()).and_then(|_| stdin.flush()) {
                debug!("Interpreter stdin closed early: {}", e);
            }
        });

        let (done_tx, done_rx) = mpsc::channel();
        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        spawn_drain(stdout, Arc::clone(&stdout_buf), done_tx.clone());
        spawn_drain(stderr, Arc::clone(&stderr_buf), done_tx);

        let mut timed_out = false;
        let mut exit_observed = false;
        let mut exit_code = None;
        loop {
            match child.0.try_wait() {
                Ok(Some(status)) => {
                    exit_observed = true;
                    exit_code = status.code();
                    // Background jobs left behind would hold the pipes open.
                    kill_group(&child.0);
                    break;
                }
                Ok(None) => {
                    let elapsed = started.elapsed();
                    if elapsed >= deadline {
                        warn!(
                            "Interpreter exceeded {} ms deadline, killing it",
                            deadline.as_millis()
                        );
                        timed_out = true;
                        child.terminate();
                        break;
                    }
                    thread::sleep(POLL_INTERVAL.min(deadline - elapsed));
                }
                Err(e) => {
                    warn!("Failed to poll interpreter: {}", e);
                    child.terminate();
                    break;
                }
            }
        }

        wait_for_readers(&done_rx, 2, READER_GRACE);

        let result = CommandResult {
            stdout: snapshot(&stdout_buf),
            stderr: snapshot(&stderr_buf),
            timed_out,
            exit_observed,
            exit_code,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        if result.has_stderr() {
            debug!("Interpreter stderr: {}", result.stderr_text());
        }
        Ok(result)
    }
}

/// Kills and reaps the child, and its process group, on every exit path.
struct ChildGuard(Child);

impl ChildGuard {
    fn terminate(&mut self) {
        kill_group(&self.0);
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        match self.0.try_wait() {
            Ok(Some(_)) => kill_group(&self.0),
            _ => self.terminate(),
        }
    }
}

/// SIGKILL the process group led by `child`.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: killpg takes no pointers; the group was created for this child
    // and a group with no members left yields ESRCH.
    let ret = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if ret == 0 {
        debug!("Killed interpreter process group {}", pgid);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// Commands one per line, closed by an explicit `exit`.
fn build_script(commands: &[String]) -> String {
    let mut script = String::new();
    for command in commands {
        script.push_str(command);
        script.push('\n');
    }
    script.push_str("exit\n");
    script
}

fn spawn_drain<R>(reader: R, buffer: Arc<Mutex<Vec<u8>>>, done: Sender<()>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = reader;
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(count) => buffer
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(&chunk[..count]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = done.send(());
    });
}

fn wait_for_readers(done: &Receiver<()>, readers: usize, grace: Duration) {
    let limit = Instant::now() + grace;
    for _ in 0..readers {
        let remaining = limit.saturating_duration_since(Instant::now());
        if done.recv_timeout(remaining).is_err() {
            // A grandchild still holds a pipe open; keep what we have.
            debug!("Pipe reader did not finish within grace period");
            return;
        }
    }
}

fn snapshot(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    let bytes = buffer.lock().unwrap_or_else(|e| e.into_inner());
    String::from_utf8_lossy(&bytes).to_string()
}
