//! Raw result of one elevated interpreter invocation.

use serde::{Deserialize, Serialize};

/// Output captured from a single interpreter process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Everything the interpreter wrote to stdout.
    pub stdout: String,
    /// Everything the interpreter wrote to stderr.
    pub stderr: String,
    /// The deadline elapsed and the process was killed.
    pub timed_out: bool,
    /// The process exited on its own before the deadline.
    pub exit_observed: bool,
    /// Exit status of the interpreter, which is the status of the last command.
    pub exit_code: Option<i32>,
    /// Wall time spent in the call, in milliseconds.
    pub duration_ms: u64,
}

impl CommandResult {
    /// The interpreter exited by itself within the deadline.
    pub fn completed(&self) -> bool {
        self.exit_observed && !self.timed_out
    }

    /// Completed with a zero exit status.
    pub fn succeeded(&self) -> bool {
        self.completed() && self.exit_code == Some(0)
    }

    /// Stdout with surrounding whitespace removed.
    pub fn stdout_text(&self) -> &str {
        self.stdout.trim()
    }

    /// Stderr with surrounding whitespace removed.
    pub fn stderr_text(&self) -> &str {
        self.stderr.trim()
    }

    pub fn has_stderr(&self) -> bool {
        !self.stderr_text().is_empty()
    }

    /// Human-readable reason why this result is not a success.
    pub fn failure_reason(&self) -> String {
        if self.timed_out {
            return format!("timed out after {} ms", self.duration_ms);
        }
        if !self.exit_observed {
            return "interpreter exit was not observed".to_string();
        }
        let status = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        if self.has_stderr() {
            format!("exited with status {}: {}", status, self.stderr_text())
        } else {
            format!("exited with status {}", status)
        }
    }
}
