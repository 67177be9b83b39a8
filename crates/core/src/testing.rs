//! Scripted command runner for unit tests.

use crate::session::CommandRunner;
use dlc_common::Result;
use dlc_report_schema::CommandResult;
use std::sync::Mutex;
use std::time::Duration;

type Responder = Box<dyn Fn(&str) -> Result<CommandResult> + Send + Sync>;

/// Records every batch it receives and answers from a closure.
pub struct ScriptedRunner {
    calls: Mutex<Vec<String>>,
    responder: Responder,
}

impl ScriptedRunner {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<CommandResult> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Answers the root probe and fails everything else with status 127.
    pub fn with_root() -> Self {
        Self::from_rules(Vec::new())
    }

    /// First rule whose prefix matches wins; the probe always succeeds.
    pub fn from_rules(rules: Vec<(&'static str, CommandResult)>) -> Self {
        Self::new(move |command| {
            if command == "echo root_test" {
                return Ok(ok("root_test\n"));
            }
            for (prefix, result) in &rules {
                if command.starts_with(prefix) {
                    return Ok(result.clone());
                }
            }
            Ok(failed(127, "sh: command not found"))
        })
    }

    /// Every batch received so far, commands joined with `; `.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Index of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, commands: &[String], _deadline: Duration) -> Result<CommandResult> {
        let joined = commands.join("; ");
        self.calls.lock().unwrap().push(joined.clone());
        (self.responder)(&joined)
    }
}

pub fn ok(stdout: &str) -> CommandResult {
    CommandResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
        exit_observed: true,
        exit_code: Some(0),
        duration_ms: 1,
    }
}

pub fn failed(code: i32, stderr: &str) -> CommandResult {
    CommandResult {
        stdout: String::new(),
        stderr: format!("{}\n", stderr),
        timed_out: false,
        exit_observed: true,
        exit_code: Some(code),
        duration_ms: 1,
    }
}

pub fn timed_out() -> CommandResult {
    CommandResult {
        timed_out: true,
        duration_ms: 5_000,
        ..Default::default()
    }
}
