//! Elevated privilege detection.

use crate::session::CommandRunner;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Text the probe expects the interpreter to echo back.
pub const ROOT_SENTINEL: &str = "root_test";

/// Answers "is an elevated interpreter available?" within a short deadline.
///
/// Holds no mutable state, so one probe may be shared by any number of
/// threads and called as often as the caller likes.
#[derive(Clone)]
pub struct PrivilegeProbe {
    runner: Arc<dyn CommandRunner>,
    deadline: Duration,
}

impl PrivilegeProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, deadline: Duration) -> Self {
        Self { runner, deadline }
    }

    /// Never fails: an unavailable, slow or misbehaving interpreter reads as `false`.
    pub fn check_access(&self) -> bool {
        let command = format!("echo {}", ROOT_SENTINEL);
        match self.runner.execute(&[command], self.deadline) {
            Ok(result) => {
                let echoed = result.stdout.lines().next().map(str::trim);
                let has_root = result.completed() && echoed == Some(ROOT_SENTINEL);
                debug!(
                    "Root access check result: {} (timed_out={}, first line={:?})",
                    has_root, result.timed_out, echoed
                );
                has_root
            }
            Err(e) => {
                debug!("Root access check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::session::PrivilegedSession;
    use crate::testing::{ok, ScriptedRunner};
    use std::time::Instant;

    fn probe_with(program: &str, args: &[&str]) -> PrivilegeProbe {
        let session = PrivilegedSession::new(InterpreterConfig::new(
            program,
            args.iter().map(|s| s.to_string()).collect(),
        ));
        PrivilegeProbe::new(Arc::new(session), Duration::from_secs(1))
    }

    #[test]
    fn test_probe_succeeds_with_working_interpreter() {
        assert!(probe_with("sh", &[]).check_access());
    }

    #[test]
    fn test_probe_returns_within_deadline_on_hang() {
        let probe = probe_with("sh", &["-c", "exec sleep 30"]);
        let started = Instant::now();
        assert!(!probe.check_access());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_probe_rejects_wrong_sentinel() {
        let probe = probe_with("sh", &["-c", "cat > /dev/null; echo permission denied"]);
        assert!(!probe.check_access());
    }

    #[test]
    fn test_probe_missing_interpreter() {
        assert!(!probe_with("/nonexistent/bin/su", &[]).check_access());
    }

    #[test]
    fn test_probe_issues_single_echo() {
        let runner = Arc::new(ScriptedRunner::with_root());
        let probe = PrivilegeProbe::new(runner.clone(), Duration::from_millis(50));
        assert!(probe.check_access());
        assert_eq!(runner.calls(), vec!["echo root_test".to_string()]);

        let runner = Arc::new(ScriptedRunner::new(|_| Ok(ok("root_test_suffix\n"))));
        assert!(!PrivilegeProbe::new(runner, Duration::from_millis(50)).check_access());
    }

    #[test]
    fn test_probe_concurrent_callers() {
        let probe = probe_with("sh", &[]);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let probe = probe.clone();
                std::thread::spawn(move || probe.check_access())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
