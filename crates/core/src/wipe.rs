//! Backup-then-wipe transaction.
//!
//! Step order is fixed: create the backup directory, copy preferences,
//! copy databases, force-stop the app, then clear its data. The clear is
//! gated by [`BackupPolicy`] and is either executed or recorded as skipped.

use crate::commands::DeviceLockCommands;
use crate::config::{BackupPolicy, ClearStrategy, CompanionConfig};
use crate::session::CommandRunner;
use dlc_common::Timestamp;
use dlc_report_schema::{CommandResult, LogSink, StepOutcome, WipeStep, WipeStepKind, WipeTranscript};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

static BACKUP_SEQ: AtomicU64 = AtomicU64::new(0);

/// A fresh backup directory path under `root`.
///
/// Names carry millisecond time, a process-wide sequence and a random suffix.
pub fn next_backup_path(root: &str) -> String {
    let seq = BACKUP_SEQ.fetch_add(1, Ordering::Relaxed);
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}/devicelock_backup_{}_{}_{}",
        root.trim_end_matches('/'),
        Timestamp::now().to_file_stamp(),
        seq,
        &id[..8]
    )
}

/// Runs the backup-then-wipe sequence.
pub struct WipeOrchestrator {
    runner: Arc<dyn CommandRunner>,
    commands: DeviceLockCommands,
    backup_root: String,
    timeout: Duration,
    settle_delay: Duration,
    strategy: ClearStrategy,
    policy: BackupPolicy,
    sink: Arc<dyn LogSink>,
}

impl WipeOrchestrator {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        config: &CompanionConfig,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            runner,
            commands: DeviceLockCommands::from_config(config),
            backup_root: config.backup_root.clone(),
            timeout: config.command_timeout(),
            settle_delay: config.settle_delay(),
            strategy: config.clear_strategy,
            policy: config.backup_policy,
            sink,
        }
    }

    /// Back up, stop and clear the vendor app. Never fails; the transcript
    /// says what happened. Confirmation is the caller's job.
    pub fn wipe(&self) -> WipeTranscript {
        let started_at = Timestamp::now();
        let backup_path = next_backup_path(&self.backup_root);
        info!(
            "Wiping {} with backup at {}",
            self.commands.package(),
            backup_path
        );
        self.sink
            .warning("Attempting to wipe registration data...".to_string());

        let mut steps = Vec::with_capacity(5);

        let mkdir = self.run_step(
            WipeStepKind::CreateBackupDir,
            self.commands.mkdir_cmd(&backup_path),
            exited_cleanly,
        );
        let backup_dir_created = mkdir.outcome.is_success();
        steps.push(mkdir);

        steps.push(self.run_step(
            WipeStepKind::BackupPreferences,
            self.commands.copy_dir_cmd(
                &self.commands.shared_prefs_dir(),
                &format!("{}/shared_prefs", backup_path),
            ),
            exited_cleanly,
        ));
        steps.push(self.run_step(
            WipeStepKind::BackupDatabases,
            self.commands.copy_dir_cmd(
                &self.commands.databases_dir(),
                &format!("{}/databases", backup_path),
            ),
            exited_cleanly,
        ));

        let backup_usable = steps
            .iter()
            .filter(|s| s.kind.is_backup())
            .all(|s| s.outcome.is_success());
        if backup_usable {
            self.sink
                .info(format!("Backup created at {}", backup_path));
        } else {
            self.sink
                .error(format!("Backup at {} is incomplete", backup_path));
        }

        let force_stop = self.run_step(
            WipeStepKind::ForceStop,
            self.commands.force_stop_cmd(),
            exited_cleanly,
        );
        if force_stop.outcome.was_attempted() && !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }
        steps.push(force_stop);

        let clear_cmd = self.commands.clear_cmd(self.strategy);
        let gate = match self.policy {
            BackupPolicy::Required if !backup_usable => {
                Some("backup incomplete; data left untouched")
            }
            BackupPolicy::BestEffort if !backup_dir_created => {
                Some("backup directory could not be created; data left untouched")
            }
            _ => None,
        };
        let clear = match gate {
            Some(reason) => {
                warn!("Skipping destructive step: {}", reason);
                WipeStep {
                    kind: WipeStepKind::ClearData,
                    command: clear_cmd,
                    outcome: StepOutcome::Skipped {
                        reason: reason.to_string(),
                    },
                }
            }
            None => match self.strategy {
                ClearStrategy::RemovePreferences => {
                    self.run_step(WipeStepKind::ClearData, clear_cmd, exited_cleanly)
                }
                ClearStrategy::PackageClear => {
                    self.run_step(WipeStepKind::ClearData, clear_cmd, package_cleared)
                }
            },
        };

        let overall_succeeded = clear.outcome.is_success();
        if overall_succeeded {
            self.sink.success(format!(
                "Registration data wiped. Backup at {}",
                backup_path
            ));
        } else {
            self.sink
                .error("Failed to wipe registration data".to_string());
        }
        steps.push(clear);

        WipeTranscript {
            backup_path,
            steps,
            backup_usable,
            overall_succeeded,
            started_at,
            completed_at: Timestamp::now(),
        }
    }

    fn run_step(
        &self,
        kind: WipeStepKind,
        command: String,
        accept: fn(&CommandResult) -> bool,
    ) -> WipeStep {
        let outcome = match self.runner.execute(&[command.clone()], self.timeout) {
            Ok(result) if accept(&result) => {
                let warning = result.has_stderr().then(|| result.stderr_text().to_string());
                if let Some(w) = &warning {
                    warn!("{} succeeded with stderr: {}", kind, w);
                }
                StepOutcome::Succeeded {
                    output: result.stdout_text().to_string(),
                    warning,
                }
            }
            Ok(result) => {
                let reason = if result.succeeded() {
                    format!("unexpected output: {}", result.stdout_text())
                } else {
                    result.failure_reason()
                };
                StepOutcome::Failed { reason }
            }
            Err(e) => StepOutcome::Failed {
                reason: e.to_string(),
            },
        };

        if let StepOutcome::Failed { reason } = &outcome {
            warn!("Wipe step {} failed: {}", kind, reason);
            self.sink.warning(format!("{} failed: {}", kind, reason));
        }
        WipeStep {
            kind,
            command,
            outcome,
        }
    }
}

fn exited_cleanly(result: &CommandResult) -> bool {
    result.succeeded()
}

/// `pm clear` prints `Success`; some builds print nothing.
fn package_cleared(result: &CommandResult) -> bool {
    let out = result.stdout_text();
    result.succeeded() && (out.is_empty() || out.contains("Success"))
}
