//! Transcript of a backup-then-wipe run.

use dlc_common::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Ordered steps of a wipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeStepKind {
    CreateBackupDir,
    BackupPreferences,
    BackupDatabases,
    ForceStop,
    ClearData,
}

impl WipeStepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WipeStepKind::CreateBackupDir => "create_backup_dir",
            WipeStepKind::BackupPreferences => "backup_preferences",
            WipeStepKind::BackupDatabases => "backup_databases",
            WipeStepKind::ForceStop => "force_stop",
            WipeStepKind::ClearData => "clear_data",
        }
    }

    /// Steps whose success makes the backup usable.
    pub fn is_backup(&self) -> bool {
        matches!(
            self,
            WipeStepKind::CreateBackupDir
                | WipeStepKind::BackupPreferences
                | WipeStepKind::BackupDatabases
        )
    }
}

impl fmt::Display for WipeStepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded {
        output: String,
        /// Advisory stderr text, if any.
        warning: Option<String>,
    },
    Failed { reason: String },
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded { .. })
    }

    pub fn was_attempted(&self) -> bool {
        !matches!(self, StepOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeStep {
    pub kind: WipeStepKind,
    /// The command issued, or that would have been issued when skipped.
    pub command: String,
    pub outcome: StepOutcome,
}

/// Everything a caller needs to judge a wipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeTranscript {
    pub backup_path: String,
    pub steps: Vec<WipeStep>,
    /// The backup directory was created and both copies succeeded.
    pub backup_usable: bool,
    /// The destructive step ran and reported no error.
    pub overall_succeeded: bool,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
}

impl WipeTranscript {
    pub fn step(&self, kind: WipeStepKind) -> Option<&WipeStep> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// Render as the plain-text summary shown to users.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            match &step.outcome {
                StepOutcome::Succeeded { output, warning } => {
                    let _ = write!(out, "[ok] {}: {}", step.kind, step.command);
                    if !output.is_empty() {
                        let _ = write!(out, " -> {}", output);
                    }
                    out.push('\n');
                    if let Some(warning) = warning {
                        let _ = writeln!(out, "     warning: {}", warning);
                    }
                }
                StepOutcome::Failed { reason } => {
                    let _ = writeln!(out, "[failed] {}: {} ({})", step.kind, step.command, reason);
                }
                StepOutcome::Skipped { reason } => {
                    let _ = writeln!(out, "[skipped] {}: {}", step.kind, reason);
                }
            }
        }

        if self.backup_usable {
            let _ = writeln!(out, "Backup created at: {}", self.backup_path);
        } else {
            let _ = writeln!(out, "Backup at {} is incomplete or missing", self.backup_path);
        }
        if self.overall_succeeded {
            out.push_str("Data wiped successfully\n");
        } else {
            out.push_str("Data was NOT wiped\n");
        }
        out
    }
}
