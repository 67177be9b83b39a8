//! Companion configuration.

use dlc_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Vendor device lock package.
pub const DEFAULT_PACKAGE: &str = "com.hmdglobal.app.devicelock";

/// Elevated interpreter to spawn for every command batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl InterpreterConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Command line, for log messages.
    pub fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self::new("su", Vec::new())
    }
}

/// How the destructive wipe step clears the vendor app's data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearStrategy {
    /// `rm -f` every file in the preferences directory.
    #[default]
    RemovePreferences,
    /// `pm clear <package>`.
    PackageClear,
}

impl FromStr for ClearStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rm" | "remove-preferences" => Ok(ClearStrategy::RemovePreferences),
            "pm-clear" | "package-clear" => Ok(ClearStrategy::PackageClear),
            _ => Err(Error::Config(format!("Invalid clear strategy: {}", s))),
        }
    }
}

/// Whether the destructive step requires a complete backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupPolicy {
    /// Clear only when the backup directory and both copies succeeded.
    #[default]
    Required,
    /// Clear once the copies were attempted, provided the backup directory exists.
    BestEffort,
}

/// Companion configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub package: String,
    /// Parent of per-package data directories.
    pub data_root: String,
    /// Directory under which backups are created.
    pub backup_root: String,
    pub interpreter: InterpreterConfig,
    pub command_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    /// Pause after force-stopping the app, before clearing.
    pub settle_delay_ms: u64,
    pub clear_strategy: ClearStrategy,
    pub backup_policy: BackupPolicy,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            package: DEFAULT_PACKAGE.to_string(),
            data_root: "/data/data".to_string(),
            backup_root: "/sdcard".to_string(),
            interpreter: InterpreterConfig::default(),
            command_timeout_ms: 5_000,
            probe_timeout_ms: 1_000,
            settle_delay_ms: 1_000,
            clear_strategy: ClearStrategy::default(),
            backup_policy: BackupPolicy::default(),
        }
    }
}

impl CompanionConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CompanionConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Reject values that would produce unsafe or meaningless commands.
    pub fn validate(&self) -> Result<()> {
        if !crate::commands::is_valid_package_name(&self.package) {
            return Err(Error::Config(format!(
                "Invalid package name: {}",
                self.package
            )));
        }
        for (name, root) in [("data_root", &self.data_root), ("backup_root", &self.backup_root)] {
            if !root.starts_with('/') || !crate::commands::is_safe_path(root) {
                return Err(Error::Config(format!(
                    "{} must be a safe absolute path: {}",
                    name, root
                )));
            }
        }
        if self.interpreter.program.trim().is_empty() {
            return Err(Error::Config("Interpreter program is empty".to_string()));
        }
        if self.command_timeout_ms == 0 || self.probe_timeout_ms == 0 {
            return Err(Error::Config("Timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CompanionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interpreter.describe(), "su");
        assert_eq!(config.probe_timeout(), Duration::from_secs(1));
        assert!(config.probe_timeout() < config.command_timeout());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CompanionConfig {
            package: "com.example; reboot".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = CompanionConfig {
            backup_root: "sdcard".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CompanionConfig {
            probe_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_clear_strategy() {
        assert_eq!(ClearStrategy::from_str("rm").unwrap(), ClearStrategy::RemovePreferences);
        assert_eq!(ClearStrategy::from_str("PM-CLEAR").unwrap(), ClearStrategy::PackageClear);
        assert!(ClearStrategy::from_str("format").is_err());
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"backup_root": "/tmp/backups", "interpreter": {{"program": "sh"}}, "backup_policy": "best-effort"}}"#
        )
        .unwrap();

        let config = CompanionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.backup_root, "/tmp/backups");
        assert_eq!(config.interpreter.program, "sh");
        assert!(config.interpreter.args.is_empty());
        assert_eq!(config.backup_policy, BackupPolicy::BestEffort);
        assert_eq!(config.package, DEFAULT_PACKAGE);
    }
}
