//! Commands issued to the elevated interpreter.
//!
//! Every shell command the core can run is built here. Paths and names
//! that come from device output are quoted before they reach the shell.

use crate::config::{ClearStrategy, CompanionConfig};

/// Command builder for one vendor package.
#[derive(Debug, Clone)]
pub struct DeviceLockCommands {
    package: String,
    data_root: String,
}

impl DeviceLockCommands {
    pub fn new(package: impl Into<String>, data_root: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            data_root: data_root.into(),
        }
    }

    pub fn from_config(config: &CompanionConfig) -> Self {
        Self::new(&config.package, &config.data_root)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Private data directory of the package.
    pub fn app_dir(&self) -> String {
        format!("{}/{}", self.data_root.trim_end_matches('/'), self.package)
    }

    pub fn shared_prefs_dir(&self) -> String {
        format!("{}/shared_prefs", self.app_dir())
    }

    pub fn databases_dir(&self) -> String {
        format!("{}/databases", self.app_dir())
    }

    pub fn list_dir_cmd(&self, dir: &str) -> String {
        format!("ls -la {}", shell_quote(dir))
    }

    /// `None` when the listed name cannot be a plain file in `dir`.
    pub fn read_file_cmd(&self, dir: &str, file_name: &str) -> Option<String> {
        if !is_safe_file_name(file_name) {
            return None;
        }
        Some(format!("cat {}", shell_quote(&format!("{}/{}", dir, file_name))))
    }

    pub fn list_tables_cmd(&self, db_file: &str) -> Option<String> {
        if !is_safe_file_name(db_file) {
            return None;
        }
        let path = format!("{}/{}", self.databases_dir(), db_file);
        Some(format!("sqlite3 {} .tables", shell_quote(&path)))
    }

    pub fn table_schema_cmd(&self, db_file: &str, table: &str) -> Option<String> {
        if !is_safe_file_name(db_file) || table.is_empty() || has_control_chars(table) {
            return None;
        }
        let path = format!("{}/{}", self.databases_dir(), db_file);
        Some(format!(
            "sqlite3 {} {}",
            shell_quote(&path),
            shell_quote(&format!(".schema {}", table))
        ))
    }

    pub fn mkdir_cmd(&self, path: &str) -> String {
        format!("mkdir -p {}", shell_quote(path))
    }

    pub fn copy_dir_cmd(&self, src: &str, dest: &str) -> String {
        format!("cp -r {} {}", shell_quote(src), shell_quote(dest))
    }

    pub fn force_stop_cmd(&self) -> String {
        format!("am force-stop {}", self.package)
    }

    pub fn clear_cmd(&self, strategy: ClearStrategy) -> String {
        match strategy {
            // The glob stays outside the quotes so the shell expands it.
            ClearStrategy::RemovePreferences => {
                format!("rm -f {}/*", shell_quote(&self.shared_prefs_dir()))
            }
            ClearStrategy::PackageClear => format!("pm clear {}", self.package),
        }
    }

    pub fn package_path_cmd(&self) -> String {
        format!("pm path {}", self.package)
    }
}

/// Quote `value` for a POSIX shell, leaving plain words untouched.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@+,=".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Validate an Android package name (`segment.segment...`).
pub fn is_valid_package_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() >= 2
        && name.len() < 256
        && segments.iter().all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Validate that a configured path is safe (no injection).
pub fn is_safe_path(path: &str) -> bool {
    !path.contains(';')
        && !path.contains('|')
        && !path.contains('&')
        && !path.contains('$')
        && !path.contains('`')
        && !path.contains("..")
        && !has_control_chars(path)
        && !path.is_empty()
        && path.len() < 1024
}

/// A single path component taken from a listing.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !has_control_chars(name)
        && name.len() < 256
}

fn has_control_chars(value: &str) -> bool {
    value.chars().any(|c| c.is_control())
}
