//! Package presence and privilege status.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStatus {
    pub package: String,
    pub root_available: bool,
    /// `None` when presence could not be checked.
    pub installed: Option<bool>,
    pub apk_path: Option<String>,
}

impl PackageStatus {
    pub fn render(&self) -> String {
        let installed = match self.installed {
            Some(true) => "installed",
            Some(false) => "not installed",
            None => "unknown",
        };
        let mut out = format!(
            "Package: {}\nRoot access: {}\nStatus: {}\n",
            self.package,
            if self.root_available { "available" } else { "not available" },
            installed
        );
        if let Some(path) = &self.apk_path {
            out.push_str(&format!("APK: {}\n", path));
        }
        out
    }
}
