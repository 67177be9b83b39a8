//! Entries parsed from a long-format directory listing.

use serde::{Deserialize, Serialize};

/// Extension class of a listed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Shared-preferences XML file (`.xml`).
    Preferences,
    /// SQLite database (`.db`).
    Database,
    Other,
}

impl FileKind {
    /// Classify a file name by its suffix.
    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(".xml") {
            FileKind::Preferences
        } else if name.ends_with(".db") {
            FileKind::Database
        } else {
            FileKind::Other
        }
    }
}

/// One file line of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListingEntry {
    pub file_name: String,
    pub kind: FileKind,
}

impl FileListingEntry {
    pub fn new(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let kind = FileKind::from_file_name(&file_name);
        Self { file_name, kind }
    }
}
