//! Extraction reports for preference and database dumps.

use dlc_common::hash::sha256_str;
use dlc_common::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Schema text for a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub schema: String,
}

/// What was read for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryContent {
    /// Verbatim file content.
    Text {
        content: String,
        /// SHA256 of `content`.
        content_hash: String,
    },
    /// One schema per table, in the order the tables were listed.
    Schema { tables: Vec<TableSchema> },
}

/// A single file in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionEntry {
    pub file_name: String,
    pub content: EntryContent,
}

impl ExtractionEntry {
    pub fn text(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let content_hash = sha256_str(&content);
        Self {
            file_name: file_name.into(),
            content: EntryContent::Text {
                content,
                content_hash,
            },
        }
    }

    pub fn schema(file_name: impl Into<String>, tables: Vec<TableSchema>) -> Self {
        Self {
            file_name: file_name.into(),
            content: EntryContent::Schema { tables },
        }
    }

    /// Text content, if this is a text entry.
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            EntryContent::Text { content, .. } => Some(content),
            EntryContent::Schema { .. } => None,
        }
    }

    /// Table schemas, if this is a database entry.
    pub fn tables(&self) -> Option<&[TableSchema]> {
        match &self.content {
            EntryContent::Schema { tables } => Some(tables),
            EntryContent::Text { .. } => None,
        }
    }
}

/// Result of dumping one directory of the vendor app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Directory that was listed.
    pub directory: String,
    /// Raw listing output.
    pub listing: String,
    /// Entries in listing order.
    pub entries: Vec<ExtractionEntry>,
    /// Files or `file/table` pairs dropped because their read failed.
    pub omitted: Vec<String>,
    pub collected_at: Timestamp,
}

impl ExtractionReport {
    pub fn new(directory: impl Into<String>, listing: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            listing: listing.into(),
            entries: Vec::new(),
            omitted: Vec::new(),
            collected_at: Timestamp::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.file_name.as_str()).collect()
    }

    /// Render as the plain-text dump shown to users.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Directory: {}", self.directory);
        let _ = writeln!(out, "{}", self.listing.trim_end());
        out.push('\n');

        if self.entries.is_empty() {
            let _ = writeln!(out, "No matching files found in {}", self.directory);
        }

        for entry in &self.entries {
            let _ = writeln!(out, "--- {} ---", entry.file_name);
            match &entry.content {
                EntryContent::Text { content, .. } => {
                    let _ = writeln!(out, "{}", content);
                }
                EntryContent::Schema { tables } => {
                    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
                    let _ = writeln!(out, "Tables: {}", names.join(" "));
                    for table in tables {
                        let _ = writeln!(out, "Schema for {}:", table.name);
                        let _ = writeln!(out, "{}", table.schema);
                    }
                }
            }
            out.push('\n');
        }

        if !self.omitted.is_empty() {
            let _ = writeln!(out, "Unreadable: {}", self.omitted.join(", "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_entry_hash() {
        let entry = ExtractionEntry::text("a.xml", "<map/>");
        assert_eq!(entry.text_content(), Some("<map/>"));
        assert!(entry.tables().is_none());
        match &entry.content {
            EntryContent::Text { content_hash, .. } => {
                assert_eq!(content_hash, &sha256_str("<map/>"))
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_render_schema_entries() {
        let mut report = ExtractionReport::new("/data/data/pkg/databases", "-rw------- 1 u u 8192 lock.db\n");
        report.entries.push(ExtractionEntry::schema(
            "lock.db",
            vec![TableSchema {
                name: "state".to_string(),
                schema: "CREATE TABLE state(id INTEGER);".to_string(),
            }],
        ));
        report.entries.push(ExtractionEntry::schema("empty.db", vec![]));

        let rendered = report.render();
        assert!(rendered.contains("--- lock.db ---\nTables: state\nSchema for state:\nCREATE TABLE state(id INTEGER);\n"));
        assert!(rendered.contains("--- empty.db ---\nTables: \n"));
        assert_eq!(report.file_names(), vec!["lock.db", "empty.db"]);
    }

    #[test]
    fn test_report_json_tags_content() {
        let mut report = ExtractionReport::new("/d", "x");
        report.entries.push(ExtractionEntry::text("a.xml", "<map/>"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["content"]["type"], "text");
        assert_eq!(json["entries"][0]["content"]["content"], "<map/>");
    }
}
