//! Parsers for interpreter output.
//!
//! One function per output shape, all pure, so they can be exercised
//! without spawning anything.

use dlc_report_schema::{FileKind, FileListingEntry};
use regex::Regex;
use std::sync::LazyLock;

/// `ls -l` mode column, e.g. `-rw-rw----` or `drwxrwx--x.`.
static LONG_FORMAT_MODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-bcdlps][-rwxsStT]{9}[.@+]?$").unwrap());

/// A listing with nothing on stdout at all.
pub fn is_listing_empty(output: &str) -> bool {
    output.trim().is_empty()
}

/// Parse `ls -la` (or `ls -1`) output into file entries, in listing order.
///
/// The file name is the last whitespace token of a long-format line, or the
/// token before `->` for symlinks. `total N` headers, `.`/`..` and lines
/// that are neither long-format nor a single bare name (interpreter chatter
/// on stdout) are skipped.
pub fn parse_listing(output: &str) -> Vec<FileListingEntry> {
    let mut entries = Vec::new();

    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let name = match tokens.as_slice() {
            [] => continue,
            [single] => *single,
            [first, rest @ ..] => {
                if !LONG_FORMAT_MODE.is_match(first) {
                    continue;
                }
                match rest.iter().position(|t| *t == "->") {
                    Some(0) => continue,
                    Some(pos) => rest[pos - 1],
                    None => match rest.last() {
                        Some(last) => *last,
                        None => continue,
                    },
                }
            }
        };

        if name == "." || name == ".." {
            continue;
        }
        entries.push(FileListingEntry::new(name));
    }

    entries
}

/// Names of entries of the given kind, in listing order.
pub fn files_of_kind(entries: &[FileListingEntry], kind: FileKind) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.file_name.clone())
        .collect()
}

/// Parse sqlite3 `.tables` output. The tool prints names in columns, so
/// every whitespace token is a table.
pub fn parse_table_names(output: &str) -> Vec<String> {
    output.split_whitespace().map(|s| s.to_string()).collect()
}

/// Normalize sqlite3 `.schema` output: unify line endings, trim trailing
/// whitespace per line and around the whole text.
pub fn normalize_schema(output: &str) -> String {
    output
        .replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse `pm path` output; the APK path when the package is installed.
pub fn parse_package_path(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("package:"))
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
}
