//! Read-only dumps of the vendor app's private storage.

use crate::commands::DeviceLockCommands;
use crate::config::CompanionConfig;
use crate::parsers;
use crate::probe::PrivilegeProbe;
use crate::session::CommandRunner;
use dlc_common::{Error, Result};
use dlc_report_schema::{
    ExtractionEntry, ExtractionReport, FileKind, FileListingEntry, LogSink, TableSchema,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Turns listings and per-file reads into structured reports.
pub struct Extractor {
    runner: Arc<dyn CommandRunner>,
    probe: PrivilegeProbe,
    commands: DeviceLockCommands,
    timeout: Duration,
    sink: Arc<dyn LogSink>,
}

impl Extractor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        config: &CompanionConfig,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            probe: PrivilegeProbe::new(Arc::clone(&runner), config.probe_timeout()),
            runner,
            commands: DeviceLockCommands::from_config(config),
            timeout: config.command_timeout(),
            sink,
        }
    }

    /// Dump every `.xml` file in the preferences directory.
    ///
    /// Files whose read fails or comes back empty are left out and named in
    /// `omitted`. Only an empty or unreadable listing fails the whole dump.
    pub fn dump_shared_preferences(&self) -> Result<ExtractionReport> {
        self.require_access()?;
        let dir = self.commands.shared_prefs_dir();
        let (listing, entries) = self.list(&dir)?;
        let mut report = ExtractionReport::new(&dir, listing);

        for file_name in parsers::files_of_kind(&entries, FileKind::Preferences) {
            let Some(cmd) = self.commands.read_file_cmd(&dir, &file_name) else {
                warn!("Skipping unsafe file name: {:?}", file_name);
                report.omitted.push(file_name);
                continue;
            };

            match self.runner.execute(&[cmd], self.timeout) {
                Ok(result) if result.completed() && !result.stdout_text().is_empty() => {
                    debug!("Read {} ({} bytes)", file_name, result.stdout.len());
                    report
                        .entries
                        .push(ExtractionEntry::text(&file_name, result.stdout_text()));
                }
                Ok(result) => {
                    let reason = if result.completed() {
                        "empty content".to_string()
                    } else {
                        result.failure_reason()
                    };
                    self.omit(&mut report, file_name, &reason);
                }
                Err(e) => self.omit(&mut report, file_name, &e.to_string()),
            }
        }

        info!(
            "Dumped {} preference files from {} ({} omitted)",
            report.entries.len(),
            dir,
            report.omitted.len()
        );
        self.sink.success(format!(
            "Read {} shared preference files",
            report.entries.len()
        ));
        Ok(report)
    }

    /// Dump the schema of every table in every `.db` file.
    ///
    /// A database without tables is reported with an empty table list.
    pub fn dump_database_schemas(&self) -> Result<ExtractionReport> {
        self.require_access()?;
        let dir = self.commands.databases_dir();
        let (listing, entries) = self.list(&dir)?;
        let mut report = ExtractionReport::new(&dir, listing);

        for db_file in parsers::files_of_kind(&entries, FileKind::Database) {
            let Some(cmd) = self.commands.list_tables_cmd(&db_file) else {
                warn!("Skipping unsafe database name: {:?}", db_file);
                report.omitted.push(db_file);
                continue;
            };

            let tables = match self.runner.execute(&[cmd], self.timeout) {
                Ok(result) if result.succeeded() => parsers::parse_table_names(&result.stdout),
                Ok(result) => {
                    self.omit(&mut report, db_file, &result.failure_reason());
                    continue;
                }
                Err(e) => {
                    self.omit(&mut report, db_file, &e.to_string());
                    continue;
                }
            };

            let mut schemas = Vec::with_capacity(tables.len());
            for table in tables {
                let label = format!("{}/{}", db_file, table);
                let Some(cmd) = self.commands.table_schema_cmd(&db_file, &table) else {
                    report.omitted.push(label);
                    continue;
                };
                match self.runner.execute(&[cmd], self.timeout) {
                    Ok(result) if result.succeeded() => schemas.push(TableSchema {
                        schema: parsers::normalize_schema(&result.stdout),
                        name: table,
                    }),
                    Ok(result) => self.omit(&mut report, label, &result.failure_reason()),
                    Err(e) => self.omit(&mut report, label, &e.to_string()),
                }
            }

            debug!("Database {} has {} readable tables", db_file, schemas.len());
            report.entries.push(ExtractionEntry::schema(db_file, schemas));
        }

        info!(
            "Dumped {} databases from {} ({} omitted)",
            report.entries.len(),
            dir,
            report.omitted.len()
        );
        self.sink
            .success(format!("Read {} database schemas", report.entries.len()));
        Ok(report)
    }

    fn require_access(&self) -> Result<()> {
        if self.probe.check_access() {
            Ok(())
        } else {
            self.sink
                .error("Root access required for this operation".to_string());
            Err(Error::Unavailable(
                "root access required for this operation".to_string(),
            ))
        }
    }

    /// Run the listing for `dir`; the raw text and its parsed entries.
    fn list(&self, dir: &str) -> Result<(String, Vec<FileListingEntry>)> {
        let cmd = self.commands.list_dir_cmd(dir);
        let result = self.runner.execute(&[cmd.clone()], self.timeout)?;

        if result.timed_out {
            self.sink.error(format!("Listing {} timed out", dir));
            return Err(Error::Timeout {
                command: cmd,
                deadline_ms: self.timeout.as_millis() as u64,
            });
        }
        if parsers::is_listing_empty(&result.stdout) {
            if result.has_stderr() {
                warn!("Listing {} failed: {}", dir, result.stderr_text());
            }
            self.sink.error(format!("Could not list {}", dir));
            return Err(Error::EmptyResult {
                path: dir.to_string(),
            });
        }

        let entries = parsers::parse_listing(&result.stdout);
        Ok((result.stdout, entries))
    }

    fn omit(&self, report: &mut ExtractionReport, name: String, reason: &str) {
        warn!("Omitting {}: {}", name, reason);
        self.sink.warning(format!("Could not read {}: {}", name, reason));
        report.omitted.push(name);
    }
}
