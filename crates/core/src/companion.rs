//! Entry point tying configuration, the interpreter and the log sink together.

use crate::commands::DeviceLockCommands;
use crate::config::CompanionConfig;
use crate::extractor::Extractor;
use crate::parsers;
use crate::probe::PrivilegeProbe;
use crate::session::{CommandRunner, PrivilegedSession};
use crate::wipe::WipeOrchestrator;
use dlc_common::Result;
use dlc_report_schema::{ExtractionReport, LogSink, PackageStatus, WipeTranscript};
use std::sync::Arc;
use tracing::{info, warn};

/// The companion core.
///
/// Every method re-probes and re-executes from scratch; the only state kept
/// across calls is whatever the injected [`LogSink`] retains.
pub struct Companion {
    config: CompanionConfig,
    runner: Arc<dyn CommandRunner>,
    sink: Arc<dyn LogSink>,
}

impl Companion {
    /// Create a companion that runs commands through the configured interpreter.
    pub fn new(config: CompanionConfig, sink: Arc<dyn LogSink>) -> Result<Self> {
        let runner = Arc::new(PrivilegedSession::new(config.interpreter.clone()));
        Self::with_runner(config, runner, sink)
    }

    pub fn with_runner(
        config: CompanionConfig,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            runner,
            sink,
        })
    }

    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }

    pub fn probe(&self) -> PrivilegeProbe {
        PrivilegeProbe::new(Arc::clone(&self.runner), self.config.probe_timeout())
    }

    pub fn check_access(&self) -> bool {
        let has_root = self.probe().check_access();
        if has_root {
            self.sink.warning("Root access detected".to_string());
        } else {
            self.sink.info("Root access not available".to_string());
        }
        has_root
    }

    /// Whether the vendor package is installed, checked through the interpreter.
    pub fn package_status(&self) -> Result<PackageStatus> {
        let package = self.config.package.clone();
        if !self.probe().check_access() {
            return Ok(PackageStatus {
                package,
                root_available: false,
                installed: None,
                apk_path: None,
            });
        }

        let cmd = DeviceLockCommands::from_config(&self.config).package_path_cmd();
        let result = self
            .runner
            .execute(&[cmd], self.config.command_timeout())?;
        if !result.completed() {
            warn!("Package lookup did not complete: {}", result.failure_reason());
            return Ok(PackageStatus {
                package,
                root_available: true,
                installed: None,
                apk_path: None,
            });
        }

        let apk_path = parsers::parse_package_path(&result.stdout);
        info!("Package {} installed: {}", package, apk_path.is_some());
        if apk_path.is_some() {
            self.sink.info(format!("{} is installed", package));
        } else {
            self.sink.warning(format!("{} is not installed", package));
        }
        Ok(PackageStatus {
            package,
            root_available: true,
            installed: Some(apk_path.is_some()),
            apk_path,
        })
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::new(Arc::clone(&self.runner), &self.config, Arc::clone(&self.sink))
    }

    pub fn dump_shared_preferences(&self) -> Result<ExtractionReport> {
        self.sink.info("Reading shared preferences...".to_string());
        self.extractor().dump_shared_preferences()
    }

    pub fn dump_database_schemas(&self) -> Result<ExtractionReport> {
        self.sink.info("Reading databases...".to_string());
        self.extractor().dump_database_schemas()
    }

    pub fn orchestrator(&self) -> WipeOrchestrator {
        WipeOrchestrator::new(Arc::clone(&self.runner), &self.config, Arc::clone(&self.sink))
    }

    /// Back up and wipe the vendor app's data. The caller must have obtained
    /// explicit user confirmation first.
    pub fn wipe(&self) -> WipeTranscript {
        self.orchestrator().wipe()
    }
}
