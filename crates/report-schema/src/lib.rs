//! Result types produced by the companion core.
//!
//! This crate defines what the privileged layer hands back to its callers:
//! raw command results, parsed listings, extraction reports, wipe
//! transcripts, and the activity log that front ends render.

pub mod activity;
pub mod command;
pub mod listing;
pub mod report;
pub mod status;
pub mod transcript;

pub use activity::{ActivityLog, LogEntry, LogLevel, LogSink, NullSink};
pub use command::CommandResult;
pub use listing::{FileKind, FileListingEntry};
pub use report::{EntryContent, ExtractionEntry, ExtractionReport, TableSchema};
pub use status::PackageStatus;
pub use transcript::{StepOutcome, WipeStep, WipeStepKind, WipeTranscript};
