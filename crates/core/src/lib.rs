//! DeviceLock companion core: privileged command execution, data extraction
//! and the backup-then-wipe transaction.

pub mod commands;
pub mod companion;
pub mod config;
pub mod extractor;
pub mod parsers;
pub mod probe;
pub mod session;
pub mod wipe;

#[cfg(test)]
pub(crate) mod testing;

pub use companion::Companion;
pub use config::{BackupPolicy, ClearStrategy, CompanionConfig, InterpreterConfig};
pub use extractor::Extractor;
pub use probe::PrivilegeProbe;
pub use session::{CommandRunner, PrivilegedSession};
pub use wipe::WipeOrchestrator;
