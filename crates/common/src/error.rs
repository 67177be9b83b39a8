//! Common error types for the companion crates.

use thiserror::Error;

/// Common error type for companion operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The elevated interpreter could not be spawned or did not answer the probe.
    #[error("Elevated interpreter unavailable: {0}")]
    Unavailable(String),

    #[error("Command timed out after {deadline_ms} ms: {command}")]
    Timeout { command: String, deadline_ms: u64 },

    /// A listing that should enumerate files returned nothing.
    #[error("Listing of {path} returned no entries")]
    EmptyResult { path: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short machine-readable code for JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Unavailable(_) => "unavailable",
            Error::Timeout { .. } => "timeout",
            Error::EmptyResult { .. } => "empty_result",
            Error::Config(_) => "config",
            Error::Other(_) => "other",
        }
    }
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;
