//! Error types for the vinylify pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or driving the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The whitelist source was neither a string nor a sequence of strings.
    /// Raised at setup time, before any event is processed.
    #[error("eventFilter must be a string or array: {0}")]
    InvalidArgument(String),

    /// Attaching filesystem metadata to an event failed.
    #[error("failed to stat '{path}'")]
    Stat {
        /// Path the stat was attempted on.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading file contents for an event failed.
    #[error("failed to read '{path}'")]
    Read {
        /// Path the read was attempted on.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for vinylify operations.
pub type Result<T> = std::result::Result<T, Error>;
