//! Structured error taxonomy (spec.md §7): Transport, Filesystem, Capacity,
//! and Fatal. Parse errors never construct a `DaemonError` at all — per
//! spec.md §4.3 a malformed command word is skipped in place, not surfaced
//! as an error value. Grounded on `driver/mod.rs`'s `DriverError` enum.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("USB transport failure on {device}: {source}")]
    Transport {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem operation failed at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("profile already has the maximum of {max} modes")]
    ModeCapacityExceeded { max: usize },

    #[error("mode already has the maximum of {max} macros")]
    MacroCapacityExceeded { max: usize },

    #[error("fatal startup failure: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
