use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures reported by a timing engine while starting up or shutting down.
///
/// Request-level misbehaviour of an engine is not surfaced; the device layer only sees
/// completion reports.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot load simulator parameters from {}: {reason}", path.display())]
    Params { path: PathBuf, reason: String },

    #[error("cannot write simulator output to {}: {reason}", path.display())]
    Output { path: PathBuf, reason: String },

    #[error("invalid simulator parameter: {0}")]
    Invalid(&'static str),
}
