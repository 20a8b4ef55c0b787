use simdisk_backend::BackendError;
use simdisk_sim::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Malformed device open string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing {0} in device open string")]
    MissingField(&'static str),

    #[error("invalid backend target: {0}")]
    InvalidTarget(String),
}

/// Device lifecycle failures.
///
/// Per-request I/O failures are not represented here; they reach the issuer verbatim as the
/// `Err(BackendError)` passed to its completion callback.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("simulator rejected its parameters: {0}")]
    SimulatorInit(#[source] EngineError),

    #[error("failed to open backend: {0}")]
    BackendOpen(#[source] BackendError),

    #[error("failed to start scheduler thread: {0}")]
    Scheduler(#[source] std::io::Error),

    #[error("simulator shutdown failed: {0}")]
    SimulatorShutdown(#[source] EngineError),

    #[error("failed to close backend: {0}")]
    BackendClose(#[source] BackendError),
}
