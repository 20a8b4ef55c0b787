use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors raised by storage backends.
///
/// [`BackendError::Io`] stores the rendered `std::io::Error` rather than the error itself so the
/// type stays `Clone` and can be handed to completion callbacks unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("out of bounds: offset={offset} len={len} capacity={capacity}")]
    OutOfBounds {
        offset: u64,
        len: usize,
        capacity: u64,
    },

    #[error("integer overflow while computing byte offsets")]
    OffsetOverflow,

    #[error("backend is read-only")]
    ReadOnly,

    #[error("backend is closed")]
    Closed,

    #[error("invalid backend target: {0}")]
    InvalidTarget(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

pub(crate) fn checked_range(offset: u64, len: usize, capacity: u64) -> Result<()> {
    let end = offset
        .checked_add(len as u64)
        .ok_or(BackendError::OffsetOverflow)?;
    if end > capacity {
        return Err(BackendError::OutOfBounds {
            offset,
            len,
            capacity,
        });
    }
    Ok(())
}
