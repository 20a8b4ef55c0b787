use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{BackendError, BlockBackend, FileBackend, MemBackend, OpenFlags, Result};

/// Which real backend a device carries its bytes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendTarget {
    /// `raw:<path>` or a bare path.
    File(PathBuf),
    /// `mem:<bytes>`.
    Memory(u64),
}

impl FromStr for BackendTarget {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(BackendError::InvalidTarget("empty backend target".into()));
        }
        if let Some(path) = s.strip_prefix("raw:") {
            if path.is_empty() {
                return Err(BackendError::InvalidTarget(format!("{s}: missing path")));
            }
            return Ok(BackendTarget::File(PathBuf::from(path)));
        }
        if let Some(size) = s.strip_prefix("mem:") {
            let size = size.parse::<u64>().map_err(|err| {
                BackendError::InvalidTarget(format!("{s}: invalid size ({err})"))
            })?;
            return Ok(BackendTarget::Memory(size));
        }
        Ok(BackendTarget::File(PathBuf::from(s)))
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendTarget::File(path) => write!(f, "raw:{}", path.display()),
            BackendTarget::Memory(size) => write!(f, "mem:{size}"),
        }
    }
}

/// Open the backend named by `target`.
pub fn open_backend(target: &BackendTarget, flags: OpenFlags) -> Result<Box<dyn BlockBackend>> {
    let backend: Box<dyn BlockBackend> = match target {
        BackendTarget::File(path) => Box::new(FileBackend::open(path, flags)?),
        BackendTarget::Memory(size) => Box::new(MemBackend::new(*size, flags)?),
    };
    tracing::info!(%target, ?flags, "opened backend");
    Ok(backend)
}
