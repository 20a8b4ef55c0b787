use std::sync::{Arc, Mutex};

use crate::error::checked_range;
use crate::worker::IoWorker;
use crate::{BackendError, BlockBackend, IoCompletion, IoReply, OpenFlags, Result};

/// Fixed-size in-memory backend, zero-filled on creation.
pub struct MemBackend {
    data: Arc<Mutex<Vec<u8>>>,
    capacity: u64,
    read_only: bool,
    worker: IoWorker,
}

impl MemBackend {
    pub fn new(capacity: u64, flags: OpenFlags) -> Result<Self> {
        let len = usize::try_from(capacity).map_err(|_| BackendError::OffsetOverflow)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| BackendError::Io(format!("cannot allocate {capacity} bytes")))?;
        data.resize(len, 0);
        Self::from_vec(data, flags)
    }

    pub fn from_vec(data: Vec<u8>, flags: OpenFlags) -> Result<Self> {
        Ok(Self {
            capacity: data.len() as u64,
            data: Arc::new(Mutex::new(data)),
            read_only: flags.is_read_only(),
            worker: IoWorker::spawn("simdisk-mem-io")?,
        })
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl BlockBackend for MemBackend {
    fn read(&self, offset: u64, len: usize, done: IoCompletion) {
        let data = Arc::clone(&self.data);
        let capacity = self.capacity;
        self.worker.run(
            move || {
                checked_range(offset, len, capacity)?;
                let data = data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let start = offset as usize;
                Ok(IoReply::Read(data[start..start + len].to_vec()))
            },
            done,
        );
    }

    fn write(&self, offset: u64, buf: Vec<u8>, done: IoCompletion) {
        if self.read_only {
            done(Err(BackendError::ReadOnly));
            return;
        }
        let data = Arc::clone(&self.data);
        let capacity = self.capacity;
        self.worker.run(
            move || {
                checked_range(offset, buf.len(), capacity)?;
                let mut data = data.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let start = offset as usize;
                data[start..start + buf.len()].copy_from_slice(&buf);
                Ok(IoReply::Written)
            },
            done,
        );
    }

    fn length(&self) -> Result<u64> {
        if self.worker.is_closed() {
            return Err(BackendError::Closed);
        }
        Ok(self.capacity)
    }

    fn close(&self) -> Result<()> {
        self.worker.shutdown();
        Ok(())
    }
}
