use crate::Result;

/// Successful outcome of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoReply {
    /// Bytes read.
    Read(Vec<u8>),
    Written,
}

/// Completion callback for [`BlockBackend::read`] and [`BlockBackend::write`].
///
/// Invoked exactly once, either on the backend's I/O thread or, when the operation is rejected
/// before it is queued (e.g. the backend is closed), on the submitting thread.
pub type IoCompletion = Box<dyn FnOnce(Result<IoReply>) + Send + 'static>;

/// Byte-addressed storage with asynchronous data transfer.
pub trait BlockBackend: Send + Sync {
    fn read(&self, offset: u64, len: usize, done: IoCompletion);

    fn write(&self, offset: u64, data: Vec<u8>, done: IoCompletion);

    /// Current size in bytes.
    fn length(&self) -> Result<u64>;

    /// Drain queued operations and release the backend. Later operations fail with
    /// [`crate::BackendError::Closed`].
    fn close(&self) -> Result<()>;
}

impl<B: BlockBackend + ?Sized> BlockBackend for Box<B> {
    fn read(&self, offset: u64, len: usize, done: IoCompletion) {
        (**self).read(offset, len, done)
    }

    fn write(&self, offset: u64, data: Vec<u8>, done: IoCompletion) {
        (**self).write(offset, data, done)
    }

    fn length(&self) -> Result<u64> {
        (**self).length()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}
