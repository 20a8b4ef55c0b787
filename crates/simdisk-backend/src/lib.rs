//! Real storage backends that carry the bytes underneath a simulated-latency device.
//!
//! Every backend implements [`BlockBackend`]: byte-addressed, asynchronous reads and writes whose
//! completion is delivered through a callback on the backend's own I/O thread, plus synchronous
//! `length`/`close`. The timing layer in `simdisk-device` implements the same trait, so it can be
//! stacked transparently on top of any backend here.
//!
//! Backends are selected by a target string (see [`BackendTarget`]):
//!
//! - `raw:<path>` or a bare path: [`FileBackend`]
//! - `mem:<bytes>`: [`MemBackend`]

mod backend;
mod error;
mod file;
mod flags;
mod mem;
mod target;
mod worker;

pub use backend::{BlockBackend, IoCompletion, IoReply};
pub use error::{BackendError, Result};
pub use file::FileBackend;
pub use flags::OpenFlags;
pub use mem::MemBackend;
pub use target::{open_backend, BackendTarget};
