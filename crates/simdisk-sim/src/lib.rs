//! Disk timing engine contract used by `simdisk-device`.
//!
//! The device layer treats the timing engine as a black box. It feeds request arrivals in and
//! gets three kinds of notification back through [`SimCallbacks`]:
//!
//! - [`SimCallbacks::report_completion`]: the modeled service of a request finished
//! - [`SimCallbacks::schedule_callback`]: call [`DiskSimulator::internal_event`] again at a time
//! - [`SimCallbacks::deschedule_callback`]: no internal event is pending any more
//!
//! [`FifoDiskModel`] is a small reference engine (single spindle, first-come first-served) driven
//! by a JSON parameter file. It exists so the device layer can run without an external engine.

mod engine;
mod error;
mod fifo;
mod request;

pub use engine::{init, DiskSimulator, SimCallbacks};
pub use error::{EngineError, Result};
pub use fifo::{FifoDiskModel, FifoParams, FifoReport};
pub use request::{IoKind, RequestId, SimRequest};
