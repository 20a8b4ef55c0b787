//! Host/virtual time conversion for simulated-latency block devices.
//!
//! A disk timing engine keeps its own **virtual clock** (floating-point milliseconds since the
//! device was opened). The device layer drives that clock from a monotonic host clock so that
//! events the engine schedules internally fire at the matching real moment. [`TimeBase`] is the
//! single place where the two domains meet; everything else only sees one of them.
//!
//! Production code reads [`StdHostClock`]; unit tests can drive time deterministically with
//! [`FakeHostClock`].

mod clock;
mod timebase;

pub use clock::{FakeHostClock, HostClock, StdHostClock};
pub use timebase::{TimeBase, VirtualTime, NANOS_PER_MILLI};
