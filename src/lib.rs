//! Simulated-latency block devices.
//!
//! A [`SimDisk`] moves bytes through a real backend but completes every request on the schedule
//! of a disk timing engine. The pieces live in separate crates and are re-exported here:
//!
//! - [`time`]: host/virtual time conversion
//! - [`sim`]: timing engine contract and the reference FIFO model
//! - [`backend`]: file and in-memory backends
//! - [`device`]: the device itself

pub use simdisk_backend as backend;
pub use simdisk_device as device;
pub use simdisk_sim as sim;
pub use simdisk_time as time;

pub use simdisk_backend::{BackendError, BlockBackend, IoReply, OpenFlags};
pub use simdisk_device::{DeviceError, IoOp, SimDisk};
