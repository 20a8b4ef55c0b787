//! Block device whose completion latency follows a simulated disk.
//!
//! [`SimDisk`] sits between an I/O issuer and a real [`simdisk_backend::BlockBackend`]. Every
//! request is sent to both the backend (which moves the bytes) and a
//! [`simdisk_sim::DiskSimulator`] (which decides when a disk of the modeled type would have
//! finished it). The issuer's callback fires exactly once, after both have reported.
//!
//! The moving parts:
//!
//! - [`RequestTracker`]: per-request join of the backend and simulated completion signals
//! - `EventScheduler`: background thread advancing the engine's virtual clock in step with the
//!   host clock, sleeping until the next internal engine event or until it is re-armed
//! - [`SimDisk`]: open/submit/close wiring around one engine, one backend and one scheduler
//!
//! ## Locking
//!
//! Each device has one mutex guarding the engine, the pending wake time, the in-flight trackers
//! and the stats. The engine is only reachable through `DeviceState::with_engine`, which needs
//! `&mut` access to the locked state, so the engine's callbacks can only ever run inside that
//! critical section. Backend completions take the same lock explicitly. Issuer callbacks are
//! invoked after the lock is released, so they may submit new requests.
//!
//! ```no_run
//! use simdisk_backend::OpenFlags;
//! use simdisk_device::{IoOp, SimDisk};
//!
//! let disk = SimDisk::open("params.json:report.json:raw:disk.img", OpenFlags::empty()).unwrap();
//! disk.submit(
//!     IoOp::Read { offset: 0, len: 4096 },
//!     Box::new(|result| println!("read finished: {:?}", result.map(|_| ()))),
//! );
//! disk.close().unwrap();
//! ```

mod config;
mod device;
mod error;
mod scheduler;
mod state;
mod stats;
mod tracker;

pub use config::{DeviceConfig, PROTOCOL_PREFIX};
pub use device::{IoOp, RequestHandle, SimDisk};
pub use error::{ConfigError, DeviceError, Result};
pub use stats::DeviceStats;
pub use tracker::{Ready, RequestTracker};

/// Name the device registers under with the host block layer.
pub const FORMAT_NAME: &str = "disksim";
