use std::path::Path;

use simdisk_time::VirtualTime;

use crate::{FifoDiskModel, RequestId, Result, SimRequest};

/// Notifications an engine delivers back to the device layer.
///
/// Implementations are only ever handed to an engine from inside the device's critical section,
/// so every method runs with the device state already locked.
pub trait SimCallbacks {
    /// The modeled service of `request` finished at `time`.
    fn report_completion(&mut self, time: VirtualTime, request: RequestId);

    /// Invoke [`DiskSimulator::internal_event`] once the virtual clock reaches `time`.
    ///
    /// Replaces any previously scheduled wake.
    fn schedule_callback(&mut self, time: VirtualTime);

    /// Cancel the pending wake; the engine is quiescent until the next arrival.
    fn deschedule_callback(&mut self, time: VirtualTime);
}

/// A discrete-event disk timing engine.
pub trait DiskSimulator: Send {
    /// A request arrived at virtual time `now`.
    fn request_arrive(&mut self, now: VirtualTime, request: SimRequest, cb: &mut dyn SimCallbacks);

    /// A previously scheduled wake is due; process internal events up to `now`.
    fn internal_event(&mut self, now: VirtualTime, cb: &mut dyn SimCallbacks);

    /// Final bookkeeping at virtual time `now` (e.g. writing the output report).
    fn shutdown(&mut self, now: VirtualTime) -> Result<()>;
}

/// Start the default engine from a parameter file, writing its report to `output` on shutdown.
pub fn init(params: &Path, output: &Path) -> Result<Box<dyn DiskSimulator>> {
    let model = FifoDiskModel::from_files(params, output)?;
    Ok(Box::new(model))
}
