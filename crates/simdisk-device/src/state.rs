use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};

use simdisk_backend::{IoReply, Result as BackendResult};
use simdisk_sim::{DiskSimulator, RequestId, SimCallbacks};
use simdisk_time::{HostClock, TimeBase, VirtualTime};

use crate::{DeviceStats, Ready, RequestTracker};

/// Everything guarded by the device lock.
pub(crate) struct DeviceState {
    engine: Box<dyn DiskSimulator>,
    /// Virtual time at which the engine wants `internal_event`; `None` while it is quiescent.
    pub(crate) next_wake: Option<VirtualTime>,
    pub(crate) trackers: HashMap<RequestId, RequestTracker>,
    pub(crate) stats: DeviceStats,
    pub(crate) shutdown: bool,
    next_id: u64,
}

impl DeviceState {
    pub(crate) fn new(engine: Box<dyn DiskSimulator>) -> Self {
        Self {
            engine,
            next_wake: None,
            trackers: HashMap::new(),
            stats: DeviceStats::default(),
            shutdown: false,
            next_id: 0,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The only path into the engine.
    ///
    /// Engine callbacks land in the [`SimCallbacks`] handed to `f`, which borrows this (locked)
    /// state; finalized requests are appended to `ready` for delivery once the lock is dropped.
    /// `now` is the current virtual time, used for lateness accounting.
    pub(crate) fn with_engine<R>(
        &mut self,
        now: VirtualTime,
        ready: &mut Vec<Ready>,
        f: impl FnOnce(&mut dyn DiskSimulator, &mut dyn SimCallbacks) -> R,
    ) -> R {
        let DeviceState {
            engine,
            next_wake,
            trackers,
            stats,
            ..
        } = self;
        let mut cb = EngineCallbacks {
            next_wake,
            trackers,
            stats,
            ready,
            now,
        };
        f(&mut **engine, &mut cb)
    }

    /// Record the backend completion of `id`, returning the request if it is now finalized.
    pub(crate) fn backend_done(
        &mut self,
        id: RequestId,
        result: BackendResult<IoReply>,
        now: VirtualTime,
    ) -> Option<Ready> {
        if let Err(err) = &result {
            tracing::warn!(request = %id, "backend I/O failed: {err}");
        }
        let Some(tracker) = self.trackers.get_mut(&id) else {
            tracing::warn!(request = %id, "backend completion for unknown request");
            return None;
        };
        let ready = tracker.backend_done(result)?;
        finalize(&mut self.trackers, &mut self.stats, &ready, now);
        Some(ready)
    }

    pub(crate) fn shutdown_engine(&mut self, now: VirtualTime) -> simdisk_sim::Result<()> {
        self.engine.shutdown(now)
    }
}

fn finalize(
    trackers: &mut HashMap<RequestId, RequestTracker>,
    stats: &mut DeviceStats,
    ready: &Ready,
    now: VirtualTime,
) {
    trackers.remove(&ready.id);
    stats.record_completion(now.millis_since(ready.sim_time), ready.result.is_err());
}

struct EngineCallbacks<'a> {
    next_wake: &'a mut Option<VirtualTime>,
    trackers: &'a mut HashMap<RequestId, RequestTracker>,
    stats: &'a mut DeviceStats,
    ready: &'a mut Vec<Ready>,
    now: VirtualTime,
}

impl SimCallbacks for EngineCallbacks<'_> {
    fn report_completion(&mut self, time: VirtualTime, request: RequestId) {
        let Some(tracker) = self.trackers.get_mut(&request) else {
            tracing::warn!(%request, "simulated completion for unknown request");
            return;
        };
        tracing::trace!(%request, %time, "simulated completion");
        if let Some(ready) = tracker.sim_done(time) {
            finalize(self.trackers, self.stats, &ready, self.now);
            self.ready.push(ready);
        }
    }

    fn schedule_callback(&mut self, time: VirtualTime) {
        tracing::trace!(%time, "engine wake scheduled");
        *self.next_wake = Some(time);
    }

    fn deschedule_callback(&mut self, time: VirtualTime) {
        tracing::trace!(%time, "engine wake descheduled");
        *self.next_wake = None;
    }
}

/// State shared between the device handle, the scheduler thread and backend completions.
pub(crate) struct Shared {
    state: Mutex<DeviceState>,
    /// Signalled whenever `next_wake` changes or the device shuts down.
    pub(crate) wake: Condvar,
    pub(crate) timebase: TimeBase,
    pub(crate) clock: Box<dyn HostClock>,
}

impl Shared {
    pub(crate) fn new(engine: Box<dyn DiskSimulator>, clock: Box<dyn HostClock>) -> Self {
        Self {
            state: Mutex::new(DeviceState::new(engine)),
            wake: Condvar::new(),
            timebase: TimeBase::new(clock.now()),
            clock,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn now(&self) -> VirtualTime {
        self.timebase.to_virtual(self.clock.now())
    }
}

/// Deliver finalized requests. Call without holding the device lock.
pub(crate) fn deliver_all(ready: &mut Vec<Ready>) {
    for r in ready.drain(..) {
        r.deliver();
    }
}
