use std::path::Path;
use std::sync::{Arc, Mutex};

use simdisk_backend::{
    open_backend, BackendError, BlockBackend, IoCompletion, OpenFlags, Result as BackendResult,
};
use simdisk_sim::{DiskSimulator, IoKind, RequestId, SimRequest};
use simdisk_time::{HostClock, StdHostClock, VirtualTime};

use crate::scheduler::EventScheduler;
use crate::state::{deliver_all, Shared};
use crate::{DeviceConfig, DeviceError, DeviceStats, RequestTracker, Result};

/// One I/O operation submitted to a [`SimDisk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoOp {
    Read { offset: u64, len: usize },
    Write { offset: u64, data: Vec<u8> },
}

impl IoOp {
    pub fn kind(&self) -> IoKind {
        match self {
            IoOp::Read { .. } => IoKind::Read,
            IoOp::Write { .. } => IoKind::Write,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            IoOp::Read { offset, .. } | IoOp::Write { offset, .. } => *offset,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IoOp::Read { len, .. } => *len,
            IoOp::Write { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle {
    id: RequestId,
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

/// A block device that moves bytes through a real backend but completes requests on the
/// schedule of a simulated disk.
pub struct SimDisk {
    shared: Arc<Shared>,
    backend: Box<dyn BlockBackend>,
    scheduler: Mutex<Option<EventScheduler>>,
    config: Option<DeviceConfig>,
}

impl SimDisk {
    /// Open a device from `[disksim:]<params>:<output>:<target>` using the default engine.
    pub fn open(config: &str, flags: OpenFlags) -> Result<Self> {
        Self::open_with(config, flags, simdisk_sim::init)
    }

    /// Like [`SimDisk::open`] with a custom engine constructor, called with the params and output
    /// paths from the open string.
    pub fn open_with<F>(config: &str, flags: OpenFlags, init_engine: F) -> Result<Self>
    where
        F: FnOnce(&Path, &Path) -> simdisk_sim::Result<Box<dyn DiskSimulator>>,
    {
        let config: DeviceConfig = config.parse()?;
        let mut engine =
            init_engine(&config.params, &config.output).map_err(DeviceError::SimulatorInit)?;

        let backend = match open_backend(&config.target, flags) {
            Ok(backend) => backend,
            Err(err) => {
                if let Err(shutdown_err) = engine.shutdown(VirtualTime::ZERO) {
                    tracing::warn!("simulator shutdown after failed backend open: {shutdown_err}");
                }
                return Err(DeviceError::BackendOpen(err));
            }
        };

        let mut disk = Self::from_parts(engine, backend, Box::new(StdHostClock))?;
        tracing::info!(
            format = crate::FORMAT_NAME,
            params = %config.params.display(),
            output = %config.output.display(),
            target = %config.target,
            "opened simulated disk"
        );
        disk.config = Some(config);
        Ok(disk)
    }

    /// Wire an already initialized engine and backend together and start the scheduler.
    ///
    /// The virtual clock origin is `clock.now()` at this call.
    pub fn from_parts(
        engine: Box<dyn DiskSimulator>,
        backend: Box<dyn BlockBackend>,
        clock: Box<dyn HostClock>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared::new(engine, clock));
        let scheduler = match EventScheduler::spawn(Arc::clone(&shared)) {
            Ok(scheduler) => scheduler,
            Err(err) => {
                let now = shared.now();
                if let Err(shutdown_err) = shared.lock().shutdown_engine(now) {
                    tracing::warn!("simulator shutdown after failed start: {shutdown_err}");
                }
                if let Err(close_err) = backend.close() {
                    tracing::warn!("backend close after failed start: {close_err}");
                }
                return Err(DeviceError::Scheduler(err));
            }
        };
        Ok(Self {
            shared,
            backend,
            scheduler: Mutex::new(Some(scheduler)),
            config: None,
        })
    }

    /// The parsed open string, when opened through [`SimDisk::open`].
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    /// Current reading of the virtual clock.
    pub fn virtual_now(&self) -> VirtualTime {
        self.shared.now()
    }

    pub fn stats(&self) -> DeviceStats {
        self.shared.lock().stats
    }

    /// Requests whose callback has not fired yet.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().trackers.len()
    }

    pub fn is_in_flight(&self, handle: RequestHandle) -> bool {
        self.shared.lock().trackers.contains_key(&handle.id)
    }

    /// Issue `op`. `done` fires exactly once, after both the backend and the engine have
    /// reported the request complete, with the backend's result.
    ///
    /// Never blocks on I/O. On a closed device `done` fires immediately with
    /// [`BackendError::Closed`].
    pub fn submit(&self, op: IoOp, done: IoCompletion) -> RequestHandle {
        let now = self.shared.now();
        let mut ready = Vec::new();

        let id = {
            let mut state = self.shared.lock();
            let id = state.allocate_id();
            if state.shutdown {
                drop(state);
                done(Err(BackendError::Closed));
                return RequestHandle { id };
            }

            let request = SimRequest {
                id,
                start: now,
                kind: op.kind(),
                offset: op.offset(),
                bytes: op.len() as u64,
            };
            tracing::trace!(
                request = %id,
                kind = %request.kind,
                offset = request.offset,
                bytes = request.bytes,
                %now,
                "submit"
            );

            state
                .trackers
                .insert(id, RequestTracker::new(id, request.kind, now, done));
            state.stats.submitted += 1;

            let before = state.next_wake;
            state.with_engine(now, &mut ready, |engine, cb| {
                engine.request_arrive(now, request, cb)
            });
            if state.next_wake != before {
                self.shared.wake.notify_one();
            }
            id
        };
        deliver_all(&mut ready);

        let shared = Arc::clone(&self.shared);
        let on_backend_done: IoCompletion = Box::new(move |result| {
            let now = shared.now();
            let ready = shared.lock().backend_done(id, result, now);
            if let Some(ready) = ready {
                ready.deliver();
            }
        });
        match op {
            IoOp::Read { offset, len } => self.backend.read(offset, len, on_backend_done),
            IoOp::Write { offset, data } => self.backend.write(offset, data, on_backend_done),
        }

        RequestHandle { id }
    }

    /// Size of the backend in bytes.
    pub fn length(&self) -> BackendResult<u64> {
        self.backend.length()
    }

    /// Stop the scheduler, shut the engine down at the current virtual time and close the
    /// backend.
    ///
    /// Requests should be drained before closing; trackers still in flight keep receiving
    /// backend completions but the engine no longer reports simulated ones. Closing twice is a
    /// no-op.
    pub fn close(&self) -> Result<()> {
        let scheduler = self
            .scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(mut scheduler) = scheduler else {
            return Ok(());
        };
        scheduler.stop();

        let final_time = self.shared.now();
        let (engine_result, in_flight, stats) = {
            let mut state = self.shared.lock();
            (
                state.shutdown_engine(final_time),
                state.trackers.len(),
                state.stats,
            )
        };
        if in_flight != 0 {
            tracing::warn!(in_flight, "closing simulated disk with requests in flight");
        }
        let backend_result = self.backend.close();
        tracing::info!(
            %final_time,
            submitted = stats.submitted,
            completed = stats.completed,
            mean_lateness_ms = stats.mean_lateness_ms(),
            "closed simulated disk"
        );

        engine_result.map_err(DeviceError::SimulatorShutdown)?;
        backend_result.map_err(DeviceError::BackendClose)
    }
}

impl Drop for SimDisk {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!("error closing simulated disk on drop: {err}");
        }
    }
}

impl BlockBackend for SimDisk {
    fn read(&self, offset: u64, len: usize, done: IoCompletion) {
        self.submit(IoOp::Read { offset, len }, done);
    }

    fn write(&self, offset: u64, data: Vec<u8>, done: IoCompletion) {
        self.submit(IoOp::Write { offset, data }, done);
    }

    fn length(&self) -> BackendResult<u64> {
        SimDisk::length(self)
    }

    fn close(&self) -> BackendResult<()> {
        SimDisk::close(self).map_err(|err| match err {
            DeviceError::BackendClose(err) => err,
            other => BackendError::Io(other.to_string()),
        })
    }
}
