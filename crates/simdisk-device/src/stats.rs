/// Counters maintained by a [`crate::SimDisk`] under its state lock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceStats {
    pub submitted: u64,
    pub completed: u64,
    /// Completions delivered with a backend error.
    pub backend_errors: u64,
    /// Calls into the engine's internal event processing.
    pub internal_events: u64,
    /// Scheduler sleeps bounded by a pending engine wake.
    pub timed_waits: u64,
    /// Scheduler sleeps with no engine wake pending.
    pub indefinite_waits: u64,
    /// Sum over completions of how far past the simulated completion time the request was
    /// finalized (usually the backend finishing after the modeled disk would have).
    pub total_lateness_ms: f64,
    pub max_lateness_ms: f64,
}

impl DeviceStats {
    pub(crate) fn record_completion(&mut self, lateness_ms: f64, failed: bool) {
        self.completed += 1;
        if failed {
            self.backend_errors += 1;
        }
        self.total_lateness_ms += lateness_ms;
        if lateness_ms > self.max_lateness_ms {
            self.max_lateness_ms = lateness_ms;
        }
    }

    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.completed)
    }

    pub fn mean_lateness_ms(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            self.total_lateness_ms / self.completed as f64
        }
    }
}
