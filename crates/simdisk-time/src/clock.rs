use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic host time.
pub trait HostClock: Send + Sync {
    fn now(&self) -> Instant;
}

impl<C: HostClock + ?Sized> HostClock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// [`HostClock`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StdHostClock;

impl HostClock for StdHostClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// `Instant` cannot be constructed from an arbitrary value, so the fake clock anchors to the real
/// instant it was created at and reports `anchor + elapsed`, where `elapsed` only moves when
/// [`FakeHostClock::advance`] is called.
#[derive(Debug)]
pub struct FakeHostClock {
    anchor: Instant,
    elapsed: Mutex<Duration>,
}

impl FakeHostClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self
            .elapsed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *elapsed = elapsed.saturating_add(by);
    }

    pub fn elapsed(&self) -> Duration {
        *self
            .elapsed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for FakeHostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for FakeHostClock {
    fn now(&self) -> Instant {
        self.anchor + self.elapsed()
    }
}
