use std::fmt;
use std::mem;

use simdisk_backend::{IoCompletion, IoReply, Result as BackendResult};
use simdisk_sim::{IoKind, RequestId};
use simdisk_time::VirtualTime;

enum TrackerState {
    Pending,
    BackendDone(BackendResult<IoReply>),
    SimDone(VirtualTime),
    Finalized,
}

impl TrackerState {
    fn name(&self) -> &'static str {
        match self {
            TrackerState::Pending => "pending",
            TrackerState::BackendDone(_) => "backend-done",
            TrackerState::SimDone(_) => "sim-done",
            TrackerState::Finalized => "finalized",
        }
    }
}

/// Join of the two completion signals of one in-flight request.
///
/// The tracker owns the issuer's callback. Whichever of [`RequestTracker::backend_done`] and
/// [`RequestTracker::sim_done`] observes the second signal moves the tracker to its terminal
/// state and gets the callback back inside a [`Ready`]; every other call returns `None`. The
/// caller must serialize calls on one tracker (the device does this with its state lock).
pub struct RequestTracker {
    id: RequestId,
    kind: IoKind,
    submitted_at: VirtualTime,
    state: TrackerState,
    callback: Option<IoCompletion>,
}

impl RequestTracker {
    pub fn new(
        id: RequestId,
        kind: IoKind,
        submitted_at: VirtualTime,
        callback: IoCompletion,
    ) -> Self {
        Self {
            id,
            kind,
            submitted_at,
            state: TrackerState::Pending,
            callback: Some(callback),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> IoKind {
        self.kind
    }

    pub fn submitted_at(&self) -> VirtualTime {
        self.submitted_at
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, TrackerState::Finalized)
    }

    /// The real I/O finished with `result`.
    pub fn backend_done(&mut self, result: BackendResult<IoReply>) -> Option<Ready> {
        match mem::replace(&mut self.state, TrackerState::Finalized) {
            TrackerState::Pending => {
                self.state = TrackerState::BackendDone(result);
                None
            }
            TrackerState::SimDone(sim_time) => self.finalize(result, sim_time),
            other => {
                tracing::warn!(
                    request = %self.id,
                    state = other.name(),
                    "ignoring repeated backend completion"
                );
                self.state = other;
                None
            }
        }
    }

    /// The engine reported the modeled completion at `sim_time`.
    pub fn sim_done(&mut self, sim_time: VirtualTime) -> Option<Ready> {
        match mem::replace(&mut self.state, TrackerState::Finalized) {
            TrackerState::Pending => {
                self.state = TrackerState::SimDone(sim_time);
                None
            }
            TrackerState::BackendDone(result) => self.finalize(result, sim_time),
            other => {
                tracing::warn!(
                    request = %self.id,
                    state = other.name(),
                    "ignoring repeated simulated completion"
                );
                self.state = other;
                None
            }
        }
    }

    fn finalize(&mut self, result: BackendResult<IoReply>, sim_time: VirtualTime) -> Option<Ready> {
        debug_assert!(self.is_finalized());
        let callback = self.callback.take()?;
        Some(Ready {
            id: self.id,
            kind: self.kind,
            sim_time,
            result,
            callback,
        })
    }
}

impl fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTracker")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("submitted_at", &self.submitted_at)
            .field("state", &self.state.name())
            .finish()
    }
}

/// A finalized request whose callback has not been invoked yet.
pub struct Ready {
    pub id: RequestId,
    pub kind: IoKind,
    /// Completion time reported by the engine.
    pub sim_time: VirtualTime,
    pub result: BackendResult<IoReply>,
    callback: IoCompletion,
}

impl Ready {
    /// Invoke the issuer's callback. Must not be called while holding the device lock.
    pub fn deliver(self) {
        tracing::trace!(
            request = %self.id,
            kind = %self.kind,
            ok = self.result.is_ok(),
            "delivering completion"
        );
        (self.callback)(self.result);
    }
}

impl fmt::Debug for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ready")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("sim_time", &self.sim_time)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use simdisk_backend::BackendError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<BackendResult<IoReply>>>>;

    fn tracker(calls: &Arc<AtomicUsize>, seen: &Seen) -> RequestTracker {
        let calls = Arc::clone(calls);
        let seen = Arc::clone(seen);
        RequestTracker::new(
            RequestId(1),
            IoKind::Read,
            VirtualTime::ZERO,
            Box::new(move |res| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(res);
            }),
        )
    }

    #[test]
    fn backend_then_sim_finalizes_on_sim() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut t = tracker(&calls, &seen);

        assert!(t.backend_done(Ok(IoReply::Read(vec![1, 2]))).is_none());
        assert!(!t.is_finalized());
        let ready = t.sim_done(VirtualTime::from_millis(4.0)).expect("second signal finalizes");
        assert!(t.is_finalized());
        assert_eq!(ready.sim_time, VirtualTime::from_millis(4.0));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        ready.deliver();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), vec![Ok(IoReply::Read(vec![1, 2]))]);
    }

    #[test]
    fn sim_then_backend_finalizes_on_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut t = tracker(&calls, &seen);

        assert!(t.sim_done(VirtualTime::from_millis(1.0)).is_none());
        let ready = t.backend_done(Err(BackendError::Io("EIO".into()))).unwrap();
        ready.deliver();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Err(BackendError::Io("EIO".into()))]
        );
    }

    #[test]
    fn repeated_signals_are_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut t = tracker(&calls, &seen);

        assert!(t.sim_done(VirtualTime::from_millis(1.0)).is_none());
        assert!(t.sim_done(VirtualTime::from_millis(2.0)).is_none());
        let ready = t.backend_done(Ok(IoReply::Written)).unwrap();
        // Simulated time from the first report is kept.
        assert_eq!(ready.sim_time, VirtualTime::from_millis(1.0));
        ready.deliver();

        assert!(t.backend_done(Ok(IoReply::Written)).is_none());
        assert!(t.sim_done(VirtualTime::from_millis(3.0)).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug, Clone, Copy)]
    enum Signal {
        Backend,
        Sim,
    }

    proptest! {
        #[test]
        fn any_signal_sequence_fires_at_most_once_and_only_after_both(
            signals in prop::collection::vec(
                prop_oneof![Just(Signal::Backend), Just(Signal::Sim)],
                0..8
            )
        ) {
            let calls = Arc::new(AtomicUsize::new(0));
            let seen = Arc::new(Mutex::new(Vec::new()));
            let mut t = tracker(&calls, &seen);

            let mut got_backend = false;
            let mut got_sim = false;
            let mut ready_count = 0;
            for s in signals {
                let ready = match s {
                    Signal::Backend => { got_backend = true; t.backend_done(Ok(IoReply::Written)) }
                    Signal::Sim => { got_sim = true; t.sim_done(VirtualTime::ZERO) }
                };
                if let Some(ready) = ready {
                    prop_assert!(got_backend && got_sim, "finalized before both signals");
                    ready_count += 1;
                    ready.deliver();
                }
            }
            prop_assert!(ready_count <= 1);
            prop_assert_eq!(ready_count == 1, got_backend && got_sim);
            prop_assert_eq!(calls.load(Ordering::SeqCst), ready_count);
        }
    }
}
