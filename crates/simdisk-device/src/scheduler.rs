use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::state::{deliver_all, Shared};

/// Background thread that advances the engine's virtual clock in step with the host clock.
///
/// The thread sleeps on the device condvar: indefinitely while the engine is quiescent, or until
/// the pending wake time otherwise. Anything that changes the wake time or shuts the device down
/// notifies the condvar, and the loop re-evaluates from scratch after every wake-up, so a wake
/// that became due (or earlier) while sleeping is never missed.
pub(crate) struct EventScheduler {
    shared: Arc<Shared>,
    join: Option<JoinHandle<()>>,
}

impl EventScheduler {
    pub(crate) fn spawn(shared: Arc<Shared>) -> std::io::Result<Self> {
        let worker = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name("simdisk-scheduler".to_string())
            .spawn(move || run(&worker))?;
        Ok(Self {
            shared,
            join: Some(join),
        })
    }

    /// Ask the loop to exit and wait for it.
    pub(crate) fn stop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();

        let Some(join) = self.join.take() else {
            return;
        };
        // An issuer callback running on the scheduler thread may close the device.
        if join.thread().id() == thread::current().id() {
            return;
        }
        if join.join().is_err() {
            tracing::warn!("scheduler thread panicked");
        }
    }
}

impl Drop for EventScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: &Shared) {
    tracing::debug!("scheduler started");
    let mut ready = Vec::new();
    let mut state = shared.lock();
    loop {
        if state.shutdown {
            break;
        }

        let now = shared.now();
        loop {
            let Some(wake) = state.next_wake.filter(|wake| *wake <= now) else {
                break;
            };
            // The engine may re-arm `next_wake` (possibly to another due time) from inside the
            // call, so it is cleared first and re-read on the next iteration.
            state.next_wake = None;
            state.stats.internal_events += 1;
            state.with_engine(now, &mut ready, |engine, cb| engine.internal_event(wake, cb));
        }

        if !ready.is_empty() {
            drop(state);
            deliver_all(&mut ready);
            state = shared.lock();
            continue;
        }

        let next_wake = state.next_wake;
        match next_wake {
            None => {
                state.stats.indefinite_waits += 1;
                tracing::trace!(%now, "scheduler idle");
                state = shared
                    .wake
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            Some(wake) => {
                let delay = shared.timebase.delay_until(wake, shared.clock.now());
                if delay.is_zero() {
                    continue;
                }
                state.stats.timed_waits += 1;
                tracing::trace!(%now, %wake, ?delay, "scheduler sleeping until next engine event");
                state = match shared.wake.wait_timeout(state, delay) {
                    Ok((guard, _)) => guard,
                    Err(poisoned) => poisoned.into_inner().0,
                };
            }
        }
    }
    drop(state);
    tracing::debug!("scheduler stopped");
}
