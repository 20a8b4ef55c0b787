use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crate::{BackendError, IoCompletion, IoReply, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Single I/O thread executing backend operations in submission order and delivering their
/// completions.
pub(crate) struct IoWorker {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl IoWorker {
    pub(crate) fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            join: Mutex::new(Some(join)),
        })
    }

    /// Run `op` on the worker thread and pass its result to `done`.
    pub(crate) fn run<F>(&self, op: F, done: IoCompletion)
    where
        F: FnOnce() -> Result<IoReply> + Send + 'static,
    {
        let guard = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(tx) = guard.as_ref() else {
            drop(guard);
            done(Err(BackendError::Closed));
            return;
        };
        let job: Job = Box::new(move || done(op()));
        if let Err(mpsc::SendError(job)) = tx.send(job) {
            // The worker thread died (a completion callback panicked); keep the completion
            // contract by running the operation here.
            tracing::warn!("backend io worker is gone; running operation inline");
            drop(guard);
            job();
        }
    }

    /// Stop accepting work, drain what was queued, and join the thread.
    pub(crate) fn shutdown(&self) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(tx);

        let join = self
            .join
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(join) = join {
            // A completion callback may close its own backend; never join ourselves.
            if join.thread().id() == thread::current().id() {
                return;
            }
            if join.join().is_err() {
                tracing::warn!("backend io worker panicked");
            }
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

impl Drop for IoWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
