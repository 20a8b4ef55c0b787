#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use simdisk_backend::{BlockBackend, IoCompletion, IoReply, Result as BackendResult};
use simdisk_sim::{DiskSimulator, RequestId, SimCallbacks, SimRequest};
use simdisk_time::VirtualTime;

/// Engine completing every request a fixed latency after its arrival, independently of the
/// others.
pub struct FixedLatencyEngine {
    latency_ms: f64,
    pending: Vec<(VirtualTime, RequestId)>,
    pub shut_down: Arc<AtomicBool>,
    pub arrivals: Arc<AtomicUsize>,
}

impl FixedLatencyEngine {
    pub fn new(latency_ms: f64) -> Self {
        Self {
            latency_ms,
            pending: Vec::new(),
            shut_down: Arc::new(AtomicBool::new(false)),
            arrivals: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn rearm(&self, now: VirtualTime, cb: &mut dyn SimCallbacks) {
        let earliest = self
            .pending
            .iter()
            .map(|(done, _)| *done)
            .reduce(|a, b| if b < a { b } else { a });
        match earliest {
            Some(done) => cb.schedule_callback(done),
            None => cb.deschedule_callback(now),
        }
    }
}

impl DiskSimulator for FixedLatencyEngine {
    fn request_arrive(&mut self, now: VirtualTime, request: SimRequest, cb: &mut dyn SimCallbacks) {
        self.arrivals.fetch_add(1, Ordering::SeqCst);
        self.pending
            .push((request.start.add_millis(self.latency_ms), request.id));
        self.rearm(now, cb);
    }

    fn internal_event(&mut self, now: VirtualTime, cb: &mut dyn SimCallbacks) {
        let (due, rest): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|(done, _)| *done <= now);
        self.pending = rest;
        for (done, id) in due {
            cb.report_completion(done, id);
        }
        self.rearm(now, cb);
    }

    fn shutdown(&mut self, _now: VirtualTime) -> simdisk_sim::Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend whose completions are fired by the test.
#[derive(Clone, Default)]
pub struct ManualBackend {
    pending: Arc<Mutex<Vec<IoCompletion>>>,
}

impl ManualBackend {
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Complete the oldest outstanding operation with `result`.
    pub fn complete_next(&self, result: BackendResult<IoReply>) {
        let done = self.pending.lock().unwrap().remove(0);
        done(result);
    }
}

impl BlockBackend for ManualBackend {
    fn read(&self, _offset: u64, _len: usize, done: IoCompletion) {
        self.pending.lock().unwrap().push(done);
    }

    fn write(&self, _offset: u64, _data: Vec<u8>, done: IoCompletion) {
        self.pending.lock().unwrap().push(done);
    }

    fn length(&self) -> BackendResult<u64> {
        Ok(1 << 20)
    }

    fn close(&self) -> BackendResult<()> {
        Ok(())
    }
}

/// Issuer callback that records every invocation.
#[derive(Clone, Default)]
pub struct Recorder {
    results: Arc<Mutex<Vec<BackendResult<IoReply>>>>,
}

impl Recorder {
    pub fn callback(&self) -> IoCompletion {
        let results = Arc::clone(&self.results);
        Box::new(move |res| results.lock().unwrap().push(res))
    }

    pub fn count(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn results(&self) -> Vec<BackendResult<IoReply>> {
        self.results.lock().unwrap().clone()
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

pub fn write_fifo_params(dir: &std::path::Path, overhead_ms: f64) -> std::path::PathBuf {
    let path = dir.join("params.json");
    std::fs::write(
        &path,
        format!(
            r#"{{ "overhead_ms": {overhead_ms:?}, "seek_ms": 0.0, "transfer_mb_per_s": 1000.0 }}"#
        ),
    )
    .unwrap();
    path
}
