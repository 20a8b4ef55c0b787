use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use simdisk_time::VirtualTime;

use crate::{DiskSimulator, EngineError, IoKind, Result, SimCallbacks, SimRequest};

/// Parameters of [`FifoDiskModel`], loaded from a JSON file.
///
/// ```json
/// { "overhead_ms": 0.2, "seek_ms": 4.5, "transfer_mb_per_s": 150.0 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FifoParams {
    /// Fixed per-request controller overhead.
    pub overhead_ms: f64,
    /// Average positioning cost of a non-sequential access.
    pub seek_ms: f64,
    /// Media transfer rate in MB/s (10^6 bytes per second).
    pub transfer_mb_per_s: f64,
    /// A request starting within this many bytes after the previous request's end skips the seek.
    #[serde(default)]
    pub sequential_window_bytes: u64,
}

impl FifoParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.overhead_ms.is_finite() && self.overhead_ms >= 0.0) {
            return Err(EngineError::Invalid("overhead_ms must be a finite value >= 0"));
        }
        if !(self.seek_ms.is_finite() && self.seek_ms >= 0.0) {
            return Err(EngineError::Invalid("seek_ms must be a finite value >= 0"));
        }
        if !(self.transfer_mb_per_s.is_finite() && self.transfer_mb_per_s > 0.0) {
            return Err(EngineError::Invalid("transfer_mb_per_s must be a finite value > 0"));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| EngineError::Params {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let params: Self = serde_json::from_str(&text).map_err(|err| EngineError::Params {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        params.validate()?;
        Ok(params)
    }

    fn transfer_ms(&self, bytes: u64) -> f64 {
        // MB/s == bytes per microsecond, so bytes / rate is in microseconds.
        bytes as f64 / self.transfer_mb_per_s / 1_000.0
    }
}

/// Summary written to the output file on shutdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FifoReport {
    pub requests: u64,
    pub reads: u64,
    pub writes: u64,
    pub mean_response_ms: f64,
    pub max_response_ms: f64,
    pub final_time_ms: f64,
}

#[derive(Debug, Clone, Copy)]
struct InService {
    request: SimRequest,
    done: VirtualTime,
}

/// Single-spindle, first-come first-served disk model.
///
/// Service time is `overhead + seek (unless sequential) + bytes / transfer rate`. Requests are
/// served back to back: the next queued request starts at the modeled completion time of the
/// previous one, not at the (possibly later) time the wake was actually delivered.
#[derive(Debug)]
pub struct FifoDiskModel {
    params: FifoParams,
    output: Option<PathBuf>,
    queue: VecDeque<SimRequest>,
    in_service: Option<InService>,
    head_position: Option<u64>,
    report: FifoReport,
    total_response_ms: f64,
}

impl FifoDiskModel {
    pub fn new(params: FifoParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            output: None,
            queue: VecDeque::new(),
            in_service: None,
            head_position: None,
            report: FifoReport::default(),
            total_response_ms: 0.0,
        })
    }

    /// Load parameters from `params` and write the report to `output` on shutdown.
    pub fn from_files(params: &Path, output: &Path) -> Result<Self> {
        let params = FifoParams::load(params)?;
        let mut model = Self::new(params)?;
        model.output = Some(output.to_path_buf());
        Ok(model)
    }

    pub fn params(&self) -> &FifoParams {
        &self.params
    }

    pub fn report(&self) -> &FifoReport {
        &self.report
    }

    /// Requests accepted but not yet reported complete.
    pub fn pending(&self) -> usize {
        self.queue.len() + usize::from(self.in_service.is_some())
    }

    fn service_time_ms(&self, request: &SimRequest) -> f64 {
        let sequential = self.head_position.is_some_and(|head| {
            request.offset >= head
                && request.offset - head <= self.params.sequential_window_bytes
        });
        let seek = if sequential { 0.0 } else { self.params.seek_ms };
        self.params.overhead_ms + seek + self.params.transfer_ms(request.bytes)
    }

    fn start_next(&mut self, at: VirtualTime, cb: &mut dyn SimCallbacks) {
        debug_assert!(self.in_service.is_none());
        let Some(request) = self.queue.pop_front() else {
            cb.deschedule_callback(at);
            return;
        };
        // A request cannot start before it arrived.
        let start = at.max(request.start);
        let done = start.add_millis(self.service_time_ms(&request));
        self.head_position = Some(request.end());
        self.in_service = Some(InService { request, done });
        tracing::trace!(request = %request.id, %start, %done, "fifo model started service");
        cb.schedule_callback(done);
    }

    fn record(&mut self, request: &SimRequest, done: VirtualTime) {
        let response = done.millis_since(request.start);
        self.report.requests += 1;
        match request.kind {
            IoKind::Read => self.report.reads += 1,
            IoKind::Write => self.report.writes += 1,
        }
        self.total_response_ms += response;
        self.report.mean_response_ms = self.total_response_ms / self.report.requests as f64;
        if response > self.report.max_response_ms {
            self.report.max_response_ms = response;
        }
    }

    fn write_report(&self, path: &Path) -> Result<()> {
        let output_err = |reason: String| EngineError::Output {
            path: path.to_path_buf(),
            reason,
        };
        let file = File::create(path).map_err(|err| output_err(err.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.report)
            .map_err(|err| output_err(err.to_string()))?;
        writer.flush().map_err(|err| output_err(err.to_string()))
    }
}

impl DiskSimulator for FifoDiskModel {
    fn request_arrive(&mut self, now: VirtualTime, request: SimRequest, cb: &mut dyn SimCallbacks) {
        self.queue.push_back(request);
        if self.in_service.is_none() {
            self.start_next(now, cb);
        }
    }

    fn internal_event(&mut self, now: VirtualTime, cb: &mut dyn SimCallbacks) {
        let Some(current) = self.in_service else {
            cb.deschedule_callback(now);
            return;
        };
        if now < current.done {
            // Woken early; keep the original deadline armed.
            cb.schedule_callback(current.done);
            return;
        }

        self.in_service = None;
        self.record(&current.request, current.done);
        cb.report_completion(current.done, current.request.id);
        self.start_next(current.done, cb);
    }

    fn shutdown(&mut self, now: VirtualTime) -> Result<()> {
        self.report.final_time_ms = now.as_millis();
        if self.pending() != 0 {
            tracing::warn!(
                pending = self.pending(),
                "fifo model shut down with requests still in service"
            );
        }
        match &self.output {
            Some(path) => self.write_report(path),
            None => Ok(()),
        }
    }
}
