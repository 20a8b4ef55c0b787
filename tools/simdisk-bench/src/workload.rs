use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use simdisk_backend::IoReply;
use simdisk_device::{IoOp, SimDisk};

/// Shape of the generated request stream.
#[derive(Debug, Clone)]
pub struct Workload {
    pub requests: u64,
    pub request_size: usize,
    pub queue_depth: usize,
    pub write_ratio: f64,
    pub random: bool,
    pub seed: u64,
}

impl Workload {
    pub fn validate(&self, read_only: bool) -> anyhow::Result<()> {
        if self.requests == 0 {
            bail!("--requests must be at least 1");
        }
        if self.request_size == 0 {
            bail!("--request-size must be at least 1");
        }
        if self.queue_depth == 0 {
            bail!("--queue-depth must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.write_ratio) {
            bail!("--write-ratio must be within [0, 1], got {}", self.write_ratio);
        }
        if read_only && self.write_ratio > 0.0 {
            bail!("--write-ratio must be 0 with --read-only");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    fn from_samples(samples: &mut [f64]) -> Self {
        if samples.is_empty() {
            return Self {
                mean_ms: 0.0,
                p50_ms: 0.0,
                p99_ms: 0.0,
                max_ms: 0.0,
            };
        }
        samples.sort_by(f64::total_cmp);
        let percentile = |p: f64| {
            let rank = (p * samples.len() as f64).ceil() as usize;
            samples[rank.clamp(1, samples.len()) - 1]
        };
        Self {
            mean_ms: samples.iter().sum::<f64>() / samples.len() as f64,
            p50_ms: percentile(0.50),
            p99_ms: percentile(0.99),
            max_ms: samples[samples.len() - 1],
        }
    }
}

/// Outcome of a workload run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub requests: u64,
    pub reads: u64,
    pub writes: u64,
    pub errors: u64,
    pub bytes: u64,
    pub elapsed_ms: f64,
    pub virtual_time_ms: f64,
    pub latency: LatencySummary,
    pub mean_lateness_ms: f64,
    pub internal_events: u64,
}

struct Completion {
    is_write: bool,
    ok: bool,
    latency: Duration,
}

/// Drive `workload` against `disk`, keeping up to `queue_depth` requests outstanding.
pub fn run(disk: &SimDisk, workload: &Workload) -> anyhow::Result<BenchReport> {
    let capacity = disk.length().context("query device length")?;
    let slots = capacity / workload.request_size as u64;
    if slots == 0 {
        bail!(
            "device is {capacity} bytes, smaller than one {}-byte request",
            workload.request_size
        );
    }

    let mut rng = StdRng::seed_from_u64(workload.seed);
    let (tx, rx) = mpsc::channel::<Completion>();
    let mut issued = 0u64;
    let mut outstanding = 0usize;

    let issue = |index: u64, rng: &mut StdRng| {
        let slot = if workload.random {
            rng.gen_range(0..slots)
        } else {
            index % slots
        };
        let offset = slot * workload.request_size as u64;
        let is_write = workload.write_ratio > 0.0 && rng.gen_bool(workload.write_ratio);
        let op = if is_write {
            IoOp::Write {
                offset,
                data: vec![(index & 0xff) as u8; workload.request_size],
            }
        } else {
            IoOp::Read {
                offset,
                len: workload.request_size,
            }
        };

        let tx = tx.clone();
        let submitted = Instant::now();
        disk.submit(
            op,
            Box::new(move |res| {
                if let Err(err) = &res {
                    tracing::warn!(offset, "request failed: {err}");
                }
                let ok = matches!(
                    (&res, is_write),
                    (Ok(IoReply::Written), true) | (Ok(IoReply::Read(_)), false)
                );
                let _ = tx.send(Completion {
                    is_write,
                    ok,
                    latency: submitted.elapsed(),
                });
            }),
        );
    };

    let start = Instant::now();
    let mut samples = Vec::with_capacity(workload.requests as usize);
    let (mut reads, mut writes, mut errors) = (0u64, 0u64, 0u64);

    while issued < workload.requests || outstanding > 0 {
        while issued < workload.requests && outstanding < workload.queue_depth {
            issue(issued, &mut rng);
            issued += 1;
            outstanding += 1;
        }

        let done = rx.recv().context("completion channel closed")?;
        outstanding -= 1;
        if done.is_write {
            writes += 1;
        } else {
            reads += 1;
        }
        if !done.ok {
            errors += 1;
        }
        samples.push(done.latency.as_secs_f64() * 1_000.0);
    }
    let elapsed = start.elapsed();

    let stats = disk.stats();
    Ok(BenchReport {
        requests: workload.requests,
        reads,
        writes,
        errors,
        bytes: (reads + writes - errors) * workload.request_size as u64,
        elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
        virtual_time_ms: disk.virtual_now().as_millis(),
        latency: LatencySummary::from_samples(&mut samples),
        mean_lateness_ms: stats.mean_lateness_ms(),
        internal_events: stats.internal_events,
    })
}
