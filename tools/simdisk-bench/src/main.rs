use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use simdisk_backend::OpenFlags;
use simdisk_device::SimDisk;
use tracing_subscriber::EnvFilter;

mod workload;

use workload::{BenchReport, Workload};

#[derive(Parser, Debug)]
#[command(
    name = "simdisk-bench",
    version,
    about = "Drive a request workload through a simulated disk and report completion latencies."
)]
struct Args {
    /// Device open string: `[disksim:]<params.json>:<output.json>:<target>`, where the target is
    /// `raw:<path>`, a bare path or `mem:<bytes>`.
    ///
    /// Environment variable: `SIMDISK_CONFIG`.
    #[arg(long, env = "SIMDISK_CONFIG", value_name = "OPEN_STRING")]
    config: String,

    /// Number of requests to issue
    #[arg(long, default_value_t = 1000)]
    requests: u64,

    /// Size of every request in bytes
    #[arg(long, value_name = "BYTES", default_value_t = 4096)]
    request_size: usize,

    /// Maximum number of requests in flight at once
    #[arg(long, default_value_t = 8)]
    queue_depth: usize,

    /// Fraction of requests that are writes
    #[arg(long, default_value_t = 0.0)]
    write_ratio: f64,

    /// Pick offsets uniformly at random instead of sweeping the device sequentially
    #[arg(long, action = clap::ArgAction::SetTrue)]
    random: bool,

    /// Seed for offset and read/write selection (defaults to the current time)
    #[arg(long)]
    seed: Option<u64>,

    /// Open the backend read-only
    #[arg(long, action = clap::ArgAction::SetTrue)]
    read_only: bool,

    /// Log filter (tracing-subscriber EnvFilter syntax). Falls back to `RUST_LOG`, then `warn`.
    ///
    /// Environment variable: `SIMDISK_LOG_LEVEL`.
    #[arg(long, env = "SIMDISK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print the report as JSON on stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref())?;
    run(args)
}

fn init_tracing(log_level: Option<&str>) -> anyhow::Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log filter {level:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run(args: Args) -> anyhow::Result<()> {
    let workload = Workload {
        requests: args.requests,
        request_size: args.request_size,
        queue_depth: args.queue_depth,
        write_ratio: args.write_ratio,
        random: args.random,
        seed: args.seed.unwrap_or_else(seed_from_clock),
    };
    workload.validate(args.read_only)?;

    let flags = if args.read_only {
        OpenFlags::READ_ONLY
    } else {
        OpenFlags::empty()
    };
    let disk = SimDisk::open(&args.config, flags)
        .with_context(|| format!("open simulated disk {:?}", args.config))?;
    tracing::info!(?workload, "starting workload");

    let report = workload::run(&disk, &workload);
    // Close even if the run failed so the engine still writes its output file.
    let closed = disk.close().context("close simulated disk");
    let report = report?;
    closed?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn print_report(report: &BenchReport) {
    println!(
        "requests: {} ({} reads, {} writes, {} errors)",
        report.requests, report.reads, report.writes, report.errors
    );
    println!("bytes:    {}", report.bytes);
    println!(
        "time:     {:.3} ms wall, {:.3} ms virtual",
        report.elapsed_ms, report.virtual_time_ms
    );
    println!(
        "latency:  mean {:.3} ms, p50 {:.3} ms, p99 {:.3} ms, max {:.3} ms",
        report.latency.mean_ms, report.latency.p50_ms, report.latency.p99_ms, report.latency.max_ms
    );
    println!(
        "engine:   {} internal events, mean lateness {:.3} ms",
        report.internal_events, report.mean_lateness_ms
    );
}
