#![cfg(not(target_arch = "wasm32"))]

use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use simdisk::sim::FifoReport;
use simdisk::{BackendError, IoOp, IoReply, OpenFlags, SimDisk};

const TIMEOUT: Duration = Duration::from_secs(10);

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn open_string(dir: &Path, params: &str, target: &str) -> String {
    let params_path = dir.join("params.json");
    fs::write(&params_path, params).unwrap();
    format!(
        "disksim:{}:{}:{target}",
        params_path.display(),
        dir.join("report.json").display()
    )
}

fn submit_and_wait(disk: &SimDisk, op: IoOp) -> simdisk::backend::Result<IoReply> {
    let (tx, rx) = mpsc::channel();
    disk.submit(op, Box::new(move |res| tx.send(res).unwrap()));
    rx.recv_timeout(TIMEOUT).unwrap()
}

#[test]
fn data_written_through_the_device_reaches_the_image() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("disk.img");
    fs::write(&image, vec![0u8; 64 * 1024]).unwrap();
    let config = open_string(
        dir.path(),
        r#"{ "overhead_ms": 0.2, "seek_ms": 1.0, "transfer_mb_per_s": 200.0 }"#,
        &format!("raw:{}", image.display()),
    );

    let disk = SimDisk::open(&config, OpenFlags::empty()).unwrap();
    let pattern: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(
        submit_and_wait(
            &disk,
            IoOp::Write {
                offset: 4096,
                data: pattern.clone()
            }
        ),
        Ok(IoReply::Written)
    );
    assert_eq!(
        submit_and_wait(
            &disk,
            IoOp::Read {
                offset: 4096,
                len: pattern.len()
            }
        ),
        Ok(IoReply::Read(pattern.clone()))
    );
    assert_eq!(
        submit_and_wait(
            &disk,
            IoOp::Read {
                offset: 60 * 1024,
                len: 8192
            }
        ),
        Err(BackendError::OutOfBounds {
            offset: 60 * 1024,
            len: 8192,
            capacity: 64 * 1024
        })
    );
    disk.close().unwrap();

    let on_disk = fs::read(&image).unwrap();
    assert_eq!(&on_disk[4096..4096 + pattern.len()], pattern.as_slice());

    let report: FifoReport =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report.requests, 3);
    assert_eq!(report.writes, 1);
}

#[test]
fn fifo_model_serializes_queued_requests() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = open_string(
        dir.path(),
        r#"{ "overhead_ms": 15.0, "seek_ms": 0.0, "transfer_mb_per_s": 1000.0 }"#,
        "mem:65536",
    );
    let disk = SimDisk::open(&config, OpenFlags::empty()).unwrap();

    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    for i in 0..3u64 {
        let tx = tx.clone();
        disk.submit(
            IoOp::Read {
                offset: i * 512,
                len: 512,
            },
            Box::new(move |res| tx.send((i, res, Instant::now())).unwrap()),
        );
    }

    let mut order = Vec::new();
    let mut last = start;
    for _ in 0..3 {
        let (i, res, at) = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(res, Ok(IoReply::Read(vec![0; 512])));
        order.push(i);
        last = at;
    }
    assert_eq!(order, vec![0, 1, 2]);
    // Three back-to-back 15ms services: the last cannot finish before 45ms of virtual time.
    assert!(
        last - start >= Duration::from_millis(44),
        "finished after {:?}",
        last - start
    );
    assert!(disk.virtual_now().as_millis() >= 45.0);

    let stats = disk.stats();
    assert_eq!(stats.completed, 3);
    assert!(stats.max_lateness_ms >= 0.0);
    disk.close().unwrap();
}

#[test]
fn dropping_the_device_closes_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = open_string(
        dir.path(),
        r#"{ "overhead_ms": 0.1, "seek_ms": 0.0, "transfer_mb_per_s": 1000.0 }"#,
        "mem:4096",
    );
    let disk = SimDisk::open(&config, OpenFlags::empty()).unwrap();
    assert_eq!(
        submit_and_wait(&disk, IoOp::Read { offset: 0, len: 16 }),
        Ok(IoReply::Read(vec![0; 16]))
    );
    drop(disk);

    assert!(dir.path().join("report.json").exists());
}
