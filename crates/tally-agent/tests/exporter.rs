//! Background exporter lifecycle against real files and scripted sinks.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tally_agent::export::{FileSink, SnapshotSink};
use tally_agent::Registry;
use tally_core::error::{ErrorCode, Result, TallyError};
use tally_core::Snapshot;

async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

fn read_snapshot(path: &Path) -> Snapshot {
    Snapshot::from_json(&fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn file_exists_and_parses_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(FileSink::for_app(dir.path().join("metrics"), "fintech-app"));
    let path = sink.path().to_path_buf();

    let reg = Registry::new();
    reg.register_counter("transactions_total", "").inc().unwrap();
    reg.start(sink, Duration::from_millis(50)).unwrap();
    assert!(reg.is_exporting());

    wait_for(|| path.exists()).await;
    assert_eq!(path.file_name().unwrap(), "fintech-app_metrics.json");
    let snap = read_snapshot(&path);
    assert_eq!(snap.counter("transactions_total").unwrap().value, 1.0);

    reg.stop().await;
    assert!(!reg.is_exporting());
}

#[tokio::test]
async fn later_ticks_overwrite_with_fresh_state() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(FileSink::new(dir.path().join("m.json")));
    let path = sink.path().to_path_buf();

    let reg = Registry::new();
    let c = reg.register_counter("c", "");
    reg.start(sink, Duration::from_millis(20)).unwrap();
    wait_for(|| path.exists()).await;

    c.inc_by(41.0).unwrap();
    wait_for(|| {
        Snapshot::from_json(&fs::read(&path).unwrap())
            .map(|s| s.counters["c"].value == 41.0)
            .unwrap_or(false)
    })
    .await;

    reg.stop().await;
    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("m.json")]);
}

#[tokio::test]
async fn no_writes_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(FileSink::new(dir.path().join("m.json")));
    let path = sink.path().to_path_buf();

    let reg = Registry::new();
    let c = reg.register_counter("c", "");
    reg.start(sink, Duration::from_millis(20)).unwrap();
    wait_for(|| path.exists()).await;

    reg.stop().await;
    let mtime = fs::metadata(&path).unwrap().modified().unwrap();
    let content = fs::read(&path).unwrap();
    let writes = reg.export_status().writes;

    c.inc_by(100.0).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime);
    assert_eq!(fs::read(&path).unwrap(), content);
    assert_eq!(reg.export_status().writes, writes);
}

#[tokio::test]
async fn stop_interrupts_a_long_wait() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(FileSink::new(dir.path().join("m.json")));
    let path = sink.path().to_path_buf();

    let reg = Registry::new();
    reg.start(sink, Duration::from_secs(3600)).unwrap();
    wait_for(|| path.exists()).await;

    tokio::time::timeout(Duration::from_secs(2), reg.stop())
        .await
        .expect("stop must not wait out the interval");
}

#[tokio::test]
async fn stop_is_idempotent_and_safe_without_start() {
    let reg = Registry::new();
    reg.stop().await;
    reg.stop().await;
    assert!(!reg.is_exporting());

    let dir = tempfile::tempdir().unwrap();
    reg.start(Arc::new(FileSink::new(dir.path().join("m.json"))), Duration::from_millis(20))
        .unwrap();
    reg.stop().await;
    reg.stop().await;
    assert!(!reg.is_exporting());
}

#[tokio::test]
async fn start_while_running_keeps_one_exporter() {
    let counting = Arc::new(CountingSink::default());
    let reg = Registry::new();
    reg.start(counting.clone(), Duration::from_secs(3600)).unwrap();
    reg.start(counting.clone(), Duration::from_secs(3600)).unwrap();

    wait_for(|| counting.writes.load(Ordering::SeqCst) >= 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    reg.stop().await;

    assert_eq!(counting.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exporter_can_restart_after_stop() {
    let counting = Arc::new(CountingSink::default());
    let reg = Registry::new();

    reg.start(counting.clone(), Duration::from_secs(3600)).unwrap();
    wait_for(|| counting.writes.load(Ordering::SeqCst) == 1).await;
    reg.stop().await;

    reg.start(counting.clone(), Duration::from_secs(3600)).unwrap();
    wait_for(|| counting.writes.load(Ordering::SeqCst) == 2).await;
    reg.stop().await;

    assert_eq!(reg.export_status().writes, 2);
}

#[tokio::test]
async fn zero_interval_is_rejected() {
    let reg = Registry::new();
    let err = reg
        .start(Arc::new(CountingSink::default()), Duration::ZERO)
        .expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
    assert!(!reg.is_exporting());
}

#[test]
fn start_outside_runtime_is_an_error() {
    let reg = Registry::new();
    let err = reg
        .start(Arc::new(CountingSink::default()), Duration::from_secs(1))
        .expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::Internal);
}

#[tokio::test]
async fn failures_are_retried_and_reported() {
    let flaky = Arc::new(FlakySink {
        fail_first: 3,
        calls: AtomicUsize::new(0),
    });
    let reg = Registry::new();
    let c = reg.register_counter("c", "");
    reg.start(flaky.clone(), Duration::from_millis(10)).unwrap();

    // mutators are unaffected while the exporter is failing
    c.inc().unwrap();

    wait_for(|| reg.export_status().writes >= 1).await;
    reg.stop().await;

    let status = reg.export_status();
    assert_eq!(status.failures, 3);
    assert!(status.last_error.unwrap().contains("disk full"));
    assert_eq!(c.value().unwrap(), 1.0);
}

#[tokio::test]
async fn file_sink_reports_unwritable_destination() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();

    let sink = FileSink::new(blocker.join("m.json"));
    let err = sink.write(&Snapshot::default()).await.expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ExportFailure);
}

#[tokio::test]
async fn failed_rename_removes_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("m.json");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), b"x").unwrap();

    let sink = FileSink::new(target.clone());
    let err = sink.write(&Snapshot::default()).await.expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ExportFailure);

    let names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("m.json")]);
    assert!(target.join("keep").exists());
}

#[tokio::test]
async fn panicked_sink_does_not_block_restart() {
    let reg = Registry::new();
    reg.start(Arc::new(PanickingSink), Duration::from_millis(10)).unwrap();
    wait_for(|| !reg.is_exporting()).await;

    let counting = Arc::new(CountingSink::default());
    reg.start(counting.clone(), Duration::from_secs(3600)).unwrap();
    assert!(reg.is_exporting());
    wait_for(|| counting.writes.load(Ordering::SeqCst) >= 1).await;
    reg.stop().await;
    assert!(!reg.is_exporting());
}

#[tokio::test]
async fn file_sink_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FileSink::for_app(dir.path().join("a").join("b"), "svc");
    sink.write(&Snapshot::default()).await.unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&fs::read(sink.path()).unwrap()).unwrap();
    assert_eq!(doc, serde_json::json!({"counters": {}, "gauges": {}, "histograms": {}}));
}

#[derive(Default)]
struct CountingSink {
    writes: AtomicUsize,
}

#[async_trait]
impl SnapshotSink for CountingSink {
    async fn write(&self, _snapshot: &Snapshot) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "counting".into()
    }
}

struct FlakySink {
    fail_first: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl SnapshotSink for FlakySink {
    async fn write(&self, _snapshot: &Snapshot) -> Result<()> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return Err(TallyError::ExportFailure("disk full".into()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "flaky".into()
    }
}

struct PanickingSink;

#[async_trait]
impl SnapshotSink for PanickingSink {
    async fn write(&self, _snapshot: &Snapshot) -> Result<()> {
        panic!("sink blew up");
    }

    fn describe(&self) -> String {
        "panicking".into()
    }
}
