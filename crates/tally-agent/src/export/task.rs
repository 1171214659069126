//! Exporter task: write, then park on a cancellable wait, repeat.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ExportStatus, SnapshotSink};
use crate::registry::Shared;

/// A running exporter. Dropping it without [`Exporter::join`] still ends the
/// loop (the shutdown sender closes) but does not wait for it.
pub(crate) struct Exporter {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Exporter {
    pub(crate) fn spawn(
        runtime: &Handle,
        shared: Arc<Shared>,
        sink: Arc<dyn SnapshotSink>,
        interval: Duration,
        status: Arc<Mutex<ExportStatus>>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run(shared, sink, interval, status, shutdown_rx));
        Self { shutdown, handle }
    }

    /// The task has exited without being joined, e.g. after a sink panic.
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop and wait for it to exit.
    pub(crate) async fn join(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "snapshot exporter task panicked");
        }
    }
}

async fn run(
    shared: Arc<Shared>,
    sink: Arc<dyn SnapshotSink>,
    interval: Duration,
    status: Arc<Mutex<ExportStatus>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let destination = sink.describe();
    info!(%destination, interval_ms = interval.as_millis() as u64, "snapshot exporter started");

    loop {
        export_once(&shared, sink.as_ref(), &status, &destination).await;

        tokio::select! {
            // sender closed or stop requested
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(%destination, "snapshot exporter stopped");
}

async fn export_once(
    shared: &Shared,
    sink: &dyn SnapshotSink,
    status: &Mutex<ExportStatus>,
    destination: &str,
) {
    let snapshot = shared.snapshot();
    match sink.write(&snapshot).await {
        Ok(()) => {
            status.lock().record_success();
            debug!(%destination, "snapshot exported");
        }
        Err(e) => {
            warn!(%destination, error = %e, "snapshot export failed; retrying next tick");
            status.lock().record_failure(&e);
        }
    }
}
