//! Metrics registry: named counters, gauges and histograms behind one lock.
//!
//! - Registration is idempotent: a second `register_*` for the same name
//!   returns a handle to the existing record and never resets it.
//! - Every read and write takes the same `parking_lot::Mutex`, so a
//!   [`Registry::snapshot`] can never observe half of a histogram update.
//! - The lock is never held across I/O; the exporter writes a copy.

pub mod handles;

use std::collections::btree_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tally_core::error::{Result, TallyError};
use tally_core::record::{CounterRecord, GaugeRecord, HistogramRecord};
use tally_core::{buckets, Snapshot};

use crate::export::{ExportStatus, Exporter, SnapshotSink};

pub use handles::{Counter, Gauge, Histogram};

/// Record storage shared by the registry, its handles, and the exporter task.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: Mutex<Snapshot>,
}

impl Shared {
    pub(crate) fn snapshot(&self) -> Snapshot {
        self.state.lock().clone()
    }

    pub(crate) fn with_counter<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut CounterRecord) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let rec = state
            .counters
            .get_mut(name)
            .ok_or_else(|| TallyError::NotFound(format!("counter {name}")))?;
        f(rec)
    }

    pub(crate) fn with_gauge<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut GaugeRecord) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let rec = state
            .gauges
            .get_mut(name)
            .ok_or_else(|| TallyError::NotFound(format!("gauge {name}")))?;
        f(rec)
    }

    pub(crate) fn with_histogram<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut HistogramRecord) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let rec = state
            .histograms
            .get_mut(name)
            .ok_or_else(|| TallyError::NotFound(format!("histogram {name}")))?;
        f(rec)
    }
}

/// Thread-safe metrics registry.
///
/// Cloning is cheap and every clone refers to the same records and the same
/// exporter slot.
#[derive(Clone, Default)]
pub struct Registry {
    shared: Arc<Shared>,
    exporter: Arc<Mutex<Option<Exporter>>>,
    // serializes concurrent `stop` calls so each one returns only after the join
    stopping: Arc<tokio::sync::Mutex<()>>,
    export_status: Arc<Mutex<ExportStatus>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter (initial value 0).
    pub fn register_counter(&self, name: &str, description: &str) -> Counter {
        self.shared
            .state
            .lock()
            .counters
            .entry(name.to_string())
            .or_insert_with(|| CounterRecord::new(description));
        Counter::new(Arc::clone(&self.shared), name)
    }

    /// Get or create a gauge (initial value 0).
    pub fn register_gauge(&self, name: &str, description: &str) -> Gauge {
        self.shared
            .state
            .lock()
            .gauges
            .entry(name.to_string())
            .or_insert_with(|| GaugeRecord::new(description));
        Gauge::new(Arc::clone(&self.shared), name)
    }

    /// Get or create a histogram.
    ///
    /// `bounds` are validated even when the histogram already exists. An
    /// existing histogram keeps the bounds it was first registered with.
    pub fn register_histogram(
        &self,
        name: &str,
        bounds: &[f64],
        description: &str,
    ) -> Result<Histogram> {
        buckets::validate_bounds(bounds)?;

        let mut state = self.shared.state.lock();
        match state.histograms.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                let existing = existing.get();
                if !existing.buckets.has_bounds(bounds) {
                    tracing::warn!(
                        histogram = %name,
                        existing = ?existing.buckets.bounds(),
                        requested = ?bounds,
                        "histogram re-registered with different bounds; keeping existing"
                    );
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(HistogramRecord::new(bounds, description)?);
            }
        }
        drop(state);

        Ok(Histogram::new(Arc::clone(&self.shared), name))
    }

    /// Handle for an already registered counter.
    pub fn counter(&self, name: &str) -> Result<Counter> {
        if !self.shared.state.lock().counters.contains_key(name) {
            return Err(TallyError::NotFound(format!("counter {name}")));
        }
        Ok(Counter::new(Arc::clone(&self.shared), name))
    }

    /// Handle for an already registered gauge.
    pub fn gauge(&self, name: &str) -> Result<Gauge> {
        if !self.shared.state.lock().gauges.contains_key(name) {
            return Err(TallyError::NotFound(format!("gauge {name}")));
        }
        Ok(Gauge::new(Arc::clone(&self.shared), name))
    }

    /// Handle for an already registered histogram.
    pub fn histogram(&self, name: &str) -> Result<Histogram> {
        if !self.shared.state.lock().histograms.contains_key(name) {
            return Err(TallyError::NotFound(format!("histogram {name}")));
        }
        Ok(Histogram::new(Arc::clone(&self.shared), name))
    }

    /// Point-in-time copy of every record.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    /// Start the background exporter on the current tokio runtime.
    ///
    /// The first snapshot is written immediately, then once per `interval`.
    /// Calling `start` while the exporter is running is a no-op. An exporter
    /// whose task already ended (its sink panicked) is replaced.
    pub fn start(&self, sink: Arc<dyn SnapshotSink>, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(TallyError::InvalidConfiguration(
                "export interval must be greater than zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TallyError::Internal(format!("exporter needs a tokio runtime: {e}")))?;

        let mut slot = self.exporter.lock();
        match slot.as_ref() {
            Some(running) if !running.is_finished() => {
                tracing::debug!("snapshot exporter already running");
                return Ok(());
            }
            Some(_) => tracing::warn!("snapshot exporter had exited; restarting"),
            None => {}
        }
        *slot = Some(Exporter::spawn(
            &runtime,
            Arc::clone(&self.shared),
            sink,
            interval,
            Arc::clone(&self.export_status),
        ));
        Ok(())
    }

    /// Stop the exporter and wait for its task to exit.
    ///
    /// Once this returns no further snapshot is written. Safe to call
    /// repeatedly, and a no-op if the exporter was never started.
    pub async fn stop(&self) {
        let _stopping = self.stopping.lock().await;
        let running = self.exporter.lock().take();
        if let Some(exporter) = running {
            exporter.join().await;
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.exporter
            .lock()
            .as_ref()
            .is_some_and(|running| !running.is_finished())
    }

    /// Export outcome counters, accumulated across exporter restarts.
    pub fn export_status(&self) -> ExportStatus {
        self.export_status.lock().clone()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("exporting", &self.is_exporting())
            .finish_non_exhaustive()
    }
}
