//! Periodic snapshot export.
//!
//! The exporter copies the registry under its lock, releases the lock, and
//! hands the copy to a [`SnapshotSink`]. Sink failures stay inside the
//! exporter: they are logged, counted in [`ExportStatus`], and retried on the
//! next tick.

pub mod file;
mod task;

use async_trait::async_trait;
use serde::Serialize;
use tally_core::error::{Result, TallyError};
use tally_core::Snapshot;

pub use file::FileSink;
pub(crate) use task::Exporter;

/// Destination for registry snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Persist one snapshot, replacing whatever the previous call wrote.
    ///
    /// Implementations must never leave a partially written document visible.
    async fn write(&self, snapshot: &Snapshot) -> Result<()>;

    /// Where snapshots go, for logs.
    fn describe(&self) -> String;
}

/// Outcome counters for the background exporter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStatus {
    pub writes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
}

impl ExportStatus {
    pub(crate) fn record_success(&mut self) {
        self.writes += 1;
    }

    pub(crate) fn record_failure(&mut self, err: &TallyError) {
        self.failures += 1;
        self.last_error = Some(err.to_string());
    }
}
