//! Shared application state for the tally agent.
//!
//! Owns the config and the one `Registry` of the process, and drives the
//! exporter lifecycle: declared metrics are registered at construction,
//! `start_exporter` begins periodic export, `shutdown` drains, stops the
//! exporter and flushes a final snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tally_core::error::Result;

use crate::config::TallyConfig;
use crate::export::SnapshotSink;
use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: TallyConfig,
    registry: Registry,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state and register the metrics declared in config.
    pub fn new(cfg: TallyConfig) -> Result<Self> {
        let registry = Registry::new();
        cfg.metrics.register(&registry)?;

        tracing::info!(
            app = %cfg.app_name,
            counters = cfg.metrics.counters.len(),
            gauges = cfg.metrics.gauges.len(),
            histograms = cfg.metrics.histograms.len(),
            "declared metrics registered"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &TallyConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }

    /// Start periodic export if enabled in config.
    pub fn start_exporter(&self) -> Result<()> {
        let exporter = &self.cfg().exporter;
        if !exporter.enabled {
            tracing::info!("snapshot exporter disabled");
            return Ok(());
        }
        self.registry()
            .start(Arc::new(self.cfg().sink()), exporter.interval())
    }

    /// Drain, stop the exporter, then write one last snapshot.
    ///
    /// Stopping first means no periodic tick can land after the final flush.
    pub async fn shutdown(&self) {
        self.set_draining();
        self.registry().stop().await;

        if self.cfg().exporter.enabled {
            let sink = self.cfg().sink();
            if let Err(e) = sink.write(&self.registry().snapshot()).await {
                tracing::warn!(error = %e, destination = %sink.describe(), "final snapshot flush failed");
            }
        }
    }
}
