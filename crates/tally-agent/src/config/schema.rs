use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use tally_core::buckets::{self, DEFAULT_BUCKETS};
use tally_core::error::{Result, TallyError};

use crate::export::FileSink;
use crate::registry::Registry;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    pub version: u32,

    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl TallyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TallyError::UnsupportedVersion);
        }
        if self.app_name.is_empty() || self.app_name.contains(['/', '\\']) {
            return Err(TallyError::InvalidConfiguration(
                "app_name must be non-empty and must not contain path separators".into(),
            ));
        }

        self.server.validate()?;
        self.exporter.validate()?;
        self.metrics.validate()?;

        Ok(())
    }

    /// Snapshot file sink for this app: `<exporter.dir>/<app_name>_metrics.json`.
    pub fn sink(&self) -> FileSink {
        FileSink::for_app(&self.exporter.dir, &self.app_name)
    }
}

fn default_app_name() -> String {
    "app".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            TallyError::InvalidConfiguration(format!(
                "server.listen must be a valid socket address ({}): {e}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:5000".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_dir")]
    pub dir: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            dir: default_dir(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(TallyError::InvalidConfiguration(
                "exporter.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        if self.dir.is_empty() {
            return Err(TallyError::InvalidConfiguration(
                "exporter.dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_enabled() -> bool {
    true
}
fn default_dir() -> String {
    "metrics".into()
}
fn default_interval_ms() -> u64 {
    10_000
}

/// Metrics declared up front and registered at boot.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default)]
    pub counters: Vec<MetricDecl>,
    #[serde(default)]
    pub gauges: Vec<MetricDecl>,
    #[serde(default)]
    pub histograms: Vec<HistogramDecl>,
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        unique_names("metrics.counters", self.counters.iter().map(|d| d.name.as_str()))?;
        unique_names("metrics.gauges", self.gauges.iter().map(|d| d.name.as_str()))?;
        unique_names("metrics.histograms", self.histograms.iter().map(|d| d.name.as_str()))?;

        for h in &self.histograms {
            buckets::validate_bounds(&h.buckets).map_err(|e| {
                TallyError::InvalidConfiguration(format!("metrics.histograms[{}]: {e}", h.name))
            })?;
        }
        Ok(())
    }

    /// Register every declared metric.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        for c in &self.counters {
            registry.register_counter(&c.name, &c.description);
        }
        for g in &self.gauges {
            registry.register_gauge(&g.name, &g.description);
        }
        for h in &self.histograms {
            registry.register_histogram(&h.name, &h.buckets, &h.description)?;
        }
        Ok(())
    }
}

fn unique_names<'a>(section: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(TallyError::InvalidConfiguration(format!(
                "{section}: metric name must not be empty"
            )));
        }
        if !seen.insert(name) {
            return Err(TallyError::InvalidConfiguration(format!(
                "{section}: duplicate metric name {name}"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDecl {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramDecl {
    pub name: String,
    #[serde(default = "default_buckets")]
    pub buckets: Vec<f64>,
    #[serde(default)]
    pub description: String,
}

fn default_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}
