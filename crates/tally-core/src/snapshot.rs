//! Snapshot document: the persisted file format and the live-read payload.
//!
//! Exactly three top-level fields (`counters`, `gauges`, `histograms`), each
//! mapping a metric name to its record. Names are emitted in sorted order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::record::{CounterRecord, GaugeRecord, HistogramRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    #[serde(default)]
    pub counters: BTreeMap<String, CounterRecord>,
    #[serde(default)]
    pub gauges: BTreeMap<String, GaugeRecord>,
    #[serde(default)]
    pub histograms: BTreeMap<String, HistogramRecord>,
}

impl Snapshot {
    /// Pretty JSON (two-space indent), newline terminated.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        let mut out = serde_json::to_vec_pretty(self)
            .map_err(|e| TallyError::ExportFailure(format!("serialize snapshot failed: {e}")))?;
        out.push(b'\n');
        Ok(out)
    }

    /// Parse a snapshot document, e.g. one read back from the exporter's file.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| TallyError::InvalidArgument(format!("invalid snapshot: {e}")))
    }

    pub fn counter(&self, name: &str) -> Result<&CounterRecord> {
        self.counters
            .get(name)
            .ok_or_else(|| TallyError::NotFound(format!("counter {name}")))
    }

    pub fn gauge(&self, name: &str) -> Result<&GaugeRecord> {
        self.gauges
            .get(name)
            .ok_or_else(|| TallyError::NotFound(format!("gauge {name}")))
    }

    pub fn histogram(&self, name: &str) -> Result<&HistogramRecord> {
        self.histograms
            .get(name)
            .ok_or_else(|| TallyError::NotFound(format!("histogram {name}")))
    }
}
