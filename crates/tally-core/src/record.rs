//! Metric records and the update rule each kind obeys.
//!
//! Records are plain data with no locking of their own; the registry holds
//! its lock while calling these methods. Every method validates before it
//! writes, so a rejected update leaves the record exactly as it was.

use serde::{Deserialize, Serialize};

use crate::buckets::Buckets;
use crate::error::{Result, TallyError};

fn finite(what: &str, v: f64) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TallyError::InvalidArgument(format!("{what} must be finite, got {v}")))
    }
}

/// Monotonic counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub value: f64,
    pub description: String,
}

impl CounterRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            value: 0.0,
            description: description.into(),
        }
    }

    /// Add a strictly positive delta. A delta too small to change the stored
    /// value is rejected rather than dropped.
    pub fn add(&mut self, delta: f64) -> Result<()> {
        let delta = finite("counter increment", delta)?;
        if delta <= 0.0 {
            return Err(TallyError::InvalidArgument(format!(
                "counter increment must be positive, got {delta}"
            )));
        }
        let next = finite("counter value", self.value + delta)?;
        if next <= self.value {
            return Err(TallyError::InvalidArgument(format!(
                "counter increment {delta} does not change value {}",
                self.value
            )));
        }
        self.value = next;
        Ok(())
    }
}

/// Gauge: set, raised, or lowered freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeRecord {
    pub value: f64,
    pub description: String,
}

impl GaugeRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            value: 0.0,
            description: description.into(),
        }
    }

    pub fn set(&mut self, value: f64) -> Result<()> {
        self.value = finite("gauge value", value)?;
        Ok(())
    }

    /// Signed adjustment; `dec` is `add(-delta)`.
    pub fn add(&mut self, delta: f64) -> Result<()> {
        let delta = finite("gauge delta", delta)?;
        self.value = finite("gauge value", self.value + delta)?;
        Ok(())
    }
}

/// Distribution summary: running count and sum plus cumulative buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramRecord {
    pub count: u64,
    pub sum: f64,
    pub buckets: Buckets,
    pub description: String,
}

impl HistogramRecord {
    pub fn new(bounds: &[f64], description: impl Into<String>) -> Result<Self> {
        Ok(Self {
            count: 0,
            sum: 0.0,
            buckets: Buckets::new(bounds)?,
            description: description.into(),
        })
    }

    /// Record one observation.
    ///
    /// Values above the largest bound still count toward `count` and `sum`
    /// but land in no bucket; see [`HistogramRecord::overflow`].
    pub fn observe(&mut self, value: f64) -> Result<()> {
        let value = finite("histogram observation", value)?;
        let sum = finite("histogram sum", self.sum + value)?;
        self.count += 1;
        self.sum = sum;
        self.buckets.record(value);
        Ok(())
    }

    /// Observations larger than every declared bound.
    pub fn overflow(&self) -> u64 {
        self.count.saturating_sub(self.buckets.total())
    }
}
