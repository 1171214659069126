//! Typed handles bound to one metric name.
//!
//! A handle stores only the name and a reference to the registry store. Every
//! call looks the record up under the registry lock; nothing is cached.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tally_core::error::Result;

use super::Shared;

/// Monotonic counter handle.
#[derive(Clone)]
pub struct Counter {
    shared: Arc<Shared>,
    name: Arc<str>,
}

impl Counter {
    pub(crate) fn new(shared: Arc<Shared>, name: &str) -> Self {
        Self {
            shared,
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increment by 1.
    pub fn inc(&self) -> Result<()> {
        self.inc_by(1.0)
    }

    /// Increment by a strictly positive delta; anything else is `InvalidArgument`.
    pub fn inc_by(&self, delta: f64) -> Result<()> {
        self.shared.with_counter(&self.name, |c| c.add(delta))
    }

    pub fn value(&self) -> Result<f64> {
        self.shared.with_counter(&self.name, |c| Ok(c.value))
    }
}

/// Gauge handle.
#[derive(Clone)]
pub struct Gauge {
    shared: Arc<Shared>,
    name: Arc<str>,
}

impl Gauge {
    pub(crate) fn new(shared: Arc<Shared>, name: &str) -> Self {
        Self {
            shared,
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self, value: f64) -> Result<()> {
        self.shared.with_gauge(&self.name, |g| g.set(value))
    }

    /// Increment by 1.
    pub fn inc(&self) -> Result<()> {
        self.inc_by(1.0)
    }

    pub fn inc_by(&self, delta: f64) -> Result<()> {
        self.shared.with_gauge(&self.name, |g| g.add(delta))
    }

    /// Decrement by 1.
    pub fn dec(&self) -> Result<()> {
        self.dec_by(1.0)
    }

    pub fn dec_by(&self, delta: f64) -> Result<()> {
        self.shared.with_gauge(&self.name, |g| g.add(-delta))
    }

    pub fn value(&self) -> Result<f64> {
        self.shared.with_gauge(&self.name, |g| Ok(g.value))
    }
}

/// Histogram handle.
#[derive(Clone)]
pub struct Histogram {
    shared: Arc<Shared>,
    name: Arc<str>,
}

impl Histogram {
    pub(crate) fn new(shared: Arc<Shared>, name: &str) -> Self {
        Self {
            shared,
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record one observation: count, sum and every bucket `>= value` move together.
    pub fn observe(&self, value: f64) -> Result<()> {
        self.shared.with_histogram(&self.name, |h| h.observe(value))
    }

    /// Observe an elapsed time in seconds.
    pub fn observe_duration(&self, elapsed: Duration) -> Result<()> {
        self.observe(elapsed.as_secs_f64())
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter").field("name", &self.name).finish()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").field("name", &self.name).finish()
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram").field("name", &self.name).finish()
    }
}
