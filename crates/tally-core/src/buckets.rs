//! Cumulative histogram buckets and their snapshot encoding.
//!
//! Buckets are kept in ascending bound order. In a snapshot they are a JSON
//! object keyed by the stringified bound (`"0.1"`, `"1.0"`), emitted in bound
//! order rather than lexical key order so `"10.0"` never sorts before `"2.0"`.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TallyError};

/// Default bounds (seconds) for latency-style histograms.
pub const DEFAULT_BUCKETS: [f64; 5] = [0.1, 0.5, 1.0, 2.0, 5.0];

/// One cumulative bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    /// Inclusive upper bound.
    pub le: f64,
    /// Number of observations `<= le`.
    pub count: u64,
}

/// Ordered set of cumulative buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets(Vec<Bucket>);

impl Buckets {
    /// Zeroed buckets for `bounds`. See [`validate_bounds`].
    pub fn new(bounds: &[f64]) -> Result<Self> {
        validate_bounds(bounds)?;
        Ok(Self(
            bounds.iter().map(|&le| Bucket { le, count: 0 }).collect(),
        ))
    }

    /// Count `value` in every bucket whose bound is `>= value`.
    ///
    /// A value above the last bound touches no bucket.
    pub fn record(&mut self, value: f64) {
        let start = self.0.partition_point(|b| b.le < value);
        for b in &mut self.0[start..] {
            b.count += 1;
        }
    }

    /// Cumulative count of the bucket bounded by exactly `le`.
    pub fn count_le(&self, le: f64) -> Option<u64> {
        self.0.iter().find(|b| b.le == le).map(|b| b.count)
    }

    /// Whether these buckets were declared with exactly `bounds`.
    pub fn has_bounds(&self, bounds: &[f64]) -> bool {
        self.0.len() == bounds.len() && self.0.iter().zip(bounds).all(|(b, &le)| b.le == le)
    }

    pub fn bounds(&self) -> Vec<f64> {
        self.0.iter().map(|b| b.le).collect()
    }

    /// Count of the widest bucket: every observation within the declared bounds.
    pub fn total(&self) -> u64 {
        self.0.last().map_or(0, |b| b.count)
    }
}

/// Bounds must be non-empty, finite, positive and strictly ascending.
pub fn validate_bounds(bounds: &[f64]) -> Result<()> {
    if bounds.is_empty() {
        return Err(TallyError::InvalidConfiguration(
            "histogram bounds must not be empty".into(),
        ));
    }
    if let Some(b) = bounds.iter().find(|b| !b.is_finite() || **b <= 0.0) {
        return Err(TallyError::InvalidConfiguration(format!(
            "histogram bound must be a positive finite number, got {b}"
        )));
    }
    if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
        return Err(TallyError::InvalidConfiguration(format!(
            "histogram bounds must be strictly ascending ({} >= {})",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Snapshot key for a bound: shortest round-trip form, always with a
/// fractional part for whole numbers (`1.0`, not `1`). Very small or very
/// large bounds use exponent form (`1e-7`, `1e16`).
pub fn bound_key(le: f64) -> String {
    format!("{le:?}")
}

impl Serialize for Buckets {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for b in &self.0 {
            map.serialize_entry(&bound_key(b.le), &b.count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Buckets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(BucketsVisitor)
    }
}

struct BucketsVisitor;

impl<'de> Visitor<'de> for BucketsVisitor {
    type Value = Buckets;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map from bucket bound to cumulative count")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Buckets, A::Error> {
        let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, count)) = access.next_entry::<String, u64>()? {
            let le: f64 = key
                .parse()
                .map_err(|_| de::Error::custom(format!("bucket bound is not a number: {key:?}")))?;
            out.push(Bucket { le, count });
        }
        let bounds: Vec<f64> = out.iter().map(|b| b.le).collect();
        validate_bounds(&bounds).map_err(de::Error::custom)?;
        Ok(Buckets(out))
    }
}
