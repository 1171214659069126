//! tally agent library entry.
//!
//! This crate wires the metrics registry, its typed handles, the background
//! snapshot exporter, configuration, and the operational HTTP surface. It is
//! consumed by the binary (`main.rs`), by the facade crate, and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod export;
pub mod ops;
pub mod registry;
pub mod router;

pub use registry::{Counter, Gauge, Histogram, Registry};
