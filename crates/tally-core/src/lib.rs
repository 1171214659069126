//! tally core: metric records, their update rules, and the snapshot document.
//!
//! This crate defines the data contract shared by the registry, the exporter,
//! and any consumer of the persisted snapshot file. It carries no runtime or
//! locking dependencies; callers serialize access themselves.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every rejected update surfaces as `TallyError` and leaves the record untouched.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod buckets;
pub mod error;
pub mod record;
pub mod snapshot;

/// Shared result type.
pub use error::{Result, TallyError};
pub use snapshot::Snapshot;
