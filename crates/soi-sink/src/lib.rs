#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/soi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Record sinks for resolved investments.
//!
//! This crate provides implementations of the [`RecordSink`] trait from `soi-core`:
//!
//! - [`SqliteSink`] - Persistent SQLite store (default, requires `sqlite` feature)
//! - [`InMemorySink`] - Simple in-memory sink for testing
//! - [`NoopSink`] - No-op sink that doesn't store anything

use chrono::NaiveDate;
use soi_core::{EntityId, ResolvedRecord, Ticker};

/// In-memory sink implementation.
pub mod memory;
/// No-op sink implementation.
pub mod noop;

/// SQLite-based sink implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use soi_core::RecordSink;

// Re-export implementations
pub use memory::InMemorySink;
pub use noop::NoopSink;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSink;

/// Upsert key of a stored record.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Filing BDC.
    pub filer: Ticker,
    /// Portfolio company.
    pub entity: EntityId,
    /// Investment type text, empty when untyped.
    pub investment_type: String,
    /// Filing-scoped investment identifier.
    pub investment_id: String,
    /// Reporting period end.
    pub period_end: NaiveDate,
}

impl RecordKey {
    /// Business key of a record.
    #[must_use]
    pub fn of(record: &ResolvedRecord) -> Self {
        Self {
            filer: record.filer.clone(),
            entity: record.entity,
            investment_type: record.investment_type.clone().unwrap_or_default(),
            investment_id: record.investment_id.clone(),
            period_end: record.period_end,
        }
    }
}
