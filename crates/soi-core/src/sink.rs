//! Downstream record sinks.
//!
//! This module defines the [`RecordSink`] trait through which resolved records
//! and canonical entities leave the pipeline.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    entity::{CanonicalEntity, ResolvedRecord},
    error::Result,
    types::Ticker,
};

/// Trait for persisting resolved records.
///
/// Implementations can store data in various backends (SQLite, in-memory, etc.).
/// Writes are upserts on the business key (filer, entity, investment type,
/// investment identifier, period end): an identical row is skipped, a changed
/// row replaces the stored one.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Returns the name of this sink.
    fn name(&self) -> &str;

    /// Stores canonical entities.
    ///
    /// Returns the number of entities inserted or updated.
    async fn put_entities(&self, entities: &[CanonicalEntity]) -> Result<usize>;

    /// Stores resolved records.
    ///
    /// Returns the number of records inserted or updated; identical rows are
    /// not counted.
    async fn put_records(&self, records: &[ResolvedRecord]) -> Result<usize>;

    /// Retrieves every stored canonical entity, ordered by id.
    ///
    /// A pipeline seeds its resolver from these so entity ids stay stable
    /// across runs that share a sink.
    async fn get_entities(&self) -> Result<Vec<CanonicalEntity>>;

    /// Retrieves the records of one filer and period.
    ///
    /// Returns `Ok(Some(records))` if any are stored, `Ok(None)` if not.
    async fn get_records(
        &self,
        filer: &Ticker,
        period_end: NaiveDate,
    ) -> Result<Option<Vec<ResolvedRecord>>>;

    /// Clears all stored data.
    async fn clear(&self) -> Result<()>;
}
