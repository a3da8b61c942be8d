//! No-op sink implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use soi_core::{CanonicalEntity, RecordSink, ResolvedRecord, Result, Ticker};
use tracing::trace;

/// A no-op sink that doesn't store anything.
///
/// `get_records` returns `Ok(None)` and the `put_*` methods report zero rows
/// written. Useful for runs that only need the in-process results.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NoopSink {
    /// Create a new no-op sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordSink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    async fn put_entities(&self, _entities: &[CanonicalEntity]) -> Result<usize> {
        trace!("NoopSink: put_entities called, doing nothing");
        Ok(0)
    }

    async fn put_records(&self, _records: &[ResolvedRecord]) -> Result<usize> {
        trace!("NoopSink: put_records called, doing nothing");
        Ok(0)
    }

    async fn get_entities(&self) -> Result<Vec<CanonicalEntity>> {
        trace!("NoopSink: get_entities called, returning nothing");
        Ok(Vec::new())
    }

    async fn get_records(
        &self,
        _filer: &Ticker,
        _period_end: NaiveDate,
    ) -> Result<Option<Vec<ResolvedRecord>>> {
        trace!("NoopSink: get_records called, returning None");
        Ok(None)
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopSink: clear called, doing nothing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soi_core::EntityId;

    #[tokio::test]
    async fn test_noop_sink_stores_nothing() {
        let sink = NoopSink::new();
        let entity = CanonicalEntity::new(EntityId(1), "Acme Corp", "acme");

        assert_eq!(sink.put_entities(&[entity]).await.unwrap(), 0);
        assert_eq!(sink.put_records(&[]).await.unwrap(), 0);
        assert!(sink.get_entities().await.unwrap().is_empty());
        assert!(
            sink.get_records(&Ticker::new("ARCC"), NaiveDate::MIN)
                .await
                .unwrap()
                .is_none()
        );
        assert!(sink.clear().await.is_ok());
    }
}
