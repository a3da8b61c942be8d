//! In-memory sink implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use soi_core::{CanonicalEntity, EntityId, RecordSink, ResolvedRecord, Result, Ticker};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::RecordKey;

/// Stored record with its first-insert sequence number.
#[derive(Debug, Clone)]
struct StoredRecord {
    seq: usize,
    record: ResolvedRecord,
}

/// Simple in-memory sink for testing and development.
///
/// Data is stored in `RwLock`-protected `HashMap`s and is lost when the sink
/// is dropped. Records are returned in the order they were first stored.
#[derive(Debug, Default)]
pub struct InMemorySink {
    entities: RwLock<HashMap<EntityId, CanonicalEntity>>,
    records: RwLock<HashMap<RecordKey, StoredRecord>>,
}

impl InMemorySink {
    /// Create a new empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Every stored entity, by id.
    pub async fn entities(&self) -> Vec<CanonicalEntity> {
        let mut entities: Vec<_> = self.entities.read().await.values().cloned().collect();
        entities.sort_by_key(|e| e.id);
        entities
    }
}

#[async_trait]
impl RecordSink for InMemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn put_entities(&self, entities: &[CanonicalEntity]) -> Result<usize> {
        let mut store = self.entities.write().await;
        let mut written = 0usize;
        for entity in entities {
            if store.get(&entity.id) != Some(entity) {
                store.insert(entity.id, entity.clone());
                written += 1;
            }
        }
        debug!("Stored {} of {} entities", written, entities.len());
        Ok(written)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn put_records(&self, records: &[ResolvedRecord]) -> Result<usize> {
        let mut store = self.records.write().await;
        let mut written = 0usize;
        for record in records {
            let next = store.len();
            match store.get_mut(&RecordKey::of(record)) {
                Some(stored) if stored.record == *record => {}
                Some(stored) => {
                    stored.record = record.clone();
                    written += 1;
                }
                None => {
                    store.insert(
                        RecordKey::of(record),
                        StoredRecord {
                            seq: next,
                            record: record.clone(),
                        },
                    );
                    written += 1;
                }
            }
        }
        debug!("Stored {} of {} records", written, records.len());
        Ok(written)
    }

    #[instrument(skip(self))]
    async fn get_entities(&self) -> Result<Vec<CanonicalEntity>> {
        let entities = self.entities().await;
        debug!("Found {} stored entities", entities.len());
        Ok(entities)
    }

    #[instrument(skip(self), fields(filer = %filer, period_end = %period_end))]
    async fn get_records(
        &self,
        filer: &Ticker,
        period_end: NaiveDate,
    ) -> Result<Option<Vec<ResolvedRecord>>> {
        let store = self.records.read().await;
        let mut hits: Vec<&StoredRecord> = store
            .iter()
            .filter(|(key, _)| key.filer == *filer && key.period_end == period_end)
            .map(|(_, stored)| stored)
            .collect();

        if hits.is_empty() {
            debug!("No stored records");
            return Ok(None);
        }

        hits.sort_by_key(|stored| stored.seq);
        debug!("Found {} stored records", hits.len());
        Ok(Some(hits.into_iter().map(|s| s.record.clone()).collect()))
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entities.write().await.clear();
        self.records.write().await.clear();
        debug!("Cleared all sink entries");
        Ok(())
    }
}
