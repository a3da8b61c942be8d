//! SQLite-based sink implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use soi_core::{CanonicalEntity, RecordSink, ResolvedRecord, Result, SoiError, Ticker};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

use crate::RecordKey;

/// SQLite store for resolved records.
///
/// Three tables mirror the downstream contract: `bdc` (one row per filer),
/// `portfolio_company` (one row per canonical entity) and `investment` (one
/// row per business key). Each row also keeps its full JSON form so that
/// unchanged writes can be detected and skipped.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Create a new SQLite sink at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| SoiError::Sink(e.to_string()))?;
        let sink = Self {
            conn: Mutex::new(conn),
        };
        sink.initialize_schema()?;
        Ok(sink)
    }

    /// Create an in-memory SQLite sink.
    ///
    /// Useful for testing; data is lost when the sink is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| SoiError::Sink(e.to_string()))?;
        let sink = Self {
            conn: Mutex::new(conn),
        };
        sink.initialize_schema()?;
        Ok(sink)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bdc (
                ticker TEXT PRIMARY KEY,
                first_seen TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS portfolio_company (
                entity_id INTEGER PRIMARY KEY,
                canonical_name TEXT NOT NULL,
                normalized_name TEXT NOT NULL,
                industry TEXT,
                needs_review INTEGER NOT NULL DEFAULT 0,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_company_normalized
             ON portfolio_company(normalized_name);

            CREATE TABLE IF NOT EXISTS investment (
                filer TEXT NOT NULL REFERENCES bdc(ticker),
                entity_id INTEGER NOT NULL,
                investment_type TEXT NOT NULL,
                investment_id TEXT NOT NULL,
                period_end TEXT NOT NULL,
                accession TEXT NOT NULL,
                asset_class TEXT NOT NULL,
                fair_value REAL,
                cost REAL,
                principal REAL,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (filer, entity_id, investment_type, investment_id, period_end)
            );

            CREATE INDEX IF NOT EXISTS idx_investment_filer_period
             ON investment(filer, period_end);",
        )
        .map_err(|e| SoiError::Sink(e.to_string()))?;

        debug!("SQLite sink schema initialized");
        Ok(())
    }
}

#[async_trait]
impl RecordSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn put_entities(&self, entities: &[CanonicalEntity]) -> Result<usize> {
        let updated_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| SoiError::Sink(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        let mut written = 0usize;
        for entity in entities {
            let data_json =
                serde_json::to_string(entity).map_err(|e| SoiError::Parse(e.to_string()))?;
            let id = i64::from(entity.id.0);

            let stored: Option<String> = tx
                .query_row(
                    "SELECT data_json FROM portfolio_company WHERE entity_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| SoiError::Sink(e.to_string()))?;
            if stored.as_deref() == Some(data_json.as_str()) {
                continue;
            }

            tx.execute(
                "INSERT INTO portfolio_company
                 (entity_id, canonical_name, normalized_name, industry, needs_review, data_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(entity_id) DO UPDATE SET
                    canonical_name = excluded.canonical_name,
                    normalized_name = excluded.normalized_name,
                    industry = excluded.industry,
                    needs_review = excluded.needs_review,
                    data_json = excluded.data_json,
                    updated_at = excluded.updated_at",
                params![
                    id,
                    entity.canonical_name,
                    entity.normalized_name,
                    entity.industry,
                    entity.needs_review,
                    data_json,
                    updated_at
                ],
            )
            .map_err(|e| SoiError::Sink(e.to_string()))?;
            written += 1;
        }

        tx.commit().map_err(|e| SoiError::Sink(e.to_string()))?;
        debug!("Stored {} of {} entities", written, entities.len());
        Ok(written)
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn put_records(&self, records: &[ResolvedRecord]) -> Result<usize> {
        let updated_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| SoiError::Sink(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        let mut written = 0usize;
        for record in records {
            let key = RecordKey::of(record);
            let entity_id = i64::from(key.entity.0);
            let period_end = key.period_end.to_string();
            let data_json =
                serde_json::to_string(record).map_err(|e| SoiError::Parse(e.to_string()))?;

            tx.execute(
                "INSERT OR IGNORE INTO bdc (ticker, first_seen) VALUES (?1, ?2)",
                params![key.filer.as_str(), updated_at],
            )
            .map_err(|e| SoiError::Sink(e.to_string()))?;

            let stored: Option<String> = tx
                .query_row(
                    "SELECT data_json FROM investment
                     WHERE filer = ?1 AND entity_id = ?2 AND investment_type = ?3
                     AND investment_id = ?4 AND period_end = ?5",
                    params![
                        key.filer.as_str(),
                        entity_id,
                        key.investment_type,
                        key.investment_id,
                        period_end
                    ],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| SoiError::Sink(e.to_string()))?;
            if stored.as_deref() == Some(data_json.as_str()) {
                continue;
            }

            tx.execute(
                "INSERT INTO investment
                 (filer, entity_id, investment_type, investment_id, period_end, accession,
                  asset_class, fair_value, cost, principal, data_json, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(filer, entity_id, investment_type, investment_id, period_end)
                 DO UPDATE SET
                    accession = excluded.accession,
                    asset_class = excluded.asset_class,
                    fair_value = excluded.fair_value,
                    cost = excluded.cost,
                    principal = excluded.principal,
                    data_json = excluded.data_json,
                    updated_at = excluded.updated_at",
                params![
                    key.filer.as_str(),
                    entity_id,
                    key.investment_type,
                    key.investment_id,
                    period_end,
                    record.accession,
                    record.asset_class.as_str(),
                    record.fair_value,
                    record.cost,
                    record.principal,
                    data_json,
                    updated_at
                ],
            )
            .map_err(|e| SoiError::Sink(e.to_string()))?;
            written += 1;
        }

        tx.commit().map_err(|e| SoiError::Sink(e.to_string()))?;
        debug!("Stored {} of {} records", written, records.len());
        Ok(written)
    }

    #[instrument(skip(self))]
    async fn get_entities(&self) -> Result<Vec<CanonicalEntity>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        let mut stmt = conn
            .prepare("SELECT data_json FROM portfolio_company ORDER BY entity_id ASC")
            .map_err(|e| SoiError::Sink(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        let mut entities = Vec::new();
        for row in rows {
            let json = row.map_err(|e| SoiError::Sink(e.to_string()))?;
            let entity: CanonicalEntity =
                serde_json::from_str(&json).map_err(|e| SoiError::Parse(e.to_string()))?;
            entities.push(entity);
        }

        debug!("Found {} stored entities", entities.len());
        Ok(entities)
    }

    #[instrument(skip(self), fields(filer = %filer, period_end = %period_end))]
    async fn get_records(
        &self,
        filer: &Ticker,
        period_end: NaiveDate,
    ) -> Result<Option<Vec<ResolvedRecord>>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT data_json FROM investment
                 WHERE filer = ?1 AND period_end = ?2
                 ORDER BY rowid ASC",
            )
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        let rows = stmt
            .query_map(params![filer.as_str(), period_end.to_string()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let json = row.map_err(|e| SoiError::Sink(e.to_string()))?;
            let record: ResolvedRecord =
                serde_json::from_str(&json).map_err(|e| SoiError::Parse(e.to_string()))?;
            records.push(record);
        }

        if records.is_empty() {
            debug!("No stored records found");
            return Ok(None);
        }

        debug!("Found {} stored records", records.len());
        Ok(Some(records))
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SoiError::Sink(e.to_string()))?;

        conn.execute_batch(
            "DELETE FROM investment;
             DELETE FROM portfolio_company;
             DELETE FROM bdc;",
        )
        .map_err(|e| SoiError::Sink(e.to_string()))?;

        debug!("Cleared all sink entries");
        Ok(())
    }
}
