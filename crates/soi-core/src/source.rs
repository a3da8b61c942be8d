//! Upstream filing sources.
//!
//! Retrieval and caching of filings happen outside this workspace. A
//! [`FilingSource`] is the seam through which they arrive; the pipeline can
//! also take filings directly.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{Filing, Ticker},
};

/// Supplier of parsed filings for a filer.
#[async_trait]
pub trait FilingSource: Send + Sync + Debug {
    /// Returns the name of this source.
    fn name(&self) -> &str;

    /// Fetches every available filing of a filer.
    ///
    /// An unknown filer yields an empty list rather than an error.
    async fn fetch_filings(&self, filer: &Ticker) -> Result<Vec<Filing>>;

    /// Fetches filings for several filers, in the order given.
    async fn fetch_all(&self, filers: &[Ticker]) -> Result<Vec<Filing>> {
        let mut filings = Vec::new();
        for filer in filers {
            filings.extend(self.fetch_filings(filer).await?);
        }
        Ok(filings)
    }
}

/// A source backed by filings held in memory.
#[derive(Debug, Default)]
pub struct InMemorySource {
    filings: BTreeMap<Ticker, Vec<Filing>>,
}

impl InMemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filing.
    #[must_use]
    pub fn with_filing(mut self, filing: Filing) -> Self {
        self.insert(filing);
        self
    }

    /// Adds a filing in place.
    pub fn insert(&mut self, filing: Filing) {
        self.filings
            .entry(filing.filer.ticker.clone())
            .or_default()
            .push(filing);
    }

    /// Number of filings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filings.values().map(Vec::len).sum()
    }

    /// Returns true if no filing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filings.is_empty()
    }
}

#[async_trait]
impl FilingSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_filings(&self, filer: &Ticker) -> Result<Vec<Filing>> {
        Ok(self.filings.get(filer).cloned().unwrap_or_default())
    }
}
