#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/soi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Schedule of Investments extraction for Business Development Companies.
//!
//! This crate ties the stages together. It re-exports the core types, the
//! dimensional and HTML extractors, the entity resolver and the sinks, and
//! provides a [`Pipeline`] that runs filings from registered sources through
//! extraction, classification and resolution into a sink.
//!
//! # Features
//!
//! - `sqlite` - SQLite-backed [`SqliteSink`]
//!
//! # Example
//!
//! ```rust,ignore
//! use soi::{InMemorySink, InMemorySource, Pipeline, Ticker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> soi::Result<()> {
//!     let source = load_filings()?
//!         .into_iter()
//!         .fold(InMemorySource::new(), InMemorySource::with_filing);
//!     let pipeline = Pipeline::default()
//!         .with_source(Arc::new(source))
//!         .with_sink(Arc::new(InMemorySink::new()));
//!
//!     let output = pipeline.run_filers(&[Ticker::new("ARCC")]).await?;
//!     println!("{}", output.summary);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use soi_core::*;

// Extractors
pub use soi_html::HtmlExtractor;
pub use soi_xbrl::DimensionalExtractor;

// Entity resolution
pub use soi_resolve::{
    EntityResolver, IndustryClassifier, KeywordIndustryClassifier, Resolution, ResolutionStatus,
    ReviewItem, SimilarityScorer, StageCounts, TokenSetScorer, normalize_name, token_set_ratio,
};

// Sinks
#[cfg(feature = "sqlite")]
pub use soi_sink::SqliteSink;
pub use soi_sink::{InMemorySink, NoopSink};

/// Holding edges, overlap and concentration.
pub mod aggregate;
/// `polars` exports.
pub mod export;
/// Per-filing path selection and classification.
pub mod extract;
/// End-to-end runs.
pub mod pipeline;
/// Run and portfolio summaries.
pub mod summary;

pub use aggregate::{
    Aggregator, CommonHolding, ConcentrationMetrics, FilerOverlap, IndustryShare, OverlapAnalysis,
};
pub use export::{edges_frame, entities_frame, records_frame};
pub use extract::{ExtractionPath, FilingExtraction, FilingExtractor};
pub use pipeline::{FilingReport, Pipeline, RunOutput};
pub use summary::{PortfolioSummary, RunSummary, portfolio_summaries};
