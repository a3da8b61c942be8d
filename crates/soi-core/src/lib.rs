#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/soi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and traits for Schedule of Investments extraction.
//!
//! This crate provides the foundational abstractions shared by every stage:
//!
//! - [`Filing`](types::Filing) - What an upstream source supplies for one filing
//! - [`InvestmentRecord`](record::InvestmentRecord) - One reconstructed position
//! - [`CanonicalEntity`](entity::CanonicalEntity) - A resolved portfolio company
//! - [`classify`](classify::classify) - Debt / equity classification
//! - [`FilingSource`](source::FilingSource) - Upstream collaborator seam
//! - [`RecordSink`](sink::RecordSink) - Downstream collaborator seam

/// Debt / equity classification.
pub mod classify;
/// Concept label normalization.
pub mod concept;
/// Run configuration.
pub mod config;
/// Canonical entities, holding edges and resolved records.
pub mod entity;
/// Error types and diagnostics.
pub mod error;
/// Legal-entity suffixes.
pub mod legal;
/// Investment records.
pub mod record;
/// Sink trait for resolved records.
pub mod sink;
/// Source trait for filings.
pub mod source;
/// Filing-level types (Ticker, TaggedFact, ReportingContext, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use classify::{Classification, ClassificationBasis, classify, classify_text};
pub use concept::{concepts_match, normalize_concept};
pub use config::{
    AggregationConfig, DuplicateFactPolicy, ExtractionConfig, PipelineConfig, ResolverConfig,
};
pub use entity::{
    CanonicalEntity, EntityId, HoldingEdge, NameVariant, ResolutionMethod, ResolvedRecord,
};
pub use error::{Diagnostics, Issue, IssueKind, Result, SoiError};
pub use legal::{LEGAL_SUFFIXES, is_legal_suffix};
pub use record::{
    AffiliationTier, AssetClass, FieldConflict, InvestmentRecord, RecordSource, SourcedValue,
};
pub use sink::RecordSink;
pub use source::{FilingSource, InMemorySource};
pub use types::{
    ContextScope, Dimension, DimensionKind, FactValue, FilerId, Filing, FilingFacts,
    FilingMetadata, FormType, INVESTMENT_IDENTIFIER_AXIS, Period, PeriodKind, ReportingContext,
    StatementKind, TaggedFact, Ticker,
};
