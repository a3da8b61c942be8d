#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/soi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Dimensional (XBRL) extraction of Schedule of Investments records.
//!
//! This crate reconstructs individual investment positions from tagged facts:
//!
//! - Facts are joined on the investment-identifier dimension of their context
//! - Partial records from different statements are merged per identifier
//! - Extensible enumeration URIs and identifier strings are parsed into
//!   issuer, industry and instrument text
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use soi_core::{Dimension, ExtractionConfig, FilingFacts, Period, ReportingContext, TaggedFact};
//! use soi_xbrl::DimensionalExtractor;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
//! let mut facts = FilingFacts::new();
//! facts.contexts.push(
//!     ReportingContext::new("ctxA", Period::Instant(date))
//!         .with_dimension(Dimension::typed("InvestmentIdentifierAxis", "Acme Corp, First lien")),
//! );
//! facts.facts.push(TaggedFact::new("InvestmentOwnedAtFairValue", 21_721_000.0, "ctxA"));
//!
//! let extraction = DimensionalExtractor::new(ExtractionConfig::default()).extract(&facts);
//! assert_eq!(extraction.records.len(), 1);
//! assert_eq!(extraction.records[0].fair_value, Some(21_721_000.0));
//! ```

use soi_core::{Diagnostics, ExtractionConfig, FilingFacts, InvestmentRecord};
use tracing::{debug, instrument};

/// Identifier and enumeration parsing.
pub mod identifier;
/// Fact/context join.
pub mod join;
/// Statement merge.
pub mod merge;
/// Concept vocabulary.
pub mod vocabulary;

pub use identifier::{ParsedIdentifier, parse_enum_uri, parse_identifier};
pub use join::{JoinOutput, PartialRecord, join_facts};
pub use merge::merge_statements;
pub use vocabulary::{Field, activity_key, field_for};

// =============================================================================
// Extractor
// =============================================================================

/// Records reconstructed from one filing's facts.
#[derive(Debug, Default)]
pub struct DimensionalExtraction {
    /// One record per investment identifier, in first-seen order.
    pub records: Vec<InvestmentRecord>,
    /// Facts routed to aggregate handling.
    pub aggregate_facts: usize,
    /// Issues raised while joining and merging.
    pub diagnostics: Diagnostics,
}

/// Join-then-merge extractor for tagged filings.
#[derive(Debug, Clone, Default)]
pub struct DimensionalExtractor {
    config: ExtractionConfig,
}

impl DimensionalExtractor {
    /// Creates an extractor.
    #[must_use]
    pub const fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Reconstructs investment records from tagged facts.
    ///
    /// Records are not classified; that happens once both extraction paths
    /// have had their say.
    #[instrument(skip(self, facts), fields(facts = facts.facts.len(), contexts = facts.contexts.len()))]
    pub fn extract(&self, facts: &FilingFacts) -> DimensionalExtraction {
        let JoinOutput {
            records: partials,
            aggregate_facts,
            mut diagnostics,
        } = join_facts(facts, &self.config);

        let records: Vec<InvestmentRecord> = partials
            .iter()
            .filter(|partial| !partial.is_empty() || !partial.activity.is_empty())
            .map(|partial| merge_statements(partial, &mut diagnostics))
            .collect();

        debug!(
            records = records.len(),
            conflicts = records.iter().filter(|r| r.has_conflicts()).count(),
            "Dimensional extraction complete"
        );

        DimensionalExtraction {
            records,
            aggregate_facts,
            diagnostics,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
