//! Tunable parameters of extraction, resolution and aggregation.
//!
//! Every struct deserializes from JSON with missing fields taking their
//! defaults, so a caller may override only what it needs.

use serde::{Deserialize, Serialize};

use crate::types::INVESTMENT_IDENTIFIER_AXIS;

/// How repeated facts for the same (identifier, concept, statement) are settled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateFactPolicy {
    /// The fact from the most recently filed document wins; ties fall back
    /// to the later fact in input order.
    #[default]
    LatestReported,
    /// The later fact in input order wins.
    LastWrite,
}

/// Dimensional and HTML extraction parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Typed axis carrying investment identifiers.
    pub identifier_axis: String,
    /// Number of leading rows searched for a header.
    pub header_search_rows: usize,
    /// Header substrings marking the issuer column.
    pub issuer_header_tokens: Vec<String>,
    /// Header substrings marking the fair value column.
    pub fair_value_header_tokens: Vec<String>,
    /// Sample median below which a table is read as millions.
    pub scale_threshold: f64,
    /// Number of values sampled per table for scale inference.
    pub scale_sample_size: usize,
    /// Fewer samples than this defaults the table to thousands.
    pub min_scale_samples: usize,
    /// Fewer dimensional records than this triggers the HTML path.
    pub min_dimensional_records: usize,
    /// Repeated fact handling.
    pub duplicate_policy: DuplicateFactPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            identifier_axis: INVESTMENT_IDENTIFIER_AXIS.to_string(),
            header_search_rows: 3,
            issuer_header_tokens: vec![
                "company".to_string(),
                "issuer".to_string(),
                "borrower".to_string(),
            ],
            fair_value_header_tokens: vec!["fair value".to_string()],
            scale_threshold: 1000.0,
            scale_sample_size: 50,
            min_scale_samples: 5,
            min_dimensional_records: 1,
            duplicate_policy: DuplicateFactPolicy::LatestReported,
        }
    }
}

impl ExtractionConfig {
    /// Sets the identifier axis.
    #[must_use]
    pub fn with_identifier_axis(mut self, axis: impl Into<String>) -> Self {
        self.identifier_axis = axis.into();
        self
    }

    /// Sets the number of header rows searched.
    #[must_use]
    pub const fn with_header_search_rows(mut self, rows: usize) -> Self {
        self.header_search_rows = rows;
        self
    }

    /// Sets the millions / thousands threshold.
    #[must_use]
    pub const fn with_scale_threshold(mut self, threshold: f64) -> Self {
        self.scale_threshold = threshold;
        self
    }

    /// Sets the scale sample size.
    #[must_use]
    pub const fn with_scale_sample_size(mut self, size: usize) -> Self {
        self.scale_sample_size = size;
        self
    }

    /// Sets the minimum scale sample count.
    #[must_use]
    pub const fn with_min_scale_samples(mut self, min: usize) -> Self {
        self.min_scale_samples = min;
        self
    }

    /// Sets the dimensional record count below which HTML is parsed.
    #[must_use]
    pub const fn with_min_dimensional_records(mut self, min: usize) -> Self {
        self.min_dimensional_records = min;
        self
    }

    /// Sets the duplicate fact policy.
    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicateFactPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Fuzzy matching thresholds, on a 0-100 scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// At or above: auto-resolve.
    pub auto_accept: f64,
    /// At or above (and below `auto_accept`): needs review.
    pub review_floor: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            auto_accept: 90.0,
            review_floor: 80.0,
        }
    }
}

impl ResolverConfig {
    /// Sets the auto-accept threshold.
    #[must_use]
    pub const fn with_auto_accept(mut self, score: f64) -> Self {
        self.auto_accept = score;
        self
    }

    /// Sets the review floor.
    #[must_use]
    pub const fn with_review_floor(mut self, score: f64) -> Self {
        self.review_floor = score;
        self
    }
}

/// Overlap analysis parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Minimum distinct filers for an entity to count as a common holding.
    pub min_holders: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { min_holders: 2 }
    }
}

impl AggregationConfig {
    /// Sets the common holding threshold.
    #[must_use]
    pub const fn with_min_holders(mut self, min: usize) -> Self {
        self.min_holders = min;
        self
    }
}

/// Configuration of a whole run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extraction parameters.
    pub extraction: ExtractionConfig,
    /// Resolver parameters.
    pub resolver: ResolverConfig,
    /// Aggregation parameters.
    pub aggregation: AggregationConfig,
}

impl PipelineConfig {
    /// Sets the extraction parameters.
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// Sets the resolver parameters.
    #[must_use]
    pub const fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the aggregation parameters.
    #[must_use]
    pub const fn with_aggregation(mut self, aggregation: AggregationConfig) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::SoiError::InvalidParameter(e.to_string()))
    }
}
