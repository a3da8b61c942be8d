//! Error types and non-fatal diagnostics.
//!
//! Two kinds of failure exist in the pipeline:
//!
//! - [`SoiError`] is returned through [`Result`] for conditions that stop the
//!   current operation: collaborator failures (sinks, sources) and resolver
//!   invariant violations.
//! - [`Issue`] values are collected in [`Diagnostics`] for conditions that are
//!   expected in real filings (missing contexts, ambiguous headers, unclassified
//!   assets, ...). They never abort a record, a filing or a batch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while extracting, resolving or persisting records.
#[derive(Error, Debug)]
pub enum SoiError {
    /// A fact referenced a context that is not present in the filing.
    #[error("Missing context: {context_ref}")]
    MissingContext {
        /// The unknown context reference.
        context_ref: String,
    },

    /// No header row could be detected in an HTML table.
    #[error("Ambiguous header in table {table}: no row carries both an issuer and a fair value column")]
    AmbiguousHeader {
        /// Index of the table within the filing.
        table: usize,
    },

    /// Too few numeric values to infer the scale of an HTML table.
    #[error("Scale indeterminate: {samples} samples, at least {required} required")]
    ScaleIndeterminate {
        /// Number of populated numeric cells found.
        samples: usize,
        /// Minimum number of samples configured.
        required: usize,
    },

    /// Neither the dimensional nor the table path produced any record.
    #[error("Unparseable filing {accession}")]
    UnparseableFiling {
        /// Accession number of the filing.
        accession: String,
    },

    /// The entity registry reached a state that must never happen.
    #[error("Resolver invariant violated: {0}")]
    ResolverInvariant(String),

    /// Error parsing a value from a filing.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error writing to or reading from a record sink.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Error obtaining filings from an upstream source.
    #[error("Source error: {0}")]
    Source(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`SoiError`].
pub type Result<T> = std::result::Result<T, SoiError>;

/// Kind of a non-fatal condition recorded during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Fact dropped because its context reference is unknown.
    MissingContext,
    /// Fact routed to aggregate/rollup handling (no investment identifier).
    AggregateFact,
    /// HTML table skipped because no header row was found.
    AmbiguousHeader,
    /// HTML table scale defaulted to thousands on a thin sample.
    ScaleIndeterminate,
    /// Record kept with asset class Unclassified.
    UnclassifiedAsset,
    /// Fuzzy match landed in the review band.
    FuzzyAmbiguous,
    /// Same field carried different values in different statements.
    ConflictingField,
    /// Filing produced no records from any path.
    UnparseableFiling,
}

impl IssueKind {
    /// All issue kinds, in reporting order.
    pub const ALL: [Self; 8] = [
        Self::MissingContext,
        Self::AggregateFact,
        Self::AmbiguousHeader,
        Self::ScaleIndeterminate,
        Self::UnclassifiedAsset,
        Self::FuzzyAmbiguous,
        Self::ConflictingField,
        Self::UnparseableFiling,
    ];

    /// Stable snake-case label used in summaries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingContext => "missing_context",
            Self::AggregateFact => "aggregate_fact",
            Self::AmbiguousHeader => "ambiguous_header",
            Self::ScaleIndeterminate => "scale_indeterminate",
            Self::UnclassifiedAsset => "unclassified_asset",
            Self::FuzzyAmbiguous => "fuzzy_ambiguous",
            Self::ConflictingField => "conflicting_field",
            Self::UnparseableFiling => "unparseable_filing",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single non-fatal condition with a human readable detail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// What happened.
    pub kind: IssueKind,
    /// Where and to what.
    pub detail: String,
}

impl Issue {
    /// Creates a new issue.
    #[must_use]
    pub fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl SoiError {
    /// The diagnostic kind of a recoverable error, `None` for errors that
    /// must be propagated.
    #[must_use]
    pub const fn issue_kind(&self) -> Option<IssueKind> {
        match self {
            Self::MissingContext { .. } => Some(IssueKind::MissingContext),
            Self::AmbiguousHeader { .. } => Some(IssueKind::AmbiguousHeader),
            Self::ScaleIndeterminate { .. } => Some(IssueKind::ScaleIndeterminate),
            Self::UnparseableFiling { .. } => Some(IssueKind::UnparseableFiling),
            _ => None,
        }
    }
}

/// Append-only collection of issues for one filing or one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Records an issue.
    pub fn push(&mut self, kind: IssueKind, detail: impl Into<String>) {
        self.issues.push(Issue::new(kind, detail));
    }

    /// Records a recoverable error as an issue.
    ///
    /// Returns false, recording nothing, for errors that have no issue kind;
    /// the caller is expected to propagate those instead.
    pub fn record(&mut self, err: &SoiError) -> bool {
        match err.issue_kind() {
            Some(kind) => {
                self.push(kind, err.to_string());
                true
            }
            None => false,
        }
    }

    /// Moves all issues from `other` into this collection.
    pub fn extend(&mut self, other: Self) {
        self.issues.extend(other.issues);
    }

    /// Number of issues of a given kind.
    #[must_use]
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Counts for every kind, including zeros, in reporting order.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<IssueKind, usize> {
        IssueKind::ALL
            .iter()
            .map(|kind| (*kind, self.count(*kind)))
            .collect()
    }

    /// Returns the number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns true if no issue was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns an iterator over the issues.
    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }
}
