//! Filing-level data types.
//!
//! This module defines what an upstream collaborator hands to the pipeline:
//!
//! - [`Ticker`] and [`FilerId`] - Identity of the filing BDC
//! - [`FilingMetadata`] - Form type, period end, filing date, accession
//! - [`TaggedFact`] - One reported value with its concept and context reference
//! - [`ReportingContext`] - Dimensional qualifiers plus a reporting period
//! - [`Filing`] - Facts, contexts and raw HTML tables of one filing

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::concept::normalize_concept;
use crate::error::SoiError;

/// Axis whose typed members identify individual investment positions.
pub const INVESTMENT_IDENTIFIER_AXIS: &str = "InvestmentIdentifierAxis";

/// A filer ticker.
///
/// Tickers are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identity of a filing BDC.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilerId {
    /// Exchange ticker.
    pub ticker: Ticker,
    /// SEC Central Index Key, zero-padded to 10 digits.
    pub cik: String,
    /// Registrant name, when known.
    pub name: Option<String>,
}

impl FilerId {
    /// Creates a filer identity, zero-padding the CIK.
    #[must_use]
    pub fn new(ticker: impl Into<Ticker>, cik: &str) -> Self {
        Self {
            ticker: ticker.into(),
            cik: format!("{:0>10}", cik.trim()),
            name: None,
        }
    }

    /// Sets the registrant name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Periodic report form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Annual report.
    #[default]
    TenK,
    /// Quarterly report.
    TenQ,
}

impl FormType {
    /// SEC form label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenK => "10-K",
            Self::TenQ => "10-Q",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = SoiError;

    /// Parses `10-K`, `10-Q` and their amended `/A` variants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base = s.trim().trim_end_matches("/A").to_uppercase();
        match base.as_str() {
            "10-K" | "10K" => Ok(Self::TenK),
            "10-Q" | "10Q" => Ok(Self::TenQ),
            _ => Err(SoiError::InvalidParameter(format!("Unsupported form type: {s}"))),
        }
    }
}

/// Metadata of one filing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingMetadata {
    /// Form type.
    pub form_type: FormType,
    /// True for `/A` amendments.
    #[serde(default)]
    pub amendment: bool,
    /// End of the reporting period.
    pub period_end: NaiveDate,
    /// Date the filing was accepted.
    pub filing_date: NaiveDate,
    /// Accession number.
    pub accession: String,
}

impl FilingMetadata {
    /// Creates metadata for an original (non-amended) filing.
    #[must_use]
    pub fn new(
        form_type: FormType,
        period_end: NaiveDate,
        filing_date: NaiveDate,
        accession: impl Into<String>,
    ) -> Self {
        Self {
            form_type,
            amendment: false,
            period_end,
            filing_date,
            accession: accession.into(),
        }
    }
}

/// Whether a fact or context covers a point in time or a span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeriodKind {
    /// Point-in-time value (fair value, cost, principal, ...).
    #[default]
    Instant,
    /// Value accumulated over a span (roll-forward additions, income, ...).
    Duration,
}

/// Reporting period of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// A single date.
    Instant(NaiveDate),
    /// A date range, both ends inclusive.
    Duration {
        /// First day of the period.
        start: NaiveDate,
        /// Last day of the period.
        end: NaiveDate,
    },
}

impl Period {
    /// Returns the kind of this period.
    #[must_use]
    pub const fn kind(&self) -> PeriodKind {
        match self {
            Self::Instant(_) => PeriodKind::Instant,
            Self::Duration { .. } => PeriodKind::Duration,
        }
    }

    /// Returns the instant date, or the end of the duration.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        match self {
            Self::Instant(date) => *date,
            Self::Duration { end, .. } => *end,
        }
    }
}

/// Statement of the filing a fact was reported in.
///
/// Schedule detail, balance-sheet fair values and the parenthetical cost
/// breakdown each carry a subset of an investment's fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Consolidated Schedule of Investments.
    #[default]
    ScheduleOfInvestments,
    /// Consolidated balance sheet.
    BalanceSheet,
    /// Balance sheet parenthetical (cost basis).
    BalanceSheetParenthetical,
    /// Any other statement or note.
    Other,
}

/// Value of a tagged fact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Numeric fact.
    Numeric(f64),
    /// Text, date or enumeration fact.
    Text(String),
}

impl FactValue {
    /// Numeric value, parsing text facts that hold a plain number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(v) => Some(*v),
            Self::Text(s) => s.trim().replace(',', "").parse().ok(),
        }
    }

    /// Text value; numeric facts have none.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Text(s) => Some(s.as_str()),
        }
    }

    /// Returns true if both values denote the same datum.
    ///
    /// Numbers compare with a relative tolerance so that `21721000` and
    /// `2.1721E7` agree; text compares after trimming.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0),
            _ => match (self, other) {
                (Self::Text(a), Self::Text(b)) => a.trim() == b.trim(),
                _ => false,
            },
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for FactValue {
    fn from(v: f64) -> Self {
        Self::Numeric(v)
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One reported value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaggedFact {
    /// Concept label, with or without namespace prefix.
    pub concept: String,
    /// Reported value.
    pub value: FactValue,
    /// Reference to exactly one [`ReportingContext`] of the same filing.
    pub context_ref: String,
    /// Unit of numeric facts (`USD`, `shares`, `pure`).
    #[serde(default)]
    pub unit: Option<String>,
    /// Instant or duration fact.
    #[serde(default)]
    pub period_kind: PeriodKind,
    /// Statement the fact was reported in.
    #[serde(default)]
    pub statement: StatementKind,
    /// Filing date of the document that reported the fact; later dates win
    /// when an amendment restates a value.
    #[serde(default)]
    pub reported_on: Option<NaiveDate>,
}

impl TaggedFact {
    /// Creates an instant schedule fact.
    #[must_use]
    pub fn new(
        concept: impl Into<String>,
        value: impl Into<FactValue>,
        context_ref: impl Into<String>,
    ) -> Self {
        Self {
            concept: concept.into(),
            value: value.into(),
            context_ref: context_ref.into(),
            unit: None,
            period_kind: PeriodKind::Instant,
            statement: StatementKind::ScheduleOfInvestments,
            reported_on: None,
        }
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Marks the fact as a duration fact.
    #[must_use]
    pub const fn duration(mut self) -> Self {
        self.period_kind = PeriodKind::Duration;
        self
    }

    /// Sets the statement the fact belongs to.
    #[must_use]
    pub const fn in_statement(mut self, statement: StatementKind) -> Self {
        self.statement = statement;
        self
    }

    /// Sets the filing date of the reporting document.
    #[must_use]
    pub const fn reported_on(mut self, date: NaiveDate) -> Self {
        self.reported_on = Some(date);
        self
    }

    /// Concept label without namespace prefix.
    #[must_use]
    pub fn normalized_concept(&self) -> &str {
        normalize_concept(&self.concept)
    }
}

/// Whether an axis takes free-text or taxonomy members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionKind {
    /// Members are arbitrary per-filing strings.
    Typed,
    /// Members are drawn from a fixed taxonomy.
    #[default]
    Explicit,
}

/// One axis → member qualifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Axis label, with or without namespace prefix.
    pub axis: String,
    /// Member value.
    pub member: String,
    /// Typed or explicit.
    #[serde(default)]
    pub kind: DimensionKind,
}

impl Dimension {
    /// Creates a typed dimension.
    #[must_use]
    pub fn typed(axis: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            member: member.into(),
            kind: DimensionKind::Typed,
        }
    }

    /// Creates an explicit dimension.
    #[must_use]
    pub fn explicit(axis: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            member: member.into(),
            kind: DimensionKind::Explicit,
        }
    }
}

/// What a context scopes its facts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextScope<'a> {
    /// One investment position, keyed by its filing-scoped identifier.
    Individual(&'a str),
    /// A subtotal along one or more explicit axes.
    Aggregate,
    /// A report-wide total.
    ReportTotal,
}

/// Dimensional qualifiers plus a reporting period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingContext {
    /// Opaque reference, unique within one filing.
    pub id: String,
    /// Reporting period.
    pub period: Period,
    /// Axis → member qualifiers.
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

impl ReportingContext {
    /// Creates a context without dimensions.
    #[must_use]
    pub fn new(id: impl Into<String>, period: Period) -> Self {
        Self {
            id: id.into(),
            period,
            dimensions: Vec::new(),
        }
    }

    /// Adds a dimension.
    #[must_use]
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Member of the given axis; axis labels are compared without prefixes.
    #[must_use]
    pub fn member(&self, axis: &str) -> Option<&str> {
        let axis = normalize_concept(axis);
        self.dimensions
            .iter()
            .find(|d| normalize_concept(&d.axis) == axis)
            .map(|d| d.member.as_str())
    }

    /// Investment identifier carried on `axis`.
    ///
    /// Falls back to any typed axis whose name contains `Identifier`, which
    /// covers filer-specific extension axes.
    #[must_use]
    pub fn identifier_on(&self, axis: &str) -> Option<&str> {
        self.member(axis)
            .or_else(|| {
                self.dimensions
                    .iter()
                    .find(|d| {
                        d.kind == DimensionKind::Typed
                            && normalize_concept(&d.axis).contains("Identifier")
                    })
                    .map(|d| d.member.as_str())
            })
            .map(str::trim)
            .filter(|member| !member.is_empty())
    }

    /// Scope of this context given the identifier axis.
    #[must_use]
    pub fn scope_on(&self, axis: &str) -> ContextScope<'_> {
        match self.identifier_on(axis) {
            Some(id) => ContextScope::Individual(id),
            None if self.dimensions.is_empty() => ContextScope::ReportTotal,
            None => ContextScope::Aggregate,
        }
    }

    /// Returns true if this context identifies one investment position on the
    /// standard [`INVESTMENT_IDENTIFIER_AXIS`].
    #[must_use]
    pub fn is_individual(&self) -> bool {
        matches!(
            self.scope_on(INVESTMENT_IDENTIFIER_AXIS),
            ContextScope::Individual(_)
        )
    }
}

/// Dimensional data of one filing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingFacts {
    /// All tagged facts.
    pub facts: Vec<TaggedFact>,
    /// All reporting contexts.
    pub contexts: Vec<ReportingContext>,
}

impl FilingFacts {
    /// Creates an empty fact set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            facts: Vec::new(),
            contexts: Vec::new(),
        }
    }

    /// Index of contexts by reference.
    #[must_use]
    pub fn context_index(&self) -> HashMap<&str, &ReportingContext> {
        self.contexts.iter().map(|c| (c.id.as_str(), c)).collect()
    }

    /// Returns true if there is nothing to join.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Everything the upstream collaborator supplies for one filing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    /// Filing BDC.
    pub filer: FilerId,
    /// Filing metadata.
    pub metadata: FilingMetadata,
    /// Dimensional facts and contexts, if the filing is tagged.
    #[serde(default)]
    pub facts: Option<FilingFacts>,
    /// Raw HTML fragments holding the schedule tables.
    #[serde(default)]
    pub html: Vec<String>,
}

impl Filing {
    /// Creates a filing with no content.
    #[must_use]
    pub const fn new(filer: FilerId, metadata: FilingMetadata) -> Self {
        Self {
            filer,
            metadata,
            facts: None,
            html: Vec::new(),
        }
    }

    /// Sets the dimensional facts.
    #[must_use]
    pub fn with_facts(mut self, facts: FilingFacts) -> Self {
        self.facts = Some(facts);
        self
    }

    /// Adds an HTML fragment.
    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html.push(html.into());
        self
    }

    /// Stable ordering key: ticker, period end, filing date, accession.
    #[must_use]
    pub fn sort_key(&self) -> (&str, NaiveDate, NaiveDate, &str) {
        (
            self.filer.ticker.as_str(),
            self.metadata.period_end,
            self.metadata.filing_date,
            self.metadata.accession.as_str(),
        )
    }
}
