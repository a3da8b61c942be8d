//! Reconstructed investment records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{FactValue, StatementKind};

/// Debt / equity split of a position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Loans, notes, bonds and other credit instruments.
    Debt,
    /// Stock, units, warrants and other ownership interests.
    Equity,
    /// No field or keyword signal applied.
    #[default]
    Unclassified,
}

impl AssetClass {
    /// Display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debt => "Debt",
            Self::Equity => "Equity",
            Self::Unclassified => "Unclassified",
        }
    }

    /// Returns true for Debt or Equity.
    #[must_use]
    pub const fn is_classified(&self) -> bool {
        !matches!(self, Self::Unclassified)
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship between the BDC and the portfolio company.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AffiliationTier {
    /// Controlled affiliate (more than 25% voting ownership).
    Controlled,
    /// Non-controlled affiliate (5% to 25%).
    NonControlled,
    /// Neither controlled nor affiliated.
    #[default]
    Unaffiliated,
}

impl AffiliationTier {
    /// Reads an affiliation tier from enumeration or member text such as
    /// `ControlledMember` or `Non-Controlled/Affiliated`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        let noncontrolled = lower.contains("noncontrolled") || lower.contains("non-controlled");
        if lower.contains("unaffiliated")
            || lower.contains("non-affiliated")
            || lower.contains("nonaffiliated")
        {
            Some(Self::Unaffiliated)
        } else if noncontrolled {
            Some(Self::NonControlled)
        } else if lower.contains("controlled") {
            Some(Self::Controlled)
        } else if lower.contains("affiliated") {
            Some(Self::NonControlled)
        } else {
            None
        }
    }

    /// Display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Controlled => "Controlled Affiliate",
            Self::NonControlled => "Non-Controlled Affiliate",
            Self::Unaffiliated => "Unaffiliated",
        }
    }
}

/// Where a record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSource {
    /// Joined from dimensional facts.
    Dimensional,
    /// Scanned from an HTML table row.
    HtmlTable {
        /// Table index within the filing.
        table: usize,
        /// Row index within the table.
        row: usize,
    },
}

/// A value together with the statement that reported it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourcedValue {
    /// Reporting statement.
    pub statement: StatementKind,
    /// Reported value.
    pub value: FactValue,
}

/// Different values reported for one field by different statements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    /// Normalized concept of the field.
    pub concept: String,
    /// Value the merge kept.
    pub chosen: SourcedValue,
    /// Values the merge did not keep.
    pub others: Vec<SourcedValue>,
}

/// One investment position of one filing.
///
/// The identifier is scoped to the filing: two filings may reuse the same
/// string for unrelated positions, and cross-filing identity is only ever
/// established through entity resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecord {
    /// Filing-scoped investment identifier.
    pub investment_id: String,
    /// Portfolio company name, tagged or parsed.
    pub issuer_name: Option<String>,
    /// Investment type text (e.g. "First lien senior secured loan").
    pub investment_type: Option<String>,
    /// Debt / equity split.
    pub asset_class: AssetClass,
    /// Business description (table path).
    pub business_description: Option<String>,
    /// Industry tag.
    pub industry: Option<String>,
    /// Affiliation tier.
    pub affiliation: AffiliationTier,

    /// Fair value in dollars.
    pub fair_value: Option<f64>,
    /// Amortized cost in dollars.
    pub cost: Option<f64>,
    /// Principal amount in dollars.
    pub principal: Option<f64>,
    /// Shares or units held.
    pub shares: Option<f64>,
    /// All-in interest rate.
    pub interest_rate: Option<f64>,
    /// Spread over the reference rate.
    pub spread: Option<f64>,
    /// Reference rate floor.
    pub floor: Option<f64>,
    /// Paid-in-kind rate.
    pub pik_rate: Option<f64>,
    /// Cash-pay rate.
    pub cash_rate: Option<f64>,
    /// Percentage of net assets.
    pub pct_net_assets: Option<f64>,
    /// Reference rate type (SOFR, Prime, ...).
    pub rate_type: Option<String>,
    /// Maturity date.
    pub maturity_date: Option<NaiveDate>,
    /// Acquisition date.
    pub acquisition_date: Option<NaiveDate>,
    /// Position number parsed from the identifier suffix.
    pub position: Option<u32>,
    /// Period end of the instant facts.
    pub period_end: Option<NaiveDate>,

    /// Instant concepts with no dedicated field.
    pub extra: BTreeMap<String, FactValue>,
    /// Duration (roll-forward) concepts; never mixed with instant fields.
    pub activity: BTreeMap<String, f64>,
    /// Instant values reported for earlier period ends (the comparative
    /// schedule), by period end then concept. Never merged into the fields
    /// above.
    pub comparative: BTreeMap<NaiveDate, BTreeMap<String, FactValue>>,
    /// Fields whose statements disagreed.
    pub conflicts: Vec<FieldConflict>,
    /// Origin of the record.
    pub source: RecordSource,
}

impl InvestmentRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new(investment_id: impl Into<String>, source: RecordSource) -> Self {
        Self {
            investment_id: investment_id.into(),
            issuer_name: None,
            investment_type: None,
            asset_class: AssetClass::Unclassified,
            business_description: None,
            industry: None,
            affiliation: AffiliationTier::Unaffiliated,
            fair_value: None,
            cost: None,
            principal: None,
            shares: None,
            interest_rate: None,
            spread: None,
            floor: None,
            pik_rate: None,
            cash_rate: None,
            pct_net_assets: None,
            rate_type: None,
            maturity_date: None,
            acquisition_date: None,
            position: None,
            period_end: None,
            extra: BTreeMap::new(),
            activity: BTreeMap::new(),
            comparative: BTreeMap::new(),
            conflicts: Vec::new(),
            source,
        }
    }

    /// Sets the issuer name.
    #[must_use]
    pub fn with_issuer(mut self, name: impl Into<String>) -> Self {
        self.issuer_name = Some(name.into());
        self
    }

    /// Sets the investment type.
    #[must_use]
    pub fn with_investment_type(mut self, investment_type: impl Into<String>) -> Self {
        self.investment_type = Some(investment_type.into());
        self
    }

    /// Name to resolve: the issuer, or the raw identifier when none was found.
    #[must_use]
    pub fn company_name(&self) -> &str {
        self.issuer_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.investment_id)
    }

    /// Returns true if any of fair value, cost or principal is present.
    #[must_use]
    pub const fn has_position_values(&self) -> bool {
        self.fair_value.is_some() || self.cost.is_some() || self.principal.is_some()
    }

    /// Returns true if statements disagreed on any field.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affiliation_labels() {
        assert_eq!(
            AffiliationTier::from_label("us-gaap:ControlledMember"),
            Some(AffiliationTier::Controlled)
        );
        assert_eq!(
            AffiliationTier::from_label("NoncontrolledAffiliatedMember"),
            Some(AffiliationTier::NonControlled)
        );
        assert_eq!(
            AffiliationTier::from_label("Non-controlled/affiliated investments"),
            Some(AffiliationTier::NonControlled)
        );
        assert_eq!(
            AffiliationTier::from_label("Non-controlled/non-affiliated investments"),
            Some(AffiliationTier::Unaffiliated)
        );
        assert_eq!(
            AffiliationTier::from_label("UnaffiliatedIssuerMember"),
            Some(AffiliationTier::Unaffiliated)
        );
        assert_eq!(AffiliationTier::from_label("SoftwareMember"), None);
    }

    #[test]
    fn test_company_name_falls_back_to_identifier() {
        let record = InvestmentRecord::new("Acme Corp, First lien", RecordSource::Dimensional);
        assert_eq!(record.company_name(), "Acme Corp, First lien");

        let record = record.with_issuer("Acme Corp");
        assert_eq!(record.company_name(), "Acme Corp");
    }
}
