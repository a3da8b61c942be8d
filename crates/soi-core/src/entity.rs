//! Resolved portfolio-company identities and their holdings.
//!
//! - [`CanonicalEntity`] - A portfolio company as seen across all filers
//! - [`HoldingEdge`] - One filer's aggregate exposure to one entity in one period
//! - [`ResolvedRecord`] - The flat row handed to downstream sinks

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::record::{AssetClass, InvestmentRecord};
use crate::types::Ticker;

/// Run-scoped identifier of a canonical entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:06}", self.0)
    }
}

/// Stage that attached a name to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResolutionMethod {
    /// Matched on an external identifier.
    Identifier,
    /// Verbatim match of the canonical name or a known variant.
    Exact,
    /// Match after deterministic name normalization.
    Normalized,
    /// Token-set similarity at or above the auto-accept threshold.
    Fuzzy,
    /// First sighting; the name founded a new entity.
    New,
}

impl ResolutionMethod {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Fuzzy => "fuzzy",
            Self::New => "new",
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw name known to denote an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NameVariant {
    /// Name as it appeared in the filing.
    pub raw: String,
    /// How it was attached.
    pub method: ResolutionMethod,
    /// Match confidence in `[0, 1]`.
    pub confidence: f64,
}

/// The resolved identity of a portfolio company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    /// Run-scoped id.
    pub id: EntityId,
    /// Name of the first sighting.
    pub canonical_name: String,
    /// Normalized form of the canonical name.
    pub normalized_name: String,
    /// Every raw name attached so far, the canonical name first.
    pub variants: Vec<NameVariant>,
    /// External identifier, if one was supplied.
    pub identifier: Option<String>,
    /// Industry classification.
    pub industry: Option<String>,
    /// Set when the entity was created from a name that fuzzily resembled
    /// another entity but fell short of auto-acceptance.
    pub needs_review: bool,
}

impl CanonicalEntity {
    /// Creates an entity founded by `name`.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, normalized_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            variants: vec![NameVariant {
                raw: name.clone(),
                method: ResolutionMethod::New,
                confidence: 1.0,
            }],
            canonical_name: name,
            normalized_name: normalized_name.into(),
            identifier: None,
            industry: None,
            needs_review: false,
        }
    }

    /// Returns true if `raw` is the canonical name or a known variant.
    #[must_use]
    pub fn knows(&self, raw: &str) -> bool {
        self.variants.iter().any(|v| v.raw == raw)
    }

    /// Attaches a new raw name; known names are ignored.
    pub fn add_variant(&mut self, raw: impl Into<String>, method: ResolutionMethod, confidence: f64) {
        let raw = raw.into();
        if !self.knows(&raw) {
            self.variants.push(NameVariant {
                raw,
                method,
                confidence,
            });
        }
    }
}

/// One filer's exposure to one entity in one reporting period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldingEdge {
    /// Filing BDC.
    pub filer: Ticker,
    /// Portfolio company.
    pub entity: EntityId,
    /// Reporting period end.
    pub period_end: NaiveDate,
    /// Sum of position fair values.
    pub fair_value: f64,
    /// Sum of position costs.
    pub cost: f64,
    /// Number of positions.
    pub position_count: usize,
    /// Distinct investment type texts.
    pub investment_types: BTreeSet<String>,
    /// Asset classes present.
    pub asset_classes: BTreeSet<AssetClass>,
}

/// Flat downstream row: one classified, resolved position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    /// Filing BDC.
    pub filer: Ticker,
    /// Filing accession number.
    pub accession: String,
    /// Reporting period end.
    pub period_end: NaiveDate,
    /// Filing-scoped investment identifier.
    pub investment_id: String,
    /// Canonical entity id.
    pub entity: EntityId,
    /// Canonical entity name.
    pub canonical_name: String,
    /// Raw name the resolver saw.
    pub raw_name: String,
    /// Resolution stage.
    pub method: ResolutionMethod,
    /// Resolution confidence.
    pub confidence: f64,
    /// Investment type text.
    pub investment_type: Option<String>,
    /// Asset class.
    pub asset_class: AssetClass,
    /// Fair value in dollars.
    pub fair_value: Option<f64>,
    /// Amortized cost in dollars.
    pub cost: Option<f64>,
    /// Principal in dollars.
    pub principal: Option<f64>,
    /// Shares or units.
    pub shares: Option<f64>,
    /// Interest rate.
    pub interest_rate: Option<f64>,
    /// Spread.
    pub spread: Option<f64>,
    /// Maturity date.
    pub maturity_date: Option<NaiveDate>,
    /// Industry tag.
    pub industry: Option<String>,
}

impl ResolvedRecord {
    /// Builds the downstream row from a record and its resolution.
    #[must_use]
    pub fn from_record(
        filer: &Ticker,
        accession: &str,
        period_end: NaiveDate,
        record: &InvestmentRecord,
        entity: &CanonicalEntity,
        method: ResolutionMethod,
        confidence: f64,
    ) -> Self {
        Self {
            filer: filer.clone(),
            accession: accession.to_string(),
            period_end: record.period_end.unwrap_or(period_end),
            investment_id: record.investment_id.clone(),
            entity: entity.id,
            canonical_name: entity.canonical_name.clone(),
            raw_name: record.company_name().to_string(),
            method,
            confidence,
            investment_type: record.investment_type.clone(),
            asset_class: record.asset_class,
            fair_value: record.fair_value,
            cost: record.cost,
            principal: record.principal,
            shares: record.shares,
            interest_rate: record.interest_rate,
            spread: record.spread,
            maturity_date: record.maturity_date,
            industry: record.industry.clone().or_else(|| entity.industry.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId(42).to_string(), "E000042");
    }

    #[test]
    fn test_variants_are_unique() {
        let mut entity = CanonicalEntity::new(EntityId(1), "Acme Corp", "acme");
        entity.add_variant("Acme Corp", ResolutionMethod::Exact, 1.0);
        entity.add_variant("ACME Corp.", ResolutionMethod::Normalized, 0.99);
        assert_eq!(entity.variants.len(), 2);
        assert!(entity.knows("ACME Corp."));
        assert_eq!(entity.variants[0].method, ResolutionMethod::New);
    }
}
