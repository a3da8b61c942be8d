//! Cross-filer overlap and concentration over resolved records.
//!
//! Everything here is a read-only reduction. Records are first folded into
//! [`HoldingEdge`]s, one per (filer, entity, period); overlap and
//! concentration then work on each filer's latest period only, so that a
//! filer reporting several quarters is not counted several times.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use soi_core::{AggregationConfig, CanonicalEntity, EntityId, HoldingEdge, ResolvedRecord, Ticker};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use soi_resolve::UNKNOWN_SECTOR;

/// An entity held by at least `min_holders` filers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommonHolding {
    /// Portfolio company.
    pub entity: EntityId,
    /// Canonical name.
    pub canonical_name: String,
    /// Holding filers, sorted.
    pub holders: Vec<Ticker>,
    /// Fair value across holders.
    pub total_fair_value: f64,
}

/// How much of one filer's book is shared with other filers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilerOverlap {
    /// Filer.
    pub filer: Ticker,
    /// Distinct entities held.
    pub total_entities: usize,
    /// Entities also held by another filer.
    pub shared_entities: usize,
    /// `shared_entities / total_entities`, as a percentage.
    pub pct_shared: f64,
}

/// Overlap between filers' portfolios.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlapAnalysis {
    /// Fair value by entity, then by filer.
    pub holdings: BTreeMap<EntityId, BTreeMap<Ticker, f64>>,
    /// Entities with enough holders, most held first.
    pub common: Vec<CommonHolding>,
    /// Number of entities each pair of filers both hold. Symmetric; the
    /// diagonal is each filer's own entity count.
    pub shared: BTreeMap<(Ticker, Ticker), usize>,
    /// Per-filer overlap, by ticker.
    pub filers: Vec<FilerOverlap>,
}

/// Fair value share of one industry within a filer's book.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndustryShare {
    /// Industry label.
    pub industry: String,
    /// Fair value in the industry.
    pub fair_value: f64,
    /// Share of the filer's fair value.
    pub share: f64,
}

/// Concentration statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationMetrics {
    /// Distinct entities held by anyone.
    pub unique_entities: usize,
    /// Filer-entity positions.
    pub total_positions: usize,
    /// Mean number of holders per entity.
    pub avg_holders_per_entity: f64,
    /// Share of entities held by at least `min_holders` filers.
    pub concentration_rate: f64,
    /// Industry breakdown per filer, largest first.
    pub industries: BTreeMap<Ticker, Vec<IndustryShare>>,
    /// Herfindahl index of fair value across entities, per filer, in `[0, 1]`.
    pub herfindahl: BTreeMap<Ticker, f64>,
}

/// Builds holding edges and the overlap and concentration views.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    /// Creates an aggregator.
    #[must_use]
    pub const fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Folds records into one edge per (filer, entity, period).
    ///
    /// Unclassified records carry no asset class to report and are left out.
    #[must_use]
    pub fn edges(&self, records: &[ResolvedRecord]) -> Vec<HoldingEdge> {
        let mut edges: BTreeMap<(Ticker, EntityId, NaiveDate), HoldingEdge> = BTreeMap::new();
        for record in records.iter().filter(|r| r.asset_class.is_classified()) {
            let edge = edges
                .entry((record.filer.clone(), record.entity, record.period_end))
                .or_insert_with(|| HoldingEdge {
                    filer: record.filer.clone(),
                    entity: record.entity,
                    period_end: record.period_end,
                    fair_value: 0.0,
                    cost: 0.0,
                    position_count: 0,
                    investment_types: BTreeSet::new(),
                    asset_classes: BTreeSet::new(),
                });
            edge.fair_value += record.fair_value.unwrap_or(0.0);
            edge.cost += record.cost.unwrap_or(0.0);
            edge.position_count += 1;
            if let Some(kind) = &record.investment_type {
                edge.investment_types.insert(kind.clone());
            }
            edge.asset_classes.insert(record.asset_class);
        }
        debug!(edges = edges.len(), "Holding edges built");
        edges.into_values().collect()
    }

    /// Portfolio overlap between filers.
    #[must_use]
    pub fn overlap(&self, edges: &[HoldingEdge], entities: &[CanonicalEntity]) -> OverlapAnalysis {
        let latest = latest_edges(edges);
        let names: HashMap<EntityId, &str> = entities
            .iter()
            .map(|e| (e.id, e.canonical_name.as_str()))
            .collect();

        let mut holdings: BTreeMap<EntityId, BTreeMap<Ticker, f64>> = BTreeMap::new();
        let mut books: BTreeMap<Ticker, BTreeSet<EntityId>> = BTreeMap::new();
        for edge in &latest {
            *holdings
                .entry(edge.entity)
                .or_default()
                .entry(edge.filer.clone())
                .or_insert(0.0) += edge.fair_value;
            books
                .entry(edge.filer.clone())
                .or_default()
                .insert(edge.entity);
        }

        let min_holders = self.config.min_holders.max(1);
        let mut common: Vec<CommonHolding> = holdings
            .iter()
            .filter(|(_, by_filer)| by_filer.len() >= min_holders)
            .map(|(entity, by_filer)| CommonHolding {
                entity: *entity,
                canonical_name: names.get(entity).copied().unwrap_or_default().to_string(),
                holders: by_filer.keys().cloned().collect(),
                total_fair_value: by_filer.values().sum(),
            })
            .collect();
        common.sort_by(|a, b| {
            b.holders
                .len()
                .cmp(&a.holders.len())
                .then(b.total_fair_value.total_cmp(&a.total_fair_value))
                .then(a.entity.cmp(&b.entity))
        });

        let mut shared = BTreeMap::new();
        for (a, book_a) in &books {
            for (b, book_b) in &books {
                shared.insert(
                    (a.clone(), b.clone()),
                    book_a.intersection(book_b).count(),
                );
            }
        }

        let filers = books
            .iter()
            .map(|(filer, book)| {
                let shared_entities = book
                    .iter()
                    .filter(|entity| holdings.get(entity).is_some_and(|h| h.len() > 1))
                    .count();
                FilerOverlap {
                    filer: filer.clone(),
                    total_entities: book.len(),
                    shared_entities,
                    pct_shared: percent(shared_entities, book.len()),
                }
            })
            .collect();

        OverlapAnalysis {
            holdings,
            common,
            shared,
            filers,
        }
    }

    /// Concentration statistics.
    ///
    /// Industries come from the entities; entities without one are grouped
    /// under "Unknown".
    #[must_use]
    pub fn concentration(
        &self,
        edges: &[HoldingEdge],
        entities: &[CanonicalEntity],
    ) -> ConcentrationMetrics {
        let latest = latest_edges(edges);
        if latest.is_empty() {
            return ConcentrationMetrics::default();
        }
        let industry_of: HashMap<EntityId, &str> = entities
            .iter()
            .filter_map(|e| e.industry.as_deref().map(|i| (e.id, i)))
            .collect();

        let mut holders: BTreeMap<EntityId, BTreeSet<&Ticker>> = BTreeMap::new();
        let mut by_filer: BTreeMap<Ticker, Vec<&HoldingEdge>> = BTreeMap::new();
        for &edge in &latest {
            holders.entry(edge.entity).or_default().insert(&edge.filer);
            by_filer.entry(edge.filer.clone()).or_default().push(edge);
        }

        let unique_entities = holders.len();
        let total_positions = latest.len();
        let min_holders = self.config.min_holders.max(1);
        let concentrated = holders.values().filter(|h| h.len() >= min_holders).count();

        let mut industries = BTreeMap::new();
        let mut herfindahl = BTreeMap::new();
        for (filer, book) in by_filer {
            let total: f64 = book.iter().map(|e| e.fair_value.max(0.0)).sum();

            let mut sectors: BTreeMap<&str, f64> = BTreeMap::new();
            for edge in &book {
                let sector = industry_of.get(&edge.entity).copied().unwrap_or(UNKNOWN_SECTOR);
                *sectors.entry(sector).or_insert(0.0) += edge.fair_value.max(0.0);
            }
            let mut shares: Vec<IndustryShare> = sectors
                .into_iter()
                .map(|(industry, fair_value)| IndustryShare {
                    industry: industry.to_string(),
                    fair_value,
                    share: if total > 0.0 { fair_value / total } else { 0.0 },
                })
                .collect();
            shares.sort_by(|a, b| {
                b.fair_value
                    .total_cmp(&a.fair_value)
                    .then_with(|| a.industry.cmp(&b.industry))
            });

            let hhi = if total > 0.0 {
                book.iter()
                    .map(|e| (e.fair_value.max(0.0) / total).powi(2))
                    .sum()
            } else {
                0.0
            };

            industries.insert(filer.clone(), shares);
            herfindahl.insert(filer, hhi);
        }

        ConcentrationMetrics {
            unique_entities,
            total_positions,
            avg_holders_per_entity: total_positions as f64 / unique_entities as f64,
            concentration_rate: concentrated as f64 / unique_entities as f64,
            industries,
            herfindahl,
        }
    }
}

/// Edges of each filer's most recent period.
fn latest_edges(edges: &[HoldingEdge]) -> Vec<&HoldingEdge> {
    let mut latest: HashMap<&Ticker, NaiveDate> = HashMap::new();
    for edge in edges {
        let period = latest.entry(&edge.filer).or_insert(edge.period_end);
        if edge.period_end > *period {
            *period = edge.period_end;
        }
    }
    edges
        .iter()
        .filter(|e| latest.get(&e.filer) == Some(&e.period_end))
        .collect()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soi_core::{AssetClass, InvestmentRecord, RecordSource, ResolutionMethod};

    fn date(month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, 30).unwrap()
    }

    fn entity(id: u32, name: &str, industry: Option<&str>) -> CanonicalEntity {
        let mut e = CanonicalEntity::new(EntityId(id), name, name.to_lowercase());
        e.industry = industry.map(str::to_string);
        e
    }

    fn record(
        ticker: &str,
        entity: &CanonicalEntity,
        month: u32,
        kind: &str,
        class: AssetClass,
        fair_value: f64,
    ) -> ResolvedRecord {
        let id = format!("{}, {kind}", entity.canonical_name);
        let mut r = InvestmentRecord::new(id, RecordSource::Dimensional).with_investment_type(kind);
        r.asset_class = class;
        r.fair_value = Some(fair_value);
        r.cost = Some(fair_value);
        ResolvedRecord::from_record(
            &Ticker::new(ticker),
            "acc",
            date(month),
            &r,
            entity,
            ResolutionMethod::New,
            1.0,
        )
    }

    fn fixture() -> (Vec<CanonicalEntity>, Vec<ResolvedRecord>) {
        let acme = entity(1, "Acme", Some("Software/Technology"));
        let beta = entity(2, "Beta", Some("Healthcare Services"));
        let gamma = entity(3, "Gamma", None);
        let records = vec![
            record("ARCC", &acme, 9, "First lien", AssetClass::Debt, 60.0),
            record("ARCC", &acme, 9, "Common stock", AssetClass::Equity, 20.0),
            record("ARCC", &beta, 9, "First lien", AssetClass::Debt, 20.0),
            record("MAIN", &acme, 9, "Second lien", AssetClass::Debt, 50.0),
            record("MAIN", &gamma, 9, "Warrants", AssetClass::Equity, 50.0),
            record("MAIN", &gamma, 9, "Unknown", AssetClass::Unclassified, 999.0),
            // Older period, superseded by September.
            record("MAIN", &beta, 6, "First lien", AssetClass::Debt, 10.0),
        ];
        (vec![acme, beta, gamma], records)
    }

    #[test]
    fn test_edges_fold_positions() {
        let (_, records) = fixture();
        let edges = Aggregator::default().edges(&records);

        assert_eq!(edges.len(), 5);
        let arcc_acme = &edges[0];
        assert_eq!(arcc_acme.filer.as_str(), "ARCC");
        assert_eq!(arcc_acme.position_count, 2);
        assert!((arcc_acme.fair_value - 80.0).abs() < 1e-9);
        assert_eq!(arcc_acme.asset_classes.len(), 2);
        // The unclassified Gamma position adds nothing.
        let main_gamma = edges.iter().find(|e| e.entity == EntityId(3)).unwrap();
        assert!((main_gamma.fair_value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_overlap_uses_latest_period() {
        let (entities, records) = fixture();
        let aggregator = Aggregator::default();
        let overlap = aggregator.overlap(&aggregator.edges(&records), &entities);

        // Beta is held by MAIN only in June, so only Acme is common.
        assert_eq!(overlap.common.len(), 1);
        assert_eq!(overlap.common[0].canonical_name, "Acme");
        assert!((overlap.common[0].total_fair_value - 130.0).abs() < 1e-9);

        let key = (Ticker::new("ARCC"), Ticker::new("MAIN"));
        assert_eq!(overlap.shared[&key], 1);
        let arcc = &overlap.filers[0];
        assert_eq!(arcc.total_entities, 2);
        assert_eq!(arcc.shared_entities, 1);
        assert!((arcc.pct_shared - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_concentration() {
        let (entities, records) = fixture();
        let aggregator = Aggregator::default();
        let metrics = aggregator.concentration(&aggregator.edges(&records), &entities);

        assert_eq!(metrics.unique_entities, 3);
        assert_eq!(metrics.total_positions, 4);
        assert!((metrics.avg_holders_per_entity - 4.0 / 3.0).abs() < 1e-9);
        assert!((metrics.concentration_rate - 1.0 / 3.0).abs() < 1e-9);

        // ARCC: 80 / 100 and 20 / 100.
        let arcc = Ticker::new("ARCC");
        assert!((metrics.herfindahl[&arcc] - 0.68).abs() < 1e-9);
        assert_eq!(metrics.industries[&arcc][0].industry, "Software/Technology");
        assert!((metrics.industries[&arcc][0].share - 0.8).abs() < 1e-9);

        let main = Ticker::new("MAIN");
        assert!(metrics.industries[&main].iter().any(|s| s.industry == UNKNOWN_SECTOR));
    }

    #[test]
    fn test_empty_input() {
        let aggregator = Aggregator::default();
        assert!(aggregator.edges(&[]).is_empty());
        assert_eq!(aggregator.concentration(&[], &[]), ConcentrationMetrics::default());
        assert!(aggregator.overlap(&[], &[]).common.is_empty());
    }
}
