//! Run and portfolio summaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use soi_core::{AssetClass, CanonicalEntity, Diagnostics, IssueKind, ResolvedRecord, Ticker};
use soi_resolve::StageCounts;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::extract::ExtractionPath;
use crate::pipeline::FilingReport;

/// Counts of a run, per issue kind and per stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Filings processed.
    pub filings: usize,
    /// Filings that yielded records from the dimensional path.
    pub dimensional_filings: usize,
    /// Filings that yielded records from HTML tables.
    pub html_filings: usize,
    /// Resolved records.
    pub records: usize,
    /// Records classified as Debt or Equity.
    pub classified: usize,
    /// Canonical entities.
    pub entities: usize,
    /// Entities created pending review.
    pub needs_review: usize,
    /// Issue counts for every kind, zeros included.
    pub issues: BTreeMap<IssueKind, usize>,
    /// Resolver stage counters.
    pub stages: StageCounts,
}

impl RunSummary {
    /// Summarizes a run.
    #[must_use]
    pub fn new(
        reports: &[FilingReport],
        records: &[ResolvedRecord],
        entities: &[CanonicalEntity],
        stages: &StageCounts,
        diagnostics: &Diagnostics,
    ) -> Self {
        let on_path = |path| reports.iter().filter(|r| r.path == path).count();
        Self {
            filings: reports.len(),
            dimensional_filings: on_path(ExtractionPath::Dimensional),
            html_filings: on_path(ExtractionPath::Html),
            records: records.len(),
            classified: records
                .iter()
                .filter(|r| r.asset_class.is_classified())
                .count(),
            entities: entities.len(),
            needs_review: entities.iter().filter(|e| e.needs_review).count(),
            issues: diagnostics.counts(),
            stages: *stages,
        }
    }

    /// Share of records classified as Debt or Equity, in `[0, 1]`.
    #[must_use]
    pub fn classification_rate(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.classified as f64 / self.records as f64
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "filings: {} ({} dimensional, {} html)",
            self.filings, self.dimensional_filings, self.html_filings
        )?;
        writeln!(
            f,
            "records: {} ({} classified, {:.1}%)",
            self.records,
            self.classified,
            self.classification_rate() * 100.0
        )?;
        writeln!(
            f,
            "entities: {} ({} need review)",
            self.entities, self.needs_review
        )?;
        writeln!(
            f,
            "resolution: {} identifier, {} exact, {} normalized, {} fuzzy, {} new, {} review",
            self.stages.identifier,
            self.stages.exact,
            self.stages.normalized,
            self.stages.fuzzy,
            self.stages.created,
            self.stages.review
        )?;
        for (kind, count) in &self.issues {
            writeln!(f, "  {kind}: {count}")?;
        }
        Ok(())
    }
}

/// Debt / equity totals of one filing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Filing BDC.
    pub filer: Ticker,
    /// Accession number.
    pub accession: String,
    /// Reporting period end.
    pub period_end: NaiveDate,
    /// Fair value of debt positions.
    pub debt_fair_value: f64,
    /// Cost of debt positions.
    pub debt_cost: f64,
    /// Number of debt positions.
    pub debt_positions: usize,
    /// Fair value of equity positions.
    pub equity_fair_value: f64,
    /// Cost of equity positions.
    pub equity_cost: f64,
    /// Number of equity positions.
    pub equity_positions: usize,
    /// Positions left unclassified.
    pub unclassified_positions: usize,
    /// Distinct portfolio companies.
    pub unique_issuers: usize,
}

impl PortfolioSummary {
    /// Total classified fair value.
    #[must_use]
    pub fn total_fair_value(&self) -> f64 {
        self.debt_fair_value + self.equity_fair_value
    }

    /// Debt share of classified fair value, `None` when there is none.
    #[must_use]
    pub fn debt_share(&self) -> Option<f64> {
        let total = self.total_fair_value();
        (total > 0.0).then(|| self.debt_fair_value / total)
    }
}

/// One summary per filing, in the order filings first appear in `records`.
#[must_use]
pub fn portfolio_summaries(records: &[ResolvedRecord]) -> Vec<PortfolioSummary> {
    let mut summaries: Vec<PortfolioSummary> = Vec::new();
    let mut issuers: Vec<BTreeSet<_>> = Vec::new();
    let mut index: BTreeMap<(&Ticker, &str), usize> = BTreeMap::new();

    for record in records {
        let slot = *index
            .entry((&record.filer, record.accession.as_str()))
            .or_insert_with(|| {
                summaries.push(PortfolioSummary {
                    filer: record.filer.clone(),
                    accession: record.accession.clone(),
                    period_end: record.period_end,
                    debt_fair_value: 0.0,
                    debt_cost: 0.0,
                    debt_positions: 0,
                    equity_fair_value: 0.0,
                    equity_cost: 0.0,
                    equity_positions: 0,
                    unclassified_positions: 0,
                    unique_issuers: 0,
                });
                issuers.push(BTreeSet::new());
                summaries.len() - 1
            });

        let summary = &mut summaries[slot];
        let fair_value = record.fair_value.unwrap_or(0.0);
        let cost = record.cost.unwrap_or(0.0);
        match record.asset_class {
            AssetClass::Debt => {
                summary.debt_fair_value += fair_value;
                summary.debt_cost += cost;
                summary.debt_positions += 1;
            }
            AssetClass::Equity => {
                summary.equity_fair_value += fair_value;
                summary.equity_cost += cost;
                summary.equity_positions += 1;
            }
            AssetClass::Unclassified => summary.unclassified_positions += 1,
        }
        issuers[slot].insert(record.entity);
        summary.unique_issuers = issuers[slot].len();
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use soi_core::{EntityId, InvestmentRecord, RecordSource, ResolutionMethod};

    fn record(
        ticker: &str,
        accession: &str,
        entity: u32,
        class: AssetClass,
        fair_value: f64,
    ) -> ResolvedRecord {
        let mut r = InvestmentRecord::new(format!("{accession}-{entity}"), RecordSource::Dimensional);
        r.asset_class = class;
        r.fair_value = Some(fair_value);
        r.cost = Some(fair_value);
        let e = CanonicalEntity::new(EntityId(entity), format!("Company {entity}"), "");
        ResolvedRecord::from_record(
            &Ticker::new(ticker),
            accession,
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            &r,
            &e,
            ResolutionMethod::New,
            1.0,
        )
    }

    #[test]
    fn test_portfolio_summary() {
        let records = vec![
            record("MAIN", "m-1", 1, AssetClass::Debt, 75.0),
            record("ARCC", "a-1", 1, AssetClass::Debt, 10.0),
            record("MAIN", "m-1", 1, AssetClass::Equity, 25.0),
            record("MAIN", "m-1", 2, AssetClass::Unclassified, 5.0),
        ];
        let summaries = portfolio_summaries(&records);

        assert_eq!(summaries.len(), 2);
        let main = &summaries[0];
        assert_eq!(main.filer.as_str(), "MAIN");
        assert!((main.debt_fair_value - 75.0).abs() < 1e-9);
        assert!((main.total_fair_value() - 100.0).abs() < 1e-9);
        assert!((main.debt_share().unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(main.unclassified_positions, 1);
        assert_eq!(main.unique_issuers, 2);
    }

    #[test]
    fn test_classification_rate_and_display() {
        let records = vec![
            record("MAIN", "m-1", 1, AssetClass::Debt, 1.0),
            record("MAIN", "m-1", 2, AssetClass::Equity, 1.0),
            record("MAIN", "m-1", 3, AssetClass::Equity, 1.0),
            record("MAIN", "m-1", 4, AssetClass::Unclassified, 1.0),
        ];
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(IssueKind::UnclassifiedAsset, "m-1-4");

        let summary = RunSummary::new(&[], &records, &[], &StageCounts::default(), &diagnostics);
        assert!((summary.classification_rate() - 0.75).abs() < 1e-9);
        assert_eq!(summary.issues[&IssueKind::UnclassifiedAsset], 1);
        assert_eq!(summary.issues[&IssueKind::MissingContext], 0);

        let text = summary.to_string();
        assert!(text.contains("4 (3 classified, 75.0%)"));
        assert!(text.contains("unclassified_asset: 1"));
    }

    #[test]
    fn test_empty_run_rate() {
        let summary = RunSummary::new(
            &[],
            &[],
            &[],
            &StageCounts::default(),
            &Diagnostics::new(),
        );
        assert!(summary.classification_rate().abs() < f64::EPSILON);
    }
}
