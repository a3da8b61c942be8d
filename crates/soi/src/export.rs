//! `polars` exports of resolved records, holding edges and entities.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use soi_core::{AssetClass, CanonicalEntity, HoldingEdge, ResolvedRecord, Result, SoiError};

/// `num_days_from_ce` of 1970-01-01; polars dates count days from there.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

fn date_column(name: &str, days: Vec<Option<i32>>) -> Result<Column> {
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(|e| SoiError::Other(e.to_string()))
}

fn amounts(records: &[ResolvedRecord], field: fn(&ResolvedRecord) -> Option<f64>) -> Vec<Option<f64>> {
    records.iter().map(field).collect()
}

/// One row per resolved record, in the downstream column layout.
///
/// # Errors
/// Returns an error if the frame cannot be assembled.
pub fn records_frame(records: &[ResolvedRecord]) -> Result<DataFrame> {
    let filers: Vec<&str> = records.iter().map(|r| r.filer.as_str()).collect();
    let accessions: Vec<&str> = records.iter().map(|r| r.accession.as_str()).collect();
    let periods: Vec<Option<i32>> = records.iter().map(|r| Some(epoch_days(r.period_end))).collect();
    let ids: Vec<&str> = records.iter().map(|r| r.investment_id.as_str()).collect();
    let entities: Vec<u32> = records.iter().map(|r| r.entity.0).collect();
    let canonical: Vec<&str> = records.iter().map(|r| r.canonical_name.as_str()).collect();
    let raw: Vec<&str> = records.iter().map(|r| r.raw_name.as_str()).collect();
    let methods: Vec<&str> = records.iter().map(|r| r.method.as_str()).collect();
    let confidences: Vec<f64> = records.iter().map(|r| r.confidence).collect();
    let types: Vec<Option<&str>> = records.iter().map(|r| r.investment_type.as_deref()).collect();
    let classes: Vec<&str> = records.iter().map(|r| r.asset_class.as_str()).collect();
    let maturities: Vec<Option<i32>> = records
        .iter()
        .map(|r| r.maturity_date.map(epoch_days))
        .collect();
    let industries: Vec<Option<&str>> = records.iter().map(|r| r.industry.as_deref()).collect();

    DataFrame::new(vec![
        Column::new("filer".into(), filers),
        Column::new("accession".into(), accessions),
        date_column("period_end", periods)?,
        Column::new("investment_id".into(), ids),
        Column::new("entity_id".into(), entities),
        Column::new("canonical_name".into(), canonical),
        Column::new("raw_name".into(), raw),
        Column::new("method".into(), methods),
        Column::new("confidence".into(), confidences),
        Column::new("investment_type".into(), types),
        Column::new("asset_class".into(), classes),
        Column::new("fair_value".into(), amounts(records, |r| r.fair_value)),
        Column::new("cost".into(), amounts(records, |r| r.cost)),
        Column::new("principal".into(), amounts(records, |r| r.principal)),
        Column::new("shares".into(), amounts(records, |r| r.shares)),
        Column::new("interest_rate".into(), amounts(records, |r| r.interest_rate)),
        Column::new("spread".into(), amounts(records, |r| r.spread)),
        date_column("maturity_date", maturities)?,
        Column::new("industry".into(), industries),
    ])
    .map_err(|e| SoiError::Other(e.to_string()))
}

/// One row per holding edge.
///
/// # Errors
/// Returns an error if the frame cannot be assembled.
pub fn edges_frame(edges: &[HoldingEdge]) -> Result<DataFrame> {
    let filers: Vec<&str> = edges.iter().map(|e| e.filer.as_str()).collect();
    let entities: Vec<u32> = edges.iter().map(|e| e.entity.0).collect();
    let periods: Vec<Option<i32>> = edges.iter().map(|e| Some(epoch_days(e.period_end))).collect();
    let fair_values: Vec<f64> = edges.iter().map(|e| e.fair_value).collect();
    let costs: Vec<f64> = edges.iter().map(|e| e.cost).collect();
    let positions: Vec<u64> = edges.iter().map(|e| e.position_count as u64).collect();
    let types: Vec<String> = edges
        .iter()
        .map(|e| e.investment_types.iter().map(String::as_str).collect::<Vec<_>>().join("; "))
        .collect();
    let classes: Vec<String> = edges
        .iter()
        .map(|e| e.asset_classes.iter().map(AssetClass::as_str).collect::<Vec<_>>().join("; "))
        .collect();

    DataFrame::new(vec![
        Column::new("filer".into(), filers),
        Column::new("entity_id".into(), entities),
        date_column("period_end", periods)?,
        Column::new("fair_value".into(), fair_values),
        Column::new("cost".into(), costs),
        Column::new("position_count".into(), positions),
        Column::new("investment_types".into(), types),
        Column::new("asset_classes".into(), classes),
    ])
    .map_err(|e| SoiError::Other(e.to_string()))
}

/// One row per canonical entity.
///
/// # Errors
/// Returns an error if the frame cannot be assembled.
pub fn entities_frame(entities: &[CanonicalEntity]) -> Result<DataFrame> {
    let ids: Vec<u32> = entities.iter().map(|e| e.id.0).collect();
    let names: Vec<&str> = entities.iter().map(|e| e.canonical_name.as_str()).collect();
    let normalized: Vec<&str> = entities.iter().map(|e| e.normalized_name.as_str()).collect();
    let variants: Vec<u64> = entities.iter().map(|e| e.variants.len() as u64).collect();
    let industries: Vec<Option<&str>> = entities.iter().map(|e| e.industry.as_deref()).collect();
    let identifiers: Vec<Option<&str>> = entities.iter().map(|e| e.identifier.as_deref()).collect();
    let review: Vec<bool> = entities.iter().map(|e| e.needs_review).collect();

    DataFrame::new(vec![
        Column::new("entity_id".into(), ids),
        Column::new("canonical_name".into(), names),
        Column::new("normalized_name".into(), normalized),
        Column::new("variants".into(), variants),
        Column::new("industry".into(), industries),
        Column::new("identifier".into(), identifiers),
        Column::new("needs_review".into(), review),
    ])
    .map_err(|e| SoiError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soi_core::{EntityId, InvestmentRecord, RecordSource, ResolutionMethod, Ticker};
    use std::collections::BTreeSet;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    }

    #[test]
    fn test_epoch_days() {
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 31).unwrap()), 30);
    }

    #[test]
    fn test_records_frame() {
        let entity = CanonicalEntity::new(EntityId(1), "Acme Corp", "acme");
        let mut record = InvestmentRecord::new("Acme Corp, First lien", RecordSource::Dimensional)
            .with_issuer("Acme Corp")
            .with_investment_type("First lien");
        record.asset_class = AssetClass::Debt;
        record.fair_value = Some(21_721_000.0);
        record.maturity_date = NaiveDate::from_ymd_opt(2029, 6, 30);
        let resolved = ResolvedRecord::from_record(
            &Ticker::new("ARCC"),
            "acc",
            date(),
            &record,
            &entity,
            ResolutionMethod::New,
            1.0,
        );

        let df = records_frame(&[resolved]).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 19);
        assert_eq!(df.column("period_end").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("maturity_date").unwrap().dtype(), &DataType::Date);
        let fair_value = df.column("fair_value").unwrap().f64().unwrap().get(0);
        assert_eq!(fair_value, Some(21_721_000.0));
        assert_eq!(df.column("cost").unwrap().null_count(), 1);
    }

    #[test]
    fn test_edges_and_entities_frames() {
        let edge = HoldingEdge {
            filer: Ticker::new("MAIN"),
            entity: EntityId(2),
            period_end: date(),
            fair_value: 10.0,
            cost: 9.0,
            position_count: 2,
            investment_types: BTreeSet::from(["Common stock".to_string(), "First lien".to_string()]),
            asset_classes: BTreeSet::from([AssetClass::Debt, AssetClass::Equity]),
        };
        let df = edges_frame(&[edge]).unwrap();
        assert_eq!(df.height(), 1);
        let classes = df.column("asset_classes").unwrap().str().unwrap().get(0);
        assert_eq!(classes, Some("Debt; Equity"));

        let entities = vec![
            CanonicalEntity::new(EntityId(1), "Acme Corp", "acme"),
            CanonicalEntity::new(EntityId(2), "Beta LLC", "beta"),
        ];
        let df = entities_frame(&entities).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("identifier").unwrap().null_count(), 2);
    }

    #[test]
    fn test_empty_frames() {
        assert_eq!(records_frame(&[]).unwrap().height(), 0);
        assert_eq!(edges_frame(&[]).unwrap().height(), 0);
    }
}
