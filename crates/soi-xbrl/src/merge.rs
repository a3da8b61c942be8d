//! Statement merge: one investment record per identifier.
//!
//! No single statement carries every field. Each field takes the value of the
//! most specific statement that reported it:
//!
//! | Field      | Preference                                          |
//! |------------|-----------------------------------------------------|
//! | fair value | balance sheet, schedule, parenthetical, other       |
//! | cost       | parenthetical, schedule, balance sheet, other       |
//! | all others | schedule, balance sheet, parenthetical, other       |
//!
//! Values from other statements that disagree with the chosen one are kept as
//! a [`FieldConflict`].

use chrono::NaiveDate;
use std::collections::BTreeMap;
use soi_core::{
    AffiliationTier, Diagnostics, FactValue, FieldConflict, InvestmentRecord, IssueKind,
    RecordSource, SourcedValue, StatementKind,
};
use tracing::{debug, trace};

use crate::identifier::{parse_enum_uri, parse_identifier};
use crate::join::{Candidate, PartialRecord, Slots};
use crate::vocabulary::{Field, field_for};

const FAIR_VALUE_PREFERENCE: [StatementKind; 4] = [
    StatementKind::BalanceSheet,
    StatementKind::ScheduleOfInvestments,
    StatementKind::BalanceSheetParenthetical,
    StatementKind::Other,
];

const COST_PREFERENCE: [StatementKind; 4] = [
    StatementKind::BalanceSheetParenthetical,
    StatementKind::ScheduleOfInvestments,
    StatementKind::BalanceSheet,
    StatementKind::Other,
];

const DEFAULT_PREFERENCE: [StatementKind; 4] = [
    StatementKind::ScheduleOfInvestments,
    StatementKind::BalanceSheet,
    StatementKind::BalanceSheetParenthetical,
    StatementKind::Other,
];

fn preference(field: Option<Field>) -> &'static [StatementKind; 4] {
    match field {
        Some(Field::FairValue) => &FAIR_VALUE_PREFERENCE,
        Some(Field::Cost) => &COST_PREFERENCE,
        _ => &DEFAULT_PREFERENCE,
    }
}

/// Merges a partial record into an investment record.
///
/// Fields come from the latest period end; values of earlier period ends go
/// to [`InvestmentRecord::comparative`]. Conflicts are reported to
/// `diagnostics` as [`IssueKind::ConflictingField`].
/// Issuer, industry and investment type fall back to the components of the
/// identifier when not tagged.
#[must_use]
pub fn merge_statements(partial: &PartialRecord, diagnostics: &mut Diagnostics) -> InvestmentRecord {
    let mut record = InvestmentRecord::new(&partial.investment_id, RecordSource::Dimensional);
    record.period_end = partial.period_end;
    record.activity = partial
        .activity
        .iter()
        .map(|(key, activity)| (key.clone(), activity.value))
        .collect();

    for period_end in partial.earlier_periods() {
        let Some(slots) = partial.slots_at(period_end) else {
            continue;
        };
        let values: BTreeMap<String, FactValue> = slots
            .iter()
            .filter_map(|(concept, by_statement)| {
                choose(field_for(concept), by_statement)
                    .map(|(_, value)| (concept.clone(), value.clone()))
            })
            .collect();
        trace!(
            investment_id = %partial.investment_id,
            %period_end,
            concepts = values.len(),
            "Comparative period kept apart"
        );
        record.comparative.insert(period_end, values);
    }

    let empty = Slots::new();
    let current = partial.current().unwrap_or(&empty);
    for (concept, by_statement) in current {
        let field = field_for(concept);
        let Some(chosen) = choose(field, by_statement) else {
            continue;
        };

        let others: Vec<SourcedValue> = by_statement
            .iter()
            .filter(|(statement, candidate)| {
                **statement != chosen.0 && !candidate.value.same_as(chosen.1)
            })
            .map(|(statement, candidate)| SourcedValue {
                statement: *statement,
                value: candidate.value.clone(),
            })
            .collect();

        if !others.is_empty() {
            debug!(
                investment_id = %partial.investment_id,
                concept = %concept,
                chosen = %chosen.1,
                "Statements disagree"
            );
            diagnostics.push(
                IssueKind::ConflictingField,
                format!("{}: {}", partial.investment_id, concept),
            );
            record.conflicts.push(FieldConflict {
                concept: concept.clone(),
                chosen: SourcedValue {
                    statement: chosen.0,
                    value: chosen.1.clone(),
                },
                others,
            });
        }

        match field {
            Some(field) => apply(&mut record, field, chosen.1),
            None => {
                record.extra.insert(concept.clone(), chosen.1.clone());
            }
        }
    }

    let affiliation_tagged = current
        .keys()
        .any(|concept| field_for(concept) == Some(Field::Affiliation));
    if !affiliation_tagged
        && let Some(tier) = partial
            .members
            .iter()
            .find_map(|m| AffiliationTier::from_label(m))
    {
        record.affiliation = tier;
    }

    let parsed = parse_identifier(&partial.investment_id);
    if record.issuer_name.is_none() && !parsed.company.is_empty() {
        record.issuer_name = Some(parsed.company);
    }
    if record.industry.is_none() {
        record.industry = parsed.industry;
    }
    if record.investment_type.is_none() {
        record.investment_type = parsed.instrument;
    }
    record.position = parsed.position;

    record
}

fn choose(
    field: Option<Field>,
    by_statement: &BTreeMap<StatementKind, Candidate>,
) -> Option<(StatementKind, &FactValue)> {
    preference(field)
        .iter()
        .find_map(|s| by_statement.get(s).map(|c| (*s, &c.value)))
}

fn apply(record: &mut InvestmentRecord, field: Field, value: &FactValue) {
    if field.is_enumeration() {
        let Some(text) = value.as_text().map(parse_enum_uri) else {
            trace!(?field, "Numeric value for enumeration field");
            return;
        };
        match field {
            Field::IssuerName => record.issuer_name = Some(text),
            Field::InvestmentType => record.investment_type = Some(text),
            Field::Industry => record.industry = Some(text),
            Field::RateType => record.rate_type = Some(text),
            Field::Affiliation => {
                if let Some(tier) = AffiliationTier::from_label(&text) {
                    record.affiliation = tier;
                }
            }
            _ => {}
        }
        return;
    }

    match field {
        Field::MaturityDate => record.maturity_date = parse_date(value),
        Field::AcquisitionDate => record.acquisition_date = parse_date(value),
        _ => {
            let number = value.as_f64();
            let slot = match field {
                Field::FairValue => &mut record.fair_value,
                Field::Cost => &mut record.cost,
                Field::Principal => &mut record.principal,
                Field::Shares => &mut record.shares,
                Field::InterestRate => &mut record.interest_rate,
                Field::Spread => &mut record.spread,
                Field::Floor => &mut record.floor,
                Field::PikRate => &mut record.pik_rate,
                Field::CashRate => &mut record.cash_rate,
                Field::PctNetAssets => &mut record.pct_net_assets,
                _ => return,
            };
            *slot = number;
        }
    }
}

fn parse_date(value: &FactValue) -> Option<NaiveDate> {
    let text = value.as_text()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::join_facts;
    use soi_core::{Dimension, ExtractionConfig, FilingFacts, Period, ReportingContext, TaggedFact};

    fn facts_for(identifier: &str, facts: Vec<TaggedFact>) -> FilingFacts {
        let mut filing = FilingFacts::new();
        filing.contexts.push(
            ReportingContext::new(
                "c",
                Period::Instant(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            )
            .with_dimension(Dimension::typed("InvestmentIdentifierAxis", identifier))
            .with_dimension(Dimension::explicit(
                "us-gaap:InvestmentIssuerAffiliationAxis",
                "us-gaap:NoncontrolledAffiliatedMember",
            )),
        );
        filing.facts = facts;
        filing
    }

    fn merged(filing: &FilingFacts) -> (InvestmentRecord, Diagnostics) {
        let joined = join_facts(filing, &ExtractionConfig::default());
        let mut diagnostics = Diagnostics::new();
        let record = merge_statements(&joined.records[0], &mut diagnostics);
        (record, diagnostics)
    }

    #[test]
    fn test_fair_value_prefers_balance_sheet() {
        let filing = facts_for(
            "Acme Corp, Software 1",
            vec![
                TaggedFact::new("InvestmentOwnedAtFairValue", 100.0, "c"),
                TaggedFact::new("InvestmentOwnedAtFairValue", 101.0, "c")
                    .in_statement(StatementKind::BalanceSheet),
                TaggedFact::new("InvestmentOwnedAtCost", 90.0, "c"),
                TaggedFact::new("InvestmentOwnedAtCost", 90.0, "c")
                    .in_statement(StatementKind::BalanceSheetParenthetical),
            ],
        );
        let (record, diagnostics) = merged(&filing);

        assert_eq!(record.fair_value, Some(101.0));
        assert_eq!(record.cost, Some(90.0));
        assert_eq!(record.conflicts.len(), 1);
        let conflict = &record.conflicts[0];
        assert_eq!(conflict.concept, "InvestmentOwnedAtFairValue");
        assert_eq!(conflict.chosen.statement, StatementKind::BalanceSheet);
        assert_eq!(conflict.others[0].value, FactValue::Numeric(100.0));
        assert_eq!(diagnostics.count(IssueKind::ConflictingField), 1);
    }

    #[test]
    fn test_enumerations_and_identifier_fallback() {
        let filing = facts_for(
            "Acme Corp, Software 2",
            vec![
                TaggedFact::new(
                    "us-gaap:InvestmentTypeExtensibleEnumeration",
                    "http://fasb.org/us-gaap/2024#SeniorSecuredLoansFirstLienMember",
                    "c",
                ),
                TaggedFact::new("InvestmentMaturityDate", "2029-06-30", "c"),
                TaggedFact::new("ext:UnfundedCommitment", 5.0, "c"),
            ],
        );
        let (record, diagnostics) = merged(&filing);

        assert_eq!(
            record.investment_type.as_deref(),
            Some("Senior Secured Loans First Lien")
        );
        assert_eq!(record.issuer_name.as_deref(), Some("Acme Corp"));
        assert_eq!(record.industry.as_deref(), Some("Software"));
        assert_eq!(record.position, Some(2));
        assert_eq!(
            record.maturity_date,
            NaiveDate::from_ymd_opt(2029, 6, 30)
        );
        assert_eq!(
            record.extra.get("UnfundedCommitment"),
            Some(&FactValue::Numeric(5.0))
        );
        assert_eq!(record.affiliation, AffiliationTier::NonControlled);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_tagged_issuer_wins_over_identifier() {
        let filing = facts_for(
            "ACME CORP, Software",
            vec![TaggedFact::new(
                "InvestmentIssuerNameExtensibleEnumeration",
                "http://www.arcc.com/20241231#AcmeCorporationMember",
                "c",
            )],
        );
        let (record, _) = merged(&filing);
        assert_eq!(record.issuer_name.as_deref(), Some("Acme Corporation"));
    }

    #[test]
    fn test_comparative_period_kept_out_of_fields() {
        let current = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let prior = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let mut filing = facts_for(
            "Acme Corp, Software 1",
            vec![
                TaggedFact::new("InvestmentOwnedAtFairValue", 200.0, "c"),
                TaggedFact::new("InvestmentOwnedAtFairValue", 100.0, "prior"),
                TaggedFact::new("InvestmentOwnedAtCost", 90.0, "prior"),
            ],
        );
        filing.contexts.push(
            ReportingContext::new("prior", Period::Instant(prior)).with_dimension(
                Dimension::typed("InvestmentIdentifierAxis", "Acme Corp, Software 1"),
            ),
        );
        let (record, diagnostics) = merged(&filing);

        assert_eq!(record.period_end, Some(current));
        assert_eq!(record.fair_value, Some(200.0));
        assert_eq!(record.cost, None);
        assert!(record.conflicts.is_empty());
        assert!(diagnostics.is_empty());
        let earlier = &record.comparative[&prior];
        assert_eq!(
            earlier.get("InvestmentOwnedAtFairValue"),
            Some(&FactValue::Numeric(100.0))
        );
        assert_eq!(earlier.get("InvestmentOwnedAtCost"), Some(&FactValue::Numeric(90.0)));
    }
}
