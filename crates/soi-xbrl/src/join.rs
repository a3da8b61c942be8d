//! Fact/context join: per-identifier partial records.

use chrono::NaiveDate;
use soi_core::{
    ContextScope, Diagnostics, DuplicateFactPolicy, ExtractionConfig, FactValue, FilingFacts,
    IssueKind, Period, PeriodKind, SoiError, StatementKind, TaggedFact,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use crate::vocabulary::activity_key;

/// A value for one (identifier, concept, statement) slot and how it got there.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) value: FactValue,
    reported_on: Option<NaiveDate>,
}

/// Concept → statement → value, for one period end.
pub(crate) type Slots = BTreeMap<String, BTreeMap<StatementKind, Candidate>>;

/// A roll-forward value and the span it covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivityValue {
    /// First day of the span.
    pub start: NaiveDate,
    /// Last day of the span.
    pub end: NaiveDate,
    /// Reported value.
    pub value: f64,
}

impl ActivityValue {
    fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Facts of one investment identifier, not yet merged across statements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartialRecord {
    /// Filing-scoped identifier.
    pub investment_id: String,
    /// Latest instant date seen.
    pub period_end: Option<NaiveDate>,
    /// Instant values by period end.
    pub(crate) periods: BTreeMap<NaiveDate, Slots>,
    /// Duration facts by activity key. The longest span wins, so a 10-Q
    /// keeps the year-to-date figure over the quarter.
    pub activity: BTreeMap<String, ActivityValue>,
    /// Explicit dimension members of the record's contexts.
    pub members: Vec<String>,
}

impl PartialRecord {
    fn new(investment_id: &str) -> Self {
        Self {
            investment_id: investment_id.to_string(),
            ..Self::default()
        }
    }

    /// Value of a concept reported by a statement for the latest period end.
    #[must_use]
    pub fn value(&self, concept: &str, statement: StatementKind) -> Option<&FactValue> {
        self.period_end
            .and_then(|end| self.value_at(end, concept, statement))
    }

    /// Value of a concept reported by a statement for a given period end.
    #[must_use]
    pub fn value_at(
        &self,
        period_end: NaiveDate,
        concept: &str,
        statement: StatementKind,
    ) -> Option<&FactValue> {
        self.periods
            .get(&period_end)
            .and_then(|slots| slots.get(concept))
            .and_then(|by_statement| by_statement.get(&statement))
            .map(|c| &c.value)
    }

    /// Earlier period ends that reported instant values.
    pub fn earlier_periods(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.periods
            .keys()
            .copied()
            .filter(move |d| Some(*d) != self.period_end)
    }

    /// Returns true if no instant value was joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub(crate) fn current(&self) -> Option<&Slots> {
        self.period_end.and_then(|end| self.periods.get(&end))
    }

    pub(crate) fn slots_at(&self, period_end: NaiveDate) -> Option<&Slots> {
        self.periods.get(&period_end)
    }

    fn put(&mut self, period_end: NaiveDate, fact: &TaggedFact, policy: DuplicateFactPolicy) {
        let slot = self
            .periods
            .entry(period_end)
            .or_default()
            .entry(fact.normalized_concept().to_string())
            .or_default();
        let incoming = Candidate {
            value: fact.value.clone(),
            reported_on: fact.reported_on,
        };
        match slot.get(&fact.statement) {
            Some(existing)
                if policy == DuplicateFactPolicy::LatestReported
                    && incoming.reported_on < existing.reported_on =>
            {
                trace!(
                    investment_id = %self.investment_id,
                    concept = %fact.concept,
                    "Keeping more recently reported fact"
                );
            }
            _ => {
                slot.insert(fact.statement, incoming);
            }
        }
    }

    fn put_activity(&mut self, key: &str, incoming: ActivityValue) {
        match self.activity.get(key) {
            Some(existing)
                if (existing.days(), existing.end) > (incoming.days(), incoming.end) =>
            {
                trace!(
                    investment_id = %self.investment_id,
                    key,
                    "Keeping longer activity span"
                );
            }
            _ => {
                self.activity.insert(key.to_string(), incoming);
            }
        }
    }
}

/// Output of [`join_facts`].
#[derive(Debug, Default)]
pub struct JoinOutput {
    /// Partial records in first-seen identifier order.
    pub records: Vec<PartialRecord>,
    /// Facts routed to aggregate handling.
    pub aggregate_facts: usize,
    /// Missing contexts and aggregate routing.
    pub diagnostics: Diagnostics,
}

/// Joins the facts of one filing on the investment-identifier dimension.
///
/// Facts whose context is unknown are dropped. Facts whose context carries no
/// identifier are counted as aggregate facts and never reach a record.
/// Duration facts land in [`PartialRecord::activity`], instant facts in the
/// per-statement value slots of their own period end, so comparative
/// (prior year-end) values never overwrite current ones.
#[must_use]
pub fn join_facts(filing: &FilingFacts, config: &ExtractionConfig) -> JoinOutput {
    let contexts = filing.context_index();
    let mut output = JoinOutput::default();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for fact in &filing.facts {
        let Some(context) = contexts.get(fact.context_ref.as_str()) else {
            let err = SoiError::MissingContext {
                context_ref: fact.context_ref.clone(),
            };
            trace!(concept = %fact.concept, "{err}");
            output.diagnostics.record(&err);
            continue;
        };

        let investment_id = match context.scope_on(&config.identifier_axis) {
            ContextScope::Individual(id) => id,
            ContextScope::Aggregate | ContextScope::ReportTotal => {
                output.aggregate_facts += 1;
                output.diagnostics.push(
                    IssueKind::AggregateFact,
                    format!("{} in {}", fact.concept, context.id),
                );
                continue;
            }
        };

        let slot = *index.entry(investment_id).or_insert_with(|| {
            output.records.push(PartialRecord::new(investment_id));
            output.records.len() - 1
        });
        let record = &mut output.records[slot];

        for dimension in &context.dimensions {
            if !record.members.contains(&dimension.member) && dimension.member != investment_id {
                record.members.push(dimension.member.clone());
            }
        }

        let is_duration = fact.period_kind == PeriodKind::Duration
            || context.period.kind() == PeriodKind::Duration;
        if is_duration {
            let (start, end) = match context.period {
                Period::Duration { start, end } => (start, end),
                Period::Instant(date) => (date, date),
            };
            match fact.value.as_f64() {
                Some(value) => {
                    record.put_activity(
                        activity_key(&fact.concept),
                        ActivityValue { start, end, value },
                    );
                }
                None => trace!(concept = %fact.concept, "Dropping non-numeric duration fact"),
            }
            continue;
        }

        let end = context.period.end();
        if record.period_end.is_none_or(|current| end > current) {
            record.period_end = Some(end);
        }
        record.put(end, fact, config.duplicate_policy);
    }

    debug!(
        records = output.records.len(),
        aggregate_facts = output.aggregate_facts,
        missing_contexts = output.diagnostics.count(IssueKind::MissingContext),
        "Joined facts"
    );
    output
}
