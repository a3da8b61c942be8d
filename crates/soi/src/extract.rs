//! Per-filing extraction: dimensional first, HTML tables as fallback, then
//! classification.

use serde::{Deserialize, Serialize};
use soi_core::{
    AssetClass, Diagnostics, ExtractionConfig, FilerId, Filing, FilingMetadata, InvestmentRecord,
    IssueKind, SoiError, classify,
};
use soi_html::HtmlExtractor;
use soi_xbrl::DimensionalExtractor;
use tracing::{debug, instrument, warn};

/// Which path produced a filing's records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionPath {
    /// Joined from tagged facts.
    Dimensional,
    /// Scanned from HTML schedule tables.
    Html,
    /// Neither path produced a record.
    Unparsed,
}

impl ExtractionPath {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dimensional => "dimensional",
            Self::Html => "html",
            Self::Unparsed => "unparsed",
        }
    }
}

/// Classified records of one filing.
#[derive(Debug, Clone)]
pub struct FilingExtraction {
    /// Filing BDC.
    pub filer: FilerId,
    /// Filing metadata.
    pub metadata: FilingMetadata,
    /// Path that produced the records.
    pub path: ExtractionPath,
    /// Records in extraction order, with asset classes assigned.
    pub records: Vec<InvestmentRecord>,
    /// Facts routed to aggregate handling.
    pub aggregate_facts: usize,
    /// Issues raised by extraction and classification.
    pub diagnostics: Diagnostics,
}

impl FilingExtraction {
    /// Number of records that are Debt or Equity.
    #[must_use]
    pub fn classified(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.asset_class.is_classified())
            .count()
    }
}

/// Runs both extraction paths over one filing.
///
/// Filings are independent of each other, so one extractor may be shared by
/// any number of worker threads.
#[derive(Debug, Clone, Default)]
pub struct FilingExtractor {
    dimensional: DimensionalExtractor,
    html: HtmlExtractor,
    min_dimensional_records: usize,
}

impl FilingExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            min_dimensional_records: config.min_dimensional_records.max(1),
            html: HtmlExtractor::new(config.clone()),
            dimensional: DimensionalExtractor::new(config),
        }
    }

    /// Extracts and classifies the records of a filing.
    ///
    /// The dimensional path is tried first. When it yields fewer records than
    /// `min_dimensional_records` the HTML tables are scanned; if they yield
    /// nothing either, whatever the dimensional path found is kept. A filing
    /// with no record at all is reported as unparseable, never as an error.
    #[instrument(
        skip(self, filing),
        fields(filer = %filing.filer.ticker, accession = %filing.metadata.accession)
    )]
    pub fn extract(&self, filing: &Filing) -> FilingExtraction {
        let mut diagnostics = Diagnostics::new();
        let mut aggregate_facts = 0;
        let mut partial = Vec::new();
        let mut chosen = None;

        if let Some(facts) = filing.facts.as_ref().filter(|f| !f.is_empty()) {
            let dimensional = self.dimensional.extract(facts);
            aggregate_facts = dimensional.aggregate_facts;
            diagnostics.extend(dimensional.diagnostics);
            if dimensional.records.len() >= self.min_dimensional_records {
                chosen = Some((ExtractionPath::Dimensional, dimensional.records));
            } else {
                partial = dimensional.records;
            }
        }

        if chosen.is_none() && !filing.html.is_empty() {
            debug!(
                dimensional = partial.len(),
                fragments = filing.html.len(),
                "Falling back to HTML tables"
            );
            let html = self.html.extract(&filing.html);
            diagnostics.extend(html.diagnostics);
            if !html.records.is_empty() {
                chosen = Some((ExtractionPath::Html, html.records));
            }
        }

        let (path, mut records) = match chosen {
            Some(found) => found,
            None if !partial.is_empty() => (ExtractionPath::Dimensional, partial),
            None => {
                let err = SoiError::UnparseableFiling {
                    accession: filing.metadata.accession.clone(),
                };
                warn!("{err}");
                diagnostics.record(&err);
                (ExtractionPath::Unparsed, Vec::new())
            }
        };

        for record in &mut records {
            record.asset_class = classify(record).asset_class;
            if record.asset_class == AssetClass::Unclassified {
                diagnostics.push(
                    IssueKind::UnclassifiedAsset,
                    format!("{}: {}", filing.metadata.accession, record.investment_id),
                );
            }
        }

        debug!(
            path = path.as_str(),
            records = records.len(),
            issues = diagnostics.len(),
            "Filing extracted"
        );

        FilingExtraction {
            filer: filing.filer.clone(),
            metadata: filing.metadata.clone(),
            path,
            records,
            aggregate_facts,
            diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use soi_core::{
        Dimension, FilingFacts, FormType, Period, ReportingContext, TaggedFact,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    fn filing() -> Filing {
        Filing::new(
            FilerId::new("ARCC", "0001287750"),
            FilingMetadata::new(FormType::TenK, date(), date(), "0001287750-25-000001"),
        )
    }

    fn tagged() -> FilingFacts {
        let mut facts = FilingFacts::new();
        facts.contexts.push(
            ReportingContext::new("ctxA", Period::Instant(date())).with_dimension(
                Dimension::typed("InvestmentIdentifierAxis", "Acme Corp, First lien loan"),
            ),
        );
        facts.contexts.push(
            ReportingContext::new("ctxB", Period::Instant(date())).with_dimension(
                Dimension::typed("InvestmentIdentifierAxis", "Community Holdings"),
            ),
        );
        facts
            .facts
            .push(TaggedFact::new("us-gaap:InvestmentOwnedAtFairValue", 21_721_000.0, "ctxA"));
        facts
            .facts
            .push(TaggedFact::new("us-gaap:InvestmentOwnedAtFairValue", 5_000.0, "ctxB"));
        facts
    }

    const TABLE: &str = r#"
        <table>
          <tr><td>Company</td><td>Investment</td><td>Principal</td><td>Cost</td><td>Fair Value</td></tr>
          <tr><td>Acme Corp</td><td>First lien loan</td><td>4,100</td><td>4,000</td><td>4,048</td></tr>
          <tr><td>Beta LLC</td><td>Common stock</td><td></td><td>900</td><td>1,200</td></tr>
        </table>"#;

    #[test]
    fn test_dimensional_path_classifies() {
        let extraction = FilingExtractor::default().extract(&filing().with_facts(tagged()));

        assert_eq!(extraction.path, ExtractionPath::Dimensional);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].asset_class, AssetClass::Debt);
        // Kept, but flagged.
        assert_eq!(extraction.records[1].asset_class, AssetClass::Unclassified);
        assert_eq!(extraction.diagnostics.count(IssueKind::UnclassifiedAsset), 1);
        assert_eq!(extraction.classified(), 1);
    }

    #[test]
    fn test_html_fallback() {
        let extraction = FilingExtractor::default().extract(&filing().with_html(TABLE));

        assert_eq!(extraction.path, ExtractionPath::Html);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].fair_value, Some(4_048_000.0));
        assert_eq!(extraction.records[1].asset_class, AssetClass::Equity);
    }

    #[test]
    fn test_thin_dimensional_result_prefers_html() {
        let config = ExtractionConfig::default().with_min_dimensional_records(5);
        let extraction = FilingExtractor::new(config)
            .extract(&filing().with_facts(tagged()).with_html(TABLE));
        assert_eq!(extraction.path, ExtractionPath::Html);

        // Without usable tables the thin dimensional result is kept.
        let config = ExtractionConfig::default().with_min_dimensional_records(5);
        let extraction = FilingExtractor::new(config)
            .extract(&filing().with_facts(tagged()).with_html("<p>no tables</p>"));
        assert_eq!(extraction.path, ExtractionPath::Dimensional);
        assert_eq!(extraction.records.len(), 2);
    }

    #[test]
    fn test_empty_filing_is_unparseable() {
        let extraction = FilingExtractor::default().extract(&filing());

        assert_eq!(extraction.path, ExtractionPath::Unparsed);
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.diagnostics.count(IssueKind::UnparseableFiling), 1);
    }
}
