#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/soi/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTML table extraction of Schedule of Investments records.
//!
//! Used when a filing carries no (or too little) dimensional tagging. Each
//! `<table>` is a candidate:
//!
//! 1. The first rows are searched for a header with an issuer column and a
//!    fair value column ([`RowScanner`])
//! 2. Data rows are scanned with the current company carried across rows
//! 3. The table's unit is inferred from sampled amounts ([`infer_scale`])
//! 4. Amounts are converted to dollars
//!
//! Tables without a header are skipped; they never fail the filing.

use soi_core::{
    Diagnostics, ExtractionConfig, InvestmentRecord, IssueKind, RecordSource, SoiError,
};
use tracing::{debug, instrument, trace};

/// Table parsing into grids.
pub mod grid;
/// Scale inference.
pub mod scale;
/// Row scanner state machine.
pub mod scanner;
/// Amount and name parsing.
pub mod text;

pub use grid::{TableGrid, parse_tables};
pub use scale::{Scale, ScaleInference, infer_scale};
pub use scanner::{Column, ColumnMap, RowScanner, ScanState, ScanSummary, ScannedRow};
pub use text::{clean_company_name, parse_amount};

/// Tables with fewer rows cannot hold a header and data.
const MIN_TABLE_ROWS: usize = 3;

/// Records read from the HTML tables of one filing.
#[derive(Debug, Default)]
pub struct HtmlExtraction {
    /// Records in table, then row order.
    pub records: Vec<InvestmentRecord>,
    /// Candidate tables examined.
    pub tables_seen: usize,
    /// Tables in which a header was found.
    pub tables_parsed: usize,
    /// Issues raised.
    pub diagnostics: Diagnostics,
}

/// Extractor for HTML schedule tables.
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor {
    config: ExtractionConfig,
}

impl HtmlExtractor {
    /// Creates an extractor.
    #[must_use]
    pub const fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extracts records from HTML fragments. Table indices run across all
    /// fragments.
    #[instrument(skip(self, fragments), fields(fragments = fragments.len()))]
    pub fn extract<S: AsRef<str>>(&self, fragments: &[S]) -> HtmlExtraction {
        let tables: Vec<TableGrid> = fragments
            .iter()
            .flat_map(|html| parse_tables(html.as_ref()))
            .collect();
        self.extract_tables(&tables)
    }

    /// Extracts records from already parsed tables.
    pub fn extract_tables(&self, tables: &[TableGrid]) -> HtmlExtraction {
        let mut out = HtmlExtraction::default();

        for (index, table) in tables.iter().enumerate() {
            if table.len() < MIN_TABLE_ROWS {
                continue;
            }
            out.tables_seen += 1;

            let mut scanner = RowScanner::new(&self.config);
            let rows: Vec<ScannedRow> = table
                .rows()
                .iter()
                .enumerate()
                .filter_map(|(i, cells)| scanner.feed(i, cells))
                .collect();
            let summary = scanner.finish();

            if summary.header_row.is_none() {
                let err = SoiError::AmbiguousHeader { table: index };
                trace!("{err}");
                out.diagnostics.record(&err);
                continue;
            }
            out.tables_parsed += 1;

            let inferred = infer_scale(&summary.samples, &self.config);
            if inferred.low_confidence && !rows.is_empty() {
                out.diagnostics.record(&SoiError::ScaleIndeterminate {
                    samples: inferred.samples,
                    required: self.config.min_scale_samples,
                });
            }
            debug!(
                table = index,
                rows = rows.len(),
                scale = ?inferred.scale,
                median = ?inferred.median,
                "Parsed schedule table"
            );

            let factor = inferred.scale.multiplier();
            out.records
                .extend(rows.into_iter().map(|row| to_record(index, row, factor)));
        }

        out
    }
}

fn to_record(table: usize, row: ScannedRow, factor: f64) -> InvestmentRecord {
    let mut record = InvestmentRecord::new(
        format!("t{table}-r{}", row.row),
        RecordSource::HtmlTable {
            table,
            row: row.row,
        },
    )
    .with_issuer(row.company);
    record.investment_type = row.investment_type;
    record.business_description = row.description;
    record.principal = row.principal.map(|v| v * factor);
    record.cost = row.cost.map(|v| v * factor);
    record.fair_value = row.fair_value.map(|v| v * factor);
    record.pct_net_assets = row.pct_net_assets;
    record
}

/// Returns true if an HTML extraction produced nothing usable.
#[must_use]
pub fn is_unparseable(extraction: &HtmlExtraction) -> bool {
    extraction.records.is_empty()
        && extraction.diagnostics.count(IssueKind::AmbiguousHeader) == extraction.tables_seen
}
