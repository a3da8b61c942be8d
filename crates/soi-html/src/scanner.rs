//! Forward scan over the rows of one table.
//!
//! The scan is a small state machine:
//!
//! ```text
//! SeekingHeader --header found--> Scanning --rows exhausted--> Done
//!       \--------no header within the search window-------->  Done
//! ```
//!
//! While scanning, the current company (and its business description) is
//! carried across rows that leave the company cell blank, which is how filers
//! list several instruments of one portfolio company.

use soi_core::ExtractionConfig;
use std::ops::Range;
use tracing::trace;

use crate::text::{clean_company_name, collapse_whitespace, parse_amount};

/// A column the scanner reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    /// Portfolio company / issuer.
    Company,
    /// Business description.
    Description,
    /// Investment type or instrument.
    InvestmentType,
    /// Principal or par amount.
    Principal,
    /// Amortized cost.
    Cost,
    /// Fair value.
    FairValue,
    /// Percentage of net assets.
    PctNetAssets,
}

/// Grid column span of each recognized header.
///
/// A header repeated by `colspan` expansion covers consecutive grid columns;
/// only the first occurrence of each header binds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    spans: Vec<(Column, Range<usize>)>,
}

impl ColumnMap {
    /// Identifies columns in a header row.
    #[must_use]
    pub fn from_header(cells: &[String], config: &ExtractionConfig) -> Self {
        let mut map = Self::default();
        let mut previous: Option<(&str, Column)> = None;

        for (i, cell) in cells.iter().enumerate() {
            let text = cell.trim();
            if text.is_empty() {
                previous = None;
                continue;
            }

            if let Some((prev_text, column)) = previous
                && prev_text == text
            {
                if let Some((_, span)) = map.spans.iter_mut().find(|(c, _)| *c == column)
                    && span.end == i
                {
                    span.end = i + 1;
                }
                continue;
            }

            previous = None;
            let Some(column) = header_column(&text.to_lowercase(), config) else {
                continue;
            };
            if map.span(column).is_none() {
                map.spans.push((column, i..i + 1));
                previous = Some((text, column));
            }
        }
        map
    }

    /// Grid span of a column.
    #[must_use]
    pub fn span(&self, column: Column) -> Option<Range<usize>> {
        self.spans
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, span)| span.clone())
    }

    /// First non-empty text within a column's span.
    #[must_use]
    pub fn text<'r>(&self, column: Column, row: &'r [String]) -> Option<&'r str> {
        let span = self.span(column)?;
        row.get(span.start..span.end.min(row.len()))?
            .iter()
            .map(|cell| cell.trim())
            .find(|cell| !cell.is_empty())
    }

    /// First parseable amount within a column's span.
    #[must_use]
    pub fn amount(&self, column: Column, row: &[String]) -> Option<f64> {
        let span = self.span(column)?;
        row.get(span.start..span.end.min(row.len()))?
            .iter()
            .find_map(|cell| parse_amount(cell))
    }
}

fn header_column(lower: &str, config: &ExtractionConfig) -> Option<Column> {
    let any = |tokens: &[String]| tokens.iter().any(|t| lower.contains(t.as_str()));
    let column = if any(&config.issuer_header_tokens) {
        Column::Company
    } else if any(&config.fair_value_header_tokens) {
        Column::FairValue
    } else if lower.contains("cost") {
        Column::Cost
    } else if lower.contains("principal") {
        Column::Principal
    } else if lower.contains("net assets") {
        Column::PctNetAssets
    } else if lower.contains("business") || lower.contains("description") {
        Column::Description
    } else if lower.contains("investment") || lower.contains("instrument") || lower.contains("type") {
        Column::InvestmentType
    } else {
        return None;
    };
    Some(column)
}

/// Returns true if a row carries both an issuer-like and a fair-value-like
/// header token.
#[must_use]
pub fn is_header_row(cells: &[String], config: &ExtractionConfig) -> bool {
    let text = cells.join(" ").to_lowercase();
    let has = |tokens: &[String]| tokens.iter().any(|t| text.contains(t.as_str()));
    has(&config.issuer_header_tokens) && has(&config.fair_value_header_tokens)
}

/// Words that make up a control / affiliation section heading on their own.
const SECTION_WORDS: [&str; 9] = [
    "control",
    "controlled",
    "non-control",
    "non-controlled",
    "affiliate",
    "affiliated",
    "non-affiliate",
    "non-affiliated",
    "unaffiliated",
];

/// Returns true for totals, subtotals and section headers in the company column.
///
/// Headings read like "Non-Control/Non-Affiliate Investments" or "Affiliate
/// Investments:"; a company merely named "Affiliated ..." is not one.
fn is_section_row(company: &str) -> bool {
    let lower = company.to_lowercase();
    let lower = lower.trim_end_matches(|c: char| c == ':' || c.is_whitespace());
    let mut words = lower
        .split(|c: char| c == '/' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .peekable();
    lower.starts_with("total")
        || lower.starts_with("subtotal")
        || lower.ends_with("investments")
        || (words.peek().is_some() && words.all(|w| SECTION_WORDS.contains(&w)))
}

/// Scanner state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// Looking for the header within the first rows.
    SeekingHeader,
    /// Header bound; reading data rows.
    Scanning(ColumnMap),
    /// Finished, with or without a header.
    Done,
}

/// Unscaled values read from one data row.
#[derive(Clone, Debug, PartialEq)]
pub struct ScannedRow {
    /// Row index within the table.
    pub row: usize,
    /// Current company when the row was read.
    pub company: String,
    /// Current business description.
    pub description: Option<String>,
    /// Investment type text of the row.
    pub investment_type: Option<String>,
    /// Principal, as reported.
    pub principal: Option<f64>,
    /// Cost, as reported.
    pub cost: Option<f64>,
    /// Fair value, as reported.
    pub fair_value: Option<f64>,
    /// Percent of net assets.
    pub pct_net_assets: Option<f64>,
}

/// What the scan of a table left behind besides its rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanSummary {
    /// Index of the header row, if one was found.
    pub header_row: Option<usize>,
    /// Positive fair value, cost and principal amounts in row order.
    pub samples: Vec<f64>,
}

/// Row-by-row scanner for one table.
#[derive(Debug)]
pub struct RowScanner<'a> {
    config: &'a ExtractionConfig,
    state: ScanState,
    rows_searched: usize,
    header_row: Option<usize>,
    current_company: Option<String>,
    current_description: Option<String>,
    samples: Vec<f64>,
}

impl<'a> RowScanner<'a> {
    /// Creates a scanner in [`ScanState::SeekingHeader`].
    #[must_use]
    pub const fn new(config: &'a ExtractionConfig) -> Self {
        Self {
            config,
            state: ScanState::SeekingHeader,
            rows_searched: 0,
            header_row: None,
            current_company: None,
            current_description: None,
            samples: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ScanState {
        &self.state
    }

    /// Company carried from the last company row.
    #[must_use]
    pub fn current_company(&self) -> Option<&str> {
        self.current_company.as_deref()
    }

    /// Feeds the next row; returns a data row when the row yields a position.
    pub fn feed(&mut self, row: usize, cells: &[String]) -> Option<ScannedRow> {
        match self.state {
            ScanState::SeekingHeader => {
                if is_header_row(cells, self.config) {
                    trace!(row, "Header found");
                    self.header_row = Some(row);
                    self.state = ScanState::Scanning(ColumnMap::from_header(cells, self.config));
                } else {
                    self.rows_searched += 1;
                    if self.rows_searched >= self.config.header_search_rows {
                        self.state = ScanState::Done;
                    }
                }
                None
            }
            ScanState::Scanning(ref columns) => {
                let principal = columns.amount(Column::Principal, cells);
                let cost = columns.amount(Column::Cost, cells);
                let fair_value = columns.amount(Column::FairValue, cells);

                for v in [fair_value, cost, principal].into_iter().flatten() {
                    if v > 0.0 && self.samples.len() < self.config.scale_sample_size {
                        self.samples.push(v);
                    }
                }

                if let Some(raw) = columns.text(Column::Company, cells)
                    && raw.chars().count() >= 3
                {
                    if is_section_row(raw) {
                        trace!(row, company = raw, "Section row");
                        self.current_company = None;
                        self.current_description = None;
                        return None;
                    }
                    let name = clean_company_name(raw);
                    if !name.is_empty() {
                        self.current_description = columns
                            .text(Column::Description, cells)
                            .filter(|d| d.chars().count() >= 3)
                            .map(collapse_whitespace);
                        self.current_company = Some(name);
                    }
                }

                let company = self.current_company.clone()?;
                if principal.is_none() && cost.is_none() && fair_value.is_none() {
                    return None;
                }

                Some(ScannedRow {
                    row,
                    company,
                    description: self.current_description.clone(),
                    investment_type: columns
                        .text(Column::InvestmentType, cells)
                        .map(collapse_whitespace),
                    principal,
                    cost,
                    fair_value,
                    pct_net_assets: columns.amount(Column::PctNetAssets, cells),
                })
            }
            ScanState::Done => None,
        }
    }

    /// Ends the scan.
    #[must_use]
    pub fn finish(self) -> ScanSummary {
        ScanSummary {
            header_row: self.header_row,
            samples: self.samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    fn scan(rows: &[Vec<String>], config: &ExtractionConfig) -> (Vec<ScannedRow>, ScanSummary) {
        let mut scanner = RowScanner::new(config);
        let out = rows
            .iter()
            .enumerate()
            .filter_map(|(i, cells)| scanner.feed(i, cells))
            .collect();
        (out, scanner.finish())
    }

    #[test]
    fn test_company_carried_to_detail_row() {
        let config = ExtractionConfig::default();
        let rows = vec![
            row(&["Schedule of Investments", "", ""]),
            row(&["Portfolio Company", "Investment", "Fair Value"]),
            row(&["Acme Corp", "", ""]),
            row(&["", "Senior Debt", "4,048"]),
        ];
        let (out, summary) = scan(&rows, &config);

        assert_eq!(summary.header_row, Some(1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].row, 3);
        assert_eq!(out[0].company, "Acme Corp");
        assert_eq!(out[0].investment_type.as_deref(), Some("Senior Debt"));
        assert_eq!(out[0].fair_value, Some(4048.0));
        assert_eq!(summary.samples, [4048.0]);
    }

    #[test]
    fn test_state_transitions() {
        let config = ExtractionConfig::default();
        let mut scanner = RowScanner::new(&config);
        assert_eq!(scanner.state(), &ScanState::SeekingHeader);

        scanner.feed(0, &row(&["Issuer", "Fair Value"]));
        assert!(matches!(scanner.state(), ScanState::Scanning(_)));

        let mut scanner = RowScanner::new(&config);
        for i in 0..3 {
            scanner.feed(i, &row(&["Revenue", "2024"]));
        }
        assert_eq!(scanner.state(), &ScanState::Done);
        // A header after the search window is ignored.
        scanner.feed(3, &row(&["Company", "Fair Value"]));
        assert_eq!(scanner.state(), &ScanState::Done);
        assert_eq!(scanner.finish().header_row, None);
    }

    #[test]
    fn test_first_header_occurrence_binds() {
        let config = ExtractionConfig::default();
        let header = row(&[
            "Company",
            "Fair Value",
            "Fair Value",
            "Cost",
            "Fair Value",
        ]);
        let map = ColumnMap::from_header(&header, &config);
        assert_eq!(map.span(Column::Company), Some(0..1));
        assert_eq!(map.span(Column::FairValue), Some(1..3));
        assert_eq!(map.span(Column::Cost), Some(3..4));

        let data = row(&["Acme", "$", "12.5", "10", "999"]);
        assert_eq!(map.amount(Column::FairValue, &data), Some(12.5));
    }

    #[test]
    fn test_totals_and_sections_reset_company() {
        let config = ExtractionConfig::default();
        let rows = vec![
            row(&["Company (1)", "Business Description", "Principal", "Cost", "Fair Value"]),
            row(&["Non-Control/Non-Affiliate Investments", "", "", "", ""]),
            row(&["Beta LLC (2)(3)", "Software", "1,000", "990", "1,001"]),
            row(&["", "", "", "10", "12"]),
            row(&["Total Beta LLC", "", "", "1,000", "1,013"]),
            row(&["", "", "", "5", "6"]),
        ];
        let (out, _) = scan(&rows, &config);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].company, "Beta LLC");
        assert_eq!(out[0].description.as_deref(), Some("Software"));
        assert_eq!(out[0].principal, Some(1000.0));
        assert_eq!(out[1].company, "Beta LLC");
        assert_eq!(out[1].cost, Some(10.0));
    }

    #[test]
    fn test_rows_without_values_create_nothing() {
        let config = ExtractionConfig::default();
        let rows = vec![
            row(&["Borrower", "Fair Value"]),
            row(&["Gamma Inc", ""]),
            row(&["Delta Inc", "—"]),
        ];
        let (out, _) = scan(&rows, &config);
        assert!(out.is_empty());
    }

    #[test]
    fn test_section_headings_match_tightly() {
        assert!(is_section_row("Non-Control/Non-Affiliate Investments"));
        assert!(is_section_row("Affiliate Investments:"));
        assert!(is_section_row("Non-Controlled / Affiliated"));
        assert!(!is_section_row("Affiliated Physicians Group"));
        assert!(!is_section_row("Control Solutions Inc"));

        let config = ExtractionConfig::default();
        let rows = vec![
            row(&["Company", "Fair Value"]),
            row(&["Affiliate Investments", ""]),
            row(&["Affiliated Physicians Group", "2,500"]),
        ];
        let (out, _) = scan(&rows, &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].company, "Affiliated Physicians Group");
    }
}
