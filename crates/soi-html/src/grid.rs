//! HTML tables as rectangular grids of cell text.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::text::collapse_whitespace;

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid table selector"));
static TR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid tr selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid cell selector"));

const MAX_COLSPAN: usize = 64;

/// Cell text of one table, with `colspan` cells repeated across their span so
/// that header and data rows line up column by column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableGrid {
    rows: Vec<Vec<String>>,
}

impl TableGrid {
    /// Builds a grid from rows of cell text.
    #[must_use]
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Rows of the grid.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parses every `<table>` of an HTML fragment, in document order.
#[must_use]
pub fn parse_tables(html: &str) -> Vec<TableGrid> {
    let document = Html::parse_fragment(html);
    document.select(&TABLE_SELECTOR).map(table_grid).collect()
}

fn table_grid(table: ElementRef<'_>) -> TableGrid {
    let rows = table
        .select(&TR_SELECTOR)
        .map(|tr| {
            let mut cells = Vec::new();
            for cell in tr.select(&CELL_SELECTOR) {
                let text = collapse_whitespace(&cell.text().collect::<String>());
                let span = cell
                    .value()
                    .attr("colspan")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, MAX_COLSPAN);
                cells.extend(std::iter::repeat_n(text, span));
            }
            cells
        })
        .filter(|cells| !cells.is_empty())
        .collect();
    TableGrid { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colspan_expands() {
        let html = r#"
            <table>
              <tr><th>Portfolio Company</th><th colspan="2">Fair Value</th></tr>
              <tr><td>Acme&nbsp;Corp</td><td>$</td><td>4,048</td></tr>
            </table>
            <table><tr><td>other</td></tr></table>
        "#;
        let tables = parse_tables(html);
        assert_eq!(tables.len(), 2);
        assert_eq!(
            tables[0].rows()[0],
            ["Portfolio Company", "Fair Value", "Fair Value"]
        );
        assert_eq!(tables[0].rows()[1], ["Acme Corp", "$", "4,048"]);
    }

    #[test]
    fn test_no_tables() {
        assert!(parse_tables("<p>nothing here</p>").is_empty());
    }
}
