//! Cell text helpers: amounts and company names.

use regex::Regex;
use std::sync::LazyLock;

static FOOTNOTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s*\(\d+\))+\s*$").expect("valid footnote regex"));

/// Collapses runs of whitespace (including non-breaking spaces) to one space.
#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a reported amount.
///
/// Accepts `$1,234.56`, `1234`, `(1,234)` for negatives and a trailing `%`.
/// Dashes, blanks and text return `None`.
#[must_use]
pub fn parse_amount(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    if digits.is_empty() || !digits.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Cleans a company cell: whitespace collapsed, trailing footnote markers
/// such as `(1)(2)` removed.
#[must_use]
pub fn clean_company_name(name: &str) -> String {
    let collapsed = collapse_whitespace(name);
    FOOTNOTES_RE.replace(&collapsed, "").trim().to_string()
}
