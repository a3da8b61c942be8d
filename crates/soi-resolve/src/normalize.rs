//! Deterministic company-name normalization.

use soi_core::LEGAL_SUFFIXES;

/// Normalizes a company name for comparison.
///
/// Steps, in order:
/// 1. Lowercase
/// 2. Drop a trailing parenthetical such as `(Delaware)` or `(4)`
/// 3. Remove `.` and `'`, turn other punctuation into spaces
/// 4. Strip trailing legal-entity suffixes, repeatedly (`"Acme Holdings Co., LLC"`
///    loses both), never leaving the name empty
/// 5. Collapse whitespace
///
/// # Example
/// ```
/// use soi_resolve::normalize_name;
///
/// assert_eq!(normalize_name("ABC Holdings, LLC"), normalize_name("ABC Holdings LLC"));
/// assert_eq!(normalize_name("ABC Holdings L.L.C."), "abc holdings");
/// ```
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let mut lower = raw.trim().to_lowercase();

    if lower.ends_with(')')
        && let Some(open) = lower.rfind('(')
        && open > 0
    {
        lower.truncate(open);
    }

    let spaced: String = lower
        .chars()
        .filter(|c| !matches!(c, '.' | '\''))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();
    while tokens.len() > 1
        && tokens
            .last()
            .is_some_and(|last| LEGAL_SUFFIXES.contains(last))
    {
        tokens.pop();
    }
    tokens.join(" ")
}
