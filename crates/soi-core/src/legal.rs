//! Legal-entity suffixes of company names.

/// Legal-entity suffix tokens, compared after punctuation removal.
pub const LEGAL_SUFFIXES: &[&str] = &[
    "llc",
    "inc",
    "corp",
    "corporation",
    "incorporated",
    "ltd",
    "limited",
    "lp",
    "lllp",
    "llp",
    "plc",
    "co",
    "company",
];

/// Returns true if `text` is a legal-entity suffix on its own, such as
/// `LLC`, `Inc.` or `L.L.C.`.
#[must_use]
pub fn is_legal_suffix(text: &str) -> bool {
    let token: String = text
        .chars()
        .filter(|c| !matches!(c, '.' | '\'' | ','))
        .collect::<String>()
        .trim()
        .to_lowercase();
    LEGAL_SUFFIXES.contains(&token.as_str())
}
