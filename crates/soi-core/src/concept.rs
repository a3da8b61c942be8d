//! Concept label normalization.
//!
//! Filers emit the same semantic concept under different namespace prefixes
//! (`us-gaap:`, a filer-specific `arcc:`, or none at all). Every comparison
//! of concept names in the pipeline goes through [`normalize_concept`] first.

/// Strips the namespace prefix from a concept label.
///
/// Labels without a prefix, and the empty label, are returned unchanged. A
/// qualified name carries a single prefix; should a label contain more than one
/// separator everything up to the last `:` is treated as prefix, which keeps the
/// function idempotent.
///
/// # Example
/// ```
/// use soi_core::normalize_concept;
///
/// assert_eq!(normalize_concept("us-gaap:InvestmentOwnedAtCost"), "InvestmentOwnedAtCost");
/// assert_eq!(normalize_concept("InvestmentOwnedAtCost"), "InvestmentOwnedAtCost");
/// assert_eq!(normalize_concept(""), "");
/// ```
#[must_use]
pub fn normalize_concept(concept: &str) -> &str {
    match concept.rsplit_once(':') {
        Some((_, local)) => local,
        None => concept,
    }
}

/// Returns true if two concept labels name the same concept once their
/// namespace prefixes are removed.
#[must_use]
pub fn concepts_match(a: &str, b: &str) -> bool {
    normalize_concept(a) == normalize_concept(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_standard_and_custom_prefixes() {
        assert_eq!(
            normalize_concept("us-gaap:InvestmentOwnedAtFairValue"),
            "InvestmentOwnedAtFairValue"
        );
        assert_eq!(
            normalize_concept("arcc:InvestmentCompanyFundedCommitments"),
            "InvestmentCompanyFundedCommitments"
        );
    }

    #[test]
    fn test_repeated_prefixes_collapse_in_one_pass() {
        assert_eq!(normalize_concept("ns:ext:Label"), "Label");
    }

    #[test]
    fn test_idempotent() {
        for label in [
            "us-gaap:InvestmentOwnedAtCost",
            "InvestmentOwnedAtCost",
            "",
            "a:b:c",
            ":leading",
        ] {
            let once = normalize_concept(label);
            assert_eq!(normalize_concept(once), once, "label {label:?}");
        }
    }

    #[test]
    fn test_concepts_match_across_namespaces() {
        assert!(concepts_match(
            "us-gaap:InvestmentOwnedAtCost",
            "InvestmentOwnedAtCost"
        ));
        assert!(!concepts_match("us-gaap:Assets", "us-gaap:Liabilities"));
    }
}
