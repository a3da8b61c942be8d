//! Debt / equity classification of investment records.

use serde::{Deserialize, Serialize};

use crate::record::{AssetClass, InvestmentRecord};

/// Keywords that mark credit instruments.
pub const DEBT_KEYWORDS: [&str; 8] = [
    "loan",
    "debt",
    "note",
    "bond",
    "credit",
    "mezzanine",
    "senior",
    "subordinated",
];

/// Keywords that mark ownership interests.
pub const EQUITY_KEYWORDS: [&str; 8] = [
    "stock",
    "equity",
    "share",
    "warrant",
    "unit",
    "membership",
    "preferred",
    "common",
];

/// Which signal produced a classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationBasis {
    /// Exactly one of principal and shares was present.
    FieldPresence,
    /// A keyword matched the investment type (or identifier) text.
    Keyword,
    /// Nothing applied.
    NoSignal,
}

/// Outcome of [`classify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    /// Assigned asset class.
    pub asset_class: AssetClass,
    /// Signal behind it.
    pub basis: ClassificationBasis,
}

/// Assigns an asset class to a record.
///
/// Field presence decides first: principal without shares is Debt, shares
/// without principal is Equity. When both or neither are present the
/// investment type text is matched against [`DEBT_KEYWORDS`] then
/// [`EQUITY_KEYWORDS`]; records without a type fall back to their identifier
/// text, which often embeds the instrument ("Acme Corp, First lien loan").
#[must_use]
pub fn classify(record: &InvestmentRecord) -> Classification {
    match (record.principal.is_some(), record.shares.is_some()) {
        (true, false) => {
            return Classification {
                asset_class: AssetClass::Debt,
                basis: ClassificationBasis::FieldPresence,
            };
        }
        (false, true) => {
            return Classification {
                asset_class: AssetClass::Equity,
                basis: ClassificationBasis::FieldPresence,
            };
        }
        _ => {}
    }

    let text = record
        .investment_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&record.investment_id);

    let asset_class = classify_text(text);
    Classification {
        asset_class,
        basis: if asset_class.is_classified() {
            ClassificationBasis::Keyword
        } else {
            ClassificationBasis::NoSignal
        },
    }
}

/// Keyword classification of free text. Debt keywords are checked first.
#[must_use]
pub fn classify_text(text: &str) -> AssetClass {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let hit = |keywords: &[&str]| {
        words
            .iter()
            .any(|word| keywords.iter().any(|kw| word.starts_with(kw)))
    };

    if hit(&DEBT_KEYWORDS) {
        AssetClass::Debt
    } else if hit(&EQUITY_KEYWORDS) {
        AssetClass::Equity
    } else {
        AssetClass::Unclassified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSource;

    fn record(id: &str) -> InvestmentRecord {
        InvestmentRecord::new(id, RecordSource::Dimensional)
    }

    #[test]
    fn test_principal_without_shares_is_debt() {
        // Equity-sounding type must not override field presence.
        let mut r = record("Acme Corp").with_investment_type("Preferred equity");
        r.principal = Some(1_000_000.0);
        let c = classify(&r);
        assert_eq!(c.asset_class, AssetClass::Debt);
        assert_eq!(c.basis, ClassificationBasis::FieldPresence);
    }

    #[test]
    fn test_shares_without_principal_is_equity() {
        let mut r = record("Acme Corp").with_investment_type("First lien loan");
        r.shares = Some(1_500.0);
        assert_eq!(classify(&r).asset_class, AssetClass::Equity);
    }

    #[test]
    fn test_keywords_when_both_present() {
        let mut r = record("Acme Corp").with_investment_type("Senior secured notes");
        r.principal = Some(10.0);
        r.shares = Some(10.0);
        let c = classify(&r);
        assert_eq!(c.asset_class, AssetClass::Debt);
        assert_eq!(c.basis, ClassificationBasis::Keyword);
    }

    #[test]
    fn test_keywords_fall_back_to_identifier() {
        let r = record("Beta LLC, Class A Units");
        assert_eq!(classify(&r).asset_class, AssetClass::Equity);
    }

    #[test]
    fn test_no_signal_is_unclassified() {
        let r = record("Community Holdings").with_investment_type("Other");
        let c = classify(&r);
        assert_eq!(c.asset_class, AssetClass::Unclassified);
        assert_eq!(c.basis, ClassificationBasis::NoSignal);
    }

    #[test]
    fn test_word_prefix_matching() {
        assert_eq!(classify_text("Warrants"), AssetClass::Equity);
        assert_eq!(classify_text("Subordinated Debt"), AssetClass::Debt);
        assert_eq!(classify_text("Community"), AssetClass::Unclassified);
    }
}
