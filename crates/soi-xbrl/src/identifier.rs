//! Parsing of investment identifiers and extensible enumeration values.

use soi_core::{classify_text, is_legal_suffix};

/// Components of a typed investment identifier such as
/// `"3Pillar Global Inc, Software & Services 1"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedIdentifier {
    /// Text before the last `", "`.
    pub company: String,
    /// Trailing qualifier when it reads as an industry.
    pub industry: Option<String>,
    /// Trailing qualifier when it reads as an instrument ("First lien loan").
    pub instrument: Option<String>,
    /// Trailing position number.
    pub position: Option<u32>,
}

/// Splits an identifier into company, qualifier and position number.
///
/// The qualifier after the last comma is an industry in most filings and an
/// instrument description in others; the debt / equity keyword sets decide
/// which. A legal-entity suffix after the comma (`"Acme Holdings, LLC"`)
/// belongs to the company name and is not split off.
#[must_use]
pub fn parse_identifier(identifier: &str) -> ParsedIdentifier {
    let trimmed = identifier.trim();

    let (base, position) = match trimmed.rsplit_once(char::is_whitespace) {
        Some((head, tail)) if !head.trim().is_empty() => match tail.parse::<u32>() {
            Ok(n) => (head.trim_end(), Some(n)),
            Err(_) => (trimmed, None),
        },
        _ => (trimmed, None),
    };

    let mut parsed = ParsedIdentifier {
        company: base.to_string(),
        position,
        ..ParsedIdentifier::default()
    };

    if let Some((company, qualifier)) = base.rsplit_once(", ")
        && !is_legal_suffix(qualifier)
    {
        let qualifier = qualifier.trim();
        parsed.company = company.trim().to_string();
        if !qualifier.is_empty() {
            if classify_text(qualifier).is_classified() {
                parsed.instrument = Some(qualifier.to_string());
            } else {
                parsed.industry = Some(qualifier.to_string());
            }
        }
    }

    parsed
}

/// Readable value of an extensible enumeration.
///
/// `http://fasb.org/us-gaap/2024#SeniorSecuredFirstLienMember` becomes
/// `Senior Secured First Lien`. A value listing several URIs yields the first.
/// Values that are not URIs are returned trimmed.
#[must_use]
pub fn parse_enum_uri(value: &str) -> String {
    let first = value.split_whitespace().next().unwrap_or_default();
    match first.rsplit_once('#') {
        Some((_, fragment)) => {
            let fragment = fragment.strip_suffix("Member").unwrap_or(fragment);
            split_camel_case(fragment)
        }
        None => value.trim().to_string(),
    }
}

/// Inserts a space at each lower-to-upper case boundary.
fn split_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if let Some(p) = prev
            && c.is_uppercase()
            && (p.is_lowercase() || p.is_ascii_digit())
        {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_with_industry_and_position() {
        let parsed = parse_identifier("3Pillar Global Inc, Software & Services 2");
        assert_eq!(parsed.company, "3Pillar Global Inc");
        assert_eq!(parsed.industry.as_deref(), Some("Software & Services"));
        assert_eq!(parsed.instrument, None);
        assert_eq!(parsed.position, Some(2));
    }

    #[test]
    fn test_identifier_with_instrument() {
        let parsed = parse_identifier("Acme Corp, First lien");
        assert_eq!(parsed.company, "Acme Corp");
        // "lien" is no keyword; falls to industry
        assert_eq!(parsed.industry.as_deref(), Some("First lien"));

        let parsed = parse_identifier("Acme Corp, First lien senior secured loan");
        assert_eq!(
            parsed.instrument.as_deref(),
            Some("First lien senior secured loan")
        );
        assert_eq!(parsed.industry, None);
    }

    #[test]
    fn test_identifier_without_comma() {
        let parsed = parse_identifier("  Gamma Holdings LLC  ");
        assert_eq!(parsed.company, "Gamma Holdings LLC");
        assert_eq!(parsed.position, None);

        // A bare number is a name, not a position.
        assert_eq!(parse_identifier("7").company, "7");
    }

    #[test]
    fn test_identifier_ending_in_legal_suffix() {
        let parsed = parse_identifier("Acme Holdings, LLC");
        assert_eq!(parsed.company, "Acme Holdings, LLC");
        assert_eq!(parsed.industry, None);
        assert_eq!(parsed.instrument, None);

        let parsed = parse_identifier("Acme Holdings, L.L.C. 3");
        assert_eq!(parsed.company, "Acme Holdings, L.L.C.");
        assert_eq!(parsed.position, Some(3));

        let parsed = parse_identifier("Acme Holdings, LLC, Software");
        assert_eq!(parsed.company, "Acme Holdings, LLC");
        assert_eq!(parsed.industry.as_deref(), Some("Software"));
    }

    #[test]
    fn test_parse_enum_uri() {
        assert_eq!(
            parse_enum_uri("http://www.arcc.com/20241231#AcmeCorpMember"),
            "Acme Corp"
        );
        assert_eq!(
            parse_enum_uri(
                "http://fasb.org/us-gaap/2024#ControlledMember http://fasb.org/us-gaap/2024#OtherMember"
            ),
            "Controlled"
        );
        assert_eq!(parse_enum_uri(" Software "), "Software");
    }
}
