//! Industry sector tagging from business descriptions.

use std::fmt::Debug;

/// Sector assigned when a description matches no keyword.
pub const OTHER_SECTOR: &str = "Other";

/// Sector assigned when there is no description at all.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Maps free text to an industry sector.
pub trait IndustryClassifier: Send + Sync + Debug {
    /// Sector for `description`; `None` means the text carries no signal.
    fn classify(&self, description: &str) -> Option<String>;

    /// Sector for an optional description, with the fallback labels applied.
    fn sector(&self, description: Option<&str>) -> String {
        match description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(text) => self
                .classify(text)
                .unwrap_or_else(|| OTHER_SECTOR.to_string()),
            None => UNKNOWN_SECTOR.to_string(),
        }
    }
}

/// Sectors and their keywords; the first sector with a hit wins, so more
/// specific sectors come first.
static SECTOR_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Software/Technology",
        &[
            "software",
            "saas",
            "platform",
            "cloud",
            "data analytics",
            "cybersecurity",
            "it services",
            "technology",
            "digital",
            "erp",
            "crm",
            "artificial intelligence",
            "machine learning",
            "mobile",
            "internet",
            "web",
            "online",
            "e-learning",
            "information technology",
            "it solutions",
            "tech",
            "semiconductor",
        ],
    ),
    (
        "Healthcare Services",
        &[
            "healthcare",
            "medical",
            "hospital",
            "clinical",
            "patient",
            "pharmaceutical",
            "drug",
            "biotech",
            "life sciences",
            "dental",
            "veterinary",
            "health insurance",
            "physician",
            "pharmacy",
            "diagnostic",
            "therapeutic",
            "wellness",
        ],
    ),
    (
        "Business Services",
        &[
            "staffing",
            "consulting",
            "outsourcing",
            "professional services",
            "human resources",
            "payroll",
            "marketing services",
            "advertising",
            "business process",
            "call center",
            "customer service",
            "research",
            "analytics",
            "legal services",
            "accounting",
        ],
    ),
    (
        "Financial Services",
        &[
            "insurance",
            "lending",
            "financial",
            "banking",
            "payments",
            "wealth management",
            "asset management",
            "credit",
            "fintech",
            "investment",
            "brokerage",
            "mortgage",
            "payment processing",
        ],
    ),
    (
        "Industrial/Manufacturing",
        &[
            "manufacturing",
            "industrial",
            "equipment",
            "machinery",
            "aerospace",
            "defense",
            "automotive",
            "construction",
            "fabrication",
            "metal",
            "plastic",
            "chemicals",
            "materials",
            "electrical",
            "mechanical",
            "tools",
            "components",
            "parts",
        ],
    ),
    (
        "Consumer Products",
        &[
            "consumer products",
            "consumer goods",
            "apparel",
            "clothing",
            "fashion",
            "footwear",
            "accessories",
            "beauty",
            "cosmetics",
            "personal care",
            "household products",
            "furniture",
            "home goods",
        ],
    ),
    (
        "Food & Beverage",
        &[
            "food",
            "beverage",
            "restaurant",
            "dining",
            "catering",
            "bakery",
            "brewery",
            "wine",
            "spirits",
            "coffee",
            "snack",
            "grocery",
            "culinary",
            "nutrition",
        ],
    ),
    (
        "Retail",
        &[
            "retail",
            "store",
            "shop",
            "e-commerce",
            "ecommerce",
            "merchant",
            "distribution",
            "wholesaler",
            "dealer",
        ],
    ),
    (
        "Media & Entertainment",
        &[
            "media",
            "entertainment",
            "broadcasting",
            "publishing",
            "content",
            "film",
            "music",
            "gaming",
            "sports",
            "events",
            "ticketing",
            "production",
            "creative",
            "agency",
        ],
    ),
    (
        "Education",
        &[
            "education",
            "school",
            "training",
            "learning",
            "university",
            "college",
            "tutoring",
            "curriculum",
        ],
    ),
    (
        "Energy & Utilities",
        &[
            "energy",
            "oil",
            "gas",
            "power",
            "utility",
            "utilities",
            "renewable",
            "solar",
            "wind",
            "pipeline",
            "electric",
            "petroleum",
            "fuel",
        ],
    ),
    (
        "Transportation & Logistics",
        &[
            "logistics",
            "transportation",
            "shipping",
            "freight",
            "trucking",
            "warehouse",
            "supply chain",
            "delivery",
            "courier",
            "aviation",
            "airline",
            "cargo",
        ],
    ),
    (
        "Telecommunications",
        &[
            "telecommunications",
            "telecom",
            "wireless",
            "broadband",
            "network",
            "communication",
            "fiber",
            "tower",
        ],
    ),
    (
        "Real Estate",
        &[
            "real estate",
            "property",
            "housing",
            "residential",
            "leasing",
            "reit",
            "facilities",
        ],
    ),
    (
        "Hospitality",
        &[
            "hospitality",
            "hotel",
            "resort",
            "lodging",
            "accommodation",
            "travel",
            "tourism",
            "venue",
        ],
    ),
    (
        "Agriculture",
        &[
            "agriculture",
            "agricultural",
            "agribusiness",
            "farming",
            "farm",
            "crop",
            "livestock",
        ],
    ),
];

/// Static keyword table classifier.
///
/// Keywords match at the start of a word, so "tech" hits "technical" but
/// "oil" does not hit "foil".
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIndustryClassifier;

impl KeywordIndustryClassifier {
    /// Creates the classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Sector names in match order.
    pub fn sectors() -> impl Iterator<Item = &'static str> {
        SECTOR_KEYWORDS.iter().map(|(sector, _)| *sector)
    }
}

impl IndustryClassifier for KeywordIndustryClassifier {
    fn classify(&self, description: &str) -> Option<String> {
        let lower = description.to_lowercase();
        SECTOR_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| starts_word(&lower, kw)))
            .map(|(sector, _)| (*sector).to_string())
    }
}

fn starts_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(at, _)| {
        text[..at]
            .chars()
            .next_back()
            .is_none_or(|prev| !prev.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sector_wins() {
        let classifier = KeywordIndustryClassifier::new();
        // "software" precedes "healthcare" in the table.
        assert_eq!(
            classifier.classify("Healthcare software provider").as_deref(),
            Some("Software/Technology")
        );
        assert_eq!(
            classifier.classify("Provider of dental practice management").as_deref(),
            Some("Healthcare Services")
        );
    }

    #[test]
    fn test_word_start_matching() {
        let classifier = KeywordIndustryClassifier::new();
        assert_eq!(classifier.classify("Aluminum foil packaging"), None);
        assert_eq!(
            classifier.classify("Oil and gas services").as_deref(),
            Some("Energy & Utilities")
        );
    }

    #[test]
    fn test_fallback_labels() {
        let classifier = KeywordIndustryClassifier::new();
        assert_eq!(classifier.sector(None), UNKNOWN_SECTOR);
        assert_eq!(classifier.sector(Some("  ")), UNKNOWN_SECTOR);
        assert_eq!(classifier.sector(Some("Holding company")), OTHER_SECTOR);
        assert_eq!(classifier.sector(Some("Freight brokerage")), "Financial Services");
    }

    #[test]
    fn test_sector_order() {
        let sectors: Vec<_> = KeywordIndustryClassifier::sectors().collect();
        assert_eq!(sectors.first(), Some(&"Software/Technology"));
        assert_eq!(sectors.len(), 16);
    }
}
