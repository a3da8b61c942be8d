//! Mapping from normalized concept names to investment record fields.

use soi_core::normalize_concept;

/// A record field fed by a tagged concept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// `InvestmentOwnedAtFairValue`
    FairValue,
    /// `InvestmentOwnedAtCost`
    Cost,
    /// `InvestmentOwnedBalancePrincipalAmount`
    Principal,
    /// `InvestmentOwnedBalanceShares`
    Shares,
    /// `InvestmentInterestRate`
    InterestRate,
    /// `InvestmentBasisSpreadVariableRate`
    Spread,
    /// `InvestmentInterestRateFloor`
    Floor,
    /// `InvestmentInterestRatePaidInKind`
    PikRate,
    /// `InvestmentInterestRatePaidInCash`
    CashRate,
    /// `InvestmentOwnedPercentOfNetAssets`
    PctNetAssets,
    /// `InvestmentMaturityDate`
    MaturityDate,
    /// `InvestmentAcquisitionDate`
    AcquisitionDate,
    /// `InvestmentIssuerNameExtensibleEnumeration`
    IssuerName,
    /// `InvestmentTypeExtensibleEnumeration`
    InvestmentType,
    /// `InvestmentIndustrySectorExtensibleEnumeration`
    Industry,
    /// `InvestmentIssuerAffiliationExtensibleEnumeration`
    Affiliation,
    /// `InvestmentVariableInterestRateTypeExtensibleEnumeration`
    RateType,
}

impl Field {
    /// Returns true for fields whose values are extensible enumeration URIs.
    #[must_use]
    pub const fn is_enumeration(&self) -> bool {
        matches!(
            self,
            Self::IssuerName
                | Self::InvestmentType
                | Self::Industry
                | Self::Affiliation
                | Self::RateType
        )
    }
}

/// Field fed by a concept, with or without namespace prefix.
#[must_use]
pub fn field_for(concept: &str) -> Option<Field> {
    let field = match normalize_concept(concept) {
        "InvestmentOwnedAtFairValue" => Field::FairValue,
        "InvestmentOwnedAtCost" => Field::Cost,
        "InvestmentOwnedBalancePrincipalAmount" => Field::Principal,
        "InvestmentOwnedBalanceShares" => Field::Shares,
        "InvestmentInterestRate" => Field::InterestRate,
        "InvestmentBasisSpreadVariableRate" => Field::Spread,
        "InvestmentInterestRateFloor" => Field::Floor,
        "InvestmentInterestRatePaidInKind" => Field::PikRate,
        "InvestmentInterestRatePaidInCash" => Field::CashRate,
        "InvestmentOwnedPercentOfNetAssets" => Field::PctNetAssets,
        "InvestmentMaturityDate" => Field::MaturityDate,
        "InvestmentAcquisitionDate" => Field::AcquisitionDate,
        "InvestmentIssuerNameExtensibleEnumeration" => Field::IssuerName,
        "InvestmentTypeExtensibleEnumeration" => Field::InvestmentType,
        "InvestmentIndustrySectorExtensibleEnumeration" => Field::Industry,
        "InvestmentIssuerAffiliationExtensibleEnumeration" => Field::Affiliation,
        "InvestmentVariableInterestRateTypeExtensibleEnumeration" => Field::RateType,
        _ => return None,
    };
    Some(field)
}

/// Short activity key of a roll-forward concept.
///
/// Duration facts under other concepts are kept under their normalized name.
#[must_use]
pub fn activity_key(concept: &str) -> &str {
    match normalize_concept(concept) {
        "InvestmentsInAndAdvancesToAffiliatesAtFairValueGrossAdditions" => "gross_additions",
        "InvestmentsInAndAdvancesToAffiliatesAtFairValueGrossReductions" => "gross_reductions",
        "DebtAndEquitySecuritiesRealizedGainLoss" => "realized_gain_loss",
        "DebtAndEquitySecuritiesUnrealizedGainLoss" => "unrealized_gain_loss",
        "InterestIncomeOperating" => "interest_income",
        "DividendIncomeOperating" => "dividend_income",
        other => other,
    }
}
