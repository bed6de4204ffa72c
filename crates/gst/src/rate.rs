use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult, Money, Percent};

/// Notified GST slabs, in basis points.
const SLABS: [u32; 8] = [0, 10, 25, 300, 500, 1200, 1800, 2800];

/// A GST rate restricted to the notified slabs (0, 0.1, 0.25, 3, 5, 12, 18, 28%).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Percent", into = "Percent")]
pub struct GstRate(Percent);

impl GstRate {
    pub const EXEMPT: GstRate = GstRate(Percent::ZERO);

    pub fn new(percent: Percent) -> DomainResult<Self> {
        if SLABS.contains(&percent.basis_points()) {
            Ok(Self(percent))
        } else {
            Err(DomainError::validation(format!(
                "unsupported GST rate {percent}; expected one of 0, 0.1, 0.25, 3, 5, 12, 18, 28"
            )))
        }
    }

    pub fn from_percent(value: f64) -> DomainResult<Self> {
        Self::new(Percent::from_percent(value)?)
    }

    pub fn all() -> impl Iterator<Item = GstRate> {
        SLABS
            .iter()
            .map(|bps| GstRate(Percent::from_basis_points(*bps)))
    }

    pub fn percent(self) -> Percent {
        self.0
    }

    pub fn basis_points(self) -> u32 {
        self.0.basis_points()
    }

    /// Full-rate tax on `taxable`.
    pub fn tax_on(self, taxable: Money) -> Money {
        taxable.percent(self.0)
    }

    /// Half-rate tax on `taxable` (one of CGST / SGST).
    pub fn half_tax_on(self, taxable: Money) -> Money {
        taxable.scale(i64::from(self.basis_points()), 20_000)
    }
}

impl TryFrom<Percent> for GstRate {
    type Error = DomainError;

    fn try_from(value: Percent) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GstRate> for Percent {
    fn from(value: GstRate) -> Self {
        value.0
    }
}

impl core::fmt::Display for GstRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Place-of-supply classification.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyType {
    /// Seller and buyer in the same state: CGST + SGST.
    #[default]
    IntraState,
    /// Different states: IGST.
    InterState,
}

impl SupplyType {
    /// Inter-state only when both states are known and differ.
    pub fn determine(seller_state: Option<&str>, buyer_state: Option<&str>) -> Self {
        match (seller_state, buyer_state) {
            (Some(seller), Some(buyer)) if seller.trim() != buyer.trim() => Self::InterState,
            _ => Self::IntraState,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SupplyType::IntraState => "intra_state",
            SupplyType::InterState => "inter_state",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_slabs_are_accepted() {
        for pct in [0.0, 0.1, 0.25, 3.0, 5.0, 12.0, 18.0, 28.0] {
            assert!(GstRate::from_percent(pct).is_ok(), "{pct}");
        }
        for pct in [1.0, 10.0, 15.0, 40.0] {
            assert!(matches!(GstRate::from_percent(pct), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn rate_deserializes_from_json_number() {
        let rate: GstRate = serde_json::from_str("18").unwrap();
        assert_eq!(rate.basis_points(), 1800);
        assert!(serde_json::from_str::<GstRate>("17").is_err());
        assert_eq!(serde_json::to_string(&rate).unwrap(), "18");
    }

    #[test]
    fn half_tax_rounds_each_component() {
        let rate = GstRate::from_percent(0.25).unwrap();
        // 0.125% of 100.00 = 0.125 -> 0.13
        assert_eq!(rate.half_tax_on(Money::from_rupees(100)), Money::from_paise(13));
        assert_eq!(rate.tax_on(Money::from_rupees(100)), Money::from_paise(25));
    }

    #[test]
    fn supply_type_from_states() {
        assert_eq!(SupplyType::determine(Some("27"), Some("29")), SupplyType::InterState);
        assert_eq!(SupplyType::determine(Some("27"), Some("27")), SupplyType::IntraState);
        assert_eq!(SupplyType::determine(None, Some("29")), SupplyType::IntraState);
        assert_eq!(SupplyType::determine(Some("27"), None), SupplyType::IntraState);
    }
}
