use core::ops::{Add, AddAssign, Neg, Sub};
use serde::{Deserialize, Serialize};

use billforge_core::{DocumentId, DomainError, DomainResult, Money, Percent};

use crate::hsn::HsnCode;
use crate::rate::{GstRate, SupplyType};

/// One billable line on an invoice, sale, purchase or return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    /// Linked inventory item, if the line moves stock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn: Option<HsnCode>,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Price per unit in paise, before discount and tax.
    pub unit_price: Money,
    #[serde(default)]
    pub discount_percent: Percent,
    #[serde(default)]
    pub gst_rate: GstRate,
}

impl LineItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if self.unit_price.is_negative() {
            return Err(DomainError::validation("unit_price must not be negative"));
        }
        if self.discount_percent > Percent::HUNDRED {
            return Err(DomainError::validation(
                "discount_percent must be between 0 and 100",
            ));
        }
        Ok(())
    }

    /// Copy of this line with a different quantity (used for partial returns).
    pub fn with_quantity(&self, quantity: i64) -> LineItem {
        LineItem {
            quantity,
            ..self.clone()
        }
    }

    /// Compute gross, discount and tax for this line.
    pub fn amounts(&self, supply: SupplyType) -> DomainResult<LineAmounts> {
        self.validate()?;

        let gross = self.unit_price.checked_mul(self.quantity)?;
        let discount = gross.percent(self.discount_percent);
        let taxable = gross
            .checked_sub(discount)
            .ok_or_else(|| DomainError::invariant("line amount overflow"))?;

        let tax = match supply {
            SupplyType::IntraState => {
                let half = self.gst_rate.half_tax_on(taxable);
                TaxComponents {
                    taxable,
                    cgst: half,
                    sgst: half,
                    igst: Money::ZERO,
                }
            }
            SupplyType::InterState => TaxComponents {
                taxable,
                cgst: Money::ZERO,
                sgst: Money::ZERO,
                igst: self.gst_rate.tax_on(taxable),
            },
        };

        let total = taxable
            .checked_add(tax.total_tax())
            .ok_or_else(|| DomainError::invariant("line amount overflow"))?;

        Ok(LineAmounts {
            gross,
            discount,
            tax,
            total,
        })
    }
}

/// Taxable value and its GST components.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComponents {
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
}

impl TaxComponents {
    pub const ZERO: TaxComponents = TaxComponents {
        taxable: Money::ZERO,
        cgst: Money::ZERO,
        sgst: Money::ZERO,
        igst: Money::ZERO,
    };

    pub fn total_tax(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }

    pub fn checked_add(&self, other: &TaxComponents) -> DomainResult<TaxComponents> {
        let add = |a: Money, b: Money| {
            a.checked_add(b)
                .ok_or_else(|| DomainError::invariant("tax total overflow"))
        };
        Ok(TaxComponents {
            taxable: add(self.taxable, other.taxable)?,
            cgst: add(self.cgst, other.cgst)?,
            sgst: add(self.sgst, other.sgst)?,
            igst: add(self.igst, other.igst)?,
        })
    }
}

impl Add for TaxComponents {
    type Output = TaxComponents;

    fn add(self, rhs: TaxComponents) -> TaxComponents {
        TaxComponents {
            taxable: self.taxable + rhs.taxable,
            cgst: self.cgst + rhs.cgst,
            sgst: self.sgst + rhs.sgst,
            igst: self.igst + rhs.igst,
        }
    }
}

impl AddAssign for TaxComponents {
    fn add_assign(&mut self, rhs: TaxComponents) {
        *self = *self + rhs;
    }
}

impl Neg for TaxComponents {
    type Output = TaxComponents;

    fn neg(self) -> TaxComponents {
        TaxComponents {
            taxable: -self.taxable,
            cgst: -self.cgst,
            sgst: -self.sgst,
            igst: -self.igst,
        }
    }
}

impl Sub for TaxComponents {
    type Output = TaxComponents;

    fn sub(self, rhs: TaxComponents) -> TaxComponents {
        self + (-rhs)
    }
}

/// Computed amounts for a single line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub gross: Money,
    pub discount: Money,
    #[serde(flatten)]
    pub tax: TaxComponents,
    pub total: Money,
}

impl LineAmounts {
    pub fn taxable(&self) -> Money {
        self.tax.taxable
    }

    pub fn total_tax(&self) -> Money {
        self.tax.total_tax()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i64, unit_price: i64, discount: u32, rate: f64) -> LineItem {
        LineItem {
            description: "Widget".into(),
            item_id: None,
            hsn: None,
            quantity,
            unit: None,
            unit_price: Money::from_paise(unit_price),
            discount_percent: Percent::from_basis_points(discount),
            gst_rate: GstRate::from_percent(rate).unwrap(),
        }
    }

    #[test]
    fn intra_state_splits_tax_in_half() {
        let amounts = line(3, 10_000, 0, 18.0).amounts(SupplyType::IntraState).unwrap();
        assert_eq!(amounts.gross, Money::from_rupees(300));
        assert_eq!(amounts.tax.cgst, Money::from_rupees(27));
        assert_eq!(amounts.tax.sgst, Money::from_rupees(27));
        assert_eq!(amounts.tax.igst, Money::ZERO);
        assert_eq!(amounts.total, Money::from_rupees(354));
    }

    #[test]
    fn inter_state_uses_igst() {
        let amounts = line(3, 10_000, 0, 18.0).amounts(SupplyType::InterState).unwrap();
        assert_eq!(amounts.tax.igst, Money::from_rupees(54));
        assert_eq!(amounts.tax.cgst + amounts.tax.sgst, Money::ZERO);
    }

    #[test]
    fn discount_applies_before_tax() {
        // 2 × 999.99 = 1999.98, 10% off = 199.998 -> 200.00, taxable 1799.98
        let amounts = line(2, 99_999, 1_000, 12.0).amounts(SupplyType::InterState).unwrap();
        assert_eq!(amounts.discount, Money::from_paise(20_000));
        assert_eq!(amounts.taxable(), Money::from_paise(179_998));
        // 12% of 1799.98 = 215.9976 -> 216.00
        assert_eq!(amounts.tax.igst, Money::from_paise(21_600));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let err = line(0, 100, 0, 5.0).amounts(SupplyType::IntraState).unwrap_err();
        assert_eq!(err, DomainError::validation("quantity must be positive"));
    }

    #[test]
    fn rejects_discount_over_hundred() {
        let err = line(1, 100, 10_001, 5.0).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn overflow_is_an_invariant_violation() {
        let err = line(i64::MAX, 2, 0, 0.0).amounts(SupplyType::IntraState).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let line: LineItem = serde_json::from_value(serde_json::json!({
            "description": "Consulting",
            "quantity": 1,
            "unit_price": 150000,
            "hsn": "998314"
        }))
        .unwrap();
        assert_eq!(line.gst_rate, GstRate::EXEMPT);
        assert_eq!(line.discount_percent, Percent::ZERO);
        assert_eq!(line.hsn.unwrap().as_str(), "998314");
    }
}
