use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult, Money};

use crate::line::{LineAmounts, LineItem, TaxComponents};
use crate::rate::{GstRate, SupplyType};

/// Totals of a billing document.
///
/// Invariant: `total == subtotal + total_tax + round_off`, where `subtotal` is
/// the taxable value after discounts. `round_off` is zero unless rounding to
/// the nearest rupee was requested.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub gross: Money,
    pub discount: Money,
    pub subtotal: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub total_tax: Money,
    pub round_off: Money,
    pub total: Money,
}

impl DocumentTotals {
    pub fn compute(lines: &[LineItem], supply: SupplyType, round_off: bool) -> DomainResult<Self> {
        let amounts = line_amounts(lines, supply)?;

        let overflow = || DomainError::invariant("document total overflow");
        let mut gross = Money::ZERO;
        let mut discount = Money::ZERO;
        let mut tax = TaxComponents::ZERO;
        for a in &amounts {
            gross = gross.checked_add(a.gross).ok_or_else(overflow)?;
            discount = discount.checked_add(a.discount).ok_or_else(overflow)?;
            tax = tax.checked_add(&a.tax)?;
        }

        let total_tax = tax.total_tax();
        let exact = tax.taxable.checked_add(total_tax).ok_or_else(overflow)?;
        let total = if round_off { exact.round_to_rupee() } else { exact };

        Ok(Self {
            gross,
            discount,
            subtotal: tax.taxable,
            cgst: tax.cgst,
            sgst: tax.sgst,
            igst: tax.igst,
            total_tax,
            round_off: total - exact,
            total,
        })
    }

    pub fn tax(&self) -> TaxComponents {
        TaxComponents {
            taxable: self.subtotal,
            cgst: self.cgst,
            sgst: self.sgst,
            igst: self.igst,
        }
    }
}

/// Validate every line and compute its amounts.
///
/// Errors name the 1-based line number they refer to.
pub fn line_amounts(lines: &[LineItem], supply: SupplyType) -> DomainResult<Vec<LineAmounts>> {
    if lines.is_empty() {
        return Err(DomainError::validation("at least one line item is required"));
    }
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            line.amounts(supply).map_err(|e| match e {
                DomainError::Validation(msg) => {
                    DomainError::validation(format!("line {}: {msg}", i + 1))
                }
                other => other,
            })
        })
        .collect()
}

/// Tax grouped by GST slab.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSummary {
    pub rate: GstRate,
    #[serde(flatten)]
    pub tax: TaxComponents,
}

/// Per-slab breakdown, ordered by ascending rate.
pub fn rate_breakdown(lines: &[LineItem], supply: SupplyType) -> DomainResult<Vec<RateSummary>> {
    let amounts = line_amounts(lines, supply)?;
    let mut by_rate: BTreeMap<GstRate, TaxComponents> = BTreeMap::new();
    for (line, a) in lines.iter().zip(amounts.iter()) {
        let entry = by_rate.entry(line.gst_rate).or_default();
        *entry = entry.checked_add(&a.tax)?;
    }
    Ok(by_rate
        .into_iter()
        .map(|(rate, tax)| RateSummary { rate, tax })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use billforge_core::Percent;
    use proptest::prelude::*;

    fn line(quantity: i64, unit_price: i64, discount_bps: u32, rate_bps: u32) -> LineItem {
        LineItem {
            description: "Item".into(),
            item_id: None,
            hsn: None,
            quantity,
            unit: None,
            unit_price: Money::from_paise(unit_price),
            discount_percent: Percent::from_basis_points(discount_bps),
            gst_rate: GstRate::new(Percent::from_basis_points(rate_bps)).unwrap(),
        }
    }

    #[test]
    fn totals_sum_lines_and_tax() {
        let lines = vec![line(2, 50_000, 0, 1800), line(1, 20_000, 500, 500)];
        let totals = DocumentTotals::compute(&lines, SupplyType::IntraState, false).unwrap();

        // 1000.00 + (200.00 - 10.00)
        assert_eq!(totals.gross, Money::from_rupees(1_200));
        assert_eq!(totals.discount, Money::from_rupees(10));
        assert_eq!(totals.subtotal, Money::from_rupees(1_190));
        // 90 + 90 on the first line, 4.75 + 4.75 on the second
        assert_eq!(totals.cgst, Money::from_paise(9_475));
        assert_eq!(totals.sgst, Money::from_paise(9_475));
        assert_eq!(totals.total_tax, Money::from_paise(18_950));
        assert_eq!(totals.round_off, Money::ZERO);
        assert_eq!(totals.total, Money::from_paise(137_950));
    }

    #[test]
    fn round_off_goes_to_nearest_rupee() {
        let lines = vec![line(1, 10_050, 0, 1800)];
        // 100.50 + 18.09 = 118.59 -> 119.00
        let totals = DocumentTotals::compute(&lines, SupplyType::InterState, true).unwrap();
        assert_eq!(totals.total, Money::from_rupees(119));
        assert_eq!(totals.round_off, Money::from_paise(41));
        assert_eq!(totals.subtotal + totals.total_tax + totals.round_off, totals.total);
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = DocumentTotals::compute(&[], SupplyType::IntraState, false).unwrap_err();
        assert_eq!(err, DomainError::validation("at least one line item is required"));
    }

    #[test]
    fn line_errors_name_the_line() {
        let mut bad = line(1, 100, 0, 0);
        bad.description = " ".into();
        let err = DocumentTotals::compute(&[line(1, 100, 0, 0), bad], SupplyType::IntraState, false)
            .unwrap_err();
        assert_eq!(err, DomainError::validation("line 2: description is required"));
    }

    #[test]
    fn breakdown_groups_by_rate() {
        let lines = vec![line(1, 10_000, 0, 1800), line(1, 5_000, 0, 500), line(2, 10_000, 0, 1800)];
        let breakdown = rate_breakdown(&lines, SupplyType::InterState).unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].rate.basis_points(), 500);
        assert_eq!(breakdown[1].tax.taxable, Money::from_rupees(300));
        assert_eq!(breakdown[1].tax.igst, Money::from_rupees(54));
    }

    fn arb_line() -> impl Strategy<Value = LineItem> {
        (
            1i64..1_000,
            0i64..10_000_000,
            0u32..=10_000,
            prop::sample::select(vec![0u32, 10, 25, 300, 500, 1200, 1800, 2800]),
        )
            .prop_map(|(q, p, d, r)| line(q, p, d, r))
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn total_is_subtotal_plus_tax(
            lines in prop::collection::vec(arb_line(), 1..12),
            inter in any::<bool>(),
            round in any::<bool>(),
        ) {
            let supply = if inter { SupplyType::InterState } else { SupplyType::IntraState };
            let totals = DocumentTotals::compute(&lines, supply, round).unwrap();

            prop_assert_eq!(totals.subtotal + totals.total_tax + totals.round_off, totals.total);
            prop_assert_eq!(totals.gross - totals.discount, totals.subtotal);
            if round {
                prop_assert_eq!(totals.total.paise() % 100, 0);
                prop_assert!(totals.round_off.paise().abs() <= 50);
            } else {
                prop_assert_eq!(totals.round_off, Money::ZERO);
            }

            let line_sum: Money = line_amounts(&lines, supply).unwrap().iter().map(|a| a.total).sum();
            prop_assert_eq!(line_sum + totals.round_off, totals.total);
        }
    }
}
