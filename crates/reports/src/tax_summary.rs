use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult, Money};
use billforge_gst::{GstRate, TaxComponents, line_amounts, rate_breakdown};

use crate::books::{Books, DateRange, Side};

/// Taxable value and GST components, with their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub total_tax: Money,
}

impl From<TaxComponents> for TaxBreakdown {
    fn from(tax: TaxComponents) -> Self {
        Self {
            taxable: tax.taxable,
            cgst: tax.cgst,
            sgst: tax.sgst,
            igst: tax.igst,
            total_tax: tax.total_tax(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRow {
    pub rate: GstRate,
    pub output: TaxBreakdown,
    pub input: TaxBreakdown,
}

/// Outward supplies grouped by HSN/SAC code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsnSummary {
    /// `None` groups lines without a code.
    pub hsn: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub taxable: Money,
    pub total_tax: Money,
}

/// GST position over a date range.
///
/// `net_payable = output.total_tax - input.total_tax`; a negative value is
/// input credit carried forward and is also reported as `input_credit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub range: DateRange,
    pub output: TaxBreakdown,
    pub input: TaxBreakdown,
    pub net_payable: Money,
    pub input_credit: Money,
    pub rate_wise: Vec<RateRow>,
    pub hsn_wise: Vec<HsnSummary>,
}

impl TaxSummary {
    pub fn build(books: &Books<'_>, range: DateRange) -> DomainResult<Self> {
        let mut output = TaxComponents::ZERO;
        let mut input = TaxComponents::ZERO;
        let mut by_rate: BTreeMap<GstRate, (TaxComponents, TaxComponents)> = BTreeMap::new();
        let mut by_hsn: BTreeMap<Option<String>, HsnSummary> = BTreeMap::new();

        for entry in books.tax_entries(range) {
            let side_total = match entry.side {
                Side::Output => &mut output,
                Side::Input => &mut input,
            };
            *side_total = side_total.checked_add(&entry.tax())?;

            for row in rate_breakdown(entry.lines, entry.supply_type)? {
                let (out, inp) = by_rate.entry(row.rate).or_default();
                let slot = match entry.side {
                    Side::Output => out,
                    Side::Input => inp,
                };
                *slot = slot.checked_add(&entry.signed(row.tax))?;
            }

            if entry.side == Side::Output {
                let amounts = line_amounts(entry.lines, entry.supply_type)?;
                for (line, a) in entry.lines.iter().zip(amounts) {
                    let key = line.hsn.as_ref().map(|h| h.as_str().to_string());
                    let row = by_hsn.entry(key.clone()).or_insert_with(|| HsnSummary {
                        hsn: key,
                        description: line.description.clone(),
                        quantity: 0,
                        taxable: Money::ZERO,
                        total_tax: Money::ZERO,
                    });
                    let tax = entry.signed(a.tax);
                    row.quantity = row
                        .quantity
                        .checked_add(entry.signed_quantity(line.quantity))
                        .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
                    row.taxable = row.taxable.try_add(tax.taxable)?;
                    row.total_tax = row.total_tax.try_add(tax.total_tax())?;
                }
            }
        }

        let net_payable = output.total_tax().try_sub(input.total_tax())?;
        Ok(Self {
            range,
            output: output.into(),
            input: input.into(),
            net_payable,
            input_credit: if net_payable.is_negative() { -net_payable } else { Money::ZERO },
            rate_wise: by_rate
                .into_iter()
                .map(|(rate, (out, inp))| RateRow {
                    rate,
                    output: out.into(),
                    input: inp.into(),
                })
                .collect(),
            hsn_wise: by_hsn.into_values().collect(),
        })
    }
}
