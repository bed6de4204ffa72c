//! The documents a report is built from, flattened into signed tax entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult};
use billforge_gst::{DocumentTotals, LineItem, SupplyType, TaxComponents};
use billforge_inventory::InventoryItem;
use billforge_invoicing::Invoice;
use billforge_purchasing::{Purchase, PurchaseReturn};
use billforge_sales::{Sale, SalesReturn};

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> DomainResult<Self> {
        if from > to {
            return Err(DomainError::validation("from must not be after to"));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Output tax is collected on sales, input tax is paid on purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Output,
    Input,
}

/// One document's contribution to a tax report. Returns contribute negatively.
#[derive(Debug, Clone, Copy)]
pub struct TaxEntry<'a> {
    pub date: NaiveDate,
    pub side: Side,
    pub negated: bool,
    pub lines: &'a [LineItem],
    pub supply_type: SupplyType,
    pub totals: &'a DocumentTotals,
}

impl TaxEntry<'_> {
    /// Signed tax of the whole document.
    pub fn tax(&self) -> TaxComponents {
        self.signed(self.totals.tax())
    }

    pub fn signed(&self, tax: TaxComponents) -> TaxComponents {
        if self.negated { -tax } else { tax }
    }

    pub fn signed_quantity(&self, quantity: i64) -> i64 {
        if self.negated { -quantity } else { quantity }
    }
}

/// Every document of one owner that reports read.
#[derive(Debug, Clone, Copy, Default)]
pub struct Books<'a> {
    pub invoices: &'a [Invoice],
    pub sales: &'a [Sale],
    pub sales_returns: &'a [SalesReturn],
    pub purchases: &'a [Purchase],
    pub purchase_returns: &'a [PurchaseReturn],
    pub items: &'a [InventoryItem],
}

impl<'a> Books<'a> {
    /// Tax entries dated inside `range`.
    ///
    /// Draft and cancelled invoices, sales billed on an invoice, pending or
    /// rejected sales returns and cancelled purchase returns are skipped.
    pub fn tax_entries(&self, range: DateRange) -> Vec<TaxEntry<'a>> {
        let invoices = self.invoices.iter().filter(|i| i.status().is_issued()).map(|i| TaxEntry {
            date: i.issue_date(),
            side: Side::Output,
            negated: false,
            lines: i.lines(),
            supply_type: i.supply_type(),
            totals: i.totals(),
        });
        let sales = self.sales.iter().filter(|s| !s.is_invoiced()).map(|s| TaxEntry {
            date: s.sale_date(),
            side: Side::Output,
            negated: false,
            lines: s.lines(),
            supply_type: s.supply_type(),
            totals: s.totals(),
        });
        let sales_returns = self
            .sales_returns
            .iter()
            .filter(|r| r.status().is_accepted())
            .map(|r| TaxEntry {
                date: r.return_date(),
                side: Side::Output,
                negated: true,
                lines: r.refund_lines(),
                supply_type: r.supply_type(),
                totals: r.totals(),
            });
        let purchases = self.purchases.iter().map(|p| TaxEntry {
            date: p.bill_date(),
            side: Side::Input,
            negated: false,
            lines: p.lines(),
            supply_type: p.supply_type(),
            totals: p.totals(),
        });
        let purchase_returns = self.purchase_returns.iter().filter(|r| r.counts()).map(|r| TaxEntry {
            date: r.return_date(),
            side: Side::Input,
            negated: true,
            lines: r.returned_lines(),
            supply_type: r.supply_type(),
            totals: r.totals(),
        });

        invoices
            .chain(sales)
            .chain(sales_returns)
            .chain(purchases)
            .chain(purchase_returns)
            .filter(|e| range.contains(e.date))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use billforge_invoicing::InvoiceStatus;

    #[test]
    fn range_must_be_ordered() {
        assert!(DateRange::new(date(2024, 5, 2), date(2024, 5, 1)).is_err());
        let range = DateRange::new(date(2024, 5, 1), date(2024, 5, 1)).unwrap();
        assert!(range.contains(date(2024, 5, 1)));
        assert!(!range.contains(date(2024, 5, 2)));
    }

    #[test]
    fn skips_drafts_invoiced_sales_and_out_of_range_documents() {
        let day = date(2024, 5, 10);
        let issued = invoice(day, vec![line("8471", 1, 100, 18.0)], None);
        let invoices = vec![
            issued.clone(),
            invoice(day, vec![line("8471", 1, 100, 18.0)], Some(InvoiceStatus::Draft)),
            invoice(date(2024, 6, 1), vec![line("8471", 1, 100, 18.0)], None),
        ];
        let sales = vec![
            sale(day, vec![line("8471", 1, 100, 18.0)], None),
            sale(day, vec![line("8471", 1, 100, 18.0)], Some(issued.id_typed())),
        ];
        let books = Books { invoices: &invoices, sales: &sales, ..Default::default() };
        let range = DateRange::new(date(2024, 5, 1), date(2024, 5, 31)).unwrap();
        assert_eq!(books.tax_entries(range).len(), 2);
    }
}
