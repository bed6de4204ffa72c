use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult, Money};
use billforge_inventory::StockBanner;
use billforge_invoicing::InvoiceStatus;

use crate::books::{Books, DateRange};
use crate::tax_summary::{TaxBreakdown, TaxSummary};

/// Invoice counts by effective status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStatusCounts {
    pub draft: usize,
    pub unpaid: usize,
    pub partially_paid: usize,
    pub paid: usize,
    pub overdue: usize,
    pub cancelled: usize,
}

impl InvoiceStatusCounts {
    fn bump(&mut self, status: InvoiceStatus) {
        let slot = match status {
            InvoiceStatus::Draft => &mut self.draft,
            InvoiceStatus::Unpaid => &mut self.unpaid,
            InvoiceStatus::PartiallyPaid => &mut self.partially_paid,
            InvoiceStatus::Paid => &mut self.paid,
            InvoiceStatus::Overdue => &mut self.overdue,
            InvoiceStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }
}

/// Home-screen figures.
///
/// Revenue, spend, counts and tax cover `range`. Receivables and the overdue
/// count are as of `today` across all invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub range: DateRange,
    pub sales_revenue: Money,
    pub purchase_spend: Money,
    pub receivables_outstanding: Money,
    pub overdue_invoices: usize,
    pub invoice_counts: InvoiceStatusCounts,
    pub output_tax: TaxBreakdown,
    pub input_tax: TaxBreakdown,
    pub net_tax_payable: Money,
    pub stock: StockBanner,
}

impl Dashboard {
    pub fn build(books: &Books<'_>, range: DateRange, today: NaiveDate) -> DomainResult<Self> {
        let overflow = || DomainError::invariant("amount overflow");
        let mut sales_revenue = Money::ZERO;
        let mut purchase_spend = Money::ZERO;
        let mut receivables = Money::ZERO;
        let mut overdue = 0;
        let mut counts = InvoiceStatusCounts::default();

        for invoice in books.invoices {
            let status = invoice.effective_status(today);
            if status.is_issued() {
                receivables = receivables.checked_add(invoice.outstanding()).ok_or_else(overflow)?;
            }
            if status == InvoiceStatus::Overdue {
                overdue += 1;
            }
            if range.contains(invoice.issue_date()) {
                counts.bump(status);
                if status.is_issued() {
                    sales_revenue = sales_revenue.checked_add(invoice.totals().total).ok_or_else(overflow)?;
                }
            }
        }
        for sale in books.sales.iter().filter(|s| !s.is_invoiced() && range.contains(s.sale_date())) {
            sales_revenue = sales_revenue.checked_add(sale.totals().total).ok_or_else(overflow)?;
        }
        for ret in books
            .sales_returns
            .iter()
            .filter(|r| r.status().is_accepted() && range.contains(r.return_date()))
        {
            sales_revenue = sales_revenue.checked_sub(ret.totals().total).ok_or_else(overflow)?;
        }
        for purchase in books.purchases.iter().filter(|p| range.contains(p.bill_date())) {
            purchase_spend = purchase_spend.checked_add(purchase.totals().total).ok_or_else(overflow)?;
        }
        for ret in books
            .purchase_returns
            .iter()
            .filter(|r| r.counts() && range.contains(r.return_date()))
        {
            purchase_spend = purchase_spend.checked_sub(ret.totals().total).ok_or_else(overflow)?;
        }

        let tax = TaxSummary::build(books, range)?;
        Ok(Self {
            range,
            sales_revenue,
            purchase_spend,
            receivables_outstanding: receivables,
            overdue_invoices: overdue,
            invoice_counts: counts,
            output_tax: tax.output,
            input_tax: tax.input,
            net_tax_payable: tax.net_payable,
            stock: StockBanner::from_items(books.items),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::fixtures::*;
    use billforge_invoicing::{InvoiceInput, PaymentInput};
    use chrono::Utc;

    #[test]
    fn figures_for_a_month() {
        let mut paid_half = invoice(date(2024, 5, 2), vec![line("8471", 1, 1_000, 0.0)], None);
        paid_half
            .record_payment(
                &PaymentInput { amount: Some(Money::from_rupees(400)), ..Default::default() },
                date(2024, 5, 3),
                Utc::now(),
            )
            .unwrap();
        let draft = invoice(date(2024, 5, 2), vec![line("8471", 1, 300, 0.0)], Some(InvoiceStatus::Draft));
        let old_unpaid = invoice(date(2024, 3, 1), vec![line("8471", 1, 200, 0.0)], None);
        let invoices = vec![paid_half, draft, old_unpaid];
        let sales = vec![sale(date(2024, 5, 9), vec![line("4820", 2, 100, 0.0)], None)];
        let purchases = vec![purchase(date(2024, 5, 10), vec![line("4820", 5, 40, 0.0)])];
        let books = Books { invoices: &invoices, sales: &sales, purchases: &purchases, ..Default::default() };
        let range = DateRange::new(date(2024, 5, 1), date(2024, 5, 31)).unwrap();

        let dash = Dashboard::build(&books, range, date(2024, 5, 31)).unwrap();
        assert_eq!(dash.sales_revenue, Money::from_rupees(1_200));
        assert_eq!(dash.purchase_spend, Money::from_rupees(200));
        assert_eq!(dash.receivables_outstanding, Money::from_rupees(800));
        assert_eq!(dash.invoice_counts.partially_paid, 1);
        assert_eq!(dash.invoice_counts.draft, 1);
        assert_eq!(dash.invoice_counts.unpaid, 0);
        assert_eq!(dash.overdue_invoices, 0);
        assert_eq!(dash.stock.message, "All items are sufficiently stocked");
    }

    #[test]
    fn past_due_invoices_count_as_overdue() {
        let mut inv = invoice(date(2024, 5, 1), vec![line("8471", 1, 100, 0.0)], None);
        inv.update(
            "INV-0001".into(),
            &InvoiceInput {
                customer_name: Some("Acme".into()),
                issue_date: Some(date(2024, 5, 1)),
                due_date: Some(date(2024, 5, 15)),
                lines: vec![line("8471", 1, 100, 0.0)],
                ..Default::default()
            },
            billforge_invoicing::InvoiceContext {
                customer: None,
                seller_state: None,
                today: date(2024, 5, 1),
                now: Utc::now(),
            },
        )
        .unwrap();
        let invoices = vec![inv];
        let books = Books { invoices: &invoices, ..Default::default() };
        let range = DateRange::new(date(2024, 5, 1), date(2024, 5, 31)).unwrap();

        let dash = Dashboard::build(&books, range, date(2024, 5, 20)).unwrap();
        assert_eq!(dash.overdue_invoices, 1);
        assert_eq!(dash.invoice_counts.overdue, 1);
    }
}
