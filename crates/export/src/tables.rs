//! Export tables for each resource.

use chrono::NaiveDate;

use billforge_inventory::{InventoryItem, ItemKind, StockStatus};
use billforge_invoicing::Invoice;
use billforge_parties::{Party, PartyStatus};
use billforge_purchasing::Purchase;
use billforge_reports::{TaxSummary, TaxTimeseries};
use billforge_sales::Sale;

use crate::table::{Cell, Table};

/// Invoice register. Status is the effective status as of `today`.
pub fn invoices_table(invoices: &[Invoice], today: NaiveDate) -> Table {
    let mut table = Table::new(
        "Invoices",
        [
            "Invoice No", "Date", "Due Date", "Customer", "GSTIN", "Status", "Taxable", "CGST", "SGST", "IGST",
            "Total", "Paid", "Balance",
        ],
    );
    for inv in invoices {
        let t = inv.totals();
        table.push_row([
            Cell::from(inv.invoice_number()),
            Cell::from(inv.issue_date()),
            Cell::from(inv.due_date()),
            Cell::from(inv.customer().name.as_str()),
            Cell::from(inv.customer().gstin.as_ref().map(|g| g.as_str())),
            Cell::from(inv.effective_status(today).as_str()),
            Cell::from(t.subtotal),
            Cell::from(t.cgst),
            Cell::from(t.sgst),
            Cell::from(t.igst),
            Cell::from(t.total),
            Cell::from(inv.amount_paid()),
            Cell::from(inv.outstanding()),
        ]);
    }
    table
}

pub fn inventory_table(items: &[InventoryItem]) -> Table {
    let mut table = Table::new(
        "Inventory",
        ["Name", "SKU", "Type", "HSN/SAC", "Unit", "Sale Price", "GST %", "Quantity", "Reorder Level", "Status", "Stock Value"],
    );
    for item in items {
        let kind = match item.kind() {
            ItemKind::Product => "product",
            ItemKind::Service => "service",
        };
        let status = match item.stock_status() {
            StockStatus::InStock => "in stock",
            StockStatus::LowStock => "low stock",
            StockStatus::OutOfStock => "out of stock",
        };
        table.push_row([
            Cell::from(item.name()),
            Cell::from(item.sku()),
            Cell::from(kind),
            Cell::from(item.hsn().map(|h| h.as_str())),
            Cell::from(item.unit()),
            Cell::from(item.sale_price()),
            Cell::from(item.gst_rate().percent()),
            Cell::from(item.quantity()),
            Cell::from(item.low_stock_threshold()),
            Cell::from(status),
            Cell::from(item.stock_value()),
        ]);
    }
    table
}

pub fn customers_table(parties: &[Party]) -> Table {
    let mut table = Table::new("Customers", ["Name", "Type", "Email", "Phone", "GSTIN", "State", "Address", "Status"]);
    for party in parties {
        let status = match party.status() {
            PartyStatus::Active => "active",
            PartyStatus::Suspended => "suspended",
        };
        table.push_row([
            Cell::from(party.name()),
            Cell::from(party.kind().as_str()),
            Cell::from(party.contact().email.as_deref()),
            Cell::from(party.contact().phone.as_deref()),
            Cell::from(party.gstin().map(|g| g.as_str())),
            Cell::from(party.state_code()),
            Cell::from(party.contact().address.as_deref()),
            Cell::from(status),
        ]);
    }
    table
}

pub fn sales_table(sales: &[Sale]) -> Table {
    let mut table = Table::new(
        "Sales",
        ["Date", "Customer", "Payment Mode", "Items", "Taxable", "Tax", "Total", "Invoiced"],
    );
    for sale in sales {
        let t = sale.totals();
        table.push_row([
            Cell::from(sale.sale_date()),
            Cell::from(sale.customer_name()),
            Cell::from(sale.payment_mode().as_str()),
            Cell::from(sale.lines().len() as i64),
            Cell::from(t.subtotal),
            Cell::from(t.total_tax),
            Cell::from(t.total),
            Cell::from(if sale.is_invoiced() { "yes" } else { "no" }),
        ]);
    }
    table
}

pub fn purchases_table(purchases: &[Purchase]) -> Table {
    let mut table = Table::new(
        "Purchases",
        ["Bill Date", "Bill No", "Supplier", "GSTIN", "Payment Status", "Taxable", "Tax", "Total"],
    );
    for p in purchases {
        let t = p.totals();
        table.push_row([
            Cell::from(p.bill_date()),
            Cell::from(p.bill_number()),
            Cell::from(p.supplier().name.as_str()),
            Cell::from(p.supplier().gstin.as_ref().map(|g| g.as_str())),
            Cell::from(p.payment_status().as_str()),
            Cell::from(t.subtotal),
            Cell::from(t.total_tax),
            Cell::from(t.total),
        ]);
    }
    table
}

/// Output, input and net rows followed by the rate-wise breakdown.
pub fn tax_summary_table(summary: &TaxSummary) -> Table {
    let title = format!("GST Summary {} to {}", summary.range.from, summary.range.to);
    let mut table = Table::new(title, ["Section", "Rate", "Taxable", "CGST", "SGST", "IGST", "Total Tax"]);
    for (label, b) in [("Output tax", &summary.output), ("Input tax", &summary.input)] {
        table.push_row([
            Cell::from(label),
            Cell::Empty,
            Cell::from(b.taxable),
            Cell::from(b.cgst),
            Cell::from(b.sgst),
            Cell::from(b.igst),
            Cell::from(b.total_tax),
        ]);
    }
    table.push_row([
        Cell::from("Net payable"),
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::Empty,
        Cell::from(summary.net_payable),
    ]);
    for row in &summary.rate_wise {
        for (label, b) in [("Output by rate", &row.output), ("Input by rate", &row.input)] {
            if b.taxable.is_zero() && b.total_tax.is_zero() {
                continue;
            }
            table.push_row([
                Cell::from(label),
                Cell::from(row.rate.percent()),
                Cell::from(b.taxable),
                Cell::from(b.cgst),
                Cell::from(b.sgst),
                Cell::from(b.igst),
                Cell::from(b.total_tax),
            ]);
        }
    }
    table
}

pub fn tax_timeseries_table(series: &TaxTimeseries) -> Table {
    let title = format!("GST by {} {} to {}", series.granularity.as_str(), series.range.from, series.range.to);
    let mut table = Table::new(title, ["Period", "From", "To", "Output Tax", "Input Tax", "Net"]);
    for b in &series.buckets {
        table.push_row([
            Cell::from(b.label.as_str()),
            Cell::from(b.period_start),
            Cell::from(b.period_end),
            Cell::from(b.output_tax),
            Cell::from(b.input_tax),
            Cell::from(b.net),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use billforge_core::{Money, UserId};
    use billforge_gst::{GstRate, LineItem};
    use billforge_invoicing::{InvoiceContext, InvoiceId, InvoiceInput};
    use billforge_reports::{Books, DateRange, Granularity};
    use chrono::Utc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn invoice() -> Invoice {
        let input = InvoiceInput {
            customer_name: Some("Acme".into()),
            issue_date: Some(day(2)),
            due_date: Some(day(10)),
            lines: vec![LineItem {
                description: "Router".into(),
                item_id: None,
                hsn: None,
                quantity: 2,
                unit: None,
                unit_price: Money::from_rupees(2_500),
                discount_percent: Default::default(),
                gst_rate: GstRate::from_percent(18.0).unwrap(),
            }],
            ..Default::default()
        };
        let ctx = InvoiceContext { customer: None, seller_state: None, today: day(2), now: Utc::now() };
        Invoice::create(UserId::new(), InvoiceId::generate(), "INV-0007".into(), &input, ctx).unwrap()
    }

    #[test]
    fn invoice_rows_use_effective_status() {
        let table = invoices_table(&[invoice()], day(20));
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][5], Cell::from("overdue"));
        assert_eq!(table.rows[0][10], Cell::from(Money::from_rupees(5_900)));
    }

    #[test]
    fn tax_tables_render_to_csv() {
        let invoices = vec![invoice()];
        let books = Books { invoices: &invoices, ..Default::default() };
        let range = DateRange::new(day(1), day(31)).unwrap();

        let summary = TaxSummary::build(&books, range).unwrap();
        let table = tax_summary_table(&summary);
        assert_eq!(table.rows.len(), 4);
        let csv = String::from_utf8(crate::csv::render(&table).unwrap()).unwrap();
        assert!(csv.contains("Output tax,,5000.00,450.00,450.00,0.00,900.00"));

        let series = TaxTimeseries::build(&books, range, Granularity::Week).unwrap();
        let table = tax_timeseries_table(&series);
        assert_eq!(table.rows.len(), series.buckets.len());
    }
}
