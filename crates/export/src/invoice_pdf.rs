//! Printable tax invoice.

use chrono::NaiveDate;

use billforge_core::Money;
use billforge_gst::{line_amounts, rate_breakdown};
use billforge_invoicing::Invoice;

use crate::error::ExportError;
use crate::pdf::{Align, PageWriter, pdf_money};

/// Seller block printed at the top of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellerDetails {
    pub name: String,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

const LINE_COLUMNS: [(&str, f32, Align); 9] = [
    ("#", 0.04, Align::Left),
    ("Description", 0.26, Align::Left),
    ("HSN/SAC", 0.10, Align::Left),
    ("Qty", 0.06, Align::Right),
    ("Rate", 0.12, Align::Right),
    ("Disc %", 0.08, Align::Right),
    ("GST %", 0.08, Align::Right),
    ("Taxable", 0.13, Align::Right),
    ("Amount", 0.13, Align::Right),
];

fn date(d: NaiveDate) -> String {
    d.format("%d-%m-%Y").to_string()
}

pub fn render_invoice(seller: &SellerDetails, invoice: &Invoice, today: NaiveDate) -> Result<Vec<u8>, ExportError> {
    let title = format!("Invoice {}", invoice.invoice_number());
    let mut pdf = PageWriter::new(&title, false)?;
    let right = pdf.left() + pdf.content_width();

    pdf.text_at("TAX INVOICE", 14.0, right, true, Align::Right);
    pdf.line(&seller.name, 14.0, true);
    for detail in [&seller.address, &seller.phone, &seller.email].into_iter().flatten() {
        pdf.line(detail, 9.0, false);
    }
    if let Some(gstin) = &seller.gstin {
        pdf.line(&format!("GSTIN: {gstin}"), 9.0, false);
    }
    pdf.advance(3.0);

    pdf.text_at(&format!("Invoice no: {}", invoice.invoice_number()), 9.0, right, true, Align::Right);
    pdf.line("Bill to", 10.0, true);
    pdf.text_at(&format!("Date: {}", date(invoice.issue_date())), 9.0, right, false, Align::Right);
    let customer = invoice.customer();
    pdf.line(&customer.name, 9.0, false);
    if let Some(due) = invoice.due_date() {
        pdf.text_at(&format!("Due: {}", date(due)), 9.0, right, false, Align::Right);
    }
    if let Some(address) = &customer.address {
        pdf.line(address, 9.0, false);
    }
    pdf.text_at(
        &format!("Status: {}", invoice.effective_status(today)),
        9.0,
        right,
        false,
        Align::Right,
    );
    if let Some(gstin) = &customer.gstin {
        pdf.line(&format!("GSTIN: {}", gstin.as_str()), 9.0, false);
    }
    if let Some(state) = customer.state() {
        pdf.line(&format!("State code: {state}"), 9.0, false);
    }
    pdf.line(&format!("Supply: {}", invoice.supply_type().as_str().replace('_', "-")), 9.0, false);
    pdf.advance(4.0);

    let widths: Vec<f32> = LINE_COLUMNS.iter().map(|(_, w, _)| w * pdf.content_width()).collect();
    let header: Vec<(String, Align)> = LINE_COLUMNS.iter().map(|(h, _, a)| (h.to_string(), *a)).collect();
    pdf.row(&header, &widths, true);

    let amounts = line_amounts(invoice.lines(), invoice.supply_type())?;
    for (i, (line, a)) in invoice.lines().iter().zip(&amounts).enumerate() {
        if pdf.ensure_space(5.0) {
            pdf.row(&header, &widths, true);
        }
        let cells = [
            ((i + 1).to_string(), Align::Left),
            (line.description.clone(), Align::Left),
            (line.hsn.as_ref().map(|h| h.as_str().to_string()).unwrap_or_default(), Align::Left),
            (line.quantity.to_string(), Align::Right),
            (pdf_money(line.unit_price), Align::Right),
            (line.discount_percent.to_string(), Align::Right),
            (line.gst_rate.to_string(), Align::Right),
            (pdf_money(a.taxable()), Align::Right),
            (pdf_money(a.total), Align::Right),
        ];
        pdf.row(&cells, &widths, false);
    }
    pdf.advance(4.0);

    let totals = invoice.totals();
    let mut summary: Vec<(&str, Money)> = vec![("Subtotal", totals.subtotal)];
    if !totals.discount.is_zero() {
        summary.insert(0, ("Discount", totals.discount));
    }
    if totals.igst.is_zero() {
        summary.push(("CGST", totals.cgst));
        summary.push(("SGST", totals.sgst));
    } else {
        summary.push(("IGST", totals.igst));
    }
    if !totals.round_off.is_zero() {
        summary.push(("Round off", totals.round_off));
    }
    summary.push(("Total", totals.total));
    if !invoice.amount_paid().is_zero() {
        summary.push(("Paid", invoice.amount_paid()));
        summary.push(("Balance due", invoice.outstanding()));
    }

    let label_x = right - 70.0;
    for (label, amount) in summary {
        pdf.ensure_space(5.0);
        let bold = matches!(label, "Total" | "Balance due");
        pdf.text_at(label, 9.5, label_x, bold, Align::Left);
        pdf.text_at(&pdf_money(amount), 9.5, right, bold, Align::Right);
        pdf.advance(5.0);
    }
    pdf.advance(4.0);

    pdf.line("Tax breakdown", 10.0, true);
    let tax_widths = vec![pdf.content_width() / 5.0; 5];
    let tax_header = ["Rate", "Taxable", "CGST", "SGST", "IGST"].map(|h| (h.to_string(), Align::Right));
    pdf.row(&tax_header, &tax_widths, true);
    for row in rate_breakdown(invoice.lines(), invoice.supply_type())? {
        pdf.ensure_space(5.0);
        let cells = [
            row.rate.to_string(),
            pdf_money(row.tax.taxable),
            pdf_money(row.tax.cgst),
            pdf_money(row.tax.sgst),
            pdf_money(row.tax.igst),
        ]
        .map(|s| (s, Align::Right));
        pdf.row(&cells, &tax_widths, false);
    }

    if let Some(notes) = invoice.notes() {
        pdf.advance(4.0);
        pdf.line("Notes", 10.0, true);
        pdf.line(notes, 9.0, false);
    }
    pdf.finish()
}
