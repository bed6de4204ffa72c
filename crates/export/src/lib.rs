//! Report and document export: CSV, XLSX and PDF.
//!
//! Resources are first turned into a [`Table`] of typed cells; each format
//! renders any table. Invoices additionally have a printable layout.

pub mod csv;
pub mod error;
pub mod format;
pub mod invoice_pdf;
pub mod pdf;
pub mod table;
pub mod tables;
pub mod xlsx;

pub use error::ExportError;
pub use format::ExportFormat;
pub use invoice_pdf::{SellerDetails, render_invoice};
pub use table::{Cell, Table};
pub use tables::{
    customers_table, inventory_table, invoices_table, purchases_table, sales_table, tax_summary_table,
    tax_timeseries_table,
};
