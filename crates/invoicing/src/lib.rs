//! Invoicing domain module.
//!
//! Invoice documents, their status lifecycle and payments. Pure domain
//! logic: numbering and uniqueness checks need the caller's existing
//! invoices, persistence lives in `billforge-infra`.

pub mod invoice;
pub mod numbering;
pub mod payment;

pub use invoice::{Invoice, InvoiceContext, InvoiceFilter, InvoiceId, InvoiceInput, InvoiceStatus};
pub use numbering::{INVOICE_PREFIX, next_invoice_number, normalize_invoice_number};
pub use payment::{Payment, PaymentInput, PaymentMode};
