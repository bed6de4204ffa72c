//! Tax summaries, tax timeseries and the dashboard.
//!
//! Reports are read-side projections over the owner's documents. The caller
//! loads the documents; everything here is pure aggregation.

pub mod books;
pub mod dashboard;
pub mod tax_summary;
pub mod timeseries;

pub use books::{Books, DateRange, Side, TaxEntry};
pub use dashboard::{Dashboard, InvoiceStatusCounts};
pub use tax_summary::{HsnSummary, RateRow, TaxBreakdown, TaxSummary};
pub use timeseries::{Granularity, TaxBucket, TaxTimeseries};
