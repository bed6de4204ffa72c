//! GST classification and billing arithmetic.
//!
//! Pure functions over line items: no IO, no clocks.

pub mod gstin;
pub mod hsn;
pub mod line;
pub mod rate;
pub mod returns;
pub mod totals;

pub use gstin::{Gstin, validate_state_code};
pub use hsn::HsnCode;
pub use line::{LineAmounts, LineItem, TaxComponents};
pub use rate::{GstRate, SupplyType};
pub use returns::{ReturnLine, resolve_return_lines, returned_quantities};
pub use totals::{DocumentTotals, RateSummary, line_amounts, rate_breakdown};
