//! Sales domain module: direct sales and sales returns.
//!
//! Pure domain logic. Stock movements are computed by `billforge-inventory`
//! from the lines kept here.

pub mod returns;
pub mod sale;

pub use returns::{SalesReturn, SalesReturnId, SalesReturnInput, SalesReturnStatus, ensure_no_open_returns};
pub use sale::{Sale, SaleContext, SaleId, SaleInput};
