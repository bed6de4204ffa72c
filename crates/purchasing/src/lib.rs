//! Purchasing domain module: supplier bills and returns to suppliers.

pub mod purchase;
pub mod returns;

pub use purchase::{Purchase, PurchaseContext, PurchaseId, PurchaseInput, PurchasePaymentStatus};
pub use returns::{
    PurchaseReturn, PurchaseReturnId, PurchaseReturnInput, PurchaseReturnStatus, ensure_no_open_returns,
};
