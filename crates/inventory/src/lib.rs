//! Inventory domain module.
//!
//! Items, stock levels and stock movements, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod stock;

pub use item::{DEFAULT_LOW_STOCK_THRESHOLD, InventoryItem, InventoryItemId, ItemInput, ItemKind};
pub use stock::{
    BannerLevel, ItemStock, StockBanner, StockMovement, StockReport, StockStatus, apply_movements,
    inbound, net, outbound, replace_inbound, replace_outbound,
};
