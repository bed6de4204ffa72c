use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::validation::normalize_optional;
use billforge_core::{Document, DocumentId, DomainError, DomainResult, FieldErrors, Money, Percent, Timestamps, UserId};
use billforge_gst::{GstRate, HsnCode};

use crate::stock::StockStatus;

billforge_core::document_id!(
    /// Inventory item identifier.
    InventoryItemId
);

/// Reorder level applied when an item does not set one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Physical goods with a quantity on hand.
    #[default]
    Product,
    /// Services never run out of stock.
    Service,
}

/// Create/update form for an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub kind: Option<ItemKind>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hsn: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Paise.
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub purchase_price: Option<Money>,
    #[serde(default)]
    pub gst_rate: Option<Percent>,
    /// Opening stock on create; ignored on update (use stock adjustments).
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

struct ValidItem {
    name: String,
    sku: Option<String>,
    description: Option<String>,
    hsn: Option<HsnCode>,
    unit: String,
    sale_price: Money,
    purchase_price: Option<Money>,
    gst_rate: GstRate,
    low_stock_threshold: i64,
}

impl ItemInput {
    fn validate(&self) -> DomainResult<ValidItem> {
        let mut errors = FieldErrors::new();
        errors
            .require_text("name", &self.name)
            .require("sale_price", self.sale_price.as_ref());

        let hsn = normalize_optional(self.hsn.clone()).and_then(|h| errors.check("hsn", HsnCode::parse(&h)));
        let gst_rate = match self.gst_rate {
            Some(rate) => errors.check("gst_rate", GstRate::new(rate)).unwrap_or_default(),
            None => GstRate::EXEMPT,
        };
        if self.sale_price.is_some_and(Money::is_negative) {
            errors.invalid("sale_price", "must not be negative");
        }
        if self.purchase_price.is_some_and(Money::is_negative) {
            errors.invalid("purchase_price", "must not be negative");
        }
        if self.quantity.is_some_and(|q| q < 0) {
            errors.invalid("quantity", "must not be negative");
        }
        if self.low_stock_threshold.is_some_and(|t| t < 0) {
            errors.invalid("low_stock_threshold", "must not be negative");
        }
        errors.finish()?;

        Ok(ValidItem {
            name: self.name.trim().to_string(),
            sku: normalize_optional(self.sku.clone()),
            description: normalize_optional(self.description.clone()),
            hsn,
            unit: normalize_optional(self.unit.clone()).unwrap_or_else(|| "pcs".to_string()),
            sale_price: self.sale_price.unwrap_or_default(),
            purchase_price: self.purchase_price,
            gst_rate,
            low_stock_threshold: self.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        })
    }
}

/// Document: InventoryItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: InventoryItemId,
    owner: UserId,
    name: String,
    sku: Option<String>,
    kind: ItemKind,
    description: Option<String>,
    hsn: Option<HsnCode>,
    unit: String,
    sale_price: Money,
    purchase_price: Option<Money>,
    gst_rate: GstRate,
    quantity: i64,
    low_stock_threshold: i64,
    version: u64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl InventoryItem {
    pub fn create(owner: UserId, id: InventoryItemId, input: &ItemInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let valid = input.validate()?;
        let kind = input.kind.unwrap_or_default();
        let quantity = match kind {
            ItemKind::Product => input.quantity.unwrap_or(0),
            ItemKind::Service => 0,
        };
        Ok(Self {
            id,
            owner,
            name: valid.name,
            sku: valid.sku,
            kind,
            description: valid.description,
            hsn: valid.hsn,
            unit: valid.unit,
            sale_price: valid.sale_price,
            purchase_price: valid.purchase_price,
            gst_rate: valid.gst_rate,
            quantity,
            low_stock_threshold: valid.low_stock_threshold,
            version: 0,
            timestamps: Timestamps::new(now),
        })
    }

    /// Replace descriptive and pricing fields. Quantity only moves through
    /// [`InventoryItem::adjust_stock`].
    pub fn update(&mut self, input: &ItemInput, now: DateTime<Utc>) -> DomainResult<()> {
        let valid = input.validate()?;
        if let Some(kind) = input.kind {
            if kind != self.kind && self.quantity != 0 {
                return Err(DomainError::invariant("cannot change kind of an item with stock on hand"));
            }
            self.kind = kind;
        }
        self.name = valid.name;
        self.sku = valid.sku;
        self.description = valid.description;
        self.hsn = valid.hsn;
        self.unit = valid.unit;
        self.sale_price = valid.sale_price;
        self.purchase_price = valid.purchase_price;
        self.gst_rate = valid.gst_rate;
        self.low_stock_threshold = valid.low_stock_threshold;
        self.timestamps.touch(now);
        Ok(())
    }

    /// Move stock by `delta`. Stock never goes negative.
    pub fn adjust_stock(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<()> {
        let new_quantity = self.quantity_after(delta)?;
        self.quantity = new_quantity;
        self.timestamps.touch(now);
        Ok(())
    }

    /// Resulting quantity of a stock movement, without applying it.
    pub fn quantity_after(&self, delta: i64) -> DomainResult<i64> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        if !self.tracks_stock() {
            return Err(DomainError::validation(format!(
                "'{}' is a service and does not track stock",
                self.name
            )));
        }
        let new_quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("stock overflow"))?;
        if new_quantity < 0 {
            return Err(DomainError::invariant(format!(
                "insufficient stock for '{}': available {}, requested {}",
                self.name, self.quantity, -delta
            )));
        }
        Ok(new_quantity)
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.kind, self.quantity, self.low_stock_threshold)
    }

    pub fn tracks_stock(&self) -> bool {
        self.kind == ItemKind::Product
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn hsn(&self) -> Option<&HsnCode> {
        self.hsn.as_ref()
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn sale_price(&self) -> Money {
        self.sale_price
    }

    pub fn purchase_price(&self) -> Option<Money> {
        self.purchase_price
    }

    pub fn gst_rate(&self) -> GstRate {
        self.gst_rate
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    /// Stock value at purchase price (sale price when no purchase price is set).
    pub fn stock_value(&self) -> Money {
        let unit = self.purchase_price.unwrap_or(self.sale_price);
        Money::from_paise(unit.paise().saturating_mul(self.quantity))
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }
}

impl Document for InventoryItem {
    const COLLECTION: &'static str = "inventory_items";

    fn document_id(&self) -> DocumentId {
        self.id.0
    }

    fn owner(&self) -> UserId {
        self.owner
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_owner() -> UserId {
        UserId::new()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn product(name: &str, quantity: i64) -> ItemInput {
        ItemInput {
            name: name.into(),
            sale_price: Some(Money::from_rupees(250)),
            gst_rate: Some(Percent::from_basis_points(1800)),
            hsn: Some("8471".into()),
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    #[test]
    fn create_applies_defaults() {
        let item = InventoryItem::create(test_owner(), InventoryItemId::generate(), &product("Mouse", 5), now()).unwrap();
        assert_eq!(item.unit(), "pcs");
        assert_eq!(item.low_stock_threshold(), DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(item.quantity(), 5);
        assert_eq!(item.gst_rate().basis_points(), 1800);
    }

    #[test]
    fn create_reports_missing_fields_together() {
        let err = InventoryItem::create(test_owner(), InventoryItemId::generate(), &ItemInput::default(), now())
            .unwrap_err();
        assert_eq!(err, DomainError::validation("missing required fields: name, sale_price"));
    }

    #[test]
    fn create_rejects_off_slab_rate() {
        let input = ItemInput { gst_rate: Some(Percent::from_basis_points(1000)), ..product("Mouse", 1) };
        let err = InventoryItem::create(test_owner(), InventoryItemId::generate(), &input, now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.starts_with("gst_rate: unsupported GST rate")));
    }

    #[test]
    fn adjust_stock_never_goes_negative() {
        let mut item = InventoryItem::create(test_owner(), InventoryItemId::generate(), &product("Mouse", 3), now()).unwrap();
        item.adjust_stock(-3, now()).unwrap();
        assert_eq!(item.quantity(), 0);

        let err = item.adjust_stock(-1, now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::invariant("insufficient stock for 'Mouse': available 0, requested 1")
        );
        assert_eq!(item.adjust_stock(0, now()).unwrap_err(), DomainError::validation("delta cannot be zero"));
    }

    #[test]
    fn services_do_not_track_stock() {
        let input = ItemInput { kind: Some(ItemKind::Service), ..product("Installation", 99) };
        let mut item = InventoryItem::create(test_owner(), InventoryItemId::generate(), &input, now()).unwrap();
        assert_eq!(item.quantity(), 0);
        assert_eq!(item.stock_status(), StockStatus::InStock);
        assert!(item.adjust_stock(1, now()).is_err());
    }

    #[test]
    fn update_keeps_quantity() {
        let mut item = InventoryItem::create(test_owner(), InventoryItemId::generate(), &product("Mouse", 7), now()).unwrap();
        let input = ItemInput { quantity: Some(100), sale_price: Some(Money::from_rupees(300)), ..product("Wireless Mouse", 0) };
        item.update(&input, now()).unwrap();
        assert_eq!(item.name(), "Wireless Mouse");
        assert_eq!(item.sale_price(), Money::from_rupees(300));
        assert_eq!(item.quantity(), 7);
    }
}
