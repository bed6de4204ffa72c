//! Stock levels, the dashboard banner and multi-item stock movements.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult};
use billforge_gst::LineItem;

use crate::item::{InventoryItem, InventoryItemId, ItemKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn classify(kind: ItemKind, quantity: i64, threshold: i64) -> Self {
        if kind == ItemKind::Service {
            return StockStatus::InStock;
        }
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    Ok,
    Warning,
    Critical,
}

/// Dashboard stock alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBanner {
    pub level: BannerLevel,
    pub out_of_stock_count: usize,
    pub low_stock_count: usize,
    pub out_of_stock_items: Vec<String>,
    pub low_stock_items: Vec<String>,
    pub message: String,
}

impl StockBanner {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        let mut out = Vec::new();
        let mut low = Vec::new();
        for item in items {
            match item.stock_status() {
                StockStatus::OutOfStock => out.push(item.name().to_string()),
                StockStatus::LowStock => low.push(item.name().to_string()),
                StockStatus::InStock => {}
            }
        }
        out.sort();
        low.sort();

        let level = if !out.is_empty() {
            BannerLevel::Critical
        } else if !low.is_empty() {
            BannerLevel::Warning
        } else {
            BannerLevel::Ok
        };

        Self {
            level,
            out_of_stock_count: out.len(),
            low_stock_count: low.len(),
            message: banner_message(out.len(), low.len()),
            out_of_stock_items: out,
            low_stock_items: low,
        }
    }
}

fn banner_message(out: usize, low: usize) -> String {
    let items = |n: usize| if n == 1 { "item" } else { "items" };
    match (out, low) {
        (0, 0) => "All items are sufficiently stocked".to_string(),
        (o, 0) => format!("{o} {} out of stock", items(o)),
        (0, l) => format!("{l} {} running low", items(l)),
        (o, l) => format!("{o} {} out of stock, {l} {} running low", items(o), items(l)),
    }
}

/// Per-item stock line for the inventory status view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStock {
    pub id: InventoryItemId,
    pub name: String,
    pub quantity: i64,
    pub low_stock_threshold: i64,
    pub status: StockStatus,
}

impl From<&InventoryItem> for ItemStock {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: item.id_typed(),
            name: item.name().to_string(),
            quantity: item.quantity(),
            low_stock_threshold: item.low_stock_threshold(),
            status: item.stock_status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReport {
    pub banner: StockBanner,
    pub items: Vec<ItemStock>,
}

impl StockReport {
    pub fn build(items: &[InventoryItem]) -> Self {
        Self {
            banner: StockBanner::from_items(items),
            items: items.iter().map(ItemStock::from).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stock movements
// ─────────────────────────────────────────────────────────────────────────────

/// A signed quantity change for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub item_id: InventoryItemId,
    pub delta: i64,
}

/// Stock leaving the business (sale, purchase return): `-quantity` per linked line.
pub fn outbound(lines: &[LineItem]) -> Vec<StockMovement> {
    linked(lines, -1)
}

/// Stock arriving (purchase, approved sales return): `+quantity` per linked line.
pub fn inbound(lines: &[LineItem]) -> Vec<StockMovement> {
    linked(lines, 1)
}

/// Movements that turn an already-applied outbound document `old` into `new`.
pub fn replace_outbound(old: &[LineItem], new: &[LineItem]) -> Vec<StockMovement> {
    let mut moves = inbound(old);
    moves.extend(outbound(new));
    moves
}

/// Movements that turn an already-applied inbound document `old` into `new`.
pub fn replace_inbound(old: &[LineItem], new: &[LineItem]) -> Vec<StockMovement> {
    let mut moves = outbound(old);
    moves.extend(inbound(new));
    moves
}

fn linked(lines: &[LineItem], sign: i64) -> Vec<StockMovement> {
    lines
        .iter()
        .filter_map(|line| {
            line.item_id.map(|id| StockMovement {
                item_id: InventoryItemId::from(id),
                delta: sign * line.quantity,
            })
        })
        .collect()
}

/// Sum movements per item, dropping items that net to zero.
pub fn net(movements: &[StockMovement]) -> DomainResult<BTreeMap<InventoryItemId, i64>> {
    let mut by_item: BTreeMap<InventoryItemId, i64> = BTreeMap::new();
    for m in movements {
        let total = by_item.entry(m.item_id).or_default();
        *total = total
            .checked_add(m.delta)
            .ok_or_else(|| DomainError::invariant(format!("stock movement overflow for item {}", m.item_id)))?;
    }
    by_item.retain(|_, delta| *delta != 0);
    Ok(by_item)
}

/// Validate every movement against the current items and return the items to
/// write back. Nothing is returned unless every movement is valid.
///
/// Movements against services are ignored. A movement against an item that is
/// not in `items` is a validation error.
pub fn apply_movements(
    items: &HashMap<InventoryItemId, InventoryItem>,
    movements: &[StockMovement],
    now: DateTime<Utc>,
) -> DomainResult<Vec<InventoryItem>> {
    let mut changed = Vec::new();
    for (item_id, delta) in net(movements)? {
        let item = items
            .get(&item_id)
            .ok_or_else(|| DomainError::validation(format!("unknown inventory item {item_id}")))?;
        if !item.tracks_stock() {
            continue;
        }
        let mut updated = item.clone();
        updated.adjust_stock(delta, now)?;
        changed.push(updated);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemInput;
    use billforge_core::{Money, UserId};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn item(name: &str, kind: ItemKind, quantity: i64) -> InventoryItem {
        let input = ItemInput {
            name: name.into(),
            kind: Some(kind),
            sale_price: Some(Money::from_rupees(10)),
            quantity: Some(quantity),
            ..Default::default()
        };
        InventoryItem::create(UserId::new(), InventoryItemId::generate(), &input, now()).unwrap()
    }

    fn line_for(item: &InventoryItem, quantity: i64) -> LineItem {
        LineItem {
            description: item.name().into(),
            item_id: Some(item.id_typed().document_id()),
            hsn: None,
            quantity,
            unit: None,
            unit_price: item.sale_price(),
            discount_percent: Default::default(),
            gst_rate: item.gst_rate(),
        }
    }

    #[test]
    fn classify_thresholds() {
        assert_eq!(StockStatus::classify(ItemKind::Product, 0, 10), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(ItemKind::Product, 10, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(ItemKind::Product, 11, 10), StockStatus::InStock);
        assert_eq!(StockStatus::classify(ItemKind::Product, 1, 0), StockStatus::InStock);
        assert_eq!(StockStatus::classify(ItemKind::Service, 0, 10), StockStatus::InStock);
    }

    #[test]
    fn banner_levels_and_message() {
        let items = vec![
            item("Cable", ItemKind::Product, 0),
            item("Adapter", ItemKind::Product, 0),
            item("Mouse", ItemKind::Product, 4),
            item("Keyboard", ItemKind::Product, 40),
            item("Setup", ItemKind::Service, 0),
        ];
        let banner = StockBanner::from_items(&items);
        assert_eq!(banner.level, BannerLevel::Critical);
        assert_eq!(banner.message, "2 items out of stock, 1 item running low");
        assert_eq!(banner.out_of_stock_items, vec!["Adapter", "Cable"]);
        assert_eq!(banner.low_stock_items, vec!["Mouse"]);

        let banner = StockBanner::from_items(&items[2..]);
        assert_eq!(banner.level, BannerLevel::Warning);
        assert_eq!(banner.message, "1 item running low");

        let banner = StockBanner::from_items(&items[3..]);
        assert_eq!(banner.level, BannerLevel::Ok);
        assert_eq!(banner.message, "All items are sufficiently stocked");
    }

    #[test]
    fn insufficient_stock_rejects_the_whole_batch() {
        let mouse = item("Mouse", ItemKind::Product, 5);
        let cable = item("Cable", ItemKind::Product, 1);
        let items: HashMap<_, _> = [mouse.clone(), cable.clone()]
            .into_iter()
            .map(|i| (i.id_typed(), i))
            .collect();

        let moves = outbound(&[line_for(&mouse, 2), line_for(&cable, 2)]);
        let err = apply_movements(&items, &moves, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("'Cable'")));

        let moves = outbound(&[line_for(&mouse, 2), line_for(&cable, 1)]);
        let changed = apply_movements(&items, &moves, now()).unwrap();
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().all(|i| i.quantity() == 3 || i.quantity() == 0));
    }

    #[test]
    fn replacement_applies_only_the_difference() {
        let mouse = item("Mouse", ItemKind::Product, 1);
        let old = vec![line_for(&mouse, 4)];
        let new = vec![line_for(&mouse, 5)];
        let net = net(&replace_outbound(&old, &new)).unwrap();
        assert_eq!(net.get(&mouse.id_typed()), Some(&-1));

        let unchanged = super::net(&replace_outbound(&old, &old)).unwrap();
        assert!(unchanged.is_empty());
    }

    #[test]
    fn overflowing_totals_are_rejected_instead_of_wrapping() {
        let mouse = item("Mouse", ItemKind::Product, 5);
        let items: HashMap<_, _> = [(mouse.id_typed(), mouse.clone())].into_iter().collect();
        let huge = 1i64 << 62;
        let moves = outbound(&[line_for(&mouse, huge), line_for(&mouse, huge), line_for(&mouse, huge)]);

        assert!(matches!(net(&moves), Err(DomainError::InvariantViolation(_))));
        assert!(matches!(apply_movements(&items, &moves, now()), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn services_and_unlinked_lines_are_skipped() {
        let setup = item("Setup", ItemKind::Service, 0);
        let items: HashMap<_, _> = [(setup.id_typed(), setup.clone())].into_iter().collect();
        let mut free_text = line_for(&setup, 1);
        free_text.item_id = None;

        let moves = outbound(&[line_for(&setup, 3), free_text]);
        assert_eq!(moves.len(), 1);
        assert!(apply_movements(&items, &moves, now()).unwrap().is_empty());
    }

    #[test]
    fn unknown_item_is_a_validation_error() {
        let ghost = item("Ghost", ItemKind::Product, 1);
        let err = apply_movements(&HashMap::new(), &outbound(&[line_for(&ghost, 1)]), now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #[test]
        fn stock_never_goes_negative(start in 0i64..50, deltas in prop::collection::vec(-20i64..20, 1..30)) {
            let mut it = item("Widget", ItemKind::Product, start);
            for delta in deltas {
                let before = it.quantity();
                match it.adjust_stock(delta, now()) {
                    Ok(()) => prop_assert_eq!(it.quantity(), before + delta),
                    Err(_) => prop_assert_eq!(it.quantity(), before),
                }
                prop_assert!(it.quantity() >= 0);
            }
        }
    }
}
