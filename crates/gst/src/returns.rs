//! Partial returns against an original document's lines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use billforge_core::{DomainError, DomainResult};

use crate::line::LineItem;

/// One returned line: 1-based line number on the original document and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    pub line_no: u32,
    pub quantity: i64,
}

/// Quantity already returned per original line.
///
/// Sums saturate at `i64::MAX`, which is above any line quantity and so still
/// fails the cap in [`resolve_return_lines`].
pub fn returned_quantities<'a>(lines: impl IntoIterator<Item = &'a ReturnLine>) -> BTreeMap<u32, i64> {
    let mut by_line: BTreeMap<u32, i64> = BTreeMap::new();
    for line in lines {
        let total = by_line.entry(line.line_no).or_insert(0);
        *total = total.saturating_add(line.quantity);
    }
    by_line
}

/// Check a return request against the original lines and earlier returns, and
/// build the priced lines being returned.
///
/// Repeated line numbers in one request are merged. The total returned per
/// line, including `already_returned`, may not exceed the original quantity.
pub fn resolve_return_lines(
    original: &[LineItem],
    already_returned: &BTreeMap<u32, i64>,
    requested: &[ReturnLine],
) -> DomainResult<Vec<LineItem>> {
    if requested.is_empty() {
        return Err(DomainError::validation("missing required fields: lines"));
    }
    for line in requested {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "line {}: quantity must be positive",
                line.line_no
            )));
        }
    }

    let mut resolved = Vec::new();
    for (line_no, quantity) in returned_quantities(requested) {
        let source = usize::try_from(line_no)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| original.get(idx))
            .ok_or_else(|| DomainError::validation(format!("line {line_no} does not exist")))?;

        let previous = already_returned.get(&line_no).copied().unwrap_or(0);
        let total = previous.checked_add(quantity).unwrap_or(i64::MAX);
        if total > source.quantity {
            return Err(DomainError::invariant(format!(
                "line {line_no}: cannot return {quantity}; quantity {}, already returned {previous}",
                source.quantity
            )));
        }
        resolved.push(source.with_quantity(quantity));
    }
    Ok(resolved)
}
