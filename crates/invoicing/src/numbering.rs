//! Invoice numbers.

use billforge_core::{DomainError, DomainResult};

pub const INVOICE_PREFIX: &str = "INV-";
const MAX_NUMBER_LEN: usize = 32;

/// Next auto-generated number after every `INV-nnnn` already in use.
///
/// The prefix is matched without regard to case, the same way duplicate
/// numbers are detected. Manually entered numbers that do not follow the
/// pattern are ignored, but the result is never one of `existing`.
pub fn next_invoice_number<'a>(existing: impl IntoIterator<Item = &'a str>) -> DomainResult<String> {
    let existing: Vec<&str> = existing.into_iter().collect();
    let highest = existing
        .iter()
        .filter_map(|n| sequence_of(n))
        .max()
        .unwrap_or(0);

    let mut next = highest;
    loop {
        next = next
            .checked_add(1)
            .ok_or_else(|| DomainError::conflict("no invoice numbers left; supply invoice_number explicitly"))?;
        let candidate = format!("{INVOICE_PREFIX}{next:04}");
        if !existing.iter().any(|n| n.eq_ignore_ascii_case(&candidate)) {
            return Ok(candidate);
        }
    }
}

fn sequence_of(number: &str) -> Option<u64> {
    let prefix = number.get(..INVOICE_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(INVOICE_PREFIX) {
        return None;
    }
    let digits = &number[INVOICE_PREFIX.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Validate a client-supplied invoice number.
pub fn normalize_invoice_number(raw: &str) -> DomainResult<String> {
    let number = raw.trim();
    if number.is_empty() {
        return Err(DomainError::validation("invoice_number must not be blank"));
    }
    if number.len() > MAX_NUMBER_LEN {
        return Err(DomainError::validation(format!(
            "invoice_number must be at most {MAX_NUMBER_LEN} characters"
        )));
    }
    if !number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | '_'))
    {
        return Err(DomainError::validation(
            "invoice_number may only contain letters, digits, '-', '/' and '_'",
        ));
    }
    Ok(number.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_number() {
        assert_eq!(next_invoice_number([]).unwrap(), "INV-0001");
    }

    #[test]
    fn follows_the_highest_number() {
        let existing = ["INV-0002", "INV-0010", "CUSTOM/7", "INV-abc"];
        assert_eq!(next_invoice_number(existing).unwrap(), "INV-0011");
    }

    #[test]
    fn grows_past_four_digits() {
        assert_eq!(next_invoice_number(["INV-9999"]).unwrap(), "INV-10000");
    }

    #[test]
    fn lowercase_prefix_counts_towards_the_sequence() {
        assert_eq!(next_invoice_number(["inv-0001"]).unwrap(), "INV-0002");
        assert_eq!(next_invoice_number(["Inv-0007", "INV-0003"]).unwrap(), "INV-0008");
    }

    #[test]
    fn signed_or_short_suffixes_are_not_sequence_numbers() {
        assert_eq!(next_invoice_number(["INV-+5", "INV-", "IN"]).unwrap(), "INV-0001");
    }

    #[test]
    fn exhausted_sequence_is_a_conflict_not_a_wrap() {
        let err = next_invoice_number(["INV-18446744073709551615"]).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn manual_numbers_are_checked() {
        assert_eq!(normalize_invoice_number(" 2024-25/001 ").unwrap(), "2024-25/001");
        assert!(normalize_invoice_number("  ").is_err());
        assert!(normalize_invoice_number("INV 1").is_err());
    }
}
