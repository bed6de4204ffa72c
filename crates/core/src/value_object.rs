//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values:
/// two `Money` amounts of 100 paise are the same amount, while two invoices
/// with identical lines are still different documents.
///
/// Implementors are immutable; "changing" one produces a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
