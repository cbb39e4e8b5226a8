//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: to "modify" one,
/// build a new one. `Money` and `Quantity` are the value objects of this
/// domain; accounts, products and orders are aggregates with identity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
