//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: they are defined entirely by their
//! attribute values (an order window, a permission set, a fee amount). Two
//! value objects with the same values are equal.

/// Marker trait for value objects.
///
/// Implementors should derive `Clone + PartialEq + Eq` and stay immutable:
/// "changing" a value object means constructing a new one.
pub trait ValueObject: Clone + PartialEq {}
