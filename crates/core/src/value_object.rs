//! Value object marker: equality by value, not identity.

/// Marker trait for immutable values compared by their contents.
///
/// Quantities, signatures and product codes are value objects: two quantities
/// of `5` are interchangeable, and "changing" one means constructing a new one.
/// Constructors are expected to validate, so a value object that exists is a
/// valid one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Quantity(i64);
///
/// impl ValueObject for Quantity {}
///
/// assert_eq!(Quantity(5), Quantity(5));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
