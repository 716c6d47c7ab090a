//! Entity trait: identity that survives state changes.

/// Something that is the same thing across updates because it keeps its id
/// (an employee, a recorded movement), as opposed to a [`crate::ValueObject`].
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
