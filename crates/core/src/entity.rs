//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Used for objects that live inside an aggregate (e.g. an exchange inside an
/// order cycle) and are tracked by identity rather than by value.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
