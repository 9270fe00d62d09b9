//! Entity trait: records with a stable identity.

/// Entity marker + minimal interface.
///
/// Implemented by the records kept in the external store so generic
/// in-memory tables can key them without knowing the concrete type.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
