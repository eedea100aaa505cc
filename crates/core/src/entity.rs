//! Entity trait: identity across snapshots.

/// Entity marker + minimal interface.
///
/// Every record fetched from a lookup service is an entity snapshot: two snapshots
/// with the same id describe the same record, even if fetched at different times.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Name used in logs and not-found errors (e.g. `"invoice"`).
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
