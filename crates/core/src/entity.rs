//! Entity trait: identity + continuity across state changes.
//!
//! Sessions and movements are entities: a session stays the same session
//! as movements accumulate and its status flips, because its `SessionId`
//! persists across those changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
