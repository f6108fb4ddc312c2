//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects with **no identity** - they are defined
//! entirely by their attribute values. Two value objects with the same values
//! are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// create a new one with the new values; this keeps them safe to share across
/// threads and gives them primitive-like semantics.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// Example:
/// - `Money::from_cents(10000)` is a value object
/// - `Session { id: SessionId(...), ... }` is an entity
///
/// The trait requires `Clone` (values are cheap to copy), `PartialEq` (compared
/// by attribute values), and `Debug` (logging, testing).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
