//! `tillbook-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{LedgerError, LedgerResult};
pub use id::{DrawerId, MovementId, OperatorId, SessionId};
pub use money::Money;
pub use value_object::ValueObject;
