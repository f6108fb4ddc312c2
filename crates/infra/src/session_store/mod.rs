//! Session persistence boundary.
//!
//! This module defines a storage-agnostic contract for creating sessions,
//! appending movements, and applying the close transition, without making
//! any storage assumptions. The engine consumes this contract; a real
//! deployment provides it (the in-memory implementation here is the
//! tests/dev reference).

pub mod in_memory;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemorySessionStore;
pub use query::{HistoryFilter, HistoryPage, Pagination};
pub use r#trait::{SessionStore, StoreError};
