//! Infrastructure layer: the persistence boundary and the session manager
//! that orchestrates the drawer domain against it.

pub mod session_manager;
pub mod session_store;

pub use session_manager::SessionManager;
pub use session_store::{
    HistoryFilter, HistoryPage, InMemorySessionStore, Pagination, SessionStore, StoreError,
};
