//! Cash drawer domain module.
//!
//! This crate contains the business rules for drawer sessions and their
//! movement ledger, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage, no clock; timestamps are passed in).

pub mod ledger;
pub mod movement;
pub mod session;

pub use ledger::{divergence_at, running_balance, running_balance_from, totals_by_method};
pub use movement::{Location, Movement, MovementDraft, MovementKind, PaymentMethod};
pub use session::{CloseRequest, Closing, Session, SessionDraft, SessionStatus};
