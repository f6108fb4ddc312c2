use std::sync::Arc;

use thiserror::Error;

use tillbook_core::{DrawerId, SessionId};
use tillbook_drawer::{CloseRequest, Movement, MovementDraft, Session, SessionDraft};

use super::query::{HistoryFilter, HistoryPage, Pagination};

/// Session store operation error.
///
/// These are **infrastructure errors** (uniqueness constraints, conditional
/// transitions, connectivity) as opposed to domain errors (validation,
/// invariants). The session manager maps them onto the caller-facing
/// `LedgerError` taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The drawer already has an OPEN session (uniqueness constraint).
    #[error("an open session already exists for this drawer")]
    OpenSessionExists,

    /// The session id is unknown.
    #[error("session not found")]
    SessionNotFound,

    /// The session is not OPEN (append on a closed session, or the losing
    /// side of a concurrent close race).
    #[error("session is not open")]
    SessionNotOpen,

    /// A write violated the store's integrity checks.
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The backing store is unreachable or failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract for drawer sessions and their movement ledger.
///
/// ## Design principles
///
/// - **No storage assumptions**: works with the in-memory implementation
///   (tests/dev) and SQL/remote backends (production).
/// - **Insert-only movements**: `append_movement` is an atomic append; no
///   read-modify-write of any balance field exists in this contract, which
///   eliminates lost-update races between concurrent recorders by
///   construction (balances are always derived from the log).
/// - **Constraints live here**: at most one OPEN session per drawer is
///   enforced on `create_session`, and `close_session` is a conditional
///   OPEN -> CLOSED transition that fails the loser of a close race.
/// - **No retries**: failures surface immediately; a non-idempotent append
///   retried blindly could double-record a cash movement.
///
/// All amounts cross this boundary as integer minor units (`Money`
/// serializes as cents), never binary floats.
pub trait SessionStore: Send + Sync {
    /// Persist a new session, assigning its id.
    ///
    /// Fails with `OpenSessionExists` if the drawer already has an OPEN
    /// session.
    fn create_session(&self, draft: SessionDraft) -> Result<Session, StoreError>;

    /// Atomically append a movement to an OPEN session, assigning its id.
    ///
    /// Fails with `SessionNotFound` for an unknown session and
    /// `SessionNotOpen` for a closed one.
    fn append_movement(
        &self,
        session_id: SessionId,
        draft: MovementDraft,
    ) -> Result<Movement, StoreError>;

    /// Apply the close transition, conditional on the session still being
    /// OPEN. The frozen figures (computed balance, divergence) are derived
    /// from the stored movement log inside the same lock or transaction as
    /// the transition itself, so a concurrently appended movement can never
    /// be missing from them. Returns the session in its frozen, closed form.
    fn close_session(
        &self,
        session_id: SessionId,
        request: CloseRequest,
    ) -> Result<Session, StoreError>;

    /// Load a session (any status) by id.
    fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Look up the drawer's OPEN session, if any.
    ///
    /// This is queried per call; the engine never caches "the current
    /// session" as process-wide state.
    fn get_open_session(&self, drawer_id: DrawerId) -> Result<Option<Session>, StoreError>;

    /// Read-only, filtered, paginated retrieval of sessions, newest
    /// `opened_at` first. No match is an empty page, not an error.
    fn query_history(
        &self,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Result<HistoryPage, StoreError>;
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn create_session(&self, draft: SessionDraft) -> Result<Session, StoreError> {
        (**self).create_session(draft)
    }

    fn append_movement(
        &self,
        session_id: SessionId,
        draft: MovementDraft,
    ) -> Result<Movement, StoreError> {
        (**self).append_movement(session_id, draft)
    }

    fn close_session(
        &self,
        session_id: SessionId,
        request: CloseRequest,
    ) -> Result<Session, StoreError> {
        (**self).close_session(session_id, request)
    }

    fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, StoreError> {
        (**self).get_session(session_id)
    }

    fn get_open_session(&self, drawer_id: DrawerId) -> Result<Option<Session>, StoreError> {
        (**self).get_open_session(drawer_id)
    }

    fn query_history(
        &self,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Result<HistoryPage, StoreError> {
        (**self).query_history(filter, pagination)
    }
}
