//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger engine.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error taxonomy.
///
/// Keep this focused on deterministic, business/domain failures plus the one
/// infrastructure failure the engine surfaces verbatim (`Transport`). All
/// validation variants are raised before any persistence call is attempted,
/// so a failed operation never leaves a partial write behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// An OPEN session already exists for this drawer.
    #[error("a session is already open for this drawer")]
    AlreadyOpen,

    /// The target session is not OPEN (already closed, or lost a close race).
    #[error("session is closed")]
    SessionClosed,

    /// A monetary amount was negative, zero where forbidden, or unparseable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A field failed validation (malformed description, unknown enum value).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The session id is unknown to the store.
    #[error("session not found")]
    NotFound,

    /// The persistence collaborator was unreachable or failed.
    ///
    /// Surfaced verbatim; the engine never retries internally, since
    /// retrying a non-idempotent append could double-record a movement.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl LedgerError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
