//! Session manager: the state machine owner and sole mutator.
//!
//! The manager orchestrates the drawer domain against a `SessionStore`:
//! it validates fail-fast (no store call is attempted until the input is
//! known good, so a failed operation never leaves a partial write), lets
//! the domain decide transitions purely, and maps store errors onto the
//! caller-facing `LedgerError` taxonomy. It holds no state of its own, in
//! particular no cached "current session"; the drawer's open session is
//! looked up per call.
//!
//! Failures are immediate and final: the manager never retries, since
//! retrying a non-idempotent append could double-record a cash movement.
//! Retry/backoff and idempotency keys are the caller's concern.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use tillbook_core::{DrawerId, LedgerError, LedgerResult, Money, OperatorId, SessionId};
use tillbook_drawer::{
    ledger, CloseRequest, Location, Movement, MovementDraft, MovementKind, PaymentMethod, Session,
    SessionDraft,
};

use crate::session_store::{HistoryFilter, HistoryPage, Pagination, SessionStore, StoreError};

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::OpenSessionExists => LedgerError::AlreadyOpen,
            StoreError::SessionNotFound => LedgerError::NotFound,
            StoreError::SessionNotOpen => LedgerError::SessionClosed,
            StoreError::InvalidWrite(msg) => LedgerError::Validation(msg),
            StoreError::Unavailable(msg) => LedgerError::Transport(msg),
        }
    }
}

/// Orchestrates open/record/close and the read surface over a session store.
#[derive(Debug)]
pub struct SessionManager<S> {
    store: S,
}

impl<S> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S> SessionManager<S>
where
    S: SessionStore,
{
    /// Open a session for a drawer.
    ///
    /// At most one OPEN session per drawer exists at any time; the store's
    /// uniqueness constraint enforces it and a violation surfaces as
    /// `AlreadyOpen` with no session created.
    pub fn open_session(
        &self,
        drawer_id: DrawerId,
        operator_id: OperatorId,
        opening_balance: Money,
        note: Option<String>,
    ) -> LedgerResult<Session> {
        let draft = SessionDraft::new(drawer_id, operator_id, opening_balance, note, Utc::now())
            .inspect_err(|e| debug!(%drawer_id, error = %e, "open rejected"))?;

        let session = self.store.create_session(draft)?;
        info!(
            session_id = %session.id_typed(),
            %drawer_id,
            %operator_id,
            opening_cents = opening_balance.cents(),
            "session opened"
        );
        Ok(session)
    }

    /// Record an entry or exit against an OPEN session.
    ///
    /// Validation happens before any store call; the append itself is
    /// atomic and insert-only, and no balance field is updated anywhere
    /// (balances are derived, so concurrent recorders cannot lose updates).
    pub fn record_movement(
        &self,
        session_id: SessionId,
        kind: MovementKind,
        amount: Money,
        description: &str,
        payment_method: PaymentMethod,
        location: Location,
    ) -> LedgerResult<Movement> {
        let draft = MovementDraft::new(
            session_id,
            kind,
            amount,
            description,
            payment_method,
            location,
            Utc::now(),
        )
        .inspect_err(|e| debug!(%session_id, error = %e, "movement rejected"))?;

        let movement = self.store.append_movement(session_id, draft)?;
        info!(
            %session_id,
            movement_id = %movement.id_typed(),
            kind = %kind,
            amount_cents = amount.cents(),
            method = %payment_method,
            "movement recorded"
        );
        Ok(movement)
    }

    /// Close a session against the physically counted balance.
    ///
    /// The close is a conditional OPEN -> CLOSED transition applied at the
    /// store: if another close won the race, this one fails with
    /// `SessionClosed` and nothing changes. The computed balance and the
    /// divergence are derived inside that transition, over the movement log
    /// the store holds at that instant, and frozen into the session record.
    pub fn close_session(
        &self,
        session_id: SessionId,
        declared_balance: Money,
        note: Option<String>,
    ) -> LedgerResult<Session> {
        if declared_balance.is_negative() {
            debug!(%session_id, "close rejected: negative declared balance");
            return Err(LedgerError::invalid_amount(format!(
                "declared balance must be >= 0, got {declared_balance}"
            )));
        }

        let request = CloseRequest {
            declared: declared_balance,
            note,
            closed_at: Utc::now(),
        };
        let closed = self.store.close_session(session_id, request)?;

        let closing = closed.closing().copied();
        // Soft rule: a divergent close should carry a note, but the engine
        // does not structurally require one.
        if let Some(c) = closing {
            if !c.divergence.is_zero() && closed.note().is_none() {
                warn!(
                    %session_id,
                    divergence_cents = c.divergence.cents(),
                    "divergent close without a note"
                );
            }
        }
        info!(
            %session_id,
            declared_cents = declared_balance.cents(),
            computed_cents = closing.map(|c| c.computed.cents()).unwrap_or_default(),
            divergence_cents = closing.map(|c| c.divergence.cents()).unwrap_or_default(),
            "session closed"
        );
        Ok(closed)
    }

    /// Live balance of a session, recomputed from its movement log.
    pub fn running_balance(&self, session_id: SessionId) -> LedgerResult<Money> {
        let session = self
            .store
            .get_session(session_id)?
            .ok_or(LedgerError::NotFound)?;
        ledger::running_balance(&session)
    }

    /// Per-payment-method totals for one movement kind.
    pub fn totals_by_method(
        &self,
        session_id: SessionId,
        kind: MovementKind,
    ) -> LedgerResult<BTreeMap<PaymentMethod, Money>> {
        let session = self
            .store
            .get_session(session_id)?
            .ok_or(LedgerError::NotFound)?;
        ledger::totals_by_method(&session, kind)
    }

    /// Divergence the session would close with right now, without
    /// committing anything (the close form's preview).
    pub fn preview_close(
        &self,
        session_id: SessionId,
        declared_balance: Money,
    ) -> LedgerResult<Money> {
        if declared_balance.is_negative() {
            return Err(LedgerError::invalid_amount(format!(
                "declared balance must be >= 0, got {declared_balance}"
            )));
        }
        let session = self
            .store
            .get_session(session_id)?
            .ok_or(LedgerError::NotFound)?;
        ledger::divergence_at(
            session.opening_balance(),
            session.movements(),
            declared_balance,
        )
    }

    /// The drawer's OPEN session, if any. Always a fresh store lookup.
    pub fn open_session_for(&self, drawer_id: DrawerId) -> LedgerResult<Option<Session>> {
        Ok(self.store.get_open_session(drawer_id)?)
    }

    /// Filtered, paginated session history, newest first.
    ///
    /// Closed sessions come back with their frozen closing figures and are
    /// never recomputed; for an open session in the result, callers read
    /// the live balance via `running_balance`.
    pub fn history(
        &self,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> LedgerResult<HistoryPage> {
        Ok(self.store.query_history(filter, pagination)?)
    }
}
