use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillbook_core::{DrawerId, Entity, LedgerError, LedgerResult, Money, OperatorId, SessionId, ValueObject};

use crate::ledger;
use crate::movement::Movement;

/// Session lifecycle. `Closed` is terminal: a session is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// Close-time reconciliation figures, frozen exactly once when the session
/// transitions to `Closed` and never recomputed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closing {
    /// Physically counted amount declared by the operator.
    pub declared: Money,
    /// `opening_balance + entries - exits` at the moment of close.
    pub computed: Money,
    /// `declared - computed`. Positive = surplus, negative = shortage.
    pub divergence: Money,
}

impl ValueObject for Closing {}

/// What a close operation hands to the store: the operator's declared count
/// plus close metadata. The store applies it as a conditional OPEN -> CLOSED
/// transition and computes the frozen figures from the authoritative movement
/// log inside that transition (see `Session::apply_close`); the loser of a
/// concurrent close race must be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseRequest {
    pub declared: Money,
    pub note: Option<String>,
    pub closed_at: DateTime<Utc>,
}

/// A validated, not-yet-persisted session. The store assigns the
/// `SessionId` on create (see `Session::from_draft`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub drawer_id: DrawerId,
    pub operator_id: OperatorId,
    pub opening_balance: Money,
    pub note: Option<String>,
    pub opened_at: DateTime<Utc>,
}

impl SessionDraft {
    pub fn new(
        drawer_id: DrawerId,
        operator_id: OperatorId,
        opening_balance: Money,
        note: Option<String>,
        opened_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        if opening_balance.is_negative() {
            return Err(LedgerError::invalid_amount(format!(
                "opening balance must be >= 0, got {opening_balance}"
            )));
        }
        Ok(Self {
            drawer_id,
            operator_id,
            opening_balance,
            note,
            opened_at,
        })
    }
}

/// Aggregate root: one open-to-close cycle of a drawer.
///
/// A session exclusively owns its movements; movements never outlive or move
/// between sessions. Balances are never stored incrementally while the
/// session is open; they are derived from the movement log on every read,
/// which is what makes concurrent appends safe (no read-modify-write of a
/// counter exists anywhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    drawer_id: DrawerId,
    operator_id: OperatorId,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    opening_balance: Money,
    closing: Option<Closing>,
    note: Option<String>,
    status: SessionStatus,
    movements: Vec<Movement>,
}

impl Session {
    /// Promote a validated draft to a persisted session with its assigned id.
    pub fn from_draft(id: SessionId, draft: SessionDraft) -> Self {
        Self {
            id,
            drawer_id: draft.drawer_id,
            operator_id: draft.operator_id,
            opened_at: draft.opened_at,
            closed_at: None,
            opening_balance: draft.opening_balance,
            closing: None,
            note: draft.note,
            status: SessionStatus::Open,
            movements: Vec::new(),
        }
    }

    pub fn id_typed(&self) -> SessionId {
        self.id
    }

    pub fn drawer_id(&self) -> DrawerId {
        self.drawer_id
    }

    pub fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn opening_balance(&self) -> Money {
        self.opening_balance
    }

    pub fn closing(&self) -> Option<&Closing> {
        self.closing.as_ref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Movements in append order (ordered by creation time).
    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, SessionStatus::Open)
    }

    /// Append a persisted movement to this session's log.
    ///
    /// The invariants live here rather than in the store: a closed session
    /// rejects the append, and a movement recorded against another session
    /// can never be attached to this one.
    pub fn record(&mut self, movement: Movement) -> LedgerResult<()> {
        if !self.is_open() {
            return Err(LedgerError::SessionClosed);
        }
        if movement.session_id() != self.id {
            return Err(LedgerError::validation(
                "movement belongs to a different session",
            ));
        }
        self.movements.push(movement);
        Ok(())
    }

    /// Apply a close: the one legal transition, `Open -> Closed`.
    ///
    /// The frozen figures are computed here, over the movement log as it
    /// stands at apply time. A store that runs this inside its write
    /// lock/transaction therefore cannot freeze a balance that omits a
    /// concurrently appended movement. This is also the only point the
    /// derived balance gets frozen into the session record, so history
    /// queries over closed sessions never recompute.
    ///
    /// Conditional by construction: a session that is no longer open
    /// rejects the request, which is how the loser of a concurrent close
    /// race fails instead of double-closing.
    pub fn apply_close(&mut self, request: CloseRequest) -> LedgerResult<Closing> {
        if !self.is_open() {
            return Err(LedgerError::SessionClosed);
        }
        if request.declared.is_negative() {
            return Err(LedgerError::invalid_amount(format!(
                "declared balance must be >= 0, got {}",
                request.declared
            )));
        }

        let computed = ledger::running_balance(self)?;
        let divergence = request.declared.checked_sub(computed).ok_or_else(|| {
            LedgerError::invalid_amount("divergence out of representable range")
        })?;

        let closing = Closing {
            declared: request.declared,
            computed,
            divergence,
        };
        self.closing = Some(closing);
        if request.note.is_some() {
            self.note = request.note;
        }
        self.closed_at = Some(request.closed_at);
        self.status = SessionStatus::Closed;
        Ok(closing)
    }
}

impl Entity for Session {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{Location, MovementDraft, MovementKind, PaymentMethod};
    use tillbook_core::MovementId;

    fn open_session(opening_cents: i64) -> Session {
        let draft = SessionDraft::new(
            DrawerId::new(),
            OperatorId::new(),
            Money::from_cents(opening_cents),
            None,
            Utc::now(),
        )
        .unwrap();
        Session::from_draft(SessionId::new(), draft)
    }

    fn movement(session: &Session, kind: MovementKind, cents: i64) -> Movement {
        let draft = MovementDraft::new(
            session.id_typed(),
            kind,
            Money::from_cents(cents),
            "movimento de teste",
            PaymentMethod::Cash,
            Location::Store,
            Utc::now(),
        )
        .unwrap();
        Movement::from_draft(MovementId::new(), draft)
    }

    #[test]
    fn negative_opening_balance_is_rejected() {
        let err = SessionDraft::new(
            DrawerId::new(),
            OperatorId::new(),
            Money::from_cents(-1),
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn fresh_session_is_open_with_empty_log() {
        let session = open_session(10_000);
        assert!(session.is_open());
        assert!(session.movements().is_empty());
        assert!(session.closing().is_none());
        assert!(session.closed_at().is_none());
    }

    #[test]
    fn record_rejects_movement_from_another_session() {
        let mut session = open_session(0);
        let other = open_session(0);
        let stray = movement(&other, MovementKind::Entry, 100);
        let err = session.record(stray).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(session.movements().is_empty());
    }

    fn close_request(declared_cents: i64, note: Option<&str>) -> CloseRequest {
        CloseRequest {
            declared: Money::from_cents(declared_cents),
            note: note.map(str::to_string),
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn close_freezes_balances_and_is_terminal() {
        let mut session = open_session(10_000);
        let entry = movement(&session, MovementKind::Entry, 5_000);
        session.record(entry).unwrap();

        let closing = session.apply_close(close_request(15_000, None)).unwrap();

        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(closing.computed, Money::from_cents(15_000));
        assert_eq!(closing.divergence, Money::ZERO);
        assert_eq!(session.closing(), Some(&closing));
        assert!(session.closed_at().is_some());

        // Terminal: no second close, no further movements.
        let err = session.apply_close(close_request(15_000, None)).unwrap_err();
        assert_eq!(err, LedgerError::SessionClosed);
        let late = movement(&session, MovementKind::Entry, 100);
        let err = session.record(late).unwrap_err();
        assert_eq!(err, LedgerError::SessionClosed);
        assert_eq!(session.movements().len(), 1);
    }

    #[test]
    fn close_computes_over_the_log_at_apply_time() {
        let mut session = open_session(10_000);
        let entry = movement(&session, MovementKind::Entry, 5_000);
        session.record(entry).unwrap();

        // The request carries only the declared count; a movement recorded
        // after the request was built still lands in the frozen balance.
        let request = close_request(15_000, None);
        let exit = movement(&session, MovementKind::Exit, 2_000);
        session.record(exit).unwrap();

        let closing = session.apply_close(request).unwrap();
        assert_eq!(closing.computed, Money::from_cents(13_000));
        assert_eq!(closing.divergence, Money::from_cents(2_000));
    }

    #[test]
    fn close_rejects_negative_declared_balance() {
        let mut session = open_session(10_000);
        let err = session.apply_close(close_request(-1, None)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert!(session.is_open());
        assert!(session.closing().is_none());
    }

    #[test]
    fn close_note_replaces_session_note_when_present() {
        let mut session = open_session(10_000);
        let closing = session
            .apply_close(close_request(9_000, Some("falta de 10,00 no fechamento")))
            .unwrap();
        assert_eq!(session.note(), Some("falta de 10,00 no fechamento"));
        assert_eq!(closing.divergence, Money::from_cents(-1_000));
    }
}
