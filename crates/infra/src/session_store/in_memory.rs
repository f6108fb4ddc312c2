use std::collections::HashMap;
use std::sync::RwLock;

use tillbook_core::{DrawerId, LedgerError, MovementId, SessionId};
use tillbook_drawer::{CloseRequest, Movement, MovementDraft, Session, SessionDraft};

use super::query::{HistoryFilter, HistoryPage, Pagination};
use super::r#trait::{SessionStore, StoreError};

#[derive(Debug, Default)]
struct State {
    sessions: HashMap<SessionId, Session>,
    /// Uniqueness index: at most one OPEN session per drawer. Maintained on
    /// create and close under the same write lock.
    open_by_drawer: HashMap<DrawerId, SessionId>,
}

/// In-memory session store.
///
/// Intended for tests/dev. Not optimized for performance. A single
/// `RwLock` makes create/append/close atomic with respect to each other,
/// which is the same guarantee a real backend provides with a unique
/// partial index and a conditional UPDATE.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    state: RwLock<State>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn map_domain(err: LedgerError) -> StoreError {
    match err {
        LedgerError::SessionClosed => StoreError::SessionNotOpen,
        other => StoreError::InvalidWrite(other.to_string()),
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self, draft: SessionDraft) -> Result<Session, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        if state.open_by_drawer.contains_key(&draft.drawer_id) {
            return Err(StoreError::OpenSessionExists);
        }

        let session = Session::from_draft(SessionId::new(), draft);
        state
            .open_by_drawer
            .insert(session.drawer_id(), session.id_typed());
        state.sessions.insert(session.id_typed(), session.clone());
        Ok(session)
    }

    fn append_movement(
        &self,
        session_id: SessionId,
        draft: MovementDraft,
    ) -> Result<Movement, StoreError> {
        if draft.session_id != session_id {
            return Err(StoreError::InvalidWrite(
                "draft targets a different session".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound)?;

        let movement = Movement::from_draft(MovementId::new(), draft);
        session.record(movement.clone()).map_err(map_domain)?;
        Ok(movement)
    }

    fn close_session(
        &self,
        session_id: SessionId,
        request: CloseRequest,
    ) -> Result<Session, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(StoreError::SessionNotFound)?;

        // Conditional transition: apply_close rejects anything not OPEN, so
        // the loser of a concurrent close ends up here with SessionNotOpen.
        // It also derives the frozen figures from the log it sees under this
        // write lock, so no concurrent append can slip past them.
        session.apply_close(request).map_err(map_domain)?;
        let closed = session.clone();
        state.open_by_drawer.remove(&closed.drawer_id());
        Ok(closed)
    }

    fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(state.sessions.get(&session_id).cloned())
    }

    fn get_open_session(&self, drawer_id: DrawerId) -> Result<Option<Session>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(state
            .open_by_drawer
            .get(&drawer_id)
            .and_then(|id| state.sessions.get(id))
            .cloned())
    }

    fn query_history(
        &self,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> Result<HistoryPage, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let mut matches: Vec<&Session> = state
            .sessions
            .values()
            .filter(|s| filter.matches(s))
            .collect();
        // Newest first; id as tie-break keeps paging stable.
        matches.sort_by(|a, b| {
            b.opened_at()
                .cmp(&a.opened_at())
                .then_with(|| b.id_typed().as_uuid().cmp(a.id_typed().as_uuid()))
        });

        let total = matches.len() as u64;
        let items: Vec<Session> = matches
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.page_size as usize)
            .cloned()
            .collect();
        let has_more = (pagination.offset() + items.len()) < total as usize;

        Ok(HistoryPage {
            items,
            total,
            pagination,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tillbook_core::{Money, OperatorId};
    use tillbook_drawer::{Location, MovementKind, PaymentMethod, SessionStatus, running_balance};

    fn draft(drawer_id: DrawerId) -> SessionDraft {
        SessionDraft::new(
            drawer_id,
            OperatorId::new(),
            Money::from_cents(10_000),
            None,
            Utc::now(),
        )
        .unwrap()
    }

    fn movement_draft(session_id: SessionId, kind: MovementKind, cents: i64) -> MovementDraft {
        MovementDraft::new(
            session_id,
            kind,
            Money::from_cents(cents),
            "venda no balcao",
            PaymentMethod::Cash,
            Location::Store,
            Utc::now(),
        )
        .unwrap()
    }

    fn close_request(declared: i64) -> CloseRequest {
        CloseRequest {
            declared: Money::from_cents(declared),
            note: None,
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn second_open_for_the_same_drawer_is_rejected() {
        let store = InMemorySessionStore::new();
        let drawer_id = DrawerId::new();

        store.create_session(draft(drawer_id)).unwrap();
        let err = store.create_session(draft(drawer_id)).unwrap_err();
        assert_eq!(err, StoreError::OpenSessionExists);

        // A different drawer is unaffected.
        assert!(store.create_session(draft(DrawerId::new())).is_ok());
    }

    #[test]
    fn drawer_can_reopen_after_close() {
        let store = InMemorySessionStore::new();
        let drawer_id = DrawerId::new();
        let session = store.create_session(draft(drawer_id)).unwrap();

        store
            .close_session(session.id_typed(), close_request(10_000))
            .unwrap();

        assert!(store.get_open_session(drawer_id).unwrap().is_none());
        assert!(store.create_session(draft(drawer_id)).is_ok());
    }

    #[test]
    fn append_on_closed_session_is_rejected() {
        let store = InMemorySessionStore::new();
        let session = store.create_session(draft(DrawerId::new())).unwrap();
        let id = session.id_typed();

        store
            .append_movement(id, movement_draft(id, MovementKind::Entry, 500))
            .unwrap();
        store.close_session(id, close_request(10_500)).unwrap();

        let err = store
            .append_movement(id, movement_draft(id, MovementKind::Entry, 100))
            .unwrap_err();
        assert_eq!(err, StoreError::SessionNotOpen);
        assert_eq!(store.get_session(id).unwrap().unwrap().movements().len(), 1);
    }

    #[test]
    fn second_close_loses_the_conditional_transition() {
        let store = InMemorySessionStore::new();
        let session = store.create_session(draft(DrawerId::new())).unwrap();
        let id = session.id_typed();

        // Both requests decided against the same OPEN snapshot, as in a race.
        store.close_session(id, close_request(10_000)).unwrap();
        let err = store.close_session(id, close_request(9_000)).unwrap_err();
        assert_eq!(err, StoreError::SessionNotOpen);

        let stored = store.get_session(id).unwrap().unwrap();
        assert_eq!(stored.status(), SessionStatus::Closed);
        assert_eq!(stored.closing().unwrap().declared, Money::from_cents(10_000));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new();
        assert!(store.get_session(id).unwrap().is_none());
        assert_eq!(
            store
                .append_movement(id, movement_draft(id, MovementKind::Entry, 100))
                .unwrap_err(),
            StoreError::SessionNotFound
        );
    }

    #[test]
    fn close_derives_frozen_figures_from_the_stored_log() {
        let store = InMemorySessionStore::new();
        let session = store.create_session(draft(DrawerId::new())).unwrap();
        let id = session.id_typed();

        store
            .append_movement(id, movement_draft(id, MovementKind::Entry, 5_000))
            .unwrap();

        // Request built against the log as it stood: opening 100.00 plus the
        // 50.00 entry. Another movement lands before the close is applied.
        let request = close_request(15_000);
        store
            .append_movement(id, movement_draft(id, MovementKind::Exit, 2_000))
            .unwrap();

        let closed = store.close_session(id, request).unwrap();
        let closing = closed.closing().unwrap();
        assert_eq!(closing.computed, Money::from_cents(13_000));
        assert_eq!(
            closing.computed,
            running_balance(&closed).unwrap()
        );
        assert_eq!(closing.divergence, Money::from_cents(2_000));
    }

    #[test]
    fn history_is_ordered_newest_first_and_paginated() {
        let store = InMemorySessionStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut d = draft(DrawerId::new());
            d.opened_at = Utc::now() + chrono::Duration::seconds(i);
            ids.push(store.create_session(d).unwrap().id_typed());
        }

        let page = store
            .query_history(&HistoryFilter::default(), Pagination::new(Some(1), Some(2)))
            .unwrap();
        assert_eq!(page.total, 5);
        assert!(page.has_more);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id_typed(), ids[4]);
        assert_eq!(page.items[1].id_typed(), ids[3]);

        let last = store
            .query_history(&HistoryFilter::default(), Pagination::new(Some(3), Some(2)))
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
        assert_eq!(last.items[0].id_typed(), ids[0]);
    }

    #[test]
    fn history_filters_by_operator_window_and_text() {
        let store = InMemorySessionStore::new();
        let operator_id = OperatorId::new();

        let mut mine = draft(DrawerId::new());
        mine.operator_id = operator_id;
        let mine = store.create_session(mine).unwrap();
        store
            .append_movement(mine.id_typed(), movement_draft(mine.id_typed(), MovementKind::Entry, 500))
            .unwrap();
        store.create_session(draft(DrawerId::new())).unwrap();

        let by_operator = store
            .query_history(
                &HistoryFilter {
                    operator_id: Some(operator_id),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .unwrap();
        assert_eq!(by_operator.total, 1);
        assert_eq!(by_operator.items[0].id_typed(), mine.id_typed());

        let by_text = store
            .query_history(
                &HistoryFilter {
                    search: Some("BALCAO".to_string()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .unwrap();
        assert_eq!(by_text.total, 1);

        let future = store
            .query_history(
                &HistoryFilter {
                    opened_after: Some(Utc::now() + chrono::Duration::hours(1)),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .unwrap();
        assert_eq!(future.total, 0);
        assert!(future.items.is_empty());
    }
}
