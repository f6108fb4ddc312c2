//! Ledger engine: pure balance arithmetic over a session's movement log.
//!
//! The movement log is the source of truth. Nothing here caches or stores a
//! counter; every function recomputes from scratch on each call, which is
//! what lets concurrent appends against the same session stay race-free.
//! All summation happens in `i128` cents; binary floating point never
//! participates.

use std::collections::BTreeMap;

use tillbook_core::{LedgerError, LedgerResult, Money};

use crate::movement::{Movement, MovementKind, PaymentMethod};
use crate::session::Session;

fn to_money(cents: i128) -> LedgerResult<Money> {
    i64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| LedgerError::invalid_amount("balance out of representable range"))
}

/// `opening + entries - exits` over the given movement log.
pub fn running_balance_from(opening: Money, movements: &[Movement]) -> LedgerResult<Money> {
    let total = movements
        .iter()
        .fold(opening.cents() as i128, |acc, m| acc + m.signed_cents());
    to_money(total)
}

/// Live balance of a session, recomputed fresh from its movement log.
///
/// For an open session this must be called on every read; the value is
/// never frozen until close.
pub fn running_balance(session: &Session) -> LedgerResult<Money> {
    running_balance_from(session.opening_balance(), session.movements())
}

/// Sum the session's movements of one kind, grouped by payment method.
///
/// Methods with no movements of that kind are absent from the map (a zero
/// total is never materialized). `BTreeMap` keeps iteration deterministic.
pub fn totals_by_method(
    session: &Session,
    kind: MovementKind,
) -> LedgerResult<BTreeMap<PaymentMethod, Money>> {
    let mut totals: BTreeMap<PaymentMethod, i128> = BTreeMap::new();
    for m in session.movements().iter().filter(|m| m.kind() == kind) {
        *totals.entry(m.payment_method()).or_insert(0) += m.amount().cents() as i128;
    }

    totals
        .into_iter()
        .map(|(method, cents)| Ok((method, to_money(cents)?)))
        .collect()
}

/// Close-time divergence (`declared - computed`), usable as a preview
/// before committing a close. Positive = surplus, negative = shortage.
pub fn divergence_at(
    opening: Money,
    movements: &[Movement],
    declared: Money,
) -> LedgerResult<Money> {
    let computed = running_balance_from(opening, movements)?;
    to_money(declared.cents() as i128 - computed.cents() as i128)
}
