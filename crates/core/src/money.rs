//! Fixed-point money in integer minor units (cents).
//!
//! Binary floating point must never touch drawer arithmetic: sums are exact
//! to the cent or they are useless for reconciliation. `Money` stores a
//! signed cent count and serializes as a plain integer, so amounts cross
//! the persistence boundary as decimal-safe values.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::value_object::ValueObject;

/// A monetary amount with 2 fractional digits, stored as signed cents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Parse a decimal string (`"123.45"`, `"-5"`, `"0.5"`) into cents.
    ///
    /// Rule for excess precision: more than 2 fractional digits is
    /// **rejected**, never rounded or truncated; the stored amount must be
    /// exactly what the operator typed.
    pub fn parse(input: &str) -> LedgerResult<Money> {
        let s = input.trim();
        if s.is_empty() {
            return Err(LedgerError::invalid_amount("empty amount"));
        }

        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match rest.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (rest, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::invalid_amount(format!(
                "not a decimal number: '{input}'"
            )));
        }

        let frac_cents: i64 = match frac {
            None => 0,
            Some(f) => {
                if f.is_empty() || f.len() > 2 || !f.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(LedgerError::invalid_amount(format!(
                        "amounts carry at most 2 fractional digits: '{input}'"
                    )));
                }
                let digits: i64 = f.parse().map_err(|_| {
                    LedgerError::invalid_amount(format!("not a decimal number: '{input}'"))
                })?;
                if f.len() == 1 { digits * 10 } else { digits }
            }
        };

        let whole_units: i64 = whole.parse().map_err(|_| {
            LedgerError::invalid_amount(format!("amount out of range: '{input}'"))
        })?;

        let magnitude = whole_units
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(|| LedgerError::invalid_amount(format!("amount out of range: '{input}'")))?;

        Ok(Money(if negative { -magnitude } else { magnitude }))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // i128 so i64::MIN does not overflow on abs().
        let cents = self.0 as i128;
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
