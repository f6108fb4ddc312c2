use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use tillbook_core::{Entity, LedgerError, LedgerResult, Money, MovementId, SessionId};

/// Direction of a cash movement relative to the drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Entry,
    Exit,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(MovementKind::Entry),
            "exit" => Ok(MovementKind::Exit),
            other => Err(LedgerError::validation(format!(
                "unknown movement kind: '{other}'"
            ))),
        }
    }
}

/// How the value moved. Informational only: every method counts against the
/// drawer balance identically (the original client models card and PIX
/// movements as cash-equivalent; `totals_by_method` gives the breakdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Pix,
    Transfer,
    Conditional,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Conditional => "conditional",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "pix" => Ok(PaymentMethod::Pix),
            "transfer" => Ok(PaymentMethod::Transfer),
            "conditional" => Ok(PaymentMethod::Conditional),
            other => Err(LedgerError::validation(format!(
                "unknown payment method: '{other}'"
            ))),
        }
    }
}

/// Where the movement originated. Informational tag only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Store,
    Ecommerce,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Store => "store",
            Location::Ecommerce => "ecommerce",
        }
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store" => Ok(Location::Store),
            "ecommerce" => Ok(Location::Ecommerce),
            other => Err(LedgerError::validation(format!(
                "unknown location: '{other}'"
            ))),
        }
    }
}

const DESCRIPTION_MIN: usize = 3;
const DESCRIPTION_MAX: usize = 150;

/// A validated, not-yet-persisted movement.
///
/// `MovementDraft::new` is the only constructor and runs all field
/// validation, so a draft that exists is a draft the store may append.
/// The store assigns the `MovementId` (see `Movement::from_draft`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDraft {
    pub session_id: SessionId,
    pub kind: MovementKind,
    pub amount: Money,
    pub description: String,
    pub payment_method: PaymentMethod,
    pub location: Location,
    pub created_at: DateTime<Utc>,
}

impl MovementDraft {
    pub fn new(
        session_id: SessionId,
        kind: MovementKind,
        amount: Money,
        description: impl Into<String>,
        payment_method: PaymentMethod,
        location: Location,
        created_at: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::invalid_amount(format!(
                "movement amount must be positive, got {amount}"
            )));
        }

        let description = description.into().trim().to_string();
        let len = description.chars().count();
        if !(DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&len) {
            return Err(LedgerError::validation(format!(
                "description must be {DESCRIPTION_MIN}-{DESCRIPTION_MAX} characters, got {len}"
            )));
        }

        Ok(Self {
            session_id,
            kind,
            amount,
            description,
            payment_method,
            location,
            created_at,
        })
    }
}

/// A single cash-affecting record, immutable once persisted.
///
/// Movements are append-only: there is no mutation API. Corrections are
/// recorded as new offsetting movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    id: MovementId,
    session_id: SessionId,
    kind: MovementKind,
    amount: Money,
    description: String,
    payment_method: PaymentMethod,
    location: Location,
    created_at: DateTime<Utc>,
}

impl Movement {
    /// Promote a validated draft to a persisted movement with its assigned id.
    pub fn from_draft(id: MovementId, draft: MovementDraft) -> Self {
        Self {
            id,
            session_id: draft.session_id,
            kind: draft.kind,
            amount: draft.amount,
            description: draft.description,
            payment_method: draft.payment_method,
            location: draft.location,
            created_at: draft.created_at,
        }
    }

    pub fn id_typed(&self) -> MovementId {
        self.id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Signed contribution to the drawer balance, in cents.
    pub(crate) fn signed_cents(&self) -> i128 {
        match self.kind {
            MovementKind::Entry => self.amount.cents() as i128,
            MovementKind::Exit => -(self.amount.cents() as i128),
        }
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
