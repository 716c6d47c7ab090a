//! Movements: the immutable facts the stock ledger is made of.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockroom_core::{Entity, UserId, ValueObject};

use crate::employee::EmployeeId;
use crate::error::LedgerError;
use crate::product::ProductId;

/// Identifier of a single movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(Uuid);

impl MovementId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MovementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What a movement did to stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received from a supplier (or the opening count).
    Entry,
    /// Goods handed to an employee.
    Delivered,
    /// Goods an employee brought back.
    Returned,
}

impl MovementKind {
    pub fn prefix(self) -> &'static str {
        match self {
            MovementKind::Entry => "ENT",
            MovementKind::Delivered => "DEL",
            MovementKind::Returned => "DEV",
        }
    }

    /// Sign applied to the quantity when folding movements into stock.
    pub fn sign(self) -> i64 {
        match self {
            MovementKind::Entry | MovementKind::Returned => 1,
            MovementKind::Delivered => -1,
        }
    }

    pub fn is_exit(self) -> bool {
        !matches!(self, MovementKind::Entry)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Delivered => "delivered",
            MovementKind::Returned => "returned",
        }
    }
}

impl core::str::FromStr for MovementKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" => Ok(MovementKind::Entry),
            "delivered" | "exit_delivered" | "exit-delivered" => Ok(MovementKind::Delivered),
            "returned" | "exit_returned" | "exit-returned" => Ok(MovementKind::Returned),
            other => Err(LedgerError::validation(format!(
                "unknown movement kind '{other}' (expected entry, delivered or returned)"
            ))),
        }
    }
}

/// The two exit flavours a caller can request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    Delivered,
    Returned,
}

impl From<ExitKind> for MovementKind {
    fn from(value: ExitKind) -> Self {
        match value {
            ExitKind::Delivered => MovementKind::Delivered,
            ExitKind::Returned => MovementKind::Returned,
        }
    }
}

/// Strictly positive quantity of stock units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, LedgerError> {
        if value <= 0 {
            return Err(LedgerError::InvalidQuantity(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = LedgerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl ValueObject for Quantity {}

/// Textual confirmation by the receiving employee (typically their full name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Trims surrounding whitespace; blank or absent input is `MissingSignature`.
    pub fn parse(raw: Option<&str>) -> Result<Self, LedgerError> {
        match raw.map(str::trim) {
            Some(s) if !s.is_empty() => Ok(Self(s.to_string())),
            _ => Err(LedgerError::MissingSignature),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Signature {}

/// Human-facing movement reference, e.g. `DEL-20260312-8F3A01B2C4D5E6F7`.
///
/// Built from the kind prefix, the recording day, and the random tail of the
/// movement's UUIDv7, so two movements recorded in the same millisecond still
/// get distinct numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementNumber(String);

impl MovementNumber {
    pub fn generate(kind: MovementKind, day: NaiveDate, id: MovementId) -> Self {
        let hex = id.as_uuid().simple().to_string().to_ascii_uppercase();
        let tail = hex.get(16..).unwrap_or(&hex);
        Self(format!("{}-{}-{}", kind.prefix(), day.format("%Y%m%d"), tail))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MovementNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for MovementNumber {}

/// Identity and audit data assigned to a movement before it is decided.
///
/// The ledger service creates stamps so the aggregate stays deterministic:
/// handling the same command with the same stamp always yields the same event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementStamp {
    pub movement_id: MovementId,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: UserId,
}

/// One immutable line of the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub number: MovementNumber,
    pub kind: MovementKind,
    pub product_id: ProductId,
    /// Present for deliveries and returns, absent for entries.
    pub employee_id: Option<EmployeeId>,
    pub quantity: Quantity,
    pub effective_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: UserId,
    pub signature: Option<Signature>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

impl Movement {
    /// Quantity with the kind's sign applied (entries and returns add).
    pub fn signed_quantity(&self) -> i64 {
        self.kind.sign() * self.quantity.get()
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
