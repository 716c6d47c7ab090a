use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Why a ledger operation was refused.
///
/// Every variant is raised before anything is appended, so a rejected request
/// never leaves a partial movement behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid quantity {0}: quantities must be greater than zero")]
    InvalidQuantity(i64),

    #[error("unknown or inactive product")]
    UnknownProduct,

    #[error("unknown or inactive employee")]
    UnknownEmployee,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("a delivery requires the receiving employee's signature")]
    MissingSignature,

    #[error("return of {requested} exceeds the {outstanding} still held by the employee")]
    ReturnExceedsDelivered { requested: i64, outstanding: i64 },

    #[error("product code '{0}' is already in use")]
    DuplicateProductCode(String),

    /// The stream kept moving under us for the whole retry budget.
    #[error("concurrent update conflict after {attempts} attempts; retry the operation")]
    ConcurrentUpdateConflict { attempts: u32 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("persistence failure: {0}")]
    Store(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short machine-readable code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidQuantity(_) => "invalid_quantity",
            LedgerError::UnknownProduct => "unknown_product",
            LedgerError::UnknownEmployee => "unknown_employee",
            LedgerError::InsufficientStock { .. } => "insufficient_stock",
            LedgerError::MissingSignature => "missing_signature",
            LedgerError::ReturnExceedsDelivered { .. } => "return_exceeds_delivered",
            LedgerError::DuplicateProductCode(_) => "duplicate_product_code",
            LedgerError::ConcurrentUpdateConflict { .. } => "concurrent_update_conflict",
            LedgerError::Validation(_) => "validation_error",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::Store(_) => "store_error",
        }
    }
}

impl From<stockroom_core::DomainError> for LedgerError {
    fn from(value: stockroom_core::DomainError) -> Self {
        use stockroom_core::DomainError;
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::InvariantViolation(msg) | DomainError::Conflict(msg) => LedgerError::Conflict(msg),
            DomainError::NotFound => LedgerError::UnknownEmployee,
        }
    }
}
