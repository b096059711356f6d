//! Ledger error types.

use thiserror::Error;
use tradebook_domain::DomainError;
use tradebook_store::StoreError;

/// Errors surfaced by ledger and transfer operations.
///
/// Every error is terminal for the call that produced it. The ledger never
/// retries a write on the caller's behalf.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or missing field, or unknown reference on a write
    #[error("Validation error: {0}")]
    Validation(String),

    /// Id collision on create
    #[error("Duplicate transaction: {transaction_id}")]
    Duplicate {
        /// Colliding id
        transaction_id: String,
    },

    /// Unknown lineage or transfer
    #[error("Not found: {entity} {id}")]
    NotFound {
        /// What was looked up (transaction, transfer)
        entity: &'static str,
        /// Identifier looked up
        id: String,
    },

    /// Cancel of an already-cancelled lineage
    #[error("Transaction already cancelled: {transaction_id}")]
    AlreadyCancelled {
        /// Lineage id
        transaction_id: String,
    },

    /// Write not allowed in the lineage's current state
    #[error("Invalid state for {transaction_id}: {reason}")]
    InvalidState {
        /// Lineage id
        transaction_id: String,
        /// Why the write was refused
        reason: String,
    },

    /// Optimistic version mismatch; re-read and retry
    #[error("Version conflict on {transaction_id}: expected {expected}, current {current}")]
    Conflict {
        /// Lineage id
        transaction_id: String,
        /// Version the caller targeted
        expected: u32,
        /// Version actually current
        current: u32,
    },

    /// A transfer's first leg is booked but neither the second leg nor the
    /// compensating cancel succeeded. The ledger holds an unmatched leg.
    #[error(
        "Partial failure in transfer {transfer_id}: leg {booked_leg} remains booked \
         (second leg: {leg_error}; compensation: {compensation_error})"
    )]
    PartialFailure {
        /// Transfer being booked
        transfer_id: String,
        /// Leg left in the ledger
        booked_leg: String,
        /// Why the second leg failed
        leg_error: String,
        /// Why the compensating cancel failed
        compensation_error: String,
    },

    /// Storage failure without a more specific mapping
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl LedgerError {
    /// Whether the caller should re-read and retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }

    /// Whether a retry after re-reading can succeed. Only version conflicts
    /// qualify; everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Short name of the error class, used in logs and responses
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "ValidationError",
            LedgerError::Duplicate { .. } => "DuplicateError",
            LedgerError::NotFound { .. } => "NotFoundError",
            LedgerError::AlreadyCancelled { .. } => "AlreadyCancelledError",
            LedgerError::InvalidState { .. } => "InvalidStateError",
            LedgerError::Conflict { .. } => "ConflictError",
            LedgerError::PartialFailure { .. } => "PartialFailureError",
            LedgerError::Store(_) => "StoreError",
        }
    }

    pub(crate) fn transaction_not_found(id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: "transaction",
            id: id.into(),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::VersionConflict {
                transaction_id,
                expected,
                current,
            } => LedgerError::Conflict {
                transaction_id,
                expected,
                current,
            },
            DomainError::LineageCancelled(transaction_id) => {
                LedgerError::AlreadyCancelled { transaction_id }
            },
            other => LedgerError::Validation(other.to_string()),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { id, .. } => LedgerError::Duplicate { transaction_id: id },
            StoreError::NotFound { id, .. } => LedgerError::transaction_not_found(id),
            StoreError::Conflict {
                id,
                expected,
                current,
            } => LedgerError::Conflict {
                transaction_id: id,
                expected,
                current,
            },
            StoreError::Cancelled { id } => LedgerError::AlreadyCancelled { transaction_id: id },
            StoreError::Domain(domain) => LedgerError::from(domain),
            other => LedgerError::Store(other),
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
