//! Service error types.

use thiserror::Error;
use tradebook_domain::DomainError;
use tradebook_ledger::LedgerError;
use tradebook_positions::PositionError;

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Ledger or transfer error (carries the booking error taxonomy)
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Position query error
    #[error(transparent)]
    Position(#[from] PositionError),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Whether the caller should re-read and retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, ServiceError::Ledger(e) if e.is_conflict())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Ledger(e) if e.is_retryable())
    }

    /// Short name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Ledger(e) => e.kind(),
            ServiceError::Position(PositionError::InvalidQuery(_)) => "ValidationError",
            ServiceError::Position(PositionError::Overflow { .. }) => "OverflowError",
            ServiceError::Position(PositionError::Store(_)) => "StoreError",
            ServiceError::Domain(_) => "ValidationError",
            ServiceError::Config(_) => "ConfigError",
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
