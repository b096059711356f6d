//! Storage layer errors

use thiserror::Error;
use tradebook_domain::DomainError;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity (lineage, transfer)
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Duplicate entity (id collision on create)
    #[error("Duplicate entity: {entity_type} with id {id}")]
    Duplicate {
        /// Type of entity
        entity_type: String,
        /// Entity ID
        id: String,
    },

    /// Optimistic version check failed
    #[error("Version conflict on {id}: expected {expected}, current {current}")]
    Conflict {
        /// Lineage that was targeted
        id: String,
        /// Version the writer expected to supersede
        expected: u32,
        /// Version actually current
        current: u32,
    },

    /// Lineage already ended in a cancellation
    #[error("Lineage {id} is cancelled")]
    Cancelled {
        /// Lineage id
        id: String,
    },

    /// Invalid state transition
    #[error("Invalid state transition: {message}")]
    InvalidState {
        /// Description of the invalid transition
        message: String,
    },

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(DomainError),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::VersionConflict {
                transaction_id,
                expected,
                current,
            } => StoreError::Conflict {
                id: transaction_id,
                expected,
                current,
            },
            DomainError::LineageCancelled(id) => StoreError::Cancelled { id },
            DomainError::InvalidStateTransition(message) => StoreError::InvalidState { message },
            other => StoreError::Domain(other),
        }
    }
}
