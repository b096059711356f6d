//! Tradebook Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains identifiers, value objects, transaction versions, lineages
//! and derived positions.

#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod lineage;
pub mod position;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{Transaction, TransactionDraft, TransactionStatus, TransferId, Version};
pub use lineage::Lineage;
pub use position::Position;
pub use value_objects::{
    validate_identifier, AccountingBasis, AssetId, BookId, Currency, DomainError, PartyId, Price,
    Quantity, TenantId, TransactionAction, TransactionId, MAX_IDENTIFIER_LEN,
};
