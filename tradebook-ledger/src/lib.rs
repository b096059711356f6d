//! Tradebook Ledger Layer
//!
//! The write side: reference checks, the append-only transaction ledger and
//! the book transfer orchestrator.
//!
//! # Architecture
//!
//! ```text
//! Request → Draft → Reference Resolver → Ledger → LineageRepository
//!                                          ↑
//!                         Transfer Orchestrator (two legs + compensation)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tradebook_ledger::{AcceptAllReferences, Ledger, TransferOrchestrator};
//! use tradebook_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let ledger = Ledger::new(Arc::new(MemoryStore::new()), Arc::new(AcceptAllReferences));
//! let booked = ledger.book(draft).await?;
//! let transfers = TransferOrchestrator::new(ledger.clone());
//! let receipt = transfers.book_transfer(request).await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod ledger;
pub mod reference;
pub mod request;
pub mod transfer;

pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use reference::{
    resolve, resolve_draft, AcceptAllReferences, ReferenceDirectory, ReferenceKind,
    ReferenceResolver,
};
pub use request::TransactionRequest;
pub use transfer::{
    TransferOrchestrator, TransferReceipt, TransferRequest, TransferSaga, TransferState,
};
