//! Tradebook Storage Layer
//!
//! Append-only persistence for transaction lineages.
//!
//! # Architecture
//!
//! - **Repository trait**: Defines the storage interface (port)
//! - **In-memory store**: Per-lineage locking with a pair/transfer index
//!
//! # Usage
//!
//! ```rust
//! use tradebook_store::{LineageRepository, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     assert_eq!(store.watermark(), 0);
//!     assert_eq!(store.lineage_count().await, 0);
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
pub use repository::{Appended, LineageOp, LineageRepository, PairKey, PairSnapshot, Touch};
