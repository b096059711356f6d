//! Tradebook Positions
//!
//! The read side: point-in-time positions derived from ledger lineages.
//!
//! # Architecture
//!
//! ```text
//! Lineages → Accounting View Resolver → Position Aggregator → Position Search
//!                                            ↕
//!                                      Position Cache
//! ```
//!
//! Nothing here writes to the ledger. Positions are never stored
//! authoritatively; the cache only remembers values it can recompute.

#![warn(clippy::all)]

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod search;
pub mod view;

pub use aggregator::{fold, PositionAggregator};
pub use cache::{CacheKey, CacheState, CacheStats, PositionCache};
pub use error::{PositionError, Result};
pub use search::{PositionFilter, PositionQuery, PositionSet};
pub use view::{AccountingView, ViewResolver};
