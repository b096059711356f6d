//! Position query errors

use thiserror::Error;
use tradebook_domain::{AssetId, BookId};
use tradebook_store::StoreError;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Net quantity of a group is outside the representable decimal range
    #[error("Position overflow: {book_id} {asset_id}")]
    Overflow { book_id: BookId, asset_id: AssetId },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, PositionError>;
