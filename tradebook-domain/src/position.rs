//! Derived net positions.
//!
//! A position is never stored authoritatively; it is the signed sum of the
//! active versions whose basis date falls on or before the as-of date.

use crate::value_objects::{AccountingBasis, AssetId, BookId, TenantId};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Net quantity of one asset in one book under one basis at one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub tenant_id: TenantId,
    pub book_id: BookId,
    pub asset_id: AssetId,
    /// Exact signed quantity; never rounded
    pub quantity: Decimal,
    pub basis: AccountingBasis,
    pub as_of: NaiveDate,
}

impl Position {
    /// Quantity rounded half-even for presentation only
    pub fn display_quantity(&self, scale: u32) -> Decimal {
        self.quantity
            .round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
            .normalize()
    }

    /// Whether the book holds nothing net
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} ({} as of {})",
            self.book_id,
            self.quantity.normalize(),
            self.asset_id,
            self.basis,
            self.as_of
        )
    }
}
