//! Position Search: filtered queries over the aggregator.
//!
//! Filters are applied before grouping. When several bases are requested,
//! each basis is aggregated on its own and returned as a separate result
//! set; sums under different bases are never merged.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tradebook_domain::{AccountingBasis, AssetId, BookId, Position, TenantId};
use tradebook_store::{LineageRepository, PairKey};

use crate::aggregator::PositionAggregator;
use crate::error::{PositionError, Result};

/// Book and asset predicates. An empty list matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionFilter {
    pub book_ids: Vec<BookId>,
    pub asset_ids: Vec<AssetId>,
}

impl PositionFilter {
    /// Match every book and asset
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_books(mut self, book_ids: impl IntoIterator<Item = BookId>) -> Self {
        self.book_ids.extend(book_ids);
        self
    }

    pub fn with_assets(mut self, asset_ids: impl IntoIterator<Item = AssetId>) -> Self {
        self.asset_ids.extend(asset_ids);
        self
    }

    pub fn matches_book(&self, book_id: &BookId) -> bool {
        self.book_ids.is_empty() || self.book_ids.contains(book_id)
    }

    pub fn matches_asset(&self, asset_id: &AssetId) -> bool {
        self.asset_ids.is_empty() || self.asset_ids.contains(asset_id)
    }

    pub fn matches(&self, key: &PairKey) -> bool {
        self.matches_book(&key.book_id) && self.matches_asset(&key.asset_id)
    }

    /// Filter selecting exactly one (book, asset) pair
    pub fn pair(key: &PairKey) -> Self {
        Self {
            book_ids: vec![key.book_id.clone()],
            asset_ids: vec![key.asset_id.clone()],
        }
    }
}

/// A `position_search` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionQuery {
    pub tenant_id: TenantId,
    pub filter: PositionFilter,
    /// Bases to aggregate, each into its own result set
    pub bases: Vec<AccountingBasis>,
    pub position_date: NaiveDate,
    /// Reconstruct what the ledger held at this instant (now when absent)
    pub known_at: Option<DateTime<Utc>>,
}

impl PositionQuery {
    pub fn new(tenant_id: TenantId, position_date: NaiveDate) -> Self {
        Self {
            tenant_id,
            filter: PositionFilter::all(),
            bases: vec![AccountingBasis::TransactionDate],
            position_date,
            known_at: None,
        }
    }

    pub fn with_filter(mut self, filter: PositionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_bases(mut self, bases: impl IntoIterator<Item = AccountingBasis>) -> Self {
        self.bases = bases.into_iter().collect();
        self
    }

    pub fn known_at(mut self, known_at: DateTime<Utc>) -> Self {
        self.known_at = Some(known_at);
        self
    }
}

/// Positions for one basis at one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSet {
    pub basis: AccountingBasis,
    pub as_of: NaiveDate,
    /// Ordered by book, then asset
    pub positions: Vec<Position>,
}

impl PositionSet {
    /// Net quantity of a pair; an absent group is flat
    pub fn quantity(&self, book_id: &BookId, asset_id: &AssetId) -> Decimal {
        self.positions
            .iter()
            .find(|p| &p.book_id == book_id && &p.asset_id == asset_id)
            .map(|p| p.quantity)
            .unwrap_or_default()
    }
}

impl<S: LineageRepository> PositionAggregator<S> {
    /// Filtered positions, one result set per requested basis, in request
    /// order. Repeated bases are reported once.
    ///
    /// # Errors
    /// `InvalidQuery` when no basis is requested.
    pub async fn position_search(&self, query: &PositionQuery) -> Result<Vec<PositionSet>> {
        if query.bases.is_empty() {
            return Err(PositionError::InvalidQuery(
                "at least one accounting basis is required".to_string(),
            ));
        }

        let mut bases: Vec<AccountingBasis> = Vec::with_capacity(query.bases.len());
        for basis in &query.bases {
            if !bases.contains(basis) {
                bases.push(*basis);
            }
        }

        let mut sets = Vec::with_capacity(bases.len());
        for basis in bases {
            let positions = self
                .aggregate(
                    query.tenant_id,
                    basis,
                    query.position_date,
                    &query.filter,
                    query.known_at,
                )
                .await?;
            sets.push(PositionSet {
                basis,
                as_of: query.position_date,
                positions,
            });
        }

        debug!(
            tenant = %query.tenant_id,
            as_of = %query.position_date,
            sets = sets.len(),
            "Position search completed"
        );
        Ok(sets)
    }

    /// Positions at each date, every date resolved independently.
    pub async fn position_history(
        &self,
        tenant_id: TenantId,
        basis: AccountingBasis,
        dates: &[NaiveDate],
        filter: &PositionFilter,
    ) -> Result<Vec<PositionSet>> {
        let mut sets = Vec::with_capacity(dates.len());
        for &as_of in dates {
            let positions = self.aggregate(tenant_id, basis, as_of, filter, None).await?;
            sets.push(PositionSet {
                basis,
                as_of,
                positions,
            });
        }
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradebook_testkit::{asset, book, date, tenant, test_ledger, TransactionBuilder};

    #[test]
    fn test_filter_matching() {
        let filter = PositionFilter::all().with_books([book("BOOK1")]);
        assert!(filter.matches_book(&book("BOOK1")));
        assert!(!filter.matches_book(&book("BOOK2")));
        assert!(filter.matches_asset(&asset("ANY")));

        let key = PairKey::new(tenant(), book("BOOK1"), asset("X"));
        assert!(PositionFilter::pair(&key).matches(&key));
    }

    #[tokio::test]
    async fn test_search_returns_one_set_per_basis() {
        let (store, ledger) = test_ledger();
        ledger
            .book(
                TransactionBuilder::buy(dec!(100))
                    .traded(date(2024, 1, 2))
                    .settles(date(2024, 1, 4))
                    .build(),
            )
            .await
            .unwrap();
        let aggregator = PositionAggregator::new(store);

        let query = PositionQuery::new(tenant(), date(2024, 1, 3))
            .with_filter(PositionFilter::all().with_books([book("BOOK1")]))
            .with_bases(AccountingBasis::ALL);
        let sets = aggregator.position_search(&query).await.unwrap();

        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].basis, AccountingBasis::TransactionDate);
        assert_eq!(sets[0].quantity(&book("BOOK1"), &asset("X")), dec!(100));
        assert_eq!(sets[1].basis, AccountingBasis::SettlementDate);
        assert!(sets[1].positions.is_empty());

        // The filter drops the counterparty book
        assert!(sets[0].positions.iter().all(|p| p.book_id == book("BOOK1")));
    }

    #[tokio::test]
    async fn test_search_requires_a_basis() {
        let (store, _) = test_ledger();
        let aggregator = PositionAggregator::new(store);
        let query = PositionQuery::new(tenant(), date(2024, 1, 3)).with_bases([]);
        assert!(matches!(
            aggregator.position_search(&query).await,
            Err(PositionError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_history_resolves_each_date() {
        let (store, ledger) = test_ledger();
        ledger
            .book(TransactionBuilder::buy(dec!(100)).on(date(2024, 1, 2)).build())
            .await
            .unwrap();
        ledger
            .book(TransactionBuilder::buy(dec!(150)).on(date(2024, 1, 1)).build())
            .await
            .unwrap();
        let aggregator = PositionAggregator::new(store);

        let dates = [date(2023, 12, 31), date(2024, 1, 1), date(2024, 1, 2)];
        let sets = aggregator
            .position_history(
                tenant(),
                AccountingBasis::TransactionDate,
                &dates,
                &PositionFilter::all(),
            )
            .await
            .unwrap();

        let book1: Vec<_> = sets.iter().map(|s| s.quantity(&book("BOOK1"), &asset("X"))).collect();
        assert_eq!(book1, vec![dec!(0), dec!(150), dec!(250)]);
        assert_eq!(sets[2].as_of, date(2024, 1, 2));
    }
}
