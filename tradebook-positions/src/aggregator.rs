//! Position Aggregator.
//!
//! Folds an effective-version set into net positions keyed by
//! (tenant, book, asset). Each version contributes its signed quantity to
//! its asset book and the opposite to its counterparty book. Arithmetic is
//! exact; nothing is rounded here.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use tradebook_domain::{AccountingBasis, AssetId, BookId, Position, TenantId, Transaction};
use tradebook_store::LineageRepository;

use crate::cache::{CacheKey, PositionCache};
use crate::error::{PositionError, Result};
use crate::search::PositionFilter;
use crate::view::{AccountingView, ViewResolver};

/// Group versions by (book, asset) and sum their contributions.
///
/// Emits one position per group that received at least one contribution,
/// even when the contributions cancel out. Output is ordered by book, then
/// asset.
///
/// # Errors
/// `PositionError::Overflow` when a group's sum leaves the decimal range.
pub fn fold<'t>(
    tenant_id: TenantId,
    view: &AccountingView,
    versions: impl IntoIterator<Item = &'t Transaction>,
) -> Result<Vec<Position>> {
    let mut groups: BTreeMap<(BookId, AssetId), Decimal> = BTreeMap::new();

    for version in versions {
        for (book_id, signed) in version.contributions() {
            if !view.filter.matches_book(book_id) {
                continue;
            }
            let net = groups.entry((book_id.clone(), version.asset_id.clone())).or_default();
            *net = net.checked_add(signed).ok_or_else(|| PositionError::Overflow {
                book_id: book_id.clone(),
                asset_id: version.asset_id.clone(),
            })?;
        }
    }

    Ok(groups
        .into_iter()
        .map(|((book_id, asset_id), quantity)| Position {
            tenant_id,
            book_id,
            asset_id,
            quantity,
            basis: view.basis,
            as_of: view.as_of,
        })
        .collect())
}

/// Computes positions from the ledger, through the position cache when the
/// query is about the ledger's current state.
pub struct PositionAggregator<S: LineageRepository> {
    store: Arc<S>,
    resolver: ViewResolver<S>,
    cache: PositionCache,
}

impl<S: LineageRepository> PositionAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            resolver: ViewResolver::new(store.clone()),
            store,
            cache: PositionCache::new(),
        }
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    /// Every non-empty position of a tenant at `as_of` under `basis`.
    pub async fn positions_by_asset_manager(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
        basis: AccountingBasis,
    ) -> Result<Vec<Position>> {
        self.aggregate(tenant_id, basis, as_of, &PositionFilter::all(), None).await
    }

    /// Aggregate one (basis, date) view.
    ///
    /// Knowledge-time queries resolve the full view and bypass the cache;
    /// current-state queries go pair by pair through the cache.
    pub(crate) async fn aggregate(
        &self,
        tenant_id: TenantId,
        basis: AccountingBasis,
        as_of: NaiveDate,
        filter: &PositionFilter,
        known_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Position>> {
        if known_at.is_some() {
            let view = AccountingView::new(basis, as_of)
                .with_filter(filter.clone())
                .with_known_at(known_at);
            let versions = self.resolver.resolve(tenant_id, &view).await?;
            return fold(tenant_id, &view, &versions);
        }

        let (watermark, pairs) = self.store.pairs(tenant_id).await?;
        let mut positions = Vec::new();
        for pair in pairs.into_iter().filter(|p| filter.matches(p)) {
            let key = CacheKey::new(pair, basis, as_of);
            if let Some(quantity) = self.cache.net_quantity(self.store.as_ref(), &key).await? {
                positions.push(Position {
                    tenant_id,
                    book_id: key.pair.book_id,
                    asset_id: key.pair.asset_id,
                    quantity,
                    basis,
                    as_of,
                });
            }
        }

        debug!(
            tenant = %tenant_id,
            %basis,
            %as_of,
            watermark,
            positions = positions.len(),
            "Positions aggregated"
        );
        Ok(positions)
    }
}
