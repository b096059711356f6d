//! Position cache.
//!
//! Eviction-free invalidation cache keyed by (tenant, book, asset, basis,
//! as-of date). Each entry remembers the ledger watermark it was computed
//! at. On read, any write against the pair since that watermark whose basis
//! date falls on or before the as-of date makes the entry stale, and a stale
//! entry is recomputed wholesale from the pair's lineages.
//!
//! ```text
//! Absent ─compute─▶ Valid ─affecting write─▶ Stale ─recompute─▶ Valid
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use tradebook_domain::AccountingBasis;
use tradebook_store::{LineageRepository, PairKey};

use crate::aggregator::fold;
use crate::error::Result;
use crate::search::PositionFilter;
use crate::view::AccountingView;

/// Cache key: one pair under one basis at one date
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub pair: PairKey,
    pub basis: AccountingBasis,
    pub as_of: NaiveDate,
}

impl CacheKey {
    pub fn new(pair: PairKey, basis: AccountingBasis, as_of: NaiveDate) -> Self {
        Self { pair, basis, as_of }
    }

    fn view(&self) -> AccountingView {
        AccountingView::new(self.basis, self.as_of).with_filter(PositionFilter::pair(&self.pair))
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    watermark: u64,
    /// `None` when no active version contributes to the pair
    value: Option<Decimal>,
}

/// Lifecycle state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheState {
    Absent,
    Valid,
    Stale,
}

/// Read counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Absent → Valid
    pub misses: u64,
    /// Stale → Valid
    pub recomputes: u64,
}

#[derive(Default)]
pub struct PositionCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    recomputes: AtomicU64,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of an entry against the store's touch log
    pub async fn state<S: LineageRepository + ?Sized>(
        &self,
        store: &S,
        key: &CacheKey,
    ) -> Result<CacheState> {
        let entry = self.entries.read().await.get(key).copied();
        match entry {
            None => Ok(CacheState::Absent),
            Some(entry) if self.is_stale(store, key, entry).await? => Ok(CacheState::Stale),
            Some(_) => Ok(CacheState::Valid),
        }
    }

    /// Net quantity of the pair, from the cache when the entry is valid.
    pub async fn net_quantity<S: LineageRepository + ?Sized>(
        &self,
        store: &S,
        key: &CacheKey,
    ) -> Result<Option<Decimal>> {
        let entry = self.entries.read().await.get(key).copied();

        match entry {
            Some(entry) if !self.is_stale(store, key, entry).await? => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    book = %key.pair.book_id,
                    asset = %key.pair.asset_id,
                    basis = %key.basis,
                    as_of = %key.as_of,
                    watermark = entry.watermark,
                    "Position cache hit"
                );
                return Ok(entry.value);
            },
            Some(_) => {
                self.recomputes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    book = %key.pair.book_id,
                    asset = %key.pair.asset_id,
                    basis = %key.basis,
                    as_of = %key.as_of,
                    "Position cache stale"
                );
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    book = %key.pair.book_id,
                    asset = %key.pair.asset_id,
                    basis = %key.basis,
                    as_of = %key.as_of,
                    "Position cache miss"
                );
            },
        }

        let entry = Self::compute(store, key).await?;
        self.entries.write().await.insert(key.clone(), entry);
        Ok(entry.value)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            recomputes: self.recomputes.load(Ordering::Relaxed),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every entry (counters are kept)
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn is_stale<S: LineageRepository + ?Sized>(
        &self,
        store: &S,
        key: &CacheKey,
        entry: CacheEntry,
    ) -> Result<bool> {
        let touches = store.touches_since(&key.pair, entry.watermark).await?;
        Ok(touches.iter().any(|t| t.affects(key.basis, key.as_of)))
    }

    /// Recompute the whole entry from the pair's lineages
    async fn compute<S: LineageRepository + ?Sized>(
        store: &S,
        key: &CacheKey,
    ) -> Result<CacheEntry> {
        let snapshot = store.pair_snapshot(&key.pair).await?;
        let view = key.view();
        let positions = fold(key.pair.tenant_id, &view, view.effective(&snapshot.lineages))?;

        Ok(CacheEntry {
            watermark: snapshot.watermark,
            value: positions.first().map(|p| p.quantity),
        })
    }
}
