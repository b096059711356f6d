//! In-memory store implementation
//!
//! Each lineage sits behind its own lock, so writes to different
//! transactions never wait on each other. A small shared index maps
//! (book, asset) pairs and transfer ids to lineages and carries the touch
//! log; it is held only for the duration of an index update.
//!
//! Lock order is always lineage map → lineage → index.

use crate::error::StoreError;
use crate::repository::{Appended, LineageOp, LineageRepository, PairKey, PairSnapshot, Touch};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use tradebook_domain::{Lineage, TenantId, Transaction, TransactionId, TransferId};

type LineageKey = (TenantId, TransactionId);

/// In-memory lineage store
pub struct MemoryStore {
    lineages: RwLock<HashMap<LineageKey, Arc<RwLock<Lineage>>>>,
    index: RwLock<Index>,
    seq: AtomicU64,
}

#[derive(Default)]
struct Index {
    pairs: HashMap<PairKey, PairEntry>,
    transfers: HashMap<(TenantId, TransferId), BTreeSet<TransactionId>>,
}

#[derive(Default)]
struct PairEntry {
    transactions: BTreeSet<TransactionId>,
    touches: Vec<Touch>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            lineages: RwLock::new(HashMap::new()),
            index: RwLock::new(Index::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// Get the number of lineages
    pub async fn lineage_count(&self) -> usize {
        self.lineages.read().await.len()
    }

    /// Clear all data (useful for test setup)
    pub async fn clear(&self) {
        let mut lineages = self.lineages.write().await;
        let mut index = self.index.write().await;
        lineages.clear();
        *index = Index::default();
        self.seq.store(0, Ordering::SeqCst);
    }

    /// Stamp a write with the next watermark and index every pair it affects.
    ///
    /// The watermark is assigned under the index lock so that readers who
    /// take the index lock see either the write and its touch, or neither.
    async fn record(&self, record: &Transaction, previous: Option<&Transaction>) -> u64 {
        let mut index = self.index.write().await;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        for rec in previous.into_iter().chain(std::iter::once(record)) {
            let touch = Touch {
                seq,
                transaction_date: rec.transaction_date,
                settlement_date: rec.settlement_date,
            };
            for key in PairKey::pairs_of(rec) {
                let entry = index.pairs.entry(key).or_default();
                entry.transactions.insert(rec.transaction_id.clone());
                if entry.touches.last() != Some(&touch) {
                    entry.touches.push(touch);
                }
            }
            if let Some(transfer_id) = &rec.transfer_id {
                index
                    .transfers
                    .entry((rec.tenant_id, transfer_id.clone()))
                    .or_default()
                    .insert(rec.transaction_id.clone());
            }
        }

        seq
    }

    async fn cells(
        &self,
        tenant_id: TenantId,
        ids: impl IntoIterator<Item = TransactionId>,
    ) -> Vec<Arc<RwLock<Lineage>>> {
        let lineages = self.lineages.read().await;
        ids.into_iter()
            .filter_map(|id| lineages.get(&(tenant_id, id)).cloned())
            .collect()
    }

    async fn load(cells: Vec<Arc<RwLock<Lineage>>>) -> Vec<Lineage> {
        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            out.push(cell.read().await.clone());
        }
        out
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Lineage Repository Implementation
// =============================================================================

#[async_trait]
impl LineageRepository for MemoryStore {
    async fn insert(&self, original: Transaction) -> Result<Appended, StoreError> {
        let key = (original.tenant_id, original.transaction_id.clone());
        let lineage = Lineage::open(original.clone())?;

        let mut lineages = self.lineages.write().await;
        if lineages.contains_key(&key) {
            return Err(StoreError::duplicate("lineage", original.transaction_id.to_string()));
        }
        lineages.insert(key, Arc::new(RwLock::new(lineage)));
        let seq = self.record(&original, None).await;
        drop(lineages);

        debug!(
            tenant = %original.tenant_id,
            transaction_id = %original.transaction_id,
            seq,
            "Lineage opened"
        );

        Ok(Appended {
            record: original,
            previous: None,
            seq,
        })
    }

    async fn append(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
        op: LineageOp,
    ) -> Result<Appended, StoreError> {
        let cell = {
            let lineages = self.lineages.read().await;
            lineages
                .get(&(tenant_id, transaction_id.clone()))
                .cloned()
                .ok_or_else(|| StoreError::not_found("lineage", transaction_id.to_string()))?
        };

        let mut lineage = cell.write().await;
        let previous = lineage.current().clone();
        let record = match op {
            LineageOp::Amend {
                expected,
                draft,
                created_at,
            } => lineage.amend(expected, draft, created_at)?.clone(),
            LineageOp::Cancel { created_at } => lineage.cancel(created_at)?.clone(),
        };
        let seq = self.record(&record, Some(&previous)).await;
        drop(lineage);

        debug!(
            tenant = %tenant_id,
            transaction_id = %transaction_id,
            version = record.version,
            status = %record.status,
            seq,
            "Lineage appended"
        );

        Ok(Appended {
            record,
            previous: Some(previous),
            seq,
        })
    }

    async fn find(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> Result<Option<Lineage>, StoreError> {
        let cell = self.lineages.read().await.get(&(tenant_id, transaction_id.clone())).cloned();
        match cell {
            Some(cell) => Ok(Some(cell.read().await.clone())),
            None => Ok(None),
        }
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Lineage>, StoreError> {
        let cells: Vec<_> = {
            let lineages = self.lineages.read().await;
            let mut keyed: Vec<_> = lineages
                .iter()
                .filter(|((tenant, _), _)| *tenant == tenant_id)
                .map(|((_, id), cell)| (id.clone(), cell.clone()))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            keyed.into_iter().map(|(_, cell)| cell).collect()
        };
        Ok(Self::load(cells).await)
    }

    async fn find_by_transfer(
        &self,
        tenant_id: TenantId,
        transfer_id: &TransferId,
    ) -> Result<Vec<Lineage>, StoreError> {
        let ids: Vec<TransactionId> = {
            let index = self.index.read().await;
            index
                .transfers
                .get(&(tenant_id, transfer_id.clone()))
                .map(|ids| ids.iter().cloned().collect())
                .unwrap_or_default()
        };
        let cells = self.cells(tenant_id, ids).await;
        Ok(Self::load(cells).await)
    }

    async fn pair_snapshot(&self, key: &PairKey) -> Result<PairSnapshot, StoreError> {
        let (watermark, ids) = {
            let index = self.index.read().await;
            let ids: Vec<TransactionId> = index
                .pairs
                .get(key)
                .map(|entry| entry.transactions.iter().cloned().collect())
                .unwrap_or_default();
            (self.seq.load(Ordering::SeqCst), ids)
        };
        let cells = self.cells(key.tenant_id, ids).await;
        Ok(PairSnapshot {
            watermark,
            lineages: Self::load(cells).await,
        })
    }

    async fn pairs(&self, tenant_id: TenantId) -> Result<(u64, Vec<PairKey>), StoreError> {
        let index = self.index.read().await;
        let mut keys: Vec<PairKey> =
            index.pairs.keys().filter(|k| k.tenant_id == tenant_id).cloned().collect();
        keys.sort();
        Ok((self.seq.load(Ordering::SeqCst), keys))
    }

    async fn touches_since(&self, key: &PairKey, after: u64) -> Result<Vec<Touch>, StoreError> {
        let index = self.index.read().await;
        Ok(index
            .pairs
            .get(key)
            .map(|entry| entry.touches.iter().filter(|t| t.seq > after).copied().collect())
            .unwrap_or_default())
    }

    fn watermark(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use tradebook_domain::{
        AccountingBasis, AssetId, BookId, Currency, Price, Quantity, TransactionAction,
        TransactionDraft, TransactionStatus,
    };

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn draft(tenant: u64, id: &str, book: &str) -> TransactionDraft {
        TransactionDraft {
            tenant_id: TenantId::new(tenant),
            transaction_id: Some(TransactionId::new(id).unwrap()),
            action: TransactionAction::Buy,
            asset_id: AssetId::new("Z77.SI").unwrap(),
            asset_book_id: BookId::new(book).unwrap(),
            counterparty_book_id: BookId::new("BROKER").unwrap(),
            transaction_date: date(10),
            settlement_date: date(12),
            quantity: Quantity::new(dec!(100)).unwrap(),
            price: Price::new(dec!(3.92)).unwrap(),
            currency: Currency::new("SGD").unwrap(),
            transfer_id: None,
        }
    }

    fn original(tenant: u64, id: &str, book: &str) -> Transaction {
        Transaction::from_draft(
            draft(tenant, id, book),
            TransactionId::new(id).unwrap(),
            0,
            TransactionStatus::Confirmed,
            Utc::now(),
            None,
        )
    }

    fn pair(tenant: u64, book: &str) -> PairKey {
        PairKey::new(
            TenantId::new(tenant),
            BookId::new(book).unwrap(),
            AssetId::new("Z77.SI").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        let appended = store.insert(original(1, "T1", "BOOK1")).await.unwrap();
        assert_eq!(appended.seq, 1);
        assert_eq!(store.watermark(), 1);

        let id = TransactionId::new("T1").unwrap();
        let lineage = store.find(TenantId::new(1), &id).await.unwrap().unwrap();
        assert_eq!(lineage.current_version(), 0);

        // Same id under another tenant is a different lineage
        assert!(store.find(TenantId::new(2), &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let store = MemoryStore::new();
        store.insert(original(1, "T1", "BOOK1")).await.unwrap();

        let result = store.insert(original(1, "T1", "BOOK2")).await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
        assert_eq!(store.lineage_count().await, 1);

        // Other tenants may reuse the id
        assert!(store.insert(original(2, "T1", "BOOK1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_append_unknown_lineage() {
        let store = MemoryStore::new();
        let result = store
            .append(
                TenantId::new(1),
                &TransactionId::new("NOPE").unwrap(),
                LineageOp::Cancel { created_at: Utc::now() },
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_append_maps_conflict_and_cancelled() {
        let store = MemoryStore::new();
        store.insert(original(1, "T1", "BOOK1")).await.unwrap();
        let id = TransactionId::new("T1").unwrap();

        let stale = store
            .append(
                TenantId::new(1),
                &id,
                LineageOp::Amend {
                    expected: 3,
                    draft: draft(1, "T1", "BOOK1"),
                    created_at: Utc::now(),
                },
            )
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict { expected: 3, current: 0, .. })));

        let cancelled = store
            .append(TenantId::new(1), &id, LineageOp::Cancel { created_at: Utc::now() })
            .await
            .unwrap();
        assert_eq!(cancelled.record.status, TransactionStatus::Cancelled);
        assert_eq!(cancelled.previous.unwrap().version, 0);

        let again = store
            .append(TenantId::new(1), &id, LineageOp::Cancel { created_at: Utc::now() })
            .await;
        assert!(matches!(again, Err(StoreError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_pair_index_follows_amended_book() {
        let store = MemoryStore::new();
        store.insert(original(1, "T1", "BOOK1")).await.unwrap();

        store
            .append(
                TenantId::new(1),
                &TransactionId::new("T1").unwrap(),
                LineageOp::Amend {
                    expected: 0,
                    draft: draft(1, "T1", "BOOK2"),
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let (watermark, pairs) = store.pairs(TenantId::new(1)).await.unwrap();
        assert_eq!(watermark, 2);
        assert_eq!(pairs, vec![pair(1, "BOOK1"), pair(1, "BOOK2"), pair(1, "BROKER")]);

        // The old book keeps the lineage in its index and sees the write
        let snapshot = store.pair_snapshot(&pair(1, "BOOK1")).await.unwrap();
        assert_eq!(snapshot.watermark, 2);
        assert_eq!(snapshot.lineages.len(), 1);
        let touches = store.touches_since(&pair(1, "BOOK1"), 1).await.unwrap();
        assert_eq!(touches.len(), 1);
        assert_eq!(touches[0].seq, 2);
    }

    #[tokio::test]
    async fn test_touch_affects_by_basis() {
        let touch = Touch {
            seq: 1,
            transaction_date: date(10),
            settlement_date: date(12),
        };
        assert!(touch.affects(AccountingBasis::TransactionDate, date(10)));
        assert!(!touch.affects(AccountingBasis::TransactionDate, date(9)));
        assert!(!touch.affects(AccountingBasis::SettlementDate, date(11)));
        assert!(touch.affects(AccountingBasis::SettlementDate, date(12)));
    }

    #[tokio::test]
    async fn test_find_by_transfer() {
        let store = MemoryStore::new();
        let transfer_id = TransferId::from_string("TRF-1");

        for (id, book) in [("L1", "BOOK1"), ("L2", "BOOK2")] {
            let mut d = draft(1, id, book);
            d.transfer_id = Some(transfer_id.clone());
            let record = Transaction::from_draft(
                d,
                TransactionId::new(id).unwrap(),
                0,
                TransactionStatus::Confirmed,
                Utc::now(),
                None,
            );
            store.insert(record).await.unwrap();
        }
        store.insert(original(1, "OTHER", "BOOK1")).await.unwrap();

        let legs = store.find_by_transfer(TenantId::new(1), &transfer_id).await.unwrap();
        assert_eq!(legs.len(), 2);
        assert!(store
            .find_by_transfer(TenantId::new(2), &transfer_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_find_by_tenant_and_clear() {
        let store = MemoryStore::new();
        store.insert(original(1, "B", "BOOK1")).await.unwrap();
        store.insert(original(1, "A", "BOOK1")).await.unwrap();
        store.insert(original(2, "C", "BOOK1")).await.unwrap();

        let lineages = store.find_by_tenant(TenantId::new(1)).await.unwrap();
        let ids: Vec<_> = lineages.iter().map(|l| l.transaction_id().as_str().to_string()).collect();
        assert_eq!(ids, vec!["A", "B"]);

        store.clear().await;
        assert_eq!(store.lineage_count().await, 0);
        assert_eq!(store.watermark(), 0);
    }

    #[tokio::test]
    async fn test_parallel_writes_to_distinct_lineages() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert(original(1, &format!("T{i}"), "BOOK1")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.lineage_count().await, 16);
        assert_eq!(store.watermark(), 16);

        let snapshot = store.pair_snapshot(&pair(1, "BOOK1")).await.unwrap();
        assert_eq!(snapshot.lineages.len(), 16);
    }
}
