//! Repository trait definitions (Ports)
//!
//! The ledger is append-only: lineages are created once and then only grow.
//! Every append is stamped with a store-wide sequence number (the ledger
//! watermark) and recorded as a touch against each (book, asset) pair it
//! affects, so derived caches can tell whether they are still current.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tradebook_domain::{
    AccountingBasis, AssetId, BookId, Lineage, TenantId, Transaction, TransactionDraft,
    TransactionId, TransferId, Version,
};

/// (tenant, book, asset) triple that a position is keyed by
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub tenant_id: TenantId,
    pub book_id: BookId,
    pub asset_id: AssetId,
}

impl PairKey {
    /// Build a key
    pub fn new(tenant_id: TenantId, book_id: BookId, asset_id: AssetId) -> Self {
        Self { tenant_id, book_id, asset_id }
    }

    /// Both pairs a version affects: its asset book and its counterparty book
    pub fn pairs_of(record: &Transaction) -> [PairKey; 2] {
        [
            PairKey::new(record.tenant_id, record.asset_book_id.clone(), record.asset_id.clone()),
            PairKey::new(
                record.tenant_id,
                record.counterparty_book_id.clone(),
                record.asset_id.clone(),
            ),
        ]
    }
}

/// A write that affected a (book, asset) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Touch {
    /// Ledger watermark of the write
    pub seq: u64,
    pub transaction_date: NaiveDate,
    pub settlement_date: NaiveDate,
}

impl Touch {
    /// Whether the write can change a position on `as_of` under `basis`
    pub fn affects(&self, basis: AccountingBasis, as_of: NaiveDate) -> bool {
        let date = match basis {
            AccountingBasis::TransactionDate => self.transaction_date,
            AccountingBasis::SettlementDate => self.settlement_date,
        };
        date <= as_of
    }
}

/// Append to an existing lineage
#[derive(Debug, Clone)]
pub enum LineageOp {
    /// Supersede `expected` with a new full-field version
    Amend {
        expected: Version,
        draft: TransactionDraft,
        created_at: DateTime<Utc>,
    },
    /// Terminal cancellation marker
    Cancel { created_at: DateTime<Utc> },
}

/// Result of a successful write
#[derive(Debug, Clone)]
pub struct Appended {
    /// The record just stored
    pub record: Transaction,
    /// The record it superseded, if any
    pub previous: Option<Transaction>,
    /// Ledger watermark assigned to the write
    pub seq: u64,
}

/// Lineages touching one pair, read at a known watermark
#[derive(Debug, Clone)]
pub struct PairSnapshot {
    pub watermark: u64,
    pub lineages: Vec<Lineage>,
}

/// Repository for transaction lineages (append-only)
#[async_trait]
pub trait LineageRepository: Send + Sync {
    /// Store the original booking (version 0) of a new lineage.
    ///
    /// Fails with `Duplicate` if the id already has a lineage for the tenant.
    async fn insert(&self, original: Transaction) -> Result<Appended, StoreError>;

    /// Append to an existing lineage under its own lock.
    ///
    /// Fails with `NotFound`, `Cancelled` or `Conflict`.
    async fn append(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
        op: LineageOp,
    ) -> Result<Appended, StoreError>;

    /// Load one lineage
    async fn find(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> Result<Option<Lineage>, StoreError>;

    /// Load every lineage of a tenant
    async fn find_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Lineage>, StoreError>;

    /// Load the lineages whose versions carry the given transfer id
    async fn find_by_transfer(
        &self,
        tenant_id: TenantId,
        transfer_id: &TransferId,
    ) -> Result<Vec<Lineage>, StoreError>;

    /// Every lineage that has ever touched the pair, with the watermark the
    /// read is consistent with
    async fn pair_snapshot(&self, key: &PairKey) -> Result<PairSnapshot, StoreError>;

    /// Every pair a tenant's ledger has touched, with the current watermark
    async fn pairs(&self, tenant_id: TenantId) -> Result<(u64, Vec<PairKey>), StoreError>;

    /// Writes against the pair with a watermark greater than `after`
    async fn touches_since(&self, key: &PairKey, after: u64) -> Result<Vec<Touch>, StoreError>;

    /// Current ledger watermark
    fn watermark(&self) -> u64;
}
