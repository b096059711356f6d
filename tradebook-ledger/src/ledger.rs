//! Transaction Ledger: booking, cancellation, amendment and retrieval.
//!
//! The ledger is the only writer of lineage state. Every write is an append
//! to a lineage; nothing is edited in place, so positions can always be
//! recomputed from lineage state alone.
//!
//! # Flow
//!
//! ```text
//! Draft → shape checks → reference checks → Store append (per-lineage lock) → Record
//! ```

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use tradebook_domain::{
    Lineage, TenantId, Transaction, TransactionDraft, TransactionId, TransactionStatus, Version,
};
use tradebook_store::{LineageOp, LineageRepository, StoreError};

use crate::error::{LedgerError, LedgerResult};
use crate::reference::{resolve_draft, ReferenceResolver};

/// Append-only transaction ledger.
pub struct Ledger<S: LineageRepository, R: ReferenceResolver> {
    store: Arc<S>,
    references: Arc<R>,
}

impl<S: LineageRepository, R: ReferenceResolver> Clone for Ledger<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            references: self.references.clone(),
        }
    }
}

impl<S: LineageRepository, R: ReferenceResolver> Ledger<S, R> {
    /// Create a ledger over a store and a reference resolver.
    pub fn new(store: Arc<S>, references: Arc<R>) -> Self {
        Self { store, references }
    }

    /// The underlying store (read side shares it)
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn references(&self) -> &Arc<R> {
        &self.references
    }

    /// Book a new transaction as version 0 of a fresh lineage.
    ///
    /// Assigns a time-ordered id when the draft carries none.
    ///
    /// # Errors
    /// - `Validation` for malformed fields or unknown references
    /// - `Duplicate` if the id already has a lineage for the tenant
    pub async fn book(&self, draft: TransactionDraft) -> LedgerResult<Transaction> {
        draft.validate()?;
        if let Err(e) = resolve_draft(self.references.as_ref(), &draft).await {
            warn!(tenant = %draft.tenant_id, error = %e, "Booking rejected");
            return Err(e);
        }

        let transaction_id = draft.transaction_id.clone().unwrap_or_else(TransactionId::generate);
        let record = Transaction::from_draft(
            draft,
            transaction_id,
            0,
            TransactionStatus::Confirmed,
            Utc::now(),
            None,
        );

        let appended = self.store.insert(record).await?;
        let record = appended.record;

        info!(
            tenant = %record.tenant_id,
            transaction_id = %record.transaction_id,
            action = %record.action,
            book = %record.asset_book_id,
            counterparty = %record.counterparty_book_id,
            asset = %record.asset_id,
            quantity = %record.quantity,
            transaction_date = %record.transaction_date,
            settlement_date = %record.settlement_date,
            seq = appended.seq,
            "Transaction booked"
        );

        Ok(record)
    }

    /// Append a terminal cancellation marker to a lineage.
    ///
    /// # Errors
    /// - `NotFound` for an unknown lineage
    /// - `AlreadyCancelled` if the lineage is already cancelled
    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> LedgerResult<Transaction> {
        let appended = self
            .store
            .append(tenant_id, transaction_id, LineageOp::Cancel { created_at: Utc::now() })
            .await
            .map_err(|e| {
                warn!(tenant = %tenant_id, %transaction_id, error = %e, "Cancel rejected");
                LedgerError::from(e)
            })?;

        info!(
            tenant = %tenant_id,
            %transaction_id,
            version = appended.record.version,
            seq = appended.seq,
            "Transaction cancelled"
        );

        Ok(appended.record)
    }

    /// Supersede version `expected` of a lineage with a new full-field version.
    ///
    /// The draft must carry the id of the lineage being amended. Any field
    /// other than tenant and id may change; references are checked again.
    ///
    /// # Errors
    /// - `Validation` for malformed fields, unknown references or a missing id
    /// - `NotFound` for an unknown lineage
    /// - `InvalidState` if the lineage is cancelled
    /// - `Conflict` if `expected` is not the current version
    pub async fn amend(
        &self,
        draft: TransactionDraft,
        expected: Version,
    ) -> LedgerResult<Transaction> {
        let tenant_id = draft.tenant_id;
        let transaction_id = draft.transaction_id.clone().ok_or_else(|| {
            LedgerError::Validation("amendment requires a transaction id".to_string())
        })?;

        // Report lineage state before reference problems
        let lineage = self.lineage(tenant_id, &transaction_id).await?;
        if lineage.is_cancelled() {
            return Err(Self::amend_on_cancelled(&transaction_id));
        }

        draft.validate()?;
        resolve_draft(self.references.as_ref(), &draft).await?;

        let op = LineageOp::Amend {
            expected,
            draft,
            created_at: Utc::now(),
        };
        let appended = match self.store.append(tenant_id, &transaction_id, op).await {
            Ok(appended) => appended,
            Err(StoreError::Cancelled { .. }) => {
                return Err(Self::amend_on_cancelled(&transaction_id))
            },
            Err(e) => {
                warn!(tenant = %tenant_id, %transaction_id, expected, error = %e, "Amend rejected");
                return Err(e.into());
            },
        };

        let record = appended.record;
        info!(
            tenant = %tenant_id,
            %transaction_id,
            version = record.version,
            book = %record.asset_book_id,
            asset = %record.asset_id,
            quantity = %record.quantity,
            seq = appended.seq,
            "Transaction amended"
        );

        Ok(record)
    }

    /// Current version of a lineage: the live version, or the cancellation
    /// marker. Superseded versions are never returned.
    ///
    /// # Errors
    /// `NotFound` for an unknown lineage.
    pub async fn retrieve(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> LedgerResult<Transaction> {
        Ok(self.lineage(tenant_id, transaction_id).await?.current().clone())
    }

    /// Every version of a lineage, oldest first.
    ///
    /// # Errors
    /// `NotFound` for an unknown lineage.
    pub async fn history(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> LedgerResult<Vec<Transaction>> {
        Ok(self.lineage(tenant_id, transaction_id).await?.history())
    }

    /// Whether the lineage's audit hash chain is intact.
    ///
    /// # Errors
    /// `NotFound` for an unknown lineage.
    pub async fn verify(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> LedgerResult<bool> {
        Ok(self.lineage(tenant_id, transaction_id).await?.verify_chain())
    }

    async fn lineage(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> LedgerResult<Lineage> {
        self.store
            .find(tenant_id, transaction_id)
            .await?
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id.as_str()))
    }

    fn amend_on_cancelled(transaction_id: &TransactionId) -> LedgerError {
        LedgerError::InvalidState {
            transaction_id: transaction_id.to_string(),
            reason: "current version is cancelled".to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
