//! Transaction service: the request/response surface over the ledger,
//! the transfer orchestrator and the position aggregator.
//!
//! Transport is out of scope; this facade is what a transport would call.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::info;

use tradebook_domain::{
    AccountingBasis, Position, TenantId, Transaction, TransactionDraft, TransactionId, TransferId,
    Version,
};
use tradebook_ledger::{
    Ledger, ReferenceDirectory, TransactionRequest, TransferOrchestrator, TransferRequest,
};
use tradebook_positions::{PositionAggregator, PositionFilter, PositionQuery, PositionSet};
use tradebook_store::{LineageRepository, MemoryStore};

use crate::config::Config;
use crate::error::ServiceResult;

/// Booking and position queries for every tenant of one ledger.
pub struct TransactionService<S: LineageRepository = MemoryStore> {
    ledger: Ledger<S, ReferenceDirectory>,
    transfers: TransferOrchestrator<S, ReferenceDirectory>,
    positions: PositionAggregator<S>,
    default_basis: AccountingBasis,
}

impl TransactionService<MemoryStore> {
    /// Service over a fresh in-memory store, configured from `config`.
    pub fn in_memory(config: &Config) -> Self {
        let references = if config.strict_references {
            ReferenceDirectory::new()
        } else {
            ReferenceDirectory::permissive()
        };
        Self::new(Arc::new(MemoryStore::new()), Arc::new(references), config.default_basis)
    }
}

impl<S: LineageRepository> TransactionService<S> {
    pub fn new(
        store: Arc<S>,
        references: Arc<ReferenceDirectory>,
        default_basis: AccountingBasis,
    ) -> Self {
        let ledger = Ledger::new(store.clone(), references);
        Self {
            transfers: TransferOrchestrator::new(ledger.clone()),
            positions: PositionAggregator::new(store),
            ledger,
            default_basis,
        }
    }

    /// Reference data consulted on writes
    pub fn references(&self) -> &ReferenceDirectory {
        self.ledger.references()
    }

    pub fn positions(&self) -> &PositionAggregator<S> {
        &self.positions
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Book a transaction; returns its id.
    pub async fn book(&self, draft: TransactionDraft) -> ServiceResult<TransactionId> {
        Ok(self.ledger.book(draft).await?.transaction_id)
    }

    /// Parse and book a raw request; returns the new id.
    pub async fn book_request(&self, request: TransactionRequest) -> ServiceResult<TransactionId> {
        self.book(request.into_draft()?).await
    }

    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> ServiceResult<()> {
        self.ledger.cancel(tenant_id, transaction_id).await?;
        Ok(())
    }

    /// Amend from an edited copy of a retrieved transaction. The copy's
    /// version is the one being superseded; returns the new version number.
    pub async fn amend(&self, edited: &Transaction) -> ServiceResult<Version> {
        let record = self.ledger.amend(edited.to_draft(), edited.version).await?;
        Ok(record.version)
    }

    pub async fn retrieve(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> ServiceResult<Transaction> {
        Ok(self.ledger.retrieve(tenant_id, transaction_id).await?)
    }

    /// Audit trail of a lineage, oldest first
    pub async fn history(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> ServiceResult<Vec<Transaction>> {
        Ok(self.ledger.history(tenant_id, transaction_id).await?)
    }

    /// Whether a lineage's audit hash chain is intact
    pub async fn verify(
        &self,
        tenant_id: TenantId,
        transaction_id: &TransactionId,
    ) -> ServiceResult<bool> {
        Ok(self.ledger.verify(tenant_id, transaction_id).await?)
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Book both legs of a transfer; returns the transfer id.
    pub async fn book_transfer(&self, request: TransferRequest) -> ServiceResult<TransferId> {
        Ok(self.transfers.book_transfer(request).await?.transfer_id)
    }

    pub async fn transfer_legs(
        &self,
        tenant_id: TenantId,
        transfer_id: &TransferId,
    ) -> ServiceResult<Vec<Transaction>> {
        Ok(self.transfers.transfer_legs(tenant_id, transfer_id).await?)
    }

    // =========================================================================
    // Positions
    // =========================================================================

    /// Positions of every book. `as_of` defaults to today, `basis` to the
    /// configured default.
    pub async fn positions_by_asset_manager(
        &self,
        tenant_id: TenantId,
        as_of: Option<NaiveDate>,
        basis: Option<AccountingBasis>,
    ) -> ServiceResult<Vec<Position>> {
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let basis = basis.unwrap_or(self.default_basis);
        Ok(self.positions.positions_by_asset_manager(tenant_id, as_of, basis).await?)
    }

    /// One result set per requested basis
    pub async fn position_search(&self, query: &PositionQuery) -> ServiceResult<Vec<PositionSet>> {
        Ok(self.positions.position_search(query).await?)
    }

    /// One result set per date, each resolved on its own
    pub async fn position_history(
        &self,
        tenant_id: TenantId,
        basis: AccountingBasis,
        dates: &[NaiveDate],
        filter: &PositionFilter,
    ) -> ServiceResult<Vec<PositionSet>> {
        Ok(self.positions.position_history(tenant_id, basis, dates, filter).await?)
    }

    /// Log a result set, one line per position, rounded for display
    pub fn log_positions(&self, heading: &str, positions: &[Position], display_scale: u32) {
        info!("--- {} ---", heading);
        for position in positions {
            info!(
                book = %position.book_id,
                asset = %position.asset_id,
                quantity = %position.display_quantity(display_scale),
                basis = %position.basis,
                as_of = %position.as_of,
                "{} | {} | {}",
                position.book_id,
                position.display_quantity(display_scale),
                position.asset_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use rust_decimal_macros::dec;
    use tradebook_ledger::LedgerError;
    use tradebook_testkit::{asset, book, date, tenant, TransactionBuilder};

    #[tokio::test]
    async fn test_strict_service_requires_registration() {
        let service = TransactionService::in_memory(&Config::default());
        let draft = TransactionBuilder::buy(dec!(1)).build();

        let err = service.book(draft.clone()).await.unwrap_err();
        assert_eq!(err.kind(), "ValidationError");

        service.references().register_book(tenant(), &book("BOOK1")).await;
        service.references().register_book(tenant(), &book("BROKER1")).await;
        service.references().register_asset(TenantId::SHARED, &asset("X")).await;
        assert!(service.book(draft).await.is_ok());
    }

    #[tokio::test]
    async fn test_amend_uses_edited_version() {
        let service = TransactionService::in_memory(&Config::test());
        let id = service.book(TransactionBuilder::buy(dec!(50)).build()).await.unwrap();

        let mut edited = service.retrieve(tenant(), &id).await.unwrap();
        edited.quantity = tradebook_domain::Quantity::new(dec!(10)).unwrap();
        assert_eq!(service.amend(&edited).await.unwrap(), 1);

        // Re-submitting the same stale copy conflicts
        let err = service.amend(&edited).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(matches!(err, ServiceError::Ledger(LedgerError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_default_basis_applies() {
        let config = Config {
            default_basis: AccountingBasis::SettlementDate,
            ..Config::test()
        };
        let service = TransactionService::in_memory(&config);
        service
            .book(
                TransactionBuilder::buy(dec!(5))
                    .traded(date(2024, 1, 2))
                    .settles(date(2024, 1, 4))
                    .build(),
            )
            .await
            .unwrap();

        let positions = service
            .positions_by_asset_manager(tenant(), Some(date(2024, 1, 3)), None)
            .await
            .unwrap();
        assert!(positions.is_empty());
    }
}
