//! Accounting View Resolver.
//!
//! Maps (basis, as-of date) to the set of ledger versions effective at that
//! date. The view is recomputed from full lineage state on every call, so a
//! back-dated booking is visible as soon as it is written.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::debug;

use tradebook_domain::{AccountingBasis, Lineage, TenantId, Transaction};
use tradebook_store::LineageRepository;

use crate::error::Result;
use crate::search::PositionFilter;

/// Which versions count for one (basis, as-of date)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingView {
    pub basis: AccountingBasis,
    pub as_of: NaiveDate,
    /// Knowledge time; `None` means the ledger's current state
    pub known_at: Option<DateTime<Utc>>,
    pub filter: PositionFilter,
}

impl AccountingView {
    pub fn new(basis: AccountingBasis, as_of: NaiveDate) -> Self {
        Self {
            basis,
            as_of,
            known_at: None,
            filter: PositionFilter::all(),
        }
    }

    pub fn with_filter(mut self, filter: PositionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_known_at(mut self, known_at: Option<DateTime<Utc>>) -> Self {
        self.known_at = known_at;
        self
    }

    /// The version of `lineage` that counts in this view, if any.
    ///
    /// Cancelled and superseded versions never count.
    pub fn effective_version<'l>(&self, lineage: &'l Lineage) -> Option<&'l Transaction> {
        let active = match self.known_at {
            Some(known_at) => lineage.active_at(known_at),
            None => lineage.active(),
        }?;
        self.includes(active).then_some(active)
    }

    /// Basis date on or before as-of, asset selected, and at least one of
    /// its two books selected
    pub fn includes(&self, version: &Transaction) -> bool {
        version.basis_date(self.basis) <= self.as_of
            && self.filter.matches_asset(&version.asset_id)
            && (self.filter.matches_book(&version.asset_book_id)
                || self.filter.matches_book(&version.counterparty_book_id))
    }

    /// Effective versions across `lineages`, one per lineage at most
    pub fn effective<'l>(&self, lineages: &'l [Lineage]) -> Vec<&'l Transaction> {
        lineages.iter().filter_map(|l| self.effective_version(l)).collect()
    }
}

/// Resolves views against the store
pub struct ViewResolver<S: LineageRepository> {
    store: Arc<S>,
}

impl<S: LineageRepository> ViewResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Effective versions of a tenant's ledger under `view`
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        view: &AccountingView,
    ) -> Result<Vec<Transaction>> {
        let lineages = self.store.find_by_tenant(tenant_id).await?;
        let versions: Vec<Transaction> = view.effective(&lineages).into_iter().cloned().collect();

        debug!(
            tenant = %tenant_id,
            basis = %view.basis,
            as_of = %view.as_of,
            lineages = lineages.len(),
            effective = versions.len(),
            "View resolved"
        );
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tradebook_domain::TransactionStatus;
    use tradebook_testkit::{book, date, tenant, test_ledger, txn_id, TransactionBuilder};

    #[tokio::test]
    async fn test_back_dated_booking_visible_immediately() {
        let (store, ledger) = test_ledger();
        ledger
            .book(TransactionBuilder::buy(dec!(100)).id("T1").on(date(2024, 1, 2)).build())
            .await
            .unwrap();
        ledger
            .book(TransactionBuilder::buy(dec!(150)).id("T2").on(date(2024, 1, 1)).build())
            .await
            .unwrap();

        let resolver = ViewResolver::new(store);
        let day_before = AccountingView::new(AccountingBasis::TransactionDate, date(2024, 1, 1));
        let versions = resolver.resolve(tenant(), &day_before).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].transaction_id, txn_id("T2"));

        let earlier = AccountingView::new(AccountingBasis::TransactionDate, date(2023, 12, 31));
        assert!(resolver.resolve(tenant(), &earlier).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_basis_selects_date() {
        let (store, ledger) = test_ledger();
        ledger
            .book(
                TransactionBuilder::buy(dec!(10))
                    .traded(date(2024, 1, 2))
                    .settles(date(2024, 1, 5))
                    .build(),
            )
            .await
            .unwrap();
        let resolver = ViewResolver::new(store);

        let trade = AccountingView::new(AccountingBasis::TransactionDate, date(2024, 1, 3));
        let settle = AccountingView::new(AccountingBasis::SettlementDate, date(2024, 1, 3));
        assert_eq!(resolver.resolve(tenant(), &trade).await.unwrap().len(), 1);
        assert!(resolver.resolve(tenant(), &settle).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_and_superseded_excluded() {
        let (store, ledger) = test_ledger();
        ledger.book(TransactionBuilder::buy(dec!(50)).id("T1").build()).await.unwrap();
        ledger.book(TransactionBuilder::buy(dec!(70)).id("T2").build()).await.unwrap();
        ledger.amend(TransactionBuilder::buy(dec!(10)).id("T1").build(), 0).await.unwrap();
        ledger.cancel(tenant(), &txn_id("T2")).await.unwrap();

        let resolver = ViewResolver::new(store);
        let view = AccountingView::new(AccountingBasis::TransactionDate, date(2024, 1, 2));
        let versions = resolver.resolve(tenant(), &view).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[0].quantity.as_decimal(), dec!(10));
    }

    fn record(id: &str, created_at: DateTime<Utc>) -> Transaction {
        Transaction::from_draft(
            TransactionBuilder::buy(dec!(50)).id(id).build(),
            txn_id(id),
            0,
            TransactionStatus::Confirmed,
            created_at,
            None,
        )
    }

    #[test]
    fn test_known_at_reconstructs_earlier_belief() {
        let booked_at = Utc::now() - Duration::hours(2);
        let mut lineage = Lineage::open(record("T1", booked_at)).unwrap();
        let amendment = TransactionBuilder::buy(dec!(10)).id("T1").build();
        lineage.amend(0, amendment, booked_at + Duration::hours(1)).unwrap();
        lineage.cancel(booked_at + Duration::hours(2)).unwrap();
        let lineages = [lineage];

        let view = AccountingView::new(AccountingBasis::TransactionDate, date(2024, 1, 2));
        assert!(view.effective(&lineages).is_empty());

        let before = view.clone().with_known_at(Some(booked_at - Duration::seconds(1)));
        assert!(before.effective(&lineages).is_empty());

        let original = view.clone().with_known_at(Some(booked_at + Duration::minutes(30)));
        assert_eq!(original.effective(&lineages)[0].version, 0);

        let amended = view.with_known_at(Some(booked_at + Duration::minutes(90)));
        let versions = amended.effective(&lineages);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[0].quantity.as_decimal(), dec!(10));
    }

    #[test]
    fn test_book_filter_matches_either_side() {
        let view = AccountingView::new(AccountingBasis::TransactionDate, date(2024, 1, 2))
            .with_filter(PositionFilter::all().with_books([book("BROKER1")]));
        let record = record("T1", Utc::now());
        assert!(view.includes(&record));

        let other = view.with_filter(PositionFilter::all().with_books([book("BOOK9")]));
        assert!(!other.includes(&record));
    }
}
