//! Fixture builders for ledger-backed tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use tradebook_domain::{
    AssetId, BookId, Currency, Position, Price, Quantity, TenantId, TransactionAction,
    TransactionDraft, TransactionId,
};
use tradebook_ledger::{AcceptAllReferences, Ledger, ReferenceDirectory};
use tradebook_store::MemoryStore;

/// Ledger over a fresh in-memory store that accepts every well-formed reference
pub type TestLedger = Ledger<MemoryStore, AcceptAllReferences>;

/// Default test tenant (asset manager 1)
pub fn tenant() -> TenantId {
    TenantId::new(1)
}

/// Calendar date shorthand. Panics on an impossible date.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

pub fn book(id: &str) -> BookId {
    BookId::new(id).expect("valid fixture book id")
}

pub fn asset(id: &str) -> AssetId {
    AssetId::new(id).expect("valid fixture asset id")
}

pub fn txn_id(id: &str) -> TransactionId {
    TransactionId::new(id).expect("valid fixture transaction id")
}

/// Fresh store plus a ledger writing to it
pub fn test_ledger() -> (Arc<MemoryStore>, TestLedger) {
    let store = Arc::new(MemoryStore::new());
    let ledger = Ledger::new(store.clone(), Arc::new(AcceptAllReferences));
    (store, ledger)
}

/// Directory with the given books registered for `tenant_id` and the given
/// assets registered in the shared scope
pub async fn seed_directory(
    tenant_id: TenantId,
    books: &[&str],
    assets: &[&str],
) -> Arc<ReferenceDirectory> {
    let directory = Arc::new(ReferenceDirectory::new());
    for id in books {
        directory.register_book(tenant_id, &book(id)).await;
    }
    for id in assets {
        directory.register_asset(TenantId::SHARED, &asset(id)).await;
    }
    directory
}

/// Net quantity for (book, asset) in a result set; an absent group is zero
pub fn quantity_of(positions: &[Position], book_id: &str, asset_id: &str) -> Decimal {
    positions
        .iter()
        .filter(|p| p.book_id.as_str() == book_id && p.asset_id.as_str() == asset_id)
        .map(|p| p.quantity)
        .sum()
}

// =============================================================================
// Transaction builder
// =============================================================================

/// Fluent builder for `TransactionDraft`.
///
/// Defaults: tenant 1, asset X, BOOK1 against BROKER1, dated and settling
/// 2024-01-02, price 1 USD, no id.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    draft: TransactionDraft,
}

impl TransactionBuilder {
    pub fn new(action: TransactionAction, quantity: Decimal) -> Self {
        let day = date(2024, 1, 2);
        Self {
            draft: TransactionDraft {
                tenant_id: tenant(),
                transaction_id: None,
                action,
                asset_id: asset("X"),
                asset_book_id: book("BOOK1"),
                counterparty_book_id: book("BROKER1"),
                transaction_date: day,
                settlement_date: day,
                quantity: Quantity::new(quantity).expect("positive fixture quantity"),
                price: Price::new(Decimal::ONE).expect("valid fixture price"),
                currency: Currency::new("USD").expect("valid fixture currency"),
                transfer_id: None,
            },
        }
    }

    pub fn buy(quantity: Decimal) -> Self {
        Self::new(TransactionAction::Buy, quantity)
    }

    pub fn sell(quantity: Decimal) -> Self {
        Self::new(TransactionAction::Sell, quantity)
    }

    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.draft.tenant_id = tenant_id;
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.draft.transaction_id = Some(txn_id(id));
        self
    }

    pub fn asset(mut self, id: &str) -> Self {
        self.draft.asset_id = asset(id);
        self
    }

    pub fn book(mut self, id: &str) -> Self {
        self.draft.asset_book_id = book(id);
        self
    }

    pub fn counterparty(mut self, id: &str) -> Self {
        self.draft.counterparty_book_id = book(id);
        self
    }

    /// Set both dates
    pub fn on(mut self, day: NaiveDate) -> Self {
        self.draft.transaction_date = day;
        self.draft.settlement_date = day;
        self
    }

    pub fn traded(mut self, day: NaiveDate) -> Self {
        self.draft.transaction_date = day;
        self
    }

    pub fn settles(mut self, day: NaiveDate) -> Self {
        self.draft.settlement_date = day;
        self
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.draft.price = Price::new(price).expect("valid fixture price");
        self
    }

    pub fn currency(mut self, code: &str) -> Self {
        self.draft.currency = Currency::new(code).expect("valid fixture currency");
        self
    }

    pub fn build(self) -> TransactionDraft {
        self.draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builder_defaults_validate() {
        let draft = TransactionBuilder::buy(dec!(100)).id("T1").build();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.asset_book_id.as_str(), "BOOK1");
        assert_eq!(draft.transaction_id, Some(txn_id("T1")));
    }

    #[tokio::test]
    async fn test_ledger_fixture_books() {
        let (store, ledger) = test_ledger();
        ledger.book(TransactionBuilder::sell(dec!(5)).build()).await.unwrap();
        assert_eq!(store.lineage_count().await, 1);
    }
}
