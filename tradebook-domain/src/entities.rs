//! Domain Entities for Tradebook
//!
//! A transaction is stored as an immutable version record. Every amendment
//! or cancellation produces a new record; nothing is edited in place.

use crate::value_objects::{
    AccountingBasis, AssetId, BookId, Currency, DomainError, Price, Quantity, TenantId,
    TransactionAction, TransactionId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Position of a record within its lineage (0 = original booking)
pub type Version = u32;

// =============================================================================
// Transfer ID
// =============================================================================

/// Identifier shared by all legs of one book transfer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransferId(String);

impl TransferId {
    /// Generate a fresh, time-ordered transfer id
    pub fn generate() -> Self {
        Self(format!("TRF-{}", uuid::Uuid::now_v7().simple()))
    }

    /// Wrap an existing transfer id
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// Lifecycle status of a version record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Live version
    Confirmed,
    /// Terminal cancellation marker
    Cancelled,
    /// Replaced by a later amendment (reported in audit history only)
    Superseded,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Confirmed => write!(f, "Confirmed"),
            TransactionStatus::Cancelled => write!(f, "Cancelled"),
            TransactionStatus::Superseded => write!(f, "Superseded"),
        }
    }
}

// =============================================================================
// Transaction Draft
// =============================================================================

/// Caller-supplied fields of a booking or amendment.
///
/// Dates are independent: back-dated trades and forward settlement are both
/// legal, and no ordering between the two dates is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub tenant_id: TenantId,
    /// Assigned by the ledger when absent
    pub transaction_id: Option<TransactionId>,
    pub action: TransactionAction,
    pub asset_id: AssetId,
    pub asset_book_id: BookId,
    pub counterparty_book_id: BookId,
    pub transaction_date: NaiveDate,
    pub settlement_date: NaiveDate,
    pub quantity: Quantity,
    pub price: Price,
    pub currency: Currency,
    pub transfer_id: Option<TransferId>,
}

impl TransactionDraft {
    /// Check cross-field invariants.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidTransaction` if the asset book and the
    /// counterparty book are the same book.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.asset_book_id == self.counterparty_book_id {
            return Err(DomainError::InvalidTransaction(format!(
                "asset book and counterparty book are both {}",
                self.asset_book_id
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// One immutable version of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tenant_id: TenantId,
    pub transaction_id: TransactionId,
    pub version: Version,
    pub action: TransactionAction,
    pub asset_id: AssetId,
    pub asset_book_id: BookId,
    pub counterparty_book_id: BookId,
    pub transaction_date: NaiveDate,
    pub settlement_date: NaiveDate,
    pub quantity: Quantity,
    pub price: Price,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub transfer_id: Option<TransferId>,
    pub created_at: DateTime<Utc>,

    // Audit chain
    pub prev_hash: Option<String>,
    pub hash: String,
}

impl Transaction {
    /// Materialise a draft as a version record and seal it into the hash chain.
    pub fn from_draft(
        draft: TransactionDraft,
        transaction_id: TransactionId,
        version: Version,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
        prev_hash: Option<String>,
    ) -> Self {
        let mut record = Self {
            tenant_id: draft.tenant_id,
            transaction_id,
            version,
            action: draft.action,
            asset_id: draft.asset_id,
            asset_book_id: draft.asset_book_id,
            counterparty_book_id: draft.counterparty_book_id,
            transaction_date: draft.transaction_date,
            settlement_date: draft.settlement_date,
            quantity: draft.quantity,
            price: draft.price,
            currency: draft.currency,
            status,
            transfer_id: draft.transfer_id,
            created_at,
            prev_hash,
            hash: String::new(),
        };
        record.hash = record.compute_hash();
        record
    }

    /// Editable copy of this version's fields, used to build an amendment
    pub fn to_draft(&self) -> TransactionDraft {
        TransactionDraft {
            tenant_id: self.tenant_id,
            transaction_id: Some(self.transaction_id.clone()),
            action: self.action,
            asset_id: self.asset_id.clone(),
            asset_book_id: self.asset_book_id.clone(),
            counterparty_book_id: self.counterparty_book_id.clone(),
            transaction_date: self.transaction_date,
            settlement_date: self.settlement_date,
            quantity: self.quantity,
            price: self.price,
            currency: self.currency.clone(),
            transfer_id: self.transfer_id.clone(),
        }
    }

    /// Date governing inclusion under the given basis
    pub fn basis_date(&self, basis: AccountingBasis) -> NaiveDate {
        match basis {
            AccountingBasis::TransactionDate => self.transaction_date,
            AccountingBasis::SettlementDate => self.settlement_date,
        }
    }

    /// Whether this is a cancellation marker
    pub fn is_cancelled(&self) -> bool {
        self.status == TransactionStatus::Cancelled
    }

    /// Signed effect on each book: the asset book gets the action's sign,
    /// the counterparty book the opposite.
    pub fn contributions(&self) -> [(&BookId, Decimal); 2] {
        let signed = self.action.asset_book_sign() * self.quantity.as_decimal();
        [(&self.asset_book_id, signed), (&self.counterparty_book_id, -signed)]
    }

    /// Signed effect on one book (zero when the book is not a party to it)
    pub fn signed_quantity_for(&self, book_id: &BookId) -> Decimal {
        self.contributions()
            .iter()
            .filter(|(book, _)| *book == book_id)
            .map(|(_, qty)| *qty)
            .sum()
    }

    /// SHA-256 over a fixed rendering of every business field plus the
    /// predecessor hash.
    pub fn compute_hash(&self) -> String {
        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.tenant_id,
            self.transaction_id,
            self.version,
            self.action.as_str(),
            self.asset_id,
            self.asset_book_id,
            self.counterparty_book_id,
            self.transaction_date,
            self.settlement_date,
            self.quantity.as_decimal().normalize(),
            self.price.as_decimal().normalize(),
            self.currency,
            self.status,
            self.transfer_id.as_ref().map(TransferId::as_str).unwrap_or(""),
            self.created_at.to_rfc3339(),
        );

        let mut hasher = Sha256::new();
        if let Some(prev) = &self.prev_hash {
            hasher.update(prev.as_bytes());
        }
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(action: TransactionAction, qty: Decimal) -> TransactionDraft {
        TransactionDraft {
            tenant_id: TenantId::new(7),
            transaction_id: None,
            action,
            asset_id: AssetId::new("Z77.SI").unwrap(),
            asset_book_id: BookId::new("DEMO-BOOK").unwrap(),
            counterparty_book_id: BookId::new("BROKER").unwrap(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            settlement_date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
            quantity: Quantity::new(qty).unwrap(),
            price: Price::new(dec!(3.92)).unwrap(),
            currency: Currency::new("SGD").unwrap(),
            transfer_id: None,
        }
    }

    fn record(action: TransactionAction, qty: Decimal) -> Transaction {
        Transaction::from_draft(
            draft(action, qty),
            TransactionId::new("T1").unwrap(),
            0,
            TransactionStatus::Confirmed,
            Utc::now(),
            None,
        )
    }

    #[test]
    fn test_buy_contributions_are_balanced() {
        let tx = record(TransactionAction::Buy, dec!(100));
        let [(asset_book, a), (cpty_book, c)] = tx.contributions();

        assert_eq!(asset_book.as_str(), "DEMO-BOOK");
        assert_eq!(a, dec!(100));
        assert_eq!(cpty_book.as_str(), "BROKER");
        assert_eq!(c, dec!(-100));
        assert_eq!(a + c, Decimal::ZERO);
    }

    #[test]
    fn test_sell_reverses_sign() {
        let tx = record(TransactionAction::Sell, dec!(50));
        assert_eq!(tx.signed_quantity_for(&BookId::new("DEMO-BOOK").unwrap()), dec!(-50));
        assert_eq!(tx.signed_quantity_for(&BookId::new("BROKER").unwrap()), dec!(50));
        assert_eq!(tx.signed_quantity_for(&BookId::new("OTHER").unwrap()), dec!(0));
    }

    #[test]
    fn test_basis_date_selection() {
        let tx = record(TransactionAction::Buy, dec!(1));
        assert_eq!(
            tx.basis_date(AccountingBasis::TransactionDate),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
        );
        assert_eq!(
            tx.basis_date(AccountingBasis::SettlementDate),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()
        );
    }

    #[test]
    fn test_draft_rejects_same_book_on_both_sides() {
        let mut d = draft(TransactionAction::Buy, dec!(1));
        d.counterparty_book_id = d.asset_book_id.clone();
        assert!(matches!(d.validate(), Err(DomainError::InvalidTransaction(_))));
    }

    #[test]
    fn test_hash_covers_business_fields() {
        let tx = record(TransactionAction::Buy, dec!(100));
        assert_eq!(tx.hash, tx.compute_hash());

        let mut tampered = tx.clone();
        tampered.quantity = Quantity::new(dec!(101)).unwrap();
        assert_ne!(tampered.compute_hash(), tx.hash);
    }

    #[test]
    fn test_to_draft_round_trips_fields() {
        let tx = record(TransactionAction::Subscription, dec!(10));
        let d = tx.to_draft();
        assert_eq!(d.transaction_id.as_ref(), Some(&tx.transaction_id));
        assert_eq!(d.action, TransactionAction::Subscription);
        assert_eq!(d.quantity, tx.quantity);
    }
}
