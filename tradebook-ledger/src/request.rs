//! Raw booking requests.
//!
//! Upstream callers submit loosely typed field maps. A request is parsed
//! into a `TransactionDraft` before it reaches the ledger, and every missing
//! or malformed field becomes a `Validation` error naming the field.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradebook_domain::{
    AssetId, BookId, Currency, Price, Quantity, TenantId, TransactionAction, TransactionDraft,
    TransactionId, TransferId,
};

use crate::error::{LedgerError, LedgerResult};

/// Booking or amendment fields as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub tenant_id: Option<u64>,
    pub transaction_id: Option<String>,
    pub action: Option<String>,
    pub asset_id: Option<String>,
    pub asset_book_id: Option<String>,
    pub counterparty_book_id: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub settlement_date: Option<NaiveDate>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub transfer_id: Option<String>,
}

fn required<T>(field: &'static str, value: Option<T>) -> LedgerResult<T> {
    value.ok_or_else(|| LedgerError::Validation(format!("missing required field: {field}")))
}

impl TransactionRequest {
    /// Parse into a typed draft.
    ///
    /// Price defaults to zero when absent (non-trade movements such as
    /// deliveries carry no price). Settlement date defaults to the
    /// transaction date.
    ///
    /// # Errors
    /// `LedgerError::Validation` for the first missing or malformed field.
    pub fn into_draft(self) -> LedgerResult<TransactionDraft> {
        let tenant_id = TenantId::new(required("tenant_id", self.tenant_id)?);
        let action: TransactionAction = required("action", self.action)?.parse()?;
        let asset_id = AssetId::new(required("asset_id", self.asset_id)?)?;
        let asset_book_id = BookId::new(required("asset_book_id", self.asset_book_id)?)?;
        let counterparty_book_id =
            BookId::new(required("counterparty_book_id", self.counterparty_book_id)?)?;
        let transaction_date = required("transaction_date", self.transaction_date)?;
        let settlement_date = self.settlement_date.unwrap_or(transaction_date);
        let quantity = Quantity::new(required("quantity", self.quantity)?)?;
        let price = match self.price {
            Some(price) => Price::new(price)?,
            None => Price::zero(),
        };
        let currency = Currency::new(&required("currency", self.currency)?)?;
        let transaction_id = self.transaction_id.map(TransactionId::new).transpose()?;

        let draft = TransactionDraft {
            tenant_id,
            transaction_id,
            action,
            asset_id,
            asset_book_id,
            counterparty_book_id,
            transaction_date,
            settlement_date,
            quantity,
            price,
            currency,
            transfer_id: self.transfer_id.map(TransferId::from_string),
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl TryFrom<TransactionRequest> for TransactionDraft {
    type Error = LedgerError;

    fn try_from(request: TransactionRequest) -> Result<Self, Self::Error> {
        request.into_draft()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> TransactionRequest {
        serde_json::from_value(serde_json::json!({
            "tenant_id": 1,
            "action": "Buy",
            "asset_id": "Z77.SI",
            "asset_book_id": "DEMO-BOOK",
            "counterparty_book_id": "BROKER",
            "transaction_date": "2024-03-04",
            "settlement_date": "2024-03-06",
            "quantity": "100",
            "price": "3.92",
            "currency": "SGD"
        }))
        .unwrap()
    }

    #[test]
    fn test_parses_full_request() {
        let draft = request().into_draft().unwrap();
        assert_eq!(draft.action, TransactionAction::Buy);
        assert_eq!(draft.quantity.as_decimal(), dec!(100));
        assert_eq!(draft.settlement_date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert!(draft.transaction_id.is_none());
    }

    #[test]
    fn test_missing_field_names_it() {
        let mut req = request();
        req.asset_book_id = None;
        match req.into_draft() {
            Err(LedgerError::Validation(msg)) => assert!(msg.contains("asset_book_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_price_and_settlement() {
        let mut req = request();
        req.price = None;
        req.settlement_date = None;
        let draft = TransactionDraft::try_from(req).unwrap();
        assert!(draft.price.as_decimal().is_zero());
        assert_eq!(draft.settlement_date, draft.transaction_date);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut req = request();
        req.quantity = Some(dec!(0));
        assert!(matches!(req.into_draft(), Err(LedgerError::Validation(_))));

        let mut req = request();
        req.action = Some("Short".into());
        assert!(matches!(req.into_draft(), Err(LedgerError::Validation(_))));

        let mut req = request();
        req.counterparty_book_id = Some("DEMO-BOOK".into());
        assert!(matches!(req.into_draft(), Err(LedgerError::Validation(_))));
    }
}
