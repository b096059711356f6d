//! Value Objects for the Tradebook Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of any book, asset, party or transaction identifier
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Identifier is empty, too long or contains whitespace/control characters
    #[error("Invalid identifier for {field}: {reason}")]
    InvalidIdentifier {
        /// Which field carried the identifier
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Price must be non-negative
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Currency must be an ISO-4217 style code
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Unknown transaction action name
    #[error("Unknown transaction action: {0}")]
    UnknownAction(String),

    /// Unknown accounting basis name
    #[error("Unknown accounting basis: {0}")]
    UnknownBasis(String),

    /// Transaction fields are inconsistent with each other
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Lineage append rejected: target version is not current
    #[error("Version conflict on {transaction_id}: expected {expected}, current {current}")]
    VersionConflict {
        /// Transaction whose lineage was targeted
        transaction_id: String,
        /// Version the caller believed was current
        expected: u32,
        /// Version that is actually current
        current: u32,
    },

    /// Lineage append rejected: lineage ends in a cancellation
    #[error("Transaction {0} is cancelled")]
    LineageCancelled(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

/// Validate the shape of an opaque identifier.
///
/// # Errors
/// Returns `DomainError::InvalidIdentifier` if the value is empty, longer than
/// [`MAX_IDENTIFIER_LEN`] or contains whitespace or control characters.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), DomainError> {
    let reject = |reason: &str| DomainError::InvalidIdentifier {
        field,
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(reject("must not be empty"));
    }
    if value.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(reject("longer than 64 characters"));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(reject("contains whitespace or control characters"));
    }
    Ok(())
}

// =============================================================================
// Tenant
// =============================================================================

/// Asset manager owning a ledger. All transaction ids are scoped to a tenant.
///
/// Tenant `0` is the shared scope used for publicly registered reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(u64);

impl TenantId {
    /// Shared reference-data scope
    pub const SHARED: TenantId = TenantId(0);

    /// Create a tenant id
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the shared reference-data scope
    pub fn is_shared(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Book holding asset positions
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookId(String);

impl BookId {
    /// Create a book id with shape validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdentifier` on malformed input
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier("book_id", &value)?;
        Ok(Self(value))
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Asset traded in a transaction
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    /// Create an asset id with shape validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdentifier` on malformed input
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier("asset_id", &value)?;
        Ok(Self(value))
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Party (legal entity) owning a book
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(String);

impl PartyId {
    /// Create a party id with shape validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdentifier` on malformed input
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier("party_id", &value)?;
        Ok(Self(value))
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction identifier, unique per tenant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create a transaction id with shape validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdentifier` on malformed input
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_identifier("transaction_id", &value)?;
        Ok(Self(value))
    }

    /// Generate a fresh, time-ordered id
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().simple().to_string())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive decimal magnitude.
///
/// The sign of a transaction's effect is carried by its action, never by
/// the stored quantity.
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity(format!(
                "Quantity must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Price
// =============================================================================

/// Price per unit of the traded asset
///
/// # Invariants
/// - Must be >= 0 (share creation is booked at zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value < 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < Decimal::ZERO {
            return Err(DomainError::InvalidPrice(format!(
                "Price must not be negative, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Zero price
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// Three-letter upper-case currency code (e.g. USD, JPY)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a currency code with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCurrency` unless the code is exactly three
    /// ASCII upper-case letters
    pub fn new(code: &str) -> Result<Self, DomainError> {
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::InvalidCurrency(format!(
                "Expected three upper-case letters, got '{}'",
                code
            )));
        }
        Ok(Self(code.to_string()))
    }

    /// Borrow the code
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Transaction Action
// =============================================================================

/// What a transaction does to the asset book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionAction {
    /// Purchase from a counterparty
    Buy,
    /// Sale to a counterparty
    Sell,
    /// Acquisition without a trade (e.g. share creation)
    Acquire,
    /// Delivery without a trade
    Deliver,
    /// Investor subscribes into a fund
    Subscription,
    /// Investor redeems out of a fund
    Redemption,
    /// Receiving leg of a book transfer
    TransferIn,
    /// Delivering leg of a book transfer
    TransferOut,
}

impl TransactionAction {
    /// Sign applied to the asset book: +1 increases, -1 decreases.
    ///
    /// The counterparty book always receives the opposite sign.
    pub fn asset_book_sign(&self) -> Decimal {
        match self {
            TransactionAction::Buy
            | TransactionAction::Acquire
            | TransactionAction::Subscription
            | TransactionAction::TransferIn => Decimal::ONE,
            TransactionAction::Sell
            | TransactionAction::Deliver
            | TransactionAction::Redemption
            | TransactionAction::TransferOut => Decimal::NEGATIVE_ONE,
        }
    }

    /// Whether the action increases the asset book
    pub fn increases_asset_book(&self) -> bool {
        self.asset_book_sign() > Decimal::ZERO
    }

    /// Display name used by upstream systems
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionAction::Buy => "Buy",
            TransactionAction::Sell => "Sell",
            TransactionAction::Acquire => "Acquire",
            TransactionAction::Deliver => "Deliver",
            TransactionAction::Subscription => "Subscription",
            TransactionAction::Redemption => "Redemption",
            TransactionAction::TransferIn => "Transfer In",
            TransactionAction::TransferOut => "Transfer Out",
        }
    }
}

impl FromStr for TransactionAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "buy" => Ok(TransactionAction::Buy),
            "sell" => Ok(TransactionAction::Sell),
            "acquire" => Ok(TransactionAction::Acquire),
            "deliver" => Ok(TransactionAction::Deliver),
            "subscription" => Ok(TransactionAction::Subscription),
            "redemption" => Ok(TransactionAction::Redemption),
            "transferin" => Ok(TransactionAction::TransferIn),
            "transferout" => Ok(TransactionAction::TransferOut),
            _ => Err(DomainError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Accounting Basis
// =============================================================================

/// Which date governs inclusion of a transaction in an as-of query
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AccountingBasis {
    /// Trade date accounting
    #[default]
    TransactionDate,
    /// Settlement date accounting
    SettlementDate,
}

impl AccountingBasis {
    /// Both bases, in reporting order
    pub const ALL: [AccountingBasis; 2] =
        [AccountingBasis::TransactionDate, AccountingBasis::SettlementDate];

    /// Display name used by upstream systems
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountingBasis::TransactionDate => "Transaction Date",
            AccountingBasis::SettlementDate => "Settlement Date",
        }
    }
}

impl FromStr for AccountingBasis {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "transactiondate" | "trade" | "tradedate" => Ok(AccountingBasis::TransactionDate),
            "settlementdate" | "settlement" => Ok(AccountingBasis::SettlementDate),
            _ => Err(DomainError::UnknownBasis(s.to_string())),
        }
    }
}

impl fmt::Display for AccountingBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
