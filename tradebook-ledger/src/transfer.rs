//! Book Transfer Orchestrator.
//!
//! A book transfer moves a quantity of one asset between two books of the
//! same tenant through a wash book. It is booked as two ledger entries that
//! share a transfer id and identical dates:
//!
//! ```text
//! leg OUT: Transfer Out  source ← wash   (source -Q, wash +Q)
//! leg IN:  Transfer In   target ← wash   (target +Q, wash -Q)
//! ```
//!
//! The wash book nets to zero. The legs are written one after the other
//! with no cross-book lock; if the second leg fails the first is cancelled
//! before the error is returned. The saga below tracks that sequence.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

use tradebook_domain::{
    AssetId, BookId, Currency, DomainError, Price, Quantity, TenantId, Transaction,
    TransactionAction, TransactionDraft, TransactionId, TransferId,
};
use tradebook_store::LineageRepository;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::reference::{resolve, ReferenceKind, ReferenceResolver};

// =============================================================================
// Transfer Request
// =============================================================================

/// Parameters of one book transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub tenant_id: TenantId,
    pub source_book_id: BookId,
    pub target_book_id: BookId,
    pub wash_book_id: BookId,
    pub asset_id: AssetId,
    pub quantity: Quantity,
    pub price: Price,
    pub currency: Currency,
    /// Transaction and settlement date of both legs (today when absent)
    pub date: Option<NaiveDate>,
    /// Caller-chosen transfer id (generated when absent)
    pub transfer_id: Option<TransferId>,
}

impl TransferRequest {
    fn validate(&self) -> LedgerResult<()> {
        if self.source_book_id == self.target_book_id {
            return Err(LedgerError::Validation(format!(
                "transfer source and target are both {}",
                self.source_book_id
            )));
        }
        if self.wash_book_id == self.source_book_id || self.wash_book_id == self.target_book_id {
            return Err(LedgerError::Validation(format!(
                "wash book {} must differ from source and target",
                self.wash_book_id
            )));
        }
        Ok(())
    }

    fn leg(
        &self,
        transfer_id: &TransferId,
        action: TransactionAction,
        book_id: &BookId,
        suffix: &str,
        date: NaiveDate,
    ) -> LedgerResult<TransactionDraft> {
        Ok(TransactionDraft {
            tenant_id: self.tenant_id,
            transaction_id: Some(TransactionId::new(format!("{transfer_id}-{suffix}"))?),
            action,
            asset_id: self.asset_id.clone(),
            asset_book_id: book_id.clone(),
            counterparty_book_id: self.wash_book_id.clone(),
            transaction_date: date,
            settlement_date: date,
            quantity: self.quantity,
            price: self.price,
            currency: self.currency.clone(),
            transfer_id: Some(transfer_id.clone()),
        })
    }
}

// =============================================================================
// Transfer Saga
// =============================================================================

/// Progress of a book transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    /// Nothing written
    NotStarted,
    /// OUT leg written, IN leg pending
    Leg1Booked,
    /// Both legs written (success)
    BothBooked,
    /// IN leg failed and the OUT leg was cancelled
    CompensatedCancel,
    /// Nothing left booked (OUT leg rejected) or compensation failed
    Failed,
}

impl TransferState {
    /// Whether the saga has finished
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::BothBooked | TransferState::CompensatedCancel | TransferState::Failed
        )
    }

    fn can_transition_to(&self, next: TransferState) -> bool {
        matches!(
            (self, next),
            (TransferState::NotStarted, TransferState::Leg1Booked)
                | (TransferState::NotStarted, TransferState::Failed)
                | (TransferState::Leg1Booked, TransferState::BothBooked)
                | (TransferState::Leg1Booked, TransferState::CompensatedCancel)
                | (TransferState::Leg1Booked, TransferState::Failed)
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferState::NotStarted => "not_started",
            TransferState::Leg1Booked => "leg1_booked",
            TransferState::BothBooked => "both_booked",
            TransferState::CompensatedCancel => "compensated_cancel",
            TransferState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State tracker for one transfer
#[derive(Debug, Clone)]
pub struct TransferSaga {
    transfer_id: TransferId,
    state: TransferState,
    transitions: Vec<TransferState>,
}

impl TransferSaga {
    /// Start tracking a transfer
    pub fn new(transfer_id: TransferId) -> Self {
        Self {
            transfer_id,
            state: TransferState::NotStarted,
            transitions: vec![TransferState::NotStarted],
        }
    }

    pub fn transfer_id(&self) -> &TransferId {
        &self.transfer_id
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Every state visited, in order
    pub fn transitions(&self) -> &[TransferState] {
        &self.transitions
    }

    /// Move to `next`.
    ///
    /// # Errors
    /// `InvalidStateTransition` for a move the saga does not allow.
    pub fn advance(&mut self, next: TransferState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition(format!(
                "transfer {}: {} -> {}",
                self.transfer_id, self.state, next
            )));
        }
        self.state = next;
        self.transitions.push(next);
        Ok(())
    }
}

/// Outcome of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: TransferId,
    pub state: TransferState,
    /// Leg debiting the source book
    pub out_leg: Transaction,
    /// Leg crediting the target book
    pub in_leg: Transaction,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Books transfers through the ledger as compensated two-leg sagas.
pub struct TransferOrchestrator<S: LineageRepository, R: ReferenceResolver> {
    ledger: Ledger<S, R>,
}

impl<S: LineageRepository, R: ReferenceResolver> TransferOrchestrator<S, R> {
    /// Create an orchestrator writing through `ledger`.
    pub fn new(ledger: Ledger<S, R>) -> Self {
        Self { ledger }
    }

    /// Book both legs of a transfer.
    ///
    /// # Errors
    /// - `Validation` when books coincide or a reference is unknown (nothing booked)
    /// - any error of the OUT leg (nothing booked)
    /// - the IN leg's error, after the OUT leg was cancelled
    /// - `PartialFailure` if the IN leg failed and cancelling the OUT leg failed too
    pub async fn book_transfer(&self, request: TransferRequest) -> LedgerResult<TransferReceipt> {
        request.validate()?;
        let tenant_id = request.tenant_id;
        let references = self.ledger.references().as_ref();
        for book in [&request.source_book_id, &request.target_book_id, &request.wash_book_id] {
            resolve(references, tenant_id, ReferenceKind::Book, book.as_str()).await?;
        }

        let transfer_id = request.transfer_id.clone().unwrap_or_else(TransferId::generate);
        let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
        let out_draft = request.leg(
            &transfer_id,
            TransactionAction::TransferOut,
            &request.source_book_id,
            "OUT",
            date,
        )?;
        let in_draft = request.leg(
            &transfer_id,
            TransactionAction::TransferIn,
            &request.target_book_id,
            "IN",
            date,
        )?;

        let mut saga = TransferSaga::new(transfer_id.clone());
        info!(
            tenant = %tenant_id,
            %transfer_id,
            source = %request.source_book_id,
            target = %request.target_book_id,
            wash = %request.wash_book_id,
            asset = %request.asset_id,
            quantity = %request.quantity,
            %date,
            "Book transfer started"
        );

        let out_leg = match self.ledger.book(out_draft).await {
            Ok(leg) => leg,
            Err(e) => {
                saga.advance(TransferState::Failed)?;
                warn!(%transfer_id, error = %e, "Transfer OUT leg rejected, nothing booked");
                return Err(e);
            },
        };
        saga.advance(TransferState::Leg1Booked)?;

        let leg_error = match self.ledger.book(in_draft).await {
            Ok(in_leg) => {
                saga.advance(TransferState::BothBooked)?;
                info!(
                    tenant = %tenant_id,
                    %transfer_id,
                    out_leg = %out_leg.transaction_id,
                    in_leg = %in_leg.transaction_id,
                    "Book transfer completed"
                );
                return Ok(TransferReceipt {
                    transfer_id,
                    state: saga.state(),
                    out_leg,
                    in_leg,
                });
            },
            Err(e) => e,
        };

        warn!(
            %transfer_id,
            out_leg = %out_leg.transaction_id,
            error = %leg_error,
            "Transfer IN leg failed, cancelling OUT leg"
        );

        match self.ledger.cancel(tenant_id, &out_leg.transaction_id).await {
            Ok(_) => {
                saga.advance(TransferState::CompensatedCancel)?;
                warn!(%transfer_id, state = %saga.state(), "Transfer compensated");
                Err(leg_error)
            },
            Err(compensation_error) => {
                saga.advance(TransferState::Failed)?;
                error!(
                    %transfer_id,
                    out_leg = %out_leg.transaction_id,
                    leg_error = %leg_error,
                    compensation_error = %compensation_error,
                    "Transfer compensation failed, OUT leg remains booked"
                );
                Err(LedgerError::PartialFailure {
                    transfer_id: transfer_id.to_string(),
                    booked_leg: out_leg.transaction_id.to_string(),
                    leg_error: leg_error.to_string(),
                    compensation_error: compensation_error.to_string(),
                })
            },
        }
    }

    /// Current versions of a transfer's legs, OUT leg first.
    ///
    /// # Errors
    /// `NotFound` if no leg carries the transfer id.
    pub async fn transfer_legs(
        &self,
        tenant_id: TenantId,
        transfer_id: &TransferId,
    ) -> LedgerResult<Vec<Transaction>> {
        let lineages = self.ledger.store().find_by_transfer(tenant_id, transfer_id).await?;
        if lineages.is_empty() {
            return Err(LedgerError::NotFound {
                entity: "transfer",
                id: transfer_id.to_string(),
            });
        }

        let mut legs: Vec<Transaction> = lineages.iter().map(|l| l.current().clone()).collect();
        legs.sort_by_key(|leg| (leg.action.increases_asset_book(), leg.transaction_id.clone()));
        Ok(legs)
    }
}

// =============================================================================
// Tests
// =============================================================================
