//! Transaction Lineage
//!
//! The ordered, append-only version history of one transaction id.
//!
//! ```text
//! v0 Confirmed ─▶ v1 Confirmed (amend) ─▶ v2 Cancelled (terminal)
//! ```
//!
//! The current version is always the newest record. The version that
//! contributes to positions ("active") is the newest record unless that
//! record is a cancellation, in which case nothing is active.

use crate::entities::{Transaction, TransactionDraft, TransactionStatus, Version};
use crate::value_objects::{DomainError, TenantId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version history of a single transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    tenant_id: TenantId,
    transaction_id: TransactionId,
    versions: Vec<Transaction>,
}

impl Lineage {
    /// Start a lineage from its original booking.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStateTransition` unless the record is a
    /// confirmed version 0.
    pub fn open(original: Transaction) -> Result<Self, DomainError> {
        if original.version != 0 || original.status != TransactionStatus::Confirmed {
            return Err(DomainError::InvalidStateTransition(format!(
                "lineage {} must start with a confirmed version 0",
                original.transaction_id
            )));
        }

        Ok(Self {
            tenant_id: original.tenant_id,
            transaction_id: original.transaction_id.clone(),
            versions: vec![original],
        })
    }

    /// Owning tenant
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Transaction id shared by every version
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Newest record (may be a cancellation marker)
    pub fn current(&self) -> &Transaction {
        // A lineage is never empty: `open` seeds it and records are only appended.
        &self.versions[self.versions.len() - 1]
    }

    /// Version number of the newest record
    pub fn current_version(&self) -> Version {
        self.current().version
    }

    /// Whether the lineage ended in a cancellation
    pub fn is_cancelled(&self) -> bool {
        self.current().is_cancelled()
    }

    /// Version contributing to positions now
    pub fn active(&self) -> Option<&Transaction> {
        let current = self.current();
        (!current.is_cancelled()).then_some(current)
    }

    /// Version that was contributing to positions at `known_at`.
    ///
    /// Returns `None` if nothing had been booked yet or the newest record
    /// known at that instant was a cancellation.
    pub fn active_at(&self, known_at: DateTime<Utc>) -> Option<&Transaction> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.created_at <= known_at)
            .filter(|v| !v.is_cancelled())
    }

    /// Every version, oldest first, with replaced versions reported as
    /// `Superseded`.
    pub fn history(&self) -> Vec<Transaction> {
        let last = self.versions.len() - 1;
        self.versions
            .iter()
            .enumerate()
            .map(|(idx, v)| {
                let mut v = v.clone();
                if idx < last && v.status == TransactionStatus::Confirmed {
                    v.status = TransactionStatus::Superseded;
                }
                v
            })
            .collect()
    }

    /// Number of stored versions
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Always false: a lineage holds at least its original booking
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Append an amendment superseding `expected` (optimistic check).
    ///
    /// # Errors
    /// - `LineageCancelled` if the lineage ended in a cancellation
    /// - `VersionConflict` if `expected` is not the current version
    /// - `InvalidTransaction` if the draft targets another lineage or fails
    ///   its own validation
    pub fn amend(
        &mut self,
        expected: Version,
        draft: TransactionDraft,
        created_at: DateTime<Utc>,
    ) -> Result<&Transaction, DomainError> {
        self.ensure_writable(Some(expected))?;

        if draft.tenant_id != self.tenant_id {
            return Err(DomainError::InvalidTransaction(format!(
                "amendment of {} must not change tenant",
                self.transaction_id
            )));
        }
        if let Some(id) = &draft.transaction_id {
            if id != &self.transaction_id {
                return Err(DomainError::InvalidTransaction(format!(
                    "amendment targets {} but lineage is {}",
                    id, self.transaction_id
                )));
            }
        }
        draft.validate()?;

        self.push(draft, TransactionStatus::Confirmed, created_at);
        Ok(self.current())
    }

    /// Append the terminal cancellation marker.
    ///
    /// The marker repeats the fields of the version it cancels so the audit
    /// trail shows exactly what was withdrawn.
    ///
    /// # Errors
    /// Returns `LineageCancelled` if already cancelled.
    pub fn cancel(&mut self, created_at: DateTime<Utc>) -> Result<&Transaction, DomainError> {
        self.ensure_writable(None)?;

        let draft = self.current().to_draft();
        self.push(draft, TransactionStatus::Cancelled, created_at);
        Ok(self.current())
    }

    /// Recompute every hash and check each link to its predecessor.
    pub fn verify_chain(&self) -> bool {
        let mut prev: Option<&str> = None;
        for v in &self.versions {
            if v.prev_hash.as_deref() != prev || v.compute_hash() != v.hash {
                return false;
            }
            prev = Some(v.hash.as_str());
        }
        true
    }

    fn ensure_writable(&self, expected: Option<Version>) -> Result<(), DomainError> {
        if self.is_cancelled() {
            return Err(DomainError::LineageCancelled(self.transaction_id.to_string()));
        }
        if let Some(expected) = expected {
            let current = self.current_version();
            if expected != current {
                return Err(DomainError::VersionConflict {
                    transaction_id: self.transaction_id.to_string(),
                    expected,
                    current,
                });
            }
        }
        Ok(())
    }

    fn push(
        &mut self,
        draft: TransactionDraft,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
    ) {
        let prev = self.current();
        // created_at must never go backwards within a lineage, otherwise
        // active_at() could pick an older version over a newer one.
        let created_at = created_at.max(prev.created_at);
        let record = Transaction::from_draft(
            draft,
            self.transaction_id.clone(),
            prev.version + 1,
            status,
            created_at,
            Some(prev.hash.clone()),
        );
        self.versions.push(record);
    }
}

// =============================================================================
// Tests
// =============================================================================
