//! Reference resolution port.
//!
//! Asset, book and party reference data is owned elsewhere. The ledger only
//! asks whether an identifier exists for a tenant; no other shape of the
//! reference data is assumed.
//!
//! Adapters:
//! - `ReferenceDirectory` - in-memory registry (tenant scope + shared scope 0)
//! - `AcceptAllReferences` - shape checks only, every well-formed id exists

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tokio::sync::RwLock;
use tracing::debug;

use tradebook_domain::{validate_identifier, AssetId, BookId, PartyId, TenantId, TransactionDraft};

use crate::error::{LedgerError, LedgerResult};

/// Category of referenced entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Asset,
    Book,
    Party,
}

impl ReferenceKind {
    fn field(&self) -> &'static str {
        match self {
            ReferenceKind::Asset => "asset_id",
            ReferenceKind::Book => "book_id",
            ReferenceKind::Party => "party_id",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Asset => write!(f, "asset"),
            ReferenceKind::Book => write!(f, "book"),
            ReferenceKind::Party => write!(f, "party"),
        }
    }
}

// =============================================================================
// Reference Resolver Port
// =============================================================================

/// Port for checking that a referenced identifier exists.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    /// Whether `id` exists for the tenant (or in the shared scope).
    async fn exists(&self, tenant_id: TenantId, kind: ReferenceKind, id: &str) -> bool;
}

/// Check shape and existence of one reference.
///
/// # Errors
/// `LedgerError::Validation` if the id is malformed or unknown.
pub async fn resolve<R: ReferenceResolver + ?Sized>(
    resolver: &R,
    tenant_id: TenantId,
    kind: ReferenceKind,
    id: &str,
) -> LedgerResult<()> {
    validate_identifier(kind.field(), id)?;
    if !resolver.exists(tenant_id, kind, id).await {
        return Err(LedgerError::Validation(format!(
            "unknown {} '{}' for tenant {}",
            kind, id, tenant_id
        )));
    }
    Ok(())
}

/// Check every reference a draft carries: the asset and both books.
///
/// # Errors
/// `LedgerError::Validation` naming the first unknown reference.
pub async fn resolve_draft<R: ReferenceResolver + ?Sized>(
    resolver: &R,
    draft: &TransactionDraft,
) -> LedgerResult<()> {
    resolve(resolver, draft.tenant_id, ReferenceKind::Asset, draft.asset_id.as_str()).await?;
    resolve(resolver, draft.tenant_id, ReferenceKind::Book, draft.asset_book_id.as_str()).await?;
    resolve(resolver, draft.tenant_id, ReferenceKind::Book, draft.counterparty_book_id.as_str())
        .await?;
    Ok(())
}

// =============================================================================
// Accept-all adapter
// =============================================================================

/// Resolver that treats every well-formed identifier as existing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllReferences;

#[async_trait]
impl ReferenceResolver for AcceptAllReferences {
    async fn exists(&self, _tenant_id: TenantId, _kind: ReferenceKind, _id: &str) -> bool {
        true
    }
}

// =============================================================================
// In-memory directory
// =============================================================================

/// In-memory registry of books, assets and parties.
///
/// Entries registered under `TenantId::SHARED` are visible to every tenant.
/// A permissive directory still records registrations but answers every
/// existence check with `true`.
#[derive(Debug)]
pub struct ReferenceDirectory {
    entries: RwLock<HashSet<(TenantId, ReferenceKind, String)>>,
    strict: bool,
}

impl ReferenceDirectory {
    /// Create an empty directory that rejects unregistered references
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashSet::new()),
            strict: true,
        }
    }

    /// Create an empty directory that accepts unregistered references
    pub fn permissive() -> Self {
        Self {
            strict: false,
            ..Self::new()
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Register a book for a tenant
    pub async fn register_book(&self, tenant_id: TenantId, book_id: &BookId) {
        self.register(tenant_id, ReferenceKind::Book, book_id.as_str()).await;
    }

    /// Register an asset for a tenant (or `TenantId::SHARED`)
    pub async fn register_asset(&self, tenant_id: TenantId, asset_id: &AssetId) {
        self.register(tenant_id, ReferenceKind::Asset, asset_id.as_str()).await;
    }

    /// Register a party for a tenant
    pub async fn register_party(&self, tenant_id: TenantId, party_id: &PartyId) {
        self.register(tenant_id, ReferenceKind::Party, party_id.as_str()).await;
    }

    /// Remove a registration. Already-booked transactions are unaffected.
    pub async fn deregister(&self, tenant_id: TenantId, kind: ReferenceKind, id: &str) -> bool {
        self.entries.write().await.remove(&(tenant_id, kind, id.to_string()))
    }

    /// Number of registrations across all scopes
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is registered
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn register(&self, tenant_id: TenantId, kind: ReferenceKind, id: &str) {
        debug!(
            tenant = %tenant_id,
            shared = tenant_id.is_shared(),
            %kind,
            id,
            "Reference registered"
        );
        self.entries.write().await.insert((tenant_id, kind, id.to_string()));
    }
}

impl Default for ReferenceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReferenceResolver for ReferenceDirectory {
    async fn exists(&self, tenant_id: TenantId, kind: ReferenceKind, id: &str) -> bool {
        if !self.strict {
            return true;
        }
        let entries = self.entries.read().await;
        if entries.contains(&(tenant_id, kind, id.to_string())) {
            return true;
        }
        !tenant_id.is_shared() && entries.contains(&(TenantId::SHARED, kind, id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_scopes() {
        let directory = ReferenceDirectory::new();
        let tenant = TenantId::new(42);
        directory.register_book(tenant, &BookId::new("DEMO-BOOK").unwrap()).await;
        directory.register_asset(TenantId::SHARED, &AssetId::new("Z77.SI").unwrap()).await;

        assert!(directory.exists(tenant, ReferenceKind::Book, "DEMO-BOOK").await);
        assert!(!directory.exists(TenantId::new(43), ReferenceKind::Book, "DEMO-BOOK").await);
        // Shared assets are visible to every tenant
        assert!(directory.exists(TenantId::new(43), ReferenceKind::Asset, "Z77.SI").await);
        // Kinds do not leak into each other
        assert!(!directory.exists(tenant, ReferenceKind::Asset, "DEMO-BOOK").await);
    }

    #[tokio::test]
    async fn test_shared_scope_lookup() {
        let directory = ReferenceDirectory::new();
        directory.register_asset(TenantId::SHARED, &AssetId::new("JB355").unwrap()).await;

        assert!(TenantId::SHARED.is_shared());
        assert!(!TenantId::new(7).is_shared());
        assert!(directory.exists(TenantId::SHARED, ReferenceKind::Asset, "JB355").await);
        assert!(!directory.exists(TenantId::SHARED, ReferenceKind::Asset, "0005.HK").await);
        assert!(directory.exists(TenantId::new(7), ReferenceKind::Asset, "JB355").await);
    }

    #[tokio::test]
    async fn test_resolve_rejects_malformed_and_unknown() {
        let directory = ReferenceDirectory::new();
        let tenant = TenantId::new(1);
        directory.register_book(tenant, &BookId::new("BOOK1").unwrap()).await;

        assert!(resolve(&directory, tenant, ReferenceKind::Book, "BOOK1").await.is_ok());
        assert!(matches!(
            resolve(&directory, tenant, ReferenceKind::Book, "BOOK2").await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            resolve(&AcceptAllReferences, tenant, ReferenceKind::Book, "BAD ID").await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_deregister() {
        let directory = ReferenceDirectory::new();
        let tenant = TenantId::new(1);
        directory.register_party(tenant, &PartyId::new("BROKER").unwrap()).await;
        assert_eq!(directory.len().await, 1);

        assert!(directory.deregister(tenant, ReferenceKind::Party, "BROKER").await);
        assert!(!directory.exists(tenant, ReferenceKind::Party, "BROKER").await);
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_permissive_directory() {
        let directory = ReferenceDirectory::permissive();
        assert!(!directory.is_strict());
        assert!(directory.exists(TenantId::new(1), ReferenceKind::Book, "ANY").await);
        assert!(ReferenceDirectory::default().is_strict());
    }
}
