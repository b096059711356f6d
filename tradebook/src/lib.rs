//! Tradebook Service Library
//!
//! Request surface over the versioned transaction ledger and the
//! point-in-time position views derived from it.
//!
//! # Architecture
//!
//! ```text
//! Caller → TransactionService → Ledger ──────────────→ LineageRepository
//!                  │          → TransferOrchestrator ↗        ↑
//!                  └──────────→ PositionAggregator → PositionCache
//! ```
//!
//! # Components
//!
//! - **Service**: Booking, transfer and position operations per tenant
//! - **Scenarios**: Demonstration trading stories run by the binary
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use tradebook::{Config, TransactionService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let service = TransactionService::in_memory(&config);
//!     let positions = service
//!         .positions_by_asset_manager(config.tenant_id, None, None)
//!         .await
//!         .expect("Position query failed");
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod scenarios;
pub mod service;

// Re-exports for convenience
pub use config::{Config, Environment};
pub use error::{ServiceError, ServiceResult};
pub use scenarios::{ReportStep, Scenario, ScenarioReport};
pub use service::TransactionService;
