//! Test helpers for Tradebook ledger and position tests.
//!
//! Provides date and identifier shorthands, a transaction builder, a
//! ledger over a fresh in-memory store and a seeded reference directory.

mod fixtures;

pub use fixtures::{
    asset, book, date, quantity_of, seed_directory, tenant, test_ledger, txn_id,
    TransactionBuilder, TestLedger,
};
