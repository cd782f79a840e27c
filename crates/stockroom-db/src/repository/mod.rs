//! # Repository Module
//!
//! Database access for the three ledger tables.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  stockroom-pos operation                                               │
//! │       │                                                                 │
//! │       │  db.begin_write()                                               │
//! │       ▼                                                                 │
//! │  WriteTx (write.rs) ─────────┬──────────────────────┐                   │
//! │       │                      │                      │                   │
//! │       ▼                      ▼                      ▼                   │
//! │  catalog::load/save    ledger::insert_*      commit / rollback          │
//! │                                                                         │
//! │  Reads outside a write:                                                 │
//! │  CatalogRepository::load      LedgerRepository::read_* / recent_*       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Full-catalog load and save
//! - [`LedgerRepository`](ledger::LedgerRepository) - Transaction and stock-log appends/reads
//! - [`WriteTx`](write::WriteTx) - One serialized read-modify-write

pub mod catalog;
pub mod ledger;
pub mod write;
