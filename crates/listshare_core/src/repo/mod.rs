//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for lists and items.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `List::validate()` before persistence.
//! - Cross-record mutations (item push/pull) run in one transaction.

pub mod list_repo;
