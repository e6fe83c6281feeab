//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-value key-value contract the contact store writes
//!   through.
//! - Isolate SQLite details from store and query logic.
//!
//! # Invariants
//! - Repositories know nothing about contacts; they move opaque strings.

pub mod kv_repo;
