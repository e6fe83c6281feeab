//! Query entry points over contact snapshots.
//!
//! # Responsibility
//! - Plain and faceted search without touching storage.
//! - Keep result shaping inside core.

pub mod contact_search;
