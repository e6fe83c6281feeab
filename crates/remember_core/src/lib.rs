//! Core domain logic for Remember, a local contact and interaction tracker.
//! This crate is the single source of truth for contact invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, StoreConfig, DEFAULT_STORAGE_KEY};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contact::{
    iso_timestamp, parse_timestamp, Contact, ContactId, ContactPatch, Interaction, InteractionId,
    NewContact, NewInteraction,
};
pub use repo::kv_repo::{
    DetachedKvRepository, KvRepository, MemoryKvRepository, RepoError, RepoResult,
    SqliteKvRepository,
};
pub use search::contact_search::{
    advanced_search, search_contacts, unique_relationships, RelationshipFilter, SearchFilters,
    SearchScope,
};
pub use service::contact_store::{ContactStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
