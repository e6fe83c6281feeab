//! Domain model for tracked people and their interaction history.
//!
//! # Responsibility
//! - Define the canonical records persisted in the contact blob.
//!
//! # Invariants
//! - A contact exclusively owns its interaction list; deleting the contact
//!   deletes every interaction with it.
//! - Contact ids are unique in the collection; interaction ids are unique
//!   within their owning contact.

pub mod contact;
