//! Core use-case services.
//!
//! # Responsibility
//! - Turn repository reads/writes into contact-level operations.
//! - Keep front ends decoupled from storage details.

pub mod contact_store;
