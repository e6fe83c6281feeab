//! Store configuration.
//!
//! # Invariants
//! - `storage_key` is non-blank once validated.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key used when nothing else is configured.
///
/// Matches the key earlier front ends wrote, so existing blobs are found.
pub const DEFAULT_STORAGE_KEY: &str = "remember-crm-contacts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyStorageKey,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStorageKey => write!(f, "storage key cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Settings for a [`crate::ContactStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key under which the whole contact collection is stored.
    pub storage_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl StoreConfig {
    /// Builds a config for a custom key, trimming surrounding whitespace.
    pub fn with_storage_key(key: impl AsRef<str>) -> Result<Self, ConfigError> {
        let config = Self {
            storage_key: key.as_ref().trim().to_string(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        Ok(())
    }
}
