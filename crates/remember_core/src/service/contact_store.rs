//! Contact store use-case service.
//!
//! # Responsibility
//! - Own CRUD over the contact collection and nested interactions.
//! - Serialize the whole collection into one key-value entry per write.
//! - Offer snapshot-based search shortcuts for callers.
//!
//! # Invariants
//! - Every call starts from a fresh read of the persisted blob; nothing is
//!   cached between calls.
//! - Every successful mutation rewrites the whole collection.
//! - A mutation that fails (not found, unreadable blob) writes nothing.
//! - An unavailable medium degrades reads to an empty list and turns writes
//!   into no-ops.
//! - An unreadable blob is never overwritten.

use crate::config::{ConfigError, StoreConfig};
use crate::model::contact::{
    fresh_id, Contact, ContactId, ContactPatch, Interaction, InteractionId, NewContact,
    NewInteraction,
};
use crate::repo::kv_repo::{KvRepository, RepoError};
use crate::search::contact_search::{
    advanced_search, search_contacts, unique_relationships, SearchFilters,
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::error::Category;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for contact store operations.
#[derive(Debug)]
pub enum StoreError {
    ContactNotFound(ContactId),
    InteractionNotFound {
        contact_id: ContactId,
        interaction_id: InteractionId,
    },
    KeyFactNotFound {
        contact_id: ContactId,
        index: usize,
    },
    /// A replacement interaction list repeats an id.
    DuplicateInteractionId {
        contact_id: ContactId,
        interaction_id: InteractionId,
    },
    /// Persisted blob cannot be decoded as a contact collection.
    CorruptData(String),
    Serialize(serde_json::Error),
    Repo(RepoError),
}

impl StoreError {
    /// Returns whether the error only reports a missing target.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ContactNotFound(_) | Self::InteractionNotFound { .. } | Self::KeyFactNotFound { .. }
        )
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContactNotFound(id) => write!(f, "contact not found: {id}"),
            Self::InteractionNotFound {
                contact_id,
                interaction_id,
            } => write!(
                f,
                "interaction not found: {interaction_id} (contact {contact_id})"
            ),
            Self::KeyFactNotFound { contact_id, index } => {
                write!(f, "key fact not found: index {index} (contact {contact_id})")
            }
            Self::DuplicateInteractionId {
                contact_id,
                interaction_id,
            } => write!(
                f,
                "duplicate interaction id: {interaction_id} (contact {contact_id})"
            ),
            Self::CorruptData(message) => write!(f, "invalid persisted contact data: {message}"),
            Self::Serialize(err) => write!(f, "failed to encode contacts: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Collection read for a mutation, plus whether it can be written back.
struct Snapshot {
    contacts: Vec<Contact>,
    writable: bool,
}

type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Contact store over an injected key-value repository.
pub struct ContactStore<R: KvRepository> {
    repo: R,
    config: StoreConfig,
    clock: Clock,
}

impl<R: KvRepository> ContactStore<R> {
    /// Creates a store using the default storage key.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            config: StoreConfig::default(),
            clock: Box::new(Utc::now),
        }
    }

    /// Creates a store with explicit configuration.
    pub fn with_config(repo: R, config: StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            repo,
            config,
            clock: Box::new(Utc::now),
        })
    }

    /// Replaces the time source used for `createdAt`/`updatedAt`.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns all contacts in persisted order.
    ///
    /// Never fails: a missing key, an unavailable medium or an unreadable
    /// blob all yield an empty list.
    pub fn list_contacts(&self) -> Vec<Contact> {
        match self.load() {
            Ok(snapshot) => snapshot.contacts,
            Err(err) => {
                warn!("event=contacts_list module=store status=degraded error={err}");
                Vec::new()
            }
        }
    }

    /// Gets one contact by id.
    pub fn get_contact(&self, id: &str) -> Option<Contact> {
        self.list_contacts()
            .into_iter()
            .find(|contact| contact.id == id)
    }

    /// Creates and appends a new contact.
    ///
    /// # Contract
    /// - The id is unique against every persisted contact.
    /// - `interactions` starts empty; `key_facts` defaults to empty.
    pub fn create_contact(&self, fields: NewContact) -> StoreResult<Contact> {
        let mut snapshot = self.load()?;
        let id = fresh_id(|candidate| {
            snapshot
                .contacts
                .iter()
                .any(|contact| contact.id == candidate)
        });
        let contact = Contact::new(id, fields, self.now());
        snapshot.contacts.push(contact.clone());
        self.save(&snapshot)?;

        info!(
            "event=contact_create module=store status=ok contact_id={} contacts={}",
            contact.id,
            snapshot.contacts.len()
        );
        Ok(contact)
    }

    /// Applies a partial update and refreshes `updated_at`.
    ///
    /// A replacement interaction list with repeated ids is rejected with
    /// `DuplicateInteractionId` and nothing is written.
    pub fn update_contact(&self, id: &str, patch: ContactPatch) -> StoreResult<Contact> {
        let fields = patch.field_names().join(",");
        let updated = self.mutate_contact(id, "contact_update", |contact, now| {
            if let Some(interaction_id) = patch.duplicate_interaction_id() {
                return Err(StoreError::DuplicateInteractionId {
                    contact_id: contact.id.clone(),
                    interaction_id: interaction_id.to_string(),
                });
            }
            contact.apply_patch(patch, now);
            Ok(contact.clone())
        })?;
        debug!("event=contact_update module=store status=ok contact_id={id} fields={fields}");
        Ok(updated)
    }

    /// Deletes a contact together with its interactions.
    ///
    /// A second delete of the same id reports `ContactNotFound` and writes
    /// nothing.
    pub fn delete_contact(&self, id: &str) -> StoreResult<()> {
        let mut snapshot = self.load()?;
        let before = snapshot.contacts.len();
        snapshot.contacts.retain(|contact| contact.id != id);
        if snapshot.contacts.len() == before {
            debug!("event=contact_delete module=store status=not_found contact_id={id}");
            return Err(StoreError::ContactNotFound(id.to_string()));
        }
        self.save(&snapshot)?;

        info!(
            "event=contact_delete module=store status=ok contact_id={id} contacts={}",
            snapshot.contacts.len()
        );
        Ok(())
    }

    /// Logs an interaction at the front of the contact's history.
    pub fn add_interaction(
        &self,
        contact_id: &str,
        fields: NewInteraction,
    ) -> StoreResult<Interaction> {
        self.mutate_contact(contact_id, "interaction_add", |contact, now| {
            let id = fresh_id(|candidate| contact.interaction(candidate).is_some());
            let interaction = Interaction {
                id,
                date: fields.date,
                notes: fields.notes,
                tags: fields.tags,
            };
            contact.interactions.insert(0, interaction.clone());
            contact.touch(now);
            Ok(interaction)
        })
    }

    /// Removes one interaction from a contact's history.
    pub fn delete_interaction(&self, contact_id: &str, interaction_id: &str) -> StoreResult<()> {
        self.mutate_contact(contact_id, "interaction_delete", |contact, now| {
            let before = contact.interactions.len();
            contact
                .interactions
                .retain(|interaction| interaction.id != interaction_id);
            if contact.interactions.len() == before {
                return Err(StoreError::InteractionNotFound {
                    contact_id: contact.id.clone(),
                    interaction_id: interaction_id.to_string(),
                });
            }
            contact.touch(now);
            Ok(())
        })
    }

    /// Appends a key fact. Duplicates are kept.
    pub fn add_key_fact(&self, contact_id: &str, fact: impl Into<String>) -> StoreResult<Contact> {
        let fact = fact.into();
        self.mutate_contact(contact_id, "key_fact_add", |contact, now| {
            contact.key_facts.push(fact);
            contact.touch(now);
            Ok(contact.clone())
        })
    }

    /// Removes the key fact at `index`.
    pub fn remove_key_fact(&self, contact_id: &str, index: usize) -> StoreResult<Contact> {
        self.mutate_contact(contact_id, "key_fact_remove", |contact, now| {
            if index >= contact.key_facts.len() {
                return Err(StoreError::KeyFactNotFound {
                    contact_id: contact.id.clone(),
                    index,
                });
            }
            contact.key_facts.remove(index);
            contact.touch(now);
            Ok(contact.clone())
        })
    }

    /// Plain search over a fresh snapshot.
    pub fn search(&self, query: &str) -> Vec<Contact> {
        let contacts = self.list_contacts();
        search_contacts(&contacts, query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Faceted search over a fresh snapshot.
    pub fn advanced_search(&self, query: &str, filters: &SearchFilters) -> Vec<Contact> {
        let contacts = self.list_contacts();
        advanced_search(&contacts, query, filters)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Sorted distinct relationship labels over a fresh snapshot.
    pub fn unique_relationships(&self) -> Vec<String> {
        unique_relationships(&self.list_contacts())
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Loads, runs `apply` on the target contact, and persists on success.
    fn mutate_contact<T>(
        &self,
        contact_id: &str,
        event: &'static str,
        apply: impl FnOnce(&mut Contact, DateTime<Utc>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut snapshot = self.load()?;
        let now = self.now();
        let Some(contact) = snapshot
            .contacts
            .iter_mut()
            .find(|contact| contact.id == contact_id)
        else {
            debug!("event={event} module=store status=not_found contact_id={contact_id}");
            return Err(StoreError::ContactNotFound(contact_id.to_string()));
        };

        let output = match apply(contact, now) {
            Ok(output) => output,
            Err(err) => {
                debug!("event={event} module=store status=rejected contact_id={contact_id} error={err}");
                return Err(err);
            }
        };
        self.save(&snapshot)?;

        info!("event={event} module=store status=ok contact_id={contact_id}");
        Ok(output)
    }

    fn load(&self) -> StoreResult<Snapshot> {
        let key = self.config.storage_key.as_str();
        let blob = match self.repo.get_value(key) {
            Ok(blob) => blob,
            Err(RepoError::Unavailable(reason)) => {
                debug!("event=contacts_load module=store status=unavailable reason={reason}");
                return Ok(Snapshot {
                    contacts: Vec::new(),
                    writable: false,
                });
            }
            Err(err) => return Err(err.into()),
        };

        let contacts = match blob {
            Some(blob) => decode_contacts(&blob)?,
            None => Vec::new(),
        };
        Ok(Snapshot {
            contacts,
            writable: true,
        })
    }

    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if !snapshot.writable {
            debug!("event=contacts_save module=store status=skipped reason=unavailable");
            return Ok(());
        }

        let blob = serde_json::to_string(&snapshot.contacts).map_err(StoreError::Serialize)?;
        match self.repo.set_value(&self.config.storage_key, &blob) {
            Ok(()) => Ok(()),
            Err(RepoError::Unavailable(reason)) => {
                debug!("event=contacts_save module=store status=skipped reason={reason}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn decode_contacts(blob: &str) -> StoreResult<Vec<Contact>> {
    // Only position and category: serde messages can quote user content.
    serde_json::from_str(blob).map_err(|err| {
        StoreError::CorruptData(format!(
            "line {} column {}: {}",
            err.line(),
            err.column(),
            error_category(&err)
        ))
    })
}

fn error_category(err: &serde_json::Error) -> &'static str {
    match err.classify() {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "unexpected shape",
        Category::Eof => "truncated",
    }
}
