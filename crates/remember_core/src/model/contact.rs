//! Contact and interaction domain model.
//!
//! # Responsibility
//! - Define the persisted contact record and its nested interaction log.
//! - Provide creation, patch and timestamp helpers used by the store.
//!
//! # Invariants
//! - `id` is assigned once at creation and never rewritten.
//! - `interactions` is ordered newest-first; index 0 is the latest entry.
//! - `updated_at` never moves backwards, even if the wall clock does.
//!
//! Field names serialize in camelCase so existing blobs keep loading.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Stable identifier of a contact, unique across the collection.
///
/// Kept as a string: blobs written by earlier front ends use
/// millisecond-clock ids such as `"1700000000000"`.
pub type ContactId = String;

/// Identifier of an interaction, unique within its owning contact.
pub type InteractionId = String;

/// A single dated log entry about a conversation or meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: InteractionId,
    /// Calendar date of the event, usually `YYYY-MM-DD`.
    pub date: String,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A tracked person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub context: String,
    pub relationship: String,
    /// Short memorable notes; order is insertion order, duplicates allowed.
    #[serde(default)]
    pub key_facts: Vec<String>,
    /// Newest-first.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    /// ISO-8601, immutable.
    pub created_at: String,
    /// ISO-8601, refreshed by every mutation of this contact.
    pub updated_at: String,
}

/// Input for creating a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub relationship: String,
    pub context: String,
    /// Defaults to an empty list when `None`.
    pub key_facts: Option<Vec<String>>,
}

impl NewContact {
    pub fn new(
        name: impl Into<String>,
        relationship: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relationship: relationship.into(),
            context: context.into(),
            key_facts: None,
        }
    }
}

/// Partial update for a contact.
///
/// `None` means "leave as is"; `Some` replaces the field wholesale, including
/// `key_facts` and `interactions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub context: Option<String>,
    pub key_facts: Option<Vec<String>>,
    pub interactions: Option<Vec<Interaction>>,
}

impl ContactPatch {
    /// Returns whether the patch replaces no field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.relationship.is_none()
            && self.context.is_none()
            && self.key_facts.is_none()
            && self.interactions.is_none()
    }

    /// First interaction id that occurs more than once in a replacement list.
    pub fn duplicate_interaction_id(&self) -> Option<&str> {
        let interactions = self.interactions.as_deref()?;
        let mut seen = HashSet::new();
        interactions
            .iter()
            .map(|interaction| interaction.id.as_str())
            .find(|id| !seen.insert(*id))
    }

    /// Names of the fields this patch replaces, for metadata-only logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.relationship.is_some() {
            fields.push("relationship");
        }
        if self.context.is_some() {
            fields.push("context");
        }
        if self.key_facts.is_some() {
            fields.push("keyFacts");
        }
        if self.interactions.is_some() {
            fields.push("interactions");
        }
        fields
    }
}

/// Input for logging a new interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewInteraction {
    pub date: String,
    pub notes: String,
    pub tags: Option<Vec<String>>,
}

impl NewInteraction {
    pub fn new(date: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            notes: notes.into(),
            tags: None,
        }
    }
}

impl Contact {
    /// Builds a fresh contact with empty interaction log.
    ///
    /// `created_at` and `updated_at` are both set to `now`.
    pub fn new(id: ContactId, fields: NewContact, now: DateTime<Utc>) -> Self {
        let stamp = iso_timestamp(now);
        Self {
            id,
            name: fields.name,
            context: fields.context,
            relationship: fields.relationship,
            key_facts: fields.key_facts.unwrap_or_default(),
            interactions: Vec::new(),
            created_at: stamp.clone(),
            updated_at: stamp,
        }
    }

    /// Applies every present field of `patch`, then refreshes `updated_at`.
    pub fn apply_patch(&mut self, patch: ContactPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(relationship) = patch.relationship {
            self.relationship = relationship;
        }
        if let Some(context) = patch.context {
            self.context = context;
        }
        if let Some(key_facts) = patch.key_facts {
            self.key_facts = key_facts;
        }
        if let Some(interactions) = patch.interactions {
            self.interactions = interactions;
        }
        self.touch(now);
    }

    /// Sets `updated_at` to `now`, unless the stored value is already later.
    ///
    /// Unparseable stored values are replaced.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let keep_previous = parse_timestamp(&self.updated_at).is_some_and(|prev| prev > now);
        if !keep_previous {
            self.updated_at = iso_timestamp(now);
        }
    }

    /// Number of logged interactions.
    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    /// Most recently logged interaction, if any.
    pub fn last_interaction(&self) -> Option<&Interaction> {
        self.interactions.first()
    }

    pub fn interaction(&self, id: &str) -> Option<&Interaction> {
        self.interactions.iter().find(|interaction| interaction.id == id)
    }
}

/// Formats a UTC instant as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Generates an id that `is_taken` does not reject.
///
/// Draws random v4 UUIDs until one is free.
pub(crate) fn fresh_id(is_taken: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate = Uuid::new_v4().to_string();
        if !is_taken(candidate.as_str()) {
            return candidate;
        }
    }
}
