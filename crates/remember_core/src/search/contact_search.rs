//! In-memory contact search.
//!
//! # Responsibility
//! - Filter a contact snapshot by free text, field scope and relationship.
//! - Derive the relationship facet values shown next to the filters.
//!
//! # Invariants
//! - Functions are pure: input slices are never mutated and no state is kept
//!   between calls.
//! - Result order is the order of the input snapshot.
//! - Text matching is case-insensitive substring matching; relationship
//!   filtering is exact and case-sensitive.

use crate::model::contact::Contact;
use std::collections::BTreeSet;

/// Reserved facet value that disables a filter.
pub const FILTER_ALL: &str = "all";

/// Which fields a text query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    /// Name, context, relationship, key facts, interaction notes and tags.
    #[default]
    All,
    Names,
    /// Interaction notes.
    Conversations,
    Context,
}

impl SearchScope {
    /// Parses a scope name exactly; any other value falls back to `All`.
    pub fn parse(value: &str) -> Self {
        match value {
            "names" => Self::Names,
            "conversations" => Self::Conversations,
            "context" => Self::Context,
            _ => Self::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => FILTER_ALL,
            Self::Names => "names",
            Self::Conversations => "conversations",
            Self::Context => "context",
        }
    }
}

/// Relationship facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RelationshipFilter {
    #[default]
    All,
    /// Keep contacts whose relationship equals this value exactly.
    Exact(String),
}

impl RelationshipFilter {
    /// `"all"` disables the filter; any other value is matched exactly.
    pub fn parse(value: &str) -> Self {
        if value == FILTER_ALL {
            Self::All
        } else {
            Self::Exact(value.to_string())
        }
    }

    pub fn matches(&self, relationship: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(expected) => expected == relationship,
        }
    }
}

/// Facets applied by [`advanced_search`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub search_in: SearchScope,
    pub relationship: RelationshipFilter,
}

impl SearchFilters {
    pub fn new(search_in: SearchScope, relationship: RelationshipFilter) -> Self {
        Self {
            search_in,
            relationship,
        }
    }

    /// Returns whether any facet narrows results beyond the defaults.
    pub fn is_active(&self) -> bool {
        self.search_in != SearchScope::All || self.relationship != RelationshipFilter::All
    }
}

/// Returns contacts where `query` occurs in any searchable field.
///
/// An empty query matches every contact.
pub fn search_contacts<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    let needle = query.to_lowercase();
    contacts
        .iter()
        .filter(|contact| matches_scope(contact, SearchScope::All, &needle))
        .collect()
}

/// Filters by relationship, then by `query` within `filters.search_in`.
///
/// A blank query skips text matching and returns the relationship-filtered
/// snapshot unchanged.
pub fn advanced_search<'a>(
    contacts: &'a [Contact],
    query: &str,
    filters: &SearchFilters,
) -> Vec<&'a Contact> {
    let by_relationship = contacts
        .iter()
        .filter(|contact| filters.relationship.matches(&contact.relationship));

    if query.trim().is_empty() {
        return by_relationship.collect();
    }

    let needle = query.to_lowercase();
    by_relationship
        .filter(|contact| matches_scope(contact, filters.search_in, &needle))
        .collect()
}

/// Distinct relationship values, sorted and deduplicated.
pub fn unique_relationships(contacts: &[Contact]) -> Vec<String> {
    contacts
        .iter()
        .map(|contact| contact.relationship.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn matches_scope(contact: &Contact, scope: SearchScope, needle: &str) -> bool {
    match scope {
        SearchScope::Names => contains(&contact.name, needle),
        SearchScope::Context => contains(&contact.context, needle),
        SearchScope::Conversations => contact
            .interactions
            .iter()
            .any(|interaction| contains(&interaction.notes, needle)),
        SearchScope::All => {
            contains(&contact.name, needle)
                || contains(&contact.context, needle)
                || contains(&contact.relationship, needle)
                || contact.key_facts.iter().any(|fact| contains(fact, needle))
                || contact.interactions.iter().any(|interaction| {
                    contains(&interaction.notes, needle)
                        || interaction
                            .tags
                            .iter()
                            .flatten()
                            .any(|tag| contains(tag, needle))
                })
        }
    }
}

// `needle` is already lowercased.
fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::{RelationshipFilter, SearchFilters, SearchScope};

    #[test]
    fn scope_parse_falls_back_to_all() {
        assert_eq!(SearchScope::parse("names"), SearchScope::Names);
        assert_eq!(SearchScope::parse("context"), SearchScope::Context);
        assert_eq!(SearchScope::parse("conversations"), SearchScope::Conversations);
        assert_eq!(SearchScope::parse(" Context "), SearchScope::All);
        assert_eq!(SearchScope::parse("Names"), SearchScope::All);
        assert_eq!(SearchScope::parse("everything"), SearchScope::All);
        assert_eq!(SearchScope::parse(""), SearchScope::All);
    }

    #[test]
    fn relationship_all_is_exact_keyword() {
        assert_eq!(RelationshipFilter::parse("all"), RelationshipFilter::All);
        assert_eq!(
            RelationshipFilter::parse("All"),
            RelationshipFilter::Exact("All".to_string())
        );
        assert!(!RelationshipFilter::parse("Neighbor").matches("neighbor"));
    }

    #[test]
    fn filters_are_inactive_by_default() {
        assert!(!SearchFilters::default().is_active());
        assert!(SearchFilters::new(SearchScope::Names, RelationshipFilter::All).is_active());
    }
}
