//! Command-line front end for the Remember contact store.
//!
//! # Responsibility
//! - Trim and validate user input before it reaches core.
//! - Re-read the store after every mutation and print the result.
//!
//! # Invariants
//! - All persistence goes through `remember_core::ContactStore`.

use clap::{Parser, Subcommand};
use log::warn;
use remember_core::db::open_db;
use remember_core::{
    default_log_level, init_logging, Contact, ContactPatch, ContactStore, KvRepository,
    NewContact, NewInteraction, RelationshipFilter, SearchFilters, SearchScope,
    SqliteKvRepository, StoreConfig,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(name = "remember")]
#[command(about = "Keep track of the people you meet and what you talked about")]
#[command(version)]
struct Args {
    /// SQLite database file holding the contact collection
    #[arg(long, env = "REMEMBER_DB", default_value = "remember.db")]
    db: PathBuf,

    /// Storage key of the contact collection inside the database
    #[arg(long, env = "REMEMBER_STORAGE_KEY")]
    storage_key: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, env = "REMEMBER_LOG_DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "REMEMBER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every contact
    List,
    /// Show one contact with key facts and interactions
    Show { id: String },
    /// Add a contact
    Add {
        name: String,
        relationship: String,
        #[arg(long, default_value = "")]
        context: String,
        /// Key fact; repeat for several
        #[arg(long = "fact")]
        facts: Vec<String>,
    },
    /// Edit name, relationship or context of a contact
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        relationship: Option<String>,
        #[arg(long)]
        context: Option<String>,
    },
    /// Delete a contact and all of its interactions
    Delete {
        id: String,
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Append a key fact
    FactAdd { id: String, fact: String },
    /// Remove a key fact by its position (0-based, as shown by `show`)
    FactRemove { id: String, index: usize },
    /// Log an interaction
    Log {
        id: String,
        notes: String,
        /// Event date, defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Tag; repeat for several
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Remove a logged interaction
    Unlog { id: String, interaction_id: String },
    /// Search contacts
    Search {
        #[arg(default_value = "")]
        query: String,
        /// all|names|conversations|context
        #[arg(long = "in", default_value = "all")]
        search_in: String,
        /// Exact relationship label, or `all`
        #[arg(long, default_value = "all")]
        relationship: String,
    },
    /// List distinct relationship labels
    Relationships,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> CliResult<()> {
    if let Some(log_dir) = args.log_dir.as_deref() {
        let level = args.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let config = match args.storage_key.as_deref() {
        Some(key) => StoreConfig::with_storage_key(key)?,
        None => StoreConfig::default(),
    };
    let conn = open_db(&args.db)?;
    let store = ContactStore::with_config(SqliteKvRepository::try_new(&conn)?, config)?;

    execute(&store, args.command)
}

fn execute<R: KvRepository>(store: &ContactStore<R>, command: Command) -> CliResult<()> {
    match command {
        Command::List => print_list(&store.list_contacts()),
        Command::Show { id } => {
            let contact = store
                .get_contact(&id)
                .ok_or_else(|| format!("no contact with id `{id}`"))?;
            print_detail(&contact);
        }
        Command::Add {
            name,
            relationship,
            context,
            facts,
        } => {
            let mut fields = NewContact::new(
                required("name", &name)?,
                required("relationship", &relationship)?,
                context.trim(),
            );
            let facts = facts
                .iter()
                .map(|fact| required("fact", fact))
                .collect::<CliResult<Vec<_>>>()?;
            if !facts.is_empty() {
                fields.key_facts = Some(facts);
            }
            let created = store.create_contact(fields)?;
            println!("added {}", created.id);
        }
        Command::Edit {
            id,
            name,
            relationship,
            context,
        } => {
            let patch = ContactPatch {
                name: name.as_deref().map(|value| required("name", value)).transpose()?,
                relationship: relationship
                    .as_deref()
                    .map(|value| required("relationship", value))
                    .transpose()?,
                context: context.map(|value| value.trim().to_string()),
                ..ContactPatch::default()
            };
            if patch.is_empty() {
                return Err("nothing to edit; pass --name, --relationship or --context".into());
            }
            let updated = store.update_contact(&id, patch)?;
            print_detail(&updated);
        }
        Command::Delete { id, yes } => {
            if !yes {
                return Err(format!("deleting `{id}` cannot be undone; re-run with --yes").into());
            }
            store.delete_contact(&id)?;
            println!("deleted {id}");
        }
        Command::FactAdd { id, fact } => {
            let updated = store.add_key_fact(&id, required("fact", &fact)?)?;
            print_detail(&updated);
        }
        Command::FactRemove { id, index } => {
            let updated = store.remove_key_fact(&id, index)?;
            print_detail(&updated);
        }
        Command::Log {
            id,
            notes,
            date,
            tags,
        } => {
            let mut fields = NewInteraction::new(
                date.map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(today),
                required("notes", &notes)?,
            );
            let tags = tags
                .iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect::<Vec<_>>();
            if !tags.is_empty() {
                fields.tags = Some(tags);
            }
            let logged = store.add_interaction(&id, fields)?;
            println!("logged {} on {}", logged.id, logged.date);
        }
        Command::Unlog { id, interaction_id } => {
            store.delete_interaction(&id, &interaction_id)?;
            println!("removed interaction {interaction_id}");
        }
        Command::Search {
            query,
            search_in,
            relationship,
        } => {
            let filters = SearchFilters::new(
                SearchScope::parse(&search_in),
                RelationshipFilter::parse(&relationship),
            );
            let results = if query.is_empty() && !filters.is_active() {
                store.list_contacts()
            } else {
                store.advanced_search(&query, &filters)
            };
            if results.is_empty() {
                warn!("event=cli_search module=cli status=empty scope={}", filters.search_in.as_str());
                println!("No contacts match your search");
            } else {
                print_list(&results);
            }
        }
        Command::Relationships => {
            for relationship in store.unique_relationships() {
                println!("{relationship}");
            }
        }
    }
    Ok(())
}

fn required(field: &str, value: &str) -> CliResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty").into());
    }
    Ok(trimmed.to_string())
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn print_list(contacts: &[Contact]) {
    if contacts.is_empty() {
        println!("No contacts yet");
        return;
    }
    for contact in contacts {
        let count = contact.interaction_count();
        let noun = if count == 1 { "interaction" } else { "interactions" };
        let last = contact
            .last_interaction()
            .map(|interaction| format!(", last {}", interaction.date))
            .unwrap_or_default();
        println!(
            "{}  {} ({}) - {count} {noun}{last}",
            contact.id, contact.name, contact.relationship
        );
    }
}

fn print_detail(contact: &Contact) {
    println!("{} ({})", contact.name, contact.relationship);
    println!("id: {}", contact.id);
    if !contact.context.is_empty() {
        println!("context: {}", contact.context);
    }
    if !contact.key_facts.is_empty() {
        println!("key facts:");
        for (index, fact) in contact.key_facts.iter().enumerate() {
            println!("  [{index}] {fact}");
        }
    }
    if !contact.interactions.is_empty() {
        println!("interactions:");
        for interaction in &contact.interactions {
            let tags = interaction
                .tags
                .as_ref()
                .filter(|tags| !tags.is_empty())
                .map(|tags| format!(" #{}", tags.join(" #")))
                .unwrap_or_default();
            println!(
                "  {} {}: {}{tags}",
                interaction.date, interaction.id, interaction.notes
            );
        }
    }
    println!("updated: {}", contact.updated_at);
}

#[cfg(test)]
mod tests {
    use super::{execute, required, Command};
    use remember_core::{ContactStore, MemoryKvRepository};

    #[test]
    fn required_trims_and_rejects_blank_values() {
        assert_eq!(required("name", "  Ana ").unwrap(), "Ana");
        assert!(required("name", "   ").is_err());
    }

    #[test]
    fn add_rejects_blank_relationship_without_writing() {
        let store = ContactStore::new(MemoryKvRepository::new());
        let result = execute(
            &store,
            Command::Add {
                name: "Ana".to_string(),
                relationship: " ".to_string(),
                context: String::new(),
                facts: Vec::new(),
            },
        );
        assert!(result.is_err());
        assert!(store.list_contacts().is_empty());
    }

    #[test]
    fn log_defaults_date_and_trims_notes() {
        let store = ContactStore::new(MemoryKvRepository::new());
        execute(
            &store,
            Command::Add {
                name: " Ana ".to_string(),
                relationship: "Barber".to_string(),
                context: " cuts hair ".to_string(),
                facts: vec!["likes jazz".to_string()],
            },
        )
        .unwrap();
        let ana = store.list_contacts().remove(0);
        assert_eq!(ana.name, "Ana");
        assert_eq!(ana.context, "cuts hair");
        assert_eq!(ana.key_facts, vec!["likes jazz"]);

        execute(
            &store,
            Command::Log {
                id: ana.id.clone(),
                notes: "  trim  ".to_string(),
                date: None,
                tags: Vec::new(),
            },
        )
        .unwrap();
        let logged = store.get_contact(&ana.id).unwrap().interactions.remove(0);
        assert_eq!(logged.notes, "trim");
        assert_eq!(logged.date.len(), "2024-05-01".len());
        assert!(logged.tags.is_none());
    }

    #[test]
    fn delete_requires_confirmation() {
        let store = ContactStore::new(MemoryKvRepository::new());
        let ana = store
            .create_contact(remember_core::NewContact::new("Ana", "Barber", ""))
            .unwrap();
        let refused = execute(
            &store,
            Command::Delete {
                id: ana.id.clone(),
                yes: false,
            },
        );
        assert!(refused.is_err());
        assert_eq!(store.list_contacts().len(), 1);

        execute(&store, Command::Delete { id: ana.id, yes: true }).unwrap();
        assert!(store.list_contacts().is_empty());
    }
}
