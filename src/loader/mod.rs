//! Catalog and rule loaders

pub mod catalog;
pub mod rules;

pub use catalog::{Catalog, DeckDefinition, DeckEntry};
pub use rules::{load_rules_file, parse_rule_definitions, registry_from_json};
