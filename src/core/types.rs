//! Strongly-typed identifiers for combat concepts
//!
//! Definition ids (cards, tags, spells, alterations) come from the catalog and
//! are stable across battles. Instance, player and action ids are allocated
//! per battle. Keeping them as distinct newtypes stops a tag id from being
//! looked up as an alteration id.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(id: u32) -> Self {
                $name(id)
            }

            pub const fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                $name(id)
            }
        }
    };
}

define_id!(
    /// Catalog id of a card definition
    CardId
);
define_id!(
    /// Catalog id of a tag definition
    TagId
);
define_id!(
    /// Catalog id of a spell definition
    SpellId
);
define_id!(
    /// Catalog id of an alteration definition
    AlterationId
);
define_id!(
    /// Live battlefield entity, unique within one battle
    InstanceId
);
define_id!(
    /// Player taking part in a battle
    PlayerId
);
define_id!(
    /// Queued action in the planner
    ActionId
);

/// Name of a card as printed
///
/// Examples: "Gardien du Parc", "Lampadaire"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardName(String);

impl CardName {
    pub fn new(s: impl Into<String>) -> Self {
        CardName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CardName {
    fn from(s: String) -> Self {
        CardName(s)
    }
}

impl From<&str> for CardName {
    fn from(s: &str) -> Self {
        CardName(s.to_string())
    }
}
