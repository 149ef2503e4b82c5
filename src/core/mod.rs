//! Core combat types: identifiers, definitions, live entities and players

pub mod card;
pub mod effects;
pub mod entity;
pub mod instance;
pub mod player;
pub mod types;

pub use card::{Card, CardProperties, CardType, ObjectPassive, Rarity, Tag};
pub use effects::{
    Alteration, AlterationEffect, AlterationKind, HealthPercentRange, Spell, SpellEffect,
    SpellEffectKind, SpellTargetType, TargetCriteria,
};
pub use entity::EntityStore;
pub use instance::{
    ActiveAlteration, ActiveEffect, CardInstance, CharacterProgress, HealthChange, HistoryEntry,
    HistoryKind, ObjectSlot, SpellInstance, TagInstance,
};
pub use player::{MotivationModifier, Player, PlayerBase};
pub use types::{ActionId, AlterationId, CardId, CardName, InstanceId, PlayerId, SpellId, TagId};
