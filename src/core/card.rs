//! Card and tag definitions
//!
//! Definitions are read-only catalog records. Live entities hold them through
//! an `Arc` and never copy or mutate them.

use crate::core::{CardId, TagId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Personnage,
    Objet,
    Evenement,
    Lieu,
    Action,
}

/// Card rarity, which also drives the charisme reward on defeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    GrosBodycount,
    Interessant,
    Banger,
    Cheate,
}

impl Rarity {
    /// Charisme granted to the opposing player when a character of this rarity falls
    pub fn charisme_reward(&self) -> u32 {
        match self {
            Rarity::GrosBodycount => 5,
            Rarity::Interessant => 10,
            Rarity::Banger => 20,
            Rarity::Cheate => 40,
        }
    }
}

/// Numeric properties printed on a card
///
/// Unknown numeric keys land in `extra` and seed ad-hoc temporary stats
/// (e.g. a card-level `motivation` pool).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardProperties {
    pub health: Option<u32>,
    pub attack: Option<f64>,
    pub defense: Option<f64>,
    pub level: Option<u32>,
    pub max_level: Option<u32>,
    pub xp: Option<u32>,
    pub charisma_mod: Option<f64>,
    pub activation_cost: Option<f64>,
    pub motivation_cost: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, f64>,
}

/// A card definition from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    #[serde(default)]
    pub rarity: Rarity,
    /// Charisme spent to put this card on the battlefield
    #[serde(default)]
    pub summon_cost: u32,
    #[serde(default)]
    pub properties: CardProperties,
    /// Free-form passive. Object cards carry `{"type":"attack_boost","value":20}`
    #[serde(default)]
    pub passive_effect: Option<String>,
}

impl Card {
    pub fn new(id: CardId, name: impl Into<String>, card_type: CardType) -> Self {
        Card {
            id,
            name: name.into(),
            card_type,
            rarity: Rarity::default(),
            summon_cost: 0,
            properties: CardProperties::default(),
            passive_effect: None,
        }
    }

    /// Convenience constructor for a character with health/attack/defense
    pub fn character(id: CardId, name: impl Into<String>, health: u32, attack: f64, defense: f64) -> Self {
        let mut card = Card::new(id, name, CardType::Personnage);
        card.properties.health = Some(health);
        card.properties.attack = Some(attack);
        card.properties.defense = Some(defense);
        card
    }

    pub fn is_character(&self) -> bool {
        self.card_type == CardType::Personnage
    }

    pub fn is_lieu(&self) -> bool {
        self.card_type == CardType::Lieu
    }

    /// Base value of a stat as printed on the card
    pub fn base_stat(&self, stat: &str) -> f64 {
        let props = &self.properties;
        match stat {
            "attack" => props.attack.unwrap_or(0.0),
            "defense" => props.defense.unwrap_or(0.0),
            "charisma_mod" => props.charisma_mod.unwrap_or(0.0),
            "activation_cost" => props.activation_cost.unwrap_or(0.0),
            "motivation_cost" => props.motivation_cost.unwrap_or(0.0),
            other => props.extra.get(other).copied().unwrap_or(0.0),
        }
    }

    /// Stats seeded into a fresh instance, in addition to attack/defense
    pub fn type_specific_stats(&self) -> Vec<(&'static str, f64)> {
        let props = &self.properties;
        match self.card_type {
            CardType::Objet => vec![("charisma_mod", props.charisma_mod.unwrap_or(0.0))],
            CardType::Lieu => vec![("activation_cost", props.activation_cost.unwrap_or(0.0))],
            CardType::Action | CardType::Evenement => {
                vec![("motivation_cost", props.motivation_cost.unwrap_or(0.0))]
            }
            CardType::Personnage => Vec::new(),
        }
    }

    /// Passive boost carried by an object card, if its passive text is a boost record
    pub fn object_passive(&self) -> Option<ObjectPassive> {
        if self.card_type != CardType::Objet {
            return None;
        }
        let text = self.passive_effect.as_deref()?;
        serde_json::from_str::<ObjectPassive>(text).ok()
    }
}

/// Stat boost granted by an equipped object, as a percentage of the holder's base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPassive {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
}

impl ObjectPassive {
    /// Stat name boosted by this passive (`attack_boost` boosts `attack`)
    pub fn stat(&self) -> Option<&str> {
        self.kind.strip_suffix("_boost")
    }
}

/// A tag definition: a label that can activate declarative rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub passive_effect: Option<String>,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Tag {
            id,
            name: name.into(),
            passive_effect: None,
        }
    }

    /// A tag with a passive effect forces a stat recompute when added or removed
    pub fn with_passive(mut self, passive: impl Into<String>) -> Self {
        self.passive_effect = Some(passive.into());
        self
    }

    pub fn has_passive_effect(&self) -> bool {
        self.passive_effect
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_from_catalog_json() {
        let json = r#"{
            "id": 4,
            "name": "Gardien du Parc",
            "type": "personnage",
            "rarity": "banger",
            "summon_cost": 15,
            "properties": {"health": 12, "attack": 3, "defense": 2, "motivation": 10}
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.card_type, CardType::Personnage);
        assert_eq!(card.rarity, Rarity::Banger);
        assert_eq!(card.properties.health, Some(12));
        assert_eq!(card.base_stat("attack"), 3.0);
        assert_eq!(card.base_stat("motivation"), 10.0);
        assert_eq!(card.base_stat("unknown"), 0.0);
    }

    #[test]
    fn test_rarity_rewards() {
        assert_eq!(Rarity::GrosBodycount.charisme_reward(), 5);
        assert_eq!(Rarity::Interessant.charisme_reward(), 10);
        assert_eq!(Rarity::Banger.charisme_reward(), 20);
        assert_eq!(Rarity::Cheate.charisme_reward(), 40);
    }

    #[test]
    fn test_object_passive_parsing() {
        let mut sword = Card::new(CardId::new(9), "Batte", CardType::Objet);
        sword.passive_effect = Some(r#"{"type":"attack_boost","value":20}"#.to_string());
        let passive = sword.object_passive().unwrap();
        assert_eq!(passive.stat(), Some("attack"));
        assert_eq!(passive.value, 20.0);

        sword.passive_effect = Some("brille dans le noir".to_string());
        assert!(sword.object_passive().is_none());
    }

    #[test]
    fn test_type_specific_stats() {
        let mut lieu = Card::new(CardId::new(1), "Parking", CardType::Lieu);
        lieu.properties.activation_cost = Some(3.0);
        assert_eq!(lieu.type_specific_stats(), vec![("activation_cost", 3.0)]);
        assert!(Card::character(CardId::new(2), "A", 5, 1.0, 1.0)
            .type_specific_stats()
            .is_empty());
    }

    #[test]
    fn test_tag_passive_detection() {
        assert!(!Tag::new(TagId::new(1), "NUIT").has_passive_effect());
        assert!(Tag::new(TagId::new(1), "NUIT")
            .with_passive("+1 attaque")
            .has_passive_effect());
    }
}
