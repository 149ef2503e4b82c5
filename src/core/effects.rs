//! Spell and alteration definitions

use crate::core::{AlterationId, Rarity, SpellId, TagId};
use serde::{Deserialize, Serialize};

/// How a spell effect picks its targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpellTargetType {
    #[serde(rename = "self")]
    SelfTarget,
    #[default]
    Opponent,
    All,
    Tagged,
    Random,
    Manual,
}

/// Kind of a spell effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellEffectKind {
    Damage,
    Heal,
    ApplyAlteration,
    Status,
    Draw,
    Resource,
    Special,
}

/// Eligibility filter for manually selected targets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetCriteria {
    pub by_tag: Vec<TagId>,
    pub by_rarity: Vec<Rarity>,
    pub by_health_percent: Option<HealthPercentRange>,
    pub exclude_tags: Vec<TagId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthPercentRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// One effect of a spell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellEffect {
    #[serde(rename = "type")]
    pub kind: SpellEffectKind,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub target_type: SpellTargetType,
    /// Tag filter for `tagged` targeting
    #[serde(default)]
    pub tag_target: Option<TagId>,
    /// Alteration applied by an `apply_alteration` effect
    #[serde(default)]
    pub alteration: Option<AlterationId>,
    /// Percentage chance to apply, always applies when absent
    #[serde(default)]
    pub chance: Option<f64>,
    #[serde(default)]
    pub duration: Option<u32>,
    /// Number of targets for `random` and `manual` targeting
    #[serde(default)]
    pub target_count: Option<usize>,
    #[serde(default)]
    pub criteria: Option<TargetCriteria>,
}

impl SpellEffect {
    pub fn new(kind: SpellEffectKind, value: f64, target_type: SpellTargetType) -> Self {
        SpellEffect {
            kind,
            value,
            target_type,
            tag_target: None,
            alteration: None,
            chance: None,
            duration: None,
            target_count: None,
            criteria: None,
        }
    }

    pub fn apply_alteration(alteration: AlterationId, target_type: SpellTargetType) -> Self {
        let mut effect = SpellEffect::new(SpellEffectKind::ApplyAlteration, 0.0, target_type);
        effect.alteration = Some(alteration);
        effect
    }
}

/// A spell definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub id: SpellId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub power: f64,
    /// Motivation cost, checked against the caster's pool during conflict detection
    #[serde(default)]
    pub cost: Option<f64>,
    /// Turns before the spell can be cast again (1 when absent)
    #[serde(default)]
    pub cooldown: Option<u32>,
    #[serde(default)]
    pub effects: Vec<SpellEffect>,
}

impl Spell {
    pub fn new(id: SpellId, name: impl Into<String>) -> Self {
        Spell {
            id,
            name: name.into(),
            description: None,
            power: 0.0,
            cost: None,
            cooldown: None,
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: SpellEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn has_alteration_effect(&self) -> bool {
        self.effects
            .iter()
            .any(|e| e.kind == SpellEffectKind::ApplyAlteration)
    }

    pub fn cooldown_turns(&self) -> u32 {
        self.cooldown.unwrap_or(1)
    }
}

/// Broad category of an alteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlterationKind {
    Buff,
    Debuff,
    #[default]
    Status,
    Other,
}

/// What an alteration does while active
///
/// Stat deltas are replayed on every recompute. Periodic effects fire from
/// `apply_alteration_effects`. Damage and healing modifiers filter incoming
/// amounts. Hooks fire after damage or healing lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AlterationEffect {
    ModifyStat {
        stat: String,
        value: f64,
        #[serde(default)]
        is_percentage: bool,
    },
    DamageOverTime {
        value: f64,
    },
    HealOverTime {
        value: f64,
    },
    ModifyDamageTaken {
        value: f64,
        #[serde(default)]
        multiply: bool,
    },
    ModifyHealingReceived {
        value: f64,
        #[serde(default)]
        multiply: bool,
    },
    OnDamageTaken,
    OnHealReceived,
}

impl AlterationEffect {
    pub fn modify_attack(value: f64) -> Self {
        AlterationEffect::ModifyStat {
            stat: "attack".to_string(),
            value,
            is_percentage: false,
        }
    }

    pub fn modify_defense(value: f64) -> Self {
        AlterationEffect::ModifyStat {
            stat: "defense".to_string(),
            value,
            is_percentage: false,
        }
    }
}

/// An alteration definition (buff, debuff, status)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alteration {
    pub id: AlterationId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub effect: AlterationEffect,
    /// Turns the alteration lasts; absent or zero means permanent
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub unique_effect: bool,
    #[serde(default, rename = "type")]
    pub kind: AlterationKind,
}

impl Alteration {
    pub fn new(id: AlterationId, name: impl Into<String>, effect: AlterationEffect) -> Self {
        Alteration {
            id,
            name: name.into(),
            description: None,
            effect,
            duration: None,
            stackable: false,
            unique_effect: false,
            kind: AlterationKind::default(),
        }
    }

    pub fn with_duration(mut self, turns: u32) -> Self {
        self.duration = Some(turns);
        self
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    /// Remaining duration for a fresh application (`None` is permanent)
    pub fn initial_duration(&self) -> Option<u32> {
        self.duration.filter(|turns| *turns > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alteration_effect_json_shape() {
        let json = r#"{"id": 2, "name": "Poison", "effect": {"action": "damage_over_time", "value": 2},
                       "duration": 3, "stackable": true, "type": "debuff"}"#;
        let alteration: Alteration = serde_json::from_str(json).unwrap();
        assert_eq!(alteration.effect, AlterationEffect::DamageOverTime { value: 2.0 });
        assert_eq!(alteration.kind, AlterationKind::Debuff);
        assert_eq!(alteration.initial_duration(), Some(3));
    }

    #[test]
    fn test_zero_duration_is_permanent() {
        let alteration =
            Alteration::new(AlterationId::new(1), "Aura", AlterationEffect::OnDamageTaken).with_duration(0);
        assert_eq!(alteration.initial_duration(), None);
    }

    #[test]
    fn test_spell_alteration_detection() {
        let plain = Spell::new(SpellId::new(1), "Gifle")
            .with_effect(SpellEffect::new(SpellEffectKind::Damage, 3.0, SpellTargetType::Opponent));
        assert!(!plain.has_alteration_effect());
        assert_eq!(plain.cooldown_turns(), 1);

        let cursed = plain.with_effect(SpellEffect::apply_alteration(
            AlterationId::new(4),
            SpellTargetType::Opponent,
        ));
        assert!(cursed.has_alteration_effect());
    }

    #[test]
    fn test_spell_effect_defaults() {
        let effect: SpellEffect = serde_json::from_str(r#"{"type": "heal", "value": 4}"#).unwrap();
        assert_eq!(effect.target_type, SpellTargetType::Opponent);
        assert!(effect.tag_target.is_none());

        let effect: SpellEffect =
            serde_json::from_str(r#"{"type": "damage", "target_type": "self"}"#).unwrap();
        assert_eq!(effect.target_type, SpellTargetType::SelfTarget);
    }
}
