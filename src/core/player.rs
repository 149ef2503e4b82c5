//! Players, their resources and their base

use crate::core::instance::{stack_alteration, ActiveAlteration};
use crate::core::{Alteration, AlterationEffect, AlterationId, InstanceId, PlayerId};
use crate::{CombatError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_BASE_HEALTH: u32 = 100;
pub const DEFAULT_MOTIVATION: u32 = 10;
pub const DEFAULT_MAX_CHARISME: u32 = 100;

/// Modifier applied when motivation is renewed at the start of a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotivationModifier {
    pub value: f64,
    pub is_percentage: bool,
    pub source: String,
}

/// A player's base, attackable once all their characters have fallen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBase {
    pub max_health: u32,
    pub current_health: u32,
    pub active_alterations: Vec<ActiveAlteration>,
}

impl PlayerBase {
    pub fn new(max_health: u32) -> Self {
        PlayerBase {
            max_health,
            current_health: max_health,
            active_alterations: Vec::new(),
        }
    }

    /// Apply already-reduced damage; returns the amount removed
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.current_health);
        self.current_health -= removed;
        removed
    }

    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.current_health;
        self.current_health = self.current_health.saturating_add(amount).min(self.max_health);
        self.current_health - before
    }

    pub fn add_alteration(&mut self, alteration: Arc<Alteration>, source: Option<InstanceId>) {
        stack_alteration(&mut self.active_alterations, alteration, source);
    }

    pub fn remove_alteration(&mut self, alteration_id: AlterationId) -> bool {
        let before = self.active_alterations.len();
        self.active_alterations.retain(|a| a.alteration.id != alteration_id);
        self.active_alterations.len() != before
    }

    pub fn has_alteration(&self, alteration_id: AlterationId) -> bool {
        self.active_alterations.iter().any(|a| a.alteration.id == alteration_id)
    }

    /// Periodic damage and healing on the base
    pub fn apply_alteration_effects(&mut self) {
        let periodic: Vec<(bool, u32)> = self
            .active_alterations
            .iter()
            .filter_map(|active| {
                let stacks = active.stack_count as f64;
                match active.alteration.effect {
                    AlterationEffect::DamageOverTime { value } => Some((true, (value * stacks).round() as u32)),
                    AlterationEffect::HealOverTime { value } => Some((false, (value * stacks).round() as u32)),
                    _ => None,
                }
            })
            .collect();
        for (is_damage, amount) in periodic {
            if is_damage {
                self.apply_damage(amount);
            } else {
                self.heal(amount);
            }
        }
    }

    pub fn reset_for_next_turn(&mut self) {
        self.active_alterations.retain_mut(ActiveAlteration::tick);
    }

    pub fn is_destroyed(&self) -> bool {
        self.current_health == 0
    }
}

/// A player taking part in a battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,

    pub charisme: u32,
    pub max_charisme: u32,
    /// Multiplier on charisme gains, adjusted by tag rules
    pub charisme_generation_modifier: f64,

    pub motivation: u32,
    pub base_motivation: u32,
    /// Multiplier on renewed motivation, adjusted by tag rules
    pub motivation_modifier: f64,
    pub motivation_modifiers: Vec<MotivationModifier>,

    /// Characters on the battlefield
    pub characters: Vec<InstanceId>,
    pub base: PlayerBase,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Player {
            id,
            name: name.into(),
            charisme: 0,
            max_charisme: DEFAULT_MAX_CHARISME,
            charisme_generation_modifier: 1.0,
            motivation: DEFAULT_MOTIVATION,
            base_motivation: DEFAULT_MOTIVATION,
            motivation_modifier: 1.0,
            motivation_modifiers: Vec::new(),
            characters: Vec::new(),
            base: PlayerBase::new(DEFAULT_BASE_HEALTH),
        }
    }

    pub fn with_charisme(mut self, charisme: u32) -> Self {
        self.charisme = charisme.min(self.max_charisme);
        self
    }

    pub fn with_motivation(mut self, motivation: u32) -> Self {
        self.motivation = motivation;
        self.base_motivation = motivation;
        self
    }

    pub fn with_base_health(mut self, max_health: u32) -> Self {
        self.base = PlayerBase::new(max_health);
        self
    }

    pub fn spend_charisme(&mut self, amount: u32) -> Result<()> {
        if self.charisme < amount {
            return Err(CombatError::InsufficientCharisme {
                needed: amount,
                available: self.charisme,
            });
        }
        self.charisme -= amount;
        Ok(())
    }

    /// Gain charisme through the generation modifier, capped; returns the amount gained
    pub fn gain_charisme(&mut self, amount: u32) -> u32 {
        let scaled = (amount as f64 * self.charisme_generation_modifier).floor().max(0.0) as u32;
        let before = self.charisme;
        self.charisme = self.charisme.saturating_add(scaled).min(self.max_charisme);
        self.charisme - before
    }

    pub fn consume_motivation(&mut self, amount: u32) -> Result<()> {
        if self.motivation < amount {
            return Err(CombatError::InsufficientMotivation {
                needed: amount,
                available: self.motivation,
            });
        }
        self.motivation -= amount;
        Ok(())
    }

    pub fn add_motivation(&mut self, amount: u32) {
        self.motivation = self.motivation.saturating_add(amount);
    }

    /// Refill motivation: base, then absolute modifiers, then percentages
    pub fn renew_motivation(&mut self) -> u32 {
        let mut total = self.base_motivation as f64;
        for modifier in self.motivation_modifiers.iter().filter(|m| !m.is_percentage) {
            total += modifier.value;
        }
        for modifier in self.motivation_modifiers.iter().filter(|m| m.is_percentage) {
            total *= 1.0 + modifier.value / 100.0;
        }
        total *= self.motivation_modifier;
        self.motivation = total.round().max(0.0) as u32;
        self.motivation
    }

    pub fn add_motivation_modifier(&mut self, value: f64, is_percentage: bool, source: impl Into<String>) {
        self.motivation_modifiers.push(MotivationModifier {
            value,
            is_percentage,
            source: source.into(),
        });
    }

    pub fn remove_character(&mut self, id: InstanceId) -> bool {
        let before = self.characters.len();
        self.characters.retain(|c| *c != id);
        self.characters.len() != before
    }

    pub fn has_lost(&self) -> bool {
        self.base.is_destroyed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charisme_spend_and_gain() {
        let mut player = Player::new(PlayerId::new(1), "Alice").with_charisme(20);
        player.spend_charisme(15).unwrap();
        assert_eq!(player.charisme, 5);
        assert!(matches!(
            player.spend_charisme(6),
            Err(CombatError::InsufficientCharisme { needed: 6, available: 5 })
        ));

        player.charisme_generation_modifier = 1.5;
        assert_eq!(player.gain_charisme(10), 15);
        assert_eq!(player.charisme, 20);

        player.gain_charisme(500);
        assert_eq!(player.charisme, DEFAULT_MAX_CHARISME);
    }

    #[test]
    fn test_motivation_renewal_order() {
        let mut player = Player::new(PlayerId::new(1), "Bob");
        player.add_motivation_modifier(50.0, true, "Tag: MOTIVE");
        player.add_motivation_modifier(2.0, false, "Objet");
        // (10 + 2) * 1.5
        assert_eq!(player.renew_motivation(), 18);

        player.consume_motivation(18).unwrap();
        assert!(player.consume_motivation(1).is_err());
    }

    #[test]
    fn test_motivation_never_negative() {
        let mut player = Player::new(PlayerId::new(1), "Bob");
        player.add_motivation_modifier(-50.0, false, "Fatigue");
        assert_eq!(player.renew_motivation(), 0);
    }

    #[test]
    fn test_base_damage_and_destruction() {
        let mut player = Player::new(PlayerId::new(2), "Carol").with_base_health(30);
        assert_eq!(player.base.apply_damage(12), 12);
        assert_eq!(player.base.heal(50), 12);
        assert_eq!(player.base.apply_damage(99), 30);
        assert!(player.has_lost());
    }

    #[test]
    fn test_base_alterations_tick() {
        let mut base = PlayerBase::new(20);
        let burn = Arc::new(
            Alteration::new(AlterationId::new(1), "Incendie", AlterationEffect::DamageOverTime { value: 3.0 })
                .with_duration(2),
        );
        base.add_alteration(burn, None);
        base.apply_alteration_effects();
        base.reset_for_next_turn();
        base.apply_alteration_effects();
        base.reset_for_next_turn();
        assert_eq!(base.current_health, 14);
        assert!(!base.has_alteration(AlterationId::new(1)));
    }
}
