//! Live battlefield entity (`CardInstance`)
//!
//! A card instance is the per-battle mutable state of one card. Its
//! `temporary_stats` are derived, never edited incrementally: every recompute
//! starts again from the card definition, then layers tag-rule effects,
//! alteration deltas and equipped-object passives on top.
//!
//! The tag-rule layer needs the whole roster and the battle state, so the full
//! pass lives on the roster (`EntityStore::<CardInstance>::recalculate_temporary_stats`).
//! An instance on its own can only rebuild the layers it owns
//! ([`CardInstance::refresh_stats`]), reusing the last rule layer it was given.

use crate::core::{
    Alteration, AlterationEffect, AlterationId, Card, CardType, InstanceId, PlayerId, Spell,
    SpellId, Tag, TagId,
};
use crate::{CombatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_MAX_LEVEL: u32 = 10;

/// An alteration attached to an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveAlteration {
    pub alteration: Arc<Alteration>,
    /// Turns left; `None` never expires
    pub remaining_duration: Option<u32>,
    pub stack_count: u32,
    /// Entity that applied it. Not owned, may already have left the battlefield.
    pub source: Option<InstanceId>,
}

impl ActiveAlteration {
    pub fn new(alteration: Arc<Alteration>, source: Option<InstanceId>) -> Self {
        ActiveAlteration {
            remaining_duration: alteration.initial_duration(),
            alteration,
            stack_count: 1,
            source,
        }
    }

    /// Decrement the remaining duration, returning whether the entry survives
    pub(crate) fn tick(&mut self) -> bool {
        match self.remaining_duration.as_mut() {
            Some(turns) => {
                *turns = turns.saturating_sub(1);
                *turns > 0
            }
            None => true,
        }
    }
}

/// Stack-or-insert: a known alteration is never duplicated
pub(crate) fn stack_alteration(
    list: &mut Vec<ActiveAlteration>,
    alteration: Arc<Alteration>,
    source: Option<InstanceId>,
) -> bool {
    match list.iter_mut().find(|a| a.alteration.id == alteration.id) {
        Some(existing) => {
            if alteration.stackable {
                existing.stack_count = existing.stack_count.saturating_add(1);
            }
            existing.remaining_duration = alteration.initial_duration();
            false
        }
        None => {
            list.push(ActiveAlteration::new(alteration, source));
            true
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInstance {
    pub tag: Arc<Tag>,
    pub is_temporary: bool,
    pub remaining_duration: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellInstance {
    pub spell: Arc<Spell>,
    pub cooldown: u32,
    pub is_available: bool,
}

impl SpellInstance {
    pub fn new(spell: Arc<Spell>) -> Self {
        SpellInstance {
            spell,
            cooldown: 0,
            is_available: true,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.is_available && self.cooldown == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Damage,
    Heal,
}

/// One line of the damage/heal audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub amount: u32,
    pub source: Option<InstanceId>,
    pub timestamp: u64,
}

/// Audit record of something folded into `temporary_stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub value: f64,
    pub source: String,
    pub is_percentage: bool,
}

/// Outcome of a damage or heal application
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HealthChange {
    /// Amount after modifiers
    pub amount: u32,
    /// Hook alterations that fired (`on_damage_taken` / `on_heal_received`)
    pub triggered: Vec<AlterationId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquippedObject {
    pub instance: InstanceId,
    pub card: Arc<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSlot {
    /// 1-based
    pub slot_id: u32,
    pub equipped: Option<EquippedObject>,
    pub is_locked: bool,
}

/// Level and experience of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProgress {
    pub level: u32,
    pub max_level: u32,
    pub xp: u32,
    pub xp_to_next: u32,
}

impl CharacterProgress {
    pub fn new(level: u32, max_level: u32, xp: u32) -> Self {
        let level = level.max(1);
        CharacterProgress {
            level,
            max_level: max_level.max(level),
            xp,
            xp_to_next: xp_for_level(level),
        }
    }

    pub fn attack_bonus(&self) -> f64 {
        (2 * (self.level / 2)) as f64
    }

    pub fn defense_bonus(&self) -> f64 {
        (self.level / 3) as f64
    }
}

/// Experience needed to leave `level`
pub fn xp_for_level(level: u32) -> u32 {
    (100.0 * (level as f64 * 1.5).powi(2)).floor() as u32
}

/// Max health of a character with printed health `base` at `level`
pub fn max_health_for_level(base: u32, level: u32) -> u32 {
    let growth = (base as f64 * 0.15).max(5.0);
    (base as f64 + level.saturating_sub(1) as f64 * growth).floor() as u32
}

/// Stats and audit trail after the tag-rule layer of the last full recompute
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RuleLayer {
    stats: BTreeMap<String, f64>,
    effects: BTreeMap<String, Vec<ActiveEffect>>,
}

#[derive(Debug, Clone, Copy)]
struct HealthAnchor {
    bonus: i64,
    current: u32,
}

/// One live battlefield entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: InstanceId,
    pub card: Arc<Card>,
    /// Owning player, which also decides team membership
    pub owner: Option<PlayerId>,

    pub current_health: u32,
    pub max_health: u32,

    pub temporary_stats: BTreeMap<String, f64>,
    pub active_alterations: Vec<ActiveAlteration>,
    pub active_tags: Vec<TagInstance>,
    pub available_spells: Vec<SpellInstance>,

    pub is_exhausted: bool,
    pub is_tapped: bool,
    /// Set by disable-attack rules until the end of the turn
    pub unable_to_attack: bool,

    pub damage_history: Vec<HistoryEntry>,
    pub active_effects: BTreeMap<String, Vec<ActiveEffect>>,

    pub object_slots: Vec<ObjectSlot>,
    pub progress: Option<CharacterProgress>,

    rule_layer: Option<RuleLayer>,
    /// Health granted by tag rules during the last recompute
    rule_health_bonus: i64,
    #[serde(skip)]
    health_anchor: Option<HealthAnchor>,
    history_clock: u64,
}

impl CardInstance {
    pub fn new(id: InstanceId, card: Arc<Card>, owner: Option<PlayerId>) -> Self {
        let progress = card.is_character().then(|| {
            let props = &card.properties;
            CharacterProgress::new(
                props.level.unwrap_or(1),
                props.max_level.unwrap_or(DEFAULT_MAX_LEVEL),
                props.xp.unwrap_or(0),
            )
        });
        let printed_health = card.properties.health.unwrap_or(0);
        let max_health = match progress {
            Some(p) if p.level > 1 => max_health_for_level(printed_health, p.level),
            _ => printed_health,
        };

        let mut instance = CardInstance {
            id,
            card,
            owner,
            current_health: max_health,
            max_health,
            temporary_stats: BTreeMap::new(),
            active_alterations: Vec::new(),
            active_tags: Vec::new(),
            available_spells: Vec::new(),
            is_exhausted: false,
            is_tapped: false,
            unable_to_attack: false,
            damage_history: Vec::new(),
            active_effects: BTreeMap::new(),
            object_slots: Vec::new(),
            progress,
            rule_layer: None,
            rule_health_bonus: 0,
            health_anchor: None,
            history_clock: 0,
        };
        instance.reset_stats_to_base();
        instance
    }

    pub fn name(&self) -> &str {
        &self.card.name
    }

    pub fn card_type(&self) -> CardType {
        self.card.card_type
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    /// Current value of a derived stat (0 when absent)
    pub fn stat(&self, name: &str) -> f64 {
        self.temporary_stats.get(name).copied().unwrap_or(0.0)
    }

    pub fn set_stat(&mut self, name: &str, value: f64) {
        self.temporary_stats.insert(name.to_string(), value);
    }

    pub fn add_to_stat(&mut self, name: &str, delta: f64) -> (f64, f64) {
        let entry = self.temporary_stats.entry(name.to_string()).or_insert(0.0);
        let before = *entry;
        *entry += delta;
        (before, *entry)
    }

    pub fn attack(&self) -> f64 {
        self.stat("attack")
    }

    pub fn defense(&self) -> f64 {
        self.stat("defense")
    }

    /// Base value of a stat: card definition plus level bonus
    pub fn base_stat(&self, name: &str) -> f64 {
        let printed = self.card.base_stat(name);
        match (name, self.progress) {
            ("attack", Some(p)) => printed + p.attack_bonus(),
            ("defense", Some(p)) => printed + p.defense_bonus(),
            _ => printed,
        }
    }

    /// Append an audit entry for something folded into a stat
    pub fn record_effect(&mut self, stat: &str, value: f64, source: impl Into<String>, is_percentage: bool) {
        self.active_effects
            .entry(stat.to_string())
            .or_default()
            .push(ActiveEffect {
                value,
                source: source.into(),
                is_percentage,
            });
    }

    /// Layer 1: discard every derived value and reseed from the definition
    fn reset_stats_to_base(&mut self) {
        self.temporary_stats.clear();
        self.active_effects.clear();
        for (key, value) in &self.card.properties.extra {
            self.temporary_stats.insert(key.clone(), *value);
        }
        let attack = self.base_stat("attack");
        let defense = self.base_stat("defense");
        self.temporary_stats.insert("attack".to_string(), attack);
        self.temporary_stats.insert("defense".to_string(), defense);
        for (key, value) in self.card.type_specific_stats() {
            self.temporary_stats.insert(key.to_string(), value);
        }
    }

    /// Layer 3: replay alteration stat deltas, scaled by stack count
    fn apply_alteration_deltas(&mut self) {
        let mut deltas = Vec::new();
        for active in &self.active_alterations {
            if let AlterationEffect::ModifyStat {
                stat,
                value,
                is_percentage,
            } = &active.alteration.effect
            {
                let per_stack = if *is_percentage {
                    self.base_stat(stat) * value / 100.0
                } else {
                    *value
                };
                let stacks = active.stack_count as f64;
                deltas.push((
                    stat.clone(),
                    per_stack * stacks,
                    *value * stacks,
                    *is_percentage,
                    format!("Alteration: {}", active.alteration.name),
                ));
            }
        }
        for (stat, delta, audit_value, is_percentage, label) in deltas {
            self.add_to_stat(&stat, delta);
            self.record_effect(&stat, audit_value, label, is_percentage);
        }
    }

    /// Layer 4: equipped object passives, as a percentage of base
    fn apply_object_passives(&mut self) {
        let mut boosts = Vec::new();
        for slot in &self.object_slots {
            let Some(equipped) = &slot.equipped else {
                continue;
            };
            let Some(passive) = equipped.card.object_passive() else {
                continue;
            };
            if let Some(stat) = passive.stat() {
                boosts.push((
                    stat.to_string(),
                    passive.value,
                    format!("Objet: {}", equipped.card.name),
                ));
            }
        }
        for (stat, percent, label) in boosts {
            let delta = self.base_stat(&stat) * percent / 100.0;
            self.add_to_stat(&stat, delta);
            self.record_effect(&stat, percent, label, true);
        }
    }

    /// Rebuild the layers this instance owns, keeping the last rule layer
    pub fn refresh_stats(&mut self) {
        match &self.rule_layer {
            Some(layer) => {
                self.temporary_stats = layer.stats.clone();
                self.active_effects = layer.effects.clone();
            }
            None => self.reset_stats_to_base(),
        }
        self.apply_alteration_deltas();
        self.apply_object_passives();
    }

    /// Start a full recompute: back to base, rule health bonus stripped
    pub(crate) fn begin_recalculation(&mut self) {
        let bonus = std::mem::take(&mut self.rule_health_bonus);
        self.health_anchor = Some(HealthAnchor {
            bonus,
            current: self.current_health,
        });
        if bonus != 0 {
            let max = (self.max_health as i64 - bonus).max(0);
            self.max_health = max as u32;
            self.current_health = (self.current_health as i64 - bonus).clamp(0, max) as u32;
        }
        self.rule_layer = None;
        self.reset_stats_to_base();
    }

    /// Finish a full recompute once the tag rules have run
    pub(crate) fn finish_recalculation(&mut self) {
        if let Some(anchor) = self.health_anchor.take() {
            // Same rule health as before: the recompute must not move health
            if anchor.bonus == self.rule_health_bonus {
                self.current_health = anchor.current.min(self.max_health);
            }
        }
        self.rule_layer = Some(RuleLayer {
            stats: self.temporary_stats.clone(),
            effects: self.active_effects.clone(),
        });
        self.apply_alteration_deltas();
        self.apply_object_passives();
    }

    /// Move max and current health together (tag health modifiers)
    pub(crate) fn apply_health_bonus(&mut self, delta: i64) {
        let max = (self.max_health as i64 + delta).max(0);
        let applied = max - self.max_health as i64;
        self.max_health = max as u32;
        self.current_health = (self.current_health as i64 + applied).clamp(0, max) as u32;
        self.rule_health_bonus += applied;
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    fn modified_amount(&self, amount: f64, incoming_damage: bool) -> f64 {
        let mut modified = amount;
        for active in &self.active_alterations {
            match (&active.alteration.effect, incoming_damage) {
                (AlterationEffect::ModifyDamageTaken { value, multiply }, true)
                | (AlterationEffect::ModifyHealingReceived { value, multiply }, false) => {
                    if *multiply {
                        modified *= value;
                    } else {
                        modified += value;
                    }
                }
                _ => {}
            }
        }
        modified.max(0.0)
    }

    fn fired_hooks(&self, incoming_damage: bool) -> Vec<AlterationId> {
        self.active_alterations
            .iter()
            .filter(|active| match active.alteration.effect {
                AlterationEffect::OnDamageTaken => incoming_damage,
                AlterationEffect::OnHealReceived => !incoming_damage,
                _ => false,
            })
            .map(|active| active.alteration.id)
            .collect()
    }

    fn push_history(&mut self, kind: HistoryKind, amount: u32, source: Option<InstanceId>) {
        self.history_clock += 1;
        self.damage_history.push(HistoryEntry {
            kind,
            amount,
            source,
            timestamp: self.history_clock,
        });
    }

    /// Apply damage after damage-taken modifiers, floored at 0 health
    pub fn apply_damage(&mut self, amount: f64, source: Option<InstanceId>) -> HealthChange {
        let applied = self.modified_amount(amount, true).round() as u32;
        self.current_health = self.current_health.saturating_sub(applied);
        self.push_history(HistoryKind::Damage, applied, source);
        HealthChange {
            amount: applied,
            triggered: self.fired_hooks(true),
        }
    }

    /// Heal after healing-received modifiers, capped at max health
    pub fn heal(&mut self, amount: f64, source: Option<InstanceId>) -> HealthChange {
        let applied = self.modified_amount(amount, false).round() as u32;
        self.current_health = self.current_health.saturating_add(applied).min(self.max_health);
        self.push_history(HistoryKind::Heal, applied, source);
        HealthChange {
            amount: applied,
            triggered: self.fired_hooks(false),
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.current_health == 0
    }

    pub fn health_percentage(&self) -> f64 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.current_health as f64 * 100.0 / self.max_health as f64
    }

    // ------------------------------------------------------------------
    // Alterations and tags
    // ------------------------------------------------------------------

    /// Attach an alteration (stack-or-insert) and recompute owned layers
    pub fn add_alteration(&mut self, alteration: Arc<Alteration>, source: Option<InstanceId>) {
        self.attach_alteration(alteration, source);
        self.refresh_stats();
    }

    /// Attach without recomputing; the caller runs the recompute
    pub(crate) fn attach_alteration(&mut self, alteration: Arc<Alteration>, source: Option<InstanceId>) -> bool {
        stack_alteration(&mut self.active_alterations, alteration, source)
    }

    pub fn remove_alteration(&mut self, alteration_id: AlterationId) -> bool {
        let before = self.active_alterations.len();
        self.active_alterations
            .retain(|a| a.alteration.id != alteration_id);
        let removed = self.active_alterations.len() != before;
        if removed {
            self.refresh_stats();
        }
        removed
    }

    pub fn has_alteration(&self, alteration_id: AlterationId) -> bool {
        self.active_alterations
            .iter()
            .any(|a| a.alteration.id == alteration_id)
    }

    pub fn alteration(&self, alteration_id: AlterationId) -> Option<&ActiveAlteration> {
        self.active_alterations
            .iter()
            .find(|a| a.alteration.id == alteration_id)
    }

    /// Whether `source` attached this alteration
    pub fn has_alteration_from(&self, alteration_id: AlterationId, source: InstanceId) -> bool {
        self.alteration(alteration_id)
            .is_some_and(|a| a.source == Some(source))
    }

    /// Add a tag once; returns false if the tag was already present
    ///
    /// A passive tag drops the cached rule layer. Only a full recompute
    /// (`CombatManager::add_tag`) re-runs the tag rules.
    pub fn add_tag(&mut self, tag: Arc<Tag>, is_temporary: bool, duration: Option<u32>) -> bool {
        if self.has_tag(tag.id) {
            return false;
        }
        let passive = tag.has_passive_effect();
        self.active_tags.push(TagInstance {
            tag,
            is_temporary,
            remaining_duration: duration,
        });
        if passive {
            self.rule_layer = None;
            self.refresh_stats();
        }
        true
    }

    pub fn remove_tag(&mut self, tag_id: TagId) -> bool {
        let Some(pos) = self.active_tags.iter().position(|t| t.tag.id == tag_id) else {
            return false;
        };
        let removed = self.active_tags.remove(pos);
        if removed.tag.has_passive_effect() {
            self.rule_layer = None;
            self.refresh_stats();
        }
        true
    }

    pub fn has_tag(&self, tag_id: TagId) -> bool {
        self.active_tags.iter().any(|t| t.tag.id == tag_id)
    }

    pub fn has_tag_named(&self, name: &str) -> bool {
        self.active_tags.iter().any(|t| t.tag.name == name)
    }

    /// Tag names in storage order
    pub fn tag_names(&self) -> Vec<String> {
        self.active_tags.iter().map(|t| t.tag.name.clone()).collect()
    }

    // ------------------------------------------------------------------
    // Spells and turn state
    // ------------------------------------------------------------------

    pub fn add_spell(&mut self, spell: Arc<Spell>) {
        if self.spell(spell.id).is_none() {
            self.available_spells.push(SpellInstance::new(spell));
        }
    }

    pub fn spell(&self, spell_id: SpellId) -> Option<&SpellInstance> {
        self.available_spells.iter().find(|s| s.spell.id == spell_id)
    }

    pub fn can_use_spell(&self, spell_id: SpellId) -> bool {
        self.spell(spell_id).is_some_and(SpellInstance::is_usable)
    }

    /// Put a spell on cooldown after it was cast
    pub fn start_cooldown(&mut self, spell_id: SpellId) -> Result<()> {
        let id = self.id;
        let instance = self
            .available_spells
            .iter_mut()
            .find(|s| s.spell.id == spell_id)
            .ok_or_else(|| {
                CombatError::InvalidAction(format!("instance {id} does not know spell {spell_id}"))
            })?;
        instance.cooldown = instance.spell.cooldown_turns();
        instance.is_available = instance.cooldown == 0;
        Ok(())
    }

    pub fn can_attack(&self) -> bool {
        !self.is_exhausted && !self.is_tapped && !self.unable_to_attack && self.current_health > 0
    }

    /// End-of-turn bookkeeping. Returns true if stats were recomputed.
    pub fn reset_for_next_turn(&mut self) -> bool {
        self.is_exhausted = false;
        self.is_tapped = false;
        self.unable_to_attack = false;

        let alterations_before = self.active_alterations.len();
        self.active_alterations.retain_mut(ActiveAlteration::tick);

        let tags_before = self.active_tags.len();
        self.active_tags.retain_mut(|t| {
            if !t.is_temporary {
                return true;
            }
            match t.remaining_duration.as_mut() {
                Some(turns) => {
                    *turns = turns.saturating_sub(1);
                    *turns > 0
                }
                None => true,
            }
        });

        for spell in &mut self.available_spells {
            spell.cooldown = spell.cooldown.saturating_sub(1);
            spell.is_available = spell.cooldown == 0;
        }

        let shrank = self.active_alterations.len() < alterations_before
            || self.active_tags.len() < tags_before;
        if shrank {
            self.refresh_stats();
        }
        shrank
    }

    /// Fire periodic alteration effects once, scaled by stack count
    pub fn apply_alteration_effects(&mut self) -> Vec<HealthChange> {
        let periodic: Vec<(bool, f64, Option<InstanceId>)> = self
            .active_alterations
            .iter()
            .filter_map(|active| {
                let stacks = active.stack_count as f64;
                match active.alteration.effect {
                    AlterationEffect::DamageOverTime { value } => Some((true, value * stacks, active.source)),
                    AlterationEffect::HealOverTime { value } => Some((false, value * stacks, active.source)),
                    _ => None,
                }
            })
            .collect();

        periodic
            .into_iter()
            .map(|(is_damage, amount, source)| {
                if is_damage {
                    self.apply_damage(amount, source)
                } else {
                    self.heal(amount, source)
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Object slots
    // ------------------------------------------------------------------

    pub fn init_object_slots(&mut self, count: u32) {
        self.object_slots = (1..=count)
            .map(|slot_id| ObjectSlot {
                slot_id,
                equipped: None,
                is_locked: false,
            })
            .collect();
    }

    /// Equip an object card into `slot_id`, or the first free slot
    pub fn equip_object(&mut self, object: &CardInstance, slot_id: Option<u32>) -> Result<u32> {
        if object.card_type() != CardType::Objet {
            return Err(CombatError::InvalidAction(format!(
                "{} is not an object card",
                object.name()
            )));
        }
        let slot = match slot_id {
            Some(wanted) => {
                let slot = self
                    .object_slots
                    .iter_mut()
                    .find(|s| s.slot_id == wanted)
                    .ok_or_else(|| CombatError::SlotUnavailable(format!("slot {wanted} does not exist")))?;
                if slot.is_locked {
                    return Err(CombatError::SlotUnavailable(format!("slot {wanted} is locked")));
                }
                if slot.equipped.is_some() {
                    return Err(CombatError::SlotUnavailable(format!("slot {wanted} is occupied")));
                }
                slot
            }
            None => self
                .object_slots
                .iter_mut()
                .find(|s| !s.is_locked && s.equipped.is_none())
                .ok_or_else(|| CombatError::SlotUnavailable(format!("{} has no free slot", self.card.name)))?,
        };
        slot.equipped = Some(EquippedObject {
            instance: object.id,
            card: Arc::clone(&object.card),
        });
        let used = slot.slot_id;
        self.refresh_stats();
        Ok(used)
    }

    pub fn unequip_object(&mut self, slot_id: u32) -> Result<InstanceId> {
        let slot = self
            .object_slots
            .iter_mut()
            .find(|s| s.slot_id == slot_id)
            .ok_or_else(|| CombatError::SlotUnavailable(format!("slot {slot_id} does not exist")))?;
        if slot.is_locked {
            return Err(CombatError::SlotUnavailable(format!("slot {slot_id} is locked")));
        }
        let equipped = slot
            .equipped
            .take()
            .ok_or_else(|| CombatError::SlotUnavailable(format!("slot {slot_id} is empty")))?;
        self.refresh_stats();
        Ok(equipped.instance)
    }

    pub fn set_slot_locked(&mut self, slot_id: u32, locked: bool) -> Result<()> {
        let slot = self
            .object_slots
            .iter_mut()
            .find(|s| s.slot_id == slot_id)
            .ok_or_else(|| CombatError::SlotUnavailable(format!("slot {slot_id} does not exist")))?;
        slot.is_locked = locked;
        Ok(())
    }

    pub fn lock_slot(&mut self, slot_id: u32) -> Result<()> {
        self.set_slot_locked(slot_id, true)
    }

    pub fn unlock_slot(&mut self, slot_id: u32) -> Result<()> {
        self.set_slot_locked(slot_id, false)
    }

    pub fn equipped_objects(&self) -> Vec<InstanceId> {
        self.object_slots
            .iter()
            .filter_map(|s| s.equipped.as_ref().map(|e| e.instance))
            .collect()
    }

    pub fn has_available_object_slot(&self) -> bool {
        self.object_slots
            .iter()
            .any(|s| !s.is_locked && s.equipped.is_none())
    }

    // ------------------------------------------------------------------
    // Progression
    // ------------------------------------------------------------------

    /// Grant experience; returns the number of levels gained
    pub fn add_experience(&mut self, xp: u32) -> u32 {
        let Some(progress) = self.progress.as_mut() else {
            return 0;
        };
        progress.xp = progress.xp.saturating_add(xp);
        let mut gained = 0;
        loop {
            let Some(p) = self.progress else { break };
            if p.level >= p.max_level || p.xp < p.xp_to_next {
                break;
            }
            if let Some(p) = self.progress.as_mut() {
                p.xp -= p.xp_to_next;
            }
            if !self.level_up() {
                break;
            }
            gained += 1;
        }
        gained
    }

    /// Raise the level by one, keeping the current health percentage
    pub fn level_up(&mut self) -> bool {
        let Some(progress) = self.progress.as_mut() else {
            return false;
        };
        if progress.level >= progress.max_level {
            return false;
        }
        progress.level += 1;
        progress.xp_to_next = xp_for_level(progress.level);
        let level = progress.level;

        let ratio = if self.max_health == 0 {
            1.0
        } else {
            self.current_health as f64 / self.max_health as f64
        };
        let printed = self.card.properties.health.unwrap_or(0);
        self.max_health = (max_health_for_level(printed, level) as i64 + self.rule_health_bonus).max(0) as u32;
        self.current_health = ((self.max_health as f64 * ratio).round() as u32).min(self.max_health);
        if let Some(layer) = self.rule_layer.as_mut() {
            // Level bonuses sit under the rule layer
            if level % 2 == 0 {
                *layer.stats.entry("attack".to_string()).or_insert(0.0) += 2.0;
            }
            if level % 3 == 0 {
                *layer.stats.entry("defense".to_string()).or_insert(0.0) += 1.0;
            }
        }
        self.refresh_stats();
        true
    }

    pub fn level(&self) -> Option<u32> {
        self.progress.map(|p| p.level)
    }
}
