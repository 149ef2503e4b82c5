//! Turning catalog cards into battlefield instances

use crate::config::BattleConfig;
use crate::core::{Card, CardInstance, InstanceId, PlayerId, Spell, Tag};
use std::sync::Arc;

/// One card to convert, with the tags and spells it enters play with
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub card: Arc<Card>,
    pub owner: Option<PlayerId>,
    pub tags: Vec<Arc<Tag>>,
    pub spells: Vec<Arc<Spell>>,
}

impl ConversionRequest {
    pub fn new(card: Arc<Card>, owner: Option<PlayerId>) -> Self {
        ConversionRequest {
            card,
            owner,
            tags: Vec::new(),
            spells: Vec::new(),
        }
    }
}

/// Build a fresh instance of `card`
///
/// The instance id is a placeholder until the roster assigns one
/// (`CombatManager::add_instance`). Tags are permanent, spells start off
/// cooldown, and characters get `max_object_slots` empty slots.
pub fn convert_card_to_instance(
    card: Arc<Card>,
    owner: Option<PlayerId>,
    tags: &[Arc<Tag>],
    spells: &[Arc<Spell>],
    config: &BattleConfig,
) -> CardInstance {
    let is_character = card.is_character();
    let mut instance = CardInstance::new(InstanceId::new(0), card, owner);
    for tag in tags {
        instance.add_tag(Arc::clone(tag), false, None);
    }
    for spell in spells {
        instance.add_spell(Arc::clone(spell));
    }
    if is_character {
        instance.init_object_slots(config.max_object_slots);
    }
    if let Some(progress) = instance.progress.as_mut() {
        progress.max_level = progress.max_level.min(config.max_level).max(progress.level);
    }
    instance.refresh_stats();
    instance
}

pub fn batch_convert(
    requests: impl IntoIterator<Item = ConversionRequest>,
    config: &BattleConfig,
) -> Vec<CardInstance> {
    requests
        .into_iter()
        .map(|req| convert_card_to_instance(req.card, req.owner, &req.tags, &req.spells, config))
        .collect()
}

/// Return instances to their fresh state after a battle
pub fn cleanup_card_instances(instances: &mut [CardInstance]) {
    for instance in instances {
        instance.active_alterations.clear();
        instance.is_exhausted = false;
        instance.is_tapped = false;
        instance.unable_to_attack = false;
        instance.damage_history.clear();
        instance.current_health = instance.max_health;
        instance.refresh_stats();
    }
}
