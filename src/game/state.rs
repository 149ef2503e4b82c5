//! Battle state shared with the tag-rule engine
//!
//! `BattleState` holds everything a rule may read or mutate besides the
//! roster itself: players and their resources, the alteration catalog rules
//! look alterations up in, and the lieu board.

use crate::core::{Alteration, AlterationId, CardInstance, EntityStore, InstanceId, Player, PlayerId};
use crate::game::lieu::LieuBoard;
use crate::rules::{TagRuleApplicationResult, TagRuleRegistry};
use crate::{CombatError, Result};
use rand::RngCore;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Live battlefield entities in insertion order
pub type Roster = EntityStore<CardInstance>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleState {
    /// Players in seat order (Vec for stable ordering, small count)
    pub players: Vec<Player>,
    /// Alterations that rules and spells can apply, by id
    pub alterations: FxHashMap<AlterationId, Arc<Alteration>>,
    pub lieux: LieuBoard,
    pub turn: u32,
}

impl BattleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(CombatError::PlayerNotFound(id.as_u32()))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(CombatError::PlayerNotFound(id.as_u32()))
    }

    /// First other player in seat order
    pub fn opponent_of(&self, id: PlayerId) -> Option<PlayerId> {
        self.players.iter().map(|p| p.id).find(|other| *other != id)
    }

    pub fn register_alteration(&mut self, alteration: Alteration) -> Arc<Alteration> {
        let alteration = Arc::new(alteration);
        self.alterations.insert(alteration.id, Arc::clone(&alteration));
        alteration
    }

    pub fn alteration(&self, id: AlterationId) -> Option<Arc<Alteration>> {
        self.alterations.get(&id).cloned()
    }

    pub fn active_lieu_name(&self) -> Option<&str> {
        self.lieux.active_name()
    }
}

impl EntityStore<CardInstance> {
    /// Full stat recompute for one entity
    ///
    /// Back to definition base, then every tag's rules in tag storage order
    /// with this entity as source, then alteration deltas and object
    /// passives. Rules that target other entities mutate them directly.
    pub fn recalculate_temporary_stats(
        &mut self,
        id: InstanceId,
        rules: &TagRuleRegistry,
        state: &mut BattleState,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<TagRuleApplicationResult>> {
        let tags = {
            let entity = self.get_mut(id)?;
            entity.begin_recalculation();
            entity.tag_names()
        };

        let mut results = Vec::new();
        for tag in &tags {
            results.extend(rules.apply_tag_rules(tag, id, self, state, rng));
        }

        self.get_mut(id)?.finish_recalculation();
        Ok(results)
    }

    /// Entities whose health reached 0
    pub fn defeated(&self) -> Vec<InstanceId> {
        self.iter()
            .filter(|(_, entity)| entity.is_defeated())
            .map(|(id, _)| id)
            .collect()
    }
}
