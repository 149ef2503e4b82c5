//! Lieu (location) cards shared by both sides
//!
//! At battle setup each player contributes lieu cards to a common pool. One
//! card of the pool is active at a time; rules gated on `activeLieu` read its
//! name.

use crate::core::{CardInstance, InstanceId};
use crate::{CombatError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LieuDistributionConfig {
    /// Lieu cards taken from each player
    pub lieu_cards_per_player: usize,
    /// Size of the common pool
    pub total_common_lieu_cards: usize,
}

impl Default for LieuDistributionConfig {
    fn default() -> Self {
        LieuDistributionConfig {
            lieu_cards_per_player: 2,
            total_common_lieu_cards: 4,
        }
    }
}

/// Common lieu pool and the currently active card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LieuBoard {
    pub common: Vec<CardInstance>,
    pub active: Option<InstanceId>,
}

impl LieuBoard {
    /// Build the common pool from every player's cards
    ///
    /// `players` holds each player's cards; non-lieu cards are ignored.
    pub fn distribute(
        players: Vec<Vec<CardInstance>>,
        config: &LieuDistributionConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        if players.len() < 2 {
            return Err(CombatError::LieuDistribution(
                "at least two players are required to distribute lieu cards".to_string(),
            ));
        }

        let mut pool = Vec::new();
        for (index, cards) in players.into_iter().enumerate() {
            let lieux: Vec<CardInstance> = cards.into_iter().filter(|c| c.card.is_lieu()).collect();
            if lieux.len() < config.lieu_cards_per_player {
                return Err(CombatError::LieuDistribution(format!(
                    "player {} has {} lieu cards, {} required",
                    index + 1,
                    lieux.len(),
                    config.lieu_cards_per_player
                )));
            }
            pool.extend(lieux.into_iter().take(config.lieu_cards_per_player));
        }

        if pool.len() < config.total_common_lieu_cards {
            return Err(CombatError::LieuDistribution(format!(
                "only {} lieu cards pooled, {} required",
                pool.len(),
                config.total_common_lieu_cards
            )));
        }

        pool.shuffle(rng);
        pool.truncate(config.total_common_lieu_cards);

        let active = if pool.is_empty() {
            None
        } else {
            Some(pool[rng.gen_range(0..pool.len())].id)
        };
        Ok(LieuBoard {
            common: pool,
            active,
        })
    }

    pub fn active_lieu(&self) -> Option<&CardInstance> {
        let active = self.active?;
        self.common.iter().find(|c| c.id == active)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active_lieu().map(CardInstance::name)
    }

    /// Switch the active lieu to another card of the common pool
    pub fn change_active(&mut self, id: InstanceId) -> Result<()> {
        let card = self.common.iter().find(|c| c.id == id).ok_or_else(|| {
            CombatError::LieuDistribution(format!("instance {id} is not part of the common lieu pool"))
        })?;
        if !card.card.is_lieu() {
            return Err(CombatError::LieuDistribution(format!("{} is not a lieu card", card.name())));
        }
        self.active = Some(id);
        Ok(())
    }
}
