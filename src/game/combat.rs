//! Combat orchestration
//!
//! `CombatManager` owns one battle: roster, players, tag rules, the action
//! queue, targeting and the seeded RNG. Planning entry points only queue
//! actions; `resolve_all_actions` settles conflicts and runs the executors.

/// Log an event line; compiled out without the `verbose-logging` feature
///
/// Without the feature the `format!` allocation never happens.
macro_rules! log_if_verbose {
    ($log:expr, $level:ident, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $log.$level(&format!($($arg)*));
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$log;
        }
    };
}

use crate::config::BattleConfig;
use crate::core::{
    ActionId, Alteration, Card, CardInstance, InstanceId, Player, PlayerId, Spell, SpellEffect,
    SpellEffectKind, SpellId, SpellTargetType, Tag, TagId,
};
use crate::game::actions::{
    ActionData, ActionDraft, ActionKind, ActionResolver, PlannedAction, ResolutionReport, ResourceLookup,
};
use crate::game::attack_conditions::{base_damage, can_attack, can_attack_base, AttackTarget};
use crate::game::conversion::convert_card_to_instance;
use crate::game::lieu::LieuBoard;
use crate::game::logger::CombatLog;
use crate::game::state::{BattleState, Roster};
use crate::game::targeting::{TargetList, TargetSpec, TargetingRequest, TargetingService};
use crate::rules::{TagRuleApplicationResult, TagRuleRegistry};
use crate::{CombatError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use std::sync::Arc;

/// Motivation available to an action source
///
/// An entity with its own `motivation` stat spends from it; otherwise the
/// owning player's pool counts.
pub struct MotivationView<'a> {
    roster: &'a Roster,
    state: &'a BattleState,
}

impl<'a> MotivationView<'a> {
    pub fn new(roster: &'a Roster, state: &'a BattleState) -> Self {
        MotivationView { roster, state }
    }
}

impl ResourceLookup for MotivationView<'_> {
    fn available_motivation(&self, source: InstanceId) -> f64 {
        let Ok(entity) = self.roster.get(source) else {
            return 0.0;
        };
        if let Some(own) = entity.temporary_stats.get("motivation") {
            return *own;
        }
        entity
            .owner
            .and_then(|owner| self.state.player(owner).ok())
            .map(|player| player.motivation as f64)
            .unwrap_or(0.0)
    }
}

/// One battle
pub struct CombatManager {
    roster: Roster,
    state: BattleState,
    rules: TagRuleRegistry,
    planner: ActionResolver,
    targeting: TargetingService,
    rng: ChaCha12Rng,
    log: CombatLog,
    config: BattleConfig,
}

impl CombatManager {
    /// New battle with an entropy-seeded RNG
    pub fn new(config: BattleConfig, rules: TagRuleRegistry) -> Self {
        Self::with_rng(config, rules, ChaCha12Rng::from_entropy())
    }

    /// New battle with a fixed seed, for replays and tests
    pub fn with_seed(config: BattleConfig, rules: TagRuleRegistry, seed: u64) -> Self {
        Self::with_rng(config, rules, ChaCha12Rng::seed_from_u64(seed))
    }

    fn with_rng(config: BattleConfig, rules: TagRuleRegistry, rng: ChaCha12Rng) -> Self {
        CombatManager {
            roster: Roster::new(),
            state: BattleState::new(),
            rules,
            planner: ActionResolver::new(config.conflict),
            targeting: TargetingService::new(config.manual_timeout()),
            rng,
            log: CombatLog::new(),
            config,
        }
    }

    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = ChaCha12Rng::seed_from_u64(seed);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn entity(&self, id: InstanceId) -> Result<&CardInstance> {
        self.roster.get(id)
    }

    pub fn entity_mut(&mut self, id: InstanceId) -> Result<&mut CardInstance> {
        self.roster.get_mut(id)
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BattleState {
        &mut self.state
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.state.player(id)
    }

    pub fn rules(&self) -> &TagRuleRegistry {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut TagRuleRegistry {
        &mut self.rules
    }

    pub fn planner(&self) -> &ActionResolver {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut ActionResolver {
        &mut self.planner
    }

    pub fn targeting_mut(&mut self) -> &mut TargetingService {
        &mut self.targeting
    }

    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut CombatLog {
        &mut self.log
    }

    pub fn set_log(&mut self, log: CombatLog) {
        self.log = log;
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn turn(&self) -> u32 {
        self.state.turn
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// A player with the configured resources
    pub fn create_player(&self, id: PlayerId, name: impl Into<String>) -> Player {
        let mut player = Player::new(id, name)
            .with_base_health(self.config.base_max_health)
            .with_motivation(self.config.default_motivation);
        player.max_charisme = self.config.max_charisme;
        player.charisme = self.config.starting_charisme.min(player.max_charisme);
        player
    }

    pub fn add_player(&mut self, player: Player) -> PlayerId {
        let id = player.id;
        self.state.add_player(player);
        id
    }

    pub fn register_alteration(&mut self, alteration: Alteration) -> Arc<Alteration> {
        self.state.register_alteration(alteration)
    }

    fn insert(&mut self, mut instance: CardInstance) -> InstanceId {
        let id = self.roster.next_id();
        instance.id = id;
        self.roster.insert(id, instance);
        id
    }

    /// Put an already-converted instance on the battlefield
    pub fn add_instance(&mut self, instance: CardInstance) -> InstanceId {
        let id = self.insert(instance);
        if let Err(err) = self.recalculate(id) {
            self.log.diagnostic(&format!("recompute of {id} failed: {err}"));
        }
        id
    }

    /// Pay the summon cost and bring a character card into play
    pub fn summon_character(
        &mut self,
        player: PlayerId,
        card: Arc<Card>,
        tags: &[Arc<Tag>],
        spells: &[Arc<Spell>],
    ) -> Result<InstanceId> {
        if !card.is_character() {
            return Err(CombatError::InvalidAction(format!("{} is not a character card", card.name)));
        }
        let fielded = self.state.player(player)?.characters.len();
        if fielded >= self.config.max_characters {
            return Err(CombatError::InvalidAction(format!(
                "player {player} already fields {fielded} characters"
            )));
        }
        self.state.player_mut(player)?.spend_charisme(card.summon_cost)?;

        let instance = convert_card_to_instance(card, Some(player), tags, spells, &self.config);
        let id = self.insert(instance);
        self.state.player_mut(player)?.characters.push(id);
        self.recalculate(id)?;

        log_if_verbose!(self.log, action, "{} summons {}", self.state.player(player)?.name, self.roster.get(id)?.name());
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Planning
    // ------------------------------------------------------------------

    /// Queue an attack; an ineligible attacker is dropped
    pub fn execute_attack(&mut self, attacker: InstanceId, target: InstanceId) -> Option<ActionId> {
        let Ok(unit) = self.roster.get(attacker) else {
            self.log.diagnostic(&format!("attacker {attacker} is not on the battlefield"));
            return None;
        };
        if !unit.can_attack() {
            self.log.diagnostic(&format!("{} cannot attack right now", unit.name()));
            return None;
        }
        if !self.roster.contains(target) {
            self.log.diagnostic(&format!("attack target {target} is not on the battlefield"));
            return None;
        }
        let id = self.planner.plan_action(ActionDraft::attack(attacker, target));
        log_if_verbose!(self.log, verbose, "planned attack {id}: {attacker} -> {target}");
        Some(id)
    }

    /// Queue a spell; an unknown or cooling-down spell is dropped
    ///
    /// With no explicit targets each effect resolves its own target type at
    /// execution. Manual effects need targets chosen beforehand through
    /// [`CombatManager::request_targets`].
    pub fn cast_spell(&mut self, caster: InstanceId, spell_id: SpellId, targets: &[InstanceId]) -> Option<ActionId> {
        let Ok(unit) = self.roster.get(caster) else {
            self.log.diagnostic(&format!("caster {caster} is not on the battlefield"));
            return None;
        };
        let Some(known) = unit.spell(spell_id) else {
            self.log.diagnostic(&format!("{} does not know spell {spell_id}", unit.name()));
            return None;
        };
        if !known.is_usable() || unit.is_defeated() {
            self.log.diagnostic(&format!("{} cannot cast {} right now", unit.name(), known.spell.name));
            return None;
        }
        let spell = Arc::clone(&known.spell);
        let id = self
            .planner
            .plan_action(ActionDraft::cast(caster, spell, targets.iter().copied()));
        log_if_verbose!(self.log, verbose, "planned spell {id}: {caster} casts {spell_id}");
        Some(id)
    }

    pub fn use_ability(&mut self, source: InstanceId, name: &str, targets: &[InstanceId]) -> Option<ActionId> {
        match self.roster.get(source) {
            Ok(unit) if !unit.is_defeated() => {}
            _ => {
                self.log.diagnostic(&format!("{source} cannot use {name}"));
                return None;
            }
        }
        Some(
            self.planner
                .plan_action(ActionDraft::ability(source, name, targets.iter().copied())),
        )
    }

    /// Queue an attack on a player's base
    pub fn attack_base(&mut self, attacker: InstanceId, player: PlayerId, ignore_conditions: bool) -> Result<ActionId> {
        let unit = self.roster.get(attacker)?;
        let defender = self.state.player(player)?;
        let check = can_attack(unit, AttackTarget::Base(player), defender, ignore_conditions);
        if !check.allowed {
            return Err(CombatError::AttackNotAllowed(check.reason.unwrap_or_default()));
        }
        Ok(self
            .planner
            .plan_action(ActionDraft::base_attack(attacker, player, ignore_conditions)))
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Settle conflicts and execute the surviving actions
    ///
    /// An action whose executor fails is skipped with a diagnostic and left
    /// out of `executed`.
    pub fn resolve_all_actions(&mut self) -> ResolutionReport {
        let view = MotivationView::new(&self.roster, &self.state);
        let (conflicts, actions) = self.planner.drain_in_resolution_order(&view, &mut self.rng);

        for resolution in conflicts.iter().filter(|r| !r.already_settled) {
            log_if_verbose!(
                self.log,
                diagnostic,
                "{:?} conflict: {}",
                resolution.conflict.kind,
                resolution.description
            );
        }

        let mut executed = Vec::with_capacity(actions.len());
        for action in &actions {
            match self.execute(action) {
                Ok(()) => executed.push(action.id),
                Err(err) => self.log.diagnostic(&format!("action {} skipped: {err}", action.id)),
            }
        }
        ResolutionReport { conflicts, executed }
    }

    fn execute(&mut self, action: &PlannedAction) -> Result<()> {
        match (action.kind, &action.data) {
            (ActionKind::Attack, ActionData::BaseAttack { player, ignore_conditions }) => {
                self.execute_base_attack(action.source, *player, *ignore_conditions)
            }
            (ActionKind::Attack, _) => self.execute_attack_action(action),
            (ActionKind::CastSpell, _) => self.execute_spell(action),
            (ActionKind::UseAbility | ActionKind::UseItem | ActionKind::ActivateEffect, data) => {
                let source = self.roster.get_mut(action.source)?;
                source.is_exhausted = true;
                let label = match data {
                    ActionData::Ability { name } => name.as_str(),
                    _ => "an effect",
                };
                log_if_verbose!(self.log, action, "{} uses {}", source.name(), label);
                Ok(())
            }
        }
    }

    fn execute_attack_action(&mut self, action: &PlannedAction) -> Result<()> {
        let target = *action
            .targets
            .first()
            .ok_or_else(|| CombatError::InvalidAction(format!("attack {} has no target", action.id)))?;
        let attacker = self.roster.get(action.source)?;
        if !attacker.can_attack() {
            return Err(CombatError::AttackNotAllowed(format!("{} cannot attack", attacker.name())));
        }
        let attack = attacker.attack();
        let defense = self.roster.get(target)?.defense();
        let damage = (attack - defense).round().max(1.0);

        let change = self.roster.get_mut(target)?.apply_damage(damage, Some(action.source));
        self.roster.get_mut(action.source)?.is_exhausted = true;

        log_if_verbose!(
            self.log,
            action,
            "{} attacks {} for {} damage",
            self.roster.get(action.source)?.name(),
            self.roster.get(target)?.name(),
            change.amount
        );
        for hook in &change.triggered {
            log_if_verbose!(self.log, verbose, "alteration {hook} reacts to damage on {target}");
        }
        Ok(())
    }

    fn execute_base_attack(&mut self, attacker: InstanceId, player: PlayerId, ignore_conditions: bool) -> Result<()> {
        let unit = self.roster.get(attacker)?;
        if !unit.can_attack() {
            return Err(CombatError::AttackNotAllowed(format!("{} cannot attack", unit.name())));
        }
        let check = can_attack_base(self.state.player(player)?, ignore_conditions);
        if !check.allowed {
            return Err(CombatError::AttackNotAllowed(check.reason.unwrap_or_default()));
        }
        let amount = base_damage(unit.attack());
        let removed = self.state.player_mut(player)?.base.apply_damage(amount);
        self.roster.get_mut(attacker)?.is_exhausted = true;

        log_if_verbose!(
            self.log,
            action,
            "{} hits the base of {} for {}",
            self.roster.get(attacker)?.name(),
            self.state.player(player)?.name,
            removed
        );
        Ok(())
    }

    fn execute_spell(&mut self, action: &PlannedAction) -> Result<()> {
        let spell = action
            .spell
            .clone()
            .ok_or_else(|| CombatError::InvalidAction(format!("action {} carries no spell", action.id)))?;
        let caster = self.roster.get(action.source)?;
        if !caster.can_use_spell(spell.id) {
            return Err(CombatError::InvalidAction(format!(
                "{} cannot cast {} right now",
                caster.name(),
                spell.name
            )));
        }
        let owner = caster.owner;
        log_if_verbose!(self.log, action, "{} casts {}", caster.name(), spell.name);

        for effect in &spell.effects {
            if let Some(chance) = effect.chance {
                if self.rng.gen_range(0.0..100.0) >= chance {
                    log_if_verbose!(self.log, diagnostic, "{:?} effect of {} did not trigger", effect.kind, spell.name);
                    continue;
                }
            }
            let targets = self.effect_targets(action, effect);
            self.apply_spell_effect(action.source, owner, effect, &targets)?;
        }

        self.roster.get_mut(action.source)?.start_cooldown(spell.id)?;
        if let Some(owner) = owner {
            let player = self.state.player_mut(owner)?;
            let cost = action.cost.round().max(0.0) as u32;
            player.motivation = player.motivation.saturating_sub(cost);
        }
        self.roster.get_mut(action.source)?.is_exhausted = true;
        Ok(())
    }

    fn effect_targets(&mut self, action: &PlannedAction, effect: &SpellEffect) -> TargetList {
        if effect.target_type == SpellTargetType::SelfTarget {
            return std::iter::once(action.source).collect();
        }
        if !action.targets.is_empty() {
            return action.targets.clone();
        }
        let spec = TargetSpec::from_effect(effect);
        match self.targeting.resolve(action.source, &spec, &self.roster, &mut self.rng) {
            TargetingRequest::Ready(result) if result.success => result.targets,
            TargetingRequest::Ready(result) => {
                self.log.diagnostic(&format!(
                    "no targets for {:?} effect: {}",
                    effect.kind,
                    result.error.unwrap_or_default()
                ));
                TargetList::new()
            }
            TargetingRequest::Pending(_) => {
                self.log.diagnostic("manual targets must be chosen before the spell is planned");
                TargetList::new()
            }
        }
    }

    fn apply_spell_effect(
        &mut self,
        caster: InstanceId,
        owner: Option<PlayerId>,
        effect: &SpellEffect,
        targets: &[InstanceId],
    ) -> Result<()> {
        match effect.kind {
            SpellEffectKind::Damage | SpellEffectKind::Heal => {
                for target in targets {
                    let Ok(entity) = self.roster.get_mut(*target) else {
                        continue;
                    };
                    let change = if effect.kind == SpellEffectKind::Damage {
                        entity.apply_damage(effect.value, Some(caster))
                    } else {
                        entity.heal(effect.value, Some(caster))
                    };
                    log_if_verbose!(self.log, action, "{:?} {} on {}", effect.kind, change.amount, entity.name());
                }
            }
            SpellEffectKind::ApplyAlteration => {
                let Some(alteration) = effect.alteration.and_then(|id| self.state.alteration(id)) else {
                    self.log.diagnostic("spell alteration is missing from the catalog");
                    return Ok(());
                };
                let alteration = match effect.duration {
                    Some(turns) => Arc::new(Alteration {
                        duration: Some(turns),
                        ..(*alteration).clone()
                    }),
                    None => alteration,
                };
                for target in targets {
                    let Ok(entity) = self.roster.get_mut(*target) else {
                        continue;
                    };
                    entity.add_alteration(Arc::clone(&alteration), Some(caster));
                    log_if_verbose!(self.log, action, "{} gains {}", entity.name(), alteration.name);
                    self.recalculate(*target)?;
                }
            }
            SpellEffectKind::Resource => {
                if let Some(owner) = owner {
                    let amount = effect.value.round().max(0.0) as u32;
                    self.state.player_mut(owner)?.add_motivation(amount);
                    log_if_verbose!(self.log, action, "player {owner} gains {amount} motivation");
                }
            }
            SpellEffectKind::Status | SpellEffectKind::Draw | SpellEffectKind::Special => {
                log_if_verbose!(self.log, verbose, "{:?} effect has no battlefield resolution", effect.kind);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Turn boundary
    // ------------------------------------------------------------------

    /// Periodic effects, expiry, full recompute, then player upkeep
    pub fn end_turn(&mut self) -> Result<()> {
        let ids = self.roster.ids().to_vec();
        for id in &ids {
            let entity = self.roster.get_mut(*id)?;
            for change in entity.apply_alteration_effects() {
                log_if_verbose!(self.log, verbose, "{} periodic effect for {}", entity.name(), change.amount);
            }
            entity.reset_for_next_turn();
        }
        for id in &ids {
            self.recalculate(*id)?;
        }

        for player in &mut self.state.players {
            player.base.apply_alteration_effects();
            player.base.reset_for_next_turn();
            player.renew_motivation();
        }

        self.state.turn += 1;
        self.log.set_turn(self.state.turn);
        log_if_verbose!(self.log, normal, "Turn {} begins", self.state.turn);
        Ok(())
    }

    /// Remove fallen entities and reward the opposing player
    pub fn process_defeated(&mut self) -> Vec<InstanceId> {
        let defeated = self.roster.defeated();
        for id in &defeated {
            let Some(entity) = self.roster.remove(*id) else {
                continue;
            };
            log_if_verbose!(self.log, action, "{} is defeated", entity.name());
            let Some(owner) = entity.owner else {
                continue;
            };
            if let Ok(player) = self.state.player_mut(owner) {
                player.remove_character(*id);
            }
            if !entity.card.is_character() {
                continue;
            }
            if let Some(opponent) = self.state.opponent_of(owner) {
                if let Ok(player) = self.state.player_mut(opponent) {
                    let gained = player.gain_charisme(entity.card.rarity.charisme_reward());
                    log_if_verbose!(self.log, action, "{} gains {} charisme", player.name, gained);
                }
            }
        }
        defeated
    }

    /// The last player whose base still stands, once every other base fell
    pub fn winner(&self) -> Option<PlayerId> {
        let mut standing = self.state.players.iter().filter(|p| !p.has_lost());
        let first = standing.next()?;
        match standing.next() {
            Some(_) => None,
            None if self.state.players.len() > 1 => Some(first.id),
            None => None,
        }
    }

    // ------------------------------------------------------------------
    // Targeting
    // ------------------------------------------------------------------

    pub fn request_targets(&mut self, source: InstanceId, spec: &TargetSpec) -> TargetingRequest {
        self.targeting.resolve(source, spec, &self.roster, &mut self.rng)
    }

    pub fn random_target(&mut self, candidates: &[InstanceId]) -> Option<InstanceId> {
        candidates.choose(&mut self.rng).copied()
    }

    /// Pick proportionally to `weight`; uniform when no weight is positive
    pub fn weighted_random_target<F>(&mut self, candidates: &[InstanceId], weight: F) -> Option<InstanceId>
    where
        F: Fn(InstanceId) -> f64,
    {
        let weights: Vec<f64> = candidates.iter().map(|c| weight(*c).max(0.0)).collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return self.random_target(candidates);
        }
        let mut roll = self.rng.gen_range(0.0..total);
        for (candidate, w) in candidates.iter().zip(&weights) {
            if roll < *w {
                return Some(*candidate);
            }
            roll -= w;
        }
        candidates.last().copied()
    }

    // ------------------------------------------------------------------
    // Lieu
    // ------------------------------------------------------------------

    /// Pool each player's lieu cards and pick the active one
    ///
    /// Freshly converted cards (placeholder id 0) get an id from the roster
    /// sequence; lieux never enter the roster itself.
    pub fn distribute_lieu_cards(&mut self, mut player_lieux: Vec<Vec<CardInstance>>) -> Result<()> {
        for lieu in player_lieux.iter_mut().flatten() {
            if lieu.id.as_u32() == 0 {
                lieu.id = self.roster.next_id();
            }
        }
        self.state.lieux = LieuBoard::distribute(player_lieux, &self.config.lieu, &mut self.rng)?;
        if let Some(name) = self.state.active_lieu_name() {
            log_if_verbose!(self.log, normal, "Active lieu: {name}");
        }
        self.recalculate_all()
    }

    pub fn change_active_lieu(&mut self, id: InstanceId) -> Result<()> {
        self.state.lieux.change_active(id)?;
        if let Some(name) = self.state.active_lieu_name() {
            log_if_verbose!(self.log, normal, "Active lieu is now {name}");
        }
        self.recalculate_all()
    }

    pub fn active_lieu(&self) -> Option<&CardInstance> {
        self.state.lieux.active_lieu()
    }

    // ------------------------------------------------------------------
    // Stats and equipment
    // ------------------------------------------------------------------

    /// Full stat recompute of one entity; rule results go to the combat log
    pub fn recalculate(&mut self, id: InstanceId) -> Result<Vec<TagRuleApplicationResult>> {
        let results = self
            .roster
            .recalculate_temporary_stats(id, &self.rules, &mut self.state, &mut self.rng)?;
        for result in &results {
            let target = result
                .affected
                .first()
                .and_then(|t| self.roster.get(*t).ok())
                .map(CardInstance::name);
            self.log.tag_rule(result, target);
        }
        Ok(results)
    }

    pub fn recalculate_all(&mut self) -> Result<()> {
        for id in self.roster.ids().to_vec() {
            self.recalculate(id)?;
        }
        Ok(())
    }

    /// Tag an entity and recompute it; false if the tag was already there
    pub fn add_tag(&mut self, id: InstanceId, tag: Arc<Tag>, is_temporary: bool, duration: Option<u32>) -> Result<bool> {
        let name = tag.name.clone();
        if !self.roster.get_mut(id)?.add_tag(tag, is_temporary, duration) {
            return Ok(false);
        }
        self.recalculate(id)?;
        log_if_verbose!(self.log, verbose, "{} gains tag {name}", self.roster.get(id)?.name());
        Ok(true)
    }

    pub fn remove_tag(&mut self, id: InstanceId, tag_id: TagId) -> Result<bool> {
        if !self.roster.get_mut(id)?.remove_tag(tag_id) {
            return Ok(false);
        }
        self.recalculate(id)?;
        Ok(true)
    }

    pub fn equip_object(&mut self, character: InstanceId, object: InstanceId, slot: Option<u32>) -> Result<u32> {
        let object = self.roster.get(object)?.clone();
        let used = self.roster.get_mut(character)?.equip_object(&object, slot)?;
        self.recalculate(character)?;
        log_if_verbose!(self.log, action, "{} equips {} in slot {used}", self.roster.get(character)?.name(), object.name());
        Ok(used)
    }

    pub fn unequip_object(&mut self, character: InstanceId, slot: u32) -> Result<InstanceId> {
        let removed = self.roster.get_mut(character)?.unequip_object(slot)?;
        self.recalculate(character)?;
        Ok(removed)
    }
}

impl std::fmt::Debug for CombatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatManager")
            .field("turn", &self.state.turn)
            .field("entities", &self.roster.len())
            .field("players", &self.state.players.len())
            .field("queued", &self.planner.planned_actions().len())
            .finish()
    }
}
