//! Simultaneous action planning and conflict resolution
//!
//! Both sides plan actions into a queue; nothing executes at plan time. On
//! resolve, conflicting pairs are detected and one side of each pair is
//! cancelled according to the configured strategy, then the survivors are
//! handed out in the strategy's order.

use crate::core::{ActionId, InstanceId, PlayerId, Spell};
use crate::game::state::Roster;
use crate::game::targeting::TargetList;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    CastSpell,
    UseAbility,
    UseItem,
    ActivateEffect,
}

/// Extra payload carried by some actions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionData {
    #[default]
    None,
    /// An attack aimed at a player's base instead of a character
    BaseAttack { player: PlayerId, ignore_conditions: bool },
    Ability { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub source: InstanceId,
    pub targets: TargetList,
    pub spell: Option<Arc<Spell>>,
    pub priority: i32,
    /// Logical planning clock
    pub timestamp: u64,
    pub cost: f64,
    pub data: ActionData,
}

impl PlannedAction {
    fn shares_target_with(&self, other: &PlannedAction) -> bool {
        self.targets.iter().any(|t| other.targets.contains(t))
    }

    fn applies_alteration(&self) -> bool {
        self.kind == ActionKind::CastSpell
            && self.spell.as_ref().is_some_and(|s| s.has_alteration_effect())
    }
}

/// An action before the planner stamps it
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDraft {
    pub kind: ActionKind,
    pub source: InstanceId,
    pub targets: TargetList,
    pub spell: Option<Arc<Spell>>,
    pub priority: i32,
    pub cost: f64,
    pub data: ActionData,
}

impl ActionDraft {
    pub fn new(kind: ActionKind, source: InstanceId) -> Self {
        ActionDraft {
            kind,
            source,
            targets: TargetList::new(),
            spell: None,
            priority: 0,
            cost: 0.0,
            data: ActionData::None,
        }
    }

    pub fn attack(source: InstanceId, target: InstanceId) -> Self {
        Self::new(ActionKind::Attack, source).with_targets([target])
    }

    /// Attack on a player's base; no character target
    pub fn base_attack(source: InstanceId, player: PlayerId, ignore_conditions: bool) -> Self {
        let mut draft = Self::new(ActionKind::Attack, source);
        draft.data = ActionData::BaseAttack {
            player,
            ignore_conditions,
        };
        draft
    }

    /// Cast `spell`; the cost comes from the spell definition
    pub fn cast(source: InstanceId, spell: Arc<Spell>, targets: impl IntoIterator<Item = InstanceId>) -> Self {
        let mut draft = Self::new(ActionKind::CastSpell, source).with_targets(targets);
        draft.cost = spell.cost.unwrap_or(0.0);
        draft.spell = Some(spell);
        draft
    }

    pub fn ability(source: InstanceId, name: impl Into<String>, targets: impl IntoIterator<Item = InstanceId>) -> Self {
        let mut draft = Self::new(ActionKind::UseAbility, source).with_targets(targets);
        draft.data = ActionData::Ability { name: name.into() };
        draft
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = InstanceId>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    Resource,
    Exclusivity,
    Target,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetails {
    pub action_a: PlannedAction,
    pub action_b: PlannedAction,
    pub reason: String,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub conflict: ConflictDetails,
    pub description: String,
    pub kept: ActionId,
    pub cancelled: ActionId,
    /// One side was already gone when this conflict came up
    pub already_settled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStrategy {
    Fifo,
    Lifo,
    Random,
    #[default]
    Priority,
    Cost,
    LowCost,
}

impl ResolutionStrategy {
    /// Execution order of two actions: `Less` means `a` goes first
    ///
    /// `Random` has no order of its own and falls back to FIFO here.
    pub fn compare(&self, a: &PlannedAction, b: &PlannedAction) -> Ordering {
        let fifo = a.timestamp.cmp(&b.timestamp);
        match self {
            ResolutionStrategy::Fifo | ResolutionStrategy::Random => fifo,
            ResolutionStrategy::Lifo => b.timestamp.cmp(&a.timestamp),
            ResolutionStrategy::Priority => b.priority.cmp(&a.priority).then(fifo),
            ResolutionStrategy::Cost => b.cost.total_cmp(&a.cost).then(fifo),
            ResolutionStrategy::LowCost => a.cost.total_cmp(&b.cost).then(fifo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictResolutionConfig {
    pub strategy: ResolutionStrategy,
    /// Chance in percent that a conflict is settled by a coin flip instead
    pub random_chance_percent: u32,
}

/// Motivation available to an action source
pub trait ResourceLookup {
    fn available_motivation(&self, source: InstanceId) -> f64;
}

impl<F> ResourceLookup for F
where
    F: Fn(InstanceId) -> f64,
{
    fn available_motivation(&self, source: InstanceId) -> f64 {
        self(source)
    }
}

/// An entity's own `motivation` stat
impl ResourceLookup for Roster {
    fn available_motivation(&self, source: InstanceId) -> f64 {
        self.get(source).map(|entity| entity.stat("motivation")).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub conflicts: Vec<ConflictResolution>,
    pub executed: Vec<ActionId>,
}

/// The action queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResolver {
    config: ConflictResolutionConfig,
    queue: Vec<PlannedAction>,
    next_action_id: u32,
    clock: u64,
    resolved: Option<Vec<ConflictResolution>>,
}

impl ActionResolver {
    pub fn new(config: ConflictResolutionConfig) -> Self {
        ActionResolver {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> ConflictResolutionConfig {
        self.config
    }

    pub fn set_config(&mut self, config: ConflictResolutionConfig) {
        self.config = config;
    }

    pub fn plan_action(&mut self, draft: ActionDraft) -> ActionId {
        self.next_action_id += 1;
        self.clock += 1;
        let id = ActionId::new(self.next_action_id);
        self.queue.push(PlannedAction {
            id,
            kind: draft.kind,
            source: draft.source,
            targets: draft.targets,
            spell: draft.spell,
            priority: draft.priority,
            timestamp: self.clock,
            cost: draft.cost,
            data: draft.data,
        });
        self.resolved = None;
        id
    }

    /// Remove a queued action; false if it was not queued
    pub fn cancel_action(&mut self, id: ActionId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|action| action.id != id);
        self.queue.len() != before
    }

    pub fn planned_actions(&self) -> &[PlannedAction] {
        &self.queue
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pairwise scan of the queue
    pub fn detect_conflicts(&self, resources: &dyn ResourceLookup) -> Vec<ConflictDetails> {
        let mut conflicts = Vec::new();
        for (i, a) in self.queue.iter().enumerate() {
            for b in &self.queue[i + 1..] {
                let mut report = |kind, reason: &str| {
                    conflicts.push(ConflictDetails {
                        action_a: a.clone(),
                        action_b: b.clone(),
                        reason: reason.to_string(),
                        kind,
                    })
                };

                if a.source == b.source && a.cost + b.cost > resources.available_motivation(a.source) {
                    report(ConflictKind::Resource, "not enough motivation for both actions");
                }
                if a.applies_alteration() && b.applies_alteration() && a.shares_target_with(b) {
                    report(ConflictKind::Exclusivity, "alterations applied to the same targets");
                }
                let same_kind = a.kind == b.kind && matches!(a.kind, ActionKind::Attack | ActionKind::CastSpell);
                if same_kind && a.shares_target_with(b) {
                    report(ConflictKind::Target, "same kind of action on the same targets");
                }
            }
        }
        conflicts
    }

    /// Settle every detected conflict once per planning cycle
    ///
    /// The result is cached until the next `plan_action` or resolution.
    pub fn resolve_conflicts_automatically(
        &mut self,
        resources: &dyn ResourceLookup,
        rng: &mut dyn RngCore,
    ) -> &[ConflictResolution] {
        if self.resolved.is_none() {
            let resolutions = self.settle_conflicts(resources, rng);
            self.resolved = Some(resolutions);
        }
        self.resolved.as_deref().unwrap_or(&[])
    }

    /// Cached resolutions of the current cycle, if resolution already ran
    pub fn conflict_info(&self) -> Option<&[ConflictResolution]> {
        self.resolved.as_deref()
    }

    fn settle_conflicts(&mut self, resources: &dyn ResourceLookup, rng: &mut dyn RngCore) -> Vec<ConflictResolution> {
        let conflicts = self.detect_conflicts(resources);
        let mut resolutions = Vec::with_capacity(conflicts.len());

        for conflict in conflicts {
            let (a, b) = (&conflict.action_a, &conflict.action_b);
            let a_queued = self.queue.iter().any(|x| x.id == a.id);
            let b_queued = self.queue.iter().any(|x| x.id == b.id);

            if !(a_queued && b_queued) {
                let (kept, cancelled) = if a_queued { (a.id, b.id) } else { (b.id, a.id) };
                resolutions.push(ConflictResolution {
                    description: format!("action {cancelled} was already cancelled"),
                    kept,
                    cancelled,
                    already_settled: true,
                    conflict,
                });
                continue;
            }

            let coin_flip = self.config.random_chance_percent > 0
                && rng.gen_range(0..100) < self.config.random_chance_percent;
            let (keep_a, rule) = if coin_flip || self.config.strategy == ResolutionStrategy::Random {
                (rng.gen_bool(0.5), "random draw")
            } else {
                let order = self.config.strategy.compare(a, b);
                (order != Ordering::Greater, "resolution strategy")
            };

            let (kept, cancelled) = if keep_a { (a.id, b.id) } else { (b.id, a.id) };
            self.cancel_action(cancelled);
            resolutions.push(ConflictResolution {
                description: format!("action {cancelled} cancelled in favour of {kept} ({rule})"),
                kept,
                cancelled,
                already_settled: false,
                conflict,
            });
        }
        resolutions
    }

    /// Settle conflicts and take the surviving actions in execution order
    ///
    /// Clears the queue and the cache.
    pub fn drain_in_resolution_order(
        &mut self,
        resources: &dyn ResourceLookup,
        rng: &mut dyn RngCore,
    ) -> (Vec<ConflictResolution>, Vec<PlannedAction>) {
        self.resolve_conflicts_automatically(resources, rng);
        let conflicts = self.resolved.take().unwrap_or_default();
        let mut actions = std::mem::take(&mut self.queue);

        match self.config.strategy {
            ResolutionStrategy::Random => actions.shuffle(rng),
            strategy => actions.sort_by(|a, b| strategy.compare(a, b)),
        }
        (conflicts, actions)
    }

    /// Resolve the queue and call `execute` for each surviving action
    pub fn resolve_actions<F>(
        &mut self,
        resources: &dyn ResourceLookup,
        rng: &mut dyn RngCore,
        mut execute: F,
    ) -> ResolutionReport
    where
        F: FnMut(&PlannedAction),
    {
        let (conflicts, actions) = self.drain_in_resolution_order(resources, rng);
        let mut executed = Vec::with_capacity(actions.len());
        for action in &actions {
            execute(action);
            executed.push(action.id);
        }
        ResolutionReport { conflicts, executed }
    }
}
