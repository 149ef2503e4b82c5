//! Tag rule registry and interpreter

use crate::core::{CardInstance, InstanceId, PlayerId};
use crate::game::state::{BattleState, Roster};
use crate::rules::parser::parse_rule_from_text;
use crate::rules::rule::{
    RuleTarget, TagRule, TagRuleApplicationResult, TagRuleCondition, TagRuleDefinition,
    TagRuleEffectType,
};
use crate::Result;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rules keyed by the tag name that triggers them
///
/// Rules of a tag are kept sorted by descending priority; ties keep insertion
/// order. The registry is an ordinary value: build one per battle, or build a
/// shared catalog once and clone it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagRuleRegistry {
    rules: BTreeMap<String, Vec<TagRule>>,
    next_rule_id: u32,
}

/// Player-side resource a rule can modify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerModifier {
    CharismeGeneration,
    Motivation,
}

impl TagRuleRegistry {
    pub fn new() -> Self {
        TagRuleRegistry {
            rules: BTreeMap::new(),
            next_rule_id: 1,
        }
    }

    /// Replace every rule with the given catalog
    pub fn load_rules(&mut self, definitions: Vec<TagRuleDefinition>) -> Result<()> {
        self.rules.clear();
        for definition in definitions {
            for rule in definition.rules {
                self.add_rule_for_tag(&definition.tag_name, rule)?;
            }
        }
        Ok(())
    }

    /// Add a rule to a tag; returns the rule id
    ///
    /// A `tagged` rule without a target tag is a setup bug and is rejected.
    pub fn add_rule_for_tag(&mut self, tag_name: &str, mut rule: TagRule) -> Result<u32> {
        rule.target()?;
        let id = match rule.id {
            Some(id) => {
                self.next_rule_id = self.next_rule_id.max(id + 1);
                id
            }
            None => {
                let id = self.next_rule_id.max(1);
                self.next_rule_id = id + 1;
                rule.id = Some(id);
                id
            }
        };
        let rules = self.rules.entry(tag_name.to_string()).or_default();
        rules.push(rule);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(id)
    }

    /// Parse a DSL line and add it to a tag
    pub fn add_rule_from_text(&mut self, tag_name: &str, text: &str) -> Result<Option<u32>> {
        match parse_rule_from_text(text) {
            Some(rule) => self.add_rule_for_tag(tag_name, rule).map(Some),
            None => Ok(None),
        }
    }

    /// Replace a rule by id; returns false if the rule does not exist
    pub fn update_rule(&mut self, tag_name: &str, rule_id: u32, mut rule: TagRule) -> Result<bool> {
        rule.target()?;
        let Some(rules) = self.rules.get_mut(tag_name) else {
            return Ok(false);
        };
        let Some(slot) = rules.iter_mut().find(|r| r.id == Some(rule_id)) else {
            return Ok(false);
        };
        rule.id = Some(rule_id);
        *slot = rule;
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(true)
    }

    pub fn delete_rule(&mut self, tag_name: &str, rule_id: u32) -> bool {
        let Some(rules) = self.rules.get_mut(tag_name) else {
            return false;
        };
        let before = rules.len();
        rules.retain(|r| r.id != Some(rule_id));
        let removed = rules.len() != before;
        if rules.is_empty() {
            self.rules.remove(tag_name);
        }
        removed
    }

    pub fn rules_for_tag(&self, tag_name: &str) -> &[TagRule] {
        self.rules.get(tag_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule of a tag with `source` as the triggering entity
    ///
    /// Returns one result per rule attempted. A failing rule never stops the
    /// remaining ones.
    pub fn apply_tag_rules(
        &self,
        tag_name: &str,
        source: InstanceId,
        roster: &mut Roster,
        state: &mut BattleState,
        rng: &mut dyn RngCore,
    ) -> Vec<TagRuleApplicationResult> {
        let mut ordered: Vec<&TagRule> = self.rules_for_tag(tag_name).iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        ordered
            .into_iter()
            .map(|rule| {
                apply_rule(tag_name, rule, source, roster, state, rng)
                    .unwrap_or_else(|err| TagRuleApplicationResult::failed(tag_name, rule, err.to_string()))
            })
            .collect()
    }
}

fn apply_rule(
    tag: &str,
    rule: &TagRule,
    source: InstanceId,
    roster: &mut Roster,
    state: &mut BattleState,
    rng: &mut dyn RngCore,
) -> Result<TagRuleApplicationResult> {
    let target = rule.target()?;
    let owner = roster.get(source)?.owner;
    let targets = resolve_rule_targets(target, source, owner, roster);

    if let Some(condition) = &rule.condition {
        if !condition_holds(condition, owner, &targets, roster, state, rng) {
            return Ok(TagRuleApplicationResult::failed(tag, rule, "condition not met"));
        }
    }

    let label = format!("Tag: {} (Rule: {})", tag, rule.name);

    match rule.effect_type {
        TagRuleEffectType::CharismeGeneration => {
            apply_player_modifier(tag, rule, PlayerModifier::CharismeGeneration, source, owner, roster, state, &label)
        }
        TagRuleEffectType::MotivationModifier => {
            apply_player_modifier(tag, rule, PlayerModifier::Motivation, source, owner, roster, state, &label)
        }
        TagRuleEffectType::ConditionalEffect => Ok(TagRuleApplicationResult::applied(
            tag,
            rule,
            targets,
            format!("{}: condition satisfied", rule.name),
        )),
        _ if targets.is_empty() => Ok(TagRuleApplicationResult::failed(tag, rule, "no valid targets")),
        TagRuleEffectType::DamageModifier => {
            let (before, after) = for_each_target(roster, &targets, |entity| {
                let current = entity.attack();
                let delta = if rule.is_percentage {
                    current * rule.value / 100.0
                } else {
                    rule.value
                };
                entity.record_effect("attack", rule.value, label.as_str(), rule.is_percentage);
                entity.add_to_stat("attack", delta)
            })?;
            Ok(TagRuleApplicationResult::applied(
                tag,
                rule,
                targets,
                format!("{} attack {:+}{}", rule.name, rule.value, percent_sign(rule)),
            )
            .with_values(before, after))
        }
        TagRuleEffectType::AttackModifier | TagRuleEffectType::DefenseModifier => {
            let stat = if rule.effect_type == TagRuleEffectType::AttackModifier {
                "attack"
            } else {
                "defense"
            };
            let (before, after) = for_each_target(roster, &targets, |entity| {
                let delta = if rule.is_percentage {
                    (entity.base_stat(stat) * rule.value / 100.0).floor()
                } else {
                    rule.value
                };
                entity.record_effect(stat, rule.value, label.as_str(), rule.is_percentage);
                entity.add_to_stat(stat, delta)
            })?;
            Ok(TagRuleApplicationResult::applied(
                tag,
                rule,
                targets,
                format!("{} {} {:+}{}", rule.name, stat, rule.value, percent_sign(rule)),
            )
            .with_values(before, after))
        }
        TagRuleEffectType::HealthModifier => {
            let (before, after) = for_each_target(roster, &targets, |entity| {
                let before = entity.max_health as f64;
                let increase = if rule.is_percentage {
                    (before * rule.value / 100.0).floor()
                } else {
                    rule.value
                };
                entity.apply_health_bonus(increase as i64);
                entity.record_effect("health", rule.value, label.as_str(), rule.is_percentage);
                (before, entity.max_health as f64)
            })?;
            Ok(TagRuleApplicationResult::applied(
                tag,
                rule,
                targets,
                format!("{} max health {:+}{}", rule.name, rule.value, percent_sign(rule)),
            )
            .with_values(before, after))
        }
        TagRuleEffectType::DisableAttack => {
            for_each_target(roster, &targets, |entity| {
                entity.unable_to_attack = true;
                entity.record_effect("canAttack", 0.0, label.as_str(), false);
                (1.0, 0.0)
            })?;
            Ok(TagRuleApplicationResult::applied(
                tag,
                rule,
                targets,
                format!("{}: attack disabled", rule.name),
            ))
        }
        TagRuleEffectType::ApplyAlteration => {
            let Some(alteration_id) = rule.alteration_id else {
                return Ok(TagRuleApplicationResult::failed(tag, rule, "no alteration id"));
            };
            let Some(alteration) = state.alteration(alteration_id) else {
                return Ok(TagRuleApplicationResult::failed(
                    tag,
                    rule,
                    format!("alteration {alteration_id} not found"),
                ));
            };
            let mut affected = Vec::new();
            for id in &targets {
                if let Ok(entity) = roster.get_mut(*id) {
                    // Already carried from this source: a recompute must not stack it again
                    if !entity.has_alteration_from(alteration_id, source) {
                        entity.attach_alteration(alteration.clone(), Some(source));
                    }
                    affected.push(*id);
                }
            }
            if affected.is_empty() {
                return Ok(TagRuleApplicationResult::failed(tag, rule, "alteration applied to no target"));
            }
            Ok(TagRuleApplicationResult::applied(
                tag,
                rule,
                affected,
                format!("{}: applies {}", rule.name, alteration.name),
            ))
        }
        TagRuleEffectType::SynergyEffect => {
            let count: usize = rule
                .synergy_tags
                .iter()
                .map(|synergy| {
                    roster
                        .iter()
                        .filter(|(_, entity)| entity.has_tag_named(synergy))
                        .count()
                })
                .sum();
            if count == 0 {
                return Ok(TagRuleApplicationResult::failed(tag, rule, "no synergy partners"));
            }
            let (before, after) = for_each_target(roster, &targets, |entity| {
                let per_partner = if rule.is_percentage {
                    entity.base_stat("attack") * rule.value / 100.0
                } else {
                    rule.value
                };
                let delta = per_partner * count as f64;
                entity.record_effect("attack", delta, label.as_str(), false);
                entity.add_to_stat("attack", delta)
            })?;
            Ok(TagRuleApplicationResult::applied(
                tag,
                rule,
                targets,
                format!("{}: synergy x{}", rule.name, count),
            )
            .with_values(before, after))
        }
    }
}

fn percent_sign(rule: &TagRule) -> &'static str {
    if rule.is_percentage {
        "%"
    } else {
        ""
    }
}

/// Run `apply` on every target; returns before/after of the first one
fn for_each_target<F>(roster: &mut Roster, targets: &[InstanceId], mut apply: F) -> Result<(f64, f64)>
where
    F: FnMut(&mut CardInstance) -> (f64, f64),
{
    let mut first = None;
    for id in targets {
        let values = apply(roster.get_mut(*id)?);
        first.get_or_insert(values);
    }
    Ok(first.unwrap_or((0.0, 0.0)))
}

#[allow(clippy::too_many_arguments)]
fn apply_player_modifier(
    tag: &str,
    rule: &TagRule,
    modifier: PlayerModifier,
    source: InstanceId,
    owner: Option<PlayerId>,
    roster: &mut Roster,
    state: &mut BattleState,
    label: &str,
) -> Result<TagRuleApplicationResult> {
    let Some(player) = owner.and_then(|id| state.player_mut(id).ok()) else {
        return Ok(TagRuleApplicationResult::failed(tag, rule, "player not found"));
    };
    let (field, stat) = match modifier {
        PlayerModifier::CharismeGeneration => (&mut player.charisme_generation_modifier, "charismeGeneration"),
        PlayerModifier::Motivation => (&mut player.motivation_modifier, "motivationModifier"),
    };
    let before = *field;
    if rule.is_percentage {
        *field *= 1.0 + rule.value / 100.0;
    } else {
        *field += rule.value;
    }
    let after = *field;
    let player_id = player.id;

    roster
        .get_mut(source)?
        .record_effect(stat, rule.value, label, rule.is_percentage);
    Ok(TagRuleApplicationResult::applied(
        tag,
        rule,
        vec![source],
        format!("{}: player {} {} {:.2} -> {:.2}", rule.name, player_id, stat, before, after),
    )
    .with_values(before, after))
}

fn resolve_rule_targets(
    target: RuleTarget<'_>,
    source: InstanceId,
    owner: Option<PlayerId>,
    roster: &Roster,
) -> Vec<InstanceId> {
    roster
        .iter()
        .filter(|(id, entity)| match target {
            RuleTarget::SelfTarget => *id == source,
            RuleTarget::All => true,
            RuleTarget::Tagged(tag) => entity.has_tag_named(tag),
            RuleTarget::OwnTeam => entity.owner == owner,
            RuleTarget::Opponent | RuleTarget::OpponentTeam => *id != source && entity.owner != owner,
        })
        .map(|(id, _)| id)
        .collect()
}

fn condition_holds(
    condition: &TagRuleCondition,
    owner: Option<PlayerId>,
    targets: &[InstanceId],
    roster: &Roster,
    state: &BattleState,
    rng: &mut dyn RngCore,
) -> bool {
    let player = || owner.and_then(|id| state.player(id).ok());
    match condition {
        TagRuleCondition::HasTag { tag_name } => {
            any_target(roster, targets, |entity| entity.has_tag_named(tag_name))
        }
        TagRuleCondition::HasAlteration { alteration_id } => {
            any_target(roster, targets, |entity| entity.has_alteration(*alteration_id))
        }
        TagRuleCondition::HealthPercentage { comparison, value } => {
            any_target(roster, targets, |entity| comparison.evaluate(entity.health_percentage(), *value))
        }
        TagRuleCondition::CharismeAmount { comparison, value } => {
            player().is_some_and(|p| comparison.evaluate(p.charisme as f64, *value))
        }
        TagRuleCondition::MotivationAmount { comparison, value } => {
            player().is_some_and(|p| comparison.evaluate(p.motivation as f64, *value))
        }
        TagRuleCondition::ActiveLieu { lieu_name } => state.active_lieu_name() == Some(lieu_name.as_str()),
        TagRuleCondition::Chance { value } => rng.gen::<f64>() * 100.0 < *value,
    }
}

fn any_target(roster: &Roster, targets: &[InstanceId], check: impl Fn(&CardInstance) -> bool) -> bool {
    targets
        .iter()
        .filter_map(|id| roster.get(*id).ok())
        .any(check)
}
