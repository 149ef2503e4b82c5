//! Tag rule definitions
//!
//! A rule is stored in its flat catalog shape (the same shape the text DSL
//! produces). Before it runs, the flat target fields are turned into a closed
//! [`RuleTarget`], which is where a `tagged` rule without a tag is rejected.

use crate::core::{AlterationId, InstanceId};
use crate::{CombatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagRuleEffectType {
    CharismeGeneration,
    DamageModifier,
    MotivationModifier,
    HealthModifier,
    AttackModifier,
    DefenseModifier,
    ApplyAlteration,
    ConditionalEffect,
    SynergyEffect,
    DisableAttack,
}

impl TagRuleEffectType {
    pub const ALL: [TagRuleEffectType; 10] = [
        TagRuleEffectType::CharismeGeneration,
        TagRuleEffectType::DamageModifier,
        TagRuleEffectType::MotivationModifier,
        TagRuleEffectType::HealthModifier,
        TagRuleEffectType::AttackModifier,
        TagRuleEffectType::DefenseModifier,
        TagRuleEffectType::ApplyAlteration,
        TagRuleEffectType::ConditionalEffect,
        TagRuleEffectType::SynergyEffect,
        TagRuleEffectType::DisableAttack,
    ];

    /// DSL keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            TagRuleEffectType::CharismeGeneration => "charismeGeneration",
            TagRuleEffectType::DamageModifier => "damageModifier",
            TagRuleEffectType::MotivationModifier => "motivationModifier",
            TagRuleEffectType::HealthModifier => "healthModifier",
            TagRuleEffectType::AttackModifier => "attackModifier",
            TagRuleEffectType::DefenseModifier => "defenseModifier",
            TagRuleEffectType::ApplyAlteration => "applyAlteration",
            TagRuleEffectType::ConditionalEffect => "conditionalEffect",
            TagRuleEffectType::SynergyEffect => "synergyEffect",
            TagRuleEffectType::DisableAttack => "disableAttack",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|effect| effect.as_str() == keyword)
    }
}

impl fmt::Display for TagRuleEffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagRuleTargetType {
    #[serde(rename = "self")]
    SelfTarget,
    Opponent,
    All,
    Tagged,
    OwnTeam,
    OpponentTeam,
}

impl TagRuleTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagRuleTargetType::SelfTarget => "self",
            TagRuleTargetType::Opponent => "opponent",
            TagRuleTargetType::All => "all",
            TagRuleTargetType::Tagged => "tagged",
            TagRuleTargetType::OwnTeam => "ownTeam",
            TagRuleTargetType::OpponentTeam => "opponentTeam",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        [
            TagRuleTargetType::SelfTarget,
            TagRuleTargetType::Opponent,
            TagRuleTargetType::All,
            TagRuleTargetType::Tagged,
            TagRuleTargetType::OwnTeam,
            TagRuleTargetType::OpponentTeam,
        ]
        .into_iter()
        .find(|target| target.as_str() == keyword)
    }
}

/// Comparison operator used by numeric conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Comparison {
    #[default]
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl Comparison {
    pub fn evaluate(&self, actual: f64, expected: f64) -> bool {
        match self {
            Comparison::Equal => actual == expected,
            Comparison::NotEqual => actual != expected,
            Comparison::Greater => actual > expected,
            Comparison::Less => actual < expected,
            Comparison::GreaterOrEqual => actual >= expected,
            Comparison::LessOrEqual => actual <= expected,
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "equal" => Some(Comparison::Equal),
            "notEqual" => Some(Comparison::NotEqual),
            "greater" => Some(Comparison::Greater),
            "less" => Some(Comparison::Less),
            "greaterOrEqual" => Some(Comparison::GreaterOrEqual),
            "lessOrEqual" => Some(Comparison::LessOrEqual),
            _ => None,
        }
    }
}

/// Gate evaluated before a rule's effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TagRuleCondition {
    HasTag { tag_name: String },
    HasAlteration { alteration_id: AlterationId },
    HealthPercentage {
        #[serde(default)]
        comparison: Comparison,
        value: f64,
    },
    CharismeAmount {
        #[serde(default)]
        comparison: Comparison,
        value: f64,
    },
    MotivationAmount {
        #[serde(default)]
        comparison: Comparison,
        value: f64,
    },
    ActiveLieu { lieu_name: String },
    Chance { value: f64 },
}

/// A declarative rule triggered by a tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRule {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub effect_type: TagRuleEffectType,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub is_percentage: bool,
    pub target_type: TagRuleTargetType,
    #[serde(default)]
    pub target_tag: Option<String>,
    #[serde(default)]
    pub alteration_id: Option<AlterationId>,
    #[serde(default)]
    pub condition: Option<TagRuleCondition>,
    #[serde(default)]
    pub synergy_tags: Vec<String>,
    #[serde(default)]
    pub priority: i32,
}

impl TagRule {
    pub fn new(
        name: impl Into<String>,
        effect_type: TagRuleEffectType,
        value: f64,
        target_type: TagRuleTargetType,
    ) -> Self {
        TagRule {
            id: None,
            name: name.into(),
            description: String::new(),
            effect_type,
            value,
            is_percentage: false,
            target_type,
            target_tag: None,
            alteration_id: None,
            condition: None,
            synergy_tags: Vec::new(),
            priority: 0,
        }
    }

    pub fn percentage(mut self) -> Self {
        self.is_percentage = true;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_condition(mut self, condition: TagRuleCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn targeting_tag(mut self, tag: impl Into<String>) -> Self {
        self.target_type = TagRuleTargetType::Tagged;
        self.target_tag = Some(tag.into());
        self
    }

    /// Resolve the flat target fields into a closed target
    pub fn target(&self) -> Result<RuleTarget<'_>> {
        Ok(match self.target_type {
            TagRuleTargetType::SelfTarget => RuleTarget::SelfTarget,
            TagRuleTargetType::Opponent => RuleTarget::Opponent,
            TagRuleTargetType::All => RuleTarget::All,
            TagRuleTargetType::OwnTeam => RuleTarget::OwnTeam,
            TagRuleTargetType::OpponentTeam => RuleTarget::OpponentTeam,
            TagRuleTargetType::Tagged => match self.target_tag.as_deref() {
                Some(tag) if !tag.is_empty() => RuleTarget::Tagged(tag),
                _ => {
                    return Err(CombatError::InvalidRule(format!(
                        "rule '{}' targets tagged entities without a target tag",
                        self.name
                    )))
                }
            },
        })
    }
}

/// Validated rule target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget<'a> {
    SelfTarget,
    Opponent,
    All,
    Tagged(&'a str),
    OwnTeam,
    OpponentTeam,
}

/// Rules attached to one tag, as stored in a rules catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRuleDefinition {
    pub tag_name: String,
    pub rules: Vec<TagRule>,
}

/// Audit record of one rule application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRuleApplicationResult {
    pub success: bool,
    pub source_tag: String,
    pub rule_name: String,
    pub affected: Vec<InstanceId>,
    pub effect_description: String,
    pub original_value: Option<f64>,
    pub new_value: Option<f64>,
    pub failure_reason: Option<String>,
}

impl TagRuleApplicationResult {
    pub fn failed(source_tag: &str, rule: &TagRule, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        TagRuleApplicationResult {
            success: false,
            source_tag: source_tag.to_string(),
            rule_name: rule.name.clone(),
            affected: Vec::new(),
            effect_description: format!("{} not applied: {}", rule.name, reason),
            original_value: None,
            new_value: None,
            failure_reason: Some(reason),
        }
    }

    pub fn applied(
        source_tag: &str,
        rule: &TagRule,
        affected: Vec<InstanceId>,
        description: impl Into<String>,
    ) -> Self {
        TagRuleApplicationResult {
            success: true,
            source_tag: source_tag.to_string(),
            rule_name: rule.name.clone(),
            affected,
            effect_description: description.into(),
            original_value: None,
            new_value: None,
            failure_reason: None,
        }
    }

    pub fn with_values(mut self, before: f64, after: f64) -> Self {
        self.original_value = Some(before);
        self.new_value = Some(after);
        self
    }
}
