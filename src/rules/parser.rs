//! Text rule DSL
//!
//! ```text
//! effectType:targetSpec:value[%]:description[:IF:conditionType:comparison:value]
//! effectType:targetSpec:value[%]:description:IF(conditionType,comparison,value)
//! effectType:targetSpec:value[%]:description:SYNERGY:tagA,tagB
//! ```
//!
//! `targetSpec` is a target keyword or `TAGGED(tag)`. A malformed head
//! (the first four fields) parses to `None`. A malformed trailing clause
//! is dropped and the rule is kept without it.

use crate::core::AlterationId;
use crate::rules::rule::{Comparison, TagRule, TagRuleCondition, TagRuleEffectType, TagRuleTargetType};

/// Parse one DSL line into a rule
pub fn parse_rule_from_text(text: &str) -> Option<TagRule> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    if parts.len() < 4 {
        return None;
    }

    let effect_type = TagRuleEffectType::from_keyword(parts[0])?;
    let (target_type, target_tag) = parse_target(parts[1])?;
    let (value, is_percentage) = parse_value(parts[2])?;

    let mut rule = TagRule::new(
        format!("Rule {} on {}", effect_type.as_str(), target_type.as_str()),
        effect_type,
        value,
        target_type,
    );
    rule.description = parts[3].to_string();
    rule.is_percentage = is_percentage;
    rule.target_tag = target_tag;

    match &parts[4..] {
        ["IF", kind, comparison, value, ..] => {
            rule.condition = parse_condition(kind, comparison, value);
        }
        ["SYNERGY", tags, ..] => {
            rule.synergy_tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        [inline, ..] => rule.condition = parse_inline_condition(inline),
        [] => {}
    }

    Some(rule)
}

fn parse_target(spec: &str) -> Option<(TagRuleTargetType, Option<String>)> {
    if let Some(open) = spec.find('(') {
        if !spec[..open].eq_ignore_ascii_case("tagged") {
            return None;
        }
        let tag = spec[open + 1..].strip_suffix(')')?.trim();
        if tag.is_empty() {
            return None;
        }
        return Some((TagRuleTargetType::Tagged, Some(tag.to_string())));
    }
    TagRuleTargetType::from_keyword(spec).map(|target| (target, None))
}

fn parse_value(text: &str) -> Option<(f64, bool)> {
    let (number, is_percentage) = match text.strip_suffix('%') {
        Some(number) => (number, true),
        None => (text, false),
    };
    let number = number.trim();
    let number = number.strip_prefix('+').unwrap_or(number);
    let value = number.parse::<f64>().ok()?;
    value.is_finite().then_some((value, is_percentage))
}

fn parse_inline_condition(clause: &str) -> Option<TagRuleCondition> {
    let inner = clause.strip_prefix("IF(")?.strip_suffix(')')?;
    let mut fields = inner.splitn(3, ',').map(str::trim);
    let (kind, comparison, value) = (fields.next()?, fields.next()?, fields.next()?);
    parse_condition(kind, comparison, value)
}

fn parse_condition(kind: &str, comparison: &str, value: &str) -> Option<TagRuleCondition> {
    let comparison = Comparison::from_keyword(comparison)?;
    let number = || value.parse::<f64>().ok();
    Some(match kind {
        "hasTag" => TagRuleCondition::HasTag {
            tag_name: value.to_string(),
        },
        "hasAlteration" => TagRuleCondition::HasAlteration {
            alteration_id: AlterationId::new(value.parse().ok()?),
        },
        "activeLieu" => TagRuleCondition::ActiveLieu {
            lieu_name: value.to_string(),
        },
        "healthPercentage" => TagRuleCondition::HealthPercentage {
            comparison,
            value: number()?,
        },
        "charismeAmount" => TagRuleCondition::CharismeAmount {
            comparison,
            value: number()?,
        },
        "motivationAmount" => TagRuleCondition::MotivationAmount {
            comparison,
            value: number()?,
        },
        "chance" => TagRuleCondition::Chance { value: number()? },
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rule() {
        let rule = parse_rule_from_text("attackModifier:self:+2:Plus fort la nuit").unwrap();
        assert_eq!(rule.effect_type, TagRuleEffectType::AttackModifier);
        assert_eq!(rule.target_type, TagRuleTargetType::SelfTarget);
        assert_eq!(rule.value, 2.0);
        assert!(!rule.is_percentage);
        assert_eq!(rule.description, "Plus fort la nuit");
        assert_eq!(rule.name, "Rule attackModifier on self");
        assert!(rule.condition.is_none());
    }

    #[test]
    fn test_parse_tagged_percentage() {
        let rule = parse_rule_from_text("damageModifier:TAGGED(NUIT):+20%:Degats de nuit").unwrap();
        assert_eq!(rule.target_type, TagRuleTargetType::Tagged);
        assert_eq!(rule.target_tag.as_deref(), Some("NUIT"));
        assert_eq!(rule.value, 20.0);
        assert!(rule.is_percentage);

        let lower = parse_rule_from_text("damageModifier:tagged(NUIT):20%:x").unwrap();
        assert_eq!(lower.target_tag.as_deref(), Some("NUIT"));
    }

    #[test]
    fn test_parse_trailing_condition() {
        let rule =
            parse_rule_from_text("defenseModifier:self:50%:Carapace:IF:healthPercentage:less:30").unwrap();
        assert_eq!(
            rule.condition,
            Some(TagRuleCondition::HealthPercentage {
                comparison: Comparison::Less,
                value: 30.0
            })
        );

        let rule = parse_rule_from_text("attackModifier:self:1:x:IF:hasTag:equal:NUIT").unwrap();
        assert_eq!(
            rule.condition,
            Some(TagRuleCondition::HasTag {
                tag_name: "NUIT".to_string()
            })
        );
    }

    #[test]
    fn test_parse_inline_condition() {
        let rule =
            parse_rule_from_text("attackModifier:self:3:Lumiere:IF(activeLieu,equal,Parking)").unwrap();
        assert_eq!(
            rule.condition,
            Some(TagRuleCondition::ActiveLieu {
                lieu_name: "Parking".to_string()
            })
        );

        let rule = parse_rule_from_text("attackModifier:self:3:x:IF(hasAlteration,equal,7)").unwrap();
        assert_eq!(
            rule.condition,
            Some(TagRuleCondition::HasAlteration {
                alteration_id: AlterationId::new(7)
            })
        );
    }

    #[test]
    fn test_parse_synergy() {
        let rule = parse_rule_from_text("synergyEffect:self:1:Meute:SYNERGY:LOUP, CHIEN").unwrap();
        assert_eq!(rule.synergy_tags, vec!["LOUP".to_string(), "CHIEN".to_string()]);
    }

    #[test]
    fn test_malformed_rules_yield_none() {
        for text in [
            "",
            "attackModifier:self:2",
            "explode:self:2:x",
            "attackModifier:everyone:2:x",
            "attackModifier:self:abc:x",
            "attackModifier:TAGGED():2:x",
        ] {
            assert!(parse_rule_from_text(text).is_none(), "{text:?} should not parse");
        }
    }

    #[test]
    fn test_malformed_clause_keeps_rule() {
        for text in [
            "attackModifier:self:2:x:IF:weather:equal:rain",
            "attackModifier:self:2:x:IF:healthPercentage:around:50",
            "attackModifier:self:2:x:IF:hasAlteration:equal:abc",
            "attackModifier:self:2:x:IF(chance,equal)",
            "attackModifier:self:2:x:IF",
            "attackModifier:self:2:x:whatever",
        ] {
            let rule = parse_rule_from_text(text).unwrap_or_else(|| panic!("{text:?} should parse"));
            assert_eq!(rule.effect_type, TagRuleEffectType::AttackModifier);
            assert_eq!(rule.value, 2.0);
            assert!(rule.condition.is_none(), "{text:?} kept a condition");
        }

        let rule = parse_rule_from_text("synergyEffect:self:1:x:SYNERGY:").unwrap();
        assert!(rule.synergy_tags.is_empty());
    }
}
