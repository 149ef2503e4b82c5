//! Tag rule catalog loading
//!
//! A rules file is a JSON array of per-tag entries. Each entry may list
//! structured rules, DSL lines, or both:
//!
//! ```json
//! [{"tagName": "NUIT", "rules": [...], "textRules": ["attackModifier:self:2:Nocturne"]}]
//! ```

use crate::rules::{parse_rule_from_text, TagRule, TagRuleDefinition, TagRuleRegistry};
use crate::{CombatError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleFileEntry {
    tag_name: String,
    #[serde(default)]
    rules: Vec<TagRule>,
    #[serde(default)]
    text_rules: Vec<String>,
}

/// Parse a rules file into per-tag definitions
///
/// A DSL line that does not parse is an error here: a catalog should not
/// silently lose rules.
pub fn parse_rule_definitions(json: &str) -> Result<Vec<TagRuleDefinition>> {
    let entries: Vec<RuleFileEntry> = serde_json::from_str(json)?;
    entries
        .into_iter()
        .map(|entry| {
            let mut rules = entry.rules;
            for line in &entry.text_rules {
                let rule = parse_rule_from_text(line).ok_or_else(|| {
                    CombatError::ParseError(format!("tag {}: cannot parse rule '{line}'", entry.tag_name))
                })?;
                rules.push(rule);
            }
            Ok(TagRuleDefinition {
                tag_name: entry.tag_name,
                rules,
            })
        })
        .collect()
}

pub fn registry_from_json(json: &str) -> Result<TagRuleRegistry> {
    let mut registry = TagRuleRegistry::new();
    registry.load_rules(parse_rule_definitions(json)?)?;
    Ok(registry)
}

pub fn load_rules_file(path: &Path) -> Result<TagRuleRegistry> {
    let content = std::fs::read_to_string(path)?;
    registry_from_json(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::TagRuleEffectType;

    #[test]
    fn test_structured_and_text_rules() {
        let json = r#"[
            {"tagName": "NUIT",
             "rules": [{"name": "Ombre", "effectType": "defenseModifier", "value": 1,
                        "targetType": "self", "priority": 5}],
             "textRules": ["attackModifier:self:2:Nocturne"]}
        ]"#;
        let registry = registry_from_json(json).unwrap();
        let rules = registry.rules_for_tag("NUIT");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "Ombre");
        assert_eq!(rules[1].effect_type, TagRuleEffectType::AttackModifier);
    }

    #[test]
    fn test_bad_text_rule_is_an_error() {
        let json = r#"[{"tagName": "NUIT", "textRules": ["nonsense"]}]"#;
        assert!(matches!(registry_from_json(json), Err(CombatError::ParseError(_))));
    }

    #[test]
    fn test_tagged_rule_without_tag_is_rejected() {
        let json = r#"[{"tagName": "NUIT",
                        "rules": [{"name": "X", "effectType": "attackModifier", "targetType": "tagged"}]}]"#;
        assert!(matches!(registry_from_json(json), Err(CombatError::InvalidRule(_))));
    }
}
