//! Tag rules: definitions, text DSL and the interpreter

pub mod engine;
pub mod parser;
pub mod rule;

pub use engine::TagRuleRegistry;
pub use parser::parse_rule_from_text;
pub use rule::{
    Comparison, RuleTarget, TagRule, TagRuleApplicationResult, TagRuleCondition, TagRuleDefinition,
    TagRuleEffectType, TagRuleTargetType,
};
