//! Battle configuration
//!
//! Numbers the engine reads once when a battle is set up. A config can come
//! from JSON (missing fields take their defaults) or from any key/value
//! [`ConfigSource`] such as an admin settings table.

use crate::game::actions::ConflictResolutionConfig;
use crate::game::lieu::LieuDistributionConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Key/value lookup for numeric settings
pub trait ConfigSource {
    fn get_value(&self, key: &str) -> Option<i64>;
}

impl ConfigSource for BTreeMap<String, i64> {
    fn get_value(&self, key: &str) -> Option<i64> {
        self.get(key).copied()
    }
}

impl ConfigSource for serde_json::Value {
    fn get_value(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(serde_json::Value::as_i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub max_object_slots: u32,
    pub max_characters: usize,
    pub base_max_health: u32,
    pub default_motivation: u32,
    pub max_charisme: u32,
    pub starting_charisme: u32,
    pub max_level: u32,
    pub conflict: ConflictResolutionConfig,
    /// `None` waits for the UI forever
    pub manual_targeting_timeout_ms: Option<u64>,
    pub lieu: LieuDistributionConfig,
}

impl BattleConfig {
    pub const DEFAULT_MAX_OBJECT_SLOTS: u32 = 3;
    pub const DEFAULT_MAX_CHARACTERS: usize = 5;
    pub const DEFAULT_BASE_MAX_HEALTH: u32 = 100;
    pub const DEFAULT_MOTIVATION: u32 = 10;
    pub const DEFAULT_MAX_CHARISME: u32 = 100;
    pub const DEFAULT_STARTING_CHARISME: u32 = 20;
    pub const DEFAULT_MAX_LEVEL: u32 = 10;
    pub const DEFAULT_MANUAL_TIMEOUT_MS: u64 = 30_000;

    pub fn new() -> Self {
        BattleConfig {
            max_object_slots: Self::DEFAULT_MAX_OBJECT_SLOTS,
            max_characters: Self::DEFAULT_MAX_CHARACTERS,
            base_max_health: Self::DEFAULT_BASE_MAX_HEALTH,
            default_motivation: Self::DEFAULT_MOTIVATION,
            max_charisme: Self::DEFAULT_MAX_CHARISME,
            starting_charisme: Self::DEFAULT_STARTING_CHARISME,
            max_level: Self::DEFAULT_MAX_LEVEL,
            conflict: ConflictResolutionConfig::default(),
            manual_targeting_timeout_ms: Some(Self::DEFAULT_MANUAL_TIMEOUT_MS),
            lieu: LieuDistributionConfig::default(),
        }
    }

    /// Read slot and roster limits from a key/value source
    ///
    /// Missing, negative or out-of-range values fall back to the defaults.
    pub fn load(source: &dyn ConfigSource) -> Self {
        let mut config = Self::new();
        if let Some(slots) = source.get_value("max_object_slots").and_then(|v| u32::try_from(v).ok()) {
            config.max_object_slots = slots;
        }
        if let Some(max) = source.get_value("max_characters").and_then(|v| usize::try_from(v).ok()) {
            config.max_characters = max;
        }
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn manual_timeout(&self) -> Option<Duration> {
        self.manual_targeting_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::actions::ResolutionStrategy;

    #[test]
    fn test_defaults() {
        let config = BattleConfig::default();
        assert_eq!(config.max_object_slots, 3);
        assert_eq!(config.max_characters, 5);
        assert_eq!(config.conflict.strategy, ResolutionStrategy::Priority);
        assert_eq!(config.manual_timeout(), Some(Duration::from_millis(30_000)));
        assert_eq!(config.lieu.lieu_cards_per_player, 2);
    }

    #[test]
    fn test_load_from_source_with_fallbacks() {
        let mut source = BTreeMap::new();
        source.insert("max_object_slots".to_string(), 4);
        source.insert("max_characters".to_string(), -1);
        let config = BattleConfig::load(&source);
        assert_eq!(config.max_object_slots, 4);
        assert_eq!(config.max_characters, 5);

        let json: serde_json::Value = serde_json::json!({"max_characters": 2});
        let config = BattleConfig::load(&json);
        assert_eq!(config.max_object_slots, 3);
        assert_eq!(config.max_characters, 2);
    }

    #[test]
    fn test_partial_json() {
        let config = BattleConfig::from_json_str(
            r#"{"max_characters": 3, "conflict": {"strategy": "LOW_COST"}, "manual_targeting_timeout_ms": null}"#,
        )
        .unwrap();
        assert_eq!(config.max_characters, 3);
        assert_eq!(config.conflict.strategy, ResolutionStrategy::LowCost);
        assert_eq!(config.conflict.random_chance_percent, 0);
        assert_eq!(config.manual_timeout(), None);
        assert_eq!(config.base_max_health, 100);

        assert!(BattleConfig::from_json_str("{not json").is_err());
    }
}
