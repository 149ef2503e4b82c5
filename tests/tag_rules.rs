//! Tag rule tests against the `night.rules.json` fixture
//!
//! NUIT characters get attack, health and a Parc-only defense bonus. RUE
//! characters lower the defense of the opposing team.

use similar_asserts::assert_eq;
use std::sync::Arc;
use yeaye_combat::config::BattleConfig;
use yeaye_combat::core::{Card, CardId, CardType, InstanceId, PlayerId, Tag, TagId};
use yeaye_combat::game::{convert_card_to_instance, CombatLog, CombatManager, VerbosityLevel};
use yeaye_combat::loader::{load_rules_file, registry_from_json};
use yeaye_combat::rules::TagRuleRegistry;

const ALICE: PlayerId = PlayerId::new(1);
const BOB: PlayerId = PlayerId::new(2);

const NIGHT_RULES: &str = include_str!("../test_catalogs/night.rules.json");

fn battle(rules: TagRuleRegistry) -> CombatManager {
    let mut combat = CombatManager::with_seed(BattleConfig::default(), rules, 3);
    combat.set_log(CombatLog::captured(VerbosityLevel::Verbose));
    let alice = combat.create_player(ALICE, "Alice").with_charisme(100);
    let bob = combat.create_player(BOB, "Bob").with_charisme(100);
    combat.add_player(alice);
    combat.add_player(bob);
    combat
}

fn nuit() -> Arc<Tag> {
    Arc::new(Tag::new(TagId::new(1), "NUIT"))
}

fn rue() -> Arc<Tag> {
    Arc::new(Tag::new(TagId::new(2), "RUE"))
}

fn character(id: u32, name: &str) -> Arc<Card> {
    Arc::new(Card::character(CardId::new(id), name, 10, 2.0, 1.0))
}

/// Alice fields a NUIT guard, then Bob fields a RUE thug
fn night_vs_street() -> (CombatManager, InstanceId, InstanceId) {
    let mut combat = battle(registry_from_json(NIGHT_RULES).unwrap());
    let guard = combat
        .summon_character(ALICE, character(1, "Gardien"), &[nuit()], &[])
        .unwrap();
    let thug = combat
        .summon_character(BOB, character(2, "Voyou"), &[rue()], &[])
        .unwrap();
    (combat, guard, thug)
}

fn lieu(id: u32, name: &str, owner: PlayerId, config: &BattleConfig) -> yeaye_combat::core::CardInstance {
    let card = Arc::new(Card::new(CardId::new(id), name, CardType::Lieu));
    convert_card_to_instance(card, Some(owner), &[], &[], config)
}

#[test]
fn test_fixture_loads_from_disk() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("test_catalogs/night.rules.json");
    let registry = load_rules_file(&path).unwrap();
    assert_eq!(registry.rules_for_tag("NUIT").len(), 4);
    assert_eq!(registry.rules_for_tag("RUE").len(), 1);
    assert!(registry.rules_for_tag("JOUR").is_empty());
}

#[test]
fn test_night_bonuses_apply_on_summon() {
    let (combat, guard, _) = night_vs_street();
    let guard = combat.entity(guard).unwrap();
    assert_eq!(guard.attack(), 4.0);
    assert_eq!(guard.max_health, 14);
    assert_eq!(guard.current_health, 14);
}

#[test]
fn test_street_lowers_opposing_defense_only() {
    let (combat, guard, thug) = night_vs_street();
    assert_eq!(combat.entity(guard).unwrap().defense(), 0.0);
    assert_eq!(combat.entity(thug).unwrap().defense(), 1.0);
}

#[test]
fn test_recompute_is_idempotent() {
    let (mut combat, guard, _) = night_vs_street();
    combat.entity_mut(guard).unwrap().apply_damage(5.0, None);
    let before = combat.entity(guard).unwrap().clone();

    combat.recalculate(guard).unwrap();
    combat.recalculate(guard).unwrap();

    let after = combat.entity(guard).unwrap();
    assert_eq!(after.attack(), before.attack());
    assert_eq!(after.max_health, 14);
    assert_eq!(after.current_health, before.current_health);
    assert_eq!(after.current_health, 9);
}

#[test]
fn test_active_lieu_condition() {
    let (mut combat, guard, _) = night_vs_street();
    let config = combat.config().clone();
    let lieux = vec![
        vec![lieu(5, "Parc", ALICE, &config), lieu(6, "Parking", ALICE, &config)],
        vec![lieu(7, "Gare", BOB, &config), lieu(8, "Toit", BOB, &config)],
    ];
    combat.distribute_lieu_cards(lieux).unwrap();

    let ids: Vec<(InstanceId, String)> = combat
        .state()
        .lieux
        .common
        .iter()
        .map(|l| (l.id, l.name().to_string()))
        .collect();
    let parc = ids.iter().find(|(_, name)| name == "Parc").unwrap().0;
    let gare = ids.iter().find(|(_, name)| name == "Gare").unwrap().0;

    combat.change_active_lieu(gare).unwrap();
    assert_eq!(combat.active_lieu().unwrap().name(), "Gare");
    // base 1, Intimidation -1
    assert_eq!(combat.entity(guard).unwrap().defense(), 0.0);

    combat.change_active_lieu(parc).unwrap();
    // base 1, Parc la nuit +3, Intimidation -1
    assert_eq!(combat.entity(guard).unwrap().defense(), 3.0);
}

#[test]
fn test_rule_events_are_recorded() {
    let (combat, _, _) = night_vs_street();
    let events = combat.log().events();

    let vision = events
        .iter()
        .find(|e| e.result.rule_name == "Vision nocturne")
        .unwrap();
    assert!(vision.result.success);
    assert_eq!(vision.result.source_tag, "NUIT");
    assert_eq!(vision.target.as_deref(), Some("Gardien"));
    assert_eq!(vision.result.original_value, Some(2.0));
    assert_eq!(vision.result.new_value, Some(4.0));

    let parc = events
        .iter()
        .find(|e| e.result.rule_name == "Parc la nuit")
        .unwrap();
    assert!(!parc.result.success);
    assert_eq!(parc.result.failure_reason.as_deref(), Some("condition not met"));
}

#[test]
fn test_charisme_generation_from_text_rule() {
    let (combat, _, _) = night_vs_street();
    let alice = combat.player(ALICE).unwrap();
    assert!(alice.charisme_generation_modifier > 1.0);
    assert_eq!(combat.player(BOB).unwrap().charisme_generation_modifier, 1.0);
}

#[test]
fn test_rules_added_at_runtime() {
    let mut rules = TagRuleRegistry::new();
    let id = rules
        .add_rule_from_text("NUIT", "attackModifier:self:50%:Pleine lune")
        .unwrap()
        .unwrap();
    let mut combat = battle(rules);
    let guard = combat
        .summon_character(ALICE, character(1, "Gardien"), &[nuit()], &[])
        .unwrap();
    assert_eq!(combat.entity(guard).unwrap().attack(), 3.0);

    assert!(combat.rules_mut().delete_rule("NUIT", id));
    combat.recalculate(guard).unwrap();
    assert_eq!(combat.entity(guard).unwrap().attack(), 2.0);
}
