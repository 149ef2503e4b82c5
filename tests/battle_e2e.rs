//! End-to-end battle tests
//!
//! Drive `CombatManager` through planning, resolution, defeat and turn
//! boundaries the way a game server would.

use std::sync::Arc;
use yeaye_combat::config::BattleConfig;
use yeaye_combat::core::{
    Alteration, AlterationEffect, AlterationId, Card, CardId, CardType, PlayerId, Rarity, Spell,
    SpellEffect, SpellEffectKind, SpellId, SpellTargetType,
};
use yeaye_combat::game::{CombatLog, CombatManager, VerbosityLevel};
use yeaye_combat::loader::Catalog;
use yeaye_combat::rules::TagRuleRegistry;

const ALICE: PlayerId = PlayerId::new(1);
const BOB: PlayerId = PlayerId::new(2);

fn two_player_battle(seed: u64) -> CombatManager {
    let mut combat = CombatManager::with_seed(BattleConfig::default(), TagRuleRegistry::new(), seed);
    combat.set_log(CombatLog::captured(VerbosityLevel::Verbose));
    let alice = combat.create_player(ALICE, "Alice").with_charisme(100);
    let bob = combat.create_player(BOB, "Bob").with_charisme(100);
    combat.add_player(alice);
    combat.add_player(bob);
    combat
}

fn character(id: u32, name: &str, health: u32, attack: f64, defense: f64) -> Arc<Card> {
    Arc::new(Card::character(CardId::new(id), name, health, attack, defense))
}

#[test]
fn test_buff_expires_after_one_turn() {
    let mut combat = two_player_battle(1);
    let unit = combat
        .summon_character(ALICE, character(1, "Gardien", 10, 2.0, 0.0), &[], &[])
        .unwrap();
    let buff = combat.register_alteration(
        Alteration::new(AlterationId::new(1), "Rage", AlterationEffect::modify_attack(2.0)).with_duration(1),
    );

    combat.entity_mut(unit).unwrap().add_alteration(buff, None);
    assert_eq!(combat.entity(unit).unwrap().attack(), 4.0);
    assert_eq!(combat.entity(unit).unwrap().current_health, 10);

    combat.end_turn().unwrap();

    let unit = combat.entity(unit).unwrap();
    assert_eq!(unit.attack(), 2.0);
    assert!(unit.active_alterations.is_empty());
}

#[test]
fn test_damage_then_heal_stays_in_bounds() {
    let mut combat = two_player_battle(2);
    let unit = combat
        .summon_character(ALICE, character(1, "Gardien", 10, 2.0, 0.0), &[], &[])
        .unwrap();
    let entity = combat.entity_mut(unit).unwrap();
    entity.apply_damage(7.0, None);
    entity.heal(20.0, None);
    assert_eq!(entity.current_health, 10);
    entity.apply_damage(25.0, None);
    assert_eq!(entity.current_health, 0);
    assert!(entity.is_defeated());
}

#[test]
fn test_fifo_executes_in_planning_order() {
    let mut combat = two_player_battle(3);
    let a = combat
        .summon_character(ALICE, character(1, "A", 10, 3.0, 0.0), &[], &[])
        .unwrap();
    let b = combat
        .summon_character(ALICE, character(2, "B", 10, 3.0, 0.0), &[], &[])
        .unwrap();
    let x = combat
        .summon_character(BOB, character(3, "X", 10, 1.0, 0.0), &[], &[])
        .unwrap();
    let y = combat
        .summon_character(BOB, character(4, "Y", 10, 1.0, 0.0), &[], &[])
        .unwrap();

    let first = combat.execute_attack(b, y).unwrap();
    let second = combat.execute_attack(a, x).unwrap();
    let report = combat.resolve_all_actions();

    assert!(report.conflicts.is_empty());
    assert_eq!(report.executed, vec![first, second]);
    let actions = combat.log().messages_in("action");
    let attacks: Vec<&String> = actions.iter().filter(|m| m.contains("attacks")).collect();
    assert_eq!(attacks.len(), 2);
    assert!(attacks[0].starts_with("B attacks Y"));
    assert!(attacks[1].starts_with("A attacks X"));
}

#[test]
fn test_same_target_attacks_conflict() {
    let mut combat = two_player_battle(4);
    let a = combat
        .summon_character(ALICE, character(1, "A", 10, 3.0, 0.0), &[], &[])
        .unwrap();
    let b = combat
        .summon_character(ALICE, character(2, "B", 10, 3.0, 0.0), &[], &[])
        .unwrap();
    let x = combat
        .summon_character(BOB, character(3, "X", 10, 1.0, 0.0), &[], &[])
        .unwrap();

    let kept = combat.execute_attack(a, x).unwrap();
    let dropped = combat.execute_attack(b, x).unwrap();
    let report = combat.resolve_all_actions();

    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].kept, kept);
    assert_eq!(report.conflicts[0].cancelled, dropped);
    assert_eq!(combat.entity(x).unwrap().current_health, 7);
    assert!(!combat.entity(b).unwrap().is_exhausted);
}

#[test]
fn test_defeat_clears_board_and_opens_base() {
    let mut combat = two_player_battle(5);
    let brute = combat
        .summon_character(ALICE, character(1, "Brute", 10, 9.0, 0.0), &[], &[])
        .unwrap();
    let mut cheat = Card::character(CardId::new(2), "Triche", 3, 1.0, 0.0);
    cheat.rarity = Rarity::Cheate;
    let victim = combat.summon_character(BOB, Arc::new(cheat), &[], &[]).unwrap();
    combat.state_mut().player_mut(ALICE).unwrap().charisme = 0;

    assert!(combat.attack_base(brute, BOB, false).is_err());
    combat.execute_attack(brute, victim).unwrap();
    combat.resolve_all_actions();
    assert_eq!(combat.process_defeated(), vec![victim]);
    assert_eq!(combat.player(ALICE).unwrap().charisme, 40);

    combat.end_turn().unwrap();
    combat.attack_base(brute, BOB, false).unwrap();
    combat.resolve_all_actions();
    assert_eq!(combat.player(BOB).unwrap().base.current_health, 96);
}

#[test]
fn test_spell_chain_over_turns() {
    let mut combat = two_player_battle(6);
    let poison = combat.register_alteration(
        Alteration::new(
            AlterationId::new(2),
            "Poison",
            AlterationEffect::DamageOverTime { value: 2.0 },
        )
        .with_duration(2)
        .stackable(),
    );
    let spell = Arc::new(
        Spell::new(SpellId::new(1), "Venin")
            .with_cost(1.0)
            .with_effect(SpellEffect::apply_alteration(poison.id, SpellTargetType::Opponent)),
    );
    let caster = combat
        .summon_character(ALICE, character(1, "Mage", 10, 1.0, 0.0), &[], &[spell])
        .unwrap();
    let target = combat
        .summon_character(BOB, character(2, "Cible", 12, 1.0, 0.0), &[], &[])
        .unwrap();

    combat.cast_spell(caster, SpellId::new(1), &[target]).unwrap();
    combat.resolve_all_actions();
    assert!(combat.entity(target).unwrap().has_alteration(poison.id));

    combat.end_turn().unwrap();
    assert_eq!(combat.entity(target).unwrap().current_health, 10);
    // cooldown of 1 is over after one turn
    combat.cast_spell(caster, SpellId::new(1), &[target]).unwrap();
    combat.resolve_all_actions();
    assert_eq!(combat.entity(target).unwrap().alteration(poison.id).unwrap().stack_count, 2);

    combat.end_turn().unwrap();
    assert_eq!(combat.entity(target).unwrap().current_health, 6);
}

#[test]
fn test_damage_spell_with_random_targets_never_hits_caster() {
    let mut combat = two_player_battle(7);
    let spell = Arc::new(Spell::new(SpellId::new(3), "Jet").with_effect(SpellEffect::new(
        SpellEffectKind::Damage,
        2.0,
        SpellTargetType::Random,
    )));
    let caster = combat
        .summon_character(ALICE, character(1, "Lanceur", 10, 1.0, 0.0), &[], &[spell])
        .unwrap();
    combat
        .summon_character(BOB, character(2, "Cible", 10, 1.0, 0.0), &[], &[])
        .unwrap();

    combat.cast_spell(caster, SpellId::new(3), &[]).unwrap();
    combat.resolve_all_actions();
    assert_eq!(combat.entity(caster).unwrap().current_health, 10);
    let hurt: u32 = combat
        .roster()
        .iter()
        .map(|(_, e)| e.max_health - e.current_health)
        .sum();
    assert_eq!(hurt, 2);
}

#[test]
fn test_catalog_battle_runs_to_completion() {
    let json = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/test_catalogs/park_duel.catalog.json"
    ))
    .unwrap();
    let catalog = Catalog::from_json_str(&json).unwrap();
    let mut combat = two_player_battle(11);
    catalog.install_alterations(combat.state_mut());

    for (index, deck) in catalog.decks().iter().enumerate() {
        let player = PlayerId::new(index as u32 + 1);
        for request in catalog.deck_requests(deck, player).unwrap() {
            if request.card.card_type == CardType::Personnage {
                combat
                    .summon_character(player, request.card, &request.tags, &request.spells)
                    .unwrap();
            }
        }
    }
    assert_eq!(combat.player(ALICE).unwrap().characters.len(), 2);
    assert_eq!(combat.player(BOB).unwrap().characters.len(), 2);

    let mut turns = 0;
    while combat.winner().is_none() && turns < 200 {
        for (me, them) in [(ALICE, BOB), (BOB, ALICE)] {
            let own = combat.player(me).unwrap().characters.clone();
            let foes = combat.player(them).unwrap().characters.clone();
            for unit in own {
                match combat.random_target(&foes) {
                    Some(target) => {
                        combat.execute_attack(unit, target);
                    }
                    None => {
                        let _ = combat.attack_base(unit, them, false);
                    }
                }
            }
        }
        combat.resolve_all_actions();
        combat.process_defeated();
        for (_, entity) in combat.roster().iter() {
            assert!(entity.current_health <= entity.max_health);
        }
        combat.end_turn().unwrap();
        turns += 1;
    }
    assert!(combat.winner().is_some(), "no winner after {turns} turns");
}
