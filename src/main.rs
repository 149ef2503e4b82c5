//! Yeaye - battle simulator
//!
//! Runs seeded battles between the first two decks of a catalog.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use yeaye_combat::{
    config::BattleConfig,
    core::{CardType, InstanceId, PlayerId},
    game::{
        convert_card_to_instance, CombatLog, CombatManager, ResolutionStrategy, VerbosityLevel,
    },
    loader::{load_rules_file, Catalog},
    rules::{parse_rule_from_text, TagRuleRegistry},
};

/// Conflict resolution strategy override
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Fifo,
    Lifo,
    Random,
    Priority,
    Cost,
    LowCost,
}

impl From<StrategyArg> for ResolutionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Fifo => ResolutionStrategy::Fifo,
            StrategyArg::Lifo => ResolutionStrategy::Lifo,
            StrategyArg::Random => ResolutionStrategy::Random,
            StrategyArg::Priority => ResolutionStrategy::Priority,
            StrategyArg::Cost => ResolutionStrategy::Cost,
            StrategyArg::LowCost => ResolutionStrategy::LowCost,
        }
    }
}

/// Verbosity level for battle output (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

impl From<VerbosityArg> for VerbosityLevel {
    fn from(arg: VerbosityArg) -> Self {
        arg.0
    }
}

#[derive(Parser)]
#[command(name = "yeaye")]
#[command(about = "Yeaye - turn-based card battle simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by `simulate` and `batch`
#[derive(clap::Args, Debug, Clone)]
struct BattleArgs {
    /// Card catalog (JSON)
    #[arg(long, value_name = "CATALOG")]
    catalog: PathBuf,

    /// Tag rules (JSON)
    #[arg(long, value_name = "RULES")]
    rules: Option<PathBuf>,

    /// Battle configuration (JSON); defaults apply to missing fields
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of turns before the battle is called a draw
    #[arg(long, default_value = "30")]
    turns: u32,

    /// Override the configured conflict resolution strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one seeded battle between the first two decks
    Simulate {
        #[command(flatten)]
        battle: BattleArgs,

        /// Set random seed for deterministic runs
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Verbosity level for battle output (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,
    },

    /// Run many battles in parallel and report win counts
    Batch {
        #[command(flatten)]
        battle: BattleArgs,

        /// Number of battles
        #[arg(long, default_value = "100")]
        games: u64,

        /// First seed; battle i uses seed + i
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Parse one line of the tag rule DSL and print it as JSON
    ParseRule {
        /// Rule text, e.g. "attackModifier:self:2:Nocturne"
        text: String,
    },
}

/// Everything a battle needs, loaded once
struct Setup {
    catalog: Catalog,
    rules: TagRuleRegistry,
    config: BattleConfig,
    max_turns: u32,
}

impl Setup {
    fn load(args: &BattleArgs) -> anyhow::Result<Self> {
        let catalog = Catalog::load_from_file(&args.catalog)
            .with_context(|| format!("loading catalog {}", args.catalog.display()))?;
        let rules = match &args.rules {
            Some(path) => load_rules_file(path).with_context(|| format!("loading rules {}", path.display()))?,
            None => TagRuleRegistry::new(),
        };
        let mut config = match &args.config {
            Some(path) => load_config(path)?,
            None => BattleConfig::default(),
        };
        if let Some(strategy) = args.strategy {
            config.conflict.strategy = strategy.into();
        }
        if catalog.decks().len() < 2 {
            bail!("the catalog needs at least two decks, found {}", catalog.decks().len());
        }
        Ok(Setup {
            catalog,
            rules,
            config,
            max_turns: args.turns,
        })
    }
}

fn load_config(path: &Path) -> anyhow::Result<BattleConfig> {
    BattleConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

#[derive(Debug, Clone)]
struct BattleOutcome {
    winner: Option<(PlayerId, String)>,
    turns: u32,
}

/// Field both decks and fight until a base falls or the turn limit
fn run_battle(setup: &Setup, seed: u64, verbosity: VerbosityLevel) -> anyhow::Result<BattleOutcome> {
    let mut combat = CombatManager::with_seed(setup.config.clone(), setup.rules.clone(), seed);
    combat.set_log(CombatLog::with_verbosity(verbosity));
    setup.catalog.install_alterations(combat.state_mut());

    let mut player_ids = Vec::new();
    let mut lieux = Vec::new();
    for (index, deck) in setup.catalog.decks().iter().take(2).enumerate() {
        let id = PlayerId::new(index as u32 + 1);
        let name = deck.player.clone().unwrap_or_else(|| deck.name.clone());
        let player = combat.create_player(id, name);
        combat.add_player(player);
        player_ids.push(id);

        let mut objects = Vec::new();
        let mut own_lieux = Vec::new();
        for request in setup.catalog.deck_requests(deck, id)? {
            let card_type = request.card.card_type;
            match card_type {
                CardType::Personnage => {
                    if let Err(err) = combat.summon_character(id, request.card, &request.tags, &request.spells) {
                        combat.log().diagnostic(&format!("summon skipped: {err}"));
                    }
                }
                CardType::Objet => objects.push(request),
                CardType::Lieu => own_lieux.push(convert_card_to_instance(
                    request.card,
                    Some(id),
                    &request.tags,
                    &request.spells,
                    combat.config(),
                )),
                CardType::Action | CardType::Evenement => {}
            }
        }
        lieux.push(own_lieux);

        for request in objects {
            let holder = combat
                .player(id)?
                .characters
                .iter()
                .copied()
                .find(|c| combat.entity(*c).is_ok_and(|e| e.has_available_object_slot()));
            let Some(holder) = holder else { break };
            let object = convert_card_to_instance(request.card, Some(id), &request.tags, &request.spells, combat.config());
            let object = combat.add_instance(object);
            if let Err(err) = combat.equip_object(holder, object, None) {
                combat.log().diagnostic(&format!("equip skipped: {err}"));
            }
        }
    }
    if let Err(err) = combat.distribute_lieu_cards(lieux) {
        combat.log().diagnostic(&format!("no lieu this battle: {err}"));
    }

    for _ in 0..setup.max_turns {
        for (seat, player) in player_ids.iter().enumerate() {
            let opponent = player_ids[1 - seat];
            plan_turn(&mut combat, *player, opponent)?;
        }
        combat.resolve_all_actions();
        combat.process_defeated();
        if let Some(winner) = combat.winner() {
            let name = combat.player(winner)?.name.clone();
            combat.log().minimal(&format!("{name} wins on turn {}", combat.turn() + 1));
            return Ok(BattleOutcome {
                winner: Some((winner, name)),
                turns: combat.turn() + 1,
            });
        }
        combat.end_turn()?;
    }
    combat.log().minimal("Draw: turn limit reached");
    Ok(BattleOutcome {
        winner: None,
        turns: combat.turn(),
    })
}

/// Every character casts its first usable spell or attacks
fn plan_turn(combat: &mut CombatManager, player: PlayerId, opponent: PlayerId) -> anyhow::Result<()> {
    let own: Vec<InstanceId> = combat.player(player)?.characters.clone();
    let targets: Vec<InstanceId> = combat.player(opponent)?.characters.clone();

    for unit in own {
        let spell = combat
            .entity(unit)?
            .available_spells
            .iter()
            .find(|s| s.is_usable())
            .map(|s| s.spell.id);
        if let Some(spell) = spell {
            if combat.cast_spell(unit, spell, &[]).is_some() {
                continue;
            }
        }
        if targets.is_empty() {
            if let Err(err) = combat.attack_base(unit, opponent, false) {
                combat.log().diagnostic(&err.to_string());
            }
        } else if let Some(target) = combat.random_target(&targets) {
            combat.execute_attack(unit, target);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            battle,
            seed,
            verbosity,
        } => {
            let setup = Setup::load(&battle)?;
            let outcome = run_battle(&setup, seed, verbosity.into())?;
            match outcome.winner {
                Some((_, name)) => println!("Winner: {name} after {} turns", outcome.turns),
                None => println!("Draw after {} turns", outcome.turns),
            }
        }
        Commands::Batch { battle, games, seed } => {
            let setup = Setup::load(&battle)?;
            let outcomes = (seed..seed + games)
                .into_par_iter()
                .map(|s| run_battle(&setup, s, VerbosityLevel::Silent))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let mut wins: std::collections::BTreeMap<String, u64> = std::collections::BTreeMap::new();
            let mut draws = 0u64;
            let mut total_turns = 0u64;
            for outcome in &outcomes {
                total_turns += outcome.turns as u64;
                match &outcome.winner {
                    Some((_, name)) => *wins.entry(name.clone()).or_default() += 1,
                    None => draws += 1,
                }
            }
            println!("=== {games} battles ===");
            for (name, count) in &wins {
                println!("{name}: {count} wins ({:.1}%)", *count as f64 * 100.0 / games.max(1) as f64);
            }
            println!("Draws: {draws}");
            println!("Average length: {:.1} turns", total_turns as f64 / games.max(1) as f64);
        }
        Commands::ParseRule { text } => match parse_rule_from_text(&text) {
            Some(rule) => println!("{}", serde_json::to_string_pretty(&rule)?),
            None => bail!("could not parse rule '{text}'"),
        },
    }

    Ok(())
}
