use anyhow::anyhow;
use clap::{Parser, Subcommand, ValueEnum};
use gamebook_engine::api::{run_battle, run_config, BattleReport, LuckPolicy};
use gamebook_engine::checks::test_luck;
use gamebook_engine::config::{BattleConfig, Bestiary};
use gamebook_engine::{Attribute, CombatantStats, Dice, DiceCount, EnemyDefinition, SessionOptions};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, ValueEnum)]
enum DiceArg {
    One,
    Two,
}

#[derive(Copy, Clone, ValueEnum)]
enum Policy {
    Never,
    Defensive,
    Aggressive,
    Always,
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll one or two six-sided dice several times
    Roll {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// How many dice per roll
        #[arg(long, value_enum, default_value_t = DiceArg::Two)]
        dice: DiceArg,
        /// Number of rolls
        #[arg(long, default_value_t = 5)]
        rolls: u32,
    },
    /// Test your luck once (luck is spent before the roll is compared)
    Luck {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Current luck score
        #[arg(long)]
        luck: i32,
    },
    /// List the enemies in a bestiary
    Bestiary {
        /// YAML or JSON bestiary; the built-in one when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Fight one battle to the end and print its log
    Fight {
        /// Battle config file (YAML or JSON); overrides the flags below
        #[arg(long)]
        config: Option<PathBuf>,
        /// Enemy id to look up in the bestiary
        #[arg(long)]
        enemy: Option<String>,
        /// YAML or JSON bestiary; the built-in one when omitted
        #[arg(long)]
        bestiary: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        skill: i32,
        #[arg(long, default_value_t = 18)]
        strength: i32,
        #[arg(long, default_value_t = 9)]
        luck: i32,
        /// Damage absorbed from each enemy hit
        #[arg(long, default_value_t = 0)]
        armor: i32,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 2025)]
        seed: u64,
        /// When to spend luck
        #[arg(long, value_enum, default_value_t = Policy::Never)]
        luck_policy: Policy,
        /// Print the full report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Parser)]
#[command(name = "gamebook")]
#[command(about = "Gamebook battle engine harness")]
struct Cli {
    /// Log engine events at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

fn to_count(d: DiceArg) -> DiceCount {
    match d {
        DiceArg::One => DiceCount::One,
        DiceArg::Two => DiceCount::Two,
    }
}

fn to_policy(p: Policy) -> LuckPolicy {
    match p {
        Policy::Never => LuckPolicy::Never,
        Policy::Defensive => LuckPolicy::Defensive,
        Policy::Aggressive => LuckPolicy::Aggressive,
        Policy::Always => LuckPolicy::Always,
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_bestiary(path: Option<&Path>) -> anyhow::Result<Bestiary> {
    match path {
        Some(p) => Bestiary::load(p),
        None => Bestiary::builtin(),
    }
}

fn describe_enemy(id: &str, enemy: &EnemyDefinition) -> String {
    let v = &enemy.variant;
    let mut notes = Vec::new();
    if v.damage_per_hit != 2 {
        notes.push(format!("{} dmg/hit", v.damage_per_hit));
    }
    if !v.luck_test_enabled {
        notes.push("no luck".to_string());
    }
    if !v.armor_affects_damage {
        notes.push("ignores armor".to_string());
    }
    if let Some(h) = &v.before_battle {
        notes.push(format!("before battle: {}", h.description));
    }
    if let Some(h) = &v.each_turn {
        notes.push(format!("each turn: {}", h.description));
    }
    let suffix = if notes.is_empty() {
        String::new()
    } else {
        format!(" [{}]", notes.join(", "))
    };
    format!(
        "{}: {} (SKILL {}, STRENGTH {}){}",
        id, enemy.name, enemy.skill, enemy.strength, suffix
    )
}

fn print_report(report: &BattleReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for line in &report.log {
            println!("{}", line);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Roll { seed, dice, rolls } => {
            let count = to_count(dice);
            let mut dice = Dice::from_seed(seed);
            for _ in 0..rolls {
                let faces = dice.roll_dice(count);
                let total: u32 = faces.iter().map(|&v| v as u32).sum();
                println!("{:?} = {}", faces, total);
            }
        }
        Cmd::Luck { seed, luck } => {
            let mut dice = Dice::from_seed(seed);
            let mut attr = Attribute::new(luck);
            let faces = dice.roll_dice(DiceCount::Two);
            let check = test_luck(&mut attr, &faces);
            println!(
                "roll={} luck={} -> {}",
                check.roll,
                check.luck_after,
                if check.lucky { "LUCKY" } else { "UNLUCKY" }
            );
        }
        Cmd::Bestiary { file } => {
            let bestiary = load_bestiary(file.as_deref())?;
            for (id, enemy) in bestiary.iter() {
                println!("{}", describe_enemy(id, enemy));
            }
        }
        Cmd::Fight {
            config,
            enemy,
            bestiary,
            skill,
            strength,
            luck,
            armor,
            seed,
            luck_policy,
            json,
        } => {
            let report = if let Some(path) = config {
                let cfg = BattleConfig::load(&path)?;
                run_config(&cfg).await?
            } else {
                let id = enemy.ok_or_else(|| anyhow!("pass --enemy <id> or --config <file>"))?;
                let bestiary = load_bestiary(bestiary.as_deref())?;
                let foe = bestiary
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| anyhow!("enemy '{}' not found in bestiary", id))?;
                let player = CombatantStats::new(skill, strength, luck);
                run_battle(player, foe, SessionOptions { armor }, seed, to_policy(luck_policy)).await?
            };
            print_report(&report, json)?;
        }
    }
    Ok(())
}
