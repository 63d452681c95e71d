use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use gamebook_engine::api::{simulate_many, LuckPolicy};
use gamebook_engine::config::Bestiary;
use gamebook_engine::{CombatantStats, SessionOptions};
use std::path::PathBuf;

#[derive(Copy, Clone, ValueEnum)]
enum Policy {
    Never,
    Defensive,
    Aggressive,
    Always,
}

#[derive(Parser)]
#[command(name = "simulate-vs")]
#[command(about = "Monte Carlo sim: many battles vs one bestiary enemy")]
struct Args {
    /// Enemy id in the bestiary
    #[arg(long, default_value = "goblin")]
    enemy: String,

    /// Optional YAML or JSON bestiary (falls back to the built-in one)
    #[arg(long)]
    bestiary: Option<PathBuf>,

    /// Number of trials
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    #[arg(long, default_value_t = 10)]
    skill: i32,

    #[arg(long, default_value_t = 18)]
    strength: i32,

    #[arg(long, default_value_t = 9)]
    luck: i32,

    /// Damage absorbed from each enemy hit
    #[arg(long, default_value_t = 0)]
    armor: i32,

    /// When to spend luck
    #[arg(long, value_enum, default_value_t = Policy::Defensive)]
    luck_policy: Policy,
}

fn to_policy(p: Policy) -> LuckPolicy {
    match p {
        Policy::Never => LuckPolicy::Never,
        Policy::Defensive => LuckPolicy::Defensive,
        Policy::Aggressive => LuckPolicy::Aggressive,
        Policy::Always => LuckPolicy::Always,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let bestiary = match args.bestiary.as_ref() {
        Some(path) => Bestiary::load(path)?,
        None => Bestiary::builtin()?,
    };
    let enemy = bestiary
        .get(&args.enemy)
        .ok_or_else(|| anyhow!("enemy '{}' not found in bestiary", args.enemy))?;

    let player = CombatantStats::new(args.skill, args.strength, args.luck);
    let policy = to_policy(args.luck_policy);
    let summary = simulate_many(
        player,
        enemy,
        SessionOptions { armor: args.armor },
        args.seed,
        policy,
        args.trials,
    )
    .await?;

    let rate = |n: u32| {
        if summary.samples == 0 {
            0.0
        } else {
            n as f64 * 100.0 / summary.samples as f64
        }
    };

    println!("simulate-vs results");
    println!("-------------------");
    println!("trials:             {}", summary.samples);
    println!(
        "enemy:              {} (SKILL {}, STRENGTH {})",
        enemy.name, enemy.skill, enemy.strength
    );
    println!(
        "player:             SKILL {}, STRENGTH {}, LUCK {}",
        args.skill, args.strength, args.luck
    );
    println!("luck policy:        {:?}", policy);
    println!("armor:              {}", args.armor);
    println!();
    println!("win rate:           {:.1}%", rate(summary.player_wins));
    println!("loss rate:          {:.1}%", rate(summary.enemy_wins));
    println!("undecided:          {:.1}%", rate(summary.undecided));
    println!("avg turns:          {:.2}", summary.avg_turns);
    println!("avg strength (win): {:.2}", summary.avg_strength_on_win);

    Ok(())
}
