//! Plays whole battles without a presentation layer, for the CLI harness and
//! for balance simulations.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::combat::luck::LuckTestKind;
use crate::combat::session::{BattleObserver, BattleSession, Phase, Prompt, RollPhase, SessionOptions};
use crate::config::BattleConfig;
use crate::ledger::TurnRecord;
use crate::stats::CombatantStats;
use crate::variant::EnemyDefinition;
use crate::{Dice, DiceCount, DiceRoller};

/// Give up on battles that are still undecided after this many turns.
pub const MAX_TURNS: u32 = 200;

/// When the automatic player spends luck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuckPolicy {
    #[default]
    Never,
    /// Only to soften enemy hits.
    Defensive,
    /// Only to press home its own hits.
    Aggressive,
    Always,
}

impl LuckPolicy {
    pub fn wants(self, kind: LuckTestKind) -> bool {
        match self {
            LuckPolicy::Never => false,
            LuckPolicy::Defensive => kind == LuckTestKind::Reduction,
            LuckPolicy::Aggressive => kind == LuckTestKind::Damage,
            LuckPolicy::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Player,
    Enemy,
    Undecided,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BattleReport {
    pub enemy: String,
    pub winner: Winner,
    pub turns: u32,
    pub player_end: CombatantStats,
    pub enemy_health_end: i32,
    pub history: Vec<TurnRecord>,
    pub lost_items: Vec<String>,
    pub log: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SimulationSummary {
    pub samples: u32,
    pub player_wins: u32,
    pub enemy_wins: u32,
    pub undecided: u32,
    pub avg_turns: f64,
    /// Average strength left over, counted on wins only.
    pub avg_strength_on_win: f64,
}

#[derive(Debug, Default)]
struct ReportObserver {
    log: Vec<String>,
    lost_items: Vec<String>,
}

impl BattleObserver for ReportObserver {
    fn on_notice(&mut self, message: &str) {
        self.log.push(format!("[HAZARD] {}", message));
    }

    fn on_item_lost(&mut self, item: &str) {
        self.log.push(format!("[ITEM] lost {}", item));
        self.lost_items.push(item.to_string());
    }
}

pub async fn run_battle(
    player: CombatantStats,
    enemy: EnemyDefinition,
    options: SessionOptions,
    seed: u64,
    policy: LuckPolicy,
) -> Result<BattleReport> {
    let mut dice = Dice::from_seed(seed);
    run_battle_with(player, enemy, options, policy, &mut dice).await
}

/// Drive one session to its end, rolling both sides' dice from `roller`.
pub async fn run_battle_with(
    player: CombatantStats,
    enemy: EnemyDefinition,
    options: SessionOptions,
    policy: LuckPolicy,
    roller: &mut dyn DiceRoller,
) -> Result<BattleReport> {
    let name = enemy.name.clone();
    let start = format!(
        "[START] You (SKILL {}, STRENGTH {}, LUCK {}) vs {} (SKILL {}, STRENGTH {})",
        player.skill.current,
        player.strength.current,
        player.luck.current,
        name,
        enemy.skill,
        enemy.strength
    );
    let mut session = BattleSession::with_options(player, enemy, ReportObserver::default(), options)
        .context("cannot start battle with these stats")?;
    session.observer_mut().log.push(start);

    session.start_battle(roller).await?;
    while session.phase() == Phase::AwaitingEnemyRoll {
        let enemy_roll = roller.roll(DiceCount::Two).await;
        session.submit_roll(RollPhase::Enemy, &enemy_roll)?;
        let player_roll = roller.roll(DiceCount::Two).await;
        session.submit_roll(RollPhase::Player, &player_roll)?;

        if let Some(record) = session.ledger().last() {
            let line = format!("[TURN] {}", record.describe(&name));
            session.observer_mut().log.push(line);
        }

        if let Prompt::OfferLuckTest(kind) = session.prompt() {
            if policy.wants(kind) && session.luck_test_available() {
                let outcome = session.request_luck_test(kind, roller).await?;
                let line = format!(
                    "[LUCK] {:?} roll={} luck={} -> {} (damage {} -> {})",
                    kind,
                    outcome.roll.iter().map(|&v| v as i32).sum::<i32>(),
                    outcome.luck_after,
                    if outcome.lucky { "LUCKY" } else { "UNLUCKY" },
                    outcome.base_damage,
                    outcome.final_damage
                );
                session.observer_mut().log.push(line);
            }
        }

        let hp = format!(
            "[HP] you {} / {} {}",
            session.player().strength.current,
            name,
            session.enemy_health()
        );
        session.observer_mut().log.push(hp);

        if session.phase().is_terminal() || session.turn() >= MAX_TURNS {
            break;
        }
        session.next_turn(roller).await?;
    }

    let winner = match session.phase() {
        Phase::Victory => Winner::Player,
        Phase::Defeat => Winner::Enemy,
        _ => Winner::Undecided,
    };
    let player_end = *session.player();
    let enemy_health_end = session.enemy_health();
    let turns = session.ledger().len() as u32;
    session.observer_mut().log.push(format!(
        "[END] winner={:?} turns={} strength={} enemy={}",
        winner, turns, player_end.strength.current, enemy_health_end
    ));
    let history = session.history().to_vec();
    let observer = std::mem::take(session.observer_mut());
    Ok(BattleReport {
        enemy: name,
        winner,
        turns,
        player_end,
        enemy_health_end,
        history,
        lost_items: observer.lost_items,
        log: observer.log,
    })
}

pub async fn run_config(cfg: &BattleConfig) -> Result<BattleReport> {
    let enemy = cfg.resolve_enemy()?;
    run_battle(cfg.player, enemy, cfg.options, cfg.seed, cfg.luck_policy).await
}

/// Play `samples` battles; trial `i` uses `seed + i`.
pub async fn simulate_many(
    player: CombatantStats,
    enemy: &EnemyDefinition,
    options: SessionOptions,
    seed: u64,
    policy: LuckPolicy,
    samples: u32,
) -> Result<SimulationSummary> {
    let mut summary = SimulationSummary {
        samples,
        player_wins: 0,
        enemy_wins: 0,
        undecided: 0,
        avg_turns: 0.0,
        avg_strength_on_win: 0.0,
    };
    let mut turns_total = 0u64;
    let mut strength_on_wins = 0i64;

    for i in 0..samples {
        let report = run_battle(player, enemy.clone(), options, seed.wrapping_add(i as u64), policy).await?;
        turns_total += report.turns as u64;
        match report.winner {
            Winner::Player => {
                summary.player_wins += 1;
                strength_on_wins += report.player_end.strength.current as i64;
            }
            Winner::Enemy => summary.enemy_wins += 1,
            Winner::Undecided => summary.undecided += 1,
        }
    }

    if samples > 0 {
        summary.avg_turns = turns_total as f64 / samples as f64;
    }
    if summary.player_wins > 0 {
        summary.avg_strength_on_win = strength_on_wins as f64 / summary.player_wins as f64;
    }
    Ok(summary)
}
