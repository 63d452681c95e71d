//! Turn state machine for one fight.
//!
//! A session never runs on its own. Every transition is caused by one of the
//! caller's events: starting the battle, a finished dice roll, moving on to
//! the next turn, or asking for a luck test. Hooks and rollers are awaited,
//! so presentation delays only ever change *when* an event arrives.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::checks;
use crate::combat::luck::{adjusted_damage, LuckTestKind, LuckTestOutcome};
use crate::error::{BattleError, BattleResult};
use crate::ledger::{BattleLedger, TurnOutcome, TurnRecord};
use crate::stats::CombatantStats;
use crate::variant::{EncounterHook, EnemyDefinition, HookContext, HookEffects};
use crate::{validate_roll, DiceCount, DiceRoller};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingEnemyRoll,
    AwaitingPlayerRoll,
    TurnResolved,
    AwaitingLuckChoice,
    Victory,
    Defeat,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Victory | Phase::Defeat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollPhase {
    Enemy,
    Player,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    AwaitNextRoll,
    TurnResolved(TurnRecord),
    Victory,
    Defeat,
}

/// Which dialog the presentation layer should show. Derived from the phase
/// and never fed back into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    StartBattle,
    RollEnemyDice,
    RollPlayerDice,
    OfferLuckTest(LuckTestKind),
    Continue,
    Finished { victory: bool },
}

/// Callbacks registered by the screen controller.
///
/// `on_stats_changed` receives the complete new snapshot; persisting it is up
/// to the implementor.
pub trait BattleObserver: Send {
    fn on_stats_changed(&mut self, _stats: &CombatantStats) {}
    fn on_victory(&mut self) {}
    fn on_defeat(&mut self) {}
    fn on_notice(&mut self, _message: &str) {}
    fn on_item_lost(&mut self, _item: &str) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BattleObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Subtracted from each enemy hit unless the encounter ignores armor.
    #[serde(default)]
    pub armor: i32,
}

#[derive(Debug, Clone, Copy)]
enum HookPoint {
    BeforeBattle,
    BeforeTurn,
}

pub struct BattleSession<O: BattleObserver = NoopObserver> {
    enemy: EnemyDefinition,
    hooks: Vec<Arc<dyn EncounterHook>>,
    options: SessionOptions,
    player: CombatantStats,
    enemy_health: i32,
    phase: Phase,
    turn: u32,
    battle_hooks_done: bool,
    pending_enemy_roll: Option<Vec<u8>>,
    ledger: BattleLedger,
    observer: O,
}

impl<O: BattleObserver> BattleSession<O> {
    pub fn new(player: CombatantStats, enemy: EnemyDefinition, observer: O) -> BattleResult<Self> {
        Self::with_options(player, enemy, observer, SessionOptions::default())
    }

    pub fn with_options(
        player: CombatantStats,
        enemy: EnemyDefinition,
        observer: O,
        options: SessionOptions,
    ) -> BattleResult<Self> {
        player.validate()?;
        let hooks = enemy.variant.collect_hooks();
        let enemy_health = enemy.strength.max(0);
        Ok(Self {
            enemy,
            hooks,
            options,
            player,
            enemy_health,
            phase: Phase::Idle,
            turn: 0,
            battle_hooks_done: false,
            pending_enemy_roll: None,
            ledger: BattleLedger::new(),
            observer,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn player(&self) -> &CombatantStats {
        &self.player
    }

    pub fn enemy(&self) -> &EnemyDefinition {
        &self.enemy
    }

    pub fn enemy_health(&self) -> i32 {
        self.enemy_health
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn ledger(&self) -> &BattleLedger {
        &self.ledger
    }

    pub fn history(&self) -> &[TurnRecord] {
        self.ledger.records()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn prompt(&self) -> Prompt {
        match self.phase {
            Phase::Idle => Prompt::StartBattle,
            Phase::AwaitingEnemyRoll => Prompt::RollEnemyDice,
            Phase::AwaitingPlayerRoll => Prompt::RollPlayerDice,
            Phase::AwaitingLuckChoice => self
                .ledger
                .last()
                .and_then(|r| LuckTestKind::for_outcome(r.outcome))
                .map(Prompt::OfferLuckTest)
                .unwrap_or(Prompt::Continue),
            Phase::TurnResolved => Prompt::Continue,
            Phase::Victory => Prompt::Finished { victory: true },
            Phase::Defeat => Prompt::Finished { victory: false },
        }
    }

    pub fn luck_test_available(&self) -> bool {
        self.phase == Phase::AwaitingLuckChoice && self.player.luck.current > 0
    }

    /// Run the pre-battle hazard, then open turn 1.
    ///
    /// The pre-battle hooks run at most once. If opening turn 1 fails, calling
    /// this again only retries the turn hooks.
    pub async fn start_battle(&mut self, roller: &mut dyn DiceRoller) -> BattleResult<EngineEvent> {
        self.expect_phase("start_battle", &[Phase::Idle])?;
        if !self.battle_hooks_done {
            info!(
                enemy = %self.enemy.name,
                enemy_skill = self.enemy.skill,
                enemy_strength = self.enemy_health,
                player_skill = self.player.skill.current,
                player_strength = self.player.strength.current,
                "battle started"
            );
            let outcome = self.run_hooks(HookPoint::BeforeBattle, 0, roller).await?;
            self.battle_hooks_done = true;
            if let Some(event) = outcome {
                return Ok(event);
            }
            if let Some(event) = self.terminal_check() {
                return Ok(event);
            }
        }
        self.begin_turn(roller).await
    }

    /// Close the current turn (including an unused luck window) and open the next.
    pub async fn next_turn(&mut self, roller: &mut dyn DiceRoller) -> BattleResult<EngineEvent> {
        self.expect_phase("next_turn", &[Phase::TurnResolved, Phase::AwaitingLuckChoice])?;
        self.begin_turn(roller).await
    }

    /// Feed a completed 2d6 roll into the turn. The enemy always rolls first.
    pub fn submit_roll(&mut self, phase: RollPhase, dice: &[u8]) -> BattleResult<EngineEvent> {
        self.ensure_live()?;
        match (self.phase, phase) {
            (Phase::AwaitingEnemyRoll, RollPhase::Enemy) => {
                validate_roll(DiceCount::Two, dice)?;
                debug!(turn = self.turn, ?dice, "enemy roll");
                self.pending_enemy_roll = Some(dice.to_vec());
                self.phase = Phase::AwaitingPlayerRoll;
                Ok(EngineEvent::AwaitNextRoll)
            }
            (Phase::AwaitingPlayerRoll, RollPhase::Player) => {
                validate_roll(DiceCount::Two, dice)?;
                debug!(turn = self.turn, ?dice, "player roll");
                self.resolve_turn(dice)
            }
            _ => {
                warn!(?phase, current = ?self.phase, "roll submitted out of order");
                Err(self.invalid("submit_roll"))
            }
        }
    }

    /// Roll and apply a luck test on the turn just resolved.
    ///
    /// Rejections happen before any dice are requested and leave the session untouched.
    pub async fn request_luck_test(
        &mut self,
        kind: LuckTestKind,
        roller: &mut dyn DiceRoller,
    ) -> BattleResult<LuckTestOutcome> {
        self.check_luck_test(kind)?;
        let dice = roller.roll(DiceCount::Two).await;
        self.resolve_luck_test(kind, &dice)
    }

    /// Apply a luck test with dice rolled elsewhere.
    pub fn resolve_luck_test(&mut self, kind: LuckTestKind, dice: &[u8]) -> BattleResult<LuckTestOutcome> {
        self.check_luck_test(kind)?;
        validate_roll(DiceCount::Two, dice)?;

        let base = match self.ledger.last() {
            Some(record) => record.final_damage,
            None => return Err(self.invalid("resolve_luck_test")),
        };
        let check = checks::test_luck(&mut self.player.luck, dice);
        let total = adjusted_damage(kind, base, check.lucky);
        let delta = total - base;
        match kind {
            LuckTestKind::Damage => {
                let ceiling = self.enemy.strength.max(0);
                self.enemy_health = (self.enemy_health - delta).clamp(0, ceiling);
            }
            LuckTestKind::Reduction if delta >= 0 => {
                self.player.strength.lose(delta);
            }
            LuckTestKind::Reduction => {
                self.player.strength.restore(-delta);
            }
        }
        let record = self.ledger.patch_current(total)?.clone();
        self.observer.on_stats_changed(&self.player);
        info!(
            turn = record.turn_number,
            ?kind,
            roll = check.roll,
            luck = check.luck_after,
            lucky = check.lucky,
            base,
            total,
            "luck tested"
        );

        let event = match self.terminal_check() {
            Some(event) => event,
            None => {
                self.phase = Phase::TurnResolved;
                EngineEvent::TurnResolved(record)
            }
        };
        Ok(LuckTestOutcome {
            kind,
            roll: dice.to_vec(),
            luck_after: check.luck_after,
            lucky: check.lucky,
            base_damage: base,
            final_damage: total,
            event,
        })
    }

    async fn begin_turn(&mut self, roller: &mut dyn DiceRoller) -> BattleResult<EngineEvent> {
        let turn = self.turn + 1;
        let outcome = self.run_hooks(HookPoint::BeforeTurn, turn, roller).await?;
        self.turn = turn;
        debug!(turn, "turn opened");
        if let Some(event) = outcome {
            return Ok(event);
        }
        self.phase = Phase::AwaitingEnemyRoll;
        Ok(EngineEvent::AwaitNextRoll)
    }

    fn resolve_turn(&mut self, player_roll: &[u8]) -> BattleResult<EngineEvent> {
        let enemy_roll = match self.pending_enemy_roll.take() {
            Some(roll) => roll,
            None => return Err(self.invalid("submit_roll")),
        };
        let contest = checks::contest(
            &enemy_roll,
            self.enemy.skill,
            player_roll,
            self.player.skill.current,
        );

        let damage = match contest.outcome {
            TurnOutcome::PlayerHit => {
                let damage = self.enemy.variant.damage_per_hit.max(0);
                self.enemy_health = (self.enemy_health - damage).max(0);
                damage
            }
            TurnOutcome::EnemyHit => {
                let damage = self.incoming_damage();
                self.player.strength.lose(damage);
                self.observer.on_stats_changed(&self.player);
                damage
            }
            TurnOutcome::Dodge => 0,
        };

        let record = TurnRecord {
            turn_number: self.turn,
            player_roll: player_roll.to_vec(),
            enemy_roll,
            player_power: contest.player_power,
            enemy_power: contest.enemy_power,
            outcome: contest.outcome,
            base_damage: damage,
            final_damage: damage,
            luck_test_applied: false,
        };
        info!(
            turn = self.turn,
            player_power = contest.player_power,
            enemy_power = contest.enemy_power,
            outcome = ?contest.outcome,
            damage,
            enemy_health = self.enemy_health,
            player_strength = self.player.strength.current,
            "turn resolved"
        );
        self.ledger.append(record.clone());

        if let Some(event) = self.terminal_check() {
            return Ok(event);
        }
        self.phase = if self.enemy.variant.luck_test_enabled && contest.outcome != TurnOutcome::Dodge {
            Phase::AwaitingLuckChoice
        } else {
            Phase::TurnResolved
        };
        Ok(EngineEvent::TurnResolved(record))
    }

    fn incoming_damage(&self) -> i32 {
        let base = self.enemy.variant.damage_per_hit;
        if base <= 0 {
            return 0;
        }
        if self.enemy.variant.armor_affects_damage && self.options.armor > 0 {
            (base - self.options.armor).max(1)
        } else {
            base
        }
    }

    /// Run every hook for `point` against a working copy of the player.
    /// Nothing is committed or reported unless the whole chain succeeds.
    async fn run_hooks(
        &mut self,
        point: HookPoint,
        turn: u32,
        roller: &mut dyn DiceRoller,
    ) -> BattleResult<Option<EngineEvent>> {
        if self.hooks.is_empty() {
            return Ok(None);
        }
        let hooks = self.hooks.clone();
        let mut working = self.player;
        let mut effects = HookEffects::default();

        for hook in &hooks {
            let mut ctx = HookContext::new(&mut working, &mut *roller, &self.enemy.name, turn);
            let result = match point {
                HookPoint::BeforeBattle => hook.before_battle(&mut ctx).await,
                HookPoint::BeforeTurn => hook.before_turn(&mut ctx).await,
            };
            if let Err(err) = result {
                warn!(?point, turn, %err, "hook failed, nothing applied");
                return Err(err);
            }
            let produced = ctx.into_effects();
            effects.lost_items.extend(produced.lost_items);
            effects.notices.extend(produced.notices);
            effects.defeated |= produced.defeated;
            if effects.defeated || working.is_dead() {
                break;
            }
        }
        debug!(?point, turn, ?effects, "hooks finished");

        if working != self.player {
            self.player = working;
            self.observer.on_stats_changed(&self.player);
        }
        for item in &effects.lost_items {
            self.observer.on_item_lost(item);
        }
        for notice in &effects.notices {
            self.observer.on_notice(notice);
        }
        if effects.defeated || self.player.is_dead() {
            self.finish(Phase::Defeat);
            return Ok(Some(EngineEvent::Defeat));
        }
        Ok(None)
    }

    fn check_luck_test(&mut self, kind: LuckTestKind) -> BattleResult<()> {
        let verdict = self.luck_test_verdict(kind);
        if let Err(err) = &verdict {
            if err.is_user_facing() {
                info!(?kind, %err, "luck test refused");
                if let Some(message) = err.user_message() {
                    self.observer.on_notice(message);
                }
            } else {
                warn!(?kind, %err, "luck test rejected");
            }
        }
        verdict
    }

    fn luck_test_verdict(&self, kind: LuckTestKind) -> BattleResult<()> {
        self.ensure_live()?;
        if !self.enemy.variant.luck_test_enabled {
            return Err(BattleError::LuckTestDisabled);
        }
        let last = self.ledger.last();
        match self.phase {
            Phase::AwaitingLuckChoice => {}
            Phase::TurnResolved => {
                let reason = match last {
                    Some(r) if r.luck_test_applied => "luck was already tested this turn",
                    _ => "both attacks missed this turn",
                };
                return Err(BattleError::LuckTestUnavailable { reason });
            }
            _ => return Err(self.invalid("request_luck_test")),
        }
        let expected = last.and_then(|r| LuckTestKind::for_outcome(r.outcome));
        if expected != Some(kind) {
            return Err(BattleError::LuckTestUnavailable {
                reason: "that luck test does not fit this turn's outcome",
            });
        }
        if self.player.luck.current <= 0 {
            return Err(BattleError::InsufficientLuck);
        }
        Ok(())
    }

    fn terminal_check(&mut self) -> Option<EngineEvent> {
        if self.enemy_health <= 0 {
            self.finish(Phase::Victory);
            Some(EngineEvent::Victory)
        } else if self.player.is_dead() {
            self.finish(Phase::Defeat);
            Some(EngineEvent::Defeat)
        } else {
            None
        }
    }

    fn finish(&mut self, phase: Phase) {
        self.phase = phase;
        self.pending_enemy_roll = None;
        info!(
            enemy = %self.enemy.name,
            turns = self.ledger.len(),
            outcome = ?phase,
            player_strength = self.player.strength.current,
            "battle over"
        );
        match phase {
            Phase::Victory => self.observer.on_victory(),
            Phase::Defeat => self.observer.on_defeat(),
            _ => {}
        }
    }

    fn ensure_live(&self) -> BattleResult<()> {
        if self.phase.is_terminal() {
            Err(BattleError::SessionFinished)
        } else {
            Ok(())
        }
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[Phase]) -> BattleResult<()> {
        self.ensure_live()?;
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> BattleError {
        BattleError::InvalidPhaseTransition {
            operation,
            phase: self.phase,
        }
    }
}
