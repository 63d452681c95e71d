use std::collections::VecDeque;

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod api;
pub mod checks;
pub mod combat;
pub mod config;
pub mod content;
pub mod error;
pub mod hazards;
pub mod ledger;
pub mod stats;
pub mod variant;

pub use combat::session::{
    BattleObserver, BattleSession, EngineEvent, NoopObserver, Phase, Prompt, RollPhase,
    SessionOptions,
};
pub use combat::luck::{LuckTestKind, LuckTestOutcome};
pub use error::{BattleError, BattleResult};
pub use ledger::{BattleLedger, TurnOutcome, TurnRecord};
pub use stats::{Attribute, AttributeKind, CombatantStats};
pub use variant::{EncounterHook, EncounterVariant, EnemyDefinition, HookContext};

/// Number of six-sided dice in a single roll request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceCount {
    One,
    Two,
}

impl DiceCount {
    pub fn n(self) -> usize {
        match self {
            DiceCount::One => 1,
            DiceCount::Two => 2,
        }
    }
}

/// Source of d6 results. Implementations may resolve instantly or only after
/// the presentation layer has finished animating the roll.
#[async_trait]
pub trait DiceRoller: Send {
    async fn roll(&mut self, count: DiceCount) -> Vec<u8>;
}

/// Seeded roller, optionally primed with a fixed script of results.
pub struct Dice {
    rng: ChaCha8Rng,
    script: VecDeque<u8>,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            script: VecDeque::new(),
        }
    }

    /// Scripted values are handed out as-is (no range check), then the
    /// roller falls back to a seed-0 stream.
    pub fn from_scripted(values: Vec<u8>) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(0),
            script: values.into(),
        }
    }

    pub fn d6(&mut self) -> u8 {
        match self.script.pop_front() {
            Some(v) => v,
            None => self.rng.gen_range(1..=6),
        }
    }

    pub fn roll_dice(&mut self, count: DiceCount) -> Vec<u8> {
        (0..count.n()).map(|_| self.d6()).collect()
    }
}

#[async_trait]
impl DiceRoller for Dice {
    async fn roll(&mut self, count: DiceCount) -> Vec<u8> {
        self.roll_dice(count)
    }
}

/// Check that a roller result has the requested shape and every face is 1..=6.
pub fn validate_roll(count: DiceCount, dice: &[u8]) -> BattleResult<()> {
    if dice.len() != count.n() {
        return Err(BattleError::WrongDiceCount {
            expected: count.n(),
            actual: dice.len(),
        });
    }
    if let Some(&bad) = dice.iter().find(|v| !(1..=6).contains(*v)) {
        return Err(BattleError::RollOutOfRange { value: bad });
    }
    Ok(())
}

pub fn dice_total(dice: &[u8]) -> i32 {
    dice.iter().map(|&v| v as i32).sum()
}
