use serde::{Deserialize, Serialize};

use crate::combat::session::EngineEvent;
use crate::ledger::TurnOutcome;

/// Which side of a hit the player is trying to push with luck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuckTestKind {
    /// After wounding the enemy: try to deal more.
    Damage,
    /// After being wounded: try to take less.
    Reduction,
}

impl LuckTestKind {
    pub fn for_outcome(outcome: TurnOutcome) -> Option<Self> {
        match outcome {
            TurnOutcome::PlayerHit => Some(LuckTestKind::Damage),
            TurnOutcome::EnemyHit => Some(LuckTestKind::Reduction),
            TurnOutcome::Dodge => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuckTestOutcome {
    pub kind: LuckTestKind,
    pub roll: Vec<u8>,
    pub luck_after: i32,
    pub lucky: bool,
    pub base_damage: i32,
    pub final_damage: i32,
    /// `TurnResolved` with the patched record, or the terminal event the test caused.
    pub event: EngineEvent,
}

/// Total damage for the turn once luck has been tested.
///
/// With the standard 2 points per hit: a lucky blow deals 4, an unlucky one 1;
/// a lucky parry lets through 1, an unlucky one 3.
pub fn adjusted_damage(kind: LuckTestKind, base: i32, lucky: bool) -> i32 {
    if base <= 0 {
        return base;
    }
    match (kind, lucky) {
        (LuckTestKind::Damage, true) => base * 2,
        (LuckTestKind::Damage, false) => (base / 2).max(1),
        (LuckTestKind::Reduction, true) => (base / 2).max(1),
        (LuckTestKind::Reduction, false) => base + 1,
    }
}
