use serde::{Deserialize, Serialize};

use crate::dice_total;
use crate::ledger::TurnOutcome;
use crate::stats::Attribute;

/// Both sides' attack strength for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contest {
    pub enemy_power: i32,
    pub player_power: i32,
    pub outcome: TurnOutcome,
}

/// Roll + skill for each side; the higher total lands a hit, equal totals dodge.
pub fn contest(enemy_roll: &[u8], enemy_skill: i32, player_roll: &[u8], player_skill: i32) -> Contest {
    let enemy_power = dice_total(enemy_roll) + enemy_skill;
    let player_power = dice_total(player_roll) + player_skill;
    let outcome = if player_power > enemy_power {
        TurnOutcome::PlayerHit
    } else if enemy_power > player_power {
        TurnOutcome::EnemyHit
    } else {
        TurnOutcome::Dodge
    };
    Contest {
        enemy_power,
        player_power,
        outcome,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuckCheck {
    pub roll: i32,
    pub luck_after: i32,
    pub lucky: bool,
}

/// Spend one luck point, then compare the roll against what is left.
///
/// The comparison deliberately uses the reduced value: with 5 luck a roll of
/// 5 is unlucky, because the test is judged against 4.
pub fn test_luck(luck: &mut Attribute, dice: &[u8]) -> LuckCheck {
    luck.lose(1);
    let roll = dice_total(dice);
    LuckCheck {
        roll,
        luck_after: luck.current,
        lucky: roll <= luck.current,
    }
}

/// Skill tests succeed when the roll does not exceed current skill.
pub fn test_skill(skill: &Attribute, dice: &[u8]) -> bool {
    dice_total(dice) <= skill.current
}
