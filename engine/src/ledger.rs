//! Ordered record of resolved turns.
//!
//! The ledger is append-only. The single exception is the luck-test patch,
//! which may rewrite `final_damage` of the newest record once.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, BattleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    PlayerHit,
    EnemyHit,
    Dodge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_number: u32,
    pub player_roll: Vec<u8>,
    pub enemy_roll: Vec<u8>,
    pub player_power: i32,
    pub enemy_power: i32,
    pub outcome: TurnOutcome,
    pub base_damage: i32,
    pub final_damage: i32,
    pub luck_test_applied: bool,
}

impl TurnRecord {
    /// One line of recap text for this turn.
    pub fn describe(&self, enemy_name: &str) -> String {
        let head = format!(
            "Turn {}: you {} ({:?}) vs {} {} ({:?})",
            self.turn_number,
            self.player_power,
            self.player_roll,
            enemy_name,
            self.enemy_power,
            self.enemy_roll
        );
        let tail = match self.outcome {
            TurnOutcome::PlayerHit => format!("you wound {} for {}", enemy_name, self.final_damage),
            TurnOutcome::EnemyHit => format!("{} wounds you for {}", enemy_name, self.final_damage),
            TurnOutcome::Dodge => "both attacks miss".to_string(),
        };
        let luck = if self.luck_test_applied {
            format!(" [luck: {} -> {}]", self.base_damage, self.final_damage)
        } else {
            String::new()
        };
        format!("{}: {}{}", head, tail, luck)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleLedger {
    records: Vec<TurnRecord>,
}

impl BattleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: TurnRecord) {
        self.records.push(record);
    }

    /// Record the luck-test result on the newest turn. Only allowed once.
    pub fn patch_current(&mut self, final_damage: i32) -> BattleResult<&TurnRecord> {
        let record = self.records.last_mut().ok_or(BattleError::LuckTestUnavailable {
            reason: "no turn has been resolved yet",
        })?;
        if record.luck_test_applied {
            return Err(BattleError::LuckTestUnavailable {
                reason: "luck was already tested this turn",
            });
        }
        record.final_damage = final_damage;
        record.luck_test_applied = true;
        Ok(record)
    }

    pub fn records(&self) -> &[TurnRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TurnRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn player_took_damage(&self) -> bool {
        self.total_damage_to_player() > 0
    }

    pub fn total_damage_to_player(&self) -> i32 {
        self.damage_where(TurnOutcome::EnemyHit)
    }

    pub fn total_damage_to_enemy(&self) -> i32 {
        self.damage_where(TurnOutcome::PlayerHit)
    }

    pub fn luck_tests_used(&self) -> usize {
        self.records.iter().filter(|r| r.luck_test_applied).count()
    }

    fn damage_where(&self, outcome: TurnOutcome) -> i32 {
        self.records
            .iter()
            .filter(|r| r.outcome == outcome)
            .map(|r| r.final_damage)
            .sum()
    }

    pub fn recap(&self, enemy_name: &str) -> Vec<String> {
        self.records.iter().map(|r| r.describe(enemy_name)).collect()
    }
}
