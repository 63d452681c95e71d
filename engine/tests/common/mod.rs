#![allow(dead_code)]

use gamebook_engine::{
    BattleObserver, BattleSession, CombatantStats, Dice, EngineEvent, EnemyDefinition, RollPhase,
};

/// Observer that keeps every callback it receives.
#[derive(Debug, Default)]
pub struct Recorder {
    pub stats: Vec<CombatantStats>,
    pub victories: u32,
    pub defeats: u32,
    pub notices: Vec<String>,
    pub lost_items: Vec<String>,
}

impl BattleObserver for Recorder {
    fn on_stats_changed(&mut self, stats: &CombatantStats) {
        self.stats.push(*stats);
    }

    fn on_victory(&mut self) {
        self.victories += 1;
    }

    fn on_defeat(&mut self) {
        self.defeats += 1;
    }

    fn on_notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn on_item_lost(&mut self, item: &str) {
        self.lost_items.push(item.to_string());
    }
}

pub fn hero() -> CombatantStats {
    CombatantStats::new(9, 20, 5)
}

/// Session already past `start_battle`, waiting for the first enemy roll.
pub async fn started(player: CombatantStats, enemy: EnemyDefinition) -> BattleSession<Recorder> {
    let mut session = BattleSession::new(player, enemy, Recorder::default()).expect("valid stats");
    let mut dice = Dice::from_scripted(vec![]);
    let event = session.start_battle(&mut dice).await.expect("battle starts");
    assert_eq!(event, EngineEvent::AwaitNextRoll);
    session
}

pub fn play_turn(
    session: &mut BattleSession<Recorder>,
    enemy_roll: [u8; 2],
    player_roll: [u8; 2],
) -> EngineEvent {
    assert_eq!(
        session.submit_roll(RollPhase::Enemy, &enemy_roll).expect("enemy roll"),
        EngineEvent::AwaitNextRoll
    );
    session
        .submit_roll(RollPhase::Player, &player_roll)
        .expect("player roll")
}
