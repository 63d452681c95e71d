mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::{hero, play_turn, started, Recorder};
use gamebook_engine::hazards::{Consequence, PreBattleHazard, StrengthPenalty, TestKind, TurnHazard};
use gamebook_engine::{
    BattleError, BattleResult, BattleSession, CombatantStats, Dice, EncounterHook,
    EncounterVariant, EngineEvent, EnemyDefinition, HookContext, LuckTestKind, Phase,
    SessionOptions,
};

fn enemy_with(variant: EncounterVariant) -> EnemyDefinition {
    EnemyDefinition::new("Boss", 9, 10).with_variant(variant)
}

#[tokio::test]
async fn disabled_luck_rejects_even_with_plenty_of_luck() {
    let variant = EncounterVariant {
        luck_test_enabled: false,
        ..EncounterVariant::default()
    };
    let player = CombatantStats::new(9, 20, 12);
    let mut session = started(player, enemy_with(variant)).await;
    play_turn(&mut session, [5, 5], [6, 6]);
    assert_eq!(session.phase(), Phase::TurnResolved);

    let mut dice = Dice::from_scripted(vec![1, 1]);
    let result = session.request_luck_test(LuckTestKind::Damage, &mut dice).await;
    assert_eq!(result, Err(BattleError::LuckTestDisabled));
    assert_eq!(session.player().luck.current, 12);
    assert_eq!(session.enemy_health(), 8);
    assert!(!session.history()[0].luck_test_applied);
    assert_eq!(session.observer().notices.len(), 1);
}

#[tokio::test]
async fn custom_damage_applies_both_ways() {
    let variant = EncounterVariant {
        damage_per_hit: 3,
        ..EncounterVariant::default()
    };
    let mut session = started(hero(), enemy_with(variant)).await;
    let mut dice = Dice::from_scripted(vec![]);

    play_turn(&mut session, [5, 5], [6, 6]);
    assert_eq!(session.enemy_health(), 7);
    assert_eq!(session.history()[0].base_damage, 3);

    session.next_turn(&mut dice).await.unwrap();
    play_turn(&mut session, [6, 6], [1, 1]);
    assert_eq!(session.player().strength.current, 17);
}

#[tokio::test]
async fn armor_softens_hits_unless_ignored() {
    let options = SessionOptions { armor: 1 };
    let mut dice = Dice::from_scripted(vec![]);

    let mut session =
        BattleSession::with_options(hero(), EnemyDefinition::new("Orc", 9, 10), Recorder::default(), options)
            .unwrap();
    session.start_battle(&mut dice).await.unwrap();
    play_turn(&mut session, [6, 6], [1, 1]);
    assert_eq!(session.player().strength.current, 19);
    assert_eq!(session.history()[0].base_damage, 1);

    let piercing = EncounterVariant {
        armor_affects_damage: false,
        ..EncounterVariant::default()
    };
    let mut session = BattleSession::with_options(hero(), enemy_with(piercing), Recorder::default(), options)
        .unwrap();
    session.start_battle(&mut dice).await.unwrap();
    play_turn(&mut session, [6, 6], [1, 1]);
    assert_eq!(session.player().strength.current, 18);
}

#[tokio::test]
async fn heavy_armor_still_lets_one_point_through() {
    let options = SessionOptions { armor: 5 };
    let mut dice = Dice::from_scripted(vec![]);
    let mut session =
        BattleSession::with_options(hero(), EnemyDefinition::new("Orc", 9, 10), Recorder::default(), options)
            .unwrap();
    session.start_battle(&mut dice).await.unwrap();
    play_turn(&mut session, [6, 6], [1, 1]);
    assert_eq!(session.player().strength.current, 19);
}

fn lightning_bolt(on_failure: Consequence) -> EncounterVariant {
    EncounterVariant {
        before_battle: Some(PreBattleHazard {
            test: TestKind::Luck,
            description: "Lightning bolt".into(),
            on_failure,
        }),
        ..EncounterVariant::default()
    }
}

fn scarring_failure() -> Consequence {
    Consequence {
        strength: Some(StrengthPenalty::SetBelowInitial(6)),
        lost_item: Some("shield".into()),
        ..Consequence::default()
    }
}

#[tokio::test]
async fn failed_pre_battle_test_scars_but_battle_goes_on() {
    let mut session =
        BattleSession::new(hero(), enemy_with(lightning_bolt(scarring_failure())), Recorder::default())
            .unwrap();
    let mut dice = Dice::from_scripted(vec![6, 6]);

    let event = session.start_battle(&mut dice).await.unwrap();
    assert_eq!(event, EngineEvent::AwaitNextRoll);
    assert_eq!(session.phase(), Phase::AwaitingEnemyRoll);
    assert_eq!(session.turn(), 1);
    assert_eq!(session.player().strength.current, 14);
    assert_eq!(session.player().strength.initial, 20);
    assert_eq!(session.player().luck.current, 4);
    assert_eq!(session.observer().lost_items, vec!["shield".to_string()]);
    assert_eq!(session.observer().stats.len(), 1);
    assert_eq!(session.observer().stats[0].strength.current, 14);
}

#[tokio::test]
async fn failed_pre_battle_test_can_kill_outright() {
    let player = CombatantStats::new(9, 6, 5);
    let mut session =
        BattleSession::new(player, enemy_with(lightning_bolt(scarring_failure())), Recorder::default())
            .unwrap();
    let mut dice = Dice::from_scripted(vec![6, 6]);

    let event = session.start_battle(&mut dice).await.unwrap();
    assert_eq!(event, EngineEvent::Defeat);
    assert_eq!(session.phase(), Phase::Defeat);
    assert_eq!(session.player().strength.current, 0);
    assert_eq!(session.observer().defeats, 1);
    assert!(session.history().is_empty());
    assert_eq!(
        session.submit_roll(gamebook_engine::RollPhase::Enemy, &[1, 1]),
        Err(BattleError::SessionFinished)
    );
}

#[tokio::test]
async fn passed_pre_battle_test_changes_only_luck() {
    let mut session =
        BattleSession::new(hero(), enemy_with(lightning_bolt(scarring_failure())), Recorder::default())
            .unwrap();
    let mut dice = Dice::from_scripted(vec![1, 1]);

    session.start_battle(&mut dice).await.unwrap();
    assert_eq!(session.player().strength.current, 20);
    assert_eq!(session.player().luck.current, 4);
    assert!(session.observer().lost_items.is_empty());
    assert!(session.observer().notices[0].contains("escape"));
}

#[tokio::test]
async fn instant_defeat_ignores_remaining_strength() {
    let variant = EncounterVariant {
        before_battle: Some(PreBattleHazard {
            test: TestKind::Skill,
            description: "The rope bridge".into(),
            on_failure: Consequence {
                instant_defeat: true,
                ..Consequence::default()
            },
        }),
        ..EncounterVariant::default()
    };
    let mut session = BattleSession::new(hero(), enemy_with(variant), Recorder::default()).unwrap();
    let mut dice = Dice::from_scripted(vec![6, 6]);

    assert_eq!(session.start_battle(&mut dice).await.unwrap(), EngineEvent::Defeat);
    assert_eq!(session.player().strength.current, 20);
    assert_eq!(session.observer().defeats, 1);
}

fn dagger_thrower() -> EnemyDefinition {
    enemy_with(EncounterVariant {
        each_turn: Some(TurnHazard {
            description: "The thrown dagger".into(),
            hit_on: 5,
            damage: 2,
        }),
        ..EncounterVariant::default()
    })
}

#[tokio::test]
async fn turn_hazard_resolves_before_every_turn() {
    let options = SessionOptions { armor: 3 };
    let mut session =
        BattleSession::with_options(hero(), dagger_thrower(), Recorder::default(), options).unwrap();
    let mut dice = Dice::from_scripted(vec![6, 2]);

    session.start_battle(&mut dice).await.unwrap();
    assert_eq!(session.player().strength.current, 18);
    assert_eq!(session.phase(), Phase::AwaitingEnemyRoll);

    play_turn(&mut session, [3, 3], [2, 4]);
    session.next_turn(&mut dice).await.unwrap();
    assert_eq!(session.player().strength.current, 18);
    assert_eq!(session.turn(), 2);
    assert_eq!(session.observer().notices.len(), 2);
    assert!(session.observer().notices[1].contains("misses"));
}

#[tokio::test]
async fn turn_hazard_can_end_the_fight_before_any_roll() {
    let mut player = hero();
    player.strength.current = 2;
    let mut session = BattleSession::new(player, dagger_thrower(), Recorder::default()).unwrap();
    let mut dice = Dice::from_scripted(vec![5]);

    assert_eq!(session.start_battle(&mut dice).await.unwrap(), EngineEvent::Defeat);
    assert!(session.history().is_empty());
    assert_eq!(session.observer().defeats, 1);
}

#[tokio::test]
async fn hazard_rolls_are_validated() {
    let mut session = BattleSession::new(hero(), dagger_thrower(), Recorder::default()).unwrap();
    let mut dice = Dice::from_scripted(vec![9]);
    assert_eq!(
        session.start_battle(&mut dice).await,
        Err(BattleError::RollOutOfRange { value: 9 })
    );
}

struct TurnCounter(Arc<AtomicU32>);

#[async_trait]
impl EncounterHook for TurnCounter {
    async fn before_turn(&self, ctx: &mut HookContext<'_>) -> BattleResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        assert_eq!(ctx.enemy_name(), "Boss");
        assert_eq!(ctx.turn(), self.0.load(Ordering::SeqCst));
        Ok(())
    }
}

#[tokio::test]
async fn custom_hooks_run_once_per_turn() {
    let calls = Arc::new(AtomicU32::new(0));
    let variant = EncounterVariant::default().with_hook(TurnCounter(calls.clone()));
    let mut session = started(hero(), enemy_with(variant)).await;
    let mut dice = Dice::from_scripted(vec![]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    play_turn(&mut session, [3, 3], [2, 4]);
    session.next_turn(&mut dice).await.unwrap();
    play_turn(&mut session, [3, 3], [2, 4]);
    session.next_turn(&mut dice).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

struct Collapse;

#[async_trait]
impl EncounterHook for Collapse {
    async fn before_battle(&self, _ctx: &mut HookContext<'_>) -> BattleResult<()> {
        Err(BattleError::Hook("ceiling collapsed".into()))
    }
}

#[tokio::test]
async fn failing_hook_surfaces_its_error() {
    let variant = EncounterVariant::default().with_hook(Collapse);
    let mut session = BattleSession::new(hero(), enemy_with(variant), Recorder::default()).unwrap();
    let mut dice = Dice::from_scripted(vec![]);
    assert_eq!(
        session.start_battle(&mut dice).await,
        Err(BattleError::Hook("ceiling collapsed".into()))
    );
}

fn bolt_and_dagger() -> EnemyDefinition {
    let mut variant = lightning_bolt(scarring_failure());
    variant.each_turn = dagger_thrower().variant.each_turn;
    enemy_with(variant)
}

#[tokio::test]
async fn bad_turn_roll_does_not_repeat_the_pre_battle_test() {
    let mut session = BattleSession::new(hero(), bolt_and_dagger(), Recorder::default()).unwrap();

    let mut dice = Dice::from_scripted(vec![6, 6, 9]);
    assert_eq!(
        session.start_battle(&mut dice).await,
        Err(BattleError::RollOutOfRange { value: 9 })
    );
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.turn(), 0);
    assert_eq!(session.player().strength.current, 14);
    assert_eq!(session.player().luck.current, 4);
    assert_eq!(session.observer().lost_items, vec!["shield".to_string()]);

    let mut dice = Dice::from_scripted(vec![1]);
    assert_eq!(session.start_battle(&mut dice).await, Ok(EngineEvent::AwaitNextRoll));
    assert_eq!(session.turn(), 1);
    assert_eq!(session.player().strength.current, 14);
    assert_eq!(session.player().luck.current, 4);
    assert_eq!(session.observer().lost_items, vec!["shield".to_string()]);
    assert_eq!(session.observer().stats.len(), 1);

    play_turn(&mut session, [3, 3], [2, 4]);
    assert_eq!(session.history()[0].turn_number, 1);
}

struct Backfire;

#[async_trait]
impl EncounterHook for Backfire {
    async fn before_turn(&self, ctx: &mut HookContext<'_>) -> BattleResult<()> {
        ctx.damage_player(3);
        ctx.lose_item("lantern");
        Err(BattleError::Hook("trap jammed".into()))
    }
}

#[tokio::test]
async fn failing_hook_chain_applies_nothing() {
    let enemy = dagger_thrower();
    let variant = enemy.variant.clone().with_hook(Backfire);
    let mut session = BattleSession::new(hero(), enemy.with_variant(variant), Recorder::default()).unwrap();
    let mut dice = Dice::from_scripted(vec![6]);

    assert_eq!(
        session.start_battle(&mut dice).await,
        Err(BattleError::Hook("trap jammed".into()))
    );
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.turn(), 0);
    assert_eq!(session.player().strength.current, 20);
    assert!(session.observer().stats.is_empty());
    assert!(session.observer().notices.is_empty());
    assert!(session.observer().lost_items.is_empty());
}
