//! Per-encounter rule overrides and the hook points they plug into.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::checks::{self, LuckCheck};
use crate::error::BattleResult;
use crate::hazards::{PreBattleHazard, TurnHazard};
use crate::stats::CombatantStats;
use crate::{validate_roll, DiceCount, DiceRoller};

pub const DEFAULT_DAMAGE_PER_HIT: i32 = 2;

/// An opponent as written in the encounter content. `strength` is the
/// enemy's health pool for this one fight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyDefinition {
    pub name: String,
    pub skill: i32,
    pub strength: i32,
    #[serde(default)]
    pub variant: EncounterVariant,
}

impl EnemyDefinition {
    pub fn new(name: impl Into<String>, skill: i32, strength: i32) -> Self {
        Self {
            name: name.into(),
            skill,
            strength,
            variant: EncounterVariant::default(),
        }
    }

    pub fn with_variant(mut self, variant: EncounterVariant) -> Self {
        self.variant = variant;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterVariant {
    pub damage_per_hit: i32,
    pub luck_test_enabled: bool,
    pub armor_affects_damage: bool,
    /// Mandatory test resolved once before the first turn.
    pub before_battle: Option<PreBattleHazard>,
    /// Hazard resolved at the start of every turn.
    pub each_turn: Option<TurnHazard>,
    #[serde(skip)]
    pub hooks: HookSet,
}

impl Default for EncounterVariant {
    fn default() -> Self {
        Self {
            damage_per_hit: DEFAULT_DAMAGE_PER_HIT,
            luck_test_enabled: true,
            armor_affects_damage: true,
            before_battle: None,
            each_turn: None,
            hooks: HookSet::default(),
        }
    }
}

impl EncounterVariant {
    pub fn with_hook(mut self, hook: impl EncounterHook + 'static) -> Self {
        self.hooks.0.push(Arc::new(hook));
        self
    }

    /// Declarative hazards first, then any custom hooks in registration order.
    pub fn collect_hooks(&self) -> Vec<Arc<dyn EncounterHook>> {
        let mut hooks: Vec<Arc<dyn EncounterHook>> = Vec::new();
        if let Some(hazard) = &self.before_battle {
            hooks.push(Arc::new(hazard.clone()));
        }
        if let Some(hazard) = &self.each_turn {
            hooks.push(Arc::new(hazard.clone()));
        }
        hooks.extend(self.hooks.0.iter().cloned());
        hooks
    }
}

/// Custom hooks attached in code; never part of serialized content.
#[derive(Clone, Default)]
pub struct HookSet(Vec<Arc<dyn EncounterHook>>);

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookSet({} hooks)", self.0.len())
    }
}

/// Bespoke rule attached to one encounter.
///
/// Both methods are awaited to completion before the battle moves on, so a
/// hook may wait on its own dice animation or a dialog acknowledgement.
#[async_trait]
pub trait EncounterHook: Send + Sync {
    async fn before_battle(&self, _ctx: &mut HookContext<'_>) -> BattleResult<()> {
        Ok(())
    }

    async fn before_turn(&self, _ctx: &mut HookContext<'_>) -> BattleResult<()> {
        Ok(())
    }
}

/// What a hook may see and change while it runs.
pub struct HookContext<'a> {
    player: &'a mut CombatantStats,
    roller: &'a mut dyn DiceRoller,
    enemy_name: &'a str,
    turn: u32,
    effects: HookEffects,
}

/// Side effects a hook produced besides stat changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookEffects {
    pub lost_items: Vec<String>,
    pub notices: Vec<String>,
    pub defeated: bool,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        player: &'a mut CombatantStats,
        roller: &'a mut dyn DiceRoller,
        enemy_name: &'a str,
        turn: u32,
    ) -> Self {
        Self {
            player,
            roller,
            enemy_name,
            turn,
            effects: HookEffects::default(),
        }
    }

    pub(crate) fn into_effects(self) -> HookEffects {
        self.effects
    }

    pub fn player(&self) -> &CombatantStats {
        self.player
    }

    pub fn enemy_name(&self) -> &str {
        self.enemy_name
    }

    /// Turn about to be fought; 0 while the pre-battle hook runs.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub async fn roll(&mut self, count: DiceCount) -> BattleResult<Vec<u8>> {
        let dice = self.roller.roll(count).await;
        validate_roll(count, &dice)?;
        Ok(dice)
    }

    /// Mandatory luck test: same rule as the in-battle one, but never refused.
    pub async fn test_luck(&mut self) -> BattleResult<LuckCheck> {
        let dice = self.roll(DiceCount::Two).await?;
        Ok(checks::test_luck(&mut self.player.luck, &dice))
    }

    pub async fn test_skill(&mut self) -> BattleResult<bool> {
        let dice = self.roll(DiceCount::Two).await?;
        Ok(checks::test_skill(&self.player.skill, &dice))
    }

    pub fn damage_player(&mut self, amount: i32) -> i32 {
        self.player.strength.lose(amount)
    }

    pub fn set_strength(&mut self, value: i32) {
        self.player.strength = self.player.strength.with_current(value);
    }

    pub fn reduce_skill(&mut self, amount: i32) -> i32 {
        self.player.skill.lose(amount)
    }

    pub fn lose_item(&mut self, item: impl Into<String>) {
        self.effects.lost_items.push(item.into());
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.effects.notices.push(message.into());
    }

    /// End the encounter in defeat as soon as the hook returns.
    pub fn declare_defeat(&mut self) {
        self.effects.defeated = true;
    }
}
