use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BattleResult;
use crate::variant::{EncounterHook, HookContext};
use crate::DiceCount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Luck,
    Skill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthPenalty {
    /// Subtract from current strength.
    Lose(i32),
    /// Drop current strength to `initial - n`.
    SetBelowInitial(i32),
}

/// What happens to the player when a pre-battle test is failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consequence {
    #[serde(default)]
    pub strength: Option<StrengthPenalty>,
    /// Permanent for the rest of the adventure; `initial` is untouched.
    #[serde(default)]
    pub skill_loss: i32,
    #[serde(default)]
    pub lost_item: Option<String>,
    #[serde(default)]
    pub instant_defeat: bool,
}

/// One mandatory test before combat proper, e.g. dodging a spear trap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreBattleHazard {
    pub test: TestKind,
    pub description: String,
    #[serde(default)]
    pub on_failure: Consequence,
}

#[async_trait]
impl EncounterHook for PreBattleHazard {
    async fn before_battle(&self, ctx: &mut HookContext<'_>) -> BattleResult<()> {
        let passed = match self.test {
            TestKind::Luck => {
                let check = ctx.test_luck().await?;
                debug!(
                    roll = check.roll,
                    luck = check.luck_after,
                    lucky = check.lucky,
                    "pre-battle luck test"
                );
                check.lucky
            }
            TestKind::Skill => ctx.test_skill().await?,
        };
        if passed {
            ctx.notify(format!("{}: you escape unharmed.", self.description));
            return Ok(());
        }

        let failure = &self.on_failure;
        match failure.strength {
            Some(StrengthPenalty::Lose(n)) => {
                ctx.damage_player(n);
            }
            Some(StrengthPenalty::SetBelowInitial(n)) => {
                let target = ctx.player().strength.initial - n;
                ctx.set_strength(target);
            }
            None => {}
        }
        if failure.skill_loss > 0 {
            ctx.reduce_skill(failure.skill_loss);
        }
        if let Some(item) = &failure.lost_item {
            ctx.lose_item(item.clone());
        }
        ctx.notify(format!("{}: you fail.", self.description));
        if failure.instant_defeat {
            ctx.declare_defeat();
        }
        Ok(())
    }
}

/// Recurring hazard outside the roll-and-compare flow, e.g. a thrown dagger.
/// One d6 per turn; a roll of `hit_on` or more deals `damage`, ignoring armor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnHazard {
    pub description: String,
    pub hit_on: u8,
    pub damage: i32,
}

#[async_trait]
impl EncounterHook for TurnHazard {
    async fn before_turn(&self, ctx: &mut HookContext<'_>) -> BattleResult<()> {
        let dice = ctx.roll(DiceCount::One).await?;
        let roll = dice[0];
        if roll >= self.hit_on {
            let lost = ctx.damage_player(self.damage);
            ctx.notify(format!("{} hits you (rolled {}) for {}.", self.description, roll, lost));
        } else {
            ctx.notify(format!("{} misses (rolled {}).", self.description, roll));
        }
        Ok(())
    }
}
