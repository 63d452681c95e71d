use serde::{Deserialize, Serialize};

use crate::error::{BattleError, BattleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Skill,
    Strength,
    Luck,
}

/// One character attribute. `current` always stays within `0..=initial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub initial: i32,
    pub current: i32,
}

impl Attribute {
    pub fn new(initial: i32) -> Self {
        let initial = initial.max(0);
        Self {
            initial,
            current: initial,
        }
    }

    /// Same attribute with `current` clamped into `0..=initial`.
    pub fn with_current(self, value: i32) -> Self {
        Self {
            initial: self.initial,
            current: value.clamp(0, self.initial),
        }
    }

    /// Lower `current` by `amount`, floored at 0. Returns the amount actually removed.
    pub fn lose(&mut self, amount: i32) -> i32 {
        let before = self.current;
        *self = self.with_current(self.current - amount.max(0));
        before - self.current
    }

    /// Raise `current` by `amount`, capped at `initial`. Returns the amount actually restored.
    pub fn restore(&mut self, amount: i32) -> i32 {
        let before = self.current;
        *self = self.with_current(self.current + amount.max(0));
        self.current - before
    }

    pub fn is_valid(&self) -> bool {
        self.initial >= 0 && (0..=self.initial).contains(&self.current)
    }
}

/// Player-side attribute block, as owned by the external character sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantStats {
    pub skill: Attribute,
    pub strength: Attribute,
    pub luck: Attribute,
}

impl CombatantStats {
    /// Fresh character with every attribute at its initial value.
    pub fn new(skill: i32, strength: i32, luck: i32) -> Self {
        Self {
            skill: Attribute::new(skill),
            strength: Attribute::new(strength),
            luck: Attribute::new(luck),
        }
    }

    pub fn get(&self, kind: AttributeKind) -> &Attribute {
        match kind {
            AttributeKind::Skill => &self.skill,
            AttributeKind::Strength => &self.strength,
            AttributeKind::Luck => &self.luck,
        }
    }

    /// Reject a sheet that breaks `0 <= current <= initial` anywhere.
    pub fn validate(&self) -> BattleResult<()> {
        for kind in [
            AttributeKind::Skill,
            AttributeKind::Strength,
            AttributeKind::Luck,
        ] {
            let attr = self.get(kind);
            if !attr.is_valid() {
                return Err(BattleError::InvalidStats {
                    attribute: kind,
                    current: attr.current,
                    initial: attr.initial,
                });
            }
        }
        Ok(())
    }

    pub fn is_dead(&self) -> bool {
        self.strength.current <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lose_floors_at_zero() {
        let mut a = Attribute::new(5);
        assert_eq!(a.lose(3), 3);
        assert_eq!(a.lose(9), 2);
        assert_eq!(a.current, 0);
    }

    #[test]
    fn restore_caps_at_initial() {
        let mut a = Attribute {
            initial: 10,
            current: 8,
        };
        assert_eq!(a.restore(5), 2);
        assert_eq!(a.current, 10);
    }

    #[test]
    fn validate_flags_current_above_initial() {
        let mut s = CombatantStats::new(10, 20, 9);
        assert!(s.validate().is_ok());
        s.luck.current = 11;
        assert_eq!(
            s.validate(),
            Err(BattleError::InvalidStats {
                attribute: AttributeKind::Luck,
                current: 11,
                initial: 9,
            })
        );
    }
}
