use thiserror::Error;

use crate::combat::session::Phase;
use crate::stats::AttributeKind;

pub type BattleResult<T> = Result<T, BattleError>;

/// Failures of the battle engine. Game outcomes (misses, failed luck tests,
/// defeat) are never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("`{operation}` is not valid while the battle is in phase {phase:?}")]
    InvalidPhaseTransition {
        operation: &'static str,
        phase: Phase,
    },
    #[error("die face {value} is outside 1..=6")]
    RollOutOfRange { value: u8 },
    #[error("expected {expected} dice, got {actual}")]
    WrongDiceCount { expected: usize, actual: usize },
    #[error("no luck remaining")]
    InsufficientLuck,
    #[error("luck tests are disabled for this encounter")]
    LuckTestDisabled,
    #[error("no luck test available: {reason}")]
    LuckTestUnavailable { reason: &'static str },
    #[error("{attribute:?} current {current} must be within 0..={initial}")]
    InvalidStats {
        attribute: AttributeKind,
        current: i32,
        initial: i32,
    },
    #[error("the battle is already over")]
    SessionFinished,
    #[error("encounter hook failed: {0}")]
    Hook(String),
}

impl BattleError {
    /// Text for a transient notification, for the errors a player can cause.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            BattleError::InsufficientLuck => Some("You have no luck left to test."),
            BattleError::LuckTestDisabled => Some("Luck cannot help you in this fight."),
            _ => None,
        }
    }

    pub fn is_user_facing(&self) -> bool {
        self.user_message().is_some()
    }
}
