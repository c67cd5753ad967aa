//! Why an action was rejected.

use thiserror::Error;

use crate::core::{ActionKind, CreatureId, InstanceId, Phase, PlayerId};

/// A rule the action breaks. Rejected actions leave the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("match is already finished")]
    MatchFinished,

    #[error("player {0} is not in this match")]
    UnknownPlayer(PlayerId),

    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    #[error("{action} needs the {expected} phase, match is in the {actual} phase")]
    WrongPhase {
        action: ActionKind,
        expected: Phase,
        actual: Phase,
    },

    #[error("all {budget} actions of this turn are used")]
    ActionBudgetExhausted { budget: u8 },

    #[error("{0} does not exist")]
    CreatureNotFound(CreatureId),

    #[error("{creature} belongs to {owner}")]
    NotOwner { creature: CreatureId, owner: PlayerId },

    #[error("knowledge {0} is not in hand")]
    KnowledgeNotInHand(InstanceId),

    #[error("{0} already holds knowledge")]
    SlotOccupied(CreatureId),

    #[error("wisdom {wisdom} is below knowledge cost {cost}")]
    InsufficientWisdom { wisdom: u32, cost: u32 },

    #[error("knowledge {0} is not in the market")]
    NotInMarket(InstanceId),

    #[error("hand is full ({limit} cards)")]
    HandFull { limit: usize },

    #[error("SET_STATE is not a player move")]
    NotAPlayerMove,
}
