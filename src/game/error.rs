//! Engine Errors
//!
//! Every engine operation either succeeds or returns an [`EngineError`]. No
//! error is fatal: state is left unchanged and the match continues.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::grid::GridPos;

/// How the transport should treat an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad lobby input: report to the originating connection.
    Validation,
    /// Illegal action: report with the authoritative position so the client
    /// can reconcile.
    Rejection,
    /// Stale or unknown session: drop silently.
    Stale,
}

/// Why an action was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Match is not in the playing phase.
    NotPlaying,
    /// Caller does not hold the turn.
    NotYourTurn,
    /// No action points left this turn.
    NoActionPoints,
    /// Destination is not 8-adjacent to the mover.
    NotAdjacent,
    /// Destination is off the board.
    OutOfBounds,
    /// Destination holds another competitor.
    CellOccupied,
    /// Attacker and target share neither row nor column.
    Diagonal,
    /// Target distance is outside `[1, range]`.
    OutOfRange,
    /// Target is not in the roster.
    InvalidTarget,
    /// Attacker has no weapon equipped.
    NoWeapon,
}

impl RejectReason {
    /// Human readable reason sent to clients.
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::NotPlaying => "match is not in progress",
            RejectReason::NotYourTurn => "not your turn",
            RejectReason::NoActionPoints => "no action points left",
            RejectReason::NotAdjacent => "destination is not adjacent",
            RejectReason::OutOfBounds => "destination is out of bounds",
            RejectReason::CellOccupied => "destination is occupied",
            RejectReason::Diagonal => "attacks must be in a straight line",
            RejectReason::OutOfRange => "target is out of range",
            RejectReason::InvalidTarget => "invalid target",
            RejectReason::NoWeapon => "no weapon equipped",
        }
    }
}

/// A refused action plus the acting competitor's authoritative cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// Why the action was refused
    pub reason: RejectReason,
    /// Unchanged position of the actor, when the match is playing
    pub authoritative_pos: Option<GridPos>,
}

/// Engine operation failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Name empty or longer than the limit.
    #[error("invalid name")]
    InvalidName,
    /// Both seats taken.
    #[error("lobby is full")]
    RosterFull,
    /// Another competitor already uses the name.
    #[error("name is already taken")]
    NameTaken,
    /// Robot or weapon id not in the catalog.
    #[error("unknown robot or weapon")]
    UnknownArchetype,
    /// Ready requested before both loadout slots are set.
    #[error("select a robot and a weapon first")]
    IncompleteLoadout,
    /// Start requested without two competitors.
    #[error("two competitors are required")]
    NotEnoughCompetitors,
    /// Lobby intent while a match is playing.
    #[error("match in progress")]
    MatchInProgress,
    /// Competitor id not in the roster.
    #[error("unknown competitor")]
    UnknownCompetitor,
    /// Action refused.
    #[error("action rejected: {}", .0.reason.message())]
    Rejected(Rejection),
}

impl EngineError {
    /// Build a rejection.
    pub fn rejected(reason: RejectReason, authoritative_pos: Option<GridPos>) -> Self {
        EngineError::Rejected(Rejection { reason, authoritative_pos })
    }

    /// Classify for routing.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::UnknownCompetitor => ErrorClass::Stale,
            EngineError::Rejected(_) => ErrorClass::Rejection,
            _ => ErrorClass::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(EngineError::NameTaken.class(), ErrorClass::Validation);
        assert_eq!(EngineError::UnknownCompetitor.class(), ErrorClass::Stale);
        assert_eq!(
            EngineError::rejected(RejectReason::Diagonal, None).class(),
            ErrorClass::Rejection
        );
    }

    #[test]
    fn test_display() {
        let err = EngineError::rejected(RejectReason::CellOccupied, Some(GridPos::new(1, 9)));
        assert_eq!(err.to_string(), "action rejected: destination is occupied");
    }
}
