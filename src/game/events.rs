//! Game Events
//!
//! Outcome events generated by engine operations. The session drains them
//! after each intent to decide which notifications to broadcast.

use serde::{Deserialize, Serialize};

use crate::core::fixed::Fixed;
use crate::game::grid::GridPos;
use crate::game::state::{CompetitorId, MatchOutcome};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A competitor took a seat
    CompetitorJoined {
        competitor_id: CompetitorId,
        name: String,
    },

    /// Loadout chosen
    LoadoutSelected {
        competitor_id: CompetitorId,
        robot_id: String,
        weapon_id: String,
    },

    /// Ready flag changed
    ReadyChanged {
        competitor_id: CompetitorId,
        ready: bool,
    },

    /// Both seats ready, turn 1 begins
    MatchStarted {
        first_player_id: CompetitorId,
    },

    /// Accepted move
    Moved {
        competitor_id: CompetitorId,
        from: GridPos,
        to: GridPos,
    },

    /// Spawn heal applied
    Healed {
        competitor_id: CompetitorId,
        amount: Fixed,
        hp: Fixed,
    },

    /// Accepted attack
    Attacked {
        attacker_id: CompetitorId,
        target_id: CompetitorId,
        damage: Fixed,
        target_hp: Fixed,
    },

    /// Trap started arming
    TrapArmed {
        trap_id: String,
    },

    /// Trap became active
    TrapActivated {
        trap_id: String,
        duration: u32,
    },

    /// Active trap damaged a competitor
    TrapHit {
        trap_id: String,
        competitor_id: CompetitorId,
        damage: Fixed,
        hp: Fixed,
    },

    /// Trap returned to idle
    TrapIdle {
        trap_id: String,
    },

    /// Turn rotated
    TurnEnded {
        next_player_id: CompetitorId,
        turn: u32,
    },

    /// Outcome decided
    MatchEnded {
        outcome: MatchOutcome,
    },

    /// Competitor lost its connection mid-match
    Disconnected {
        competitor_id: CompetitorId,
    },

    /// Competitor reattached
    Reconnected {
        competitor_id: CompetitorId,
    },

    /// Competitor removed from the roster
    Left {
        competitor_id: CompetitorId,
    },

    /// Finished match replaced by a fresh lobby
    MatchReset {
        rng_seed: u64,
    },
}

/// A game event with the turn it happened on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Turn counter when the event occurred (0 in the lobby)
    pub turn: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(turn: u32, data: GameEventData) -> Self {
        Self { turn, data }
    }

    /// Does this event change what the lobby shows.
    pub fn affects_lobby(&self) -> bool {
        matches!(
            self.data,
            GameEventData::CompetitorJoined { .. }
                | GameEventData::LoadoutSelected { .. }
                | GameEventData::ReadyChanged { .. }
                | GameEventData::Disconnected { .. }
                | GameEventData::Reconnected { .. }
                | GameEventData::Left { .. }
                | GameEventData::MatchReset { .. }
        )
    }

    /// Does this event change the board.
    pub fn affects_board(&self) -> bool {
        matches!(
            self.data,
            GameEventData::MatchStarted { .. }
                | GameEventData::Moved { .. }
                | GameEventData::Healed { .. }
                | GameEventData::Attacked { .. }
                | GameEventData::TrapArmed { .. }
                | GameEventData::TrapActivated { .. }
                | GameEventData::TrapHit { .. }
                | GameEventData::TrapIdle { .. }
                | GameEventData::TurnEnded { .. }
                | GameEventData::MatchEnded { .. }
        )
    }

    /// Create match ended event.
    pub fn match_ended(turn: u32, outcome: MatchOutcome) -> Self {
        Self::new(turn, GameEventData::MatchEnded { outcome })
    }

    /// Create trap hit event.
    pub fn trap_hit(turn: u32, trap_id: &str, competitor_id: CompetitorId, damage: Fixed, hp: Fixed) -> Self {
        Self::new(
            turn,
            GameEventData::TrapHit {
                trap_id: trap_id.to_string(),
                competitor_id,
                damage,
                hp,
            },
        )
    }
}
