//! Match State Definitions
//!
//! The match aggregate: roster, turn pointer, action points, hazards and
//! outcome. Owned exclusively by [`crate::game::engine::ArenaEngine`].
//!
//! The roster is a plain `Vec` capped at [`MAX_COMPETITORS`]; seat index is
//! the position in that vector and keys spawn corners and spawn zones.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::fixed::Fixed;
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::game::events::GameEvent;
use crate::game::grid::GridPos;
use crate::game::trap::TrapInstance;

/// Seats per match.
pub const MAX_COMPETITORS: usize = 2;

// =============================================================================
// COMPETITOR ID
// =============================================================================

/// Unique competitor identifier (UUID-shaped bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CompetitorId(pub [u8; 16]);

impl CompetitorId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Derive the id of the `join_counter`-th join in a match.
    ///
    /// Depends only on match seed, counter and name, so replaying a match
    /// reproduces every id.
    pub fn derive(match_seed: u64, join_counter: u32, name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"ROBOT_ARENA_COMPETITOR_V1");
        hasher.update(match_seed.to_le_bytes());
        hasher.update(join_counter.to_le_bytes());
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(bytes)
    }

    /// Parse from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

// =============================================================================
// COMPETITOR
// =============================================================================

/// One seat in the match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    /// Unique id
    pub id: CompetitorId,

    /// Display name (trimmed, 1..=20 chars)
    pub name: String,

    /// Has a live connection
    pub connected: bool,

    /// Chosen robot archetype
    pub robot_id: Option<String>,

    /// Chosen weapon archetype
    pub weapon_id: Option<String>,

    /// Current hit points, `[0, hp_max]`
    pub hp: Fixed,

    /// Max hit points of the chosen robot (0 until a loadout is selected)
    pub hp_max: Fixed,

    /// Grid cell (meaningful once the match is playing)
    pub pos: GridPos,

    /// Ready flag
    pub ready: bool,
}

impl Competitor {
    /// Fresh lobby entry: no loadout, zero HP, not ready.
    pub fn new(id: CompetitorId, name: String) -> Self {
        Self {
            id,
            name,
            connected: true,
            robot_id: None,
            weapon_id: None,
            hp: 0,
            hp_max: 0,
            pos: GridPos::default(),
            ready: false,
        }
    }

    /// Both loadout slots are set.
    #[inline]
    pub fn has_loadout(&self) -> bool {
        self.robot_id.is_some() && self.weapon_id.is_some()
    }

    /// Still standing.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_bytes(self.id.as_bytes());
        hasher.update_str(&self.name);
        hasher.update_bool(self.connected);
        hasher.update_str(self.robot_id.as_deref().unwrap_or(""));
        hasher.update_str(self.weapon_id.as_deref().unwrap_or(""));
        hasher.update_fixed(self.hp);
        hasher.update_fixed(self.hp_max);
        hasher.update_i32(self.pos.x);
        hasher.update_i32(self.pos.y);
        hasher.update_bool(self.ready);
    }
}

// =============================================================================
// MATCH PHASE / OUTCOME
// =============================================================================

/// Match lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MatchPhase {
    /// Lobby: joining, loadouts, readiness
    #[default]
    Waiting = 0,
    /// Turns are being played
    Playing = 1,
    /// Outcome decided
    Finished = 2,
}

impl MatchPhase {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchPhase::Waiting => "waiting",
            MatchPhase::Playing => "playing",
            MatchPhase::Finished => "finished",
        }
    }
}

/// How a finished match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// One competitor won
    Victory(CompetitorId),
    /// Both competitors were knocked out in the same trap pass
    Draw,
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// The match aggregate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    /// Lifecycle phase
    pub phase: MatchPhase,

    /// Seats in join order (at most [`MAX_COMPETITORS`])
    pub roster: Vec<Competitor>,

    /// Turn holder while playing
    pub turn_player_id: Option<CompetitorId>,

    /// Action points left for the turn holder
    pub ap_remaining: u32,

    /// Turn counter, 1 at match start
    pub turn: u32,

    /// Fixed match seed
    pub rng_seed: u64,

    /// Winner, set only on a decisive finish
    pub winner_id: Option<CompetitorId>,

    /// Outcome, set only when finished
    pub outcome: Option<MatchOutcome>,

    /// Trap runtime instances (empty until the match starts)
    pub traps: Vec<TrapInstance>,

    /// Joins so far, feeds competitor id derivation
    pub join_counter: u32,

    /// Events generated since the last drain
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl MatchState {
    /// Create an empty lobby.
    pub fn new(rng_seed: u64) -> Self {
        Self {
            phase: MatchPhase::Waiting,
            roster: Vec::with_capacity(MAX_COMPETITORS),
            turn_player_id: None,
            ap_remaining: 0,
            turn: 0,
            rng_seed,
            winner_id: None,
            outcome: None,
            traps: Vec::new(),
            join_counter: 0,
            pending_events: Vec::new(),
        }
    }

    /// Seat index of a competitor.
    pub fn seat_of(&self, id: &CompetitorId) -> Option<usize> {
        self.roster.iter().position(|c| c.id == *id)
    }

    /// Get a competitor by ID.
    pub fn competitor(&self, id: &CompetitorId) -> Option<&Competitor> {
        self.roster.iter().find(|c| c.id == *id)
    }

    /// Get a competitor mutably by ID.
    pub fn competitor_mut(&mut self, id: &CompetitorId) -> Option<&mut Competitor> {
        self.roster.iter_mut().find(|c| c.id == *id)
    }

    /// Roster is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.roster.len() >= MAX_COMPETITORS
    }

    /// Two seats, both ready.
    pub fn can_start(&self) -> bool {
        self.roster.len() == MAX_COMPETITORS && self.roster.iter().all(|c| c.ready)
    }

    /// Is the match being played.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.phase == MatchPhase::Playing
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.turn, self.rng_seed, |hasher| {
            hasher.update_u8(self.phase as u8);

            let turn_seat = self
                .turn_player_id
                .and_then(|id| self.seat_of(&id))
                .map_or(u8::MAX, |seat| seat as u8);
            hasher.update_u8(turn_seat);
            hasher.update_u32(self.ap_remaining);

            for competitor in &self.roster {
                competitor.hash_into(hasher);
            }

            for trap in &self.traps {
                trap.hash_into(hasher);
            }

            match self.outcome {
                None => hasher.update_u8(0),
                Some(MatchOutcome::Draw) => hasher.update_u8(1),
                Some(MatchOutcome::Victory(id)) => {
                    hasher.update_u8(2);
                    hasher.update_bytes(id.as_bytes());
                }
            }
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
