//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON object tagged by `"type"`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::fixed::to_float;
use crate::game::catalog::{Catalog, RobotArchetype, WeaponArchetype};
use crate::game::error::{EngineError, Rejection};
use crate::game::grid::GridPos;
use crate::game::state::{Competitor, MatchPhase, MatchState};
use crate::game::trap::TrapInstance;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Take a seat under a display name.
    Join {
        #[serde(default)]
        name: String,
    },

    /// Reattach to a seat with a token from `join_ok`.
    Reconnect {
        #[serde(default)]
        token: String,
    },

    /// Choose robot and weapon.
    SelectLoadout { robot_id: String, weapon_id: String },

    /// Toggle readiness.
    SetReady {
        #[serde(default)]
        ready: bool,
    },

    /// Move one cell.
    ActionMove {
        to_x: i32,
        to_y: i32,
        #[serde(default)]
        client_action_id: Option<String>,
    },

    /// Attack another competitor.
    ActionAttack {
        target_player_id: String,
        #[serde(default)]
        client_action_id: Option<String>,
    },

    /// Hand the turn over.
    EndTurn,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Seat granted.
    JoinOk { player_id: String, token: String },

    /// Seat reattached.
    ReconnectOk { player_id: String },

    /// Reference catalog.
    Seed {
        robots: Vec<RobotArchetype>,
        weapons: Vec<WeaponArchetype>,
    },

    /// Roster summary.
    LobbyState(LobbyState),

    /// Full board snapshot.
    GameState(GameStateView),

    /// Match outcome.
    GameOver {
        winner_id: Option<String>,
        winner_name: Option<String>,
    },

    /// An action was refused; the client should roll back its prediction.
    ActionRejected {
        client_action_id: Option<String>,
        reason: String,
        authoritative_pos: Option<GridPos>,
    },

    /// Error notification.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// Roster summary shown in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyState {
    /// Match phase
    pub status: MatchPhase,
    /// Seats in join order
    pub players: Vec<LobbyPlayer>,
    /// Two seats, both ready
    pub can_start: bool,
}

/// One lobby seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    /// Competitor id
    pub player_id: String,
    /// Display name
    pub name: String,
    /// Has a live connection
    pub connected: bool,
    /// Ready flag
    pub ready: bool,
    /// Chosen robot
    pub robot_id: Option<String>,
    /// Chosen weapon
    pub weapon_id: Option<String>,
}

/// Full match snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    /// Match phase
    pub status: MatchPhase,
    /// Seats in join order
    pub players: Vec<PlayerView>,
    /// Turn holder
    pub turn_player_id: Option<String>,
    /// Action points left this turn
    pub ap_remaining: u32,
    /// Turn counter
    pub turn_number: u32,
    /// Match seed
    pub rng_seed: u64,
    /// Winner, when finished decisively
    pub winner_id: Option<String>,
    /// Trap runtime states by trap id
    pub traps_state: BTreeMap<String, TrapView>,
    /// Hex SHA-256 of the authoritative state
    pub state_hash: String,
}

/// One competitor on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Competitor id
    pub player_id: String,
    /// Display name
    pub name: String,
    /// Has a live connection
    pub connected: bool,
    /// Chosen robot
    pub robot_id: Option<String>,
    /// Chosen weapon
    pub weapon_id: Option<String>,
    /// Current hit points (display only)
    pub hp: f64,
    /// Max hit points (display only)
    pub hp_max: f64,
    /// Grid cell
    pub pos: GridPos,
    /// Ready flag
    pub ready: bool,
}

/// One trap on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapView {
    /// "idle", "arming" or "active"
    pub state: String,
    /// 1 while arming
    #[serde(rename = "armingTurnsRemaining")]
    pub arming_turns_remaining: u32,
    /// Active resolutions left
    #[serde(rename = "remainingActiveTurns")]
    pub remaining_active_turns: i32,
    /// Damage per active resolution
    pub damage: i32,
    /// Covered cells as `[x, y]`
    pub zone: Vec<[i32; 2]>,
    /// Arming weight (display only)
    pub weight: f64,
    /// Minimum active duration
    pub min_active: u32,
    /// Maximum active duration
    pub max_active: u32,
}

/// Error details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Name empty or too long.
    InvalidName,
    /// Both seats taken.
    RosterFull,
    /// Name already in use.
    NameTaken,
    /// Robot or weapon not in the catalog.
    UnknownArchetype,
    /// Loadout not chosen yet.
    IncompleteLoadout,
    /// Start without two competitors.
    NotEnoughCompetitors,
    /// Lobby intent during play.
    MatchInProgress,
    /// Action refused (no client action id to echo).
    Rejected,
    /// Intent sent before joining.
    NotJoined,
    /// Connection already holds a seat.
    AlreadyJoined,
    /// Reconnect token unknown.
    InvalidToken,
    /// Token valid but seat no longer exists.
    UnknownPlayer,
    /// Malformed message.
    InvalidMessage,
    /// Server is at its connection limit.
    ServerOverloaded,
}

impl ServerError {
    /// Create an error message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<&EngineError> for ServerError {
    fn from(err: &EngineError) -> Self {
        let code = match err {
            EngineError::InvalidName => ErrorCode::InvalidName,
            EngineError::RosterFull => ErrorCode::RosterFull,
            EngineError::NameTaken => ErrorCode::NameTaken,
            EngineError::UnknownArchetype => ErrorCode::UnknownArchetype,
            EngineError::IncompleteLoadout => ErrorCode::IncompleteLoadout,
            EngineError::NotEnoughCompetitors => ErrorCode::NotEnoughCompetitors,
            EngineError::MatchInProgress => ErrorCode::MatchInProgress,
            EngineError::UnknownCompetitor => ErrorCode::UnknownPlayer,
            EngineError::Rejected(_) => ErrorCode::Rejected,
        };
        Self::new(code, err.to_string())
    }
}

// =============================================================================
// VIEWS
// =============================================================================

impl From<&Competitor> for LobbyPlayer {
    fn from(c: &Competitor) -> Self {
        Self {
            player_id: c.id.to_uuid_string(),
            name: c.name.clone(),
            connected: c.connected,
            ready: c.ready,
            robot_id: c.robot_id.clone(),
            weapon_id: c.weapon_id.clone(),
        }
    }
}

impl From<&MatchState> for LobbyState {
    fn from(state: &MatchState) -> Self {
        Self {
            status: state.phase,
            players: state.roster.iter().map(LobbyPlayer::from).collect(),
            can_start: state.can_start(),
        }
    }
}

impl From<&Competitor> for PlayerView {
    fn from(c: &Competitor) -> Self {
        Self {
            player_id: c.id.to_uuid_string(),
            name: c.name.clone(),
            connected: c.connected,
            robot_id: c.robot_id.clone(),
            weapon_id: c.weapon_id.clone(),
            hp: to_float(c.hp),
            hp_max: to_float(c.hp_max),
            pos: c.pos,
            ready: c.ready,
        }
    }
}

impl From<&TrapInstance> for TrapView {
    fn from(t: &TrapInstance) -> Self {
        Self {
            state: t.phase.as_str().to_string(),
            arming_turns_remaining: t.arming_turns_remaining,
            remaining_active_turns: t.remaining_active_turns,
            damage: t.def.damage,
            zone: t.def.cells.iter().map(|c| [c.x, c.y]).collect(),
            weight: to_float(t.def.weight),
            min_active: t.def.min_active,
            max_active: t.def.max_active,
        }
    }
}

impl From<&MatchState> for GameStateView {
    fn from(state: &MatchState) -> Self {
        Self {
            status: state.phase,
            players: state.roster.iter().map(PlayerView::from).collect(),
            turn_player_id: state.turn_player_id.map(|id| id.to_uuid_string()),
            ap_remaining: state.ap_remaining,
            turn_number: state.turn,
            rng_seed: state.rng_seed,
            winner_id: state.winner_id.map(|id| id.to_uuid_string()),
            traps_state: state
                .traps
                .iter()
                .map(|t| (t.def.id.clone(), TrapView::from(t)))
                .collect(),
            state_hash: hex::encode(state.compute_hash()),
        }
    }
}

impl ServerMessage {
    /// `seed` message for a catalog.
    pub fn seed(catalog: &Catalog) -> Self {
        ServerMessage::Seed {
            robots: catalog.robots().cloned().collect(),
            weapons: catalog.weapons().cloned().collect(),
        }
    }

    /// `lobby_state` message.
    pub fn lobby(state: &MatchState) -> Self {
        ServerMessage::LobbyState(LobbyState::from(state))
    }

    /// `game_state` message.
    pub fn game_state(state: &MatchState) -> Self {
        ServerMessage::GameState(GameStateView::from(state))
    }

    /// `game_over` message.
    pub fn game_over(state: &MatchState) -> Self {
        let winner = state.winner_id.and_then(|id| state.competitor(&id));
        ServerMessage::GameOver {
            winner_id: winner.map(|c| c.id.to_uuid_string()),
            winner_name: winner.map(|c| c.name.clone()),
        }
    }

    /// `action_rejected` message.
    pub fn rejected(client_action_id: Option<String>, rejection: &Rejection) -> Self {
        ServerMessage::ActionRejected {
            client_action_id,
            reason: rejection.reason.message().to_string(),
            authoritative_pos: rejection.authoritative_pos,
        }
    }

    /// `error` message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError::new(code, message))
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;
    use crate::game::error::RejectReason;
    use crate::game::state::CompetitorId;
    use crate::game::trap::default_trap_definitions;

    #[test]
    fn test_parse_client_messages() {
        let join = ClientMessage::from_json(r#"{"type":"join","name":"alice"}"#).unwrap();
        assert_eq!(join, ClientMessage::Join { name: "alice".into() });

        let mv = ClientMessage::from_json(
            r#"{"type":"action_move","to_x":2,"to_y":8,"client_action_id":"action_1"}"#,
        )
        .unwrap();
        assert_eq!(
            mv,
            ClientMessage::ActionMove { to_x: 2, to_y: 8, client_action_id: Some("action_1".into()) }
        );

        let end = ClientMessage::from_json(r#"{"type":"end_turn"}"#).unwrap();
        assert_eq!(end, ClientMessage::EndTurn);

        // Missing optional fields fall back to defaults
        let ready = ClientMessage::from_json(r#"{"type":"set_ready"}"#).unwrap();
        assert_eq!(ready, ClientMessage::SetReady { ready: false });
    }

    #[test]
    fn test_unknown_type_is_error() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_rejection_wire_shape() {
        let rejection = Rejection {
            reason: RejectReason::CellOccupied,
            authoritative_pos: Some(GridPos::new(1, 9)),
        };
        let json = ServerMessage::rejected(Some("a1".into()), &rejection).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "action_rejected");
        assert_eq!(value["client_action_id"], "a1");
        assert_eq!(value["authoritative_pos"]["x"], 1);
        assert_eq!(value["authoritative_pos"]["y"], 9);
    }

    #[test]
    fn test_game_state_view() {
        let mut state = MatchState::new(77);
        let mut c = Competitor::new(CompetitorId::derive(77, 0, "alice"), "alice".into());
        c.hp = from_int(45) + from_int(1) / 2;
        c.hp_max = from_int(90);
        state.roster.push(c);
        state.traps = TrapInstance::instantiate(&default_trap_definitions());

        let json = ServerMessage::game_state(&state).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "game_state");
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["players"][0]["hp"], 45.5);
        assert_eq!(value["traps_state"]["trap_fire_1"]["state"], "idle");
        assert_eq!(value["traps_state"]["trap_fire_1"]["armingTurnsRemaining"], 0);
        assert_eq!(value["traps_state"]["trap_hammer_1"]["zone"].as_array().unwrap().len(), 4);
        assert_eq!(value["state_hash"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_lobby_and_game_over() {
        let mut state = MatchState::new(1);
        let id = CompetitorId::derive(1, 0, "bob");
        state.roster.push(Competitor::new(id, "bob".into()));

        let json = ServerMessage::lobby(&state).to_json().unwrap();
        assert!(json.contains(r#""can_start":false"#));

        state.winner_id = Some(id);
        match ServerMessage::game_over(&state) {
            ServerMessage::GameOver { winner_name, .. } => assert_eq!(winner_name.as_deref(), Some("bob")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::Error(ServerError::from(&EngineError::NameTaken));
        let json = msg.to_json().unwrap();
        assert!(json.contains("name_taken"));
        assert!(json.contains("name is already taken"));
    }
}
