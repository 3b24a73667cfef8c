//! Network Layer
//!
//! WebSocket transport for the arena.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{ClientMessage, ErrorCode, GameStateView, LobbyState, ServerError, ServerMessage};
pub use session::{ArenaSession, ConnectionId, SharedSession};
pub use server::{GameServer, GameServerError, ServerConfig};
