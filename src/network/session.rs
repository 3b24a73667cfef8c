//! Arena Session
//!
//! Binds WebSocket connections to seats in the single arena match.
//!
//! The session owns the [`ArenaEngine`], the reconnect token table and one
//! outbound channel per connection. Every client message is handled under a
//! single write lock, so engine mutations are serialized and every
//! broadcast observes a consistent state.
//!
//! ## Message Flow
//!
//! ```text
//! ClientMessage -> handle_message -> ArenaEngine -> GameEvents -> publish
//!                        |                                          |
//!                  direct replies                   game_over / lobby_state /
//!              (join_ok, seed, errors)               game_state to everyone
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::engine::ArenaEngine;
use crate::game::error::{EngineError, ErrorClass};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::grid::GridPos;
use crate::game::state::CompetitorId;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};

/// Shared handle used by connection tasks.
pub type SharedSession = Arc<RwLock<ArenaSession>>;

/// Per-process connection identifier.
pub type ConnectionId = u64;

/// Outbound channel of a connection.
struct ClientLink {
    /// Seat bound to this connection, once joined or reconnected.
    competitor_id: Option<CompetitorId>,
    /// Queue drained by the connection's writer task.
    sender: mpsc::Sender<ServerMessage>,
}

/// The arena: one match, its tokens and its live connections.
pub struct ArenaSession {
    engine: ArenaEngine,
    /// Reconnect token -> seat.
    tokens: BTreeMap<String, CompetitorId>,
    links: BTreeMap<ConnectionId, ClientLink>,
    next_connection_id: ConnectionId,
}

impl ArenaSession {
    /// Wrap an engine.
    pub fn new(engine: ArenaEngine) -> Self {
        Self {
            engine,
            tokens: BTreeMap::new(),
            links: BTreeMap::new(),
            next_connection_id: 1,
        }
    }

    /// Wrap an engine into a shared handle.
    pub fn shared(engine: ArenaEngine) -> SharedSession {
        Arc::new(RwLock::new(Self::new(engine)))
    }

    /// The engine driving this arena.
    pub fn engine(&self) -> &ArenaEngine {
        &self.engine
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.links.len()
    }

    /// Number of outstanding reconnect tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Seat bound to a connection.
    pub fn competitor_of(&self, conn: ConnectionId) -> Option<CompetitorId> {
        self.links.get(&conn).and_then(|link| link.competitor_id)
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Register a new connection's outbound queue.
    pub fn connect(&mut self, sender: mpsc::Sender<ServerMessage>) -> ConnectionId {
        let conn = self.next_connection_id;
        self.next_connection_id += 1;
        self.links.insert(conn, ClientLink { competitor_id: None, sender });
        debug!(conn, "connection registered");
        conn
    }

    /// Drop a connection. A bound seat is released before play or marked
    /// disconnected during play.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        let Some(link) = self.links.remove(&conn) else {
            return;
        };
        let Some(id) = link.competitor_id else {
            debug!(conn, "anonymous connection closed");
            return;
        };

        info!(conn, competitor = %id, "competitor connection closed");
        if let Err(err) = self.engine.handle_disconnect(id) {
            debug!(conn, %err, "disconnect ignored");
        }
        self.publish();
    }

    // =========================================================================
    // Message handling
    // =========================================================================

    /// Handle one decoded client message.
    pub fn handle_message(&mut self, conn: ConnectionId, msg: ClientMessage) {
        if !self.links.contains_key(&conn) {
            warn!(conn, "message from unregistered connection");
            return;
        }

        match msg {
            ClientMessage::Join { name } => self.handle_join(conn, &name),
            ClientMessage::Reconnect { token } => self.handle_reconnect(conn, &token),
            ClientMessage::SelectLoadout { robot_id, weapon_id } => {
                let Some(id) = self.require_seat(conn) else { return };
                if let Err(err) = self.engine.select_loadout(id, &robot_id, &weapon_id) {
                    self.report(conn, &err, None);
                }
            }
            ClientMessage::SetReady { ready } => {
                let Some(id) = self.require_seat(conn) else { return };
                if let Err(err) = self.engine.set_ready(id, ready) {
                    self.report(conn, &err, None);
                }
            }
            ClientMessage::ActionMove { to_x, to_y, client_action_id } => {
                let Some(id) = self.competitor_of(conn) else {
                    debug!(conn, "move from unjoined connection dropped");
                    return;
                };
                if let Err(err) = self.engine.apply_move(id, GridPos::new(to_x, to_y)) {
                    self.report(conn, &err, Some(client_action_id));
                }
            }
            ClientMessage::ActionAttack { target_player_id, client_action_id } => {
                let Some(id) = self.competitor_of(conn) else {
                    debug!(conn, "attack from unjoined connection dropped");
                    return;
                };
                // Unparseable ids resolve to a seat nobody holds
                let target = CompetitorId::from_uuid_str(&target_player_id).unwrap_or_default();
                if let Err(err) = self.engine.apply_attack(id, target) {
                    self.report(conn, &err, Some(client_action_id));
                }
            }
            ClientMessage::EndTurn => {
                let Some(id) = self.competitor_of(conn) else {
                    debug!(conn, "end_turn from unjoined connection dropped");
                    return;
                };
                if let Err(err) = self.engine.end_turn(id) {
                    self.report(conn, &err, None);
                }
            }
        }

        self.publish();
    }

    fn handle_join(&mut self, conn: ConnectionId, name: &str) {
        if self.competitor_of(conn).is_some() {
            self.send_to(conn, ServerMessage::error(ErrorCode::AlreadyJoined, "already joined"));
            return;
        }

        match self.engine.join(name) {
            Ok(id) => {
                let token = Uuid::new_v4().to_string();
                self.tokens.insert(token.clone(), id);
                self.bind(conn, id);

                info!(conn, competitor = %id, "competitor seated");
                self.send_to(conn, ServerMessage::JoinOk { player_id: id.to_uuid_string(), token });
                self.send_to(conn, ServerMessage::seed(self.engine.catalog()));
            }
            Err(err) => self.report(conn, &err, None),
        }
    }

    fn handle_reconnect(&mut self, conn: ConnectionId, token: &str) {
        let Some(id) = self.tokens.get(token).copied() else {
            self.send_to(conn, ServerMessage::error(ErrorCode::InvalidToken, "invalid token"));
            return;
        };

        if let Err(err) = self.engine.reconnect(id) {
            debug!(conn, %err, "reconnect to vanished seat");
            self.tokens.remove(token);
            self.send_to(conn, ServerMessage::error(ErrorCode::UnknownPlayer, "player not found"));
            return;
        }

        self.bind(conn, id);
        info!(conn, competitor = %id, "competitor reattached");
        self.send_to(conn, ServerMessage::ReconnectOk { player_id: id.to_uuid_string() });
        self.send_to(conn, ServerMessage::seed(self.engine.catalog()));
        self.publish();

        if self.engine.state().is_playing() {
            self.send_to(conn, ServerMessage::game_state(self.engine.state()));
        }
    }

    /// Seat of a connection, or a `not_joined` error.
    fn require_seat(&self, conn: ConnectionId) -> Option<CompetitorId> {
        let id = self.competitor_of(conn);
        if id.is_none() {
            self.send_to(conn, ServerMessage::error(ErrorCode::NotJoined, "join first"));
        }
        id
    }

    /// Bind a seat to one connection. A stale connection still holding the
    /// seat is detached so its close does not disconnect the seat.
    fn bind(&mut self, conn: ConnectionId, id: CompetitorId) {
        for (other, link) in self.links.iter_mut() {
            if *other != conn && link.competitor_id == Some(id) {
                link.competitor_id = None;
            }
        }
        if let Some(link) = self.links.get_mut(&conn) {
            link.competitor_id = Some(id);
        }
    }

    /// Forget a seat: revoke its tokens and detach its connections.
    fn revoke(&mut self, id: CompetitorId) {
        self.tokens.retain(|_, seat| *seat != id);
        for link in self.links.values_mut() {
            if link.competitor_id == Some(id) {
                link.competitor_id = None;
            }
        }
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Route an engine error to the originating connection.
    ///
    /// `client_action_id` is `Some` for board actions, which are answered
    /// with `action_rejected`.
    fn report(&self, conn: ConnectionId, err: &EngineError, client_action_id: Option<Option<String>>) {
        match (err.class(), err) {
            (ErrorClass::Stale, _) => {
                debug!(conn, %err, "stale intent dropped");
            }
            (ErrorClass::Rejection, EngineError::Rejected(rejection)) => {
                debug!(conn, %err, "action rejected");
                match client_action_id {
                    Some(action_id) => self.send_to(conn, ServerMessage::rejected(action_id, rejection)),
                    None => self.send_to(conn, ServerMessage::Error(ServerError::from(err))),
                }
            }
            _ => {
                debug!(conn, %err, "intent refused");
                self.send_to(conn, ServerMessage::Error(ServerError::from(err)));
            }
        }
    }

    /// Drain engine events and broadcast the resulting views.
    fn publish(&mut self) {
        let events = self.engine.take_events();
        if events.is_empty() {
            return;
        }

        for event in &events {
            if let GameEventData::Left { competitor_id } = event.data {
                self.revoke(competitor_id);
            }
        }

        let state = self.engine.state();
        let ended = events.iter().any(|e| matches!(e.data, GameEventData::MatchEnded { .. }));
        if ended {
            self.broadcast(&ServerMessage::game_over(state));
            self.broadcast(&ServerMessage::lobby(state));
            self.broadcast(&ServerMessage::game_state(state));
            return;
        }

        if events.iter().any(GameEvent::affects_lobby) {
            self.broadcast(&ServerMessage::lobby(state));
        }
        if events.iter().any(GameEvent::affects_board) {
            self.broadcast(&ServerMessage::game_state(state));
        }
    }

    /// Queue a message to every connection.
    pub fn broadcast(&self, msg: &ServerMessage) {
        for (conn, link) in &self.links {
            if let Err(err) = link.sender.try_send(msg.clone()) {
                debug!(conn, %err, "broadcast dropped");
            }
        }
    }

    fn send_to(&self, conn: ConnectionId, msg: ServerMessage) {
        if let Some(link) = self.links.get(&conn) {
            if let Err(err) = link.sender.try_send(msg) {
                debug!(conn, %err, "send dropped");
            }
        }
    }
}
