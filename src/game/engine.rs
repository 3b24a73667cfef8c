//! Match Engine
//!
//! Owns the match aggregate and applies intents to it. Every public
//! operation is one atomic transition: it either succeeds and emits
//! [`GameEvent`]s, or returns an [`EngineError`] and leaves state untouched.
//!
//! ```text
//!   waiting ──(both ready)──► playing ──(HP reaches 0)──► finished
//!      ▲                                                     │
//!      └──────────(next lobby intent: rematch)───────────────┘
//! ```
//!
//! The engine performs no I/O. Callers serialize access to it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::fixed::from_int;
use crate::core::rng::derive_rematch_seed;
use crate::game::catalog::Catalog;
use crate::game::combat::{apply_damage, spawn_heal, validate_attack, validate_move};
use crate::game::error::{EngineError, RejectReason};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::grid::{Grid, GridPos};
use crate::game::state::{Competitor, CompetitorId, MatchOutcome, MatchPhase, MatchState, MAX_COMPETITORS};
use crate::game::trap::{default_trap_definitions, resolve_traps, TrapDefinition, TrapInstance};

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 20;

/// Default action points per turn.
pub const DEFAULT_ACTION_POINTS: u32 = 3;

// =============================================================================
// CONFIG
// =============================================================================

/// Configuration for match simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchConfig {
    /// Board dimensions
    pub grid: Grid,
    /// Action points granted at the start of each turn
    pub action_points: u32,
    /// Hazards instantiated at match start
    pub traps: Vec<TrapDefinition>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            grid: Grid::default(),
            action_points: DEFAULT_ACTION_POINTS,
            traps: default_trap_definitions(),
        }
    }
}

// =============================================================================
// INTENTS
// =============================================================================

/// One recorded engine call, used for replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// [`ArenaEngine::join`]
    Join { name: String },
    /// [`ArenaEngine::reconnect`]
    Reconnect { competitor_id: CompetitorId },
    /// [`ArenaEngine::select_loadout`]
    SelectLoadout {
        competitor_id: CompetitorId,
        robot_id: String,
        weapon_id: String,
    },
    /// [`ArenaEngine::set_ready`]
    SetReady { competitor_id: CompetitorId, ready: bool },
    /// [`ArenaEngine::apply_move`]
    Move { competitor_id: CompetitorId, to: GridPos },
    /// [`ArenaEngine::apply_attack`]
    Attack {
        competitor_id: CompetitorId,
        target_id: CompetitorId,
    },
    /// [`ArenaEngine::end_turn`]
    EndTurn { competitor_id: CompetitorId },
    /// [`ArenaEngine::handle_disconnect`]
    Disconnect { competitor_id: CompetitorId },
}

// =============================================================================
// ENGINE
// =============================================================================

/// The authoritative match engine.
#[derive(Clone, Debug)]
pub struct ArenaEngine {
    state: MatchState,
    catalog: Arc<Catalog>,
    config: MatchConfig,
}

impl ArenaEngine {
    /// Create an engine with an empty lobby.
    pub fn new(rng_seed: u64, config: MatchConfig, catalog: Arc<Catalog>) -> Self {
        Self::with_state(MatchState::new(rng_seed), config, catalog)
    }

    /// Resume from an existing match state.
    pub fn with_state(state: MatchState, config: MatchConfig, catalog: Arc<Catalog>) -> Self {
        Self { state, catalog, config }
    }

    /// Current match state.
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Reference catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Match configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Drain events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.state.take_events()
    }

    fn emit(&mut self, data: GameEventData) {
        let turn = self.state.turn;
        self.state.push_event(GameEvent::new(turn, data));
    }

    fn seat(&self, id: &CompetitorId) -> Result<usize, EngineError> {
        self.state.seat_of(id).ok_or(EngineError::UnknownCompetitor)
    }

    // =========================================================================
    // Lobby
    // =========================================================================

    /// Take a seat. Returns the new competitor's id.
    pub fn join(&mut self, name: &str) -> Result<CompetitorId, EngineError> {
        self.lobby_intent(|engine| engine.take_seat(name))
    }

    fn take_seat(&mut self, name: &str) -> Result<CompetitorId, EngineError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(EngineError::InvalidName);
        }
        if self.state.is_full() {
            return Err(EngineError::RosterFull);
        }
        if self.state.roster.iter().any(|c| c.name == name) {
            return Err(EngineError::NameTaken);
        }

        let id = CompetitorId::derive(self.state.rng_seed, self.state.join_counter, name);
        self.state.join_counter += 1;
        self.state.roster.push(Competitor::new(id, name.to_string()));

        debug!(competitor = %id, name, "competitor joined");
        self.emit(GameEventData::CompetitorJoined { competitor_id: id, name: name.to_string() });
        Ok(id)
    }

    /// Mark a retained competitor as connected again.
    pub fn reconnect(&mut self, id: CompetitorId) -> Result<(), EngineError> {
        let seat = self.seat(&id)?;
        self.state.roster[seat].connected = true;

        debug!(competitor = %id, "competitor reconnected");
        self.emit(GameEventData::Reconnected { competitor_id: id });
        Ok(())
    }

    /// Choose robot and weapon. HP is set to the robot's max.
    pub fn select_loadout(
        &mut self,
        id: CompetitorId,
        robot_id: &str,
        weapon_id: &str,
    ) -> Result<(), EngineError> {
        self.lobby_intent(|engine| engine.equip(id, robot_id, weapon_id))
    }

    fn equip(&mut self, id: CompetitorId, robot_id: &str, weapon_id: &str) -> Result<(), EngineError> {
        let seat = self.seat(&id)?;
        if self.state.is_playing() {
            return Err(EngineError::MatchInProgress);
        }
        let (Some(robot), Some(_)) = (self.catalog.robot(robot_id), self.catalog.weapon(weapon_id)) else {
            return Err(EngineError::UnknownArchetype);
        };
        let hp_max = from_int(robot.hp_max);

        let competitor = &mut self.state.roster[seat];
        competitor.robot_id = Some(robot_id.to_string());
        competitor.weapon_id = Some(weapon_id.to_string());
        competitor.hp_max = hp_max;
        competitor.hp = hp_max;

        debug!(competitor = %id, robot_id, weapon_id, "loadout selected");
        self.emit(GameEventData::LoadoutSelected {
            competitor_id: id,
            robot_id: robot_id.to_string(),
            weapon_id: weapon_id.to_string(),
        });
        Ok(())
    }

    /// Set the ready flag. Starts the match once both seats are ready.
    pub fn set_ready(&mut self, id: CompetitorId, ready: bool) -> Result<(), EngineError> {
        self.lobby_intent(|engine| engine.mark_ready(id, ready))
    }

    fn mark_ready(&mut self, id: CompetitorId, ready: bool) -> Result<(), EngineError> {
        let seat = self.seat(&id)?;
        if self.state.is_playing() {
            return Err(EngineError::MatchInProgress);
        }
        if !self.state.roster[seat].has_loadout() {
            return Err(EngineError::IncompleteLoadout);
        }
        self.state.roster[seat].ready = ready;
        self.emit(GameEventData::ReadyChanged { competitor_id: id, ready });

        if self.state.can_start() {
            self.begin()?;
        }
        Ok(())
    }

    /// Place competitors on their spawn corners, arm the board and hand
    /// turn 1 to seat 0.
    pub fn start_match(&mut self) -> Result<(), EngineError> {
        self.lobby_intent(Self::begin)
    }

    fn begin(&mut self) -> Result<(), EngineError> {
        if self.state.is_playing() {
            return Err(EngineError::MatchInProgress);
        }
        if self.state.roster.len() != MAX_COMPETITORS {
            return Err(EngineError::NotEnoughCompetitors);
        }
        if !self.state.roster.iter().all(Competitor::has_loadout) {
            return Err(EngineError::IncompleteLoadout);
        }

        let grid = self.config.grid;
        for (seat, competitor) in self.state.roster.iter_mut().enumerate() {
            competitor.pos = grid.spawn_point(seat);
        }
        self.state.traps = TrapInstance::instantiate(&self.config.traps);
        self.state.phase = MatchPhase::Playing;
        self.state.turn = 1;
        self.state.ap_remaining = self.config.action_points;
        self.state.winner_id = None;
        self.state.outcome = None;

        let first = self.state.roster[0].id;
        self.state.turn_player_id = Some(first);

        info!(seed = self.state.rng_seed, first = %first, "match started");
        self.emit(GameEventData::MatchStarted { first_player_id: first });
        Ok(())
    }

    // =========================================================================
    // Turn actions
    // =========================================================================

    /// Check phase, turn ownership and (optionally) action points for the
    /// competitor at `seat`. Returns its authoritative position.
    fn check_turn(&self, seat: usize, needs_ap: bool) -> Result<GridPos, EngineError> {
        if !self.state.is_playing() {
            return Err(EngineError::rejected(RejectReason::NotPlaying, None));
        }
        let competitor = &self.state.roster[seat];
        let pos = competitor.pos;
        if self.state.turn_player_id != Some(competitor.id) {
            return Err(EngineError::rejected(RejectReason::NotYourTurn, Some(pos)));
        }
        if needs_ap && self.state.ap_remaining == 0 {
            return Err(EngineError::rejected(RejectReason::NoActionPoints, Some(pos)));
        }
        Ok(pos)
    }

    /// Move one cell (8 directions). Costs one action point.
    pub fn apply_move(&mut self, id: CompetitorId, dest: GridPos) -> Result<(), EngineError> {
        let seat = self.seat(&id)?;
        let from = self.check_turn(seat, true)?;
        validate_move(&self.config.grid, &self.state.roster, from, dest)
            .map_err(|reason| EngineError::rejected(reason, Some(from)))?;

        self.state.roster[seat].pos = dest;
        self.state.ap_remaining -= 1;
        debug!(competitor = %id, x = dest.x, y = dest.y, ap = self.state.ap_remaining, "move applied");
        self.emit(GameEventData::Moved { competitor_id: id, from, to: dest });

        if let Some(healed) = spawn_heal(&self.config.grid, &self.catalog, &self.state.roster, seat) {
            let before = self.state.roster[seat].hp;
            if healed > before {
                self.state.roster[seat].hp = healed;
                self.emit(GameEventData::Healed {
                    competitor_id: id,
                    amount: healed - before,
                    hp: healed,
                });
            }
        }
        Ok(())
    }

    /// Attack another competitor in a straight line. Costs one action point.
    pub fn apply_attack(&mut self, id: CompetitorId, target_id: CompetitorId) -> Result<(), EngineError> {
        let seat = self.seat(&id)?;
        let from = self.check_turn(seat, true)?;
        let reject = |reason| EngineError::rejected(reason, Some(from));

        let target_seat = self.state.seat_of(&target_id).ok_or_else(|| reject(RejectReason::InvalidTarget))?;
        let weapon = self.state.roster[seat]
            .weapon_id
            .as_deref()
            .and_then(|w| self.catalog.weapon(w))
            .ok_or_else(|| reject(RejectReason::NoWeapon))?;
        let damage = from_int(weapon.damage);
        validate_attack(from, self.state.roster[target_seat].pos, weapon.range).map_err(reject)?;

        let target = &mut self.state.roster[target_seat];
        target.hp = apply_damage(target.hp, damage);
        let target_hp = target.hp;
        self.state.ap_remaining -= 1;

        debug!(attacker = %id, target = %target_id, ap = self.state.ap_remaining, "attack applied");
        self.emit(GameEventData::Attacked { attacker_id: id, target_id, damage, target_hp });

        if target_hp == 0 {
            self.finish(MatchOutcome::Victory(id));
        }
        Ok(())
    }

    /// End the caller's turn: resolve traps, then rotate unless the match
    /// ended.
    pub fn end_turn(&mut self, id: CompetitorId) -> Result<(), EngineError> {
        let seat = self.seat(&id)?;
        self.check_turn(seat, false)?;

        let knocked_out = resolve_traps(&mut self.state);

        #[cfg(feature = "debug-tracing")]
        debug!(
            turn = self.state.turn,
            hash = %hex::encode(self.state.compute_hash()),
            "traps resolved"
        );

        if !knocked_out.is_empty() {
            let survivors: Vec<CompetitorId> = self
                .state
                .roster
                .iter()
                .filter(|c| c.is_alive())
                .map(|c| c.id)
                .collect();
            let outcome = match survivors.as_slice() {
                [winner] => MatchOutcome::Victory(*winner),
                _ => MatchOutcome::Draw,
            };
            self.finish(outcome);
            return Ok(());
        }

        let next = (seat + 1) % self.state.roster.len();
        let next_id = self.state.roster[next].id;
        self.state.turn += 1;
        self.state.turn_player_id = Some(next_id);
        self.state.ap_remaining = self.config.action_points;

        debug!(turn = self.state.turn, next = %next_id, "turn ended");
        self.emit(GameEventData::TurnEnded { next_player_id: next_id, turn: self.state.turn });
        Ok(())
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Drop a seat in the lobby. Once play has started the seat is kept and
    /// only marked disconnected; a finished match still names its winner.
    pub fn handle_disconnect(&mut self, id: CompetitorId) -> Result<(), EngineError> {
        let seat = self.seat(&id)?;

        if self.state.phase != MatchPhase::Waiting {
            self.state.roster[seat].connected = false;
            debug!(competitor = %id, phase = self.state.phase.as_str(), "competitor disconnected");
            self.emit(GameEventData::Disconnected { competitor_id: id });
        } else {
            self.state.roster.remove(seat);
            debug!(competitor = %id, "competitor left");
            self.emit(GameEventData::Left { competitor_id: id });
        }
        Ok(())
    }

    /// Dispatch a recorded intent.
    pub fn apply(&mut self, intent: &Intent) -> Result<(), EngineError> {
        match intent {
            Intent::Join { name } => self.join(name).map(|_| ()),
            Intent::Reconnect { competitor_id } => self.reconnect(*competitor_id),
            Intent::SelectLoadout { competitor_id, robot_id, weapon_id } => {
                self.select_loadout(*competitor_id, robot_id, weapon_id)
            }
            Intent::SetReady { competitor_id, ready } => self.set_ready(*competitor_id, *ready),
            Intent::Move { competitor_id, to } => self.apply_move(*competitor_id, *to),
            Intent::Attack { competitor_id, target_id } => self.apply_attack(*competitor_id, *target_id),
            Intent::EndTurn { competitor_id } => self.end_turn(*competitor_id),
            Intent::Disconnect { competitor_id } => self.handle_disconnect(*competitor_id),
        }
    }

    // =========================================================================
    // Outcome
    // =========================================================================

    fn finish(&mut self, outcome: MatchOutcome) {
        self.state.phase = MatchPhase::Finished;
        self.state.outcome = Some(outcome);
        self.state.winner_id = match outcome {
            MatchOutcome::Victory(id) => Some(id),
            MatchOutcome::Draw => None,
        };
        for competitor in &mut self.state.roster {
            competitor.ready = false;
        }

        info!(turn = self.state.turn, ?outcome, "match finished");
        self.emit(GameEventData::MatchEnded { outcome });
    }

    /// Run a lobby operation. On a finished match it runs against the
    /// rematch lobby, which is kept only if the operation succeeds.
    fn lobby_intent<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        if self.state.phase != MatchPhase::Finished {
            return op(self);
        }

        let finished = self.state.clone();
        self.reset_if_finished();
        let result = op(self);
        if result.is_err() {
            self.state = finished;
        }
        result
    }

    /// Replace a finished match with a fresh lobby holding the connected
    /// roster. Loadouts carry over with HP restored to max.
    fn reset_if_finished(&mut self) {
        if self.state.phase != MatchPhase::Finished {
            return;
        }

        let seed = derive_rematch_seed(self.state.rng_seed);
        let mut next = MatchState::new(seed);
        next.join_counter = self.state.join_counter;
        next.pending_events = self.state.take_events();

        for mut competitor in std::mem::take(&mut self.state.roster) {
            if !competitor.connected {
                next.push_event(GameEvent::new(0, GameEventData::Left { competitor_id: competitor.id }));
                continue;
            }
            competitor.ready = false;
            competitor.hp = competitor.hp_max;
            competitor.pos = GridPos::default();
            next.roster.push(competitor);
        }
        next.push_event(GameEvent::new(0, GameEventData::MatchReset { rng_seed: seed }));

        info!(seed, seats = next.roster.len(), "rematch lobby opened");
        self.state = next;
    }
}

/// Replay a recorded intent sequence on a fresh engine.
///
/// Rejected intents are part of a recording and are skipped. Returns the
/// final engine and every event emitted along the way.
pub fn replay(
    rng_seed: u64,
    config: MatchConfig,
    catalog: Arc<Catalog>,
    intents: &[Intent],
) -> (ArenaEngine, Vec<GameEvent>) {
    let mut engine = ArenaEngine::new(rng_seed, config, catalog);
    let mut all_events = Vec::new();

    for intent in intents {
        let _ = engine.apply(intent);
        all_events.extend(engine.take_events());
    }

    (engine, all_events)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::error::ErrorClass;
    use crate::game::trap::TrapPhase;

    fn test_catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_json(
                r#"{
                    "robots": [
                        { "id": "tank", "hpMax": 100 },
                        { "id": "scout", "hpMax": 80 }
                    ],
                    "weapons": [
                        { "id": "sword", "damage": 30, "range": 1 },
                        { "id": "rifle", "damage": 15, "range": 3 }
                    ]
                }"#,
            )
            .unwrap(),
        )
    }

    fn lobby(seed: u64) -> (ArenaEngine, CompetitorId, CompetitorId) {
        let mut engine = ArenaEngine::new(seed, MatchConfig::default(), test_catalog());
        let a = engine.join("alice").unwrap();
        let b = engine.join("bob").unwrap();
        engine.select_loadout(a, "tank", "rifle").unwrap();
        engine.select_loadout(b, "scout", "sword").unwrap();
        (engine, a, b)
    }

    fn playing(seed: u64) -> (ArenaEngine, CompetitorId, CompetitorId) {
        let (mut engine, a, b) = lobby(seed);
        engine.set_ready(a, true).unwrap();
        engine.set_ready(b, true).unwrap();
        engine.take_events();
        (engine, a, b)
    }

    fn place(engine: &mut ArenaEngine, id: CompetitorId, pos: GridPos) {
        engine.state.competitor_mut(&id).unwrap().pos = pos;
    }

    fn rejection(err: EngineError) -> RejectReason {
        match err {
            EngineError::Rejected(r) => r.reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_join_validation() {
        let mut engine = ArenaEngine::new(1, MatchConfig::default(), test_catalog());

        assert_eq!(engine.join("   "), Err(EngineError::InvalidName));
        assert_eq!(engine.join(&"x".repeat(21)), Err(EngineError::InvalidName));
        assert!(engine.join(&"x".repeat(20)).is_ok());
        assert_eq!(engine.join(" xxxxxxxxxxxxxxxxxxxx "), Err(EngineError::NameTaken));
        assert!(engine.join("bob").is_ok());
        assert_eq!(engine.join("carol"), Err(EngineError::RosterFull));

        let new = &engine.state().roster[1];
        assert_eq!(new.hp, 0);
        assert!(new.robot_id.is_none());
        assert!(!new.ready);
    }

    #[test]
    fn test_loadout_and_ready() {
        let mut engine = ArenaEngine::new(1, MatchConfig::default(), test_catalog());
        let a = engine.join("alice").unwrap();

        assert_eq!(engine.set_ready(a, true), Err(EngineError::IncompleteLoadout));
        assert_eq!(engine.select_loadout(a, "tank", "laser"), Err(EngineError::UnknownArchetype));
        assert_eq!(engine.select_loadout(a, "mech", "rifle"), Err(EngineError::UnknownArchetype));

        engine.select_loadout(a, "scout", "rifle").unwrap();
        assert_eq!(engine.state().roster[0].hp, from_int(80));

        engine.set_ready(a, true).unwrap();
        // One ready competitor does not start the match
        assert_eq!(engine.state().phase, MatchPhase::Waiting);
        assert_eq!(engine.start_match(), Err(EngineError::NotEnoughCompetitors));
    }

    #[test]
    fn test_start_match() {
        let (engine, a, b) = playing(7);
        let state = engine.state();

        assert_eq!(state.phase, MatchPhase::Playing);
        assert_eq!(state.turn, 1);
        assert_eq!(state.turn_player_id, Some(a));
        assert_eq!(state.ap_remaining, DEFAULT_ACTION_POINTS);
        assert_eq!(state.competitor(&a).unwrap().pos, GridPos::new(1, 9));
        assert_eq!(state.competitor(&b).unwrap().pos, GridPos::new(15, 1));
        assert_eq!(state.traps.len(), 6);
        assert!(state.traps.iter().all(|t| t.phase == TrapPhase::Idle));
    }

    #[test]
    fn test_lobby_intents_rejected_while_playing() {
        let (mut engine, a, _) = playing(7);
        assert_eq!(engine.select_loadout(a, "scout", "sword"), Err(EngineError::MatchInProgress));
        assert_eq!(engine.set_ready(a, false), Err(EngineError::MatchInProgress));
        assert_eq!(engine.join("carol"), Err(EngineError::RosterFull));
    }

    #[test]
    fn test_move_consumes_ap() {
        let (mut engine, a, _) = playing(7);
        engine.apply_move(a, GridPos::new(2, 8)).unwrap();
        engine.apply_move(a, GridPos::new(3, 7)).unwrap();
        engine.apply_move(a, GridPos::new(4, 7)).unwrap();
        assert_eq!(engine.state().ap_remaining, 0);

        let err = engine.apply_move(a, GridPos::new(5, 7)).unwrap_err();
        assert_eq!(rejection(err), RejectReason::NoActionPoints);
        assert_eq!(engine.state().competitor(&a).unwrap().pos, GridPos::new(4, 7));
    }

    #[test]
    fn test_not_your_turn() {
        let (mut engine, _, b) = playing(7);
        let err = engine.apply_move(b, GridPos::new(14, 1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::rejected(RejectReason::NotYourTurn, Some(GridPos::new(15, 1)))
        );
        assert_eq!(engine.end_turn(b).unwrap_err().class(), ErrorClass::Rejection);
        assert_eq!(engine.state().ap_remaining, DEFAULT_ACTION_POINTS);
    }

    #[test]
    fn test_actions_before_start_rejected() {
        let (mut engine, a, _) = lobby(7);
        let err = engine.apply_move(a, GridPos::new(1, 1)).unwrap_err();
        assert_eq!(err, EngineError::rejected(RejectReason::NotPlaying, None));
    }

    #[test]
    fn test_unknown_competitor_is_stale() {
        let (mut engine, _, _) = playing(7);
        let ghost = CompetitorId::new([9; 16]);
        assert_eq!(engine.end_turn(ghost).unwrap_err().class(), ErrorClass::Stale);
        assert_eq!(engine.reconnect(ghost), Err(EngineError::UnknownCompetitor));
    }

    #[test]
    fn test_attack_kills_and_finishes() {
        let (mut engine, a, b) = playing(7);
        place(&mut engine, a, GridPos::new(5, 5));
        place(&mut engine, b, GridPos::new(5, 7));
        engine.state.competitor_mut(&b).unwrap().hp = from_int(10);

        engine.apply_attack(a, b).unwrap();

        let state = engine.state();
        assert_eq!(state.competitor(&b).unwrap().hp, 0);
        assert_eq!(state.phase, MatchPhase::Finished);
        assert_eq!(state.winner_id, Some(a));
        assert_eq!(state.outcome, Some(MatchOutcome::Victory(a)));
        assert!(state.roster.iter().all(|c| !c.ready));
    }

    #[test]
    fn test_attack_rejections_keep_ap() {
        let (mut engine, a, b) = playing(7);
        place(&mut engine, a, GridPos::new(5, 5));
        place(&mut engine, b, GridPos::new(6, 6));

        assert_eq!(rejection(engine.apply_attack(a, b).unwrap_err()), RejectReason::Diagonal);
        assert_eq!(rejection(engine.apply_attack(a, a).unwrap_err()), RejectReason::OutOfRange);
        let ghost = CompetitorId::new([9; 16]);
        assert_eq!(rejection(engine.apply_attack(a, ghost).unwrap_err()), RejectReason::InvalidTarget);
        assert_eq!(engine.state().ap_remaining, DEFAULT_ACTION_POINTS);
    }

    #[test]
    fn test_spawn_heal_on_move() {
        let (mut engine, a, _) = playing(7);
        engine.state.competitor_mut(&a).unwrap().hp = from_int(50);

        // (1,9) → (2,10) stays inside seat 0's zone, enemy far away
        engine.apply_move(a, GridPos::new(2, 10)).unwrap();
        assert_eq!(engine.state().competitor(&a).unwrap().hp, from_int(75));

        let healed = engine
            .take_events()
            .into_iter()
            .any(|e| matches!(e.data, GameEventData::Healed { .. }));
        assert!(healed);
    }

    #[test]
    fn test_end_turn_rotates() {
        let (mut engine, a, b) = playing(7);
        engine.apply_move(a, GridPos::new(2, 8)).unwrap();
        engine.end_turn(a).unwrap();

        let state = engine.state();
        assert_eq!(state.turn, 2);
        assert_eq!(state.turn_player_id, Some(b));
        assert_eq!(state.ap_remaining, DEFAULT_ACTION_POINTS);

        engine.end_turn(b).unwrap();
        assert_eq!(engine.state().turn_player_id, Some(a));
    }

    #[test]
    fn test_trap_knockout_ends_without_rotation() {
        let (mut engine, a, b) = playing(7);
        place(&mut engine, a, GridPos::new(7, 3));
        engine.state.competitor_mut(&a).unwrap().hp = from_int(20);
        let crusher = engine.state.traps.iter_mut().find(|t| t.def.id == "trap_crusher_1").unwrap();
        crusher.phase = TrapPhase::Active;
        crusher.remaining_active_turns = 2;

        engine.end_turn(a).unwrap();

        let state = engine.state();
        assert_eq!(state.phase, MatchPhase::Finished);
        assert_eq!(state.winner_id, Some(b));
        assert_eq!(state.turn, 1);
        assert_eq!(state.turn_player_id, Some(a));
    }

    #[test]
    fn test_double_knockout_is_draw() {
        let (mut engine, a, b) = playing(7);
        place(&mut engine, a, GridPos::new(10, 7));
        place(&mut engine, b, GridPos::new(11, 8));
        for id in [a, b] {
            engine.state.competitor_mut(&id).unwrap().hp = from_int(25);
        }
        let crusher = engine.state.traps.iter_mut().find(|t| t.def.id == "trap_crusher_2").unwrap();
        crusher.phase = TrapPhase::Active;
        crusher.remaining_active_turns = 1;

        engine.end_turn(a).unwrap();

        let state = engine.state();
        assert_eq!(state.phase, MatchPhase::Finished);
        assert_eq!(state.outcome, Some(MatchOutcome::Draw));
        assert_eq!(state.winner_id, None);
    }

    #[test]
    fn test_disconnect_semantics() {
        let (mut engine, a, b) = lobby(7);
        engine.handle_disconnect(b).unwrap();
        assert_eq!(engine.state().roster.len(), 1);

        let c = engine.join("carol").unwrap();
        engine.select_loadout(c, "tank", "sword").unwrap();
        engine.set_ready(a, true).unwrap();
        engine.set_ready(c, true).unwrap();
        assert!(engine.state().is_playing());

        engine.handle_disconnect(c).unwrap();
        assert_eq!(engine.state().roster.len(), 2);
        assert!(!engine.state().competitor(&c).unwrap().connected);

        engine.reconnect(c).unwrap();
        assert!(engine.state().competitor(&c).unwrap().connected);
    }

    #[test]
    fn test_rematch_after_finish() {
        let (mut engine, a, b) = playing(7);
        place(&mut engine, a, GridPos::new(5, 5));
        place(&mut engine, b, GridPos::new(5, 6));
        engine.state.competitor_mut(&b).unwrap().hp = from_int(1);
        engine.apply_attack(a, b).unwrap();
        let old_seed = engine.state().rng_seed;

        engine.set_ready(a, true).unwrap();

        let state = engine.state();
        assert_eq!(state.phase, MatchPhase::Waiting);
        assert_eq!(state.rng_seed, derive_rematch_seed(old_seed));
        assert_eq!(state.roster.len(), 2);
        assert_eq!(state.competitor(&b).unwrap().hp, from_int(80));
        assert!(state.competitor(&a).unwrap().ready);
        assert!(!state.competitor(&b).unwrap().ready);
        assert_eq!(state.winner_id, None);

        engine.set_ready(b, true).unwrap();
        assert!(engine.state().is_playing());
    }

    #[test]
    fn test_rematch_drops_disconnected() {
        let (mut engine, a, b) = playing(7);
        engine.handle_disconnect(b).unwrap();
        place(&mut engine, a, GridPos::new(5, 5));
        place(&mut engine, b, GridPos::new(5, 6));
        engine.state.competitor_mut(&b).unwrap().hp = from_int(1);
        engine.apply_attack(a, b).unwrap();
        engine.take_events();

        let c = engine.join("carol").unwrap();

        let ids: Vec<_> = engine.state().roster.iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![a, c]);
        let left = engine
            .take_events()
            .into_iter()
            .any(|e| e.data == GameEventData::Left { competitor_id: b });
        assert!(left);
    }

    #[test]
    fn test_far_off_board_targets_are_rejected() {
        let (mut engine, a, b) = playing(12);
        let from = engine.state().competitor(&a).unwrap().pos;

        for dest in [
            GridPos::new(i32::MIN, 0),
            GridPos::new(0, i32::MIN),
            GridPos::new(i32::MAX, i32::MAX),
            GridPos::new(i32::MIN, i32::MAX),
        ] {
            assert_eq!(rejection(engine.apply_move(a, dest).unwrap_err()), RejectReason::NotAdjacent);
        }
        assert_eq!(engine.state().ap_remaining, 3);
        assert_eq!(engine.state().competitor(&a).unwrap().pos, from);

        place(&mut engine, b, GridPos::new(i32::MIN, from.y));
        assert_eq!(rejection(engine.apply_attack(a, b).unwrap_err()), RejectReason::OutOfRange);
    }

    fn finished(seed: u64) -> (ArenaEngine, CompetitorId, CompetitorId) {
        let (mut engine, a, b) = playing(seed);
        place(&mut engine, a, GridPos::new(5, 5));
        place(&mut engine, b, GridPos::new(5, 6));
        engine.state.competitor_mut(&b).unwrap().hp = from_int(1);
        engine.apply_attack(a, b).unwrap();
        engine.take_events();
        (engine, a, b)
    }

    #[test]
    fn test_refused_lobby_intent_keeps_finished_match() {
        let (mut engine, a, b) = finished(9);
        let before = engine.state().compute_hash();
        let seed = engine.state().rng_seed;

        assert_eq!(engine.join(""), Err(EngineError::InvalidName));
        assert_eq!(engine.join("carol"), Err(EngineError::RosterFull));
        assert_eq!(engine.select_loadout(a, "tank", "bazooka"), Err(EngineError::UnknownArchetype));
        assert_eq!(
            engine.select_loadout(CompetitorId::new([9; 16]), "tank", "rifle"),
            Err(EngineError::UnknownCompetitor)
        );
        assert_eq!(engine.set_ready(CompetitorId::new([9; 16]), true), Err(EngineError::UnknownCompetitor));

        let state = engine.state();
        assert_eq!(state.phase, MatchPhase::Finished);
        assert_eq!(state.rng_seed, seed);
        assert_eq!(state.winner_id, Some(a));
        assert_eq!(state.compute_hash(), before);
        assert!(engine.take_events().is_empty());

        // A valid intent still opens the rematch lobby
        engine.set_ready(b, true).unwrap();
        assert_eq!(engine.state().phase, MatchPhase::Waiting);
        assert_eq!(engine.state().rng_seed, derive_rematch_seed(seed));
    }

    #[test]
    fn test_disconnect_after_finish_keeps_winner() {
        let (mut engine, a, b) = finished(10);

        engine.handle_disconnect(a).unwrap();

        let state = engine.state();
        assert_eq!(state.roster.len(), 2);
        assert_eq!(state.winner_id, Some(a));
        assert!(!state.competitor(&a).unwrap().connected);
        assert!(engine
            .take_events()
            .iter()
            .any(|e| e.data == GameEventData::Disconnected { competitor_id: a }));

        // The absent winner is dropped when the rematch lobby opens
        engine.set_ready(b, true).unwrap();
        let ids: Vec<_> = engine.state().roster.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn test_replay_reproduces_match() {
        let catalog = test_catalog();
        let a = CompetitorId::derive(4242, 0, "alice");
        let b = CompetitorId::derive(4242, 1, "bob");

        let mut intents = vec![
            Intent::Join { name: "alice".into() },
            Intent::Join { name: "bob".into() },
            Intent::SelectLoadout { competitor_id: a, robot_id: "tank".into(), weapon_id: "rifle".into() },
            Intent::SelectLoadout { competitor_id: b, robot_id: "scout".into(), weapon_id: "sword".into() },
            Intent::SetReady { competitor_id: a, ready: true },
            Intent::SetReady { competitor_id: b, ready: true },
        ];
        for _ in 0..40 {
            intents.push(Intent::EndTurn { competitor_id: a });
            intents.push(Intent::EndTurn { competitor_id: b });
        }

        let (first, events1) = replay(4242, MatchConfig::default(), catalog.clone(), &intents);
        let (second, events2) = replay(4242, MatchConfig::default(), catalog, &intents);

        assert_eq!(first.state().compute_hash(), second.state().compute_hash());
        assert_eq!(first.state().traps, second.state().traps);
        assert_eq!(events1, events2);
        assert!(events1.iter().any(|e| matches!(e.data, GameEventData::TrapArmed { .. })));
    }
}
