//! Trap Subsystem
//!
//! Each hazard cycles `idle → arming → active → idle` for the whole match.
//!
//! ## Resolution (once per end of turn)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Phase 1, every trap:                                       │
//! │    arming → active   (duration drawn from [min, max])       │
//! │    active → damage competitors on covered cells,            │
//! │             decrement, idle when ≤ 0                        │
//! │                                                             │
//! │  Phase 2, every trap:                                       │
//! │    idle   → arming   with chance weight × 0.3               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Phase 2 only starts after phase 1 has finished for all traps, so a trap
//! armed in this pass cannot activate or deal damage until the next one.
//! The generator is rebuilt from `(match seed, turn)` every pass.

use serde::{Deserialize, Serialize};

use crate::core::fixed::{fixed_mul, from_int, to_fixed, Fixed, ARMING_CHANCE_SCALE};
use crate::core::hash::StateHasher;
use crate::core::rng::DeterministicRng;
use crate::game::combat::apply_damage;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::grid::GridPos;
use crate::game::state::{CompetitorId, MatchState};

// =============================================================================
// DEFINITIONS
// =============================================================================

/// Hazard flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapKind {
    /// Flame jets
    Fire,
    /// Floor saw
    Saw,
    /// Swinging hammer
    Hammer,
    /// Ceiling crusher
    Crusher,
}

/// Static description of one hazard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapDefinition {
    /// Stable id
    pub id: String,
    /// Flavour
    pub kind: TrapKind,
    /// Damage per active resolution
    pub damage: i32,
    /// Arming weight in `(0, 1]`
    pub weight: Fixed,
    /// Minimum active duration (turns)
    pub min_active: u32,
    /// Maximum active duration (turns)
    pub max_active: u32,
    /// Covered cells
    pub cells: Vec<GridPos>,
}

impl TrapDefinition {
    /// Per-resolution probability of leaving idle.
    #[inline]
    pub fn arming_chance(&self) -> Fixed {
        fixed_mul(self.weight, ARMING_CHANCE_SCALE)
    }

    /// Does the trap cover `pos`.
    #[inline]
    pub fn covers(&self, pos: GridPos) -> bool {
        self.cells.contains(&pos)
    }
}

fn row(xs: std::ops::RangeInclusive<i32>, y: i32) -> Vec<GridPos> {
    xs.map(|x| GridPos::new(x, y)).collect()
}

fn rect(xs: std::ops::RangeInclusive<i32>, ys: std::ops::RangeInclusive<i32>) -> Vec<GridPos> {
    xs.flat_map(|x| ys.clone().map(move |y| GridPos::new(x, y)))
        .collect()
}

fn definition(
    id: &str,
    kind: TrapKind,
    damage: i32,
    weight: Fixed,
    active: (u32, u32),
    cells: Vec<GridPos>,
) -> TrapDefinition {
    TrapDefinition {
        id: id.to_string(),
        kind,
        damage,
        weight,
        min_active: active.0,
        max_active: active.1,
        cells,
    }
}

/// The six hazards of the standard 18×12 arena.
pub fn default_trap_definitions() -> Vec<TrapDefinition> {
    vec![
        definition("trap_fire_1", TrapKind::Fire, 12, to_fixed(1.0), (1, 3), row(10..=14, 1)),
        definition("trap_saw_1", TrapKind::Saw, 15, to_fixed(0.8), (2, 4), rect(1..=1, 4..=8)),
        definition("trap_saw_2", TrapKind::Saw, 15, to_fixed(0.8), (2, 4), row(5..=10, 10)),
        definition("trap_hammer_1", TrapKind::Hammer, 20, to_fixed(0.6), (1, 2), rect(13..=14, 5..=6)),
        definition("trap_crusher_1", TrapKind::Crusher, 25, to_fixed(0.5), (1, 2), rect(6..=8, 3..=4)),
        definition("trap_crusher_2", TrapKind::Crusher, 25, to_fixed(0.5), (1, 2), rect(10..=12, 7..=9)),
    ]
}

// =============================================================================
// RUNTIME
// =============================================================================

/// Trap lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TrapPhase {
    /// No effect
    #[default]
    Idle = 0,
    /// Becomes active on the next resolution
    Arming = 1,
    /// Damages occupants each resolution
    Active = 2,
}

impl TrapPhase {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            TrapPhase::Idle => "idle",
            TrapPhase::Arming => "arming",
            TrapPhase::Active => "active",
        }
    }
}

/// Runtime state of one hazard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapInstance {
    /// Static description
    pub def: TrapDefinition,
    /// Lifecycle phase
    pub phase: TrapPhase,
    /// 1 while arming, 0 otherwise
    pub arming_turns_remaining: u32,
    /// Active resolutions left
    pub remaining_active_turns: i32,
}

impl TrapInstance {
    /// Idle instance of a definition.
    pub fn new(def: TrapDefinition) -> Self {
        Self {
            def,
            phase: TrapPhase::Idle,
            arming_turns_remaining: 0,
            remaining_active_turns: 0,
        }
    }

    /// Instantiate every definition in `idle`.
    pub fn instantiate(defs: &[TrapDefinition]) -> Vec<Self> {
        defs.iter().cloned().map(Self::new).collect()
    }

    pub(crate) fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(&self.def.id);
        hasher.update_u8(self.phase as u8);
        hasher.update_u32(self.arming_turns_remaining);
        hasher.update_i32(self.remaining_active_turns);
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Run one end-of-turn trap pass over `state`.
///
/// Returns the competitors knocked out by this pass, in roster order. The
/// caller decides the match outcome from it.
pub fn resolve_traps(state: &mut MatchState) -> Vec<CompetitorId> {
    let turn = state.turn;
    let mut rng = DeterministicRng::for_turn(state.rng_seed, turn);
    let MatchState { traps, roster, pending_events, .. } = state;
    let mut knocked_out = Vec::new();

    // Phase 1: resolve existing arming / active states
    for trap in traps.iter_mut() {
        match trap.phase {
            TrapPhase::Arming => {
                let duration = rng.next_int_range(trap.def.min_active, trap.def.max_active);
                trap.phase = TrapPhase::Active;
                trap.arming_turns_remaining = 0;
                trap.remaining_active_turns = i32::try_from(duration).unwrap_or(i32::MAX);
                pending_events.push(GameEvent::new(
                    turn,
                    GameEventData::TrapActivated { trap_id: trap.def.id.clone(), duration },
                ));
            }
            TrapPhase::Active => {
                let damage = from_int(trap.def.damage);
                for competitor in roster.iter_mut() {
                    if !competitor.is_alive() || !trap.def.covers(competitor.pos) {
                        continue;
                    }
                    competitor.hp = apply_damage(competitor.hp, damage);
                    pending_events.push(GameEvent::trap_hit(
                        turn,
                        &trap.def.id,
                        competitor.id,
                        damage,
                        competitor.hp,
                    ));
                    if !competitor.is_alive() {
                        knocked_out.push(competitor.id);
                    }
                }

                trap.remaining_active_turns -= 1;
                if trap.remaining_active_turns <= 0 {
                    trap.phase = TrapPhase::Idle;
                    pending_events.push(GameEvent::new(
                        turn,
                        GameEventData::TrapIdle { trap_id: trap.def.id.clone() },
                    ));
                }
            }
            TrapPhase::Idle => {}
        }
    }

    // Phase 2: roll idle traps
    for trap in traps.iter_mut() {
        if trap.phase == TrapPhase::Idle && rng.next_bool(trap.def.arming_chance()) {
            trap.phase = TrapPhase::Arming;
            trap.arming_turns_remaining = 1;
            pending_events.push(GameEvent::new(
                turn,
                GameEventData::TrapArmed { trap_id: trap.def.id.clone() },
            ));
        }
    }

    knocked_out
}

// =============================================================================
// TESTS
// =============================================================================
