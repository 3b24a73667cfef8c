//! Combat Rules
//!
//! Pure functions: move legality, attack legality, damage and spawn healing.
//! Nothing here mutates match state; the engine applies the results.

use crate::core::fixed::{fixed_clamp, fixed_mul, Fixed, SPAWN_HEAL_FRACTION};
use crate::game::catalog::Catalog;
use crate::game::error::RejectReason;
use crate::game::grid::{is_adjacent8, manhattan, Grid, GridPos};
use crate::game::state::Competitor;

/// Range assumed for a competitor with no weapon equipped.
pub const UNARMED_RANGE: u32 = 1;

/// Check a one-cell move from `from` to `dest`.
///
/// Legal iff `dest` is 8-adjacent, on the board and not occupied by anyone
/// in `roster`.
pub fn validate_move(
    grid: &Grid,
    roster: &[Competitor],
    from: GridPos,
    dest: GridPos,
) -> Result<(), RejectReason> {
    if !is_adjacent8(from, dest) {
        return Err(RejectReason::NotAdjacent);
    }
    if !grid.in_bounds(dest) {
        return Err(RejectReason::OutOfBounds);
    }
    if roster.iter().any(|c| c.pos == dest) {
        return Err(RejectReason::CellOccupied);
    }
    Ok(())
}

/// Check an attack from `attacker` on `target` with a weapon of `range`.
///
/// Target must share a row or column and sit at distance `1..=range`.
pub fn validate_attack(attacker: GridPos, target: GridPos, range: u32) -> Result<(), RejectReason> {
    let (dx, dy) = attacker.delta(target);
    if dx != 0 && dy != 0 {
        return Err(RejectReason::Diagonal);
    }
    let distance = manhattan(attacker, target);
    if distance == 0 || distance > range {
        return Err(RejectReason::OutOfRange);
    }
    Ok(())
}

/// Subtract damage, floored at 0.
#[inline]
pub fn apply_damage(hp: Fixed, damage: Fixed) -> Fixed {
    hp.saturating_sub(damage).max(0)
}

/// Range of a competitor's equipped weapon.
pub fn weapon_range(catalog: &Catalog, competitor: &Competitor) -> u32 {
    competitor
        .weapon_id
        .as_deref()
        .and_then(|id| catalog.weapon(id))
        .map_or(UNARMED_RANGE, |w| w.range)
}

/// Is any opponent of `seat` within that opponent's own weapon range.
///
/// Manhattan only: alignment does not matter here.
pub fn has_enemy_nearby(catalog: &Catalog, roster: &[Competitor], seat: usize) -> bool {
    let Some(me) = roster.get(seat) else {
        return false;
    };
    roster
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != seat)
        .any(|(_, enemy)| manhattan(enemy.pos, me.pos) <= weapon_range(catalog, enemy))
}

/// HP after a spawn heal, if one applies to `seat` at its current cell.
///
/// Applies when the competitor is alive, stands in its own spawn zone and
/// no opponent threatens it. Heals a quarter of max HP, clamped to max.
pub fn spawn_heal(grid: &Grid, catalog: &Catalog, roster: &[Competitor], seat: usize) -> Option<Fixed> {
    let me = roster.get(seat)?;
    if !me.is_alive() || !grid.in_spawn_zone(me.pos, seat) {
        return None;
    }
    if has_enemy_nearby(catalog, roster, seat) {
        return None;
    }
    let amount = fixed_mul(me.hp_max, SPAWN_HEAL_FRACTION);
    Some(fixed_clamp(me.hp.saturating_add(amount), 0, me.hp_max))
}

// =============================================================================
// TESTS
// =============================================================================
