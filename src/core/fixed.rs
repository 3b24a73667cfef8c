//! Q16.16 Fixed-Point Arithmetic
//!
//! Hit points and trap weights are fractional (a spawn heal restores a
//! quarter of an archetype's max HP, a trap arms with `weight × 0.3`
//! probability). Both are kept in fixed-point so the simulation never
//! touches floats.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog values are bounded well inside this range (see
//! [`crate::game::catalog::MAX_CATALOG_VALUE`]).

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

// =============================================================================
// GAME CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// Fraction of max HP restored by a spawn heal: 0.25 = 16384
pub const SPAWN_HEAL_FRACTION: Fixed = FIXED_ONE >> 2;

/// Scale applied to a trap's weight to get its per-turn arming chance: 0.3
pub const ARMING_CHANCE_SCALE: Fixed = 19660;

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in turn resolution.
///
/// # Example
/// ```
/// use robot_arena::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert an integer to fixed-point (saturating at the Q16.16 range).
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i.saturating_mul(FIXED_ONE)
}

/// Convert fixed-point to float for display.
///
/// # Warning
/// Only use for client-facing output. NEVER feed the result back into the
/// simulation.
#[inline]
pub fn to_float(f: Fixed) -> f64 {
    f64::from(f) / f64::from(FIXED_ONE)
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = i64::from(a) * i64::from(b);
    (wide >> FIXED_SCALE) as Fixed
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    value.max(min).min(max)
}

// =============================================================================
// TESTS
// =============================================================================
