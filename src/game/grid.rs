//! Arena Grid Geometry
//!
//! Fixed-size rectangular coordinate space. Purely geometric: the grid
//! holds its dimensions and nothing else, occupancy is answered by the
//! caller's roster.
//!
//! ```text
//!   x →  0 1 2 ...                 ... w-1
//! y 0   ┌──────────────────────────────┐
//! ↓ 1   │                      [B  B]  │   seat 1 spawn zone (top right)
//!   2   │                      [B  B]  │
//!   .   │                              │
//!  h-3  │ [A  A]                       │   seat 0 spawn zone (bottom left)
//!  h-2  │ [A  A]                       │
//!  h-1  └──────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Default grid width (columns).
pub const DEFAULT_GRID_COLS: i32 = 18;

/// Default grid height (rows).
pub const DEFAULT_GRID_ROWS: i32 = 12;

/// Smallest grid on which both spawn corners fit without overlapping.
pub const MIN_GRID_SIDE: i32 = 6;

/// A cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl GridPos {
    /// Create a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Signed deltas `(other - self)`, widened so any pair of `i32`
    /// coordinates fits.
    #[inline]
    pub fn delta(self, other: GridPos) -> (i64, i64) {
        (
            i64::from(other.x) - i64::from(self.x),
            i64::from(other.y) - i64::from(self.y),
        )
    }
}

/// Axis-aligned inclusive rectangle of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRect {
    /// Top-left corner (inclusive)
    pub min: GridPos,
    /// Bottom-right corner (inclusive)
    pub max: GridPos,
}

impl CellRect {
    /// Whether `pos` lies in the rectangle.
    #[inline]
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

/// Arena dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    /// Number of columns
    pub width: i32,
    /// Number of rows
    pub height: i32,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS)
    }
}

impl Grid {
    /// Create a grid of the given size.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Check that the grid is large enough for both spawn corners.
    pub fn is_playable(&self) -> bool {
        self.width >= MIN_GRID_SIDE && self.height >= MIN_GRID_SIDE
    }

    /// Whether `pos` is on the board.
    #[inline]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Spawn cell for a roster seat: seat 0 bottom-left, seat 1 top-right.
    ///
    /// On the default 18×12 board these are (1, 9) and (15, 1).
    pub fn spawn_point(&self, seat: usize) -> GridPos {
        self.spawn_zone(seat).min
    }

    /// 2×2 spawn zone for a roster seat, one cell in from its corner.
    pub fn spawn_zone(&self, seat: usize) -> CellRect {
        if seat == 0 {
            CellRect {
                min: GridPos::new(1, self.height - 3),
                max: GridPos::new(2, self.height - 2),
            }
        } else {
            CellRect {
                min: GridPos::new(self.width - 3, 1),
                max: GridPos::new(self.width - 2, 2),
            }
        }
    }

    /// Whether `pos` lies in the spawn zone of `seat`.
    #[inline]
    pub fn in_spawn_zone(&self, pos: GridPos, seat: usize) -> bool {
        self.spawn_zone(seat).contains(pos)
    }
}

/// True iff both deltas are in {-1, 0, 1} and not both zero.
#[inline]
pub fn is_adjacent8(a: GridPos, b: GridPos) -> bool {
    let (dx, dy) = a.delta(b);
    dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0)
}

/// Manhattan (taxicab) distance, saturating at `u32::MAX`.
#[inline]
pub fn manhattan(a: GridPos, b: GridPos) -> u32 {
    let (dx, dy) = a.delta(b);
    u32::try_from(dx.unsigned_abs() + dy.unsigned_abs()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let grid = Grid::default();
        assert!(grid.in_bounds(GridPos::new(0, 0)));
        assert!(grid.in_bounds(GridPos::new(17, 11)));
        assert!(!grid.in_bounds(GridPos::new(18, 11)));
        assert!(!grid.in_bounds(GridPos::new(17, 12)));
        assert!(!grid.in_bounds(GridPos::new(-1, 0)));
    }

    #[test]
    fn test_adjacency() {
        let center = GridPos::new(5, 5);
        let mut count = 0;
        for dy in -2..=2 {
            for dx in -2..=2 {
                if is_adjacent8(center, GridPos::new(5 + dx, 5 + dy)) {
                    count += 1;
                }
            }
        }
        assert_eq!(count, 8);
        assert!(!is_adjacent8(center, center));
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(manhattan(GridPos::new(1, 1), GridPos::new(4, 5)), 7);
        assert_eq!(manhattan(GridPos::new(4, 5), GridPos::new(1, 1)), 7);
        assert_eq!(manhattan(GridPos::new(3, 3), GridPos::new(3, 3)), 0);
    }

    #[test]
    fn test_extreme_coordinates() {
        let low = GridPos::new(i32::MIN, i32::MIN);
        let high = GridPos::new(i32::MAX, i32::MAX);

        assert_eq!(low.delta(high), (u32::MAX as i64, u32::MAX as i64));
        assert!(!is_adjacent8(GridPos::new(5, 5), low));
        assert!(!is_adjacent8(high, low));
        assert!(is_adjacent8(high, GridPos::new(i32::MAX - 1, i32::MAX)));
        assert_eq!(manhattan(low, high), u32::MAX);
        assert_eq!(manhattan(GridPos::new(0, 0), GridPos::new(i32::MIN, 0)), 1 << 31);
    }

    #[test]
    fn test_default_spawns() {
        let grid = Grid::default();
        assert_eq!(grid.spawn_point(0), GridPos::new(1, 9));
        assert_eq!(grid.spawn_point(1), GridPos::new(15, 1));

        assert!(grid.in_spawn_zone(GridPos::new(2, 10), 0));
        assert!(!grid.in_spawn_zone(GridPos::new(3, 10), 0));
        assert!(grid.in_spawn_zone(GridPos::new(16, 2), 1));
        assert!(!grid.in_spawn_zone(GridPos::new(16, 3), 1));

        // Zones are keyed by seat
        assert!(!grid.in_spawn_zone(GridPos::new(1, 9), 1));
    }

    #[test]
    fn test_min_grid_spawns_in_bounds() {
        let grid = Grid::new(MIN_GRID_SIDE, MIN_GRID_SIDE);
        assert!(grid.is_playable());
        for seat in 0..2 {
            let zone = grid.spawn_zone(seat);
            assert!(grid.in_bounds(zone.min));
            assert!(grid.in_bounds(zone.max));
        }
        assert!(!Grid::new(5, 12).is_playable());
    }
}
