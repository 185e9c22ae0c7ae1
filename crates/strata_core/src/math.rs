//! Pixel/tile geometry and fixed-point math for deterministic simulation.
//!
//! Positions are integer pixels. Path sampling between two pixel positions
//! uses fixed-point arithmetic so every participant samples the same tiles.
//! Floating-point operations can produce different results on different CPUs.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for path sampling.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Integer 2D vector used for pixel positions, tile positions and sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2i {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
}

/// Position in map pixels.
pub type PixelPos = Vec2i;
/// Position in map tiles.
pub type TilePos = Vec2i;
/// Size in pixels (or tiles, for unit footprints).
pub type PixelSize = Vec2i;

/// Size of one map tile in pixels.
pub const PIXEL_TILE_SIZE: PixelSize = Vec2i::new(32, 32);

/// Heading pointing north. Headings run clockwise from 0 to 255.
pub const LOOKING_N: i32 = 0;
/// Heading pointing east.
pub const LOOKING_E: i32 = 64;
/// Heading pointing south.
pub const LOOKING_S: i32 = 128;
/// Heading pointing west.
pub const LOOKING_W: i32 = 192;

impl Vec2i {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Multiply both components by a scalar.
    #[must_use]
    pub const fn scale(self, factor: i32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Divide both components by a scalar (truncating toward zero).
    #[must_use]
    pub const fn div(self, divisor: i32) -> Self {
        Self::new(self.x / divisor, self.y / divisor)
    }

    /// Whether both components are zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl std::ops::Add for Vec2i {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2i {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Vec2i {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Fixed-point 2D vector used while sampling a missile path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vec2Fixed {
    /// X coordinate.
    pub x: Fixed,
    /// Y coordinate.
    pub y: Fixed,
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Convert an integer pixel position.
    #[must_use]
    pub fn from_pixel(pos: PixelPos) -> Self {
        Self::new(Fixed::from_num(pos.x), Fixed::from_num(pos.y))
    }

    /// Truncate toward zero into an integer pixel position.
    #[must_use]
    pub fn to_pixel(self) -> PixelPos {
        Vec2i::new(
            self.x.round_to_zero().to_num::<i32>(),
            self.y.round_to_zero().to_num::<i32>(),
        )
    }

    /// Step of `diff * precision / total` per component.
    #[must_use]
    pub fn step(diff: PixelPos, precision: i32, total: i32) -> Self {
        let total = Fixed::from_num(total);
        Self::new(
            Fixed::from_num(diff.x) * Fixed::from_num(precision) / total,
            Fixed::from_num(diff.y) * Fixed::from_num(precision) / total,
        )
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Integer square root using binary search.
#[must_use]
pub fn isqrt(value: i64) -> i64 {
    if value <= 0 {
        return 0;
    }

    let mut low: i64 = 0;
    let mut high: i64 = value.min(3_037_000_499) + 1;

    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if mid * mid <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Euclidean pixel distance, rounded down.
#[must_use]
pub fn distance(a: PixelPos, b: PixelPos) -> i32 {
    let dx = i64::from(a.x - b.x);
    let dy = i64::from(a.y - b.y);
    isqrt(dx * dx + dy * dy) as i32
}

/// Chebyshev distance between two tiles.
#[must_use]
pub fn tile_distance(a: TilePos, b: TilePos) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Convert a map pixel position into the tile containing it.
#[must_use]
pub const fn map_pixel_pos_to_tile_pos(pos: PixelPos) -> TilePos {
    Vec2i::new(
        pos.x.div_euclid(PIXEL_TILE_SIZE.x),
        pos.y.div_euclid(PIXEL_TILE_SIZE.y),
    )
}

/// Top-left pixel of a tile.
#[must_use]
pub const fn tile_pos_to_map_pixel_pos_top_left(pos: TilePos) -> PixelPos {
    Vec2i::new(pos.x * PIXEL_TILE_SIZE.x, pos.y * PIXEL_TILE_SIZE.y)
}

/// Center pixel of a tile.
#[must_use]
pub const fn tile_pos_to_map_pixel_pos_center(pos: TilePos) -> PixelPos {
    Vec2i::new(
        pos.x * PIXEL_TILE_SIZE.x + PIXEL_TILE_SIZE.x / 2,
        pos.y * PIXEL_TILE_SIZE.y + PIXEL_TILE_SIZE.y / 2,
    )
}

/// Convert a movement delta into a heading (0 = north, clockwise, 256 per turn).
///
/// Within each quadrant the angle is approximated linearly from the ratio of
/// the minor to the major axis, which keeps the result integer-only.
#[must_use]
pub fn direction_to_heading(delta: PixelPos) -> i32 {
    if delta.is_zero() {
        return LOOKING_N;
    }

    let ax = i64::from(delta.x.abs());
    let ay = i64::from(delta.y.abs());
    // Angle away from the vertical axis, 0..=64.
    let off_vertical = if ax <= ay {
        (32 * ax / ay) as i32
    } else {
        64 - (32 * ay / ax) as i32
    };

    match (delta.x >= 0, delta.y >= 0) {
        (true, false) => off_vertical,
        (true, true) => LOOKING_S - off_vertical,
        (false, true) => LOOKING_S + off_vertical,
        (false, false) => (256 - off_vertical) & 0xFF,
    }
}

/// Smallest number of 8-direction steps between two headings (0..=4).
#[must_use]
pub fn heading_steps_between(a: i32, b: i32) -> i32 {
    let diff = (a - b).rem_euclid(256);
    let diff = diff.min(256 - diff);
    (diff + 16) / 32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(24), 4);
        assert_eq!(isqrt(25), 5);
        assert_eq!(isqrt(i64::from(i32::MAX) * 4), 92_681);
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(Vec2i::new(0, 0), Vec2i::new(3, 4)), 5);
        assert_eq!(distance(Vec2i::new(10, 10), Vec2i::new(10, 10)), 0);
    }

    #[test]
    fn test_tile_conversion_handles_negative_pixels() {
        assert_eq!(map_pixel_pos_to_tile_pos(Vec2i::new(31, 32)), Vec2i::new(0, 1));
        assert_eq!(map_pixel_pos_to_tile_pos(Vec2i::new(-1, 0)), Vec2i::new(-1, 0));
        assert_eq!(tile_pos_to_map_pixel_pos_center(Vec2i::new(1, 2)), Vec2i::new(48, 80));
    }

    #[test]
    fn test_cardinal_headings() {
        assert_eq!(direction_to_heading(Vec2i::new(0, -5)), LOOKING_N);
        assert_eq!(direction_to_heading(Vec2i::new(5, 0)), LOOKING_E);
        assert_eq!(direction_to_heading(Vec2i::new(0, 5)), LOOKING_S);
        assert_eq!(direction_to_heading(Vec2i::new(-5, 0)), LOOKING_W);
        assert_eq!(direction_to_heading(Vec2i::new(-5, -5)), 224);
        assert_eq!(direction_to_heading(Vec2i::new(5, 5)), 96);
    }

    #[test]
    fn test_heading_steps() {
        assert_eq!(heading_steps_between(LOOKING_N, LOOKING_N), 0);
        assert_eq!(heading_steps_between(LOOKING_N, 32), 1);
        assert_eq!(heading_steps_between(LOOKING_N, LOOKING_E), 2);
        assert_eq!(heading_steps_between(LOOKING_N, LOOKING_S), 4);
        assert_eq!(heading_steps_between(224, 32), 2);
    }

    #[test]
    fn test_fixed_step_is_deterministic() {
        let a = Vec2Fixed::step(Vec2i::new(100, -37), 3, 7);
        let b = Vec2Fixed::step(Vec2i::new(100, -37), 3, 7);
        assert_eq!(a, b);
        let pos = Vec2Fixed::from_pixel(Vec2i::new(10, 10)) + a;
        assert_eq!(pos.to_pixel(), Vec2i::new(52, -5));
    }
}
