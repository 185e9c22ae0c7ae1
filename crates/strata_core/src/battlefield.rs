//! Interfaces to the game state the missile engine acts on.
//!
//! The engine never owns units or the map. It queries them through
//! [`Battlefield`] and reports sounds and sprites through [`MediaSink`].

use serde::{Deserialize, Serialize};

use crate::combat::CombatUnit;
use crate::content::{TerrainFlags, TerrainType};
use crate::math::{PixelPos, TilePos};
use crate::registry::Handle;

/// Unit identifier issued by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

/// Player index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

/// An overlay wall occupying a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayWall {
    /// Wall terrain type.
    pub terrain: Handle<TerrainType>,
    /// Player owning the wall, if any.
    pub owner: Option<PlayerId>,
}

/// Unit and map queries plus the effects the engine may apply.
///
/// Unit lookups return snapshots. A destroyed unit simply stops resolving,
/// which is how missiles tolerate losing their source or target.
pub trait Battlefield {
    /// Units whose footprint overlaps the inclusive tile rectangle, in a
    /// stable order.
    fn units_in_tile_range(&self, min: TilePos, max: TilePos, layer: usize) -> Vec<CombatUnit>;

    /// Snapshot of a unit that is still on the map.
    fn unit(&self, id: UnitId) -> Option<CombatUnit>;

    /// Whether a tile lies on the map.
    fn is_point_on_map(&self, tile: TilePos, layer: usize) -> bool;

    /// Terrain flags of a tile.
    fn tile_flags(&self, tile: TilePos, layer: usize) -> TerrainFlags;

    /// Overlay wall on a tile, if any.
    fn overlay_wall(&self, tile: TilePos, layer: usize) -> Option<OverlayWall>;

    /// Whether `player` treats `other` as an enemy.
    fn is_enemy(&self, player: PlayerId, other: PlayerId) -> bool;

    /// Deal damage to a unit. The game handles death.
    fn apply_damage(&mut self, attacker: Option<UnitId>, target: UnitId, damage: i32);

    /// Deal damage to the overlay wall on a tile.
    fn damage_overlay(&mut self, tile: TilePos, layer: usize, damage: i32);

    /// Restore hit points, capped at the unit's maximum.
    fn heal_unit(&mut self, unit: UnitId, amount: i32);

    /// Units on a single tile.
    fn units_on_tile(&self, tile: TilePos, layer: usize) -> Vec<CombatUnit> {
        self.units_in_tile_range(tile, tile, layer)
    }
}

/// A sprite frame to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteDraw {
    /// Missile type identifier.
    pub missile_type: String,
    /// Frame index inside the sheet.
    pub frame: i32,
    /// Draw horizontally mirrored.
    pub mirrored: bool,
    /// Top-left pixel position on the map.
    pub position: PixelPos,
    /// Map layer.
    pub layer: usize,
    /// Transparency percentage.
    pub transparency: i32,
}

/// Audio and rendering sink.
pub trait MediaSink {
    /// Play a named sound at a map position.
    fn play_sound(&mut self, sound: &str, position: PixelPos);

    /// Draw one sprite frame.
    fn draw_sprite_frame(&mut self, sprite: &SpriteDraw);
}

/// Sink that discards everything, for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMedia;

impl MediaSink for NullMedia {
    fn play_sound(&mut self, _sound: &str, _position: PixelPos) {}

    fn draw_sprite_frame(&mut self, _sprite: &SpriteDraw) {}
}
