//! Live missile state and its sprite bookkeeping.

use serde::{Deserialize, Serialize};

use super::MissileType;
use crate::battlefield::{SpriteDraw, UnitId};
use crate::math::{direction_to_heading, map_pixel_pos_to_tile_pos, PixelPos, TilePos, LOOKING_S};
use crate::registry::Handle;

/// Identifier of a live missile, unique within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissileId(pub u64);

/// One flying (or lingering) missile.
///
/// Unit references are ids: a unit destroyed mid-flight simply stops
/// resolving and the missile carries on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Missile {
    /// Id inside the owning manager.
    pub id: MissileId,
    /// Template.
    pub missile_type: Handle<MissileType>,
    /// Top-left pixel where the current leg started.
    pub source: PixelPos,
    /// Current top-left pixel.
    pub position: PixelPos,
    /// Top-left pixel where the current leg ends.
    pub destination: PixelPos,
    /// Sprite frame; negative values are mirrored (`-frame - 1`).
    pub sprite_frame: i32,
    /// Class-specific state counter.
    pub state: i32,
    /// Countdown between animation frames.
    pub anim_wait: i32,
    /// Countdown until the next action.
    pub wait: i32,
    /// Ticks left before the missile becomes active.
    pub delay: i32,
    /// Unit that fired the missile.
    pub source_unit: Option<UnitId>,
    /// Unit the missile is aimed at.
    pub target_unit: Option<UnitId>,
    /// Units already hit during this flight.
    pub pierced_units: Vec<UnitId>,
    /// Fixed damage, used when the type has no formula.
    pub damage: i32,
    /// Ticks left to live; negative means unlimited.
    pub ttl: i32,
    /// Not drawn.
    pub hidden: bool,
    /// Stopped early by an obstacle.
    pub destroy_missile: bool,
    /// Pixels travelled on the current leg.
    pub current_step: i32,
    /// Length of the current leg in pixels.
    pub total_step: i32,
    /// Client-only cosmetic missile.
    pub local: bool,
    /// Map layer.
    pub layer: usize,
    /// Skip the hit roll.
    pub always_hits: bool,
    /// Always score a critical strike.
    pub always_critical: bool,
}

impl Missile {
    /// Fresh missile flying between two pixel centers.
    ///
    /// Positions are stored as top-left corners of the sprite.
    #[must_use]
    pub fn new(
        id: MissileId,
        handle: Handle<MissileType>,
        missile_type: &MissileType,
        start: PixelPos,
        destination: PixelPos,
        layer: usize,
    ) -> Self {
        let half = missile_type.size.div(2);
        let position = start - half;
        Self {
            id,
            missile_type: handle,
            source: position,
            position,
            destination: destination - half,
            sprite_frame: 0,
            state: 0,
            anim_wait: 0,
            wait: missile_type.sleep,
            delay: missile_type.start_delay,
            source_unit: None,
            target_unit: None,
            pierced_units: Vec::new(),
            damage: 0,
            ttl: missile_type.ttl,
            hidden: false,
            destroy_missile: false,
            current_step: 0,
            total_step: 0,
            local: false,
            layer,
            always_hits: missile_type.always_hits,
            always_critical: missile_type.always_critical,
        }
    }

    /// Pixel at the center of the sprite.
    #[must_use]
    pub fn center(&self, missile_type: &MissileType) -> PixelPos {
        self.position + missile_type.size.div(2)
    }

    /// Tile under the center of the sprite.
    #[must_use]
    pub fn center_tile(&self, missile_type: &MissileType) -> TilePos {
        map_pixel_pos_to_tile_pos(self.center(missile_type))
    }

    /// Whether the unit was already hit this flight.
    #[must_use]
    pub fn has_pierced(&self, unit: UnitId) -> bool {
        self.pierced_units.contains(&unit)
    }

    /// Point the sprite along a movement delta.
    ///
    /// Only half the directions plus one are stored; west-facing frames are
    /// east-facing ones mirrored, encoded by a negative frame.
    pub fn new_heading_from_xy(&mut self, missile_type: &MissileType, delta: PixelPos) {
        let num_directions = missile_type.num_directions;
        if num_directions <= 1 || delta.is_zero() {
            return;
        }

        let row = num_directions / 2 + 1;
        let frame = unmirrored(self.sprite_frame) / row * row;
        let next_dir = 256 / num_directions;
        let dir = ((direction_to_heading(delta) + next_dir / 2) & 0xFF) / next_dir;

        self.sprite_frame = if dir <= LOOKING_S / next_dir {
            frame + dir
        } else {
            -(frame + 256 / next_dir - dir) - 1
        };
    }

    /// Advance the animation by one frame in direction `sign` (1 or -1).
    ///
    /// With `long_animation`, frames advance only as fast as the missile
    /// moves along its leg. Returns true when the animation wrapped.
    pub fn next_missile_frame(&mut self, missile_type: &MissileType, sign: i32, long_animation: bool) -> bool {
        let row = missile_type.num_directions / 2 + 1;
        let total_frames = missile_type.sprite_frames;
        if total_frames <= 0 {
            return true;
        }

        let mirrored = self.sprite_frame < 0;
        let mut frame = unmirrored(self.sprite_frame);

        if long_animation {
            let total = (self.destination - self.source).abs_components();
            let done = (self.position - self.source).abs_components();
            let total_f = total_frames / row;
            let done_f = frame / row;
            let behind = done.x * total_f <= done_f * total.x && done.y * total_f <= done_f * total.y;
            let ahead = done.x * total_f > done_f * total.x && done.y * total_f > done_f * total.y;
            if (sign == 1 && behind) || (sign == -1 && ahead) {
                return false;
            }
        }

        let mut finished = false;
        frame += sign * row;
        if sign > 0 {
            if frame >= total_frames {
                frame -= total_frames;
                finished = true;
            }
        } else if frame < 0 {
            frame += total_frames;
            finished = true;
        }

        self.sprite_frame = if mirrored { -frame - 1 } else { frame };
        finished
    }

    /// Pick the animation frame from progress along the leg: up to the
    /// middle of the animation at the halfway point, then back down.
    pub fn next_missile_frame_cycle(&mut self, missile_type: &MissileType) {
        let row = missile_type.num_directions / 2 + 1;
        let frames_per_direction = missile_type.sprite_frames / row;
        if frames_per_direction <= 0 {
            return;
        }

        let mirrored = self.sprite_frame < 0;
        let frame = unmirrored(self.sprite_frame);
        let total = (self.destination - self.source).abs_components();
        let done = (self.position - self.source).abs_components();
        let (total, done) = if total.x >= total.y { (total.x, done.x) } else { (total.y, done.y) };

        let span = 2 * frames_per_direction - 1;
        let mut step = 0;
        for i in 1..=span {
            if done * span / i < total {
                step = if (i - 1) * 2 < span { i - 1 } else { span - i };
                break;
            }
        }

        let frame = frame % row + step * row;
        self.sprite_frame = if mirrored { -frame - 1 } else { frame };
    }

    /// Sprite to draw for this missile.
    #[must_use]
    pub fn sprite(&self, identifier: &str, missile_type: &MissileType) -> SpriteDraw {
        let (frame, mirrored) = if missile_type.flip {
            (unmirrored(self.sprite_frame), self.sprite_frame < 0)
        } else {
            (full_direction_frame(self.sprite_frame, missile_type.num_directions), false)
        };
        SpriteDraw {
            missile_type: identifier.to_string(),
            frame,
            mirrored,
            position: self.position,
            layer: self.layer,
            transparency: missile_type.transparency,
        }
    }
}

const fn unmirrored(frame: i32) -> i32 {
    if frame < 0 {
        -frame - 1
    } else {
        frame
    }
}

/// Frame index in a sheet that stores every direction instead of mirroring.
fn full_direction_frame(frame: i32, num_directions: i32) -> i32 {
    let row = num_directions / 2 + 1;
    if frame < 0 {
        let frame = -frame - 1;
        frame / row * num_directions + num_directions - frame % row
    } else {
        frame / row * num_directions + frame % row
    }
}

trait AbsComponents {
    fn abs_components(self) -> Self;
}

impl AbsComponents for PixelPos {
    fn abs_components(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }
}
