//! Live missile collections and the per-tick sweep.

use std::mem;

use super::{Missile, MissileClass, MissileId, MissileType};
use crate::battlefield::{Battlefield, MediaSink, UnitId};
use crate::config::CombatRules;
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::math::PixelPos;
use crate::registry::{DataEntry, Handle};
use crate::rng::SyncRng;

/// Everything a missile action may read or affect besides the missiles.
pub struct MissileContext<'a> {
    /// Loaded content.
    pub database: &'a Database,
    /// Units and map.
    pub battlefield: &'a mut dyn Battlefield,
    /// Sounds and sprites.
    pub media: &'a mut dyn MediaSink,
    /// Synchronized random stream.
    pub rng: &'a mut SyncRng,
    /// Combat switches.
    pub rules: &'a CombatRules,
}

/// Owner of every live missile.
///
/// Global missiles are part of the synchronized simulation; local ones are
/// cosmetic and may differ between participants. Missiles created while a
/// sweep is running wait in a pending buffer and join their collection once
/// the sweep is over, so they are first processed on the next tick.
#[derive(Debug, Default)]
pub struct MissileManager {
    global: Vec<Missile>,
    local: Vec<Missile>,
    pending: Vec<Missile>,
    next_id: u64,
    sweeping: bool,
}

impl MissileManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a synchronized missile flying from `start` to `destination`
    /// (sprite centers, in map pixels).
    pub fn make_missile(
        &mut self,
        database: &Database,
        media: &mut dyn MediaSink,
        missile_type: Handle<MissileType>,
        start: PixelPos,
        destination: PixelPos,
        layer: usize,
    ) -> Result<&mut Missile> {
        self.spawn(database, media, missile_type, start, destination, layer, false)
    }

    /// Create a cosmetic, client-only missile.
    pub fn make_local_missile(
        &mut self,
        database: &Database,
        media: &mut dyn MediaSink,
        missile_type: Handle<MissileType>,
        start: PixelPos,
        destination: PixelPos,
        layer: usize,
    ) -> Result<&mut Missile> {
        self.spawn(database, media, missile_type, start, destination, layer, true)
    }

    /// Fire a synchronized missile from one unit at another.
    ///
    /// A target that has left the map is only fired at by `always_fire`
    /// types; the missile then flies to `last_seen` with no target unit.
    /// Returns `None` when nothing was fired.
    #[allow(clippy::too_many_arguments)]
    pub fn fire_at_unit(
        &mut self,
        database: &Database,
        battlefield: &dyn Battlefield,
        media: &mut dyn MediaSink,
        missile_type: Handle<MissileType>,
        source: UnitId,
        target: UnitId,
        last_seen: PixelPos,
        layer: usize,
    ) -> Result<Option<&mut Missile>> {
        let Some(shooter) = battlefield.unit(source) else {
            return Ok(None);
        };
        let always_fire = database
            .missile_types
            .entry(missile_type)
            .is_some_and(|t| t.always_fire);
        let (destination, target_unit) = match battlefield.unit(target) {
            Some(goal) => (goal.center_pixel(), Some(target)),
            None if always_fire => (last_seen, None),
            None => {
                tracing::debug!(source = source.0, target = target.0, "Target gone, holding fire");
                return Ok(None);
            }
        };

        let missile = self.make_missile(database, media, missile_type, shooter.center_pixel(), destination, layer)?;
        missile.source_unit = Some(source);
        missile.target_unit = target_unit;
        Ok(Some(missile))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn spawn(
        &mut self,
        database: &Database,
        media: &mut dyn MediaSink,
        handle: Handle<MissileType>,
        start: PixelPos,
        destination: PixelPos,
        layer: usize,
        local: bool,
    ) -> Result<&mut Missile> {
        let entry = database
            .missile_types
            .entry(handle)
            .ok_or_else(|| GameError::NotFound {
                type_name: MissileType::TYPE_NAME,
                identifier: format!("#{}", handle.index()),
            })?;

        let id = MissileId(self.next_id);
        self.next_id += 1;

        let mut missile = Missile::new(id, handle, entry, start, destination, layer);
        missile.local = local;
        if let Some(sound) = &entry.fired_sound {
            media.play_sound(sound, start);
        }
        tracing::debug!(
            id = id.0,
            missile_type = entry.identifier(),
            local,
            "Missile created at ({}, {})",
            start.x,
            start.y
        );

        let queue = if self.sweeping {
            &mut self.pending
        } else if local {
            &mut self.local
        } else {
            &mut self.global
        };
        queue.push(missile);
        let index = queue.len() - 1;
        Ok(&mut queue[index])
    }

    /// Put an already-built missile back, e.g. when restoring a save.
    pub fn insert(&mut self, missile: Missile) {
        self.next_id = self.next_id.max(missile.id.0 + 1);
        if self.sweeping {
            self.pending.push(missile);
        } else if missile.local {
            self.local.push(missile);
        } else {
            self.global.push(missile);
        }
    }

    /// Advance every missile by one tick: global ones first, then local.
    pub fn tick(&mut self, ctx: &mut MissileContext<'_>) {
        self.sweeping = true;

        let global = mem::take(&mut self.global);
        self.global = self.sweep(global, ctx);
        let local = mem::take(&mut self.local);
        self.local = self.sweep(local, ctx);

        self.sweeping = false;
        for missile in mem::take(&mut self.pending) {
            self.insert(missile);
        }
    }

    fn sweep(&mut self, missiles: Vec<Missile>, ctx: &mut MissileContext<'_>) -> Vec<Missile> {
        let mut kept = Vec::with_capacity(missiles.len());
        for mut missile in missiles {
            if self.step(&mut missile, ctx) {
                kept.push(missile);
            } else {
                tracing::debug!(id = missile.id.0, "Missile removed");
            }
        }
        kept
    }

    /// One tick of one missile. Returns false once it should be removed.
    fn step(&mut self, missile: &mut Missile, ctx: &mut MissileContext<'_>) -> bool {
        if missile.delay > 0 {
            missile.delay -= 1;
            return true;
        }

        if missile.ttl > 0 {
            missile.ttl -= 1;
            if missile.ttl == 0 {
                return false;
            }
        }

        if missile.wait > 1 {
            missile.wait -= 1;
            return true;
        }

        let database = ctx.database;
        let Some(missile_type) = database.missile_types.entry(missile.missile_type) else {
            tracing::warn!(id = missile.id.0, "Missile type was removed, dropping missile");
            return false;
        };
        missile.wait = missile_type.sleep;
        super::actions::run_action(missile, missile_type, self, ctx);

        missile.ttl != 0
    }

    /// Draw every visible missile, lowest draw level first.
    pub fn draw(&self, database: &Database, media: &mut dyn MediaSink) {
        let mut visible: Vec<_> = self
            .iter()
            .filter(|m| !m.hidden && m.delay == 0)
            .filter_map(|m| database.missile_types.entry(m.missile_type).map(|t| (m, t)))
            .collect();
        visible.sort_by_key(|(_, t)| t.draw_level);

        for (missile, missile_type) in visible {
            media.draw_sprite_frame(&missile.sprite(missile_type.identifier(), missile_type));
        }
    }

    /// Live missiles: global first, then local.
    pub fn iter(&self) -> impl Iterator<Item = &Missile> {
        self.global.iter().chain(self.local.iter())
    }

    /// Synchronized missiles only.
    #[must_use]
    pub fn global(&self) -> &[Missile] {
        &self.global
    }

    /// Cosmetic missiles only.
    #[must_use]
    pub fn local(&self) -> &[Missile] {
        &self.local
    }

    /// Number of live missiles, not counting ones created mid-sweep.
    #[must_use]
    pub fn missile_count(&self) -> usize {
        self.global.len() + self.local.len()
    }

    /// Look up a live missile.
    #[must_use]
    pub fn find(&self, id: MissileId) -> Option<&Missile> {
        self.iter().find(|m| m.id == id)
    }

    /// Look up a live missile mutably.
    pub fn find_mut(&mut self, id: MissileId) -> Option<&mut Missile> {
        self.global
            .iter_mut()
            .chain(self.local.iter_mut())
            .find(|m| m.id == id)
    }

    /// Drop missiles that cannot outlive `unit`: fires burning on it and
    /// shields or effects clipped to it. Returns how many were removed.
    pub fn remove_for_unit(&mut self, database: &Database, unit: UnitId) -> usize {
        let tied_to_unit = |missile: &Missile| {
            let Some(missile_type) = database.missile_types.entry(missile.missile_type) else {
                return false;
            };
            match missile_type.class {
                MissileClass::Fire => missile.source_unit == Some(unit),
                MissileClass::FlameShield | MissileClass::ClipToTarget => {
                    missile.target_unit == Some(unit)
                }
                _ => false,
            }
        };

        let before = self.missile_count();
        self.global.retain(|m| !tied_to_unit(m));
        self.local.retain(|m| !tied_to_unit(m));
        let removed = before - self.missile_count();
        if removed > 0 {
            tracing::debug!(unit = unit.0, removed, "Removed missiles tied to unit");
        }
        removed
    }

    /// Drop every missile.
    pub fn clear(&mut self) {
        self.global.clear();
        self.local.clear();
        self.pending.clear();
    }

    /// Next id to hand out.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Replace all missiles, e.g. when restoring a save.
    pub fn restore(&mut self, missiles: Vec<Missile>, next_id: u64) {
        self.clear();
        self.next_id = next_id;
        for missile in missiles {
            self.insert(missile);
        }
    }
}
