//! A small single-layer battlefield for driving the missile engine in tests.
//!
//! [`GridWorld`] owns units and overlay walls on a rectangular map and logs
//! every effect the engine applies. [`Arena`] bundles it with content, a
//! [`Simulation`] and a [`RecordingMedia`] so a test can fire and tick in a
//! couple of lines.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use strata_core::battlefield::{Battlefield, MediaSink, OverlayWall, PlayerId, SpriteDraw, UnitId};
use strata_core::combat::{CombatUnit, UnitVariable};
use strata_core::config::CombatRules;
use strata_core::content::TerrainFlags;
use strata_core::database::Database;
use strata_core::error::{GameError, Result};
use strata_core::math::{PixelPos, TilePos, Vec2i};
use strata_core::missile::{MissileId, MissileType};
use strata_core::registry::{DataEntry, Handle};
use strata_core::simulation::Simulation;

/// One call to [`Battlefield::apply_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Unit credited with the damage.
    pub attacker: Option<UnitId>,
    /// Unit damaged.
    pub target: UnitId,
    /// Amount dealt.
    pub damage: i32,
}

#[derive(Debug, Clone, Copy)]
struct WallState {
    wall: OverlayWall,
    hit_points: i32,
}

/// Rectangular map on layer 0 with units and overlay walls.
///
/// Players are enemies unless they are the same player or allied through
/// [`GridWorld::ally`]. A unit dies when its hit points drop to zero; dead
/// units stay in the list but no longer resolve.
#[derive(Debug, Clone)]
pub struct GridWorld {
    width: i32,
    height: i32,
    terrain: Vec<TerrainFlags>,
    walls: BTreeMap<(i32, i32), WallState>,
    units: Vec<CombatUnit>,
    alliances: BTreeSet<(PlayerId, PlayerId)>,
    /// Every damage application, in order.
    pub damage_log: Vec<DamageEvent>,
    /// Every heal, in order.
    pub heal_log: Vec<(UnitId, i32)>,
    /// Every overlay hit, in order.
    pub overlay_log: Vec<(TilePos, i32)>,
}

impl GridWorld {
    /// Open land map.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        let tiles = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            terrain: vec![TerrainFlags::LAND; tiles],
            walls: BTreeMap::new(),
            units: Vec::new(),
            alliances: BTreeSet::new(),
            damage_log: Vec::new(),
            heal_log: Vec::new(),
            overlay_log: Vec::new(),
        }
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        self.contains(tile).then(|| (tile.y * self.width + tile.x) as usize)
    }

    fn contains(&self, tile: TilePos) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    /// Replace the terrain flags of a tile.
    pub fn set_terrain(&mut self, tile: TilePos, flags: TerrainFlags) {
        if let Some(index) = self.index(tile) {
            self.terrain[index] = flags;
        }
    }

    /// Place an overlay wall with the given hit points.
    pub fn add_wall(&mut self, tile: TilePos, wall: OverlayWall, hit_points: i32) {
        self.walls.insert((tile.x, tile.y), WallState { wall, hit_points });
    }

    /// Remaining hit points of the wall on a tile.
    #[must_use]
    pub fn wall_hit_points(&self, tile: TilePos) -> Option<i32> {
        self.walls.get(&(tile.x, tile.y)).map(|w| w.hit_points)
    }

    /// Add a unit.
    pub fn add_unit(&mut self, unit: CombatUnit) -> UnitId {
        let id = unit.id;
        self.units.push(unit);
        id
    }

    /// Make two players allies (both ways).
    pub fn ally(&mut self, a: PlayerId, b: PlayerId) {
        self.alliances.insert((a, b));
        self.alliances.insert((b, a));
    }

    /// Same player or allied.
    #[must_use]
    pub fn is_allied(&self, player: PlayerId, other: PlayerId) -> bool {
        player == other || self.alliances.contains(&(player, other))
    }

    /// Unit record, dead or alive.
    #[must_use]
    pub fn unit_state(&self, id: UnitId) -> Option<&CombatUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Mutable unit record, dead or alive.
    pub fn unit_state_mut(&mut self, id: UnitId) -> Option<&mut CombatUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Current hit points (zero for unknown units).
    #[must_use]
    pub fn hit_points(&self, id: UnitId) -> i32 {
        self.unit_state(id)
            .map_or(0, |u| u.stats.value(UnitVariable::HitPoints))
    }

    /// Take a unit off the map without killing it through damage.
    pub fn remove_unit(&mut self, id: UnitId) {
        if let Some(unit) = self.unit_state_mut(id) {
            unit.alive_on_map = false;
        }
    }

    /// Total damage logged against a unit.
    #[must_use]
    pub fn damage_taken(&self, id: UnitId) -> i32 {
        self.damage_log
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.damage)
            .sum()
    }

    /// Hash of unit and wall state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for unit in &self.units {
            (unit.id, unit.alive_on_map, unit.stats.value(UnitVariable::HitPoints)).hash(&mut hasher);
        }
        for (tile, state) in &self.walls {
            (tile, state.hit_points).hash(&mut hasher);
        }
        self.damage_log.len().hash(&mut hasher);
        hasher.finish()
    }
}

impl Battlefield for GridWorld {
    fn units_in_tile_range(&self, min: TilePos, max: TilePos, layer: usize) -> Vec<CombatUnit> {
        if layer != 0 {
            return Vec::new();
        }
        self.units
            .iter()
            .filter(|u| u.alive_on_map)
            .filter(|u| {
                let last = u.tile_pos + u.tile_size - Vec2i::new(1, 1);
                u.tile_pos.x <= max.x && last.x >= min.x && u.tile_pos.y <= max.y && last.y >= min.y
            })
            .cloned()
            .collect()
    }

    fn unit(&self, id: UnitId) -> Option<CombatUnit> {
        self.unit_state(id).filter(|u| u.alive_on_map).cloned()
    }

    fn is_point_on_map(&self, tile: TilePos, layer: usize) -> bool {
        layer == 0 && self.contains(tile)
    }

    fn tile_flags(&self, tile: TilePos, layer: usize) -> TerrainFlags {
        if layer != 0 {
            return TerrainFlags::NONE;
        }
        self.index(tile).map_or(TerrainFlags::NONE, |i| self.terrain[i])
    }

    fn overlay_wall(&self, tile: TilePos, layer: usize) -> Option<OverlayWall> {
        if layer != 0 {
            return None;
        }
        self.walls.get(&(tile.x, tile.y)).map(|w| w.wall)
    }

    fn is_enemy(&self, player: PlayerId, other: PlayerId) -> bool {
        !self.is_allied(player, other)
    }

    fn apply_damage(&mut self, attacker: Option<UnitId>, target: UnitId, damage: i32) {
        let Some(unit) = self.units.iter_mut().find(|u| u.id == target && u.alive_on_map) else {
            return;
        };
        let hit_points = unit.stats.get_mut(UnitVariable::HitPoints);
        hit_points.value -= damage;
        if hit_points.value <= 0 {
            unit.alive_on_map = false;
            tracing::debug!(unit = target.0, "Unit destroyed");
        }
        self.damage_log.push(DamageEvent {
            attacker,
            target,
            damage,
        });
    }

    fn damage_overlay(&mut self, tile: TilePos, layer: usize, damage: i32) {
        if layer != 0 {
            return;
        }
        self.overlay_log.push((tile, damage));
        let key = (tile.x, tile.y);
        if let Some(state) = self.walls.get_mut(&key) {
            state.hit_points -= damage;
            if state.hit_points <= 0 {
                self.walls.remove(&key);
            }
        }
    }

    fn heal_unit(&mut self, unit: UnitId, amount: i32) {
        self.heal_log.push((unit, amount));
        if let Some(unit) = self.unit_state_mut(unit) {
            let hit_points = unit.stats.get_mut(UnitVariable::HitPoints);
            hit_points.value = (hit_points.value + amount).min(hit_points.max);
        }
    }
}

/// Media sink that remembers what it was asked to play and draw.
#[derive(Debug, Clone, Default)]
pub struct RecordingMedia {
    /// Sounds played, in order.
    pub sounds: Vec<(String, PixelPos)>,
    /// Sprite frames drawn, in order.
    pub sprites: Vec<SpriteDraw>,
}

impl RecordingMedia {
    /// How many times a sound was played.
    #[must_use]
    pub fn times_played(&self, sound: &str) -> usize {
        self.sounds.iter().filter(|(s, _)| s == sound).count()
    }
}

impl MediaSink for RecordingMedia {
    fn play_sound(&mut self, sound: &str, position: PixelPos) {
        self.sounds.push((sound.to_string(), position));
    }

    fn draw_sprite_frame(&mut self, sprite: &SpriteDraw) {
        self.sprites.push(sprite.clone());
    }
}

/// Content, map, media and simulation in one place.
#[derive(Debug)]
pub struct Arena {
    /// Loaded content.
    pub database: Database,
    /// Units and map.
    pub world: GridWorld,
    /// Recorded sounds and sprites.
    pub media: RecordingMedia,
    /// Synchronized state.
    pub simulation: Simulation,
}

impl Arena {
    /// Arena with a fresh simulation.
    #[must_use]
    pub fn new(database: Database, world: GridWorld, seed: u64, rules: CombatRules) -> Self {
        Self {
            database,
            world,
            media: RecordingMedia::default(),
            simulation: Simulation::new(seed, rules),
        }
    }

    /// Fire a missile of the named type from one unit at another.
    ///
    /// Fails when the shooter is gone, or when the target is gone and the
    /// type does not always fire.
    pub fn fire(&mut self, missile_type: &str, from: UnitId, at: UnitId) -> Result<MissileId> {
        let handle = self.missile_type(missile_type)?;
        if self.world.unit(from).is_none() {
            return Err(unit_not_found(from));
        }
        let last_seen = self
            .world
            .unit_state(at)
            .map(CombatUnit::center_pixel)
            .ok_or_else(|| unit_not_found(at))?;
        let missile = self
            .simulation
            .missiles_mut()
            .fire_at_unit(&self.database, &self.world, &mut self.media, handle, from, at, last_seen, 0)?
            .ok_or_else(|| unit_not_found(at))?;
        Ok(missile.id)
    }

    /// Fire a missile of the named type from a unit's center at a pixel.
    pub fn fire_at(&mut self, missile_type: &str, from: UnitId, destination: PixelPos) -> Result<MissileId> {
        let handle = self.missile_type(missile_type)?;
        let start = self
            .world
            .unit(from)
            .map(|u| u.center_pixel())
            .ok_or_else(|| unit_not_found(from))?;

        let missile = self.simulation.missiles_mut().make_missile(
            &self.database,
            &mut self.media,
            handle,
            start,
            destination,
            0,
        )?;
        missile.source_unit = Some(from);
        Ok(missile.id)
    }

    fn missile_type(&self, identifier: &str) -> Result<Handle<MissileType>> {
        self.database
            .missile_types
            .resolve(identifier)?
            .ok_or_else(|| GameError::NotFound {
                type_name: MissileType::TYPE_NAME,
                identifier: identifier.to_string(),
            })
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        self.simulation.tick(&self.database, &mut self.world, &mut self.media);
    }

    /// Advance until no missiles remain or `max_ticks` pass. Returns the
    /// number of ticks run.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while ticks < max_ticks && self.simulation.missiles().missile_count() > 0 {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Combined hash of simulation and world.
    ///
    /// # Panics
    ///
    /// Panics if a live missile refers to a missile type that no longer exists.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let simulation = self
            .simulation
            .state_hash(&self.database)
            .expect("live missiles reference loaded missile types");
        let mut hasher = DefaultHasher::new();
        (simulation, self.world.state_hash()).hash(&mut hasher);
        hasher.finish()
    }
}

fn unit_not_found(unit: UnitId) -> GameError {
    GameError::NotFound {
        type_name: "unit",
        identifier: unit.0.to_string(),
    }
}
