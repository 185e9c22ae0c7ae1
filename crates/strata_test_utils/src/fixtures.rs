//! Test fixtures and helpers.
//!
//! Pre-built units, content and module folders for consistent testing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fixed::types::I32F32;
use serde::Serialize;
use strata_core::battlefield::{PlayerId, UnitId};
use strata_core::combat::{CombatUnit, PhysicalDamageType, UnitFlags, UnitStats, UnitVariable};
use strata_core::content::{TerrainFlags, TerrainType, MODULE_MANIFEST};
use strata_core::data::DataSection;
use strata_core::database::Database;
use strata_core::error::Result;
use strata_core::math::{TilePos, Vec2i};
use strata_core::missile::{DamageFormula, MissileClass, MissileType};
use strata_core::registry::{DataType, Handle};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Land infantry with 100 hit points, 10 basic damage and 10 accuracy.
#[must_use]
pub fn soldier(id: u32, player: u8, tile: TilePos) -> CombatUnit {
    let mut unit = CombatUnit::new(UnitId(id), PlayerId(player), tile);
    unit.stats = UnitStats::new()
        .with(UnitVariable::HitPoints, 100)
        .with(UnitVariable::BasicDamage, 10)
        .with(UnitVariable::Accuracy, 10);
    unit
}

/// Ranged infantry with piercing damage and a four-tile reach.
#[must_use]
pub fn archer(id: u32, player: u8, tile: TilePos) -> CombatUnit {
    let mut unit = soldier(id, player, tile);
    unit.stats.set(UnitVariable::BasicDamage, 3);
    unit.stats.set(UnitVariable::PiercingDamage, 4);
    unit.damage_type = PhysicalDamageType::Pierce;
    unit.attack_range = 4;
    unit
}

/// Square building with the given side in tiles.
#[must_use]
pub fn building(id: u32, player: u8, tile: TilePos, side: i32) -> CombatUnit {
    let mut unit = CombatUnit::new(UnitId(id), PlayerId(player), tile);
    unit.tile_size = Vec2i::new(side, side);
    unit.num_directions = 1;
    unit.flags = UnitFlags::BUILDING;
    unit.stats = UnitStats::new().with(UnitVariable::HitPoints, 400);
    unit
}

/// Missile type template: a 32x32 sprite moving 16 pixels per action.
#[must_use]
pub fn missile_type(class: MissileClass) -> MissileType {
    MissileType {
        class,
        size: Vec2i::new(32, 32),
        speed: 16,
        ..MissileType::default()
    }
}

/// Register a fully built missile type.
pub fn add_missile_type(database: &mut Database, identifier: &str, missile_type: MissileType) -> Result<Handle<MissileType>> {
    let handle = database.missile_types.add(identifier, None)?;
    if let Some(entry) = database.missile_types.entry_mut(handle) {
        **entry = missile_type;
        entry.set_defined();
    }
    Ok(handle)
}

/// Content used by the combat scenarios.
///
/// | identifier    | class           | notes                                   |
/// |---------------|-----------------|-----------------------------------------|
/// | `arrow`       | point to point  | damage from the combat resolver         |
/// | `bolt`        | point to point  | constant 25 damage                      |
/// | `fireball`    | point to point  | 40 damage, range 2, spawns `explosion`  |
/// | `explosion`   | stay            | four frames, cosmetic                   |
/// | `spear`       | point to point  | 20 damage, pierces each unit once       |
/// | `boulder`     | bounce          | 30 damage, three bounces                |
/// | `caltrops`    | land mine       | 15 damage                               |
/// | `death_coil`  | death coil      | drains the target                       |
/// | `flame_shield`| flame shield    | burns neighbors of its target           |
/// | `small_fire`  | fire            | below 75% hit points                    |
/// | `big_fire`    | fire            | below 40% hit points                    |
///
/// Also registers the `stone_wall` overlay terrain (100 hit points, 2 armor).
pub fn combat_database() -> Result<Database> {
    let mut database = Database::new();

    let wall = database.terrain_types.add("stone_wall", None)?;
    if let Some(entry) = database.terrain_types.entry_mut(wall) {
        entry.overlay = true;
        entry.flags = TerrainFlags::WALL | TerrainFlags::UNPASSABLE;
        entry.wall_hit_points = 100;
        entry.wall_armor = 2;
        entry.set_defined();
    }

    add_missile_type(&mut database, "arrow", missile_type(MissileClass::PointToPoint))?;
    add_missile_type(
        &mut database,
        "bolt",
        MissileType {
            speed: 32,
            damage: Some(DamageFormula::Constant(25)),
            ..missile_type(MissileClass::PointToPoint)
        },
    )?;
    add_missile_type(
        &mut database,
        "fireball",
        MissileType {
            damage: Some(DamageFormula::Constant(40)),
            range: 2,
            splash_factor: 2,
            impact_sound: Some("explode".to_string()),
            impact_identifiers: vec!["explosion".to_string()],
            ..missile_type(MissileClass::PointToPoint)
        },
    )?;
    add_missile_type(
        &mut database,
        "explosion",
        MissileType {
            sprite_frames: 4,
            speed: 0,
            ..missile_type(MissileClass::Stay)
        },
    )?;
    add_missile_type(
        &mut database,
        "spear",
        MissileType {
            speed: 8,
            damage: Some(DamageFormula::Constant(20)),
            pierce: true,
            pierce_once: true,
            reduce_factor: 50,
            ..missile_type(MissileClass::PointToPoint)
        },
    )?;
    add_missile_type(
        &mut database,
        "boulder",
        MissileType {
            damage: Some(DamageFormula::Constant(30)),
            range: 1,
            num_bounces: 3,
            max_bounce_size: 1,
            ..missile_type(MissileClass::PointToPointBounce)
        },
    )?;
    add_missile_type(
        &mut database,
        "caltrops",
        MissileType {
            damage: Some(DamageFormula::Constant(15)),
            sprite_frames: 1,
            speed: 0,
            ..missile_type(MissileClass::LandMine)
        },
    )?;
    add_missile_type(&mut database, "death_coil", missile_type(MissileClass::DeathCoil))?;
    add_missile_type(
        &mut database,
        "flame_shield",
        MissileType {
            ttl: 600,
            speed: 0,
            ..missile_type(MissileClass::FlameShield)
        },
    )?;
    add_missile_type(
        &mut database,
        "small_fire",
        MissileType {
            burn_percent: 75,
            sprite_frames: 2,
            speed: 0,
            ..missile_type(MissileClass::Fire)
        },
    )?;
    add_missile_type(
        &mut database,
        "big_fire",
        MissileType {
            burn_percent: 40,
            sprite_frames: 2,
            speed: 0,
            ..missile_type(MissileClass::Fire)
        },
    )?;

    DataType::<MissileType>::initialize_all(&mut database)?;
    DataType::<TerrainType>::initialize_all(&mut database)?;
    Ok(database)
}

/// Write a module folder: a `module.ron` manifest plus one RON data file
/// per `(folder, sections)` pair.
pub fn write_module(
    root: &Path,
    identifier: &str,
    dependencies: &[&str],
    files: &[(&str, Vec<DataSection>)],
) -> io::Result<PathBuf> {
    let folder = root.join(identifier);
    fs::create_dir_all(&folder)?;

    let mut manifest = DataSection::new(identifier).with_property("name", identifier);
    if !dependencies.is_empty() {
        manifest = manifest.with_property("dependencies", dependencies.join(" "));
    }
    fs::write(folder.join(MODULE_MANIFEST), to_ron(&manifest)?)?;

    for (data_folder, sections) in files {
        let dir = folder.join(data_folder);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{identifier}.ron")), to_ron(sections)?)?;
    }
    Ok(folder)
}

fn to_ron<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

