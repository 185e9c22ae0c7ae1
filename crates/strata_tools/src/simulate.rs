//! Missile arena: fire one missile across an open field and trace it.
//!
//! The arena is a 24x9 land map with an archer of player 0 on the left and
//! a soldier of player 1 `distance` tiles to the right, both on row 4.
//! Content comes from the built-in combat fixtures or from a data
//! directory.

use std::fmt;
use std::path::PathBuf;

use strata_core::battlefield::UnitId;
use strata_core::config::CombatRules;
use strata_core::database::Database;
use strata_core::error::{GameError, Result};
use strata_core::math::{PixelPos, Vec2i};
use strata_test_utils::arena::{Arena, GridWorld};
use strata_test_utils::fixtures::{archer, combat_database, soldier};

const SHOOTER: UnitId = UnitId(1);
const TARGET: UnitId = UnitId(2);
const ROW: i32 = 4;

/// What to fire and where.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Missile type identifier.
    pub missile_type: String,
    /// Data directory to load content from; built-in fixtures when unset.
    pub data: Option<PathBuf>,
    /// Random seed.
    pub seed: u64,
    /// Tick limit.
    pub max_ticks: u64,
    /// Distance between shooter and target, in tiles.
    pub distance: i32,
    /// Replace random rolls with their expected values.
    pub no_randomness: bool,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            missile_type: "arrow".to_string(),
            data: None,
            seed: 0,
            max_ticks: 300,
            distance: 6,
            no_randomness: false,
        }
    }
}

/// State after one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickRecord {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Live missiles after the tick.
    pub missiles: usize,
    /// Position of the fired missile, if it is still alive.
    pub position: Option<PixelPos>,
    /// Damage dealt during the tick.
    pub damage: i32,
}

/// Full trace of one run.
#[derive(Debug, Clone)]
pub struct SimulationTrace {
    /// One record per tick run.
    pub ticks: Vec<TickRecord>,
    /// Target hit points at the end.
    pub target_hit_points: i32,
    /// Sounds played, in order.
    pub sounds: Vec<String>,
    /// Final simulation hash.
    pub state_hash: u64,
}

impl SimulationTrace {
    /// Damage dealt over the whole run.
    #[must_use]
    pub fn total_damage(&self) -> i32 {
        self.ticks.iter().map(|t| t.damage).sum()
    }
}

impl fmt::Display for SimulationTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.ticks {
            write!(f, "tick {:>4}  missiles {:>3}", record.tick, record.missiles)?;
            if let Some(position) = record.position {
                write!(f, "  at ({}, {})", position.x, position.y)?;
            }
            if record.damage != 0 {
                write!(f, "  damage {}", record.damage)?;
            }
            writeln!(f)?;
        }
        if !self.sounds.is_empty() {
            writeln!(f, "sounds: {}", self.sounds.join(", "))?;
        }
        writeln!(f, "total damage: {}", self.total_damage())?;
        writeln!(f, "target hit points: {}", self.target_hit_points)?;
        write!(f, "state hash: {:016x}", self.state_hash)
    }
}

fn load_database(options: &SimulateOptions) -> Result<Database> {
    let Some(root) = &options.data else {
        return combat_database();
    };
    let mut database = Database::new();
    database.discover_modules(root)?;
    let report = database.load(&[])?;
    for error in &report.errors {
        tracing::warn!("{error}");
    }
    Ok(database)
}

/// Fire the missile and tick until it and everything it spawned are gone.
///
/// # Errors
///
/// Returns an error if content fails to load or the missile type is unknown.
pub fn run_simulation(options: &SimulateOptions) -> Result<SimulationTrace> {
    if options.distance < 1 || options.distance > 22 {
        return Err(GameError::configuration(format!(
            "Distance must be between 1 and 22 tiles, got {}",
            options.distance
        )));
    }

    let database = load_database(options)?;
    let mut world = GridWorld::new(24, 9);
    world.add_unit(archer(SHOOTER.0, 0, Vec2i::new(1, ROW)));
    world.add_unit(soldier(TARGET.0, 1, Vec2i::new(1 + options.distance, ROW)));

    let rules = CombatRules {
        no_randomness: options.no_randomness,
        god_mode_player: None,
    };
    let mut arena = Arena::new(database, world, options.seed, rules);
    let missile = arena.fire(&options.missile_type, SHOOTER, TARGET)?;
    tracing::info!(
        "Fired {} at a target {} tile(s) away",
        options.missile_type,
        options.distance
    );

    let mut ticks = Vec::new();
    let mut logged = 0;
    while (ticks.len() as u64) < options.max_ticks && arena.simulation.missiles().missile_count() > 0 {
        arena.tick();
        let damage = arena.world.damage_log[logged..].iter().map(|e| e.damage).sum();
        logged = arena.world.damage_log.len();
        ticks.push(TickRecord {
            tick: arena.simulation.tick_count(),
            missiles: arena.simulation.missiles().missile_count(),
            position: arena.simulation.missiles().find(missile).map(|m| m.position),
            damage,
        });
    }

    if arena.simulation.missiles().missile_count() > 0 {
        tracing::warn!("Stopped after {} ticks with missiles still alive", options.max_ticks);
    }

    Ok(SimulationTrace {
        ticks,
        target_hit_points: arena.world.hit_points(TARGET),
        sounds: arena.media.sounds.iter().map(|(s, _)| s.clone()).collect(),
        state_hash: arena.state_hash(),
    })
}
