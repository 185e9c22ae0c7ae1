//! Simulation context.
//!
//! A [`Simulation`] owns the mutable state that must stay identical on every
//! participant: the tick counter, the live missiles and the synchronized
//! random stream. Content, units and the map are borrowed per tick, so
//! several simulations can run side by side (e.g. in tests).
//!
//! # Determinism
//!
//! - No floating-point math (path sampling uses [`crate::math::Fixed`])
//! - Randomness only from the simulation's [`SyncRng`]
//! - Missiles are processed in creation order, global before local
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use strata_core::config::CombatRules;
//! use strata_core::simulation::Simulation;
//!
//! let sim = Simulation::new(7, CombatRules::default());
//! assert_eq!(sim.tick_count(), 0);
//! assert_eq!(sim.missiles().missile_count(), 0);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::battlefield::{Battlefield, MediaSink};
use crate::config::{CombatRules, EngineConfig};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::missile::{MissileContext, MissileManager, MissileSnapshot};
use crate::rng::SyncRng;

/// Ticks per second of game time.
pub const TICK_RATE: u32 = 30;

/// Serialized form of a [`Simulation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SimulationState {
    tick: u64,
    rng: SyncRng,
    rules: CombatRules,
    missiles: MissileSnapshot,
}

/// Synchronized simulation state.
#[derive(Debug, Default)]
pub struct Simulation {
    tick: u64,
    missiles: MissileManager,
    rng: SyncRng,
    rules: CombatRules,
}

impl Simulation {
    /// Fresh simulation with a seeded random stream.
    #[must_use]
    pub fn new(seed: u64, rules: CombatRules) -> Self {
        Self {
            tick: 0,
            missiles: MissileManager::new(),
            rng: SyncRng::new(seed),
            rules,
        }
    }

    /// Fresh simulation using the configured seed and rules.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.seed, config.rules)
    }

    /// Number of completed ticks.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Live missiles.
    #[must_use]
    pub const fn missiles(&self) -> &MissileManager {
        &self.missiles
    }

    /// Live missiles, mutably (to fire new ones).
    pub fn missiles_mut(&mut self) -> &mut MissileManager {
        &mut self.missiles
    }

    /// Synchronized random stream.
    pub fn rng_mut(&mut self) -> &mut SyncRng {
        &mut self.rng
    }

    /// Combat rules in effect.
    #[must_use]
    pub const fn rules(&self) -> &CombatRules {
        &self.rules
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self, database: &Database, battlefield: &mut dyn Battlefield, media: &mut dyn MediaSink) {
        let mut ctx = MissileContext {
            database,
            battlefield,
            media,
            rng: &mut self.rng,
            rules: &self.rules,
        };
        self.missiles.tick(&mut ctx);
        self.tick += 1;

        tracing::debug!(
            tick = self.tick,
            global = self.missiles.global().len(),
            local = self.missiles.local().len(),
            "Tick complete"
        );
    }

    /// Calculate a hash of the synchronized state.
    ///
    /// Used for desync detection. Local missiles are cosmetic and excluded.
    pub fn state_hash(&self, database: &Database) -> Result<u64> {
        let mut snapshot = MissileSnapshot::capture(&self.missiles, database)?;
        snapshot.missiles.retain(|m| !m.local);

        let bytes = bincode::serialize(&(self.tick, &self.rng, &snapshot))
            .map_err(|e| GameError::Serialization(format!("Failed to hash simulation: {e}")))?;

        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(hasher.finish())
    }

    /// Serialize the simulation state.
    pub fn serialize(&self, database: &Database) -> Result<Vec<u8>> {
        let state = SimulationState {
            tick: self.tick,
            rng: self.rng.clone(),
            rules: self.rules,
            missiles: MissileSnapshot::capture(&self.missiles, database)?,
        };
        bincode::serialize(&state)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state written by [`Simulation::serialize`].
    pub fn deserialize(data: &[u8], database: &Database) -> Result<Self> {
        let state: SimulationState = bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize simulation: {e}")))?;

        let mut missiles = MissileManager::new();
        state.missiles.restore(&mut missiles, database)?;
        Ok(Self {
            tick: state.tick,
            missiles,
            rng: state.rng,
            rules: state.rules,
        })
    }
}
