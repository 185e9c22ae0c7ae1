//! # Strata Core
//!
//! Content registry and deterministic missile/combat simulation for the
//! Strata RTS engine.
//!
//! This crate contains **only** data and deterministic logic:
//! - No rendering
//! - No audio playback (sounds and sprites go out through [`battlefield::MediaSink`])
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`data`] - Data file parsing (sections and properties)
//! - [`registry`] - Typed identifier registry with aliases and two-phase loading
//! - [`content`] - Registered content types (modules, terrain, worlds, ...)
//! - [`database`] - The set of registries and the module load order
//! - [`missile`] - Missile types, live missiles and the missile engine
//! - [`combat`] - Hit and damage resolution
//! - [`rng`] - Synchronized random stream
//! - [`simulation`] - Per-tick simulation context
//! - [`math`] - Pixel/tile geometry and fixed-point helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battlefield;
pub mod combat;
pub mod config;
pub mod content;
pub mod data;
pub mod database;
pub mod error;
pub mod math;
pub mod missile;
pub mod registry;
pub mod rng;
pub mod simulation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battlefield::{Battlefield, MediaSink, NullMedia, OverlayWall, PlayerId, SpriteDraw, UnitId};
    pub use crate::combat::{
        calculate_damage, calculate_hit, AccuracyMode, CombatUnit, MissileModifiers, UnitDomain, UnitFlags,
        UnitStats, UnitVariable,
    };
    pub use crate::config::{CombatRules, EngineConfig};
    pub use crate::content::{Module, TerrainFlags, TerrainType};
    pub use crate::database::{Database, LoadReport};
    pub use crate::error::{GameError, Result};
    pub use crate::math::{Fixed, PixelPos, TilePos, Vec2i};
    pub use crate::missile::{Missile, MissileClass, MissileContext, MissileId, MissileManager, MissileType};
    pub use crate::registry::{DataEntry, DataType, Handle};
    pub use crate::rng::SyncRng;
    pub use crate::simulation::Simulation;
}
