//! Missiles: templates, live instances and the engine that moves them.
//!
//! A [`MissileType`] is loaded content. A [`Missile`] is one live projectile
//! (or lingering effect) owned by a [`MissileManager`], which advances every
//! missile once per tick through its class action. Actions move missiles
//! along their legs and resolve impacts through the combat resolver; all
//! unit and map access goes through [`MissileContext`].

mod actions;
mod collision;
mod instance;
mod manager;
mod missile_type;
mod record;

pub use instance::{Missile, MissileId};
pub use manager::{MissileContext, MissileManager};
pub use missile_type::{missile_burning_building, DamageFormula, MissileClass, MissileType};
pub use record::{load_missiles, save_missiles, MissileRecord, MissileSnapshot};
