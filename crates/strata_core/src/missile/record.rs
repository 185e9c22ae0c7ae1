//! Save and restore of live missiles.
//!
//! Records carry every mutable field of a [`Missile`]; the type is stored by
//! identifier so a save survives content reordering.

use serde::{Deserialize, Serialize};

use super::{Missile, MissileId, MissileManager, MissileType};
use crate::battlefield::UnitId;
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::math::PixelPos;
use crate::registry::{DataEntry, DataType};

/// Serializable state of one missile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissileRecord {
    /// Missile id.
    pub id: MissileId,
    /// Missile type identifier.
    pub missile_type: String,
    /// Start of the current leg.
    pub source: PixelPos,
    /// Current position.
    pub position: PixelPos,
    /// End of the current leg.
    pub destination: PixelPos,
    /// Sprite frame, negative when mirrored.
    pub sprite_frame: i32,
    /// Class-specific state.
    pub state: i32,
    /// Animation countdown.
    pub anim_wait: i32,
    /// Action countdown.
    pub wait: i32,
    /// Activation countdown.
    pub delay: i32,
    /// Firing unit.
    pub source_unit: Option<UnitId>,
    /// Target unit.
    pub target_unit: Option<UnitId>,
    /// Units already hit.
    pub pierced_units: Vec<UnitId>,
    /// Fixed damage.
    pub damage: i32,
    /// Remaining lifetime.
    pub ttl: i32,
    /// Hidden flag.
    pub hidden: bool,
    /// Stopped early.
    pub destroy_missile: bool,
    /// Progress along the leg.
    pub current_step: i32,
    /// Leg length.
    pub total_step: i32,
    /// Client-only missile.
    pub local: bool,
    /// Map layer.
    pub layer: usize,
    /// Skip the hit roll.
    pub always_hits: bool,
    /// Always critical.
    pub always_critical: bool,
}

impl MissileRecord {
    /// Capture a missile.
    pub fn from_missile(missile: &Missile, missile_types: &DataType<MissileType>) -> Result<Self> {
        let missile_type = missile_types
            .entry(missile.missile_type)
            .ok_or_else(|| GameError::NotFound {
                type_name: MissileType::TYPE_NAME,
                identifier: format!("#{}", missile.missile_type.index()),
            })?
            .identifier()
            .to_string();

        Ok(Self {
            id: missile.id,
            missile_type,
            source: missile.source,
            position: missile.position,
            destination: missile.destination,
            sprite_frame: missile.sprite_frame,
            state: missile.state,
            anim_wait: missile.anim_wait,
            wait: missile.wait,
            delay: missile.delay,
            source_unit: missile.source_unit,
            target_unit: missile.target_unit,
            pierced_units: missile.pierced_units.clone(),
            damage: missile.damage,
            ttl: missile.ttl,
            hidden: missile.hidden,
            destroy_missile: missile.destroy_missile,
            current_step: missile.current_step,
            total_step: missile.total_step,
            local: missile.local,
            layer: missile.layer,
            always_hits: missile.always_hits,
            always_critical: missile.always_critical,
        })
    }

    /// Rebuild the missile. Fails if the type no longer exists.
    pub fn into_missile(self, missile_types: &DataType<MissileType>) -> Result<Missile> {
        let missile_type = missile_types
            .resolve(&self.missile_type)?
            .ok_or_else(|| GameError::NotFound {
                type_name: MissileType::TYPE_NAME,
                identifier: self.missile_type.clone(),
            })?;

        Ok(Missile {
            id: self.id,
            missile_type,
            source: self.source,
            position: self.position,
            destination: self.destination,
            sprite_frame: self.sprite_frame,
            state: self.state,
            anim_wait: self.anim_wait,
            wait: self.wait,
            delay: self.delay,
            source_unit: self.source_unit,
            target_unit: self.target_unit,
            pierced_units: self.pierced_units,
            damage: self.damage,
            ttl: self.ttl,
            hidden: self.hidden,
            destroy_missile: self.destroy_missile,
            current_step: self.current_step,
            total_step: self.total_step,
            local: self.local,
            layer: self.layer,
            always_hits: self.always_hits,
            always_critical: self.always_critical,
        })
    }
}

/// Everything needed to restore a [`MissileManager`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MissileSnapshot {
    /// Next id the manager hands out.
    pub next_id: u64,
    /// Live missiles, global first.
    pub missiles: Vec<MissileRecord>,
}

impl MissileSnapshot {
    /// Capture every live missile.
    pub fn capture(manager: &MissileManager, database: &Database) -> Result<Self> {
        let missiles = manager
            .iter()
            .map(|m| MissileRecord::from_missile(m, &database.missile_types))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            next_id: manager.next_id(),
            missiles,
        })
    }

    /// Replace the manager's missiles with the snapshot's.
    pub fn restore(self, manager: &mut MissileManager, database: &Database) -> Result<()> {
        let missiles = self
            .missiles
            .into_iter()
            .map(|r| r.into_missile(&database.missile_types))
            .collect::<Result<Vec<_>>>()?;
        manager.restore(missiles, self.next_id);
        Ok(())
    }
}

/// Save every live missile as RON text.
pub fn save_missiles(manager: &MissileManager, database: &Database) -> Result<String> {
    let snapshot = MissileSnapshot::capture(manager, database)?;
    ron::ser::to_string_pretty(&snapshot, ron::ser::PrettyConfig::default())
        .map_err(|e| GameError::Serialization(format!("Failed to save missiles: {e}")))
}

/// Replace the manager's missiles with ones saved by [`save_missiles`].
pub fn load_missiles(manager: &mut MissileManager, database: &Database, text: &str) -> Result<()> {
    let snapshot: MissileSnapshot = ron::from_str(text).map_err(|e| GameError::DataParseError {
        path: "<missiles>".to_string(),
        message: e.to_string(),
    })?;
    let count = snapshot.missiles.len();
    snapshot.restore(manager, database)?;
    tracing::debug!("Restored {count} missile(s)");
    Ok(())
}
