//! Missile type templates.

use std::str::FromStr;

use crate::combat::{UnitStats, UnitVariable};
use crate::content::{ImageConfig, TerrainFlags};
use crate::data::{parse_bool, parse_identifier_list, parse_int, parse_size, DataOperator, DataProperty, DataSection};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::math::PixelSize;
use crate::registry::{unknown_property, unknown_section, DataEntry, DataType, Handle};
use crate::rng::SyncRng;

/// Behavior class of a missile type. Each class has one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MissileClass {
    /// Does nothing and never expires on its own.
    #[default]
    None,
    /// Flies straight to the destination, hits, disappears.
    PointToPoint,
    /// Flies to the destination, finishes its animation, then hits.
    PointToPointWithHit,
    /// Flies to the destination, animating once per leg.
    PointToPointCycleOnce,
    /// Flies and bounces a number of times, hitting at each bounce.
    PointToPointBounce,
    /// Stays in place and animates.
    Stay,
    /// Plays its animation forward then backward once.
    CycleOnce,
    /// Burning building; picks its look from the building's hit points.
    Fire,
    /// Hits immediately.
    Hit,
    /// Flies in an arc.
    Parabolic,
    /// Waits until a unit steps on it.
    LandMine,
    /// Wanders randomly, hitting periodically.
    Whirlwind,
    /// Circles around its target unit.
    FlameShield,
    /// Drains life from the target and heals the caster.
    DeathCoil,
    /// Homes in on its target unit.
    Tracer,
    /// Sticks to its target unit.
    ClipToTarget,
    /// Flies and hits at every animation cycle.
    Continuous,
    /// Flies past the destination until it hits something.
    StraightFly,
}

impl MissileClass {
    /// Look up a class by its data-file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let class = match name {
            "none" => Self::None,
            "point_to_point" => Self::PointToPoint,
            "point_to_point_with_hit" => Self::PointToPointWithHit,
            "point_to_point_cycle_once" => Self::PointToPointCycleOnce,
            "point_to_point_bounce" => Self::PointToPointBounce,
            "stay" => Self::Stay,
            "cycle_once" => Self::CycleOnce,
            "fire" => Self::Fire,
            "hit" => Self::Hit,
            "parabolic" => Self::Parabolic,
            "land_mine" => Self::LandMine,
            "whirlwind" => Self::Whirlwind,
            "flame_shield" => Self::FlameShield,
            "death_coil" => Self::DeathCoil,
            "tracer" => Self::Tracer,
            "clip_to_target" => Self::ClipToTarget,
            "continuous" => Self::Continuous,
            "straight_fly" => Self::StraightFly,
            _ => return None,
        };
        Some(class)
    }
}

/// Damage a missile deals regardless of the attacker's damage variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageFormula {
    /// Fixed amount.
    Constant(i32),
    /// Uniform draw in `min..=max` from the synchronized stream.
    Random {
        /// Lower bound.
        min: i32,
        /// Upper bound, inclusive.
        max: i32,
    },
    /// Percentage of one of the attacker's variables.
    AttackerVariable {
        /// Variable read from the attacker.
        variable: UnitVariable,
        /// Percentage applied to it.
        percent: i32,
    },
}

impl DamageFormula {
    /// Evaluate against the attacker's variables, if there is an attacker.
    pub fn evaluate(&self, attacker: Option<&UnitStats>, rng: &mut SyncRng) -> i32 {
        match *self {
            Self::Constant(value) => value,
            Self::Random { min, max } => {
                min.saturating_add(rng.next_below(max.saturating_sub(min).saturating_add(1)))
            }
            Self::AttackerVariable { variable, percent } => {
                attacker.map_or(0, |stats| stats.value(variable).saturating_mul(percent) / 100)
            }
        }
    }
}

impl FromStr for DamageFormula {
    type Err = GameError;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = || GameError::configuration(format!("Invalid damage formula: \"{text}\""));

        if let Some((min, max)) = text.split_once("..") {
            let min = min.trim().parse().map_err(|_| invalid())?;
            let max = max.trim().parse().map_err(|_| invalid())?;
            if max < min {
                return Err(invalid());
            }
            return Ok(Self::Random { min, max });
        }

        if let Some((name, percent)) = text.split_once(':') {
            let variable = UnitVariable::from_name(name.trim()).ok_or_else(invalid)?;
            let percent = percent.trim().parse().map_err(|_| invalid())?;
            return Ok(Self::AttackerVariable { variable, percent });
        }

        text.parse().map(Self::Constant).map_err(|_| invalid())
    }
}

/// Immutable template shared by every missile of one kind.
#[derive(Debug, Clone)]
pub struct MissileType {
    /// Behavior class.
    pub class: MissileClass,
    /// Sprite sheet.
    pub image: Option<ImageConfig>,
    /// Size of one frame, also the missile's pixel footprint.
    pub size: PixelSize,
    /// Frames in the sheet.
    pub sprite_frames: i32,
    /// Directions in the sheet; frames are grouped per direction.
    pub num_directions: i32,
    /// Draw order; lower draws first.
    pub draw_level: i32,
    /// Mirror west-facing frames from east-facing ones.
    pub flip: bool,
    /// Transparency percentage.
    pub transparency: i32,
    /// Sound played when fired.
    pub fired_sound: Option<String>,
    /// Sound played on impact.
    pub impact_sound: Option<String>,
    /// Number of bounces for bounce missiles.
    pub num_bounces: i32,
    /// Largest unit footprint (in tiles) a bounce missile can skip over.
    pub max_bounce_size: i32,
    /// Flatness of parabolic arcs; larger is flatter.
    pub parabol_coefficient: i32,
    /// Ticks before the missile appears.
    pub start_delay: i32,
    /// Ticks between two actions.
    pub sleep: i32,
    /// Pixels moved per action.
    pub speed: i32,
    /// Lifetime in ticks; negative means unlimited.
    pub ttl: i32,
    /// Damage formula, overriding the attacker's damage variables.
    pub damage: Option<DamageFormula>,
    /// Area of effect radius in tiles; 0 hits a single goal.
    pub range: i32,
    /// Divisor step per tile of distance from the impact.
    pub splash_factor: i32,
    /// Percent of damage kept per extra unit pierced.
    pub reduce_factor: i32,
    /// Pixels between two smoke puffs; 0 uses the speed.
    pub smoke_precision: i32,
    /// Terrain that stops the missile.
    pub stop_flags: TerrainFlags,
    /// The missile may hit the unit that fired it.
    pub can_hit_owner: bool,
    /// The missile also hits allied and neutral units.
    pub friendly_fire: bool,
    /// Fire even without a valid target.
    pub always_fire: bool,
    /// Hit every unit along the path.
    pub pierce: bool,
    /// Hit each unit at most once per flight.
    pub pierce_once: bool,
    /// Fly through overlay walls.
    pub ignore_walls: bool,
    /// Stop at the first unit along the path.
    pub kill_first_unit: bool,
    /// Keep full damage on the intended target inside the area.
    pub correct_splash_damage: bool,
    /// Skip the hit roll.
    pub always_hits: bool,
    /// Always score a critical strike.
    pub always_critical: bool,
    /// Trail left behind while moving.
    pub smoke_identifier: Option<String>,
    /// Resolved smoke type.
    pub smoke: Option<Handle<MissileType>>,
    /// Missiles spawned on impact.
    pub impact_identifiers: Vec<String>,
    /// Resolved impact types.
    pub impacts: Vec<Handle<MissileType>>,
    /// Fire missiles: used while the building's hit point percentage is
    /// below this value.
    pub burn_percent: i32,
}

impl Default for MissileType {
    fn default() -> Self {
        Self {
            class: MissileClass::None,
            image: None,
            size: PixelSize::ZERO,
            sprite_frames: 0,
            num_directions: 1,
            draw_level: 0,
            flip: true,
            transparency: 0,
            fired_sound: None,
            impact_sound: None,
            num_bounces: 0,
            max_bounce_size: 0,
            parabol_coefficient: 2048,
            start_delay: 0,
            sleep: 1,
            speed: 0,
            ttl: -1,
            damage: None,
            range: 0,
            splash_factor: 100,
            reduce_factor: 100,
            smoke_precision: 0,
            stop_flags: TerrainFlags::NONE,
            can_hit_owner: false,
            friendly_fire: false,
            always_fire: false,
            pierce: false,
            pierce_once: false,
            ignore_walls: true,
            kill_first_unit: false,
            correct_splash_damage: false,
            always_hits: false,
            always_critical: false,
            smoke_identifier: None,
            smoke: None,
            impact_identifiers: Vec::new(),
            impacts: Vec::new(),
            burn_percent: 0,
        }
    }
}

fn optional_identifier(value: &str) -> Option<String> {
    (!value.is_empty() && value != crate::registry::NONE_IDENTIFIER).then(|| value.to_string())
}

impl DataEntry for MissileType {
    const TYPE_NAME: &'static str = "missile_type";
    const DATABASE_FOLDER: &'static str = "missile_types";
    const DEPENDENCIES: &'static [&'static str] = &["terrain_type"];

    fn new(_identifier: &str) -> Self {
        Self::default()
    }

    fn process_property(&mut self, property: &DataProperty) -> Result<()> {
        let (key, value) = (property.key.as_str(), property.value.as_str());
        match key {
            "class" => {
                self.class = MissileClass::from_name(value).ok_or_else(|| {
                    GameError::configuration(format!("Invalid missile class: \"{value}\""))
                })?;
            }
            "size" => self.size = parse_size(key, value)?,
            "sprite_frames" => self.sprite_frames = parse_int(key, value)?,
            "num_directions" => self.num_directions = parse_int(key, value)?,
            "draw_level" => self.draw_level = parse_int(key, value)?,
            "flip" => self.flip = parse_bool(key, value)?,
            "transparency" => self.transparency = parse_int(key, value)?,
            "fired_sound" => self.fired_sound = optional_identifier(value),
            "impact_sound" => self.impact_sound = optional_identifier(value),
            "num_bounces" => self.num_bounces = parse_int(key, value)?,
            "max_bounce_size" => self.max_bounce_size = parse_int(key, value)?,
            "parabol_coefficient" => self.parabol_coefficient = parse_int(key, value)?,
            "start_delay" => self.start_delay = parse_int(key, value)?,
            "sleep" => self.sleep = parse_int(key, value)?,
            "speed" => self.speed = parse_int(key, value)?,
            "ttl" => self.ttl = parse_int(key, value)?,
            "damage" => self.damage = Some(value.parse()?),
            "range" => self.range = parse_int(key, value)?,
            "splash_factor" => self.splash_factor = parse_int(key, value)?,
            "reduce_factor" => self.reduce_factor = parse_int(key, value)?,
            "smoke_precision" => self.smoke_precision = parse_int(key, value)?,
            "stop_flags" => {
                let mut flags = TerrainFlags::NONE;
                for name in parse_identifier_list(value) {
                    flags |= TerrainFlags::from_name(&name).ok_or_else(|| {
                        GameError::configuration(format!("Invalid terrain flag: \"{name}\""))
                    })?;
                }
                self.stop_flags = flags;
            }
            "can_hit_owner" => self.can_hit_owner = parse_bool(key, value)?,
            "friendly_fire" => self.friendly_fire = parse_bool(key, value)?,
            "always_fire" => self.always_fire = parse_bool(key, value)?,
            "pierce" => self.pierce = parse_bool(key, value)?,
            "pierce_once" => self.pierce_once = parse_bool(key, value)?,
            "ignore_walls" => self.ignore_walls = parse_bool(key, value)?,
            "kill_first_unit" => self.kill_first_unit = parse_bool(key, value)?,
            "correct_splash_damage" => self.correct_splash_damage = parse_bool(key, value)?,
            "always_hits" => self.always_hits = parse_bool(key, value)?,
            "always_critical" => self.always_critical = parse_bool(key, value)?,
            "smoke" => self.smoke_identifier = optional_identifier(value),
            "impact" => match property.operator {
                DataOperator::Assignment => self.impact_identifiers = parse_identifier_list(value),
                DataOperator::Addition => self.impact_identifiers.extend(parse_identifier_list(value)),
                DataOperator::Subtraction => {
                    let removed = parse_identifier_list(value);
                    self.impact_identifiers.retain(|id| !removed.contains(id));
                }
            },
            "burn_percent" => self.burn_percent = parse_int(key, value)?,
            _ => return Err(unknown_property::<Self>(property)),
        }
        Ok(())
    }

    fn process_section(&mut self, section: &DataSection) -> Result<()> {
        match section.tag.as_str() {
            "image" => {
                let image = ImageConfig::from_section(section)?;
                if self.size.is_zero() {
                    self.size = image.size;
                }
                self.image = Some(image);
                Ok(())
            }
            _ => Err(unknown_section::<Self>(section)),
        }
    }

    fn initialize(&mut self, database: &Database) -> Result<()> {
        self.smoke = match &self.smoke_identifier {
            Some(identifier) => database.missile_types.resolve(identifier)?,
            None => None,
        };

        self.impacts.clear();
        for identifier in &self.impact_identifiers {
            if let Some(handle) = database.missile_types.resolve(identifier)? {
                self.impacts.push(handle);
            }
        }
        Ok(())
    }

    fn check(&self, _database: &Database) -> Result<()> {
        if self.sleep < 1 {
            return Err(GameError::Validation("Missile sleep must be at least 1.".to_string()));
        }
        if self.speed < 0 {
            return Err(GameError::Validation("Missile speed must not be negative.".to_string()));
        }
        if self.reduce_factor <= 0 {
            return Err(GameError::Validation("Missile reduce factor must be positive.".to_string()));
        }
        if !(1..=256).contains(&self.num_directions) {
            return Err(GameError::Validation(
                "Missile directions must be between 1 and 256.".to_string(),
            ));
        }
        Ok(())
    }

    fn store(database: &Database) -> &DataType<Self> {
        &database.missile_types
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.missile_types
    }
}

/// Fire missile matching a building's hit point percentage.
///
/// Picks the fire type with the smallest burn percentage still above
/// `hit_point_percent`. `None` means the building no longer burns.
#[must_use]
pub fn missile_burning_building(
    missile_types: &DataType<MissileType>,
    hit_point_percent: i32,
) -> Option<Handle<MissileType>> {
    missile_types
        .iter()
        .filter(|(_, t)| t.class == MissileClass::Fire && t.burn_percent > hit_point_percent)
        .min_by_key(|(_, t)| t.burn_percent)
        .map(|(handle, _)| handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_formula_parsing() {
        assert_eq!("12".parse::<DamageFormula>().unwrap(), DamageFormula::Constant(12));
        assert_eq!(
            "5..10".parse::<DamageFormula>().unwrap(),
            DamageFormula::Random { min: 5, max: 10 }
        );
        assert_eq!(
            "basic_damage:150".parse::<DamageFormula>().unwrap(),
            DamageFormula::AttackerVariable {
                variable: UnitVariable::BasicDamage,
                percent: 150
            }
        );
        assert!("10..5".parse::<DamageFormula>().is_err());
        assert!("mana:50".parse::<DamageFormula>().unwrap_err().is_configuration());
        assert!("lots".parse::<DamageFormula>().is_err());
    }

    #[test]
    fn test_damage_formula_evaluation() {
        let mut rng = SyncRng::new(8);
        for _ in 0..50 {
            let value = DamageFormula::Random { min: 5, max: 10 }.evaluate(None, &mut rng);
            assert!((5..=10).contains(&value));
        }

        let stats = UnitStats::new().with(UnitVariable::BasicDamage, 20);
        let formula = DamageFormula::AttackerVariable {
            variable: UnitVariable::BasicDamage,
            percent: 150,
        };
        assert_eq!(formula.evaluate(Some(&stats), &mut rng), 30);
        assert_eq!(formula.evaluate(None, &mut rng), 0);
    }

    #[test]
    fn test_damage_formula_saturates_at_extremes() {
        let mut rng = SyncRng::new(8);
        let wide = DamageFormula::Random {
            min: i32::MIN,
            max: i32::MAX,
        };
        wide.evaluate(None, &mut rng);
        assert_eq!(rng.draws(), 1);

        let stats = UnitStats::new().with(UnitVariable::BasicDamage, i32::MAX);
        let formula = DamageFormula::AttackerVariable {
            variable: UnitVariable::BasicDamage,
            percent: 1000,
        };
        assert_eq!(formula.evaluate(Some(&stats), &mut rng), i32::MAX / 100);
    }

    #[test]
    fn test_properties() {
        let mut missile = MissileType::new("arrow");
        for (key, value) in [
            ("class", "point_to_point"),
            ("speed", "16"),
            ("range", "1"),
            ("stop_flags", "wall rock"),
            ("pierce", "true"),
            ("impact", "explosion"),
        ] {
            missile.process_property(&DataProperty::new(key, value)).unwrap();
        }
        missile
            .process_property(&DataProperty::with_operator("impact", DataOperator::Addition, "smoke_puff"))
            .unwrap();

        assert_eq!(missile.class, MissileClass::PointToPoint);
        assert_eq!(missile.speed, 16);
        assert!(missile.stop_flags.contains(TerrainFlags::WALL));
        assert!(missile.stop_flags.contains(TerrainFlags::ROCK));
        assert_eq!(missile.impact_identifiers, vec!["explosion", "smoke_puff"]);

        assert!(missile
            .process_property(&DataProperty::new("class", "boomerang"))
            .unwrap_err()
            .is_configuration());
        assert!(missile
            .process_property(&DataProperty::new("colour", "red"))
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_image_section_sets_size() {
        let mut missile = MissileType::new("fireball");
        let section = DataSection::new("image")
            .with_property("file", "missiles/fireball.png")
            .with_property("size", "32 32");
        missile.process_section(&section).unwrap();
        assert_eq!(missile.size, PixelSize::new(32, 32));
    }

    #[test]
    fn test_initialize_and_check() {
        let mut database = Database::new();
        let arrow = database.missile_types.add("arrow", None).unwrap();
        database.missile_types.add("explosion", None).unwrap();
        database.missile_types.entry_mut(arrow).unwrap().impact_identifiers =
            vec!["explosion".to_string(), "none".to_string()];

        DataType::<MissileType>::initialize_all(&mut database).unwrap();
        assert_eq!(database.missile_types.entry(arrow).unwrap().impacts.len(), 1);
        assert!(DataType::<MissileType>::check_all(&database).is_empty());

        database.missile_types.entry_mut(arrow).unwrap().sleep = 0;
        assert_eq!(DataType::<MissileType>::check_all(&database).len(), 1);

        let arrow = database.missile_types.entry_mut(arrow).unwrap();
        arrow.sleep = 1;
        arrow.num_directions = 257;
        assert_eq!(DataType::<MissileType>::check_all(&database).len(), 1);
    }

    #[test]
    fn test_burning_building_selection() {
        let mut database = Database::new();
        for (identifier, burn_percent) in [("big_fire", 25), ("small_fire", 75)] {
            let handle = database.missile_types.add(identifier, None).unwrap();
            let entry = database.missile_types.entry_mut(handle).unwrap();
            entry.class = MissileClass::Fire;
            entry.burn_percent = burn_percent;
        }
        let store = &database.missile_types;
        assert_eq!(missile_burning_building(store, 10), store.find("big_fire"));
        assert_eq!(missile_burning_building(store, 50), store.find("small_fire"));
        assert_eq!(missile_burning_building(store, 90), None);
    }
}
