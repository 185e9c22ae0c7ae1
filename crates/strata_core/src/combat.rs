//! Hit and damage resolution.
//!
//! Both entry points are pure apart from the synchronized random stream:
//! given the same snapshots, rules and stream position, every participant
//! computes the same outcome. All arithmetic is integer and the order of
//! operations is significant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battlefield::{PlayerId, UnitId};
use crate::config::CombatRules;
use crate::math::{heading_steps_between, isqrt, tile_pos_to_map_pixel_pos_top_left, PixelPos, TilePos, Vec2i, PIXEL_TILE_SIZE};
use crate::rng::SyncRng;

/// Named per-unit variables read by combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitVariable {
    /// Physical damage reduced by armor.
    BasicDamage,
    /// Damage that ignores armor.
    PiercingDamage,
    /// Fire damage.
    FireDamage,
    /// Cold damage.
    ColdDamage,
    /// Arcane damage.
    ArcaneDamage,
    /// Lightning damage.
    LightningDamage,
    /// Air damage.
    AirDamage,
    /// Earth damage.
    EarthDamage,
    /// Water damage.
    WaterDamage,
    /// Acid damage.
    AcidDamage,
    /// Flat reduction of basic damage.
    Armor,
    /// Percent reduction of fire damage.
    FireResistance,
    /// Percent reduction of cold damage.
    ColdResistance,
    /// Percent reduction of arcane damage.
    ArcaneResistance,
    /// Percent reduction of lightning damage.
    LightningResistance,
    /// Percent reduction of air damage.
    AirResistance,
    /// Percent reduction of earth damage.
    EarthResistance,
    /// Percent reduction of water damage.
    WaterResistance,
    /// Percent reduction of acid damage.
    AcidResistance,
    /// Percent reduction against hacking attackers.
    HackResistance,
    /// Percent reduction against piercing attackers.
    PierceResistance,
    /// Percent reduction against blunt attackers.
    BluntResistance,
    /// Hit chance weight.
    Accuracy,
    /// Dodge chance weight.
    Evasion,
    /// Percent chance of a critical strike.
    CriticalStrikeChance,
    /// Damage percent when striking from behind.
    Backstab,
    /// Damage percent against mounted units.
    BonusAgainstMounted,
    /// Damage percent against buildings.
    BonusAgainstBuildings,
    /// Damage percent against flying units.
    BonusAgainstAir,
    /// Damage percent against giants.
    BonusAgainstGiants,
    /// Damage percent against dragons.
    BonusAgainstDragons,
    /// Damage percent per consecutive movement step.
    ChargeBonus,
    /// Damage reflected onto melee attackers.
    ThornsDamage,
    /// Hit points.
    HitPoints,
    /// Buff: arcane damage bonus.
    Empowerment,
    /// Buff: +100% damage.
    Bloodlust,
    /// Buff: +50% damage.
    Inspire,
    /// Buff: +50% damage and +50% evasion.
    Blessing,
    /// Buff: +10% damage.
    Leadership,
    /// Debuff: -50% damage.
    Wither,
    /// Buff: +100% accuracy.
    Precision,
    /// Buff: +4 armor.
    Barkskin,
    /// Debuff: cannot evade.
    Stun,
}

impl UnitVariable {
    /// Look up a variable by its data-file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let variable = match name {
            "basic_damage" => Self::BasicDamage,
            "piercing_damage" => Self::PiercingDamage,
            "fire_damage" => Self::FireDamage,
            "cold_damage" => Self::ColdDamage,
            "arcane_damage" => Self::ArcaneDamage,
            "lightning_damage" => Self::LightningDamage,
            "air_damage" => Self::AirDamage,
            "earth_damage" => Self::EarthDamage,
            "water_damage" => Self::WaterDamage,
            "acid_damage" => Self::AcidDamage,
            "armor" => Self::Armor,
            "accuracy" => Self::Accuracy,
            "evasion" => Self::Evasion,
            "critical_strike_chance" => Self::CriticalStrikeChance,
            "thorns_damage" => Self::ThornsDamage,
            "hit_points" => Self::HitPoints,
            _ => return None,
        };
        Some(variable)
    }
}

/// One variable: current value, maximum and per-second regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableValue {
    /// Current value.
    pub value: i32,
    /// Maximum value.
    pub max: i32,
    /// Change per second.
    pub increase: i32,
}

/// A unit's variable table. Missing variables read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitStats {
    variables: BTreeMap<UnitVariable, VariableValue>,
}

impl UnitStats {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a variable's value (and maximum).
    #[must_use]
    pub fn with(mut self, variable: UnitVariable, value: i32) -> Self {
        self.set(variable, value);
        self
    }

    /// Set a variable's value; the maximum is raised to match if needed.
    pub fn set(&mut self, variable: UnitVariable, value: i32) {
        let entry = self.variables.entry(variable).or_default();
        entry.value = value;
        entry.max = entry.max.max(value);
    }

    /// Full variable record.
    #[must_use]
    pub fn get(&self, variable: UnitVariable) -> VariableValue {
        self.variables.get(&variable).copied().unwrap_or_default()
    }

    /// Current value.
    #[must_use]
    pub fn value(&self, variable: UnitVariable) -> i32 {
        self.get(variable).value
    }

    /// Whether a buff or status variable is active.
    #[must_use]
    pub fn is_active(&self, variable: UnitVariable) -> bool {
        self.value(variable) > 0
    }

    /// Mutable record, created on demand.
    pub fn get_mut(&mut self, variable: UnitVariable) -> &mut VariableValue {
        self.variables.entry(variable).or_default()
    }
}

/// Movement domain of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitDomain {
    /// Walks.
    #[default]
    Land,
    /// Swims or sails.
    Water,
    /// Flies.
    Air,
}

/// Physical damage kind of an attacker's weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PhysicalDamageType {
    /// No physical damage kind.
    #[default]
    None,
    /// Axes and swords.
    Hack,
    /// Spears and arrows.
    Pierce,
    /// Maces and rocks.
    Blunt,
}

/// Bit set of unit type flags relevant to combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitFlags(u16);

impl UnitFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Living creature.
    pub const ORGANIC: Self = Self(1 << 0);
    /// Building.
    pub const BUILDING: Self = Self(1 << 1);
    /// Wall segment.
    pub const WALL: Self = Self(1 << 2);
    /// Trap; always hits.
    pub const TRAP: Self = Self(1 << 3);
    /// Does not block missiles.
    pub const NON_SOLID: Self = Self(1 << 4);
    /// Mounted unit.
    pub const MOUNTED: Self = Self(1 << 5);
    /// Giant.
    pub const GIANT: Self = Self(1 << 6);
    /// Dragon.
    pub const DRAGON: Self = Self(1 << 7);

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for UnitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Snapshot of a unit as combat sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatUnit {
    /// Unit id.
    pub id: UnitId,
    /// Owning player.
    pub player: PlayerId,
    /// Top-left tile of the footprint.
    pub tile_pos: TilePos,
    /// Footprint in tiles.
    pub tile_size: Vec2i,
    /// Facing (0 = north, clockwise, 256 per turn).
    pub heading: i32,
    /// Number of sprite directions.
    pub num_directions: i32,
    /// Movement domain.
    pub domain: UnitDomain,
    /// Domains this unit's attacks can reach.
    pub can_target: Vec<UnitDomain>,
    /// Type flags.
    pub flags: UnitFlags,
    /// Alive and placed on the map.
    pub alive_on_map: bool,
    /// Physical damage kind.
    pub damage_type: PhysicalDamageType,
    /// Consecutive movement steps, for charge attacks.
    pub step_count: i32,
    /// Attack range in tiles.
    pub attack_range: i32,
    /// Variable table.
    pub stats: UnitStats,
}

impl CombatUnit {
    /// A 1x1 organic land unit with eight directions and melee range.
    #[must_use]
    pub fn new(id: UnitId, player: PlayerId, tile_pos: TilePos) -> Self {
        Self {
            id,
            player,
            tile_pos,
            tile_size: Vec2i::new(1, 1),
            heading: 0,
            num_directions: 8,
            domain: UnitDomain::Land,
            can_target: vec![UnitDomain::Land, UnitDomain::Water],
            flags: UnitFlags::ORGANIC,
            alive_on_map: true,
            damage_type: PhysicalDamageType::None,
            step_count: 0,
            attack_range: 1,
            stats: UnitStats::new(),
        }
    }

    /// Pixel at the center of the footprint.
    #[must_use]
    pub fn center_pixel(&self) -> PixelPos {
        tile_pos_to_map_pixel_pos_top_left(self.tile_pos)
            + Vec2i::new(
                self.tile_size.x * PIXEL_TILE_SIZE.x / 2,
                self.tile_size.y * PIXEL_TILE_SIZE.y / 2,
            )
    }

    /// Whether this unit's attacks can reach `other`.
    #[must_use]
    pub fn can_target(&self, other: &Self) -> bool {
        self.can_target.contains(&other.domain)
    }

    /// Tile distance from the footprint to a tile (0 when inside).
    #[must_use]
    pub fn map_distance_to(&self, tile: TilePos) -> i32 {
        let dx = gap(tile.x, self.tile_pos.x, self.tile_size.x);
        let dy = gap(tile.y, self.tile_pos.y, self.tile_size.y);
        isqrt(i64::from(dx * dx + dy * dy)) as i32
    }

    /// Tile distance between two footprints.
    #[must_use]
    pub fn map_distance_to_unit(&self, other: &Self) -> i32 {
        let dx = footprint_gap(self.tile_pos.x, self.tile_size.x, other.tile_pos.x, other.tile_size.x);
        let dy = footprint_gap(self.tile_pos.y, self.tile_size.y, other.tile_pos.y, other.tile_size.y);
        isqrt(i64::from(dx * dx + dy * dy)) as i32
    }

    /// Whether the unit occupies a tile.
    #[must_use]
    pub fn occupies(&self, tile: TilePos) -> bool {
        self.map_distance_to(tile) == 0
    }

    /// Hit points as a percentage of the maximum.
    #[must_use]
    pub fn hit_point_percent(&self) -> i32 {
        let hp = self.stats.get(UnitVariable::HitPoints);
        if hp.max <= 0 {
            return 100;
        }
        100 * hp.value / hp.max
    }
}

fn gap(value: i32, start: i32, size: i32) -> i32 {
    if value < start {
        start - value
    } else if value >= start + size {
        value - (start + size - 1)
    } else {
        0
    }
}

fn footprint_gap(a: i32, a_size: i32, b: i32, b_size: i32) -> i32 {
    if a + a_size <= b {
        b - (a + a_size - 1)
    } else if b + b_size <= a {
        a - (b + b_size - 1)
    } else {
        0
    }
}

/// How damage resolution treats accuracy and evasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccuracyMode {
    /// A separate hit roll already decided whether the attack lands.
    #[default]
    ResolvedByHitRoll,
    /// Fold accuracy and evasion into the damage number instead.
    ApplyAsDamage,
}

/// Missile properties that affect damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MissileModifiers {
    /// The missile always scores a critical strike.
    pub always_critical: bool,
    /// The missile pierces through units.
    pub pierce: bool,
    /// Units hit so far this flight, including the current one.
    pub pierced_count: usize,
    /// Percent of damage kept for each unit pierced after the first.
    pub reduce_factor: i32,
}

/// Extra evasion lost (or damage gained) by facing away from the attacker.
///
/// Indexed by the number of eight-direction steps between the headings:
/// attacking from straight behind gives the full bonus, head-on gives none.
#[must_use]
pub fn flanking_bonus(attacker: &CombatUnit, defender: &CombatUnit) -> i32 {
    const TABLE: [i32; 5] = [4, 3, 2, 1, 0];

    if !flanking_applies(attacker, defender) {
        return 0;
    }
    let steps = heading_steps_between(attacker.heading, defender.heading);
    TABLE[steps.clamp(0, 4) as usize]
}

fn flanking_applies(attacker: &CombatUnit, defender: &CombatUnit) -> bool {
    let eligible = |unit: &CombatUnit| {
        unit.flags.contains(UnitFlags::ORGANIC)
            && !unit.flags.contains(UnitFlags::BUILDING)
            && unit.num_directions == 8
    };
    eligible(attacker) && eligible(defender)
}

fn evasion_of(defender_stats: &UnitStats, evasion_modifier: i32) -> i32 {
    if defender_stats.is_active(UnitVariable::Stun) {
        return 0;
    }
    defender_stats.value(UnitVariable::Evasion) * evasion_modifier / 100
}

/// Decide whether an attack lands.
///
/// With randomness on, draws one sample below the attacker's accuracy and,
/// only if the defender can evade at all, one below the defender's evasion.
#[must_use]
pub fn calculate_hit(
    attacker: &CombatUnit,
    defender_stats: &UnitStats,
    defender: Option<&CombatUnit>,
    rules: &CombatRules,
    rng: &mut SyncRng,
) -> bool {
    if rules.no_randomness
        || attacker.flags.contains(UnitFlags::TRAP)
        || rules.god_mode_player == Some(attacker.player)
    {
        return true;
    }

    let defender_stats = defender.map_or(defender_stats, |d| &d.stats);

    let mut accuracy_modifier = 100;
    if attacker.stats.is_active(UnitVariable::Precision) {
        accuracy_modifier += 100;
    }
    let accuracy = attacker.stats.value(UnitVariable::Accuracy) * accuracy_modifier / 100;
    if accuracy == 0 {
        return false;
    }

    let mut evasion_modifier = 100;
    if defender_stats.is_active(UnitVariable::Blessing) {
        evasion_modifier += 50;
    }
    let mut evasion = evasion_of(defender_stats, evasion_modifier);
    if let Some(defender) = defender {
        evasion -= flanking_bonus(attacker, defender);
    }

    let accuracy_roll = rng.next_below(accuracy);
    let evasion_roll = if evasion > 0 { rng.next_below(evasion) } else { 0 };

    let hit = !(evasion_roll > 0 && evasion_roll >= accuracy_roll);
    tracing::trace!(accuracy, evasion, accuracy_roll, evasion_roll, hit, "Hit roll");
    hit
}

/// Final damage of one attack.
///
/// `defender_stats` is used when there is no live defender (e.g. a wall
/// tile); a live defender's own table takes precedence.
#[must_use]
pub fn calculate_damage(
    attacker: &CombatUnit,
    defender_stats: &UnitStats,
    defender: Option<&CombatUnit>,
    missile: Option<&MissileModifiers>,
    mode: AccuracyMode,
    rules: &CombatRules,
    rng: &mut SyncRng,
) -> i32 {
    use UnitVariable as V;

    let attack = |variable| attacker.stats.value(variable);
    let defender_stats = defender.map_or(defender_stats, |d| &d.stats);
    let defense = |variable| defender_stats.value(variable);

    // Step 1: damage components
    let mut basic_damage = attack(V::BasicDamage);
    let mut piercing_damage = attack(V::PiercingDamage);
    let mut fire_damage = attack(V::FireDamage);
    let mut cold_damage = attack(V::ColdDamage);
    let mut arcane_damage = attack(V::ArcaneDamage);
    let mut lightning_damage = attack(V::LightningDamage);
    let mut air_damage = attack(V::AirDamage);
    let mut earth_damage = attack(V::EarthDamage);
    let mut water_damage = attack(V::WaterDamage);
    let mut acid_damage = attack(V::AcidDamage);
    if attacker.stats.is_active(V::Empowerment) {
        arcane_damage += 4;
    }

    // Step 2: damage modifier; buffs do not stack
    let mut damage_modifier = 100;
    if attacker.stats.is_active(V::Bloodlust) {
        damage_modifier += 100;
    } else if attacker.stats.is_active(V::Inspire) || attacker.stats.is_active(V::Blessing) {
        damage_modifier += 50;
    } else if attacker.stats.is_active(V::Leadership) {
        damage_modifier += 10;
    } else if attacker.stats.is_active(V::Wither) {
        damage_modifier -= 50;
    }
    damage_modifier += attack(V::ChargeBonus) * attacker.step_count;

    // Step 3: accuracy and evasion modifiers
    let mut accuracy_modifier = 100;
    if attacker.stats.is_active(V::Precision) {
        accuracy_modifier += 100;
    }
    let mut evasion_modifier = 100;
    if defender_stats.is_active(V::Blessing) {
        evasion_modifier += 50;
    }

    // Step 4: armor
    let mut armor = defense(V::Armor);
    if defender_stats.is_active(V::Barkskin) {
        armor += 4;
    }

    // Step 5: critical strike
    let crit_chance = attack(V::CriticalStrikeChance);
    let always_critical = missile.is_some_and(|m| m.always_critical);
    if crit_chance > 0 || always_critical {
        if rules.no_randomness {
            damage_modifier += crit_chance;
        } else if rng.next_below(100) < crit_chance || always_critical {
            damage_modifier += 100;
        }
    }

    // Step 6: resistances, backstab, bonuses against categories
    let resist = |damage: i32, resistance| damage * (100 - defense(resistance)) / 100;
    fire_damage = resist(fire_damage, V::FireResistance);
    cold_damage = resist(cold_damage, V::ColdResistance);
    arcane_damage = resist(arcane_damage, V::ArcaneResistance);
    lightning_damage = resist(lightning_damage, V::LightningResistance);
    air_damage = resist(air_damage, V::AirResistance);
    earth_damage = resist(earth_damage, V::EarthResistance);
    water_damage = resist(water_damage, V::WaterResistance);
    acid_damage = resist(acid_damage, V::AcidResistance);

    if let Some(defender) = defender {
        let backstab = attack(V::Backstab);
        if backstab > 0 && attacker.attack_range <= 1 {
            match heading_steps_between(attacker.heading, defender.heading) {
                0 => damage_modifier += backstab,
                1 => damage_modifier += backstab / 2,
                _ => {}
            }
        }

        let categories = [
            (defender.flags.contains(UnitFlags::MOUNTED), V::BonusAgainstMounted),
            (defender.flags.contains(UnitFlags::BUILDING), V::BonusAgainstBuildings),
            (defender.domain == UnitDomain::Air, V::BonusAgainstAir),
            (defender.flags.contains(UnitFlags::GIANT), V::BonusAgainstGiants),
            (defender.flags.contains(UnitFlags::DRAGON), V::BonusAgainstDragons),
        ];
        for (matches, bonus) in categories {
            if matches {
                damage_modifier += attack(bonus);
            }
        }
    }

    // Step 7: apply the damage modifier
    piercing_damage += fire_damage
        + cold_damage
        + arcane_damage
        + lightning_damage
        + air_damage
        + earth_damage
        + water_damage
        + acid_damage;
    basic_damage = basic_damage * damage_modifier / 100;
    piercing_damage = piercing_damage * damage_modifier / 100;

    // Step 8: armor applies to basic damage only
    let mut damage = (basic_damage - armor).max(1) + piercing_damage;

    // Step 9: accuracy and evasion as damage
    if mode == AccuracyMode::ApplyAsDamage {
        let accuracy = attack(V::Accuracy) * accuracy_modifier / 100;
        let evasion = evasion_of(defender_stats, evasion_modifier);
        if evasion > 0 {
            damage += accuracy;
            damage -= evasion;
        }
        if let Some(defender) = defender {
            damage += flanking_bonus(attacker, defender);
        }
    }

    // Step 10: physical damage type resistance
    let physical_resistance = match attacker.damage_type {
        PhysicalDamageType::Hack => Some(V::HackResistance),
        PhysicalDamageType::Pierce => Some(V::PierceResistance),
        PhysicalDamageType::Blunt => Some(V::BluntResistance),
        PhysicalDamageType::None => None,
    };
    if let Some(resistance) = physical_resistance {
        damage = resist(damage, resistance);
    }

    // Step 11: random spread, or its average
    if rules.no_randomness {
        damage -= ((damage + 2) / 2) / 2;
    } else {
        damage -= rng.next_below((damage + 2) / 2);
    }

    // Step 12: never negative
    if damage < 0 {
        #[cfg(feature = "debug-validation")]
        panic!("damage underflow: {damage}");
        #[cfg(not(feature = "debug-validation"))]
        {
            tracing::error!(damage, "Damage underflow, clamping to zero");
            damage = 0;
        }
    }

    // Step 13: pierce reduction
    if let Some(missile) = missile {
        damage = apply_pierce_reduction(damage, missile);
    }

    damage
}

/// Compound the reduce factor once per unit pierced after the first.
#[must_use]
pub fn apply_pierce_reduction(damage: i32, missile: &MissileModifiers) -> i32 {
    if !missile.pierce {
        return damage;
    }
    (1..missile.pierced_count).fold(damage, |damage, _| damage * missile.reduce_factor / 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attacker(basic: i32) -> CombatUnit {
        let mut unit = CombatUnit::new(UnitId(1), PlayerId(0), Vec2i::new(0, 0));
        unit.stats = UnitStats::new()
            .with(UnitVariable::BasicDamage, basic)
            .with(UnitVariable::Accuracy, 10);
        unit
    }

    fn defender(armor: i32) -> CombatUnit {
        let mut unit = CombatUnit::new(UnitId(2), PlayerId(1), Vec2i::new(1, 0));
        unit.stats = UnitStats::new().with(UnitVariable::Armor, armor);
        unit
    }

    fn no_random() -> CombatRules {
        CombatRules {
            no_randomness: true,
            god_mode_player: None,
        }
    }

    fn damage(attacker: &CombatUnit, defender: &CombatUnit, rules: &CombatRules) -> i32 {
        calculate_damage(
            attacker,
            &UnitStats::new(),
            Some(defender),
            None,
            AccuracyMode::ResolvedByHitRoll,
            rules,
            &mut SyncRng::new(1),
        )
    }

    #[test]
    fn test_no_randomness_always_hits() {
        let mut att = attacker(10);
        att.stats.set(UnitVariable::Accuracy, 0);
        let mut def = defender(0);
        def.stats.set(UnitVariable::Evasion, 1000);
        let mut rng = SyncRng::new(3);
        assert!(calculate_hit(&att, &def.stats, Some(&def), &no_random(), &mut rng));
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_zero_accuracy_misses_without_drawing() {
        let mut att = attacker(10);
        att.stats.set(UnitVariable::Accuracy, 0);
        let def = defender(0);
        let mut rng = SyncRng::new(3);
        assert!(!calculate_hit(&att, &def.stats, Some(&def), &CombatRules::default(), &mut rng));
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_trap_and_god_mode_always_hit() {
        let def = defender(0);
        let mut trap = attacker(10);
        trap.stats.set(UnitVariable::Accuracy, 0);
        trap.flags = UnitFlags::TRAP;
        assert!(calculate_hit(&trap, &def.stats, Some(&def), &CombatRules::default(), &mut SyncRng::new(0)));

        let mut att = attacker(10);
        att.stats.set(UnitVariable::Accuracy, 0);
        let rules = CombatRules {
            no_randomness: false,
            god_mode_player: Some(PlayerId(0)),
        };
        assert!(calculate_hit(&att, &def.stats, Some(&def), &rules, &mut SyncRng::new(0)));
    }

    #[test]
    fn test_no_evasion_draws_once_and_hits() {
        let att = attacker(10);
        let def = defender(0);
        let mut rng = SyncRng::new(9);
        for _ in 0..20 {
            assert!(calculate_hit(&att, &def.stats, Some(&def), &CombatRules::default(), &mut rng));
        }
        assert_eq!(rng.draws(), 20);
    }

    #[test]
    fn test_stunned_defender_cannot_evade() {
        let att = attacker(10);
        let mut def = defender(0);
        def.stats.set(UnitVariable::Evasion, 1000);
        def.stats.set(UnitVariable::Stun, 1);
        let mut rng = SyncRng::new(5);
        for _ in 0..20 {
            assert!(calculate_hit(&att, &def.stats, Some(&def), &CombatRules::default(), &mut rng));
        }
    }

    #[test]
    fn test_hit_roll_is_reproducible() {
        let att = attacker(10);
        let mut def = defender(0);
        def.stats.set(UnitVariable::Evasion, 10);
        let run = || {
            let mut rng = SyncRng::new(42);
            (0..50)
                .map(|_| calculate_hit(&att, &def.stats, Some(&def), &CombatRules::default(), &mut rng))
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.contains(&true) && first.contains(&false));
    }

    #[test]
    fn test_basic_damage_with_average_spread() {
        // max(10 - 0, 1) = 10, then 10 - ((10 + 2) / 2) / 2 = 7
        assert_eq!(damage(&attacker(10), &defender(0), &no_random()), 7);
    }

    #[test]
    fn test_armor_never_reduces_below_one() {
        // max(5 - 20, 1) = 1, then 1 - (3 / 2) / 2 = 1
        assert_eq!(damage(&attacker(5), &defender(20), &no_random()), 1);

        let mut att = attacker(5);
        att.stats.set(UnitVariable::PiercingDamage, 6);
        // 1 + 6 = 7, then 7 - (9 / 2) / 2 = 5
        assert_eq!(damage(&att, &defender(20), &no_random()), 5);
    }

    #[test]
    fn test_random_spread_stays_in_range() {
        let att = attacker(10);
        let def = defender(0);
        let mut rng = SyncRng::new(11);
        for _ in 0..100 {
            let dealt = calculate_damage(
                &att,
                &UnitStats::new(),
                Some(&def),
                None,
                AccuracyMode::ResolvedByHitRoll,
                &CombatRules::default(),
                &mut rng,
            );
            // 10 - [0, 6)
            assert!((5..=10).contains(&dealt), "damage {dealt}");
        }
    }

    #[test]
    fn test_buffs_do_not_stack() {
        let mut att = attacker(100);
        att.stats.set(UnitVariable::Bloodlust, 1);
        att.stats.set(UnitVariable::Inspire, 1);
        att.stats.set(UnitVariable::Wither, 1);
        // 200 damage, minus (202 / 2) / 2 = 50
        assert_eq!(damage(&att, &defender(0), &no_random()), 150);

        let mut withered = attacker(100);
        withered.stats.set(UnitVariable::Wither, 1);
        // 50 damage, minus (52 / 2) / 2 = 13
        assert_eq!(damage(&withered, &defender(0), &no_random()), 37);
    }

    #[test]
    fn test_charge_bonus_scales_with_steps() {
        let mut att = attacker(100);
        att.stats.set(UnitVariable::ChargeBonus, 10);
        att.step_count = 3;
        // 130 damage, minus (132 / 2) / 2 = 33
        assert_eq!(damage(&att, &defender(0), &no_random()), 97);
    }

    #[test]
    fn test_elemental_resistance_and_arcane_buff() {
        let mut att = attacker(0);
        att.stats.set(UnitVariable::FireDamage, 20);
        att.stats.set(UnitVariable::Empowerment, 1);
        let mut def = defender(0);
        def.stats.set(UnitVariable::FireResistance, 50);
        // basic max(0, 1) = 1; piercing = 10 fire + 4 arcane = 14; 15 - (17 / 2) / 2 = 11
        assert_eq!(damage(&att, &def, &no_random()), 11);
    }

    #[test]
    fn test_critical_strike_without_randomness_adds_chance() {
        let mut att = attacker(100);
        att.stats.set(UnitVariable::CriticalStrikeChance, 20);
        // 120 damage, minus (122 / 2) / 2 = 30
        assert_eq!(damage(&att, &defender(0), &no_random()), 90);

        let forced = MissileModifiers {
            always_critical: true,
            reduce_factor: 100,
            ..MissileModifiers::default()
        };
        let forced_damage = |unit: &CombatUnit| {
            calculate_damage(
                unit,
                &UnitStats::new(),
                Some(&defender(0)),
                Some(&forced),
                AccuracyMode::ResolvedByHitRoll,
                &no_random(),
                &mut SyncRng::new(0),
            )
        };
        // a forced critical still only adds the chance
        assert_eq!(forced_damage(&att), 90);
        assert_eq!(forced_damage(&attacker(100)), 75);
    }

    #[test]
    fn test_backstab_depends_on_facing() {
        let mut att = attacker(100);
        att.stats.set(UnitVariable::Backstab, 50);
        let mut def = defender(0);

        att.heading = 0;
        def.heading = 0;
        // 150 - (152 / 2) / 2 = 112
        assert_eq!(damage(&att, &def, &no_random()), 112);

        def.heading = 32;
        // 125 - (127 / 2) / 2 = 94
        assert_eq!(damage(&att, &def, &no_random()), 94);

        def.heading = 128;
        assert_eq!(damage(&att, &def, &no_random()), 75);

        att.attack_range = 4;
        def.heading = 0;
        assert_eq!(damage(&att, &def, &no_random()), 75);
    }

    #[test]
    fn test_bonus_against_category() {
        let mut att = attacker(100);
        att.stats.set(UnitVariable::BonusAgainstMounted, 100);
        let mut def = defender(0);
        def.heading = 128;
        assert_eq!(damage(&att, &def, &no_random()), 75);
        def.flags = UnitFlags::ORGANIC | UnitFlags::MOUNTED;
        // 200 - 50
        assert_eq!(damage(&att, &def, &no_random()), 150);
    }

    #[test]
    fn test_accuracy_as_damage_with_flanking() {
        let mut att = attacker(10);
        att.stats.set(UnitVariable::Accuracy, 6);
        let mut def = defender(0);
        def.stats.set(UnitVariable::Evasion, 4);
        att.heading = 64;
        def.heading = 64;

        let dealt = calculate_damage(
            &att,
            &UnitStats::new(),
            Some(&def),
            None,
            AccuracyMode::ApplyAsDamage,
            &no_random(),
            &mut SyncRng::new(0),
        );
        // 10 + 6 - 4 = 12, + 4 flanking = 16, 16 - (18 / 2) / 2 = 12
        assert_eq!(dealt, 12);
    }

    #[test]
    fn test_evasion_as_damage_can_reach_zero() {
        let mut att = attacker(10);
        att.stats.set(UnitVariable::Accuracy, 0);
        let mut def = defender(0);
        def.stats.set(UnitVariable::Evasion, 10);
        def.heading = 128;

        let dealt = calculate_damage(
            &att,
            &UnitStats::new(),
            Some(&def),
            None,
            AccuracyMode::ApplyAsDamage,
            &no_random(),
            &mut SyncRng::new(0),
        );
        // 10 + 0 - 10 = 0, and the spread of 0 is 0
        assert_eq!(dealt, 0);
    }

    #[test]
    fn test_physical_resistance() {
        let mut att = attacker(100);
        att.damage_type = PhysicalDamageType::Blunt;
        let mut def = defender(0);
        def.stats.set(UnitVariable::BluntResistance, 30);
        def.stats.set(UnitVariable::HackResistance, 90);
        // 70 - (72 / 2) / 2 = 52
        assert_eq!(damage(&att, &def, &no_random()), 52);
    }

    #[test]
    fn test_pierce_reduction_compounds() {
        let mut modifiers = MissileModifiers {
            pierce: true,
            pierced_count: 1,
            reduce_factor: 50,
            ..MissileModifiers::default()
        };
        assert_eq!(apply_pierce_reduction(80, &modifiers), 80);
        modifiers.pierced_count = 3;
        assert_eq!(apply_pierce_reduction(80, &modifiers), 20);
        modifiers.pierce = false;
        assert_eq!(apply_pierce_reduction(80, &modifiers), 80);
    }

    #[test]
    fn test_flanking_table() {
        let mut att = attacker(0);
        let mut def = defender(0);
        let expected = [(0, 4), (32, 3), (64, 2), (96, 1), (128, 0)];
        for (heading, bonus) in expected {
            def.heading = heading;
            assert_eq!(flanking_bonus(&att, &def), bonus);
        }
        att.flags = UnitFlags::ORGANIC | UnitFlags::BUILDING;
        def.heading = 0;
        assert_eq!(flanking_bonus(&att, &def), 0);
    }

    #[test]
    fn test_map_distance() {
        let mut big = CombatUnit::new(UnitId(1), PlayerId(0), Vec2i::new(2, 2));
        big.tile_size = Vec2i::new(2, 2);
        assert_eq!(big.map_distance_to(Vec2i::new(3, 3)), 0);
        assert_eq!(big.map_distance_to(Vec2i::new(5, 3)), 2);
        assert_eq!(big.map_distance_to(Vec2i::new(0, 0)), 2);
        let small = CombatUnit::new(UnitId(2), PlayerId(0), Vec2i::new(4, 2));
        assert_eq!(big.map_distance_to_unit(&small), 1);
        assert_eq!(small.map_distance_to_unit(&big), 1);
        assert_eq!(big.center_pixel(), Vec2i::new(96, 96));
    }
}
