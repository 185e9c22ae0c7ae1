//! What happens when a missile meets units, walls or blocking terrain.

use super::{Missile, MissileClass, MissileContext, MissileManager, MissileType};
use crate::combat::{
    apply_pierce_reduction, calculate_damage, calculate_hit, AccuracyMode, CombatUnit, MissileModifiers, UnitDomain,
    UnitFlags, UnitStats, UnitVariable,
};
use crate::content::TerrainFlags;
use crate::math::{distance, map_pixel_pos_to_tile_pos, PixelPos, TilePos, Vec2i};

/// Source unit snapshot, if it is still alive on the map.
fn live_source(missile: &Missile, ctx: &MissileContext<'_>) -> Option<CombatUnit> {
    missile
        .source_unit
        .and_then(|id| ctx.battlefield.unit(id))
        .filter(|unit| unit.alive_on_map)
}

fn modifiers(missile: &Missile, missile_type: &MissileType) -> MissileModifiers {
    MissileModifiers {
        always_critical: missile.always_critical,
        pierce: missile_type.pierce,
        pierced_count: missile.pierced_units.len(),
        reduce_factor: missile_type.reduce_factor,
    }
}

/// Resolve the impact of a missile.
///
/// Plays the impact sound and spawns the impact missiles, then damages the
/// single goal (no range) or everything in the area (range > 0).
pub(crate) fn missile_hit(
    missile: &mut Missile,
    missile_type: &MissileType,
    hit_unit: Option<&CombatUnit>,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    let center = missile.center(missile_type);
    if let Some(sound) = &missile_type.impact_sound {
        ctx.media.play_sound(sound, center);
    }

    let database = ctx.database;
    for &impact in &missile_type.impacts {
        let carries_damage = database
            .missile_types
            .entry(impact)
            .is_some_and(|t| t.damage.is_some());
        match manager.spawn(database, ctx.media, impact, center, center, missile.layer, missile.local) {
            Ok(child) => {
                if carries_damage {
                    child.source_unit = missile.source_unit;
                }
            }
            Err(e) => tracing::warn!("Failed to spawn impact missile: {e}"),
        }
    }

    let Some(source) = live_source(missile, ctx) else {
        return;
    };
    let tile = map_pixel_pos_to_tile_pos(center);
    if !ctx.battlefield.is_point_on_map(tile, missile.layer) {
        return;
    }

    if missile_type.range <= 0 {
        if let Some(goal) = hit_unit {
            hits_single_goal(missile, missile_type, goal, ctx);
        } else if let Some(target) = missile.target_unit {
            match ctx.battlefield.unit(target) {
                Some(goal) => hits_single_goal(missile, missile_type, &goal, ctx),
                None => missile.target_unit = None,
            }
        } else {
            hits_wall(missile, missile_type, tile, 1, ctx);
        }
        return;
    }

    let reach = missile_type.range - 1;
    let offset = Vec2i::new(reach, reach);
    let target_domain = missile
        .target_unit
        .and_then(|id| ctx.battlefield.unit(id))
        .map_or(source.domain, |target| target.domain);
    let bounce = missile_type.class == MissileClass::PointToPointBounce;

    for goal in ctx.battlefield.units_in_tile_range(tile - offset, tile + offset, missile.layer) {
        if !goal.alive_on_map || !source.can_target(&goal) {
            continue;
        }
        if !missile_type.friendly_fire && !ctx.battlefield.is_enemy(source.player, goal.player) {
            continue;
        }
        if missile_type.correct_splash_damage && goal.domain != target_domain {
            continue;
        }

        let distance = goal.map_distance_to(tile);
        if bounce && missile.state <= 3 && distance > 0 {
            continue;
        }
        if bounce && too_large_to_bounce(missile_type, &goal) {
            missile.ttl = 0;
            break;
        }

        let splash = if distance > 0 { distance * missile_type.splash_factor } else { 1 };
        hits_goal(missile, missile_type, &goal, splash, ctx);
    }

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let wall_tile = tile + Vec2i::new(dx, dy);
            if !ctx.battlefield.is_point_on_map(wall_tile, missile.layer) {
                continue;
            }
            let Some(wall) = ctx.battlefield.overlay_wall(wall_tile, missile.layer) else {
                continue;
            };
            let friendly = wall
                .owner
                .is_some_and(|owner| !ctx.battlefield.is_enemy(source.player, owner));
            if friendly && !missile_type.friendly_fire {
                continue;
            }
            let splash = (distance(tile, wall_tile) * missile_type.splash_factor).max(1);
            hits_wall(missile, missile_type, wall_tile, splash, ctx);
        }
    }
}

fn too_large_to_bounce(missile_type: &MissileType, goal: &CombatUnit) -> bool {
    goal.tile_size.x > missile_type.max_bounce_size || goal.tile_size.y > missile_type.max_bounce_size
}

/// A bounce missile stops dead at a unit too large to bounce off.
fn hits_single_goal(
    missile: &mut Missile,
    missile_type: &MissileType,
    goal: &CombatUnit,
    ctx: &mut MissileContext<'_>,
) {
    if missile_type.class == MissileClass::PointToPointBounce && too_large_to_bounce(missile_type, goal) {
        missile.ttl = 0;
        return;
    }
    hits_goal(missile, missile_type, goal, 1, ctx);
}

/// Damage one unit.
pub(crate) fn hits_goal(
    missile: &mut Missile,
    missile_type: &MissileType,
    goal: &CombatUnit,
    splash: i32,
    ctx: &mut MissileContext<'_>,
) {
    if !missile_type.can_hit_owner && missile.source_unit == Some(goal.id) {
        return;
    }
    if !goal.alive_on_map {
        return;
    }

    if missile_type.pierce {
        if missile.has_pierced(goal.id) {
            if missile_type.pierce_once {
                return;
            }
        } else {
            missile.pierced_units.push(goal.id);
        }
    }

    let splash = splash.max(1);
    let source = missile.source_unit.and_then(|id| ctx.battlefield.unit(id));
    let modifiers = modifiers(missile, missile_type);

    let damage = if let Some(formula) = &missile_type.damage {
        let value = formula.evaluate(source.as_ref().map(|s| &s.stats), ctx.rng);
        apply_pierce_reduction(value / splash, &modifiers)
    } else if missile.damage > 0 {
        apply_pierce_reduction(missile.damage / splash, &modifiers)
    } else {
        let Some(attacker) = &source else {
            return;
        };
        if !missile.always_hits && !calculate_hit(attacker, &goal.stats, Some(goal), ctx.rules, ctx.rng) {
            tracing::trace!(missile = missile.id.0, goal = goal.id.0, "Missile missed");
            return;
        }
        calculate_damage(
            attacker,
            &goal.stats,
            Some(goal),
            Some(&modifiers),
            AccuracyMode::ResolvedByHitRoll,
            ctx.rules,
            ctx.rng,
        ) / splash
    };

    tracing::trace!(missile = missile.id.0, goal = goal.id.0, damage, "Missile hit");
    ctx.battlefield.apply_damage(missile.source_unit, goal.id, damage);

    if let Some(attacker) = &source {
        let thorns = goal.stats.value(UnitVariable::ThornsDamage);
        if thorns > 0 && attacker.id != goal.id && attacker.map_distance_to_unit(goal) <= 1 {
            ctx.battlefield.apply_damage(Some(goal.id), attacker.id, thorns);
        }
    }
}

/// Damage the overlay wall on a tile, if there is one.
pub(crate) fn hits_wall(
    missile: &Missile,
    missile_type: &MissileType,
    tile: TilePos,
    splash: i32,
    ctx: &mut MissileContext<'_>,
) {
    if !ctx.battlefield.is_point_on_map(tile, missile.layer) {
        return;
    }
    let Some(wall) = ctx.battlefield.overlay_wall(tile, missile.layer) else {
        return;
    };
    let Some(terrain) = ctx.database.terrain_types.entry(wall.terrain) else {
        return;
    };

    let splash = splash.max(1);
    let source = missile.source_unit.and_then(|id| ctx.battlefield.unit(id));
    let damage = if let Some(formula) = &missile_type.damage {
        formula.evaluate(source.as_ref().map(|s| &s.stats), ctx.rng) / splash
    } else if missile.damage > 0 {
        missile.damage / splash
    } else {
        let Some(attacker) = &source else {
            return;
        };
        let wall_stats = UnitStats::new()
            .with(UnitVariable::Armor, terrain.wall_armor)
            .with(UnitVariable::HitPoints, terrain.wall_hit_points);
        calculate_damage(
            attacker,
            &wall_stats,
            None,
            None,
            AccuracyMode::ResolvedByHitRoll,
            ctx.rules,
            ctx.rng,
        ) / splash
    };

    tracing::trace!(missile = missile.id.0, damage, "Missile hit wall at ({}, {})", tile.x, tile.y);
    ctx.battlefield.damage_overlay(tile, missile.layer, damage);
}

/// Hit every qualifying unit on a tile the missile passes through.
pub(crate) fn handle_pierce(
    missile: &mut Missile,
    missile_type: &MissileType,
    tile: TilePos,
    ctx: &mut MissileContext<'_>,
) {
    if !ctx.battlefield.is_point_on_map(tile, missile.layer) {
        return;
    }
    let Some(source) = live_source(missile, ctx) else {
        return;
    };

    for unit in ctx.battlefield.units_on_tile(tile, missile.layer) {
        if !unit.alive_on_map || unit.id == source.id || !source.can_target(&unit) {
            continue;
        }
        if missile_type.pierce_once && missile.has_pierced(unit.id) {
            continue;
        }
        if !missile_type.friendly_fire && !ctx.battlefield.is_enemy(source.player, unit.player) {
            continue;
        }
        hits_goal(missile, missile_type, &unit, 1, ctx);
    }
}

/// Stop the missile early at `sample` (a sprite center) if something there
/// blocks it. Returns true when the flight ends here.
///
/// Terrain in the stop flags, enemy overlay walls and enemy wall units
/// block shots between units of the same domain. With `kill_first_unit`,
/// the first qualifying unit on the path is struck instead.
pub(crate) fn handle_blocking(
    missile: &mut Missile,
    missile_type: &MissileType,
    sample: PixelPos,
    ctx: &mut MissileContext<'_>,
) -> bool {
    let Some(source) = live_source(missile, ctx) else {
        return false;
    };
    let tile = map_pixel_pos_to_tile_pos(sample);
    if !ctx.battlefield.is_point_on_map(tile, missile.layer) {
        return false;
    }

    let target = missile.target_unit.and_then(|id| ctx.battlefield.unit(id));
    let same_domain = target.as_ref().is_some_and(|t| t.domain == source.domain);
    let obstacles_apply = same_domain || (missile_type.range > 0 && missile_type.correct_splash_damage);

    if obstacles_apply {
        if missile_type.stop_flags != TerrainFlags::NONE
            && ctx.battlefield.tile_flags(tile, missile.layer).intersects(missile_type.stop_flags)
        {
            stop_at(missile, missile_type, sample);
            return true;
        }

        if !missile_type.ignore_walls {
            if let Some(wall) = ctx.battlefield.overlay_wall(tile, missile.layer) {
                let enemy = wall
                    .owner
                    .map_or(true, |owner| ctx.battlefield.is_enemy(source.player, owner));
                if enemy {
                    missile.target_unit = None;
                    stop_at(missile, missile_type, sample);
                    return true;
                }
            }
        }
    }

    for unit in ctx.battlefield.units_on_tile(tile, missile.layer) {
        if !unit.alive_on_map || unit.id == source.id || Some(unit.id) == missile.target_unit {
            continue;
        }
        let enemy = ctx.battlefield.is_enemy(source.player, unit.player);

        if obstacles_apply
            && enemy
            && unit.flags.contains(UnitFlags::WALL)
            && source.domain == UnitDomain::Land
            && unit.domain == UnitDomain::Land
        {
            missile.target_unit = Some(unit.id);
            stop_at(missile, missile_type, sample);
            return true;
        }

        if missile_type.kill_first_unit
            && !unit.flags.contains(UnitFlags::NON_SOLID)
            && source.can_target(&unit)
            && (missile_type.friendly_fire || enemy)
        {
            missile.target_unit = Some(unit.id);
            stop_at(missile, missile_type, sample);
            return true;
        }
    }

    false
}

fn stop_at(missile: &mut Missile, missile_type: &MissileType, center: PixelPos) {
    missile.position = center - missile_type.size.div(2);
    missile.destination = missile.position;
    missile.destroy_missile = true;
}
