//! Per-class missile behavior.
//!
//! [`run_action`] is the single dispatch point; every class maps to one
//! arm. Motion is sampled in fixed point so every participant visits the
//! same tiles in the same order.

use super::collision::{handle_blocking, handle_pierce, missile_hit};
use super::{missile_burning_building, Missile, MissileClass, MissileContext, MissileManager, MissileType};
use crate::combat::{UnitDomain, UnitFlags};
use crate::math::{
    distance, map_pixel_pos_to_tile_pos, tile_pos_to_map_pixel_pos_center, Fixed, PixelPos, Vec2Fixed, Vec2i,
    PIXEL_TILE_SIZE,
};

/// Projection of arc height onto the x axis, in 64ths.
const Z_PROJ_TO_X: i32 = 4;
/// Projection of arc height onto the y axis, in 64ths.
const Z_PROJ_TO_Y: i32 = 1024;
/// Attempts at finding an on-map destination for a whirlwind.
const WHIRLWIND_ATTEMPTS: usize = 16;

/// Offsets of a flame shield around its target, one per step of ten degrees.
const FLAME_SHIELD_CIRCLE: [(i32, i32); 36] = [
    (0, -32), (6, -32), (11, -30), (16, -28), (21, -25), (25, -21),
    (28, -16), (30, -11), (32, -6), (32, 0), (32, 6), (30, 11),
    (28, 16), (25, 21), (21, 25), (16, 28), (11, 30), (6, 32),
    (0, 32), (-6, 32), (-11, 30), (-16, 28), (-21, 25), (-25, 21),
    (-28, 16), (-30, 11), (-32, 6), (-32, 0), (-32, -6), (-30, -11),
    (-28, -16), (-25, -21), (-21, -25), (-16, -28), (-11, -30), (-6, -32),
];

/// Run one action of `missile` according to its class.
pub(crate) fn run_action(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    match missile_type.class {
        MissileClass::None => {}
        MissileClass::PointToPoint => {
            if point_to_point(missile, missile_type, manager, ctx) {
                hit_and_expire(missile, missile_type, manager, ctx);
            } else {
                missile.next_missile_frame(missile_type, 1, false);
            }
        }
        MissileClass::PointToPointWithHit => {
            if point_to_point(missile, missile_type, manager, ctx)
                && missile.next_missile_frame(missile_type, 1, false)
            {
                hit_and_expire(missile, missile_type, manager, ctx);
            }
        }
        MissileClass::PointToPointCycleOnce => {
            if point_to_point(missile, missile_type, manager, ctx) {
                hit_and_expire(missile, missile_type, manager, ctx);
            } else {
                missile.next_missile_frame_cycle(missile_type);
            }
        }
        MissileClass::PointToPointBounce => bounce(missile, missile_type, manager, ctx),
        MissileClass::Stay => {
            if missile.next_missile_frame(missile_type, 1, false) {
                hit_and_expire(missile, missile_type, manager, ctx);
            }
        }
        MissileClass::CycleOnce => cycle_once(missile, missile_type, manager, ctx),
        MissileClass::Fire => fire(missile, missile_type, ctx),
        MissileClass::Hit => {
            if point_to_point(missile, missile_type, manager, ctx) {
                hit_and_expire(missile, missile_type, manager, ctx);
            }
        }
        MissileClass::Parabolic => {
            if parabolic(missile, missile_type, manager, ctx) {
                hit_and_expire(missile, missile_type, manager, ctx);
            } else {
                missile.next_missile_frame_cycle(missile_type);
            }
        }
        MissileClass::LandMine => land_mine(missile, missile_type, manager, ctx),
        MissileClass::Whirlwind => whirlwind(missile, missile_type, manager, ctx),
        MissileClass::FlameShield => flame_shield(missile, missile_type, ctx),
        MissileClass::DeathCoil => death_coil(missile, missile_type, manager, ctx),
        MissileClass::Tracer => {
            if tracer(missile, missile_type, ctx) {
                hit_and_expire(missile, missile_type, manager, ctx);
            } else {
                missile.next_missile_frame(missile_type, 1, false);
            }
        }
        MissileClass::ClipToTarget => clip_to_target(missile, missile_type, manager, ctx),
        MissileClass::Continuous => {
            if missile.next_missile_frame(missile_type, 1, false) {
                missile_hit(missile, missile_type, None, manager, ctx);
            }
        }
        MissileClass::StraightFly => straight_fly(missile, missile_type, manager, ctx),
    }
}

fn hit_and_expire(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    missile_hit(missile, missile_type, None, manager, ctx);
    missile.ttl = 0;
}

/// Start a leg (even state) or advance along it (odd state).
///
/// Returns true when there is nowhere to go or the leg is complete.
fn init_move(missile: &mut Missile, missile_type: &MissileType) -> bool {
    let heading = missile.destination - missile.position;
    missile.new_heading_from_xy(missile_type, heading);

    if missile.state & 1 == 0 {
        missile.current_step = 0;
        missile.total_step = 0;
        if heading.is_zero() {
            return true;
        }
        missile.total_step = distance(missile.source, missile.destination);
        missile.state += 1;
        return false;
    }

    missile.current_step = (missile.current_step + missile_type.speed).min(missile.total_step);
    missile.current_step == missile.total_step
}

fn not_past(value: Fixed, limit: Fixed, forward: bool) -> bool {
    if forward {
        value <= limit
    } else {
        value >= limit
    }
}

fn spawn_smoke(
    missile: &Missile,
    missile_type: &MissileType,
    at: PixelPos,
    heading: PixelPos,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    let Some(smoke) = missile_type.smoke else {
        return;
    };
    if missile.current_step == 0 && missile.state <= 1 {
        return;
    }
    let database = ctx.database;
    let Some(smoke_type) = database.missile_types.entry(smoke) else {
        return;
    };
    match manager.spawn(database, ctx.media, smoke, at, at, missile.layer, missile.local) {
        Ok(puff) => {
            if smoke_type.num_directions > 1 {
                puff.new_heading_from_xy(smoke_type, heading);
            }
        }
        Err(e) => tracing::warn!("Failed to spawn smoke: {e}"),
    }
}

/// Move along the current leg, sampling every tile crossed for smoke,
/// piercing and blocking. Returns true on arrival or when blocked.
fn point_to_point(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) -> bool {
    init_move(missile, missile_type);
    if missile.total_step == 0 {
        return true;
    }

    let diff = missile.destination - missile.source;
    let mut sample = Vec2Fixed::from_pixel(missile.position);
    missile.position = missile.source
        + Vec2i::new(
            diff.x * missile.current_step / missile.total_step,
            diff.y * missile.current_step / missile.total_step,
        );

    let precision = if missile_type.smoke_precision > 0 {
        missile_type.smoke_precision
    } else {
        missile_type.speed
    }
    .max(1);
    let step = Vec2Fixed::step(diff, precision, missile.total_step);
    let limit = Vec2Fixed::from_pixel(missile.position);
    let half = missile_type.size.div(2);

    while not_past(sample.x, limit.x, diff.x >= 0) && not_past(sample.y, limit.y, diff.y >= 0) {
        let center = sample.to_pixel() + half;
        spawn_smoke(missile, missile_type, center, diff, manager, ctx);
        if missile_type.pierce {
            handle_pierce(missile, missile_type, map_pixel_pos_to_tile_pos(center), ctx);
        }
        if handle_blocking(missile, missile_type, center, ctx) {
            return true;
        }
        sample = sample + step;
    }

    if missile.current_step == missile.total_step {
        missile.position = missile.destination;
        return true;
    }
    false
}

/// Like [`point_to_point`] but lifted into an arc.
fn parabolic(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) -> bool {
    init_move(missile, missile_type);
    if missile.total_step == 0 {
        return true;
    }

    let diff = missile.destination - missile.source;
    let previous = missile.position;
    let (current, total) = (missile.current_step, missile.total_step);
    let mut position = missile.source + Vec2i::new(diff.x * current / total, diff.y * current / total);

    let k = Fixed::from_num(-missile_type.parabol_coefficient.max(1));
    let z = Fixed::from_num(current) * Fixed::from_num(total - current) / k;
    let sixty_four = Fixed::from_num(64);
    position.x += (z * Fixed::from_num(Z_PROJ_TO_X) / sixty_four).round_to_zero().to_num::<i32>();
    position.y += (z * Fixed::from_num(Z_PROJ_TO_Y) / sixty_four).round_to_zero().to_num::<i32>();

    missile.new_heading_from_xy(missile_type, position - previous);
    missile.position = position;
    let center = missile.center(missile_type);
    spawn_smoke(missile, missile_type, center, diff, manager, ctx);

    if current == total {
        missile.position = missile.destination;
        return true;
    }
    false
}

/// Home in on the target unit by `speed` pixels per action.
fn tracer(missile: &mut Missile, missile_type: &MissileType, ctx: &mut MissileContext<'_>) -> bool {
    if let Some(target) = missile.target_unit.and_then(|id| ctx.battlefield.unit(id)) {
        missile.destination = target.center_pixel() - missile_type.size.div(2);
    }

    let diff = missile.destination - missile.position;
    let remaining = distance(missile.position, missile.destination);
    if remaining <= missile_type.speed {
        missile.position = missile.destination;
        return true;
    }

    missile.new_heading_from_xy(missile_type, diff);
    missile.position += Vec2i::new(
        diff.x * missile_type.speed / remaining,
        diff.y * missile_type.speed / remaining,
    );

    let center = missile.center(missile_type);
    if missile_type.pierce {
        handle_pierce(missile, missile_type, map_pixel_pos_to_tile_pos(center), ctx);
    }
    handle_blocking(missile, missile_type, center, ctx)
}

fn bounce(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    if !point_to_point(missile, missile_type, manager, ctx) {
        missile.next_missile_frame(missile_type, 1, false);
        return;
    }

    if !missile.destroy_missile
        && missile.state < 2 * missile_type.num_bounces - 1
        && missile.total_step > 0
    {
        let leg = missile.destination - missile.source;
        let extent = (PIXEL_TILE_SIZE.x + PIXEL_TILE_SIZE.y) * 3 / 4;
        missile.destination += Vec2i::new(
            leg.x * extent / missile.total_step,
            leg.y * extent / missile.total_step,
        );
        missile.state += 1;
        missile.source = missile.position;
        point_to_point(missile, missile_type, manager, ctx);
        missile_hit(missile, missile_type, None, manager, ctx);
    } else {
        hit_and_expire(missile, missile_type, manager, ctx);
    }
}

fn cycle_once(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    match missile.state {
        0 | 2 => missile.state += 1,
        1 => {
            if missile.next_missile_frame(missile_type, 1, false) {
                missile.state += 1;
            }
        }
        3 => {
            if missile.next_missile_frame(missile_type, -1, false) {
                hit_and_expire(missile, missile_type, manager, ctx);
            }
        }
        _ => {}
    }
}

/// Burning building: switch to the fire look matching the building's
/// damage, or go out once it is repaired or gone.
fn fire(missile: &mut Missile, missile_type: &MissileType, ctx: &mut MissileContext<'_>) {
    let Some(building) = missile
        .source_unit
        .and_then(|id| ctx.battlefield.unit(id))
        .filter(|unit| unit.alive_on_map)
    else {
        missile.ttl = 0;
        return;
    };

    if !missile.next_missile_frame(missile_type, 1, false) {
        return;
    }
    missile.sprite_frame = 0;

    let database = ctx.database;
    match missile_burning_building(&database.missile_types, building.hit_point_percent()) {
        None => missile.ttl = 0,
        Some(handle) if handle != missile.missile_type => {
            if let Some(next) = database.missile_types.entry(handle) {
                let center = missile.center(missile_type);
                missile.missile_type = handle;
                missile.position = center - next.size.div(2);
            }
        }
        Some(_) => {}
    }
}

fn land_mine(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    let tile = missile.center_tile(missile_type);
    let victim = ctx
        .battlefield
        .units_on_tile(tile, missile.layer)
        .into_iter()
        .find(|unit| {
            unit.alive_on_map
                && unit.domain != UnitDomain::Air
                && !unit.flags.contains(UnitFlags::BUILDING)
                && (missile_type.can_hit_owner || missile.source_unit != Some(unit.id))
        });

    if let Some(victim) = victim {
        missile_hit(missile, missile_type, Some(&victim), manager, ctx);
        missile.ttl = 0;
        return;
    }
    missile.next_missile_frame(missile_type, 1, false);
}

fn whirlwind(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    if missile.anim_wait <= 0 {
        if missile.next_missile_frame(missile_type, 1, false) {
            missile.sprite_frame = 0;
            point_to_point(missile, missile_type, manager, ctx);
        }
        missile.anim_wait = missile_type.sleep;
    } else {
        missile.anim_wait -= 1;
    }
    missile.wait = 1;

    // The funnel's base sits half a tile right of and one tile below the sprite center.
    let base = missile.center(missile_type) + Vec2i::new(PIXEL_TILE_SIZE.x / 2, PIXEL_TILE_SIZE.y);
    let base_tile = map_pixel_pos_to_tile_pos(base);

    if (missile.ttl % 30) / 10 == 0 {
        missile_hit(missile, missile_type, None, manager, ctx);
    }

    if missile.ttl % 100 == 0 {
        for _ in 0..WHIRLWIND_ATTEMPTS {
            let offset = Vec2i::new(ctx.rng.next_below(5) - 2, ctx.rng.next_below(5) - 2);
            let tile = base_tile + offset;
            if ctx.battlefield.is_point_on_map(tile, missile.layer) {
                missile.destination = tile_pos_to_map_pixel_pos_center(tile) - missile_type.size.div(2);
                missile.source = missile.position;
                missile.state = 0;
                tracing::debug!(
                    id = missile.id.0,
                    ttl = missile.ttl,
                    "Whirlwind heads to ({}, {})",
                    missile.destination.x,
                    missile.destination.y
                );
                break;
            }
        }
    }
}

fn flame_shield(missile: &mut Missile, missile_type: &MissileType, ctx: &mut MissileContext<'_>) {
    let Some(target) = missile
        .target_unit
        .and_then(|id| ctx.battlefield.unit(id))
        .filter(|unit| unit.alive_on_map)
    else {
        missile.hidden = true;
        missile.ttl = 0;
        return;
    };

    let (dx, dy) = FLAME_SHIELD_CIRCLE[missile.ttl.rem_euclid(36) as usize];
    missile.position = target.center_pixel() + Vec2i::new(dx, dy) - missile_type.size.div(2);
    missile.hidden = false;

    if missile.ttl % 8 != 0 {
        return;
    }

    let min = target.tile_pos - Vec2i::new(1, 1);
    let max = target.tile_pos + target.tile_size;
    for unit in ctx.battlefield.units_in_tile_range(min, max, missile.layer) {
        if unit.id != target.id && unit.alive_on_map {
            ctx.battlefield.apply_damage(missile.source_unit, unit.id, missile.damage);
        }
    }
}

/// Fly to the destination, then drain the target (or every enemy around
/// the destination) and heal the caster by the damage dealt.
fn death_coil(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    if !point_to_point(missile, missile_type, manager, ctx) {
        return;
    }
    missile.ttl = 0;

    let Some(caster) = missile
        .source_unit
        .and_then(|id| ctx.battlefield.unit(id))
        .filter(|unit| unit.alive_on_map)
    else {
        return;
    };

    if let Some(target_id) = missile.target_unit {
        if let Some(target) = ctx.battlefield.unit(target_id) {
            if missile.damage > 0 {
                ctx.battlefield.apply_damage(Some(caster.id), target.id, missile.damage);
            }
            ctx.battlefield.heal_unit(caster.id, missile.damage);
        }
        return;
    }

    let center = map_pixel_pos_to_tile_pos(missile.destination + missile_type.size.div(2));
    let reach = Vec2i::new(2, 2);
    let enemies: Vec<_> = ctx
        .battlefield
        .units_in_tile_range(center - reach, center + reach, missile.layer)
        .into_iter()
        .filter(|unit| unit.alive_on_map && ctx.battlefield.is_enemy(caster.player, unit.player))
        .collect();
    if enemies.is_empty() {
        return;
    }

    let share = missile.damage / enemies.len() as i32;
    for enemy in &enemies {
        ctx.battlefield.apply_damage(Some(caster.id), enemy.id, share);
        ctx.battlefield.heal_unit(caster.id, share);
    }
}

fn clip_to_target(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    if let Some(target_id) = missile.target_unit {
        match ctx.battlefield.unit(target_id) {
            Some(target) => missile.position = target.center_pixel() - missile_type.size.div(2),
            None => {
                missile.ttl = 0;
                return;
            }
        }
    }

    if missile.next_missile_frame(missile_type, 1, false) {
        hit_and_expire(missile, missile_type, manager, ctx);
    }
}

/// Keep flying in the same direction, leg after leg, until something
/// blocks the missile or it leaves the map.
fn straight_fly(
    missile: &mut Missile,
    missile_type: &MissileType,
    manager: &mut MissileManager,
    ctx: &mut MissileContext<'_>,
) {
    let leg = missile.destination - missile.source;
    if !point_to_point(missile, missile_type, manager, ctx) {
        missile.next_missile_frame(missile_type, 1, false);
        return;
    }

    if missile.destroy_missile {
        hit_and_expire(missile, missile_type, manager, ctx);
        return;
    }

    let tile = missile.center_tile(missile_type);
    if leg.is_zero() || !ctx.battlefield.is_point_on_map(tile, missile.layer) {
        missile.ttl = 0;
        return;
    }

    missile.source = missile.position;
    missile.destination = missile.position + leg;
    // Even state starts a new leg on the next action.
    missile.state += 1;
}
