//! Missile behavior on a grid battlefield.

use strata_core::battlefield::{OverlayWall, UnitId};
use strata_core::combat::UnitVariable;
use strata_core::config::CombatRules;
use strata_core::math::{tile_pos_to_map_pixel_pos_center, Vec2i};
use strata_core::missile::{DamageFormula, MissileClass, MissileId, MissileType};
use strata_core::registry::DataType;
use strata_core::simulation::Simulation;
use strata_test_utils::arena::{Arena, GridWorld};
use strata_test_utils::fixtures::{add_missile_type, archer, building, combat_database, missile_type, soldier};

fn arena_with(world: GridWorld) -> Arena {
    Arena::new(combat_database().unwrap(), world, 3, CombatRules::default())
}

fn set_hit_points(arena: &mut Arena, unit: UnitId, value: i32) {
    arena
        .world
        .unit_state_mut(unit)
        .unwrap()
        .stats
        .get_mut(UnitVariable::HitPoints)
        .value = value;
}

#[test]
fn test_ttl_counts_down_after_start_delay() {
    let mut database = combat_database().unwrap();
    add_missile_type(
        &mut database,
        "marker",
        MissileType {
            ttl: 5,
            ..missile_type(MissileClass::None)
        },
    )
    .unwrap();
    add_missile_type(
        &mut database,
        "late_marker",
        MissileType {
            ttl: 5,
            start_delay: 3,
            ..missile_type(MissileClass::None)
        },
    )
    .unwrap();

    let mut world = GridWorld::new(8, 8);
    world.add_unit(soldier(1, 0, Vec2i::new(1, 1)));
    let mut arena = Arena::new(database, world, 0, CombatRules::default());
    let target = tile_pos_to_map_pixel_pos_center(Vec2i::new(4, 4));
    let marker = arena.fire_at("marker", UnitId(1), target).unwrap();
    let late = arena.fire_at("late_marker", UnitId(1), target).unwrap();

    for _ in 0..4 {
        arena.tick();
    }
    assert_eq!(arena.simulation.missiles().find(marker).unwrap().ttl, 1);
    assert_eq!(arena.simulation.missiles().find(late).unwrap().ttl, 4);

    arena.tick();
    assert!(arena.simulation.missiles().find(marker).is_none());
    assert!(arena.simulation.missiles().find(late).is_some());

    assert_eq!(arena.run_until_idle(10), 3);
}

#[test]
fn test_bolt_deals_constant_damage() {
    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(7, 4)));
    let mut arena = arena_with(world);

    arena.fire("bolt", UnitId(1), UnitId(2)).unwrap();
    arena.run_until_idle(100);

    assert_eq!(arena.world.damage_taken(UnitId(2)), 25);
    assert_eq!(arena.world.hit_points(UnitId(2)), 75);
}

#[test]
fn test_only_always_fire_types_shoot_at_a_vanished_target() {
    let mut database = combat_database().unwrap();
    add_missile_type(
        &mut database,
        "flare",
        MissileType {
            always_fire: true,
            ..missile_type(MissileClass::PointToPoint)
        },
    )
    .unwrap();

    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(7, 4)));
    world.remove_unit(UnitId(2));
    let mut arena = Arena::new(database, world, 3, CombatRules::default());

    assert!(arena.fire("bolt", UnitId(1), UnitId(2)).is_err());
    assert_eq!(arena.simulation.missiles().missile_count(), 0);

    let flare = arena.fire("flare", UnitId(1), UnitId(2)).unwrap();
    assert_eq!(arena.simulation.missiles().find(flare).unwrap().target_unit, None);
    assert!(arena.run_until_idle(200) < 200);
    assert_eq!(arena.world.damage_taken(UnitId(2)), 0);
}

#[test]
fn test_spear_pierces_with_compounding_reduction() {
    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(3, 1, Vec2i::new(3, 4)));
    world.add_unit(soldier(5, 1, Vec2i::new(5, 4)));
    world.add_unit(soldier(7, 1, Vec2i::new(7, 4)));
    let mut arena = arena_with(world);

    arena.fire("spear", UnitId(1), UnitId(7)).unwrap();
    arena.run_until_idle(200);

    assert_eq!(arena.world.damage_taken(UnitId(3)), 20);
    assert_eq!(arena.world.damage_taken(UnitId(5)), 10);
    assert_eq!(arena.world.damage_taken(UnitId(7)), 5);
    for id in [3, 5, 7] {
        let hits = arena.world.damage_log.iter().filter(|e| e.target == UnitId(id)).count();
        assert_eq!(hits, 1, "unit {id} was hit {hits} times");
    }
    assert_eq!(arena.world.damage_taken(UnitId(1)), 0);
}

#[test]
fn test_fireball_splashes_adjacent_wall() {
    let mut database = combat_database().unwrap();
    let stone = database.terrain_types.find("stone_wall").unwrap();
    let wall = OverlayWall {
        terrain: stone,
        owner: None,
    };

    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(8, 4)));
    world.add_wall(Vec2i::new(9, 4), wall, 100);
    let mut arena = Arena::new(database, world, 0, CombatRules::default());

    arena.fire("fireball", UnitId(1), UnitId(2)).unwrap();
    arena.run_until_idle(200);

    assert_eq!(arena.world.damage_taken(UnitId(2)), 40);
    assert_eq!(arena.world.overlay_log, vec![(Vec2i::new(9, 4), 20)]);
    assert_eq!(arena.world.wall_hit_points(Vec2i::new(9, 4)), Some(80));
    assert_eq!(arena.media.times_played("explode"), 1);
}

#[test]
fn test_impact_missile_waits_for_next_tick() {
    let mut database = combat_database().unwrap();
    let ember = add_missile_type(
        &mut database,
        "ember",
        MissileType {
            ttl: 3,
            ..missile_type(MissileClass::None)
        },
    )
    .unwrap();
    add_missile_type(
        &mut database,
        "spark",
        MissileType {
            damage: Some(DamageFormula::Constant(5)),
            impact_identifiers: vec!["ember".to_string()],
            ..missile_type(MissileClass::PointToPoint)
        },
    )
    .unwrap();
    DataType::<MissileType>::initialize_all(&mut database).unwrap();

    let mut world = GridWorld::new(8, 8);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(3, 4)));
    let mut arena = Arena::new(database, world, 0, CombatRules::default());
    let spark = arena.fire("spark", UnitId(1), UnitId(2)).unwrap();

    let mut ticks = 0;
    while arena.world.damage_log.is_empty() && ticks < 50 {
        arena.tick();
        ticks += 1;
    }
    assert_eq!(arena.world.damage_taken(UnitId(2)), 5);
    assert!(arena.simulation.missiles().find(spark).is_none());

    let spawned: Vec<_> = arena.simulation.missiles().iter().collect();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].missile_type, ember);
    assert_eq!(spawned[0].ttl, 3);
    let ember_id = spawned[0].id;

    arena.tick();
    assert_eq!(arena.simulation.missiles().find(ember_id).unwrap().ttl, 2);
}

#[test]
fn test_boulder_stops_at_large_units() {
    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(building(20, 1, Vec2i::new(10, 4), 2));
    let mut arena = arena_with(world);

    arena.fire("boulder", UnitId(1), UnitId(20)).unwrap();
    arena.run_until_idle(200);

    assert_eq!(arena.world.damage_taken(UnitId(20)), 0);
    assert_eq!(arena.simulation.missiles().missile_count(), 0);
}

#[test]
fn test_pebble_without_range_stops_at_large_units() {
    let mut database = combat_database().unwrap();
    add_missile_type(
        &mut database,
        "pebble",
        MissileType {
            damage: Some(DamageFormula::Constant(30)),
            range: 0,
            num_bounces: 3,
            max_bounce_size: 1,
            ..missile_type(MissileClass::PointToPointBounce)
        },
    )
    .unwrap();

    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(building(20, 1, Vec2i::new(10, 4), 2));
    let mut arena = Arena::new(database, world, 3, CombatRules::default());

    let pebble = arena.fire("pebble", UnitId(1), UnitId(20)).unwrap();
    arena.run_until_idle(200);

    assert_eq!(arena.world.damage_taken(UnitId(20)), 0);
    assert!(arena.simulation.missiles().find(pebble).is_none());
    assert_eq!(arena.simulation.missiles().missile_count(), 0);
}

#[test]
fn test_boulder_hits_small_unit_once() {
    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(8, 4)));
    let mut arena = arena_with(world);

    arena.fire("boulder", UnitId(1), UnitId(2)).unwrap();
    arena.run_until_idle(200);

    assert_eq!(arena.world.damage_taken(UnitId(2)), 30);
    assert_eq!(arena.simulation.missiles().missile_count(), 0);
}

#[test]
fn test_death_coil_drains_target_into_caster() {
    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(6, 4)));
    let mut arena = arena_with(world);
    set_hit_points(&mut arena, UnitId(1), 50);

    let coil = arena.fire("death_coil", UnitId(1), UnitId(2)).unwrap();
    arena.simulation.missiles_mut().find_mut(coil).unwrap().damage = 20;
    arena.run_until_idle(200);

    assert_eq!(arena.world.hit_points(UnitId(2)), 80);
    assert_eq!(arena.world.hit_points(UnitId(1)), 70);
    assert_eq!(arena.world.heal_log, vec![(UnitId(1), 20)]);
}

#[test]
fn test_land_mine_triggers_on_victim_not_owner() {
    let mut world = GridWorld::new(8, 8);
    world.add_unit(soldier(1, 0, Vec2i::new(1, 1)));
    world.add_unit(soldier(2, 1, Vec2i::new(5, 5)));
    let mut arena = arena_with(world);
    let caltrops = arena.database.missile_types.find("caltrops").unwrap();

    let lay_mine = |arena: &mut Arena, tile: Vec2i| {
        let center = tile_pos_to_map_pixel_pos_center(tile);
        let mine = arena
            .simulation
            .missiles_mut()
            .make_missile(&arena.database, &mut arena.media, caltrops, center, center, 0)
            .unwrap();
        mine.source_unit = Some(UnitId(1));
        mine.id
    };
    let own_mine = lay_mine(&mut arena, Vec2i::new(1, 1));
    let enemy_mine = lay_mine(&mut arena, Vec2i::new(5, 5));

    arena.tick();
    assert_eq!(arena.world.damage_taken(UnitId(2)), 15);
    assert!(arena.simulation.missiles().find(enemy_mine).is_none());

    for _ in 0..10 {
        arena.tick();
    }
    assert_eq!(arena.world.damage_taken(UnitId(1)), 0);
    assert!(arena.simulation.missiles().find(own_mine).is_some());
}

#[test]
fn test_flame_shield_burns_neighbors_every_eight_ticks() {
    let mut world = GridWorld::new(12, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 1)));
    world.add_unit(soldier(2, 0, Vec2i::new(5, 4)));
    world.add_unit(soldier(3, 1, Vec2i::new(6, 4)));
    let mut arena = arena_with(world);

    let shield = arena.fire("flame_shield", UnitId(1), UnitId(2)).unwrap();
    arena.simulation.missiles_mut().find_mut(shield).unwrap().damage = 5;

    for _ in 0..7 {
        arena.tick();
    }
    assert_eq!(arena.world.damage_taken(UnitId(3)), 0);

    arena.tick();
    assert_eq!(arena.simulation.missiles().find(shield).unwrap().ttl, 592);
    assert_eq!(arena.world.damage_taken(UnitId(3)), 5);
    assert_eq!(arena.world.damage_taken(UnitId(2)), 0);
    assert_eq!(arena.world.damage_taken(UnitId(1)), 0);
}

#[test]
fn test_flame_shield_ends_with_its_target() {
    let mut world = GridWorld::new(12, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 1)));
    world.add_unit(soldier(2, 0, Vec2i::new(5, 4)));
    let mut arena = arena_with(world);

    let shield = arena.fire("flame_shield", UnitId(1), UnitId(2)).unwrap();
    arena.tick();
    assert!(arena.simulation.missiles().find(shield).is_some());

    arena.world.remove_unit(UnitId(2));
    arena.tick();
    assert!(arena.simulation.missiles().find(shield).is_none());
}

fn burning_building(hit_points: i32) -> (Arena, MissileId) {
    let mut world = GridWorld::new(12, 9);
    world.add_unit(building(20, 0, Vec2i::new(5, 4), 2));
    let mut arena = arena_with(world);
    set_hit_points(&mut arena, UnitId(20), hit_points);

    let small_fire = arena.database.missile_types.find("small_fire").unwrap();
    let center = arena.world.unit_state(UnitId(20)).unwrap().center_pixel();
    let fire = arena
        .simulation
        .missiles_mut()
        .make_missile(&arena.database, &mut arena.media, small_fire, center, center, 0)
        .unwrap();
    fire.source_unit = Some(UnitId(20));
    let id = fire.id;
    (arena, id)
}

#[test]
fn test_fire_follows_building_damage() {
    let (mut arena, fire) = burning_building(100);
    let big_fire = arena.database.missile_types.find("big_fire").unwrap();
    arena.tick();
    arena.tick();
    assert_eq!(arena.simulation.missiles().find(fire).unwrap().missile_type, big_fire);

    let (mut arena, fire) = burning_building(200);
    let small_fire = arena.database.missile_types.find("small_fire").unwrap();
    arena.tick();
    arena.tick();
    assert_eq!(arena.simulation.missiles().find(fire).unwrap().missile_type, small_fire);
}

#[test]
fn test_fire_goes_out_on_repaired_building() {
    let (mut arena, fire) = burning_building(320);
    arena.tick();
    arena.tick();
    assert!(arena.simulation.missiles().find(fire).is_none());
}

#[test]
fn test_missiles_survive_source_death() {
    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(9, 4)));
    let mut arena = arena_with(world);

    let bolt = arena.fire("bolt", UnitId(1), UnitId(2)).unwrap();
    arena.tick();
    arena.world.remove_unit(UnitId(1));
    arena.run_until_idle(100);

    assert!(arena.simulation.missiles().find(bolt).is_none());
    assert_eq!(arena.world.damage_taken(UnitId(2)), 0);
}

#[test]
fn test_save_and_restore_mid_flight() {
    let build = || {
        let mut world = GridWorld::new(16, 9);
        world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
        world.add_unit(soldier(2, 1, Vec2i::new(12, 4)));
        world.add_unit(soldier(3, 1, Vec2i::new(12, 6)));
        let mut arena = arena_with(world);
        arena.fire("arrow", UnitId(1), UnitId(2)).unwrap();
        arena.fire("fireball", UnitId(1), UnitId(3)).unwrap();
        arena
    };

    let mut original = build();
    for _ in 0..5 {
        original.tick();
    }
    let bytes = original.simulation.serialize(&original.database).unwrap();

    let mut restored = build();
    restored.simulation = Simulation::deserialize(&bytes, &restored.database).unwrap();
    restored.world = original.world.clone();
    assert_eq!(restored.state_hash(), original.state_hash());

    original.run_until_idle(200);
    restored.run_until_idle(200);
    assert_eq!(restored.state_hash(), original.state_hash());
    assert_eq!(restored.world.damage_log, original.world.damage_log);
}

#[test]
fn test_clear_all_wipes_content() {
    let mut database = combat_database().unwrap();
    database.clear_all();
    assert!(database.missile_types.is_empty());
    assert!(database.terrain_types.is_empty());
}
