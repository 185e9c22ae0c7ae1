//! Missile sweep benchmarks.
//!
//! Run with: `cargo bench -p strata_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use strata_core::battlefield::UnitId;
use strata_core::config::CombatRules;
use strata_core::math::Vec2i;
use strata_test_utils::arena::{Arena, GridWorld};
use strata_test_utils::determinism::volley_scenario;
use strata_test_utils::fixtures::{archer, combat_database, soldier};

/// Forty archers each firing at the soldier across the field.
fn crowded_field() -> Arena {
    let mut world = GridWorld::new(64, 40);
    for row in 0..40 {
        world.add_unit(archer(row as u32 + 1, 0, Vec2i::new(1, row)));
        world.add_unit(soldier(row as u32 + 101, 1, Vec2i::new(60, row)));
    }
    let database = combat_database().expect("fixture content loads");
    let mut arena = Arena::new(database, world, 42, CombatRules::default());
    for row in 0..40u32 {
        let missile = if row % 4 == 0 { "fireball" } else { "arrow" };
        arena
            .fire(missile, UnitId(row + 1), UnitId(row + 101))
            .expect("fixture missile fires");
    }
    arena
}

pub fn missile_benchmark(c: &mut Criterion) {
    c.bench_function("volley_until_idle", |b| {
        b.iter_batched(
            || volley_scenario(7),
            |mut arena| black_box(arena.run_until_idle(300)),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("crowded_field_tick", |b| {
        b.iter_batched(
            crowded_field,
            |mut arena| {
                for _ in 0..10 {
                    arena.tick();
                }
                black_box(arena.simulation.missiles().missile_count())
            },
            BatchSize::SmallInput,
        )
    });

    let arena = crowded_field();
    c.bench_function("state_hash", |b| b.iter(|| black_box(arena.state_hash())));
}

criterion_group!(benches, missile_benchmark);
criterion_main!(benches);
