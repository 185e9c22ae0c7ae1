//! Damage resolution properties.

use proptest::prelude::*;
use strata_core::battlefield::{PlayerId, UnitId};
use strata_core::combat::{
    calculate_damage, calculate_hit, AccuracyMode, CombatUnit, MissileModifiers, UnitStats, UnitVariable,
};
use strata_core::config::CombatRules;
use strata_core::math::Vec2i;
use strata_core::rng::SyncRng;
use strata_test_utils::determinism::strategies::{arb_attacker_stats, arb_defender_stats, arb_seed};

fn attacker(stats: UnitStats) -> CombatUnit {
    let mut unit = CombatUnit::new(UnitId(1), PlayerId(0), Vec2i::new(0, 0));
    unit.stats = stats;
    unit
}

fn damage(attacker: &CombatUnit, defender: &UnitStats, rules: &CombatRules, seed: u64) -> i32 {
    calculate_damage(
        attacker,
        defender,
        None,
        None,
        AccuracyMode::ResolvedByHitRoll,
        rules,
        &mut SyncRng::new(seed),
    )
}

fn critical_damage(attacker: &CombatUnit, always_critical: bool, rules: &CombatRules, rng: &mut SyncRng) -> i32 {
    let missile = MissileModifiers {
        always_critical,
        reduce_factor: 100,
        ..MissileModifiers::default()
    };
    calculate_damage(
        attacker,
        &UnitStats::new(),
        None,
        Some(&missile),
        AccuracyMode::ResolvedByHitRoll,
        rules,
        rng,
    )
}

#[test]
fn test_forced_critical_still_rolls_once() {
    let rules = CombatRules::default();
    let forced = attacker(UnitStats::new().with(UnitVariable::BasicDamage, 10));
    let certain = attacker(
        UnitStats::new()
            .with(UnitVariable::BasicDamage, 10)
            .with(UnitVariable::CriticalStrikeChance, 100),
    );

    let mut forced_rng = SyncRng::new(5);
    let mut certain_rng = SyncRng::new(5);
    let forced_damage = critical_damage(&forced, true, &rules, &mut forced_rng);
    let certain_damage = critical_damage(&certain, false, &rules, &mut certain_rng);

    assert_eq!(forced_rng.draws(), 2);
    assert_eq!(forced_rng, certain_rng);
    assert_eq!(forced_damage, certain_damage);
}

#[test]
fn test_forced_critical_without_randomness_adds_only_the_chance() {
    let rules = CombatRules { no_randomness: true, god_mode_player: None };
    let unit = attacker(UnitStats::new().with(UnitVariable::BasicDamage, 10));

    let mut rng = SyncRng::new(5);
    let forced = critical_damage(&unit, true, &rules, &mut rng);
    let plain = critical_damage(&unit, false, &rules, &mut rng);

    assert_eq!(forced, 7);
    assert_eq!(forced, plain);
    assert_eq!(rng.draws(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_damage_is_never_negative(
        attack in arb_attacker_stats(),
        defense in arb_defender_stats(),
        seed in arb_seed(),
    ) {
        let rules = CombatRules::default();
        prop_assert!(damage(&attacker(attack), &defense, &rules, seed) >= 0);
    }

    #[test]
    fn test_same_seed_same_damage(
        attack in arb_attacker_stats(),
        defense in arb_defender_stats(),
        seed in arb_seed(),
    ) {
        let rules = CombatRules::default();
        let unit = attacker(attack);
        prop_assert_eq!(damage(&unit, &defense, &rules, seed), damage(&unit, &defense, &rules, seed));
    }

    #[test]
    fn test_more_armor_never_helps_the_attacker(
        attack in arb_attacker_stats(),
        defense in arb_defender_stats(),
        extra in 0i32..20,
    ) {
        let rules = CombatRules { no_randomness: true, god_mode_player: None };
        let unit = attacker(attack);
        let mut armored = defense.clone();
        armored.set(UnitVariable::Armor, defense.value(UnitVariable::Armor) + extra);
        prop_assert!(damage(&unit, &armored, &rules, 0) <= damage(&unit, &defense, &rules, 0));
    }

    #[test]
    fn test_hit_roll_draws_at_most_twice(
        attack in arb_attacker_stats(),
        defense in arb_defender_stats(),
        seed in arb_seed(),
    ) {
        let mut rng = SyncRng::new(seed);
        calculate_hit(&attacker(attack), &defense, None, &CombatRules::default(), &mut rng);
        prop_assert!(rng.draws() <= 2);
    }
}
