//! Loading content from module folders on disk.

use std::path::Path;

use strata_core::battlefield::UnitId;
use strata_core::config::{CombatRules, EngineConfig};
use strata_core::data::{DataOperator, DataSection};
use strata_core::database::{Database, LoadReport};
use strata_core::error::{GameError, Result};
use strata_core::math::Vec2i;
use strata_core::registry::ALIASES_KEY;
use strata_test_utils::arena::{Arena, GridWorld};
use strata_test_utils::fixtures::{archer, soldier, write_module};

fn write_base(root: &Path) {
    write_module(
        root,
        "base",
        &[],
        &[(
            "missile_types",
            vec![
                DataSection::new("arrow")
                    .with_property("class", "point_to_point")
                    .with_property("size", "32 32")
                    .with_property("speed", "16"),
                DataSection::new("explosion")
                    .with_property("class", "stay")
                    .with_property("sprite_frames", "4"),
            ],
        )],
    )
    .unwrap();
}

fn write_expansion(root: &Path, impact: &str) {
    write_module(
        root,
        "expansion",
        &["base"],
        &[(
            "missile_types",
            vec![
                DataSection::new("fireball")
                    .with_operator_property(ALIASES_KEY, DataOperator::Addition, "fire_bolt")
                    .with_property("class", "point_to_point")
                    .with_property("size", "32 32")
                    .with_property("speed", "16")
                    .with_property("damage", "40")
                    .with_property("impact", impact),
                DataSection::new("arrow")
                    .with_operator(DataOperator::Addition)
                    .with_operator_property(ALIASES_KEY, DataOperator::Addition, "shaft")
                    .with_property("speed", "24"),
            ],
        )],
    )
    .unwrap();
}

fn load(root: &Path, modules: &[&str]) -> Result<(Database, LoadReport)> {
    let mut database = Database::new();
    database.discover_modules(root)?;
    let report = database.load(modules)?;
    Ok((database, report))
}

#[test]
fn test_later_module_extends_earlier_one() {
    let root = tempfile::tempdir().unwrap();
    write_base(root.path());
    write_expansion(root.path(), "explosion");

    let (database, report) = load(root.path(), &["expansion"]).unwrap();
    assert_eq!(report.modules, vec!["base".to_string(), "expansion".to_string()]);
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(report.instance_count("missile_type"), 3);

    let arrow = database.missile_types.find("arrow").unwrap();
    assert_eq!(database.missile_types.find("shaft"), Some(arrow));
    assert_eq!(database.missile_types.entry(arrow).unwrap().speed, 24);

    let fireball = database.missile_types.get("fire_bolt").unwrap().unwrap();
    assert_eq!(fireball.identifier(), "fireball");
    let explosion = database.missile_types.find("explosion").unwrap();
    assert_eq!(fireball.impacts, vec![explosion]);
    assert!(fireball.is_initialized());
}

#[test]
fn test_loading_only_a_dependency() {
    let root = tempfile::tempdir().unwrap();
    write_base(root.path());
    write_expansion(root.path(), "explosion");

    let (database, report) = load(root.path(), &["base"]).unwrap();
    assert_eq!(report.modules, vec!["base".to_string()]);
    assert!(database.missile_types.find("fireball").is_none());
    assert_eq!(
        database.missile_types.try_get("arrow").map(|arrow| arrow.speed),
        Some(16)
    );
}

#[test]
fn test_missing_reference_fails_initialization() {
    let root = tempfile::tempdir().unwrap();
    write_base(root.path());
    write_expansion(root.path(), "ghost");

    let error = load(root.path(), &[]).unwrap_err();
    assert!(error.to_string().contains("ghost"), "{error}");
}

#[test]
fn test_extending_unknown_instance_fails() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "base",
        &[],
        &[(
            "missile_types",
            vec![DataSection::new("phantom")
                .with_operator(DataOperator::Addition)
                .with_property("speed", "8")],
        )],
    )
    .unwrap();

    assert!(matches!(load(root.path(), &[]), Err(GameError::NotFound { .. })));
}

#[test]
fn test_cyclic_modules_are_rejected() {
    let root = tempfile::tempdir().unwrap();
    write_module(root.path(), "north", &["south"], &[]).unwrap();
    write_module(root.path(), "south", &["north"], &[]).unwrap();

    assert!(matches!(
        load(root.path(), &[]),
        Err(GameError::CyclicDependency { kind: "module", .. })
    ));
}

#[test]
fn test_check_failures_are_collected_or_fatal() {
    let root = tempfile::tempdir().unwrap();
    write_module(
        root.path(),
        "base",
        &[],
        &[(
            "missile_types",
            vec![
                DataSection::new("stuck").with_property("sleep", "0"),
                DataSection::new("backwards").with_property("speed", "-4"),
            ],
        )],
    )
    .unwrap();

    let (_, report) = load(root.path(), &[]).unwrap();
    assert_eq!(report.errors.len(), 2);
    assert!(!report.is_clean());

    let config = EngineConfig {
        data_root: root.path().to_path_buf(),
        strict_checks: true,
        ..EngineConfig::default()
    };
    let error = Database::new().load_from_config(&config).unwrap_err();
    assert!(matches!(error, GameError::Instance { .. }));
}

#[test]
fn test_loaded_content_drives_the_simulation() {
    let root = tempfile::tempdir().unwrap();
    write_base(root.path());
    write_expansion(root.path(), "explosion");
    let (database, _) = load(root.path(), &[]).unwrap();

    let mut world = GridWorld::new(16, 9);
    world.add_unit(archer(1, 0, Vec2i::new(1, 4)));
    world.add_unit(soldier(2, 1, Vec2i::new(8, 4)));
    let mut arena = Arena::new(database, world, 11, CombatRules::default());

    arena.fire("fire_bolt", UnitId(1), UnitId(2)).unwrap();
    arena.run_until_idle(200);

    assert_eq!(arena.world.damage_taken(UnitId(2)), 40);
    assert_eq!(arena.simulation.missiles().missile_count(), 0);
}
