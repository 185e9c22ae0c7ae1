//! Data validation utilities.

use std::path::Path;

use strata_core::config::EngineConfig;
use strata_core::database::{Database, LoadReport};
use strata_core::error::{GameError, Result};

/// Load every module under `path` (or only `modules` and their
/// dependencies) and return the load report.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, no module is found,
/// or a pipeline phase aborts. Per-instance check failures are reported,
/// not returned.
pub fn validate_data_directory(path: &Path, modules: &[String]) -> Result<LoadReport> {
    let config = EngineConfig {
        data_root: path.to_path_buf(),
        modules: modules.to_vec(),
        ..EngineConfig::default()
    };
    validate_config(&config)
}

/// Run the full content pipeline described by a configuration.
///
/// # Errors
///
/// As [`validate_data_directory`]; with `strict_checks` the first check
/// failure is returned as the error.
pub fn validate_config(config: &EngineConfig) -> Result<LoadReport> {
    let mut database = Database::new();
    let report = database.load_from_config(config)?;
    if report.modules.is_empty() {
        return Err(GameError::Validation(format!(
            "No modules found in {}",
            config.data_root.display()
        )));
    }
    Ok(report)
}

/// Human-readable summary of a load report.
#[must_use]
pub fn format_report(report: &LoadReport) -> String {
    let mut lines = vec![format!("Modules: {}", report.modules.join(", "))];
    for (type_name, count) in &report.instance_counts {
        if *count > 0 {
            lines.push(format!("  {type_name}: {count}"));
        }
    }
    if report.is_clean() {
        lines.push("All checks passed".to_string());
    } else {
        lines.push(format!("{} check error(s):", report.errors.len()));
        lines.extend(report.errors.iter().map(|e| format!("  {e}")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::data::DataSection;
    use strata_test_utils::fixtures::write_module;

    #[test]
    fn test_valid_directory_passes() {
        let root = tempfile::tempdir().unwrap();
        write_module(
            root.path(),
            "base",
            &[],
            &[(
                "missile_types",
                vec![DataSection::new("arrow")
                    .with_property("class", "point_to_point")
                    .with_property("speed", "16")],
            )],
        )
        .unwrap();

        let report = validate_data_directory(root.path(), &[]).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.instance_count("missile_type"), 1);
        assert!(format_report(&report).contains("missile_type: 1"));
    }

    #[test]
    fn test_check_failures_are_listed() {
        let root = tempfile::tempdir().unwrap();
        write_module(
            root.path(),
            "base",
            &[],
            &[(
                "missile_types",
                vec![DataSection::new("stuck").with_property("sleep", "0")],
            )],
        )
        .unwrap();

        let report = validate_data_directory(root.path(), &[]).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(format_report(&report).contains("stuck"));
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_data_directory(root.path(), &[]),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn test_strict_checks_fail_fast() {
        let root = tempfile::tempdir().unwrap();
        write_module(
            root.path(),
            "base",
            &[],
            &[(
                "missile_types",
                vec![DataSection::new("stuck").with_property("sleep", "0")],
            )],
        )
        .unwrap();

        let config = EngineConfig {
            data_root: root.path().to_path_buf(),
            strict_checks: true,
            ..EngineConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
