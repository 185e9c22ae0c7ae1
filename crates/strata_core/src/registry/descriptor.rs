//! Per-content-type metadata used by the load orchestrator.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use super::{DataEntry, DataType, Handle};
use crate::content::Module;
use crate::database::Database;
use crate::error::{GameError, Result};

/// Phase functions and dependencies for one content type.
///
/// The orchestrator only sees descriptors, so adding a content type means
/// adding one store to [`Database`] and registering its descriptor.
#[derive(Clone, Copy)]
pub struct DataTypeDescriptor {
    /// Content type name.
    pub name: &'static str,
    /// Content types that must be processed first.
    pub dependencies: &'static [&'static str],
    /// Buffer the type's data files for one module.
    pub parse: fn(&mut Database, &Path, Option<Handle<Module>>) -> Result<()>,
    /// Definition (`true`) or population (`false`) pass.
    pub process: fn(&mut Database, bool) -> Result<()>,
    /// Post-load initialization of every instance.
    pub initialize: fn(&mut Database) -> Result<()>,
    /// Semantic validation of every instance.
    pub check: fn(&Database) -> Vec<GameError>,
    /// Wipe the type's store.
    pub clear: fn(&mut Database),
    /// Number of live instances.
    pub count: fn(&Database) -> usize,
}

impl DataTypeDescriptor {
    /// Descriptor for a [`DataEntry`] type.
    #[must_use]
    pub fn of<T: DataEntry>() -> Self {
        Self {
            name: T::TYPE_NAME,
            dependencies: T::DEPENDENCIES,
            parse: |db, path, module| T::store_mut(db).parse_database(path, module),
            process: |db, definition| T::store_mut(db).process_database(definition),
            initialize: DataType::<T>::initialize_all,
            check: DataType::<T>::check_all,
            clear: |db| T::store_mut(db).clear(),
            count: |db| T::store(db).len(),
        }
    }
}

impl std::fmt::Debug for DataTypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTypeDescriptor")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Order descriptors so every type comes after the types it depends on.
///
/// Independent types keep their registration order.
pub fn sort_data_types(descriptors: &[DataTypeDescriptor]) -> Result<Vec<DataTypeDescriptor>> {
    let index_of: HashMap<&str, usize> = descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name, i))
        .collect();

    let mut in_degree = vec![0usize; descriptors.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); descriptors.len()];
    for (i, descriptor) in descriptors.iter().enumerate() {
        for dependency in descriptor.dependencies {
            let &d = index_of
                .get(dependency)
                .ok_or_else(|| GameError::UnknownDataType {
                    dependent: descriptor.name,
                    dependency: (*dependency).to_string(),
                })?;
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..descriptors.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut ordered = Vec::with_capacity(descriptors.len());

    while let Some(i) = ready.pop_front() {
        ordered.push(descriptors[i]);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if ordered.len() < descriptors.len() {
        let stuck = (0..descriptors.len())
            .find(|&i| in_degree[i] > 0)
            .map_or("", |i| descriptors[i].name);
        return Err(GameError::CyclicDependency {
            kind: "data type",
            identifier: stuck.to_string(),
        });
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake(name: &'static str, dependencies: &'static [&'static str]) -> DataTypeDescriptor {
        DataTypeDescriptor {
            name,
            dependencies,
            parse: |_, _, _| Ok(()),
            process: |_, _| Ok(()),
            initialize: |_| Ok(()),
            check: |_| Vec::new(),
            clear: |_| {},
            count: |_| 0,
        }
    }

    fn names(descriptors: &[DataTypeDescriptor]) -> Vec<&'static str> {
        descriptors.iter().map(|d| d.name).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let sorted = sort_data_types(&[
            fake("world", &["terrain_type", "season"]),
            fake("terrain_type", &["resource", "season"]),
            fake("resource", &[]),
            fake("season", &[]),
        ])
        .unwrap();
        assert_eq!(
            names(&sorted),
            vec!["resource", "season", "terrain_type", "world"]
        );
    }

    #[test]
    fn test_independent_types_keep_registration_order() {
        let sorted =
            sort_data_types(&[fake("font", &[]), fake("age", &[]), fake("missile_type", &[])])
                .unwrap();
        assert_eq!(names(&sorted), vec!["font", "age", "missile_type"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = sort_data_types(&[fake("a", &["b"]), fake("b", &["a"])]).unwrap_err();
        assert!(matches!(err, GameError::CyclicDependency { kind: "data type", .. }));
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let err = sort_data_types(&[fake("a", &["ghost"])]).unwrap_err();
        assert!(matches!(err, GameError::UnknownDataType { dependent: "a", .. }));
    }
}
