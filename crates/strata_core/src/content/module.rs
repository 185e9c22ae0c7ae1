//! Data modules and their load order.
//!
//! A module is a data package (the base game, an expansion, a mod) living
//! in its own folder. Modules may depend on other modules; a module's data
//! is always processed after the data of every module it depends on.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::data::{parse_identifier_list, DataOperator, DataProperty};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::registry::{unknown_property, DataEntry, DataType, Handle};

/// File describing a module inside its folder.
pub const MODULE_MANIFEST: &str = "module.ron";

/// A data package.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Display name.
    pub name: String,
    /// Folder holding the module's data.
    pub path: PathBuf,
    /// Identifiers of the modules this one depends on.
    pub dependency_identifiers: Vec<String>,
    /// Resolved direct dependencies.
    pub dependencies: Vec<Handle<Module>>,
}

impl DataEntry for Module {
    const TYPE_NAME: &'static str = "module";
    const DATABASE_FOLDER: &'static str = "modules";

    fn new(identifier: &str) -> Self {
        Self {
            name: identifier.to_string(),
            ..Self::default()
        }
    }

    fn process_property(&mut self, property: &DataProperty) -> Result<()> {
        match property.key.as_str() {
            "name" => self.name.clone_from(&property.value),
            "path" => self.path = PathBuf::from(&property.value),
            "dependencies" => {
                let identifiers = parse_identifier_list(&property.value);
                match property.operator {
                    DataOperator::Assignment => self.dependency_identifiers = identifiers,
                    DataOperator::Addition => self.dependency_identifiers.extend(identifiers),
                    DataOperator::Subtraction => self
                        .dependency_identifiers
                        .retain(|id| !identifiers.contains(id)),
                }
            }
            _ => return Err(unknown_property::<Self>(property)),
        }
        Ok(())
    }

    fn initialization_dependencies(&self) -> Vec<String> {
        self.dependency_identifiers.clone()
    }

    fn initialize(&mut self, database: &Database) -> Result<()> {
        self.dependencies.clear();
        for identifier in &self.dependency_identifiers {
            if let Some(handle) = database.modules.resolve(identifier)? {
                self.dependencies.push(handle);
            }
        }
        Ok(())
    }

    fn store(database: &Database) -> &DataType<Self> {
        &database.modules
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.modules
    }
}

/// Whether `module` depends on `other`, directly or transitively.
#[must_use]
pub fn depends_on(modules: &DataType<Module>, module: Handle<Module>, other: Handle<Module>) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![module];

    while let Some(current) = stack.pop() {
        let Some(entry) = modules.entry(current) else {
            continue;
        };
        for &dependency in &entry.dependencies {
            if dependency == other {
                return true;
            }
            if visited.insert(dependency) {
                stack.push(dependency);
            }
        }
    }

    false
}

/// Load-order comparator: dependencies first, then fewer direct
/// dependencies, then identifier.
///
/// Only a strict weak ordering while the dependency graph is acyclic; run
/// [`check_module_dependencies`] before relying on it.
#[must_use]
pub fn compare_modules(
    modules: &DataType<Module>,
    a: Handle<Module>,
    b: Handle<Module>,
) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    if depends_on(modules, a, b) {
        return Ordering::Greater;
    }
    if depends_on(modules, b, a) {
        return Ordering::Less;
    }

    let (Some(entry_a), Some(entry_b)) = (modules.entry(a), modules.entry(b)) else {
        return a.cmp(&b);
    };

    entry_a
        .dependencies
        .len()
        .cmp(&entry_b.dependencies.len())
        .then_with(|| entry_a.identifier().cmp(entry_b.identifier()))
}

/// Fail with [`GameError::CyclicDependency`] if any module reaches itself.
pub fn check_module_dependencies(modules: &DataType<Module>) -> Result<()> {
    for (handle, entry) in modules.iter() {
        if depends_on(modules, handle, handle) {
            return Err(GameError::CyclicDependency {
                kind: Module::TYPE_NAME,
                identifier: entry.identifier().to_string(),
            });
        }
    }
    Ok(())
}

/// Order a set of modules for loading.
///
/// Every module comes after everything it (transitively) depends on;
/// otherwise independent modules are ordered by [`compare_modules`]. The
/// result does not depend on the input order.
pub fn sort_modules(
    modules: &DataType<Module>,
    set: &[Handle<Module>],
) -> Result<Vec<Handle<Module>>> {
    check_module_dependencies(modules)?;

    let mut remaining: Vec<Handle<Module>> = set.to_vec();
    remaining.sort_unstable();
    remaining.dedup();

    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        // Ready: no remaining module is one of its dependencies.
        let next = remaining
            .iter()
            .enumerate()
            .filter(|&(_, &candidate)| {
                !remaining
                    .iter()
                    .any(|&other| other != candidate && depends_on(modules, candidate, other))
            })
            .min_by(|x, y| compare_modules(modules, *x.1, *y.1))
            .map(|(i, _)| i);

        let Some(i) = next else {
            // Unreachable with an acyclic graph.
            break;
        };
        ordered.push(remaining.remove(i));
    }

    Ok(ordered)
}
