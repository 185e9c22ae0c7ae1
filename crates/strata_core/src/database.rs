//! Content database and load orchestration.
//!
//! The [`Database`] owns one [`DataType`] store per content type plus the
//! module store. Loading runs every registered content type through the
//! same phases, in dependency order:
//!
//! ```text
//! parse (per module, in module order) → define → populate → initialize → check
//! ```
//!
//! Check failures do not abort the load. They are collected in the
//! [`LoadReport`] and the caller decides whether to go on.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::content::{
    sort_modules, Age, Font, Module, Resource, Season, TerrainType, World, MODULE_MANIFEST,
};
use crate::data::DataSection;
use crate::error::{GameError, Result};
use crate::missile::MissileType;
use crate::registry::{sort_data_types, DataType, DataTypeDescriptor, Handle};

/// Every content store.
#[derive(Debug)]
pub struct Database {
    /// Data packages.
    pub modules: DataType<Module>,
    /// Economic resources.
    pub resources: DataType<Resource>,
    /// Seasons.
    pub seasons: DataType<Season>,
    /// Terrain types.
    pub terrain_types: DataType<TerrainType>,
    /// Ages.
    pub ages: DataType<Age>,
    /// Worlds.
    pub worlds: DataType<World>,
    /// Fonts.
    pub fonts: DataType<Font>,
    /// Missile templates.
    pub missile_types: DataType<MissileType>,
    data_types: Vec<DataTypeDescriptor>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`Database::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Identifiers of the loaded modules, in load order.
    pub modules: Vec<String>,
    /// Live instance count per content type, in processing order.
    pub instance_counts: Vec<(&'static str, usize)>,
    /// Per-instance check failures.
    pub errors: Vec<GameError>,
}

impl LoadReport {
    /// Whether every instance passed its checks.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Instance count for one content type.
    #[must_use]
    pub fn instance_count(&self, type_name: &str) -> usize {
        self.instance_counts
            .iter()
            .find(|(name, _)| *name == type_name)
            .map_or(0, |(_, count)| *count)
    }
}

impl Database {
    /// Create an empty database with every content type registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: DataType::new(),
            resources: DataType::new(),
            seasons: DataType::new(),
            terrain_types: DataType::new(),
            ages: DataType::new(),
            worlds: DataType::new(),
            fonts: DataType::new(),
            missile_types: DataType::new(),
            data_types: vec![
                DataTypeDescriptor::of::<Resource>(),
                DataTypeDescriptor::of::<Season>(),
                DataTypeDescriptor::of::<World>(),
                DataTypeDescriptor::of::<TerrainType>(),
                DataTypeDescriptor::of::<Age>(),
                DataTypeDescriptor::of::<Font>(),
                DataTypeDescriptor::of::<MissileType>(),
            ],
        }
    }

    /// Registered content types in registration order.
    #[must_use]
    pub fn data_types(&self) -> &[DataTypeDescriptor] {
        &self.data_types
    }

    /// Register a module programmatically.
    pub fn add_module(
        &mut self,
        identifier: &str,
        path: impl Into<PathBuf>,
        dependencies: &[&str],
    ) -> Result<Handle<Module>> {
        let handle = self.modules.add(identifier, None)?;
        if let Some(module) = self.modules.entry_mut(handle) {
            module.path = path.into();
            module.dependency_identifiers = dependencies.iter().map(|d| (*d).to_string()).collect();
            module.set_defined();
        }
        Ok(handle)
    }

    /// Register every module found under `root`.
    ///
    /// A module is a subfolder containing a `module.ron` manifest with a
    /// single section; its tag is the module identifier. Folders without a
    /// manifest are ignored, broken manifests are reported and skipped.
    pub fn discover_modules(&mut self, root: &Path) -> Result<Vec<Handle<Module>>> {
        let entries = fs::read_dir(root).map_err(|source| GameError::Io {
            path: root.display().to_string(),
            source,
        })?;

        let mut folders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| GameError::Io {
                path: root.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.join(MODULE_MANIFEST).is_file() {
                folders.push(path);
            }
        }
        folders.sort();

        let mut manifests = Vec::new();
        for folder in folders {
            match read_manifest(&folder.join(MODULE_MANIFEST)) {
                Ok(section) => manifests.push((folder, section)),
                Err(e) => tracing::warn!("Skipping module in {}: {e}", folder.display()),
            }
        }

        let tags: Vec<(String, PathBuf)> = manifests
            .iter()
            .map(|(folder, section)| (section.tag.clone(), folder.clone()))
            .collect();
        self.modules
            .buffer_sections(None, manifests.into_iter().map(|(_, s)| s).collect());
        self.modules.process_database(true)?;
        self.modules.process_database(false)?;

        let mut handles = Vec::with_capacity(tags.len());
        for (tag, folder) in tags {
            let Some(handle) = self.modules.find(&tag) else {
                continue;
            };
            if let Some(module) = self.modules.entry_mut(handle) {
                module.path = if module.path.as_os_str().is_empty() {
                    folder
                } else {
                    folder.join(&module.path)
                };
            }
            handles.push(handle);
        }

        tracing::info!("Discovered {} module(s) in {}", handles.len(), root.display());
        Ok(handles)
    }

    /// Load content from the given modules and everything they depend on.
    ///
    /// An empty list loads every registered module.
    pub fn load(&mut self, modules: &[&str]) -> Result<LoadReport> {
        DataType::<Module>::initialize_all(self)?;

        let mut requested = Vec::new();
        if modules.is_empty() {
            requested.extend(self.modules.handles());
        } else {
            for identifier in modules {
                let handle = self.modules.resolve(identifier)?.ok_or_else(|| {
                    GameError::NotFound {
                        type_name: "module",
                        identifier: (*identifier).to_string(),
                    }
                })?;
                self.collect_with_dependencies(handle, &mut requested);
            }
        }

        let order = sort_modules(&self.modules, &requested)?;
        let data_types = sort_data_types(&self.data_types)?;

        let module_paths: Vec<(Handle<Module>, String, PathBuf)> = order
            .iter()
            .filter_map(|&h| {
                self.modules
                    .entry(h)
                    .map(|m| (h, m.identifier().to_string(), m.path.clone()))
            })
            .collect();
        tracing::info!(
            "Loading modules: {}",
            module_paths
                .iter()
                .map(|(_, id, _)| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        for data_type in &data_types {
            for (module, _, path) in &module_paths {
                (data_type.parse)(self, path, Some(*module))?;
            }
        }

        tracing::info!("Defining instances");
        for data_type in &data_types {
            (data_type.process)(self, true)?;
        }

        tracing::info!("Processing instances");
        for data_type in &data_types {
            (data_type.process)(self, false)?;
        }

        tracing::info!("Initializing instances");
        for data_type in &data_types {
            (data_type.initialize)(self)?;
        }

        tracing::info!("Checking instances");
        let mut report = LoadReport {
            modules: module_paths.into_iter().map(|(_, id, _)| id).collect(),
            ..LoadReport::default()
        };
        for data_type in &data_types {
            let errors = (data_type.check)(self);
            for error in &errors {
                tracing::warn!("{error}");
            }
            report.errors.extend(errors);
            report
                .instance_counts
                .push((data_type.name, (data_type.count)(self)));
        }

        tracing::info!(
            "Loaded content with {} check error(s)",
            report.errors.len()
        );
        Ok(report)
    }

    /// Discover modules under the configured data root and load them.
    ///
    /// With `strict_checks`, the first check failure becomes the error.
    pub fn load_from_config(&mut self, config: &EngineConfig) -> Result<LoadReport> {
        self.discover_modules(&config.data_root)?;
        let modules: Vec<&str> = config.modules.iter().map(String::as_str).collect();
        let mut report = self.load(&modules)?;

        if config.strict_checks && !report.errors.is_empty() {
            return Err(report.errors.swap_remove(0));
        }
        Ok(report)
    }

    /// Wipe every content type, keeping the registered modules.
    pub fn clear_all(&mut self) {
        for data_type in self.data_types.clone() {
            (data_type.clear)(self);
        }
        tracing::debug!("Cleared all content");
    }

    fn collect_with_dependencies(&self, module: Handle<Module>, out: &mut Vec<Handle<Module>>) {
        if out.contains(&module) {
            return;
        }
        out.push(module);
        if let Some(entry) = self.modules.entry(module) {
            for &dependency in &entry.dependencies {
                self.collect_with_dependencies(dependency, out);
            }
        }
    }
}

fn read_manifest(path: &Path) -> Result<DataSection> {
    let content = fs::read_to_string(path).map_err(|source| GameError::Io {
        path: path.display().to_string(),
        source,
    })?;

    ron::from_str(&content).map_err(|e| GameError::DataParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
