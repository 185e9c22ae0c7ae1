//! Generic identifier registry for content types.
//!
//! Every content type (resource, terrain type, missile type, …) gets one
//! [`DataType`] store owned by the [`Database`]. The store keeps instances in
//! insertion order, resolves identifiers and aliases, and drives the
//! two-pass data pipeline:
//!
//! 1. **Definition** creates instances (or looks them up for `+=` sections)
//!    and registers aliases.
//! 2. **Population** feeds each buffered section body into its instance.
//!
//! Initialization and checking need access to other content types, so they
//! run through [`DataType::initialize_all`] and [`DataType::check_all`],
//! which take the whole database.

mod descriptor;
mod handle;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;

pub use descriptor::{sort_data_types, DataTypeDescriptor};
pub use handle::Handle;

use crate::content::Module;
use crate::data::{parse_identifier_list, read_data_folder, DataOperator, DataProperty, DataSection};
use crate::database::Database;
use crate::error::{GameError, LoadPhase, Result};

/// Identifier meaning "no instance".
pub const NONE_IDENTIFIER: &str = "none";

/// Property key used to declare extra aliases in a section.
pub const ALIASES_KEY: &str = "aliases";

/// Contract every content type implements to live in a [`DataType`] store.
pub trait DataEntry: Sized + 'static {
    /// Content type name used in diagnostics.
    const TYPE_NAME: &'static str;
    /// Folder under each module's path holding this type's data files.
    const DATABASE_FOLDER: &'static str;
    /// Content types that must be processed before this one.
    const DEPENDENCIES: &'static [&'static str] = &[];

    /// Construct a fresh, unpopulated instance.
    fn new(identifier: &str) -> Self;

    /// Apply one property from a section body.
    ///
    /// Return [`GameError::Configuration`] for unknown or malformed
    /// properties; the caller logs it and moves on.
    fn process_property(&mut self, property: &DataProperty) -> Result<()>;

    /// Apply one nested section from a section body.
    fn process_section(&mut self, section: &DataSection) -> Result<()> {
        Err(unknown_section::<Self>(section))
    }

    /// Same-type identifiers that must be initialized before this instance.
    fn initialization_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// One-time post-load setup, e.g. resolving identifiers into handles.
    ///
    /// While this runs, the instance itself is detached from its store:
    /// its handle and identifier still resolve, but its entry does not.
    fn initialize(&mut self, _database: &Database) -> Result<()> {
        Ok(())
    }

    /// Semantic validation after everything is initialized.
    fn check(&self, _database: &Database) -> Result<()> {
        Ok(())
    }

    /// This type's store inside the database.
    fn store(database: &Database) -> &DataType<Self>;

    /// This type's store inside the database, mutably.
    fn store_mut(database: &mut Database) -> &mut DataType<Self>;
}

/// Diagnostic for a property key the content type does not understand.
#[must_use]
pub fn unknown_property<T: DataEntry>(property: &DataProperty) -> GameError {
    GameError::configuration(format!(
        "Invalid {} property: \"{}\"",
        T::TYPE_NAME,
        property.key
    ))
}

/// Diagnostic for a section tag the content type does not understand.
#[must_use]
pub fn unknown_section<T: DataEntry>(section: &DataSection) -> GameError {
    GameError::configuration(format!(
        "Invalid {} section: \"{}\"",
        T::TYPE_NAME,
        section.tag
    ))
}

/// A registered instance together with its registry bookkeeping.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    identifier: String,
    aliases: Vec<String>,
    module: Option<Handle<Module>>,
    defined: bool,
    initialized: bool,
    data: T,
}

impl<T> Entry<T> {
    /// Primary identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Alternate identifiers resolving to this instance.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Module that defined this instance.
    #[must_use]
    pub const fn module(&self) -> Option<Handle<Module>> {
        self.module
    }

    /// Whether the population pass has filled this instance.
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        self.defined
    }

    /// Whether post-load initialization has run.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mark the instance as populated.
    pub fn set_defined(&mut self) {
        self.defined = true;
    }

    /// Mark the instance as initialized without running its setup.
    pub fn set_initialized(&mut self) {
        self.initialized = true;
    }
}

impl<T> Deref for Entry<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Entry<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

/// Store of all instances of one content type.
#[derive(Debug, Clone)]
pub struct DataType<T> {
    /// Slots in insertion order; removed instances leave `None`.
    entries: Vec<Option<Entry<T>>>,
    by_identifier: HashMap<String, Handle<T>>,
    by_alias: HashMap<String, Handle<T>>,
    /// Sections read by `parse_database`, waiting for `process_database`.
    buffered: Vec<(Option<Handle<Module>>, DataSection)>,
}

impl<T> Default for DataType<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_identifier: HashMap::new(),
            by_alias: HashMap::new(),
            buffered: Vec::new(),
        }
    }
}

impl<T: DataEntry> DataType<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an identifier (primary map first, then aliases). Never fails.
    #[must_use]
    pub fn find(&self, identifier: &str) -> Option<Handle<T>> {
        self.by_identifier
            .get(identifier)
            .or_else(|| self.by_alias.get(identifier))
            .copied()
    }

    /// Resolve an identifier that is required to exist.
    ///
    /// Empty and `"none"` identifiers mean "no instance" and yield `None`.
    pub fn resolve(&self, identifier: &str) -> Result<Option<Handle<T>>> {
        if identifier.is_empty() || identifier == NONE_IDENTIFIER {
            return Ok(None);
        }

        self.find(identifier)
            .map(Some)
            .ok_or_else(|| GameError::NotFound {
                type_name: T::TYPE_NAME,
                identifier: identifier.to_string(),
            })
    }

    /// Look up an instance that is required to exist.
    pub fn get(&self, identifier: &str) -> Result<Option<&Entry<T>>> {
        Ok(self.resolve(identifier)?.and_then(|h| self.entry(h)))
    }

    /// Look up an instance, returning `None` on a miss.
    #[must_use]
    pub fn try_get(&self, identifier: &str) -> Option<&Entry<T>> {
        self.find(identifier).and_then(|h| self.entry(h))
    }

    /// Whether an identifier resolves through either map.
    #[must_use]
    pub fn exists(&self, identifier: &str) -> bool {
        self.find(identifier).is_some()
    }

    /// Entry behind a handle.
    #[must_use]
    pub fn entry(&self, handle: Handle<T>) -> Option<&Entry<T>> {
        self.entries.get(handle.index()).and_then(Option::as_ref)
    }

    /// Mutable entry behind a handle.
    pub fn entry_mut(&mut self, handle: Handle<T>) -> Option<&mut Entry<T>> {
        self.entries.get_mut(handle.index()).and_then(Option::as_mut)
    }

    /// Register a new instance.
    ///
    /// Identifiers containing `_` or `-` also get the swapped spelling as an
    /// alias, unless that spelling is already taken.
    pub fn add(&mut self, identifier: &str, module: Option<Handle<Module>>) -> Result<Handle<T>> {
        if identifier.is_empty() {
            return Err(GameError::EmptyIdentifier {
                type_name: T::TYPE_NAME,
            });
        }

        if identifier == NONE_IDENTIFIER || self.exists(identifier) {
            return Err(GameError::DuplicateIdentifier {
                type_name: T::TYPE_NAME,
                identifier: identifier.to_string(),
            });
        }

        let handle = Handle::new(self.entries.len());
        self.entries.push(Some(Entry {
            identifier: identifier.to_string(),
            aliases: Vec::new(),
            module,
            defined: false,
            initialized: false,
            data: T::new(identifier),
        }));
        self.by_identifier.insert(identifier.to_string(), handle);

        if let Some(alias) = swapped_alias(identifier) {
            if !self.exists(&alias) {
                self.add_instance_alias(handle, &alias)?;
            }
        }

        Ok(handle)
    }

    /// Return the existing instance or register a new one.
    pub fn get_or_add(
        &mut self,
        identifier: &str,
        module: Option<Handle<Module>>,
    ) -> Result<Handle<T>> {
        match self.find(identifier) {
            Some(handle) => Ok(handle),
            None => self.add(identifier, module),
        }
    }

    /// Register an extra identifier for an existing instance.
    pub fn add_instance_alias(&mut self, handle: Handle<T>, alias: &str) -> Result<()> {
        if alias.is_empty() {
            return Err(GameError::EmptyIdentifier {
                type_name: T::TYPE_NAME,
            });
        }

        if alias == NONE_IDENTIFIER || self.exists(alias) {
            return Err(GameError::DuplicateIdentifier {
                type_name: T::TYPE_NAME,
                identifier: alias.to_string(),
            });
        }

        let entry = self.entry_mut(handle).ok_or_else(|| GameError::NotFound {
            type_name: T::TYPE_NAME,
            identifier: alias.to_string(),
        })?;
        entry.aliases.push(alias.to_string());
        self.by_alias.insert(alias.to_string(), handle);
        Ok(())
    }

    /// Deregister an instance, purging its identifier and aliases.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<Entry<T>> {
        let entry = self.entries.get_mut(handle.index())?.take()?;
        self.by_identifier.remove(&entry.identifier);
        for alias in &entry.aliases {
            self.by_alias.remove(alias);
        }
        Some(entry)
    }

    /// Deregister the instance an identifier resolves to.
    pub fn remove_identifier(&mut self, identifier: &str) -> Option<Entry<T>> {
        let handle = self.find(identifier)?;
        self.remove(handle)
    }

    /// Wipe every instance and any buffered data.
    ///
    /// Slots are emptied, not reused, so handles from before the clear
    /// resolve to nothing after a reload.
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|slot| *slot = None);
        self.by_identifier.clear();
        self.by_alias.clear();
        self.buffered.clear();
    }

    /// Number of live instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_identifier.len()
    }

    /// Whether no instance is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_identifier.is_empty()
    }

    /// Live handles in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(i, _)| Handle::new(i))
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &Entry<T>)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (Handle::new(i), e)))
    }

    /// Number of sections waiting for `process_database`.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Read this type's data folder under `path` and buffer it for `module`.
    ///
    /// No instance is touched here.
    pub fn parse_database(&mut self, path: &Path, module: Option<Handle<Module>>) -> Result<()> {
        let folder = path.join(T::DATABASE_FOLDER);
        let sections = read_data_folder(&folder)?;
        if !sections.is_empty() {
            tracing::debug!(
                "Buffered {} {} section(s) from {}",
                sections.len(),
                T::TYPE_NAME,
                folder.display()
            );
        }
        self.buffer_sections(module, sections);
        Ok(())
    }

    /// Buffer already-parsed sections for `module`.
    pub fn buffer_sections(&mut self, module: Option<Handle<Module>>, sections: Vec<DataSection>) {
        self.buffered
            .extend(sections.into_iter().map(|section| (module, section)));
    }

    /// Run the definition (`true`) or population (`false`) pass.
    pub fn process_database(&mut self, definition: bool) -> Result<()> {
        if definition {
            self.define_buffered()
        } else {
            self.populate_buffered()
        }
    }

    fn define_buffered(&mut self) -> Result<()> {
        let buffered = std::mem::take(&mut self.buffered);
        let result = buffered
            .iter()
            .try_for_each(|(module, section)| self.define_section(*module, section));
        self.buffered = buffered;
        result
    }

    fn define_section(&mut self, module: Option<Handle<Module>>, section: &DataSection) -> Result<()> {
        let identifier = section.tag.as_str();
        let handle = if section.operator == DataOperator::Addition {
            self.resolve(identifier)?.ok_or_else(|| GameError::NotFound {
                type_name: T::TYPE_NAME,
                identifier: identifier.to_string(),
            })?
        } else {
            self.add(identifier, module)?
        };

        for property in section.properties.iter().filter(|p| p.key == ALIASES_KEY) {
            if property.operator != DataOperator::Addition {
                return Err(GameError::InvalidOperator {
                    key: ALIASES_KEY.to_string(),
                    expected: DataOperator::Addition.symbol(),
                }
                .in_instance(T::TYPE_NAME, identifier, LoadPhase::Definition));
            }

            for alias in parse_identifier_list(&property.value) {
                self.add_instance_alias(handle, &alias)
                    .map_err(|e| e.in_instance(T::TYPE_NAME, identifier, LoadPhase::Definition))?;
            }
        }

        Ok(())
    }

    fn populate_buffered(&mut self) -> Result<()> {
        let buffered = std::mem::take(&mut self.buffered);

        for (_, section) in &buffered {
            let identifier = section.tag.as_str();
            let handle = self.find(identifier).ok_or_else(|| GameError::NotFound {
                type_name: T::TYPE_NAME,
                identifier: identifier.to_string(),
            })?;
            let Some(entry) = self.entry_mut(handle) else {
                continue;
            };

            populate_entry(&mut entry.data, section)
                .map_err(|e| e.in_instance(T::TYPE_NAME, identifier, LoadPhase::Population))?;
            entry.defined = true;
        }

        Ok(())
    }

    /// Initialize every instance not yet initialized.
    ///
    /// Each instance's same-type initialization dependencies run first, so
    /// instances reached that way are skipped when their turn comes.
    pub fn initialize_all(database: &mut Database) -> Result<()> {
        let handles: Vec<Handle<T>> = T::store(database).handles().collect();
        let mut visiting = Vec::new();
        for handle in handles {
            Self::initialize_entry(database, handle, &mut visiting)?;
        }
        Ok(())
    }

    fn initialize_entry(
        database: &mut Database,
        handle: Handle<T>,
        visiting: &mut Vec<Handle<T>>,
    ) -> Result<()> {
        let store = T::store_mut(database);
        let Some(entry) = store.entry(handle) else {
            return Ok(());
        };
        if entry.initialized {
            return Ok(());
        }

        let identifier = entry.identifier.clone();
        if visiting.contains(&handle) {
            return Err(GameError::CyclicDependency {
                kind: T::TYPE_NAME,
                identifier,
            });
        }

        visiting.push(handle);
        for dependency in entry.data.initialization_dependencies() {
            let dependency_handle = T::store(database)
                .find(&dependency)
                .ok_or_else(|| GameError::NotFound {
                    type_name: T::TYPE_NAME,
                    identifier: dependency.clone(),
                })
                .map_err(|e| e.in_instance(T::TYPE_NAME, &identifier, LoadPhase::Initialization))?;
            Self::initialize_entry(database, dependency_handle, visiting)?;
        }
        visiting.pop();

        let Some(mut entry) = T::store_mut(database).entries[handle.index()].take() else {
            return Ok(());
        };
        let result = entry.data.initialize(database);
        entry.initialized = result.is_ok();
        T::store_mut(database).entries[handle.index()] = Some(entry);

        result.map_err(|e| e.in_instance(T::TYPE_NAME, identifier, LoadPhase::Initialization))
    }

    /// Check every instance, collecting one wrapped error per failing instance.
    #[must_use]
    pub fn check_all(database: &Database) -> Vec<GameError> {
        T::store(database)
            .iter()
            .filter_map(|(_, entry)| {
                entry.data.check(database).err().map(|e| {
                    e.in_instance(T::TYPE_NAME, entry.identifier(), LoadPhase::Check)
                })
            })
            .collect()
    }
}

/// Feed one section body into an instance.
///
/// Configuration diagnostics are logged and skipped; anything else aborts.
fn populate_entry<T: DataEntry>(data: &mut T, section: &DataSection) -> Result<()> {
    for property in section.properties.iter().filter(|p| p.key != ALIASES_KEY) {
        match data.process_property(property) {
            Ok(()) => {}
            Err(e) if e.is_configuration() => {
                tracing::warn!("{} \"{}\": {e}", T::TYPE_NAME, section.tag);
            }
            Err(e) => return Err(e),
        }
    }

    for child in &section.sections {
        match data.process_section(child) {
            Ok(()) => {}
            Err(e) if e.is_configuration() => {
                tracing::warn!("{} \"{}\": {e}", T::TYPE_NAME, section.tag);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Backward-compatible alias spelling with `_` and `-` swapped.
fn swapped_alias(identifier: &str) -> Option<String> {
    if !identifier.contains(['_', '-']) {
        return None;
    }

    Some(
        identifier
            .chars()
            .map(|c| match c {
                '_' => '-',
                '-' => '_',
                other => other,
            })
            .collect(),
    )
}
