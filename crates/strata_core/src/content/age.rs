//! Historical ages.

use super::ImageConfig;
use crate::data::{parse_identifier_list, parse_int, DataOperator, DataProperty, DataSection};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::registry::{unknown_property, unknown_section, DataEntry, DataType, Handle};

/// An age a player advances through.
#[derive(Debug, Clone, Default)]
pub struct Age {
    /// Display name.
    pub name: String,
    /// Higher priority ages are preferred when several are reachable.
    pub priority: i32,
    /// Ages that must be reached before this one.
    pub predecessor_identifiers: Vec<String>,
    /// Resolved predecessors.
    pub predecessors: Vec<Handle<Age>>,
    /// Icon shown in the interface.
    pub image: Option<ImageConfig>,
}

impl DataEntry for Age {
    const TYPE_NAME: &'static str = "age";
    const DATABASE_FOLDER: &'static str = "ages";

    fn new(identifier: &str) -> Self {
        Self {
            name: identifier.to_string(),
            ..Self::default()
        }
    }

    fn process_property(&mut self, property: &DataProperty) -> Result<()> {
        let (key, value) = (property.key.as_str(), property.value.as_str());
        match key {
            "name" => self.name = value.to_string(),
            "priority" => self.priority = parse_int(key, value)?,
            "predecessors" => {
                let identifiers = parse_identifier_list(value);
                match property.operator {
                    DataOperator::Assignment => self.predecessor_identifiers = identifiers,
                    DataOperator::Addition => self.predecessor_identifiers.extend(identifiers),
                    DataOperator::Subtraction => self
                        .predecessor_identifiers
                        .retain(|id| !identifiers.contains(id)),
                }
            }
            _ => return Err(unknown_property::<Self>(property)),
        }
        Ok(())
    }

    fn process_section(&mut self, section: &DataSection) -> Result<()> {
        match section.tag.as_str() {
            "image" => self.image = Some(ImageConfig::from_section(section)?),
            _ => return Err(unknown_section::<Self>(section)),
        }
        Ok(())
    }

    fn initialization_dependencies(&self) -> Vec<String> {
        self.predecessor_identifiers.clone()
    }

    fn initialize(&mut self, database: &Database) -> Result<()> {
        self.predecessors.clear();
        for identifier in &self.predecessor_identifiers {
            if let Some(handle) = database.ages.resolve(identifier)? {
                self.predecessors.push(handle);
            }
        }
        Ok(())
    }

    fn check(&self, _database: &Database) -> Result<()> {
        if self.priority < 0 {
            return Err(GameError::Validation(format!(
                "Age priority must not be negative, got {}.",
                self.priority
            )));
        }
        Ok(())
    }

    fn store(database: &Database) -> &DataType<Self> {
        &database.ages
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.ages
    }
}

impl Age {
    /// Highest-priority age whose predecessors have all been reached.
    ///
    /// Ties go to the age registered first.
    #[must_use]
    pub fn best_reachable(
        ages: &DataType<Self>,
        reached: impl Fn(Handle<Self>) -> bool,
    ) -> Option<Handle<Self>> {
        ages.iter()
            .filter(|(_, age)| age.predecessors.iter().all(|&p| reached(p)))
            .fold(None, |best: Option<(Handle<Self>, i32)>, (handle, age)| match best {
                Some((_, priority)) if priority >= age.priority => best,
                _ => Some((handle, age.priority)),
            })
            .map(|(handle, _)| handle)
    }
}
