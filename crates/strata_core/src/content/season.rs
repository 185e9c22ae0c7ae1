//! Seasons.

use super::ImageConfig;
use crate::data::{DataProperty, DataSection};
use crate::database::Database;
use crate::error::Result;
use crate::registry::{unknown_property, unknown_section, DataEntry, DataType};

/// A season in a world's yearly schedule.
#[derive(Debug, Clone, Default)]
pub struct Season {
    /// Display name.
    pub name: String,
    /// Icon shown in the interface.
    pub image: Option<ImageConfig>,
}

impl DataEntry for Season {
    const TYPE_NAME: &'static str = "season";
    const DATABASE_FOLDER: &'static str = "seasons";

    fn new(identifier: &str) -> Self {
        Self {
            name: identifier.to_string(),
            image: None,
        }
    }

    fn process_property(&mut self, property: &DataProperty) -> Result<()> {
        match property.key.as_str() {
            "name" => self.name.clone_from(&property.value),
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

    fn store(database: &Database) -> &DataType<Self> {
        &database.seasons
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.seasons
    }
}
