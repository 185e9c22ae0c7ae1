//! Economic resources.

use crate::data::{parse_bool, parse_int, DataProperty};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::registry::{unknown_property, DataEntry, DataType, Handle};

/// A gatherable resource such as gold or lumber.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    /// Display name.
    pub name: String,
    /// Income per harvest trip at base efficiency.
    pub default_income: i32,
    /// Amount held by a fresh resource source.
    pub default_amount: i32,
    /// Resource this one converts into when delivered, if any.
    pub final_resource_identifier: Option<String>,
    /// Resolved final resource.
    pub final_resource: Option<Handle<Resource>>,
    /// Percentage of this resource credited as the final resource.
    pub final_resource_conversion_rate: i32,
    /// Luxury goods are traded but not gathered.
    pub luxury: bool,
    /// Hidden resources never show up in the interface.
    pub hidden: bool,
}

impl DataEntry for Resource {
    const TYPE_NAME: &'static str = "resource";
    const DATABASE_FOLDER: &'static str = "resources";

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
            "default_income" => self.default_income = parse_int(key, value)?,
            "default_amount" => self.default_amount = parse_int(key, value)?,
            "final_resource" => self.final_resource_identifier = Some(value.to_string()),
            "final_resource_conversion_rate" => {
                self.final_resource_conversion_rate = parse_int(key, value)?;
            }
            "luxury" => self.luxury = parse_bool(key, value)?,
            "hidden" => self.hidden = parse_bool(key, value)?,
            _ => return Err(unknown_property::<Self>(property)),
        }
        Ok(())
    }

    fn initialize(&mut self, database: &Database) -> Result<()> {
        self.final_resource = match &self.final_resource_identifier {
            Some(identifier) => database.resources.resolve(identifier)?,
            None => None,
        };
        Ok(())
    }

    fn check(&self, _database: &Database) -> Result<()> {
        if self.final_resource.is_some() && self.final_resource_conversion_rate <= 0 {
            return Err(GameError::Validation(
                "Resource has a final resource but no positive conversion rate.".to_string(),
            ));
        }
        Ok(())
    }

    fn store(database: &Database) -> &DataType<Self> {
        &database.resources
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.resources
    }
}

impl Resource {
    /// Amount of the final resource produced by delivering `amount`.
    #[must_use]
    pub const fn converted_amount(&self, amount: i32) -> i32 {
        if self.final_resource.is_some() {
            amount * self.final_resource_conversion_rate / 100
        } else {
            amount
        }
    }
}
