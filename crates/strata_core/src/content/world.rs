//! Worlds and the provinces they own.

use super::Season;
use crate::data::{parse_bool, parse_identifier_list, parse_int, DataProperty, DataSection};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::registry::{unknown_property, unknown_section, DataEntry, DataType, Handle};

/// A province inside a world. Owned by value by its world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Province {
    /// Identifier, unique within the owning world.
    pub identifier: String,
    /// Display name.
    pub name: String,
    /// Sea provinces cannot hold settlements.
    pub water: bool,
    /// Identifiers of bordering provinces in the same world.
    pub border_identifiers: Vec<String>,
    /// Bordering provinces as indices into the world's province list.
    pub borders: Vec<usize>,
}

impl Province {
    fn from_section(section: &DataSection) -> Result<Self> {
        let mut province = Self::default();
        for property in &section.properties {
            let (key, value) = (property.key.as_str(), property.value.as_str());
            match key {
                "identifier" => province.identifier = value.to_string(),
                "name" => province.name = value.to_string(),
                "water" => province.water = parse_bool(key, value)?,
                "borders" => province.border_identifiers = parse_identifier_list(value),
                _ => {
                    return Err(GameError::configuration(format!(
                        "Invalid province property: \"{key}\""
                    )))
                }
            }
        }

        if province.identifier.is_empty() {
            return Err(GameError::configuration("Province has no identifier."));
        }
        if province.name.is_empty() {
            province.name.clone_from(&province.identifier);
        }
        Ok(province)
    }
}

/// A world (planet or plane) with its season cycle and provinces.
#[derive(Debug, Clone, Default)]
pub struct World {
    /// Display name.
    pub name: String,
    /// Encyclopedia text.
    pub description: String,
    season_schedule_identifiers: Vec<(String, i32)>,
    /// Seasons in yearly order with their duration in hours.
    pub season_schedule: Vec<(Handle<Season>, i32)>,
    /// Provinces owned by this world.
    pub provinces: Vec<Province>,
}

impl World {
    /// Index of a province by identifier.
    #[must_use]
    pub fn province_index(&self, identifier: &str) -> Option<usize> {
        self.provinces.iter().position(|p| p.identifier == identifier)
    }

    /// Bordering provinces of the province at `index`.
    pub fn province_neighbors(&self, index: usize) -> impl Iterator<Item = &Province> {
        self.provinces
            .get(index)
            .into_iter()
            .flat_map(|p| p.borders.iter())
            .filter_map(|&i| self.provinces.get(i))
    }

    /// Length of a full year in hours.
    #[must_use]
    pub fn year_length(&self) -> i32 {
        self.season_schedule.iter().map(|(_, hours)| hours).sum()
    }

    /// Season active at `hour` since the start of the schedule.
    #[must_use]
    pub fn season_at(&self, hour: i64) -> Option<Handle<Season>> {
        let year = i64::from(self.year_length());
        if year <= 0 {
            return None;
        }

        let mut remaining = hour.rem_euclid(year);
        for &(season, hours) in &self.season_schedule {
            if remaining < i64::from(hours) {
                return Some(season);
            }
            remaining -= i64::from(hours);
        }
        None
    }
}

impl DataEntry for World {
    const TYPE_NAME: &'static str = "world";
    const DATABASE_FOLDER: &'static str = "worlds";
    const DEPENDENCIES: &'static [&'static str] = &["season", "terrain_type"];

    fn new(identifier: &str) -> Self {
        Self {
            name: identifier.to_string(),
            ..Self::default()
        }
    }

    fn process_property(&mut self, property: &DataProperty) -> Result<()> {
        match property.key.as_str() {
            "name" => self.name.clone_from(&property.value),
            "description" => self.description.clone_from(&property.value),
            _ => return Err(unknown_property::<Self>(property)),
        }
        Ok(())
    }

    fn process_section(&mut self, section: &DataSection) -> Result<()> {
        match section.tag.as_str() {
            "province" => {
                let province = Province::from_section(section)?;
                if self.province_index(&province.identifier).is_some() {
                    return Err(GameError::DuplicateIdentifier {
                        type_name: "province",
                        identifier: province.identifier,
                    });
                }
                self.provinces.push(province);
            }
            "season_schedule" => {
                self.season_schedule_identifiers.clear();
                for property in &section.properties {
                    let hours = parse_int(&property.key, &property.value)?;
                    self.season_schedule_identifiers
                        .push((property.key.clone(), hours));
                }
            }
            _ => return Err(unknown_section::<Self>(section)),
        }
        Ok(())
    }

    fn initialize(&mut self, database: &Database) -> Result<()> {
        self.season_schedule.clear();
        for (identifier, hours) in &self.season_schedule_identifiers {
            if let Some(season) = database.seasons.resolve(identifier)? {
                self.season_schedule.push((season, *hours));
            }
        }

        let indices: Vec<Vec<usize>> = self
            .provinces
            .iter()
            .map(|province| {
                province
                    .border_identifiers
                    .iter()
                    .map(|id| {
                        self.province_index(id).ok_or_else(|| GameError::NotFound {
                            type_name: "province",
                            identifier: id.clone(),
                        })
                    })
                    .collect::<Result<Vec<usize>>>()
            })
            .collect::<Result<_>>()?;

        for (province, borders) in self.provinces.iter_mut().zip(indices) {
            province.borders = borders;
        }
        Ok(())
    }

    fn check(&self, _database: &Database) -> Result<()> {
        for (index, province) in self.provinces.iter().enumerate() {
            if province.borders.contains(&index) {
                return Err(GameError::Validation(format!(
                    "Province \"{}\" borders itself.",
                    province.identifier
                )));
            }
        }
        if self.season_schedule.iter().any(|&(_, hours)| hours <= 0) {
            return Err(GameError::Validation(
                "Season durations must be positive.".to_string(),
            ));
        }
        Ok(())
    }

    fn store(database: &Database) -> &DataType<Self> {
        &database.worlds
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.worlds
    }
}
