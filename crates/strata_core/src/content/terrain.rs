//! Terrain types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ImageConfig, Resource, Season};
use crate::data::{
    parse_bool, parse_color, parse_identifier_list, parse_int, DataOperator, DataProperty,
    DataSection,
};
use crate::database::Database;
use crate::error::{GameError, Result};
use crate::registry::{unknown_property, unknown_section, DataEntry, DataType, Handle};

/// Bit set of terrain properties for a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TerrainFlags(u16);

impl TerrainFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Walkable ground.
    pub const LAND: Self = Self(1 << 0);
    /// Coast: buildable by shore buildings.
    pub const COAST_ALLOWED: Self = Self(1 << 1);
    /// Water.
    pub const WATER: Self = Self(1 << 2);
    /// Nothing can be built here.
    pub const NO_BUILDING: Self = Self(1 << 3);
    /// Nothing can pass.
    pub const UNPASSABLE: Self = Self(1 << 4);
    /// Wall overlay.
    pub const WALL: Self = Self(1 << 5);
    /// Rock overlay.
    pub const ROCK: Self = Self(1 << 6);
    /// Forest overlay.
    pub const FOREST: Self = Self(1 << 7);
    /// Mud slows movement.
    pub const MUD: Self = Self(1 << 8);
    /// Roads speed movement up.
    pub const ROAD: Self = Self(1 << 9);
    /// Bridges let land units cross water.
    pub const BRIDGE: Self = Self(1 << 10);
    /// Destroyed overlay, e.g. a stump or rubble.
    pub const STUMPS: Self = Self(1 << 11);

    /// Look up a single flag by its data-file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let flag = match name {
            "land" => Self::LAND,
            "coast_allowed" => Self::COAST_ALLOWED,
            "water" => Self::WATER,
            "no_building" => Self::NO_BUILDING,
            "unpassable" => Self::UNPASSABLE,
            "wall" => Self::WALL,
            "rock" => Self::ROCK,
            "forest" => Self::FOREST,
            "mud" => Self::MUD,
            "road" => Self::ROAD,
            "bridge" => Self::BRIDGE,
            "stumps" => Self::STUMPS,
            _ => return None,
        };
        Some(flag)
    }

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any flag in `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl std::ops::BitOr for TerrainFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TerrainFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::Not for TerrainFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl std::ops::BitAnd for TerrainFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// A kind of map tile.
#[derive(Debug, Clone, Default)]
pub struct TerrainType {
    /// Display name.
    pub name: String,
    /// Character used in text map files.
    pub character: Option<char>,
    /// Minimap colour.
    pub color: [u8; 3],
    /// Overlay terrain sits on top of a base terrain (forests, walls, rocks).
    pub overlay: bool,
    /// Whether buildings may be placed.
    pub buildable: bool,
    /// Hidden terrain never shows in editors.
    pub hidden: bool,
    /// Tile flags applied by this terrain.
    pub flags: TerrainFlags,
    /// Resource gathered from this terrain, if any.
    pub resource_identifier: Option<String>,
    /// Resolved resource.
    pub resource: Option<Handle<Resource>>,
    /// Base terrains an overlay may be placed on.
    pub base_terrain_type_identifiers: Vec<String>,
    /// Resolved base terrains.
    pub base_terrain_types: Vec<Handle<TerrainType>>,
    /// Terrains this one draws transition borders onto.
    pub border_terrain_type_identifiers: Vec<String>,
    /// Resolved outer borders.
    pub border_terrain_types: Vec<Handle<TerrainType>>,
    /// Hit points of an overlay wall tile.
    pub wall_hit_points: i32,
    /// Armor of an overlay wall tile.
    pub wall_armor: i32,
    /// Default graphic.
    pub image: Option<ImageConfig>,
    season_image_identifiers: Vec<(String, ImageConfig)>,
    /// Per-season graphics, resolved.
    pub season_images: HashMap<Handle<Season>, ImageConfig>,
}

impl TerrainType {
    /// Whether this is an overlay wall.
    #[must_use]
    pub const fn is_wall(&self) -> bool {
        self.overlay && self.flags.contains(TerrainFlags::WALL)
    }

    /// Graphic for a season, falling back to the default graphic.
    #[must_use]
    pub fn image_for_season(&self, season: Option<Handle<Season>>) -> Option<&ImageConfig> {
        season
            .and_then(|s| self.season_images.get(&s))
            .or(self.image.as_ref())
    }

    /// Terrains that list `terrain` as one of their outer borders.
    ///
    /// Inner borders are derived on demand rather than stored, so there is
    /// no back-reference to keep consistent.
    #[must_use]
    pub fn inner_border_terrain_types(
        terrain_types: &DataType<Self>,
        terrain: Handle<Self>,
    ) -> Vec<Handle<Self>> {
        terrain_types
            .iter()
            .filter(|(_, entry)| entry.border_terrain_types.contains(&terrain))
            .map(|(handle, _)| handle)
            .collect()
    }

    fn update_list(list: &mut Vec<String>, property: &DataProperty) {
        let identifiers = parse_identifier_list(&property.value);
        match property.operator {
            DataOperator::Assignment => *list = identifiers,
            DataOperator::Addition => list.extend(identifiers),
            DataOperator::Subtraction => list.retain(|id| !identifiers.contains(id)),
        }
    }
}

fn resolve_all<T: DataEntry>(
    database: &Database,
    identifiers: &[String],
) -> Result<Vec<Handle<T>>> {
    let mut handles = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        if let Some(handle) = T::store(database).resolve(identifier)? {
            handles.push(handle);
        }
    }
    Ok(handles)
}

impl DataEntry for TerrainType {
    const TYPE_NAME: &'static str = "terrain_type";
    const DATABASE_FOLDER: &'static str = "terrain_types";
    const DEPENDENCIES: &'static [&'static str] = &["resource", "season"];

    fn new(identifier: &str) -> Self {
        Self {
            name: identifier.to_string(),
            buildable: true,
            ..Self::default()
        }
    }

    fn process_property(&mut self, property: &DataProperty) -> Result<()> {
        let (key, value) = (property.key.as_str(), property.value.as_str());
        match key {
            "name" => self.name = value.to_string(),
            "character" => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => self.character = Some(c),
                    _ => {
                        return Err(GameError::configuration(format!(
                            "Invalid terrain character: \"{value}\""
                        )))
                    }
                }
            }
            "color" => self.color = parse_color(key, value)?,
            "overlay" => self.overlay = parse_bool(key, value)?,
            "buildable" => self.buildable = parse_bool(key, value)?,
            "hidden" => self.hidden = parse_bool(key, value)?,
            "flags" => {
                for name in value.split_whitespace() {
                    let flag = TerrainFlags::from_name(name).ok_or_else(|| {
                        GameError::configuration(format!("Invalid terrain flag: \"{name}\""))
                    })?;
                    self.flags |= flag;
                }
            }
            "resource" => self.resource_identifier = Some(value.to_string()),
            "base_terrain_types" => {
                Self::update_list(&mut self.base_terrain_type_identifiers, property);
            }
            "border_terrain_types" => {
                Self::update_list(&mut self.border_terrain_type_identifiers, property);
            }
            "wall_hit_points" => self.wall_hit_points = parse_int(key, value)?,
            "wall_armor" => self.wall_armor = parse_int(key, value)?,
            _ => return Err(unknown_property::<Self>(property)),
        }
        Ok(())
    }

    fn process_section(&mut self, section: &DataSection) -> Result<()> {
        match section.tag.as_str() {
            "image" => self.image = Some(ImageConfig::from_section(section)?),
            "season_images" => {
                for child in &section.sections {
                    let image = ImageConfig::from_section(child)?;
                    self.season_image_identifiers.push((child.tag.clone(), image));
                }
            }
            _ => return Err(unknown_section::<Self>(section)),
        }
        Ok(())
    }

    fn initialize(&mut self, database: &Database) -> Result<()> {
        self.resource = match &self.resource_identifier {
            Some(identifier) => database.resources.resolve(identifier)?,
            None => None,
        };
        self.base_terrain_types = resolve_all(database, &self.base_terrain_type_identifiers)?;
        self.border_terrain_types = resolve_all(database, &self.border_terrain_type_identifiers)?;

        self.season_images.clear();
        for (identifier, image) in &self.season_image_identifiers {
            if let Some(season) = database.seasons.resolve(identifier)? {
                self.season_images.insert(season, image.clone());
            }
        }
        Ok(())
    }

    fn check(&self, _database: &Database) -> Result<()> {
        if self.flags.contains(TerrainFlags::WALL) && self.wall_hit_points <= 0 {
            return Err(GameError::Validation(
                "Wall terrain must have positive wall hit points.".to_string(),
            ));
        }
        if !self.overlay && !self.base_terrain_types.is_empty() {
            return Err(GameError::Validation(
                "Only overlay terrain types may have base terrain types.".to_string(),
            ));
        }
        Ok(())
    }

    fn store(database: &Database) -> &DataType<Self> {
        &database.terrain_types
    }

    fn store_mut(database: &mut Database) -> &mut DataType<Self> {
        &mut database.terrain_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse_and_combine() {
        let mut wall = TerrainType::new("stone_wall");
        wall.process_property(&DataProperty::new("flags", "land wall no_building"))
            .unwrap();
        assert!(wall.flags.contains(TerrainFlags::WALL | TerrainFlags::LAND));
        assert!(!wall.flags.intersects(TerrainFlags::WATER));
        assert!(wall
            .process_property(&DataProperty::new("flags", "lava"))
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_inner_borders_are_reverse_lookup() {
        let mut database = Database::new();
        let dirt = database.terrain_types.add("dirt", None).unwrap();
        let grass = database.terrain_types.add("grass", None).unwrap();
        let water = database.terrain_types.add("shallow_water", None).unwrap();
        database.terrain_types.entry_mut(grass).unwrap().border_terrain_type_identifiers =
            vec!["dirt".to_string()];
        database.terrain_types.entry_mut(water).unwrap().border_terrain_type_identifiers =
            vec!["dirt".to_string(), "grass".to_string()];

        DataType::<TerrainType>::initialize_all(&mut database).unwrap();

        assert_eq!(
            TerrainType::inner_border_terrain_types(&database.terrain_types, dirt),
            vec![grass, water]
        );
        assert_eq!(
            TerrainType::inner_border_terrain_types(&database.terrain_types, grass),
            vec![water]
        );
        assert!(TerrainType::inner_border_terrain_types(&database.terrain_types, water).is_empty());
    }

    #[test]
    fn test_season_image_falls_back_to_default() {
        let mut database = Database::new();
        let winter = database.seasons.add("winter", None).unwrap();
        let summer = database.seasons.add("summer", None).unwrap();
        let grass = database.terrain_types.add("grass", None).unwrap();
        let section = DataSection::new("season_images").with_section(
            DataSection::new("winter")
                .with_property("file", "terrain/snow.png")
                .with_property("size", "32 32"),
        );
        {
            let entry = database.terrain_types.entry_mut(grass).unwrap();
            entry
                .process_section(
                    &DataSection::new("image")
                        .with_property("file", "terrain/grass.png")
                        .with_property("size", "32 32"),
                )
                .unwrap();
            entry.process_section(&section).unwrap();
        }
        DataType::<TerrainType>::initialize_all(&mut database).unwrap();

        let entry = database.terrain_types.entry(grass).unwrap();
        let file = |season| {
            entry
                .image_for_season(season)
                .map(|image| image.file.display().to_string())
        };
        assert_eq!(file(Some(winter)).as_deref(), Some("terrain/snow.png"));
        assert_eq!(file(Some(summer)).as_deref(), Some("terrain/grass.png"));
        assert_eq!(file(None).as_deref(), Some("terrain/grass.png"));
    }

    #[test]
    fn test_wall_needs_hit_points() {
        let mut database = Database::new();
        let wall = database.terrain_types.add("wall", None).unwrap();
        {
            let entry = database.terrain_types.entry_mut(wall).unwrap();
            entry.overlay = true;
            entry.flags = TerrainFlags::WALL;
        }
        assert_eq!(DataType::<TerrainType>::check_all(&database).len(), 1);
        database.terrain_types.entry_mut(wall).unwrap().wall_hit_points = 40;
        assert!(DataType::<TerrainType>::check_all(&database).is_empty());
        assert!(database.terrain_types.entry(wall).unwrap().is_wall());
    }
}
