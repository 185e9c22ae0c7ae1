//! Image references for content that has a graphic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::{parse_size, DataSection};
use crate::error::{GameError, Result};
use crate::math::PixelSize;

/// A graphic file and the size of one frame in it.
///
/// Only the reference is stored; loading the file is the renderer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Path of the graphic, relative to the module folder.
    pub file: PathBuf,
    /// Size of one frame.
    pub size: PixelSize,
}

impl ImageConfig {
    /// Build from an `image` section with `file` and `size` properties.
    ///
    /// A section missing either property yields a configuration error; the
    /// owning instance keeps loading without the image.
    pub fn from_section(section: &DataSection) -> Result<Self> {
        let mut file = None;
        let mut size = None;

        for property in &section.properties {
            match property.key.as_str() {
                "file" => file = Some(PathBuf::from(&property.value)),
                "size" => size = Some(parse_size(&property.key, &property.value)?),
                other => {
                    return Err(GameError::configuration(format!(
                        "Invalid image property: \"{other}\""
                    )))
                }
            }
        }

        let file = file.ok_or_else(|| GameError::configuration("Image has no file."))?;
        let size = size.ok_or_else(|| {
            GameError::configuration(format!("Image \"{}\" has no size.", file.display()))
        })?;

        Ok(Self { file, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2i;

    #[test]
    fn test_complete_image() {
        let section = DataSection::new("image")
            .with_property("file", "missiles/arrow.png")
            .with_property("size", "32 32");
        let image = ImageConfig::from_section(&section).unwrap();
        assert_eq!(image.file, PathBuf::from("missiles/arrow.png"));
        assert_eq!(image.size, Vec2i::new(32, 32));
    }

    #[test]
    fn test_missing_file_or_size_is_configuration_error() {
        let no_file = DataSection::new("image").with_property("size", "32 32");
        assert!(ImageConfig::from_section(&no_file)
            .unwrap_err()
            .is_configuration());

        let no_size = DataSection::new("image").with_property("file", "a.png");
        assert!(ImageConfig::from_section(&no_size)
            .unwrap_err()
            .is_configuration());
    }
}
