//! Content types loaded from module data.
//!
//! Each type implements [`DataEntry`](crate::registry::DataEntry) and lives
//! in one store of the [`Database`](crate::database::Database). Missile
//! types live with the missile engine in [`crate::missile`].

mod age;
mod font;
mod image;
mod module;
mod resource;
mod season;
mod terrain;
mod world;

pub use age::Age;
pub use font::Font;
pub use image::ImageConfig;
pub use module::{
    check_module_dependencies, compare_modules, depends_on, sort_modules, Module, MODULE_MANIFEST,
};
pub use resource::Resource;
pub use season::Season;
pub use terrain::{TerrainFlags, TerrainType};
pub use world::{Province, World};
