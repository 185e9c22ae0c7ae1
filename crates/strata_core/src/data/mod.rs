//! Structured data source for content definitions.
//!
//! Content is authored as RON lists of tagged sections. Each section names
//! the instance it defines (its tag), whether it defines a new instance or
//! extends an existing one (its operator), a flat list of key/value
//! properties and nested subsections.
//!
//! This module only defines the section model, value parsing helpers and
//! file reading. Turning sections into instances is the registry's job.

mod file;
mod section;
mod value;

pub use file::{read_data_file, read_data_folder};
pub use section::{DataOperator, DataProperty, DataSection};
pub use value::{parse_bool, parse_color, parse_identifier_list, parse_int, parse_size};
