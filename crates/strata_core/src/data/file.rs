//! Reading data files from disk.

use std::fs;
use std::path::Path;

use super::section::DataSection;
use crate::error::{GameError, Result};

/// Read one RON data file containing a list of sections.
pub fn read_data_file(path: &Path) -> Result<Vec<DataSection>> {
    let content = fs::read_to_string(path).map_err(|source| GameError::Io {
        path: path.display().to_string(),
        source,
    })?;

    ron::from_str(&content).map_err(|e| GameError::DataParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read every `.ron` file in a folder, in file-name order.
///
/// A missing folder yields no sections: modules only provide the content
/// types they define. Files that fail to parse are reported and skipped.
pub fn read_data_folder(dir: &Path) -> Result<Vec<DataSection>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| GameError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| GameError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "ron") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut sections = Vec::new();
    for path in paths {
        match read_data_file(&path) {
            Ok(mut file_sections) => sections.append(&mut file_sections),
            Err(e) => tracing::warn!("Skipping data file {}: {e}", path.display()),
        }
    }

    Ok(sections)
}
