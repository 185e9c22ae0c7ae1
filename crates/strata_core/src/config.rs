//! Engine configuration.
//!
//! Configuration is a RON file; every field has a default so a partial file
//! (or no file at all) is valid.
//!
//! ```ron
//! (
//!     data_root: "data",
//!     modules: ["base", "northern_wars"],
//!     seed: 12345,
//!     rules: (no_randomness: false, god_mode_player: None),
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::battlefield::PlayerId;
use crate::error::{GameError, Result};

/// Environment variable overriding [`EngineConfig::data_root`].
pub const DATA_DIR_ENV: &str = "STRATA_DATA_DIR";

/// Combat switches that every simulation participant must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    /// Replace every random draw in hit and damage resolution with its
    /// expected value.
    pub no_randomness: bool,
    /// Player whose attacks always hit.
    pub god_mode_player: Option<PlayerId>,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Folder holding one subfolder per module.
    pub data_root: PathBuf,
    /// Modules to load; empty means every module found under `data_root`.
    pub modules: Vec<String>,
    /// Seed for the synchronized random stream.
    pub seed: u64,
    /// Combat rules.
    pub rules: CombatRules,
    /// Treat check failures as fatal instead of reporting them.
    pub strict_checks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            modules: Vec::new(),
            seed: 0,
            rules: CombatRules::default(),
            strict_checks: false,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: "<config>".to_string(),
            message: e.to_string(),
        })
    }

    /// Read a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;

        ron::from_str(&content).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                tracing::debug!("{DATA_DIR_ENV} overrides data root with {dir}");
                self.data_root = PathBuf::from(dir);
            }
        }
        self
    }
}
