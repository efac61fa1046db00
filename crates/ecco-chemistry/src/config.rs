//! # Configuration
//!
//! Settings are loaded with [`confique`], layered in priority order:
//!
//! 1. **Environment variables**: `ECCO_CHECKMARK_MARKER`, `ECCO_CACHE_FOLDERS`.
//! 2. **Config file**: `ecco.toml`, by default in the OS config directory
//!    (via the `directories` crate).
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `checkmark_marker` | `"1"` | Wire value written for a set checkmark |
//! | `cache_folders` | `true` | Cache folder lookups and the folder outline |

use std::path::{Path, PathBuf};

use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_CHECKMARK;
use crate::error::Result;

const CONFIG_FILE: &str = "ecco.toml";

/// Configuration for the Ecco mapping layer, stored in `ecco.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EccoConfig {
    /// Wire value for a set checkmark. Any non-empty value reads as set.
    #[config(default = "1", env = "ECCO_CHECKMARK_MARKER")]
    pub checkmark_marker: String,

    /// Remember folder metadata between lookups.
    #[config(default = true, env = "ECCO_CACHE_FOLDERS")]
    pub cache_folders: bool,
}

impl Default for EccoConfig {
    fn default() -> Self {
        Self {
            checkmark_marker: DEFAULT_CHECKMARK.to_string(),
            cache_folders: true,
        }
    }
}

impl EccoConfig {
    /// The checkmark marker; an empty setting falls back to the default,
    /// since `""` always means "not set" on the wire.
    pub fn checkmark_marker(&self) -> &str {
        if self.checkmark_marker.is_empty() {
            DEFAULT_CHECKMARK
        } else {
            &self.checkmark_marker
        }
    }

    /// Load from the environment and `path` (or the default file location).
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(file) => builder = builder.file(file),
            None => tracing::debug!("no config directory available"),
        }
        Ok(builder.load()?)
    }

    /// `ecco.toml` in the OS config directory, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ecco-chemistry").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}
