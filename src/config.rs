//! Project configuration.
//!
//! Everything is optional; a missing file means all defaults. Command-line flags are
//! applied on top of the loaded values by the CLI.
//!
//! ```yaml
//! source_root: src
//! handlers: handlers.yaml
//! exclude: [dist, test]
//! aliases:
//!   "@/*": src
//!   "@common/": src/common
//! date_types: [Date, Dayjs]
//! binary_types: [Buffer]
//! max_depth: 64
//! types: [OB11Message, OB11MessageSegment]
//! info:
//!   title: NapCat OneBot 11 API
//!   version: 1.0.0
//! ```

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::expander::ExpansionOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory to scan, relative to the project path
    pub source_root: Option<PathBuf>,
    /// Handler manifest, relative to the project path
    pub handlers: Option<PathBuf>,
    /// Directory or file names skipped while scanning
    pub exclude: Vec<String>,
    /// Import specifier prefix to project-relative directory
    pub aliases: IndexMap<String, String>,
    pub date_types: Vec<String>,
    pub binary_types: Vec<String>,
    pub max_depth: usize,
    /// Declarations emitted as components even when no handler references them
    pub types: Vec<String>,
    pub info: InfoConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let expansion = ExpansionOptions::default();
        Self {
            source_root: None,
            handlers: None,
            exclude: Vec::new(),
            aliases: IndexMap::new(),
            date_types: expansion.date_types,
            binary_types: expansion.binary_types,
            max_depth: expansion.max_depth,
            types: Vec::new(),
            info: InfoConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Reads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration: {}", path.display());
        let content = fs::read_to_string(path)?;
        let config: ProjectConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        if let Some(name) = self.types.iter().find(|name| name.trim().is_empty()) {
            return Err(Error::Config(format!("types contains a blank name: {:?}", name)));
        }
        Ok(())
    }

    pub fn expansion_options(&self) -> ExpansionOptions {
        ExpansionOptions {
            date_types: self.date_types.clone(),
            binary_types: self.binary_types.clone(),
            max_depth: self.max_depth,
        }
    }
}
