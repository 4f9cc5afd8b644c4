//! Handler enumeration.
//!
//! The pipeline never instantiates handler objects. A [`HandlerRegistry`] lists the
//! operation names and, per operation, which class implements it and which request schema
//! it validates against. [`ManifestRegistry`] reads that information from a manifest:
//!
//! ```yaml
//! handlers:
//!   - operation: get_login_info
//!     class: GetLoginInfo
//!   - operation: send_msg
//!     class: SendMsg
//!     request_schema:
//!       type: object
//!       properties:
//!         message: { type: string }
//! ```

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// What the registry knows about one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerInstance {
    /// Name of the handler class, looked up through the type oracle
    pub class_name: String,
    /// Request schema, emitted verbatim
    pub request_schema: Value,
}

pub trait HandlerRegistry {
    /// Operation names in enumeration order. The same name may appear more than once.
    fn operation_names(&self) -> Vec<String>;

    /// The handler behind `operation`, or `None` when it cannot be constructed.
    fn instantiate(&self, operation: &str) -> Option<HandlerInstance>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub handlers: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub operation: String,
    /// Entries without a class are listed but cannot be instantiated
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub request_schema: Option<Value>,
}

/// Registry backed by a static manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestRegistry {
    entries: Vec<ManifestEntry>,
}

impl ManifestRegistry {
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Loads a manifest file. `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading handler manifest: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read handler manifest: {}", path.display()))?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let manifest: Manifest = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON manifest: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML manifest: {}", path.display()))?
        };
        debug!("Manifest lists {} handler(s)", manifest.handlers.len());
        Ok(Self::from_entries(manifest.handlers))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HandlerRegistry for ManifestRegistry {
    fn operation_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.operation.clone()).collect()
    }

    /// The first entry for `operation` wins.
    fn instantiate(&self, operation: &str) -> Option<HandlerInstance> {
        let entry = self.entries.iter().find(|e| e.operation == operation)?;
        Some(HandlerInstance {
            class_name: entry.class.clone()?,
            request_schema: entry
                .request_schema
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
        })
    }
}
