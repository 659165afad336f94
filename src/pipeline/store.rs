//! Key-addressed JSON store for payloads.
//!
//! One file holds any number of payloads, each under its own key:
//!
//! ```text
//! {
//!   "DATAFRAME_CONTAINER": { "columns": [ ... ] },
//!   "ARRAY_CONTAINER":     { "values": [ ... ], "labels": [ ... ] }
//! }
//! ```
//!
//! Saving under a key keeps every other key in the file.

use crate::error::{FlowError, Result, ResultExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A JSON document of keyed entries on disk.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    path: PathBuf,
}

impl PayloadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(FlowError::Serialization(format!(
                "{} is not a keyed payload store",
                self.path.display()
            ))),
        }
    }

    /// Keys present in the store, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_document()?.keys().cloned().collect())
    }

    /// Load and deserialize the entry under `key`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let mut doc = self.read_document()?;
        let value = doc.remove(key).ok_or_else(|| {
            FlowError::Payload(format!("key '{}' not found in {}", key, self.path.display()))
        })?;
        serde_json::from_value(value)
            .map_err(FlowError::from)
            .with_context(|| format!("Failed to decode '{}'", key))
    }

    /// Serialize `value` under `key`, replacing any previous entry.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut doc = self.read_document()?;
        doc.insert(key.to_string(), serde_json::to_value(value)?);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&Value::Object(doc))?;
        std::fs::write(&self.path, content)?;
        tracing::debug!("Saved '{}' to {:?}", key, self.path);
        Ok(())
    }
}
