//! JSON configuration loading shared by every config struct

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::Result;

/// Load and save configuration structs as JSON
///
/// Implemented for every serde type; missing fields fall back to the
/// struct's `#[serde(default)]` values.
pub trait JsonConfig: Serialize + DeserializeOwned {
    /// Parse from a JSON string
    fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read from a JSON file
    fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Pretty JSON
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<T: Serialize + DeserializeOwned> JsonConfig for T {}
