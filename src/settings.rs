//! Import/export configuration.
//!
//! Opaque payloads as far as the schema core is concerned: the context
//! carries the defaults, nodes may carry per-node overrides. Persisted as
//! JSON so host applications can round-trip them with their own project
//! files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::Result;

/// Time-sample interpolation mode applied by the host on import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Interpolation {
    None,
    #[default]
    Linear,
}

/// Context-wide or per-node import configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub interpolation: Interpolation,
    pub scale: f64,
    pub load_all_payloads: bool,
    pub triangulate: bool,
    pub swap_handedness: bool,
    pub swap_faces: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            scale: 1.0,
            load_all_payloads: true,
            triangulate: false,
            swap_handedness: false,
            swap_faces: false,
        }
    }
}

impl ImportSettings {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Context-wide or per-node export configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub scale: f64,
    pub swap_handedness: bool,
    pub swap_faces: bool,
    pub instanceable_by_default: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            swap_handedness: false,
            swap_faces: false,
            instanceable_by_default: false,
        }
    }
}

impl ExportSettings {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ImportSettings::default();
        assert_eq!(s.scale, 1.0);
        assert!(s.load_all_payloads);
        assert_eq!(s.interpolation, Interpolation::Linear);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: ImportSettings = serde_json::from_str(r#"{"scale": 0.01}"#).unwrap();
        assert_eq!(s.scale, 0.01);
        assert!(s.load_all_payloads);
    }
}
