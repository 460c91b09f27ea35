//! Optional gate configuration from `.scc/preflight.toml`.
//!
//! A missing file means defaults; a present but malformed file is an error.

use crate::core::error::GateError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_REL_PATH: &str = ".scc/preflight.toml";

/// Diagnostic list caps. Output bounding only, never affects pass/fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    pub max_files: usize,
    pub max_symbols: usize,
    pub max_write_scope: usize,
    pub max_tests: usize,
    pub max_default_skills: usize,
    pub max_notes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_files: 50,
            max_symbols: 50,
            max_write_scope: 50,
            max_tests: 30,
            max_default_skills: 32,
            max_notes: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    pub strict: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self { strict: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub limits: Limits,
    pub registry: RegistrySettings,
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_REL_PATH)
}

pub fn load_config(root: &Path) -> Result<GateConfig, GateError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(GateConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    parse_config(&content)
        .map_err(|e| GateError::ConfigError(format!("{}: {}", path.display(), e)))
}

pub fn parse_config(content: &str) -> Result<GateConfig, toml::de::Error> {
    toml::from_str(content)
}
