//! File-based configuration (`dartmerge.toml`).
//!
//! Every key is optional; command-line flags override whatever is set here.

use crate::error::{DartMergeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "dartmerge.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Path to the merge executable, or a bare name looked up on PATH
    pub executable: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    /// Root that relative file arguments are resolved against
    pub project_root: Option<PathBuf>,
    pub working_directory: Option<PathBuf>,
    pub max_output_bytes: Option<usize>,
    pub env: BTreeMap<String, String>,
}

impl MergeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DartMergeError::InvalidConfiguration(format!("Invalid config: {}", e)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DartMergeError::InvalidConfiguration(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Like [`MergeConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}
