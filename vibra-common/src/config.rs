//! Configuration loading
//!
//! Engine tuning knobs with compiled defaults, loadable from a TOML file.
//! Resolution follows the priority order: command-line argument, environment
//! variable, per-user config file, compiled defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Half-width of the event firing window in milliseconds
    pub tolerance_ms: u64,

    /// Sampling cadence of the scheduling loop in milliseconds
    pub poll_interval_ms: u64,

    /// Buffered capacity of the engine event channel
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 15,
            poll_interval_ms: 16,
            event_channel_capacity: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading engine config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Resolve engine configuration following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable naming a config file
/// 3. Per-user config file
/// 4. Compiled defaults (fallback)
pub fn resolve_config(cli_path: Option<&Path>, env_var_name: &str) -> Result<EngineConfig> {
    if let Some(path) = cli_path {
        return EngineConfig::load(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return EngineConfig::load(Path::new(&path));
    }

    if let Some(path) = default_config_path() {
        if path.exists() {
            return EngineConfig::load(&path);
        }
    }

    Ok(EngineConfig::default())
}

/// Per-user config file location (`<config dir>/vibra/config.toml`)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vibra").join("config.toml"))
}
