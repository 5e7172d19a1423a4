//! Preferences loading and saving.
//!
//! Missing or malformed config files fall back to defaults; the step display
//! must never depend on a readable preferences file.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, StepsError};
use crate::storage::StorageConfig;

pub const DEFAULT_DAILY_GOAL: u64 = 10_000;

/// 200 steps an hour across a whole day.
pub const DEFAULT_ESTIMATED_DAILY_STEPS: u64 = 200 * 24;

/// User-tunable settings for the step core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    pub daily_goal: u64,
    /// Per-day figure used by the week/month estimators for days without history.
    pub estimated_daily_steps: u64,
    pub simulator: SimulatorConfig,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            daily_goal: DEFAULT_DAILY_GOAL,
            estimated_daily_steps: DEFAULT_ESTIMATED_DAILY_STEPS,
            simulator: SimulatorConfig::default(),
        }
    }
}

/// Auto-walk settings for the simulated sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub tick_interval_ms: u64,
    pub min_steps_per_tick: u64,
    pub max_steps_per_tick: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            min_steps_per_tick: 0,
            max_steps_per_tick: 12,
        }
    }
}

/// Loads the config, returning defaults if the file is missing or unreadable.
pub fn load_config(storage: &StorageConfig) -> StepsConfig {
    let path = storage.config_file();
    let content = match fs_err::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return StepsConfig::default(),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read config; using defaults");
            return StepsConfig::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Malformed config; using defaults");
            StepsConfig::default()
        }
    }
}

/// Saves the config atomically (temp file + rename).
pub fn save_config(storage: &StorageConfig, config: &StepsConfig) -> Result<()> {
    let path = storage.config_file();
    let content = serde_json::to_string_pretty(config).map_err(|source| StepsError::Json {
        context: "serialize config".to_string(),
        source,
    })?;

    fs_err::create_dir_all(storage.root()).map_err(|source| StepsError::Io {
        context: "create storage root".to_string(),
        source,
    })?;
    let mut temp = NamedTempFile::new_in(storage.root()).map_err(|source| StepsError::Io {
        context: "create temp config".to_string(),
        source,
    })?;
    temp.write_all(content.as_bytes())
        .and_then(|_| temp.flush())
        .map_err(|source| StepsError::Io {
            context: "write temp config".to_string(),
            source,
        })?;
    temp.persist(&path).map_err(|e| StepsError::Io {
        context: format!("persist {}", path.display()),
        source: e.error,
    })?;
    Ok(())
}
