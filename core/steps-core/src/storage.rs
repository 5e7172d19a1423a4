//! Storage configuration and path management.
//!
//! `StorageConfig` owns every on-device path the step core touches, so hosts
//! (iOS/Android sandboxes, the desktop CLI, tests) only decide the root.
//!
//! ## Design Principles
//!
//! - **Single source of truth**: All path decisions centralized here
//! - **Testable**: `StorageConfig::with_root()` enables test injection

use std::path::{Path, PathBuf};

const DEFAULT_DIR_NAME: &str = ".steps-rewards";

/// Central configuration for all step-core storage paths.
///
/// Production desktop code uses `StorageConfig::default()` which points to
/// `~/.steps-rewards/`. Mobile hosts pass their sandboxed data directory.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            root: home.join(DEFAULT_DIR_NAME),
        }
    }
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the root directory for step data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to daily-steps.json (the persisted date/steps pair).
    pub fn ledger_file(&self) -> PathBuf {
        self.root.join("daily-steps.json")
    }

    /// Path to config.json (goal and simulator preferences).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to logs/ directory (rolling CLI logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)?;
        fs_err::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_root_is_steps_rewards() {
        let config = StorageConfig::default();
        assert!(config.root().ends_with(".steps-rewards"));
    }

    #[test]
    fn test_with_root_sets_custom_path() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/test-steps"));
        assert_eq!(config.root(), Path::new("/tmp/test-steps"));
    }

    #[test]
    fn test_ledger_and_config_paths() {
        let config = StorageConfig::with_root(PathBuf::from("/tmp/steps"));
        assert_eq!(
            config.ledger_file(),
            PathBuf::from("/tmp/steps/daily-steps.json")
        );
        assert_eq!(config.config_file(), PathBuf::from("/tmp/steps/config.json"));
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/steps/logs"));
    }

    #[test]
    fn test_ensure_dirs_creates_structure() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path().join("nested"));

        config.ensure_dirs().unwrap();

        assert!(config.root().exists());
        assert!(config.logs_dir().exists());
    }
}
