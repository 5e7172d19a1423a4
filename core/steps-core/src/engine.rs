//! StepEngine - the main entry point for mobile and CLI clients.
//!
//! Wraps [`StepReconciliationService`] behind a synchronous, FFI-friendly API.
//! Every call is safe from any thread; sensor callbacks arrive on whatever
//! thread the host pedometer uses.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use steps_core::StepEngine;
//!
//! let engine = StepEngine::simulated(data_dir, Arc::new(OfflineRemote))?;
//! let today = engine.get_today_steps();
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{load_config, StepsConfig};
use crate::error::StepsFfiError;
use crate::ledger::{DailyStepLedger, FileLedgerStore};
use crate::remote::RemoteStepSource;
use crate::rewards::{daily_reward, goal_progress, GoalProgress};
use crate::sensor::{
    HostPedometer, SensorKind, SensorSessionManager, SensorVariant, SimulatedSensor, TrackingPhase,
};
use crate::service::{StepCallback, StepReconciliationService};
use crate::storage::StorageConfig;
use crate::types::{StepEstimate, StepSnapshot};

/// Receives live step totals while tracking. Implemented by the UI layer.
#[uniffi::export(with_foreign)]
pub trait StepUpdateListener: Send + Sync {
    fn on_steps(&self, steps: u64);
}

/// The main engine for step accounting.
#[derive(uniffi::Object)]
pub struct StepEngine {
    storage: StorageConfig,
    config: StepsConfig,
    service: StepReconciliationService,
}

impl StepEngine {
    /// Builds an engine from explicit parts.
    ///
    /// Used by tests and the CLI. Not exposed to FFI.
    pub fn with_parts(
        storage: StorageConfig,
        sensor: SensorVariant,
        remote: Arc<dyn RemoteStepSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StepsFfiError> {
        storage.ensure_dirs().map_err(|e| {
            StepsFfiError::from(format!(
                "Failed to create step storage at {}: {}",
                storage.root().display(),
                e
            ))
        })?;

        let config = load_config(&storage);
        let ledger = Arc::new(DailyStepLedger::new(
            Box::new(FileLedgerStore::new(&storage.ledger_file())),
            Arc::clone(&clock),
        ));
        let sessions = SensorSessionManager::new(sensor.into_sensor());
        let service = StepReconciliationService::new(ledger, sessions, remote, clock)
            .with_estimated_daily_steps(config.estimated_daily_steps);

        tracing::info!(
            root = %storage.root().display(),
            sensor = ?service.sessions().sensor_kind(),
            "Step engine ready"
        );
        Ok(Self {
            storage,
            config,
            service,
        })
    }

    pub fn service(&self) -> &StepReconciliationService {
        &self.service
    }

    /// Starts tracking with a Rust closure as the listener.
    pub fn start_tracking_with(&self, listener: StepCallback) -> bool {
        self.service.start_tracking(Some(listener))
    }
}

#[uniffi::export]
impl StepEngine {
    /// Engine backed by the device pedometer.
    #[uniffi::constructor]
    pub fn with_pedometer(
        data_dir: String,
        pedometer: Arc<dyn HostPedometer>,
        remote: Arc<dyn RemoteStepSource>,
    ) -> Result<Self, StepsFfiError> {
        Self::with_parts(
            StorageConfig::with_root(PathBuf::from(data_dir)),
            SensorVariant::SensorBacked(pedometer),
            remote,
            Arc::new(SystemClock),
        )
    }

    /// Engine backed by the auto-walking simulator, for devices without a pedometer.
    #[uniffi::constructor]
    pub fn simulated(
        data_dir: String,
        remote: Arc<dyn RemoteStepSource>,
    ) -> Result<Self, StepsFfiError> {
        let storage = StorageConfig::with_root(PathBuf::from(data_dir));
        let sensor = SimulatedSensor::with_auto_walk(load_config(&storage).simulator);
        Self::with_parts(
            storage,
            SensorVariant::Simulated(sensor),
            remote,
            Arc::new(SystemClock),
        )
    }

    /// Returns the data directory as a string.
    pub fn data_dir(&self) -> String {
        self.storage.root().to_string_lossy().to_string()
    }

    pub fn sensor_kind(&self) -> SensorKind {
        self.service.sessions().sensor_kind()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Sensor API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Whether a step sensor is available. When false, offer manual entry.
    pub fn is_available(&self) -> bool {
        self.service.is_available()
    }

    pub fn request_permission(&self) -> bool {
        self.service.request_permission()
    }

    /// Starts live tracking. `listener` is called once immediately with the
    /// current count and then for every update.
    pub fn start_tracking(&self, listener: Arc<dyn StepUpdateListener>) -> bool {
        let callback: StepCallback = Arc::new(move |steps: u64| listener.on_steps(steps));
        self.service.start_tracking(Some(callback))
    }

    pub fn stop_tracking(&self) {
        self.service.stop_tracking();
    }

    pub fn tracking_phase(&self) -> TrackingPhase {
        self.service.phase()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Steps API
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn get_today_steps(&self) -> u64 {
        self.service.get_today_steps()
    }

    /// Today's count with its source (sensor, ledger, or remote).
    pub fn today_snapshot(&self) -> StepSnapshot {
        self.service.today_snapshot()
    }

    /// Adds steps by hand. Negative values are rejected.
    pub fn add_manual_steps(&self, delta: i64) -> Result<u64, StepsFfiError> {
        self.service
            .add_manual_steps(delta)
            .map_err(StepsFfiError::from)
    }

    /// Approximate: only today is measured.
    pub fn get_week_steps(&self) -> u64 {
        self.service.get_week_steps()
    }

    /// Approximate: only today is measured.
    pub fn get_month_steps(&self) -> u64 {
        self.service.get_month_steps()
    }

    pub fn week_estimate(&self) -> StepEstimate {
        self.service.week_estimate()
    }

    pub fn month_estimate(&self) -> StepEstimate {
        self.service.month_estimate()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Rewards API
    // ─────────────────────────────────────────────────────────────────────────────

    /// Progress toward the configured daily goal.
    pub fn goal_progress(&self) -> GoalProgress {
        goal_progress(self.get_today_steps(), self.config.daily_goal)
    }

    /// Points today's count would earn at the end of the day.
    pub fn reward_preview(&self) -> u64 {
        daily_reward(self.get_today_steps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::remote::OfflineRemote;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Recorder(Mutex<Vec<u64>>);

    impl StepUpdateListener for Recorder {
        fn on_steps(&self, steps: u64) {
            self.0.lock().unwrap().push(steps);
        }
    }

    fn engine(temp: &TempDir, sensor: &SimulatedSensor) -> StepEngine {
        StepEngine::with_parts(
            StorageConfig::with_root(temp.path().to_path_buf()),
            SensorVariant::Simulated(sensor.clone()),
            Arc::new(OfflineRemote),
            Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())),
        )
        .unwrap()
    }

    #[test]
    fn test_foreign_listener_receives_updates() {
        let temp = TempDir::new().unwrap();
        let sensor = SimulatedSensor::new();
        let engine = engine(&temp, &sensor);
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));

        assert!(engine.start_tracking(recorder.clone()));
        sensor.walk(30);
        engine.stop_tracking();

        assert_eq!(*recorder.0.lock().unwrap(), vec![0, 30]);
        assert_eq!(engine.tracking_phase(), TrackingPhase::Idle);
    }

    #[test]
    fn test_rewards_follow_today_count() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp, &SimulatedSensor::new());

        engine.add_manual_steps(6_500).unwrap();
        assert_eq!(engine.reward_preview(), 6);
        assert_eq!(engine.goal_progress().percent, 65.0);
    }

    #[test]
    fn test_negative_manual_steps_surface_as_ffi_error() {
        let temp = TempDir::new().unwrap();
        let engine = engine(&temp, &SimulatedSensor::new());

        let err = engine.add_manual_steps(-1).unwrap_err();
        assert!(err.to_string().contains("cannot be negative"));
    }

    #[test]
    fn test_ledger_persists_across_engines() {
        let temp = TempDir::new().unwrap();
        engine(&temp, &SimulatedSensor::new())
            .add_manual_steps(1_234)
            .unwrap();

        assert_eq!(engine(&temp, &SimulatedSensor::new()).get_today_steps(), 1_234);
    }
}
