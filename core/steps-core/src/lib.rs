//! # steps-core
//!
//! Daily step accounting for the steps-for-rewards clients (iOS, Android,
//! desktop CLI).
//!
//! Keeps one authoritative "today's step count" reconciled from three
//! unreliable sources: the backend's reported count, a locally persisted
//! running count, and a live step-sensor stream.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Clients can wrap with async if needed.
//! - **Thread-safe**: Sensor callbacks may arrive on any thread.
//! - **Graceful degradation**: Storage, sensor, and remote faults are logged and
//!   replaced with safe defaults. Only invalid input is reported to callers.
//! - **FFI-ready**: UniFFI annotations enable Swift and Kotlin bindings.
//!   Prefer additive public API changes; removing or renaming breaks FFI clients.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use steps_core::{OfflineRemote, StepEngine};
//!
//! let engine = StepEngine::simulated(data_dir, Arc::new(OfflineRemote))?;
//! engine.add_manual_steps(1_000)?;
//! let snapshot = engine.today_snapshot();
//! ```

// UniFFI scaffolding for Swift/Kotlin bindings
uniffi::setup_scaffolding!();

// Public modules
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod remote;
pub mod rewards;
pub mod sensor;
pub mod service;
pub mod storage;
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_config, save_config, SimulatorConfig, StepsConfig};
pub use engine::{StepEngine, StepUpdateListener};
pub use error::{Result, StepsError, StepsFfiError};
pub use ledger::{DailyStepLedger, DailyStepRecord, FileLedgerStore, LedgerStore, MemoryLedgerStore};
pub use remote::{FixedRemote, OfflineRemote, RemoteStepSource, RemoteStepsResponse};
pub use rewards::{daily_reward, goal_progress, GoalProgress, MotivationTier};
pub use sensor::{
    HostPedometer, SensorKind, SensorSessionManager, SensorVariant, SimulatedSensor, StepSensor,
    TrackingPhase,
};
pub use service::{StepCallback, StepReconciliationService};
pub use storage::StorageConfig;
pub use types::{StepEstimate, StepSnapshot, StepSource};
