//! Step sensor capability and live session management.
//!
//! # Architecture
//!
//! ```text
//! Host pedometer / simulator → SensorSink → SensorSessionManager → ReadingHandler
//!        (StepSensor)            (stamped)      (one session max)     (reconciliation)
//! ```
//!
//! A sensor is anything implementing [`StepSensor`]. Two variants exist and
//! are picked once, at construction, through [`SensorVariant`]:
//!
//! - [`PedometerSensor`]: the device pedometer, driven by the host over FFI
//! - [`SimulatedSensor`]: in-process, for devices without a sensor and for tests
//!
//! Sensors report the running total since their subscription opened. The
//! session layer forwards that value untouched.
//!
//! # Module Structure
//!
//! - [`pedometer`]: FFI-facing host pedometer bridge
//! - [`session`]: `Idle → Starting → Tracking` state machine
//! - [`simulated`]: auto-walking and hand-driven simulator

mod pedometer;
mod session;
mod simulated;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Result;

pub use pedometer::{HostPedometer, PedometerSensor, PedometerSink};
pub use session::SensorSessionManager;
pub use simulated::SimulatedSensor;

/// Which sensor variant backs a session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, serde::Serialize)]
pub enum SensorKind {
    Pedometer,
    Simulated,
}

/// Lifecycle phase of the live sensor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, serde::Serialize)]
pub enum TrackingPhase {
    Idle,
    Starting,
    Tracking,
}

/// One value delivered to a session's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    /// Running total since the subscription opened.
    pub steps: u64,
    /// Set only for the synchronous reading delivered by `start`.
    pub initial: bool,
}

impl SensorReading {
    pub fn initial(steps: u64) -> Self {
        Self {
            steps,
            initial: true,
        }
    }

    pub fn reported(steps: u64) -> Self {
        Self {
            steps,
            initial: false,
        }
    }
}

/// Callback invoked for each reading. Runs on whatever thread the sensor uses,
/// and can see one last reading racing a concurrent `stop`.
pub type ReadingHandler = Arc<dyn Fn(SensorReading) + Send + Sync>;

/// Capability interface every sensor variant implements.
///
/// Implementors should:
/// - Report detection failures as `Err`, never panic
/// - Push cumulative counts into the sink, from any thread
pub trait StepSensor: Send + Sync {
    fn kind(&self) -> SensorKind;

    fn is_available(&self) -> Result<bool>;

    /// Prompts for (or checks) runtime permission. Never assumed granted.
    fn request_permission(&self) -> Result<bool>;

    /// Opens a subscription delivering readings into `sink`.
    fn subscribe(&self, sink: SensorSink) -> Result<Box<dyn SensorSubscription>>;
}

/// Owned handle to an open sensor subscription.
pub trait SensorSubscription: Send {
    /// Releases the underlying sensor listener.
    fn close(self: Box<Self>);
}

/// Selects the sensor backing a session manager.
pub enum SensorVariant {
    SensorBacked(Arc<dyn HostPedometer>),
    Simulated(SimulatedSensor),
}

impl SensorVariant {
    pub fn into_sensor(self) -> Arc<dyn StepSensor> {
        match self {
            SensorVariant::SensorBacked(host) => Arc::new(PedometerSensor::new(host)),
            SensorVariant::Simulated(simulated) => Arc::new(simulated),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink
// ─────────────────────────────────────────────────────────────────────────────

/// Generation bookkeeping shared by a manager and every sink it hands out.
#[derive(Debug, Default)]
pub(crate) struct SessionShared {
    /// Generation of the open session; 0 when idle.
    current: AtomicU64,
    last_known: AtomicU64,
}

impl SessionShared {
    fn activate(&self, generation: u64) {
        self.last_known.store(0, Ordering::SeqCst);
        self.current.store(generation, Ordering::SeqCst);
    }

    fn deactivate(&self) {
        self.current.store(0, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        generation != 0 && self.current.load(Ordering::SeqCst) == generation
    }

    fn last_known(&self) -> u64 {
        self.last_known.load(Ordering::SeqCst)
    }
}

/// Entry point sensors push readings into.
///
/// Each sink belongs to one session generation. Once that session is closed
/// or replaced, pushes into the sink are dropped.
#[derive(Clone)]
pub struct SensorSink {
    generation: u64,
    shared: Arc<SessionShared>,
    handler: ReadingHandler,
}

impl SensorSink {
    pub(crate) fn new(generation: u64, shared: Arc<SessionShared>, handler: ReadingHandler) -> Self {
        Self {
            generation,
            shared,
            handler,
        }
    }

    /// Forwards a cumulative count if this sink's session is still open.
    pub fn push(&self, steps: u64) {
        if !self.shared.is_current(self.generation) {
            tracing::trace!(generation = self.generation, steps, "Dropping reading from closed session");
            return;
        }
        self.shared.last_known.store(steps, Ordering::SeqCst);
        tracing::debug!(generation = self.generation, steps, "Step sensor reading");
        (self.handler)(SensorReading::reported(steps));
    }

    /// Records a sensor read error. The session stays open.
    pub fn fail(&self, message: &str) {
        if self.shared.is_current(self.generation) {
            tracing::warn!(
                generation = self.generation,
                error = message,
                "Step sensor read failed; session continues"
            );
        }
    }

    pub fn is_current(&self) -> bool {
        self.shared.is_current(self.generation)
    }
}

impl std::fmt::Debug for SensorSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
