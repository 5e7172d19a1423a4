//! Live sensor session state machine.
//!
//! ```text
//! Idle ──start──▶ Starting ──subscribed──▶ Tracking ──stop──▶ Idle
//!                    │                        │
//!                    └──unavailable/denied/───┘ start (tears down first)
//!                       subscribe error ──▶ Idle
//! ```
//!
//! At most one subscription is open at any time. `start` while tracking
//! closes the existing subscription before opening the next, and the session
//! generation stamped on every sink stops a replaced subscription from
//! delivering anything further.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, StepsError};

use super::{
    ReadingHandler, SensorKind, SensorReading, SensorSink, SensorSubscription, SessionShared,
    StepSensor, TrackingPhase,
};

/// An open subscription, exclusively owned by the manager.
struct TrackingSession {
    generation: u64,
    subscription: Box<dyn SensorSubscription>,
}

impl TrackingSession {
    fn close(self) {
        self.subscription.close();
    }
}

enum SessionSlot {
    Idle,
    Starting,
    Tracking(TrackingSession),
}

impl SessionSlot {
    fn phase(&self) -> TrackingPhase {
        match self {
            SessionSlot::Idle => TrackingPhase::Idle,
            SessionSlot::Starting => TrackingPhase::Starting,
            SessionSlot::Tracking(_) => TrackingPhase::Tracking,
        }
    }
}

/// Owns the lifecycle of the single live step-sensor subscription.
pub struct SensorSessionManager {
    sensor: Arc<dyn StepSensor>,
    /// Serializes start/stop sequences.
    lifecycle: Mutex<()>,
    slot: Mutex<SessionSlot>,
    shared: Arc<SessionShared>,
    next_generation: AtomicU64,
}

impl SensorSessionManager {
    pub fn new(sensor: Arc<dyn StepSensor>) -> Self {
        Self {
            sensor,
            lifecycle: Mutex::new(()),
            slot: Mutex::new(SessionSlot::Idle),
            shared: Arc::new(SessionShared::default()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn sensor_kind(&self) -> SensorKind {
        self.sensor.kind()
    }

    /// Whether the device exposes a step sensor. Fails closed.
    pub fn is_available(&self) -> bool {
        match self.sensor.is_available() {
            Ok(available) => available,
            Err(err) => {
                tracing::warn!(error = %err, "Step sensor availability check failed");
                false
            }
        }
    }

    /// Requests permission to read the sensor. Errors count as denied.
    pub fn request_permission(&self) -> bool {
        match self.sensor.request_permission() {
            Ok(granted) => granted,
            Err(err) => {
                tracing::warn!(error = %err, "Step sensor permission request failed");
                false
            }
        }
    }

    /// Starts a session, returning `false` if the sensor could not be opened.
    pub fn start(&self, handler: ReadingHandler) -> bool {
        match self.try_start(handler) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Step tracking not started");
                false
            }
        }
    }

    /// Like [`start`](Self::start) but reports why the session did not open.
    ///
    /// On success the handler receives one initial reading with the current
    /// known count before this call returns.
    pub fn try_start(&self, handler: ReadingHandler) -> Result<()> {
        let generation = {
            let _lifecycle = self.lifecycle();
            self.close_current("restart");
            *self.slot() = SessionSlot::Starting;

            match self.open(Arc::clone(&handler)) {
                Ok(session) => {
                    let generation = session.generation;
                    self.shared.activate(generation);
                    *self.slot() = SessionSlot::Tracking(session);
                    tracing::info!(generation, kind = ?self.sensor.kind(), "Step tracking started");
                    generation
                }
                Err(err) => {
                    *self.slot() = SessionSlot::Idle;
                    return Err(err);
                }
            }
        };

        // Delivered outside the lifecycle guard so the handler may call stop().
        if self.shared.is_current(generation) {
            handler(SensorReading::initial(self.shared.last_known()));
        }
        Ok(())
    }

    /// Closes the open subscription, if any. Idempotent.
    ///
    /// A reading already being delivered on a sensor thread when this is
    /// called may still reach the handler after it returns. Handlers must
    /// tolerate one trailing reading.
    pub fn stop(&self) {
        let _lifecycle = self.lifecycle();
        self.close_current("stop");
    }

    pub fn phase(&self) -> TrackingPhase {
        self.slot().phase()
    }

    pub fn is_tracking(&self) -> bool {
        self.phase() == TrackingPhase::Tracking
    }


    /// Most recent cumulative value reported in the open session.
    pub fn last_known_delta(&self) -> Option<u64> {
        self.is_tracking().then(|| self.shared.last_known())
    }

    fn open(&self, handler: ReadingHandler) -> Result<TrackingSession> {
        if !self.is_available() {
            return Err(StepsError::Unavailable);
        }
        if !self.request_permission() {
            return Err(StepsError::PermissionDenied);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sink = SensorSink::new(generation, Arc::clone(&self.shared), handler);
        let subscription = self.sensor.subscribe(sink)?;
        Ok(TrackingSession {
            generation,
            subscription,
        })
    }

    fn close_current(&self, reason: &'static str) {
        let previous = std::mem::replace(&mut *self.slot(), SessionSlot::Idle);
        if let SessionSlot::Tracking(session) = previous {
            self.shared.deactivate();
            tracing::info!(generation = session.generation, reason, "Step tracking stopped");
            session.close();
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for SensorSessionManager {
    fn drop(&mut self) {
        self.close_current("drop");
    }
}
