//! Device pedometer bridge.
//!
//! The host app (Swift/Kotlin) implements [`HostPedometer`] on top of the
//! platform step-counter API. Rust hands the host a [`PedometerSink`] for each
//! subscription; the host pushes the platform's running count into it.

use std::sync::Arc;

use crate::error::{Result, StepsError};

use super::{SensorKind, SensorSink, SensorSubscription, StepSensor};

/// Platform pedometer, implemented by the host app.
///
/// Implementors should map every platform error to `false` / `None`; the
/// Rust side treats those as "unavailable", "denied", and "subscribe failed".
#[uniffi::export(with_foreign)]
pub trait HostPedometer: Send + Sync {
    fn is_available(&self) -> bool;

    fn request_permission(&self) -> bool;

    /// Starts watching the step count. Returns a host-side handle, or `None`
    /// if the platform refused the subscription.
    fn watch_step_count(&self, sink: Arc<PedometerSink>) -> Option<u64>;

    /// Removes the subscription identified by `handle`.
    fn remove_subscription(&self, handle: u64);
}

/// Receiver the host pushes pedometer events into.
#[derive(uniffi::Object)]
pub struct PedometerSink {
    sink: SensorSink,
}

#[uniffi::export]
impl PedometerSink {
    /// Platform-reported step count since the subscription started.
    pub fn report_steps(&self, steps: u64) {
        self.sink.push(steps);
    }

    /// Platform read error. Logged; the session stays open.
    pub fn report_error(&self, message: String) {
        self.sink.fail(&message);
    }

    /// False once the session this sink belongs to has been stopped or replaced.
    pub fn is_active(&self) -> bool {
        self.sink.is_current()
    }
}

/// [`StepSensor`] backed by the host pedometer.
pub struct PedometerSensor {
    host: Arc<dyn HostPedometer>,
}

impl PedometerSensor {
    pub fn new(host: Arc<dyn HostPedometer>) -> Self {
        Self { host }
    }
}

impl StepSensor for PedometerSensor {
    fn kind(&self) -> SensorKind {
        SensorKind::Pedometer
    }

    fn is_available(&self) -> Result<bool> {
        Ok(self.host.is_available())
    }

    fn request_permission(&self) -> Result<bool> {
        Ok(self.host.request_permission())
    }

    fn subscribe(&self, sink: SensorSink) -> Result<Box<dyn SensorSubscription>> {
        let handle = self
            .host
            .watch_step_count(Arc::new(PedometerSink { sink }))
            .ok_or_else(|| StepsError::Subscription("host pedometer refused to watch".to_string()))?;
        Ok(Box::new(PedometerSubscription {
            host: Arc::clone(&self.host),
            handle,
        }))
    }
}

struct PedometerSubscription {
    host: Arc<dyn HostPedometer>,
    handle: u64,
}

impl SensorSubscription for PedometerSubscription {
    fn close(self: Box<Self>) {
        self.host.remove_subscription(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{ReadingHandler, SensorReading, SensorSessionManager, TrackingPhase};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeHost {
        available: bool,
        granted: bool,
        sinks: Mutex<Vec<(u64, Arc<PedometerSink>)>>,
        removed: Mutex<Vec<u64>>,
    }

    impl FakeHost {
        fn ready() -> Self {
            Self {
                available: true,
                granted: true,
                ..Self::default()
            }
        }

        fn latest_sink(&self) -> Arc<PedometerSink> {
            Arc::clone(&self.sinks.lock().unwrap().last().unwrap().1)
        }
    }

    impl HostPedometer for FakeHost {
        fn is_available(&self) -> bool {
            self.available
        }

        fn request_permission(&self) -> bool {
            self.granted
        }

        fn watch_step_count(&self, sink: Arc<PedometerSink>) -> Option<u64> {
            let mut sinks = self.sinks.lock().unwrap();
            let handle = sinks.len() as u64 + 1;
            sinks.push((handle, sink));
            Some(handle)
        }

        fn remove_subscription(&self, handle: u64) {
            self.removed.lock().unwrap().push(handle);
        }
    }

    fn recording_handler() -> (ReadingHandler, Arc<Mutex<Vec<SensorReading>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: ReadingHandler = Arc::new(move |reading: SensorReading| sink.lock().unwrap().push(reading));
        (handler, seen)
    }

    #[test]
    fn test_host_readings_reach_handler() {
        let host = Arc::new(FakeHost::ready());
        let manager = SensorSessionManager::new(Arc::new(PedometerSensor::new(host.clone())));
        let (handler, seen) = recording_handler();

        assert!(manager.start(handler));
        host.latest_sink().report_steps(120);

        assert_eq!(seen.lock().unwrap().last(), Some(&SensorReading::reported(120)));
        assert_eq!(manager.sensor_kind(), SensorKind::Pedometer);
    }

    #[test]
    fn test_restart_removes_previous_host_subscription() {
        let host = Arc::new(FakeHost::ready());
        let manager = SensorSessionManager::new(Arc::new(PedometerSensor::new(host.clone())));
        let (handler, seen) = recording_handler();

        manager.start(Arc::clone(&handler));
        let first = host.latest_sink();
        manager.start(handler);

        assert_eq!(*host.removed.lock().unwrap(), vec![1]);
        assert!(!first.is_active());
        first.report_steps(999);
        assert!(seen.lock().unwrap().iter().all(|r| r.steps != 999));
    }

    #[test]
    fn test_unavailable_host_never_subscribes() {
        let host = Arc::new(FakeHost::default());
        let manager = SensorSessionManager::new(Arc::new(PedometerSensor::new(host.clone())));
        let (handler, _) = recording_handler();

        assert!(!manager.start(handler));
        assert_eq!(manager.phase(), TrackingPhase::Idle);
        assert!(host.sinks.lock().unwrap().is_empty());
    }
}
