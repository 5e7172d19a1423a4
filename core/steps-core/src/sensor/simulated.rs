//! In-process step sensor.
//!
//! Stands in for the pedometer on devices that have none, in an emulator,
//! and in tests. Steps are produced either by hand through [`SimulatedSensor::walk`]
//! or by an optional auto-walk worker that adds a random increment every tick.
//! Clones share state, so the caller keeps a clone to drive the sensor after
//! handing one to a session manager.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::config::SimulatorConfig;
use crate::error::{Result, StepsError};

use super::{SensorKind, SensorSink, SensorSubscription, StepSensor};

struct SimulatedStream {
    id: u64,
    sink: SensorSink,
    total: u64,
}

struct SimulatedInner {
    available: AtomicBool,
    permission: AtomicBool,
    fail_next_subscribe: AtomicBool,
    auto_walk: Option<SimulatorConfig>,
    streams: Mutex<Vec<SimulatedStream>>,
    last_sink: Mutex<Option<SensorSink>>,
    next_id: AtomicU64,
}

impl SimulatedInner {
    fn streams(&self) -> MutexGuard<'_, Vec<SimulatedStream>> {
        self.streams.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advances matching streams. Sinks are pushed after the lock is released.
    fn advance(&self, only: Option<u64>, steps: u64) {
        let pending: Vec<(SensorSink, u64)> = self
            .streams()
            .iter_mut()
            .filter(|stream| only.map_or(true, |id| stream.id == id))
            .map(|stream| {
                stream.total = stream.total.saturating_add(steps);
                (stream.sink.clone(), stream.total)
            })
            .collect();

        for (sink, total) in pending {
            sink.push(total);
        }
    }

    fn remove(&self, id: u64) {
        self.streams().retain(|stream| stream.id != id);
    }
}

/// Simulated pedometer. Always available and permitted unless told otherwise.
#[derive(Clone)]
pub struct SimulatedSensor {
    inner: Arc<SimulatedInner>,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSensor {
    /// A sensor that only moves when [`walk`](Self::walk) is called.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A sensor whose subscriptions walk on their own, one tick per interval.
    pub fn with_auto_walk(config: SimulatorConfig) -> Self {
        Self::build(Some(config))
    }

    fn build(auto_walk: Option<SimulatorConfig>) -> Self {
        Self {
            inner: Arc::new(SimulatedInner {
                available: AtomicBool::new(true),
                permission: AtomicBool::new(true),
                fail_next_subscribe: AtomicBool::new(false),
                auto_walk,
                streams: Mutex::new(Vec::new()),
                last_sink: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Adds `steps` to every open subscription's running total.
    pub fn walk(&self, steps: u64) {
        self.inner.advance(None, steps);
    }

    /// Reports a read error to every open subscription.
    pub fn fail_read(&self, message: &str) {
        let sinks: Vec<SensorSink> = self
            .inner
            .streams()
            .iter()
            .map(|stream| stream.sink.clone())
            .collect();
        for sink in sinks {
            sink.fail(message);
        }
    }

    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn set_permission(&self, granted: bool) {
        self.inner.permission.store(granted, Ordering::SeqCst);
    }

    /// Makes the next `subscribe` call fail.
    pub fn fail_next_subscribe(&self) {
        self.inner.fail_next_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn open_subscriptions(&self) -> usize {
        self.inner.streams().len()
    }

    /// The sink handed to the most recent subscription.
    pub fn last_sink(&self) -> Option<SensorSink> {
        self.inner
            .last_sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn spawn_auto_walk(&self, id: u64, config: &SimulatorConfig) -> Result<Sender<()>> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let inner = Arc::clone(&self.inner);
        let interval = Duration::from_millis(config.tick_interval_ms.max(1));
        let low = config.min_steps_per_tick.min(config.max_steps_per_tick);
        let high = config.min_steps_per_tick.max(config.max_steps_per_tick);

        thread::Builder::new()
            .name("simulated-pedometer".to_string())
            .spawn(move || {
                let mut rng = rand::thread_rng();
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            inner.advance(Some(id), rng.gen_range(low..=high));
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| StepsError::Subscription(format!("failed to spawn simulator: {e}")))?;
        Ok(stop_tx)
    }
}

impl StepSensor for SimulatedSensor {
    fn kind(&self) -> SensorKind {
        SensorKind::Simulated
    }

    fn is_available(&self) -> Result<bool> {
        Ok(self.inner.available.load(Ordering::SeqCst))
    }

    fn request_permission(&self) -> Result<bool> {
        Ok(self.inner.permission.load(Ordering::SeqCst))
    }

    fn subscribe(&self, sink: SensorSink) -> Result<Box<dyn SensorSubscription>> {
        if self.inner.fail_next_subscribe.swap(false, Ordering::SeqCst) {
            return Err(StepsError::Subscription(
                "simulated subscription failure".to_string(),
            ));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stop = match &self.inner.auto_walk {
            Some(config) => Some(self.spawn_auto_walk(id, config)?),
            None => None,
        };

        *self.inner.last_sink.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink.clone());
        self.inner.streams().push(SimulatedStream { id, sink, total: 0 });

        Ok(Box::new(SimulatedSubscription {
            id,
            inner: Arc::clone(&self.inner),
            _stop: stop,
        }))
    }
}

/// Dropping the stop sender disconnects the auto-walk worker, which exits at
/// its next wake-up.
struct SimulatedSubscription {
    id: u64,
    inner: Arc<SimulatedInner>,
    _stop: Option<Sender<()>>,
}

impl SensorSubscription for SimulatedSubscription {
    fn close(self: Box<Self>) {}
}

impl Drop for SimulatedSubscription {
    fn drop(&mut self) {
        self.inner.remove(self.id);
    }
}
