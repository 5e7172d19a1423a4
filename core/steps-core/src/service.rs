//! Step reconciliation: the one entry point for reading and changing today's steps.
//!
//! Combines the [`DailyStepLedger`], the [`SensorSessionManager`], and the
//! [`RemoteStepSource`] under the policy in [`crate::policy`].
//!
//! # Live Session Tally
//!
//! While tracking, the service keeps a tally per session:
//!
//! - `last_raw`: the sensor's latest cumulative reading
//! - `sensor_base`: `last_raw` at the most recent midnight inside the session
//! - `manual`: steps added by hand since the session (or day) began
//!
//! `total = max(last_raw - sensor_base + manual, ledger)` is written to the
//! ledger at every reading, so neither the persisted nor the displayed count
//! goes down within a day.
//!
//! # Locking
//!
//! `lifecycle` serializes start/stop so the tally and the sensor session are
//! swapped as one step. Below it the order is tally → ledger. Listeners are
//! called with no lock held, and only `lifecycle` is held across sensor calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Months, NaiveDate};

use crate::clock::Clock;
use crate::config::DEFAULT_ESTIMATED_DAILY_STEPS;
use crate::error::{Result, StepsError};
use crate::ledger::DailyStepLedger;
use crate::policy::{resolve_local, resolve_with_remote, LocalReadings, Resolution};
use crate::remote::RemoteStepSource;
use crate::sensor::{ReadingHandler, SensorReading, SensorSessionManager, TrackingPhase};
use crate::types::{StepEstimate, StepSnapshot};

/// UI listener for live step totals.
pub type StepCallback = Arc<dyn Fn(u64) + Send + Sync>;

struct LiveTally {
    session: u64,
    day: NaiveDate,
    sensor_base: u64,
    last_raw: u64,
    manual: u64,
    total: u64,
    listener: Option<StepCallback>,
}

impl LiveTally {
    fn new(session: u64, day: NaiveDate, listener: Option<StepCallback>) -> Self {
        Self {
            session,
            day,
            sensor_base: 0,
            last_raw: 0,
            manual: 0,
            total: 0,
            listener,
        }
    }

    /// Rebases the tally when the session crosses midnight.
    fn roll_to(&mut self, today: NaiveDate) {
        if self.day != today {
            tracing::info!(from = %self.day, to = %today, "Live step session crossed midnight");
            self.day = today;
            self.sensor_base = self.last_raw;
            self.manual = 0;
            self.total = 0;
        }
    }

    fn sensor_total(&self) -> u64 {
        self.last_raw
            .saturating_sub(self.sensor_base)
            .saturating_add(self.manual)
    }
}

/// State shared with the sensor reading handler.
struct Shared {
    ledger: Arc<DailyStepLedger>,
    clock: Arc<dyn Clock>,
    tally: Mutex<Option<LiveTally>>,
}

impl Shared {
    fn tally(&self) -> MutexGuard<'_, Option<LiveTally>> {
        self.tally.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn on_reading(&self, session: u64, reading: SensorReading) {
        let (total, listener) = {
            let mut guard = self.tally();
            let Some(tally) = guard.as_mut().filter(|t| t.session == session) else {
                return;
            };
            tally.roll_to(self.clock.today());
            if !reading.initial {
                tally.last_raw = reading.steps;
            }
            tally.total = self.ledger.raise_to(tally.sensor_total());
            // The initial reading is announced by `start_tracking` once the
            // lifecycle guard is released.
            if reading.initial {
                return;
            }
            (tally.total, tally.listener.clone())
        };

        if let Some(listener) = listener {
            listener(total);
        }
    }
}

/// Reconciles ledger, sensor, and remote into one "today's steps" figure.
pub struct StepReconciliationService {
    shared: Arc<Shared>,
    sessions: SensorSessionManager,
    remote: Arc<dyn RemoteStepSource>,
    estimated_daily_steps: u64,
    next_session: AtomicU64,
    lifecycle: Mutex<()>,
}

impl StepReconciliationService {
    pub fn new(
        ledger: Arc<DailyStepLedger>,
        sessions: SensorSessionManager,
        remote: Arc<dyn RemoteStepSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                ledger,
                clock,
                tally: Mutex::new(None),
            }),
            sessions,
            remote,
            estimated_daily_steps: DEFAULT_ESTIMATED_DAILY_STEPS,
            next_session: AtomicU64::new(0),
            lifecycle: Mutex::new(()),
        }
    }

    /// Sets the per-day figure the week/month estimators use.
    pub fn with_estimated_daily_steps(mut self, steps: u64) -> Self {
        self.estimated_daily_steps = steps;
        self
    }

    pub fn ledger(&self) -> &DailyStepLedger {
        &self.shared.ledger
    }

    pub fn sessions(&self) -> &SensorSessionManager {
        &self.sessions
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Sensor
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn is_available(&self) -> bool {
        self.sessions.is_available()
    }

    pub fn request_permission(&self) -> bool {
        self.sessions.request_permission()
    }

    pub fn phase(&self) -> TrackingPhase {
        self.sessions.phase()
    }

    /// Starts live tracking. Each reading is saved to the ledger and sent to
    /// `listener`. Returns `false` if the sensor could not be started; the
    /// caller should offer manual entry instead.
    ///
    /// The listener receives the current total once before this returns, and
    /// may call [`stop_tracking`](Self::stop_tracking) from inside that call.
    pub fn start_tracking(&self, listener: Option<StepCallback>) -> bool {
        let session = {
            let _lifecycle = self.lifecycle();
            let session = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
            *self.shared.tally() = Some(LiveTally::new(session, self.shared.clock.today(), listener));

            let shared = Arc::clone(&self.shared);
            let handler: ReadingHandler =
                Arc::new(move |reading: SensorReading| shared.on_reading(session, reading));
            if !self.sessions.start(handler) {
                *self.shared.tally() = None;
                return false;
            }
            session
        };

        let announce = self
            .shared
            .tally()
            .as_ref()
            .filter(|t| t.session == session)
            .and_then(|t| t.listener.clone().map(|listener| (listener, t.total)));
        if let Some((listener, total)) = announce {
            listener(total);
        }
        true
    }

    /// Stops live tracking. The ledger keeps the last total as today's record.
    pub fn stop_tracking(&self) {
        let _lifecycle = self.lifecycle();
        self.sessions.stop();
        *self.shared.tally() = None;
    }

    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Counts
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn get_today_steps(&self) -> u64 {
        self.today_snapshot().steps
    }

    /// Today's count and the source it came from.
    pub fn today_snapshot(&self) -> StepSnapshot {
        let readings = {
            let mut tally = self.shared.tally();
            let today = self.shared.clock.today();
            let sensor = tally.as_mut().map(|t| {
                t.roll_to(today);
                t.total.max(t.sensor_total())
            });
            LocalReadings {
                sensor,
                ledger: self.shared.ledger.load(),
            }
        };

        match resolve_local(readings) {
            Resolution::Resolved(snapshot) => snapshot,
            Resolution::NeedsRemote { ledger } => {
                let remote = match self.remote.fetch_today_steps().into_result() {
                    Ok(steps) => Some(self.shared.ledger.raise_to(steps)),
                    Err(err) => {
                        tracing::warn!(error = %err, "Remote step source unavailable; using local count");
                        None
                    }
                };
                resolve_with_remote(ledger, remote)
            }
        }
    }

    /// Adds steps by hand. Works with or without a live session; while
    /// tracking, the added steps carry into every later sensor total.
    pub fn add_manual_steps(&self, delta: i64) -> Result<u64> {
        let added = u64::try_from(delta).map_err(|_| StepsError::negative_steps(delta))?;

        let (total, listener) = {
            let mut guard = self.shared.tally();
            match guard.as_mut() {
                Some(tally) => {
                    tally.roll_to(self.shared.clock.today());
                    tally.manual = tally.manual.saturating_add(added);
                    let ledger_total = self.shared.ledger.add(delta);
                    let total = self
                        .shared
                        .ledger
                        .raise_to(ledger_total.max(tally.sensor_total()));
                    tally.total = total;
                    (total, tally.listener.clone())
                }
                None => (self.shared.ledger.add(delta), None),
            }
        };

        tracing::info!(added, total, "Manual steps added");
        if let Some(listener) = listener {
            listener(total);
        }
        Ok(total)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Estimates (approximate)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Approximate steps for the last 7 days, today included.
    ///
    /// No per-day history is kept: only today is measured and every earlier
    /// day counts as the configured daily estimate.
    pub fn get_week_steps(&self) -> u64 {
        self.week_estimate().steps
    }

    /// Approximate steps since the same date last month. See [`get_week_steps`](Self::get_week_steps).
    pub fn get_month_steps(&self) -> u64 {
        self.month_estimate().steps
    }

    pub fn week_estimate(&self) -> StepEstimate {
        self.range_estimate(6)
    }

    pub fn month_estimate(&self) -> StepEstimate {
        let today = self.shared.clock.today();
        let month_ago = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(today);
        let span = (today - month_ago).num_days().max(1) as u64;
        self.range_estimate(span - 1)
    }

    /// Today's count plus `prior_days` estimated days.
    pub fn range_estimate(&self, prior_days: u64) -> StepEstimate {
        let today = self.get_today_steps();
        StepEstimate {
            steps: today.saturating_add(prior_days.saturating_mul(self.estimated_daily_steps)),
            days: prior_days + 1,
            approximate: true,
        }
    }
}
