//! Daily step ledger: the locally persisted "steps taken today" value.
//!
//! The ledger holds exactly one `(date, steps)` pair. Rollover is detected
//! lazily on read: a pair whose date is not today is replaced by `(today, 0)`.
//! There is no timer, so a process that was closed across midnight still
//! rolls over correctly on its next read.
//!
//! # File Format
//!
//! ```json
//! { "steps_date": "2024-05-01", "daily_steps": 4210 }
//! ```
//!
//! Both keys are always written together through a temp file + rename, so a
//! reader sees either the old pair or the new pair.
//!
//! # Fault Handling
//!
//! Read and write failures are logged and treated as "no record". Losing the
//! local cache degrades the count; it never blocks the caller. Only an
//! explicit [`DailyStepLedger::save`] reports a failed write.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::clock::Clock;
use crate::error::{Result, StepsError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The single live ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyStepRecord {
    pub date: NaiveDate,
    pub steps: u64,
}

impl DailyStepRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self { date, steps: 0 }
    }
}

/// Persistence backend for the ledger pair.
pub trait LedgerStore: Send + Sync {
    /// Returns `Ok(None)` when no usable record exists.
    fn read(&self) -> Result<Option<DailyStepRecord>>;

    /// Replaces the stored pair as a unit.
    fn write(&self, record: &DailyStepRecord) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed store
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk layout. Keys are independent scalars; missing keys deserialize as
/// `None` so a half-written legacy file reads as "no record".
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPair {
    #[serde(default)]
    steps_date: Option<String>,
    #[serde(default)]
    daily_steps: Option<i64>,
}

impl StoredPair {
    fn into_record(self) -> Option<DailyStepRecord> {
        let date = NaiveDate::parse_from_str(self.steps_date.as_deref()?, DATE_FORMAT).ok()?;
        let steps = u64::try_from(self.daily_steps?).ok()?;
        Some(DailyStepRecord { date, steps })
    }
}

impl From<&DailyStepRecord> for StoredPair {
    fn from(record: &DailyStepRecord) -> Self {
        StoredPair {
            steps_date: Some(record.date.format(DATE_FORMAT).to_string()),
            daily_steps: Some(i64::try_from(record.steps).unwrap_or(i64::MAX)),
        }
    }
}

/// Ledger pair stored as JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl LedgerStore for FileLedgerStore {
    fn read(&self) -> Result<Option<DailyStepRecord>> {
        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StepsError::Io {
                    context: "read step ledger".to_string(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let pair: StoredPair = serde_json::from_str(&content).map_err(|source| StepsError::Json {
            context: format!("parse {}", self.path.display()),
            source,
        })?;
        Ok(pair.into_record())
    }

    fn write(&self, record: &DailyStepRecord) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| StepsError::Storage {
            context: "write step ledger".to_string(),
            details: "ledger path has no parent directory".to_string(),
        })?;
        fs_err::create_dir_all(parent).map_err(|source| StepsError::Io {
            context: "create ledger directory".to_string(),
            source,
        })?;

        let content =
            serde_json::to_string(&StoredPair::from(record)).map_err(|source| StepsError::Json {
                context: "serialize step ledger".to_string(),
                source,
            })?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|source| StepsError::Io {
            context: "create temp ledger file".to_string(),
            source,
        })?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|source| StepsError::Io {
                context: "write temp ledger file".to_string(),
                source,
            })?;
        temp.persist(&self.path).map_err(|e| StepsError::Io {
            context: format!("persist {}", self.path.display()),
            source: e.error,
        })?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// Ledger pair kept in memory; for tests and hosts without writable storage.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    record: Mutex<Option<DailyStepRecord>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn read(&self) -> Result<Option<DailyStepRecord>> {
        Ok(*self.record.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn write(&self, record: &DailyStepRecord) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(*record);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger
// ─────────────────────────────────────────────────────────────────────────────

/// Today's locally recorded step count, durable across restarts.
///
/// All reads and writes are serialized by one guard, so `add` is a single
/// read-modify-write with respect to every other ledger call.
pub struct DailyStepLedger {
    store: Box<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    guard: Mutex<()>,
}

impl DailyStepLedger {
    pub fn new(store: Box<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            guard: Mutex::new(()),
        }
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Box::new(MemoryLedgerStore::new()), clock)
    }

    /// Reads today's steps, rolling a stale or missing record over to `(today, 0)`.
    pub fn load(&self) -> u64 {
        let _guard = self.lock();
        self.load_locked()
    }

    /// Persists `(today, steps)`. Negative input is rejected and nothing is
    /// written; a store failure is logged and returned.
    pub fn save(&self, steps: i64) -> Result<()> {
        let steps = u64::try_from(steps).map_err(|_| StepsError::negative_steps(steps))?;
        let _guard = self.lock();
        let record = DailyStepRecord {
            date: self.clock.today(),
            steps,
        };
        self.store.write(&record).map_err(|err| {
            tracing::warn!(error = %err, steps, "Failed to persist step ledger");
            err
        })
    }

    /// Adds `delta` to today's total, clamping at zero. Returns the new total.
    pub fn add(&self, delta: i64) -> u64 {
        let _guard = self.lock();
        let current = self.load_locked();
        let total = (i128::from(current) + i128::from(delta)).clamp(0, i128::from(u64::MAX)) as u64;
        self.write_locked(DailyStepRecord {
            date: self.clock.today(),
            steps: total,
        });
        total
    }

    /// Raises today's total to at least `steps` and returns the result.
    /// Never lowers the stored value.
    pub fn raise_to(&self, steps: u64) -> u64 {
        let _guard = self.lock();
        let current = self.load_locked();
        if steps <= current {
            return current;
        }
        self.write_locked(DailyStepRecord {
            date: self.clock.today(),
            steps,
        });
        steps
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load_locked(&self) -> u64 {
        let today = self.clock.today();
        match self.store.read() {
            Ok(Some(record)) if record.date == today => return record.steps,
            Ok(Some(record)) => {
                tracing::debug!(stale_date = %record.date, stale_steps = record.steps, "Step ledger rolled over");
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read step ledger; treating as absent");
            }
        }
        self.write_locked(DailyStepRecord::empty(today));
        0
    }

    fn write_locked(&self, record: DailyStepRecord) {
        if let Err(err) = self.store.write(&record) {
            tracing::warn!(error = %err, steps = record.steps, "Failed to persist step ledger");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn file_ledger(temp: &TempDir, clock: Arc<FixedClock>) -> DailyStepLedger {
        let store = FileLedgerStore::new(&temp.path().join("daily-steps.json"));
        DailyStepLedger::new(Box::new(store), clock)
    }

    struct BrokenStore;

    impl LedgerStore for BrokenStore {
        fn read(&self) -> Result<Option<DailyStepRecord>> {
            Err(StepsError::Storage {
                context: "read".to_string(),
                details: "disk gone".to_string(),
            })
        }

        fn write(&self, _record: &DailyStepRecord) -> Result<()> {
            Err(StepsError::Storage {
                context: "write".to_string(),
                details: "disk gone".to_string(),
            })
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Save / Load
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_save_then_load_same_day() {
        let temp = TempDir::new().unwrap();
        let ledger = file_ledger(&temp, Arc::new(FixedClock::new(day(1))));

        for steps in [0, 1, 2_000, 123_456] {
            ledger.save(steps).unwrap();
            assert_eq!(ledger.load(), steps as u64);
        }
    }

    #[test]
    fn test_save_rejects_negative_without_writing() {
        let temp = TempDir::new().unwrap();
        let ledger = file_ledger(&temp, Arc::new(FixedClock::new(day(1))));
        ledger.save(300).unwrap();

        let err = ledger.save(-1).unwrap_err();
        assert!(matches!(err, StepsError::InvalidInput { value: -1, .. }));
        assert_eq!(ledger.load(), 300);
    }

    #[test]
    fn test_load_survives_new_ledger_instance() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::new(day(1)));
        file_ledger(&temp, clock.clone()).save(777).unwrap();

        assert_eq!(file_ledger(&temp, clock).load(), 777);
    }

    #[test]
    fn test_file_format_has_both_keys() {
        let temp = TempDir::new().unwrap();
        let ledger = file_ledger(&temp, Arc::new(FixedClock::new(day(3))));
        ledger.save(42).unwrap();

        let raw = std::fs::read_to_string(temp.path().join("daily-steps.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["steps_date"], "2024-05-03");
        assert_eq!(value["daily_steps"], 42);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Rollover
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_rollover_resets_and_persists_zero() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(FixedClock::new(day(1)));
        let ledger = file_ledger(&temp, clock.clone());
        ledger.save(5_000).unwrap();

        clock.advance_days(1);
        assert_eq!(ledger.load(), 0);
        assert_eq!(ledger.load(), 0);

        let store = FileLedgerStore::new(&temp.path().join("daily-steps.json"));
        assert_eq!(store.read().unwrap(), Some(DailyStepRecord::empty(day(2))));
    }

    #[test]
    fn test_missing_file_creates_today_record() {
        let temp = TempDir::new().unwrap();
        let ledger = file_ledger(&temp, Arc::new(FixedClock::new(day(9))));

        assert_eq!(ledger.load(), 0);
        assert!(temp.path().join("daily-steps.json").exists());
    }

    #[test]
    fn test_unparseable_date_is_stale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily-steps.json");
        std::fs::write(&path, r#"{"steps_date": "Wed May 01 2024", "daily_steps": 900}"#).unwrap();
        let ledger = file_ledger(&temp, Arc::new(FixedClock::new(day(1))));

        assert_eq!(ledger.load(), 0);
    }

    #[test]
    fn test_corrupt_file_reads_as_zero_and_recovers() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("daily-steps.json"), "{{{").unwrap();
        let ledger = file_ledger(&temp, Arc::new(FixedClock::new(day(1))));

        assert_eq!(ledger.load(), 0);
        ledger.save(10).unwrap();
        assert_eq!(ledger.load(), 10);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Add
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_add_accumulates() {
        let ledger = DailyStepLedger::in_memory(Arc::new(FixedClock::new(day(1))));
        ledger.save(3_000).unwrap();
        assert_eq!(ledger.add(1_000), 4_000);
        assert_eq!(ledger.load(), 4_000);
    }

    #[test]
    fn test_add_clamps_at_zero() {
        let ledger = DailyStepLedger::in_memory(Arc::new(FixedClock::new(day(1))));
        ledger.save(500).unwrap();
        assert_eq!(ledger.add(-600), 0);
        assert_eq!(ledger.load(), 0);
    }

    #[test]
    fn test_add_after_rollover_starts_from_zero() {
        let clock = Arc::new(FixedClock::new(day(1)));
        let ledger = DailyStepLedger::in_memory(clock.clone());
        ledger.save(8_000).unwrap();

        clock.advance_days(1);
        assert_eq!(ledger.add(250), 250);
    }

    #[test]
    fn test_concurrent_adds_are_serialized() {
        let ledger = Arc::new(DailyStepLedger::in_memory(Arc::new(FixedClock::new(day(1)))));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        ledger.add(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ledger.load(), 800);
    }

    #[test]
    fn test_file_save_interleaved_with_loads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("daily-steps.json");
        let ledger = Arc::new(file_ledger(&temp, Arc::new(FixedClock::new(day(4)))));
        ledger.save(0).unwrap();

        let writer = {
            let ledger = Arc::clone(&ledger);
            std::thread::spawn(move || {
                for steps in 1..=200 {
                    ledger.save(steps).unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let raw = FileLedgerStore::new(&path);
                std::thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..200 {
                        let steps = ledger.load();
                        assert!(steps <= 200 && steps >= last, "saw {steps} after {last}");
                        last = steps;

                        // Unguarded reads: the rename never exposes a partial pair.
                        let record = raw.read().unwrap().unwrap();
                        assert_eq!(record.date, day(4));
                        assert!(record.steps <= 200);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(ledger.load(), 200);
    }

    #[test]
    fn test_raise_to_never_lowers() {
        let ledger = DailyStepLedger::in_memory(Arc::new(FixedClock::new(day(1))));
        ledger.save(2_000).unwrap();
        assert_eq!(ledger.raise_to(1_500), 2_000);
        assert_eq!(ledger.raise_to(2_500), 2_500);
        assert_eq!(ledger.load(), 2_500);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Storage Faults
    // ─────────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_storage_fault_reads_as_zero() {
        let ledger = DailyStepLedger::new(Box::new(BrokenStore), Arc::new(FixedClock::new(day(1))));
        assert_eq!(ledger.load(), 0);
        assert_eq!(ledger.add(5), 5);
        assert_eq!(ledger.raise_to(50), 50);
    }

    #[test]
    fn test_save_reports_storage_fault() {
        let ledger = DailyStepLedger::new(Box::new(BrokenStore), Arc::new(FixedClock::new(day(1))));
        let err = ledger.save(100).unwrap_err();
        assert!(matches!(err, StepsError::Storage { .. }));
    }
}
