//! Source-priority policy for "today's steps".
//!
//! Priority, highest first:
//!
//! 1. **Sensor**: a live session's total, never below the ledger
//! 2. **Ledger**: a non-zero local record for today
//! 3. **Remote**: the backend's count, used to seed the ledger
//!
//! A zero ledger value is indistinguishable from "nothing recorded yet
//! today", so it defers to the remote source. If the remote source fails,
//! the ledger's value stands.

use crate::types::{StepSnapshot, StepSource};

/// What the local sources currently say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalReadings {
    /// Total of the live session; `None` when not tracking.
    pub sensor: Option<u64>,
    pub ledger: u64,
}

/// Result of applying the local part of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(StepSnapshot),
    /// No local source is authoritative; ask the remote source.
    NeedsRemote { ledger: u64 },
}

pub fn resolve_local(readings: LocalReadings) -> Resolution {
    match readings.sensor {
        Some(sensor) => Resolution::Resolved(StepSnapshot::new(
            sensor.max(readings.ledger),
            StepSource::Sensor,
        )),
        None if readings.ledger > 0 => {
            Resolution::Resolved(StepSnapshot::new(readings.ledger, StepSource::Ledger))
        }
        None => Resolution::NeedsRemote {
            ledger: readings.ledger,
        },
    }
}

/// Final step when the remote source was consulted. `remote` is `None` on a
/// remote fault.
pub fn resolve_with_remote(ledger: u64, remote: Option<u64>) -> StepSnapshot {
    match remote {
        Some(steps) => StepSnapshot::new(steps, StepSource::Remote),
        None => StepSnapshot::new(ledger, StepSource::Ledger),
    }
}
