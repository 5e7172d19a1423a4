//! Shared DTOs handed to UI clients.
//! Prefer additive changes to keep bindings stable.

use serde::Serialize;

/// Which origin produced a step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    Sensor,
    Ledger,
    Remote,
}

impl std::fmt::Display for StepSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepSource::Sensor => write!(f, "sensor"),
            StepSource::Ledger => write!(f, "ledger"),
            StepSource::Remote => write!(f, "remote"),
        }
    }
}

/// The authoritative "today" count after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record, Serialize)]
pub struct StepSnapshot {
    pub steps: u64,
    pub source: StepSource,
}

impl StepSnapshot {
    pub fn new(steps: u64, source: StepSource) -> Self {
        Self { steps, source }
    }
}

/// A multi-day step figure. Always approximate: no per-day history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record, Serialize)]
pub struct StepEstimate {
    pub steps: u64,
    /// Calendar days covered, including today.
    pub days: u64,
    pub approximate: bool,
}
