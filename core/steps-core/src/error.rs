//! Error types for steps-core operations.
//! Keep StepsFfiError minimal and stable to avoid breaking FFI clients.

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Swift/Kotlin)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across language boundaries.
///
/// Carries only a message string so it maps cleanly onto UniFFI's error handling.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum StepsFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<String> for StepsFfiError {
    fn from(message: String) -> Self {
        StepsFfiError::General { message }
    }
}

impl From<&str> for StepsFfiError {
    fn from(message: &str) -> Self {
        StepsFfiError::General {
            message: message.to_string(),
        }
    }
}

impl From<StepsError> for StepsFfiError {
    fn from(err: StepsError) -> Self {
        StepsFfiError::General {
            message: err.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in steps-core operations.
///
/// Only `InvalidInput` is ever returned from the public step operations.
/// The other variants are produced by lower layers and absorbed (logged,
/// replaced with a safe default) at the component boundary.
#[derive(Debug, thiserror::Error)]
pub enum StepsError {
    // ─────────────────────────────────────────────────────────────────────
    // Sensor Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Step sensor not available on this device")]
    Unavailable,

    #[error("Permission to read the step sensor was denied")]
    PermissionDenied,

    #[error("Step sensor subscription failed: {0}")]
    Subscription(String),

    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Storage fault: {context}: {details}")]
    Storage { context: String, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Remote Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Remote step source failed: {0}")]
    Remote(String),

    // ─────────────────────────────────────────────────────────────────────
    // Caller Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid step value {value}: {reason}")]
    InvalidInput { value: i64, reason: String },
}

impl StepsError {
    pub(crate) fn negative_steps(value: i64) -> Self {
        StepsError::InvalidInput {
            value,
            reason: "step counts cannot be negative".to_string(),
        }
    }
}

/// Convenience type alias for Results using StepsError.
pub type Result<T> = std::result::Result<T, StepsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_error_keeps_message() {
        let err = StepsFfiError::from(StepsError::negative_steps(-5));
        assert_eq!(
            err.to_string(),
            "Invalid step value -5: step counts cannot be negative"
        );
    }

    #[test]
    fn test_ffi_error_from_str() {
        let err = StepsFfiError::from("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
