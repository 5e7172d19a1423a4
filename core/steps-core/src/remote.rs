//! Remote "today's steps" source.
//!
//! The backend's `GET today-steps` endpoint is owned by the host's REST
//! client; the core only sees its outcome. The value is advisory: a failure
//! here never blocks local step display.

use serde::{Deserialize, Serialize};

use crate::error::StepsError;

/// Outcome of a `today-steps` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record, Serialize, Deserialize)]
pub struct RemoteStepsResponse {
    pub success: bool,
    #[serde(default)]
    pub steps: u64,
}

impl RemoteStepsResponse {
    pub fn ok(steps: u64) -> Self {
        Self {
            success: true,
            steps,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            steps: 0,
        }
    }

    /// The reported count, or a `Remote` error if the request failed.
    pub fn into_result(self) -> Result<u64, StepsError> {
        if self.success {
            Ok(self.steps)
        } else {
            Err(StepsError::Remote(
                "today-steps request unsuccessful".to_string(),
            ))
        }
    }
}

/// Backend step source, implemented by the host's API client.
///
/// Transport and HTTP errors should be reported as `success: false`.
#[uniffi::export(with_foreign)]
pub trait RemoteStepSource: Send + Sync {
    fn fetch_today_steps(&self) -> RemoteStepsResponse;
}

/// A remote source that is never reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRemote;

impl RemoteStepSource for OfflineRemote {
    fn fetch_today_steps(&self) -> RemoteStepsResponse {
        RemoteStepsResponse::failed()
    }
}

/// A remote source that always reports the same count.
#[derive(Debug, Clone, Copy)]
pub struct FixedRemote(pub u64);

impl RemoteStepSource for FixedRemote {
    fn fetch_today_steps(&self) -> RemoteStepsResponse {
        RemoteStepsResponse::ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_response_is_remote_fault() {
        let err = OfflineRemote.fetch_today_steps().into_result().unwrap_err();
        assert!(matches!(err, StepsError::Remote(_)));
    }

    #[test]
    fn test_response_parses_backend_body() {
        let response: RemoteStepsResponse =
            serde_json::from_str(r#"{"success": true, "steps": 800}"#).unwrap();
        assert_eq!(response, RemoteStepsResponse::ok(800));
        assert_eq!(FixedRemote(800).fetch_today_steps().into_result().unwrap(), 800);
    }
}
