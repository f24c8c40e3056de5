//! Error handling for the RTSP control server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::process_supervisor::FallbackAttempt;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown location name/code, camera, or untracked pid
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A recording is already in progress
    #[error("Already recording (pid {pid})")]
    AlreadyRecording { pid: u32 },

    /// Every player candidate failed to spawn
    #[error("Launch failed after {} attempt(s)", attempts.len())]
    LaunchFailed { attempts: Vec<FallbackAttempt> },

    /// Every recording tier failed to spawn
    #[error("Recording failed after {} tier(s)", attempts.len())]
    RecordingFailed { attempts: Vec<FallbackAttempt> },

    /// Device command did not succeed
    #[error("Control failed for {target}: {message}")]
    ControlFailed {
        target: String,
        status: Option<u16>,
        message: String,
    },

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn control_failed(
        target: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Error::ControlFailed {
            target: target.into(),
            status,
            message: message.into(),
        }
    }

    /// Fallback attempts carried by chain-exhaustion errors
    pub fn attempts(&self) -> Option<&[FallbackAttempt]> {
        match self {
            Error::LaunchFailed { attempts } | Error::RecordingFailed { attempts } => {
                Some(attempts)
            }
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::AlreadyRecording { .. } => (StatusCode::CONFLICT, "ALREADY_RECORDING"),
            Error::LaunchFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "LAUNCH_FAILED"),
            Error::RecordingFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RECORDING_FAILED")
            }
            Error::ControlFailed { .. } => (StatusCode::BAD_GATEWAY, "CONTROL_FAILED"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Error::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR")
            }
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let message = self.to_string();

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let mut body = json!({
            "ok": false,
            "error_code": error_code,
            "message": message,
        });
        if let Some(attempts) = self.attempts() {
            body["attempts"] = json!(attempts);
        }
        if let Error::ControlFailed {
            status: Some(device_status),
            ..
        } = &self
        {
            body["device_status"] = json!(device_status);
        }

        (status, Json(body)).into_response()
    }
}
