//! Recorder error types
//!
//! Every failure the pipeline can surface maps onto one [`ErrorKind`], which is
//! what a controller shows to the user at the end of a session.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by capture devices, sinks and the session state machine
#[derive(Error, Debug)]
pub enum RecorderError {
    /// An audio or video device could not be opened or read
    #[error("Device unavailable: {device} - {reason}")]
    DeviceUnavailable {
        /// Device description (e.g. "microphone", "webcam 0")
        device: String,
        /// Failure reason
        reason: String,
    },

    /// Operation not permitted in the current session state
    #[error("Invalid state: {operation} not allowed while {state}")]
    InvalidState {
        /// Requested operation
        operation: String,
        /// State the session was in
        state: String,
    },

    /// Session configuration violates an invariant
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Frame does not match the dimensions the sink was opened with
    #[error("Invalid frame: expected {expected_width}x{expected_height}, got {width}x{height}")]
    InvalidFrame {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    /// A sink could not write its output
    #[error("Write failed for {path:?}: {reason}")]
    WriteFailure { path: PathBuf, reason: String },

    /// I/O error outside a specific sink
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Result type alias for recorder operations
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Error classification reported to controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnavailable,
    SourceExhausted,
    InvalidState,
    InvalidConfig,
    WriteFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::DeviceUnavailable => "device-unavailable",
            ErrorKind::SourceExhausted => "source-exhausted",
            ErrorKind::InvalidState => "invalid-state",
            ErrorKind::InvalidConfig => "invalid-config",
            ErrorKind::WriteFailure => "write-failure",
        };
        f.write_str(name)
    }
}

impl RecorderError {
    pub fn device(device: impl Into<String>, reason: impl ToString) -> Self {
        RecorderError::DeviceUnavailable {
            device: device.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RecorderError::WriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        RecorderError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Classify this error for end-of-session reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecorderError::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            RecorderError::InvalidState { .. } => ErrorKind::InvalidState,
            RecorderError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            RecorderError::InvalidFrame { .. } => ErrorKind::WriteFailure,
            RecorderError::WriteFailure { .. } => ErrorKind::WriteFailure,
            RecorderError::Io { .. } => ErrorKind::WriteFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = RecorderError::device("microphone", "no default input device");
        assert_eq!(err.kind(), ErrorKind::DeviceUnavailable);

        let err = RecorderError::InvalidFrame {
            expected_width: 640,
            expected_height: 480,
            width: 1280,
            height: 720,
        };
        assert_eq!(err.kind(), ErrorKind::WriteFailure);
    }

    #[test]
    fn test_error_display() {
        let err = RecorderError::InvalidState {
            operation: "configure".to_string(),
            state: "capturing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state: configure not allowed while capturing"
        );
        assert_eq!(ErrorKind::WriteFailure.to_string(), "write-failure");
    }
}
