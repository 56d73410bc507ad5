//! Error types shared across Clipcast crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which consent-gated capture source an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    /// Screen, window, or tab shared through display capture.
    Display,
    /// Microphone input.
    Microphone,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display => f.write_str("screen capture"),
            Self::Microphone => f.write_str("microphone"),
        }
    }
}

/// Top-level error type for Clipcast operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClipcastError {
    #[error("Permission denied for {source_kind}: {message}")]
    PermissionDenied {
        source_kind: CaptureSource,
        message: String,
    },

    #[error("Unsupported: {message}")]
    Unsupported { message: String },

    #[error("No {source_kind} device available: {message}")]
    DeviceUnavailable {
        source_kind: CaptureSource,
        message: String,
    },

    #[error("Recorder initialization failed: {message}")]
    RecorderInit { message: String },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Recorder error: {message}")]
    Recorder { message: String },

    #[error("Artifact error: {message}")]
    Artifact { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("JSON error: {message}")]
    Json { message: String },
}

/// Result type alias using ClipcastError.
pub type ClipcastResult<T> = Result<T, ClipcastError>;

impl ClipcastError {
    pub fn permission_denied(source_kind: CaptureSource, msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            source_kind,
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn device_unavailable(source_kind: CaptureSource, msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            source_kind,
            message: msg.into(),
        }
    }

    pub fn recorder_init(msg: impl Into<String>) -> Self {
        Self::RecorderInit {
            message: msg.into(),
        }
    }

    pub fn invalid_state(operation: &'static str, state: impl fmt::Display) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    pub fn recorder(msg: impl Into<String>) -> Self {
        Self::Recorder {
            message: msg.into(),
        }
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Errors that abort `start_recording` and leave the controller in its
    /// recoverable failed state. Invalid-state rejections are not among them.
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::Unsupported { .. }
                | Self::DeviceUnavailable { .. }
                | Self::RecorderInit { .. }
        )
    }

    /// Short message suitable for showing next to a retry button.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied { source_kind, .. } => {
                format!("Permission to use the {source_kind} was denied.")
            }
            Self::Unsupported { .. } => "This browser cannot record the screen.".to_string(),
            Self::DeviceUnavailable { source_kind, .. } => {
                format!("No {source_kind} is available.")
            }
            Self::RecorderInit { .. } => "The recorder could not be started.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ClipcastError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClipcastError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_failures_cover_the_four_abort_kinds() {
        assert!(ClipcastError::permission_denied(CaptureSource::Display, "no").is_start_failure());
        assert!(ClipcastError::unsupported("no api").is_start_failure());
        assert!(
            ClipcastError::device_unavailable(CaptureSource::Microphone, "none").is_start_failure()
        );
        assert!(ClipcastError::recorder_init("bad mime").is_start_failure());
        assert!(!ClipcastError::invalid_state("start recording", "recording").is_start_failure());
    }

    #[test]
    fn user_message_names_the_source() {
        let err = ClipcastError::permission_denied(CaptureSource::Microphone, "NotAllowedError");
        assert_eq!(
            err.user_message(),
            "Permission to use the microphone was denied."
        );
    }
}
