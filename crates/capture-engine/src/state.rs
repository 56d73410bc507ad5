//! Recorder controller states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the recorder controller.
///
/// ```text
/// Idle/Failed ──start──▶ Requesting ──granted──▶ Recording ──stop──▶ Finalizing ──flushed──▶ Idle
///                            │
///                            └──denied / unsupported / no device / recorder init──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    /// No capture session. A previous artifact may be available.
    #[default]
    Idle,
    /// Waiting on the user to grant screen and microphone access.
    Requesting,
    /// Recorder running; chunks are being buffered.
    Recording,
    /// Stop requested; waiting for the recorder to flush.
    Finalizing,
    /// The last start attempt failed. Retrying is allowed.
    Failed,
}

impl RecorderState {
    /// States from which `start_recording` may proceed.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }

    /// Whether a capture session is live in this state.
    pub fn is_capturing(self) -> bool {
        matches!(self, Self::Recording)
    }

    /// Whether the primary button accepts clicks in this state.
    pub fn accepts_input(self) -> bool {
        !matches!(self, Self::Requesting | Self::Finalizing)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting permissions",
            Self::Recording => "recording",
            Self::Finalizing => "finalizing",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
