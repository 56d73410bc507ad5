//! Render-ready snapshot of the recorder for a UI layer.
//!
//! The live preview and the playback section are pure functions of the
//! controller state; nothing here holds state of its own.

use serde::Serialize;

use crate::artifact::{ArtifactInfo, DownloadLink};
use crate::state::RecorderState;

pub const START_LABEL: &str = "Start Recording";
pub const STOP_LABEL: &str = "Stop Recording";
pub const REQUESTING_LABEL: &str = "Waiting for permission…";
pub const FINALIZING_LABEL: &str = "Saving…";
pub const RETRY_LABEL: &str = "Try again";

/// What clicking the primary button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Start,
    Stop,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub label: &'static str,
    pub enabled: bool,
    pub action: ButtonAction,
}

impl ButtonView {
    pub fn for_state(state: RecorderState) -> Self {
        let (label, action) = match state {
            RecorderState::Idle | RecorderState::Failed => (START_LABEL, ButtonAction::Start),
            RecorderState::Requesting => (REQUESTING_LABEL, ButtonAction::None),
            RecorderState::Recording => (STOP_LABEL, ButtonAction::Stop),
            RecorderState::Finalizing => (FINALIZING_LABEL, ButtonAction::None),
        };
        Self {
            label,
            enabled: state.accepts_input(),
            action,
        }
    }
}

/// Binding for the live surface. Only present while recording.
#[derive(Debug, Clone)]
pub struct LivePreview<S> {
    pub session_id: u64,
    pub stream: S,
    pub autoplay: bool,
    pub muted: bool,
}

/// Binding for the playback surface and the export link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Playback {
    pub session_id: u64,
    pub src: String,
    pub controls: bool,
    pub byte_len: u64,
    pub download: DownloadLink,
}

impl From<&ArtifactInfo> for Playback {
    fn from(info: &ArtifactInfo) -> Self {
        Self {
            session_id: info.session_id,
            src: info.url.clone(),
            controls: true,
            byte_len: info.byte_len,
            download: info.download_link(),
        }
    }
}

/// A recoverable error shown with a retry action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub message: String,
    pub detail: String,
    pub retry_label: &'static str,
}

/// Everything a UI needs to render the recorder.
#[derive(Debug, Clone)]
pub struct RecorderView<S> {
    pub state: RecorderState,
    pub button: ButtonView,
    pub live_preview: Option<LivePreview<S>>,
    pub playback: Option<Playback>,
    pub error: Option<ErrorView>,
    pub elapsed_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_follows_state() {
        let idle = ButtonView::for_state(RecorderState::Idle);
        assert_eq!(idle.label, "Start Recording");
        assert_eq!(idle.action, ButtonAction::Start);
        assert!(idle.enabled);

        let recording = ButtonView::for_state(RecorderState::Recording);
        assert_eq!(recording.label, "Stop Recording");
        assert_eq!(recording.action, ButtonAction::Stop);

        let requesting = ButtonView::for_state(RecorderState::Requesting);
        assert!(!requesting.enabled);
        assert_eq!(requesting.action, ButtonAction::None);
    }

    #[test]
    fn failed_state_offers_start_again() {
        let failed = ButtonView::for_state(RecorderState::Failed);
        assert_eq!(failed.action, ButtonAction::Start);
        assert!(failed.enabled);
    }
}
