//! Clipcast Capture Engine
//!
//! Drives a screen-plus-microphone recording against any
//! [`CapturePlatform`](clipcast_platform_core::CapturePlatform) and exposes
//! the result as a downloadable artifact.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                RecorderController                │
//! │                                                  │
//! │  request_display ──▶ request_microphone          │
//! │          └──────┬──────────┘                     │
//! │                 ▼                                │
//! │           merge_streams ──▶ RecordingSession     │
//! │                             ├─ MediaRecorder     │
//! │                             ├─ ChunkBuffer       │
//! │                             └─ track-end watch   │
//! │                 on_stop ──▶ RecordingArtifact    │
//! │                             (blob + ObjectUrl)   │
//! └──────────────────────────────────────────────────┘
//!                  │ view()
//!                  ▼
//!      LivePreview | Playback + DownloadLink
//! ```

pub mod artifact;
pub mod buffer;
pub mod controller;
pub mod events;
pub mod session;
pub mod state;
pub mod view;

pub use artifact::{ArtifactInfo, DownloadLink, ObjectUrl, RecordingArtifact};
pub use buffer::{concat_chunks, ChunkBuffer};
pub use controller::{RecorderController, StopOutcome};
pub use events::{ControllerEvent, ObserverId};
pub use state::RecorderState;
pub use view::{ButtonAction, ButtonView, ErrorView, LivePreview, Playback, RecorderView};
