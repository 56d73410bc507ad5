//! Clipcast platform core contracts.
//!
//! This crate defines what the recorder controller needs from a capture
//! platform (the browser, or the synthetic platform used in tests) without
//! coupling to a concrete implementation:
//! - consent-gated display and microphone requests
//! - stream composition and track lifecycle
//! - a recording facility that reports through an explicit listener
//! - blob assembly and object URL handles for export
//!
//! Everything here is single-threaded. Handles are cheap clones of
//! reference-counted platform objects and are not `Send`.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use clipcast_common::config::{DisplayConstraints, MicrophoneConstraints};
use clipcast_common::error::{ClipcastError, ClipcastResult};

pub mod capability;

pub use capability::{print_capability_report, Capability};

/// Media type carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Parse the `kind` attribute reported by the platform.
    pub fn from_platform_kind(kind: &str) -> Option<Self> {
        match kind {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// Lifecycle of a single track. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackState {
    Live,
    Ended,
}

/// Activity of a recording facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderActivity {
    Inactive,
    Recording,
    Paused,
}

/// A single audio or video track.
pub trait MediaTrack: Clone {
    fn id(&self) -> String;

    fn kind(&self) -> TrackKind;

    /// Human-readable source label ("Entire screen", "Built-in microphone").
    fn label(&self) -> String;

    fn ready_state(&self) -> TrackState;

    /// Stop the track. Irreversible; a stopped track cannot be restarted.
    fn stop(&self);
}

/// A set of tracks acquired together or merged by the controller.
pub trait CaptureStream: Clone {
    type Track: MediaTrack;

    fn id(&self) -> String;

    fn tracks(&self) -> Vec<Self::Track>;

    /// Stop every track in the stream.
    fn stop_all(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }

    /// Whether at least one track is still live.
    fn is_active(&self) -> bool {
        self.tracks()
            .iter()
            .any(|t| t.ready_state() == TrackState::Live)
    }
}

/// An encoded fragment delivered by the recording facility.
pub trait MediaChunk {
    fn byte_len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }
}

impl MediaChunk for Vec<u8> {
    fn byte_len(&self) -> u64 {
        self.len() as u64
    }
}

/// A finalized recording held by the platform.
pub trait MediaBlob: Clone {
    fn byte_len(&self) -> u64;

    fn content_type(&self) -> String;
}

/// Observer registered with a recorder at session start.
pub trait RecorderListener<C> {
    /// An encoded fragment is available. May be empty.
    fn on_data_available(&self, chunk: C);

    /// The recorder flushed its last fragment. Fires once per recorder.
    fn on_stop(&self);

    /// The recorder failed while running.
    fn on_error(&self, error: ClipcastError);
}

/// Observer for tracks that end without the controller stopping them.
pub trait TrackEndedListener {
    fn on_track_ended(&self, track_id: &str, kind: TrackKind);
}

/// An active registration that can be withdrawn.
pub trait Subscription {
    /// Detach the listener. Safe to call more than once.
    fn unsubscribe(&mut self);
}

/// Options passed to the recording facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderOptions {
    pub mime_type: String,
    pub timeslice_ms: Option<u32>,
}

/// A recording facility bound to one stream.
pub trait MediaRecorder: Subscription {
    fn start(&mut self, timeslice_ms: Option<u32>) -> ClipcastResult<()>;

    /// Ask the recorder to flush and finalize. The listener's `on_stop`
    /// follows, possibly before this call returns.
    fn stop(&mut self) -> ClipcastResult<()>;

    fn activity(&self) -> RecorderActivity;

    /// The MIME type the recorder actually produces.
    fn mime_type(&self) -> String;
}

/// Everything the recorder controller needs from its environment.
#[async_trait::async_trait(?Send)]
pub trait CapturePlatform {
    type Track: MediaTrack;
    type Stream: CaptureStream<Track = Self::Track>;
    type Chunk: MediaChunk;
    type Blob: MediaBlob;
    type Recorder: MediaRecorder;

    /// Platform name for logs and reports.
    fn name(&self) -> &str;

    /// Ask the user to share a display, window, or tab.
    async fn request_display(&self, constraints: &DisplayConstraints)
        -> ClipcastResult<Self::Stream>;

    /// Ask the user for microphone access.
    async fn request_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> ClipcastResult<Self::Stream>;

    /// Build one stream carrying every track of `streams`, in order.
    fn merge_streams(&self, streams: &[&Self::Stream]) -> ClipcastResult<Self::Stream>;

    /// Whether the recording facility can produce `mime_type`.
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Create a recorder for `stream` and subscribe `listener` to it.
    fn create_recorder(
        &self,
        stream: &Self::Stream,
        options: &RecorderOptions,
        listener: Rc<dyn RecorderListener<Self::Chunk>>,
    ) -> ClipcastResult<Self::Recorder>;

    /// Subscribe to tracks of `stream` ending on their own.
    fn watch_track_end(
        &self,
        stream: &Self::Stream,
        listener: Rc<dyn TrackEndedListener>,
    ) -> ClipcastResult<Box<dyn Subscription>>;

    /// Concatenate chunks, in order, into one blob.
    fn assemble(&self, chunks: Vec<Self::Chunk>, content_type: &str)
        -> ClipcastResult<Self::Blob>;

    /// Derive a dereferenceable URL for `blob`.
    fn create_object_url(&self, blob: &Self::Blob) -> ClipcastResult<String>;

    /// Release a URL returned by `create_object_url`.
    fn revoke_object_url(&self, url: &str);

    /// What the platform can do, for diagnostics.
    fn capabilities(&self) -> Vec<Capability>;
}
