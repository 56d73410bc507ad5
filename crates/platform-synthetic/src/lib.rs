//! Clipcast synthetic capture platform.
//!
//! A deterministic, in-memory stand-in for the browser. Consent outcomes
//! come from a [`Script`]; chunks, recorder failures, and externally ended
//! tracks are injected through [`RecorderDriver`] and [`SyntheticTrack`].
//! The platform records every request it receives so tests can assert on
//! ordering (for example, that the microphone was never asked for).

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use clipcast_common::config::{DisplayConstraints, MicrophoneConstraints};
use clipcast_common::error::{CaptureSource, ClipcastError, ClipcastResult};
use clipcast_platform_core::{
    Capability, CapturePlatform, CaptureStream, MediaBlob, RecorderListener, RecorderOptions,
    Subscription, TrackEndedListener, TrackKind,
};

pub mod prompt;
pub mod recorder;
pub mod track;

pub use prompt::PromptGate;
pub use recorder::{RecorderDriver, SyntheticRecorder};
pub use track::{SyntheticStream, SyntheticTrack, TrackWatch};

/// How a consent prompt resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Consent {
    #[default]
    Grant,
    Deny,
    NoDevice,
    Unsupported,
}

impl Consent {
    fn resolve(self, source: CaptureSource) -> ClipcastResult<()> {
        match self {
            Self::Grant => Ok(()),
            Self::Deny => Err(ClipcastError::permission_denied(
                source,
                "NotAllowedError: permission denied by user",
            )),
            Self::NoDevice => Err(ClipcastError::device_unavailable(
                source,
                "NotFoundError: requested device not found",
            )),
            Self::Unsupported => Err(ClipcastError::unsupported(format!(
                "{source} is not available in this environment"
            ))),
        }
    }
}

/// Scripted behavior of the synthetic platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub display: Consent,
    pub microphone: Consent,
    /// Include a tab-audio track when display audio is requested.
    pub display_audio_available: bool,
    pub supported_mime_types: Vec<String>,
    /// Make `MediaRecorder::start` fail after construction.
    pub fail_recorder_start: bool,
    /// Fragment delivered while stopping, before `on_stop`.
    pub flush_on_stop: Option<Vec<u8>>,
    /// Make `stop()` return before `on_stop`, as browsers do. The stop is
    /// completed by [`RecorderDriver::finish`].
    pub defer_stop: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            display: Consent::Grant,
            microphone: Consent::Grant,
            display_audio_available: true,
            supported_mime_types: vec![
                "video/webm".to_string(),
                "video/webm;codecs=vp8,opus".to_string(),
                "video/webm;codecs=vp9,opus".to_string(),
            ],
            fail_recorder_start: false,
            flush_on_stop: None,
            defer_stop: false,
        }
    }
}

/// A finalized in-memory recording.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticBlob {
    bytes: Rc<Vec<u8>>,
    content_type: String,
}

impl SyntheticBlob {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl MediaBlob for SyntheticBlob {
    fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn content_type(&self) -> String {
        self.content_type.clone()
    }
}

/// Every request the platform has seen, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Display,
    Microphone,
}

#[derive(Default)]
struct PlatformState {
    script: Script,
    requests: Vec<Request>,
    next_id: u64,
    tracks: Vec<SyntheticTrack>,
    recorders: Vec<RecorderDriver>,
    live_urls: Vec<String>,
    revoked_urls: Vec<String>,
    held_display: Option<PromptGate>,
}

impl PlatformState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn new_track(&mut self, kind: TrackKind, label: &str) -> SyntheticTrack {
        let id = self.next_id();
        let prefix = match kind {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        };
        let track = SyntheticTrack::new(format!("{prefix}-{id}"), kind, label);
        self.tracks.push(track.clone());
        track
    }

    fn new_stream(&mut self, tracks: Vec<SyntheticTrack>) -> SyntheticStream {
        let id = self.next_id();
        SyntheticStream::new(format!("stream-{id}"), tracks)
    }
}

/// Scripted capture platform. Clones share state.
#[derive(Clone, Default)]
pub struct SyntheticPlatform {
    state: Rc<RefCell<PlatformState>>,
}

impl SyntheticPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: Script) -> Self {
        let platform = Self::new();
        platform.state.borrow_mut().script = script;
        platform
    }

    /// Change the script for subsequent requests.
    pub fn configure(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.state.borrow_mut().script);
    }

    /// Keep the next display request pending until the gate is released.
    pub fn hold_next_display(&self) -> PromptGate {
        let gate = PromptGate::new();
        self.state.borrow_mut().held_display = Some(gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    pub fn display_requests(&self) -> usize {
        self.count_requests(Request::Display)
    }

    pub fn microphone_requests(&self) -> usize {
        self.count_requests(Request::Microphone)
    }

    /// Every track ever handed out.
    pub fn tracks(&self) -> Vec<SyntheticTrack> {
        self.state.borrow().tracks.clone()
    }

    /// Drivers for every recorder created, oldest first.
    pub fn recorders(&self) -> Vec<RecorderDriver> {
        self.state.borrow().recorders.clone()
    }

    pub fn last_recorder(&self) -> Option<RecorderDriver> {
        self.state.borrow().recorders.last().cloned()
    }

    /// Object URLs created and not yet revoked.
    pub fn live_urls(&self) -> Vec<String> {
        self.state.borrow().live_urls.clone()
    }

    pub fn revoked_urls(&self) -> Vec<String> {
        self.state.borrow().revoked_urls.clone()
    }

    fn count_requests(&self, kind: Request) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|r| **r == kind)
            .count()
    }
}

#[async_trait::async_trait(?Send)]
impl CapturePlatform for SyntheticPlatform {
    type Track = SyntheticTrack;
    type Stream = SyntheticStream;
    type Chunk = Vec<u8>;
    type Blob = SyntheticBlob;
    type Recorder = SyntheticRecorder;

    fn name(&self) -> &str {
        "synthetic"
    }

    async fn request_display(
        &self,
        constraints: &DisplayConstraints,
    ) -> ClipcastResult<SyntheticStream> {
        let held = {
            let mut state = self.state.borrow_mut();
            state.requests.push(Request::Display);
            state.held_display.take()
        };
        if let Some(gate) = held {
            tracing::debug!("Display prompt held open");
            gate.wait().await;
        }

        let mut state = self.state.borrow_mut();
        state.script.display.resolve(CaptureSource::Display)?;

        let mut tracks = vec![state.new_track(TrackKind::Video, "Entire screen")];
        if constraints.audio && state.script.display_audio_available {
            tracks.push(state.new_track(TrackKind::Audio, "Tab audio"));
        }
        Ok(state.new_stream(tracks))
    }

    async fn request_microphone(
        &self,
        _constraints: &MicrophoneConstraints,
    ) -> ClipcastResult<SyntheticStream> {
        let mut state = self.state.borrow_mut();
        state.requests.push(Request::Microphone);
        state.script.microphone.resolve(CaptureSource::Microphone)?;

        let track = state.new_track(TrackKind::Audio, "Default microphone");
        Ok(state.new_stream(vec![track]))
    }

    fn merge_streams(&self, streams: &[&SyntheticStream]) -> ClipcastResult<SyntheticStream> {
        let tracks = streams.iter().flat_map(|s| s.tracks()).collect();
        Ok(self.state.borrow_mut().new_stream(tracks))
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.state
            .borrow()
            .script
            .supported_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime_type.trim()))
    }

    fn create_recorder(
        &self,
        stream: &SyntheticStream,
        options: &RecorderOptions,
        listener: Rc<dyn RecorderListener<Vec<u8>>>,
    ) -> ClipcastResult<SyntheticRecorder> {
        if !self.is_type_supported(&options.mime_type) {
            return Err(ClipcastError::recorder_init(format!(
                "NotSupportedError: {} is not a supported recording type",
                options.mime_type
            )));
        }

        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        let (recorder, driver) = recorder::create(
            id,
            options.mime_type.clone(),
            stream.clone(),
            listener,
            state.script.fail_recorder_start,
            state.script.flush_on_stop.clone(),
            state.script.defer_stop,
        );
        state.recorders.push(driver);
        Ok(recorder)
    }

    fn watch_track_end(
        &self,
        stream: &SyntheticStream,
        listener: Rc<dyn TrackEndedListener>,
    ) -> ClipcastResult<Box<dyn Subscription>> {
        let watch_id = self.state.borrow_mut().next_id();
        Ok(Box::new(TrackWatch::attach(watch_id, stream, listener)))
    }

    fn assemble(&self, chunks: Vec<Vec<u8>>, content_type: &str) -> ClipcastResult<SyntheticBlob> {
        Ok(SyntheticBlob {
            bytes: Rc::new(chunks.concat()),
            content_type: content_type.to_string(),
        })
    }

    fn create_object_url(&self, _blob: &SyntheticBlob) -> ClipcastResult<String> {
        let mut state = self.state.borrow_mut();
        let url = format!("blob:synthetic/{}", state.next_id());
        state.live_urls.push(url.clone());
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) {
        let mut state = self.state.borrow_mut();
        state.live_urls.retain(|u| u != url);
        state.revoked_urls.push(url.to_string());
    }

    fn capabilities(&self) -> Vec<Capability> {
        let state = self.state.borrow();
        let script = &state.script;
        vec![
            Capability::new(
                "Display capture",
                "Screen, window, or tab sharing",
                script.display != Consent::Unsupported,
                true,
            )
            .with_fix("Set display consent to grant, deny, or no_device"),
            Capability::new(
                "Microphone",
                "Microphone audio input",
                script.microphone != Consent::Unsupported,
                true,
            )
            .with_fix("Set microphone consent to grant, deny, or no_device"),
            Capability::new(
                "Recording",
                "Recorder supports video/webm",
                script
                    .supported_mime_types
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case("video/webm")),
                true,
            )
            .with_fix("Add video/webm to supported_mime_types"),
            Capability::new(
                "Tab audio",
                "Audio shared alongside the display",
                script.display_audio_available,
                false,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipcast_platform_core::{MediaTrack, TrackState};

    #[tokio::test]
    async fn denied_display_is_recorded_and_classified() {
        let platform = SyntheticPlatform::with_script(Script {
            display: Consent::Deny,
            ..Script::default()
        });

        let err = platform
            .request_display(&DisplayConstraints::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClipcastError::PermissionDenied {
                source_kind: CaptureSource::Display,
                ..
            }
        ));
        assert_eq!(platform.requests(), vec![Request::Display]);
        assert!(platform.tracks().is_empty());
    }

    #[tokio::test]
    async fn merge_shares_track_handles() {
        let platform = SyntheticPlatform::new();
        let display = platform
            .request_display(&DisplayConstraints::default())
            .await
            .unwrap();
        let mic = platform
            .request_microphone(&MicrophoneConstraints::default())
            .await
            .unwrap();

        let merged = platform.merge_streams(&[&display, &mic]).unwrap();
        assert_eq!(merged.tracks().len(), 2);

        merged.stop_all();
        assert_eq!(display.tracks()[0].ready_state(), TrackState::Ended);
        assert_eq!(mic.tracks()[0].ready_state(), TrackState::Ended);
    }

    #[test]
    fn unsupported_mime_fails_recorder_creation() {
        struct Ignore;
        impl RecorderListener<Vec<u8>> for Ignore {
            fn on_data_available(&self, _chunk: Vec<u8>) {}
            fn on_stop(&self) {}
            fn on_error(&self, _error: ClipcastError) {}
        }

        let platform = SyntheticPlatform::new();
        let stream = SyntheticStream::new("s".to_string(), Vec::new());
        let options = RecorderOptions {
            mime_type: "video/mp4".to_string(),
            timeslice_ms: None,
        };
        let err = platform
            .create_recorder(&stream, &options, Rc::new(Ignore))
            .err()
            .unwrap();
        assert!(matches!(err, ClipcastError::RecorderInit { .. }));
        assert!(platform.recorders().is_empty());
    }

    #[test]
    fn object_urls_are_tracked_until_revoked() {
        let platform = SyntheticPlatform::new();
        let blob = platform.assemble(vec![b"ab".to_vec(), b"c".to_vec()], "video/webm").unwrap();
        assert_eq!(blob.bytes(), b"abc");

        let url = platform.create_object_url(&blob).unwrap();
        assert_eq!(platform.live_urls(), vec![url.clone()]);
        platform.revoke_object_url(&url);
        assert!(platform.live_urls().is_empty());
        assert_eq!(platform.revoked_urls(), vec![url]);
    }
}
