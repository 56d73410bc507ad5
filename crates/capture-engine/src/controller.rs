//! The recorder controller.
//!
//! Sequences the two consent requests, merges the granted streams, runs the
//! recorder, and turns delivered chunks into a downloadable artifact. All
//! state lives behind one `RefCell`; no borrow is held while calling into
//! the platform, since recorders may report back synchronously.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use clipcast_common::config::RecorderConfig;
use clipcast_common::error::{ClipcastError, ClipcastResult};
use clipcast_platform_core::{
    CapturePlatform, CaptureStream, MediaChunk, MediaRecorder, RecorderActivity,
    RecorderListener, RecorderOptions, Subscription, TrackEndedListener, TrackKind,
};

use crate::artifact::{ArtifactInfo, ObjectUrl, RecordingArtifact};
use crate::events::{ControllerEvent, ObserverId, Observers};
use crate::session::RecordingSession;
use crate::state::RecorderState;
use crate::view::{ButtonAction, ButtonView, ErrorView, LivePreview, Playback, RecorderView, RETRY_LABEL};

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The recorder was asked to finalize this session.
    Stopping { session_id: u64 },
    /// Nothing was recording; the request had no effect.
    NotRecording { state: RecorderState },
}

/// Owns at most one recording session and the latest artifact.
pub struct RecorderController<P: CapturePlatform + 'static> {
    shared: Rc<Shared<P>>,
}

struct Shared<P: CapturePlatform> {
    platform: Rc<P>,
    config: RecorderConfig,
    inner: RefCell<Inner<P>>,
    observers: RefCell<Observers>,
}

struct Inner<P: CapturePlatform> {
    state: RecorderState,
    session: Option<RecordingSession<P>>,
    artifact: Option<RecordingArtifact<P::Blob>>,
    last_error: Option<ClipcastError>,
    next_session_id: u64,
    /// Bumped by every start and by teardown. A start whose permission
    /// prompts resolve after a newer bump discards what it acquired.
    attempt: u64,
}

/// Recorder and track-end listener for one session.
struct SessionListener<P: CapturePlatform> {
    shared: Weak<Shared<P>>,
    session_id: u64,
}

impl<P: CapturePlatform + 'static> RecorderController<P> {
    /// Create a controller. Fails if `config` is invalid.
    pub fn new(platform: P, config: RecorderConfig) -> ClipcastResult<Self> {
        config.validate()?;
        Ok(Self {
            shared: Rc::new(Shared {
                platform: Rc::new(platform),
                config,
                inner: RefCell::new(Inner {
                    state: RecorderState::Idle,
                    session: None,
                    artifact: None,
                    last_error: None,
                    next_session_id: 0,
                    attempt: 0,
                }),
                observers: RefCell::new(Observers::default()),
            }),
        })
    }

    pub fn platform(&self) -> &P {
        &self.shared.platform
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.shared.config
    }

    pub fn state(&self) -> RecorderState {
        self.shared.inner.borrow().state
    }

    /// The error that put the controller into `Failed`, if any.
    pub fn last_error(&self) -> Option<ClipcastError> {
        self.shared.inner.borrow().last_error.clone()
    }

    /// Id of the active session.
    pub fn session_id(&self) -> Option<u64> {
        self.shared.inner.borrow().session.as_ref().map(|s| s.id())
    }

    /// The merged stream of the active session.
    pub fn active_stream(&self) -> Option<P::Stream> {
        self.shared
            .inner
            .borrow()
            .session
            .as_ref()
            .map(|s| s.stream().clone())
    }

    pub fn artifact_info(&self) -> Option<ArtifactInfo> {
        self.shared
            .inner
            .borrow()
            .artifact
            .as_ref()
            .map(|a| a.info().clone())
    }

    pub fn artifact_blob(&self) -> Option<P::Blob> {
        self.shared
            .inner
            .borrow()
            .artifact
            .as_ref()
            .map(|a| a.blob().clone())
    }

    /// Request both permissions and start recording.
    ///
    /// Rejected with `InvalidState` unless the controller is `Idle` or
    /// `Failed`. Any other error leaves the controller in `Failed`.
    pub async fn start_recording(&self) -> ClipcastResult<u64> {
        self.shared.start_recording().await
    }

    /// Ask the recorder to finalize and stop every captured track.
    pub fn stop_recording(&self) -> ClipcastResult<StopOutcome> {
        self.shared.stop_recording()
    }

    /// Run whatever the primary button currently does.
    pub async fn press_primary(&self) -> ClipcastResult<()> {
        match ButtonView::for_state(self.state()).action {
            ButtonAction::Start => self.start_recording().await.map(|_| ()),
            ButtonAction::Stop => self.stop_recording().map(|_| ()),
            ButtonAction::None => Ok(()),
        }
    }

    /// Leave `Failed` without retrying. Returns `false` in any other state.
    pub fn dismiss_error(&self) -> bool {
        let dismissed = {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.state != RecorderState::Failed {
                false
            } else {
                inner.state = RecorderState::Idle;
                inner.last_error = None;
                true
            }
        };
        if dismissed {
            self.shared.emit(&ControllerEvent::StateChanged {
                from: RecorderState::Failed,
                to: RecorderState::Idle,
            });
        }
        dismissed
    }

    /// Observe controller events. Observers run on the caller's thread
    /// after the state change is visible.
    pub fn subscribe(&self, observer: impl Fn(&ControllerEvent) + 'static) -> ObserverId {
        self.shared.observers.borrow_mut().add(Rc::new(observer))
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.shared.observers.borrow_mut().remove(id)
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> RecorderView<P::Stream> {
        let inner = self.shared.inner.borrow();
        let state = inner.state;

        let live_session = inner
            .session
            .as_ref()
            .filter(|_| state == RecorderState::Recording);

        let live_preview = live_session.map(|s| LivePreview {
            session_id: s.id(),
            stream: s.stream().clone(),
            autoplay: true,
            muted: true,
        });

        let playback = inner.artifact.as_ref().map(|a| Playback::from(a.info()));

        let error = match (state, inner.last_error.as_ref()) {
            (RecorderState::Failed, Some(e)) => Some(ErrorView {
                message: e.user_message(),
                detail: e.to_string(),
                retry_label: RETRY_LABEL,
            }),
            _ => None,
        };

        RecorderView {
            state,
            button: ButtonView::for_state(state),
            live_preview,
            playback,
            error,
            elapsed_secs: live_session.map(|s| s.clock().elapsed_secs()),
        }
    }

    /// Stop any active capture, release the artifact handle, and drop all
    /// observers. Called automatically on drop.
    pub fn teardown(&self) {
        self.shared.teardown();
    }
}

impl<P: CapturePlatform + 'static> Drop for RecorderController<P> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl<P: CapturePlatform + 'static> Shared<P> {
    async fn start_recording(self: &Rc<Self>) -> ClipcastResult<u64> {
        let (previous, attempt) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.state.can_start() {
                tracing::warn!(state = %inner.state, "Ignoring start request");
                return Err(ClipcastError::invalid_state("start recording", inner.state));
            }
            let previous = inner.state;
            inner.state = RecorderState::Requesting;
            inner.last_error = None;
            inner.attempt += 1;
            (previous, inner.attempt)
        };
        self.emit(&ControllerEvent::StateChanged {
            from: previous,
            to: RecorderState::Requesting,
        });

        tracing::info!(platform = self.platform.name(), "Requesting capture permissions");

        let opened = self.open_session().await;

        let superseded = {
            let inner = self.inner.borrow();
            if inner.attempt != attempt || inner.state != RecorderState::Requesting {
                Some(inner.state)
            } else {
                None
            }
        };
        if let Some(state) = superseded {
            tracing::warn!(%state, "Start was superseded while waiting for permission");
            if let Ok(session) = opened {
                Self::discard(session);
            }
            return Err(ClipcastError::invalid_state("start recording", state));
        }

        match opened {
            Ok(session) => {
                let session_id = session.id();
                {
                    let mut inner = self.inner.borrow_mut();
                    inner.session = Some(session);
                    inner.state = RecorderState::Recording;
                }
                self.emit(&ControllerEvent::StateChanged {
                    from: RecorderState::Requesting,
                    to: RecorderState::Recording,
                });
                tracing::info!(session_id, mime = %self.config.mime_type, "Recording started");
                Ok(session_id)
            }
            Err(e) => Err(self.fail(RecorderState::Requesting, e)),
        }
    }

    /// Acquire both sources and start the recorder. Every track acquired
    /// along the way is stopped again on failure.
    async fn open_session(self: &Rc<Self>) -> ClipcastResult<RecordingSession<P>> {
        let platform = &self.platform;

        let screen = platform.request_display(&self.config.display).await?;
        tracing::debug!(
            stream = %screen.id(),
            tracks = screen.tracks().len(),
            "Display capture granted"
        );

        let microphone = platform
            .request_microphone(&self.config.microphone)
            .await
            .map_err(|e| {
                screen.stop_all();
                e
            })?;
        tracing::debug!(
            stream = %microphone.id(),
            tracks = microphone.tracks().len(),
            "Microphone granted"
        );

        let stream = platform
            .merge_streams(&[&screen, &microphone])
            .map_err(|e| {
                screen.stop_all();
                microphone.stop_all();
                e
            })?;

        let session_id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_session_id += 1;
            inner.next_session_id
        };
        let listener = Rc::new(SessionListener {
            shared: Rc::downgrade(self),
            session_id,
        });

        let options = RecorderOptions {
            mime_type: self.config.mime_type.clone(),
            timeslice_ms: self.config.timeslice_ms,
        };
        let mut recorder = platform
            .create_recorder(&stream, &options, listener.clone())
            .map_err(|e| {
                stream.stop_all();
                e
            })?;

        if let Err(e) = recorder.start(self.config.timeslice_ms) {
            recorder.unsubscribe();
            stream.stop_all();
            return Err(e);
        }

        let track_watch = if self.config.stop_on_track_end {
            match platform.watch_track_end(&stream, listener) {
                Ok(watch) => Some(watch),
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot watch for ended tracks");
                    None
                }
            }
        } else {
            None
        };

        Ok(RecordingSession::new(session_id, stream, recorder, track_watch))
    }

    /// Release a session that will never be published.
    fn discard(session: RecordingSession<P>) {
        let mut closed = session.close();
        closed.release_sources();
        if let Some(recorder) = closed.recorder.as_mut() {
            if recorder.activity() != RecorderActivity::Inactive {
                let _ = recorder.stop();
            }
        }
        tracing::debug!(session_id = closed.id, "Discarded capture session");
    }

    fn fail(&self, from: RecorderState, error: ClipcastError) -> ClipcastError {
        if error.is_start_failure() {
            tracing::error!(error = %error, "Failed to start recording");
        } else {
            tracing::error!(error = %error, "Unexpected error while starting recording");
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.state = RecorderState::Failed;
            inner.last_error = Some(error.clone());
        }
        self.emit(&ControllerEvent::StateChanged {
            from,
            to: RecorderState::Failed,
        });
        self.emit(&ControllerEvent::Failed(error.clone()));
        error
    }

    fn stop_recording(&self) -> ClipcastResult<StopOutcome> {
        let (session_id, recorder, stream) = {
            let mut inner = self.inner.borrow_mut();
            let state = inner.state;
            if state != RecorderState::Recording {
                tracing::debug!(%state, "Stop ignored; not recording");
                return Ok(StopOutcome::NotRecording { state });
            }
            let Some(session) = inner.session.as_mut() else {
                return Ok(StopOutcome::NotRecording { state });
            };
            let parts = (session.id(), session.take_recorder(), session.stream().clone());
            inner.state = RecorderState::Finalizing;
            parts
        };
        self.emit(&ControllerEvent::StateChanged {
            from: RecorderState::Recording,
            to: RecorderState::Finalizing,
        });
        tracing::info!(session_id, "Stopping recording");

        let stopped = match recorder {
            // Already stopping on its own (after an error, or once every
            // track ended); its pending stop event finalizes the session.
            Some(recorder) if recorder.activity() == RecorderActivity::Inactive => {
                tracing::debug!(session_id, "Recorder already inactive; awaiting its stop event");
                self.return_recorder(session_id, recorder);
                Ok(())
            }
            Some(mut recorder) => {
                let result = recorder.stop();
                self.return_recorder(session_id, recorder);
                result
            }
            None => Err(ClipcastError::recorder("session has no recorder")),
        };

        stream.stop_all();

        if let Err(e) = stopped {
            tracing::warn!(session_id, error = %e, "Recorder did not stop cleanly; finalizing buffered chunks");
            self.finalize(session_id);
        }

        Ok(StopOutcome::Stopping { session_id })
    }

    /// Put the recorder back into its session, or detach it if the session
    /// was finalized while the recorder was out.
    fn return_recorder(&self, session_id: u64, recorder: P::Recorder) {
        let leftover = {
            let mut inner = self.inner.borrow_mut();
            match inner.session.as_mut().filter(|s| s.id() == session_id) {
                Some(session) => {
                    session.restore_recorder(recorder);
                    None
                }
                None => Some(recorder),
            }
        };
        if let Some(mut recorder) = leftover {
            recorder.unsubscribe();
        }
    }

    fn receive_chunk(&self, session_id: u64, chunk: P::Chunk) {
        let bytes = chunk.byte_len();
        let event = {
            let mut inner = self.inner.borrow_mut();
            let Some(session) = inner.session.as_mut().filter(|s| s.id() == session_id) else {
                tracing::debug!(session_id, bytes, "Dropping chunk for inactive session");
                return;
            };
            if !session.push_chunk(chunk) {
                tracing::debug!(session_id, "Discarding empty chunk");
                return;
            }
            ControllerEvent::ChunkReceived {
                session_id,
                bytes,
                total_bytes: session.buffered_bytes(),
                chunks: session.chunk_count(),
            }
        };
        tracing::debug!(session_id, bytes, "Buffered chunk");
        self.emit(&event);
    }

    /// Assemble the artifact for `session_id`. Runs at most once per session.
    fn finalize(&self, session_id: u64) {
        let closed = {
            let mut inner = self.inner.borrow_mut();
            match inner.session.take() {
                Some(session) if session.id() == session_id => session.close(),
                other => {
                    inner.session = other;
                    tracing::debug!(session_id, "Ignoring finalization for inactive session");
                    return;
                }
            }
        };

        let mut closed = closed;
        closed.release_sources();

        let started_at = closed.clock.epoch();
        let duration = closed.clock.elapsed();
        let chunk_count = closed.chunks.len();
        let skipped_empty = closed.chunks.skipped_empty();
        let chunks = closed.chunks.into_chunks();

        let previous = self.inner.borrow_mut().artifact.take();
        if let Some(previous) = previous {
            tracing::debug!(session_id = previous.info().session_id, "Releasing previous artifact");
            previous.release();
        }

        let assembled = self
            .platform
            .assemble(chunks, self.config.content_type())
            .and_then(|blob| {
                let url = self.platform.create_object_url(&blob)?;
                Ok((blob, url))
            });

        match assembled {
            Ok((blob, url)) => {
                let artifact = RecordingArtifact::new(
                    session_id,
                    blob,
                    ObjectUrl::new(url, self.revoker()),
                    self.config.download_filename.clone(),
                    chunk_count,
                    started_at,
                    duration,
                );
                let info = artifact.info().clone();
                let from = {
                    let mut inner = self.inner.borrow_mut();
                    inner.artifact = Some(artifact);
                    std::mem::replace(&mut inner.state, RecorderState::Idle)
                };
                tracing::info!(
                    session_id,
                    bytes = info.byte_len,
                    chunks = chunk_count,
                    skipped_empty,
                    duration_ms = info.duration_ms,
                    "Recording finalized"
                );
                self.emit(&ControllerEvent::ArtifactReady(info));
                self.emit(&ControllerEvent::StateChanged {
                    from,
                    to: RecorderState::Idle,
                });
            }
            Err(e) => {
                tracing::error!(session_id, error = %e, "Failed to assemble recording");
                let error = ClipcastError::artifact(e.to_string());
                let from = {
                    let mut inner = self.inner.borrow_mut();
                    inner.last_error = Some(error.clone());
                    std::mem::replace(&mut inner.state, RecorderState::Failed)
                };
                self.emit(&ControllerEvent::StateChanged {
                    from,
                    to: RecorderState::Failed,
                });
                self.emit(&ControllerEvent::Failed(error));
            }
        }
    }

    fn is_recording(&self, session_id: u64) -> bool {
        let inner = self.inner.borrow();
        inner.state == RecorderState::Recording
            && inner.session.as_ref().map(|s| s.id()) == Some(session_id)
    }

    fn recorder_failed(&self, session_id: u64, error: ClipcastError) {
        tracing::error!(session_id, error = %error, "Recorder reported an error");
        if self.is_recording(session_id) {
            let _ = self.stop_recording();
        }
    }

    fn track_ended(&self, session_id: u64, track_id: &str, kind: TrackKind) {
        if !self.is_recording(session_id) {
            return;
        }
        tracing::info!(session_id, track_id, ?kind, "Captured track ended; stopping recording");
        let _ = self.stop_recording();
    }

    fn revoker(&self) -> Rc<dyn Fn(&str)> {
        let platform = self.platform.clone();
        Rc::new(move |url: &str| platform.revoke_object_url(url))
    }

    fn teardown(&self) {
        let (session, artifact) = {
            let mut inner = self.inner.borrow_mut();
            inner.attempt += 1;
            inner.state = RecorderState::Idle;
            inner.last_error = None;
            (inner.session.take(), inner.artifact.take())
        };

        if let Some(session) = session {
            tracing::info!(session_id = session.id(), "Releasing capture session on teardown");
            Self::discard(session);
        }

        if let Some(artifact) = artifact {
            artifact.release();
        }

        self.observers.borrow_mut().clear();
    }

    fn emit(&self, event: &ControllerEvent) {
        let observers = self.observers.borrow().snapshot();
        for observer in observers {
            observer(event);
        }
    }
}

impl<P: CapturePlatform + 'static> RecorderListener<P::Chunk> for SessionListener<P> {
    fn on_data_available(&self, chunk: P::Chunk) {
        if let Some(shared) = self.shared.upgrade() {
            shared.receive_chunk(self.session_id, chunk);
        }
    }

    fn on_stop(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.finalize(self.session_id);
        }
    }

    fn on_error(&self, error: ClipcastError) {
        if let Some(shared) = self.shared.upgrade() {
            shared.recorder_failed(self.session_id, error);
        }
    }
}

impl<P: CapturePlatform + 'static> TrackEndedListener for SessionListener<P> {
    fn on_track_ended(&self, track_id: &str, kind: TrackKind) {
        if let Some(shared) = self.shared.upgrade() {
            shared.track_ended(self.session_id, track_id, kind);
        }
    }
}
