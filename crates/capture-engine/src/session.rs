//! A single recording session.
//!
//! A session is created once both capture permissions are granted and the
//! recorder is running. It owns everything that must not outlive the
//! recording: the merged stream, the recorder and its listener
//! registration, the track-end watch, and the chunk buffer. Finalization
//! consumes it.

use clipcast_common::clock::RecordingClock;
use clipcast_platform_core::{CapturePlatform, CaptureStream, Subscription};

use crate::buffer::ChunkBuffer;

/// Live state of one recording.
pub struct RecordingSession<P: CapturePlatform> {
    id: u64,
    stream: P::Stream,
    /// Taken out while the controller is calling into the recorder, so a
    /// synchronous `on_stop` can finalize without touching it.
    recorder: Option<P::Recorder>,
    track_watch: Option<Box<dyn Subscription>>,
    chunks: ChunkBuffer<P::Chunk>,
    clock: RecordingClock,
}

/// What remains of a session once it is finalized.
pub(crate) struct ClosedSession<P: CapturePlatform> {
    pub id: u64,
    pub stream: P::Stream,
    pub recorder: Option<P::Recorder>,
    pub track_watch: Option<Box<dyn Subscription>>,
    pub chunks: ChunkBuffer<P::Chunk>,
    pub clock: RecordingClock,
}

impl<P: CapturePlatform> RecordingSession<P> {
    pub(crate) fn new(
        id: u64,
        stream: P::Stream,
        recorder: P::Recorder,
        track_watch: Option<Box<dyn Subscription>>,
    ) -> Self {
        Self {
            id,
            stream,
            recorder: Some(recorder),
            track_watch,
            chunks: ChunkBuffer::new(),
            clock: RecordingClock::start(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The merged stream bound to the live preview.
    pub fn stream(&self) -> &P::Stream {
        &self.stream
    }

    pub fn clock(&self) -> &RecordingClock {
        &self.clock
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn buffered_bytes(&self) -> u64 {
        self.chunks.total_bytes()
    }

    /// Append a delivered fragment. Returns `false` if it was empty.
    pub(crate) fn push_chunk(&mut self, chunk: P::Chunk) -> bool {
        self.chunks.push(chunk)
    }

    pub(crate) fn take_recorder(&mut self) -> Option<P::Recorder> {
        self.recorder.take()
    }

    pub(crate) fn restore_recorder(&mut self, recorder: P::Recorder) {
        self.recorder = Some(recorder);
    }

    pub(crate) fn close(self) -> ClosedSession<P> {
        ClosedSession {
            id: self.id,
            stream: self.stream,
            recorder: self.recorder,
            track_watch: self.track_watch,
            chunks: self.chunks,
            clock: self.clock,
        }
    }
}

impl<P: CapturePlatform> ClosedSession<P> {
    /// Withdraw every listener and stop every track.
    pub(crate) fn release_sources(&mut self) {
        if let Some(mut watch) = self.track_watch.take() {
            watch.unsubscribe();
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.unsubscribe();
        }
        self.stream.stop_all();
    }
}
