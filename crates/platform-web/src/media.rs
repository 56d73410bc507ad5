//! Wrappers around `MediaStream`, `MediaStreamTrack`, and `Blob`.

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, Event, MediaStream, MediaStreamTrack, MediaStreamTrackState};

use clipcast_platform_core::{
    CaptureStream, MediaBlob, MediaChunk, MediaTrack, Subscription, TrackEndedListener, TrackKind,
    TrackState,
};

use crate::recorder::defer_drop;

#[derive(Debug, Clone)]
pub struct WebTrack(MediaStreamTrack);

impl WebTrack {
    pub fn inner(&self) -> &MediaStreamTrack {
        &self.0
    }
}

impl MediaTrack for WebTrack {
    fn id(&self) -> String {
        self.0.id()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::from_platform_kind(&self.0.kind()).unwrap_or(TrackKind::Video)
    }

    fn label(&self) -> String {
        self.0.label()
    }

    fn ready_state(&self) -> TrackState {
        match self.0.ready_state() {
            MediaStreamTrackState::Live => TrackState::Live,
            _ => TrackState::Ended,
        }
    }

    fn stop(&self) {
        self.0.stop();
    }
}

/// A browser `MediaStream`.
#[derive(Debug, Clone)]
pub struct WebStream(MediaStream);

impl WebStream {
    pub fn new(stream: MediaStream) -> Self {
        Self(stream)
    }

    /// The underlying stream, for binding to a `<video>` element.
    pub fn media_stream(&self) -> &MediaStream {
        &self.0
    }
}

impl CaptureStream for WebStream {
    type Track = WebTrack;

    fn id(&self) -> String {
        self.0.id()
    }

    fn tracks(&self) -> Vec<WebTrack> {
        self.0
            .get_tracks()
            .iter()
            .map(|t| WebTrack(t.unchecked_into::<MediaStreamTrack>()))
            .collect()
    }
}

/// One `dataavailable` payload.
#[derive(Debug, Clone)]
pub struct WebChunk(Blob);

impl WebChunk {
    pub fn new(blob: Blob) -> Self {
        Self(blob)
    }

    pub fn blob(&self) -> &Blob {
        &self.0
    }
}

impl MediaChunk for WebChunk {
    fn byte_len(&self) -> u64 {
        self.0.size() as u64
    }
}

/// The assembled recording.
#[derive(Debug, Clone)]
pub struct WebBlob(Blob);

impl WebBlob {
    pub fn new(blob: Blob) -> Self {
        Self(blob)
    }

    pub fn blob(&self) -> &Blob {
        &self.0
    }
}

impl MediaBlob for WebBlob {
    fn byte_len(&self) -> u64 {
        self.0.size() as u64
    }

    fn content_type(&self) -> String {
        self.0.type_()
    }
}

type EndedHandler = Closure<dyn FnMut(Event)>;

/// `ended` listeners attached to every track of one stream.
pub struct TrackEndWatch {
    registrations: Vec<(MediaStreamTrack, EndedHandler)>,
}

impl TrackEndWatch {
    pub(crate) fn attach(
        stream: &WebStream,
        listener: Rc<dyn TrackEndedListener>,
    ) -> Result<Self, JsValue> {
        let mut watch = Self {
            registrations: Vec::new(),
        };
        for track in stream.tracks() {
            let track = track.0;
            let listener = listener.clone();
            let track_id = track.id();
            let kind = TrackKind::from_platform_kind(&track.kind()).unwrap_or(TrackKind::Video);

            let handler = Closure::wrap(Box::new(move |_event: Event| {
                listener.on_track_ended(&track_id, kind);
            }) as Box<dyn FnMut(_)>);

            if let Err(e) =
                track.add_event_listener_with_callback("ended", handler.as_ref().unchecked_ref())
            {
                watch.unsubscribe();
                return Err(e);
            }
            watch.registrations.push((track, handler));
        }
        Ok(watch)
    }
}

impl Subscription for TrackEndWatch {
    fn unsubscribe(&mut self) {
        if self.registrations.is_empty() {
            return;
        }
        let registrations = std::mem::take(&mut self.registrations);
        for (track, handler) in &registrations {
            let _ = track
                .remove_event_listener_with_callback("ended", handler.as_ref().unchecked_ref());
        }
        // The controller may unsubscribe from inside one of these handlers.
        defer_drop(registrations);
    }
}

impl Drop for TrackEndWatch {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
