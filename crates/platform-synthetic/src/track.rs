//! In-memory tracks and streams.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use clipcast_platform_core::{
    CaptureStream, MediaTrack, Subscription, TrackEndedListener, TrackKind, TrackState,
};

struct TrackCore {
    id: String,
    kind: TrackKind,
    label: String,
    state: Cell<TrackState>,
    stop_calls: Cell<u32>,
    ended_listeners: RefCell<Vec<(u64, Rc<dyn TrackEndedListener>)>>,
}

/// A track whose lifecycle is driven by the test.
///
/// Like a browser track, `stop()` ends it silently; only
/// [`end_externally`](Self::end_externally) notifies `ended` listeners.
#[derive(Clone)]
pub struct SyntheticTrack {
    core: Rc<TrackCore>,
}

impl SyntheticTrack {
    pub(crate) fn new(id: String, kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            core: Rc::new(TrackCore {
                id,
                kind,
                label: label.into(),
                state: Cell::new(TrackState::Live),
                stop_calls: Cell::new(0),
                ended_listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// End the track as if the user revoked sharing or unplugged the device.
    pub fn end_externally(&self) {
        if self.core.state.get() == TrackState::Ended {
            return;
        }
        self.core.state.set(TrackState::Ended);
        tracing::debug!(track = %self.core.id, "Track ended externally");

        let listeners: Vec<_> = self
            .core
            .ended_listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener.on_track_ended(&self.core.id, self.core.kind);
        }
    }

    /// How many times `stop()` was called.
    pub fn stop_calls(&self) -> u32 {
        self.core.stop_calls.get()
    }

    /// Number of `ended` listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.core.ended_listeners.borrow().len()
    }

    fn add_listener(&self, watch_id: u64, listener: Rc<dyn TrackEndedListener>) {
        self.core
            .ended_listeners
            .borrow_mut()
            .push((watch_id, listener));
    }

    fn remove_listeners(&self, watch_id: u64) {
        self.core
            .ended_listeners
            .borrow_mut()
            .retain(|(id, _)| *id != watch_id);
    }
}

impl MediaTrack for SyntheticTrack {
    fn id(&self) -> String {
        self.core.id.clone()
    }

    fn kind(&self) -> TrackKind {
        self.core.kind
    }

    fn label(&self) -> String {
        self.core.label.clone()
    }

    fn ready_state(&self) -> TrackState {
        self.core.state.get()
    }

    fn stop(&self) {
        self.core.stop_calls.set(self.core.stop_calls.get() + 1);
        self.core.state.set(TrackState::Ended);
    }
}

impl fmt::Debug for SyntheticTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticTrack")
            .field("id", &self.core.id)
            .field("kind", &self.core.kind)
            .field("state", &self.core.state.get())
            .finish()
    }
}

/// An ordered set of shared track handles.
#[derive(Debug, Clone)]
pub struct SyntheticStream {
    id: String,
    tracks: Vec<SyntheticTrack>,
}

impl SyntheticStream {
    pub(crate) fn new(id: String, tracks: Vec<SyntheticTrack>) -> Self {
        Self { id, tracks }
    }
}

impl CaptureStream for SyntheticStream {
    type Track = SyntheticTrack;

    fn id(&self) -> String {
        self.id.clone()
    }

    fn tracks(&self) -> Vec<SyntheticTrack> {
        self.tracks.clone()
    }
}

/// Registration of one listener on every track of a stream.
pub struct TrackWatch {
    watch_id: u64,
    tracks: Vec<SyntheticTrack>,
}

impl TrackWatch {
    pub(crate) fn attach(
        watch_id: u64,
        stream: &SyntheticStream,
        listener: Rc<dyn TrackEndedListener>,
    ) -> Self {
        for track in &stream.tracks {
            track.add_listener(watch_id, listener.clone());
        }
        Self {
            watch_id,
            tracks: stream.tracks.clone(),
        }
    }
}

impl Subscription for TrackWatch {
    fn unsubscribe(&mut self) {
        for track in self.tracks.drain(..) {
            track.remove_listeners(self.watch_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(Cell<u32>);

    impl TrackEndedListener for Counter {
        fn on_track_ended(&self, _track_id: &str, _kind: TrackKind) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn stop_is_silent_but_external_end_notifies() {
        let track = SyntheticTrack::new("t1".to_string(), TrackKind::Video, "Screen");
        let stream = SyntheticStream::new("s1".to_string(), vec![track.clone()]);
        let counter = Rc::new(Counter(Cell::new(0)));
        let _watch = TrackWatch::attach(1, &stream, counter.clone());

        track.stop();
        assert_eq!(track.ready_state(), TrackState::Ended);
        track.end_externally();
        assert_eq!(counter.0.get(), 0);

        let other = SyntheticTrack::new("t2".to_string(), TrackKind::Audio, "Mic");
        let stream = SyntheticStream::new("s2".to_string(), vec![other.clone()]);
        let _watch = TrackWatch::attach(2, &stream, counter.clone());
        other.end_externally();
        other.end_externally();
        assert_eq!(counter.0.get(), 1);
    }

    #[test]
    fn unsubscribe_detaches_from_every_track() {
        let a = SyntheticTrack::new("a".to_string(), TrackKind::Video, "Screen");
        let b = SyntheticTrack::new("b".to_string(), TrackKind::Audio, "Mic");
        let stream = SyntheticStream::new("s".to_string(), vec![a.clone(), b.clone()]);
        let counter = Rc::new(Counter(Cell::new(0)));

        let mut watch = TrackWatch::attach(7, &stream, counter);
        assert_eq!(a.listener_count(), 1);
        watch.unsubscribe();
        assert_eq!(a.listener_count(), 0);
        assert_eq!(b.listener_count(), 0);
    }
}
