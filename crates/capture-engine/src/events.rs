//! Controller notifications for UI observers.

use std::rc::Rc;

use clipcast_common::error::ClipcastError;

use crate::artifact::ArtifactInfo;
use crate::state::RecorderState;

/// Something the UI may want to re-render for.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StateChanged {
        from: RecorderState,
        to: RecorderState,
    },
    ChunkReceived {
        session_id: u64,
        bytes: u64,
        total_bytes: u64,
        chunks: usize,
    },
    ArtifactReady(ArtifactInfo),
    Failed(ClipcastError),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Rc<dyn Fn(&ControllerEvent)>;

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(ObserverId, Observer)>,
}

impl Observers {
    pub fn add(&mut self, observer: Observer) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.entries.push((id, observer));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Clone the current observers so they can be called without holding
    /// the registry borrowed.
    pub fn snapshot(&self) -> Vec<Observer> {
        self.entries.iter().map(|(_, o)| o.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
