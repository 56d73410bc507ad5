//! Scripted recording facility.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use clipcast_common::error::{ClipcastError, ClipcastResult};
use clipcast_platform_core::{MediaRecorder, RecorderActivity, RecorderListener, Subscription};

use crate::track::SyntheticStream;

type Listener = Rc<dyn RecorderListener<Vec<u8>>>;

struct RecorderCore {
    id: u64,
    mime_type: String,
    stream: SyntheticStream,
    activity: Cell<RecorderActivity>,
    listener: RefCell<Option<Listener>>,
    fail_start: bool,
    flush_on_stop: Option<Vec<u8>>,
    defer_stop: bool,
    /// Inactive but `on_stop` not yet delivered.
    stopping: Cell<bool>,
    timeslice_ms: Cell<Option<u32>>,
    stop_events: Cell<u32>,
}

impl RecorderCore {
    fn listener(&self) -> Option<Listener> {
        self.listener.borrow().clone()
    }

    /// Flush and report the stop to the listener, if still subscribed.
    fn finish(&self) {
        self.activity.set(RecorderActivity::Inactive);
        self.stopping.set(false);
        if let Some(tail) = self.flush_on_stop.clone() {
            if let Some(listener) = self.listener() {
                listener.on_data_available(tail);
            }
        }
        self.stop_events.set(self.stop_events.get() + 1);
        if let Some(listener) = self.listener() {
            listener.on_stop();
        }
    }
}

/// The recorder handed to the controller.
///
/// `stop()` reports `on_stop` synchronously, before returning, unless the
/// script defers it.
pub struct SyntheticRecorder {
    core: Rc<RecorderCore>,
}

/// Test-side handle to a recorder created by the platform.
#[derive(Clone)]
pub struct RecorderDriver {
    core: Rc<RecorderCore>,
}

pub(crate) fn create(
    id: u64,
    mime_type: String,
    stream: SyntheticStream,
    listener: Listener,
    fail_start: bool,
    flush_on_stop: Option<Vec<u8>>,
    defer_stop: bool,
) -> (SyntheticRecorder, RecorderDriver) {
    let core = Rc::new(RecorderCore {
        id,
        mime_type,
        stream,
        activity: Cell::new(RecorderActivity::Inactive),
        listener: RefCell::new(Some(listener)),
        fail_start,
        flush_on_stop,
        defer_stop,
        stopping: Cell::new(false),
        timeslice_ms: Cell::new(None),
        stop_events: Cell::new(0),
    });
    (
        SyntheticRecorder { core: core.clone() },
        RecorderDriver { core },
    )
}

impl MediaRecorder for SyntheticRecorder {
    fn start(&mut self, timeslice_ms: Option<u32>) -> ClipcastResult<()> {
        if self.core.fail_start {
            return Err(ClipcastError::recorder_init(
                "recorder refused to start for this stream",
            ));
        }
        if self.core.activity.get() != RecorderActivity::Inactive {
            return Err(ClipcastError::recorder("recorder already started"));
        }
        self.core.timeslice_ms.set(timeslice_ms);
        self.core.activity.set(RecorderActivity::Recording);
        tracing::debug!(recorder = self.core.id, ?timeslice_ms, "Synthetic recorder started");
        Ok(())
    }

    fn stop(&mut self) -> ClipcastResult<()> {
        if self.core.activity.get() == RecorderActivity::Inactive {
            return Err(ClipcastError::recorder("recorder is not running"));
        }
        tracing::debug!(recorder = self.core.id, "Synthetic recorder stopping");
        if self.core.defer_stop {
            self.core.activity.set(RecorderActivity::Inactive);
            self.core.stopping.set(true);
        } else {
            self.core.finish();
        }
        Ok(())
    }

    fn activity(&self) -> RecorderActivity {
        self.core.activity.get()
    }

    fn mime_type(&self) -> String {
        self.core.mime_type.clone()
    }
}

impl Subscription for SyntheticRecorder {
    fn unsubscribe(&mut self) {
        self.core.listener.borrow_mut().take();
    }
}

impl RecorderDriver {
    /// Deliver an encoded fragment. Returns `false` unless the recorder is
    /// running and subscribed.
    /// A stopping recorder still delivers its final fragments.
    pub fn emit(&self, chunk: impl Into<Vec<u8>>) -> bool {
        if self.core.activity.get() != RecorderActivity::Recording && !self.core.stopping.get() {
            return false;
        }
        match self.core.listener() {
            Some(listener) => {
                listener.on_data_available(chunk.into());
                true
            }
            None => false,
        }
    }

    /// Report a runtime failure.
    pub fn fail(&self, message: &str) {
        if let Some(listener) = self.core.listener() {
            listener.on_error(ClipcastError::recorder(message));
        }
    }

    /// Fail the way a browser recorder does: it goes inactive, reports the
    /// error, and completes later through [`finish`](Self::finish).
    pub fn abort(&self, message: &str) {
        if self.core.activity.get() == RecorderActivity::Inactive {
            return;
        }
        self.core.activity.set(RecorderActivity::Inactive);
        self.core.stopping.set(true);
        if let Some(listener) = self.core.listener() {
            listener.on_error(ClipcastError::recorder(message));
        }
    }

    /// Complete a deferred stop, or stop on the recorder's own initiative as
    /// browsers do when every recorded track has ended.
    pub fn finish(&self) {
        if self.core.activity.get() != RecorderActivity::Inactive || self.core.stopping.get() {
            self.core.finish();
        }
    }

    /// Stopped, with `on_stop` still outstanding.
    pub fn is_stopping(&self) -> bool {
        self.core.stopping.get()
    }

    pub fn activity(&self) -> RecorderActivity {
        self.core.activity.get()
    }

    pub fn is_subscribed(&self) -> bool {
        self.core.listener.borrow().is_some()
    }

    pub fn mime_type(&self) -> String {
        self.core.mime_type.clone()
    }

    pub fn timeslice_ms(&self) -> Option<u32> {
        self.core.timeslice_ms.get()
    }

    /// How many times the recorder reported a stop.
    pub fn stop_events(&self) -> u32 {
        self.core.stop_events.get()
    }

    /// The stream the recorder was created for.
    pub fn stream(&self) -> SyntheticStream {
        self.core.stream.clone()
    }
}
