//! `MediaRecorder` bound to a [`RecorderListener`].

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{BlobEvent, Event, MediaRecorder as JsMediaRecorder, RecordingState};

use clipcast_common::error::{ClipcastError, ClipcastResult};
use clipcast_platform_core::{MediaRecorder, RecorderActivity, RecorderListener, Subscription};

use crate::error::classify_recorder_error;
use crate::media::WebChunk;
use crate::platform::js_error_parts;

type Listener = Rc<dyn RecorderListener<WebChunk>>;

/// Drop `value` on a later turn of the event loop.
///
/// Event handlers are `Closure`s owned by Rust; freeing one while the
/// browser is still executing it is undefined behavior.
pub(crate) fn defer_drop<T: 'static>(value: T) {
    wasm_bindgen_futures::spawn_local(async move {
        drop(value);
    });
}

struct Handlers {
    data_available: Closure<dyn FnMut(BlobEvent)>,
    stop: Closure<dyn FnMut(Event)>,
    error: Closure<dyn FnMut(Event)>,
}

impl Handlers {
    fn new(listener: Listener) -> Self {
        let on_data = listener.clone();
        let data_available = Closure::wrap(Box::new(move |event: BlobEvent| {
            if let Some(blob) = event.data() {
                on_data.on_data_available(WebChunk::new(blob));
            }
        }) as Box<dyn FnMut(_)>);

        let on_stop = listener.clone();
        let stop = Closure::wrap(Box::new(move |_event: Event| {
            on_stop.on_stop();
        }) as Box<dyn FnMut(_)>);

        let error = Closure::wrap(Box::new(move |event: Event| {
            let (name, message) = js_sys::Reflect::get(&event, &"error".into())
                .map(|e| js_error_parts(&e))
                .unwrap_or_else(|_| (event.type_(), String::new()));
            listener.on_error(ClipcastError::recorder(format!("{name}: {message}")));
        }) as Box<dyn FnMut(_)>);

        Self {
            data_available,
            stop,
            error,
        }
    }
}

/// A browser `MediaRecorder` with its event handlers installed.
pub struct WebRecorder {
    inner: JsMediaRecorder,
    handlers: Option<Handlers>,
}

impl WebRecorder {
    pub(crate) fn new(inner: JsMediaRecorder, listener: Listener) -> Self {
        let handlers = Handlers::new(listener);
        inner.set_ondataavailable(Some(handlers.data_available.as_ref().unchecked_ref()));
        inner.set_onstop(Some(handlers.stop.as_ref().unchecked_ref()));
        inner.set_onerror(Some(handlers.error.as_ref().unchecked_ref()));
        Self {
            inner,
            handlers: Some(handlers),
        }
    }
}

impl MediaRecorder for WebRecorder {
    fn start(&mut self, timeslice_ms: Option<u32>) -> ClipcastResult<()> {
        let started = match timeslice_ms {
            Some(ms) => self
                .inner
                .start_with_time_slice(i32::try_from(ms).unwrap_or(i32::MAX)),
            None => self.inner.start(),
        };
        started.map_err(|e| {
            let (name, message) = js_error_parts(&e);
            classify_recorder_error(&name, &message)
        })
    }

    fn stop(&mut self) -> ClipcastResult<()> {
        self.inner.stop().map_err(|e| {
            let (name, message) = js_error_parts(&e);
            ClipcastError::recorder(format!("{name}: {message}"))
        })
    }

    fn activity(&self) -> RecorderActivity {
        match self.inner.state() {
            RecordingState::Recording => RecorderActivity::Recording,
            RecordingState::Paused => RecorderActivity::Paused,
            _ => RecorderActivity::Inactive,
        }
    }

    fn mime_type(&self) -> String {
        self.inner.mime_type()
    }
}

impl Subscription for WebRecorder {
    fn unsubscribe(&mut self) {
        if let Some(handlers) = self.handlers.take() {
            self.inner.set_ondataavailable(None);
            self.inner.set_onstop(None);
            self.inner.set_onerror(None);
            // Finalization runs inside the `stop` handler.
            defer_drop(handlers);
        }
    }
}

impl Drop for WebRecorder {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
