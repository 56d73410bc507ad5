//! [`CapturePlatform`] over the browser media APIs.

use std::rc::Rc;

use async_trait::async_trait;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, BlobPropertyBag, DisplayMediaStreamConstraints, DomException, MediaDevices,
    MediaRecorder as JsMediaRecorder, MediaRecorderOptions, MediaStream, MediaStreamConstraints,
    Url,
};

use clipcast_common::config::{DisplayConstraints, MicrophoneConstraints};
use clipcast_common::error::{CaptureSource, ClipcastError, ClipcastResult};
use clipcast_platform_core::{
    Capability, CapturePlatform, CaptureStream, RecorderListener, RecorderOptions, Subscription,
    TrackEndedListener,
};

use crate::error::{classify_capture_error, classify_recorder_error};
use crate::media::{TrackEndWatch, WebBlob, WebChunk, WebStream, WebTrack};
use crate::recorder::WebRecorder;

/// Extract `(name, message)` from a thrown value or rejection reason.
pub(crate) fn js_error_parts(value: &JsValue) -> (String, String) {
    if let Some(e) = value.dyn_ref::<DomException>() {
        return (e.name(), e.message());
    }
    if let Some(e) = value.dyn_ref::<js_sys::Error>() {
        return (String::from(e.name()), String::from(e.message()));
    }
    match value.as_string() {
        Some(text) => ("Error".to_string(), text),
        None => ("Error".to_string(), format!("{value:?}")),
    }
}

fn set_property(target: &js_sys::Object, key: &str, value: &JsValue) -> ClipcastResult<()> {
    js_sys::Reflect::set(target, &key.into(), value)
        .map(|_| ())
        .map_err(|e| ClipcastError::unsupported(js_error_parts(&e).1))
}

/// The browser's capture facilities.
#[derive(Debug, Default, Clone)]
pub struct WebPlatform;

impl WebPlatform {
    pub fn new() -> Self {
        Self
    }

    fn media_devices(&self, source: CaptureSource) -> ClipcastResult<MediaDevices> {
        let window = web_sys::window()
            .ok_or_else(|| ClipcastError::unsupported("no window; not running in a browser"))?;
        window.navigator().media_devices().map_err(|e| {
            let (name, message) = js_error_parts(&e);
            tracing::warn!(%name, %message, ?source, "navigator.mediaDevices is unavailable");
            ClipcastError::unsupported(
                "media capture is not available; the page must be served over HTTPS",
            )
        })
    }

    fn display_constraints(
        constraints: &DisplayConstraints,
    ) -> ClipcastResult<DisplayMediaStreamConstraints> {
        let video = match constraints.frame_rate {
            Some(fps) if constraints.video => {
                let video = js_sys::Object::new();
                let frame_rate = js_sys::Object::new();
                set_property(&frame_rate, "ideal", &JsValue::from(fps))?;
                set_property(&video, "frameRate", &frame_rate)?;
                JsValue::from(video)
            }
            _ => JsValue::from_bool(constraints.video),
        };

        let options = DisplayMediaStreamConstraints::new();
        options.set_video(&video);
        options.set_audio(&JsValue::from_bool(constraints.audio));
        Ok(options)
    }

    fn microphone_constraints(
        constraints: &MicrophoneConstraints,
    ) -> ClipcastResult<MediaStreamConstraints> {
        let audio = js_sys::Object::new();
        set_property(
            &audio,
            "echoCancellation",
            &JsValue::from_bool(constraints.echo_cancellation),
        )?;
        set_property(
            &audio,
            "noiseSuppression",
            &JsValue::from_bool(constraints.noise_suppression),
        )?;

        let options = MediaStreamConstraints::new();
        options.set_audio(&audio);
        options.set_video(&JsValue::FALSE);
        Ok(options)
    }

    async fn await_stream(
        source: CaptureSource,
        promise: Result<js_sys::Promise, JsValue>,
    ) -> ClipcastResult<WebStream> {
        let classify = |e: JsValue| {
            let (name, message) = js_error_parts(&e);
            classify_capture_error(source, &name, &message)
        };
        let stream = JsFuture::from(promise.map_err(classify)?)
            .await
            .map_err(classify)?;
        Ok(WebStream::new(stream.unchecked_into::<MediaStream>()))
    }
}

#[async_trait(?Send)]
impl CapturePlatform for WebPlatform {
    type Track = WebTrack;
    type Stream = WebStream;
    type Chunk = WebChunk;
    type Blob = WebBlob;
    type Recorder = WebRecorder;

    fn name(&self) -> &str {
        "browser"
    }

    async fn request_display(&self, constraints: &DisplayConstraints) -> ClipcastResult<WebStream> {
        let devices = self.media_devices(CaptureSource::Display)?;
        let options = Self::display_constraints(constraints)?;
        tracing::debug!(?constraints, "Calling getDisplayMedia");
        Self::await_stream(
            CaptureSource::Display,
            devices.get_display_media_with_constraints(&options),
        )
        .await
    }

    async fn request_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> ClipcastResult<WebStream> {
        let devices = self.media_devices(CaptureSource::Microphone)?;
        let options = Self::microphone_constraints(constraints)?;
        tracing::debug!(?constraints, "Calling getUserMedia");
        Self::await_stream(
            CaptureSource::Microphone,
            devices.get_user_media_with_constraints(&options),
        )
        .await
    }

    fn merge_streams(&self, streams: &[&WebStream]) -> ClipcastResult<WebStream> {
        let tracks = js_sys::Array::new();
        for stream in streams {
            for track in stream.tracks() {
                tracks.push(track.inner());
            }
        }
        MediaStream::new_with_tracks(&tracks)
            .map(WebStream::new)
            .map_err(|e| ClipcastError::recorder_init(js_error_parts(&e).1))
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        JsMediaRecorder::is_type_supported(mime_type)
    }

    fn create_recorder(
        &self,
        stream: &WebStream,
        options: &RecorderOptions,
        listener: Rc<dyn RecorderListener<WebChunk>>,
    ) -> ClipcastResult<WebRecorder> {
        if !self.is_type_supported(&options.mime_type) {
            return Err(ClipcastError::recorder_init(format!(
                "{} is not supported by this browser",
                options.mime_type
            )));
        }

        let js_options = MediaRecorderOptions::new();
        js_options.set_mime_type(&options.mime_type);
        let recorder = JsMediaRecorder::new_with_media_stream_and_media_recorder_options(
            stream.media_stream(),
            &js_options,
        )
        .map_err(|e| {
            let (name, message) = js_error_parts(&e);
            classify_recorder_error(&name, &message)
        })?;

        tracing::debug!(mime = %recorder.mime_type(), stream = %stream.id(), "MediaRecorder created");
        Ok(WebRecorder::new(recorder, listener))
    }

    fn watch_track_end(
        &self,
        stream: &WebStream,
        listener: Rc<dyn TrackEndedListener>,
    ) -> ClipcastResult<Box<dyn Subscription>> {
        let watch = TrackEndWatch::attach(stream, listener)
            .map_err(|e| ClipcastError::recorder(js_error_parts(&e).1))?;
        Ok(Box::new(watch))
    }

    fn assemble(&self, chunks: Vec<WebChunk>, content_type: &str) -> ClipcastResult<WebBlob> {
        let parts = js_sys::Array::new();
        for chunk in &chunks {
            parts.push(chunk.blob());
        }
        let bag = BlobPropertyBag::new();
        bag.set_type(content_type);
        Blob::new_with_blob_sequence_and_options(&parts, &bag)
            .map(WebBlob::new)
            .map_err(|e| ClipcastError::artifact(js_error_parts(&e).1))
    }

    fn create_object_url(&self, blob: &WebBlob) -> ClipcastResult<String> {
        Url::create_object_url_with_blob(blob.blob())
            .map_err(|e| ClipcastError::artifact(js_error_parts(&e).1))
    }

    fn revoke_object_url(&self, url: &str) {
        if let Err(e) = Url::revoke_object_url(url) {
            tracing::warn!(url, error = %js_error_parts(&e).1, "Failed to revoke object URL");
        }
    }

    fn capabilities(&self) -> Vec<Capability> {
        let devices = web_sys::window().and_then(|w| w.navigator().media_devices().ok());
        let has_method = |name: &str| {
            devices
                .as_ref()
                .and_then(|d| js_sys::Reflect::get(d, &name.into()).ok())
                .map(|f| f.is_function())
                .unwrap_or(false)
        };
        let recorder_available = web_sys::window()
            .and_then(|w| js_sys::Reflect::get(&w, &"MediaRecorder".into()).ok())
            .map(|v| v.is_function())
            .unwrap_or(false);

        vec![
            Capability::new(
                "getDisplayMedia",
                "Screen, window, and tab capture",
                has_method("getDisplayMedia"),
                true,
            )
            .with_fix("Use a desktop browser and serve the page over HTTPS"),
            Capability::new(
                "getUserMedia",
                "Microphone capture",
                has_method("getUserMedia"),
                true,
            )
            .with_fix("Serve the page over HTTPS or from localhost"),
            Capability::new(
                "MediaRecorder",
                "In-browser WebM encoding",
                recorder_available,
                true,
            )
            .with_fix("Update the browser to a version with MediaRecorder support"),
        ]
    }
}
