//! The screen recorder component.
//!
//! One primary button, a muted live preview while recording, and a playback
//! section with a download link once a recording exists. The DOM is
//! re-rendered from [`RecorderController::view`] on every controller event.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, HtmlAnchorElement, HtmlButtonElement, HtmlElement, HtmlVideoElement,
};

use clipcast_capture_engine::{ObserverId, RecorderController, RecorderView};
use clipcast_common::clock::format_elapsed;
use clipcast_common::config::RecorderConfig;
use clipcast_platform_core::capability::{all_required_available, capability_report};
use clipcast_platform_core::CapturePlatform;

use crate::media::WebStream;
use crate::platform::WebPlatform;
use crate::recorder::defer_drop;

thread_local! {
    static MOUNTED: RefCell<HashMap<String, Rc<ScreenRecorder>>> = RefCell::new(HashMap::new());
}

type ClickHandler = Closure<dyn FnMut(Event)>;

struct Elements {
    root: HtmlElement,
    status: HtmlElement,
    button: HtmlButtonElement,
    error_banner: HtmlElement,
    error_text: HtmlElement,
    retry: HtmlButtonElement,
    dismiss: HtmlButtonElement,
    live_section: HtmlElement,
    live: HtmlVideoElement,
    playback_section: HtmlElement,
    playback: HtmlVideoElement,
    download: HtmlAnchorElement,
}

struct ScreenRecorder {
    controller: RecorderController<WebPlatform>,
    elements: Elements,
    handlers: RefCell<Vec<ClickHandler>>,
    observer: Cell<Option<ObserverId>>,
    bound_session: Cell<Option<u64>>,
    bound_src: RefCell<Option<String>>,
}

fn create<T: JsCast>(document: &Document, tag: &str, class: &str) -> Result<T, JsValue> {
    let element = document.create_element(tag)?;
    element.set_class_name(class);
    Ok(element.dyn_into::<T>()?)
}

impl Elements {
    fn build(document: &Document, config: &RecorderConfig) -> Result<Self, JsValue> {
        let root: HtmlElement = create(document, "div", "clipcast-recorder")?;

        let heading: HtmlElement = create(document, "h1", "clipcast-title")?;
        heading.set_text_content(Some("Screen Recorder"));

        let status: HtmlElement = create(document, "p", "clipcast-status")?;
        let button: HtmlButtonElement = create(document, "button", "clipcast-primary")?;
        button.set_type("button");

        let error_banner: HtmlElement = create(document, "div", "clipcast-error")?;
        error_banner.set_attribute("role", "alert")?;
        let error_text: HtmlElement = create(document, "span", "clipcast-error-message")?;
        let retry: HtmlButtonElement = create(document, "button", "clipcast-retry")?;
        retry.set_type("button");
        let dismiss: HtmlButtonElement = create(document, "button", "clipcast-dismiss")?;
        dismiss.set_type("button");
        dismiss.set_text_content(Some("Dismiss"));
        error_banner.append_child(&error_text)?;
        error_banner.append_child(&retry)?;
        error_banner.append_child(&dismiss)?;

        let live_section: HtmlElement = create(document, "section", "clipcast-live")?;
        let live_heading: HtmlElement = create(document, "h2", "")?;
        live_heading.set_text_content(Some("Live Preview"));
        let live: HtmlVideoElement = create(document, "video", "clipcast-live-video")?;
        live.set_autoplay(true);
        live.set_muted(true);
        live.set_attribute("playsinline", "")?;
        live_section.append_child(&live_heading)?;
        live_section.append_child(&live)?;

        let playback_section: HtmlElement = create(document, "section", "clipcast-playback")?;
        let playback_heading: HtmlElement = create(document, "h2", "")?;
        playback_heading.set_text_content(Some("Recorded Video"));
        let playback: HtmlVideoElement = create(document, "video", "clipcast-playback-video")?;
        playback.set_controls(true);
        let download: HtmlAnchorElement = create(document, "a", "clipcast-download")?;
        download.set_download(&config.download_filename);
        download.set_text_content(Some("Download Recording"));
        playback_section.append_child(&playback_heading)?;
        playback_section.append_child(&playback)?;
        playback_section.append_child(&download)?;

        root.append_child(&heading)?;
        root.append_child(&button)?;
        root.append_child(&status)?;
        root.append_child(&error_banner)?;
        root.append_child(&live_section)?;
        root.append_child(&playback_section)?;

        Ok(Self {
            root,
            status,
            button,
            error_banner,
            error_text,
            retry,
            dismiss,
            live_section,
            live,
            playback_section,
            playback,
            download,
        })
    }
}

impl ScreenRecorder {
    fn render(&self) {
        let view = self.controller.view();
        let el = &self.elements;

        el.button.set_text_content(Some(view.button.label));
        el.button.set_disabled(!view.button.enabled);

        let status = match view.elapsed_secs {
            Some(secs) => format!(
                "{} {}",
                view.state,
                format_elapsed(chrono::Duration::milliseconds((secs * 1000.0) as i64))
            ),
            None => view.state.to_string(),
        };
        el.status.set_text_content(Some(&status));

        self.render_error(&view);
        self.render_live(&view);
        self.render_playback(&view);
    }

    fn render_error(&self, view: &RecorderView<WebStream>) {
        let el = &self.elements;
        match &view.error {
            Some(error) => {
                el.error_text.set_text_content(Some(&error.message));
                el.error_text.set_title(&error.detail);
                el.retry.set_text_content(Some(error.retry_label));
                el.error_banner.set_hidden(false);
            }
            None => el.error_banner.set_hidden(true),
        }
    }

    fn render_live(&self, view: &RecorderView<WebStream>) {
        let el = &self.elements;
        match &view.live_preview {
            Some(preview) => {
                if self.bound_session.get() != Some(preview.session_id) {
                    el.live.set_src_object(Some(preview.stream.media_stream()));
                    el.live.set_muted(preview.muted);
                    el.live.set_autoplay(preview.autoplay);
                    self.bound_session.set(Some(preview.session_id));
                }
                el.live_section.set_hidden(false);
            }
            None => {
                if self.bound_session.take().is_some() {
                    el.live.set_src_object(None);
                }
                el.live_section.set_hidden(true);
            }
        }
    }

    fn render_playback(&self, view: &RecorderView<WebStream>) {
        let el = &self.elements;
        match &view.playback {
            Some(playback) => {
                let mut bound = self.bound_src.borrow_mut();
                if bound.as_deref() != Some(playback.src.as_str()) {
                    el.playback.set_src(&playback.src);
                    el.playback.set_controls(playback.controls);
                    el.download.set_href(&playback.download.href);
                    el.download.set_download(&playback.download.filename);
                    el.download.set_type(&playback.download.content_type);
                    *bound = Some(playback.src.clone());
                }
                el.playback_section.set_hidden(false);
            }
            None => {
                if self.bound_src.borrow_mut().take().is_some() {
                    el.playback.remove_attribute("src").ok();
                    el.download.remove_attribute("href").ok();
                }
                el.playback_section.set_hidden(true);
            }
        }
    }

    fn on_click(
        self: &Rc<Self>,
        target: &HtmlButtonElement,
        action: fn(Rc<ScreenRecorder>),
    ) -> Result<(), JsValue> {
        let weak: Weak<Self> = Rc::downgrade(self);
        let handler = Closure::wrap(Box::new(move |_event: Event| {
            if let Some(component) = weak.upgrade() {
                action(component);
            }
        }) as Box<dyn FnMut(_)>);
        target.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())?;
        self.handlers.borrow_mut().push(handler);
        Ok(())
    }
}

fn press_primary(component: Rc<ScreenRecorder>) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = component.controller.press_primary().await {
            tracing::warn!(error = %e, "Recorder action failed");
        }
    });
}

fn dismiss_error(component: Rc<ScreenRecorder>) {
    component.controller.dismiss_error();
}

impl Drop for ScreenRecorder {
    fn drop(&mut self) {
        if let Some(id) = self.observer.take() {
            self.controller.unsubscribe(id);
        }
        self.elements.root.remove();
        defer_drop(std::mem::take(self.handlers.get_mut()));
    }
}

fn init_browser_logging(level: &str) {
    console_error_panic_hook::set_once();
    let level = level.parse::<log::Level>().unwrap_or(log::Level::Info);
    // Fails harmlessly when a second component mounts.
    console_log::init_with_level(level).ok();
}

/// Mount a recorder into the element with id `container_id`.
///
/// `config_json` overrides defaults with a serialized `RecorderConfig`.
/// Mounting again into the same container replaces the previous instance.
#[wasm_bindgen]
pub fn mount_screen_recorder(container_id: &str, config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json.as_deref() {
        Some(json) => RecorderConfig::from_json_str(json),
        None => Ok(RecorderConfig::default()),
    }
    .map_err(|e| JsValue::from_str(&e.to_string()))?;

    init_browser_logging(&config.logging.level);

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let container: Element = document
        .get_element_by_id(container_id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id '{container_id}'")))?;

    unmount_screen_recorder(container_id);

    let platform = WebPlatform::new();
    let capabilities = platform.capabilities();
    if !all_required_available(&capabilities) {
        for line in capability_report(&capabilities) {
            tracing::warn!("{}", line.trim());
        }
    }

    let elements = Elements::build(&document, &config)?;
    let controller = RecorderController::new(platform, config)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let component = Rc::new(ScreenRecorder {
        controller,
        elements,
        handlers: RefCell::new(Vec::new()),
        observer: Cell::new(None),
        bound_session: Cell::new(None),
        bound_src: RefCell::new(None),
    });

    let weak = Rc::downgrade(&component);
    let observer = component.controller.subscribe(move |event| {
        tracing::debug!(?event, "Controller event");
        if let Some(component) = weak.upgrade() {
            component.render();
        }
    });
    component.observer.set(Some(observer));

    component.on_click(&component.elements.button, press_primary)?;
    component.on_click(&component.elements.retry, press_primary)?;
    component.on_click(&component.elements.dismiss, dismiss_error)?;

    container.append_child(&component.elements.root)?;
    component.render();

    MOUNTED.with(|mounted| {
        mounted
            .borrow_mut()
            .insert(container_id.to_string(), component);
    });
    tracing::info!(container_id, "Screen recorder mounted");
    Ok(())
}

/// Stop any active capture and remove the recorder from `container_id`.
/// Returns `false` if nothing was mounted there.
#[wasm_bindgen]
pub fn unmount_screen_recorder(container_id: &str) -> bool {
    let removed = MOUNTED.with(|mounted| mounted.borrow_mut().remove(container_id));
    match removed {
        Some(component) => {
            drop(component);
            tracing::info!(container_id, "Screen recorder unmounted");
            true
        }
        None => false,
    }
}
