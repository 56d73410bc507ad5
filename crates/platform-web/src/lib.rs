//! Clipcast browser platform.
//!
//! Implements [`CapturePlatform`](clipcast_platform_core::CapturePlatform)
//! over `navigator.mediaDevices`, `MediaRecorder`, and object URLs, and
//! exposes the screen recorder component to JavaScript as
//! `mount_screen_recorder`.
//!
//! Only the error classification is compiled for native targets; everything
//! touching the DOM is gated on `wasm32`.

pub mod error;

#[cfg(target_arch = "wasm32")]
pub mod media;
#[cfg(target_arch = "wasm32")]
pub mod platform;
#[cfg(target_arch = "wasm32")]
pub mod recorder;
#[cfg(target_arch = "wasm32")]
pub mod ui;

pub use error::{classify_capture_error, classify_recorder_error};

#[cfg(target_arch = "wasm32")]
pub use media::{WebBlob, WebChunk, WebStream, WebTrack};
#[cfg(target_arch = "wasm32")]
pub use platform::WebPlatform;
#[cfg(target_arch = "wasm32")]
pub use recorder::WebRecorder;
