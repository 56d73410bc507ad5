//! Mapping of browser `DOMException` names onto the Clipcast taxonomy.

use clipcast_common::error::{CaptureSource, ClipcastError};

/// Classify a rejected capture request.
///
/// `getDisplayMedia` and `getUserMedia` reject with a `DOMException` whose
/// `name` identifies the cause; anything unrecognized is reported as a
/// device problem for that source.
pub fn classify_capture_error(source: CaptureSource, name: &str, message: &str) -> ClipcastError {
    let detail = if message.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {message}")
    };

    match name {
        "NotAllowedError" | "SecurityError" | "PermissionDeniedError" => {
            ClipcastError::permission_denied(source, detail)
        }
        "NotSupportedError" | "TypeError" | "InvalidAccessError" => {
            ClipcastError::unsupported(detail)
        }
        _ => ClipcastError::device_unavailable(source, detail),
    }
}

/// Classify a failure constructing or starting a `MediaRecorder`.
pub fn classify_recorder_error(name: &str, message: &str) -> ClipcastError {
    let detail = if message.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {message}")
    };
    match name {
        "NotSupportedError" | "SecurityError" | "InvalidStateError" | "TypeError" => {
            ClipcastError::recorder_init(detail)
        }
        _ => ClipcastError::recorder(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_rejections_are_permission_denied() {
        let err = classify_capture_error(CaptureSource::Display, "NotAllowedError", "Permission denied");
        assert!(matches!(
            err,
            ClipcastError::PermissionDenied {
                source_kind: CaptureSource::Display,
                ..
            }
        ));
        assert!(err.to_string().contains("NotAllowedError: Permission denied"));
    }

    #[test]
    fn missing_hardware_is_device_unavailable() {
        for name in ["NotFoundError", "NotReadableError", "OverconstrainedError", "AbortError"] {
            let err = classify_capture_error(CaptureSource::Microphone, name, "");
            assert!(
                matches!(err, ClipcastError::DeviceUnavailable { .. }),
                "{name} should map to device unavailable"
            );
        }
    }

    #[test]
    fn absent_api_is_unsupported() {
        let err = classify_capture_error(CaptureSource::Display, "TypeError", "not a function");
        assert!(matches!(err, ClipcastError::Unsupported { .. }));
    }

    #[test]
    fn bad_container_is_recorder_init() {
        let err = classify_recorder_error("NotSupportedError", "video/avi");
        assert!(matches!(err, ClipcastError::RecorderInit { .. }));
        assert!(matches!(
            classify_recorder_error("UnknownError", ""),
            ClipcastError::Recorder { .. }
        ));
    }
}
