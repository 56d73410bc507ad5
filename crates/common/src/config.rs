//! Recorder configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ClipcastError, ClipcastResult};

/// Container type used when none is configured.
pub const DEFAULT_MIME_TYPE: &str = "video/webm";

/// File name offered by the download link.
pub const DEFAULT_DOWNLOAD_FILENAME: &str = "recording.webm";

/// Global recorder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Container/codec string handed to the recording facility.
    pub mime_type: String,

    /// Name of the exported file.
    pub download_filename: String,

    /// Display capture request.
    pub display: DisplayConstraints,

    /// Microphone capture request.
    pub microphone: MicrophoneConstraints,

    /// Ask the recorder to deliver a chunk every N milliseconds.
    /// `None` delivers a single chunk when recording stops.
    pub timeslice_ms: Option<u32>,

    /// Finalize the recording when a captured track ends on its own.
    pub stop_on_track_end: bool,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// What to ask for when requesting display capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConstraints {
    /// Request a video track.
    pub video: bool,

    /// Request tab/system audio alongside the video.
    pub audio: bool,

    /// Ideal frame rate hint.
    pub frame_rate: Option<u32>,
}

/// What to ask for when requesting the microphone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrophoneConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipcast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            download_filename: DEFAULT_DOWNLOAD_FILENAME.to_string(),
            display: DisplayConstraints::default(),
            microphone: MicrophoneConstraints::default(),
            timeslice_ms: None,
            stop_on_track_end: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DisplayConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: false,
            frame_rate: None,
        }
    }
}

impl Default for MicrophoneConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RecorderConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> ClipcastResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> ClipcastResult<Self> {
        if !path.exists() {
            return Err(ClipcastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> ClipcastResult<PathBuf> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }

    /// Reject values the recording facility could never honor.
    pub fn validate(&self) -> ClipcastResult<()> {
        let mime = self.mime_type.trim();
        if !(mime.starts_with("video/") || mime.starts_with("audio/")) {
            return Err(ClipcastError::config(format!(
                "mime_type must be a video/ or audio/ type, got {:?}",
                self.mime_type
            )));
        }
        if self.download_filename.trim().is_empty() {
            return Err(ClipcastError::config("download_filename must not be empty"));
        }
        if self.timeslice_ms == Some(0) {
            return Err(ClipcastError::config("timeslice_ms must be greater than zero"));
        }
        if !self.display.video {
            return Err(ClipcastError::config("display capture must request video"));
        }
        Ok(())
    }

    /// Container type without codec parameters (`video/webm;codecs=vp9` -> `video/webm`).
    pub fn content_type(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .map(str::trim)
            .unwrap_or(DEFAULT_MIME_TYPE)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipcast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_export_webm() {
        let config = RecorderConfig::default();
        assert_eq!(config.mime_type, "video/webm");
        assert_eq!(config.download_filename, "recording.webm");
        assert!(config.display.video);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = RecorderConfig::from_json_str(r#"{"timeslice_ms": 1000}"#).unwrap();
        assert_eq!(config.timeslice_ms, Some(1000));
        assert_eq!(config.download_filename, "recording.webm");
        assert!(config.stop_on_track_end);
    }

    #[test]
    fn validate_rejects_non_media_mime() {
        let config = RecorderConfig {
            mime_type: "text/plain".to_string(),
            ..RecorderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClipcastError::Config { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_timeslice() {
        let err = RecorderConfig::from_json_str(r#"{"timeslice_ms": 0}"#).unwrap_err();
        assert!(err.to_string().contains("timeslice_ms"));
    }

    #[test]
    fn content_type_strips_codec_parameters() {
        let config = RecorderConfig {
            mime_type: "video/webm;codecs=vp9,opus".to_string(),
            ..RecorderConfig::default()
        };
        assert_eq!(config.content_type(), "video/webm");
    }

    #[test]
    fn load_from_missing_path_reports_file_not_found() {
        let err = RecorderConfig::load_from(Path::new("/nonexistent/clipcast.json")).unwrap_err();
        assert!(matches!(err, ClipcastError::FileNotFound { .. }));
    }
}
