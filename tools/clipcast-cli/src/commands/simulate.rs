//! Run one scripted recording session and export the result.

use std::path::PathBuf;

use anyhow::Context;

use clipcast_capture_engine::{ArtifactInfo, ControllerEvent, RecorderController, RecorderState};
use clipcast_common::config::RecorderConfig;
use clipcast_platform_core::{CaptureStream, MediaTrack, TrackKind};
use clipcast_platform_synthetic::{Consent, Script, SyntheticPlatform};

/// What the simulated user and browser do.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub chunks: Vec<usize>,
    pub deny_screen: bool,
    pub deny_mic: bool,
    pub end_track_after: Option<usize>,
}

impl Scenario {
    fn script(&self) -> Script {
        Script {
            display: if self.deny_screen {
                Consent::Deny
            } else {
                Consent::Grant
            },
            microphone: if self.deny_mic {
                Consent::Deny
            } else {
                Consent::Grant
            },
            ..Script::default()
        }
    }
}

/// Outcome of a simulated session.
pub struct Recording {
    pub info: ArtifactInfo,
    pub bytes: Vec<u8>,
}

/// Chunk `index` is `size` copies of its index byte, so the export shows
/// arrival order.
fn chunk_payload(index: usize, size: usize) -> Vec<u8> {
    vec![(index % 256) as u8; size]
}

/// Drive a controller through `scenario` and return the exported artifact.
pub async fn record(config: RecorderConfig, scenario: &Scenario) -> anyhow::Result<Recording> {
    let platform = SyntheticPlatform::with_script(scenario.script());
    let controller = RecorderController::new(platform.clone(), config)?;

    controller.subscribe(|event| match event {
        ControllerEvent::StateChanged { from, to } => {
            tracing::info!(%from, %to, "State changed");
        }
        ControllerEvent::ChunkReceived {
            bytes, total_bytes, ..
        } => {
            tracing::debug!(bytes, total_bytes, "Chunk buffered");
        }
        ControllerEvent::ArtifactReady(info) => {
            tracing::info!(url = %info.url, bytes = info.byte_len, "Artifact ready");
        }
        ControllerEvent::Failed(error) => {
            tracing::warn!(%error, "Recorder failed");
        }
    });

    if let Err(e) = controller.start_recording().await {
        if !e.is_start_failure() {
            return Err(e.into());
        }
        let message = controller
            .view()
            .error
            .map(|v| v.message)
            .unwrap_or_else(|| e.user_message());
        return Err(anyhow::Error::new(e).context(message));
    }

    let driver = platform
        .last_recorder()
        .context("platform did not create a recorder")?;

    for (index, size) in scenario.chunks.iter().copied().enumerate() {
        driver.emit(chunk_payload(index, size));

        if scenario.end_track_after == Some(index + 1) {
            let screen = controller
                .active_stream()
                .and_then(|s| s.tracks().into_iter().find(|t| t.kind() == TrackKind::Video))
                .context("no screen track to end")?;
            tracing::info!(track = %screen.id(), "Simulating \"Stop sharing\"");
            screen.end_externally();
            break;
        }
    }

    if controller.state() == RecorderState::Recording {
        controller.stop_recording()?;
    }

    let info = controller
        .artifact_info()
        .context("recording finished without an artifact")?;
    let bytes = controller
        .artifact_blob()
        .map(|b| b.bytes().to_vec())
        .context("artifact blob missing")?;

    Ok(Recording { info, bytes })
}

pub async fn run(
    config: RecorderConfig,
    scenario: Scenario,
    output: PathBuf,
    json: bool,
) -> anyhow::Result<()> {
    println!("Simulating recording");
    println!("  Chunks: {:?}", scenario.chunks);
    println!("  MIME type: {}", config.mime_type);
    println!();

    let recording = record(config, &scenario).await?;

    std::fs::write(&output, &recording.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recording.info)?);
    } else {
        let info = &recording.info;
        println!("Recording saved to: {}", output.display());
        println!("  Bytes: {}", info.byte_len);
        println!("  Chunks: {}", info.chunk_count);
        println!("  Content type: {}", info.content_type);
        println!("  Suggested filename: {}", info.filename);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(chunks: &[usize]) -> Scenario {
        Scenario {
            chunks: chunks.to_vec(),
            ..Scenario::default()
        }
    }

    #[tokio::test]
    async fn exports_chunks_in_order_without_empties() {
        let recording = record(RecorderConfig::default(), &scenario(&[3, 0, 2]))
            .await
            .unwrap();
        assert_eq!(recording.bytes, vec![0, 0, 0, 2, 2]);
        assert_eq!(recording.info.chunk_count, 2);
        assert_eq!(recording.info.filename, "recording.webm");
    }

    #[tokio::test]
    async fn denied_screen_reports_user_message() {
        let mut denied = scenario(&[1]);
        denied.deny_screen = true;
        let err = record(RecorderConfig::default(), &denied)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("screen capture was denied"));
    }

    #[tokio::test]
    async fn ended_track_stops_early() {
        let mut ended = scenario(&[1, 1, 1, 1]);
        ended.end_track_after = Some(2);
        let recording = record(RecorderConfig::default(), &ended).await.unwrap();
        assert_eq!(recording.bytes, vec![0, 1]);
    }
}
