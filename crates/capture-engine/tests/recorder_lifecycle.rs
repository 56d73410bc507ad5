use std::cell::RefCell;
use std::rc::Rc;

use clipcast_capture_engine::{ControllerEvent, RecorderController, RecorderState, StopOutcome};
use clipcast_common::config::RecorderConfig;
use clipcast_common::error::{CaptureSource, ClipcastError};
use clipcast_platform_core::{CaptureStream, MediaTrack, RecorderActivity, TrackState};
use clipcast_platform_synthetic::{Consent, Request, Script, SyntheticPlatform};

fn controller_with(script: Script) -> (SyntheticPlatform, RecorderController<SyntheticPlatform>) {
    let platform = SyntheticPlatform::with_script(script);
    let controller = RecorderController::new(platform.clone(), RecorderConfig::default())
        .expect("default config should be valid");
    (platform, controller)
}

fn controller() -> (SyntheticPlatform, RecorderController<SyntheticPlatform>) {
    controller_with(Script::default())
}

#[tokio::test]
async fn start_while_recording_is_rejected_without_new_session() {
    let (platform, controller) = controller();
    let session_id = controller.start_recording().await.unwrap();

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(err, ClipcastError::InvalidState { .. }));
    assert_eq!(controller.state(), RecorderState::Recording);
    assert_eq!(controller.session_id(), Some(session_id));
    assert_eq!(platform.display_requests(), 1);
    assert_eq!(platform.recorders().len(), 1);
}

#[tokio::test]
async fn stop_when_idle_is_a_noop() {
    let (platform, controller) = controller();

    let outcome = controller.stop_recording().unwrap();
    assert_eq!(
        outcome,
        StopOutcome::NotRecording {
            state: RecorderState::Idle
        }
    );
    assert_eq!(controller.state(), RecorderState::Idle);
    assert!(controller.artifact_info().is_none());
    assert!(platform.requests().is_empty());
}

#[tokio::test]
async fn artifact_is_ordered_concatenation_of_non_empty_chunks() {
    let (platform, controller) = controller();
    controller.start_recording().await.unwrap();

    let driver = platform.last_recorder().unwrap();
    assert!(driver.emit(vec![1u8, 2, 3, 4, 5]));
    assert!(driver.emit(Vec::new()));
    assert!(driver.emit(vec![6u8, 7, 8]));

    controller.stop_recording().unwrap();

    let info = controller.artifact_info().unwrap();
    assert_eq!(info.byte_len, 8);
    assert_eq!(info.chunk_count, 2);

    let blob = controller.artifact_blob().unwrap();
    assert_eq!(blob.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[tokio::test]
async fn stop_releases_every_track_and_hides_live_preview() {
    let (platform, controller) = controller();
    controller.start_recording().await.unwrap();
    assert!(controller.view().live_preview.is_some());

    controller.stop_recording().unwrap();

    let tracks = platform.tracks();
    assert_eq!(tracks.len(), 2);
    assert!(tracks
        .iter()
        .all(|t| t.ready_state() == TrackState::Ended));
    assert!(controller.view().live_preview.is_none());
    assert!(controller.active_stream().is_none());
}

#[tokio::test]
async fn denied_screen_never_asks_for_microphone() {
    let (platform, controller) = controller_with(Script {
        display: Consent::Deny,
        ..Script::default()
    });

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(
        err,
        ClipcastError::PermissionDenied {
            source_kind: CaptureSource::Display,
            ..
        }
    ));
    assert_eq!(platform.requests(), vec![Request::Display]);
    assert_eq!(platform.microphone_requests(), 0);
    assert_eq!(controller.state(), RecorderState::Failed);
}

#[tokio::test]
async fn end_to_end_produces_downloadable_webm() {
    let (platform, controller) = controller();
    let finalized = Rc::new(RefCell::new(0));
    let seen = finalized.clone();
    controller.subscribe(move |event| {
        if let ControllerEvent::ArtifactReady(_) = event {
            *seen.borrow_mut() += 1;
        }
    });

    controller.start_recording().await.unwrap();
    let driver = platform.last_recorder().unwrap();
    driver.emit(b"b1".to_vec());
    driver.emit(b"b2".to_vec());
    controller.stop_recording().unwrap();

    assert_eq!(*finalized.borrow(), 1);
    assert_eq!(driver.stop_events(), 1);
    assert_eq!(controller.state(), RecorderState::Idle);

    let playback = controller.view().playback.unwrap();
    assert!(!playback.src.is_empty());
    assert_eq!(playback.download.filename, "recording.webm");
    assert_eq!(playback.download.content_type, "video/webm");
    assert_eq!(playback.download.href, playback.src);
    assert_eq!(
        controller.artifact_blob().unwrap().bytes(),
        b"b1b2".as_slice()
    );
}

#[tokio::test]
async fn microphone_denial_releases_screen_and_allows_retry() {
    let (platform, controller) = controller_with(Script {
        microphone: Consent::Deny,
        ..Script::default()
    });

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(
        err,
        ClipcastError::PermissionDenied {
            source_kind: CaptureSource::Microphone,
            ..
        }
    ));
    assert_eq!(controller.state(), RecorderState::Failed);
    let screen = platform.tracks();
    assert_eq!(screen.len(), 1);
    assert_eq!(screen[0].ready_state(), TrackState::Ended);
    assert!(controller.view().live_preview.is_none());

    let view = controller.view();
    let error = view.error.unwrap();
    assert_eq!(error.message, "Permission to use the microphone was denied.");
    assert_eq!(error.retry_label, "Try again");

    platform.configure(|s| s.microphone = Consent::Grant);
    controller.start_recording().await.unwrap();
    assert_eq!(controller.state(), RecorderState::Recording);
    assert!(controller.last_error().is_none());
}

#[tokio::test]
async fn dismiss_error_returns_to_idle() {
    let (_platform, controller) = controller_with(Script {
        display: Consent::NoDevice,
        ..Script::default()
    });

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(err, ClipcastError::DeviceUnavailable { .. }));
    assert!(controller.dismiss_error());
    assert_eq!(controller.state(), RecorderState::Idle);
    assert!(controller.view().error.is_none());
    assert!(!controller.dismiss_error());
}

#[tokio::test]
async fn second_recording_releases_first_handle_when_published() {
    let (platform, controller) = controller();

    controller.start_recording().await.unwrap();
    platform.last_recorder().unwrap().emit(b"first".to_vec());
    controller.stop_recording().unwrap();
    let first = controller.artifact_info().unwrap();

    controller.start_recording().await.unwrap();
    // The previous recording stays playable while the next one runs.
    assert_eq!(controller.view().playback.unwrap().src, first.url);
    assert!(platform.live_urls().contains(&first.url));

    platform.last_recorder().unwrap().emit(b"second".to_vec());
    controller.stop_recording().unwrap();
    let second = controller.artifact_info().unwrap();

    assert_ne!(first.url, second.url);
    assert_eq!(platform.revoked_urls(), vec![first.url]);
    assert_eq!(platform.live_urls(), vec![second.url]);
    assert_eq!(controller.artifact_blob().unwrap().bytes(), b"second");
}

#[tokio::test]
async fn teardown_stops_tracks_and_revokes_artifact() {
    let (platform, controller) = controller();

    controller.start_recording().await.unwrap();
    platform.last_recorder().unwrap().emit(b"one".to_vec());
    controller.stop_recording().unwrap();
    controller.start_recording().await.unwrap();

    let driver = platform.last_recorder().unwrap();
    drop(controller);

    assert!(platform.live_urls().is_empty());
    assert_eq!(platform.revoked_urls().len(), 1);
    assert!(platform
        .tracks()
        .iter()
        .all(|t| t.ready_state() == TrackState::Ended));
    assert!(!driver.is_subscribed());
    assert_eq!(driver.activity(), RecorderActivity::Inactive);
}

#[tokio::test]
async fn track_ending_mid_recording_finalizes_the_artifact() {
    let (platform, controller) = controller();
    controller.start_recording().await.unwrap();

    let driver = platform.last_recorder().unwrap();
    driver.emit(b"partial".to_vec());

    let screen = platform
        .tracks()
        .into_iter()
        .find(|t| t.label() == "Entire screen")
        .unwrap();
    screen.end_externally();

    assert_eq!(controller.state(), RecorderState::Idle);
    assert_eq!(controller.artifact_blob().unwrap().bytes(), b"partial");
    assert!(platform
        .tracks()
        .iter()
        .all(|t| t.ready_state() == TrackState::Ended));
    assert_eq!(screen.listener_count(), 0);
}

#[tokio::test]
async fn track_end_is_ignored_when_disabled() {
    let platform = SyntheticPlatform::new();
    let config = RecorderConfig {
        stop_on_track_end: false,
        ..RecorderConfig::default()
    };
    let controller = RecorderController::new(platform.clone(), config).unwrap();
    controller.start_recording().await.unwrap();

    platform.tracks()[0].end_externally();
    assert_eq!(controller.state(), RecorderState::Recording);
}

#[tokio::test]
async fn unsupported_container_fails_recorder_init_and_releases_tracks() {
    let (platform, controller) = controller_with(Script {
        supported_mime_types: vec!["video/mp4".to_string()],
        ..Script::default()
    });

    let err = controller.start_recording().await.unwrap_err();
    assert!(matches!(err, ClipcastError::RecorderInit { .. }));
    assert_eq!(controller.state(), RecorderState::Failed);
    assert_eq!(platform.tracks().len(), 2);
    assert!(platform
        .tracks()
        .iter()
        .all(|t| t.ready_state() == TrackState::Ended));
}

#[tokio::test]
async fn recorder_start_failure_unsubscribes_listener() {
    let (platform, controller) = controller_with(Script {
        fail_recorder_start: true,
        ..Script::default()
    });

    controller.start_recording().await.unwrap_err();
    let driver = platform.last_recorder().unwrap();
    assert!(!driver.is_subscribed());
    assert_eq!(controller.state(), RecorderState::Failed);
}

#[tokio::test]
async fn recorder_error_mid_recording_keeps_buffered_chunks() {
    let (platform, controller) = controller();
    controller.start_recording().await.unwrap();

    let driver = platform.last_recorder().unwrap();
    driver.emit(b"kept".to_vec());
    driver.fail("encoder crashed");

    assert_eq!(controller.state(), RecorderState::Idle);
    assert_eq!(controller.artifact_blob().unwrap().bytes(), b"kept");
}

#[tokio::test]
async fn chunk_flushed_during_stop_is_included() {
    let (platform, controller) = controller_with(Script {
        flush_on_stop: Some(b"tail".to_vec()),
        ..Script::default()
    });
    controller.start_recording().await.unwrap();
    platform.last_recorder().unwrap().emit(b"head-".to_vec());
    controller.stop_recording().unwrap();

    assert_eq!(controller.artifact_blob().unwrap().bytes(), b"head-tail");
}

#[tokio::test]
async fn state_changes_are_reported_in_order() {
    let (platform, controller) = controller();
    let transitions = Rc::new(RefCell::new(Vec::new()));
    let sink = transitions.clone();
    controller.subscribe(move |event| {
        if let ControllerEvent::StateChanged { to, .. } = event {
            sink.borrow_mut().push(*to);
        }
    });

    controller.start_recording().await.unwrap();
    platform.last_recorder().unwrap().emit(b"x".to_vec());
    controller.stop_recording().unwrap();

    assert_eq!(
        *transitions.borrow(),
        vec![
            RecorderState::Requesting,
            RecorderState::Recording,
            RecorderState::Finalizing,
            RecorderState::Idle,
        ]
    );
}

#[tokio::test]
async fn press_primary_toggles_recording() {
    let (platform, controller) = controller();
    controller.press_primary().await.unwrap();
    assert_eq!(controller.state(), RecorderState::Recording);
    assert_eq!(controller.view().button.label, "Stop Recording");

    platform.last_recorder().unwrap().emit(b"z".to_vec());
    controller.press_primary().await.unwrap();
    assert_eq!(controller.state(), RecorderState::Idle);
    assert_eq!(controller.view().button.label, "Start Recording");
}

#[tokio::test]
async fn timeslice_is_forwarded_to_recorder() {
    let platform = SyntheticPlatform::new();
    let config = RecorderConfig {
        timeslice_ms: Some(250),
        ..RecorderConfig::default()
    };
    let controller = RecorderController::new(platform.clone(), config).unwrap();
    controller.start_recording().await.unwrap();

    let driver = platform.last_recorder().unwrap();
    assert_eq!(driver.timeslice_ms(), Some(250));
    assert_eq!(driver.mime_type(), "video/webm");
}

#[test]
fn invalid_config_is_rejected() {
    let config = RecorderConfig {
        download_filename: String::new(),
        ..RecorderConfig::default()
    };
    assert!(RecorderController::new(SyntheticPlatform::new(), config).is_err());
}

fn live_tracks(platform: &SyntheticPlatform) -> usize {
    platform
        .tracks()
        .iter()
        .filter(|t| t.ready_state() == TrackState::Live)
        .count()
}

#[tokio::test]
async fn teardown_while_waiting_for_consent_discards_the_late_session() {
    let (platform, controller) = controller();
    let gate = platform.hold_next_display();

    let (first, second) = tokio::join!(controller.start_recording(), async {
        while platform.display_requests() == 0 {
            tokio::task::yield_now().await;
        }
        controller.teardown();
        let second = controller.start_recording().await;
        gate.release();
        second
    });

    let session_id = second.unwrap();
    assert!(matches!(first.unwrap_err(), ClipcastError::InvalidState { .. }));
    assert_eq!(controller.state(), RecorderState::Recording);
    assert_eq!(controller.session_id(), Some(session_id));

    let active = controller.active_stream().unwrap().tracks().len();
    assert_eq!(live_tracks(&platform), active);
    let running = platform
        .recorders()
        .iter()
        .filter(|r| r.activity() == RecorderActivity::Recording)
        .count();
    assert_eq!(running, 1);

    drop(controller);
    assert_eq!(live_tracks(&platform), 0);
}

#[tokio::test]
async fn deferred_stop_finalizes_when_the_recorder_reports_it() {
    let (platform, controller) = controller_with(Script {
        defer_stop: true,
        ..Script::default()
    });
    controller.start_recording().await.unwrap();
    let driver = platform.last_recorder().unwrap();
    driver.emit(b"early-".to_vec());

    controller.stop_recording().unwrap();
    assert_eq!(controller.state(), RecorderState::Finalizing);
    let view = controller.view();
    assert!(view.live_preview.is_none());
    assert!(!view.button.enabled);
    assert!(view.playback.is_none());
    assert_eq!(live_tracks(&platform), 0);
    assert!(driver.is_subscribed());
    assert_eq!(
        controller.stop_recording().unwrap(),
        StopOutcome::NotRecording {
            state: RecorderState::Finalizing
        }
    );

    assert!(driver.emit(b"late".to_vec()));
    driver.finish();

    assert_eq!(controller.state(), RecorderState::Idle);
    assert_eq!(controller.artifact_blob().unwrap().bytes(), b"early-late");
    assert!(!driver.is_subscribed());
    assert_eq!(driver.stop_events(), 1);
}

#[tokio::test]
async fn recorder_abort_keeps_the_chunk_delivered_after_the_error() {
    let (platform, controller) = controller_with(Script {
        defer_stop: true,
        ..Script::default()
    });
    controller.start_recording().await.unwrap();
    let driver = platform.last_recorder().unwrap();
    driver.emit(b"before-".to_vec());

    driver.abort("encoder crashed");
    assert_eq!(controller.state(), RecorderState::Finalizing);
    assert!(driver.is_stopping());

    assert!(driver.emit(b"after".to_vec()));
    driver.finish();

    assert_eq!(controller.state(), RecorderState::Idle);
    assert_eq!(controller.artifact_blob().unwrap().bytes(), b"before-after");
}
