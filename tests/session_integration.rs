//! Integration tests for the complete session lifecycle
//!
//! These drive `run_session` end to end over scripted capture manifests
//! and stub output devices: region selection, the frame loop, edge-triggered
//! stimulus playback, persistence, and cooperative shutdown. No audio
//! hardware or video decoder is required.

use std::path::PathBuf;

use looming_tracker::config::SessionConfig;
use looming_tracker::session::{run_session, CalibratedLevels, SessionContext};
use looming_tracker::testing::StubFactory;
use looming_tracker::video::scripted::SessionManifest;
use looming_tracker::video::sink::AnnotationWriter;
use looming_tracker::video::VideoSource;

/// Short buffers so a full session runs in milliseconds. Background and
/// stimulus lengths are distinct, letting assertions attribute each write.
fn test_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.synth.background_secs = 0.2; // 8820 samples
    config.synth.ramp_secs = 0.02;
    config.synth.loop_window_secs = 0.05;
    config.synth.stimulus_periods = 3;
    config.synth.rise_secs = 0.01; // 441 samples
    config.synth.plateau_secs = 0.01; // 441 samples
    config.synth.tone_secs = 0.05;
    config.shutdown.join_timeout_secs = 5;
    config
}

fn background_len(config: &SessionConfig) -> usize {
    (config.audio.sample_rate as f32 * config.synth.background_secs) as usize
}

fn context(config: SessionConfig) -> SessionContext {
    SessionContext::new(
        config,
        CalibratedLevels {
            background_min: 0.2,
            stimulus_peak: 0.7,
        },
    )
}

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("looming_session_integration");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

/// Manifest with the trigger region at [300, 200, 100, 100] and the given
/// per-frame tracker results. The first two frames feed region selection.
fn manifest_with_tracks(tracks: &[Option<[f64; 4]>], quit_frame: Option<usize>) -> SessionManifest {
    let filler = Some([10.0, 10.0, 20.0, 20.0]);
    let mut frames: Vec<serde_json::Value> = Vec::new();
    for (i, track) in [filler, filler].iter().chain(tracks.iter()).enumerate() {
        frames.push(serde_json::json!({
            "track": track,
            "quit": quit_frame.map(|q| q + 2 == i).unwrap_or(false),
        }));
    }
    let json = serde_json::json!({
        "version": 1,
        "frame_rate": 30.0,
        "frame_size": [640, 480],
        "object_box": [10.0, 10.0, 20.0, 20.0],
        "trigger_region": [300.0, 200.0, 100.0, 100.0],
        "frames": frames,
    })
    .to_string();
    SessionManifest::from_json(&json).unwrap()
}

const OUTSIDE: Option<[f64; 4]> = Some([10.0, 10.0, 20.0, 20.0]); // centroid (20, 20)
const INSIDE: Option<[f64; 4]> = Some([330.0, 240.0, 20.0, 20.0]); // centroid (340, 250)

#[test]
fn test_single_crossing_plays_one_stimulus_and_logs_one_transition() {
    let config = test_config();
    let stimulus_len = config.stimulus_samples();
    let bg_len = background_len(&config);

    // Centroid moves outside -> inside once, then stays inside
    let manifest = manifest_with_tracks(&[OUTSIDE, OUTSIDE, INSIDE, INSIDE, INSIDE], None);
    let quit_after = manifest.quit_after();
    let (source, tracker, mut selector) = manifest.into_collaborators();

    let render_path = temp_path("crossing_render.jsonl");
    let csv_path = temp_path("crossing_centroid.csv");
    let sink = AnnotationWriter::create(&render_path, source.frame_rate(), source.frame_size())
        .unwrap()
        .with_quit_after(quit_after);

    let factory = StubFactory::new().with_write_delay(std::time::Duration::from_millis(2));
    let probe = factory.probe();

    let summary = run_session(
        source,
        tracker,
        sink,
        &mut selector,
        factory,
        &context(config),
        &csv_path,
    )
    .unwrap();

    assert_eq!(summary.frames, 5);
    assert_eq!(summary.tracked, 5);
    assert_eq!(summary.edges, 1, "exactly one rising edge");

    // Exactly one stimulus playback; every other write is the background loop
    let writes = probe.writes();
    let stimulus_writes = writes.iter().filter(|&&len| len == stimulus_len).count();
    assert_eq!(stimulus_writes, 1, "exactly one stimulus playback");
    assert!(writes
        .iter()
        .all(|&len| len == stimulus_len || len == bg_len));

    // Persisted record shows exactly one outside -> inside transition
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let states: Vec<&str> = csv
        .lines()
        .map(|line| line.rsplit(',').next().unwrap())
        .collect();
    assert_eq!(states.len(), 5);
    let transitions = states
        .windows(2)
        .filter(|pair| pair[0] == "outside" && pair[1] == "inside")
        .count();
    assert_eq!(transitions, 1);

    // Both workers observed the stop flag and released their devices
    assert_eq!(probe.releases(), 2);
}

#[test]
fn test_operator_quit_with_no_crossing_stays_silent() {
    let config = test_config();
    let stimulus_len = config.stimulus_samples();

    // Never inside; scripted operator abort after the third running frame
    let manifest = manifest_with_tracks(&[OUTSIDE, OUTSIDE, OUTSIDE, OUTSIDE], Some(2));
    let quit_after = manifest.quit_after();
    let (source, tracker, mut selector) = manifest.into_collaborators();

    let render_path = temp_path("quit_render.jsonl");
    let csv_path = temp_path("quit_centroid.csv");
    let sink = AnnotationWriter::create(&render_path, source.frame_rate(), source.frame_size())
        .unwrap()
        .with_quit_after(quit_after);

    let factory = StubFactory::new().with_write_delay(std::time::Duration::from_millis(2));
    let probe = factory.probe();

    let summary = run_session(
        source,
        tracker,
        sink,
        &mut selector,
        factory,
        &context(config),
        &csv_path,
    )
    .unwrap();

    // Quit cut the run short of source exhaustion
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.edges, 0);

    // The stimulus worker was parked the whole session and still shut down
    // cooperatively: no stimulus write, both devices released
    assert!(probe.writes().iter().all(|&len| len != stimulus_len));
    assert_eq!(probe.releases(), 2);
}

#[test]
fn test_tracking_loss_is_recoverable_and_edges_still_fire() {
    let config = test_config();

    // Loss between the outside and inside observations; the edge detector
    // must bridge the gap (previous state untouched by lost frames)
    let manifest = manifest_with_tracks(&[OUTSIDE, None, None, INSIDE], None);
    let quit_after = manifest.quit_after();
    let (source, tracker, mut selector) = manifest.into_collaborators();

    let render_path = temp_path("loss_render.jsonl");
    let csv_path = temp_path("loss_centroid.csv");
    let sink = AnnotationWriter::create(&render_path, source.frame_rate(), source.frame_size())
        .unwrap()
        .with_quit_after(quit_after);

    let factory = StubFactory::new().with_write_delay(std::time::Duration::from_millis(2));
    let probe = factory.probe();

    let summary = run_session(
        source,
        tracker,
        sink,
        &mut selector,
        factory,
        &context(config),
        &csv_path,
    )
    .unwrap();

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.tracked, 2);
    assert_eq!(summary.lost, 2);
    assert_eq!(summary.edges, 1);

    // Lost frames produce no centroid records
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 2);

    assert_eq!(probe.releases(), 2);
}

#[test]
fn test_render_log_mirrors_every_frame() {
    let config = test_config();

    let manifest = manifest_with_tracks(&[OUTSIDE, None, INSIDE], None);
    let quit_after = manifest.quit_after();
    let (source, tracker, mut selector) = manifest.into_collaborators();

    let render_path = temp_path("mirror_render.jsonl");
    let csv_path = temp_path("mirror_centroid.csv");
    let sink = AnnotationWriter::create(&render_path, source.frame_rate(), source.frame_size())
        .unwrap()
        .with_quit_after(quit_after);

    let factory = StubFactory::new();
    run_session(
        source,
        tracker,
        sink,
        &mut selector,
        factory,
        &context(config),
        &csv_path,
    )
    .unwrap();

    let contents = std::fs::read_to_string(&render_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    // Header plus one record per running frame, lost frames included
    assert_eq!(lines.len(), 1 + 3);
    assert!(lines[0].contains("\"frame_rate\":30.0"));
    assert!(lines[1].contains("\"state\":\"outside\""));
    assert!(!lines[2].contains("state"), "lost frame has no overlay state");
    assert!(lines[3].contains("\"state\":\"inside\""));
}
