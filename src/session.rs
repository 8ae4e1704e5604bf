//! Session orchestration
//!
//! One context object is constructed at startup and handed into each
//! execution unit; there are no ambient globals.
//! Lifecycle: synthesize the fixed buffers from the confirmed calibration,
//! open the centroid record, arm the tracking session (both region
//! selections), spawn the two audio workers, drive the frame loop, then
//! shut down cooperatively.

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::audio::{spawn_background_worker, spawn_stimulus_worker, OutputFactory};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::record::CentroidLog;
use crate::signal::SessionSignals;
use crate::synth;
use crate::tracking::{SessionSummary, TrackingSession};
use crate::video::{FrameSink, ObjectTracker, RegionSelector, VideoSource};

/// Operator-confirmed amplitude levels; write-once for the session.
#[derive(Debug, Clone, Copy)]
pub struct CalibratedLevels {
    pub background_min: f32,
    pub stimulus_peak: f32,
}

/// Everything fixed at session start.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub config: SessionConfig,
    pub levels: CalibratedLevels,
}

impl SessionContext {
    pub fn new(config: SessionConfig, levels: CalibratedLevels) -> Self {
        Self { config, levels }
    }
}

/// Run a complete session over the given collaborators.
///
/// Workers start only after both regions are confirmed; fatal open
/// failures happen before that, so no cross-thread teardown is ever needed
/// for them. Returns the frame counters once both workers have been
/// joined.
pub fn run_session<S, T, K, R, F>(
    source: S,
    tracker: T,
    sink: K,
    selector: &mut R,
    factory: F,
    context: &SessionContext,
    record_path: &Path,
) -> Result<SessionSummary, SessionError>
where
    S: VideoSource,
    T: ObjectTracker,
    K: FrameSink,
    R: RegionSelector,
    F: OutputFactory + Clone,
{
    let fs = context.config.audio.sample_rate;
    let synth_config = &context.config.synth;

    let background = Arc::new(synth::background_noise(
        context.levels.background_min,
        fs,
        synth_config,
    ));
    let stimulus = Arc::new(synth::stimulus_wave(
        context.levels.background_min,
        context.levels.stimulus_peak,
        fs,
        synth_config,
    ));
    tracing::info!(
        "[Session] Buffers ready: background {} samples, stimulus {} samples",
        background.len(),
        stimulus.len()
    );

    let log = CentroidLog::create(record_path)?;
    let signals = SessionSignals::new();

    let mut session = TrackingSession::new(source, tracker, sink, log, signals.clone());
    session.arm(selector)?;

    let background_handle =
        spawn_background_worker(factory.clone(), background, Arc::clone(&signals.stop));
    let stimulus_handle = spawn_stimulus_worker(factory, stimulus, signals.clone());

    let reason = session.run()?;
    tracing::info!("[Session] Run ended ({:?}), joining audio workers", reason);

    let timeout = Duration::from_secs(context.config.shutdown.join_timeout_secs);
    join_bounded(background_handle, "BackgroundWorker", timeout);
    join_bounded(stimulus_handle, "StimulusWorker", timeout);

    session.finish()
}

/// Cooperative bounded join.
///
/// Workers exit by observing the signals; this wait only bounds how long
/// the main unit lingers. A worker that misses the deadline is detached
/// and logged as an abnormal shutdown path - it is never killed, so a
/// wedged device write cannot leave a half-released stream behind our
/// back.
fn join_bounded(handle: JoinHandle<()>, name: &str, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!(
                "[Session] {} did not exit within {:?}; detaching (abnormal shutdown)",
                name,
                timeout
            );
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    if handle.join().is_err() {
        tracing::error!("[Session] {} panicked during shutdown", name);
    }
}
