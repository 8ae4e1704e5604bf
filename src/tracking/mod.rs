//! Tracking loop - per-frame driver for the looming task
//!
//! Architecture:
//! - ContainmentEdge: one-bit rising-edge detector carried across frames
//! - TrackingSession: the session state machine
//!   (AwaitingRegions -> Running -> Stopping -> Terminated)
//! - Per-frame step: acquire -> track -> containment -> edge -> trigger,
//!   with persistence and rendering on the side
//!
//! The loop never blocks on audio: it only ever raises signals.

use std::fmt;

use crate::error::SessionError;
use crate::geometry::Rect;
use crate::record::CentroidLog;
use crate::signal::SessionSignals;
use crate::video::{
    FrameAnnotations, FrameSink, ObjectTracker, RegionSelector, SelectionPurpose, VideoSource,
};

/// Whether the tracked centroid lies within the trigger region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentState {
    Inside,
    Outside,
}

impl fmt::Display for ContainmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainmentState::Inside => write!(f, "inside"),
            ContainmentState::Outside => write!(f, "outside"),
        }
    }
}

/// Rising-edge detector over the containment state.
///
/// Exactly one bit of state is carried across frames: the previous
/// containment value. It starts as `Outside`, so the first successfully
/// tracked frame emits an edge only if it is already inside the region.
/// Frames with a lost track must not be observed at all; the previous
/// state stays untouched until the tracker re-acquires.
#[derive(Debug)]
pub struct ContainmentEdge {
    previous: ContainmentState,
}

impl ContainmentEdge {
    pub fn new() -> Self {
        Self {
            previous: ContainmentState::Outside,
        }
    }

    /// Observe this frame's containment state. Returns true exactly on an
    /// outside->inside transition; sustained inside and inside->outside
    /// observations return false.
    pub fn observe(&mut self, current: ContainmentState) -> bool {
        let rising = self.previous == ContainmentState::Outside
            && current == ContainmentState::Inside;
        self.previous = current;
        rising
    }

    /// Reset to the initial state (previous = outside).
    pub fn reset(&mut self) {
        self.previous = ContainmentState::Outside;
    }
}

impl Default for ContainmentEdge {
    fn default() -> Self {
        Self::new()
    }
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Operator has not yet confirmed the object box and trigger region.
    AwaitingRegions,
    /// Per-frame processing active.
    Running,
    /// Stop requested; audio workers are being torn down.
    Stopping,
    /// Workers acknowledged the stop; session complete.
    Terminated,
}

/// Why the loop left `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SourceExhausted,
    OperatorQuit,
}

/// Counters reported at session end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    pub tracked: u64,
    pub lost: u64,
    pub edges: u64,
}

/// The per-frame driver connecting the perception collaborators to the
/// audio workers through the session signals.
pub struct TrackingSession<S, T, K>
where
    S: VideoSource,
    T: ObjectTracker,
    K: FrameSink,
{
    source: S,
    tracker: T,
    sink: K,
    log: CentroidLog,
    signals: SessionSignals,
    edge: ContainmentEdge,
    trigger_region: Option<Rect>,
    phase: SessionPhase,
    summary: SessionSummary,
}

impl<S, T, K> TrackingSession<S, T, K>
where
    S: VideoSource,
    T: ObjectTracker,
    K: FrameSink,
{
    pub fn new(source: S, tracker: T, sink: K, log: CentroidLog, signals: SessionSignals) -> Self {
        Self {
            source,
            tracker,
            sink,
            log,
            signals,
            edge: ContainmentEdge::new(),
            trigger_region: None,
            phase: SessionPhase::AwaitingRegions,
            summary: SessionSummary::default(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Run the two pre-session selections: the tracked object's initial
    /// box, then the trigger region. Consumes frames until the selector
    /// confirms each; an exhausted source before confirmation aborts the
    /// session before it starts.
    pub fn arm<R: RegionSelector>(&mut self, selector: &mut R) -> Result<(), SessionError> {
        debug_assert_eq!(self.phase, SessionPhase::AwaitingRegions);

        let object_box = self.select(selector, SelectionPurpose::ObjectBox)?;
        tracing::info!("[TrackingLoop] Object box confirmed: {:?}", object_box);

        let trigger_region = self.select(selector, SelectionPurpose::TriggerRegion)?;
        tracing::info!("[TrackingLoop] Trigger region confirmed: {:?}", trigger_region);

        self.trigger_region = Some(trigger_region);
        self.phase = SessionPhase::Running;
        Ok(())
    }

    fn select<R: RegionSelector>(
        &mut self,
        selector: &mut R,
        purpose: SelectionPurpose,
    ) -> Result<Rect, SessionError> {
        loop {
            let frame = self
                .source
                .next_frame()
                .ok_or_else(|| SessionError::SelectionAborted {
                    what: purpose.to_string(),
                })?;
            if let Some(rect) = selector.select(&frame, purpose) {
                if purpose == SelectionPurpose::ObjectBox {
                    self.tracker.init(&frame, rect);
                }
                return Ok(rect);
            }
        }
    }

    /// Drive the loop until the source is exhausted or the operator quits.
    /// Raises the sticky stop signal on exit and leaves the session in
    /// `Stopping`; the caller joins the workers and then marks termination.
    pub fn run(&mut self) -> Result<StopReason, SessionError> {
        debug_assert_eq!(self.phase, SessionPhase::Running);
        let trigger_region =
            self.trigger_region
                .ok_or_else(|| SessionError::SelectionAborted {
                    what: SelectionPurpose::TriggerRegion.to_string(),
                })?;

        let reason = loop {
            if let Some(reason) = self.step(trigger_region) {
                break reason;
            }
        };

        self.phase = SessionPhase::Stopping;
        self.signals.request_stop();
        tracing::info!(
            "[TrackingLoop] Leaving running state ({:?}): {} frames, {} tracked, {} lost, {} edges",
            reason,
            self.summary.frames,
            self.summary.tracked,
            self.summary.lost,
            self.summary.edges
        );
        Ok(reason)
    }

    /// Process one frame. Returns the stop reason once the loop should end.
    fn step(&mut self, trigger_region: Rect) -> Option<StopReason> {
        let Some(frame) = self.source.next_frame() else {
            // Exhaustion and read failure both end the session gracefully
            return Some(StopReason::SourceExhausted);
        };
        self.summary.frames += 1;

        let mut annotations = FrameAnnotations {
            trigger_region,
            centroid: None,
            state: None,
        };

        match self.tracker.update(&frame) {
            Some(bbox) => {
                self.summary.tracked += 1;
                let centroid = bbox.centroid();
                let state = if trigger_region.contains(centroid) {
                    ContainmentState::Inside
                } else {
                    ContainmentState::Outside
                };

                if self.edge.observe(state) {
                    self.summary.edges += 1;
                    self.signals.trigger.raise();
                    tracing::info!(
                        "[TrackingLoop] Rising edge at frame {}: stimulus triggered",
                        frame.index
                    );
                }

                if let Err(err) = self.log.append(centroid, state) {
                    // Persistence failures never stop the session
                    tracing::warn!("[TrackingLoop] Centroid record dropped: {}", err);
                }

                annotations.centroid = Some(centroid);
                annotations.state = Some(state);
            }
            None => {
                // Recoverable: skip containment and edge logic this frame
                self.summary.lost += 1;
                tracing::debug!("[TrackingLoop] Tracker lost object at frame {}", frame.index);
            }
        }

        if let Err(err) = self.sink.write(&frame, &annotations) {
            tracing::warn!("[TrackingLoop] Frame sink write failed: {}", err);
        }

        if self.sink.poll_quit() {
            tracing::info!("[TrackingLoop] Operator quit at frame {}", frame.index);
            return Some(StopReason::OperatorQuit);
        }
        None
    }

    /// Mark the session terminated and release the persistence and sink
    /// collaborators. Call after the audio workers have been joined.
    pub fn finish(mut self) -> Result<SessionSummary, SessionError> {
        self.phase = SessionPhase::Terminated;
        self.sink.finish()?;
        self.log.close()?;
        Ok(self.summary)
    }
}
