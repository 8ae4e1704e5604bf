//! Perception collaborator seams
//!
//! Frame acquisition, object tracking, interactive region selection, and
//! rendering are external collaborators: the tracking loop only ever sees
//! the traits in this module. The crate ships a deterministic scripted
//! backend (JSON session manifests) as its reference implementation; live
//! capture backends plug in behind the same seams.

pub mod scripted;
pub mod sink;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SessionError;
use crate::geometry::{Point, Rect};
use crate::tracking::ContainmentState;

/// A single decoded video frame.
///
/// Carries a monotonically increasing index and a timestamp derived from
/// the source frame rate. Frames are not retained past their loop
/// iteration; the pixel buffer is shared, never copied per consumer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub timestamp: Duration,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

/// Video source identifier accepted on the command line.
///
/// A value that parses as an integer names a capture device index;
/// anything else is a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceId {
    Device(i32),
    Path(PathBuf),
}

impl SourceId {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i32>() {
            Ok(index) => SourceId::Device(index),
            Err(_) => SourceId::Path(PathBuf::from(raw)),
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceId::Device(index) => write!(f, "device {}", index),
            SourceId::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Sequential pull interface over a video stream.
///
/// Exhaustion is reported by returning `None` once; a read failure is
/// indistinguishable from exhaustion by design, both end the session
/// gracefully.
pub trait VideoSource {
    fn next_frame(&mut self) -> Option<Frame>;
    fn frame_rate(&self) -> f64;
    fn frame_size(&self) -> (u32, u32);
}

/// Opaque single-object tracker.
pub trait ObjectTracker {
    /// Seed the tracker with the object's initial bounding box.
    fn init(&mut self, frame: &Frame, bbox: Rect);
    /// Advance by one frame. `None` reports a lost track for this frame;
    /// the tracker may re-acquire on a later update.
    fn update(&mut self, frame: &Frame) -> Option<Rect>;
}

/// What a region selection request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPurpose {
    ObjectBox,
    TriggerRegion,
}

impl std::fmt::Display for SelectionPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPurpose::ObjectBox => write!(f, "object box"),
            SelectionPurpose::TriggerRegion => write!(f, "trigger region"),
        }
    }
}

/// Interactive (or scripted) region-of-interest selection.
///
/// Invoked exactly twice before the session runs: once for the tracked
/// object's initial box, once for the trigger region. Returning `None`
/// defers to the next frame, mirroring a selection UI the operator has not
/// confirmed yet.
pub trait RegionSelector {
    fn select(&mut self, frame: &Frame, purpose: SelectionPurpose) -> Option<Rect>;
}

/// Per-frame overlay data computed by the tracking loop.
#[derive(Debug, Clone, Copy)]
pub struct FrameAnnotations {
    pub trigger_region: Rect,
    pub centroid: Option<Point>,
    pub state: Option<ContainmentState>,
}

/// Rendering/output collaborator.
///
/// Receives every frame together with its overlay data and mirrors the
/// input's frame rate and size. `poll_quit` is the operator abort check,
/// sampled once per frame by the tracking loop.
pub trait FrameSink {
    fn write(&mut self, frame: &Frame, annotations: &FrameAnnotations)
        -> Result<(), SessionError>;
    fn poll_quit(&mut self) -> bool;
    fn finish(&mut self) -> Result<(), SessionError>;
}
