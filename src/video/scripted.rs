//! Scripted capture sessions
//!
//! A scripted session is a JSON manifest describing a capture end to end:
//! frame geometry, per-frame tracker results, preselected regions, and an
//! optional operator abort point. It backs the file-path source identifier
//! and gives tests and dry runs a deterministic perception stack without
//! any camera or decoder.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SessionError;
use crate::geometry::Rect;
use crate::video::{Frame, ObjectTracker, RegionSelector, SelectionPurpose, VideoSource};

/// `[x, y, width, height]` as stored in manifests.
pub type RectSpec = [f64; 4];

fn rect_from_spec(spec: RectSpec) -> Rect {
    Rect::new(spec[0], spec[1], spec[2], spec[3])
}

/// One manifest frame entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptedFrame {
    /// Tracker result for this frame; `None` scripts a lost track.
    #[serde(default)]
    pub track: Option<RectSpec>,
    /// Scripts an operator abort observed after this frame is processed.
    #[serde(default)]
    pub quit: bool,
}

/// Machine-readable capture session manifest.
///
/// The selection phase consumes frames the way an interactive session
/// does: with the scripted selector, the first two frames answer the two
/// region requests, so per-frame `track` entries only take effect from the
/// third frame onward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionManifest {
    pub version: u32,
    pub frame_rate: f64,
    pub frame_size: [u32; 2],
    /// Initial bounding box of the tracked object.
    pub object_box: RectSpec,
    /// The fixed trigger region.
    pub trigger_region: RectSpec,
    pub frames: Vec<ScriptedFrame>,
}

impl SessionManifest {
    /// Load a manifest from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let contents =
            std::fs::read_to_string(&path).map_err(|err| SessionError::SourceUnavailable {
                source: format!("{}: {}", path.as_ref().display(), err),
            })?;
        Self::from_json(&contents)
    }

    /// Parse manifest contents from JSON and validate invariants.
    pub fn from_json(data: &str) -> Result<Self, SessionError> {
        let manifest: SessionManifest =
            serde_json::from_str(data).map_err(|err| SessionError::ManifestInvalid {
                reason: format!("failed to parse session manifest JSON: {}", err),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.version == 0 {
            return Err(manifest_error("manifest version must be > 0"));
        }
        if self.frames.is_empty() {
            return Err(manifest_error("manifest must contain at least one frame"));
        }
        if self.frame_rate <= 0.0 {
            return Err(manifest_error(format!(
                "frame rate must be positive (got {})",
                self.frame_rate
            )));
        }
        if self.frame_size[0] == 0 || self.frame_size[1] == 0 {
            return Err(manifest_error(format!(
                "frame size must be non-zero (got {}x{})",
                self.frame_size[0], self.frame_size[1]
            )));
        }
        for spec in [self.object_box, self.trigger_region]
            .iter()
            .chain(self.frames.iter().filter_map(|f| f.track.as_ref()))
        {
            if spec[2] <= 0.0 || spec[3] <= 0.0 {
                return Err(manifest_error(format!(
                    "rectangle {:?} must have positive width and height",
                    spec
                )));
            }
        }
        Ok(())
    }

    /// Frame index of the scripted abort, if any.
    pub fn quit_after(&self) -> Option<u64> {
        self.frames
            .iter()
            .position(|frame| frame.quit)
            .map(|index| index as u64)
    }

    /// Split the manifest into its perception collaborators.
    pub fn into_collaborators(self) -> (ScriptedSource, ScriptedTracker, ScriptedSelector) {
        let source = ScriptedSource::new(
            self.frame_rate,
            self.frame_size[0],
            self.frame_size[1],
            self.frames.len() as u64,
        );
        let tracker = ScriptedTracker::new(
            self.frames
                .iter()
                .map(|frame| frame.track.map(rect_from_spec))
                .collect(),
        );
        let selector = ScriptedSelector::new(
            rect_from_spec(self.object_box),
            rect_from_spec(self.trigger_region),
        );
        (source, tracker, selector)
    }
}

fn manifest_error(reason: impl Into<String>) -> SessionError {
    SessionError::ManifestInvalid {
        reason: reason.into(),
    }
}

/// Deterministic frame source replaying a manifest's frame geometry.
#[derive(Debug)]
pub struct ScriptedSource {
    frame_rate: f64,
    width: u32,
    height: u32,
    total: u64,
    next_index: u64,
    pixels: Arc<[u8]>,
}

impl ScriptedSource {
    pub fn new(frame_rate: f64, width: u32, height: u32, total: u64) -> Self {
        // One shared blank pixel buffer; scripted trackers never look at it
        let pixels: Arc<[u8]> = vec![0u8; (width * height) as usize].into();
        Self {
            frame_rate,
            width,
            height,
            total,
            next_index: 0,
            pixels,
        }
    }
}

impl VideoSource for ScriptedSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.next_index >= self.total {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(Frame {
            index,
            timestamp: Duration::from_secs_f64(index as f64 / self.frame_rate),
            width: self.width,
            height: self.height,
            pixels: Arc::clone(&self.pixels),
        })
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Tracker replaying scripted per-frame results keyed by frame index.
#[derive(Debug)]
pub struct ScriptedTracker {
    tracks: Vec<Option<Rect>>,
    initialized: bool,
}

impl ScriptedTracker {
    pub fn new(tracks: Vec<Option<Rect>>) -> Self {
        Self {
            tracks,
            initialized: false,
        }
    }
}

impl ObjectTracker for ScriptedTracker {
    fn init(&mut self, _frame: &Frame, _bbox: Rect) {
        self.initialized = true;
    }

    fn update(&mut self, frame: &Frame) -> Option<Rect> {
        if !self.initialized {
            return None;
        }
        self.tracks.get(frame.index as usize).copied().flatten()
    }
}

/// Selector answering both selection requests from the manifest.
#[derive(Debug)]
pub struct ScriptedSelector {
    object_box: Rect,
    trigger_region: Rect,
}

impl ScriptedSelector {
    pub fn new(object_box: Rect, trigger_region: Rect) -> Self {
        Self {
            object_box,
            trigger_region,
        }
    }
}

impl RegionSelector for ScriptedSelector {
    fn select(&mut self, _frame: &Frame, purpose: SelectionPurpose) -> Option<Rect> {
        match purpose {
            SelectionPurpose::ObjectBox => Some(self.object_box),
            SelectionPurpose::TriggerRegion => Some(self.trigger_region),
        }
    }
}
