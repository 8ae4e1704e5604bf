//! Render-log frame sink
//!
//! The crate's rendering collaborator writes one JSON line per frame with
//! the overlay primitives an on-screen renderer would draw: the trigger
//! region, the tracked centroid, and the containment-keyed color. A header
//! line mirrors the input's frame rate and size so downstream playback can
//! reconstruct timing.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SessionError;
use crate::tracking::ContainmentState;
use crate::video::{Frame, FrameAnnotations, FrameSink};

/// Overlay color for a centroid inside the trigger region (BGR).
pub const INSIDE_COLOR: [u8; 3] = [255, 0, 0];
/// Overlay color for a centroid outside the trigger region (BGR).
pub const OUTSIDE_COLOR: [u8; 3] = [0, 255, 0];

#[derive(Serialize)]
struct RenderHeader {
    frame_rate: f64,
    frame_size: [u32; 2],
}

#[derive(Serialize)]
struct RenderRecord {
    frame: u64,
    timestamp_ms: u64,
    region: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    centroid: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<[u8; 3]>,
}

/// JSON-lines annotation writer, one record per frame.
pub struct AnnotationWriter {
    writer: BufWriter<File>,
    quit_after: Option<u64>,
    last_frame: Option<u64>,
    finished: bool,
}

impl AnnotationWriter {
    /// Create the render log, writing the header immediately so an open
    /// failure is caught before any worker starts.
    pub fn create<P: AsRef<Path>>(
        path: P,
        frame_rate: f64,
        frame_size: (u32, u32),
    ) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| SessionError::WriterUnavailable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let mut writer = BufWriter::new(file);
        let header = RenderHeader {
            frame_rate,
            frame_size: [frame_size.0, frame_size.1],
        };
        serde_json::to_writer(&mut writer, &header).map_err(|err| {
            SessionError::WriterUnavailable {
                path: path.display().to_string(),
                reason: err.to_string(),
            }
        })?;
        writer
            .write_all(b"\n")
            .map_err(|err| SessionError::WriterUnavailable {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            writer,
            quit_after: None,
            last_frame: None,
            finished: false,
        })
    }

    /// Script an operator abort reported after the given frame index.
    pub fn with_quit_after(mut self, quit_after: Option<u64>) -> Self {
        self.quit_after = quit_after;
        self
    }
}

impl FrameSink for AnnotationWriter {
    fn write(
        &mut self,
        frame: &Frame,
        annotations: &FrameAnnotations,
    ) -> Result<(), SessionError> {
        let region = annotations.trigger_region;
        let record = RenderRecord {
            frame: frame.index,
            timestamp_ms: frame.timestamp.as_millis() as u64,
            region: [region.x, region.y, region.width, region.height],
            centroid: annotations.centroid.map(|c| [c.x, c.y]),
            state: annotations.state.map(|s| match s {
                ContainmentState::Inside => "inside",
                ContainmentState::Outside => "outside",
            }),
            color: annotations.state.map(|s| match s {
                ContainmentState::Inside => INSIDE_COLOR,
                ContainmentState::Outside => OUTSIDE_COLOR,
            }),
        };
        serde_json::to_writer(&mut self.writer, &record).map_err(|err| SessionError::RecordIo {
            reason: err.to_string(),
        })?;
        self.writer.write_all(b"\n")?;
        self.last_frame = Some(frame.index);
        Ok(())
    }

    fn poll_quit(&mut self) -> bool {
        match (self.quit_after, self.last_frame) {
            (Some(quit_after), Some(last)) => last >= quit_after,
            _ => false,
        }
    }

    fn finish(&mut self) -> Result<(), SessionError> {
        if !self.finished {
            self.writer.flush()?;
            self.finished = true;
        }
        Ok(())
    }
}

impl Drop for AnnotationWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.writer.flush();
        }
    }
}
