//! Centroid persistence
//!
//! Append-only text record of every successfully tracked frame:
//! `centroid_x,centroid_y,state`, newline-delimited. Opened at session
//! start, flushed and closed at session end.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SessionError;
use crate::geometry::Point;
use crate::tracking::ContainmentState;

pub struct CentroidLog {
    writer: BufWriter<File>,
    records: u64,
}

impl CentroidLog {
    /// Create the record file. An open failure is fatal and happens before
    /// any worker starts.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// Append one record. Coordinates are truncated to whole pixels.
    pub fn append(&mut self, centroid: Point, state: ContainmentState) -> Result<(), SessionError> {
        writeln!(
            self.writer,
            "{},{},{}",
            centroid.x as i64, centroid.y as i64, state
        )?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flush and close the record file.
    pub fn close(mut self) -> Result<(), SessionError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_close() {
        let dir = std::env::temp_dir().join("looming_record_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("centroid.csv");

        let mut log = CentroidLog::create(&path).unwrap();
        log.append(Point::new(12.7, 34.2), ContainmentState::Outside)
            .unwrap();
        log.append(Point::new(310.0, 210.5), ContainmentState::Inside)
            .unwrap();
        assert_eq!(log.records(), 2);
        log.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["12,34,outside", "310,210,inside"]);
    }

    #[test]
    fn test_create_fails_on_missing_directory() {
        let result = CentroidLog::create("definitely/missing/dir/centroid.csv");
        assert!(matches!(result, Err(SessionError::RecordIo { .. })));
    }
}
