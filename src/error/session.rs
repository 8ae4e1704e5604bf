// Session error types and constants

use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Session orchestration errors
///
/// These cover the fatal pre-worker conditions (source and writer opening)
/// plus persistence I/O. Tracking failures are not errors: the loop absorbs
/// them per-frame.
///
/// Error code range: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Video source could not be opened
    SourceUnavailable { source: String },

    /// Output writer (render log) could not be created
    WriterUnavailable { path: String, reason: String },

    /// Centroid record file I/O failure
    RecordIo { reason: String },

    /// Operator aborted region selection before the session started
    SelectionAborted { what: String },

    /// Scripted capture manifest failed validation
    ManifestInvalid { reason: String },
}

impl SessionError {
    pub const SOURCE_UNAVAILABLE: i32 = 2001;
    pub const WRITER_UNAVAILABLE: i32 = 2002;
    pub const RECORD_IO: i32 = 2003;
    pub const SELECTION_ABORTED: i32 = 2004;
    pub const MANIFEST_INVALID: i32 = 2005;
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::SourceUnavailable { .. } => SessionError::SOURCE_UNAVAILABLE,
            SessionError::WriterUnavailable { .. } => SessionError::WRITER_UNAVAILABLE,
            SessionError::RecordIo { .. } => SessionError::RECORD_IO,
            SessionError::SelectionAborted { .. } => SessionError::SELECTION_ABORTED,
            SessionError::ManifestInvalid { .. } => SessionError::MANIFEST_INVALID,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::SourceUnavailable { source } => {
                format!("Failed to open video source: {}", source)
            }
            SessionError::WriterUnavailable { path, reason } => {
                format!("Error creating output writer {}: {}", path, reason)
            }
            SessionError::RecordIo { reason } => {
                format!("Centroid record I/O failed: {}", reason)
            }
            SessionError::SelectionAborted { what } => {
                format!("Region selection aborted before {} was confirmed", what)
            }
            SessionError::ManifestInvalid { reason } => {
                format!("Invalid capture manifest: {}", reason)
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::RecordIo {
            reason: err.to_string(),
        }
    }
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(
            SessionError::SourceUnavailable {
                source: "cam".to_string()
            }
            .code(),
            SessionError::SOURCE_UNAVAILABLE
        );
        assert_eq!(
            SessionError::WriterUnavailable {
                path: "out.jsonl".to_string(),
                reason: "denied".to_string()
            }
            .code(),
            SessionError::WRITER_UNAVAILABLE
        );
        assert_eq!(
            SessionError::RecordIo {
                reason: "disk full".to_string()
            }
            .code(),
            SessionError::RECORD_IO
        );
        assert_eq!(
            SessionError::SelectionAborted {
                what: "trigger region".to_string()
            }
            .code(),
            SessionError::SELECTION_ABORTED
        );
        assert_eq!(
            SessionError::ManifestInvalid {
                reason: "no frames".to_string()
            }
            .code(),
            SessionError::MANIFEST_INVALID
        );
    }

    #[test]
    fn test_session_error_messages() {
        let err = SessionError::SourceUnavailable {
            source: "3".to_string(),
        };
        assert!(err.message().contains("video source"));
        assert!(err.message().contains('3'));

        let err = SessionError::SelectionAborted {
            what: "trigger region".to_string(),
        };
        assert!(err.message().contains("trigger region"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("write failed");
        let session_err: SessionError = io_err.into();
        match session_err {
            SessionError::RecordIo { reason } => assert!(reason.contains("write failed")),
            _ => panic!("Expected RecordIo"),
        }
    }
}
