// Audio error types and constants

use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Audio-related errors
///
/// These errors cover output device negotiation, stream lifecycle, and
/// playback failures in the two audio workers.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No usable output device on the default host
    DeviceUnavailable,

    /// Failed to open an output stream
    StreamOpenFailed { reason: String },

    /// The device offered a sample format other than f32
    UnsupportedFormat { format: String },

    /// A blocking write failed mid-playback
    PlaybackFailed { reason: String },

    /// Mutex/Condvar state was poisoned
    LockPoisoned { component: String },
}

impl AudioError {
    pub const DEVICE_UNAVAILABLE: i32 = 1001;
    pub const STREAM_OPEN_FAILED: i32 = 1002;
    pub const UNSUPPORTED_FORMAT: i32 = 1003;
    pub const PLAYBACK_FAILED: i32 = 1004;
    pub const LOCK_POISONED: i32 = 1005;
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::DeviceUnavailable => AudioError::DEVICE_UNAVAILABLE,
            AudioError::StreamOpenFailed { .. } => AudioError::STREAM_OPEN_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioError::UNSUPPORTED_FORMAT,
            AudioError::PlaybackFailed { .. } => AudioError::PLAYBACK_FAILED,
            AudioError::LockPoisoned { .. } => AudioError::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::DeviceUnavailable => {
                "No default output device found on the audio host".to_string()
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Only f32 output is supported (device offered {})", format)
            }
            AudioError::PlaybackFailed { reason } => {
                format!("Audio playback failed: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::PlaybackFailed {
            reason: err.to_string(),
        }
    }
}

/// Log an audio error with structured context
///
/// Logs the numeric code alongside the component so worker failures can be
/// correlated without a structured reporting channel.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}
