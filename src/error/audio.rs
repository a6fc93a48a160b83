// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1004
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// Output device or stream could not be opened
    pub const RESOURCE_UNAVAILABLE: i32 = 1001;

    /// Stream failed while playing
    pub const STREAM_FAILURE: i32 = 1002;

    /// Device only offers a sample format we do not synthesize
    pub const UNSUPPORTED_FORMAT: i32 = 1003;

    /// Playback thread could not be spawned
    pub const THREAD_SPAWN: i32 = 1004;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=TonePlayer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// None of these are fatal to a ringing session: a device that cannot be
/// opened is recovered by falling back to discrete beeps.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No usable output device, config or stream
    ResourceUnavailable { reason: String },

    /// Stream reported an error after it was opened
    StreamFailure { details: String },

    /// Device sample format is not supported
    UnsupportedFormat { format: String },

    /// Playback thread could not be started
    ThreadSpawn { details: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::ResourceUnavailable { .. } => AudioErrorCodes::RESOURCE_UNAVAILABLE,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::ThreadSpawn { .. } => AudioErrorCodes::THREAD_SPAWN,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::ResourceUnavailable { reason } => {
                format!("Audio output unavailable: {}", reason)
            }
            AudioError::StreamFailure { details } => {
                format!("Audio stream failed: {}", details)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported output sample format: {}", format)
            }
            AudioError::ThreadSpawn { details } => {
                format!("Failed to spawn playback thread: {}", details)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}
