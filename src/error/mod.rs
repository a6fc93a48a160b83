// Error types for the puzzle alarm engine
//
// This module defines custom error types for audio output and the alarm
// session, providing structured error handling with stable numeric codes.

mod alarm;
mod audio;

pub use alarm::{log_alarm_error, AlarmError, AlarmErrorCodes};
pub use audio::{log_audio_error, AudioError, AudioErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and the console binary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
