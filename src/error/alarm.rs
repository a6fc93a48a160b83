// Alarm session error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Alarm error code constants
///
/// Error code range: 3001-3004
pub struct AlarmErrorCodes;

impl AlarmErrorCodes {
    /// Schedule token or answer text could not be parsed
    pub const PARSE: i32 = 3001;

    /// Recommendation or training call failed
    pub const REMOTE_UNAVAILABLE: i32 = 3002;

    /// A programming contract was broken (e.g. difficulty out of range)
    pub const INVARIANT_VIOLATION: i32 = 3003;

    /// Armed trigger was cancelled before it fired
    pub const CANCELLED: i32 = 3004;
}

/// Log an alarm error with structured context
pub fn log_alarm_error(err: &AlarmError, context: &str) {
    error!(
        "Alarm error in {}: code={}, component=RingingSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while scheduling an alarm or running a ringing session
///
/// Only a `Parse` error at scheduling time aborts anything, and it aborts
/// just that scheduling request.
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmError {
    /// Bad schedule token or unparsable answer (recoverable, re-prompt)
    Parse { token: String, reason: String },

    /// Recommendation service could not be reached or answered badly
    RemoteUnavailable { endpoint: String, reason: String },

    /// Contract failure such as a difficulty outside [1, 5]
    InvariantViolation { detail: String },

    /// The armed trigger was cancelled
    Cancelled,
}

impl AlarmError {
    pub(crate) fn parse(token: &str, reason: impl Into<String>) -> Self {
        AlarmError::Parse {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for AlarmError {
    fn code(&self) -> i32 {
        match self {
            AlarmError::Parse { .. } => AlarmErrorCodes::PARSE,
            AlarmError::RemoteUnavailable { .. } => AlarmErrorCodes::REMOTE_UNAVAILABLE,
            AlarmError::InvariantViolation { .. } => AlarmErrorCodes::INVARIANT_VIOLATION,
            AlarmError::Cancelled => AlarmErrorCodes::CANCELLED,
        }
    }

    fn message(&self) -> String {
        match self {
            AlarmError::Parse { token, reason } => {
                format!("Could not parse '{}': {}", token, reason)
            }
            AlarmError::RemoteUnavailable { endpoint, reason } => {
                format!("Recommendation service {} unavailable: {}", endpoint, reason)
            }
            AlarmError::InvariantViolation { detail } => {
                format!("Invariant violated: {}", detail)
            }
            AlarmError::Cancelled => "Alarm trigger was cancelled".to_string(),
        }
    }
}

impl fmt::Display for AlarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AlarmError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AlarmError {}
