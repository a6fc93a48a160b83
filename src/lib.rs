// Puzzle Alarm - alarm ringing engine
// Looping synthesized tone, puzzle dismissal and difficulty escalation

// Module declarations
pub mod audio;
pub mod config;
pub mod error;
pub mod escalation;
pub mod puzzle;
pub mod quotes;
pub mod recommend;
pub mod scheduler;
pub mod session;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::{AlarmError, AudioError, ErrorCode};
pub use escalation::{AttemptStats, Difficulty, EscalationPolicy};
pub use puzzle::{Puzzle, PuzzleKind};
pub use scheduler::{parse_schedule, AlarmTrigger, Scheduler, TriggerHandle};
pub use session::{RingingSession, SessionEvent, SessionOutcome, SessionState};
