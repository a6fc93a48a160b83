//! Difficulty escalation - attempt history and the rules that raise difficulty
//!
//! `AttemptStats` is owned by the ringing session and reset only when a new
//! ringing episode starts. `EscalationPolicy` decides, from that history and
//! an optional remote recommendation, whether difficulty rises. Difficulty
//! never decreases within a session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AlarmError;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

/// Puzzle difficulty level, always within [1, 5].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const EASIEST: Difficulty = Difficulty(MIN_DIFFICULTY);
    pub const HARDEST: Difficulty = Difficulty(MAX_DIFFICULTY);

    /// # Errors
    /// `AlarmError::InvariantViolation` if `level` is outside [1, 5].
    pub fn new(level: u8) -> Result<Self, AlarmError> {
        if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&level) {
            Ok(Difficulty(level))
        } else {
            Err(AlarmError::InvariantViolation {
                detail: format!(
                    "difficulty {} outside [{}, {}]",
                    level, MIN_DIFFICULTY, MAX_DIFFICULTY
                ),
            })
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// One level harder, capped at the hardest level.
    pub fn raised(self) -> Self {
        Difficulty((self.0 + 1).min(MAX_DIFFICULTY))
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::EASIEST
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = AlarmError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Difficulty::new(level)
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = AlarmError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        u8::try_from(level)
            .map_err(|_| AlarmError::InvariantViolation {
                detail: format!("difficulty {} outside [1, 5]", level),
            })
            .and_then(Difficulty::new)
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of a session's answers, the payload shape the recommender expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub avg_response_time: f64,
    pub accuracy: f64,
    pub snooze_count: u32,
}

/// Mutable attempt history for one ringing episode.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptStats {
    total_attempts: u32,
    total_correct: u32,
    total_response_seconds: f64,
    snooze_count: u32,
    consecutive_failures: u32,
    current_difficulty: Difficulty,
}

impl AttemptStats {
    pub fn new(initial: Difficulty) -> Self {
        Self {
            total_attempts: 0,
            total_correct: 0,
            total_response_seconds: 0.0,
            snooze_count: 0,
            consecutive_failures: 0,
            current_difficulty: initial,
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    pub fn total_correct(&self) -> u32 {
        self.total_correct
    }

    pub fn total_response_seconds(&self) -> f64 {
        self.total_response_seconds
    }

    pub fn snooze_count(&self) -> u32 {
        self.snooze_count
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn difficulty(&self) -> Difficulty {
        self.current_difficulty
    }

    fn record_attempt(&mut self, response_seconds: f64) {
        self.total_attempts += 1;
        self.total_response_seconds += response_seconds.max(0.0);
    }

    pub fn record_correct(&mut self, response_seconds: f64) {
        self.record_attempt(response_seconds);
        self.total_correct += 1;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, response_seconds: f64) {
        self.record_attempt(response_seconds);
        self.consecutive_failures += 1;
    }

    /// An answer that could not be parsed: counted, but not a failure.
    pub fn record_format_error(&mut self, response_seconds: f64) {
        self.record_attempt(response_seconds);
    }

    pub fn record_snooze(&mut self, response_seconds: f64) {
        self.record_attempt(response_seconds);
        self.snooze_count += 1;
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.total_correct as f64 / self.total_attempts as f64
        }
    }

    pub fn average_response_seconds(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            self.total_response_seconds / self.total_attempts as f64
        }
    }

    pub fn summary(&self) -> AttemptSummary {
        AttemptSummary {
            avg_response_time: self.average_response_seconds(),
            accuracy: self.accuracy(),
            snooze_count: self.snooze_count,
        }
    }

    /// Apply an escalation decision.
    ///
    /// Returns `(from, to)` when an escalation was applied (even if already
    /// at the cap), `None` for `Hold`. Any escalation resets the consecutive
    /// failure count.
    pub fn apply(&mut self, escalation: Escalation) -> Option<(Difficulty, Difficulty)> {
        match escalation {
            Escalation::Hold => None,
            Escalation::Escalate { target, .. } => {
                let from = self.current_difficulty;
                self.current_difficulty = from.max(target);
                self.consecutive_failures = 0;
                Some((from, self.current_difficulty))
            }
        }
    }
}

/// Why difficulty went up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationSource {
    Recommended,
    ConsecutiveFailures,
    Snooze,
}

/// Outcome of consulting the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Hold,
    Escalate {
        target: Difficulty,
        source: EscalationSource,
    },
}

/// Local escalation rules, always available without the network.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    failure_threshold: u32,
    max_snooze_minutes: u64,
}

impl EscalationPolicy {
    pub fn new(failure_threshold: u32, max_snooze_minutes: u64) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            max_snooze_minutes: max_snooze_minutes.max(1),
        }
    }

    /// Decide after a wrong answer has been recorded.
    ///
    /// A valid recommendation sets a floor of `max(current, recommended)`.
    /// On top of that floor, `failure_threshold` consecutive failures still
    /// raise difficulty by one level.
    pub fn after_failure(
        &self,
        stats: &AttemptStats,
        recommendation: Option<Difficulty>,
    ) -> Escalation {
        let current = stats.difficulty();
        let floor = recommendation.map_or(current, |recommended| current.max(recommended));

        if stats.consecutive_failures() >= self.failure_threshold {
            Escalation::Escalate {
                target: floor.raised(),
                source: EscalationSource::ConsecutiveFailures,
            }
        } else if floor > current {
            Escalation::Escalate {
                target: floor,
                source: EscalationSource::Recommended,
            }
        } else {
            Escalation::Hold
        }
    }

    /// A snooze always raises difficulty by one level.
    pub fn after_snooze(&self, stats: &AttemptStats) -> Escalation {
        Escalation::Escalate {
            target: stats.difficulty().raised(),
            source: EscalationSource::Snooze,
        }
    }

    /// Snooze length for the given difficulty: `min(cap, 2 * level + 1)`.
    pub fn snooze_minutes(&self, difficulty: Difficulty) -> u64 {
        (u64::from(difficulty.level()) * 2 + 1).min(self.max_snooze_minutes)
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(3, 10)
    }
}
