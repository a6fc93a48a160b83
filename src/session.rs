//! RingingSession - the alarm dismissal state machine
//!
//! States: `Ringing` → `Snoozed` → `Ringing` … → `Solved` (terminal).
//!
//! The session owns the attempt history, the current puzzle and the tone
//! player. It never performs terminal I/O itself: progress is published as
//! [`SessionEvent`]s on a tokio broadcast channel and the console shell
//! renders them.
//!
//! Background work:
//! - the tone player runs on its own thread while `Ringing`
//! - `/train` reports are spawned as detached tasks and their results are
//!   only logged
//! - the `/recommend` query after a wrong answer is awaited inline, bounded
//!   by the HTTP client timeout, and any failure means "no recommendation"

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::audio::{OutputBackend, PlaybackMode, TonePlayer};
use crate::config::AppConfig;
use crate::error::{log_alarm_error, AlarmError};
use crate::escalation::{
    AttemptStats, AttemptSummary, Difficulty, Escalation, EscalationPolicy, EscalationSource,
};
use crate::puzzle::{Puzzle, PuzzleGenerator};
use crate::quotes::QuotePool;
use crate::recommend::{RecommendationSink, TrainingSample};

/// Literal command that snoozes instead of answering
pub const SNOOZE_COMMAND: &str = "snooze";

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ringing,
    Snoozed,
    Solved,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Entered `Ringing` (initially or after a snooze) with a fresh puzzle
    Ringing { difficulty: Difficulty, prompt: String },
    /// Replacement puzzle after a wrong answer
    PuzzleIssued { difficulty: Difficulty, prompt: String },
    Incorrect { consecutive_failures: u32 },
    FormatError { input: String },
    DifficultyRaised {
        from: Difficulty,
        to: Difficulty,
        source: EscalationSource,
    },
    Snoozed { minutes: u64, difficulty: Difficulty },
    Solved { quote: String },
}

/// Result of handling one line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    Solved { quote: String },
    Incorrect { difficulty: Difficulty },
    FormatError,
    Snoozed { minutes: u64, delay: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub summary: AttemptSummary,
    pub total_attempts: u32,
    pub final_difficulty: Difficulty,
    pub quote: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Solved(SessionReport),
    /// The input stream ended before the puzzle was solved
    InputClosed,
}

pub struct RingingSession {
    state: SessionState,
    stats: AttemptStats,
    policy: EscalationPolicy,
    generator: PuzzleGenerator,
    puzzle: Option<Puzzle>,
    presented_at: Instant,
    player: TonePlayer,
    sink: Arc<dyn RecommendationSink>,
    quotes: Arc<QuotePool>,
    rng: StdRng,
    events: broadcast::Sender<SessionEvent>,
    last_quote: Option<String>,
}

impl RingingSession {
    /// Create a session for one ringing episode. Call [`start`](Self::start)
    /// after subscribing to events.
    ///
    /// # Errors
    /// `AlarmError::InvariantViolation` if the configured initial difficulty
    /// is outside [1, 5].
    pub fn new(
        config: &AppConfig,
        backend: Arc<dyn OutputBackend>,
        sink: Arc<dyn RecommendationSink>,
        quotes: Arc<QuotePool>,
    ) -> Result<Self, AlarmError> {
        let initial = Difficulty::new(config.escalation.initial_difficulty)?;
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Ok(Self {
            state: SessionState::Ringing,
            stats: AttemptStats::new(initial),
            policy: EscalationPolicy::new(
                config.escalation.failure_threshold,
                config.escalation.max_snooze_minutes,
            ),
            generator: PuzzleGenerator::new(config.puzzles.effective_kinds()),
            puzzle: None,
            presented_at: Instant::now(),
            player: TonePlayer::new(backend, config.audio.clone()),
            sink,
            quotes,
            rng: StdRng::from_entropy(),
            events,
            last_quote: None,
        })
    }

    /// Replace the random source, for reproducible puzzles.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &AttemptStats {
        &self.stats
    }

    pub fn current_puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn playback_mode(&self) -> PlaybackMode {
        self.player.mode()
    }

    /// Begin ringing: start the tone and present the first puzzle.
    pub fn start(&mut self) {
        log::info!(
            "[RingingSession] Ringing at difficulty {}",
            self.stats.difficulty()
        );
        self.enter_ringing();
    }

    /// Handle one line of user input while `Ringing`.
    ///
    /// # Errors
    /// `AlarmError::InvariantViolation` if the session is not ringing or has
    /// no puzzle. Unparsable answers are not errors: they are counted as
    /// attempts and yield [`InputOutcome::FormatError`].
    pub async fn handle_input(&mut self, line: &str) -> Result<InputOutcome, AlarmError> {
        if self.state != SessionState::Ringing {
            return Err(AlarmError::InvariantViolation {
                detail: format!("input received while {:?}", self.state),
            });
        }
        let puzzle = self.puzzle.as_ref().ok_or_else(|| AlarmError::InvariantViolation {
            detail: "ringing without a puzzle".to_string(),
        })?;

        let response_seconds = self.presented_at.elapsed().as_secs_f64();
        let input = line.trim();

        if input.eq_ignore_ascii_case(SNOOZE_COMMAND) {
            return Ok(self.snooze(response_seconds));
        }

        match puzzle.check(input) {
            Ok(true) => Ok(self.solve(response_seconds)),
            Ok(false) => Ok(self.fail(response_seconds).await),
            Err(AlarmError::Parse { .. }) => {
                log::debug!("[RingingSession] Unparsable answer {:?}", input);
                self.stats.record_format_error(response_seconds);
                self.presented_at = Instant::now();
                self.emit(SessionEvent::FormatError {
                    input: input.to_string(),
                });
                Ok(InputOutcome::FormatError)
            }
            Err(err) => Err(err),
        }
    }

    /// Leave `Snoozed` once the snooze delay has elapsed.
    ///
    /// # Errors
    /// `AlarmError::InvariantViolation` if the session is not snoozed.
    pub fn resume_after_snooze(&mut self) -> Result<(), AlarmError> {
        if self.state != SessionState::Snoozed {
            return Err(AlarmError::InvariantViolation {
                detail: format!("resume requested while {:?}", self.state),
            });
        }
        log::info!(
            "[RingingSession] Snooze over, ringing at difficulty {}",
            self.stats.difficulty()
        );
        self.enter_ringing();
        Ok(())
    }

    /// Stop the tone without changing state, e.g. when the process exits.
    pub fn silence(&mut self) {
        self.stop_tone();
    }

    /// Drive the session from a line-oriented input stream until solved or
    /// the stream ends. Snooze delays are slept on tokio's timer.
    ///
    /// # Errors
    /// Propagates `AlarmError::InvariantViolation` from the state machine.
    pub async fn run<R>(mut self, input: R) -> Result<SessionOutcome, AlarmError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.start();
        let mut lines = input.lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    log::info!("[RingingSession] Input closed before solving");
                    self.silence();
                    return Ok(SessionOutcome::InputClosed);
                }
                Err(e) => {
                    log::warn!("[RingingSession] Input read failed: {}", e);
                    self.silence();
                    return Ok(SessionOutcome::InputClosed);
                }
            };

            match self.handle_input(&line).await {
                Ok(InputOutcome::Solved { .. }) => {
                    return Ok(SessionOutcome::Solved(self.report()));
                }
                Ok(InputOutcome::Snoozed { delay, .. }) => {
                    tokio::time::sleep(delay).await;
                    self.resume_after_snooze()?;
                }
                Ok(InputOutcome::Incorrect { .. }) | Ok(InputOutcome::FormatError) => {}
                Err(err) => {
                    log_alarm_error(&err, "run");
                    self.silence();
                    return Err(err);
                }
            }
        }
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            summary: self.stats.summary(),
            total_attempts: self.stats.total_attempts(),
            final_difficulty: self.stats.difficulty(),
            quote: self.last_quote.clone().unwrap_or_default(),
        }
    }

    fn enter_ringing(&mut self) {
        self.state = SessionState::Ringing;
        if let Err(err) = self.player.start() {
            log::error!("[RingingSession] Tone playback unavailable: {}", err);
        }

        let prompt = self.next_puzzle();
        self.emit(SessionEvent::Ringing {
            difficulty: self.stats.difficulty(),
            prompt,
        });
    }

    /// Generate and present a puzzle at the current difficulty; returns its prompt.
    fn next_puzzle(&mut self) -> String {
        let puzzle = self.generator.generate(self.stats.difficulty(), &mut self.rng);
        let prompt = puzzle.prompt().to_string();
        self.puzzle = Some(puzzle);
        self.presented_at = Instant::now();
        prompt
    }

    fn snooze(&mut self, response_seconds: f64) -> InputOutcome {
        self.stats.record_snooze(response_seconds);
        self.stop_tone();

        let decision = self.policy.after_snooze(&self.stats);
        self.apply_escalation(decision);

        let minutes = self.policy.snooze_minutes(self.stats.difficulty());
        self.state = SessionState::Snoozed;
        self.puzzle = None;
        log::info!(
            "[RingingSession] Snoozed for {} minute(s), difficulty now {}",
            minutes,
            self.stats.difficulty()
        );

        self.emit(SessionEvent::Snoozed {
            minutes,
            difficulty: self.stats.difficulty(),
        });
        self.report_training();

        InputOutcome::Snoozed {
            minutes,
            delay: Duration::from_secs(minutes * 60),
        }
    }

    fn solve(&mut self, response_seconds: f64) -> InputOutcome {
        self.stats.record_correct(response_seconds);
        self.stop_tone();
        self.state = SessionState::Solved;
        self.puzzle = None;

        let quote = self.quotes.pick(&mut self.rng).to_string();
        self.last_quote = Some(quote.clone());
        log::info!(
            "[RingingSession] Solved after {} attempt(s)",
            self.stats.total_attempts()
        );

        self.emit(SessionEvent::Solved {
            quote: quote.clone(),
        });
        self.report_training();

        InputOutcome::Solved { quote }
    }

    async fn fail(&mut self, response_seconds: f64) -> InputOutcome {
        self.stats.record_failure(response_seconds);
        self.emit(SessionEvent::Incorrect {
            consecutive_failures: self.stats.consecutive_failures(),
        });

        let recommendation = self.query_recommendation().await;
        let decision = self.policy.after_failure(&self.stats, recommendation);
        self.apply_escalation(decision);

        let prompt = self.next_puzzle();
        self.emit(SessionEvent::PuzzleIssued {
            difficulty: self.stats.difficulty(),
            prompt,
        });

        InputOutcome::Incorrect {
            difficulty: self.stats.difficulty(),
        }
    }

    /// Stop playback. The join can block for up to the device stall timeout,
    /// so on a multi-threaded runtime it runs under `block_in_place`.
    fn stop_tone(&mut self) {
        let player = &mut self.player;
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| player.stop())
            }
            _ => player.stop(),
        }
    }

    fn apply_escalation(&mut self, decision: Escalation) {
        let source = match decision {
            Escalation::Escalate { source, .. } => source,
            Escalation::Hold => return,
        };
        if let Some((from, to)) = self.stats.apply(decision) {
            if to > from {
                log::info!(
                    "[RingingSession] Difficulty {} -> {} ({:?})",
                    from,
                    to,
                    source
                );
                self.emit(SessionEvent::DifficultyRaised { from, to, source });
            }
        }
    }

    async fn query_recommendation(&self) -> Option<Difficulty> {
        match self.sink.recommend(self.stats.summary()).await {
            Ok(Some(value)) => match Difficulty::try_from(value) {
                Ok(difficulty) => Some(difficulty),
                Err(_) => {
                    log::debug!("[RingingSession] Ignoring out-of-range recommendation {}", value);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log::debug!("[RingingSession] No recommendation: {}", err);
                None
            }
        }
    }

    /// Fire-and-forget `/train` report with the current difficulty as target.
    fn report_training(&self) {
        let sink = Arc::clone(&self.sink);
        let sample = TrainingSample {
            summary: self.stats.summary(),
            target_difficulty: self.stats.difficulty().level(),
        };
        tokio::spawn(async move {
            if let Err(err) = sink.train(sample).await {
                log::debug!("[RingingSession] Training report dropped: {}", err);
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine: events are advisory
        let _ = self.events.send(event);
    }
}

impl Drop for RingingSession {
    fn drop(&mut self) {
        self.player.stop();
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
