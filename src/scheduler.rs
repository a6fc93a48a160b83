//! Alarm trigger scheduling
//!
//! A schedule token is either `HH:mm` (24-hour, zero padding optional),
//! rolled forward a day when it is not strictly in the future, or `+N`
//! minutes from now. An armed trigger fires exactly once, never before its
//! deadline, on a spawned tokio task so the caller is not blocked.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Offset, TimeZone, Utc};
use tokio::task::JoinHandle;

use crate::error::AlarmError;

const MINUTE_MILLIS: i64 = 60_000;
const DAY_MILLIS: i64 = 24 * 60 * MINUTE_MILLIS;

/// A one-shot alarm deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTrigger {
    fire_at_epoch_millis: i64,
}

impl AlarmTrigger {
    pub fn at_epoch_millis(fire_at_epoch_millis: i64) -> Self {
        Self {
            fire_at_epoch_millis,
        }
    }

    pub fn fire_at_epoch_millis(&self) -> i64 {
        self.fire_at_epoch_millis
    }

    /// Delay until the deadline; a deadline in the past yields zero.
    pub fn delay_from(&self, now_epoch_millis: i64) -> Duration {
        let remaining = self.fire_at_epoch_millis.saturating_sub(now_epoch_millis);
        Duration::from_millis(remaining.max(0) as u64)
    }

    pub fn fire_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fire_at_epoch_millis)
    }
}

/// Parse a schedule token relative to `now`.
///
/// # Errors
/// `AlarmError::Parse` naming the token when it is neither `+N` nor a valid
/// `HH:mm`.
pub fn parse_schedule<Tz: TimeZone>(
    token: &str,
    now: &DateTime<Tz>,
) -> Result<AlarmTrigger, AlarmError> {
    let trimmed = token.trim();
    let now_millis = now.timestamp_millis();

    if let Some(minutes) = trimmed.strip_prefix('+') {
        let minutes = parse_digits(minutes, 9)
            .ok_or_else(|| AlarmError::parse(token, "expected +N with N a whole number of minutes"))?;
        return Ok(AlarmTrigger::at_epoch_millis(
            now_millis + i64::from(minutes) * MINUTE_MILLIS,
        ));
    }

    let (hour, minute) = trimmed
        .split_once(':')
        .and_then(|(h, m)| Some((parse_digits(h, 2)?, parse_digits(m, 2)?)))
        .ok_or_else(|| AlarmError::parse(token, "expected HH:mm or +N"))?;

    if hour > 23 || minute > 59 {
        return Err(AlarmError::parse(token, "hour must be 0-23 and minute 0-59"));
    }

    let naive = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| AlarmError::parse(token, "not a valid time of day"))?;

    // Local times skipped by a DST change use the current offset
    let today_millis = match now.timezone().from_local_datetime(&naive).earliest() {
        Some(local) => local.timestamp_millis(),
        None => {
            let offset_secs = i64::from(now.offset().fix().local_minus_utc());
            naive.and_utc().timestamp_millis() - offset_secs * 1000
        }
    };

    let fire_at = if today_millis > now_millis {
        today_millis
    } else {
        today_millis + DAY_MILLIS
    };

    Ok(AlarmTrigger::at_epoch_millis(fire_at))
}

fn parse_digits(text: &str, max_len: usize) -> Option<u32> {
    if text.is_empty() || text.len() > max_len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Wall-clock source used to decide when a trigger is due.
pub trait WallClock: Send + Sync {
    fn now_epoch_millis(&self) -> i64;
}

/// System clock via chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_epoch_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock anchored to an epoch time and advanced by tokio's monotonic clock.
///
/// Follows paused/advanced time in tokio tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor_epoch_millis: i64,
    anchor: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn anchored_at(anchor_epoch_millis: i64) -> Self {
        Self {
            anchor_epoch_millis,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl WallClock for MonotonicClock {
    fn now_epoch_millis(&self) -> i64 {
        let elapsed = self.anchor.elapsed().as_millis() as i64;
        self.anchor_epoch_millis + elapsed
    }
}

/// Arms triggers on the current tokio runtime.
#[derive(Clone)]
pub struct Scheduler {
    clock: Arc<dyn WallClock>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn WallClock>) -> Self {
        Self { clock }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now_epoch_millis(&self) -> i64 {
        self.clock.now_epoch_millis()
    }

    /// Arm `trigger`; `on_fire` runs once the deadline has passed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F, Fut>(&self, trigger: AlarmTrigger, on_fire: F) -> TriggerHandle<Fut::Output>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let clock = Arc::clone(&self.clock);
        log::info!(
            "[Scheduler] Armed trigger for epoch ms {} (in {:?})",
            trigger.fire_at_epoch_millis(),
            trigger.delay_from(clock.now_epoch_millis())
        );

        let task = tokio::spawn(async move {
            // Re-check after each sleep: never fire before the deadline
            loop {
                let delay = trigger.delay_from(clock.now_epoch_millis());
                if delay.is_zero() {
                    break;
                }
                tokio::time::sleep(delay).await;
            }
            log::info!("[Scheduler] Trigger fired");
            on_fire().await
        });

        TriggerHandle { trigger, task }
    }
}

/// Handle to an armed trigger.
pub struct TriggerHandle<T> {
    trigger: AlarmTrigger,
    task: JoinHandle<T>,
}

impl<T> TriggerHandle<T> {
    pub fn trigger(&self) -> AlarmTrigger {
        self.trigger
    }

    /// Abort the trigger (or its running session).
    pub fn cancel(&self) {
        log::info!("[Scheduler] Trigger cancelled");
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the fired work to complete.
    ///
    /// # Errors
    /// `AlarmError::Cancelled` after `cancel`; `AlarmError::InvariantViolation`
    /// if the fired work panicked.
    pub async fn wait(self) -> Result<T, AlarmError> {
        self.task.await.map_err(|e| {
            if e.is_cancelled() {
                AlarmError::Cancelled
            } else {
                AlarmError::InvariantViolation {
                    detail: format!("trigger task panicked: {}", e),
                }
            }
        })
    }
}
