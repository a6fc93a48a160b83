use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::AudioConfig;
use crate::error::AudioError;

use super::{OutputBackend, OutputDevice};

/// Backend used when audio output is disabled.
///
/// Opening always fails, so the player runs in beep-fallback mode, and the
/// beeps themselves are swallowed.
#[derive(Debug, Default)]
pub struct SilentBackend {
    _unit: (),
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputBackend for SilentBackend {
    fn open(&self, _config: &AudioConfig) -> Result<Box<dyn OutputDevice>, AudioError> {
        Err(AudioError::ResourceUnavailable {
            reason: "audio output disabled".to_string(),
        })
    }

    fn beep(&self) {
        log::debug!("[TonePlayer] Silent beep");
    }
}

/// Counters shared between a [`RecordingBackend`] and its devices.
#[derive(Debug, Default)]
pub struct RecordingStats {
    opened: AtomicUsize,
    released: AtomicUsize,
    blocks: AtomicUsize,
    beeps: AtomicUsize,
}

impl RecordingStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn blocks(&self) -> usize {
        self.blocks.load(Ordering::SeqCst)
    }

    pub fn beeps(&self) -> usize {
        self.beeps.load(Ordering::SeqCst)
    }
}

/// In-memory backend for tests and headless diagnostics.
///
/// Records device lifecycle and block counts instead of producing sound.
/// Each written block sleeps for `pace` to stand in for device timing.
#[derive(Debug)]
pub struct RecordingBackend {
    stats: Arc<RecordingStats>,
    fail_open: bool,
    fail_after_blocks: Option<usize>,
    pace: Duration,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RecordingStats::default()),
            fail_open: false,
            fail_after_blocks: None,
            pace: Duration::from_millis(1),
        }
    }

    /// Every `open` fails with `ResourceUnavailable`.
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    /// Devices report a stream failure after `blocks` successful writes.
    pub fn failing_after(blocks: usize) -> Self {
        Self {
            fail_after_blocks: Some(blocks),
            ..Self::new()
        }
    }

    pub fn stats(&self) -> Arc<RecordingStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBackend for RecordingBackend {
    fn open(&self, config: &AudioConfig) -> Result<Box<dyn OutputDevice>, AudioError> {
        if self.fail_open {
            return Err(AudioError::ResourceUnavailable {
                reason: "recording backend configured to fail".to_string(),
            });
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingDevice {
            stats: Arc::clone(&self.stats),
            sample_rate: config.sample_rate,
            written: 0,
            fail_after_blocks: self.fail_after_blocks,
            pace: self.pace,
        }))
    }

    fn beep(&self) {
        self.stats.beeps.fetch_add(1, Ordering::SeqCst);
    }
}

struct RecordingDevice {
    stats: Arc<RecordingStats>,
    sample_rate: u32,
    written: usize,
    fail_after_blocks: Option<usize>,
    pace: Duration,
}

impl OutputDevice for RecordingDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write_block(&mut self, _block: &[f32]) -> Result<(), AudioError> {
        if self.fail_after_blocks.is_some_and(|limit| self.written >= limit) {
            return Err(AudioError::StreamFailure {
                details: "recording device failure".to_string(),
            });
        }
        thread::sleep(self.pace);
        self.written += 1;
        self.stats.blocks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for RecordingDevice {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}
