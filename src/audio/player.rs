//! TonePlayer - owns one playback episode of the alarm tone
//!
//! Architecture:
//! - `start()` spawns a dedicated playback thread that opens the output
//!   device, then repeatedly pulls blocks from a fresh [`ToneSynth`] and
//!   writes them until told to stop
//! - If the device cannot be opened, or fails mid-stream, the thread falls
//!   back to a discrete beep every `beep_interval_ms`
//! - `stop()` clears the playing flag, wakes the thread and joins it; the
//!   device is dropped on the playback thread on every exit path
//!
//! Thread safety:
//! - `playing`: AtomicBool, the only state shared with the playback thread.
//!   `start` claims it with compare-exchange, `stop` releases it with swap,
//!   so both are idempotent
//! - `mode`: AtomicU8 written by the playback thread, read for observation

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::backend::OutputBackend;
use super::tone::ToneSynth;
use crate::config::AudioConfig;
use crate::error::{log_audio_error, AudioError};

/// What the playback thread is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Idle,
    Tone,
    Beep,
}

impl PlaybackMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PlaybackMode::Tone,
            2 => PlaybackMode::Beep,
            _ => PlaybackMode::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            PlaybackMode::Idle => 0,
            PlaybackMode::Tone => 1,
            PlaybackMode::Beep => 2,
        }
    }
}

/// Audio output driver for a ringing session.
pub struct TonePlayer {
    backend: Arc<dyn OutputBackend>,
    config: AudioConfig,
    playing: Arc<AtomicBool>,
    mode: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl TonePlayer {
    pub fn new(backend: Arc<dyn OutputBackend>, config: AudioConfig) -> Self {
        Self {
            backend,
            config,
            playing: Arc::new(AtomicBool::new(false)),
            mode: Arc::new(AtomicU8::new(PlaybackMode::Idle.as_u8())),
            thread: None,
        }
    }

    /// Begin a playback episode. No-op if already playing.
    ///
    /// # Errors
    /// `AudioError::ThreadSpawn` if the playback thread cannot be created.
    /// Device problems are never returned: they switch to beep fallback.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self
            .playing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        // A previous episode's thread has already been told to stop
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }

        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let playing = Arc::clone(&self.playing);
        let mode = Arc::clone(&self.mode);

        let spawned = thread::Builder::new()
            .name("alarm-tone".to_string())
            .spawn(move || run_playback(backend.as_ref(), &config, &playing, &mode));

        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                log::info!("[TonePlayer] Playback started");
                Ok(())
            }
            Err(err) => {
                self.playing.store(false, Ordering::Release);
                let err = AudioError::ThreadSpawn {
                    details: err.to_string(),
                };
                log_audio_error(&err, "start");
                Err(err)
            }
        }
    }

    /// End the playback episode and release the device.
    ///
    /// Safe to call repeatedly, before `start`, or after falling back to
    /// beeps. Blocks until the playback thread exits: at most one block
    /// write, which a stalled device bounds at one second.
    pub fn stop(&mut self) {
        let was_playing = self.playing.swap(false, Ordering::AcqRel);

        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("[TonePlayer] Playback thread panicked");
            }
        }

        if was_playing {
            log::info!("[TonePlayer] Playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode::from_u8(self.mode.load(Ordering::Acquire))
    }
}

impl Drop for TonePlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_playback(
    backend: &dyn OutputBackend,
    config: &AudioConfig,
    playing: &AtomicBool,
    mode: &AtomicU8,
) {
    match backend.open(config) {
        Ok(mut device) => {
            mode.store(PlaybackMode::Tone.as_u8(), Ordering::Release);
            let mut synth = ToneSynth::new(config, device.sample_rate());
            let mut block = vec![0.0_f32; synth.block_frames()];
            log::info!(
                "[TonePlayer] Device open at {} Hz, {} frames per block ({:.1} ms configured)",
                synth.sample_rate(),
                synth.block_frames(),
                config.block_duration_ms()
            );

            while playing.load(Ordering::Acquire) {
                synth.fill(&mut block);
                if let Err(err) = device.write_block(&block) {
                    log_audio_error(&err, "write_block");
                    break;
                }
            }
            // Device released here, before any fallback beeping
            drop(device);
        }
        Err(err) => {
            log::warn!(
                "[TonePlayer] {}. Falling back to discrete beeps.",
                err
            );
        }
    }

    if playing.load(Ordering::Acquire) {
        mode.store(PlaybackMode::Beep.as_u8(), Ordering::Release);
        beep_until_stopped(backend, config, playing);
    }

    mode.store(PlaybackMode::Idle.as_u8(), Ordering::Release);
}

fn beep_until_stopped(backend: &dyn OutputBackend, config: &AudioConfig, playing: &AtomicBool) {
    let interval = Duration::from_millis(config.beep_interval_ms.max(1));

    while playing.load(Ordering::Acquire) {
        backend.beep();

        // park_timeout can wake spuriously; `stop` unparks us
        let deadline = Instant::now() + interval;
        while playing.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{RecordingBackend, SilentBackend};

    fn test_config() -> AudioConfig {
        AudioConfig {
            block_frames: 64,
            beep_interval_ms: 10,
            ..AudioConfig::default()
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_start_plays_tone_until_stopped() {
        let backend = RecordingBackend::new();
        let stats = backend.stats();
        let mut player = TonePlayer::new(Arc::new(backend), test_config());

        player.start().unwrap();
        assert!(player.is_playing());
        assert!(wait_until(|| stats.blocks() >= 3), "tone blocks should be written");
        assert_eq!(player.mode(), PlaybackMode::Tone);

        player.stop();
        assert!(!player.is_playing());
        assert_eq!(player.mode(), PlaybackMode::Idle);
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.released(), 1, "device must be released on stop");

        let written = stats.blocks();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(stats.blocks(), written, "no blocks after stop");
    }

    #[test]
    fn test_start_is_idempotent() {
        let backend = RecordingBackend::new();
        let stats = backend.stats();
        let mut player = TonePlayer::new(Arc::new(backend), test_config());

        player.start().unwrap();
        player.start().unwrap();
        player.start().unwrap();
        assert!(wait_until(|| stats.blocks() >= 1));
        player.stop();

        assert_eq!(stats.opened(), 1, "only one device per episode");
    }

    #[test]
    fn test_stop_is_idempotent_and_safe_before_start() {
        let mut player = TonePlayer::new(Arc::new(RecordingBackend::new()), test_config());
        player.stop();
        player.stop();
        assert!(!player.is_playing());

        player.start().unwrap();
        player.stop();
        player.stop();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_restart_opens_new_episode() {
        let backend = RecordingBackend::new();
        let stats = backend.stats();
        let mut player = TonePlayer::new(Arc::new(backend), test_config());

        player.start().unwrap();
        player.stop();
        player.start().unwrap();
        assert!(wait_until(|| stats.opened() == 2));
        player.stop();

        assert_eq!(stats.released(), 2);
    }

    #[test]
    fn test_unavailable_device_falls_back_to_beeps() {
        let backend = RecordingBackend::failing_open();
        let stats = backend.stats();
        let mut player = TonePlayer::new(Arc::new(backend), test_config());

        player.start().unwrap();
        assert!(wait_until(|| stats.beeps() >= 2), "fallback should beep");
        assert_eq!(player.mode(), PlaybackMode::Beep);

        player.stop();
        let beeps = stats.beeps();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(stats.beeps(), beeps, "beeping must stop");
        assert_eq!(stats.opened(), 0);
    }

    #[test]
    fn test_device_failure_releases_device_then_beeps() {
        let backend = RecordingBackend::failing_after(2);
        let stats = backend.stats();
        let mut player = TonePlayer::new(Arc::new(backend), test_config());

        player.start().unwrap();
        assert!(wait_until(|| stats.beeps() >= 1));
        assert_eq!(stats.released(), 1, "device released before fallback");
        assert!(player.is_playing());

        player.stop();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_stop_is_prompt_with_long_beep_interval() {
        let config = AudioConfig {
            beep_interval_ms: 60_000,
            ..test_config()
        };
        let mut player = TonePlayer::new(Arc::new(SilentBackend::new()), config);

        player.start().unwrap();
        assert!(wait_until(|| player.mode() == PlaybackMode::Beep));

        let started = Instant::now();
        player.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drop_stops_playback() {
        let backend = RecordingBackend::new();
        let stats = backend.stats();
        {
            let mut player = TonePlayer::new(Arc::new(backend), test_config());
            player.start().unwrap();
            assert!(wait_until(|| stats.opened() == 1));
        }
        assert_eq!(stats.released(), 1);
    }
}
