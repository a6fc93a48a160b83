//! Configuration management for the alarm engine
//!
//! This module provides runtime configuration loading from JSON files so the
//! tone, escalation thresholds and recommendation endpoint can be tuned
//! without recompilation. Every section has defaults matching the console
//! alarm's historical behavior.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::puzzle::PuzzleKind;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub escalation: EscalationConfig,
    pub recommender: RecommenderConfig,
    pub puzzles: PuzzleConfig,
    pub quotes: QuoteConfig,
}

/// Tone synthesis and playback parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Play the synthesized tone; false selects the silent backend
    pub enabled: bool,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Frames per synthesized block
    pub block_frames: usize,
    /// Carrier centre frequency in Hz
    pub base_frequency_hz: f32,
    /// Peak carrier deviation in Hz
    pub modulation_depth_hz: f32,
    /// Rate of the frequency warble in Hz
    pub modulation_rate_hz: f32,
    /// Output amplitude as a fraction of full scale
    pub amplitude: f32,
    /// Interval between fallback beeps in milliseconds
    pub beep_interval_ms: u64,
    /// Blocks of lookahead buffered between the writer loop and the device
    pub ring_blocks: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 44_100,
            // 1024 frames at 44.1kHz is ~23ms per block
            block_frames: 1024,
            base_frequency_hz: 880.0,
            modulation_depth_hz: 40.0,
            modulation_rate_hz: 2.0,
            amplitude: 0.4,
            beep_interval_ms: 900,
            ring_blocks: 8,
        }
    }
}

impl AudioConfig {
    /// Duration of one synthesized block in milliseconds
    pub fn block_duration_ms(&self) -> f32 {
        self.block_frames as f32 * 1000.0 / self.sample_rate.max(1) as f32
    }
}

/// Local escalation policy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Consecutive wrong answers that raise difficulty
    pub failure_threshold: u32,
    /// Upper bound on a single snooze in minutes
    pub max_snooze_minutes: u64,
    /// Difficulty at the start of every ringing episode
    pub initial_difficulty: u8,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            max_snooze_minutes: 10,
            initial_difficulty: 1,
        }
    }
}

/// Remote recommendation service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 2_000,
        }
    }
}

/// Which challenge kinds the session may serve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    pub kinds: Vec<PuzzleKind>,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            kinds: vec![PuzzleKind::Math],
        }
    }
}

impl PuzzleConfig {
    /// Configured kinds, falling back to math when the list is empty
    pub fn effective_kinds(&self) -> Vec<PuzzleKind> {
        if self.kinds.is_empty() {
            vec![PuzzleKind::Math]
        } else {
            self.kinds.clone()
        }
    }
}

/// Motivational quote source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub path: PathBuf,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/quotes.txt"),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// A missing or malformed file is not an error: a warning is logged and
    /// the defaults are returned.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/alarm_config.json")
    }
}
