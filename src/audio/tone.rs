//! Tone synthesizer - continuous frequency-modulated alarm warble
//!
//! Generates the alarm tone block by block:
//! - Sine carrier whose frequency is swept by a low-frequency sine
//!   (880Hz ± 40Hz at 2Hz by default)
//! - Fixed amplitude below full scale, so no clipping
//! - Carrier and modulator phases are integrated per sample and carried
//!   across blocks, so block boundaries never click
//!
//! A synthesizer is an infinite iterator of blocks. `reset()` starts a fresh
//! phase, used when a new playback episode begins after a snooze.

use std::f64::consts::TAU;

use crate::config::AudioConfig;

/// Frequency-modulated sine generator.
#[derive(Debug, Clone)]
pub struct ToneSynth {
    sample_rate: f64,
    block_frames: usize,
    base_frequency: f64,
    modulation_depth: f64,
    modulation_rate: f64,
    amplitude: f32,
    /// Carrier phase in radians, kept in [0, TAU)
    carrier_phase: f64,
    /// Modulator phase in radians, kept in [0, TAU)
    modulator_phase: f64,
}

impl ToneSynth {
    /// Create a synthesizer producing blocks at `sample_rate`.
    ///
    /// The sample rate is passed separately because the device may run at
    /// a different rate than the configured one.
    pub fn new(config: &AudioConfig, sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1) as f64,
            block_frames: config.block_frames.max(1),
            base_frequency: config.base_frequency_hz as f64,
            modulation_depth: config.modulation_depth_hz as f64,
            modulation_rate: config.modulation_rate_hz as f64,
            amplitude: config.amplitude.clamp(0.0, 1.0),
            carrier_phase: 0.0,
            modulator_phase: 0.0,
        }
    }

    pub fn block_frames(&self) -> usize {
        self.block_frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    /// Restart from zero phase (new playback episode).
    pub fn reset(&mut self) {
        self.carrier_phase = 0.0;
        self.modulator_phase = 0.0;
    }

    /// Instantaneous carrier frequency at the current modulator phase.
    #[inline]
    fn instantaneous_frequency(&self) -> f64 {
        self.base_frequency + self.modulation_depth * self.modulator_phase.sin()
    }

    /// Fill `out` with the next samples of the tone.
    ///
    /// Works for any slice length; phases continue where the previous call
    /// stopped.
    pub fn fill(&mut self, out: &mut [f32]) {
        let modulator_step = TAU * self.modulation_rate / self.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.carrier_phase.sin() as f32 * self.amplitude;

            let carrier_step = TAU * self.instantaneous_frequency() / self.sample_rate;
            self.carrier_phase = (self.carrier_phase + carrier_step) % TAU;
            self.modulator_phase = (self.modulator_phase + modulator_step) % TAU;
        }
    }

    /// Allocate and return the next full block.
    pub fn next_block(&mut self) -> Vec<f32> {
        let mut block = vec![0.0_f32; self.block_frames];
        self.fill(&mut block);
        block
    }
}

impl Iterator for ToneSynth {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_block())
    }
}
