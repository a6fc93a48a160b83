//! CPAL-based output backend for desktop platforms (Linux, macOS, Windows)
//!
//! The stream callback drains a lock-free SPSC ring that `write_block` fills
//! from the playback thread. The ring holds a few blocks of lookahead, so the
//! writer is paced by the device clock: once the ring is full, `write_block`
//! waits for the callback to consume samples.

use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::AudioConfig;
use crate::error::AudioError;

use super::{OutputBackend, OutputDevice};

/// A full ring that does not drain for this long means the stream stalled.
const STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Default-device backend built on cpal.
#[derive(Debug, Default)]
pub struct CpalBackend {
    _unit: (),
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputBackend for CpalBackend {
    fn open(&self, config: &AudioConfig) -> Result<Box<dyn OutputDevice>, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::ResourceUnavailable {
                reason: "No default output device found".to_string(),
            })?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::ResourceUnavailable {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat {
                format: format!("{:?}", supported.sample_format()),
            });
        }

        let stream_config: cpal::StreamConfig = supported.into();
        let channels_count = stream_config.channels.max(1) as usize;
        let sample_rate = stream_config.sample_rate.0;

        let capacity = config.block_frames.max(1) * config.ring_blocks.max(2);
        let (producer, consumer) = RingBuffer::<f32>::new(capacity);

        let stream = build_stream(&device, &stream_config, channels_count, consumer)?;
        stream.play().map_err(|e| AudioError::ResourceUnavailable {
            reason: format!("Output start failed: {}", e),
        })?;

        log::info!(
            "[TonePlayer] Opened output device {:?} at {} Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            channels_count
        );

        let block_ms = (config.block_frames as u64 * 1000) / sample_rate.max(1) as u64;
        Ok(Box::new(CpalDevice {
            _stream: stream,
            producer,
            sample_rate,
            poll_interval: Duration::from_millis((block_ms / 4).max(1)),
        }))
    }
}

fn build_stream(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    channels_count: usize,
    mut consumer: Consumer<f32>,
) -> Result<cpal::Stream, AudioError> {
    let err_fn = |err| log::error!("[TonePlayer] Output stream error: {}", err);

    device
        .build_output_stream(
            stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels_count) {
                    // Underrun plays silence rather than stale samples
                    let sample = consumer.pop().unwrap_or(0.0);
                    for slot in frame.iter_mut() {
                        *slot = sample;
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::ResourceUnavailable {
            reason: format!("{:?}", e),
        })
}

/// Open cpal stream plus the writer half of its sample ring.
///
/// Dropping this stops the stream and releases the device.
struct CpalDevice {
    _stream: cpal::Stream,
    producer: Producer<f32>,
    sample_rate: u32,
    poll_interval: Duration,
}

impl OutputDevice for CpalDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn write_block(&mut self, block: &[f32]) -> Result<(), AudioError> {
        let mut written = 0;
        let mut last_progress = Instant::now();

        while written < block.len() {
            let free = self.producer.slots();
            if free == 0 {
                if last_progress.elapsed() > STALL_TIMEOUT {
                    return Err(AudioError::StreamFailure {
                        details: "output stream stopped consuming samples".to_string(),
                    });
                }
                thread::sleep(self.poll_interval);
                continue;
            }

            let end = (written + free).min(block.len());
            for &sample in &block[written..end] {
                // Cannot fail: at most `free` samples are pushed
                let _ = self.producer.push(sample);
            }
            written = end;
            last_progress = Instant::now();
        }

        Ok(())
    }
}
