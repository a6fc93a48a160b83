//! Output backend abstractions for the tone player.
//!
//! A backend opens one output device per playback episode. The device is
//! owned by the playback thread for its whole life and released when it is
//! dropped, on every exit path.

use std::io::Write;

use crate::config::AudioConfig;
use crate::error::AudioError;

/// An opened playback resource.
///
/// Not required to be `Send`: devices are opened, written and dropped on
/// the playback thread.
pub trait OutputDevice {
    /// Sample rate the device actually runs at.
    fn sample_rate(&self) -> u32;

    /// Queue one block of mono samples, blocking until the device accepts it.
    fn write_block(&mut self, block: &[f32]) -> Result<(), AudioError>;
}

/// Trait implemented by platform audio backends.
pub trait OutputBackend: Send + Sync {
    /// Open the output device for a new playback episode.
    fn open(&self, config: &AudioConfig) -> Result<Box<dyn OutputDevice>, AudioError>;

    /// Emit one discrete audible alert, used when no device can be opened.
    fn beep(&self) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }
}

mod cpal;
pub use self::cpal::CpalBackend;

mod stub;
pub use stub::{RecordingBackend, RecordingStats, SilentBackend};
