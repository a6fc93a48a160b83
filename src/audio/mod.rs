// Audio module - alarm tone synthesis and playback

pub mod backend;
pub mod player;
pub mod tone;

// Re-export commonly used types for convenience
pub use backend::{CpalBackend, OutputBackend, OutputDevice, RecordingBackend, SilentBackend};
pub use player::{PlaybackMode, TonePlayer};
pub use tone::ToneSynth;
