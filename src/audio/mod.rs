// src/audio/mod.rs

pub mod decoder;
pub mod types;
pub mod waveform;

// Re-export commonly used items
pub use decoder::{get_audio_info, Decoder, FixedDecoder, SymphoniaDecoder};
pub use types::{AudioInfo, PcmBuffer, Waveform, WaveformSource};
pub use waveform::WaveformExtractor;
