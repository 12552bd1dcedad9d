use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw decoded audio as 16-bit signed PCM
///
/// Samples are stored interleaved: [L, R, L, R, ...] for stereo
/// or [M, M, M, ...] for mono. A buffer is produced once by a decoder,
/// consumed once by the waveform extractor and then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// PCM samples, interleaved by channel
    pub samples: Vec<i16>,

    /// Sample rate in Hz (e.g., 16000, 44100)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl PcmBuffer {
    /// Bit depth of every sample in the buffer
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Largest magnitude a sample can represent, used for normalization
    pub const FULL_SCALE: f64 = 32768.0;

    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Get the number of audio frames (one sample per channel)
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration implied by the sample count
    ///
    /// Zero when the sample rate is unknown.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }
}

/// Metadata about an audio file without loading all samples
///
/// Use this for quick info queries without decoding the entire file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Total duration in seconds, 0.0 when the container does not say
    pub duration_seconds: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Audio format/codec name (e.g., "MP3", "FLAC", "Vorbis")
    pub format: String,

    /// Bit depth if available (e.g., 16, 24)
    pub bit_depth: Option<u16>,
}

impl AudioInfo {
    pub fn duration(&self) -> Duration {
        if self.duration_seconds.is_finite() && self.duration_seconds > 0.0 {
            Duration::from_secs_f64(self.duration_seconds)
        } else {
            Duration::ZERO
        }
    }
}

/// Which step of the extraction cascade produced a waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaveformSource {
    /// RMS envelope of decoded PCM samples
    Pcm,
    /// Amplitude proxy computed from the raw container bytes
    ByteHeuristic,
    /// Synthetic ramp; the file could not be read at all
    Placeholder,
}

/// Fixed-length amplitude envelope normalized into [0.0, 1.0]
///
/// Index order is chronological. The length always equals the requested
/// sample count, whatever the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub values: Vec<f64>,
    pub source: WaveformSource,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest value in the envelope, 0.0 when empty
    pub fn peak(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl AsRef<[f64]> for Waveform {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_duration_stereo() {
        let pcm = PcmBuffer::new(vec![0; 32000], 16000, 2);
        assert_eq!(pcm.frame_count(), 16000);
        assert_eq!(pcm.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_pcm_duration_unknown_rate() {
        let pcm = PcmBuffer::new(vec![0; 100], 0, 1);
        assert_eq!(pcm.duration(), Duration::ZERO);
    }

    #[test]
    fn test_audio_info_rejects_bogus_duration() {
        let info = AudioInfo {
            duration_seconds: f64::NAN,
            sample_rate: 44100,
            channels: 1,
            format: "wav".to_string(),
            bit_depth: Some(16),
        };
        assert_eq!(info.duration(), Duration::ZERO);
    }
}
