//! Configuration parameters for recording analysis

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AudioError, Result};

/// Number of waveform buckets produced when the caller does not ask for a count
pub const DEFAULT_SAMPLE_COUNT: usize = 200;

/// Files above this size are analyzed bucket-by-bucket from disk (10 MiB)
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Full analysis configuration
///
/// Every field has a default, so a JSON file only needs to name the values it
/// overrides:
///
/// ```
/// use sleepscope::AnalysisConfig;
///
/// let config: AnalysisConfig =
///     serde_json::from_str(r#"{ "detector": { "threshold_floor": 0.4 } }"#).unwrap();
/// assert_eq!(config.detector.threshold_floor, 0.4);
/// assert_eq!(config.waveform.sample_count, 200);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub waveform: WaveformConfig,
    pub detector: DetectorConfig,
}

/// Waveform extraction policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Number of buckets in the output envelope (default: 200)
    pub sample_count: usize,

    /// File size in bytes above which the byte fallback streams from disk
    /// instead of loading the whole file (default: 10 MiB)
    pub large_file_threshold: u64,

    /// A decoded PCM envelope whose every bucket is at or below this value is
    /// treated as silence/garbage and rejected (default: 1e-4)
    pub silence_epsilon: f64,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            silence_epsilon: 1e-4,
        }
    }
}

/// Anomaly detection policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Standard deviations above the mean for the dynamic threshold (default: 1.5)
    pub threshold_sigma: f64,

    /// Lower clamp for the dynamic threshold (default: 0.3)
    pub threshold_floor: f64,

    /// Upper clamp for the dynamic threshold (default: 0.9)
    pub threshold_ceiling: f64,

    /// Centered moving-average window, must be odd (default: 3)
    pub smoothing_window: usize,

    /// Consecutive above-threshold samples needed to open a segment (default: 3)
    pub open_after: usize,

    /// Consecutive below-threshold samples needed to close a segment (default: 1)
    pub close_after: usize,

    /// Segments shorter than this many seconds are discarded (default: 1.0)
    pub min_segment_secs: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold_sigma: 1.5,
            threshold_floor: 0.3,
            threshold_ceiling: 0.9,
            smoothing_window: 3,
            open_after: 3,
            close_after: 1,
            min_segment_secs: 1.0,
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AudioError::FileOpen {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let config: AnalysisConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot drive an analysis
    pub fn validate(&self) -> Result<()> {
        if self.waveform.sample_count == 0 {
            return Err(AudioError::InvalidConfig(
                "sample_count must be greater than 0".to_string(),
            ));
        }

        if !(self.waveform.silence_epsilon >= 0.0) {
            return Err(AudioError::InvalidConfig(format!(
                "silence_epsilon must be non-negative, got {}",
                self.waveform.silence_epsilon
            )));
        }

        let d = &self.detector;
        if d.threshold_floor > d.threshold_ceiling {
            return Err(AudioError::InvalidConfig(format!(
                "threshold_floor ({}) must not exceed threshold_ceiling ({})",
                d.threshold_floor, d.threshold_ceiling
            )));
        }

        if d.smoothing_window == 0 || d.smoothing_window % 2 == 0 {
            return Err(AudioError::InvalidConfig(format!(
                "smoothing_window must be a positive odd number, got {}",
                d.smoothing_window
            )));
        }

        if d.open_after == 0 || d.close_after == 0 {
            return Err(AudioError::InvalidConfig(
                "open_after and close_after must be at least 1".to_string(),
            ));
        }

        if !(d.min_segment_secs >= 0.0) {
            return Err(AudioError::InvalidConfig(format!(
                "min_segment_secs must be non-negative, got {}",
                d.min_segment_secs
            )));
        }

        Ok(())
    }
}
