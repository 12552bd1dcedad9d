// src/analysis/detector.rs

use std::time::Duration;
use tracing::debug;

use crate::analysis::classifier::{Classifier, HeuristicClassifier};
use crate::analysis::types::AnomalySegment;
use crate::config::DetectorConfig;

/// Finds stretches of a waveform where energy stays unusually high
///
/// The threshold is derived from the waveform's own statistics
/// (`mean + k * stddev`, clamped), the waveform is smoothed with a centered
/// moving average, and a debounced scan opens a segment after `open_after`
/// consecutive samples above the threshold and closes it after
/// `close_after` samples below. Segments shorter than the configured minimum
/// are dropped; the rest are classified and returned in chronological order.
///
/// # Example
/// ```
/// use sleepscope::analysis::AnomalyDetector;
/// use std::time::Duration;
///
/// let mut waveform = vec![0.1; 90];
/// waveform.extend(vec![0.95; 10]);
/// waveform.extend(vec![0.1; 100]);
///
/// let anomalies = AnomalyDetector::default().detect(&waveform, Duration::from_secs(200));
/// assert_eq!(anomalies.len(), 1);
/// assert_eq!(anomalies[0].start_time, Duration::from_secs(90));
/// ```
#[derive(Debug, Clone)]
pub struct AnomalyDetector<C = HeuristicClassifier> {
    config: DetectorConfig,
    classifier: C,
}

impl Default for AnomalyDetector<HeuristicClassifier> {
    fn default() -> Self {
        Self::new(DetectorConfig::default(), HeuristicClassifier)
    }
}

/// Index range of a candidate before it is converted to time
#[derive(Debug, Clone, Copy, PartialEq)]
struct Run {
    start: usize,
    /// Exclusive; `None` when the run is still open at the end of the waveform
    end: Option<usize>,
    peak: f64,
}

impl<C: Classifier> AnomalyDetector<C> {
    pub fn new(config: DetectorConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect anomalies in `waveform`, which spans `total_duration` of audio
    pub fn detect(&self, waveform: &[f64], total_duration: Duration) -> Vec<AnomalySegment> {
        if waveform.is_empty() {
            return Vec::new();
        }

        // No time axis to place segments on
        if total_duration.is_zero() {
            debug!(samples = waveform.len(), "Zero-length recording, no anomalies");
            return Vec::new();
        }

        let threshold = dynamic_threshold(waveform, &self.config);
        let smoothed = smooth(waveform, self.config.smoothing_window);
        let runs = self.scan(&smoothed, threshold);

        let seconds_per_sample = total_duration.as_secs_f64() / waveform.len() as f64;
        let min_duration = self.config.min_segment_secs;

        let anomalies: Vec<AnomalySegment> = runs
            .into_iter()
            .filter_map(|run| {
                let start_secs = run.start as f64 * seconds_per_sample;
                let end_secs = match run.end {
                    Some(end) => end as f64 * seconds_per_sample,
                    None => total_duration.as_secs_f64(),
                };

                if end_secs - start_secs < min_duration {
                    return None;
                }

                let end_index = run.end.unwrap_or(waveform.len());
                let category = self.classifier.classify(run.peak, waveform, run.start, end_index);

                let end_time = match run.end {
                    Some(_) => Duration::try_from_secs_f64(end_secs)
                        .unwrap_or(total_duration)
                        .min(total_duration),
                    None => total_duration,
                };

                Some(AnomalySegment {
                    start_time: Duration::try_from_secs_f64(start_secs)
                        .unwrap_or(Duration::ZERO)
                        .min(end_time),
                    end_time,
                    peak_amplitude: run.peak,
                    category,
                })
            })
            .collect();

        debug!(
            threshold,
            seconds_per_sample,
            anomalies = anomalies.len(),
            "Anomaly detection finished"
        );

        anomalies
    }

    /// Debounced left-to-right scan over the smoothed waveform
    fn scan(&self, smoothed: &[f64], threshold: f64) -> Vec<Run> {
        let open_after = self.config.open_after.max(1);
        let close_after = self.config.close_after.max(1);

        let mut runs = Vec::new();
        let mut above = 0usize;
        let mut below = 0usize;
        let mut current: Option<Run> = None;

        for (i, &value) in smoothed.iter().enumerate() {
            if value > threshold {
                above += 1;
                below = 0;

                match current.as_mut() {
                    Some(run) => run.peak = run.peak.max(value),
                    None if above >= open_after => {
                        // Start at the first of the samples that triggered the opening
                        let start = i + 1 - open_after;
                        let peak = smoothed[start..=i].iter().copied().fold(0.0, f64::max);
                        current = Some(Run { start, end: None, peak });
                    }
                    None => {}
                }
            } else {
                below += 1;
                above = 0;

                if below >= close_after {
                    if let Some(mut run) = current.take() {
                        run.end = Some(i);
                        runs.push(run);
                    }
                }
            }
        }

        // Still open at the end: it runs to the end of the recording
        if let Some(run) = current {
            runs.push(run);
        }

        runs
    }
}

/// `clamp(mean + k * stddev, floor, ceiling)` over the waveform
///
/// Within `[threshold_floor, threshold_ceiling]` for any validated config.
/// An inverted pair resolves to the ceiling and a NaN bound is ignored.
pub fn dynamic_threshold(waveform: &[f64], config: &DetectorConfig) -> f64 {
    let (mean, std_dev) = mean_std(waveform);
    let raw = mean + config.threshold_sigma * std_dev;

    if raw.is_nan() {
        return config.threshold_floor;
    }
    raw.max(config.threshold_floor).min(config.threshold_ceiling)
}

/// Population mean and standard deviation
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Centered moving average; near the edges only the samples that exist are averaged
pub fn smooth(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    if half == 0 {
        return values.to_vec();
    }

    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            let slice = &values[lo..hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
