use crate::analysis::types::AnomalyCategory;

/// Assigns a category to a detected segment
///
/// The detector hands over the segment's peak, the full (unsmoothed) waveform
/// and the half-open index range `start..end` the segment covers. Swapping in
/// a learned model only requires another implementation of this trait.
pub trait Classifier: Send + Sync {
    fn classify(&self, peak_amplitude: f64, waveform: &[f64], start: usize, end: usize) -> AnomalyCategory;
}

impl<F> Classifier for F
where
    F: Fn(f64, &[f64], usize, usize) -> AnomalyCategory + Send + Sync,
{
    fn classify(&self, peak_amplitude: f64, waveform: &[f64], start: usize, end: usize) -> AnomalyCategory {
        self(peak_amplitude, waveform, start, end)
    }
}

/// Shape statistics of one segment of the waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentFeatures {
    /// Mean waveform value over the range
    pub average: f64,
    /// Mean absolute difference between neighbouring samples
    pub variation: f64,
    /// 0.6 * peak + 0.4 * average
    pub intensity: f64,
}

impl SegmentFeatures {
    pub fn measure(peak_amplitude: f64, waveform: &[f64], start: usize, end: usize) -> Self {
        let end = end.min(waveform.len());
        let start = start.min(end);
        let window = &waveform[start..end];

        let average = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f64>() / window.len() as f64
        };

        let variation = if window.len() < 2 {
            0.0
        } else {
            window.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (window.len() - 1) as f64
        };

        Self {
            average,
            variation,
            intensity: 0.6 * peak_amplitude + 0.4 * average,
        }
    }
}

/// Amplitude/variation heuristic with no trained model behind it
///
/// The branches mark where sustained loud sound, choppy mid-level sound and
/// everything else would be told apart. None of them has been validated
/// against labelled recordings, so every branch reports `Unknown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    const HIGH_INTENSITY: f64 = 0.7;
    const MEDIUM_INTENSITY: f64 = 0.4;
    const LOW_VARIATION: f64 = 0.1;
    const HIGH_VARIATION: f64 = 0.2;
}

impl Classifier for HeuristicClassifier {
    fn classify(&self, peak_amplitude: f64, waveform: &[f64], start: usize, end: usize) -> AnomalyCategory {
        let features = SegmentFeatures::measure(peak_amplitude, waveform, start, end);

        if features.intensity > Self::HIGH_INTENSITY && features.variation < Self::LOW_VARIATION {
            // Sustained and loud
            AnomalyCategory::Unknown
        } else if features.intensity > Self::MEDIUM_INTENSITY && features.variation > Self::HIGH_VARIATION {
            // Mid-level and choppy
            AnomalyCategory::Unknown
        } else {
            AnomalyCategory::Unknown
        }
    }
}
