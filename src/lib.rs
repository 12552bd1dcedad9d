pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod session;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Re-export for convenience
pub use analysis::{AnomalyCategory, AnomalyDetector, AnomalySegment, Classifier, HeuristicClassifier};
pub use audio::{Decoder, FixedDecoder, PcmBuffer, SymphoniaDecoder, Waveform, WaveformExtractor, WaveformSource};
pub use config::AnalysisConfig;
pub use error::{AudioError, Result};
pub use session::RecordingSession;

/// Waveform and anomalies computed for one recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingAnalysis {
    pub waveform: Vec<f64>,
    pub anomalies: Vec<AnomalySegment>,
}

/// Explicitly constructed analysis pipeline: decoder -> waveform -> anomalies
///
/// Holds no state between calls, so one pipeline can serve any number of
/// files, and separate files can be analyzed in parallel.
///
/// # Example
/// ```no_run
/// use sleepscope::{AnalysisConfig, AnalysisPipeline};
/// use std::time::Duration;
///
/// let pipeline = AnalysisPipeline::with_config(AnalysisConfig::default());
/// let analysis = pipeline.analyze("night.m4a", Duration::from_secs(8 * 3600));
/// println!("{} anomalies", analysis.anomalies.len());
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisPipeline<D = SymphoniaDecoder, C = HeuristicClassifier> {
    extractor: WaveformExtractor<D>,
    detector: AnomalyDetector<C>,
}

impl AnalysisPipeline<SymphoniaDecoder, HeuristicClassifier> {
    /// Pipeline with the symphonia decoder and the stub classifier
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self::new(SymphoniaDecoder, HeuristicClassifier, config)
    }
}

impl Default for AnalysisPipeline<SymphoniaDecoder, HeuristicClassifier> {
    fn default() -> Self {
        Self::with_config(AnalysisConfig::default())
    }
}

impl<D: Decoder, C: Classifier> AnalysisPipeline<D, C> {
    pub fn new(decoder: D, classifier: C, config: AnalysisConfig) -> Self {
        Self {
            extractor: WaveformExtractor::new(decoder, config.waveform),
            detector: AnomalyDetector::new(config.detector, classifier),
        }
    }

    /// Settings this pipeline was built with
    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            waveform: self.extractor.config().clone(),
            detector: self.detector.config().clone(),
        }
    }

    /// Envelope with the configured sample count; always full length, values in [0, 1]
    pub fn extract_waveform<P: AsRef<Path>>(&self, path: P) -> Vec<f64> {
        self.extractor.extract(path).into_values()
    }

    /// Envelope with exactly `sample_count` values
    pub fn extract_waveform_with_count<P: AsRef<Path>>(&self, path: P, sample_count: usize) -> Vec<f64> {
        self.extractor.extract_with_count(path, sample_count).into_values()
    }

    /// Anomalies in a waveform previously extracted from `path`
    pub fn detect_anomalies<P: AsRef<Path>>(
        &self,
        path: P,
        waveform: &[f64],
        total_duration: Duration,
    ) -> Vec<AnomalySegment> {
        let anomalies = self.detector.detect(waveform, total_duration);
        info!(
            path = %path.as_ref().display(),
            anomalies = anomalies.len(),
            duration_secs = total_duration.as_secs_f64(),
            "Anomaly detection complete"
        );
        anomalies
    }

    /// Extract the waveform and detect anomalies in one pass
    pub fn analyze<P: AsRef<Path>>(&self, path: P, total_duration: Duration) -> RecordingAnalysis {
        let path = path.as_ref();
        let waveform = self.extractor.extract(path);
        info!(
            path = %path.display(),
            source = ?waveform.source,
            samples = waveform.len(),
            "Waveform extracted"
        );

        let anomalies = self.detect_anomalies(path, &waveform.values, total_duration);
        RecordingAnalysis {
            waveform: waveform.into_values(),
            anomalies,
        }
    }
}

/// Extract a normalized waveform of `sample_count` values from an audio file
///
/// Never fails: undecodable or unreadable files fall back to a byte
/// heuristic or a placeholder envelope.
pub fn extract_waveform<P: AsRef<Path>>(path: P, sample_count: usize) -> Vec<f64> {
    AnalysisPipeline::default().extract_waveform_with_count(path, sample_count)
}

/// Detect anomalies in `waveform` with the default detector policy
pub fn detect_anomalies<P: AsRef<Path>>(
    path: P,
    waveform: &[f64],
    total_duration: Duration,
) -> Vec<AnomalySegment> {
    AnalysisPipeline::default().detect_anomalies(path, waveform, total_duration)
}

/// Run the full analysis on tokio's blocking pool
///
/// Decoding a whole night of audio can take seconds, so async callers should
/// go through here instead of calling the pipeline on a runtime thread.
/// Dropping the returned future abandons the result; the blocking task only
/// touches its own buffers.
pub async fn analyze_recording(
    path: PathBuf,
    total_duration: Duration,
    config: AnalysisConfig,
) -> Result<RecordingAnalysis> {
    tokio::task::spawn_blocking(move || AnalysisPipeline::with_config(config).analyze(&path, total_duration))
        .await
        .map_err(|e| AudioError::TaskJoin(e.to_string()))
}
