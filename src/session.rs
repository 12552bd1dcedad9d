//! Persisted shape of a recording session
//!
//! Capture, listing and storage of sessions live outside this crate. This
//! module only fixes the JSON the analysis output has to round-trip through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::analysis::types::{duration_secs, AnomalySegment};
use crate::error::Result;
use crate::RecordingAnalysis;

/// One overnight recording and whatever analysis has been attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub id: String,

    pub file_path: PathBuf,

    pub start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(rename = "durationSeconds", with = "duration_secs")]
    pub duration: Duration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform: Option<Vec<f64>>,

    #[serde(default)]
    pub anomalies: Vec<AnomalySegment>,
}

impl RecordingSession {
    /// New session with a random id and no analysis attached
    pub fn new<P: AsRef<Path>>(file_path: P, start_time: DateTime<Utc>, duration: Duration) -> Self {
        let end_time = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| start_time.checked_add_signed(d));

        Self {
            id: Uuid::new_v4().to_string(),
            file_path: file_path.as_ref().to_path_buf(),
            start_time,
            end_time,
            duration,
            waveform: None,
            anomalies: Vec::new(),
        }
    }

    /// Attach the output of an analysis run, replacing any earlier one
    pub fn apply(&mut self, analysis: RecordingAnalysis) {
        self.waveform = Some(analysis.waveform);
        self.anomalies = analysis.anomalies;
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
