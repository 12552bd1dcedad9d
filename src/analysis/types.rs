use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What kind of sound an anomaly segment is
///
/// Only `Unknown` is produced today. The remaining variants are the stable
/// surface a trained classifier will report through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnomalyCategory {
    #[default]
    Unknown,
    Snoring,
    TeethGrinding,
    NightWaking,
    Coughing,
    Talking,
}

impl AnomalyCategory {
    pub const ALL: [AnomalyCategory; 6] = [
        AnomalyCategory::Unknown,
        AnomalyCategory::Snoring,
        AnomalyCategory::TeethGrinding,
        AnomalyCategory::NightWaking,
        AnomalyCategory::Coughing,
        AnomalyCategory::Talking,
    ];

    /// Name used in persisted sessions
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyCategory::Unknown => "unknown",
            AnomalyCategory::Snoring => "snoring",
            AnomalyCategory::TeethGrinding => "teethGrinding",
            AnomalyCategory::NightWaking => "nightWaking",
            AnomalyCategory::Coughing => "coughing",
            AnomalyCategory::Talking => "talking",
        }
    }
}

impl fmt::Display for AnomalyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stretch of the recording whose energy stayed above the dynamic threshold
///
/// Serializes as `{ startTime, endTime, amplitude, type }` with times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalySegment {
    #[serde(with = "duration_secs")]
    pub start_time: Duration,

    #[serde(with = "duration_secs")]
    pub end_time: Duration,

    /// Largest smoothed waveform value inside the segment, in [0, 1]
    #[serde(rename = "amplitude")]
    pub peak_amplitude: f64,

    #[serde(rename = "type")]
    pub category: AnomalyCategory,
}

impl AnomalySegment {
    pub fn duration(&self) -> Duration {
        self.end_time.saturating_sub(self.start_time)
    }

    pub fn overlaps(&self, other: &AnomalySegment) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}

/// Serde adapter storing a `Duration` as fractional seconds
pub mod duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
