use thiserror::Error;

/// All possible errors that can occur while analyzing a recording
///
/// The public analysis entry points never return these: decoder and I/O
/// failures are absorbed by the waveform fallback cascade. They surface from
/// the decoders, configuration loading and session serialization.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to open or read the audio file from disk
    #[error("Failed to open audio file '{path}': {source}")]
    FileOpen {
        path: String,
        source: std::io::Error,
    },

    /// The audio format is not supported by the decoder
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Error occurred while decoding the audio data
    #[error("Audio decoding failed: {0}")]
    DecodeFailed(String),

    /// The decoded stream uses a sample width we cannot map onto 16-bit PCM
    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// Configuration values that cannot drive an analysis
    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from hound WAV reader
    #[error("Hound WAV error: {0}")]
    Hound(#[from] hound::Error),

    /// Session or configuration JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The blocking analysis task panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    TaskJoin(String),
}

/// Convenient Result type that uses our AudioError
pub type Result<T> = std::result::Result<T, AudioError>;
