// src/audio/waveform.rs

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, warn};

use crate::audio::decoder::Decoder;
use crate::audio::types::{PcmBuffer, Waveform, WaveformSource};
use crate::config::WaveformConfig;
use crate::error::{AudioError, Result};

/// Unsigned 8-bit midpoint; raw bytes are measured as distance from it
const BYTE_MIDPOINT: i16 = 128;

/// Weights of RMS and peak in the byte amplitude proxy
const BYTE_RMS_WEIGHT: f64 = 0.7;
const BYTE_PEAK_WEIGHT: f64 = 0.3;

/// Turns a recording into a fixed-length normalized amplitude envelope
///
/// Extraction never fails. The steps are tried in order and the first one
/// that yields data wins:
///
/// 1. Decode to PCM and take the RMS of each bucket of samples. An envelope
///    that is silent everywhere is rejected as garbage.
/// 2. Measure the raw file bytes around the unsigned midpoint. Files larger
///    than the configured threshold are read one bucket at a time, so peak
///    memory is bounded by the bucket size rather than the file size.
/// 3. Synthesize a deterministic placeholder from the file size.
///
/// Every path ends by scaling the envelope so its peak is 1.0.
///
/// # Example
/// ```no_run
/// use sleepscope::audio::{SymphoniaDecoder, WaveformExtractor};
/// use sleepscope::config::WaveformConfig;
///
/// let extractor = WaveformExtractor::new(SymphoniaDecoder, WaveformConfig::default());
/// let waveform = extractor.extract("night.m4a");
/// assert_eq!(waveform.len(), 200);
/// ```
#[derive(Debug, Clone)]
pub struct WaveformExtractor<D> {
    decoder: D,
    config: WaveformConfig,
}

impl<D: Decoder> WaveformExtractor<D> {
    pub fn new(decoder: D, config: WaveformConfig) -> Self {
        Self { decoder, config }
    }

    pub fn config(&self) -> &WaveformConfig {
        &self.config
    }

    /// Extract an envelope with the configured number of buckets
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Waveform {
        self.extract_with_count(path, self.config.sample_count)
    }

    /// Extract an envelope of exactly `sample_count` buckets
    pub fn extract_with_count<P: AsRef<Path>>(&self, path: P, sample_count: usize) -> Waveform {
        let path = path.as_ref();

        if sample_count == 0 {
            warn!(path = %path.display(), "Zero waveform samples requested");
            return Waveform {
                values: Vec::new(),
                source: WaveformSource::Placeholder,
            };
        }

        match self.decoder.decode(path) {
            Ok(pcm) => match pcm_envelope(&pcm, sample_count, self.config.silence_epsilon) {
                Some(values) => {
                    debug!(path = %path.display(), samples = pcm.samples.len(), "Waveform extracted from PCM");
                    return finish(values, WaveformSource::Pcm);
                }
                None => warn!(path = %path.display(), "Decoded PCM is silent, using byte heuristic"),
            },
            Err(e) => warn!(path = %path.display(), error = %e, "Decode failed, using byte heuristic"),
        }

        match byte_envelope(path, sample_count, self.config.large_file_threshold) {
            Ok(values) => finish(values, WaveformSource::ByteHeuristic),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "File unreadable, using placeholder waveform");
                let file_size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                finish(placeholder_envelope(file_size, sample_count), WaveformSource::Placeholder)
            }
        }
    }
}

fn finish(values: Vec<f64>, source: WaveformSource) -> Waveform {
    Waveform {
        values: normalize(values),
        source,
    }
}

/// Scale so the largest bucket is 1.0 and clamp everything into [0, 1]
pub fn normalize(mut values: Vec<f64>) -> Vec<f64> {
    let max = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);

    for v in values.iter_mut() {
        let scaled = if !v.is_finite() {
            0.0
        } else if max > 0.0 {
            *v / max
        } else {
            *v
        };
        *v = scaled.clamp(0.0, 1.0);
    }

    values
}

/// RMS envelope of 16-bit PCM, `None` when every bucket is at or below `epsilon`
///
/// Bucket size is ceil(total / sample_count), so trailing buckets may be
/// short or empty.
pub fn pcm_envelope(pcm: &PcmBuffer, sample_count: usize, epsilon: f64) -> Option<Vec<f64>> {
    let total = pcm.samples.len();
    if total == 0 || sample_count == 0 {
        return None;
    }

    let bucket = total.div_ceil(sample_count);
    let values: Vec<f64> = (0..sample_count)
        .map(|i| {
            let start = (i * bucket).min(total);
            let end = (start + bucket).min(total);
            rms(&pcm.samples[start..end])
        })
        .collect();

    if values.iter().all(|&v| v <= epsilon) {
        return None;
    }

    Some(values)
}

fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples
        .iter()
        .map(|&s| {
            let x = s as f64 / PcmBuffer::FULL_SCALE;
            x * x
        })
        .sum();

    (sum_sq / samples.len() as f64).sqrt()
}

/// Bytes per bucket for the byte heuristic; at least one so tiny files still register
fn byte_bucket_len(file_size: u64, sample_count: usize) -> u64 {
    (file_size / sample_count as u64).max(1)
}

/// Amplitude proxy for a run of raw bytes: 0.7 * RMS + 0.3 * peak of |byte - 128|, scaled by 128
pub fn byte_amplitude(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }

    let mut sum_sq = 0.0;
    let mut peak: i16 = 0;
    for &b in bytes {
        let d = (b as i16 - BYTE_MIDPOINT).abs();
        sum_sq += (d as f64) * (d as f64);
        peak = peak.max(d);
    }

    let scale = BYTE_MIDPOINT as f64;
    let rms = (sum_sq / bytes.len() as f64).sqrt() / scale;
    BYTE_RMS_WEIGHT * rms + BYTE_PEAK_WEIGHT * (peak as f64 / scale)
}

/// Byte heuristic over a file, choosing whole-file or per-bucket reads by size
fn byte_envelope(path: &Path, sample_count: usize, large_file_threshold: u64) -> Result<Vec<f64>> {
    let path_str = path.to_string_lossy().to_string();
    let open_err = |e: io::Error| AudioError::FileOpen {
        path: path_str.clone(),
        source: e,
    };

    let file_size = fs::metadata(path).map_err(open_err)?.len();

    if file_size > large_file_threshold {
        debug!(path = %path_str, file_size, "Streaming byte heuristic");
        let mut file = File::open(path).map_err(open_err)?;
        Ok(byte_envelope_streaming(&mut file, file_size, sample_count)?)
    } else {
        let bytes = fs::read(path).map_err(open_err)?;
        Ok(byte_envelope_in_memory(&bytes, sample_count))
    }
}

/// Byte heuristic over a buffer already in memory
pub fn byte_envelope_in_memory(bytes: &[u8], sample_count: usize) -> Vec<f64> {
    let size = bytes.len() as u64;
    let bucket = byte_bucket_len(size, sample_count);

    (0..sample_count as u64)
        .map(|i| {
            let start = i * bucket;
            if start >= size {
                return 0.0;
            }
            let end = (start + bucket).min(size);
            byte_amplitude(&bytes[start as usize..end as usize])
        })
        .collect()
}

/// Byte heuristic that seeks to each bucket and reads only that range
///
/// Holds a single bucket-sized buffer regardless of `size`.
pub fn byte_envelope_streaming<R: Read + Seek>(
    reader: &mut R,
    size: u64,
    sample_count: usize,
) -> io::Result<Vec<f64>> {
    let bucket = byte_bucket_len(size, sample_count);
    let mut buf = vec![0u8; bucket.min(size) as usize];
    let mut values = Vec::with_capacity(sample_count);

    for i in 0..sample_count as u64 {
        let start = i * bucket;
        if start >= size {
            values.push(0.0);
            continue;
        }

        let len = bucket.min(size - start) as usize;
        reader.seek(SeekFrom::Start(start))?;
        reader.read_exact(&mut buf[..len])?;
        values.push(byte_amplitude(&buf[..len]));
    }

    Ok(values)
}

/// Non-signal stand-in so callers always have something to render
///
/// A rising ramp with a small periodic wobble whose phase depends on the
/// file size. Carries no information about the recording.
pub fn placeholder_envelope(file_size: u64, sample_count: usize) -> Vec<f64> {
    let phase = (file_size % 1000) as f64 / 1000.0 * std::f64::consts::TAU;

    (0..sample_count)
        .map(|i| {
            let ramp = 0.2 + 0.6 * (i + 1) as f64 / sample_count as f64;
            let wobble = 0.05 * (i as f64 * 0.35 + phase).sin();
            (ramp + wobble).max(0.0)
        })
        .collect()
}
