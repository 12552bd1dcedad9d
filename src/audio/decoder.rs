// src/audio/decoder.rs

use hound::{SampleFormat, WavReader};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::audio::types::{AudioInfo, PcmBuffer};
use crate::error::{AudioError, Result};

/// Anything that can turn an audio file into 16-bit PCM
///
/// Failure is an expected outcome: the waveform extractor answers it by
/// falling back to the byte heuristic, so implementations should return an
/// error rather than panic on formats they do not handle.
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<PcmBuffer>;
}

/// Decoder backed by symphonia, with a hound fast path for WAV files
///
/// Supports: MP3, FLAC, WAV, OGG Vorbis, AAC, and more via symphonia
///
/// # Example
/// ```no_run
/// use sleepscope::audio::{Decoder, SymphoniaDecoder};
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pcm = SymphoniaDecoder.decode(Path::new("night.m4a"))?;
/// println!("Loaded {:?} of audio at {} Hz", pcm.duration(), pcm.sample_rate);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl Decoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<PcmBuffer> {
        if is_wav_file(path) {
            match decode_wav_direct(path) {
                Ok(pcm) => return Ok(pcm),
                Err(e) => debug!(path = %path.display(), error = %e, "WAV fast path failed, probing with symphonia"),
            }
        }

        decode_with_symphonia(path)
    }
}

/// Deterministic decoder for tests: always yields the same buffer, or always fails
#[derive(Debug, Clone, Default)]
pub struct FixedDecoder {
    pcm: Option<PcmBuffer>,
}

impl FixedDecoder {
    pub fn returning(pcm: PcmBuffer) -> Self {
        Self { pcm: Some(pcm) }
    }

    pub fn failing() -> Self {
        Self { pcm: None }
    }
}

impl Decoder for FixedDecoder {
    fn decode(&self, _path: &Path) -> Result<PcmBuffer> {
        self.pcm
            .clone()
            .ok_or_else(|| AudioError::UnsupportedFormat("decoder configured to fail".to_string()))
    }
}

/// Check if a file is a WAV file by examining its extension
fn is_wav_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Read a WAV file straight into 16-bit samples without going through a codec
fn decode_wav_direct(path: &Path) -> Result<PcmBuffer> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f32_to_i16))
            .collect::<std::result::Result<Vec<i16>, _>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if bits == 0 || bits > 32 {
                return Err(AudioError::UnsupportedBitDepth(bits));
            }

            reader
                .samples::<i32>()
                .map(|s| s.map(|s| rescale_to_i16(s, bits)))
                .collect::<std::result::Result<Vec<i16>, _>>()?
        }
    };

    Ok(PcmBuffer::new(samples, spec.sample_rate, spec.channels))
}

fn decode_with_symphonia(path: &Path) -> Result<PcmBuffer> {
    let path_str = path.to_string_lossy().to_string();

    // Open the file
    let file = File::open(path).map_err(|e| AudioError::FileOpen {
        path: path_str.clone(),
        source: e,
    })?;

    // Create a media source stream (buffered reader)
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help symphonia detect the format
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    // Find the default audio track (skip video/subtitle tracks)
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeFailed("No audio track found in file".to_string()))?;

    let track_id = track.id;

    // Metadata may omit these for some streams; the first decoded packet fills them in
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut codec = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeFailed(format!("Failed to create decoder: {}", e)))?;

    let mut samples: Vec<i16> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break, // End of stream
        };

        // Skip packets from other tracks (e.g., video, album art)
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match codec.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt packet is recoverable; keep going with the rest of the stream
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!(path = %path_str, error = msg, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(AudioError::DecodeFailed(format!("Decode error: {}", e))),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        // Reuse the interleaving buffer unless this packet is larger than any before it
        let needed = decoded.capacity() as u64;
        let too_small = sample_buf
            .as_ref()
            .map_or(true, |buf| (buf.capacity() as u64) < needed * spec.channels.count() as u64);
        if too_small {
            sample_buf = Some(SampleBuffer::<i16>::new(needed, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| AudioError::DecodeFailed("Sample rate not found".to_string()))?;
    let channels = channels
        .ok_or_else(|| AudioError::DecodeFailed("Could not determine channel count".to_string()))?;

    Ok(PcmBuffer::new(samples, sample_rate, channels))
}

/// Get audio file metadata without decoding all samples
///
/// Much faster than a full decode for just getting duration/info
///
/// # Example
/// ```no_run
/// use sleepscope::audio::get_audio_info;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let info = get_audio_info("night.m4a")?;
/// println!("Duration: {:.2} hours", info.duration_seconds / 3600.0);
/// println!("Format: {}", info.format);
/// # Ok(())
/// # }
/// ```
pub fn get_audio_info<P: AsRef<Path>>(path: P) -> Result<AudioInfo> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().to_string();

    let file = File::open(path).map_err(|e| AudioError::FileOpen {
        path: path_str.clone(),
        source: e,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to probe: {}", e)))?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeFailed("No audio track".to_string()))?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    // Calculate duration from frame count
    let duration_seconds = if let (Some(n_frames), Some(sr)) =
        (track.codec_params.n_frames, track.codec_params.sample_rate)
    {
        n_frames as f64 / sr as f64
    } else {
        0.0
    };

    let format_name = symphonia::default::get_codecs()
        .get_codec(track.codec_params.codec)
        .map(|d| d.short_name.to_string())
        .unwrap_or_else(|| format!("{:?}", track.codec_params.codec));

    Ok(AudioInfo {
        duration_seconds,
        sample_rate,
        channels,
        format: format_name,
        bit_depth: track.codec_params.bits_per_sample.map(|b| b as u16),
    })
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Map an integer sample of `bits` width onto the 16-bit range
fn rescale_to_i16(sample: i32, bits: u16) -> i16 {
    if bits > 16 {
        (sample >> (bits - 16)) as i16
    } else {
        (sample << (16 - bits)) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use std::path::PathBuf;

    fn write_wav(name: &str, spec: WavSpec, write: impl FnOnce(&mut WavWriter<std::io::BufWriter<File>>)) -> PathBuf {
        let path = std::env::temp_dir().join(format!("sleepscope_decoder_{}.wav", name));
        let mut writer = WavWriter::create(&path, spec).expect("Failed to create WAV");
        write(&mut writer);
        writer.finalize().expect("Failed to finalize WAV");
        path
    }

    #[test]
    fn test_decode_16bit_wav() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let path = write_wav("int16", spec, |w| {
            for i in 0..800i32 {
                w.write_sample((i * 10) as i16).unwrap();
            }
        });

        let pcm = SymphoniaDecoder.decode(&path).expect("Failed to decode");
        assert_eq!(pcm.channels, 2);
        assert_eq!(pcm.sample_rate, 8000);
        assert_eq!(pcm.samples.len(), 800);
        assert_eq!(pcm.samples[3], 30);
        assert_eq!(pcm.frame_count(), 400);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_symphonia_path_matches_wav_fast_path() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        // Long enough to span several packets
        let path = write_wav("symphonia", spec, |w| {
            for i in 0..20000i32 {
                w.write_sample(((i * 37) % 30000 - 15000) as i16).unwrap();
            }
        });

        let direct = decode_wav_direct(&path).expect("hound decode failed");
        let decoded = decode_with_symphonia(&path).expect("symphonia decode failed");

        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.samples.len(), 20000);
        assert_eq!(decoded, direct);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_decode_float_wav_scales_to_i16() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let path = write_wav("float", spec, |w| {
            w.write_sample(1.0f32).unwrap();
            w.write_sample(-1.0f32).unwrap();
            w.write_sample(0.0f32).unwrap();
        });

        let pcm = SymphoniaDecoder.decode(&path).expect("Failed to decode");
        assert_eq!(pcm.samples, vec![i16::MAX, -i16::MAX, 0]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_decode_24bit_wav_is_rescaled() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let path = write_wav("int24", spec, |w| {
            w.write_sample(8_388_607i32).unwrap();
            w.write_sample(-8_388_608i32).unwrap();
        });

        let pcm = SymphoniaDecoder.decode(&path).expect("Failed to decode");
        assert_eq!(pcm.samples, vec![32767, -32768]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_decode_garbage_fails() {
        let path = std::env::temp_dir().join("sleepscope_decoder_garbage.m4a");
        std::fs::write(&path, vec![0x5au8; 4096]).unwrap();

        assert!(SymphoniaDecoder.decode(&path).is_err());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_decode_missing_file() {
        let result = SymphoniaDecoder.decode(Path::new("/nonexistent/path/night.m4a"));
        assert!(matches!(result, Err(AudioError::FileOpen { .. })));
    }

    #[test]
    fn test_get_audio_info_wav() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 4000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let path = write_wav("info", spec, |w| {
            for _ in 0..8000 {
                w.write_sample(0i16).unwrap();
            }
        });

        let info = get_audio_info(&path).expect("Failed to probe");
        assert_eq!(info.sample_rate, 4000);
        assert_eq!(info.channels, 1);
        assert!((info.duration_seconds - 2.0).abs() < 1e-9);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_fixed_decoder() {
        let pcm = PcmBuffer::new(vec![1, 2, 3], 8000, 1);
        let decoded = FixedDecoder::returning(pcm.clone())
            .decode(Path::new("ignored"))
            .unwrap();
        assert_eq!(decoded, pcm);

        assert!(FixedDecoder::failing().decode(Path::new("ignored")).is_err());
    }

    #[test]
    fn test_rescale_to_i16() {
        assert_eq!(rescale_to_i16(127, 8), 127 << 8);
        assert_eq!(rescale_to_i16(-32768, 16), -32768);
        assert_eq!(rescale_to_i16(i32::MAX, 32), i16::MAX);
    }
}
