//! End-to-end checks of waveform extraction and anomaly detection

use hound::{SampleFormat, WavSpec, WavWriter};
use sleepscope::audio::{FixedDecoder, PcmBuffer, WaveformExtractor, WaveformSource};
use sleepscope::config::WaveformConfig;
use sleepscope::{
    detect_anomalies, extract_waveform, AnalysisConfig, AnalysisPipeline, HeuristicClassifier,
    RecordingSession,
};
use std::path::PathBuf;
use std::time::Duration;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sleepscope_it_{}", name))
}

/// Mono 16-bit WAV, quiet hum with loud stretches at the given seconds
fn write_night(name: &str, seconds: u32, loud: &[std::ops::Range<u32>]) -> PathBuf {
    let sample_rate = 2000;
    let path = temp_path(name);
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(&path, spec).expect("Failed to create WAV");
    for i in 0..seconds * sample_rate {
        let second = i / sample_rate;
        let amplitude: i16 = if loud.iter().any(|r| r.contains(&second)) { 25000 } else { 300 };
        let sample = if i % 2 == 0 { amplitude } else { -amplitude };
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().expect("Failed to finalize WAV");

    path
}

#[test]
fn test_waveform_length_and_range_for_any_input() {
    let wav = write_night("range.wav", 20, &[5..7]);
    let garbage = temp_path("range.bin");
    std::fs::write(&garbage, (0..5000u32).map(|i| (i % 256) as u8).collect::<Vec<_>>()).unwrap();
    let empty = temp_path("range_empty.m4a");
    std::fs::write(&empty, b"").unwrap();
    let missing = temp_path("range_missing.m4a");

    for path in [&wav, &garbage, &empty, &missing] {
        for n in [1, 7, 200, 1000] {
            let waveform = extract_waveform(path, n);
            assert_eq!(waveform.len(), n, "Wrong length for {:?}", path);
            assert!(
                waveform.iter().all(|v| (0.0..=1.0).contains(v)),
                "Value out of range for {:?}",
                path
            );
        }
    }

    for path in [&wav, &garbage, &empty] {
        std::fs::remove_file(path).ok();
    }
}

#[test]
fn test_extraction_is_deterministic_and_normalized() {
    let wav = write_night("determinism.wav", 30, &[10..12]);

    let first = extract_waveform(&wav, 200);
    let second = extract_waveform(&wav, 200);

    assert_eq!(first, second);
    assert_eq!(first.iter().copied().fold(0.0, f64::max), 1.0);

    std::fs::remove_file(&wav).ok();
}

#[test]
fn test_wav_night_yields_ordered_anomalies() {
    let wav = write_night("night.wav", 120, &[20..25, 70..74]);
    let pipeline = AnalysisPipeline::default();

    let waveform = pipeline.extract_waveform(&wav);
    let anomalies = pipeline.detect_anomalies(&wav, &waveform, Duration::from_secs(120));

    assert_eq!(anomalies.len(), 2);
    assert!(anomalies[0].start_time <= Duration::from_secs(20));
    assert!(anomalies[0].end_time >= Duration::from_secs(24));
    assert!(anomalies[1].start_time >= anomalies[0].end_time);
    assert!(anomalies[1].start_time <= Duration::from_secs(70));
    for a in &anomalies {
        assert!(a.duration() >= Duration::from_secs(1));
        assert!((0.0..=1.0).contains(&a.peak_amplitude));
    }

    std::fs::remove_file(&wav).ok();
}

#[test]
fn test_silent_pcm_gives_no_anomalies() {
    // Midpoint bytes keep the byte fallback silent as well
    let path = temp_path("silent.raw");
    std::fs::write(&path, vec![128u8; 4096]).unwrap();

    let pipeline = AnalysisPipeline::new(
        FixedDecoder::returning(PcmBuffer::new(vec![0; 48_000], 16_000, 1)),
        HeuristicClassifier,
        AnalysisConfig::default(),
    );

    let waveform = pipeline.extract_waveform(&path);
    assert!(waveform.iter().all(|&v| v == 0.0));
    assert!(pipeline.detect_anomalies(&path, &waveform, Duration::from_secs(3)).is_empty());

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_injected_burst() {
    let mut waveform = vec![0.1; 90];
    waveform.extend(vec![0.95; 10]);
    waveform.extend(vec![0.1; 100]);

    let anomalies = detect_anomalies("burst", &waveform, Duration::from_secs(310));

    assert_eq!(anomalies.len(), 1);
    let seconds_per_sample = 310.0 / 200.0;
    let start = anomalies[0].start_time.as_secs_f64() / seconds_per_sample;
    let end = anomalies[0].end_time.as_secs_f64() / seconds_per_sample;
    assert!((87.0..=93.0).contains(&start), "start index {}", start);
    assert!((97.0..=103.0).contains(&end), "end index {}", end);
}

#[test]
fn test_streaming_and_in_memory_agree() {
    let bytes: Vec<u8> = (0..300_000u32)
        .map(|i| (128.0 + 100.0 * ((i as f64) / 5000.0).sin() * ((i % 7) as f64 / 7.0)) as u8)
        .collect();
    let path = temp_path("straddle.dat");
    std::fs::write(&path, &bytes).unwrap();

    let small = WaveformConfig {
        large_file_threshold: bytes.len() as u64 + 1,
        ..WaveformConfig::default()
    };
    let large = WaveformConfig {
        large_file_threshold: bytes.len() as u64 / 2,
        ..WaveformConfig::default()
    };

    let in_memory = WaveformExtractor::new(FixedDecoder::failing(), small).extract(&path);
    let streamed = WaveformExtractor::new(FixedDecoder::failing(), large).extract(&path);

    assert_eq!(in_memory.source, WaveformSource::ByteHeuristic);
    assert_eq!(streamed.source, WaveformSource::ByteHeuristic);
    assert_eq!(in_memory.values, streamed.values);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_session_carries_analysis() {
    let wav = write_night("session.wav", 60, &[30..33]);
    let pipeline = AnalysisPipeline::default();
    let analysis = pipeline.analyze(&wav, Duration::from_secs(60));
    let expected_anomalies = analysis.anomalies.len();

    let mut session = RecordingSession::new(&wav, chrono::Utc::now(), Duration::from_secs(60));
    session.apply(analysis);

    let restored = RecordingSession::from_json(&session.to_json().unwrap()).unwrap();
    assert_eq!(restored.anomalies.len(), expected_anomalies);
    assert_eq!(restored.waveform.as_ref().map(Vec::len), Some(200));
    assert_eq!(restored.id, session.id);
    assert_eq!(restored.end_time, session.end_time);
    // Times travel as fractional seconds, so compare to the microsecond
    for (a, b) in restored.anomalies.iter().zip(&session.anomalies) {
        assert!((a.start_time.as_secs_f64() - b.start_time.as_secs_f64()).abs() < 1e-6);
        assert!((a.end_time.as_secs_f64() - b.end_time.as_secs_f64()).abs() < 1e-6);
        assert_eq!(a.category, b.category);
    }

    std::fs::remove_file(&wav).ok();
}
