//! Integration Tests
//!
//! End-to-end tests for the REX decoding pipeline, driven by the mock engine.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use rx2_decoder::decoder::render::BATCH_FRAMES;
use rx2_decoder::host::{AdapterStatus, DecoderExtension, SampleFormat};
use rx2_decoder::sdk::{CreatorInfo, LoopInfo, MockCall, MockEngine, MockLoop, Waveform, REX_PPQ};
use rx2_decoder::{DecodeError, DecoderConfig, RexErrorCode, Rx2Decoder};

/// One beat of 4/4 at 120 BPM: 22050 frames at 44.1 kHz
fn one_beat() -> MockLoop {
    MockLoop::with_info(LoopInfo {
        channels: 2,
        sample_rate: 44100,
        slice_count: 4,
        tempo: 120_000,
        original_tempo: 0,
        ppq_length: REX_PPQ,
        time_sign_numerator: 4,
        time_sign_denominator: 4,
        bit_depth: 24,
    })
}

fn decode(mock: &Arc<MockEngine>, spec: &MockLoop) -> rx2_decoder::Result<Rx2Decoder> {
    Rx2Decoder::from_bytes(mock.clone(), spec.to_file_bytes(), &DecoderConfig::default())
}

// === Length and Rendering ===

#[test]
fn test_reference_loop_length() {
    let mock = Arc::new(MockEngine::new());
    let decoder = decode(&mock, &one_beat()).unwrap();

    assert_eq!(decoder.frames(), 22050);
    assert_eq!(decoder.channels(), 2);
    assert_eq!(decoder.cursor().total_bytes(), 22050 * 2 * 4);
    assert_relative_eq!(decoder.duration_secs(), 0.5);
}

#[test]
fn test_eighth_note_denominator_doubles_length() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.info.time_sign_denominator = 8;
    let decoder = decode(&mock, &spec).unwrap();
    assert_eq!(decoder.frames(), 44100);
}

#[test]
fn test_render_protocol_sequence() {
    let mock = Arc::new(MockEngine::new());
    decode(&mock, &one_beat()).unwrap();

    let calls = mock.calls();
    assert_eq!(calls[0], MockCall::InfoFromBuffer);
    assert_eq!(calls[1], MockCall::Create);

    let start = calls.iter().position(|c| *c == MockCall::StartPreview).unwrap();
    let stop = calls.iter().position(|c| *c == MockCall::StopPreview).unwrap();
    assert_eq!(calls[start - 2], MockCall::SetOutputSampleRate(44100));
    assert_eq!(calls[start - 1], MockCall::SetPreviewTempo(120_000));

    let batches: Vec<usize> = calls[start + 1..stop]
        .iter()
        .map(|c| match c {
            MockCall::RenderBatch {
                frames,
                previewing: true,
                ..
            } => *frames,
            other => panic!("unexpected call during preview: {:?}", other),
        })
        .collect();
    assert_eq!(batches.iter().sum::<usize>(), 22050);
    assert!(batches.iter().all(|&n| n <= BATCH_FRAMES));
    // 22050 = 344 * 64 + 34
    assert_eq!(batches.len(), 345);
    assert_eq!(*batches.last().unwrap(), 34);

    // Flush after stop, then release.
    assert_eq!(
        calls[stop + 1],
        MockCall::RenderBatch {
            frames: BATCH_FRAMES,
            stereo: true,
            previewing: false
        }
    );
    assert_eq!(calls.last(), Some(&MockCall::Destroy));
}

#[test]
fn test_mono_stays_mono() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.info.channels = 1;
    spec.waveform = Waveform::Constant(0.5);
    let decoder = decode(&mock, &spec).unwrap();

    assert_eq!(decoder.channels(), 1);
    assert_eq!(decoder.cursor().total_bytes(), 22050 * 4);
    assert!(mock
        .calls()
        .iter()
        .all(|c| !matches!(c, MockCall::RenderBatch { stereo: true, .. })));
}

#[test]
fn test_output_is_clamped() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.waveform = Waveform::Constant(1.75);
    let decoder = decode(&mock, &spec).unwrap();

    assert!(decoder.pcm().samples().iter().all(|&s| s == 1.0));
    assert_relative_eq!(decoder.pcm().peak(), 1.0);
}

#[test]
fn test_stereo_is_interleaved() {
    let mock = Arc::new(MockEngine::new());
    let decoder = decode(&mock, &one_beat()).unwrap();
    let samples = decoder.pcm().samples();

    // The mock's right channel is 80% of the left.
    for frame in samples.chunks_exact(2).take(100) {
        assert_relative_eq!(frame[1], frame[0] * 0.8, epsilon = 1e-6);
    }
}

// === Failure Paths ===

#[test]
fn test_bad_header_fields_are_corrupt_without_objects() {
    let cases: Vec<Box<dyn Fn(&mut LoopInfo)>> = vec![
        Box::new(|i: &mut LoopInfo| i.channels = 3),
        Box::new(|i: &mut LoopInfo| i.channels = 0),
        Box::new(|i: &mut LoopInfo| i.sample_rate = 0),
        Box::new(|i: &mut LoopInfo| i.sample_rate = 384_000),
        Box::new(|i: &mut LoopInfo| i.ppq_length = 0),
        Box::new(|i: &mut LoopInfo| i.time_sign_denominator = 5),
    ];

    for mutate in cases {
        let mock = Arc::new(MockEngine::new());
        let mut spec = one_beat();
        mutate(&mut spec.info);

        let err = decode(&mock, &spec).unwrap_err();
        assert!(matches!(err, DecodeError::FileCorrupt { .. }), "got {:?}", err);
        assert_eq!(mock.created(), 0);
        assert_eq!(mock.live_handles(), 0);
    }
}

#[test]
fn test_malformed_file_is_corrupt() {
    let mock = Arc::new(MockEngine::new());
    let err = Rx2Decoder::from_bytes(
        mock.clone(),
        b"CAT \x00\x00\x10\x00REX2".to_vec(),
        &DecoderConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, DecodeError::FileCorrupt { .. }));
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_missing_tempo_is_zero_loop_length() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.info.tempo = 0;
    spec.info.original_tempo = 0;

    let err = decode(&mock, &spec).unwrap_err();
    assert!(matches!(err, DecodeError::ZeroLoopLength));
    assert_eq!(err.rex_code(), Some(RexErrorCode::FileHasZeroLoopLength));
    assert_eq!(mock.created(), 0);
}

#[test]
fn test_silent_render_has_no_active_slices() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.waveform = Waveform::Constant(1e-8);

    let err = decode(&mock, &spec).unwrap_err();
    assert!(matches!(err, DecodeError::NoActiveSlices));
    assert_eq!(mock.created(), 1);
    assert_eq!(mock.live_handles(), 0);
    assert_eq!(mock.double_destroys(), 0);
}

#[test]
fn test_batch_failure_releases_object() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.fail_batch_after = Some(10);

    let err = decode(&mock, &spec).unwrap_err();
    assert!(matches!(err, DecodeError::Engine(RexErrorCode::BufferTooSmall)));
    assert_eq!(mock.live_handles(), 0);
    assert_eq!(mock.destroy_calls(), 1);
}

#[test]
fn test_rejected_preview_tempo_is_fatal() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.info.tempo = 500_000;

    let err = decode(&mock, &spec).unwrap_err();
    assert!(matches!(err, DecodeError::Engine(RexErrorCode::InvalidTempo)));
    assert_eq!(mock.live_handles(), 0);
    assert_eq!(mock.destroy_calls(), 1);

    let calls = mock.calls();
    assert!(!calls.contains(&MockCall::StartPreview));
    assert!(!calls.contains(&MockCall::StopPreview));
    assert!(!calls.iter().any(|c| matches!(c, MockCall::RenderBatch { .. })));
}

#[test]
fn test_hung_create_times_out() {
    let mock = Arc::new(MockEngine::new());
    let mut spec = one_beat();
    spec.create_delay_ms = 400;
    let config = DecoderConfig {
        create_timeout_ms: 50,
        ..DecoderConfig::default()
    };

    let started = std::time::Instant::now();
    let err = Rx2Decoder::from_bytes(mock.clone(), spec.to_file_bytes(), &config).unwrap_err();
    assert!(started.elapsed() < Duration::from_millis(350));
    assert!(matches!(err, DecodeError::EngineUnavailable { .. }));
    assert_eq!(
        err.friendly_message(),
        "The format of this file is unknown or the file is corrupt."
    );

    // Never adopted by the caller: the abandoned worker releases it.
    assert!(mock.wait_for_destroys(1, Duration::from_secs(5)));
    assert_eq!(mock.created(), 1);
    assert_eq!(mock.destroy_calls(), 1);
    assert_eq!(mock.live_handles(), 0);
    assert!(!mock.calls().contains(&MockCall::StartPreview));
}

#[test]
fn test_duration_ceiling_from_config() {
    let mock = Arc::new(MockEngine::new());
    let config = DecoderConfig {
        max_duration_secs: 0.25,
        ..DecoderConfig::default()
    };
    let err = Rx2Decoder::from_bytes(mock.clone(), one_beat().to_file_bytes(), &config).unwrap_err();
    assert!(matches!(err, DecodeError::FileCorrupt { .. }));
    assert_eq!(mock.live_handles(), 0);
}

// === Streaming ===

#[test]
fn test_full_read_returns_every_byte_once() {
    let mock = Arc::new(MockEngine::new());
    let mut decoder = decode(&mock, &one_beat()).unwrap();
    let total = decoder.cursor().total_bytes() as usize;

    let cursor = decoder.cursor_mut();
    cursor.seek(0);
    let mut buf = vec![0u8; total];
    assert_eq!(cursor.read(&mut buf), 22050 * 2 * 4);
    assert_eq!(cursor.read(&mut buf), 0);
}

#[test]
fn test_chunked_reads_match_store() {
    let mock = Arc::new(MockEngine::new());
    let decoder = decode(&mock, &one_beat()).unwrap();
    let mut cursor = decoder.new_cursor();

    let mut collected = Vec::new();
    let mut chunk = [0u8; 1000];
    loop {
        let n = cursor.read(&mut chunk);
        if n == 0 {
            break;
        }
        assert_eq!(n % 8, 0);
        collected.extend_from_slice(&chunk[..n]);
    }

    let expected: Vec<u8> = decoder
        .pcm()
        .samples()
        .iter()
        .flat_map(|s| s.to_ne_bytes())
        .collect();
    assert!(collected == expected);
}

#[test]
fn test_seek_to_own_position_is_stable() {
    let mock = Arc::new(MockEngine::new());
    let decoder = decode(&mock, &one_beat()).unwrap();
    let mut cursor = decoder.new_cursor();

    cursor.read(&mut [0u8; 4096]);
    let position = cursor.position_bytes();
    cursor.seek(position as i64);
    assert_eq!(cursor.position_bytes(), position);
    assert_eq!(cursor.available_bytes(), cursor.total_bytes() - position);
}

// === Host Surface ===

#[test]
fn test_host_instance_from_stream() {
    let mock = Arc::new(MockEngine::new());
    let extension = DecoderExtension::new(mock.clone(), DecoderConfig::default());
    let mut spec = one_beat();
    spec.creator = Some(CreatorInfo::from_fields(
        "Loop Maker",
        "(c) Loop Maker",
        "https://loops.example",
        "lm@example.com",
        "Recorded live",
    ));
    let mut stream = Cursor::new(spec.to_file_bytes());

    let mut status = AdapterStatus::from(extension.create_decoder(&mut stream));
    assert!(status.is_valid());

    let stream_info = status.stream_info().unwrap();
    assert_eq!(stream_info.format, SampleFormat::Float32);
    assert_eq!(status.size(), 22050 * 8);
    assert!(status.set_position(-5));
    assert_eq!(status.position(), 0);
    assert!(status.set_position(i64::MAX));
    assert_eq!(status.available_data(), 0);
    assert_eq!(status.read(&mut [0u8; 64]), 0);

    let info = status.file_info().unwrap();
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.artist.as_deref(), Some("Loop Maker"));
    assert_eq!(info.composer, info.artist);
    assert_eq!(info.album_artist, info.artist);
    assert_eq!(
        info.comment.as_deref(),
        Some("Recorded live\nContact: lm@example.com")
    );
    assert_eq!(info.bpm, Some(120));
    assert_eq!(info.file_size, spec.to_file_bytes().len() as u64);
    assert!(info.bitrate_kbps.is_some());
}

#[test]
fn test_original_tempo_used_when_export_tempo_missing() {
    let mock = Arc::new(MockEngine::new());
    let spec = MockLoop {
        // The object reports only the original tempo.
        object_info: Some(LoopInfo {
            tempo: 0,
            original_tempo: 90_000,
            ..one_beat().info
        }),
        ..one_beat()
    };
    let status = AdapterStatus::from(decode(&mock, &spec));
    let info = status.file_info().unwrap();
    assert_eq!(info.bpm, Some(90));

    let decoder = status.decoder().unwrap();
    assert!(decoder.tempo().from_file);
    assert_eq!(decoder.tempo().tempo, 90_000);
}

#[test]
fn test_host_refuses_wave_silently() {
    let mock = Arc::new(MockEngine::new());
    let extension = DecoderExtension::new(mock.clone(), DecoderConfig::default());
    let mut wav = b"RIFF\x00\x10\x00\x00WAVEfmt \x10\x00\x00\x00".to_vec();
    wav.resize(4096, 0);

    let status = AdapterStatus::from(extension.create_decoder(&mut Cursor::new(wav)));
    assert!(!status.is_valid());
    assert_eq!(status.last_error().and_then(|e| e.host_message()), None);
    assert!(mock.calls().is_empty());
}

#[test]
fn test_host_message_for_invalid_loop() {
    let mock = Arc::new(MockEngine::new());
    let extension = DecoderExtension::new(mock.clone(), DecoderConfig::default());
    let mut spec = one_beat();
    spec.waveform = Waveform::Silence;

    let status = AdapterStatus::from(extension.create_decoder(&mut Cursor::new(spec.to_file_bytes())));
    assert_eq!(
        status.last_error().and_then(|e| e.host_message()).as_deref(),
        Some("This ReCycle file does not contain any active slices.")
    );
    assert_eq!(mock.live_handles(), 0);
}
