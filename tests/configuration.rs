//! Configuration builder tests.

use framegate::configuration::{DEFAULT_CODEC, DEFAULT_MAX_UNIT_SIZE};
use framegate::{DecoderOptions, FramegateError, StreamOptions};

// ── DecoderOptions ─────────────────────────────────────────────────

#[test]
fn decoder_options_defaults() {
    let options = DecoderOptions::new();
    assert!(options.threads >= 1);
    assert_eq!(options.codec, DEFAULT_CODEC);
    assert_eq!(DecoderOptions::default(), options);
}

#[test]
fn decoder_options_builders() {
    let options = DecoderOptions::new().with_threads(0).with_codec("evc");
    assert_eq!(options.threads, 0);
    assert_eq!(options.codec, "evc");
    assert!(options.validate().is_ok());
}

#[test]
fn negative_threads_fail_as_engine_init() {
    let result = DecoderOptions::new().with_threads(-1).validate();
    match result {
        Err(FramegateError::EngineInit { reason }) => assert!(reason.contains("-1"), "{reason}"),
        other => panic!("Expected EngineInit, got: {other:?}"),
    }
}

#[test]
fn blank_codec_is_invalid() {
    let result = DecoderOptions::new().with_codec("  ").validate();
    assert!(matches!(result, Err(FramegateError::InvalidOptions(_))));
}

// ── StreamOptions ──────────────────────────────────────────────────

#[test]
fn stream_options_defaults() {
    let options = StreamOptions::new();
    assert_eq!(options.max_unit_size(), DEFAULT_MAX_UNIT_SIZE);
    assert_eq!(StreamOptions::default().max_unit_size(), DEFAULT_MAX_UNIT_SIZE);
}

#[test]
fn stream_options_clamps_unit_size() {
    assert_eq!(StreamOptions::new().with_max_unit_size(0).max_unit_size(), 1);
    assert_eq!(StreamOptions::new().with_max_unit_size(4096).max_unit_size(), 4096);
}

#[test]
fn stream_options_debug_hides_callback() {
    let options = StreamOptions::new()
        .with_batch_size(7)
        .with_drain_at_end(false)
        .with_cancellation(framegate::CancellationToken::new());
    let debug = format!("{options:?}");

    assert!(debug.contains("StreamOptions"), "{debug}");
    assert!(debug.contains("batch_size: 7"), "{debug}");
    assert!(debug.contains("drain_at_end: false"), "{debug}");
    assert!(debug.contains("has_cancellation: true"), "{debug}");
    assert!(!debug.contains("progress"), "{debug}");
}
