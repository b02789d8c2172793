//! Progress and cancellation integration tests.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use framegate::{
    CancellationToken, ColorFormat, Decoder, EngineLedger, OperationType, ProgressCallback,
    ProgressInfo, ScriptedEngine, ScriptedPicture, StreamOptions, write_unit,
};

const UNIT: [u8; 4] = [0x02, 0x01, 0xaa, 0xbb];

fn stream_of_units(count: usize) -> Vec<u8> {
    let mut stream = Vec::new();
    for _ in 0..count {
        write_unit(&mut stream, &UNIT).unwrap();
    }
    stream
}

fn decoder_with_frames(ledger: &EngineLedger, frames: usize) -> Decoder<ScriptedEngine> {
    let mut engine = ScriptedEngine::create(1, ledger).unwrap();
    for _ in 0..frames {
        engine.push_frame(ScriptedPicture::filled(8, 8, 8, ColorFormat::Ycbcr420));
    }
    Decoder::with_engine(engine)
}

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_cancel() {
    let token = CancellationToken::new();
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_token_default_trait() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

// ── ProgressInfo ───────────────────────────────────────────────────

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            infos: Mutex::new(Vec::new()),
        })
    }

    fn snapshot(&self) -> Vec<ProgressInfo> {
        self.infos.lock().unwrap().clone()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_fires_every_batch_and_at_finish() {
    let ledger = EngineLedger::new();
    let mut decoder = decoder_with_frames(&ledger, 5);
    let recorder = RecordingProgress::new();

    let options = StreamOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(2)
        .with_drain_at_end(false);
    decoder
        .decode_stream(Cursor::new(stream_of_units(5)), &options, |_| Ok(()))
        .unwrap();

    let infos = recorder.snapshot();
    let counts: Vec<u64> = infos.iter().map(|info| info.current).collect();
    assert_eq!(counts, vec![2, 4, 5]);

    let last = infos.last().unwrap();
    assert_eq!(last.operation, OperationType::StreamDecode);
    assert_eq!(last.frames, 5);
    assert_eq!(last.bytes, 5 * UNIT.len() as u64);
}

#[test]
fn progress_counts_only_units_with_frames() {
    let ledger = EngineLedger::new();
    let mut decoder = decoder_with_frames(&ledger, 2);
    let recorder = RecordingProgress::new();

    let options = StreamOptions::new()
        .with_progress(recorder.clone())
        .with_drain_at_end(false);
    decoder
        .decode_stream(Cursor::new(stream_of_units(4)), &options, |_| Ok(()))
        .unwrap();

    let infos = recorder.snapshot();
    assert_eq!(infos.len(), 5, "one per unit plus the final report");
    assert_eq!(infos[1].frames, 2);
    assert_eq!(infos.last().unwrap().current, 4);
    assert_eq!(infos.last().unwrap().frames, 2);
}

#[test]
fn final_report_reflects_drain() {
    let ledger = EngineLedger::new();
    let mut decoder = decoder_with_frames(&ledger, 0);
    // Empty input: the only frame comes out of the drain.
    decoder
        .engine_mut()
        .push_frame(ScriptedPicture::filled(8, 8, 8, ColorFormat::Ycbcr420));
    let recorder = RecordingProgress::new();

    let options = StreamOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(100);
    let summary = decoder
        .decode_stream(Cursor::new(Vec::<u8>::new()), &options, |_| Ok(()))
        .unwrap();

    assert_eq!(summary.frames, 1);
    let infos = recorder.snapshot();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].operation, OperationType::Drain);
    assert_eq!(infos[0].current, 0);
    assert_eq!(infos[0].frames, 1);
}

#[test]
fn zero_batch_size_is_clamped() {
    let ledger = EngineLedger::new();
    let mut decoder = decoder_with_frames(&ledger, 3);
    let recorder = RecordingProgress::new();

    let options = StreamOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(0)
        .with_drain_at_end(false);
    decoder
        .decode_stream(Cursor::new(stream_of_units(3)), &options, |_| Ok(()))
        .unwrap();

    assert_eq!(recorder.snapshot().len(), 4);
}
