//! Parallel stream decoding tests.

#![cfg(feature = "rayon")]

use std::io::Cursor;

use framegate::{
    CancellationToken, ColorFormat, Decoder, DecoderOptions, EngineLedger, FramegateError,
    ScriptedEngine, ScriptedPicture, StreamOptions, decode_files_parallel,
    decode_streams_parallel, write_unit,
};

fn stream_of_units(count: usize) -> Vec<u8> {
    let mut stream = Vec::new();
    for _ in 0..count {
        write_unit(&mut stream, &[0x02, 0x01, 0x00]).unwrap();
    }
    stream
}

#[test]
fn results_come_back_in_input_order() {
    let ledger = EngineLedger::new();
    let readers: Vec<_> = (1..=6).map(|count| Cursor::new(stream_of_units(count))).collect();

    let results = decode_streams_parallel(
        readers,
        |index| {
            let mut engine = ScriptedEngine::create(1, &ledger)?;
            // Stream `index` gets frames of width `index + 1`.
            for _ in 0..=index {
                engine.push_frame(ScriptedPicture::filled(
                    index as u32 + 1,
                    2,
                    8,
                    ColorFormat::Ycbcr444,
                ));
            }
            Ok(Decoder::with_engine(engine))
        },
        &StreamOptions::new(),
    )
    .expect("parallel decode");

    assert_eq!(results.len(), 6);
    for (index, frames) in results.iter().enumerate() {
        assert_eq!(frames.len(), index + 1);
        for result in frames {
            assert_eq!(result.frame.as_ref().unwrap().width, index as u32 + 1);
        }
    }
    assert_eq!(ledger.engines_created(), 6);
    assert_eq!(ledger.live_engines(), 0);
}

#[test]
fn worker_error_is_returned() {
    let ledger = EngineLedger::new();
    let readers = vec![Cursor::new(stream_of_units(1)), Cursor::new(stream_of_units(1))];

    let result = decode_streams_parallel(
        readers,
        |index| {
            let threads = if index == 1 { -1 } else { 1 };
            Ok(Decoder::with_engine(ScriptedEngine::create(threads, &ledger)?))
        },
        &StreamOptions::new(),
    );

    assert!(matches!(result, Err(FramegateError::EngineInit { .. })));
    assert_eq!(ledger.live_engines(), 0);
}

#[test]
fn cancelled_parallel_decode_creates_no_engines() {
    let ledger = EngineLedger::new();
    let token = CancellationToken::new();
    token.cancel();
    let readers = vec![Cursor::new(stream_of_units(2)); 3];

    let result = decode_streams_parallel(
        readers,
        |_| Ok(Decoder::with_engine(ScriptedEngine::create(1, &ledger)?)),
        &StreamOptions::new().with_cancellation(token),
    );

    assert!(matches!(result, Err(FramegateError::Cancelled)));
    assert_eq!(ledger.engines_created(), 0);
}

#[test]
fn missing_file_is_an_io_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = temporary_directory.path().join("missing.evc");

    let result = decode_files_parallel(
        &[missing],
        &DecoderOptions::new().with_threads(1),
        &StreamOptions::new(),
    );
    assert!(matches!(result, Err(FramegateError::IoError(_))));
}
