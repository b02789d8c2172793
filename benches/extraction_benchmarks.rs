//! Benchmarks for plane extraction and stream decoding.
//!
//! Run with: cargo bench
//! Run with all features: cargo bench --all-features
//!
//! The FFmpeg benchmark needs `tests/fixtures/sample.evc` and a libxevd
//! enabled FFmpeg; the others use the scripted engine.

use std::io::Cursor;
use std::path::Path;

use criterion::{BatchSize, Criterion};
use framegate::{
    ColorFormat, Decoder, EngineLedger, LogLevel, ScriptedEngine, ScriptedPicture, StreamOptions,
    set_engine_log_level, write_unit,
};

const SAMPLE_STREAM: &str = "tests/fixtures/sample.evc";

fn scripted_decoder(ledger: &EngineLedger, picture: &ScriptedPicture) -> Decoder<ScriptedEngine> {
    let mut engine = ScriptedEngine::create(1, ledger).unwrap();
    engine.push_frame(picture.clone());
    Decoder::with_engine(engine)
}

fn benchmark_plane_extraction(criterion: &mut Criterion) {
    let ledger = EngineLedger::new();
    let mut group = criterion.benchmark_group("plane extraction 1920x1080");

    for (label, bit_depth) in [("8-bit", 8), ("10-bit", 10)] {
        let picture = ScriptedPicture::filled(1920, 1080, bit_depth, ColorFormat::Ycbcr420);
        group.bench_function(label, |bencher| {
            bencher.iter_batched(
                || scripted_decoder(&ledger, &picture),
                |mut decoder| decoder.decode(&[0x02, 0x01, 0x00]).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_bit_depth_conversion(criterion: &mut Criterion) {
    let ledger = EngineLedger::new();
    let picture = ScriptedPicture::filled(1920, 1080, 10, ColorFormat::Ycbcr420);
    let frame = scripted_decoder(&ledger, &picture)
        .decode(&[0x02, 0x01, 0x00])
        .unwrap()
        .into_frame()
        .unwrap();

    criterion.bench_function("10-bit to 8-bit 1920x1080", |bencher| {
        bencher.iter(|| frame.to_8bit());
    });
}

fn benchmark_scripted_stream(criterion: &mut Criterion) {
    let ledger = EngineLedger::new();
    let picture = ScriptedPicture::filled(640, 360, 8, ColorFormat::Ycbcr420);
    let mut stream = Vec::new();
    for _ in 0..30 {
        write_unit(&mut stream, &[0x02, 0x01, 0x00, 0x00]).unwrap();
    }

    criterion.bench_function("stream decode 30 units 640x360", |bencher| {
        bencher.iter_batched(
            || {
                let mut engine = ScriptedEngine::create(1, &ledger).unwrap();
                for _ in 0..30 {
                    engine.push_frame(picture.clone());
                }
                Decoder::with_engine(engine)
            },
            |mut decoder| {
                decoder
                    .decode_stream(Cursor::new(&stream), &StreamOptions::new(), |_| Ok(()))
                    .unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_ffmpeg_stream(criterion: &mut Criterion) {
    set_engine_log_level(LogLevel::Error);

    if !Path::new(SAMPLE_STREAM).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }
    let Ok(bytes) = std::fs::read(SAMPLE_STREAM) else {
        return;
    };
    if Decoder::create(1).is_err() {
        eprintln!("Skipping benchmark: libxevd decoder unavailable");
        return;
    }

    criterion.bench_function("ffmpeg stream decode", |bencher| {
        bencher.iter(|| {
            let mut decoder = Decoder::create(0).unwrap();
            decoder
                .decode_stream(Cursor::new(&bytes), &StreamOptions::new(), |_| Ok(()))
                .unwrap()
        });
    });
}

#[cfg(feature = "rayon")]
fn benchmark_parallel(criterion: &mut Criterion) {
    let ledger = EngineLedger::new();
    let picture = ScriptedPicture::filled(640, 360, 8, ColorFormat::Ycbcr420);
    let mut stream = Vec::new();
    for _ in 0..10 {
        write_unit(&mut stream, &[0x02, 0x01, 0x00]).unwrap();
    }

    criterion.bench_function("parallel decode 8 streams", |bencher| {
        bencher.iter(|| {
            let readers = (0..8).map(|_| Cursor::new(stream.clone())).collect();
            framegate::decode_streams_parallel(
                readers,
                |_| {
                    let mut engine = ScriptedEngine::create(1, &ledger)?;
                    for _ in 0..10 {
                        engine.push_frame(picture.clone());
                    }
                    Ok(Decoder::with_engine(engine))
                },
                &StreamOptions::new(),
            )
            .unwrap()
        });
    });
}

#[cfg(not(feature = "rayon"))]
fn benchmark_parallel(_criterion: &mut Criterion) {}

criterion::criterion_group!(
    benches,
    benchmark_plane_extraction,
    benchmark_bit_depth_conversion,
    benchmark_scripted_stream,
    benchmark_ffmpeg_stream,
    benchmark_parallel,
);
criterion::criterion_main!(benches);
