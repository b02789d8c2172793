//! Parallel decoding of independent streams.
//!
//! A [`Decoder`] handles one decode at a time, but independent handles
//! share nothing. The functions here decode several length-prefixed streams
//! at once using [`rayon`](::rayon), giving each worker its own handle.
//! Results come back in input order.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ::rayon::iter::{IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::configuration::{DecoderOptions, StreamOptions};
use crate::decoder::Decoder;
use crate::engine::DecodeEngine;
use crate::error::FramegateError;
use crate::result::DecodeResult;

/// Decode each reader on its own decoder, in parallel.
///
/// `make_decoder` receives the index of the stream it builds a decoder for
/// and is called on the worker thread.
///
/// # Errors
///
/// The first error from any worker, or [`FramegateError::Cancelled`] if the
/// token in `options` fires.
pub fn decode_streams_parallel<E, R, M>(
    readers: Vec<R>,
    make_decoder: M,
    options: &StreamOptions,
) -> Result<Vec<Vec<DecodeResult>>, FramegateError>
where
    E: DecodeEngine,
    R: Read + Send,
    M: Fn(usize) -> Result<Decoder<E>, FramegateError> + Sync,
{
    log::debug!("Decoding {} streams in parallel", readers.len());
    readers
        .into_par_iter()
        .enumerate()
        .map(|(index, reader)| {
            if options.is_cancelled() {
                return Err(FramegateError::Cancelled);
            }
            let decoder = make_decoder(index)?;
            collect_frames(decoder, reader, options)
        })
        .collect()
}

/// Decode each file with a libavcodec-backed decoder, in parallel.
///
/// # Errors
///
/// As [`decode_streams_parallel`], plus I/O errors opening a file.
pub fn decode_files_parallel<P>(
    paths: &[P],
    decoder_options: &DecoderOptions,
    options: &StreamOptions,
) -> Result<Vec<Vec<DecodeResult>>, FramegateError>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            if options.is_cancelled() {
                return Err(FramegateError::Cancelled);
            }
            let reader = BufReader::new(File::open(path.as_ref())?);
            let decoder = Decoder::with_options(decoder_options)?;
            collect_frames(decoder, reader, options)
        })
        .collect()
}

fn collect_frames<E, R>(
    mut decoder: Decoder<E>,
    reader: R,
    options: &StreamOptions,
) -> Result<Vec<DecodeResult>, FramegateError>
where
    E: DecodeEngine,
    R: Read,
{
    let mut frames = Vec::new();
    decoder.decode_stream(reader, options, |result| {
        frames.push(result);
        Ok(())
    })?;
    decoder.close();
    Ok(frames)
}
