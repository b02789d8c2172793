//! Length-prefixed NAL unit streams.
//!
//! Each unit is stored as a 4-byte big-endian length followed by that many
//! bytes. [`NalUnitReader`] splits such a stream into units and
//! [`Decoder::decode_stream`] feeds every unit through the decode pipeline.
//!
//! # Example
//!
//! ```no_run
//! use framegate::{Decoder, FramegateError, StreamOptions};
//!
//! let mut decoder = Decoder::create(4)?;
//! let file = std::io::BufReader::new(std::fs::File::open("input.evc")?);
//! let summary = decoder.decode_stream(file, &StreamOptions::new(), |result| {
//!     println!("Frame:{} Slice:{}", result.nalu_type, result.slice_type);
//!     Ok(())
//! })?;
//! println!("{} frames from {} units", summary.frames, summary.units);
//! # Ok::<(), FramegateError>(())
//! ```

use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;

use crate::bitstream::NAL_UNIT_LENGTH_BYTES;
use crate::configuration::{DEFAULT_MAX_UNIT_SIZE, StreamOptions};
use crate::decoder::Decoder;
use crate::engine::DecodeEngine;
use crate::error::FramegateError;
use crate::progress::{OperationType, ProgressTracker};
use crate::result::DecodeResult;

/// Iterator over the units of a length-prefixed stream.
///
/// End of input exactly at a unit boundary ends the iteration. End of input
/// inside a length prefix or a unit body yields
/// [`FramegateError::TruncatedStream`], and a declared length above the
/// limit yields [`FramegateError::UnitTooLarge`]. The iterator is fused
/// after the first error.
pub struct NalUnitReader<R: Read> {
    reader: R,
    max_unit_size: usize,
    units_read: u64,
    finished: bool,
}

impl<R: Read> NalUnitReader<R> {
    /// Read units of at most [`DEFAULT_MAX_UNIT_SIZE`] bytes.
    pub fn new(reader: R) -> Self {
        Self::with_max_unit_size(reader, DEFAULT_MAX_UNIT_SIZE)
    }

    /// Read units of at most `max_unit_size` bytes.
    pub fn with_max_unit_size(reader: R, max_unit_size: usize) -> Self {
        Self {
            reader,
            max_unit_size,
            units_read: 0,
            finished: false,
        }
    }

    /// Units yielded so far.
    pub fn units_read(&self) -> u64 {
        self.units_read
    }

    /// Recover the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next length prefix. `None` at a clean end of input.
    fn read_prefix(&mut self) -> Result<Option<usize>, FramegateError> {
        let mut prefix = [0u8; NAL_UNIT_LENGTH_BYTES];
        let mut filled = 0;
        while filled < prefix.len() {
            match self.reader.read(&mut prefix[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }

        match filled {
            0 => Ok(None),
            NAL_UNIT_LENGTH_BYTES => Ok(Some(u32::from_be_bytes(prefix) as usize)),
            partial => Err(FramegateError::TruncatedStream {
                expected: NAL_UNIT_LENGTH_BYTES,
                read: partial,
            }),
        }
    }

    fn read_unit(&mut self) -> Result<Option<Vec<u8>>, FramegateError> {
        let Some(length) = self.read_prefix()? else {
            return Ok(None);
        };
        if length > self.max_unit_size {
            return Err(FramegateError::UnitTooLarge {
                size: length,
                limit: self.max_unit_size,
            });
        }

        let mut unit = Vec::with_capacity(length);
        (&mut self.reader).take(length as u64).read_to_end(&mut unit)?;
        if unit.len() < length {
            return Err(FramegateError::TruncatedStream {
                expected: length,
                read: unit.len(),
            });
        }
        Ok(Some(unit))
    }
}

impl<R: Read> Iterator for NalUnitReader<R> {
    type Item = Result<Vec<u8>, FramegateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_unit() {
            Ok(Some(unit)) => {
                self.units_read += 1;
                Some(Ok(unit))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

/// Append `unit` to `writer` with its 4-byte big-endian length prefix.
///
/// # Errors
///
/// [`FramegateError::UnitTooLarge`] if `unit` is longer than `u32::MAX`
/// bytes, or any error from `writer`.
pub fn write_unit<W: Write>(writer: &mut W, unit: &[u8]) -> Result<(), FramegateError> {
    let length = u32::try_from(unit.len()).map_err(|_| FramegateError::UnitTooLarge {
        size: unit.len(),
        limit: u32::MAX as usize,
    })?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(unit)?;
    Ok(())
}

/// Totals from one [`Decoder::decode_stream`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
    /// Units read from the stream.
    pub units: u64,
    /// Unit bytes read, excluding length prefixes.
    pub bytes: u64,
    /// Frames delivered to the callback, including drained ones.
    pub frames: u64,
    /// Units that produced no frame.
    pub unavailable: u64,
}

impl<E: DecodeEngine> Decoder<E> {
    /// Decode every unit of a length-prefixed stream.
    ///
    /// `on_frame` receives each result that carries a frame; results without
    /// one are counted but not delivered. Once the input is exhausted the
    /// engine is drained, unless disabled in `options`.
    ///
    /// # Errors
    ///
    /// Stream framing errors, [`FramegateError::DecodeSubmit`] for a rejected
    /// unit, [`FramegateError::Cancelled`] when the token fires, or the first
    /// error returned by `on_frame`.
    pub fn decode_stream<R, F>(
        &mut self,
        reader: R,
        options: &StreamOptions,
        mut on_frame: F,
    ) -> Result<StreamSummary, FramegateError>
    where
        R: Read,
        F: FnMut(DecodeResult) -> Result<(), FramegateError>,
    {
        let mut tracker = ProgressTracker::new(
            Arc::clone(&options.progress),
            OperationType::StreamDecode,
            options.batch_size,
        );
        let mut summary = StreamSummary::default();

        for unit in NalUnitReader::with_max_unit_size(reader, options.max_unit_size) {
            if options.is_cancelled() {
                return Err(FramegateError::Cancelled);
            }
            let unit = unit?;
            let result = self.decode(&unit)?;

            summary.units += 1;
            summary.bytes += unit.len() as u64;
            tracker.advance(unit.len(), result.has_frame());

            if result.has_frame() {
                summary.frames += 1;
                on_frame(result)?;
            } else {
                summary.unavailable += 1;
            }
        }

        if options.drain_at_end {
            if options.is_cancelled() {
                return Err(FramegateError::Cancelled);
            }
            tracker.set_operation(OperationType::Drain);
            let drained = self.drain()?;
            tracker.add_frames(drained.len() as u64);
            for result in drained {
                summary.frames += 1;
                on_frame(result)?;
            }
        }

        tracker.finish();
        log::debug!(
            "Stream decoded: {} units, {} bytes, {} frames",
            summary.units,
            summary.bytes,
            summary.frames
        );
        Ok(summary)
    }
}
