//! The decoder handle and the frame extraction pipeline.
//!
//! A [`Decoder`] owns exactly one engine instance. Each
//! [`decode`](Decoder::decode) call submits one chunk, pulls at most one
//! picture and copies it into a caller-owned [`DecodeResult`]. The engine's
//! picture descriptor is released before `decode` returns, whatever the
//! outcome.
//!
//! # Example
//!
//! ```no_run
//! use framegate::{Decoder, FramegateError};
//!
//! let mut decoder = Decoder::create(4)?;
//! let result = decoder.decode(&[0x02, 0x01, 0x00])?;
//! if let Some(frame) = &result.frame {
//!     println!("{}x{} {}", frame.width, frame.height, frame.color_format);
//! }
//! # Ok::<(), FramegateError>(())
//! ```

use crate::bitstream::{NalUnitType, SliceType};
use crate::configuration::DecoderOptions;
use crate::engine::ffmpeg::FfmpegEngine;
use crate::engine::{DecodeEngine, PullError};
use crate::error::FramegateError;
use crate::extract;
use crate::result::{DecodeResult, DecodedFrame};
use crate::status::{ReturnCode, UnavailableReason};

/// Running counters for one decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderStats {
    /// Chunks accepted by the engine.
    pub chunks_submitted: u64,
    /// Bytes the engine reported as consumed.
    pub bytes_submitted: u64,
    /// Frames copied out, including drained ones.
    pub frames_decoded: u64,
    /// Decode calls that produced no frame.
    pub unavailable: u64,
}

/// Handle owning one decoding engine.
///
/// Not shareable across concurrent decodes: every operation takes
/// `&mut self`. Independent handles may run on different threads.
pub struct Decoder<E: DecodeEngine = FfmpegEngine> {
    engine: E,
    stats: DecoderStats,
}

impl Decoder<FfmpegEngine> {
    /// Create a libavcodec-backed decoder with `threads` worker threads and
    /// the default codec.
    ///
    /// # Errors
    ///
    /// [`FramegateError::EngineInit`] if `threads` is negative or the engine
    /// cannot be created.
    pub fn create(threads: i32) -> Result<Self, FramegateError> {
        Self::with_options(&DecoderOptions::new().with_threads(threads))
    }

    /// Create a libavcodec-backed decoder from `options`.
    ///
    /// # Errors
    ///
    /// See [`FfmpegEngine::create`].
    pub fn with_options(options: &DecoderOptions) -> Result<Self, FramegateError> {
        let engine = FfmpegEngine::create(options)?;
        Ok(Self::with_engine(engine))
    }
}

impl<E: DecodeEngine> Decoder<E> {
    /// Wrap an already-created engine.
    pub fn with_engine(engine: E) -> Self {
        log::debug!("Created decoder on {} engine", engine.name());
        Self {
            engine,
            stats: DecoderStats::default(),
        }
    }

    /// Decode one bitstream chunk.
    ///
    /// `chunk` is a single NAL unit with no length prefix. A result without
    /// a frame is a normal outcome, reported as
    /// [`ReturnCode::OutputNotAvailable`] with an
    /// [`UnavailableReason`].
    ///
    /// # Errors
    ///
    /// [`FramegateError::DecodeSubmit`] if the engine rejects the chunk.
    /// Nothing is allocated in that case.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<DecodeResult, FramegateError> {
        let stat = self.engine.submit(chunk).map_err(|code| {
            log::debug!("Engine rejected {}-byte chunk: {}", chunk.len(), code);
            FramegateError::DecodeSubmit { code }
        })?;
        self.stats.chunks_submitted += 1;
        self.stats.bytes_submitted += stat.read as u64;

        if stat.read < 1 {
            self.stats.unavailable += 1;
            return Ok(DecodeResult::unavailable(
                stat.nalu_type,
                UnavailableReason::NothingConsumed,
            ));
        }

        match self.pull_frame() {
            Ok((status, frame)) => {
                self.stats.frames_decoded += 1;
                log::trace!(
                    "Decoded {} {} frame {}x{}",
                    stat.nalu_type,
                    stat.slice_type,
                    frame.width,
                    frame.height
                );
                Ok(DecodeResult {
                    status,
                    nalu_type: stat.nalu_type,
                    slice_type: stat.slice_type,
                    frame: Some(frame),
                    unavailable_reason: None,
                })
            }
            Err(reason) => {
                self.stats.unavailable += 1;
                log::trace!("No frame for {} unit: {}", stat.nalu_type, reason);
                Ok(DecodeResult::unavailable(stat.nalu_type, reason))
            }
        }
    }

    /// Signal end of stream and collect every picture still buffered.
    ///
    /// Drained results carry [`SliceType::Unknown`] and the default NAL unit
    /// type: no chunk was submitted for them.
    ///
    /// # Errors
    ///
    /// [`FramegateError::DecodeSubmit`] if the engine refuses the flush.
    pub fn drain(&mut self) -> Result<Vec<DecodeResult>, FramegateError> {
        self.engine
            .flush()
            .map_err(|code| FramegateError::DecodeSubmit { code })?;

        let mut results = Vec::new();
        loop {
            match self.pull_frame() {
                Ok((status, frame)) => {
                    self.stats.frames_decoded += 1;
                    results.push(DecodeResult {
                        status,
                        nalu_type: NalUnitType::default(),
                        slice_type: SliceType::Unknown,
                        frame: Some(frame),
                        unavailable_reason: None,
                    });
                }
                Err(reason) => {
                    log::debug!("Drain finished after {} frames ({})", results.len(), reason);
                    break;
                }
            }
        }
        Ok(results)
    }

    /// Pull one picture and copy it out. The engine is told to release the
    /// descriptor before this returns.
    fn pull_frame(&mut self) -> Result<(ReturnCode, DecodedFrame), UnavailableReason> {
        let pulled = match self.engine.pull() {
            Ok(picture) => extract::materialize(&picture).map(|frame| (picture.status, frame)),
            Err(PullError::DescriptorAllocation) => Err(UnavailableReason::DescriptorAllocation),
            Err(PullError::Engine(code)) => Err(UnavailableReason::PullFailed(code)),
        };
        self.engine.release();
        pulled
    }

    /// Counters accumulated since creation.
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The wrapped engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Destroy the handle and its engine.
    pub fn close(self) {
        log::debug!(
            "Closing {} decoder after {} chunks, {} frames",
            self.engine.name(),
            self.stats.chunks_submitted,
            self.stats.frames_decoded
        );
    }
}
