//! The decoding engine contract.
//!
//! A [`DecodeEngine`] is the external collaborator that actually decodes
//! video. This crate never looks inside it: it submits one bitstream chunk,
//! asks for a picture, and copies what the engine exposes through a
//! [`Picture`] descriptor. Deleting the engine instance is its [`Drop`].
//!
//! Two engines ship with the crate:
//!
//! - [`FfmpegEngine`](ffmpeg::FfmpegEngine) decodes through libavcodec.
//! - [`ScriptedEngine`](scripted::ScriptedEngine) replays scripted
//!   responses and keeps an allocation ledger, for tests.

pub mod ffmpeg;
pub mod scripted;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::bitstream::{ColorSpace, NalUnitType, SliceType};
use crate::status::ReturnCode;

/// Per-call statistics reported by [`DecodeEngine::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitStat {
    /// Bytes consumed from the chunk. Zero means no access unit was
    /// consumed.
    pub read: usize,
    /// NAL unit type of the submitted unit.
    pub nalu_type: NalUnitType,
    /// Slice type of the submitted unit, when it carried a picture.
    pub slice_type: SliceType,
}

/// Crop-window offsets into a decoded picture, in luma samples.
///
/// Reported by the engine and forwarded untouched; this crate never
/// applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropWindow {
    /// Rows cropped from the top.
    pub top: u32,
    /// Columns cropped from the right.
    pub right: u32,
    /// Rows cropped from the bottom.
    pub bottom: u32,
    /// Columns cropped from the left.
    pub left: u32,
}

/// One plane of an engine-owned picture.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneView<'a> {
    /// Backing bytes, starting at the first sample of the first row.
    pub data: &'a [u8],
    /// Distance between row starts, in bytes.
    pub stride: usize,
    /// Plane width in samples.
    pub width: u32,
    /// Plane height in rows.
    pub height: u32,
}

/// Engine-owned picture-buffer descriptor.
///
/// Borrows the engine, so it cannot outlive the next pull or the engine
/// itself. The engine keeps the descriptor until
/// [`DecodeEngine::release`] is called.
pub struct Picture<'a> {
    /// Success code of the pull that produced this picture.
    pub status: ReturnCode,
    /// Packed colour-space tag.
    pub color_space: ColorSpace,
    /// Y, U and V planes, in that order.
    pub planes: [PlaneView<'a>; 3],
    /// Crop offsets.
    pub crop: CropWindow,
}

impl<'a> Picture<'a> {
    /// Build a descriptor from its parts.
    pub fn new(
        status: ReturnCode,
        color_space: ColorSpace,
        planes: [PlaneView<'a>; 3],
        crop: CropWindow,
    ) -> Self {
        Self {
            status,
            color_space,
            planes,
            crop,
        }
    }

    /// Luma width (plane 0).
    pub fn width(&self) -> u32 {
        self.planes[0].width
    }

    /// Luma height (plane 0).
    pub fn height(&self) -> u32 {
        self.planes[0].height
    }
}

/// Why [`DecodeEngine::pull`] produced no descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullError {
    /// The descriptor itself could not be allocated.
    DescriptorAllocation,
    /// The engine reported a failure (or no output).
    Engine(ReturnCode),
}

/// Counted reservation on an engine resource.
///
/// Increments a shared counter on creation and decrements it on drop, so
/// an engine can account for the resources it still holds.
#[derive(Debug)]
pub struct Lease {
    counter: Arc<AtomicUsize>,
}

impl Lease {
    /// Take a lease on `counter`.
    pub fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A stateful decoder instance.
///
/// Calls on one engine must be serialized; every method takes `&mut self`.
pub trait DecodeEngine {
    /// Submit one complete bitstream unit. The unit boundary is the slice
    /// boundary: there is no length prefix.
    ///
    /// An `Err` means the engine rejected the chunk outright.
    fn submit(&mut self, chunk: &[u8]) -> Result<SubmitStat, ReturnCode>;

    /// Fetch the next decoded picture, if any.
    fn pull(&mut self) -> Result<Picture<'_>, PullError>;

    /// Release the descriptor handed out by the last [`pull`](Self::pull).
    /// A no-op when nothing is held.
    fn release(&mut self) {}

    /// Signal end of stream so buffered pictures become pullable.
    fn flush(&mut self) -> Result<(), ReturnCode> {
        Ok(())
    }

    /// Short engine name for diagnostics.
    fn name(&self) -> &'static str;
}

impl<E: DecodeEngine + ?Sized> DecodeEngine for Box<E> {
    fn submit(&mut self, chunk: &[u8]) -> Result<SubmitStat, ReturnCode> {
        (**self).submit(chunk)
    }

    fn pull(&mut self) -> Result<Picture<'_>, PullError> {
        (**self).pull()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn flush(&mut self) -> Result<(), ReturnCode> {
        (**self).flush()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
