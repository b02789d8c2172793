//! A deterministic engine that replays scripted responses.
//!
//! [`ScriptedEngine`] implements [`DecodeEngine`] without decoding anything:
//! each submit and pull pops the next entry from its script, and falls back
//! to a neutral default once the script runs out. An [`EngineLedger`] counts
//! live engines and live picture descriptors, so tests can verify that
//! every resource is returned on every path.
//!
//! ```
//! use framegate::{ColorFormat, Decoder, EngineLedger, PullScript, ScriptedEngine, ScriptedPicture};
//!
//! let ledger = EngineLedger::new();
//! let engine = ScriptedEngine::create(1, &ledger)?
//!     .then_pull(PullScript::Deliver(ScriptedPicture::filled(16, 8, 8, ColorFormat::Ycbcr420)));
//! let mut decoder = Decoder::with_engine(engine);
//!
//! let result = decoder.decode(&[0x02, 0x01, 0xaa])?;
//! assert!(result.has_frame());
//! assert_eq!(ledger.live_descriptors(), 0);
//! # Ok::<(), framegate::FramegateError>(())
//! ```

use std::collections::VecDeque;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::bitstream::{ColorFormat, ColorSpace, NalHeader, NalUnitType, SliceType};
use crate::engine::{CropWindow, DecodeEngine, Lease, Picture, PlaneView, PullError, SubmitStat};
use crate::error::FramegateError;
use crate::extract::bytes_per_sample;
use crate::status::ReturnCode;

/// Most worker threads [`ScriptedEngine::create`] accepts.
pub const MAX_SCRIPTED_THREADS: i32 = 64;

/// Shared resource counters for scripted engines.
///
/// Clones observe the same counters.
#[derive(Debug, Clone, Default)]
pub struct EngineLedger {
    live_engines: Arc<AtomicUsize>,
    engines_created: Arc<AtomicUsize>,
    live_descriptors: Arc<AtomicUsize>,
    descriptors_issued: Arc<AtomicUsize>,
    submits: Arc<AtomicUsize>,
}

impl EngineLedger {
    /// A ledger with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engines created and not yet dropped.
    pub fn live_engines(&self) -> usize {
        self.live_engines.load(Ordering::Acquire)
    }

    /// Engines ever created.
    pub fn engines_created(&self) -> usize {
        self.engines_created.load(Ordering::Acquire)
    }

    /// Picture descriptors handed out and not yet released.
    pub fn live_descriptors(&self) -> usize {
        self.live_descriptors.load(Ordering::Acquire)
    }

    /// Picture descriptors ever handed out.
    pub fn descriptors_issued(&self) -> usize {
        self.descriptors_issued.load(Ordering::Acquire)
    }

    /// Chunks submitted across all engines.
    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::Acquire)
    }
}

/// One plane of a [`ScriptedPicture`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptedPlane {
    /// Width in samples.
    pub width: u32,
    /// Height in rows.
    pub height: u32,
    /// Row pitch in bytes.
    pub stride: usize,
    /// Backing bytes.
    pub data: Vec<u8>,
}

/// A picture the scripted engine hands out on pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedPicture {
    /// Status reported with the picture.
    pub status: ReturnCode,
    /// Packed colour-space tag.
    pub color_space: ColorSpace,
    /// Y, U and V planes.
    pub planes: [ScriptedPlane; 3],
    /// Crop offsets.
    pub crop: CropWindow,
}

impl ScriptedPicture {
    /// A picture of `width` x `height` luma samples filled with a
    /// deterministic pattern.
    ///
    /// Each plane has a row pitch of exactly `width * bytes_per_sample`
    /// bytes and holds `height * stride * bytes_per_sample` bytes, the
    /// amount the extraction pipeline copies. Luma-only and unknown formats
    /// get empty chroma planes.
    pub fn filled(width: u32, height: u32, bit_depth: u8, format: ColorFormat) -> Self {
        let sample = bytes_per_sample(bit_depth);
        let plane = |index: usize, width: u32, height: u32| {
            let stride = width as usize * sample;
            let size = height as usize * stride * sample;
            let data = (0..size)
                .map(|offset| ((offset * 7 + index * 101 + offset / stride.max(1) * 31) & 0xff) as u8)
                .collect();
            ScriptedPlane {
                width,
                height,
                stride,
                data,
            }
        };

        let chroma = match format.chroma_shift() {
            Some((shift_x, shift_y)) => {
                let chroma_width = (width + (1 << shift_x) - 1) >> shift_x;
                let chroma_height = (height + (1 << shift_y) - 1) >> shift_y;
                [plane(1, chroma_width, chroma_height), plane(2, chroma_width, chroma_height)]
            }
            None => [ScriptedPlane::default(), ScriptedPlane::default()],
        };
        let [u, v] = chroma;

        Self {
            status: ReturnCode::Ok,
            color_space: ColorSpace::new(format, bit_depth, false),
            planes: [plane(0, width, height), u, v],
            crop: CropWindow::default(),
        }
    }

    /// Set the crop offsets.
    #[must_use]
    pub fn with_crop(mut self, crop: CropWindow) -> Self {
        self.crop = crop;
        self
    }

    /// Set the status reported with the picture.
    #[must_use]
    pub fn with_status(mut self, status: ReturnCode) -> Self {
        self.status = status;
        self
    }

    fn view(&self) -> Picture<'_> {
        let [y, u, v] = &self.planes;
        Picture::new(
            self.status,
            self.color_space,
            [y.view(), u.view(), v.view()],
            self.crop,
        )
    }
}

impl ScriptedPlane {
    fn view(&self) -> PlaneView<'_> {
        PlaneView {
            data: &self.data,
            stride: self.stride,
            width: self.width,
            height: self.height,
        }
    }
}

/// Scripted response to a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitScript {
    /// Accept the chunk with these statistics.
    Accept {
        /// Bytes reported as consumed.
        read: usize,
        /// NAL unit type to report.
        nalu_type: NalUnitType,
        /// Slice type to report.
        slice_type: SliceType,
    },
    /// Reject the chunk.
    Reject(ReturnCode),
}

/// Scripted response to a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullScript {
    /// Hand out this picture.
    Deliver(ScriptedPicture),
    /// Fail to allocate the picture descriptor.
    DescriptorAllocationFailure,
    /// Report this code and no picture.
    Fail(ReturnCode),
}

/// Engine that replays [`SubmitScript`] and [`PullScript`] entries.
///
/// With an empty script a submit consumes the whole chunk and reports the
/// NAL type from its header, and a pull reports
/// [`ReturnCode::OutputNotAvailable`] (or [`ReturnCode::NoMoreFrames`]
/// after a flush).
#[derive(Debug)]
pub struct ScriptedEngine {
    threads: i32,
    submits: VecDeque<SubmitScript>,
    pulls: VecDeque<PullScript>,
    current: Option<(ScriptedPicture, Lease)>,
    flushed: bool,
    ledger: EngineLedger,
    _instance: Lease,
}

impl ScriptedEngine {
    /// Create an engine recording into `ledger`.
    ///
    /// # Errors
    ///
    /// [`FramegateError::EngineInit`] if `threads` is negative or above
    /// [`MAX_SCRIPTED_THREADS`].
    pub fn create(threads: i32, ledger: &EngineLedger) -> Result<Self, FramegateError> {
        if !(0..=MAX_SCRIPTED_THREADS).contains(&threads) {
            return Err(FramegateError::EngineInit {
                reason: format!(
                    "scripted engine supports 0..={MAX_SCRIPTED_THREADS} threads, got {threads}"
                ),
            });
        }
        ledger.engines_created.fetch_add(1, Ordering::AcqRel);
        log::trace!("Created scripted engine (threads={})", threads);
        Ok(Self {
            threads,
            submits: VecDeque::new(),
            pulls: VecDeque::new(),
            current: None,
            flushed: false,
            ledger: ledger.clone(),
            _instance: Lease::acquire(&ledger.live_engines),
        })
    }

    /// Queue a submit response.
    #[must_use]
    pub fn then_submit(mut self, script: SubmitScript) -> Self {
        self.submits.push_back(script);
        self
    }

    /// Queue a pull response.
    #[must_use]
    pub fn then_pull(mut self, script: PullScript) -> Self {
        self.pulls.push_back(script);
        self
    }

    /// Queue a picture for a later pull.
    pub fn push_frame(&mut self, picture: ScriptedPicture) {
        self.pulls.push_back(PullScript::Deliver(picture));
    }

    /// Thread count the engine was created with.
    pub fn threads(&self) -> i32 {
        self.threads
    }

    /// Pull responses not yet consumed.
    pub fn pending_pulls(&self) -> usize {
        self.pulls.len()
    }
}

impl DecodeEngine for ScriptedEngine {
    fn submit(&mut self, chunk: &[u8]) -> Result<SubmitStat, ReturnCode> {
        self.ledger.submits.fetch_add(1, Ordering::AcqRel);
        self.flushed = false;
        match self.submits.pop_front() {
            Some(SubmitScript::Accept {
                read,
                nalu_type,
                slice_type,
            }) => Ok(SubmitStat {
                read,
                nalu_type,
                slice_type,
            }),
            Some(SubmitScript::Reject(code)) => Err(code),
            None => Ok(SubmitStat {
                read: chunk.len(),
                nalu_type: NalHeader::parse(chunk)
                    .map(|header| header.unit_type)
                    .unwrap_or_default(),
                slice_type: SliceType::Unknown,
            }),
        }
    }

    fn pull(&mut self) -> Result<Picture<'_>, PullError> {
        self.current = None;
        let script = self.pulls.pop_front().unwrap_or(PullScript::Fail(if self.flushed {
            ReturnCode::NoMoreFrames
        } else {
            ReturnCode::OutputNotAvailable
        }));

        match script {
            PullScript::Deliver(picture) => {
                self.ledger.descriptors_issued.fetch_add(1, Ordering::AcqRel);
                let lease = Lease::acquire(&self.ledger.live_descriptors);
                let (picture, _) = self.current.insert((picture, lease));
                Ok(picture.view())
            }
            PullScript::DescriptorAllocationFailure => Err(PullError::DescriptorAllocation),
            PullScript::Fail(code) => Err(PullError::Engine(code)),
        }
    }

    fn release(&mut self) {
        self.current = None;
    }

    fn flush(&mut self) -> Result<(), ReturnCode> {
        self.flushed = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
