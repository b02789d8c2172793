//! Caller-owned decode results.
//!
//! A [`DecodeResult`] owns everything it references. Dropping it releases
//! its planes; nothing in it points back into the engine.

use std::io::{Result as IoResult, Write};

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};

use crate::bitstream::{ColorFormat, NalUnitType, SliceType};
use crate::engine::CropWindow;
use crate::extract::bytes_per_sample;
use crate::status::{ReturnCode, UnavailableReason};

/// One owned image plane.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plane {
    /// Sample bytes, `height` rows of `stride` samples each.
    pub data: Vec<u8>,
    /// Distance between row starts, in samples.
    pub stride: usize,
    /// Width in samples.
    pub width: u32,
    /// Height in rows.
    pub height: u32,
}

impl Plane {
    /// Byte count of the plane.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the plane holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A decoded picture with its three planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Luma width before cropping.
    pub width: u32,
    /// Luma height before cropping.
    pub height: u32,
    /// Crop offsets reported by the engine. Not applied to the planes.
    pub crop: CropWindow,
    /// Chroma layout.
    pub color_format: ColorFormat,
    /// Bits per sample.
    pub bit_depth: u8,
    /// Whether two-byte samples are stored big-endian.
    pub big_endian: bool,
    /// Luma plane.
    pub y: Plane,
    /// Cb plane.
    pub u: Plane,
    /// Cr plane.
    pub v: Plane,
}

impl DecodedFrame {
    /// Bytes per stored sample.
    pub fn bytes_per_sample(&self) -> usize {
        bytes_per_sample(self.bit_depth)
    }

    /// Width after applying the crop window.
    pub fn display_width(&self) -> u32 {
        self.width
            .saturating_sub(self.crop.left)
            .saturating_sub(self.crop.right)
    }

    /// Height after applying the crop window.
    pub fn display_height(&self) -> u32 {
        self.height
            .saturating_sub(self.crop.top)
            .saturating_sub(self.crop.bottom)
    }

    /// Total bytes across all planes.
    pub fn total_size(&self) -> usize {
        self.y.size() + self.u.size() + self.v.size()
    }

    /// Write the Y, U and V planes back to back, as stored.
    ///
    /// # Errors
    ///
    /// Any error from `writer`.
    pub fn write_planes<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        writer.write_all(&self.y.data)?;
        writer.write_all(&self.u.data)?;
        writer.write_all(&self.v.data)
    }

    /// Read one sample of `plane` at column `x`, row `y`.
    ///
    /// Samples outside the stored data read as zero.
    pub fn sample(&self, plane: &Plane, x: u32, y: u32) -> u16 {
        let width = self.bytes_per_sample();
        let offset = (y as usize * plane.stride + x as usize) * width;
        match (width, plane.data.get(offset..offset + width)) {
            (1, Some(bytes)) => u16::from(bytes[0]),
            (_, Some(&[first, second])) if self.big_endian => u16::from_be_bytes([first, second]),
            (_, Some(&[first, second])) => u16::from_le_bytes([first, second]),
            _ => 0,
        }
    }

    /// Convert to an 8-bit frame by dropping the low-order bits.
    ///
    /// 8-bit frames are returned unchanged. Strides are kept in samples, so
    /// a converted plane holds `height * stride` bytes.
    #[must_use]
    pub fn to_8bit(&self) -> DecodedFrame {
        if self.bytes_per_sample() == 1 {
            return self.clone();
        }
        let shift = self.bit_depth.saturating_sub(8).min(8);
        let convert = |plane: &Plane| {
            let rows = plane.height as usize;
            let mut data = Vec::with_capacity(rows * plane.stride);
            for row in 0..rows {
                for column in 0..plane.stride {
                    let value = self.sample(plane, column as u32, row as u32) >> shift;
                    data.push(value.min(255) as u8);
                }
            }
            Plane {
                data,
                stride: plane.stride,
                width: plane.width,
                height: plane.height,
            }
        };
        DecodedFrame {
            bit_depth: 8,
            big_endian: false,
            y: convert(&self.y),
            u: convert(&self.u),
            v: convert(&self.v),
            ..self.clone()
        }
    }

    /// The cropped luma plane as an image.
    ///
    /// 8-bit frames produce an 8-bit grey image. Deeper frames produce a
    /// 16-bit grey image with samples scaled to the full 16-bit range.
    pub fn luma_image(&self) -> DynamicImage {
        let (left, top) = (self.crop.left, self.crop.top);
        let (width, height) = (self.display_width(), self.display_height());

        if self.bytes_per_sample() == 1 {
            let image: GrayImage = ImageBuffer::from_fn(width, height, |x, y| {
                Luma([self.sample(&self.y, x + left, y + top) as u8])
            });
            return DynamicImage::ImageLuma8(image);
        }

        let shift = 16u8.saturating_sub(self.bit_depth);
        let image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(width, height, |x, y| {
            Luma([self.sample(&self.y, x + left, y + top) << shift])
        });
        DynamicImage::ImageLuma16(image)
    }
}

/// Outcome of one decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    /// Status of the engine call. [`ReturnCode::OutputNotAvailable`] when no
    /// frame was produced.
    pub status: ReturnCode,
    /// NAL unit type of the submitted chunk.
    pub nalu_type: NalUnitType,
    /// Slice type. Only meaningful when [`frame`](Self::frame) is present.
    pub slice_type: SliceType,
    /// The decoded picture, if one was produced.
    pub frame: Option<DecodedFrame>,
    /// Why no frame was produced, when `status` is `OutputNotAvailable`.
    pub unavailable_reason: Option<UnavailableReason>,
}

impl DecodeResult {
    pub(crate) fn unavailable(nalu_type: NalUnitType, reason: UnavailableReason) -> Self {
        Self {
            status: ReturnCode::OutputNotAvailable,
            nalu_type,
            slice_type: SliceType::Unknown,
            frame: None,
            unavailable_reason: Some(reason),
        }
    }

    /// Whether a frame was produced.
    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    /// The luma plane, if a frame was produced.
    pub fn y(&self) -> Option<&Plane> {
        self.frame.as_ref().map(|frame| &frame.y)
    }

    /// The Cb plane, if a frame was produced.
    pub fn u(&self) -> Option<&Plane> {
        self.frame.as_ref().map(|frame| &frame.u)
    }

    /// The Cr plane, if a frame was produced.
    pub fn v(&self) -> Option<&Plane> {
        self.frame.as_ref().map(|frame| &frame.v)
    }

    /// Take ownership of the frame.
    pub fn into_frame(self) -> Option<DecodedFrame> {
        self.frame
    }
}
