//! Copying an engine-owned picture into caller-owned planes.
//!
//! A plane occupies `height * raw_stride * bytes_per_sample` bytes, where
//! `raw_stride` is the engine's row pitch in bytes. The stored stride is the
//! raw stride divided by the sample width. Sizing uses the raw stride before
//! it is normalized.

use crate::engine::{Picture, PlaneView};
use crate::result::{DecodedFrame, Plane};
use crate::status::UnavailableReason;

/// Bytes per sample at `bit_depth`: 2 from 10 bits upwards, 1 otherwise.
pub fn bytes_per_sample(bit_depth: u8) -> usize {
    if bit_depth >= 10 { 2 } else { 1 }
}

/// Byte count and normalized stride of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaneLayout {
    /// Bytes to allocate.
    pub size: usize,
    /// Stride stored in the result, in samples.
    pub stride: usize,
}

/// Compute the layout of a plane with `height` rows of `raw_stride` bytes.
///
/// Returns `None` if the size overflows `usize`.
pub fn plane_layout(height: u32, raw_stride: usize, bit_depth: u8) -> Option<PlaneLayout> {
    let sample = bytes_per_sample(bit_depth);
    let size = usize::try_from(height)
        .ok()?
        .checked_mul(raw_stride)?
        .checked_mul(sample)?;
    Some(PlaneLayout {
        size,
        stride: raw_stride / sample,
    })
}

fn reserve(size: usize) -> Option<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(size).ok()?;
    Some(buffer)
}

fn fill(mut buffer: Vec<u8>, view: &PlaneView<'_>, size: usize, index: usize) -> Vec<u8> {
    let copied = size.min(view.data.len());
    buffer.extend_from_slice(&view.data[..copied]);
    if copied < size {
        log::trace!(
            "Plane {} holds {} of {} bytes; zero-filling the rest",
            index,
            copied,
            size
        );
        buffer.resize(size, 0);
    }
    buffer
}

/// Copy all three planes of `picture` into a [`DecodedFrame`].
///
/// Every buffer is reserved before any is filled. If one reservation fails
/// the ones already made are dropped and no plane is returned.
pub(crate) fn materialize(picture: &Picture<'_>) -> Result<DecodedFrame, UnavailableReason> {
    let bit_depth = picture.color_space.bit_depth();

    let mut layouts = [PlaneLayout::default(); 3];
    let mut buffers: [Vec<u8>; 3] = Default::default();
    for (index, view) in picture.planes.iter().enumerate() {
        let layout = plane_layout(view.height, view.stride, bit_depth)
            .ok_or(UnavailableReason::PlaneAllocation)?;
        buffers[index] = reserve(layout.size).ok_or(UnavailableReason::PlaneAllocation)?;
        layouts[index] = layout;
    }

    let [y, u, v] = buffers;
    let [y_view, u_view, v_view] = &picture.planes;
    let plane = |buffer, view: &PlaneView<'_>, layout: PlaneLayout, index| Plane {
        data: fill(buffer, view, layout.size, index),
        stride: layout.stride,
        width: view.width,
        height: view.height,
    };

    Ok(DecodedFrame {
        width: picture.width(),
        height: picture.height(),
        crop: picture.crop,
        color_format: picture.color_space.format(),
        bit_depth,
        big_endian: picture.color_space.is_big_endian(),
        y: plane(y, y_view, layouts[0], 0),
        u: plane(u, u_view, layouts[1], 1),
        v: plane(v, v_view, layouts[2], 2),
    })
}
