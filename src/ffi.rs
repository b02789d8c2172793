//! C ABI for foreign callers.
//!
//! Four functions cover the whole lifecycle:
//!
//! ```c
//! FramegateDecoder *framegate_decoder_create(int32_t threads);
//! void framegate_decoder_destroy(FramegateDecoder *handle);
//! FramegateDecodeResult *framegate_decode(FramegateDecoder *handle,
//!                                         const uint8_t *data, int32_t size);
//! void framegate_result_free(FramegateDecodeResult *result);
//! ```
//!
//! `framegate_decode` returns null only when the engine rejects the chunk or
//! the arguments are invalid. Every other outcome, including "no frame
//! yet", is a non-null result that must be released with
//! `framegate_result_free` exactly once. Absent planes are null pointers
//! with size zero.
//!
//! No panic crosses the boundary: a panic inside any entry point is caught
//! and reported as a null return.

use std::ffi::c_int;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use crate::bitstream::SliceType;
use crate::configuration::DecoderOptions;
use crate::decoder::Decoder;
use crate::engine::DecodeEngine;
use crate::engine::ffmpeg::FfmpegEngine;
use crate::result::{DecodeResult, Plane};
use crate::status::ReturnCode;

/// Flat, caller-owned decode result.
#[repr(C)]
#[derive(Debug)]
pub struct FramegateDecodeResult {
    /// Engine status code; see [`ReturnCode`].
    pub status: c_int,
    /// Raw NAL unit type.
    pub nalu_type: c_int,
    /// Raw slice type; -1 when unknown.
    pub slice_type: c_int,
    /// Luma plane, or null.
    pub y: *mut u8,
    /// Cb plane, or null.
    pub u: *mut u8,
    /// Cr plane, or null.
    pub v: *mut u8,
    /// Luma stride in samples.
    pub stride_y: c_int,
    /// Cb stride in samples.
    pub stride_u: c_int,
    /// Cr stride in samples.
    pub stride_v: c_int,
    /// Luma plane size in bytes.
    pub size_y: c_int,
    /// Cb plane size in bytes.
    pub size_u: c_int,
    /// Cr plane size in bytes.
    pub size_v: c_int,
    /// Luma width before cropping.
    pub width: c_int,
    /// Luma height before cropping.
    pub height: c_int,
    /// Rows cropped from the top.
    pub crop_top: c_int,
    /// Columns cropped from the right.
    pub crop_right: c_int,
    /// Rows cropped from the bottom.
    pub crop_bottom: c_int,
    /// Columns cropped from the left.
    pub crop_left: c_int,
    /// Raw colour format value.
    pub color_format: c_int,
    /// Bits per sample.
    pub bit_depth: c_int,
}

/// Opaque decoder handle owned by the foreign caller.
pub struct FramegateDecoder {
    inner: Decoder<Box<dyn DecodeEngine + Send>>,
}

impl FramegateDecoder {
    /// Box `engine` behind a handle the C functions accept.
    ///
    /// The returned pointer must be released with
    /// [`framegate_decoder_destroy`].
    pub fn into_raw<E: DecodeEngine + Send + 'static>(engine: E) -> *mut FramegateDecoder {
        let engine: Box<dyn DecodeEngine + Send> = Box::new(engine);
        Box::into_raw(Box::new(FramegateDecoder {
            inner: Decoder::with_engine(engine),
        }))
    }
}

fn to_c_int<T: TryInto<c_int>>(value: T) -> c_int {
    value.try_into().unwrap_or(c_int::MAX)
}

/// Hand a plane's bytes to the caller. Empty planes become null.
fn export_plane(plane: Plane) -> *mut u8 {
    if plane.data.is_empty() {
        return ptr::null_mut();
    }
    Box::into_raw(plane.data.into_boxed_slice()).cast::<u8>()
}

/// Reclaim a plane exported by [`export_plane`].
///
/// # Safety
///
/// `data` must be null or come from [`export_plane`] with exactly `size`
/// bytes, and must not have been released already.
unsafe fn release_plane(data: *mut u8, size: c_int) {
    if data.is_null() {
        return;
    }
    let length = usize::try_from(size).unwrap_or(0);
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(data, length)) });
}

fn export_result(result: DecodeResult) -> FramegateDecodeResult {
    let mut exported = FramegateDecodeResult {
        status: result.status.as_raw(),
        nalu_type: c_int::from(result.nalu_type.as_raw()),
        slice_type: result.slice_type.as_raw(),
        y: ptr::null_mut(),
        u: ptr::null_mut(),
        v: ptr::null_mut(),
        stride_y: 0,
        stride_u: 0,
        stride_v: 0,
        size_y: 0,
        size_u: 0,
        size_v: 0,
        width: 0,
        height: 0,
        crop_top: 0,
        crop_right: 0,
        crop_bottom: 0,
        crop_left: 0,
        color_format: 0,
        bit_depth: 0,
    };

    let Some(frame) = result.frame else {
        return exported;
    };

    // Sizes travel as c_int and are needed to free the planes again.
    let fits = [&frame.y, &frame.u, &frame.v]
        .iter()
        .all(|plane| c_int::try_from(plane.size()).is_ok());
    if !fits {
        log::warn!("Decoded frame too large for the C result; dropping it");
        exported.status = ReturnCode::OutputNotAvailable.as_raw();
        exported.slice_type = SliceType::Unknown.as_raw();
        return exported;
    }

    exported.width = to_c_int(frame.width);
    exported.height = to_c_int(frame.height);
    exported.crop_top = to_c_int(frame.crop.top);
    exported.crop_right = to_c_int(frame.crop.right);
    exported.crop_bottom = to_c_int(frame.crop.bottom);
    exported.crop_left = to_c_int(frame.crop.left);
    exported.color_format = c_int::from(frame.color_format.as_raw());
    exported.bit_depth = c_int::from(frame.bit_depth);

    exported.stride_y = to_c_int(frame.y.stride);
    exported.stride_u = to_c_int(frame.u.stride);
    exported.stride_v = to_c_int(frame.v.stride);
    exported.size_y = to_c_int(frame.y.size());
    exported.size_u = to_c_int(frame.u.size());
    exported.size_v = to_c_int(frame.v.size());
    exported.y = export_plane(frame.y);
    exported.u = export_plane(frame.u);
    exported.v = export_plane(frame.v);
    exported
}

/// Create a libavcodec-backed decoder with `threads` worker threads.
///
/// Returns null if the engine cannot be created, including for a negative
/// thread count.
#[unsafe(no_mangle)]
pub extern "C" fn framegate_decoder_create(threads: i32) -> *mut FramegateDecoder {
    let created = panic::catch_unwind(|| {
        FfmpegEngine::create(&DecoderOptions::new().with_threads(threads))
    });
    match created {
        Ok(Ok(engine)) => FramegateDecoder::into_raw(engine),
        Ok(Err(error)) => {
            log::debug!("framegate_decoder_create failed: {}", error);
            ptr::null_mut()
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy a decoder. Null is ignored.
///
/// # Safety
///
/// `handle` must be null or a pointer returned by
/// [`framegate_decoder_create`] (or [`FramegateDecoder::into_raw`]) that has
/// not been destroyed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn framegate_decoder_destroy(handle: *mut FramegateDecoder) {
    if handle.is_null() {
        return;
    }
    let decoder = unsafe { Box::from_raw(handle) };
    let _ = panic::catch_unwind(AssertUnwindSafe(move || decoder.inner.close()));
}

/// Decode one chunk of `size` bytes.
///
/// Returns null if the handle or data pointer is null, `size` is negative,
/// or the engine rejects the chunk.
///
/// # Safety
///
/// `handle` must be a live decoder and `data` must point to `size` readable
/// bytes. The handle must not be used concurrently.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn framegate_decode(
    handle: *mut FramegateDecoder,
    data: *const u8,
    size: i32,
) -> *mut FramegateDecodeResult {
    if handle.is_null() || data.is_null() {
        return ptr::null_mut();
    }
    let Ok(length) = usize::try_from(size) else {
        return ptr::null_mut();
    };

    let decoder = unsafe { &mut *handle };
    let chunk = unsafe { slice::from_raw_parts(data, length) };

    let decoded = panic::catch_unwind(AssertUnwindSafe(|| decoder.inner.decode(chunk)));
    match decoded {
        Ok(Ok(result)) => Box::into_raw(Box::new(export_result(result))),
        Ok(Err(error)) => {
            log::debug!("framegate_decode failed: {}", error);
            ptr::null_mut()
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Release a result and its planes. Null is ignored.
///
/// # Safety
///
/// `result` must be null or a pointer returned by [`framegate_decode`],
/// unmodified and not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn framegate_result_free(result: *mut FramegateDecodeResult) {
    if result.is_null() {
        return;
    }
    let result = unsafe { Box::from_raw(result) };
    unsafe {
        release_plane(result.y, result.size_y);
        release_plane(result.u, result.size_u);
        release_plane(result.v, result.size_v);
    }
}
