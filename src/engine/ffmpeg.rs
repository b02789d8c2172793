//! libavcodec-backed engine.
//!
//! [`FfmpegEngine`] drives one `AVCodecContext`, by default the `libxevd`
//! EVC decoder. Cropping is disabled on the context so crop offsets reach
//! the caller untouched.
//!
//! libxevd reads packets as a sequence of NAL units, each preceded by its
//! 4-byte big-endian length. A submitted chunk is one bare NAL unit, so the
//! engine adds that prefix before sending it. Other codecs get the chunk
//! as is.
//!
//! FFmpeg reports a picture's type only together with the decoded frame, so
//! [`submit`](DecodeEngine::submit) receives eagerly: the frame it gets (or
//! the reason it got none) is staged and handed out by the following
//! [`pull`](DecodeEngine::pull). The descriptor handed out by `pull` is
//! freed by [`release`](DecodeEngine::release), the next pull, or dropping
//! the engine.
//!
//! FFmpeg's own console output is separate from the Rust
//! [`log`](https://crates.io/crates/log) facade; use
//! [`set_engine_log_level`] to tune it.

use std::borrow::Cow;
use std::ffi::CString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ptr;
use std::slice;
use std::str::FromStr;
use std::sync::OnceLock;

use ffmpeg_next::{Error as FfmpegError, Packet, util::log::Level};
use ffmpeg_sys_next::{
    AV_PIX_FMT_FLAG_ALPHA, AV_PIX_FMT_FLAG_BE, AV_PIX_FMT_FLAG_RGB, AVCodecContext, AVFrame,
    AVPictureType, AVPixFmtDescriptor, AVPixelFormat,
};

use crate::bitstream::{ColorFormat, ColorSpace, NalHeader, SliceType};
use crate::configuration::{DEFAULT_CODEC, DecoderOptions};
use crate::engine::{CropWindow, DecodeEngine, Picture, PlaneView, PullError, SubmitStat};
use crate::error::FramegateError;
use crate::status::ReturnCode;

static LIBRARY_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialise the FFmpeg libraries for this process.
///
/// Runs the underlying initialisation once; later calls return the cached
/// outcome. FFmpeg has no matching process-wide teardown.
///
/// # Errors
///
/// [`FramegateError::EngineInit`] if FFmpeg failed to initialise.
pub fn initialize() -> Result<(), FramegateError> {
    LIBRARY_INIT
        .get_or_init(|| {
            log::debug!("Initialising FFmpeg libraries");
            ffmpeg_next::init().map_err(|error| error.to_string())
        })
        .clone()
        .map_err(|reason| FramegateError::EngineInit {
            reason: format!("FFmpeg initialisation failed: {reason}"),
        })
}

/// FFmpeg internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// No output at all.
    Quiet,
    /// Unrecoverable errors that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Tracing output.
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Quiet => Level::Quiet,
            LogLevel::Panic => Level::Panic,
            LogLevel::Fatal => Level::Fatal,
            LogLevel::Error => Level::Error,
            LogLevel::Warning => Level::Warning,
            LogLevel::Info => Level::Info,
            LogLevel::Verbose => Level::Verbose,
            LogLevel::Debug => Level::Debug,
            LogLevel::Trace => Level::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = FramegateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "panic" => Ok(Self::Panic),
            "fatal" => Ok(Self::Fatal),
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(FramegateError::InvalidOptions(format!(
                "unknown log level: {other}"
            ))),
        }
    }
}

/// Set FFmpeg's console verbosity. Does not affect the `log` facade.
pub fn set_engine_log_level(level: LogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

/// Owned `AVCodecContext`, freed on drop.
struct CodecSession {
    context: *mut AVCodecContext,
}

// SAFETY: the context is exclusively owned and only touched through
// `&mut FfmpegEngine`; libavcodec contexts have no thread affinity.
unsafe impl Send for CodecSession {}

impl Drop for CodecSession {
    fn drop(&mut self) {
        unsafe { ffmpeg_sys_next::avcodec_free_context(&mut self.context) };
    }
}

/// Owned `AVFrame` (the picture-buffer descriptor), freed on drop.
struct FrameDescriptor {
    frame: *mut AVFrame,
}

// SAFETY: same ownership argument as `CodecSession`.
unsafe impl Send for FrameDescriptor {}

impl FrameDescriptor {
    fn alloc() -> Option<Self> {
        let frame = unsafe { ffmpeg_sys_next::av_frame_alloc() };
        (!frame.is_null()).then_some(Self { frame })
    }

    fn slice_type(&self) -> SliceType {
        match unsafe { (*self.frame).pict_type } {
            AVPictureType::AV_PICTURE_TYPE_I | AVPictureType::AV_PICTURE_TYPE_SI => SliceType::I,
            AVPictureType::AV_PICTURE_TYPE_P | AVPictureType::AV_PICTURE_TYPE_SP => SliceType::P,
            AVPictureType::AV_PICTURE_TYPE_B | AVPictureType::AV_PICTURE_TYPE_BI => SliceType::B,
            _ => SliceType::Unknown,
        }
    }
}

impl Drop for FrameDescriptor {
    fn drop(&mut self) {
        unsafe { ffmpeg_sys_next::av_frame_free(&mut self.frame) };
    }
}

/// Decoding engine backed by libavcodec.
pub struct FfmpegEngine {
    session: CodecSession,
    codec: String,
    staged: Option<Result<FrameDescriptor, PullError>>,
    current: Option<FrameDescriptor>,
    draining: bool,
    length_prefixed: bool,
}

impl FfmpegEngine {
    /// Open the decoder named in `options` with its thread hint.
    ///
    /// # Errors
    ///
    /// [`FramegateError::EngineInit`] if FFmpeg cannot be initialised, the
    /// decoder is not part of this FFmpeg build, or it refuses to open.
    pub fn create(options: &DecoderOptions) -> Result<Self, FramegateError> {
        options.validate()?;
        initialize()?;

        let name = CString::new(options.codec.as_str()).map_err(|_| {
            FramegateError::InvalidOptions(format!("codec name contains NUL: {:?}", options.codec))
        })?;

        let codec = unsafe { ffmpeg_sys_next::avcodec_find_decoder_by_name(name.as_ptr()) };
        if codec.is_null() {
            return Err(FramegateError::EngineInit {
                reason: format!("decoder '{}' is not available in this FFmpeg build", options.codec),
            });
        }

        let context = unsafe { ffmpeg_sys_next::avcodec_alloc_context3(codec) };
        if context.is_null() {
            return Err(FramegateError::EngineInit {
                reason: "failed to allocate codec context".to_string(),
            });
        }
        let session = CodecSession { context };

        unsafe {
            (*session.context).thread_count = options.threads;
            (*session.context).apply_cropping = 0;
        }

        let ret = unsafe { ffmpeg_sys_next::avcodec_open2(session.context, codec, ptr::null_mut()) };
        if ret < 0 {
            return Err(FramegateError::EngineInit {
                reason: format!(
                    "failed to open decoder '{}': {}",
                    options.codec,
                    FfmpegError::from(ret)
                ),
            });
        }

        log::debug!(
            "Opened FFmpeg decoder (codec={}, threads={})",
            options.codec,
            options.threads
        );

        Ok(Self {
            session,
            codec: options.codec.clone(),
            staged: None,
            current: None,
            draining: false,
            length_prefixed: options.codec == DEFAULT_CODEC,
        })
    }

    /// Name of the opened decoder.
    pub fn codec(&self) -> &str {
        &self.codec
    }

    /// Allocate a descriptor and receive the next frame into it.
    fn receive(&mut self) -> Result<FrameDescriptor, PullError> {
        let descriptor = FrameDescriptor::alloc().ok_or(PullError::DescriptorAllocation)?;
        let ret =
            unsafe { ffmpeg_sys_next::avcodec_receive_frame(self.session.context, descriptor.frame) };
        if ret < 0 {
            return Err(PullError::Engine(ReturnCode::from_ffmpeg(FfmpegError::from(ret))));
        }
        Ok(descriptor)
    }
}

impl DecodeEngine for FfmpegEngine {
    fn submit(&mut self, chunk: &[u8]) -> Result<SubmitStat, ReturnCode> {
        // An empty packet would signal end of stream to libavcodec.
        if chunk.is_empty() {
            return Ok(SubmitStat::default());
        }

        if self.draining {
            unsafe { ffmpeg_sys_next::avcodec_flush_buffers(self.session.context) };
            self.draining = false;
        }

        let payload = packet_payload(chunk, self.length_prefixed)?;
        let packet = Packet::copy(&payload);
        let ret = unsafe { ffmpeg_sys_next::avcodec_send_packet(self.session.context, packet.as_ptr()) };
        if ret < 0 {
            return Err(ReturnCode::from_ffmpeg(FfmpegError::from(ret)));
        }

        let slice_type = match &self.staged {
            Some(Ok(descriptor)) => descriptor.slice_type(),
            Some(Err(_)) | None => {
                let received = self.receive();
                let slice_type = received
                    .as_ref()
                    .map_or(SliceType::Unknown, FrameDescriptor::slice_type);
                self.staged = Some(received);
                slice_type
            }
        };

        Ok(SubmitStat {
            read: chunk.len(),
            nalu_type: NalHeader::parse(chunk)
                .map(|header| header.unit_type)
                .unwrap_or_default(),
            slice_type,
        })
    }

    fn pull(&mut self) -> Result<Picture<'_>, PullError> {
        self.current = None;
        let staged = match self.staged.take() {
            Some(staged) => staged,
            None => self.receive(),
        };
        let descriptor = self.current.insert(staged?);
        unsafe { picture_from_frame(&*descriptor.frame) }
    }

    fn release(&mut self) {
        self.current = None;
    }

    fn flush(&mut self) -> Result<(), ReturnCode> {
        if self.draining {
            return Ok(());
        }
        let ret = unsafe { ffmpeg_sys_next::avcodec_send_packet(self.session.context, ptr::null()) };
        match ret {
            0 => {
                self.draining = true;
                Ok(())
            }
            error => match FfmpegError::from(error) {
                FfmpegError::Eof => {
                    self.draining = true;
                    Ok(())
                }
                other => Err(ReturnCode::from_ffmpeg(other)),
            },
        }
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Bytes sent to libavcodec for one submitted NAL unit.
fn packet_payload(chunk: &[u8], length_prefixed: bool) -> Result<Cow<'_, [u8]>, ReturnCode> {
    if !length_prefixed {
        return Ok(Cow::Borrowed(chunk));
    }
    let length = u32::try_from(chunk.len()).map_err(|_| ReturnCode::InvalidArgument)?;
    let mut payload = Vec::with_capacity(chunk.len() + 4);
    payload.extend_from_slice(&length.to_be_bytes());
    payload.extend_from_slice(chunk);
    Ok(Cow::Owned(payload))
}

/// Pixel format recorded on a decoded frame.
fn frame_pixel_format(frame: &AVFrame) -> Result<AVPixelFormat, PullError> {
    if !(0..AVPixelFormat::AV_PIX_FMT_NB as i32).contains(&frame.format) {
        return Err(PullError::Engine(ReturnCode::UnsupportedColorSpace));
    }
    // SAFETY: libavcodec stores an `AVPixelFormat` value in `format` for
    // video frames, and the range was checked above.
    Ok(unsafe { std::mem::transmute::<i32, AVPixelFormat>(frame.format) })
}

/// Plane dimension after a chroma shift, rounding up.
fn shifted(value: i32, shift: u8) -> u32 {
    let value = u32::try_from(value).unwrap_or(0);
    (value + (1 << shift) - 1) >> shift
}

fn classify(descriptor: &AVPixFmtDescriptor) -> Result<(ColorFormat, usize), PullError> {
    let unsupported = PullError::Engine(ReturnCode::UnsupportedColorSpace);
    if descriptor.flags & u64::from(AV_PIX_FMT_FLAG_RGB) != 0 {
        return Err(unsupported);
    }
    let mut components = descriptor.nb_components;
    if descriptor.flags & u64::from(AV_PIX_FMT_FLAG_ALPHA) != 0 {
        components = components.saturating_sub(1);
    }
    match components {
        1 => Ok((ColorFormat::Ycbcr400, 1)),
        3 => {
            if descriptor.comp[1].plane == descriptor.comp[2].plane {
                return Err(unsupported);
            }
            let format = match (descriptor.log2_chroma_w, descriptor.log2_chroma_h) {
                (1, 1) => ColorFormat::Ycbcr420,
                (1, 0) => ColorFormat::Ycbcr422,
                (0, 0) => ColorFormat::Ycbcr444,
                _ => return Err(unsupported),
            };
            Ok((format, 3))
        }
        _ => Err(unsupported),
    }
}

/// Describe a decoded frame as a [`Picture`].
///
/// # Safety
///
/// `frame` must hold a decoded picture whose buffers stay valid for as long
/// as `frame` is borrowed.
unsafe fn picture_from_frame(frame: &AVFrame) -> Result<Picture<'_>, PullError> {
    let pixel_format = frame_pixel_format(frame)?;
    let descriptor = unsafe { ffmpeg_sys_next::av_pix_fmt_desc_get(pixel_format) };
    if descriptor.is_null() {
        return Err(PullError::Engine(ReturnCode::UnsupportedColorSpace));
    }
    let descriptor = unsafe { &*descriptor };
    let (format, plane_count) = classify(descriptor)?;
    let bit_depth = u8::try_from(descriptor.comp[0].depth).unwrap_or(u8::MAX);
    let big_endian = descriptor.flags & u64::from(AV_PIX_FMT_FLAG_BE) != 0;

    let mut planes = [PlaneView::default(); 3];
    for (index, plane) in planes.iter_mut().enumerate().take(plane_count) {
        let stride = usize::try_from(frame.linesize[index])
            .map_err(|_| PullError::Engine(ReturnCode::Unsupported))?;
        let (width, height) = if index == 0 {
            (shifted(frame.width, 0), shifted(frame.height, 0))
        } else {
            (
                shifted(frame.width, descriptor.log2_chroma_w),
                shifted(frame.height, descriptor.log2_chroma_h),
            )
        };
        let base = frame.data[index];
        let data = if base.is_null() {
            &[][..]
        } else {
            unsafe { slice::from_raw_parts(base, stride * height as usize) }
        };
        *plane = PlaneView {
            data,
            stride,
            width,
            height,
        };
    }

    let crop = CropWindow {
        top: u32::try_from(frame.crop_top).unwrap_or(u32::MAX),
        right: u32::try_from(frame.crop_right).unwrap_or(u32::MAX),
        bottom: u32::try_from(frame.crop_bottom).unwrap_or(u32::MAX),
        left: u32::try_from(frame.crop_left).unwrap_or(u32::MAX),
    };

    Ok(Picture::new(
        ReturnCode::Ok,
        ColorSpace::new(format, bit_depth, big_endian),
        planes,
        crop,
    ))
}

impl Display for FfmpegEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "ffmpeg:{}", self.codec)
    }
}

#[cfg(test)]
mod tests {
    use ffmpeg_sys_next::{AVPixFmtDescriptor, AVPixelFormat};

    use super::{
        FrameDescriptor, classify, frame_pixel_format, packet_payload, picture_from_frame, shifted,
    };
    use crate::bitstream::ColorFormat;
    use crate::engine::PullError;
    use crate::status::ReturnCode;

    fn pixel_format(format: AVPixelFormat) -> &'static AVPixFmtDescriptor {
        let descriptor = unsafe { ffmpeg_sys_next::av_pix_fmt_desc_get(format) };
        assert!(!descriptor.is_null(), "no descriptor for {format:?}");
        unsafe { &*descriptor }
    }

    fn frame_with_buffer(format: AVPixelFormat, width: i32, height: i32) -> FrameDescriptor {
        let descriptor = FrameDescriptor::alloc().expect("frame allocation");
        unsafe {
            (*descriptor.frame).format = format as i32;
            (*descriptor.frame).width = width;
            (*descriptor.frame).height = height;
            assert_eq!(ffmpeg_sys_next::av_frame_get_buffer(descriptor.frame, 0), 0);
        }
        descriptor
    }

    // ── Packet framing ─────────────────────────────────────────────────

    #[test]
    fn libxevd_packets_carry_a_length_prefix() {
        let unit = [0x04_u8, 0x01, 0x10, 0x20, 0x30];
        let payload = packet_payload(&unit, true).unwrap();
        assert_eq!(&payload[..4], &[0, 0, 0, 5]);
        assert_eq!(&payload[4..], &unit);
    }

    #[test]
    fn other_codecs_get_the_chunk_unchanged() {
        let unit = [0x04_u8, 0x01, 0x10];
        let payload = packet_payload(&unit, false).unwrap();
        assert_eq!(&payload[..], &unit);
    }

    // ── Pixel formats ──────────────────────────────────────────────────

    #[test]
    fn planar_yuv_formats_are_classified_by_subsampling() {
        let cases = [
            (AVPixelFormat::AV_PIX_FMT_YUV420P, ColorFormat::Ycbcr420),
            (AVPixelFormat::AV_PIX_FMT_YUV420P10LE, ColorFormat::Ycbcr420),
            (AVPixelFormat::AV_PIX_FMT_YUV422P, ColorFormat::Ycbcr422),
            (AVPixelFormat::AV_PIX_FMT_YUV444P, ColorFormat::Ycbcr444),
        ];
        for (format, expected) in cases {
            match classify(pixel_format(format)) {
                Ok((color_format, 3)) => assert_eq!(color_format, expected, "{format:?}"),
                other => panic!("Expected three planes for {format:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn gray_is_a_single_plane() {
        match classify(pixel_format(AVPixelFormat::AV_PIX_FMT_GRAY8)) {
            Ok((ColorFormat::Ycbcr400, 1)) => {}
            other => panic!("Expected Ycbcr400, got: {other:?}"),
        }
    }

    #[test]
    fn packed_and_rgb_formats_are_unsupported() {
        for format in [AVPixelFormat::AV_PIX_FMT_NV12, AVPixelFormat::AV_PIX_FMT_RGB24] {
            match classify(pixel_format(format)) {
                Err(PullError::Engine(ReturnCode::UnsupportedColorSpace)) => {}
                other => panic!("Expected UnsupportedColorSpace for {format:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn chroma_dimensions_round_up() {
        assert_eq!(shifted(5, 1), 3);
        assert_eq!(shifted(4, 1), 2);
        assert_eq!(shifted(7, 0), 7);
        assert_eq!(shifted(-1, 0), 0);
    }

    // ── Frames ─────────────────────────────────────────────────────────

    #[test]
    fn pixel_format_comes_from_the_frame() {
        let descriptor = FrameDescriptor::alloc().expect("frame allocation");
        let frame = unsafe { &mut *descriptor.frame };

        frame.format = -1;
        match frame_pixel_format(frame) {
            Err(PullError::Engine(ReturnCode::UnsupportedColorSpace)) => {}
            other => panic!("Expected UnsupportedColorSpace, got: {other:?}"),
        }

        frame.format = AVPixelFormat::AV_PIX_FMT_YUV420P10LE as i32;
        assert_eq!(frame_pixel_format(frame).unwrap(), AVPixelFormat::AV_PIX_FMT_YUV420P10LE);
    }

    #[test]
    fn frame_planes_follow_the_frame_format() {
        let descriptor = frame_with_buffer(AVPixelFormat::AV_PIX_FMT_YUV420P10LE, 16, 9);
        let picture = unsafe { picture_from_frame(&*descriptor.frame) }.unwrap();

        assert_eq!(picture.color_space.format(), ColorFormat::Ycbcr420);
        assert_eq!(picture.color_space.bit_depth(), 10);
        assert_eq!((picture.width(), picture.height()), (16, 9));
        assert_eq!((picture.planes[1].width, picture.planes[1].height), (8, 5));
        assert_eq!(picture.planes[2].height, 5);
        assert!(picture.planes[0].stride >= 32);
        assert_eq!(picture.planes[0].data.len(), picture.planes[0].stride * 9);
    }

    #[test]
    fn gray_frames_leave_chroma_empty() {
        let descriptor = frame_with_buffer(AVPixelFormat::AV_PIX_FMT_GRAY8, 8, 4);
        let picture = unsafe { picture_from_frame(&*descriptor.frame) }.unwrap();

        assert_eq!(picture.color_space.format(), ColorFormat::Ycbcr400);
        assert_eq!(picture.color_space.bit_depth(), 8);
        assert!(picture.planes[1].data.is_empty());
        assert!(picture.planes[2].data.is_empty());
    }
}
