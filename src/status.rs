//! Engine return codes and availability diagnostics.
//!
//! [`ReturnCode`] is the status vocabulary shared by every engine. Codes at
//! or above zero are successes (some of them informational, such as
//! [`ReturnCode::OutputNotAvailable`]); negative codes are failures.
//!
//! [`UnavailableReason`] explains *why* a [`DecodeResult`](crate::DecodeResult)
//! carries `OutputNotAvailable`. The status itself stays collapsed so
//! foreign callers see a single value.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{Error as IoError, ErrorKind};

use ffmpeg_next::Error as FfmpegError;

/// Outcome code of an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReturnCode {
    /// The engine has no more frames to emit after a drain.
    NoMoreFrames = 205,
    /// No displayable frame is available for this call.
    OutputNotAvailable = 204,
    /// A frame was produced and the picture dimensions changed.
    DimensionChanged = 203,
    /// Output is delayed by reordering.
    FrameDelayed = 202,
    /// A CRC mismatch was detected and ignored.
    CrcIgnored = 200,
    /// Success.
    Ok = 0,
    /// Generic failure.
    Failure = -1,
    /// An argument passed to the engine was invalid.
    InvalidArgument = -101,
    /// The engine ran out of memory.
    OutOfMemory = -102,
    /// An engine-internal limit was reached.
    ReachedMax = -103,
    /// The requested feature is not supported.
    Unsupported = -104,
    /// An unexpected engine state.
    Unexpected = -105,
    /// The picture uses a colour space this layer cannot materialize.
    UnsupportedColorSpace = -201,
    /// The bitstream unit is malformed.
    MalformedBitstream = -202,
    /// The engine could not allocate its worker threads.
    ThreadAllocation = -203,
    /// Picture CRC check failed.
    BadCrc = -300,
    /// A code this crate does not know.
    Unknown = -32767,
}

impl ReturnCode {
    /// Map a raw engine status value to a [`ReturnCode`].
    ///
    /// Unrecognised values map to [`ReturnCode::Unknown`].
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            205 => Self::NoMoreFrames,
            204 => Self::OutputNotAvailable,
            203 => Self::DimensionChanged,
            202 => Self::FrameDelayed,
            200 => Self::CrcIgnored,
            0 => Self::Ok,
            -1 => Self::Failure,
            -101 => Self::InvalidArgument,
            -102 => Self::OutOfMemory,
            -103 => Self::ReachedMax,
            -104 => Self::Unsupported,
            -105 => Self::Unexpected,
            -201 => Self::UnsupportedColorSpace,
            -202 => Self::MalformedBitstream,
            -203 => Self::ThreadAllocation,
            -300 => Self::BadCrc,
            _ => Self::Unknown,
        }
    }

    /// The raw integer value, as exposed through the C ABI.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// `true` for codes at or above zero.
    pub fn is_success(self) -> bool {
        self.as_raw() >= 0
    }

    /// `true` for negative codes.
    pub fn is_failure(self) -> bool {
        !self.is_success()
    }

    /// Translate an FFmpeg error into the engine vocabulary.
    pub(crate) fn from_ffmpeg(error: FfmpegError) -> Self {
        match error {
            FfmpegError::Eof => Self::NoMoreFrames,
            FfmpegError::InvalidData => Self::MalformedBitstream,
            FfmpegError::PatchWelcome | FfmpegError::DecoderNotFound => Self::Unsupported,
            FfmpegError::Bug | FfmpegError::Bug2 => Self::Unexpected,
            FfmpegError::Other { errno } => match IoError::from_raw_os_error(errno).kind() {
                ErrorKind::WouldBlock => Self::OutputNotAvailable,
                ErrorKind::OutOfMemory => Self::OutOfMemory,
                ErrorKind::InvalidInput => Self::InvalidArgument,
                _ => Self::Failure,
            },
            _ => Self::Failure,
        }
    }
}

impl Display for ReturnCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::NoMoreFrames => "no more frames",
            Self::OutputNotAvailable => "output not available",
            Self::DimensionChanged => "dimension changed",
            Self::FrameDelayed => "frame delayed",
            Self::CrcIgnored => "CRC mismatch ignored",
            Self::Ok => "ok",
            Self::Failure => "failure",
            Self::InvalidArgument => "invalid argument",
            Self::OutOfMemory => "out of memory",
            Self::ReachedMax => "engine limit reached",
            Self::Unsupported => "unsupported",
            Self::Unexpected => "unexpected engine state",
            Self::UnsupportedColorSpace => "unsupported colour space",
            Self::MalformedBitstream => "malformed bitstream",
            Self::ThreadAllocation => "thread allocation failed",
            Self::BadCrc => "bad CRC",
            Self::Unknown => "unknown",
        };
        write!(f, "{name} ({})", self.as_raw())
    }
}

/// Why a decode call produced no frame.
///
/// All variants surface as [`ReturnCode::OutputNotAvailable`] in the
/// result's `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The engine consumed less than one access unit (parameter sets,
    /// buffering, empty chunk).
    NothingConsumed,
    /// The engine could not allocate a picture descriptor.
    DescriptorAllocation,
    /// The engine's pull step reported this code after a successful submit.
    PullFailed(ReturnCode),
    /// A plane buffer could not be allocated; no planes were kept.
    PlaneAllocation,
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::NothingConsumed => write!(f, "no access unit consumed"),
            Self::DescriptorAllocation => write!(f, "picture descriptor allocation failed"),
            Self::PullFailed(code) => write!(f, "pull failed: {code}"),
            Self::PlaneAllocation => write!(f, "plane buffer allocation failed"),
        }
    }
}
