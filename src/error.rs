//! Error types for the `framegate` crate.
//!
//! [`FramegateError`] is returned by every fallible operation. Note that
//! "no frame yet" is *not* an error: it is reported through
//! [`DecodeResult::status`](crate::DecodeResult::status).

use std::io::Error as IoError;

use image::ImageError;
use thiserror::Error;

use crate::status::ReturnCode;

/// The unified error type for all `framegate` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramegateError {
    /// The engine rejected decoder creation.
    #[error("Failed to create decoder engine: {reason}")]
    EngineInit {
        /// Why creation failed.
        reason: String,
    },

    /// The engine rejected a submitted bitstream chunk.
    #[error("Engine rejected bitstream chunk: {code}")]
    DecodeSubmit {
        /// Code reported by the engine.
        code: ReturnCode,
    },

    /// Options failed validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A length-prefixed unit exceeds the configured limit.
    #[error("NAL unit of {size} bytes exceeds the {limit}-byte limit")]
    UnitTooLarge {
        /// Declared unit size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The stream ended inside a unit.
    #[error("Stream truncated: expected {expected} bytes, read {read}")]
    TruncatedStream {
        /// Bytes the length prefix (or prefix itself) required.
        expected: usize,
        /// Bytes actually available.
        read: usize,
    },

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while exporting a plane.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}
