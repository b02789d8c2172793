//! Decoder and stream configuration.
//!
//! [`DecoderOptions`] configures engine creation. [`StreamOptions`] threads
//! progress callbacks, cancellation tokens, and stream limits through
//! [`Decoder::decode_stream`](crate::Decoder::decode_stream) without
//! polluting every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegate::{CancellationToken, DecoderOptions, ProgressCallback, ProgressInfo, StreamOptions};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} units", info.operation, info.current);
//!     }
//! }
//!
//! let decoder_options = DecoderOptions::new().with_threads(4);
//! let token = CancellationToken::new();
//! let stream_options = StreamOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_batch_size(30);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::FramegateError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Decoder used by [`DecoderOptions::new`]: the libxevd EVC decoder.
pub const DEFAULT_CODEC: &str = "libxevd";

/// Largest NAL unit [`StreamOptions::new`] accepts (10 MiB).
pub const DEFAULT_MAX_UNIT_SIZE: usize = 10 * 1024 * 1024;

/// Settings for creating a [`Decoder`](crate::Decoder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Worker thread hint passed to the engine. Zero lets the engine pick.
    pub threads: i32,
    /// Engine-specific decoder name.
    pub codec: String,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderOptions {
    /// Options with one thread per available CPU and the default codec.
    pub fn new() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|count| i32::try_from(count.get()).unwrap_or(i32::MAX))
            .unwrap_or(1);
        Self {
            threads,
            codec: DEFAULT_CODEC.to_string(),
        }
    }

    /// Set the worker thread hint.
    #[must_use]
    pub fn with_threads(mut self, threads: i32) -> Self {
        self.threads = threads;
        self
    }

    /// Select a decoder by name.
    #[must_use]
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Check the options before handing them to an engine.
    ///
    /// # Errors
    ///
    /// [`FramegateError::EngineInit`] for a negative thread count and
    /// [`FramegateError::InvalidOptions`] for an empty codec name.
    pub fn validate(&self) -> Result<(), FramegateError> {
        if self.threads < 0 {
            return Err(FramegateError::EngineInit {
                reason: format!("thread count must be non-negative, got {}", self.threads),
            });
        }
        if self.codec.trim().is_empty() {
            return Err(FramegateError::InvalidOptions(
                "codec name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for stream decoding.
///
/// All fields have defaults; a default-constructed value reports no
/// progress, is never cancelled, accepts units up to
/// [`DEFAULT_MAX_UNIT_SIZE`], and drains the engine at end of stream.
#[derive(Clone)]
pub struct StreamOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N units).
    pub(crate) batch_size: u64,
    /// Largest accepted unit, in bytes.
    pub(crate) max_unit_size: usize,
    /// Drain buffered pictures once the input is exhausted.
    pub(crate) drain_at_end: bool,
}

impl Debug for StreamOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StreamOptions")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("max_unit_size", &self.max_unit_size)
            .field("drain_at_end", &self.drain_at_end)
            .finish()
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            max_unit_size: DEFAULT_MAX_UNIT_SIZE,
            drain_at_end: true,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before each unit.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the largest accepted unit size. Clamped to at least 1 byte.
    #[must_use]
    pub fn with_max_unit_size(mut self, bytes: usize) -> Self {
        self.max_unit_size = bytes.max(1);
        self
    }

    /// Choose whether buffered pictures are drained at end of stream.
    #[must_use]
    pub fn with_drain_at_end(mut self, drain: bool) -> Self {
        self.drain_at_end = drain;
        self
    }

    /// The configured unit size limit.
    pub fn max_unit_size(&self) -> usize {
        self.max_unit_size
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
