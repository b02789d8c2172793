//! Progress reporting and cancellation support.
//!
//! [`ProgressCallback`] observes long-running stream decodes,
//! [`CancellationToken`] stops them cooperatively between units, and
//! [`ProgressInfo`] is the snapshot handed to callbacks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegate::{Decoder, FramegateError, ProgressCallback, ProgressInfo, StreamOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{} units, {} frames", info.current, info.frames);
//!     }
//! }
//!
//! let mut decoder = Decoder::create(4)?;
//! let options = StreamOptions::new().with_progress(Arc::new(PrintProgress));
//! let file = std::fs::File::open("input.evc")?;
//! decoder.decode_stream(file, &options, |_result| Ok(()))?;
//! # Ok::<(), FramegateError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding a length-prefixed NAL unit stream.
    StreamDecode,
    /// Pulling buffered pictures after end of stream.
    Drain,
}

/// A snapshot of decoding progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// Units processed so far.
    pub current: u64,
    /// Frames produced so far.
    pub frames: u64,
    /// Bitstream bytes consumed so far.
    pub bytes: u64,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`]: callbacks may run on
/// rayon workers or Tokio blocking threads.
///
/// Callbacks observe but cannot halt the operation; use
/// [`CancellationToken`] for that.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` units.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// # Example
///
/// ```
/// use framegate::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks counters and emits callbacks every `batch_size` units.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    current: u64,
    frames: u64,
    bytes: u64,
    batch_size: u64,
    start_time: Instant,
    units_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            current: 0,
            frames: 0,
            bytes: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            units_since_last_report: 0,
        }
    }

    /// Record one processed unit of `bytes` bytes.
    pub(crate) fn advance(&mut self, bytes: usize, produced_frame: bool) {
        self.current += 1;
        self.bytes += bytes as u64;
        if produced_frame {
            self.frames += 1;
        }
        self.units_since_last_report += 1;

        if self.units_since_last_report >= self.batch_size {
            self.report();
            self.units_since_last_report = 0;
        }
    }

    /// Count frames produced outside a unit (drain).
    pub(crate) fn add_frames(&mut self, count: u64) {
        self.frames += count;
    }

    pub(crate) fn set_operation(&mut self, operation: OperationType) {
        self.operation = operation;
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report();
    }

    fn report(&self) {
        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            frames: self.frames,
            bytes: self.bytes,
            elapsed: self.start_time.elapsed(),
        };
        self.callback.on_progress(&info);
    }
}
