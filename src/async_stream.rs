//! Async frame streaming.
//!
//! [`FrameStream`] decodes a length-prefixed stream on a Tokio blocking
//! thread and yields each frame-carrying [`DecodeResult`] through a bounded
//! channel. The decode contract is unchanged: the background thread drives
//! an ordinary [`Decoder`] through [`Decoder::decode_stream`].
//!
//! Both constructors must be called from within a Tokio runtime.
//!
//! # Example
//!
//! ```no_run
//! use tokio_stream::StreamExt;
//!
//! use framegate::{DecoderOptions, FramegateError, StreamOptions, frame_stream};
//!
//! # async fn example() -> Result<(), FramegateError> {
//! let file = std::fs::File::open("input.evc")?;
//! let mut stream = frame_stream(DecoderOptions::new(), file, StreamOptions::new());
//!
//! while let Some(result) = stream.next().await {
//!     let result = result?;
//!     println!("Frame:{} Slice:{}", result.nalu_type, result.slice_type);
//! }
//! # Ok(())
//! # }
//! ```

use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_stream::Stream;

use crate::configuration::{DecoderOptions, StreamOptions};
use crate::decoder::Decoder;
use crate::engine::DecodeEngine;
use crate::error::FramegateError;
use crate::result::DecodeResult;

/// Default bounded-channel capacity for [`FrameStream`].
///
/// Kept small so only a few decoded frames wait in memory.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8;

/// A stream of decode results produced by a background decode thread.
///
/// Dropping the stream closes the channel; the background thread stops at
/// the next frame it tries to send.
pub struct FrameStream {
    receiver: Receiver<Result<DecodeResult, FramegateError>>,
    handle: JoinHandle<()>,
}

impl FrameStream {
    /// Whether the background decode has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Stream for FrameStream {
    type Item = Result<DecodeResult, FramegateError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Stream frames from `reader` through a libavcodec-backed decoder.
pub fn frame_stream<R>(options: DecoderOptions, reader: R, stream_options: StreamOptions) -> FrameStream
where
    R: Read + Send + 'static,
{
    frame_stream_with(
        move || Decoder::with_options(&options),
        reader,
        stream_options,
        None,
    )
}

/// Stream frames from `reader` through the decoder built by `make_decoder`.
///
/// `make_decoder` runs on the blocking thread, so the engine itself need not
/// be [`Send`]. `channel_capacity` of `None` uses
/// [`DEFAULT_CHANNEL_CAPACITY`].
pub fn frame_stream_with<E, M, R>(
    make_decoder: M,
    reader: R,
    stream_options: StreamOptions,
    channel_capacity: Option<usize>,
) -> FrameStream
where
    E: DecodeEngine,
    M: FnOnce() -> Result<Decoder<E>, FramegateError> + Send + 'static,
    R: Read + Send + 'static,
{
    let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY).max(1);
    let (sender, receiver) = tokio::sync::mpsc::channel(capacity);

    let handle = tokio::task::spawn_blocking(move || {
        let result = decode_blocking(make_decoder, reader, &stream_options, &sender);
        if let Err(error) = result {
            // The receiver may already be gone.
            let _ = sender.blocking_send(Err(error));
        }
    });

    FrameStream { receiver, handle }
}

fn decode_blocking<E, M, R>(
    make_decoder: M,
    reader: R,
    options: &StreamOptions,
    sender: &Sender<Result<DecodeResult, FramegateError>>,
) -> Result<(), FramegateError>
where
    E: DecodeEngine,
    M: FnOnce() -> Result<Decoder<E>, FramegateError>,
    R: Read,
{
    let mut decoder = make_decoder()?;
    let summary = decoder.decode_stream(reader, options, |result| {
        sender
            .blocking_send(Ok(result))
            .map_err(|_| FramegateError::Cancelled)
    })?;
    log::debug!("Frame stream finished with {} frames", summary.frames);
    decoder.close();
    Ok(())
}
